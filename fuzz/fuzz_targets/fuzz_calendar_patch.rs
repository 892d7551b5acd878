#![no_main]
use libfuzzer_sys::fuzz_target;
use villa_booking::domain::calendar::CalendarDayPatch;

fuzz_target!(|data: &[u8]| {
    if let Ok(patch) = serde_json::from_slice::<CalendarDayPatch>(data) {
        let _ = patch.validate("villa-1");
    }
});
