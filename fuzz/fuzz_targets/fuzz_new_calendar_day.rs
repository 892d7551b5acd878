#![no_main]
use libfuzzer_sys::fuzz_target;
use villa_booking::domain::calendar::NewCalendarDay;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = serde_json::from_slice::<NewCalendarDay>(data)
        && let Ok(draft) = input.validate()
    {
        assert!(draft.price.is_none_or(|p| !p.is_sign_negative() || p.is_zero()));
    }
});
