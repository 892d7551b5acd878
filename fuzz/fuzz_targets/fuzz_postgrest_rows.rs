#![no_main]
use libfuzzer_sys::fuzz_target;
use villa_booking::adapters::postgrest::rows::CalendarDayRow;
use villa_booking::domain::calendar::CalendarDay;

fuzz_target!(|data: &[u8]| {
    if let Ok(rows) = serde_json::from_slice::<Vec<CalendarDayRow>>(data) {
        for row in rows {
            let _ = CalendarDay::try_from(row);
        }
    }
});
