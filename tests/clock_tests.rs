//! Calendar and transmit-window tests

use wspr_beacon::Calendar;

fn cal(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Calendar {
    Calendar::new(year, month, day, hour, minute, second).unwrap()
}

#[test]
fn test_odd_minute_rounds_up() {
    let now = cal(2024, 3, 10, 12, 31, 45);
    assert_eq!(now.next_transmit_window(), cal(2024, 3, 10, 12, 32, 0));
}

#[test]
fn test_even_minute_start_skips_to_next() {
    let now = cal(2024, 3, 10, 12, 32, 0);
    assert_eq!(now.next_transmit_window(), cal(2024, 3, 10, 12, 34, 0));
}

#[test]
fn test_late_in_odd_minute() {
    let now = cal(2024, 3, 10, 12, 33, 59);
    assert_eq!(now.next_transmit_window(), cal(2024, 3, 10, 12, 34, 0));
}

#[test]
fn test_hour_rollover() {
    assert_eq!(
        cal(2024, 3, 10, 12, 58, 10).next_transmit_window(),
        cal(2024, 3, 10, 13, 0, 0)
    );
    assert_eq!(
        cal(2024, 3, 10, 12, 59, 0).next_transmit_window(),
        cal(2024, 3, 10, 13, 0, 0)
    );
}

#[test]
fn test_day_rollover() {
    assert_eq!(
        cal(2024, 3, 10, 23, 58, 0).next_transmit_window(),
        cal(2024, 3, 11, 0, 0, 0)
    );
}

#[test]
fn test_month_rollover_respects_leap_years() {
    assert_eq!(
        cal(2024, 2, 28, 23, 59, 0).next_transmit_window(),
        cal(2024, 2, 29, 0, 0, 0)
    );
    assert_eq!(
        cal(2023, 2, 28, 23, 59, 0).next_transmit_window(),
        cal(2023, 3, 1, 0, 0, 0)
    );
    assert_eq!(
        cal(2024, 4, 30, 23, 58, 30).next_transmit_window(),
        cal(2024, 5, 1, 0, 0, 0)
    );
}

#[test]
fn test_year_rollover() {
    assert_eq!(
        cal(2023, 12, 31, 23, 59, 59).next_transmit_window(),
        cal(2024, 1, 1, 0, 0, 0)
    );
}

#[test]
fn test_window_always_even_and_after_now() {
    for minute in 0..60 {
        for second in [0, 1, 30, 59] {
            let now = cal(2024, 6, 15, 7, minute, second);
            let next = now.next_transmit_window();

            assert_eq!(next.second, 0);
            assert_eq!(next.minute % 2, 0);
            assert!(next > now);

            let gap = next.to_unix_seconds() - now.to_unix_seconds();
            assert!(gap > 0 && gap <= 120, "gap {} at {}", gap, now);
            assert!(next.is_valid());
        }
    }
}

#[test]
fn test_calendar_validation() {
    assert!(Calendar::new(2024, 2, 29, 0, 0, 0).is_some());
    assert!(Calendar::new(2023, 2, 29, 0, 0, 0).is_none());
    assert!(Calendar::new(2024, 4, 31, 0, 0, 0).is_none());
    assert!(Calendar::new(2024, 0, 1, 0, 0, 0).is_none());
    assert!(Calendar::new(2024, 1, 1, 24, 0, 0).is_none());
    assert!(Calendar::new(2024, 1, 1, 0, 60, 0).is_none());
}

#[test]
fn test_unix_seconds() {
    let t = cal(2024, 3, 10, 14, 7, 12);

    assert_eq!(t.to_unix_seconds(), 1_710_079_632);
    assert_eq!(Calendar::from_unix_seconds(1_710_079_632), t);
}

#[test]
fn test_unix_roundtrip_across_years() {
    let mut secs = Calendar::EPOCH_2000.to_unix_seconds();
    let end = cal(2030, 1, 1, 0, 0, 0).to_unix_seconds();

    while secs < end {
        let t = Calendar::from_unix_seconds(secs);
        assert!(t.is_valid(), "{}", t);
        assert_eq!(t.to_unix_seconds(), secs);
        secs += 86_400 * 7 + 3_661;
    }
}

#[test]
fn test_display_format() {
    let t = cal(2024, 3, 10, 4, 7, 2);

    assert_eq!(t.to_string(), "2024-03-10 04:07:02");
}

#[test]
fn test_ordering_is_chronological() {
    assert!(cal(2023, 12, 31, 23, 59, 59) < cal(2024, 1, 1, 0, 0, 0));
    assert!(cal(2024, 1, 1, 0, 0, 1) > cal(2024, 1, 1, 0, 0, 0));
}
