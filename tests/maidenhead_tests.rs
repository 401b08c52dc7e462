//! Maidenhead locator conversion tests

use wspr_beacon::maidenhead::{to_maidenhead, MaidenheadError};
use wspr_beacon::{Calendar, GpsFix};

#[test]
fn test_known_stations() {
    let cases = [
        (41.714, -72.727, "FN31"),
        (-33.86, 151.21, "QF56"),
        (51.5, -0.12, "IO91"),
        (35.68, 139.77, "PM95"),
    ];
    for (lat, lon, expected) in cases {
        assert_eq!(to_maidenhead(lat, lon, 4).unwrap().as_str(), expected);
    }
}

#[test]
fn test_subsquare_precision() {
    assert_eq!(to_maidenhead(41.714, -72.727, 2).unwrap().as_str(), "FN");
    assert_eq!(to_maidenhead(41.714, -72.727, 6).unwrap().as_str(), "FN31pr");
    assert_eq!(to_maidenhead(41.714, -72.727, 8).unwrap().as_str(), "FN31pr21");
    assert_eq!(to_maidenhead(-33.86, 151.21, 6).unwrap().as_str(), "QF56od");
}

#[test]
fn test_edges_stay_in_range() {
    assert_eq!(to_maidenhead(90.0, 180.0, 4).unwrap().as_str(), "RR99");
    assert_eq!(to_maidenhead(-90.0, -180.0, 4).unwrap().as_str(), "AA00");
}

#[test]
fn test_rejects_bad_input() {
    assert_eq!(to_maidenhead(0.0, 0.0, 5), Err(MaidenheadError::InvalidLength));
    assert_eq!(to_maidenhead(0.0, 0.0, 12), Err(MaidenheadError::InvalidLength));
    assert_eq!(to_maidenhead(91.0, 0.0, 4), Err(MaidenheadError::OutOfRange));
    assert_eq!(to_maidenhead(0.0, -180.5, 4), Err(MaidenheadError::OutOfRange));
}

#[test]
fn test_gps_fix_uses_four_char_square() {
    let fix = GpsFix::from_position(Calendar::EPOCH_2000, 41.714, -72.727).unwrap();

    assert_eq!(fix.locator.as_str(), "FN31");
    assert_eq!(fix.time, Calendar::EPOCH_2000);
}

#[test]
fn test_gps_fix_rejects_bad_position() {
    assert_eq!(
        GpsFix::from_position(Calendar::EPOCH_2000, 120.0, 0.0),
        Err(MaidenheadError::OutOfRange)
    );
}
