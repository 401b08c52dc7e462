//! Latitude/longitude to Maidenhead grid locator.
//!
//! North and east are positive. Character pairs alternate between letters
//! (field `A-R`, then subsquare `a-x`) and digits.

use heapless::String;

/// Longest locator produced (field, square, subsquare, extended square).
pub const MAX_LOCATOR_LEN: usize = 8;

/// Conversion failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaidenheadError {
    /// Requested length is odd, below 2 or above [`MAX_LOCATOR_LEN`].
    InvalidLength,
    /// Latitude outside -90..=90 or longitude outside -180..=180.
    OutOfRange,
}

impl core::fmt::Display for MaidenheadError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidLength => write!(f, "invalid locator length"),
            Self::OutOfRange => write!(f, "coordinate out of range"),
        }
    }
}

/// Convert a position to a locator of `len` characters.
pub fn to_maidenhead(lat: f32, lon: f32, len: usize) -> Result<String<MAX_LOCATOR_LEN>, MaidenheadError> {
    if len < 2 || len > MAX_LOCATOR_LEN || len % 2 != 0 {
        return Err(MaidenheadError::InvalidLength);
    }
    if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
        return Err(MaidenheadError::OutOfRange);
    }

    let mut out = String::new();

    // 18 fields of 20 degrees longitude by 10 degrees latitude
    let lon = lon + 180.0;
    let lat = lat + 90.0;
    // the +180/+90 edges belong to the last field
    let lon_field = ((lon / 20.0) as u8).min(17);
    let lat_field = ((lat / 10.0) as u8).min(17);
    let mut lon_rem = (lon - lon_field as f32 * 20.0) / 2.0;
    let mut lat_rem = lat - lat_field as f32 * 10.0;
    push_pair(&mut out, b'A', lon_field, lat_field);

    let mut pair = 1;
    while pair < len / 2 {
        pair += 1;
        let lon_q = lon_rem as u8;
        let lat_q = lat_rem as u8;
        lon_rem -= lon_q as f32;
        lat_rem -= lat_q as f32;
        if pair % 2 == 1 {
            push_pair(&mut out, b'a', lon_q.min(23), lat_q.min(23));
            lon_rem *= 10.0;
            lat_rem *= 10.0;
        } else {
            push_pair(&mut out, b'0', lon_q.min(9), lat_q.min(9));
            lon_rem *= 24.0;
            lat_rem *= 24.0;
        }
    }

    Ok(out)
}

fn push_pair(out: &mut String<MAX_LOCATOR_LEN>, base: u8, lon: u8, lat: u8) {
    // capacity is checked against `len` before the first push
    let _ = out.push((base + lon) as char);
    let _ = out.push((base + lat) as char);
}
