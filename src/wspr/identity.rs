//! Station identity and input conditioning.
//!
//! A WSPR type-1 message carries a callsign that fits the "standard"
//! template (digit in the third position), a 4-character grid square and a
//! power level restricted to values ending in 0, 3 or 7.

use heapless::String;

/// Callsign field width after conditioning.
pub const CALLSIGN_LEN: usize = 6;

/// Locator characters carried by the message.
pub const LOCATOR_LEN: usize = 4;

/// Maximum stored locator length (a 6-character subsquare is accepted and
/// truncated to the 4-character square).
pub const LOCATOR_MAX_LEN: usize = 6;

/// Highest encodable power level in dBm.
pub const MAX_POWER_DBM: u8 = 60;

/// Encoder failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    /// Callsign does not fit the six-position template.
    InvalidCallsign,
    /// Locator is not two letters A-R followed by two digits.
    InvalidLocator,
}

impl core::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidCallsign => write!(f, "invalid callsign"),
            Self::InvalidLocator => write!(f, "invalid locator"),
        }
    }
}

/// Callsign, locator and power as supplied by the settings store.
///
/// Values are kept as entered; [`condition`] normalizes them at encode time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationIdentity {
    pub callsign: String<CALLSIGN_LEN>,
    pub locator: String<LOCATOR_MAX_LEN>,
    pub power_dbm: u8,
}

impl StationIdentity {
    /// Build an identity from text fields.
    ///
    /// Fails only if a field does not fit its storage; content is checked
    /// later by [`condition`].
    pub fn new(callsign: &str, locator: &str, power_dbm: u8) -> Result<Self, EncodeError> {
        let mut call = String::new();
        call.push_str(callsign).map_err(|_| EncodeError::InvalidCallsign)?;
        let mut loc = String::new();
        loc.push_str(locator).map_err(|_| EncodeError::InvalidLocator)?;
        Ok(Self {
            callsign: call,
            locator: loc,
            power_dbm,
        })
    }
}

/// Identity after conditioning: fixed-width upper-case fields and a
/// quantized power level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditionedIdentity {
    pub callsign: [u8; CALLSIGN_LEN],
    pub locator: [u8; LOCATOR_LEN],
    pub power_dbm: u8,
}

/// Condition all three fields.
pub fn condition(identity: &StationIdentity) -> Result<ConditionedIdentity, EncodeError> {
    Ok(ConditionedIdentity {
        callsign: condition_callsign(&identity.callsign)?,
        locator: condition_locator(&identity.locator)?,
        power_dbm: quantize_power(identity.power_dbm),
    })
}

/// Normalize a callsign to the six-position template.
///
/// Upper-cases, right-pads with spaces, and shifts right by one when the
/// prefix has a single character ("K1JT" becomes " K1JT ").
pub fn condition_callsign(raw: &str) -> Result<[u8; CALLSIGN_LEN], EncodeError> {
    let raw = raw.trim().as_bytes();
    if raw.is_empty() || raw.len() > CALLSIGN_LEN || !raw.is_ascii() {
        return Err(EncodeError::InvalidCallsign);
    }

    let mut upper = [b' '; CALLSIGN_LEN];
    for (dst, src) in upper.iter_mut().zip(raw) {
        *dst = src.to_ascii_uppercase();
    }

    let needs_shift = raw.len() >= 2
        && upper[1].is_ascii_digit()
        && !(raw.len() >= 3 && upper[2].is_ascii_digit());

    let call = if needs_shift {
        if raw.len() == CALLSIGN_LEN {
            // shifting would drop the last character
            return Err(EncodeError::InvalidCallsign);
        }
        let mut shifted = [b' '; CALLSIGN_LEN];
        shifted[1..].copy_from_slice(&upper[..CALLSIGN_LEN - 1]);
        shifted
    } else {
        upper
    };

    let letter_or_space = |c: u8| c.is_ascii_uppercase() || c == b' ';
    let template_ok = (call[0].is_ascii_alphanumeric() || call[0] == b' ')
        && call[1].is_ascii_alphanumeric()
        && call[2].is_ascii_digit()
        && call[3..].iter().all(|&c| letter_or_space(c));

    if template_ok {
        Ok(call)
    } else {
        Err(EncodeError::InvalidCallsign)
    }
}

/// Validate and upper-case a grid locator.
///
/// Accepts 4 or 6 characters; only the leading square is kept.
pub fn condition_locator(raw: &str) -> Result<[u8; LOCATOR_LEN], EncodeError> {
    let raw = raw.trim().as_bytes();
    if raw.len() != LOCATOR_LEN && raw.len() != LOCATOR_MAX_LEN {
        return Err(EncodeError::InvalidLocator);
    }

    let mut loc = [0u8; LOCATOR_LEN];
    for (idx, (dst, src)) in loc.iter_mut().zip(raw).enumerate() {
        let ch = src.to_ascii_uppercase();
        let valid = if idx < 2 {
            (b'A'..=b'R').contains(&ch)
        } else {
            ch.is_ascii_digit()
        };
        if !valid {
            return Err(EncodeError::InvalidLocator);
        }
        *dst = ch;
    }
    Ok(loc)
}

/// Clamp to 60 dBm and force the ones digit into {0, 3, 7}.
///
/// Ones digit 1-2 rounds to 0, 4-6 to 3, 8-9 to 7; the tens digit is kept.
pub fn quantize_power(dbm: u8) -> u8 {
    let dbm = dbm.min(MAX_POWER_DBM);
    let tens = dbm / 10 * 10;
    match dbm % 10 {
        1 | 2 => tens,
        4..=6 => tens + 3,
        8 | 9 => tens + 7,
        ones => tens + ones,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callsign_single_char_prefix_shifts() {
        assert_eq!(&condition_callsign("K1JT").unwrap(), b" K1JT ");
        assert_eq!(&condition_callsign("k1jt").unwrap(), b" K1JT ");
    }

    #[test]
    fn test_callsign_two_char_prefix_pads() {
        assert_eq!(&condition_callsign("VK2ABC").unwrap(), b"VK2ABC");
        assert_eq!(&condition_callsign("9A1AA").unwrap(), b"9A1AA ");
        assert_eq!(&condition_callsign("G4JNT").unwrap(), b" G4JNT");
    }

    #[test]
    fn test_callsign_rejections() {
        assert_eq!(condition_callsign(""), Err(EncodeError::InvalidCallsign));
        assert_eq!(condition_callsign("ABCDEFG"), Err(EncodeError::InvalidCallsign));
        assert_eq!(condition_callsign("K1ABCD"), Err(EncodeError::InvalidCallsign));
        assert_eq!(condition_callsign("AB/1C"), Err(EncodeError::InvalidCallsign));
        assert_eq!(condition_callsign("ABCDE"), Err(EncodeError::InvalidCallsign));
        assert_eq!(condition_callsign("AB1C2"), Err(EncodeError::InvalidCallsign));
    }

    #[test]
    fn test_locator_six_chars_truncated() {
        assert_eq!(&condition_locator("fn20xa").unwrap(), b"FN20");
    }
}
