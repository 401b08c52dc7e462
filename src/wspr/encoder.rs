//! WSPR type-1 message encoder.
//!
//! Pure transform from a [`StationIdentity`] to 162 four-level channel
//! symbols:
//!
//! ```text
//! condition ─▶ pack (50 bits) ─▶ convolve (r=1/2, K=32) ─▶ interleave ─▶ merge sync
//! ```
//!
//! No I/O, no global state. Identical inputs always produce identical output.

use core::ops::Index;

use super::identity::{condition, ConditionedIdentity, EncodeError, StationIdentity};
use super::tables::{INTERLEAVE, PACKED_LEN, POLY_0, POLY_1, SYMBOL_COUNT, SYNC_VECTOR};

/// Source-coded message: `n` carries the callsign (28 bits), `m` the
/// locator and power (22 bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedFields {
    pub n: u32,
    pub m: u32,
}

impl PackedFields {
    /// Lay `n` then `m` out MSB-first, left-aligned in 11 bytes.
    ///
    /// Byte 6 holds only the two low bits of `m` in its top positions;
    /// bytes 7-10 are zero flush bits.
    pub fn to_bytes(&self) -> [u8; PACKED_LEN] {
        let n = self.n & 0x0FFF_FFFF;
        let m = self.m & 0x003F_FFFF;
        let mut packed = [0u8; PACKED_LEN];
        packed[0] = (n >> 20) as u8;
        packed[1] = (n >> 12) as u8;
        packed[2] = (n >> 4) as u8;
        packed[3] = (((n & 0x0F) << 4) | ((m >> 18) & 0x0F)) as u8;
        packed[4] = (m >> 10) as u8;
        packed[5] = (m >> 2) as u8;
        packed[6] = ((m & 0x03) << 6) as u8;
        packed
    }
}

/// The 162 channel symbols of one transmission, each in 0..=3.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SymbolSequence([u8; SYMBOL_COUNT]);

impl SymbolSequence {
    /// Symbols as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Symbol at `idx`, or `None` past the end.
    #[inline]
    pub fn get(&self, idx: usize) -> Option<u8> {
        self.0.get(idx).copied()
    }

    /// Always [`SYMBOL_COUNT`].
    #[inline]
    pub const fn len(&self) -> usize {
        SYMBOL_COUNT
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.iter().copied()
    }
}

impl Index<usize> for SymbolSequence {
    type Output = u8;

    fn index(&self, idx: usize) -> &u8 {
        &self.0[idx]
    }
}

impl AsRef<[u8]> for SymbolSequence {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl core::fmt::Debug for SymbolSequence {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

/// Encode an identity into its channel symbols.
pub fn encode(identity: &StationIdentity) -> Result<SymbolSequence, EncodeError> {
    let conditioned = condition(identity)?;
    let packed = pack(&conditioned).to_bytes();
    let convolved = convolve(&packed);
    let scrambled = interleave(&convolved);
    Ok(merge_sync(&scrambled))
}

/// Base-37 code: digits 0-9, letters 10-35, space 36.
#[inline]
fn char_code(ch: u8) -> u32 {
    match ch {
        b'0'..=b'9' => (ch - b'0') as u32,
        b'A'..=b'Z' => (ch - b'A') as u32 + 10,
        _ => 36,
    }
}

/// Source-code a conditioned identity.
pub fn pack(identity: &ConditionedIdentity) -> PackedFields {
    let call = &identity.callsign;
    let mut n = char_code(call[0]);
    n = n * 36 + char_code(call[1]);
    n = n * 10 + char_code(call[2]);
    for &ch in &call[3..] {
        // letters and space only: 27 values
        n = n * 27 + (char_code(ch) - 10);
    }

    let loc = &identity.locator;
    let field_lon = (loc[0] - b'A') as u32;
    let field_lat = (loc[1] - b'A') as u32;
    let square_lon = (loc[2] - b'0') as u32;
    let square_lat = (loc[3] - b'0') as u32;
    let mut m = (179 - 10 * field_lon - square_lon) * 180 + 10 * field_lat + square_lat;
    m = m * 128 + identity.power_dbm as u32 + 64;

    PackedFields { n, m }
}

/// Even parity of the set bits.
#[inline]
fn parity(value: u32) -> u8 {
    (value.count_ones() & 1) as u8
}

/// Rate-1/2 convolutional encode.
///
/// Bits are clocked MSB-first into two cleared 32-bit registers; each input
/// bit yields one parity value per register (register 0 first), emitted as
/// 0 or 2. Stops after 162 outputs, i.e. after 81 input bits.
pub fn convolve(packed: &[u8; PACKED_LEN]) -> [u8; SYMBOL_COUNT] {
    let mut out = [0u8; SYMBOL_COUNT];
    let mut reg0: u32 = 0;
    let mut reg1: u32 = 0;
    let mut produced = 0;

    'bytes: for &byte in packed {
        for shift in (0..8).rev() {
            let bit = ((byte >> shift) & 1) as u32;
            reg0 = (reg0 << 1) | bit;
            reg1 = (reg1 << 1) | bit;

            out[produced] = parity(reg0 & POLY_0) * 2;
            out[produced + 1] = parity(reg1 & POLY_1) * 2;
            produced += 2;

            if produced >= SYMBOL_COUNT {
                break 'bytes;
            }
        }
    }
    out
}

/// Scatter convolutional output through the bit-reversal permutation.
pub fn interleave(convolved: &[u8; SYMBOL_COUNT]) -> [u8; SYMBOL_COUNT] {
    let mut scrambled = [0u8; SYMBOL_COUNT];
    for (&value, &dst) in convolved.iter().zip(INTERLEAVE.iter()) {
        scrambled[dst as usize] = value;
    }
    scrambled
}

/// XOR each data value (0 or 2) with its sync bit.
pub fn merge_sync(scrambled: &[u8; SYMBOL_COUNT]) -> SymbolSequence {
    let mut symbols = [0u8; SYMBOL_COUNT];
    for ((out, &data), &sync) in symbols.iter_mut().zip(scrambled).zip(SYNC_VECTOR.iter()) {
        *out = data ^ sync;
    }
    SymbolSequence(symbols)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn k1jt() -> ConditionedIdentity {
        ConditionedIdentity {
            callsign: *b" K1JT ",
            locator: *b"FN20",
            power_dbm: 30,
        }
    }

    #[test]
    fn test_pack_k1jt() {
        let packed = pack(&k1jt());
        assert_eq!(packed.n, 259_055_063);
        assert_eq!(packed.m, 2_942_814);
    }

    #[test]
    fn test_packed_flush_bytes_zero() {
        let bytes = pack(&k1jt()).to_bytes();
        assert_eq!(bytes[6] & 0x3F, 0);
        assert_eq!(&bytes[7..], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_convolve_output_alphabet() {
        let bytes = pack(&k1jt()).to_bytes();
        let conv = convolve(&bytes);
        assert!(conv.iter().all(|&v| v == 0 || v == 2));
    }

    #[test]
    fn test_convolve_zero_input_is_zero() {
        let conv = convolve(&[0u8; PACKED_LEN]);
        assert!(conv.iter().all(|&v| v == 0));
    }
}
