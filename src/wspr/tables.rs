//! WSPR protocol constants and lookup tables
//!
//! Both tables are evaluated at compile time. Index `i` of [`INTERLEAVE`]
//! is the destination slot of the `i`-th convolutional output bit.

/// Number of channel symbols in one transmission.
pub const SYMBOL_COUNT: usize = 162;

/// Packed source buffer length in bytes (81 meaningful bits, zero padded).
pub const PACKED_LEN: usize = 11;

/// Generator polynomial for shift register 0.
pub const POLY_0: u32 = 0xF2D0_5351;

/// Generator polynomial for shift register 1.
pub const POLY_1: u32 = 0xE461_3C47;

/// Tone step per symbol value, in centihertz.
///
/// The true spacing is 12000/8192 Hz (146.484 cHz). The beacon uses the
/// fixed-point value 146 for compatibility with existing transmitters.
pub const TONE_STEP_CENTIHZ: u64 = 146;

/// Symbol period in microseconds (8192/12000 s).
pub const SYMBOL_PERIOD_US: u32 = 682_667;

/// Number of 6 Hz sub-bands inside the 200 Hz WSPR window.
pub const SUB_BAND_COUNT: u8 = 33;

/// Published 162-bit synchronization vector.
pub static SYNC_VECTOR: [u8; SYMBOL_COUNT] = [
    1, 1, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 1, 1, 1, 0,
    0, 0, 1, 0, 0, 1, 0, 1, 1, 1, 1, 0, 0, 0, 0, 0,
    0, 0, 1, 0, 0, 1, 0, 1, 0, 0, 0, 0, 0, 0, 1, 0,
    1, 1, 0, 0, 1, 1, 0, 1, 0, 0, 0, 1, 1, 0, 1, 0,
    0, 0, 0, 1, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 0, 1,
    0, 0, 1, 0, 1, 1, 0, 0, 0, 1, 1, 0, 1, 0, 1, 0,
    0, 0, 1, 0, 0, 0, 0, 0, 1, 0, 0, 1, 0, 0, 1, 1,
    1, 0, 1, 1, 0, 0, 1, 1, 0, 1, 0, 0, 0, 1, 1, 1,
    0, 0, 0, 0, 0, 1, 0, 1, 0, 0, 1, 1, 0, 0, 0, 0,
    0, 0, 0, 1, 1, 0, 1, 0, 1, 1, 0, 0, 0, 1, 1, 0,
    0, 0,
];

/// Bit-reversal interleave permutation.
///
/// Candidate indices 0..=255 are bit-reversed as bytes; reversed values
/// below 162 are taken in order as destinations.
pub static INTERLEAVE: [u8; SYMBOL_COUNT] = {
    let mut table = [0u8; SYMBOL_COUNT];
    let mut next = 0;
    let mut candidate: u16 = 0;
    while candidate < 256 && next < SYMBOL_COUNT {
        let reversed = (candidate as u8).reverse_bits();
        if (reversed as usize) < SYMBOL_COUNT {
            table[next] = reversed;
            next += 1;
        }
        candidate += 1;
    }
    table
};
