//! WSPR message encoding.

pub mod encoder;
pub mod identity;
pub mod tables;

pub use encoder::{encode, PackedFields, SymbolSequence};
pub use identity::{EncodeError, StationIdentity};
pub use tables::{SYMBOL_COUNT, SYMBOL_PERIOD_US, TONE_STEP_CENTIHZ};
