//! # Utility Modules
//!
//! Common helpers shared across the crate, currently hex encoding/decoding
//! for telegram dumps, CLI input and test vectors.

pub mod hex;

// Re-export commonly used functions
pub use hex::{decode_hex, encode_hex, format_hex_compact, hex_to_bytes, parse_hex_lenient, pretty_hex};
