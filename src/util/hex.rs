//! # Hex Encoding/Decoding Utilities
//!
//! Telegram bytes enter and leave this crate as hex strings: captured frames
//! are shared as hex dumps, the CLI takes hex on the command line, and test
//! vectors are written as hex constants. This module wraps the `hex` crate
//! with the strictness levels those uses need.
//!
//! ## Usage
//!
//! ```rust
//! use wmbus_meters::util::hex::{encode_hex, decode_hex, parse_hex_lenient};
//!
//! let frame = [0x21, 0x44, 0xB4, 0x09];
//! assert_eq!(encode_hex(&frame), "2144b409");
//! assert_eq!(decode_hex("2144b409").unwrap(), frame);
//!
//! // Captured dumps often carry separators: telegram=|2144_B409|
//! assert_eq!(parse_hex_lenient("|2144_B409|").unwrap(), frame);
//! ```

use thiserror::Error;

/// Errors that can occur during hex operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HexError {
    #[error("Odd number of hex characters: {0}")]
    OddLength(usize),

    #[error("Empty hex string")]
    EmptyString,

    #[error("Hex decoding error: {0}")]
    DecodeError(String),
}

/// Encode bytes to lowercase hex string
pub fn encode_hex(data: &[u8]) -> String {
    hex::encode(data)
}

/// Encode bytes to uppercase hex string
pub fn encode_hex_upper(data: &[u8]) -> String {
    hex::encode_upper(data)
}

/// Decode hex string to bytes
///
/// Accepts both uppercase and lowercase hex characters.
/// Whitespace is automatically stripped.
pub fn decode_hex(hex_str: &str) -> Result<Vec<u8>, HexError> {
    if hex_str.is_empty() {
        return Err(HexError::EmptyString);
    }

    let cleaned: String = hex_str.chars().filter(|c| !c.is_whitespace()).collect();

    if cleaned.len() % 2 != 0 {
        return Err(HexError::OddLength(cleaned.len()));
    }

    hex::decode(&cleaned).map_err(|e| HexError::DecodeError(e.to_string()))
}

/// Parse hex that may contain separators
///
/// More lenient than [`decode_hex`]: strips every non-hex character first.
/// Telegram dumps are commonly decorated with `|`, `_` or `-` between the
/// header and payload sections.
pub fn parse_hex_lenient(input: &str) -> Result<Vec<u8>, HexError> {
    let hex_chars: String = input.chars().filter(|c| c.is_ascii_hexdigit()).collect();

    if hex_chars.is_empty() {
        return Err(HexError::EmptyString);
    }

    if hex_chars.len() % 2 != 0 {
        return Err(HexError::OddLength(hex_chars.len()));
    }

    hex::decode(&hex_chars).map_err(|e| HexError::DecodeError(e.to_string()))
}

/// Format hex data for compact display (useful for logs)
///
/// Formats data as "21 44 b4 09" with spaces between bytes.
pub fn format_hex_compact(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Pretty-print hex data with offsets and an ASCII column
///
/// Produces a hexdump-style view of a telegram for the analyze output.
pub fn pretty_hex(data: &[u8], bytes_per_line: usize) -> String {
    if data.is_empty() {
        return String::new();
    }

    let mut result = String::new();

    for (i, chunk) in data.chunks(bytes_per_line).enumerate() {
        result.push_str(&format!("{:04x}: ", i * bytes_per_line));

        for (j, byte) in chunk.iter().enumerate() {
            result.push_str(&format!("{:02x}", byte));
            if j % 2 == 1 {
                result.push(' ');
            }
        }

        if chunk.len() < bytes_per_line {
            for j in chunk.len()..bytes_per_line {
                result.push_str("  ");
                if j % 2 == 1 {
                    result.push(' ');
                }
            }
        }

        result.push_str(" |");
        for &byte in chunk {
            if byte.is_ascii_graphic() || byte == b' ' {
                result.push(byte as char);
            } else {
                result.push('.');
            }
        }
        result.push('|');

        if i < data.len().div_ceil(bytes_per_line) - 1 {
            result.push('\n');
        }
    }

    result
}

/// Helper for creating test data from hex strings
///
/// Panics on invalid hex (intended for test code only).
pub fn hex_to_bytes(hex: &str) -> Vec<u8> {
    parse_hex_lenient(hex).expect("Invalid hex in test data")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_roundtrip() {
        let data = vec![0x21, 0x44, 0xB4, 0x09, 0x91, 0x63, 0x74, 0x23];
        let encoded = encode_hex(&data);
        let decoded = decode_hex(&encoded).unwrap();
        assert_eq!(data, decoded);
    }

    #[test]
    fn test_encode_case() {
        let data = vec![0xAB, 0xCD, 0xEF];
        assert_eq!(encode_hex(&data), "abcdef");
        assert_eq!(encode_hex_upper(&data), "ABCDEF");
    }

    #[test]
    fn test_decode_with_whitespace() {
        let hex = "21 44 b4 09";
        let expected = vec![0x21, 0x44, 0xB4, 0x09];
        assert_eq!(decode_hex(hex).unwrap(), expected);
    }

    #[test]
    fn test_parse_lenient_telegram_dump() {
        let input = "telegram=|2144B409|";
        // 't' and 'e' count as hex digits, so only pass the framed part
        let expected = vec![0x21, 0x44, 0xB4, 0x09];
        assert_eq!(parse_hex_lenient(&input[9..]).unwrap(), expected);
        assert_eq!(parse_hex_lenient("21_44-B4:09").unwrap(), expected);
    }

    #[test]
    fn test_format_compact() {
        let data = vec![0x21, 0x44, 0xB4, 0x09];
        assert_eq!(format_hex_compact(&data), "21 44 b4 09");
    }

    #[test]
    fn test_pretty_hex() {
        let data = vec![0x21, 0x44, 0xB4, 0x09, 0x91, 0x63, 0x74, 0x23];
        let pretty = pretty_hex(&data, 8);
        assert!(pretty.contains("2144"));
        assert!(pretty.contains('|'));
    }

    #[test]
    fn test_hex_to_bytes() {
        let data = hex_to_bytes("2144B409");
        assert_eq!(data, vec![0x21, 0x44, 0xB4, 0x09]);
    }

    #[test]
    fn test_errors() {
        assert!(decode_hex("").is_err());
        assert!(decode_hex("1").is_err()); // Odd length
        assert!(decode_hex("GG").is_err()); // Invalid character
        assert!(parse_hex_lenient("||").is_err());
    }
}
