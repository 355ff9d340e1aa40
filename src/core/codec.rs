//! Hex string <-> byte buffer conversion.
//!
//! Whitespace separates bytes and is ignored. Any other character that is
//! not a hex digit is rejected rather than silently dropped.

use crate::domain::error::{TcpHexError, TcpHexResult};

/// Presentation options for encoded hex.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HexFormat {
    /// Put a single space between bytes
    pub spaced: bool,
}

impl HexFormat {
    pub const COMPACT: HexFormat = HexFormat { spaced: false };
    pub const SPACED: HexFormat = HexFormat { spaced: true };

    pub fn new(spaced: bool) -> Self {
        Self { spaced }
    }

    /// Render bytes using this format.
    pub fn encode(&self, bytes: &[u8]) -> String {
        if self.spaced {
            encode_spaced(bytes)
        } else {
            encode(bytes)
        }
    }
}

/// Decode a hex string into bytes, most significant nibble first.
pub fn decode(input: &str) -> TcpHexResult<Vec<u8>> {
    // Positions count characters of the caller's input, whitespace included
    if let Some((position, c)) = input
        .chars()
        .enumerate()
        .find(|(_, c)| !c.is_whitespace() && !c.is_ascii_hexdigit())
    {
        return Err(TcpHexError::InvalidHex(format!(
            "invalid character '{}' at position {}",
            c, position
        )));
    }

    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();

    if compact.is_empty() {
        return Err(TcpHexError::InvalidHex("no hex digits".to_string()));
    }

    hex::decode(&compact).map_err(|e| match e {
        hex::FromHexError::OddLength => TcpHexError::InvalidHex(format!(
            "odd number of digits ({})",
            compact.len()
        )),
        other => TcpHexError::InvalidHex(other.to_string()),
    })
}

/// Encode bytes as compact uppercase hex.
pub fn encode(bytes: &[u8]) -> String {
    hex::encode_upper(bytes)
}

/// Encode bytes as uppercase hex with a space between bytes.
pub fn encode_spaced(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Canonical compact uppercase form of a hex string.
pub fn normalize(input: &str) -> TcpHexResult<String> {
    decode(input).map(|bytes| encode(&bytes))
}

/// Group the digits of a hex string in pairs, without validating them.
pub fn format_spaced(input: &str) -> String {
    let compact: Vec<char> = input.chars().filter(|c| !c.is_whitespace()).collect();
    compact
        .chunks(2)
        .map(|pair| pair.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(" ")
}
