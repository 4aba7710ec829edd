//! Input decoding.
//!
//! The engine lints text; callers that start from raw bytes go through a
//! [`Decoder`] first. Encoding *detection* (UTF-16, latin-1 fallbacks, ...)
//! is deliberately not handled here — [`Utf8Decoder`] covers the common case
//! and anything smarter lives with the caller.

use crate::error::{Result, YamllintError};

/// Turns raw file bytes into lintable text.
pub trait Decoder {
    /// Decode `input` into a string, or fail with a decode error.
    fn decode(&self, input: &[u8]) -> Result<String>;
}

/// UTF-8 decoder. Strips a leading byte-order mark if present.
#[derive(Debug, Default, Clone, Copy)]
pub struct Utf8Decoder;

const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

impl Decoder for Utf8Decoder {
    fn decode(&self, input: &[u8]) -> Result<String> {
        let input = input.strip_prefix(UTF8_BOM).unwrap_or(input);
        String::from_utf8(input.to_vec()).map_err(|e| YamllintError::Decode {
            message: e.to_string(),
        })
    }
}
