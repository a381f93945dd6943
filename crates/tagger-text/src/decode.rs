//! Input decoding
//!
//! Documents are expected in UTF-8. Bytes that are not valid UTF-8 are
//! read as ISO-8859-1, which maps every byte to a char and so never fails.

use std::borrow::Cow;

/// Decode raw document bytes, falling back to Latin-1
pub fn decode_document(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(e) => {
            tracing::debug!(
                valid_up_to = e.valid_up_to(),
                len = bytes.len(),
                "Input is not UTF-8, decoding as Latin-1"
            );
            Cow::Owned(bytes.iter().map(|&b| b as char).collect())
        }
    }
}
