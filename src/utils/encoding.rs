// Encoding utilities

use encoding_rs::UTF_8;

/// Decode UTF-8 comment text, replacing malformed sequences
pub fn decode_utf8(data: &[u8]) -> String {
    UTF_8.decode(data).0.to_string()
}
