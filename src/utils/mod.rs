// Shared helpers: bit-level reads and text decoding

pub mod bits;
pub mod encoding;
