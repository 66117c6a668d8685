// Run-length codec over text.
//
// - `encoder` — single-pass and multi-pass compression
// - `decoder` — explicit-stack expander and decompression

pub mod decoder;
pub mod encoder;

pub use decoder::{DecodeError, DecodeOptions, Expansion, decode, decompress, expand};
pub use encoder::{
    EncodeError, EncodeOptions, Strategy, compress, encode, multi_pass_compress, stride_pass,
};
