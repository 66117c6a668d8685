//! textrle: run-length encoding for printable text.
//!
//! The crate provides:
//! - Single-pass compression of character runs (`compress`)
//! - Multi-pass compression into nested repeat groups (`multi_pass_compress`)
//! - A decompressor for both forms (`decompress`)
//! - The shared grammar and a tokenizer (`grammar`)
//! - File-oriented helpers (`io`)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```
//! let level = "####$$####$$####$$####$$";
//!
//! assert_eq!(textrle::compress(level), "4#2$4#2$4#2$4#2$");
//! assert_eq!(textrle::multi_pass_compress(level), "4(4#2$)");
//! assert_eq!(textrle::decompress("4(4#2$)").unwrap(), level);
//! ```
//!
//! Digits and parentheses are control syntax; text containing them does not
//! survive a round trip. Use [`codec::EncodeOptions::strict`] to reject it.

pub mod codec;
pub mod grammar;
pub mod io;

#[cfg(feature = "cli")]
pub mod cli;

pub use codec::{compress, decompress, multi_pass_compress};
