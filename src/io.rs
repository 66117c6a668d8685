// Stream- and file-level helpers for compressing and decompressing text.
//
// Input is read fully into memory (the codec works on materialized text) and
// must be valid UTF-8. Output goes through a `BufWriter`. With the `file-io`
// feature, a SHA-256 digest of the plain text is reported in the stats.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

#[cfg(feature = "file-io")]
use sha2::Digest;

use crate::codec::decoder::{self, DecodeError, DecodeOptions};
use crate::codec::encoder::{self, EncodeError, EncodeOptions, Strategy};

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Statistics returned by `compress_stream()` / `compress_file()`.
#[derive(Debug, Clone)]
pub struct CompressStats {
    /// Plain text size in bytes.
    pub input_size: u64,
    /// Compressed text size in bytes.
    pub output_size: u64,
    /// Plain text length in characters.
    pub input_chars: u64,
    /// Compressed text length in characters.
    pub output_chars: u64,
    /// Strategy used.
    pub strategy: Strategy,
    /// SHA-256 of the plain text (if `file-io` feature is enabled).
    pub input_sha256: Option<[u8; 32]>,
}

impl CompressStats {
    /// Plain size over compressed size (1.0 for empty input).
    pub fn ratio(&self) -> f64 {
        if self.output_size == 0 {
            return 1.0;
        }
        self.input_size as f64 / self.output_size as f64
    }
}

/// Statistics returned by `decompress_stream()` / `decompress_file()`.
#[derive(Debug, Clone)]
pub struct DecompressStats {
    /// Compressed text size in bytes.
    pub input_size: u64,
    /// Plain text size in bytes.
    pub output_size: u64,
    /// SHA-256 of the plain text (if `file-io` feature is enabled).
    pub output_sha256: Option<[u8; 32]>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for stream and file operations.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// I/O error (file open, read, write, invalid UTF-8).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Compression error.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),
    /// Decompression error.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
}

const BUF_SIZE: usize = 64 * 1024; // 64 KiB

#[cfg(feature = "file-io")]
fn sha256(data: &[u8]) -> Option<[u8; 32]> {
    Some(sha2::Sha256::digest(data).into())
}

#[cfg(not(feature = "file-io"))]
fn sha256(_data: &[u8]) -> Option<[u8; 32]> {
    None
}

/// Lowercase hex form of a digest.
pub fn hex_digest(digest: &[u8; 32]) -> String {
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Read all of `reader` as UTF-8 text.
pub fn read_text<R: Read>(reader: &mut R) -> io::Result<String> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    Ok(text)
}

// ---------------------------------------------------------------------------
// Streams
// ---------------------------------------------------------------------------

/// Compress everything read from `reader` into `writer`.
pub fn compress_stream<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    opts: &EncodeOptions,
) -> Result<CompressStats, IoError> {
    let input = read_text(reader)?;
    let output = encoder::encode(&input, opts)?;
    writer.write_all(output.as_bytes())?;
    writer.flush()?;

    Ok(CompressStats {
        input_size: input.len() as u64,
        output_size: output.len() as u64,
        input_chars: input.chars().count() as u64,
        output_chars: output.chars().count() as u64,
        strategy: opts.strategy,
        input_sha256: sha256(input.as_bytes()),
    })
}

/// Decompress everything read from `reader` into `writer`.
pub fn decompress_stream<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    opts: &DecodeOptions,
) -> Result<DecompressStats, IoError> {
    let input = read_text(reader)?;
    let output = decoder::decode(&input, opts)?;
    writer.write_all(output.as_bytes())?;
    writer.flush()?;

    Ok(DecompressStats {
        input_size: input.len() as u64,
        output_size: output.len() as u64,
        output_sha256: sha256(output.as_bytes()),
    })
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

/// Compress the text file at `input_path` into `output_path`.
///
/// The output file is only created once the input has been read and encoded.
pub fn compress_file(
    input_path: &Path,
    output_path: &Path,
    opts: &EncodeOptions,
) -> Result<CompressStats, IoError> {
    let mut reader = BufReader::with_capacity(BUF_SIZE, File::open(input_path)?);
    let mut encoded = Vec::new();
    let stats = compress_stream(&mut reader, &mut encoded, opts)?;
    write_file(output_path, &encoded)?;
    Ok(stats)
}

/// Decompress the file at `input_path` into `output_path`.
///
/// Nothing is written if the input is malformed.
pub fn decompress_file(
    input_path: &Path,
    output_path: &Path,
    opts: &DecodeOptions,
) -> Result<DecompressStats, IoError> {
    let mut reader = BufReader::with_capacity(BUF_SIZE, File::open(input_path)?);
    let mut decoded = Vec::new();
    let stats = decompress_stream(&mut reader, &mut decoded, opts)?;
    write_file(output_path, &decoded)?;
    Ok(stats)
}

fn write_file(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut writer = BufWriter::with_capacity(BUF_SIZE, File::create(path)?);
    writer.write_all(data)?;
    writer.flush()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
