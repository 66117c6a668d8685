// Decoder for the compressed text grammar.
//
// `grammar::walk` drives an `Expander` through the input once. Every '('
// pushes a frame holding the group's repeat count and its own output buffer;
// the matching ')' pops the frame and appends the buffer `count` times to the
// parent. Nesting lives on the heap, never on the call stack.
//
// The output limit applies to everything buffered at once: the top-level
// text plus the text of every open frame.

use crate::grammar::{self, Visitor};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Malformed compressed input. Offsets are character offsets into the input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("count at offset {offset} has no unit to repeat")]
    MissingUnit { offset: usize },
    #[error("group opened at offset {offset} is never closed")]
    UnclosedGroup { offset: usize },
    #[error("unmatched ')' at offset {offset}")]
    UnmatchedClose { offset: usize },
    #[error("zero repeat count at offset {offset}")]
    ZeroCount { offset: usize },
    #[error("repeat count at offset {offset} overflows")]
    CountOverflow { offset: usize },
    #[error("group at offset {offset} exceeds the nesting limit of {limit}")]
    NestingTooDeep { offset: usize, limit: usize },
    #[error("decoded output exceeds the limit of {limit} bytes")]
    OutputLimit { limit: usize },
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Default cap on decoded output (1 GiB).
pub const DEFAULT_MAX_OUTPUT: usize = 1 << 30;

/// Resource limits for decoding untrusted input.
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// Maximum bytes buffered while decoding, across all open groups, which
    /// also bounds the decoded size. `None` disables the check.
    pub max_output: Option<usize>,
    /// Maximum group nesting.
    pub max_depth: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_output: Some(DEFAULT_MAX_OUTPUT),
            max_depth: grammar::DEFAULT_MAX_DEPTH,
        }
    }
}

// ---------------------------------------------------------------------------
// Expander
// ---------------------------------------------------------------------------

/// Result of expanding one token sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    /// Fully expanded text.
    pub text: String,
    /// Characters consumed from the input, including the terminating `)`
    /// when `closed` is set.
    pub consumed: usize,
    /// Parsing stopped at a `)` that closes an enclosing group.
    pub closed: bool,
}

struct Frame {
    count: usize,
    text: String,
}

struct Expander {
    root: String,
    frames: Vec<Frame>,
    // Bytes held by `root` and every frame's text.
    buffered: usize,
    max_output: Option<usize>,
}

impl Expander {
    /// Append `count` copies of `unit` to the innermost open buffer.
    fn append(&mut self, unit: &str, count: usize) -> Result<(), DecodeError> {
        if unit.is_empty() {
            return Ok(());
        }
        let limit = self.max_output.unwrap_or(usize::MAX);
        let total = unit
            .len()
            .checked_mul(count)
            .and_then(|added| self.buffered.checked_add(added))
            .filter(|&total| total <= limit)
            .ok_or(DecodeError::OutputLimit { limit })?;

        let out = match self.frames.last_mut() {
            Some(frame) => &mut frame.text,
            None => &mut self.root,
        };
        out.reserve(total - self.buffered);
        for _ in 0..count {
            out.push_str(unit);
        }
        self.buffered = total;
        Ok(())
    }
}

impl Visitor for Expander {
    fn run(&mut self, count: usize, ch: char) -> Result<(), DecodeError> {
        let mut buf = [0u8; 4];
        self.append(ch.encode_utf8(&mut buf), count)
    }

    fn open(&mut self, count: usize) -> Result<(), DecodeError> {
        self.frames.push(Frame {
            count,
            text: String::new(),
        });
        Ok(())
    }

    fn close(&mut self) -> Result<(), DecodeError> {
        let Some(frame) = self.frames.pop() else {
            return Ok(());
        };
        self.buffered -= frame.text.len();
        self.append(&frame.text, frame.count)
    }
}

/// Expand tokens from the start of `input` until the input ends or a `)`
/// closes an enclosing group.
///
/// This is the building block for nested decoding: a caller that has just
/// consumed a `(` can expand the remainder and resume at `consumed`.
pub fn expand(input: &str, opts: &DecodeOptions) -> Result<Expansion, DecodeError> {
    let capacity = input.len().min(opts.max_output.unwrap_or(usize::MAX));
    let mut expander = Expander {
        root: String::with_capacity(capacity),
        frames: Vec::new(),
        buffered: 0,
        max_output: opts.max_output,
    };
    let walked = grammar::walk(input, opts.max_depth, &mut expander)?;
    Ok(Expansion {
        text: expander.root,
        consumed: walked.consumed,
        closed: walked.closed,
    })
}

/// Decode compressed text with explicit limits.
pub fn decode(input: &str, opts: &DecodeOptions) -> Result<String, DecodeError> {
    let expansion = expand(input, opts)?;
    if expansion.closed {
        return Err(DecodeError::UnmatchedClose {
            offset: expansion.consumed - 1,
        });
    }
    log::debug!(
        "decoded {} chars into {} bytes",
        expansion.consumed,
        expansion.text.len()
    );
    Ok(expansion.text)
}

/// Decode text produced by either compression strategy.
///
/// Text without digits or parentheses decodes to itself.
pub fn decompress(input: &str) -> Result<String, DecodeError> {
    decode(input, &DecodeOptions::default())
}

/// Whether `encoded` decodes to exactly `expected`.
///
/// Decoding stops as soon as the output would outgrow `expected`.
pub fn decodes_to(encoded: &str, expected: &str) -> bool {
    let opts = DecodeOptions {
        max_output: Some(expected.len()),
        ..Default::default()
    };
    decode(encoded, &opts).is_ok_and(|text| text == expected)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
