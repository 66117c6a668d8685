// Run-length encoders.
//
// Two strategies share the grammar in `crate::grammar`:
//   - single pass: every maximal run of one character becomes `count char`
//   - multi pass:  chained stride passes, each factoring repeated chunks of a
//                  fixed width into `count(chunk)`; ascending and descending
//                  stride orders are both tried and the shorter result wins

use crate::codec::decoder;
use crate::grammar::{self, CLOSE, OPEN};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Compression strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Strategy {
    /// Single-character runs only.
    SinglePass,
    /// Nested groups found by repeated stride passes.
    #[default]
    MultiPass,
}

/// Configuration for [`encode`].
#[derive(Debug, Clone, Default)]
pub struct EncodeOptions {
    pub strategy: Strategy,
    /// Reject input containing digits or parentheses instead of producing
    /// an encoding that cannot be decoded back.
    pub strict: bool,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("reserved character {ch:?} at offset {offset} cannot be encoded")]
    UnsupportedInput { ch: char, offset: usize },
}

// ---------------------------------------------------------------------------
// Single pass
// ---------------------------------------------------------------------------

/// Collapse every run of identical characters into `count char`.
///
/// `"####$$####$$"` becomes `"4#2$4#2$"`. Runs of one are copied verbatim.
pub fn compress(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut pos = 0;
    while pos < chars.len() {
        let ch = chars[pos];
        let mut end = pos + 1;
        while end < chars.len() && chars[end] == ch {
            end += 1;
        }
        grammar::push_count(&mut out, end - pos);
        out.push(ch);
        pos = end;
    }
    out
}

// ---------------------------------------------------------------------------
// Stride pass
// ---------------------------------------------------------------------------

/// Factor consecutive repeats of `stride`-wide chunks.
///
/// The input is cut into chunks of `stride` characters from the start; a
/// trailing chunk may be shorter and never matches. Each maximal run of equal
/// chunks becomes `count(chunk)`, or `count chunk` when `stride` is 1. Chunks
/// are raw characters, so counts and parentheses left by earlier passes are
/// factored like any other content.
pub fn stride_pass(stride: usize, input: &[char]) -> Vec<char> {
    let stride = stride.max(1);
    let len = input.len();
    let mut out = Vec::with_capacity(len);
    let mut pos = 0;

    while pos < len {
        let chunk = &input[pos..(pos + stride).min(len)];
        let mut next = pos + chunk.len();
        let mut repeats = 1;
        if chunk.len() == stride {
            while next + stride <= len && input[next..next + stride] == *chunk {
                next += stride;
                repeats += 1;
            }
        }

        if repeats > 1 {
            grammar::extend_count(&mut out, repeats);
            if stride == 1 {
                out.extend_from_slice(chunk);
            } else {
                out.push(OPEN);
                out.extend_from_slice(chunk);
                out.push(CLOSE);
            }
        } else {
            out.extend_from_slice(chunk);
        }
        pos = next;
    }
    out
}

// ---------------------------------------------------------------------------
// Multi pass
// ---------------------------------------------------------------------------

/// Chain stride passes over `strides`, starting from `original`.
///
/// A pass can cut through a count or a group boundary left by an earlier
/// pass, which yields text that no longer decodes to `original`. Such passes
/// are dropped and the chain continues from the last good text.
fn traverse(original: &str, strides: impl Iterator<Item = usize>) -> Vec<char> {
    let mut current: Vec<char> = original.chars().collect();
    for stride in strides {
        let candidate = stride_pass(stride, &current);
        if candidate == current {
            continue;
        }
        let text: String = candidate.iter().collect();
        if decoder::decodes_to(&text, original) {
            log::trace!("stride {stride}: {} -> {} chars", current.len(), candidate.len());
            current = candidate;
        } else {
            log::trace!("stride {stride}: pass breaks the encoding, skipped");
        }
    }
    current
}

#[cfg(not(feature = "parallel"))]
fn run_traversals(input: &str, half: usize) -> (Vec<char>, Vec<char>) {
    let ascending = traverse(input, 1..half);
    let descending = traverse(input, (1..=half).rev());
    (ascending, descending)
}

#[cfg(feature = "parallel")]
fn run_traversals(input: &str, half: usize) -> (Vec<char>, Vec<char>) {
    rayon::join(
        || traverse(input, 1..half),
        || traverse(input, (1..=half).rev()),
    )
}

/// Factor nested repeats with two chains of stride passes.
///
/// With `n` input characters, one chain applies strides `1..n/2` in
/// ascending order and the other strides `n/2..=1` in descending order, each
/// pass working on the previous pass's output. The shorter result is
/// returned, the ascending one on a tie.
///
/// `"####$$####$$####$$####$$"` becomes `"4(4#2$)"`.
pub fn multi_pass_compress(input: &str) -> String {
    let half = input.chars().count() / 2;
    if half == 0 {
        return input.to_string();
    }

    let (ascending, descending) = run_traversals(input, half);
    log::debug!(
        "multi-pass: ascending {} chars, descending {} chars",
        ascending.len(),
        descending.len()
    );
    if ascending.len() <= descending.len() {
        ascending.into_iter().collect()
    } else {
        descending.into_iter().collect()
    }
}

// ---------------------------------------------------------------------------
// Configurable entry point
// ---------------------------------------------------------------------------

/// Compress `input` with the configured strategy.
pub fn encode(input: &str, opts: &EncodeOptions) -> Result<String, EncodeError> {
    if opts.strict {
        if let Some((offset, ch)) = grammar::first_reserved(input) {
            return Err(EncodeError::UnsupportedInput { ch, offset });
        }
    }
    let out = match opts.strategy {
        Strategy::SinglePass => compress(input),
        Strategy::MultiPass => multi_pass_compress(input),
    };
    log::debug!(
        "encoded {} chars into {} chars ({:?})",
        input.chars().count(),
        out.chars().count(),
        opts.strategy
    );
    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
