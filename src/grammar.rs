// Compressed text grammar shared by the encoder and the decoder.
//
//   token := run | group
//   run   := [count] literal_char        -- count omitted implies 1
//   group := [count] '(' token* ')'      -- count omitted implies 1
//   count := one or more ASCII digits, base 10, >= 1
//
// Digits and parentheses are control syntax. Literal content that contains
// them cannot be told apart from structure, so the encoder only round-trips
// text free of reserved characters.
//
// Nesting is handled with explicit stacks throughout: `walk` for scanning
// text, `Events` for visiting a token tree, and the `Drop` impl on `Token`.

use std::fmt;

use crate::codec::decoder::DecodeError;

/// Opens a group.
pub const OPEN: char = '(';

/// Closes a group.
pub const CLOSE: char = ')';

/// Default cap on group nesting for parsers and decoders.
pub const DEFAULT_MAX_DEPTH: usize = 4096;

/// Whether `ch` is control syntax rather than literal content.
#[inline]
pub fn is_reserved(ch: char) -> bool {
    ch.is_ascii_digit() || ch == OPEN || ch == CLOSE
}

/// First reserved character in `text`, as `(char offset, char)`.
pub fn first_reserved(text: &str) -> Option<(usize, char)> {
    text.chars().enumerate().find(|&(_, ch)| is_reserved(ch))
}

// ---------------------------------------------------------------------------
// Counts
// ---------------------------------------------------------------------------

/// Read an optional count starting at `pos`.
///
/// Returns the count (1 when no digits are present) and the position of the
/// first character after the digits.
pub fn read_count(chars: &[char], pos: usize) -> Result<(usize, usize), DecodeError> {
    let start = pos;
    let mut pos = pos;
    let mut value: usize = 0;
    while let Some(digit) = chars.get(pos).and_then(|ch| ch.to_digit(10)) {
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(digit as usize))
            .ok_or(DecodeError::CountOverflow { offset: start })?;
        pos += 1;
    }
    if pos == start {
        return Ok((1, pos));
    }
    if value == 0 {
        return Err(DecodeError::ZeroCount { offset: start });
    }
    Ok((value, pos))
}

/// Append the textual form of `count`, eliding a count of 1.
#[inline]
pub fn push_count(out: &mut String, count: usize) {
    if count > 1 {
        out.push_str(&count.to_string());
    }
}

/// Same as [`push_count`] for character buffers.
#[inline]
pub fn extend_count(out: &mut Vec<char>, count: usize) {
    if count > 1 {
        out.extend(count.to_string().chars());
    }
}

// ---------------------------------------------------------------------------
// Walker
// ---------------------------------------------------------------------------

/// Receives the structure of compressed text from [`walk`].
pub trait Visitor {
    /// `count` copies of `ch` inside the innermost open group.
    fn run(&mut self, count: usize, ch: char) -> Result<(), DecodeError>;

    /// A group repeated `count` times starts.
    fn open(&mut self, count: usize) -> Result<(), DecodeError>;

    /// The innermost open group ends.
    fn close(&mut self) -> Result<(), DecodeError>;
}

/// Where [`walk`] stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Walk {
    /// Characters consumed, including the terminating `)` when `closed`.
    pub consumed: usize,
    /// Stopped at a `)` with no group of its own open.
    pub closed: bool,
}

/// Scan compressed text and report its structure to `visitor`.
///
/// Scanning stops at the end of input or at a `)` that closes no group opened
/// during this walk. Syntax errors carry character offsets. Errors returned by
/// the visitor abort the walk and are passed through.
pub fn walk<V: Visitor>(
    input: &str,
    max_depth: usize,
    visitor: &mut V,
) -> Result<Walk, DecodeError> {
    let chars: Vec<char> = input.chars().collect();
    // Offset of the '(' of every open group.
    let mut opens: Vec<usize> = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        if chars[pos] == CLOSE {
            pos += 1;
            if opens.pop().is_none() {
                return Ok(Walk {
                    consumed: pos,
                    closed: true,
                });
            }
            visitor.close()?;
            continue;
        }

        let (count, next) = read_count(&chars, pos)?;
        pos = next;
        match chars.get(pos) {
            None | Some(&CLOSE) => return Err(DecodeError::MissingUnit { offset: pos }),
            Some(&OPEN) => {
                if opens.len() >= max_depth {
                    return Err(DecodeError::NestingTooDeep {
                        offset: pos,
                        limit: max_depth,
                    });
                }
                opens.push(pos);
                visitor.open(count)?;
            }
            Some(&ch) => visitor.run(count, ch)?,
        }
        pos += 1;
    }

    if let Some(&open) = opens.last() {
        return Err(DecodeError::UnclosedGroup { offset: open });
    }
    Ok(Walk {
        consumed: pos,
        closed: false,
    })
}

// ---------------------------------------------------------------------------
// Token tree
// ---------------------------------------------------------------------------

/// One parsed token of the compressed grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// `count` copies of a literal character.
    Run { count: usize, ch: char },
    /// `count` copies of the expansion of `tokens`.
    Group { count: usize, tokens: Vec<Token> },
}

impl Token {
    /// Length of the expansion in characters, saturating at `usize::MAX`.
    pub fn expanded_len(&self) -> usize {
        expanded_len(std::slice::from_ref(self))
    }

    /// Deepest group nesting below and including this token.
    pub fn depth(&self) -> usize {
        depth(std::slice::from_ref(self))
    }
}

impl Drop for Token {
    fn drop(&mut self) {
        let Self::Group { tokens, .. } = self else {
            return;
        };
        let mut pending = std::mem::take(tokens);
        while let Some(mut token) = pending.pop() {
            if let Self::Group { tokens, .. } = &mut token {
                pending.append(tokens);
            }
        }
    }
}

fn write_count<W: fmt::Write>(out: &mut W, count: usize) -> fmt::Result {
    if count > 1 {
        write!(out, "{count}")?;
    }
    Ok(())
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for event in events(std::slice::from_ref(self)) {
            match event {
                Event::Run { count, ch, .. } => {
                    write_count(f, count)?;
                    write!(f, "{ch}")?;
                }
                Event::Open { count, .. } => {
                    write_count(f, count)?;
                    write!(f, "{OPEN}")?;
                }
                Event::Close { .. } => write!(f, "{CLOSE}")?,
            }
        }
        Ok(())
    }
}

/// One step of a depth-first visit of a token tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event<'a> {
    Run {
        count: usize,
        ch: char,
        depth: usize,
    },
    Open {
        count: usize,
        tokens: &'a [Token],
        depth: usize,
    },
    Close {
        count: usize,
        depth: usize,
    },
}

/// Depth-first iterator over a token tree, see [`events`].
pub struct Events<'a> {
    // (repeat count, remaining children) per open group, top level first.
    stack: Vec<(usize, std::slice::Iter<'a, Token>)>,
}

impl<'a> Iterator for Events<'a> {
    type Item = Event<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let depth = self.stack.len().checked_sub(1)?;
        let (group_count, children) = self.stack.last_mut()?;
        match children.next() {
            Some(Token::Run { count, ch }) => Some(Event::Run {
                count: *count,
                ch: *ch,
                depth,
            }),
            Some(Token::Group { count, tokens }) => {
                self.stack.push((*count, tokens.iter()));
                Some(Event::Open {
                    count: *count,
                    tokens,
                    depth,
                })
            }
            None => {
                let count = *group_count;
                self.stack.pop();
                // The top level has no closing event.
                (depth > 0).then(|| Event::Close {
                    count,
                    depth: depth - 1,
                })
            }
        }
    }
}

/// Visit `tokens` depth first. Every `Open` is matched by a `Close` with the
/// same depth, where depth 0 is the top level.
pub fn events(tokens: &[Token]) -> Events<'_> {
    Events {
        stack: vec![(1, tokens.iter())],
    }
}

fn bump(totals: &mut [usize], n: usize) {
    if let Some(top) = totals.last_mut() {
        *top = top.saturating_add(n);
    }
}

/// Total expansion length of a token sequence, saturating at `usize::MAX`.
pub fn expanded_len(tokens: &[Token]) -> usize {
    // Running total per open group, top level first.
    let mut totals = vec![0usize];
    for event in events(tokens) {
        match event {
            Event::Run { count, .. } => bump(&mut totals, count),
            Event::Open { .. } => totals.push(0),
            Event::Close { count, .. } => {
                let inner = totals.pop().unwrap_or(0);
                bump(&mut totals, inner.saturating_mul(count));
            }
        }
    }
    totals.first().copied().unwrap_or(0)
}

/// Deepest group nesting in a token sequence.
pub fn depth(tokens: &[Token]) -> usize {
    events(tokens)
        .filter_map(|event| match event {
            Event::Open { depth, .. } => Some(depth + 1),
            _ => None,
        })
        .max()
        .unwrap_or(0)
}

/// Render a token sequence back into compressed text.
pub fn render(tokens: &[Token]) -> String {
    tokens.iter().map(Token::to_string).collect()
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Default)]
struct TreeBuilder {
    root: Vec<Token>,
    open: Vec<(usize, Vec<Token>)>,
}

impl TreeBuilder {
    fn current(&mut self) -> &mut Vec<Token> {
        match self.open.last_mut() {
            Some((_, tokens)) => tokens,
            None => &mut self.root,
        }
    }
}

impl Visitor for TreeBuilder {
    fn run(&mut self, count: usize, ch: char) -> Result<(), DecodeError> {
        self.current().push(Token::Run { count, ch });
        Ok(())
    }

    fn open(&mut self, count: usize) -> Result<(), DecodeError> {
        self.open.push((count, Vec::new()));
        Ok(())
    }

    fn close(&mut self) -> Result<(), DecodeError> {
        if let Some((count, tokens)) = self.open.pop() {
            self.current().push(Token::Group { count, tokens });
        }
        Ok(())
    }
}

/// Parse compressed text into a token tree.
///
/// Nesting beyond `max_depth` is rejected.
pub fn parse(input: &str, max_depth: usize) -> Result<Vec<Token>, DecodeError> {
    let mut builder = TreeBuilder::default();
    let walked = walk(input, max_depth, &mut builder)?;
    if walked.closed {
        return Err(DecodeError::UnmatchedClose {
            offset: walked.consumed - 1,
        });
    }
    Ok(builder.root)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn reserved_characters() {
        for ch in "0123456789()".chars() {
            assert!(is_reserved(ch), "{ch:?}");
        }
        for ch in "#$@+*. _abcXYZ|\né".chars() {
            assert!(!is_reserved(ch), "{ch:?}");
        }
        assert_eq!(first_reserved("ab(c"), Some((2, '(')));
        assert_eq!(first_reserved("héllo7"), Some((5, '7')));
        assert_eq!(first_reserved("####$$"), None);
    }

    #[test]
    fn read_count_defaults_to_one() {
        assert_eq!(read_count(&chars("#"), 0).unwrap(), (1, 0));
        assert_eq!(read_count(&chars(""), 0).unwrap(), (1, 0));
    }

    #[test]
    fn read_count_multi_digit() {
        assert_eq!(read_count(&chars("123a"), 0).unwrap(), (123, 3));
        assert_eq!(read_count(&chars("x42(ab)"), 1).unwrap(), (42, 3));
        assert_eq!(read_count(&chars("007a"), 0).unwrap(), (7, 3));
    }

    #[test]
    fn read_count_rejects_zero_and_overflow() {
        assert_eq!(
            read_count(&chars("00a"), 0),
            Err(DecodeError::ZeroCount { offset: 0 })
        );
        let huge = format!("a{}0b", usize::MAX);
        assert_eq!(
            read_count(&chars(&huge), 1),
            Err(DecodeError::CountOverflow { offset: 1 })
        );
    }

    #[test]
    fn push_count_elides_one() {
        let mut s = String::new();
        push_count(&mut s, 1);
        assert!(s.is_empty());
        push_count(&mut s, 12);
        assert_eq!(s, "12");

        let mut v = Vec::new();
        extend_count(&mut v, 1);
        extend_count(&mut v, 305);
        assert_eq!(v, vec!['3', '0', '5']);
    }

    #[derive(Default)]
    struct Trace(Vec<String>);

    impl Visitor for Trace {
        fn run(&mut self, count: usize, ch: char) -> Result<(), DecodeError> {
            self.0.push(format!("run {count} {ch}"));
            Ok(())
        }
        fn open(&mut self, count: usize) -> Result<(), DecodeError> {
            self.0.push(format!("open {count}"));
            Ok(())
        }
        fn close(&mut self) -> Result<(), DecodeError> {
            self.0.push("close".into());
            Ok(())
        }
    }

    #[test]
    fn walk_reports_structure() {
        let mut trace = Trace::default();
        let walked = walk("2(a3b)c)x", DEFAULT_MAX_DEPTH, &mut trace).unwrap();
        assert_eq!(
            walked,
            Walk {
                consumed: 8,
                closed: true
            }
        );
        assert_eq!(
            trace.0,
            ["open 2", "run 1 a", "run 3 b", "close", "run 1 c"]
        );
    }

    #[test]
    fn walk_stops_on_visitor_error() {
        struct Refuse;
        impl Visitor for Refuse {
            fn run(&mut self, _: usize, _: char) -> Result<(), DecodeError> {
                Err(DecodeError::OutputLimit { limit: 0 })
            }
            fn open(&mut self, _: usize) -> Result<(), DecodeError> {
                Ok(())
            }
            fn close(&mut self) -> Result<(), DecodeError> {
                Ok(())
            }
        }
        // The unclosed group is never reached.
        assert_eq!(
            walk("(a", DEFAULT_MAX_DEPTH, &mut Refuse),
            Err(DecodeError::OutputLimit { limit: 0 })
        );
    }

    #[test]
    fn parse_runs_and_groups() {
        let tokens = parse("4(4#2$)x", DEFAULT_MAX_DEPTH).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Group {
                    count: 4,
                    tokens: vec![
                        Token::Run { count: 4, ch: '#' },
                        Token::Run { count: 2, ch: '$' },
                    ],
                },
                Token::Run { count: 1, ch: 'x' },
            ]
        );
        assert_eq!(expanded_len(&tokens), 25);
        assert_eq!(tokens[0].expanded_len(), 24);
        assert_eq!(tokens[0].depth(), 1);
        assert_eq!(tokens[1].depth(), 0);
    }

    #[test]
    fn events_are_depth_first() {
        let tokens = parse("2(a(b))c", DEFAULT_MAX_DEPTH).unwrap();
        let shape: Vec<String> = events(&tokens)
            .map(|event| match event {
                Event::Run { ch, depth, .. } => format!("{depth}:{ch}"),
                Event::Open { count, depth, .. } => format!("{depth}:open{count}"),
                Event::Close { count, depth } => format!("{depth}:close{count}"),
            })
            .collect();
        assert_eq!(
            shape,
            ["0:open2", "1:a", "1:open1", "2:b", "1:close1", "0:close2", "0:c"]
        );
        assert_eq!(depth(&tokens), 2);
        assert_eq!(events(&[]).count(), 0);
    }

    #[test]
    fn parse_then_render_is_canonical() {
        for text in ["", "abc", "4#2$", "4(4#2$)", "2(a3(bc)d)e", "10(ab)"] {
            let tokens = parse(text, DEFAULT_MAX_DEPTH).unwrap();
            assert_eq!(render(&tokens), text);
        }
        // Explicit counts of one are dropped on render.
        let tokens = parse("1a1(b)", DEFAULT_MAX_DEPTH).unwrap();
        assert_eq!(render(&tokens), "a(b)");
    }

    #[test]
    fn parse_errors_carry_offsets() {
        assert_eq!(
            parse("ab)", DEFAULT_MAX_DEPTH),
            Err(DecodeError::UnmatchedClose { offset: 2 })
        );
        assert_eq!(
            parse("a2(bc", DEFAULT_MAX_DEPTH),
            Err(DecodeError::UnclosedGroup { offset: 2 })
        );
        assert_eq!(
            parse("ab12", DEFAULT_MAX_DEPTH),
            Err(DecodeError::MissingUnit { offset: 4 })
        );
        assert_eq!(
            parse("2(a3)", DEFAULT_MAX_DEPTH),
            Err(DecodeError::MissingUnit { offset: 4 })
        );
    }

    #[test]
    fn parse_depth_limit() {
        let deep = format!("{}a{}", "(".repeat(5), ")".repeat(5));
        assert!(parse(&deep, 5).is_ok());
        assert_eq!(
            parse(&deep, 4),
            Err(DecodeError::NestingTooDeep {
                offset: 4,
                limit: 4
            })
        );
    }

    #[test]
    fn million_deep_tree_is_walked_and_dropped_iteratively() {
        let levels = 1_000_000;
        let text = format!("{}a{}", "(".repeat(levels), ")".repeat(levels));
        let tokens = parse(&text, usize::MAX).unwrap();
        assert_eq!(depth(&tokens), levels);
        assert_eq!(expanded_len(&tokens), 1);
        assert_eq!(render(&tokens), text);
        drop(tokens);

        // Partial trees left behind by an error are dropped too.
        let unclosed = "(".repeat(levels) + "a";
        assert_eq!(
            parse(&unclosed, usize::MAX),
            Err(DecodeError::UnclosedGroup { offset: levels - 1 })
        );
    }

    #[test]
    fn expanded_len_saturates() {
        let token = Token::Group {
            count: usize::MAX,
            tokens: vec![Token::Run { count: 2, ch: 'a' }],
        };
        assert_eq!(token.expanded_len(), usize::MAX);
    }
}
