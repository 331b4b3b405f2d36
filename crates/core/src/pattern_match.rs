//! Regular expression subset used by the MATCH evaluator.
//!
//! Patterns are compiled once into a list of quantified atoms and then
//! matched by backtracking. Supported syntax:
//!
//! - `.` any character, literal characters and `\` escapes
//! - `\d` `\D` `\w` `\W` `\s` `\S`
//! - `[abc]` `[a-z]` `[^abc]`
//! - `*` `+` `?` (greedy)
//! - `^` and `$` anchors
//!
//! A pattern without `^` matches anywhere in the input.
//!
//! ```
//! use strata_core::pattern_match::Pattern;
//! let p = Pattern::compile("^[A-Z][a-z]+\\d*$").unwrap();
//! assert!(p.is_match("Alice42"));
//! assert!(!p.is_match("alice"));
//! ```

use crate::error::{Error, Result};
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

#[derive(Clone, Debug, PartialEq)]
enum Atom {
    Any,
    Literal(char),
    Digit { negated: bool },
    Word { negated: bool },
    Space { negated: bool },
    Set { items: Vec<(char, char)>, negated: bool },
}

impl Atom {
    fn accepts(&self, c: char) -> bool {
        match self {
            Atom::Any => true,
            Atom::Literal(l) => *l == c,
            Atom::Digit { negated } => c.is_ascii_digit() != *negated,
            Atom::Word { negated } => (c.is_alphanumeric() || c == '_') != *negated,
            Atom::Space { negated } => c.is_whitespace() != *negated,
            Atom::Set { items, negated } => {
                items.iter().any(|(lo, hi)| *lo <= c && c <= *hi) != *negated
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Repeat {
    One,
    ZeroOrOne,
    ZeroOrMore,
    OneOrMore,
}

#[derive(Clone, Debug, PartialEq)]
struct Piece {
    atom: Atom,
    repeat: Repeat,
}

/// A compiled pattern.
#[derive(Clone, Debug, PartialEq)]
pub struct Pattern {
    source: String,
    pieces: Vec<Piece>,
    anchored_start: bool,
    anchored_end: bool,
}

impl Pattern {
    /// Compiles `source`, failing with `InvalidQuery` on malformed input.
    pub fn compile(source: &str) -> Result<Self> {
        let mut chars: Vec<char> = source.chars().collect();
        let anchored_start = chars.first() == Some(&'^');
        if anchored_start {
            chars.remove(0);
        }
        let anchored_end = chars.len() >= 1
            && chars[chars.len() - 1] == '$'
            && !(chars.len() >= 2 && chars[chars.len() - 2] == '\\');
        if anchored_end {
            chars.pop();
        }

        let mut pieces = Vec::new();
        let mut i = 0;
        while i < chars.len() {
            let (atom, consumed) = parse_atom(&chars, i, source)?;
            i += consumed;
            let repeat = match chars.get(i) {
                Some('*') => Repeat::ZeroOrMore,
                Some('+') => Repeat::OneOrMore,
                Some('?') => Repeat::ZeroOrOne,
                _ => Repeat::One,
            };
            if repeat != Repeat::One {
                i += 1;
            }
            pieces.push(Piece { atom, repeat });
        }

        Ok(Self {
            source: source.into(),
            pieces,
            anchored_start,
            anchored_end,
        })
    }

    /// The pattern text as given to `compile`.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns true if the pattern matches `input`.
    pub fn is_match(&self, input: &str) -> bool {
        let text: Vec<char> = input.chars().collect();
        let last_start = if self.anchored_start { 0 } else { text.len() };
        (0..=last_start).any(|start| self.match_from(&text, start, 0))
    }

    fn match_from(&self, text: &[char], pos: usize, piece: usize) -> bool {
        let Some(p) = self.pieces.get(piece) else {
            return !self.anchored_end || pos == text.len();
        };
        let accepts = |at: usize| at < text.len() && p.atom.accepts(text[at]);
        match p.repeat {
            Repeat::One => accepts(pos) && self.match_from(text, pos + 1, piece + 1),
            Repeat::ZeroOrOne => {
                (accepts(pos) && self.match_from(text, pos + 1, piece + 1))
                    || self.match_from(text, pos, piece + 1)
            }
            Repeat::ZeroOrMore | Repeat::OneOrMore => {
                let mut end = pos;
                while accepts(end) {
                    end += 1;
                }
                let min = if p.repeat == Repeat::OneOrMore { pos + 1 } else { pos };
                if end < min {
                    return false;
                }
                (min..=end).rev().any(|at| self.match_from(text, at, piece + 1))
            }
        }
    }
}

fn parse_atom(chars: &[char], i: usize, source: &str) -> Result<(Atom, usize)> {
    match chars[i] {
        '.' => Ok((Atom::Any, 1)),
        '*' | '+' | '?' => Err(Error::invalid_query(format!(
            "Dangling quantifier in pattern: {}",
            source
        ))),
        '\\' => {
            let escaped = *chars.get(i + 1).ok_or_else(|| {
                Error::invalid_query(format!("Trailing escape in pattern: {}", source))
            })?;
            let atom = match escaped {
                'd' => Atom::Digit { negated: false },
                'D' => Atom::Digit { negated: true },
                'w' => Atom::Word { negated: false },
                'W' => Atom::Word { negated: true },
                's' => Atom::Space { negated: false },
                'S' => Atom::Space { negated: true },
                other => Atom::Literal(other),
            };
            Ok((atom, 2))
        }
        '[' => parse_set(chars, i, source),
        c => Ok((Atom::Literal(c), 1)),
    }
}

fn parse_set(chars: &[char], open: usize, source: &str) -> Result<(Atom, usize)> {
    let mut i = open + 1;
    let negated = chars.get(i) == Some(&'^');
    if negated {
        i += 1;
    }
    let mut items = Vec::new();
    while i < chars.len() && chars[i] != ']' {
        let lo = chars[i];
        if i + 2 < chars.len() && chars[i + 1] == '-' && chars[i + 2] != ']' {
            items.push((lo, chars[i + 2]));
            i += 3;
        } else {
            items.push((lo, lo));
            i += 1;
        }
    }
    if i >= chars.len() {
        return Err(Error::invalid_query(format!(
            "Unterminated character class in pattern: {}",
            source
        )));
    }
    Ok((Atom::Set { items, negated }, i + 1 - open))
}
