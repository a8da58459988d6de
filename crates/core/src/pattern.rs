// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event subscription pattern matching.
//!
//! Patterns are event strings with two wildcards: `*` matches any run of
//! characters (including none), `#` matches one or more characters. The
//! whole pattern must cover the whole event string.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    /// `*` — zero or more characters
    Star,
    /// `#` — one or more characters
    Hash,
}

/// A compiled subscription pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    source: String,
    tokens: Vec<Token>,
}

impl Pattern {
    /// Does the string contain any wildcard characters?
    pub fn is_wildcard(s: &str) -> bool {
        s.contains('*') || s.contains('#')
    }

    pub fn compile(source: &str) -> Self {
        let mut tokens = Vec::new();
        let mut literal = String::new();
        for ch in source.chars() {
            match ch {
                '*' | '#' => {
                    if !literal.is_empty() {
                        tokens.push(Token::Literal(std::mem::take(&mut literal)));
                    }
                    tokens.push(if ch == '*' { Token::Star } else { Token::Hash });
                }
                _ => literal.push(ch),
            }
        }
        if !literal.is_empty() {
            tokens.push(Token::Literal(literal));
        }
        Self {
            source: source.to_string(),
            tokens,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Match the full event string against this pattern.
    pub fn matches(&self, event: &str) -> bool {
        match_tokens(&self.tokens, event)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

fn match_tokens(tokens: &[Token], s: &str) -> bool {
    let Some((first, rest)) = tokens.split_first() else {
        return s.is_empty();
    };
    match first {
        Token::Literal(lit) => s
            .strip_prefix(lit.as_str())
            .is_some_and(|tail| match_tokens(rest, tail)),
        Token::Star => splits(s, 0).any(|tail| match_tokens(rest, tail)),
        Token::Hash => splits(s, 1).any(|tail| match_tokens(rest, tail)),
    }
}

/// All suffixes of `s` obtained by consuming at least `min` characters.
fn splits(s: &str, min: usize) -> impl Iterator<Item = &str> {
    s.char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(s.len()))
        .skip(min)
        .map(move |i| &s[i..])
}

#[cfg(test)]
#[path = "pattern_tests.rs"]
mod tests;
