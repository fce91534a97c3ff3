//! Tokenizer for gtk-doc inline reference syntax.
//!
//! At each position the patterns are tried in priority order and the first
//! one that matches wins. `SPACE` and the single-character `OTHER` fallback
//! make the grammar total: every input tokenizes, and the token texts
//! concatenate back to the input.

use lazy_static::lazy_static;
use regex::Regex;

/// Kinds of inline token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// `@param`, `*@param`
    Param,
    /// `Type.vfunc()`
    VFunc,
    /// `Type::signal-name`
    FullSignal,
    /// `::signal-name`
    Signal,
    /// `Type:property-name`
    FullProperty,
    /// `:property-name`
    Property,
    /// `Type.field`
    Field,
    /// `#Type`, `%CONSTANT`, `identifier`, `Type*`
    Id,
    /// One whitespace character
    Space,
    /// Anything else, one character at a time
    Other,
}

/// A token borrowing its text from the scanned input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
}

lazy_static! {
    static ref PATTERNS: Vec<(TokenKind, Regex)> = vec![
        (TokenKind::Param, Regex::new(r"^\*?@[A-Za-z0-9_]+").unwrap()),
        (
            TokenKind::VFunc,
            Regex::new(r"^[#%]?[A-Za-z0-9_]+\.[A-Za-z0-9_]+\(\)").unwrap()
        ),
        (
            TokenKind::FullSignal,
            Regex::new(r"^[#%]?[A-Za-z0-9_]+::[A-Za-z][A-Za-z0-9_\-]*").unwrap()
        ),
        (TokenKind::Signal, Regex::new(r"^::[A-Za-z][A-Za-z0-9_\-]*").unwrap()),
        (
            TokenKind::FullProperty,
            Regex::new(r"^[#%]?[A-Za-z0-9_]+:[A-Za-z][A-Za-z0-9_\-]*").unwrap()
        ),
        (TokenKind::Property, Regex::new(r"^:[A-Za-z][A-Za-z0-9_\-]*").unwrap()),
        (
            TokenKind::Field,
            Regex::new(r"^[#%]?[A-Za-z0-9_]+\.[A-Za-z_][A-Za-z0-9_]*").unwrap()
        ),
        (TokenKind::Id, Regex::new(r"^[#%]?[A-Za-z0-9_]+\**").unwrap()),
    ];
}

/// Split `text` into tokens.
pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < text.len() {
        let rest = &text[pos..];
        let matched = PATTERNS.iter().find_map(|(kind, regex)| {
            regex
                .find(rest)
                .filter(|m| !m.as_str().is_empty())
                .map(|m| (*kind, m.end()))
        });

        let (kind, len) = match matched {
            Some(found) => found,
            None => {
                // a char always exists since pos < text.len()
                let c = rest.chars().next().unwrap_or(' ');
                let kind = if c.is_whitespace() {
                    TokenKind::Space
                } else {
                    TokenKind::Other
                };
                (kind, c.len_utf8())
            }
        };

        tokens.push(Token {
            kind,
            text: &rest[..len],
        });
        pos += len;
    }

    tokens
}
