//! Regex payload for the `regex` value kind.
//!
//! Patterns are written `?/…/` in source.  Named captures use the
//! `@<name>(…)` form, which is rewritten to the `(?P<name>…)` syntax of the
//! `regex` crate before compiling.  Matching is a search, not an anchored
//! full match.

use std::fmt;

use log::debug;
use regex::Regex;

use crate::error::{ExprError, Result};

#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Compile `source` (the text between the delimiters, `\/` unescaped by
    /// the caller).
    pub fn new(source: &str) -> Result<Self> {
        let translated = translate(source);

        debug!("Compiling pattern {:?} as {:?}", source, translated);

        let regex = Regex::new(&translated)
            .map_err(|e| ExprError::bad_expression(format!("invalid regex ?/{}/: {}", source, e)))?;

        Ok(Self {
            source: source.to_owned(),
            regex,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Search `text`; on success return every named capture that took part in
    /// the match, in pattern order.
    pub fn captures(&self, text: &str) -> Option<Vec<(String, String)>> {
        let caps = self.regex.captures(text)?;

        Some(
            self.regex
                .capture_names()
                .flatten()
                .filter_map(|name| caps.name(name).map(|m| (name.to_owned(), m.as_str().to_owned())))
                .collect(),
        )
    }
}

/// Rewrite `@<name>(` into `(?P<name>`, leaving escaped `\@` alone.
fn translate(source: &str) -> String {
    let mut out = String::with_capacity(source.len() + 8);
    let mut rest = source;

    while let Some(at) = rest.find('@') {
        let escaped = rest[..at].ends_with('\\');
        out.push_str(&rest[..at]);
        rest = &rest[at..];

        if !escaped && rest.starts_with("@<") {
            if let Some(close) = rest.find(">(") {
                let name = &rest[2..close];
                if !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
                    out.push_str("(?P<");
                    out.push_str(name);
                    out.push('>');
                    rest = &rest[close + 2..];
                    continue;
                }
            }
        }

        out.push('@');
        rest = &rest[1..];
    }

    out.push_str(rest);
    out
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?/{}/", self.source.replace('/', "\\/"))
    }
}
