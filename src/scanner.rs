//! Module `scanner` implements a one‑pass, streaming lexer for expression text.
//!
//! It turns a byte slice (`&[u8]`) into a sequence of `Token<'a>`s, skipping
//! whitespace and `//` comments, and emitting exactly one `EOF` token at the
//! end.  It is a `FusedIterator`, so it chains safely with other adapters.
//!
//! The scanner only *delimits*.  It never decides whether `-` is unary or
//! whether `pow` is an operator; that is left to the compiler, and turning
//! lexemes into values is left to the literal sub-parser.
//!
//! # Token recognition
//!
//! - Punctuation: one `SYMBOL` token per byte.  Two-symbol operators such as
//!   `==` are assembled by the compiler with one token of lookahead.
//! - `"…"` strings and `'x'` chars, with backslash escapes left in the lexeme.
//! - Numbers: digits, optional fraction, optional exponent.
//! - `#name`, `x"hex"`, `?/regex/`, `$reference.path`.
//! - Identifiers and keywords.
//! - Anything else yields `ExprError::BadExpression` with the offending text.
//!
//! # Example
//!
//! ```rust
//! use confexpr::scanner::Scanner;
//!
//! let mut scanner = Scanner::new(b"a = b + 321; // trailing comment");
//! for result in &mut scanner {
//!     match result {
//!         Ok(token) => println!("{}", token),
//!         Err(err) => eprintln!("Lex error: {}", err),
//!     }
//! }
//! ```

use crate::error::{ExprError, Result};
use crate::token::{Token, TokenCursor, TokenType};
use log::{debug, info};
use memchr::{memchr, memchr2};
use std::iter::FusedIterator;

/// Bytes that always form a one-byte `SYMBOL` token.
const SYMBOLS: &[u8] = b"+-*/%=!<>&|()[]{},:;";

/// A single pass **scanner** that converts raw UTF‑8 bytes into a sequence of
/// [`Token`]s.  Every emitted lexeme borrows from the original buffer.
pub struct Scanner<'a> {
    src: &'a [u8],              // whole input
    start: usize,               // index of the *first* byte of the current lexeme
    curr: usize,                // index *one past* the last byte examined
    line: usize,                // 1‑based line counter (\n increments)
    pending: Option<TokenType>, // recognised token kind waiting to be emitted
}

impl<'a> Scanner<'a> {
    /// Create a new lexer over `src`.
    #[inline]
    pub fn new(src: &'a [u8]) -> Self {
        info!("Scanner created over {} bytes", src.len());

        Self {
            src,
            start: 0,
            curr: 0,
            line: 1,
            pending: None,
        }
    }

    /// Scan everything into a [`TokenCursor`], failing on the first lexical
    /// error.
    pub fn tokenize(src: &'a [u8]) -> Result<TokenCursor<'a>> {
        let tokens = Scanner::new(src).collect::<Result<Vec<_>>>()?;

        info!("Tokenized {} tokens", tokens.len());

        Ok(TokenCursor::new(tokens))
    }

    // ───────────────────────────── primitive helpers ────────────────────────

    #[inline(always)]
    const fn len(&self) -> usize {
        self.src.len()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.curr >= self.len()
    }

    /// Advance one byte and return it.  Callers guard with [`is_at_end`].
    #[inline(always)]
    fn advance(&mut self) -> u8 {
        let b = self.src[self.curr];
        self.curr += 1;
        b
    }

    /// Current byte, or `0` past EOF.
    #[inline(always)]
    fn peek(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.src[self.curr]
        }
    }

    #[inline(always)]
    fn peek_next(&self) -> u8 {
        if self.curr + 1 >= self.len() {
            0
        } else {
            self.src[self.curr + 1]
        }
    }

    #[inline(always)]
    fn lexeme(&self) -> &'a str {
        // Lexeme boundaries always fall on ASCII bytes, so a slice of valid
        // UTF-8 input stays valid; fall back to an empty lexeme otherwise.
        std::str::from_utf8(&self.src[self.start..self.curr]).unwrap_or("")
    }

    fn error(&self, message: &str) -> ExprError {
        let text = String::from_utf8_lossy(&self.src[self.start..self.curr.min(self.len())]);

        ExprError::bad_expression(format!("{} '{}' on line {}", message, text, self.line))
    }

    // ───────────────────────────── core lexing ─────────────────────────────

    /// Scan a *single* token starting at `self.curr`.  Whitespace and comments
    /// return `Ok(())` with `pending = None`.
    fn scan_token(&mut self) -> Result<()> {
        let b = self.advance();

        match b {
            // ── whitespace / newline ─────────────────────────────────────
            b' ' | b'\r' | b'\t' => return Ok(()),

            b'\n' => {
                self.line += 1;
                return Ok(());
            }

            // ── comments (// … until newline) ────────────────────────────
            b'/' if self.peek() == b'/' => {
                if let Some(pos) = memchr(b'\n', &self.src[self.curr..]) {
                    self.curr += pos;
                } else {
                    self.curr = self.len();
                }

                return Ok(());
            }

            b'"' => self.quoted(b'"', TokenType::STRING)?,

            b'\'' => self.quoted(b'\'', TokenType::CHAR)?,

            b'#' => {
                if !is_ident_start(self.peek()) {
                    return Err(self.error("Expected a name after"));
                }
                self.identifier_tail();
                self.pending = Some(TokenType::NAME);
            }

            b'$' => {
                while matches!(self.peek(), b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' | b'.' | b'/') {
                    self.advance();
                }
                if self.curr - self.start == 1 {
                    return Err(self.error("Expected a path after"));
                }
                self.pending = Some(TokenType::REFERENCE);
            }

            b'?' if self.peek() == b'/' => {
                self.advance();
                self.regex()?;
            }

            b'x' if self.peek() == b'"' => {
                self.advance();
                self.quoted(b'"', TokenType::BINARY)?;
            }

            b'0'..=b'9' => self.number(),

            _ if is_ident_start(b) => {
                self.identifier_tail();
                self.pending = Some(TokenType::IDENTIFIER);
            }

            _ if SYMBOLS.contains(&b) => self.pending = Some(TokenType::SYMBOL),

            _ => {
                // Swallow the rest of a multi-byte character so the message
                // shows it whole.
                while self.peek() & 0xC0 == 0x80 {
                    self.advance();
                }
                return Err(self.error("Unexpected character"));
            }
        }

        Ok(())
    }

    /// Consume up to and including the closing `quote`, honouring backslash
    /// escapes.  `self.curr` is just past the opening quote.
    fn quoted(&mut self, quote: u8, tt: TokenType) -> Result<()> {
        loop {
            match memchr2(quote, b'\\', &self.src[self.curr..]) {
                Some(pos) => {
                    let hit = self.src[self.curr + pos];
                    self.line += memchr::memchr_iter(b'\n', &self.src[self.curr..self.curr + pos]).count();
                    self.curr += pos + 1;

                    if hit == quote {
                        break;
                    }

                    // Backslash: skip the escaped byte.
                    if self.is_at_end() {
                        return Err(self.error("Unterminated literal"));
                    }
                    self.advance();
                }
                None => {
                    self.curr = self.len();
                    return Err(self.error("Unterminated literal"));
                }
            }
        }

        self.pending = Some(tt);

        Ok(())
    }

    /// `?/` already consumed; read until an unescaped `/`.
    fn regex(&mut self) -> Result<()> {
        while !self.is_at_end() {
            match self.advance() {
                b'\\' if self.peek() == b'/' => {
                    self.advance();
                }
                b'/' => {
                    self.pending = Some(TokenType::REGEX);
                    return Ok(());
                }
                b'\n' => self.line += 1,
                _ => {}
            }
        }

        Err(self.error("Unterminated regex"))
    }

    /// Numeric literal: `123`, `3.14`, `1e9`, `2.5E-3`.
    fn number(&mut self) {
        let mut tt = TokenType::INTEGER;

        while self.peek().is_ascii_digit() {
            self.advance();
        }

        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            tt = TokenType::FLOAT;
            self.advance();

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        if matches!(self.peek(), b'e' | b'E') {
            let sign = matches!(self.peek_next(), b'+' | b'-');
            let digit_at = if sign { self.curr + 2 } else { self.curr + 1 };

            if self.src.get(digit_at).is_some_and(u8::is_ascii_digit) {
                tt = TokenType::FLOAT;
                self.curr = digit_at;

                while self.peek().is_ascii_digit() {
                    self.advance();
                }
            }
        }

        self.pending = Some(tt);
    }

    fn identifier_tail(&mut self) {
        while {
            let c: u8 = self.peek();
            c.is_ascii_alphanumeric() || c == b'_'
        } {
            self.advance();
        }
    }
}

#[inline(always)]
fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

// ───────────────────────── Iterator implementation ─────────────────────────

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.curr <= self.len() {
            // EOF guard – emit exactly one EOF then terminate.
            if self.curr == self.len() {
                self.curr += 1;
                let end = self.len();
                return Some(Ok(Token::new(TokenType::EOF, "", end..end, self.line)));
            }

            self.start = self.curr;
            self.pending = None;
            let line = self.line;

            if let Err(e) = self.scan_token() {
                return Some(Err(e));
            }

            if let Some(tt) = self.pending.take() {
                debug!("Scanned token ({:?}) on line {}", tt, line);

                return Some(Ok(Token::new(tt, self.lexeme(), self.start..self.curr, line)));
            }
        }

        None
    }
}

impl<'a> FusedIterator for Scanner<'a> {}
