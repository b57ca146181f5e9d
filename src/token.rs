use log::debug;
use serde::Serialize;
use std::fmt;
use std::ops::Range;

/// The classes of tokens produced by the [`Scanner`](crate::scanner::Scanner).
///
/// The scanner only delimits and classifies; turning a lexeme into a value is
/// the job of the literal sub-parser, and recognising operators is the job of
/// the compiler.  `EOF` marks the end of input.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TokenType {
    /// One punctuation byte: `+ - * / % = ! < > & | ( ) [ ] { } , : ;`
    SYMBOL,

    /// `[A-Za-z_][A-Za-z0-9_]*`, keywords included
    IDENTIFIER,

    /// Decimal integer literal
    INTEGER,

    /// Decimal literal with a fraction and/or an exponent
    FLOAT,

    /// `"…"`, lexeme keeps the quotes and escapes
    STRING,

    /// `'x'`
    CHAR,

    /// `#identifier`
    NAME,

    /// `x"0a1b"`
    BINARY,

    /// `?/…/`
    REGEX,

    /// `$path.to/slot`
    REFERENCE,

    /// End‑of‑input marker
    EOF,
}

impl TokenType {
    /// Lower-case type name, as exposed on the token stream interface.
    pub fn name(self) -> &'static str {
        match self {
            TokenType::SYMBOL => "symbol",
            TokenType::IDENTIFIER => "identifier",
            TokenType::INTEGER => "integer",
            TokenType::FLOAT => "float",
            TokenType::STRING => "string",
            TokenType::CHAR => "char",
            TokenType::NAME => "name",
            TokenType::BINARY => "binary",
            TokenType::REGEX => "regex",
            TokenType::REFERENCE => "reference",
            TokenType::EOF => "eof",
        }
    }
}

/// A scanned token: its class, the original lexeme, the byte span it covers
/// and the line it started on.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Token<'a> {
    /// The category of this token.
    pub token_type: TokenType,

    /// The exact substring from the source that produced this token.
    pub lexeme: &'a str,

    /// Byte range of the lexeme in the source buffer.
    pub span: Range<usize>,

    /// 1‑based line number in the source.
    pub line: usize,
}

impl<'a> Token<'a> {
    pub fn new(token_type: TokenType, lexeme: &'a str, span: Range<usize>, line: usize) -> Self {
        debug!(
            "Creating new token: type={:?}, lexeme={}, line={}",
            token_type, lexeme, line
        );

        Self {
            token_type,
            lexeme,
            span,
            line,
        }
    }

    /// Is this the single-byte symbol `sym`?
    #[inline]
    pub fn is_symbol(&self, sym: &str) -> bool {
        self.token_type == TokenType::SYMBOL && self.lexeme == sym
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.token_type == TokenType::EOF
    }
}

impl<'a> fmt::Display for Token<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}..{}",
            self.token_type.name(),
            self.lexeme,
            self.span.start,
            self.span.end
        )
    }
}

/// Forward cursor with one-token lookahead over a scanned token list.
///
/// The list always ends in an `EOF` token; the cursor never moves past it, so
/// `peek` is total.
#[derive(Debug, Clone)]
pub struct TokenCursor<'a> {
    tokens: Vec<Token<'a>>,
    current: usize,
}

impl<'a> TokenCursor<'a> {
    /// Wrap `tokens`, appending an `EOF` marker if the producer left it out.
    pub fn new(mut tokens: Vec<Token<'a>>) -> Self {
        if !tokens.last().is_some_and(Token::is_eof) {
            let end = tokens.last().map_or(0, |t| t.span.end);
            let line = tokens.last().map_or(1, |t| t.line);
            tokens.push(Token::new(TokenType::EOF, "", end..end, line));
        }

        Self { tokens, current: 0 }
    }

    #[inline(always)]
    pub fn peek(&self) -> &Token<'a> {
        &self.tokens[self.current]
    }

    /// The token after [`peek`](Self::peek), or `EOF`.
    #[inline(always)]
    pub fn peek_next(&self) -> &Token<'a> {
        let idx = (self.current + 1).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    /// Consume and return the current token.  Sticks at `EOF`.
    #[inline(always)]
    pub fn advance(&mut self) -> &Token<'a> {
        let idx = self.current;

        if !self.tokens[idx].is_eof() {
            self.current += 1;
        }

        &self.tokens[idx]
    }

    /// The most recently consumed token, if any.
    #[inline(always)]
    pub fn previous(&self) -> Option<&Token<'a>> {
        self.current.checked_sub(1).map(|i| &self.tokens[i])
    }

    #[inline(always)]
    pub fn is_at_end(&self) -> bool {
        self.peek().is_eof()
    }

    /// Consume the current token iff it is the symbol `sym`.
    pub fn match_symbol(&mut self, sym: &str) -> bool {
        if self.peek().is_symbol(sym) {
            self.advance();
            true
        } else {
            false
        }
    }
}
