//! Literal sub-parser: turns the operand tokens of an expression into values.
//!
//! The compiler hands over the cursor whenever a token is not an operator.
//! The default [`Literals`] implementation understands:
//!
//! ```text
//! true false            bool
//! 42  4.2  1e3          int / float
//! 'c'  "text"           char / string (backslash escapes)
//! #name                 name
//! x"00ff"               binary
//! ?/a@<grp>(b)/         regex
//! $some.path            reference
//! ident                 variable
//! ["a", "b"]            raw lines
//! {k: 1, 2, n: "v"}     tuple (nested literals, optional names)
//! meta{…}               meta
//! ```

use log::debug;

use crate::error::{ExprError, Result};
use crate::pattern::Pattern;
use crate::token::{Token, TokenCursor, TokenType};
use crate::tuple::{Attribute, Tuple};
use crate::value::{Value, ValueRef};

pub trait LiteralParser {
    /// Consume the tokens of one literal starting at `cursor.peek()`.
    fn parse(&self, cursor: &mut TokenCursor<'_>) -> Result<ValueRef>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Literals;

fn offending(token: &Token<'_>) -> ExprError {
    if token.is_eof() {
        ExprError::bad_expression("unexpected end of input")
    } else {
        ExprError::bad_expression(format!("unrecognized literal '{}' on line {}", token.lexeme, token.line))
    }
}

impl LiteralParser for Literals {
    fn parse(&self, cursor: &mut TokenCursor<'_>) -> Result<ValueRef> {
        let token = cursor.advance().clone();

        debug!("Parsing literal from {}", token);

        match token.token_type {
            TokenType::INTEGER => token
                .lexeme
                .parse::<i64>()
                .map(Value::int)
                .map_err(|_| offending(&token)),

            TokenType::FLOAT => token
                .lexeme
                .parse::<f64>()
                .map(Value::float)
                .map_err(|_| offending(&token)),

            TokenType::STRING => Ok(Value::string(unescape(inner(token.lexeme, 1), &token)?)),

            TokenType::CHAR => {
                let text = unescape(inner(token.lexeme, 1), &token)?;
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Value::char(c)),
                    _ => Err(offending(&token)),
                }
            }

            TokenType::NAME => Ok(Value::name(&token.lexeme[1..])),

            TokenType::BINARY => {
                let digits = inner(&token.lexeme[1..], 1);
                parse_hex(digits).map(|bytes| Value::binary(&bytes)).ok_or_else(|| offending(&token))
            }

            TokenType::REGEX => {
                let source = inner(&token.lexeme[1..], 1).replace("\\/", "/");
                Pattern::new(&source).map(Value::regex)
            }

            TokenType::REFERENCE => Ok(Value::reference(&token.lexeme[1..], None)),

            TokenType::IDENTIFIER => match token.lexeme {
                "true" => Ok(Value::bool(true)),
                "false" => Ok(Value::bool(false)),
                "meta" if cursor.peek().is_symbol("{") => {
                    cursor.advance();
                    Ok(Value::meta(self.record(cursor)?))
                }
                name => Ok(Value::variable(name)),
            },

            TokenType::SYMBOL => match token.lexeme {
                "[" => self.raw(cursor),
                "{" => Ok(Value::tuple(self.record(cursor)?)),
                // Signed numbers only occur nested in raw/tuple literals; at
                // expression level the compiler owns `-`.
                "-" if matches!(cursor.peek().token_type, TokenType::INTEGER | TokenType::FLOAT) => {
                    let value = self.parse(cursor)?;
                    match &*value {
                        Value::Int(i) => Ok(Value::int(i.wrapping_neg())),
                        Value::Float(x) => Ok(Value::float(-x)),
                        _ => Err(offending(&token)),
                    }
                }
                _ => Err(offending(&token)),
            },

            TokenType::EOF => Err(offending(&token)),
        }
    }
}

impl Literals {
    /// `[` consumed; string elements up to `]`.
    fn raw(&self, cursor: &mut TokenCursor<'_>) -> Result<ValueRef> {
        let mut lines = Vec::new();

        if cursor.match_symbol("]") {
            return Ok(Value::raw(lines));
        }

        loop {
            let token = cursor.advance().clone();

            if token.token_type != TokenType::STRING {
                return Err(offending(&token));
            }
            lines.push(unescape(inner(token.lexeme, 1), &token)?);

            if cursor.match_symbol(",") {
                continue;
            }
            if cursor.match_symbol("]") {
                return Ok(Value::raw(lines));
            }
            return Err(offending(cursor.peek()));
        }
    }

    /// `{` consumed; `[name:] literal` entries up to `}`.
    fn record(&self, cursor: &mut TokenCursor<'_>) -> Result<Tuple> {
        let mut tuple = Tuple::new();

        if cursor.match_symbol("}") {
            return Ok(tuple);
        }

        loop {
            let named = cursor.peek().token_type == TokenType::IDENTIFIER && cursor.peek_next().is_symbol(":");

            if named {
                let name = cursor.advance().lexeme.to_owned();
                cursor.advance();
                tuple.push(Attribute::named(&name, self.parse(cursor)?));
            } else {
                tuple.push(Attribute::unnamed(self.parse(cursor)?));
            }

            if cursor.match_symbol(",") {
                continue;
            }
            if cursor.match_symbol("}") {
                return Ok(tuple);
            }
            return Err(offending(cursor.peek()));
        }
    }
}

/// Strip `n` delimiter bytes from each end.
fn inner(lexeme: &str, n: usize) -> &str {
    &lexeme[n..lexeme.len() - n]
}

fn unescape(text: &str, token: &Token<'_>) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(c @ ('\\' | '"' | '\'')) => out.push(c),
            _ => return Err(offending(token)),
        }
    }

    Ok(out)
}

fn parse_hex(digits: &str) -> Option<Vec<u8>> {
    if digits.len() % 2 != 0 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    digits
        .as_bytes()
        .chunks(2)
        .map(|pair| std::str::from_utf8(pair).ok().and_then(|s| u8::from_str_radix(s, 16).ok()))
        .collect()
}
