//! Centralised error hierarchy for the **expression engine**.
//!
//! Every subsystem (scanner, literal sub-parser, compiler, evaluator, file
//! access) converts its failure modes into one of the variants defined here.
//! This gives a uniform `Result<T>` alias across the crate and lets the binary
//! wrap everything in `anyhow` without losing detail.
//!
//! `WrongKind` is an internal signal raised by the `Value` accessors.  The
//! evaluator entry points translate it into `UnsupportedOperand` before it can
//! leave the crate, so callers never see it.
//!
//! The module **does not** print diagnostics itself.

use std::io;
use std::path::PathBuf;

use log::info;
use thiserror::Error;

/// Canonical error type used throughout the engine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExprError {
    /// Compile-time failure: malformed tokens, unbalanced braces, missing
    /// operands, unrecognised literal.
    #[error("bad expression: {0}")]
    BadExpression(String),

    /// The operator exists but does not accept the operand kind(s).
    #[error("unsupported operand kind(s) {kinds} for operator '{operator}'")]
    UnsupportedOperand {
        /// Canonical spelling of the operator.
        operator: &'static str,

        /// Kind names of the offending operand(s), comma separated.
        kinds: String,
    },

    /// A variable or reference could not be resolved.  Carries the
    /// unevaluated source text of the operand.
    #[error("not found: {0}")]
    NotFound(String),

    /// `divide` (and `mod`) with a divisor that is exactly zero.
    #[error("division by zero")]
    DivisionByZero,

    /// Accessor asked for one kind and found another.
    #[error("wrong kind: expected {expected}, found {found}")]
    WrongKind {
        expected: &'static str,
        found: &'static str,
    },

    /// A file could not be opened (or created).
    #[error("cannot open '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A file was opened but reading from or writing to it failed.
    #[error("cannot read or write '{}': {source}", path.display())]
    ReadWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ExprError {
    /// Helper constructor for the **compiler** and the literal sub-parser.
    pub fn bad_expression<S: Into<String>>(msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating BadExpression error: {}", message);

        ExprError::BadExpression(message)
    }

    /// Helper constructor for the **evaluator** boundary.
    pub fn unsupported<S: Into<String>>(operator: &'static str, kinds: S) -> Self {
        let kinds: String = kinds.into();

        info!("Creating UnsupportedOperand error: op={}, kinds={}", operator, kinds);

        ExprError::UnsupportedOperand { operator, kinds }
    }

    /// Helper constructor for unresolved variables and references.
    pub fn not_found<S: Into<String>>(text: S) -> Self {
        let text: String = text.into();

        info!("Creating NotFound error: {}", text);

        ExprError::NotFound(text)
    }

    pub fn wrong_kind(expected: &'static str, found: &'static str) -> Self {
        ExprError::WrongKind { expected, found }
    }

    /// `true` for the two file-system failures that `saveto` and `delete`
    /// downgrade into a `{success, error}` record.
    pub fn is_io(&self) -> bool {
        matches!(self, ExprError::Open { .. } | ExprError::ReadWrite { .. })
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, ExprError>;
