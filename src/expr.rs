//! Compiled expression: the public face of the engine.
//!
//! An [`Expression`] owns one tree per `;`-separated statement.  Evaluating it
//! runs the statements in order and yields the value of the last one.
//!
//! ```
//! use confexpr::environment::Environment;
//! use confexpr::expr::Expression;
//!
//! let expr = Expression::parse("a = 2; a pow (3 + 1)").unwrap();
//! let mut env = Environment::new();
//!
//! let value = expr.evaluate(&mut env).unwrap().unwrap();
//! assert_eq!(value.to_string(), "16");
//! ```

use std::rc::Rc;

use log::{debug, info};

use crate::ast::Node;
use crate::environment::Environment;
use crate::error::Result;
use crate::literal::{LiteralParser, Literals};
use crate::parser::Compiler;
use crate::scanner::Scanner;
use crate::token::TokenCursor;
use crate::value::ValueRef;

#[derive(Debug, Clone, Default)]
pub struct Expression {
    statements: Vec<Rc<Node>>,
}

impl Expression {
    /// Scan and compile `src` with the default literal sub-parser.
    pub fn parse(src: &str) -> Result<Self> {
        Self::parse_with(src, &Literals)
    }

    pub fn parse_with(src: &str, literals: &dyn LiteralParser) -> Result<Self> {
        info!("Parsing expression: {}", src);

        let mut cursor = Scanner::tokenize(src.as_bytes())?;

        Self::compile(&mut cursor, literals)
    }

    /// Compile an already scanned token stream.
    pub fn compile(cursor: &mut TokenCursor<'_>, literals: &dyn LiteralParser) -> Result<Self> {
        let statements = Compiler::with_literals(literals)
            .compile(cursor)?
            .into_iter()
            .map(Rc::new)
            .collect();

        Ok(Self { statements })
    }

    pub fn from_node(node: Node) -> Self {
        Self {
            statements: vec![Rc::new(node)],
        }
    }

    pub fn statements(&self) -> &[Rc<Node>] {
        &self.statements
    }

    /// Tree of the last statement.
    pub fn root(&self) -> Option<&Node> {
        self.statements.last().map(|node| &**node)
    }

    /// Evaluate every statement; the last one's value is the result.
    pub fn evaluate(&self, env: &mut Environment) -> Result<Option<ValueRef>> {
        let mut last = None;

        for statement in &self.statements {
            last = statement.evaluate(env)?;
        }

        debug!(
            "Expression {} evaluated to {}",
            self.infix_str(),
            last.as_ref().map_or_else(|| "<none>".to_owned(), ValueRef::to_string)
        );

        Ok(last)
    }

    pub fn postfix_str(&self) -> String {
        self.statements
            .iter()
            .map(|node| node.postorder_str())
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn infix_str(&self) -> String {
        self.statements
            .iter()
            .map(|node| node.inorder_str())
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Deep copy: no node or literal is shared with `self`.
    pub fn copy(&self) -> Self {
        Self {
            statements: self.statements.iter().map(|node| Rc::new(node.copy())).collect(),
        }
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        self.statements.len() == other.statements.len()
            && self
                .statements
                .iter()
                .zip(&other.statements)
                .all(|(a, b)| a.equal(b))
    }
}
