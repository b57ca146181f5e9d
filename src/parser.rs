/*!
Expression compiler: whole‑file overview
=========================================

Definitions
-----------
* **n** = number of tokens (including the sole EOF).
* **m** = number of AST nodes (`m ≤ n`, every token contributes at most one node).

### Algorithm

Operator precedence (shunting‑yard).  Two stacks per statement:

* the *operator* stack, seeded with an `Undefined` sentinel, also holding the
  open‑paren, open‑bracket and pending‑`if` markers;
* the *operand* stack of finished subtrees.

Per token:

| token                          | action                                                          |
|--------------------------------|-----------------------------------------------------------------|
| value (anything non‑operator)  | literal sub‑parser → operand leaf                               |
| `(`                            | push marker                                                     |
| `)`                            | reduce until the matching `(`, drop it                          |
| `[` after an operand           | push index marker                                               |
| `[` in operand position        | raw‑list literal                                                |
| `:` inside an index            | reduce until the index marker, turn it into a slice             |
| `]`                            | reduce until the index marker, build element / slice            |
| `if`                           | push pending‑`if` marker                                        |
| `else`                         | reduce until the pending `if`, turn it into the ternary         |
| `;`                            | finish the statement                                            |
| operator                       | reduce while `input ≤ top.stack`, then push                     |

A `-` whose predecessor is neither an operand nor a closing bracket is
unary minus.  Two adjacent symbols that spell a catalog operator (`==`, `<=`,
`&&`, …) are taken together, using one token of lookahead.

### Time & space

Each token is pushed and popped at most once: **Θ(n)** time, **O(n)** space
for the two stacks and the tree.

### Logging Policy

| Location                     | Level  | Purpose                                   |
|------------------------------|--------|-------------------------------------------|
| `Compiler::new`, `compile`   | `info` | Lifecycle milestones.                     |
| per token, per reduction     | `debug`| Stack traffic.                            |
*/

use log::{debug, info};

use crate::ast::Node;
use crate::error::{ExprError, Result};
use crate::literal::{LiteralParser, Literals};
use crate::operator::{OpCode, SENTINEL};
use crate::scanner::Scanner;
use crate::token::{Token, TokenCursor, TokenType};

/// Entries of the operator stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Undefined,
    Paren,
    Bracket { slice: bool },
    If,
    Op(OpCode),
}

impl Pending {
    fn stack_precedence(self) -> u8 {
        match self {
            Pending::Op(op) => op.stack_precedence(),
            _ => SENTINEL,
        }
    }
}

/// What the previous significant token was; drives unary-minus and
/// raw-literal disambiguation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Last {
    Nothing,
    Operand,
    Close,
    Operator,
}

impl Last {
    fn expects_operand(self) -> bool {
        matches!(self, Last::Nothing | Last::Operator)
    }
}

/// Stacks for one `;`-terminated statement.
struct Statement {
    operators: Vec<Pending>,
    operands: Vec<Node>,
}

impl Statement {
    fn new() -> Self {
        Self {
            operators: vec![Pending::Undefined],
            operands: Vec::new(),
        }
    }

    #[inline]
    fn top(&self) -> Pending {
        self.operators.last().copied().unwrap_or(Pending::Undefined)
    }

    /// Pop `op.arity()` operands and push the operator node built from them.
    fn build(&mut self, op: OpCode) -> Result<()> {
        let arity = op.arity();
        let available = self.operands.len();

        if available < arity {
            return Err(ExprError::bad_expression(format!(
                "missing {} operand(s) for '{}'",
                arity - available,
                op.spelling()
            )));
        }

        // The tail of the operand stack is already in source order.
        let children = self.operands.split_off(available - arity);
        let node = Node::operator(op, children)?;

        debug!("Reduced {}", node.postorder_str());

        self.operands.push(node);

        Ok(())
    }

    /// Pop the top operator and reduce it.  Markers cannot be reduced.
    fn reduce(&mut self) -> Result<()> {
        match self.operators.pop() {
            Some(Pending::Op(op)) => self.build(op),
            Some(Pending::Paren) => Err(ExprError::bad_expression("unbalanced parenthesis")),
            Some(Pending::Bracket { .. }) => Err(ExprError::bad_expression("unbalanced bracket")),
            Some(Pending::If) => Err(ExprError::bad_expression("'if' without 'else'")),
            Some(Pending::Undefined) | None => Err(ExprError::bad_expression("Invalid expression")),
        }
    }

    fn push_operator(&mut self, op: OpCode) -> Result<()> {
        while op.input_precedence() <= self.top().stack_precedence() {
            self.reduce()?;
        }

        debug!("Pushing operator '{}'", op.spelling());

        self.operators.push(Pending::Op(op));

        Ok(())
    }

    fn close_paren(&mut self) -> Result<()> {
        loop {
            match self.top() {
                Pending::Paren => {
                    self.operators.pop();
                    return Ok(());
                }
                Pending::Op(_) => self.reduce()?,
                Pending::If => return Err(ExprError::bad_expression("'if' without 'else'")),
                Pending::Undefined | Pending::Bracket { .. } => {
                    return Err(ExprError::bad_expression("unbalanced parenthesis"))
                }
            }
        }
    }

    fn colon(&mut self) -> Result<()> {
        loop {
            match self.top() {
                Pending::Bracket { slice: false } => {
                    self.operators.pop();
                    self.operators.push(Pending::Bracket { slice: true });
                    return Ok(());
                }
                Pending::Bracket { slice: true } => {
                    return Err(ExprError::bad_expression("too many ':' in index"))
                }
                Pending::Op(_) => self.reduce()?,
                Pending::If => return Err(ExprError::bad_expression("'if' without 'else'")),
                Pending::Undefined | Pending::Paren => {
                    return Err(ExprError::bad_expression("':' outside of an index"))
                }
            }
        }
    }

    fn close_bracket(&mut self) -> Result<()> {
        loop {
            match self.top() {
                Pending::Bracket { slice } => {
                    self.operators.pop();
                    return self.build(if slice { OpCode::Slice } else { OpCode::Element });
                }
                Pending::Op(_) => self.reduce()?,
                Pending::If => return Err(ExprError::bad_expression("'if' without 'else'")),
                Pending::Undefined | Pending::Paren => {
                    return Err(ExprError::bad_expression("unbalanced bracket"))
                }
            }
        }
    }

    fn close_if(&mut self) -> Result<()> {
        loop {
            match self.top() {
                Pending::If => {
                    self.operators.pop();
                    self.operators.push(Pending::Op(OpCode::IfElse));
                    return Ok(());
                }
                Pending::Op(_) => self.reduce()?,
                Pending::Undefined | Pending::Paren | Pending::Bracket { .. } => {
                    return Err(ExprError::bad_expression("'else' without matching 'if'"))
                }
            }
        }
    }

    /// Final reduction pass; exactly one subtree must remain.
    fn finish(mut self) -> Result<Node> {
        while self.top() != Pending::Undefined {
            self.reduce()?;
        }

        if self.operands.len() != 1 {
            return Err(ExprError::bad_expression("Invalid expression"));
        }

        self.operands.pop().ok_or_else(|| ExprError::bad_expression("Invalid expression"))
    }
}

/// Shunting‑yard compiler turning a token stream into one tree per statement.
pub struct Compiler<'l> {
    literals: &'l dyn LiteralParser,
}

impl Default for Compiler<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler<'static> {
    /// Compiler using the default literal sub-parser.
    pub fn new() -> Self {
        info!("Compiler created with default literals");

        Compiler { literals: &Literals }
    }
}

impl<'l> Compiler<'l> {
    pub fn with_literals(literals: &'l dyn LiteralParser) -> Self {
        info!("Compiler created with custom literals");

        Compiler { literals }
    }

    /// Scan and compile `src`.
    pub fn compile_str(&self, src: &str) -> Result<Vec<Node>> {
        let mut cursor = Scanner::tokenize(src.as_bytes())?;

        self.compile(&mut cursor)
    }

    /// Compile every `;`-separated statement up to `EOF`.  Empty statements
    /// are skipped; empty input is an error.
    pub fn compile(&self, cursor: &mut TokenCursor<'_>) -> Result<Vec<Node>> {
        info!("Beginning compile phase");

        let mut roots: Vec<Node> = Vec::new();
        let mut statement = Statement::new();
        let mut last = Last::Nothing;

        while !cursor.is_at_end() {
            let token: Token<'_> = cursor.peek().clone();

            debug!("Compiling token {}", token);

            if token.is_symbol(";") {
                cursor.advance();

                if last != Last::Nothing {
                    let root = std::mem::replace(&mut statement, Statement::new()).finish()?;
                    info!("Compiled statement: {}", root.postorder_str());
                    roots.push(root);
                }

                last = Last::Nothing;
                continue;
            }

            last = self.step(cursor, &token, last, &mut statement)?;
        }

        if last != Last::Nothing || roots.is_empty() {
            let root = statement.finish()?;
            info!("Compiled statement: {}", root.postorder_str());
            roots.push(root);
        }

        Ok(roots)
    }

    /// Handle the token at the cursor; returns the new `Last` state.
    fn step(
        &self,
        cursor: &mut TokenCursor<'_>,
        token: &Token<'_>,
        last: Last,
        statement: &mut Statement,
    ) -> Result<Last> {
        match token.token_type {
            TokenType::SYMBOL => self.symbol(cursor, token, last, statement),

            TokenType::IDENTIFIER => match token.lexeme {
                "if" => {
                    cursor.advance();
                    statement.operators.push(Pending::If);
                    Ok(Last::Operator)
                }
                "else" => {
                    cursor.advance();
                    statement.close_if()?;
                    Ok(Last::Operator)
                }
                lexeme => match OpCode::from_spelling(lexeme) {
                    Some(op) => {
                        cursor.advance();
                        statement.push_operator(op)?;
                        Ok(Last::Operator)
                    }
                    None => self.literal(cursor, statement),
                },
            },

            _ => self.literal(cursor, statement),
        }
    }

    fn symbol(
        &self,
        cursor: &mut TokenCursor<'_>,
        token: &Token<'_>,
        last: Last,
        statement: &mut Statement,
    ) -> Result<Last> {
        // Two-symbol operators first, with one token of lookahead.
        let next = cursor.peek_next();
        if next.token_type == TokenType::SYMBOL && next.span.start == token.span.end {
            let pair = format!("{}{}", token.lexeme, next.lexeme);

            if let Some(op) = OpCode::from_spelling(&pair) {
                cursor.advance();
                cursor.advance();
                statement.push_operator(op)?;
                return Ok(Last::Operator);
            }
        }

        match token.lexeme {
            "(" => {
                cursor.advance();
                statement.operators.push(Pending::Paren);
                Ok(Last::Operator)
            }

            ")" => {
                cursor.advance();
                statement.close_paren()?;
                Ok(Last::Close)
            }

            "[" if last.expects_operand() => self.literal(cursor, statement),

            "[" => {
                cursor.advance();
                statement.operators.push(Pending::Bracket { slice: false });
                Ok(Last::Operator)
            }

            ":" => {
                cursor.advance();
                statement.colon()?;
                Ok(Last::Operator)
            }

            "]" => {
                cursor.advance();
                statement.close_bracket()?;
                Ok(Last::Close)
            }

            "{" => self.literal(cursor, statement),

            "-" if last.expects_operand() => {
                cursor.advance();
                statement.push_operator(OpCode::Negate)?;
                Ok(Last::Operator)
            }

            lexeme => match OpCode::from_spelling(lexeme) {
                Some(op) => {
                    cursor.advance();
                    statement.push_operator(op)?;
                    Ok(Last::Operator)
                }
                None => Err(ExprError::bad_expression(format!(
                    "unexpected '{}' on line {}",
                    lexeme, token.line
                ))),
            },
        }
    }

    fn literal(&self, cursor: &mut TokenCursor<'_>, statement: &mut Statement) -> Result<Last> {
        let value = self.literals.parse(cursor)?;

        debug!("Pushing operand {}", value);

        statement.operands.push(Node::operand(value));

        Ok(Last::Operand)
    }
}
