//! Expression tree nodes.
//!
//! A [`Node`] is either an operand leaf wrapping a literal [`ValueRef`], or an
//! operator branch holding exactly `arity` children.  Children are stored in
//! source (left-to-right) order, fixed once at construction.

use std::rc::Rc;

use log::debug;

use crate::ast_printer::AstPrinter;
use crate::environment::Environment;
use crate::error::{ExprError, Result};
use crate::interpreter::Evaluator;
use crate::operator::OpCode;
use crate::value::{Value, ValueRef};

#[derive(Debug, Clone)]
pub enum Node {
    /// Leaf: a literal value as produced by the literal sub-parser.
    Operand(ValueRef),

    /// Branch: operator code plus `op.arity()` children in source order.
    Operator { op: OpCode, children: Vec<Rc<Node>> },
}

impl Node {
    pub fn operand(value: ValueRef) -> Self {
        Node::Operand(value)
    }

    /// Build an operator node, enforcing the arity invariant.
    pub fn operator(op: OpCode, children: Vec<Node>) -> Result<Self> {
        if children.len() != op.arity() {
            return Err(ExprError::bad_expression(format!(
                "operator '{}' takes {} operand(s), got {}",
                op.spelling(),
                op.arity(),
                children.len()
            )));
        }

        Ok(Node::Operator {
            op,
            children: children.into_iter().map(Rc::new).collect(),
        })
    }

    pub fn op(&self) -> Option<OpCode> {
        match self {
            Node::Operator { op, .. } => Some(*op),
            Node::Operand(_) => None,
        }
    }

    pub fn children(&self) -> &[Rc<Node>] {
        match self {
            Node::Operator { children, .. } => children,
            Node::Operand(_) => &[],
        }
    }

    /// The wrapped value of an operand leaf.
    pub fn literal(&self) -> Option<&ValueRef> {
        match self {
            Node::Operand(v) => Some(v),
            Node::Operator { .. } => None,
        }
    }

    /// A leaf holding a concrete (non-indirection) value, i.e. one that the
    /// AST owns and in-place operators must not touch.
    pub fn is_constant(&self) -> bool {
        self.literal().is_some_and(|v| !v.is_indirection())
    }

    /// Evaluate one step: an operand yields its literal handle as is, an
    /// operator yields whatever the evaluator returns.  Indirection is left
    /// for the caller to follow.
    pub fn value(&self, env: &mut Environment) -> Result<ValueRef> {
        match self {
            Node::Operand(v) => Ok(v.clone()),
            Node::Operator { op, children } => match children.as_slice() {
                [a] => Evaluator::unary(*op, env, a),
                [a, b] => Evaluator::binary(*op, env, a, b),
                [a, b, c] => Evaluator::ternary(*op, env, a, b, c),
                _ => Err(ExprError::bad_expression(format!(
                    "operator '{}' has {} operand(s)",
                    op.spelling(),
                    children.len()
                ))),
            },
        }
    }

    /// Evaluate and follow indirection to a concrete value.  An unresolved
    /// variable or reference yields `None`, not an error.  A constant leaf
    /// yields a copy of its literal.
    pub fn evaluate(&self, env: &mut Environment) -> Result<Option<ValueRef>> {
        let value = if self.is_constant() { self.value(env)?.copy() } else { self.value(env)? };

        debug!("Node {} produced {}", self.inorder_str(), value);

        value.resolve(env)
    }

    pub fn postorder_str(&self) -> String {
        AstPrinter::postfix(self)
    }

    pub fn inorder_str(&self) -> String {
        AstPrinter::infix(self)
    }

    /// Deep clone: fresh nodes and independent copies of every literal.
    pub fn copy(&self) -> Node {
        match self {
            Node::Operand(v) => Node::Operand(v.copy()),
            Node::Operator { op, children } => Node::Operator {
                op: *op,
                children: children.iter().map(|c| Rc::new(c.copy())).collect(),
            },
        }
    }

    /// Structural equality: same operator codes and shape, literal-equal
    /// operands (indirection is compared, not followed).
    pub fn equal(&self, other: &Node) -> bool {
        match (self, other) {
            (Node::Operand(a), Node::Operand(b)) => **a == **b,
            (
                Node::Operator { op: a, children: ca },
                Node::Operator { op: b, children: cb },
            ) => a == b && ca.len() == cb.len() && ca.iter().zip(cb).all(|(x, y)| x.equal(y)),
            _ => false,
        }
    }

    /// Is this a literal variable operand?  Returns its name.
    pub fn variable_name(&self) -> Option<&str> {
        match self.literal().map(|v| &**v) {
            Some(Value::Variable(name)) => Some(name.as_str()),
            _ => None,
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.equal(other)
    }
}
