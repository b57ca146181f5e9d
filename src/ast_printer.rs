use crate::ast::Node;
use crate::operator::OpCode;

/// Renders expression trees as postfix (RPN) or as minimally parenthesised
/// infix text, using the catalog spellings.
pub struct AstPrinter;

impl AstPrinter {
    /// Space separated postfix: children left to right, then the operator.
    pub fn postfix(node: &Node) -> String {
        match node {
            Node::Operand(v) => v.to_string(),

            Node::Operator { op, children } => {
                let mut parts: Vec<String> = children.iter().map(|c| Self::postfix(c)).collect();
                parts.push(op.spelling().to_string());
                parts.join(" ")
            }
        }
    }

    /// Infix text.  A child is parenthesised iff it is an operator with a
    /// strictly lower input precedence than its parent, or it is the right
    /// child of a right-associative binary parent and is itself an operator.
    pub fn infix(node: &Node) -> String {
        let (op, children) = match node {
            Node::Operand(v) => return v.to_string(),
            Node::Operator { op, children } => (*op, children),
        };

        let last = children.len() - 1;
        let operand = |i: usize| Self::child(op, &children[i], i == last);

        match (op, children.len()) {
            // ── index forms: the brackets delimit the index already ────
            (OpCode::Element, _) => format!("{}[{}]", operand(0), Self::infix(&children[1])),

            (OpCode::Slice, _) => format!(
                "{}[{}:{}]",
                operand(0),
                Self::infix(&children[1]),
                Self::infix(&children[2])
            ),

            // ── ternary ─────────────────────────────────────────────────
            (OpCode::IfElse, _) => format!("{} if {} else {}", operand(0), operand(1), operand(2)),

            // ── prefix unary ────────────────────────────────────────────
            (_, 1) => {
                let spelling = op.spelling();

                if spelling.chars().all(|c| c.is_ascii_alphabetic()) {
                    format!("{} {}", spelling, operand(0))
                } else {
                    format!("{}{}", spelling, operand(0))
                }
            }

            // ── binary ─────────────────────────────────────────────────
            _ => format!("{} {} {}", operand(0), op.spelling(), operand(1)),
        }
    }

    fn child(parent: OpCode, child: &Node, is_right: bool) -> String {
        let text = Self::infix(child);

        let wrap = match child.op() {
            Some(op) => {
                op.input_precedence() < parent.input_precedence()
                    || (is_right && parent.arity() == 2 && parent.is_right_associative())
            }
            None => false,
        };

        if wrap {
            format!("({})", text)
        } else {
            text
        }
    }
}
