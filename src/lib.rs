pub mod ast;
pub mod ast_printer;
pub mod environment;
pub mod error;
pub mod expr;
pub mod fs;
pub mod function;
pub mod interpreter;
pub mod literal;
pub mod operator;
pub mod parser;
pub mod pattern;
pub mod resolver;
pub mod scanner;
pub mod token;
pub mod tuple;
pub mod value;

pub use environment::Environment;
pub use error::{ExprError, Result};
pub use expr::Expression;
pub use value::{Value, ValueRef};
