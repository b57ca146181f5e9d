use std::fmt;
use std::rc::Rc;

use log::{debug, info};

use crate::environment::Environment;
use crate::error::Result;
use crate::expr::Expression;
use crate::tuple::Tuple;
use crate::value::{Control, Value, ValueRef};

/// Host callback.  Receives the callee scope (arguments already bound) and the
/// argument record.
pub type NativeFn = Rc<dyn Fn(&mut Environment, &Tuple) -> Result<Option<ValueRef>>>;

/// Callable value: a compiled expression body or a host closure.
#[derive(Clone)]
pub enum Function {
    Script(Expression),
    Native { name: String, call: NativeFn },
}

impl Function {
    pub fn script(body: Expression) -> Self {
        Function::Script(body)
    }

    pub fn native<F>(name: &str, call: F) -> Self
    where
        F: Fn(&mut Environment, &Tuple) -> Result<Option<ValueRef>> + 'static,
    {
        Function::Native {
            name: name.to_owned(),
            call: Rc::new(call),
        }
    }

    /// Run the function in a fresh scope holding the named arguments.
    ///
    /// A script body runs statement by statement and stops at the first
    /// `return`, whose payload is the result.  Falling off the end yields
    /// `None`.  The scope is popped on every exit path, errors included.
    pub fn invoke(&self, env: &mut Environment, args: &Tuple) -> Result<Option<ValueRef>> {
        info!("Invoking {}", self);

        let mut scope = env.scope();

        for attribute in args.iter() {
            if let Some(name) = &attribute.name {
                debug!("Binding argument '{}' = {}", name, attribute.value);
                scope.set_top(name.as_str(), attribute.value.clone());
            }
        }

        match self {
            Function::Script(body) => {
                for statement in body.statements() {
                    let result = statement.evaluate(&mut *scope)?;

                    if let Some(value) = result {
                        if let Value::Control(Control::Return(payload)) = &*value {
                            debug!("Function returned {}", payload);
                            return Ok(Some(payload.clone()));
                        }
                    }
                }

                debug!("Function completed without return");

                Ok(None)
            }

            Function::Native { call, .. } => call(&mut *scope, args),
        }
    }

    /// Identity for natives, structural equality for scripts.
    pub(crate) fn same(&self, other: &Function) -> bool {
        match (self, other) {
            (Function::Script(a), Function::Script(b)) => a == b,
            (Function::Native { call: a, .. }, Function::Native { call: b, .. }) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::Script(body) => f.debug_tuple("Script").field(&body.postfix_str()).finish(),
            Function::Native { name, .. } => f.debug_struct("Native").field("name", name).finish(),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::Script(body) => write!(f, "<fn {}>", body.infix_str()),
            Function::Native { name, .. } => write!(f, "<native fn {}>", name),
        }
    }
}
