#[cfg(test)]
mod function_tests {
    use pretty_assertions::assert_eq;

    use confexpr::environment::Environment;
    use confexpr::error::{ExprError, Result};
    use confexpr::expr::Expression;
    use confexpr::function::Function;
    use confexpr::tuple::Tuple;
    use confexpr::value::{Value, ValueRef};

    fn script(body: &str) -> ValueRef {
        Value::function(Function::script(Expression::parse(body).unwrap()))
    }

    fn int_arg(args: &Tuple, name: &str) -> Result<i64> {
        args.find(name)
            .ok_or_else(|| ExprError::not_found(name))?
            .actual_int()
    }

    fn eval_in(env: &mut Environment, src: &str) -> Result<Option<ValueRef>> {
        Expression::parse(src)?.evaluate(env)
    }

    fn env_with_add() -> Environment {
        let mut env = Environment::new();

        env.set_function(
            "lib.add",
            Function::native("add", |_env, args| {
                let sum = int_arg(args, "a")? + int_arg(args, "b")?;
                Ok(Some(Value::int(sum)))
            }),
        );

        env
    }

    #[test]
    fn test_native_function_through_declared_record() {
        let mut env = env_with_add();

        let value = eval_in(&mut env, "{target: $lib.add} call {a: 2, b: 3}").unwrap().unwrap();

        assert_eq!(value.to_string(), "5");
        assert_eq!(env.depth(), 1);
    }

    #[test]
    fn test_script_function_value() {
        let mut env = Environment::new();
        env.set("double", script("return (x * 2)"));

        let value = eval_in(&mut env, "double call {x: 21}").unwrap().unwrap();

        assert_eq!(value.to_string(), "42");
    }

    #[test]
    fn test_arguments_resolve_in_caller_scope() {
        let mut env = Environment::new();
        env.set("double", script("return (x * 2)"));
        env.set("n", Value::int(4));

        let value = eval_in(&mut env, "double call {x: n}").unwrap().unwrap();

        assert_eq!(value.to_string(), "8");
    }

    #[test]
    fn test_arguments_do_not_leak() {
        let mut env = Environment::new();
        env.set("f", script("y = x; return y"));

        eval_in(&mut env, "f call {x: 1}").unwrap();

        assert!(!env.contains("x"));
        assert!(!env.contains("y"));
        assert_eq!(env.depth(), 1);
    }

    #[test]
    fn test_body_sees_outer_variables() {
        let mut env = Environment::new();
        env.set("base", Value::int(100));
        env.set("f", script("return (base + x)"));

        let value = eval_in(&mut env, "f call {x: 1}").unwrap().unwrap();

        assert_eq!(value.to_string(), "101");
    }

    #[test]
    fn test_return_stops_the_body() {
        let mut env = Environment::new();
        env.set("f", script("return 1; hit = true; return 2"));

        let value = eval_in(&mut env, "f call {}").unwrap().unwrap();

        assert_eq!(value.to_string(), "1");
        assert!(!env.contains("hit"));
    }

    #[test]
    fn test_missing_return_yields_false() {
        let mut env = Environment::new();
        env.set("f", script("z = 1"));

        let value = eval_in(&mut env, "f call {}").unwrap().unwrap();

        assert_eq!(value.to_string(), "false");
    }

    #[test]
    fn test_scope_is_popped_when_body_fails() {
        let mut env = Environment::new();
        env.set("f", script("return (x / 0)"));

        assert!(matches!(eval_in(&mut env, "f call {x: 1}"), Err(ExprError::DivisionByZero)));
        assert_eq!(env.depth(), 1);
        assert!(!env.contains("x"));
    }

    #[test]
    fn test_unknown_declared_function() {
        let mut env = Environment::new();

        match eval_in(&mut env, "{target: $nope} call {}") {
            Err(ExprError::NotFound(text)) => assert_eq!(text, "$nope"),
            other => panic!("unexpected {:?}", other.map(|v| v.map(|v| v.to_string()))),
        }
    }

    #[test]
    fn test_non_callable() {
        let mut env = Environment::new();

        match eval_in(&mut env, "1 call {}") {
            Err(ExprError::UnsupportedOperand { operator, kinds }) => {
                assert_eq!(operator, "call");
                assert_eq!(kinds, "int, tuple");
            }
            other => panic!("unexpected {:?}", other.map(|v| v.map(|v| v.to_string()))),
        }
    }

    #[test]
    fn test_invoke_directly() {
        let mut env = env_with_add();
        let add = env.get_function("lib.add").unwrap();

        let mut args = Tuple::new();
        args.set("a", Value::int(40));
        args.set("b", Value::int(2));

        let value = add.invoke(&mut env, &args).unwrap().unwrap();

        assert_eq!(value.to_string(), "42");
        assert_eq!(add.to_string(), "<native fn add>");
    }

    #[test]
    fn test_native_errors_propagate() {
        let mut env = env_with_add();

        let result = eval_in(&mut env, "{target: $lib.add} call {a: 1}");

        assert!(matches!(result, Err(ExprError::NotFound(text)) if text == "b"));
        assert_eq!(env.depth(), 1);
    }

    #[test]
    fn test_function_equality() {
        let a = script("return 1");
        let b = script("return 1");
        let c = script("return 2");

        assert_eq!(a, b);
        assert_ne!(a, c);

        let native = Value::function(Function::native("f", |_, _| Ok(None)));
        assert_eq!(native, native.clone());
    }
}
