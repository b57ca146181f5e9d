#[cfg(test)]
mod evaluator_tests {
    use std::path::Path;
    use std::rc::Rc;

    use pretty_assertions::assert_eq;

    use confexpr::environment::Environment;
    use confexpr::error::{ExprError, Result};
    use confexpr::expr::Expression;
    use confexpr::fs::MemoryFileSystem;
    use confexpr::resolver::MapResolver;
    use confexpr::value::{Control, Value, ValueRef};

    fn eval_in(env: &mut Environment, src: &str) -> Result<ValueRef> {
        let expr = Expression::parse(src)?;

        expr.evaluate(env)?
            .ok_or_else(|| ExprError::not_found(format!("no value from {}", src)))
    }

    fn eval(src: &str) -> Result<ValueRef> {
        eval_in(&mut Environment::new(), src)
    }

    /// Literal text of the value `src` evaluates to.
    fn show(src: &str) -> String {
        eval(src).unwrap().to_string()
    }

    fn unsupported(src: &str) -> (&'static str, String) {
        match eval(src) {
            Err(ExprError::UnsupportedOperand { operator, kinds }) => (operator, kinds),
            other => panic!("expected UnsupportedOperand for {:?}, got {:?}", src, other.map(|v| v.to_string())),
        }
    }

    fn status(value: &ValueRef) -> (bool, String) {
        let record = value.actual_tuple().unwrap();
        let success = record.find("success").unwrap().actual_bool().unwrap();
        let error = record.find("error").unwrap().actual_string().unwrap().clone();

        (success, error)
    }

    // ───────────────────────── arithmetic ─────────────────────────

    #[test]
    fn test_arithmetic() {
        assert_eq!(show("1 + 2 * 3"), "7");
        assert_eq!(show("(1 + 2) * 3"), "9");
        assert_eq!(show("2 pow ( 3 + 1 )"), "16");
        assert_eq!(show("7 % 3"), "1");
        assert_eq!(show("7 mod 3"), "1");
        assert_eq!(show("1.5 + 1.0"), "2.5");
        assert_eq!(show("3 - -2"), "5");
        assert_eq!(show("-(3)"), "-3");
        assert_eq!(show("sqrt 17"), "4");
        assert_eq!(show("sqrt 2.25"), "1.5");
    }

    #[test]
    fn test_division() {
        assert!(matches!(eval("6 / 0"), Err(ExprError::DivisionByZero)));
        assert!(matches!(eval("6 mod 0"), Err(ExprError::DivisionByZero)));
        assert!(matches!(eval("6.0 / 0.0"), Err(ExprError::DivisionByZero)));

        let value = eval("6 / 3").unwrap();
        assert_eq!(value.actual_int().unwrap(), 2);
    }

    #[test]
    fn test_zero_divisor_of_the_wrong_kind_is_unsupported() {
        assert_eq!(unsupported("\"abc\" / 0"), ("/", "string, int".to_owned()));
        assert_eq!(unsupported("6 / 0.0"), ("/", "int, float".to_owned()));
        assert_eq!(unsupported("6.0 mod 0"), ("mod", "float, int".to_owned()));
    }

    #[test]
    fn test_mod_is_integer_only() {
        assert_eq!(unsupported("7.5 mod 2.0"), ("mod", "float, float".to_owned()));
        assert_eq!(show("-7 mod 3"), "-1");
    }

    #[test]
    fn test_mixed_kinds_are_unsupported() {
        assert_eq!(unsupported("\"a\" + 1"), ("+", "string, int".to_owned()));
        assert_eq!(unsupported("1 == 1.0"), ("==", "int, float".to_owned()));
        assert_eq!(unsupported("not 1"), ("not", "int".to_owned()));
    }

    #[test]
    fn test_unsupported_names_resolved_kinds() {
        let mut env = Environment::new();
        env.set("s", Value::string("x"));

        match eval_in(&mut env, "s * 2.0") {
            Err(ExprError::UnsupportedOperand { operator, kinds }) => {
                assert_eq!(operator, "*");
                assert_eq!(kinds, "string, float");
            }
            other => panic!("unexpected {:?}", other.map(|v| v.to_string())),
        }
    }

    #[test]
    fn test_error_messages() {
        let e = eval("\"a\" - 1").unwrap_err();
        assert_eq!(e.to_string(), "unsupported operand kind(s) string, int for operator '-'");

        let e = eval("missing + 1").unwrap_err();
        assert_eq!(e.to_string(), "not found: missing");
    }

    // ───────────────────────── strings & collections ─────────────────────────

    #[test]
    fn test_string_operators() {
        assert_eq!(show("\"ab\" + \"cd\""), "\"abcd\"");
        assert_eq!(show("\"abcabc\" - \"b\""), "\"acac\"");
        assert_eq!(show("\"ab\" * 3"), "\"ababab\"");
        assert_eq!(show("len \"héllo\""), "5");
        assert_eq!(show("trim \"  x  \""), "\"x\"");
        assert_eq!(show("ltrim \"  x  \""), "\"x  \"");
        assert_eq!(show("rtrim \"  x  \""), "\"  x\"");
        assert_eq!(show("\"abcdef\"[1]"), "'b'");
        assert_eq!(show("\"abcdef\"[-1]"), "'f'");
        assert_eq!(show("\"abcdef\"[1:3]"), "\"bcd\"");
        assert_eq!(show("\"abcdef\"[3:1]"), "\"bcd\"");
    }

    #[test]
    fn test_resize() {
        assert_eq!(show("\"one\" resize 5"), "\"one  \"");
        assert_eq!(show("\"one\" resize 1"), "\"o\"");
        assert_eq!(show("[\"a\"] resize 3"), "[\"a\", \"\", \"\"]");
    }

    #[test]
    fn test_resize_leaves_literal_untouched() {
        let expr = Expression::parse("\"one\" resize 5").unwrap();
        let mut env = Environment::new();

        expr.evaluate(&mut env).unwrap();
        let second = expr.evaluate(&mut env).unwrap().unwrap();

        assert_eq!(second.actual_string().unwrap().as_str(), "one  ");
        assert_eq!(expr.infix_str(), "\"one\" resize 5");
    }

    #[test]
    fn test_resize_mutates_variable_in_place() {
        let mut env = Environment::new();
        let shared = Value::string("abc");
        env.set("s", shared.clone());

        eval_in(&mut env, "s resize 5").unwrap();

        assert_eq!(shared.actual_string().unwrap().as_str(), "abc  ");
        assert_eq!(eval_in(&mut env, "len s").unwrap().actual_int().unwrap(), 5);
    }

    #[test]
    fn test_raw_index_and_slice() {
        let mut env = Environment::new();
        eval_in(&mut env, r#"r = ["one", "two", "three"]"#).unwrap();

        assert_eq!(eval_in(&mut env, "r[-1]").unwrap().to_string(), "\"three\"");
        assert_eq!(eval_in(&mut env, "r[1]").unwrap().to_string(), "\"two\"");
        assert_eq!(eval_in(&mut env, "r[5]").unwrap().to_string(), "\"three\"");
        assert_eq!(eval_in(&mut env, "r[-7]").unwrap().to_string(), "\"one\"");

        let reversed = eval_in(&mut env, "r[-1:-2]").unwrap();
        assert_eq!(reversed.actual_raw().unwrap().join(","), "three,two");

        let forward = eval_in(&mut env, "r[0:1]").unwrap();
        assert_eq!(forward.actual_raw().unwrap().join(","), "one,two");
    }

    #[test]
    fn test_empty_collection_index_is_not_found() {
        assert!(matches!(eval("\"\"[0]"), Err(ExprError::NotFound(text)) if text == "\"\"[0]"));
    }

    #[test]
    fn test_binary_values() {
        assert_eq!(show("tobin \"AB\""), "x\"4142\"");
        assert_eq!(show("x\"0aff\"[1]"), "255");
        assert_eq!(show("x\"0a\" + x\"ff\""), "x\"0aff\"");
        assert_eq!(show("len x\"0aff\""), "2");
    }

    #[test]
    fn test_membership() {
        assert_eq!(show("'b' in \"abc\""), "true");
        assert_eq!(show("\"bc\" in \"abc\""), "true");
        assert_eq!(show("\"two\" in [\"one\", \"two\"]"), "true");
        assert_eq!(show("\"six\" in [\"one\", \"two\"]"), "false");
        assert_eq!(show("#a in {a: 1}"), "true");
        assert_eq!(show("#b in meta{a: 1}"), "false");
    }

    #[test]
    fn test_tuples() {
        assert_eq!(show("{a: 1} + {b: 2}"), "{a: 1, b: 2}");
        assert_eq!(show("({a: 1} + 5)[1]"), "5");
        assert_eq!(show("{a: 1, b: \"x\"}[#b]"), "\"x\"");
        assert_eq!(show("len {a: 1, 2}"), "2");
        assert_eq!(show("meta{a: 1} + {b: 2}"), "meta{a: 1, b: 2}");

        assert!(matches!(eval("{a: 1}[#zz]"), Err(ExprError::NotFound(_))));
    }

    // ───────────────────────── comparison & logic ─────────────────────────

    #[test]
    fn test_comparisons() {
        assert_eq!(show("2 >= 2"), "true");
        assert_eq!(show("2 > 2"), "false");
        assert_eq!(show("\"abc\" < \"abd\""), "true");
        assert_eq!(show("'a' != 'b'"), "true");
        assert_eq!(show("#x == #x"), "true");
        assert_eq!(show("1.5 <= 1.0"), "false");
    }

    #[test]
    fn test_logic_is_eager() {
        let mut env = Environment::new();

        let value = eval_in(&mut env, "false and (x = true)").unwrap();
        assert!(!value.actual_bool().unwrap());
        assert!(env.contains("x"));

        let value = eval_in(&mut env, "true or (y = true)").unwrap();
        assert!(value.actual_bool().unwrap());
        assert!(env.contains("y"));
    }

    #[test]
    fn test_if_else_short_circuits() {
        let mut env = Environment::new();

        assert_eq!(eval_in(&mut env, "1 if true else (y = 2)").unwrap().to_string(), "1");
        assert!(!env.contains("y"));

        assert_eq!(eval_in(&mut env, "(y = 1) if false else 2").unwrap().to_string(), "2");
        assert!(!env.contains("y"));
    }

    #[test]
    fn test_if_else_condition_is_the_middle_operand() {
        assert_eq!(show("1 if true else 2"), "1");
        assert_eq!(show("1 if false else 2"), "2");
        assert_eq!(show("\"a\" if 1 < 2 else \"b\""), "\"a\"");
        assert_eq!(show("false if true else true"), "false");
        assert_eq!(unsupported("1 if 2 else 3"), ("if", "int".to_owned()));
    }

    #[test]
    fn test_evaluation_leaves_the_tree_unchanged() {
        let mut env = Environment::new();

        for src in [
            "{a: \"abc\"}[#a] resize 1",
            "[\"one\", \"two\"][0] resize 1",
            "(\"abc\" if true else \"x\") resize 1",
        ] {
            let expr = Expression::parse(src).unwrap();
            let before = expr.infix_str();

            let first = expr.evaluate(&mut env).unwrap().unwrap().to_string();
            let second = expr.evaluate(&mut env).unwrap().unwrap().to_string();

            assert_eq!(expr.infix_str(), before);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_returned_literal_is_a_copy() {
        let expr = Expression::parse("r = return \"abc\"").unwrap();
        let mut env = Environment::new();

        expr.evaluate(&mut env).unwrap();

        let returned = env.get("r");
        let payload = match &*returned {
            Value::Control(Control::Return(payload)) => payload.clone(),
            other => panic!("unexpected {}", other),
        };
        payload.actual_string_mut().unwrap().push('!');

        assert_eq!(expr.infix_str(), "r = return \"abc\"");
    }

    #[test]
    fn test_expression_variable_does_not_leak_its_literal() {
        let mut env = Environment::new();
        env.set("e", Value::expression(Expression::parse("\"abc\"").unwrap()));

        assert_eq!(eval_in(&mut env, "e resize 1").unwrap().to_string(), "\"a\"");
        assert_eq!(eval_in(&mut env, "e").unwrap().to_string(), "\"abc\"");
    }

    // ───────────────────────── variables ─────────────────────────

    #[test]
    fn test_assign_from_expression() {
        let mut env = Environment::new();
        env.set("b", Value::int(123));

        eval_in(&mut env, "a = b + 321").unwrap();

        assert_eq!(env.get("a").actual_int().unwrap(), 444);
    }

    #[test]
    fn test_assign_copies_variables() {
        let mut env = Environment::new();
        eval_in(&mut env, "s = \"abc\"; t = s; t resize 1").unwrap();

        assert_eq!(env.get("s").actual_string().unwrap().as_str(), "abc");
        assert_eq!(env.get("t").actual_string().unwrap().as_str(), "a");
    }

    #[test]
    fn test_assign_requires_a_slot() {
        assert_eq!(unsupported("1 = 2"), ("=", "int".to_owned()));
        assert_eq!(unsupported("(a) + 1 = 2").0, "=");
    }

    #[test]
    fn test_reference_assignment() {
        assert!(matches!(eval("$doc.x = 1"), Err(ExprError::NotFound(text)) if text == "$doc.x"));

        let mut env = Environment::new().with_resolver(MapResolver::new());
        assert_eq!(eval_in(&mut env, "$doc.x = 5; $doc/x + 1").unwrap().to_string(), "6");

        let mut env = Environment::new().with_resolver(MapResolver::new().read_only());
        assert!(matches!(eval_in(&mut env, "$doc.x = 5"), Err(ExprError::NotFound(_))));
    }

    #[test]
    fn test_isset_inspects_the_operand() {
        let mut env = Environment::new();
        env.set("here", Value::bool(false));

        assert_eq!(eval_in(&mut env, "isset here").unwrap().to_string(), "true");
        assert_eq!(eval_in(&mut env, "isset gone").unwrap().to_string(), "false");
        assert_eq!(unsupported("isset 1"), ("isset", "int".to_owned()));
    }

    #[test]
    fn test_match_sets_captures() {
        let mut env = Environment::new();

        let hit = eval_in(&mut env, "\"alpha beta\" match ?/.+@<grp1>(ha)/").unwrap();
        assert!(hit.actual_bool().unwrap());
        assert_eq!(env.get("grp1").actual_string().unwrap().as_str(), "ha");

        let miss = eval_in(&mut env, "\"xyz\" match ?/@<other>(q)/").unwrap();
        assert!(!miss.actual_bool().unwrap());
        assert!(!env.contains("other"));
        assert_eq!(env.get("grp1").actual_string().unwrap().as_str(), "ha");
    }

    #[test]
    fn test_match_on_raw_lines() {
        let mut env = Environment::new();

        let hit = eval_in(&mut env, "[\"a=1\", \"key=42\"] match ?/key=@<v>([0-9]+)/").unwrap();

        assert!(hit.actual_bool().unwrap());
        assert_eq!(env.get("v").actual_string().unwrap().as_str(), "42");
    }

    // ───────────────────────── conversions ─────────────────────────

    #[test]
    fn test_conversions() {
        assert_eq!(show("toint \"42\""), "42");
        assert_eq!(show("toint 3.9"), "3");
        assert_eq!(show("tofloat 2"), "2.0");
        assert_eq!(show("tostr 3.5"), "\"3.5\"");
        assert_eq!(show("tobool \"TRUE\""), "true");
        assert_eq!(show("tochar 65"), "'A'");
        assert_eq!(show("toname \"abc\""), "#abc");
        assert_eq!(show("toraw \"a\\nb\""), "[\"a\", \"b\"]");
        assert_eq!(unsupported("toint {}"), ("toint", "tuple".to_owned()));
    }

    #[test]
    fn test_introspection() {
        assert_eq!(show("typeof 1.5"), "#float");
        assert_eq!(show("typeof [\"a\"]"), "#raw");
        assert_eq!(show("isname \"abc_1\""), "true");
        assert_eq!(show("isname \"1abc\""), "false");
        assert_eq!(show("isname #n"), "true");
        assert_eq!(show("isname 3"), "false");
    }

    #[test]
    fn test_top_level_return_is_a_control_value() {
        let value = eval("return 5").unwrap();

        assert_eq!(value.to_string(), "<return 5>");
    }

    // ───────────────────────── file system ─────────────────────────

    #[test]
    fn test_saveto_and_delete_in_memory() {
        let fs = Rc::new(MemoryFileSystem::new());
        let mut env = Environment::new().with_file_system(Rc::clone(&fs));

        let saved = eval_in(&mut env, "\"hi\" saveto \"out.txt\"").unwrap();
        assert_eq!(status(&saved), (true, String::new()));
        assert_eq!(fs.contents(Path::new("out.txt")), Some(b"hi".to_vec()));

        assert_eq!(eval_in(&mut env, "exists \"out.txt\"").unwrap().to_string(), "true");
        assert_eq!(eval_in(&mut env, "loadstr \"out.txt\"").unwrap().to_string(), "\"hi\"");

        let deleted = eval_in(&mut env, "delete \"out.txt\"").unwrap();
        assert_eq!(status(&deleted), (true, String::new()));
        assert!(fs.contents(Path::new("out.txt")).is_none());
    }

    #[test]
    fn test_file_failures_become_status_records() {
        let fs = Rc::new(MemoryFileSystem::new());
        fs.insert("locked.txt", b"keep");
        fs.protect("locked.txt");
        let mut env = Environment::new().with_file_system(Rc::clone(&fs));

        let (success, error) = status(&eval_in(&mut env, "\"x\" saveto \"locked.txt\"").unwrap());
        assert!(!success);
        assert!(error.contains("locked.txt"));

        let (success, error) = status(&eval_in(&mut env, "delete \"nowhere.txt\"").unwrap());
        assert!(!success);
        assert!(!error.is_empty());

        assert_eq!(fs.contents(Path::new("locked.txt")), Some(b"keep".to_vec()));
    }

    #[test]
    fn test_load_failures_propagate() {
        let mut env = Environment::new().with_file_system(MemoryFileSystem::new());

        assert!(matches!(eval_in(&mut env, "loadstr \"none\""), Err(ExprError::Open { .. })));
        assert!(matches!(eval_in(&mut env, "loadbin \"none\""), Err(ExprError::Open { .. })));
    }

    #[test]
    fn test_local_file_system_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.txt");

        let mut env = Environment::new();
        env.set("p", Value::string(path.to_str().unwrap()));

        let saved = eval_in(&mut env, "\"first\\nsecond\" saveto p").unwrap();
        assert_eq!(status(&saved), (true, String::new()));

        assert_eq!(eval_in(&mut env, "exists p").unwrap().to_string(), "true");
        assert_eq!(eval_in(&mut env, "len loadraw p").unwrap().to_string(), "2");
        assert_eq!(eval_in(&mut env, "loadstr p").unwrap().to_string(), "\"first\\nsecond\"");
        assert_eq!(eval_in(&mut env, "len loadbin p").unwrap().to_string(), "12");

        let deleted = eval_in(&mut env, "delete p").unwrap();
        assert_eq!(status(&deleted), (true, String::new()));
        assert_eq!(eval_in(&mut env, "exists p").unwrap().to_string(), "false");

        let (success, _) = status(&eval_in(&mut env, "delete p").unwrap());
        assert!(!success);
    }
}
