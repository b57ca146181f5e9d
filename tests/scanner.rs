#[cfg(test)]
mod scanner_tests {
    use confexpr::error::ExprError;
    use confexpr::scanner::*;
    use confexpr::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source.as_bytes());
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "([{,:;}])",
            &[
                (TokenType::SYMBOL, "("),
                (TokenType::SYMBOL, "["),
                (TokenType::SYMBOL, "{"),
                (TokenType::SYMBOL, ","),
                (TokenType::SYMBOL, ":"),
                (TokenType::SYMBOL, ";"),
                (TokenType::SYMBOL, "}"),
                (TokenType::SYMBOL, "]"),
                (TokenType::SYMBOL, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_two_symbol_operators_stay_split() {
        assert_token_sequence(
            "a<=b",
            &[
                (TokenType::IDENTIFIER, "a"),
                (TokenType::SYMBOL, "<"),
                (TokenType::SYMBOL, "="),
                (TokenType::IDENTIFIER, "b"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_statement() {
        assert_token_sequence(
            "a = b + 321;",
            &[
                (TokenType::IDENTIFIER, "a"),
                (TokenType::SYMBOL, "="),
                (TokenType::IDENTIFIER, "b"),
                (TokenType::SYMBOL, "+"),
                (TokenType::INTEGER, "321"),
                (TokenType::SYMBOL, ";"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_04_literal_forms() {
        assert_token_sequence(
            r#"#name x"00ff" ?/a\/b/ $doc.path 'c' "s\"q" 1.5e3 2 3.25"#,
            &[
                (TokenType::NAME, "#name"),
                (TokenType::BINARY, "x\"00ff\""),
                (TokenType::REGEX, r"?/a\/b/"),
                (TokenType::REFERENCE, "$doc.path"),
                (TokenType::CHAR, "'c'"),
                (TokenType::STRING, r#""s\"q""#),
                (TokenType::FLOAT, "1.5e3"),
                (TokenType::INTEGER, "2"),
                (TokenType::FLOAT, "3.25"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_05_comments_and_lines() {
        let tokens: Vec<_> = Scanner::new(b"1 // one\n2 // two")
            .filter_map(Result::ok)
            .collect();

        assert_eq!(tokens.len(), 3);
        assert_eq!((tokens[0].lexeme, tokens[0].line), ("1", 1));
        assert_eq!((tokens[1].lexeme, tokens[1].line), ("2", 2));
        assert!(tokens[2].is_eof());
    }

    #[test]
    fn test_scanner_06_spans() {
        let tokens: Vec<_> = Scanner::new(b"ab + c").filter_map(Result::ok).collect();

        assert_eq!(tokens[0].span, 0..2);
        assert_eq!(tokens[1].span, 3..4);
        assert_eq!(tokens[2].span, 5..6);
        assert_eq!(tokens[3].span, 6..6);
    }

    #[test]
    fn test_unexpected_chars_token_sequence() {
        let results: Vec<_> = Scanner::new(b"a @ b").collect();

        // a, error for '@', b, EOF
        assert_eq!(results.len(), 4);
        assert!(matches!(&results[0], Ok(t) if t.lexeme == "a"));
        assert!(matches!(&results[1], Err(ExprError::BadExpression(msg)) if msg.contains('@')));
        assert!(matches!(&results[2], Ok(t) if t.lexeme == "b"));
        assert!(matches!(&results[3], Ok(t) if t.is_eof()));
    }

    #[test]
    fn test_unterminated_string() {
        let results: Vec<_> = Scanner::new(b"\"abc").collect();

        assert_eq!(results.len(), 2);
        assert!(matches!(&results[0], Err(ExprError::BadExpression(msg)) if msg.contains("Unterminated")));
        assert!(matches!(&results[1], Ok(t) if t.is_eof()));
    }

    #[test]
    fn test_tokenize_stops_at_first_error() {
        assert!(Scanner::tokenize(b"1 + @").is_err());
        assert!(Scanner::tokenize(b"1 + 2").is_ok());
    }

    #[test]
    fn test_token_json() {
        let token = Scanner::new(b"7").next().unwrap().unwrap();
        let json = serde_json::to_string(&token).unwrap();

        assert!(json.contains("\"token_type\":\"INTEGER\""));
        assert!(json.contains("\"lexeme\":\"7\""));
    }

    #[test]
    fn test_token_display() {
        let token = Scanner::new(b"  foo").next().unwrap().unwrap();

        assert_eq!(token.to_string(), "identifier foo 2..5");
    }

    #[test]
    fn test_cursor_lookahead_and_eof() {
        let mut cursor = Scanner::tokenize(b"a ;").unwrap();

        assert!(cursor.previous().is_none());
        assert_eq!(cursor.peek().lexeme, "a");
        assert!(cursor.peek_next().is_symbol(";"));

        cursor.advance();
        assert!(cursor.match_symbol(";"));
        assert!(!cursor.match_symbol(";"));
        assert!(cursor.is_at_end());

        // Advancing sticks at EOF.
        assert!(cursor.advance().is_eof());
        assert!(cursor.peek().is_eof());
        assert!(cursor.previous().is_some_and(|t| t.is_symbol(";")));
    }

    #[test]
    fn test_cursor_appends_missing_eof() {
        let tokens = vec![Token::new(TokenType::INTEGER, "1", 0..1, 1)];
        let cursor = TokenCursor::new(tokens);

        assert_eq!(cursor.peek().lexeme, "1");
        assert!(cursor.peek_next().is_eof());
    }
}
