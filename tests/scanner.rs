#[cfg(test)]
mod scanner_tests {
    use dragon::error::Error;
    use dragon::scanner::*;
    use dragon::token::*;

    use pretty_assertions::assert_eq;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source);
        let tokens: Vec<_> = scanner.filter_map(std::result::Result::ok).collect();

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    fn assert_token_matches(
        result: &std::result::Result<Token, Error>,
        expected_type: TokenType,
        expected_lexeme: &str,
    ) {
        match result {
            Ok(token) => {
                assert_eq!(
                    token.token_type, expected_type,
                    "Expected token type {:?}, got {:?}",
                    expected_type, token.token_type
                );
                assert_eq!(token.lexeme, expected_lexeme);
            }
            Err(e) => panic!("Expected token but got error: {}", e),
        }
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_operators() {
        assert_token_sequence(
            "[]:% ** ~ & | ^ << >> <= >= < > != == = !",
            &[
                (TokenType::LEFT_BRACKET, "["),
                (TokenType::RIGHT_BRACKET, "]"),
                (TokenType::COLON, ":"),
                (TokenType::PERCENT, "%"),
                (TokenType::STAR_STAR, "**"),
                (TokenType::TILDE, "~"),
                (TokenType::AMPERSAND, "&"),
                (TokenType::PIPE, "|"),
                (TokenType::CARET, "^"),
                (TokenType::LESS_LESS, "<<"),
                (TokenType::GREATER_GREATER, ">>"),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::LESS, "<"),
                (TokenType::GREATER, ">"),
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::EQUAL, "="),
                (TokenType::BANG, "!"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_keywords_and_identifiers() {
        assert_token_sequence(
            "function elif extends null switch case default try catch finally do import functions _tmp",
            &[
                (TokenType::FUNCTION, "function"),
                (TokenType::ELIF, "elif"),
                (TokenType::EXTENDS, "extends"),
                (TokenType::NULL, "null"),
                (TokenType::SWITCH, "switch"),
                (TokenType::CASE, "case"),
                (TokenType::DEFAULT, "default"),
                (TokenType::TRY, "try"),
                (TokenType::CATCH, "catch"),
                (TokenType::FINALLY, "finally"),
                (TokenType::DO, "do"),
                (TokenType::IMPORT, "import"),
                (TokenType::IDENTIFIER, "functions"),
                (TokenType::IDENTIFIER, "_tmp"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_literals_are_decoded() {
        let (tokens, errors) = scan(r#"12 3.5 "hi there" 7."#);
        assert!(errors.is_empty());

        assert_eq!(tokens[0].literal(), Some(Literal::Number(12.0)));
        assert_eq!(tokens[1].literal(), Some(Literal::Number(3.5)));
        assert_eq!(tokens[2].literal(), Some(Literal::Str("hi there".to_string())));

        // a trailing dot is not part of the number
        assert_eq!(tokens[3].lexeme, "7");
        assert_eq!(tokens[4].token_type, TokenType::DOT);
        assert_eq!(tokens[4].literal(), None);
    }

    #[test]
    fn test_token_display() {
        let (tokens, _) = scan(r#"42 "hi" foo 2.5"#);
        let rendered: Vec<String> = tokens.iter().map(ToString::to_string).collect();

        assert_eq!(
            rendered,
            vec![
                "NUMBER 42 42.0",
                "STRING \"hi\" hi",
                "IDENTIFIER foo null",
                "NUMBER 2.5 2.5",
                "EOF  null",
            ]
        );
    }

    #[test]
    fn test_lines_advance_through_comments_and_strings() {
        let source = "// leading comment\nvar s = \"one\ntwo\";\nprint s;";
        let (tokens, errors) = scan(source);
        assert!(errors.is_empty());

        let var = tokens.iter().find(|t| t.lexeme == "var").unwrap();
        assert_eq!(var.line, 2);

        // the string ends on line 3
        let print = tokens.iter().find(|t| t.lexeme == "print").unwrap();
        assert_eq!(print.line, 4);
        assert_eq!(tokens.last().unwrap().token_type, TokenType::EOF);
    }

    #[test]
    fn test_unexpected_chars_token_sequence() {
        let source = ",.$(#";
        let results: Vec<_> = Scanner::new(source).collect();

        // COMMA, DOT, error, LEFT_PAREN, error, EOF
        assert_eq!(results.len(), 6, "Expected 6 items in result");

        assert_token_matches(&results[0], TokenType::COMMA, ",");
        assert_token_matches(&results[1], TokenType::DOT, ".");
        assert_token_matches(&results[3], TokenType::LEFT_PAREN, "(");
        assert_token_matches(&results[5], TokenType::EOF, "");

        let errors: Vec<String> = results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .map(ToString::to_string)
            .collect();

        assert_eq!(
            errors,
            vec![
                "[line 1] Error: Unexpected character: $",
                "[line 1] Error: Unexpected character: #",
            ]
        );
    }

    #[test]
    fn test_non_ascii_character_is_skipped_whole() {
        let (tokens, errors) = scan("é+");

        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("Unexpected character: é"));
        assert_eq!(tokens[0].token_type, TokenType::PLUS);
    }

    #[test]
    fn test_non_ascii_inside_string_is_preserved() {
        let (tokens, errors) = scan("\"héllo\"");

        assert!(errors.is_empty());
        assert_eq!(tokens[0].literal(), Some(Literal::Str("héllo".to_string())));
    }

    #[test]
    fn test_unterminated_string() {
        let (tokens, errors) = scan("\"abc\n");

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].to_string(), "[line 2] Error: Unterminated string.");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].token_type, TokenType::EOF);
    }

    #[test]
    fn test_exactly_one_eof_and_fused() {
        let mut scanner = Scanner::new("");

        assert!(matches!(scanner.next(), Some(Ok(ref t)) if t.token_type == TokenType::EOF));
        assert!(scanner.next().is_none());
        assert!(scanner.next().is_none());
    }
}
