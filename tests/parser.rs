#[cfg(test)]
mod parser_tests {
    use dragon::ast::{Expr, Stmt};
    use dragon::ast_printer::AstPrinter;
    use dragon::parser::Parser;
    use dragon::scanner::scan;

    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Result<Vec<Stmt>, Vec<String>> {
        let (tokens, errors) = scan(source);
        assert!(errors.is_empty(), "lex errors: {:?}", errors);

        Parser::new(tokens)
            .parse()
            .map_err(|errors| errors.iter().map(ToString::to_string).collect())
    }

    fn parse_ok(source: &str) -> Vec<Stmt> {
        parse(source).unwrap_or_else(|errors| panic!("parse failed: {:?}", errors))
    }

    fn parse_err(source: &str) -> Vec<String> {
        match parse(source) {
            Ok(stmts) => panic!("expected errors, parsed {:?}", stmts),
            Err(errors) => errors,
        }
    }

    fn print_expr(source: &str) -> String {
        let (tokens, _) = scan(source);
        let expr = Parser::new(tokens)
            .parse_expression()
            .unwrap_or_else(|errors| panic!("parse failed: {:?}", errors));
        AstPrinter::print(&expr)
    }

    #[test]
    fn test_arithmetic_precedence() {
        assert_eq!(print_expr("1 + 2 * 3"), "(+ 1.0 (* 2.0 3.0))");
        assert_eq!(print_expr("(1 + 2) * 3"), "(* (group (+ 1.0 2.0)) 3.0)");
        assert_eq!(print_expr("10 - 4 % 3"), "(- 10.0 (% 4.0 3.0))");
    }

    #[test]
    fn test_exponent_binds_tighter_and_left() {
        assert_eq!(print_expr("2 * 3 ** 2"), "(* 2.0 (** 3.0 2.0))");
        assert_eq!(print_expr("2 ** 3 ** 2"), "(** (** 2.0 3.0) 2.0)");
    }

    #[test]
    fn test_bitwise_levels_sit_between_comparison_and_additive() {
        assert_eq!(print_expr("a == b | c"), "(== a (| b c))");
        assert_eq!(print_expr("1 | 2 & 3"), "(| 1.0 (& 2.0 3.0))");
        assert_eq!(print_expr("1 ^ 2 & 3"), "(^ 1.0 (& 2.0 3.0))");
        assert_eq!(print_expr("1 & 2 << 3"), "(& 1.0 (<< 2.0 3.0))");
        assert_eq!(print_expr("1 << 2 + 3"), "(<< 1.0 (+ 2.0 3.0))");
        assert_eq!(print_expr("a < b | c"), "(< a (| b c))");
    }

    #[test]
    fn test_logical_and_unary() {
        assert_eq!(print_expr("a or b and c"), "(or a (and b c))");
        assert_eq!(print_expr("-~!x"), "(- (~ (! x)))");
    }

    #[test]
    fn test_postfix_chain() {
        assert_eq!(print_expr("a.b(1)[2]"), "([] (call (. a b) 1.0) 2.0)");
        assert_eq!(print_expr("f()()"), "(call (call f))");
    }

    #[test]
    fn test_assignment_targets() {
        assert_eq!(print_expr("a = b = 1"), "(= a (= b 1.0))");
        assert_eq!(print_expr("a.b = c"), "(= (. a b) c)");
        assert_eq!(print_expr("a[0] = 1"), "(= ([] a 0.0) 1.0)");
    }

    #[test]
    fn test_invalid_assignment_target() {
        let errors = parse_err("1 = 2;\nprint 3;");

        assert_eq!(
            errors,
            vec!["[line 1] Error at '=': Invalid assignment target."]
        );
    }

    #[test]
    fn test_collection_literals() {
        assert_eq!(print_expr("[1, 2,]"), "(array 1.0 2.0)");
        assert_eq!(print_expr("[]"), "(array)");
        assert_eq!(
            print_expr(r#"{"a": 1, b: [2]}"#),
            "(dict (a 1.0) (b (array 2.0)))"
        );
    }

    #[test]
    fn test_function_literal_parameters() {
        assert_eq!(
            print_expr("function (a, b = 2, *rest) {}"),
            "(function (a (= b 2.0) *rest))"
        );
        assert_eq!(print_expr("import(\"math\")"), "(import math)");
        assert_eq!(print_expr("super.greet"), "(super greet)");
    }

    #[test]
    fn test_variadic_must_be_last() {
        let errors = parse_err("function f(*a, b) {}");

        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Variadic parameter must be the last parameter."));
    }

    #[test]
    fn test_break_outside_loop_is_reported_but_parsing_continues() {
        let errors = parse_err("break;\nprint 1;\ncontinue;");

        assert_eq!(
            errors,
            vec![
                "[line 1] Error at 'break': 'break' must be inside a loop or switch.",
                "[line 3] Error at 'continue': 'continue' must be inside a loop or switch.",
            ]
        );
    }

    #[test]
    fn test_function_body_resets_loop_nesting() {
        let errors = parse_err("while (true) { function f() { break; } }");
        assert_eq!(errors.len(), 1);

        parse_ok("function f() { while (true) { break; } }");
        parse_ok("switch (1) { case 1: break; }");
        parse_ok("do { continue; } while (false)");
    }

    #[test]
    fn test_synchronize_reports_every_bad_statement() {
        let errors = parse_err("var = 1;\nvar x = ;\nprint 1;\nprint 2");

        assert_eq!(
            errors,
            vec![
                "[line 1] Error at '=': Expected variable name.",
                "[line 2] Error at ';': Expected expression.",
                "[line 4] Error at end: Expected ';' after value.",
            ]
        );
    }

    #[test]
    fn test_print_with_and_without_parens() {
        let stmts = parse_ok("print(1);\nprint 2;");
        assert_eq!(stmts.len(), 2);
        assert!(stmts.iter().all(|s| matches!(s, Stmt::Print(_))));
    }

    #[test]
    fn test_if_elif_else() {
        let stmts = parse_ok("if (a) print 1; elif (b) print 2; elif (c) print 3; else print 4;");

        match &stmts[0] {
            Stmt::If {
                elif_branches,
                else_branch,
                ..
            } => {
                assert_eq!(elif_branches.len(), 2);
                assert!(else_branch.is_some());
            }
            other => panic!("expected if, got {:?}", other),
        }
    }

    #[test]
    fn test_switch_shape() {
        let stmts = parse_ok(
            "switch (x) { case 1: case 2: print 1; print 2; case 3: default: print 3; }",
        );

        match &stmts[0] {
            Stmt::Switch { cases, default, .. } => {
                assert_eq!(cases.len(), 2);
                assert_eq!(cases[0].labels.len(), 2);
                assert_eq!(cases[0].body.len(), 2);
                assert!(cases[1].body.is_empty());
                assert_eq!(default.as_ref().map(Vec::len), Some(1));
            }
            other => panic!("expected switch, got {:?}", other),
        }
    }

    #[test]
    fn test_switch_rejects_second_default() {
        let errors = parse_err("switch (x) { default: print 1; default: print 2; }");
        assert!(errors[0].contains("only have one default"));
    }

    #[test]
    fn test_try_shape() {
        let stmts = parse_ok("try { a(); } catch { b(); } else { c(); } finally { d(); }");
        match &stmts[0] {
            Stmt::Try {
                body,
                catch,
                otherwise,
                finally,
            } => {
                assert_eq!(body.len(), 1);
                assert!(catch.is_some() && otherwise.is_some() && finally.is_some());
            }
            other => panic!("expected try, got {:?}", other),
        }

        match &parse_ok("try { a(); }")[0] {
            Stmt::Try {
                catch,
                otherwise,
                finally,
                ..
            } => assert!(catch.is_none() && otherwise.is_none() && finally.is_none()),
            other => panic!("expected try, got {:?}", other),
        }
    }

    #[test]
    fn test_class_declaration() {
        let stmts = parse_ok("class B extends A { init(x) { this.x = x; } get() { return this.x; } }");

        match &stmts[0] {
            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                assert_eq!(name.lexeme, "B");
                assert!(matches!(superclass, Some(Expr::Variable { name, .. }) if name.lexeme == "A"));
                let names: Vec<&str> = methods
                    .iter()
                    .filter_map(|m| m.name.as_ref().map(|n| n.lexeme.as_str()))
                    .collect();
                assert_eq!(names, vec!["init", "get"]);
            }
            other => panic!("expected class, got {:?}", other),
        }
    }

    #[test]
    fn test_function_keyword_dispatch() {
        let stmts = parse_ok("function named() {}\nvar f = function () { return 1; };");

        assert!(matches!(&stmts[0], Stmt::Function(decl) if decl.name.is_some()));
        assert!(matches!(
            &stmts[1],
            Stmt::Var { initializer: Some(Expr::Function(decl)), .. } if decl.name.is_none()
        ));
    }

    #[test]
    fn test_import_is_an_expression() {
        let stmts = parse_ok("var m = import(\"./m.dg\");\nimport(\"math\");");

        assert!(matches!(
            &stmts[0],
            Stmt::Var { initializer: Some(Expr::Import { .. }), .. }
        ));
        assert!(matches!(&stmts[1], Stmt::Expression(Expr::Import { .. })));
    }

    #[test]
    fn test_do_while_semicolon_is_optional() {
        assert_eq!(parse_ok("do print 1; while (false)").len(), 1);
        assert_eq!(parse_ok("do print 1; while (false);").len(), 1);
    }

    #[test]
    fn test_for_clauses_are_optional() {
        match &parse_ok("for (;;) break;")[0] {
            Stmt::For {
                initializer,
                condition,
                increment,
                ..
            } => assert!(initializer.is_none() && condition.is_none() && increment.is_none()),
            other => panic!("expected for, got {:?}", other),
        }
    }

    #[test]
    fn test_expression_ids_are_distinct() {
        let stmts = parse_ok("a; a;");

        let ids: Vec<_> = stmts
            .iter()
            .filter_map(|s| match s {
                Stmt::Expression(Expr::Variable { id, .. }) => Some(*id),
                _ => None,
            })
            .collect();

        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
    }
}
