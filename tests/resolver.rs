#[cfg(test)]
mod resolver_tests {
    use dragon::ast::{Expr, ExprId, Stmt};
    use dragon::parser::Parser;
    use dragon::resolver::{Locals, Resolver};
    use dragon::scanner::scan;

    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Vec<Stmt> {
        let (tokens, errors) = scan(source);
        assert!(errors.is_empty());
        Parser::new(tokens).parse().expect("source should parse")
    }

    fn resolve(stmts: &[Stmt]) -> Result<Locals, Vec<String>> {
        Resolver::new()
            .resolve(stmts)
            .map_err(|errors| errors.iter().map(ToString::to_string).collect())
    }

    fn resolve_err(source: &str) -> Vec<String> {
        let stmts = parse(source);
        resolve(&stmts).expect_err("expected resolve errors")
    }

    /// Ids of every `name` reference (variable, `this` or `super`), in
    /// source order.
    fn ids_of(stmts: &[Stmt], name: &str) -> Vec<ExprId> {
        fn walk_expr(expr: &Expr, name: &str, out: &mut Vec<ExprId>) {
            match expr {
                Expr::Variable { id, name: n } if n.lexeme == name => out.push(*id),
                Expr::This { id, .. } if name == "this" => out.push(*id),
                Expr::Super { id, .. } if name == "super" => out.push(*id),
                Expr::Assign { value, .. } => walk_expr(value, name, out),
                Expr::Call {
                    callee, arguments, ..
                } => {
                    walk_expr(callee, name, out);
                    for a in arguments {
                        walk_expr(a, name, out);
                    }
                }
                Expr::Get { object, .. } => walk_expr(object, name, out),
                Expr::Binary { left, right, .. } => {
                    walk_expr(left, name, out);
                    walk_expr(right, name, out);
                }
                Expr::Function(decl) => walk(&decl.body, name, out),
                _ => {}
            }
        }

        fn walk(stmts: &[Stmt], name: &str, out: &mut Vec<ExprId>) {
            for stmt in stmts {
                match stmt {
                    Stmt::Expression(e) | Stmt::Print(e) => walk_expr(e, name, out),
                    Stmt::Var {
                        initializer: Some(e),
                        ..
                    } => walk_expr(e, name, out),
                    Stmt::Return { value: Some(e), .. } => walk_expr(e, name, out),
                    Stmt::Block(inner) => walk(inner, name, out),
                    Stmt::Function(decl) => walk(&decl.body, name, out),
                    Stmt::Class { methods, .. } => {
                        for m in methods {
                            walk(&m.body, name, out);
                        }
                    }
                    _ => {}
                }
            }
        }

        let mut out = Vec::new();
        walk(stmts, name, &mut out);
        out
    }

    fn distances(source: &str, name: &str) -> Vec<Option<usize>> {
        let stmts = parse(source);
        let locals = resolve(&stmts).expect("source should resolve");
        ids_of(&stmts, name)
            .into_iter()
            .map(|id| locals.get(id))
            .collect()
    }

    #[test]
    fn test_globals_are_left_unresolved() {
        let stmts = parse("var a = 1; print a;");
        let locals = resolve(&stmts).unwrap();

        assert!(locals.is_empty());
    }

    #[test]
    fn test_nested_block_distance() {
        assert_eq!(
            distances("{ var a = 1; { print a; } print a; }", "a"),
            vec![Some(1), Some(0)]
        );
    }

    #[test]
    fn test_parameters_and_closures() {
        let source = "
            function outer(x) {
                function inner() { return x; }
                return x;
            }";

        assert_eq!(distances(source, "x"), vec![Some(1), Some(0)]);
    }

    #[test]
    fn test_shadowing_resolves_to_nearest() {
        let source = "{ var a = 1; { var a = 2; print a; } print a; }";
        assert_eq!(distances(source, "a"), vec![Some(0), Some(0)]);
    }

    #[test]
    fn test_this_and_super_distances() {
        let source = "
            class A { greet() { return \"A\"; } }
            class B extends A {
                greet() { return super.greet(); }
                me() { return this; }
            }";

        assert_eq!(distances(source, "super"), vec![Some(2)]);
        assert_eq!(distances(source, "this"), vec![Some(1)]);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let stmts = parse(
            "function f(a, b = a) { var c = a + b; { return c; } }\nclass K { m() { return this; } }",
        );

        let first = resolve(&stmts).unwrap();
        let second = resolve(&stmts).unwrap();

        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn test_read_in_own_initializer_is_fatal() {
        let errors = resolve_err("{ var a = a; }\nreturn 1;");

        // the walk stops, so the later error is never seen
        assert_eq!(
            errors,
            vec!["[line 1] Error at 'a': Can't read local variable in its own initializer."]
        );
    }

    #[test]
    fn test_global_self_reference_is_allowed() {
        let stmts = parse("var a = 1; var a = a;");
        assert!(resolve(&stmts).is_ok());
    }

    #[test]
    fn test_duplicate_local_declaration() {
        let errors = resolve_err("{ var a = 1; var a = 2; }");
        assert_eq!(
            errors,
            vec!["[line 1] Error at 'a': Already a variable with this name in this scope."]
        );

        resolve_err("function f(x, x) {}");
    }

    #[test]
    fn test_return_rules() {
        assert_eq!(
            resolve_err("return 1;"),
            vec!["[line 1] Error at 'return': Can't return from top-level code."]
        );

        assert_eq!(
            resolve_err("class C { init() { return 1; } }"),
            vec!["[line 1] Error at 'return': Can't return a value from an initializer."]
        );

        let stmts = parse("class C { init() { return; } }");
        assert!(resolve(&stmts).is_ok());
    }

    #[test]
    fn test_this_and_super_context_errors() {
        assert_eq!(
            resolve_err("print this;"),
            vec!["[line 1] Error at 'this': Can't use 'this' outside of a class."]
        );
        assert_eq!(
            resolve_err("function f() { return super.x; }"),
            vec!["[line 1] Error at 'super': Can't use 'super' outside of a class."]
        );
        assert_eq!(
            resolve_err("class A { m() { return super.m(); } }"),
            vec!["[line 1] Error at 'super': Can't use 'super' in a class with no superclass."]
        );
        assert_eq!(
            resolve_err("class A extends A {}"),
            vec!["[line 1] Error at 'A': A class can't inherit from itself."]
        );
    }

    #[test]
    fn test_errors_are_collected() {
        let errors = resolve_err("return 1;\nprint this;");
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_merged_tables_keep_both_units() {
        let first = parse("{ var a; print a; }");
        let second = parse("{ var b; print b; }");

        let mut merged = resolve(&first).unwrap();
        let other = resolve(&second).unwrap();
        merged.extend(other.clone());

        assert_eq!(merged.len(), 2);
        for id in ids_of(&second, "b") {
            assert_eq!(merged.get(id), other.get(id));
        }
    }
}
