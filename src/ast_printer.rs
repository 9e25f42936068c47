use crate::ast::{Expr, FunctionDecl, LiteralValue};

/// Renders an expression in parenthesized prefix form, e.g.
/// `(* (group (+ 1.0 2.0)) x)`.
pub struct AstPrinter;

impl AstPrinter {
    pub fn print(expr: &Expr) -> String {
        match expr {
            // ── literals ────────────────────────────────────────────────
            Expr::Literal(lit) => match lit {
                LiteralValue::True => "true".into(),

                LiteralValue::False => "false".into(),

                LiteralValue::Null => "null".into(),

                LiteralValue::Str(s) => s.clone(),

                LiteralValue::Number(n) => {
                    if n.fract() == 0.0 {
                        // 3.0 → 3.0
                        format!("{:.1}", n)
                    } else {
                        n.to_string()
                    }
                }
            },

            Expr::Grouping(inner) => format!("(group {})", Self::print(inner)),

            Expr::Unary { operator, right } => {
                format!("({} {})", operator.lexeme, Self::print(right))
            }

            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            } => format!(
                "({} {} {})",
                operator.lexeme,
                Self::print(left),
                Self::print(right)
            ),

            Expr::Variable { name, .. } => name.lexeme.clone(),

            Expr::Assign { name, value, .. } => {
                format!("(= {} {})", name.lexeme, Self::print(value))
            }

            Expr::Call {
                callee, arguments, ..
            } => Self::list(&format!("call {}", Self::print(callee)), arguments),

            Expr::Get { object, name } => format!("(. {} {})", Self::print(object), name.lexeme),

            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "(= (. {} {}) {})",
                Self::print(object),
                name.lexeme,
                Self::print(value)
            ),

            Expr::Subscript { object, index, .. } => {
                format!("([] {} {})", Self::print(object), Self::print(index))
            }

            Expr::SubscriptSet {
                object,
                index,
                value,
                ..
            } => format!(
                "(= ([] {} {}) {})",
                Self::print(object),
                Self::print(index),
                Self::print(value)
            ),

            Expr::Array(items) => Self::list("array", items),

            Expr::Dictionary { entries, .. } => {
                let mut s = String::from("(dict");
                for (key, value) in entries {
                    s.push_str(&format!(" ({} {})", Self::print(key), Self::print(value)));
                }
                s.push(')');
                s
            }

            Expr::Function(decl) => Self::function(decl),

            Expr::This { .. } => "this".into(),

            Expr::Super { method, .. } => format!("(super {})", method.lexeme),

            Expr::Import { path, .. } => format!("(import {})", Self::print(path)),
        }
    }

    fn list(head: &str, items: &[Expr]) -> String {
        let mut s = format!("({}", head);
        for item in items {
            s.push(' ');
            s.push_str(&Self::print(item));
        }
        s.push(')');
        s
    }

    fn function(decl: &FunctionDecl) -> String {
        let params: Vec<String> = decl
            .params
            .iter()
            .map(|p| {
                let name = if p.variadic {
                    format!("*{}", p.name.lexeme)
                } else {
                    p.name.lexeme.clone()
                };

                match &p.default {
                    Some(default) => format!("(= {} {})", name, Self::print(default)),
                    None => name,
                }
            })
            .collect();

        format!("(function ({}))", params.join(" "))
    }
}
