/*!
Recursive‑descent parser for Dragon.

Time & Space
------------
Each token is consumed once via `advance()`, so parsing is Θ(n) in the number
of tokens. Error recovery (`synchronize`) discards tokens up to the next
statement boundary. Call‑stack depth grows with syntactic nesting; the
expression and statement entry points run under
[`ensure_sufficient_stack`](crate::stack::ensure_sufficient_stack).

### Logging Policy

| Location                     | Level  | Purpose                                   |
|------------------------------|--------|-------------------------------------------|
| `Parser::new`, `parse`       | `info` | Lifecycle milestones.                     |
| `declaration`, `statement`   | `debug`| High‑level descent into grammar branches. |
| Error paths                  | `debug`| Context before recording a diagnostic.    |

--------------------------------------------------------------------------------
Grammar (condensed EBNF)
--------------------------

```text
program        → declaration* EOF ;
declaration    → funDecl | varDecl | classDecl | statement ;
funDecl        → "function" IDENT functionBody ;
classDecl      → "class" IDENT ( "extends" IDENT )? "{" ( IDENT functionBody )* "}" ;
functionBody   → "(" parameters? ")" block ;
parameters     → param ( "," param )* ;
param          → "*" IDENT | IDENT ( "=" logic_or )? ;
varDecl        → "var" IDENT ( "=" expression )? ";" ;
statement      → exprStmt | printStmt | block | ifStmt | whileStmt | forStmt
               | doStmt | switchStmt | tryStmt | breakStmt | continueStmt
               | returnStmt ;
ifStmt         → "if" "(" expression ")" statement
                 ( "elif" "(" expression ")" statement )*
                 ( "else" statement )? ;
doStmt         → "do" statement "while" "(" expression ")" ";"? ;
switchStmt     → "switch" "(" expression ")" "{" ( caseBranch | defaultBranch )* "}" ;
caseBranch     → ( "case" expression ":" )+ declaration* ;
defaultBranch  → "default" ":" declaration* ;
tryStmt        → "try" block ( "catch" block )? ( "else" block )? ( "finally" block )? ;
expression     → assignment ;
assignment     → ( call "." IDENT | call "[" expression "]" | IDENT ) "=" assignment
               | logic_or ;
logic_or       → logic_and ( "or" logic_and )* ;
logic_and      → equality ( "and" equality )* ;
equality       → comparison ( ( "!=" | "==" ) comparison )* ;
comparison     → bit_or ( ( ">" | ">=" | "<" | "<=" ) bit_or )* ;
bit_or         → bit_and ( ( "|" | "^" ) bit_and )* ;
bit_and        → shift ( "&" shift )* ;
shift          → term ( ( "<<" | ">>" ) term )* ;
term           → factor ( ( "-" | "+" ) factor )* ;
factor         → exponent ( ( "/" | "*" | "%" ) exponent )* ;
exponent       → unary ( "**" unary )* ;
unary          → ( "!" | "-" | "~" ) unary | call ;
call           → primary ( "(" arguments? ")" | "." IDENT | "[" expression "]" )* ;
primary        → NUMBER | STRING | "true" | "false" | "null" | "this"
               | IDENT | "(" expression ")" | "super" "." IDENT
               | "[" ( expression ( "," expression )* ","? )? "]"
               | "{" ( expression ":" expression ( "," ... )* ","? )? "}"
               | "function" functionBody
               | "import" "(" expression ")" ;
```
*/

use std::mem;
use std::rc::Rc;

use crate::ast::{CaseBranch, ElifBranch, Expr, ExprId, FunctionDecl, LiteralValue, Param, Stmt};
use crate::error::{Error, Result};
use crate::stack::ensure_sufficient_stack;
use crate::token::{Token, TokenType};

use log::{debug, info};

const MAX_ARGUMENTS: usize = 255;

/// Top‑level parser over an owned token vector.
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,

    /// Nesting of loops and switches; `break`/`continue` need it positive.
    loop_depth: usize,

    /// Diagnostics recorded so far.
    errors: Vec<Error>,
}

impl Parser {
    /// Construct a new parser. `tokens` should end with `EOF`; one is
    /// appended if missing.
    pub fn new(mut tokens: Vec<Token>) -> Self {
        info!("Parser created with {} tokens", tokens.len());

        if !matches!(tokens.last(), Some(t) if t.token_type == TokenType::EOF) {
            let line = tokens.last().map_or(1, |t| t.line);
            tokens.push(Token::new(TokenType::EOF, "", line));
        }

        Self {
            tokens,
            current: 0,
            loop_depth: 0,
            errors: Vec::new(),
        }
    }

    // ───────────────────────── public API ─────────────────────────

    /// Parse an entire program. Every diagnostic is collected; if there was
    /// at least one, the (partial) tree is discarded.
    pub fn parse(mut self) -> std::result::Result<Vec<Stmt>, Vec<Error>> {
        info!("Beginning parse phase");

        let mut statements: Vec<Stmt> = Vec::new();

        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        if self.errors.is_empty() {
            info!("Parsed {} statements", statements.len());
            Ok(statements)
        } else {
            Err(self.errors)
        }
    }

    /// Parse the input as one expression (used by the `parse` subcommand).
    pub fn parse_expression(mut self) -> std::result::Result<Expr, Vec<Error>> {
        info!("Parsing a single expression");

        match self.expression() {
            Ok(expr) => {
                if !self.is_at_end() {
                    let err = self.error(self.peek(), "Expected end of expression.");
                    self.errors.push(err);
                }

                if self.errors.is_empty() {
                    Ok(expr)
                } else {
                    Err(self.errors)
                }
            }

            Err(e) => {
                self.errors.push(e);
                Err(self.errors)
            }
        }
    }

    // ──────────────────────── declaration rules ───────────────────

    /// Parse one declaration. On error the diagnostic is recorded, the
    /// parser resynchronizes and `None` is returned.
    fn declaration(&mut self) -> Option<Stmt> {
        debug!("Entering declaration at line {}", self.peek().line);

        let result = if self.check(TokenType::FUNCTION) && self.check_next(TokenType::IDENTIFIER) {
            self.advance();
            self.function_declaration()
        } else if self.matches(TokenType::VAR) {
            self.var_declaration()
        } else if self.matches(TokenType::CLASS) {
            self.class_declaration()
        } else {
            self.statement()
        };

        match result {
            Ok(stmt) => Some(stmt),
            Err(e) => {
                debug!("Parse error, synchronizing: {}", e);
                self.errors.push(e);
                self.synchronize();
                None
            }
        }
    }

    fn class_declaration(&mut self) -> Result<Stmt> {
        let name: Token = self
            .consume(TokenType::IDENTIFIER, "Expected class name.")?
            .clone();

        let superclass: Option<Expr> = if self.matches(TokenType::EXTENDS) {
            let super_name = self
                .consume(TokenType::IDENTIFIER, "Expected superclass name.")?
                .clone();

            Some(Expr::Variable {
                id: ExprId::fresh(),
                name: super_name,
            })
        } else {
            None
        };

        self.consume(TokenType::LEFT_BRACE, "Expected '{' before class body.")?;

        let mut methods: Vec<Rc<FunctionDecl>> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            let method_name = self
                .consume(TokenType::IDENTIFIER, "Expected method name.")?
                .clone();

            methods.push(self.function_body(Some(method_name), "method")?);
        }

        self.consume(TokenType::RIGHT_BRACE, "Expected '}' after class body.")?;

        Ok(Stmt::Class {
            name,
            superclass,
            methods,
        })
    }

    fn function_declaration(&mut self) -> Result<Stmt> {
        let name: Token = self
            .consume(TokenType::IDENTIFIER, "Expected function name.")?
            .clone();

        Ok(Stmt::Function(self.function_body(Some(name), "function")?))
    }

    /// Parameter list and body shared by declarations, methods and literals.
    fn function_body(&mut self, name: Option<Token>, kind: &str) -> Result<Rc<FunctionDecl>> {
        let line = self.previous().line;

        self.consume(
            TokenType::LEFT_PAREN,
            &format!("Expected '(' after {} name.", kind),
        )?;

        let mut params: Vec<Param> = Vec::new();

        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if params.len() >= MAX_ARGUMENTS {
                    self.report(self.peek().clone(), "Cannot have more than 255 parameters.");
                }

                let variadic = self.matches(TokenType::STAR);
                let param_name = self
                    .consume(TokenType::IDENTIFIER, "Expected parameter name.")?
                    .clone();

                let default = if !variadic && self.matches(TokenType::EQUAL) {
                    Some(self.logical_or()?)
                } else {
                    None
                };

                params.push(Param {
                    name: param_name,
                    default,
                    variadic,
                });

                if variadic {
                    if self.check(TokenType::COMMA) {
                        return Err(
                            self.error(self.peek(), "Variadic parameter must be the last parameter.")
                        );
                    }
                    break;
                }

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after parameters.")?;
        self.consume(
            TokenType::LEFT_BRACE,
            &format!("Expected '{{' before {} body.", kind),
        )?;

        // Loops around a function do not make `break` legal inside it.
        let enclosing_depth = mem::replace(&mut self.loop_depth, 0);
        let body = self.block();
        self.loop_depth = enclosing_depth;

        Ok(Rc::new(FunctionDecl {
            name,
            params,
            body: body?,
            line,
        }))
    }

    fn var_declaration(&mut self) -> Result<Stmt> {
        let name: Token = self
            .consume(TokenType::IDENTIFIER, "Expected variable name.")?
            .clone();

        let initializer: Option<Expr> = if self.matches(TokenType::EQUAL) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            TokenType::SEMICOLON,
            "Expected ';' after variable declaration.",
        )?;

        Ok(Stmt::Var { name, initializer })
    }

    // ───────────────────────── statement rules ────────────────────

    fn statement(&mut self) -> Result<Stmt> {
        ensure_sufficient_stack(|| {
            if self.matches(TokenType::DO) {
                self.do_statement()
            } else if self.matches(TokenType::TRY) {
                self.try_statement()
            } else if self.matches(TokenType::SWITCH) {
                self.switch_statement()
            } else if self.matches(TokenType::RETURN) {
                self.return_statement()
            } else if self.matches(TokenType::CONTINUE) {
                self.jump_statement("continue").map(Stmt::Continue)
            } else if self.matches(TokenType::BREAK) {
                self.jump_statement("break").map(Stmt::Break)
            } else if self.matches(TokenType::FOR) {
                self.for_statement()
            } else if self.matches(TokenType::WHILE) {
                self.while_statement()
            } else if self.matches(TokenType::IF) {
                self.if_statement()
            } else if self.matches(TokenType::PRINT) {
                self.print_statement()
            } else if self.matches(TokenType::LEFT_BRACE) {
                Ok(Stmt::Block(self.block()?))
            } else {
                self.expression_statement()
            }
        })
    }

    /// Run `f` with the loop/switch nesting counter raised by one.
    fn in_loop<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.loop_depth += 1;
        let result = f(self);
        self.loop_depth -= 1;
        result
    }

    fn for_statement(&mut self) -> Result<Stmt> {
        debug!("Parsing for statement");

        self.in_loop(|p| {
            p.consume(TokenType::LEFT_PAREN, "Expected '(' after 'for'.")?;

            let initializer = if p.matches(TokenType::SEMICOLON) {
                None
            } else if p.matches(TokenType::VAR) {
                Some(Box::new(p.var_declaration()?))
            } else {
                Some(Box::new(p.expression_statement()?))
            };

            let condition = if !p.check(TokenType::SEMICOLON) {
                Some(p.expression()?)
            } else {
                None
            };
            p.consume(TokenType::SEMICOLON, "Expected ';' after loop condition.")?;

            let increment = if !p.check(TokenType::RIGHT_PAREN) {
                Some(p.expression()?)
            } else {
                None
            };
            p.consume(TokenType::RIGHT_PAREN, "Expected ')' after for clauses.")?;

            let body = Box::new(p.statement()?);

            Ok(Stmt::For {
                initializer,
                condition,
                increment,
                body,
            })
        })
    }

    fn while_statement(&mut self) -> Result<Stmt> {
        self.in_loop(|p| {
            p.consume(TokenType::LEFT_PAREN, "Expected '(' after 'while'.")?;
            let condition: Expr = p.expression()?;
            p.consume(TokenType::RIGHT_PAREN, "Expected ')' after condition.")?;
            let body: Box<Stmt> = Box::new(p.statement()?);

            Ok(Stmt::While { condition, body })
        })
    }

    fn do_statement(&mut self) -> Result<Stmt> {
        self.in_loop(|p| {
            let body = Box::new(p.statement()?);

            p.consume(TokenType::WHILE, "Expected 'while' after do body.")?;
            p.consume(TokenType::LEFT_PAREN, "Expected '(' after 'while'.")?;
            let condition = p.expression()?;
            p.consume(TokenType::RIGHT_PAREN, "Expected ')' after condition.")?;
            p.matches(TokenType::SEMICOLON);

            Ok(Stmt::DoWhile { body, condition })
        })
    }

    fn switch_statement(&mut self) -> Result<Stmt> {
        debug!("Parsing switch statement");

        self.in_loop(|p| {
            p.consume(TokenType::LEFT_PAREN, "Expected '(' after 'switch'.")?;
            let subject = p.expression()?;
            p.consume(TokenType::RIGHT_PAREN, "Expected ')' after switch subject.")?;
            p.consume(TokenType::LEFT_BRACE, "Expected '{' before switch body.")?;

            let mut cases: Vec<CaseBranch> = Vec::new();
            let mut default: Option<Vec<Stmt>> = None;

            while !p.check(TokenType::RIGHT_BRACE) && !p.is_at_end() {
                if p.matches(TokenType::CASE) {
                    let mut labels = vec![p.expression()?];
                    p.consume(TokenType::COLON, "Expected ':' after case value.")?;

                    while p.matches(TokenType::CASE) {
                        labels.push(p.expression()?);
                        p.consume(TokenType::COLON, "Expected ':' after case value.")?;
                    }

                    let body = p.case_body();
                    cases.push(CaseBranch { labels, body });
                } else if p.matches(TokenType::DEFAULT) {
                    if default.is_some() {
                        return Err(p.error(
                            p.previous(),
                            "A switch statement can only have one default branch.",
                        ));
                    }

                    p.consume(TokenType::COLON, "Expected ':' after 'default'.")?;
                    default = Some(p.case_body());
                } else {
                    return Err(p.error(p.peek(), "Expected 'case' or 'default' in switch body."));
                }
            }

            p.consume(TokenType::RIGHT_BRACE, "Expected '}' after switch body.")?;

            Ok(Stmt::Switch {
                subject,
                cases,
                default,
            })
        })
    }

    /// Declarations up to the next `case`, `default` or closing brace.
    fn case_body(&mut self) -> Vec<Stmt> {
        let mut body = Vec::new();

        while !self.check(TokenType::CASE)
            && !self.check(TokenType::DEFAULT)
            && !self.check(TokenType::RIGHT_BRACE)
            && !self.is_at_end()
        {
            if let Some(stmt) = self.declaration() {
                body.push(stmt);
            }
        }

        body
    }

    fn try_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LEFT_BRACE, "Expected '{' after 'try'.")?;
        let body = self.block()?;

        let catch = if self.matches(TokenType::CATCH) {
            self.consume(TokenType::LEFT_BRACE, "Expected '{' after 'catch'.")?;
            Some(self.block()?)
        } else {
            None
        };

        let otherwise = if self.matches(TokenType::ELSE) {
            self.consume(TokenType::LEFT_BRACE, "Expected '{' after 'else'.")?;
            Some(self.block()?)
        } else {
            None
        };

        let finally = if self.matches(TokenType::FINALLY) {
            self.consume(TokenType::LEFT_BRACE, "Expected '{' after 'finally'.")?;
            Some(self.block()?)
        } else {
            None
        };

        Ok(Stmt::Try {
            body,
            catch,
            otherwise,
            finally,
        })
    }

    /// `break ;` or `continue ;`. Outside a loop or switch this is reported
    /// but the node is still produced.
    fn jump_statement(&mut self, keyword: &str) -> Result<Token> {
        let token = self.previous().clone();

        if self.loop_depth == 0 {
            self.report(
                token.clone(),
                &format!("'{}' must be inside a loop or switch.", keyword),
            );
        }

        self.consume(
            TokenType::SEMICOLON,
            &format!("Expected ';' after '{}'.", keyword),
        )?;

        Ok(token)
    }

    fn print_statement(&mut self) -> Result<Stmt> {
        let value: Expr = self.expression()?;

        self.consume(TokenType::SEMICOLON, "Expected ';' after value.")?;

        Ok(Stmt::Print(value))
    }

    fn expression_statement(&mut self) -> Result<Stmt> {
        let expr: Expr = self.expression()?;
        self.consume(TokenType::SEMICOLON, "Expected ';' after expression.")?;
        Ok(Stmt::Expression(expr))
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'if'.")?;
        let condition: Expr = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after if condition.")?;

        let then_branch: Box<Stmt> = Box::new(self.statement()?);

        let mut elif_branches: Vec<ElifBranch> = Vec::new();
        while self.matches(TokenType::ELIF) {
            self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'elif'.")?;
            let condition = self.expression()?;
            self.consume(TokenType::RIGHT_PAREN, "Expected ')' after elif condition.")?;
            let branch = self.statement()?;

            elif_branches.push(ElifBranch { condition, branch });
        }

        let else_branch: Option<Box<Stmt>> = if self.matches(TokenType::ELSE) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            elif_branches,
            else_branch,
        })
    }

    fn return_statement(&mut self) -> Result<Stmt> {
        let keyword: Token = self.previous().clone();
        let value: Option<Expr> = if !self.check(TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenType::SEMICOLON, "Expected ';' after return value.")?;
        Ok(Stmt::Return { keyword, value })
    }

    /// Declarations up to the closing brace, which is consumed. Errors inside
    /// are recorded and skipped by `declaration`.
    fn block(&mut self) -> Result<Vec<Stmt>> {
        let mut statements: Vec<Stmt> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        self.consume(TokenType::RIGHT_BRACE, "Expected '}' after block.")?;
        Ok(statements)
    }

    // ─────────────────────── expression rules ─────────────────────

    fn expression(&mut self) -> Result<Expr> {
        ensure_sufficient_stack(|| self.assignment())
    }

    fn assignment(&mut self) -> Result<Expr> {
        let expr: Expr = self.logical_or()?;

        if self.matches(TokenType::EQUAL) {
            let equals: Token = self.previous().clone();
            let value = Box::new(self.assignment()?);

            return Ok(match expr {
                Expr::Variable { name, .. } => Expr::Assign {
                    id: ExprId::fresh(),
                    name,
                    value,
                },

                Expr::Get { object, name } => Expr::Set {
                    object,
                    name,
                    value,
                },

                Expr::Subscript {
                    object,
                    index,
                    bracket,
                } => Expr::SubscriptSet {
                    object,
                    index,
                    value,
                    bracket,
                },

                other => {
                    // Reported, not thrown: the parser is not confused.
                    self.report(equals, "Invalid assignment target.");
                    other
                }
            });
        }

        Ok(expr)
    }

    fn logical_or(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.logical_and()?;

        while self.matches(TokenType::OR) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.logical_and()?;

            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn logical_and(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.equality()?;

        while self.matches(TokenType::AND) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.equality()?;

            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    /// One left‑associative binary precedence level.
    fn binary_level(
        &mut self,
        operators: &[TokenType],
        operand: fn(&mut Self) -> Result<Expr>,
    ) -> Result<Expr> {
        let mut expr: Expr = operand(self)?;

        while self.match_any(operators) {
            let operator: Token = self.previous().clone();
            let right: Expr = operand(self)?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr> {
        self.binary_level(
            &[TokenType::BANG_EQUAL, TokenType::EQUAL_EQUAL],
            Self::comparison,
        )
    }

    fn comparison(&mut self) -> Result<Expr> {
        self.binary_level(
            &[
                TokenType::GREATER,
                TokenType::GREATER_EQUAL,
                TokenType::LESS,
                TokenType::LESS_EQUAL,
            ],
            Self::bit_or,
        )
    }

    fn bit_or(&mut self) -> Result<Expr> {
        self.binary_level(&[TokenType::PIPE, TokenType::CARET], Self::bit_and)
    }

    fn bit_and(&mut self) -> Result<Expr> {
        self.binary_level(&[TokenType::AMPERSAND], Self::shift)
    }

    fn shift(&mut self) -> Result<Expr> {
        self.binary_level(
            &[TokenType::LESS_LESS, TokenType::GREATER_GREATER],
            Self::term,
        )
    }

    fn term(&mut self) -> Result<Expr> {
        self.binary_level(&[TokenType::MINUS, TokenType::PLUS], Self::factor)
    }

    fn factor(&mut self) -> Result<Expr> {
        self.binary_level(
            &[TokenType::STAR, TokenType::SLASH, TokenType::PERCENT],
            Self::exponent,
        )
    }

    fn exponent(&mut self) -> Result<Expr> {
        self.binary_level(&[TokenType::STAR_STAR], Self::unary)
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.match_any(&[TokenType::BANG, TokenType::MINUS, TokenType::TILDE]) {
            let operator: Token = self.previous().clone();
            let right: Expr = ensure_sufficient_stack(|| self.unary())?;
            return Ok(Expr::Unary {
                operator,
                right: Box::new(right),
            });
        }

        self.call()
    }

    fn call(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.primary()?;

        loop {
            if self.matches(TokenType::LEFT_PAREN) {
                expr = self.finish_call(expr)?;
            } else if self.matches(TokenType::DOT) {
                let name: Token = self
                    .consume(TokenType::IDENTIFIER, "Expected property name after '.'.")?
                    .clone();

                expr = Expr::Get {
                    object: Box::new(expr),
                    name,
                };
            } else if self.matches(TokenType::LEFT_BRACKET) {
                let index = self.expression()?;
                let bracket: Token = self
                    .consume(TokenType::RIGHT_BRACKET, "Expected ']' after subscript index.")?
                    .clone();

                expr = Expr::Subscript {
                    object: Box::new(expr),
                    index: Box::new(index),
                    bracket,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr> {
        let mut arguments: Vec<Expr> = Vec::new();
        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if arguments.len() >= MAX_ARGUMENTS {
                    self.report(self.peek().clone(), "Cannot have more than 255 arguments.");
                }

                arguments.push(self.expression()?);

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        let paren: Token = self
            .consume(TokenType::RIGHT_PAREN, "Expected ')' after arguments.")?
            .clone();

        Ok(Expr::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        })
    }

    fn primary(&mut self) -> Result<Expr> {
        if self.matches(TokenType::FALSE) {
            return Ok(Expr::Literal(LiteralValue::False));
        }
        if self.matches(TokenType::TRUE) {
            return Ok(Expr::Literal(LiteralValue::True));
        }
        if self.matches(TokenType::NULL) {
            return Ok(Expr::Literal(LiteralValue::Null));
        }

        if let TokenType::NUMBER(n) = self.peek().token_type {
            self.advance();
            return Ok(Expr::Literal(LiteralValue::Number(n)));
        }

        if let TokenType::STRING(ref s) = self.peek().token_type {
            let s = s.clone();
            self.advance();
            return Ok(Expr::Literal(LiteralValue::Str(s)));
        }

        if self.matches(TokenType::IDENTIFIER) {
            return Ok(Expr::Variable {
                id: ExprId::fresh(),
                name: self.previous().clone(),
            });
        }

        if self.matches(TokenType::THIS) {
            return Ok(Expr::This {
                id: ExprId::fresh(),
                keyword: self.previous().clone(),
            });
        }

        if self.matches(TokenType::SUPER) {
            let keyword: Token = self.previous().clone();
            self.consume(TokenType::DOT, "Expected '.' after 'super'.")?;
            let method: Token = self
                .consume(TokenType::IDENTIFIER, "Expected superclass method name.")?
                .clone();

            return Ok(Expr::Super {
                id: ExprId::fresh(),
                keyword,
                method,
            });
        }

        if self.matches(TokenType::LEFT_PAREN) {
            let expr: Expr = self.expression()?;

            self.consume(TokenType::RIGHT_PAREN, "Expected ')' after expression.")?;

            return Ok(Expr::Grouping(Box::new(expr)));
        }

        if self.matches(TokenType::LEFT_BRACKET) {
            return self.array_literal();
        }

        if self.matches(TokenType::LEFT_BRACE) {
            return self.dictionary_literal();
        }

        if self.matches(TokenType::FUNCTION) {
            return Ok(Expr::Function(self.function_body(None, "function")?));
        }

        if self.matches(TokenType::IMPORT) {
            self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'import'.")?;
            let path = self.expression()?;
            let paren: Token = self
                .consume(TokenType::RIGHT_PAREN, "Expected ')' after import path.")?
                .clone();

            return Ok(Expr::Import {
                path: Box::new(path),
                paren,
            });
        }

        Err(self.error(self.peek(), "Expected expression."))
    }

    fn array_literal(&mut self) -> Result<Expr> {
        let mut values: Vec<Expr> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACKET) && !self.is_at_end() {
            values.push(self.expression()?);

            if !self.check(TokenType::RIGHT_BRACKET) {
                self.consume(TokenType::COMMA, "Expected ',' between array elements.")?;
            }
        }

        self.consume(TokenType::RIGHT_BRACKET, "Expected ']' after array elements.")?;

        Ok(Expr::Array(values))
    }

    fn dictionary_literal(&mut self) -> Result<Expr> {
        let brace: Token = self.previous().clone();
        let mut entries: Vec<(Expr, Expr)> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            let key = self.expression()?;
            self.consume(TokenType::COLON, "Expected ':' between key and value.")?;
            let value = self.expression()?;

            entries.push((key, value));

            if !self.check(TokenType::RIGHT_BRACE) {
                self.consume(TokenType::COMMA, "Expected ',' between dictionary entries.")?;
            }
        }

        self.consume(TokenType::RIGHT_BRACE, "Expected '}' after dictionary entries.")?;

        Ok(Expr::Dictionary { brace, entries })
    }

    // ────────────────────── utility helpers ───────────────────────

    #[inline(always)]
    fn matches(&mut self, ttype: TokenType) -> bool {
        if self.check(ttype) {
            self.advance();

            return true;
        }

        false
    }

    fn match_any(&mut self, ttypes: &[TokenType]) -> bool {
        for ttype in ttypes {
            if self.check(ttype.clone()) {
                self.advance();
                return true;
            }
        }

        false
    }

    #[inline(always)]
    fn consume(&mut self, ttype: TokenType, message: &str) -> Result<&Token> {
        if self.check(ttype) {
            return Ok(self.advance());
        }

        Err(self.error(self.peek(), message))
    }

    #[inline(always)]
    fn check(&self, ttype: TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }

        self.peek().token_type == ttype
    }

    fn check_next(&self, ttype: TokenType) -> bool {
        match self.tokens.get(self.current + 1) {
            Some(token) => token.token_type == ttype,
            None => false,
        }
    }

    #[inline(always)]
    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }

        self.previous()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        matches!(self.peek().token_type, TokenType::EOF)
    }

    #[inline(always)]
    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    #[inline(always)]
    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    /// Build a parse error located at `token`.
    fn error(&self, token: &Token, message: &str) -> Error {
        let location = if token.token_type == TokenType::EOF {
            " at end".to_string()
        } else {
            format!(" at '{}'", token.lexeme)
        };

        debug!("Parse error at line {}: {}", token.line, message);

        Error::parse(token.line, location, message)
    }

    /// Record a diagnostic without unwinding.
    fn report(&mut self, token: Token, message: &str) {
        let err = self.error(&token, message);
        self.errors.push(err);
    }

    /// Discards tokens until it thinks it is at a statement boundary.
    fn synchronize(&mut self) {
        self.advance(); // skip the token that caused the error

        while !self.is_at_end() {
            if matches!(self.previous().token_type, TokenType::SEMICOLON) {
                return;
            }

            match self.peek().token_type {
                TokenType::CLASS
                | TokenType::FUNCTION
                | TokenType::VAR
                | TokenType::FOR
                | TokenType::IF
                | TokenType::WHILE
                | TokenType::DO
                | TokenType::SWITCH
                | TokenType::TRY
                | TokenType::PRINT
                | TokenType::RETURN => return,
                _ => {}
            }

            self.advance();
        }
    }
}
