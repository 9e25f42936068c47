//! Static resolver pass for the **Dragon** interpreter.
//!
//! This resolver does three things in one AST walk:
//! 1. Build lexical scopes (stack of `HashMap<&str,bool>` tracking declared/defined),
//!    mirroring exactly the environments the interpreter will create.
//! 2. Report static errors (redeclaration, forward‑read in initializer, invalid
//!    `return`, `this` or `super`).
//! 3. Record, for *each* variable occurrence, how many scopes out its binding
//!    lives. Occurrences left out of the table are globals.
//!
//! The result is a [`Locals`] side table keyed by [`ExprId`]; the tree itself
//! is never modified, so resolving the same tree twice yields equal tables.

use std::collections::HashMap;
use std::mem;

use log::{debug, info};

use crate::ast::{Expr, ExprId, FunctionDecl, Stmt};
use crate::error::{Error, Result};
use crate::stack::ensure_sufficient_stack;
use crate::token::Token;

/// Scope distances for every resolved local reference.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Locals(HashMap<ExprId, usize>);

impl Locals {
    pub fn get(&self, id: ExprId) -> Option<usize> {
        self.0.get(&id).copied()
    }

    pub fn insert(&mut self, id: ExprId, depth: usize) {
        self.0.insert(id, depth);
    }

    /// Absorb the table of another compilation unit (an imported module).
    pub fn extend(&mut self, other: Locals) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Are we inside a user function?  Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Method,
    Initializer,
}

/// Are we inside a class body?  Used to validate `this` and `super`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

/// Resolver: tracks scopes, enforces static rules and records binding
/// distances. Ordinary violations are collected; reading a local in its own
/// initializer aborts the pass (`Err` from the walk functions).
pub struct Resolver<'a> {
    scopes: Vec<HashMap<&'a str, bool>>, // false=declared, true=defined
    current_function: FunctionType,
    current_class: ClassType,
    locals: Locals,
    errors: Vec<Error>,
}

impl<'a> Default for Resolver<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Resolver<'a> {
    pub fn new() -> Self {
        info!("Resolver instantiated");
        Resolver {
            scopes: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            locals: Locals::default(),
            errors: Vec::new(),
        }
    }

    /// Walk all top‑level statements.
    pub fn resolve(mut self, statements: &'a [Stmt]) -> std::result::Result<Locals, Vec<Error>> {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        if let Err(fatal) = self.resolve_stmts(statements) {
            self.errors.push(fatal);
        }

        if self.errors.is_empty() {
            info!("Resolved {} local reference(s)", self.locals.len());
            Ok(self.locals)
        } else {
            Err(self.errors)
        }
    }

    fn resolve_stmts(&mut self, statements: &'a [Stmt]) -> Result<()> {
        for stmt in statements {
            self.resolve_stmt(stmt)?;
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &'a Stmt) -> Result<()> {
        ensure_sufficient_stack(|| self.visit_stmt(stmt))
    }

    fn visit_stmt(&mut self, stmt: &'a Stmt) -> Result<()> {
        match stmt {
            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                debug!("Resolving class '{}'", name.lexeme);
                self.resolve_class(name, superclass.as_ref(), methods)?;
            }

            Stmt::Block(statements) => {
                self.begin_scope();
                self.resolve_stmts(statements)?;
                self.end_scope();
            }

            Stmt::Var { name, initializer } => {
                // declare → resolve initializer → define
                self.declare(name);
                if let Some(expr) = initializer {
                    self.resolve_expr(expr)?;
                }
                self.define(name);
            }

            Stmt::Function(decl) => {
                // the name is visible inside its own body
                if let Some(name) = &decl.name {
                    debug!("Resolving function '{}'", name.lexeme);
                    self.declare(name);
                    self.define(name);
                }
                self.resolve_function(decl, FunctionType::Function)?;
            }

            Stmt::Expression(expr) | Stmt::Print(expr) => {
                self.resolve_expr(expr)?;
            }

            Stmt::If {
                condition,
                then_branch,
                elif_branches,
                else_branch,
            } => {
                self.resolve_expr(condition)?;
                self.resolve_stmt(then_branch)?;
                for elif in elif_branches {
                    self.resolve_expr(&elif.condition)?;
                    self.resolve_stmt(&elif.branch)?;
                }
                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb)?;
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition)?;
                self.resolve_stmt(body)?;
            }

            Stmt::DoWhile { body, condition } => {
                self.resolve_stmt(body)?;
                self.resolve_expr(condition)?;
            }

            Stmt::For {
                initializer,
                condition,
                increment,
                body,
            } => {
                // one scope around the whole loop for the initializer
                self.begin_scope();
                if let Some(init) = initializer {
                    self.resolve_stmt(init)?;
                }
                if let Some(cond) = condition {
                    self.resolve_expr(cond)?;
                }
                if let Some(inc) = increment {
                    self.resolve_expr(inc)?;
                }
                self.resolve_stmt(body)?;
                self.end_scope();
            }

            Stmt::Switch {
                subject,
                cases,
                default,
            } => {
                self.resolve_expr(subject)?;
                for case in cases {
                    for label in &case.labels {
                        self.resolve_expr(label)?;
                    }
                    self.resolve_stmts(&case.body)?;
                }
                if let Some(body) = default {
                    self.resolve_stmts(body)?;
                }
            }

            Stmt::Try {
                body,
                catch,
                otherwise,
                finally,
            } => {
                for block in [Some(body), catch.as_ref(), otherwise.as_ref(), finally.as_ref()]
                    .into_iter()
                    .flatten()
                {
                    self.begin_scope();
                    self.resolve_stmts(block)?;
                    self.end_scope();
                }
            }

            Stmt::Break(_) | Stmt::Continue(_) => {}

            Stmt::Return { keyword, value } => {
                // return only allowed inside a function
                if self.current_function == FunctionType::None {
                    self.error(keyword, "Can't return from top-level code.");
                }
                if let Some(expr) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.error(keyword, "Can't return a value from an initializer.");
                    }
                    self.resolve_expr(expr)?;
                }
            }
        }
        Ok(())
    }

    fn resolve_class(
        &mut self,
        name: &'a Token,
        superclass: Option<&'a Expr>,
        methods: &'a [std::rc::Rc<FunctionDecl>],
    ) -> Result<()> {
        let enclosing_class = mem::replace(&mut self.current_class, ClassType::Class);

        self.declare(name);
        self.define(name);

        if let Some(superclass) = superclass {
            if let Expr::Variable { name: super_name, .. } = superclass {
                if super_name.lexeme == name.lexeme {
                    self.error(super_name, "A class can't inherit from itself.");
                }
            }

            self.current_class = ClassType::Subclass;
            self.resolve_expr(superclass)?;

            self.begin_scope();
            self.scope_insert("super");
        }

        self.begin_scope();
        self.scope_insert("this");

        for method in methods {
            let kind = match &method.name {
                Some(n) if n.lexeme == "init" => FunctionType::Initializer,
                _ => FunctionType::Method,
            };
            self.resolve_function(method, kind)?;
        }

        self.end_scope();

        if superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing_class;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &'a Expr) -> Result<()> {
        ensure_sufficient_stack(|| self.visit_expr(expr))
    }

    fn visit_expr(&mut self, expr: &'a Expr) -> Result<()> {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => {
                self.resolve_expr(inner)?;
            }

            Expr::Unary { right, .. } => {
                self.resolve_expr(right)?;
            }

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left)?;
                self.resolve_expr(right)?;
            }

            Expr::Variable { id, name } => {
                // Cannot read in own initializer
                if let Some(scope) = self.scopes.last() {
                    if scope.get(name.lexeme.as_str()) == Some(&false) {
                        return Err(Error::resolve(
                            name.line,
                            format!(" at '{}'", name.lexeme),
                            "Can't read local variable in its own initializer.",
                        ));
                    }
                }
                self.resolve_local(*id, &name.lexeme);
            }

            Expr::Assign { id, name, value } => {
                // First resolve RHS, then bind LHS
                self.resolve_expr(value)?;
                self.resolve_local(*id, &name.lexeme);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee)?;
                for arg in arguments {
                    self.resolve_expr(arg)?;
                }
            }

            Expr::Get { object, .. } => self.resolve_expr(object)?,

            Expr::Set { object, value, .. } => {
                self.resolve_expr(value)?;
                self.resolve_expr(object)?;
            }

            Expr::Subscript { object, index, .. } => {
                self.resolve_expr(object)?;
                self.resolve_expr(index)?;
            }

            Expr::SubscriptSet {
                object,
                index,
                value,
                ..
            } => {
                self.resolve_expr(object)?;
                self.resolve_expr(index)?;
                self.resolve_expr(value)?;
            }

            Expr::Array(items) => {
                for item in items {
                    self.resolve_expr(item)?;
                }
            }

            Expr::Dictionary { entries, .. } => {
                for (key, value) in entries {
                    self.resolve_expr(key)?;
                    self.resolve_expr(value)?;
                }
            }

            Expr::Function(decl) => {
                self.resolve_function(decl, FunctionType::Function)?;
            }

            Expr::This { id, keyword } => {
                if self.current_class == ClassType::None {
                    self.error(keyword, "Can't use 'this' outside of a class.");
                } else {
                    self.resolve_local(*id, "this");
                }
            }

            Expr::Super { id, keyword, .. } => match self.current_class {
                ClassType::None => self.error(keyword, "Can't use 'super' outside of a class."),
                ClassType::Class => {
                    self.error(keyword, "Can't use 'super' in a class with no superclass.")
                }
                ClassType::Subclass => self.resolve_local(*id, "super"),
            },

            Expr::Import { path, .. } => self.resolve_expr(path)?,
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function's parameters + body. Defaults are
    /// resolved before their own parameter is declared, so they see the
    /// parameters to their left.
    fn resolve_function(&mut self, decl: &'a FunctionDecl, kind: FunctionType) -> Result<()> {
        let enclosing = mem::replace(&mut self.current_function, kind);

        self.begin_scope();
        for param in &decl.params {
            if let Some(default) = &param.default {
                self.resolve_expr(default)?;
            }
            self.declare(&param.name);
            self.define(&param.name);
        }
        self.resolve_stmts(&decl.body)?;
        self.end_scope();

        self.current_function = enclosing;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn scope_insert(&mut self, name: &'a str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, true);
        }
    }

    fn declare(&mut self, name: &'a Token) {
        let duplicate = match self.scopes.last_mut() {
            Some(scope) => scope.insert(name.lexeme.as_str(), false).is_some(),
            None => false,
        };

        if duplicate {
            self.error(name, "Already a variable with this name in this scope.");
        }
    }

    fn define(&mut self, name: &'a Token) {
        self.scope_insert(name.lexeme.as_str());
    }

    fn error(&mut self, token: &Token, message: &str) {
        self.errors.push(Error::resolve(
            token.line,
            format!(" at '{}'", token.lexeme),
            message,
        ));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding‑distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record this occurrence as a local at depth `d`, or leave it out of the
    /// table (global) if no scope declares it.
    fn resolve_local(&mut self, id: ExprId, name: &str) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(name) {
                debug!("Resolved '{}' at depth {}", name, depth);
                self.locals.insert(id, depth);
                return;
            }
        }

        debug!("Resolved '{}' as global", name);
    }
}
