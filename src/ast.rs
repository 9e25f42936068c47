//! **Abstract‑Syntax‑Tree** node definitions shared by the parser, resolver
//! and interpreter.
//!
//! Nodes carry only syntax. Behaviour lives in the stages that `match` on
//! them, so adding a variant is a compile error in every stage until it is
//! handled. Function bodies are reference counted so that runtime function
//! values can share them with the tree.

use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::token::Token;

/// Identity of an expression node that the resolver annotates
/// (variable reads, assignments, `this`, `super`).
///
/// Ids are unique for the whole process, so the scope tables of separately
/// compiled modules can be merged without collisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(usize);

static NEXT_EXPR_ID: AtomicUsize = AtomicUsize::new(0);

impl ExprId {
    pub fn fresh() -> Self {
        ExprId(NEXT_EXPR_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A **literal constant** that appears directly in the source code.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// Numeric literal ‑ stored as IEEE‑754 `f64`.
    Number(f64),

    /// String literal without surrounding quotes.
    Str(String),

    True,

    False,

    Null,
}

/// Every kind of *expression* in Dragon.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(LiteralValue),

    /// Parenthesised sub‑expression: `"(" expression ")"`.
    Grouping(Box<Expr>),

    /// Prefix operator: `!x`, `-x`, `~x`.
    Unary { operator: Token, right: Box<Expr> },

    /// Infix arithmetic, comparison, equality or bitwise operator.
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Short‑circuiting `and` / `or`.
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    Variable { id: ExprId, name: Token },

    Assign {
        id: ExprId,
        name: Token,
        value: Box<Expr>,
    },

    Call {
        callee: Box<Expr>,
        /// The closing `)` token ‑ retained for error reporting.
        paren: Token,
        arguments: Vec<Expr>,
    },

    /// `object.name`
    Get { object: Box<Expr>, name: Token },

    /// `object.name = value`
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },

    /// `object[index]`
    Subscript {
        object: Box<Expr>,
        index: Box<Expr>,
        /// The closing `]` token.
        bracket: Token,
    },

    /// `object[index] = value`
    SubscriptSet {
        object: Box<Expr>,
        index: Box<Expr>,
        value: Box<Expr>,
        bracket: Token,
    },

    /// `[a, b, c]`
    Array(Vec<Expr>),

    /// `{ key: value, ... }`
    Dictionary {
        brace: Token,
        entries: Vec<(Expr, Expr)>,
    },

    /// Anonymous `function (params) { body }`.
    Function(Rc<FunctionDecl>),

    This { id: ExprId, keyword: Token },

    /// `super.method`
    Super {
        id: ExprId,
        keyword: Token,
        method: Token,
    },

    /// `import(path)`, yielding the module's namespace.
    Import { path: Box<Expr>, paren: Token },
}

impl Expr {
    /// Best line number for diagnostics about this expression.
    pub fn line(&self) -> usize {
        match self {
            Expr::Literal(_) | Expr::Array(_) => 0,
            Expr::Grouping(expr) => expr.line(),
            Expr::Unary { operator, .. }
            | Expr::Binary { operator, .. }
            | Expr::Logical { operator, .. } => operator.line,
            Expr::Variable { name, .. }
            | Expr::Assign { name, .. }
            | Expr::Get { name, .. }
            | Expr::Set { name, .. } => name.line,
            Expr::Call { paren, .. } | Expr::Import { paren, .. } => paren.line,
            Expr::Subscript { bracket, .. } | Expr::SubscriptSet { bracket, .. } => bracket.line,
            Expr::Dictionary { brace, .. } => brace.line,
            Expr::Function(decl) => decl.line,
            Expr::This { keyword, .. } | Expr::Super { keyword, .. } => keyword.line,
        }
    }

    /// The identifier that names the callee at a call site, if any.
    pub fn name_token(&self) -> Option<&Token> {
        match self {
            Expr::Variable { name, .. } | Expr::Get { name, .. } => Some(name),
            Expr::Super { method, .. } => Some(method),
            _ => None,
        }
    }
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Token,

    /// Used when the argument is missing or `null`.
    pub default: Option<Expr>,

    /// `*name`: collects the remaining arguments into an array.
    pub variadic: bool,
}

/// Shared shape of named functions, methods and function literals.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    /// `None` for anonymous function literals.
    pub name: Option<Token>,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
    pub line: usize,
}

impl FunctionDecl {
    pub fn is_variadic(&self) -> bool {
        self.params.last().map_or(false, |p| p.variadic)
    }
}

/// `elif (condition) branch`
#[derive(Debug, Clone, PartialEq)]
pub struct ElifBranch {
    pub condition: Expr,
    pub branch: Stmt,
}

/// `case a: case b: statements...`
#[derive(Debug, Clone, PartialEq)]
pub struct CaseBranch {
    pub labels: Vec<Expr>,
    pub body: Vec<Stmt>,
}

/// **Statements**. A program is a sequence of these nodes returned by
/// [`Parser::parse`](crate::parser::Parser::parse).
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expression(Expr),

    Print(Expr),

    /// `"var" IDENT ("=" initializer)? ";"`
    Var {
        name: Token,
        initializer: Option<Expr>,
    },

    Block(Vec<Stmt>),

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        elif_branches: Vec<ElifBranch>,
        else_branch: Option<Box<Stmt>>,
    },

    While {
        condition: Expr,
        body: Box<Stmt>,
    },

    /// C‑style loop. The initializer lives in its own scope around the loop.
    For {
        initializer: Option<Box<Stmt>>,
        condition: Option<Expr>,
        increment: Option<Expr>,
        body: Box<Stmt>,
    },

    DoWhile {
        body: Box<Stmt>,
        condition: Expr,
    },

    Switch {
        subject: Expr,
        cases: Vec<CaseBranch>,
        default: Option<Vec<Stmt>>,
    },

    Break(Token),

    Continue(Token),

    Return {
        /// The `return` keyword token (for diagnostics).
        keyword: Token,
        value: Option<Expr>,
    },

    Function(Rc<FunctionDecl>),

    Class {
        name: Token,
        /// Always an `Expr::Variable` when present.
        superclass: Option<Expr>,
        methods: Vec<Rc<FunctionDecl>>,
    },

    Try {
        body: Vec<Stmt>,
        catch: Option<Vec<Stmt>>,
        otherwise: Option<Vec<Stmt>>,
        finally: Option<Vec<Stmt>>,
    },
}
