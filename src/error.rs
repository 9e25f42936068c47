//! Centralised error hierarchy for the **Dragon interpreter**.
//!
//! All subsystems (scanner, parser, resolver, runtime, CLI) convert their
//! internal failure modes into one of the variants defined here. Compile-time
//! kinds carry the line and a location fragment (`" at 'x'"`, `" at end"`);
//! runtime failures are wrapped in [`RuntimeError`].
//!
//! The module **does not** print diagnostics itself; that is the job of a
//! [`Reporter`](crate::runner::Reporter).

use std::io;
use thiserror::Error;

use log::info;

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error{location}: {message}")]
    Lex {
        /// Human‑readable description.
        message: String,

        /// Where on the line the error was found (may be empty).
        location: String,

        /// 1‑based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error.
    #[error("[line {line}] Error{location}: {message}")]
    Parse {
        message: String,
        location: String,
        line: usize,
    },

    /// Static‑analysis failure (scoping, illegal `return`/`this`/`super`).
    #[error("[line {line}] Error{location}: {message}")]
    Resolve {
        message: String,
        location: String,
        line: usize,
    },

    /// Runtime evaluation error.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Wrapper around `std::io::Error` (transparent). Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// UTF‑8 decoding failure when ingesting external text.
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Failure raised while evaluating a program.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RuntimeError {
    /// An ordinary runtime error. `try`/`catch` intercepts these.
    #[error("[line {line}] Runtime error: {message}")]
    Raised { message: String, line: usize },

    /// The evaluated program recursed past the configured call depth.
    /// Fatal: never intercepted by `try`/`catch`.
    #[error("[line {line}] Runtime error: Stack overflow (call depth exceeded {limit}).")]
    StackOverflow { line: usize, limit: usize },
}

impl RuntimeError {
    pub fn new<S: Into<String>>(line: usize, msg: S) -> Self {
        RuntimeError::Raised {
            message: msg.into(),
            line,
        }
    }

    /// Can a `try` statement in the evaluated program intercept this error?
    pub fn is_catchable(&self) -> bool {
        matches!(self, RuntimeError::Raised { .. })
    }

    pub fn line(&self) -> usize {
        match self {
            RuntimeError::Raised { line, .. } | RuntimeError::StackOverflow { line, .. } => *line,
        }
    }

    pub fn message(&self) -> String {
        match self {
            RuntimeError::Raised { message, .. } => message.clone(),
            RuntimeError::StackOverflow { limit, .. } => {
                format!("Stack overflow (call depth exceeded {}).", limit)
            }
        }
    }
}

impl Error {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        Error::Lex {
            message,
            location: String::new(),
            line,
        }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(line: usize, location: String, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", line, message);

        Error::Parse {
            message,
            location,
            line,
        }
    }

    /// Helper constructor for the **resolver**.
    pub fn resolve<S: Into<String>>(line: usize, location: String, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Resolve error: line={}, msg={}", line, message);

        Error::Resolve {
            message,
            location,
            line,
        }
    }

    /// Did this error happen before evaluation started?
    pub fn is_compile_time(&self) -> bool {
        matches!(
            self,
            Error::Lex { .. } | Error::Parse { .. } | Error::Resolve { .. }
        )
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Result alias used by the evaluator.
pub type RuntimeResult<T> = std::result::Result<T, RuntimeError>;
