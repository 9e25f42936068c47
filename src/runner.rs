//! Pipeline driver: Lexing → Parsing → Resolving → Evaluating.
//!
//! Each stage runs only if the previous one produced no diagnostics, so a
//! program with any compile‑time error prints nothing. Diagnostics go to a
//! [`Reporter`]; the driver itself never prints.

use std::fs;
use std::path::Path;

use log::{info, warn};

use crate::ast::Stmt;
use crate::error::{Error, Result};
use crate::interpreter::{Config, Interpreter};
use crate::parser::Parser;
use crate::resolver::{Locals, Resolver};
use crate::scanner;
use crate::stdlib::{self, Bindings};

/// Receives every diagnostic of a run.
pub trait Reporter {
    fn report(&mut self, error: &Error);
}

/// Writes diagnostics to standard error.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrReporter;

impl Reporter for StderrReporter {
    fn report(&mut self, error: &Error) {
        eprintln!("{}", error);
    }
}

/// Collects rendered diagnostics, mostly for tests.
impl Reporter for Vec<String> {
    fn report(&mut self, error: &Error) {
        self.push(error.to_string());
    }
}

/// The stage that stopped a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Lex,
    Parse,
    Resolve,
    Runtime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Aborted(ErrorKind),
}

impl RunOutcome {
    /// Process exit status: 65 for compile‑time errors, 70 for runtime errors.
    pub fn exit_code(self) -> i32 {
        match self {
            RunOutcome::Completed => 0,
            RunOutcome::Aborted(ErrorKind::Runtime) => 70,
            RunOutcome::Aborted(_) => 65,
        }
    }
}

/// A statically checked program, ready to evaluate.
#[derive(Debug, Clone)]
pub struct Program {
    pub statements: Vec<Stmt>,
    pub locals: Locals,
}

/// Scan, parse and resolve `source` without evaluating it.
pub fn compile(source: &str) -> std::result::Result<Program, Vec<Error>> {
    compile_stages(source).map_err(|(_, errors)| errors)
}

fn compile_stages(source: &str) -> std::result::Result<Program, (ErrorKind, Vec<Error>)> {
    let (tokens, lex_errors) = scanner::scan(source);
    if !lex_errors.is_empty() {
        return Err((ErrorKind::Lex, lex_errors));
    }

    let statements = Parser::new(tokens)
        .parse()
        .map_err(|errors| (ErrorKind::Parse, errors))?;

    let locals = Resolver::new()
        .resolve(&statements)
        .map_err(|errors| (ErrorKind::Resolve, errors))?;

    Ok(Program { statements, locals })
}

pub struct Runner<R: Reporter> {
    config: Config,
    bindings: Bindings,
    reporter: R,
}

impl<R: Reporter> Runner<R> {
    /// A runner whose programs start with the [`stdlib::prelude`] globals.
    pub fn new(config: Config, reporter: R) -> Self {
        Self {
            config,
            bindings: stdlib::prelude(),
            reporter,
        }
    }

    /// Replace the globals every run starts with.
    pub fn with_bindings(mut self, bindings: Bindings) -> Self {
        self.bindings = bindings;
        self
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    pub fn into_reporter(self) -> R {
        self.reporter
    }

    /// Run `source` through every stage with a fresh interpreter.
    pub fn run_source(&mut self, source: &str) -> RunOutcome {
        let program = match compile_stages(source) {
            Ok(program) => program,
            Err((kind, errors)) => {
                warn!("{:?} stage failed with {} error(s)", kind, errors.len());
                for error in &errors {
                    self.reporter.report(error);
                }
                return RunOutcome::Aborted(kind);
            }
        };

        let mut interpreter = Interpreter::new(self.config.clone(), self.bindings.instantiate());
        interpreter.add_locals(program.locals);

        let result = interpreter.interpret(&program.statements);
        interpreter.teardown();

        match result {
            Ok(()) => {
                info!("Run completed");
                RunOutcome::Completed
            }
            Err(error) => {
                self.reporter.report(&Error::Runtime(error));
                RunOutcome::Aborted(ErrorKind::Runtime)
            }
        }
    }

    /// Read and run a file; its directory becomes the import base.
    pub fn run_file(&mut self, path: &Path) -> Result<RunOutcome> {
        info!("Running file {}", path.display());

        let bytes = fs::read(path)?;
        let source = String::from_utf8(bytes)?;

        if let Some(dir) = path.parent() {
            self.config.base_dir = dir.to_path_buf();
        }

        Ok(self.run_source(&source))
    }
}
