#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{self, Write};
use std::path::Path;
use std::rc::Rc;

use dragon::interpreter::Config;
use dragon::runner::{RunOutcome, Runner};

/// `print` sink that tests can read back.
#[derive(Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Everything observable about one run.
pub struct Run {
    pub outcome: RunOutcome,
    pub output: String,
    pub errors: Vec<String>,
}

impl Run {
    pub fn lines(&self) -> Vec<&str> {
        self.output.lines().collect()
    }

    pub fn first_error(&self) -> &str {
        self.errors.first().map(String::as_str).unwrap_or("")
    }
}

pub fn config(buffer: &SharedBuffer) -> Config {
    Config {
        output: Rc::new(RefCell::new(buffer.clone())),
        ..Config::default()
    }
}

fn finish(runner: Runner<Vec<String>>, buffer: &SharedBuffer, outcome: RunOutcome) -> Run {
    Run {
        outcome,
        output: buffer.contents(),
        errors: runner.into_reporter(),
    }
}

pub fn run_with(config_fn: impl FnOnce(Config) -> Config, source: &str) -> Run {
    let buffer = SharedBuffer::default();
    let mut runner = Runner::new(config_fn(config(&buffer)), Vec::new());
    let outcome = runner.run_source(source);
    finish(runner, &buffer, outcome)
}

pub fn run(source: &str) -> Run {
    run_with(|c| c, source)
}

pub fn run_with_depth(source: &str, max_call_depth: usize) -> Run {
    run_with(
        |c| Config {
            max_call_depth,
            ..c
        },
        source,
    )
}

pub fn run_file(path: &Path) -> Run {
    let buffer = SharedBuffer::default();
    let mut runner = Runner::new(config(&buffer), Vec::new());
    let outcome = runner
        .run_file(path)
        .expect("test file should be readable");
    finish(runner, &buffer, outcome)
}

/// Output lines of a program that must complete.
pub fn output_of(source: &str) -> Vec<String> {
    let run = run(source);
    assert_eq!(
        run.outcome,
        RunOutcome::Completed,
        "program failed: {:?}",
        run.errors
    );
    run.output.lines().map(str::to_string).collect()
}
