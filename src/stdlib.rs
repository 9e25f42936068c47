//! Native bindings: the global prelude every interpreter starts with, and the
//! built‑in modules that `import("math")`, `import("time")` and
//! `import("os")` resolve to without going through the source loader.

use std::fs;
use std::io;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, SystemTime, SystemTimeError, UNIX_EPOCH};

use chrono::{Local, TimeZone};
use log::debug;

use crate::error::{RuntimeError, RuntimeResult};
use crate::token::Token;
use crate::value::{Module, NativeFn, NativeFunction, Table, Value};

/// Names pre‑defined in an interpreter's global scope.
#[derive(Default, Clone)]
pub struct Bindings {
    values: Table,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    pub fn define_native(&mut self, name: &str, arity: usize, func: NativeFn) {
        self.define(name, native(name, arity, func));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// A copy for one interpreter. Top-level arrays and dictionaries get new
    /// backing storage so a run's mutations stay out of later runs.
    pub fn instantiate(&self) -> Bindings {
        let values = self
            .values
            .iter()
            .map(|(name, value)| {
                let value = match value {
                    Value::Array(items) => Value::array(items.borrow().clone()),
                    Value::Dict(entries) => Value::dict(entries.borrow().clone()),
                    other => other.clone(),
                };
                (name.clone(), value)
            })
            .collect();

        Bindings { values }
    }
}

/// The default globals: `len`, `str`, `float`, `int`, `clock` and an empty
/// `exports` dictionary.
pub fn prelude() -> Bindings {
    let mut bindings = Bindings::new();

    bindings.define_native("len", 1, len);
    bindings.define_native("str", 1, |args, _| Ok(Value::Str(arg(args, 0).to_string())));
    bindings.define_native("float", 1, float);
    bindings.define_native("int", 1, int);
    bindings.define_native("clock", 0, clock);
    bindings.define("exports", Value::dict(Table::new()));

    bindings
}

/// A fresh instance of the named built‑in module, or `None`.
pub fn module(name: &str) -> Option<Value> {
    let members = match name {
        "math" => math(),
        "time" => time(),
        "os" => os(),
        _ => return None,
    };

    debug!("Loaded built-in module '{}'", name);
    Some(Value::Module(Rc::new(Module::new(name, members))))
}

// ───────────────────────────── helpers ─────────────────────────────

fn native(name: &str, arity: usize, func: NativeFn) -> Value {
    Value::Native(Rc::new(NativeFunction::new(name, arity, func)))
}

fn arg(args: &[Value], index: usize) -> &Value {
    args.get(index).unwrap_or(&Value::Null)
}

fn string_arg<'a>(args: &'a [Value], index: usize, site: &Token, message: &str) -> RuntimeResult<&'a str> {
    match arg(args, index) {
        Value::Str(s) => Ok(s.as_str()),
        _ => Err(RuntimeError::new(site.line, message)),
    }
}

fn number_arg(args: &[Value], index: usize, site: &Token, message: &str) -> RuntimeResult<f64> {
    match arg(args, index) {
        Value::Number(n) => Ok(*n),
        _ => Err(RuntimeError::new(site.line, message)),
    }
}

/// `-12`, `7`, `3.25`: what `float` and `int` accept in a string.
fn parse_numeric(text: &str) -> Option<f64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let mut parts = digits.splitn(2, '.');
    let whole = parts.next()?;
    let fraction = parts.next();

    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

    let valid = match fraction {
        None => all_digits(whole),
        Some(frac) => !negative && all_digits(whole) && all_digits(frac),
    };

    if valid {
        text.parse().ok()
    } else {
        None
    }
}

// ───────────────────────────── globals ─────────────────────────────

fn len(args: &[Value], site: &Token) -> RuntimeResult<Value> {
    let length = match arg(args, 0) {
        Value::Str(s) => s.chars().count(),
        Value::Array(items) => items.borrow().len(),
        Value::Dict(entries) => entries.borrow().len(),
        Value::Function(function) => function.declaration.params.len(),
        Value::Native(native) => native.arity,
        Value::Class(class) => class
            .methods
            .get("init")
            .map_or(0, |init| init.declaration.params.len()),
        Value::Number(_) => {
            return Err(RuntimeError::new(
                site.line,
                "You can not find the length of a number.",
            ))
        }
        Value::Instance(_) => {
            return Err(RuntimeError::new(
                site.line,
                "You can not find the length of an instance.",
            ))
        }
        other => {
            return Err(RuntimeError::new(
                site.line,
                format!("You can not find the length of a {}.", other.type_name()),
            ))
        }
    };

    Ok(Value::Number(length as f64))
}

fn float(args: &[Value], site: &Token) -> RuntimeResult<Value> {
    match arg(args, 0) {
        Value::Number(n) => Ok(Value::Number(*n)),
        Value::Str(s) => parse_numeric(s)
            .map(Value::Number)
            .ok_or_else(|| RuntimeError::new(site.line, "Only numbers can be parsed to floats.")),
        _ => Err(RuntimeError::new(
            site.line,
            "Only numbers can be parsed to floats.",
        )),
    }
}

fn int(args: &[Value], site: &Token) -> RuntimeResult<Value> {
    let parsed = match arg(args, 0) {
        Value::Number(n) => Some(*n),
        Value::Str(s) => parse_numeric(s),
        _ => None,
    };

    parsed
        .map(|n| Value::Number(n.trunc()))
        .ok_or_else(|| RuntimeError::new(site.line, "Only numbers can be parsed to integers."))
}

fn clock(_: &[Value], site: &Token) -> RuntimeResult<Value> {
    let timestamp: f64 = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e: SystemTimeError| RuntimeError::new(site.line, format!("Clock error: {}", e)))?
        .as_secs_f64();

    Ok(Value::Number(timestamp))
}

// ───────────────────────────── math ─────────────────────────────

fn math() -> Table {
    let mut members = Table::new();

    let unary: [(&str, NativeFn); 9] = [
        ("round", |a, s| {
            Ok(Value::Number(number_arg(a, 0, s, "You must provide a number to math.round(number).")?.round()))
        }),
        ("floor", |a, s| {
            Ok(Value::Number(number_arg(a, 0, s, "You must provide a number to math.floor(number).")?.floor()))
        }),
        ("ceil", |a, s| {
            Ok(Value::Number(number_arg(a, 0, s, "You must provide a number to math.ceil(number).")?.ceil()))
        }),
        ("sqrt", |a, s| {
            Ok(Value::Number(number_arg(a, 0, s, "You must provide a number to math.sqrt(number).")?.sqrt()))
        }),
        ("sin", |a, s| {
            Ok(Value::Number(number_arg(a, 0, s, "You must provide a number to math.sin(number).")?.sin()))
        }),
        ("cos", |a, s| {
            Ok(Value::Number(number_arg(a, 0, s, "You must provide a number to math.cos(number).")?.cos()))
        }),
        ("tan", |a, s| {
            Ok(Value::Number(number_arg(a, 0, s, "You must provide a number to math.tan(number).")?.tan()))
        }),
        ("radians", |a, s| {
            Ok(Value::Number(number_arg(a, 0, s, "You must provide an angle to math.radians(angle).")?.to_radians()))
        }),
        ("degrees", |a, s| {
            Ok(Value::Number(number_arg(a, 0, s, "You must provide an angle to math.degrees(angle).")?.to_degrees()))
        }),
    ];

    for (name, func) in unary {
        members.insert(name.to_string(), native(name, 1, func));
    }

    members.insert("root".to_string(), native("root", 2, root));
    members.insert("pi".to_string(), Value::Number(std::f64::consts::PI));

    members
}

/// `math.root(n, k)`: the real `k`th root of `n`, odd roots of negatives
/// included.
fn root(args: &[Value], site: &Token) -> RuntimeResult<Value> {
    let num = number_arg(
        args,
        0,
        site,
        "Number provided to math.root(number, root) must be a number.",
    )?;
    let k = number_arg(
        args,
        1,
        site,
        "Root provided to math.root(number, root) must be a number.",
    )?;

    let negate = k % 2.0 == 1.0 && num < 0.0;
    let magnitude = if negate { -num } else { num };

    let candidate = magnitude.powf(1.0 / k);
    let check = candidate.powf(k);

    if (magnitude - check).abs() < 1.0 && (magnitude > 0.0) == (check > 0.0) {
        Ok(Value::Number(if negate { -candidate } else { candidate }))
    } else {
        Err(RuntimeError::new(
            site.line,
            format!(
                "Unable to find the {} root of {}.",
                crate::value::format_number(k),
                crate::value::format_number(num)
            ),
        ))
    }
}

// ───────────────────────────── time ─────────────────────────────

fn time() -> Table {
    let mut members = Table::new();

    members.insert(
        "time".to_string(),
        native("time", 0, |_, _| {
            Ok(Value::Number(chrono::Utc::now().timestamp_millis() as f64))
        }),
    );
    members.insert("localTime".to_string(), native("localTime", 1, local_time));
    members.insert("sleep".to_string(), native("sleep", 1, sleep));

    members
}

/// Render a millisecond timestamp (default: now) in the local time zone.
fn local_time(args: &[Value], site: &Token) -> RuntimeResult<Value> {
    let moment = match arg(args, 0) {
        Value::Null => Local::now(),
        Value::Number(ms) => Local
            .timestamp_millis_opt(*ms as i64)
            .single()
            .ok_or_else(|| RuntimeError::new(site.line, "Timestamp out of range."))?,
        _ => {
            return Err(RuntimeError::new(
                site.line,
                "time.localTime(timestamp) expects a number of milliseconds.",
            ))
        }
    };

    Ok(Value::Str(moment.format("%Y-%m-%d %H:%M:%S").to_string()))
}

/// Blocks the whole process.
fn sleep(args: &[Value], site: &Token) -> RuntimeResult<Value> {
    let ms = number_arg(args, 0, site, "time.sleep(ms) expects a number.")?;

    if ms > 0.0 {
        thread::sleep(Duration::from_millis(ms as u64));
    }

    Ok(Value::Null)
}

// ───────────────────────────── os ─────────────────────────────

fn os() -> Table {
    let mut members = Table::new();

    let functions: [(&str, usize, NativeFn); 6] = [
        ("read", 1, os_read),
        ("write", 2, os_write),
        ("delete", 1, os_delete),
        ("mkdir", 1, os_mkdir),
        ("deletedir", 1, os_deletedir),
        ("listdir", 1, os_listdir),
    ];

    for (name, arity, func) in functions {
        members.insert(name.to_string(), native(name, arity, func));
    }

    members
}

fn io_error(site: &Token, what: &str, error: io::Error) -> RuntimeError {
    RuntimeError::new(site.line, format!("Failed to {} - {:?}.", what, error.kind()))
}

fn os_read(args: &[Value], site: &Token) -> RuntimeResult<Value> {
    let path = string_arg(args, 0, site, "You must provide a filepath to os.read(filepath).")?;

    fs::read_to_string(path)
        .map(Value::Str)
        .map_err(|e| io_error(site, "read file", e))
}

/// `os.write(path, data)`: non‑string data is written as `str()` renders it.
fn os_write(args: &[Value], site: &Token) -> RuntimeResult<Value> {
    let path = string_arg(args, 0, site, "You must provide a filepath to os.write(filepath).")?;
    let data = match arg(args, 1) {
        Value::Null => String::new(),
        other => other.to_string(),
    };

    fs::write(path, data).map_err(|e| io_error(site, "write file", e))?;
    Ok(Value::Null)
}

fn os_delete(args: &[Value], site: &Token) -> RuntimeResult<Value> {
    let path = string_arg(args, 0, site, "You must provide a path to os.delete(path).")?;

    fs::remove_file(path).map_err(|e| io_error(site, "delete file", e))?;
    Ok(Value::Null)
}

fn os_mkdir(args: &[Value], site: &Token) -> RuntimeResult<Value> {
    let path = string_arg(args, 0, site, "You must provide a path to os.mkdir(path).")?;

    fs::create_dir(path).map_err(|e| io_error(site, "create folder", e))?;
    Ok(Value::Null)
}

/// Removes the folder and everything in it.
fn os_deletedir(args: &[Value], site: &Token) -> RuntimeResult<Value> {
    let path = string_arg(args, 0, site, "You must provide a path to os.deletedir(path).")?;

    fs::remove_dir_all(path).map_err(|e| io_error(site, "delete folder", e))?;
    Ok(Value::Null)
}

/// Entry names of a folder, sorted.
fn os_listdir(args: &[Value], site: &Token) -> RuntimeResult<Value> {
    let path = string_arg(args, 0, site, "You must provide a path to os.listdir(path).")?;
    let list_error = |e| io_error(site, "list contents of folder", e);

    let mut names = Vec::new();
    for entry in fs::read_dir(path).map_err(list_error)? {
        let entry = entry.map_err(list_error)?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();

    Ok(Value::array(names.into_iter().map(Value::Str).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_strings() {
        assert_eq!(parse_numeric("42"), Some(42.0));
        assert_eq!(parse_numeric("-7"), Some(-7.0));
        assert_eq!(parse_numeric("3.25"), Some(3.25));
        assert_eq!(parse_numeric("1e3"), None);
        assert_eq!(parse_numeric("abc"), None);
        assert_eq!(parse_numeric("4."), None);
        assert_eq!(parse_numeric(""), None);
    }

    #[test]
    fn unknown_modules_are_not_builtin() {
        assert!(module("math").is_some());
        assert!(module("time").is_some());
        assert!(module("os").is_some());
        assert!(module("./math.dg").is_none());
    }
}
