//! Runtime values.
//!
//! Primitives (`null`, booleans, numbers, strings) are copied on assignment.
//! Everything else is a shared reference: two variables holding the same
//! array, dictionary, function, class, instance or module observe each
//! other's mutations, and `==` on them is identity.
//!
//! Top-level functions and classes close over the global scope that stores
//! them. `Interpreter::teardown` breaks those cycles when a run ends. Cycles
//! built by the program itself (an instance holding one of its own bound
//! methods) are not collected.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::FunctionDecl;
use crate::environment::{Env, Environment};
use crate::error::RuntimeResult;
use crate::interpreter::Interpreter;
use crate::token::Token;

/// Name → value table used by dictionaries, instance fields, class statics,
/// function properties and modules.
pub type Table = BTreeMap<String, Value>;

/// Nesting beyond this is elided when formatting, so self‑containing
/// collections still print.
const MAX_DISPLAY_DEPTH: usize = 32;

#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Array(Rc<RefCell<Vec<Value>>>),
    Dict(Rc<RefCell<Table>>),
    Function(Rc<DragonFunction>),
    Native(Rc<NativeFunction>),
    Class(Rc<DragonClass>),
    Instance(Rc<Instance>),
    Module(Rc<Module>),
}

impl Value {
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn dict(entries: Table) -> Self {
        Value::Dict(Rc::new(RefCell::new(entries)))
    }

    /// `null` and `false` are falsey; every other value is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Null | Value::Bool(false))
    }

    /// Short kind name used in runtime error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Dict(_) => "dictionary",
            Value::Function(_) => "function",
            Value::Native(_) => "native function",
            Value::Class(_) => "class",
            Value::Instance(_) => "instance",
            Value::Module(_) => "module",
        }
    }

    /// The callable capability of this value, if it has one.
    pub fn as_callable(&self) -> Option<&dyn Callable> {
        match self {
            Value::Function(function) => Some(function.as_ref()),
            Value::Native(native) => Some(native.as_ref()),
            Value::Class(class) => Some(class),
            _ => None,
        }
    }

    /// Text used for dictionary keys: strings as is, everything else as `str()`
    /// would render it.
    pub fn to_key(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            other => other.to_string(),
        }
    }

    fn write(&self, f: &mut fmt::Formatter<'_>, depth: usize, quoted: bool) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::Str(s) if quoted => write!(f, "{:?}", s),
            Value::Str(s) => f.write_str(s),

            Value::Array(items) => {
                if depth >= MAX_DISPLAY_DEPTH {
                    return f.write_str("[...]");
                }

                f.write_str("[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    item.write(f, depth + 1, true)?;
                }
                f.write_str("]")
            }

            Value::Dict(entries) => {
                if depth >= MAX_DISPLAY_DEPTH {
                    return f.write_str("{...}");
                }

                f.write_str("{")?;
                for (i, (key, value)) in entries.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{:?}: ", key)?;
                    value.write(f, depth + 1, true)?;
                }
                f.write_str("}")
            }

            Value::Function(function) => match function.name() {
                Some(name) => write!(f, "<function {}>", name),
                None => f.write_str("<function>"),
            },
            Value::Native(native) => write!(f, "<native function {}>", native.name),
            Value::Class(class) => write!(f, "<class {}>", class.name),
            Value::Instance(instance) => write!(f, "<{} instance>", instance.class.name),
            Value::Module(module) => write!(f, "<module {}>", module.name),
        }
    }
}

/// Integral values print without a fraction (`3`), others in Rust's
/// shortest round‑trip form (`0.1`).
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        let mut buf = itoa::Buffer::new();
        buf.format(n as i64).to_owned()
    } else {
        n.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write(f, 0, false)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write(f, 0, true)
    }
}

/// Language‑level `==`: structural for primitives, identity for references.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Dict(a), Value::Dict(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::Module(a), Value::Module(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

// ─────────────────────────────── callables ────────────────────────────────

/// Anything that can appear before `(...)`.
///
/// The evaluator adjusts the argument list to [`arity`](Callable::arity)
/// before calling: missing arguments become `null`, and for variadic
/// callables everything from position `arity` onward arrives as one array.
pub trait Callable {
    /// Number of fixed (non‑variadic) parameters.
    fn arity(&self) -> usize;

    fn is_variadic(&self) -> bool {
        false
    }

    /// `site` is the identifier (or closing paren) of the call, for errors.
    fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        site: &Token,
    ) -> RuntimeResult<Value>;
}

/// Host procedure exposed to Dragon code.
pub type NativeFn = fn(&[Value], &Token) -> RuntimeResult<Value>;

pub struct NativeFunction {
    pub name: String,
    pub arity: usize,
    pub func: NativeFn,
}

impl NativeFunction {
    pub fn new(name: &str, arity: usize, func: NativeFn) -> Self {
        Self {
            name: name.to_string(),
            arity,
            func,
        }
    }
}

impl Callable for NativeFunction {
    fn arity(&self) -> usize {
        self.arity
    }

    fn call(&self, _: &mut Interpreter, arguments: Vec<Value>, site: &Token) -> RuntimeResult<Value> {
        (self.func)(&arguments, site)
    }
}

/// A user function or method together with the scope it closes over.
pub struct DragonFunction {
    pub declaration: Rc<FunctionDecl>,
    pub closure: Env,

    /// `init` methods always evaluate to their `this`.
    pub is_initializer: bool,

    /// Properties assigned with `fn.name = value`.
    pub properties: RefCell<Table>,
}

impl DragonFunction {
    pub fn new(declaration: Rc<FunctionDecl>, closure: Env, is_initializer: bool) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
            properties: RefCell::new(Table::new()),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.declaration.name.as_ref().map(|t| t.lexeme.as_str())
    }

    /// A copy of this function whose closure additionally binds `this`.
    pub fn bind(&self, instance: Value) -> DragonFunction {
        let env = Environment::with_enclosing(Rc::clone(&self.closure));
        env.borrow_mut().define("this", instance);

        DragonFunction::new(Rc::clone(&self.declaration), env, self.is_initializer)
    }
}

pub struct DragonClass {
    pub name: String,
    pub superclass: Option<Rc<DragonClass>>,
    pub methods: BTreeMap<String, Rc<DragonFunction>>,

    /// Properties assigned with `Class.name = value`.
    pub statics: RefCell<Table>,
}

impl DragonClass {
    /// Search this class, then its ancestors.
    pub fn find_method(&self, name: &str) -> Option<Rc<DragonFunction>> {
        if let Some(method) = self.methods.get(name) {
            return Some(Rc::clone(method));
        }

        self.superclass.as_ref()?.find_method(name)
    }
}

pub struct Instance {
    pub class: Rc<DragonClass>,
    pub fields: RefCell<Table>,
}

impl Instance {
    pub fn new(class: Rc<DragonClass>) -> Self {
        Self {
            class,
            fields: RefCell::new(Table::new()),
        }
    }
}

/// Namespace produced by `import`.
pub struct Module {
    pub name: String,
    pub members: RefCell<Table>,
}

impl Module {
    pub fn new(name: &str, members: Table) -> Self {
        Self {
            name: name.to_string(),
            members: RefCell::new(members),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(text: &str) -> Value {
        Value::Str(text.to_string())
    }

    #[test]
    fn numbers_print_without_trailing_zero() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(-2.0).to_string(), "-2");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Number(0.1 + 0.2).to_string(), "0.30000000000000004");
    }

    #[test]
    fn collections_quote_nested_strings() {
        let array = Value::array(vec![Value::Number(1.0), s("a"), Value::Null]);
        assert_eq!(array.to_string(), r#"[1, "a", null]"#);

        let mut table = Table::new();
        table.insert("k".to_string(), Value::Bool(true));
        table.insert("a".to_string(), array);
        assert_eq!(
            Value::dict(table).to_string(),
            r#"{"a": [1, "a", null], "k": true}"#
        );

        assert_eq!(s("plain").to_string(), "plain");
    }

    #[test]
    fn self_containing_array_still_prints() {
        let array = Value::array(vec![]);
        if let Value::Array(items) = &array {
            items.borrow_mut().push(array.clone());
        }

        assert!(array.to_string().contains("[...]"));
    }

    #[test]
    fn equality_is_identity_for_references() {
        let a = Value::array(vec![]);
        let b = Value::array(vec![]);

        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_eq!(s("x"), s("x"));
        assert_ne!(Value::Number(0.0), Value::Bool(false));
        assert_ne!(Value::Number(f64::NAN), Value::Number(f64::NAN));
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Number(0.0).is_truthy());
        assert!(s("").is_truthy());
    }

    #[test]
    fn dictionary_keys_use_str_formatting() {
        assert_eq!(Value::Number(1.0).to_key(), "1");
        assert_eq!(s("k").to_key(), "k");
        assert_eq!(Value::Null.to_key(), "null");
    }
}
