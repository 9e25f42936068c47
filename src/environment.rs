//! Lexical environments.
//!
//! An [`Environment`] is one scope's name → value map plus a link to the scope
//! that encloses it. Scopes are shared (`Rc<RefCell<…>>`) because closures,
//! bound methods and class frames all keep their defining scope alive after
//! the block that created it has finished.
//!
//! Lookups come in two flavours:
//! * **dynamic** (`get`/`assign`) walk the chain outward by name; used for
//!   globals, which the resolver leaves unannotated;
//! * **resolved** (`get_at`/`assign_at`) hop exactly `distance` links and
//!   touch that scope only.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::trace;

use crate::error::{RuntimeError, RuntimeResult};
use crate::token::Token;
use crate::value::Value;

/// Shared handle to a scope.
pub type Env = Rc<RefCell<Environment>>;

#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Env>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh scope nested inside `enclosing`, already wrapped for sharing.
    pub fn with_enclosing(enclosing: Env) -> Env {
        Rc::new(RefCell::new(Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }))
    }

    pub fn enclosing(&self) -> Option<Env> {
        self.enclosing.clone()
    }

    /// Bind `name` in this scope, replacing any previous binding.
    pub fn define(&mut self, name: &str, value: Value) {
        trace!("define {}", name);
        self.values.insert(name.to_string(), value);
    }

    /// Remove every binding of this scope and hand them back.
    pub fn clear(&mut self) -> HashMap<String, Value> {
        std::mem::take(&mut self.values)
    }

    /// Read a binding of this scope only.
    pub fn get_local(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }

    /// Look `name` up in this scope and then outward.
    pub fn get(&self, name: &Token) -> RuntimeResult<Value> {
        if let Some(value) = self.values.get(&name.lexeme) {
            return Ok(value.clone());
        }

        match &self.enclosing {
            Some(enclosing) => enclosing.borrow().get(name),
            None => Err(undefined(name)),
        }
    }

    /// Overwrite the nearest existing binding of `name`.
    pub fn assign(&mut self, name: &Token, value: Value) -> RuntimeResult<()> {
        if let Some(slot) = self.values.get_mut(&name.lexeme) {
            *slot = value;
            return Ok(());
        }

        match &self.enclosing {
            Some(enclosing) => enclosing.borrow_mut().assign(name, value),
            None => Err(undefined(name)),
        }
    }

    /// The scope `distance` links outward from `env` (0 is `env` itself).
    pub fn ancestor(env: &Env, distance: usize) -> Option<Env> {
        let mut current = Rc::clone(env);

        for _ in 0..distance {
            let next = current.borrow().enclosing.clone()?;
            current = next;
        }

        Some(current)
    }

    /// Read `name` from exactly the scope `distance` links out.
    pub fn get_at(env: &Env, distance: usize, name: &str) -> Option<Value> {
        Self::ancestor(env, distance)?.borrow().get_local(name)
    }

    /// Overwrite `name` in exactly the scope `distance` links out. Returns
    /// `false` if that scope does not exist or holds no such binding.
    pub fn assign_at(env: &Env, distance: usize, name: &str, value: Value) -> bool {
        let Some(scope) = Self::ancestor(env, distance) else {
            return false;
        };

        let mut scope = scope.borrow_mut();
        match scope.values.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

fn undefined(name: &Token) -> RuntimeError {
    RuntimeError::new(name.line, format!("Undefined variable '{}'.", name.lexeme))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenType;

    fn ident(name: &str) -> Token {
        Token::new(TokenType::IDENTIFIER, name, 1)
    }

    #[test]
    fn get_walks_outward() {
        let globals: Env = Rc::new(RefCell::new(Environment::new()));
        globals.borrow_mut().define("a", Value::Number(1.0));

        let inner = Environment::with_enclosing(Rc::clone(&globals));

        assert_eq!(inner.borrow().get(&ident("a")), Ok(Value::Number(1.0)));
    }

    #[test]
    fn assign_updates_nearest_binding() {
        let globals: Env = Rc::new(RefCell::new(Environment::new()));
        globals.borrow_mut().define("a", Value::Number(1.0));

        let inner = Environment::with_enclosing(Rc::clone(&globals));
        inner
            .borrow_mut()
            .assign(&ident("a"), Value::Number(2.0))
            .unwrap();

        assert_eq!(globals.borrow().get_local("a"), Some(Value::Number(2.0)));
        assert_eq!(inner.borrow().get_local("a"), None);
    }

    #[test]
    fn undefined_names_are_errors() {
        let env = Environment::new();

        let err = env.get(&ident("missing")).unwrap_err();
        assert_eq!(err.message(), "Undefined variable 'missing'.");

        let mut env = env;
        assert!(env.assign(&ident("missing"), Value::Null).is_err());
    }

    #[test]
    fn resolved_access_hits_exact_scope() {
        let outer: Env = Rc::new(RefCell::new(Environment::new()));
        outer.borrow_mut().define("x", Value::Number(1.0));

        let middle = Environment::with_enclosing(Rc::clone(&outer));
        middle.borrow_mut().define("x", Value::Number(2.0));

        let inner = Environment::with_enclosing(Rc::clone(&middle));

        assert_eq!(Environment::get_at(&inner, 1, "x"), Some(Value::Number(2.0)));
        assert_eq!(Environment::get_at(&inner, 2, "x"), Some(Value::Number(1.0)));
        assert_eq!(Environment::get_at(&inner, 0, "x"), None);

        assert!(Environment::assign_at(&inner, 2, "x", Value::Number(9.0)));
        assert_eq!(outer.borrow().get_local("x"), Some(Value::Number(9.0)));
        assert!(!Environment::assign_at(&inner, 5, "x", Value::Null));
    }

    #[test]
    fn resolved_assignment_needs_an_existing_slot() {
        let outer: Env = Rc::new(RefCell::new(Environment::new()));
        let inner = Environment::with_enclosing(Rc::clone(&outer));

        assert!(!Environment::assign_at(&inner, 1, "y", Value::Number(1.0)));
        assert_eq!(outer.borrow().get_local("y"), None);

        outer.borrow_mut().define("y", Value::Null);
        assert!(Environment::assign_at(&inner, 1, "y", Value::Number(1.0)));
        assert_eq!(outer.borrow().get_local("y"), Some(Value::Number(1.0)));
    }
}
