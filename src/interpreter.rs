//! Tree‑walking evaluator.
//!
//! Statements execute to a [`Completion`]; `return`, `break` and `continue`
//! travel back up the Rust call chain as values of that type rather than as
//! errors, and each statement kind decides which of them it absorbs. Genuine
//! failures are [`RuntimeError`]s.
//!
//! Variable access follows the resolver's [`Locals`] table: a resolved
//! reference hops a fixed number of scopes; an unresolved one is a global of
//! the compilation unit whose code is running (the root of the current scope
//! chain), so functions imported from another file keep seeing that file's
//! globals.

use std::cell::RefCell;
use std::io::{self, Write};
use std::mem;
use std::path::PathBuf;
use std::rc::Rc;

use log::{debug, info, trace};

use crate::ast::{Expr, ExprId, FunctionDecl, LiteralValue, Param, Stmt};
use crate::environment::{Env, Environment};
use crate::error::{RuntimeError, RuntimeResult};
use crate::loader::{FsLoader, SourceLoader};
use crate::resolver::Locals;
use crate::runner;
use crate::stack::ensure_sufficient_stack;
use crate::stdlib::{self, Bindings};
use crate::token::{Token, TokenType};
use crate::value::{Callable, DragonClass, DragonFunction, Instance, Module, Table, Value};

/// Default limit on nested calls before a stack overflow is reported.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 512;

/// Construction parameters of an [`Interpreter`].
#[derive(Clone)]
pub struct Config {
    /// Directory that relative `import` paths are resolved against.
    pub base_dir: PathBuf,

    /// Nested calls allowed before `StackOverflow`.
    pub max_call_depth: usize,

    /// Where `print` writes.
    pub output: Rc<RefCell<dyn Write>>,

    pub loader: Rc<dyn SourceLoader>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            output: Rc::new(RefCell::new(io::stdout())),
            loader: Rc::new(FsLoader),
        }
    }
}

/// How a statement finished.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Normal,
    Return(Value),
    Break,
    Continue,
}

pub struct Interpreter {
    globals: Env,
    environment: Env,
    locals: Locals,
    config: Config,

    /// Calls currently on the evaluated program's stack.
    depth: usize,
}

impl Interpreter {
    /// Creates an interpreter whose global scope holds `bindings`.
    pub fn new(config: Config, bindings: Bindings) -> Self {
        info!("Initializing Interpreter");

        let globals: Env = Rc::new(RefCell::new(Environment::new()));
        for (name, value) in bindings.iter() {
            debug!("Defining global '{}'", name);
            globals.borrow_mut().define(name, value.clone());
        }

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: Locals::default(),
            config,
            depth: 0,
        }
    }

    pub fn globals(&self) -> Env {
        Rc::clone(&self.globals)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Make the scope distances of another compiled unit available.
    pub fn add_locals(&mut self, locals: Locals) {
        self.locals.extend(locals);
    }

    /// Interprets a list of statements (a "program"), stopping at the first
    /// runtime error.
    pub fn interpret(&mut self, statements: &[Stmt]) -> RuntimeResult<()> {
        debug!("Interpreting {} statements", statements.len());
        for stmt in statements {
            self.execute(stmt)?;
        }
        info!("Interpretation completed successfully");
        Ok(())
    }

    /// Drop every global binding. Top-level functions and classes close over
    /// the global scope, so the scope and its values only become unreachable
    /// once the bindings are gone. The interpreter must not run code afterwards.
    pub fn teardown(&mut self) {
        debug!("Clearing global scope");
        self.environment = Rc::clone(&self.globals);
        let values = self.globals.borrow_mut().clear();
        drop(values);
    }

    // ───────────────────────────── statements ─────────────────────────────

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt) -> RuntimeResult<Completion> {
        ensure_sufficient_stack(|| self.execute_stmt(stmt))
    }

    fn execute_stmt(&mut self, stmt: &Stmt) -> RuntimeResult<Completion> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                trace!("print {}", value);
                writeln!(self.config.output.borrow_mut(), "{}", value).map_err(|e| {
                    RuntimeError::new(expr.line(), format!("Failed to write output: {}", e))
                })?;
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Null,
                };
                debug!("Defining variable '{}'", name.lexeme);
                self.environment.borrow_mut().define(&name.lexeme, value);
            }

            Stmt::Block(statements) => {
                let env = Environment::with_enclosing(Rc::clone(&self.environment));
                return self.execute_block(statements, env);
            }

            Stmt::If {
                condition,
                then_branch,
                elif_branches,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    return self.execute(then_branch);
                }
                for elif in elif_branches {
                    if self.evaluate(&elif.condition)?.is_truthy() {
                        return self.execute(&elif.branch);
                    }
                }
                if let Some(branch) = else_branch {
                    return self.execute(branch);
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body)? {
                        Completion::Break => break,
                        Completion::Return(value) => return Ok(Completion::Return(value)),
                        Completion::Normal | Completion::Continue => {}
                    }
                }
            }

            Stmt::DoWhile { body, condition } => loop {
                match self.execute(body)? {
                    Completion::Break => break,
                    Completion::Return(value) => return Ok(Completion::Return(value)),
                    Completion::Normal | Completion::Continue => {}
                }
                if !self.evaluate(condition)?.is_truthy() {
                    break;
                }
            },

            Stmt::For {
                initializer,
                condition,
                increment,
                body,
            } => {
                let env = Environment::with_enclosing(Rc::clone(&self.environment));
                return self.with_environment(env, |this| {
                    this.execute_for(
                        initializer.as_deref(),
                        condition.as_ref(),
                        increment.as_ref(),
                        body,
                    )
                });
            }

            Stmt::Switch {
                subject,
                cases,
                default,
            } => {
                let subject = self.evaluate(subject)?;
                let mut matched = false;

                for case in cases {
                    let mut hit = false;
                    for label in &case.labels {
                        if self.evaluate(label)? == subject {
                            hit = true;
                            break;
                        }
                    }
                    if !hit {
                        continue;
                    }

                    matched = true;
                    match self.execute_switch_body(&case.body)? {
                        Completion::Break => return Ok(Completion::Normal),
                        Completion::Return(value) => return Ok(Completion::Return(value)),
                        Completion::Normal | Completion::Continue => {}
                    }
                }

                if !matched {
                    if let Some(body) = default {
                        if let Completion::Return(value) = self.execute_switch_body(body)? {
                            return Ok(Completion::Return(value));
                        }
                    }
                }
            }

            Stmt::Try {
                body,
                catch,
                otherwise,
                finally,
            } => return self.execute_try(body, catch.as_deref(), otherwise.as_deref(), finally.as_deref()),

            Stmt::Break(_) => return Ok(Completion::Break),

            Stmt::Continue(_) => return Ok(Completion::Continue),

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Null,
                };
                return Ok(Completion::Return(value));
            }

            Stmt::Function(decl) => {
                let function = self.make_function(decl);
                if let Some(name) = &decl.name {
                    debug!("Defining function '{}'", name.lexeme);
                    self.environment.borrow_mut().define(&name.lexeme, function);
                }
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods)?,
        }

        Ok(Completion::Normal)
    }

    /// Run `statements` in `env`, restoring the previous scope on every path.
    pub fn execute_block(&mut self, statements: &[Stmt], env: Env) -> RuntimeResult<Completion> {
        self.with_environment(env, |this| this.execute_all(statements))
    }

    fn execute_all(&mut self, statements: &[Stmt]) -> RuntimeResult<Completion> {
        for stmt in statements {
            match self.execute(stmt)? {
                Completion::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Completion::Normal)
    }

    fn with_environment<T>(
        &mut self,
        env: Env,
        f: impl FnOnce(&mut Self) -> RuntimeResult<T>,
    ) -> RuntimeResult<T> {
        let previous = mem::replace(&mut self.environment, env);
        let result = f(self);
        self.environment = previous;
        result
    }

    fn execute_for(
        &mut self,
        initializer: Option<&Stmt>,
        condition: Option<&Expr>,
        increment: Option<&Expr>,
        body: &Stmt,
    ) -> RuntimeResult<Completion> {
        if let Some(init) = initializer {
            self.execute(init)?;
        }

        loop {
            if let Some(cond) = condition {
                if !self.evaluate(cond)?.is_truthy() {
                    break;
                }
            }

            match self.execute(body)? {
                Completion::Break => break,
                Completion::Return(value) => return Ok(Completion::Return(value)),
                Completion::Normal | Completion::Continue => {}
            }

            if let Some(inc) = increment {
                self.evaluate(inc)?;
            }
        }

        Ok(Completion::Normal)
    }

    /// Statements of one matched switch branch, in the enclosing scope.
    /// `continue` ends the branch; `break` and `return` are passed up.
    fn execute_switch_body(&mut self, statements: &[Stmt]) -> RuntimeResult<Completion> {
        for stmt in statements {
            match self.execute(stmt)? {
                Completion::Normal => {}
                Completion::Continue => return Ok(Completion::Normal),
                other => return Ok(other),
            }
        }
        Ok(Completion::Normal)
    }

    fn execute_try(
        &mut self,
        body: &[Stmt],
        catch: Option<&[Stmt]>,
        otherwise: Option<&[Stmt]>,
        finally: Option<&[Stmt]>,
    ) -> RuntimeResult<Completion> {
        let pending = match self.execute_block(body, self.child_scope()) {
            Ok(Completion::Normal) => match otherwise {
                Some(block) => self.execute_block(block, self.child_scope()),
                None => Ok(Completion::Normal),
            },
            Err(error) if error.is_catchable() => {
                debug!("try caught: {}", error);
                match catch {
                    Some(block) => self.execute_block(block, self.child_scope()),
                    None => Ok(Completion::Normal),
                }
            }
            other => other,
        };

        if let Some(block) = finally {
            match self.execute_block(block, self.child_scope())? {
                Completion::Normal => {}
                exit => return Ok(exit),
            }
        }

        pending
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> RuntimeResult<()> {
        debug!("Defining class '{}'", name.lexeme);

        let superclass = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),
                _ => {
                    return Err(RuntimeError::new(
                        expr.line(),
                        "Superclass must be a class.",
                    ))
                }
            },
            None => None,
        };

        self.environment
            .borrow_mut()
            .define(&name.lexeme, Value::Null);

        let method_env = match &superclass {
            Some(class) => {
                let env = self.child_scope();
                env.borrow_mut()
                    .define("super", Value::Class(Rc::clone(class)));
                env
            }
            None => Rc::clone(&self.environment),
        };

        let methods = methods
            .iter()
            .filter_map(|decl| {
                let method_name = decl.name.as_ref()?.lexeme.clone();
                let is_initializer = method_name == "init";
                let function =
                    DragonFunction::new(Rc::clone(decl), Rc::clone(&method_env), is_initializer);
                Some((method_name, Rc::new(function)))
            })
            .collect();

        let class = DragonClass {
            name: name.lexeme.clone(),
            superclass,
            methods,
            statics: RefCell::new(Table::new()),
        };

        self.environment
            .borrow_mut()
            .assign(name, Value::Class(Rc::new(class)))
    }

    fn child_scope(&self) -> Env {
        Environment::with_enclosing(Rc::clone(&self.environment))
    }

    fn make_function(&self, decl: &Rc<FunctionDecl>) -> Value {
        Value::Function(Rc::new(DragonFunction::new(
            Rc::clone(decl),
            Rc::clone(&self.environment),
            false,
        )))
    }

    // ───────────────────────────── expressions ─────────────────────────────

    pub fn evaluate(&mut self, expr: &Expr) -> RuntimeResult<Value> {
        ensure_sufficient_stack(|| self.evaluate_expr(expr))
    }

    fn evaluate_expr(&mut self, expr: &Expr) -> RuntimeResult<Value> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::Str(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Null => Value::Null,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => {
                let right = self.evaluate(right)?;
                self.evaluate_unary(operator, right)
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                evaluate_binary(operator, left, right)
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let short_circuit = match operator.token_type {
                    TokenType::OR => left.is_truthy(),
                    _ => !left.is_truthy(),
                };

                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(*id, name),

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;

                match self.locals.get(*id) {
                    Some(distance) => {
                        if !Environment::assign_at(&self.environment, distance, &name.lexeme, value.clone()) {
                            return Err(undefined_variable(name));
                        }
                    }
                    None => self
                        .current_globals()
                        .borrow_mut()
                        .assign(name, value.clone())?,
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let function = self.evaluate(callee)?;

                let mut args = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    args.push(self.evaluate(argument)?);
                }

                let site = callee.name_token().unwrap_or(paren);
                self.call_value(&function, args, site)
            }

            Expr::Get { object, name } => {
                let object = self.evaluate(object)?;
                get_property(&object, &name.lexeme, name.line)
            }

            Expr::Set {
                object,
                name,
                value,
            } => {
                let object = self.evaluate(object)?;
                let value = self.evaluate(value)?;
                set_property(&object, &name.lexeme, value.clone(), name.line)?;
                Ok(value)
            }

            Expr::Subscript {
                object,
                index,
                bracket,
            } => {
                let object = self.evaluate(object)?;
                let index = self.evaluate(index)?;
                get_subscript(&object, &index, bracket.line)
            }

            Expr::SubscriptSet {
                object,
                index,
                value,
                bracket,
            } => {
                let object = self.evaluate(object)?;
                let index = self.evaluate(index)?;
                let value = self.evaluate(value)?;
                set_subscript(&object, &index, value.clone(), bracket.line)?;
                Ok(value)
            }

            Expr::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.evaluate(item)?);
                }
                Ok(Value::array(values))
            }

            Expr::Dictionary { entries, .. } => {
                let mut table = Table::new();
                for (key, value) in entries {
                    let key = self.evaluate(key)?.to_key();
                    let value = self.evaluate(value)?;
                    table.insert(key, value);
                }
                Ok(Value::dict(table))
            }

            Expr::Function(decl) => Ok(self.make_function(decl)),

            Expr::This { id, keyword } => self.look_up_variable(*id, keyword),

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),

            Expr::Import { path, paren } => match self.evaluate(path)? {
                Value::Str(path) => self.import(&path, paren),
                other => Err(RuntimeError::new(
                    paren.line,
                    format!("Import path must be a string, not {}.", other.type_name()),
                )),
            },
        }
    }

    fn evaluate_unary(&self, operator: &Token, right: Value) -> RuntimeResult<Value> {
        match operator.token_type {
            TokenType::BANG => Ok(Value::Bool(!right.is_truthy())),
            TokenType::MINUS => match right {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(RuntimeError::new(operator.line, "Operand must be a number.")),
            },
            TokenType::TILDE => match right {
                Value::Number(n) => Ok(Value::Number(!(n as i64) as f64)),
                _ => Err(RuntimeError::new(operator.line, "Operand must be a number.")),
            },
            _ => Err(RuntimeError::new(
                operator.line,
                format!("Unknown unary operator '{}'.", operator.lexeme),
            )),
        }
    }

    fn look_up_variable(&self, id: ExprId, name: &Token) -> RuntimeResult<Value> {
        match self.locals.get(id) {
            Some(distance) => Environment::get_at(&self.environment, distance, &name.lexeme)
                .ok_or_else(|| undefined_variable(name)),
            None => self.current_globals().borrow().get(name),
        }
    }

    /// Global scope of the code currently running: the root of the scope chain.
    fn current_globals(&self) -> Env {
        let mut env = Rc::clone(&self.environment);
        loop {
            let next = env.borrow().enclosing();
            match next {
                Some(parent) => env = parent,
                None => return env,
            }
        }
    }

    fn evaluate_super(&self, id: ExprId, keyword: &Token, method: &Token) -> RuntimeResult<Value> {
        let missing = || RuntimeError::new(keyword.line, "Can't use 'super' here.");

        let distance = self.locals.get(id).ok_or_else(missing)?;

        let superclass = match Environment::get_at(&self.environment, distance, "super") {
            Some(Value::Class(class)) => class,
            _ => return Err(missing()),
        };

        // `this` lives in the scope just inside the one binding `super`.
        let object = distance
            .checked_sub(1)
            .and_then(|d| Environment::get_at(&self.environment, d, "this"))
            .ok_or_else(missing)?;

        let method_fn = superclass.find_method(&method.lexeme).ok_or_else(|| {
            RuntimeError::new(
                method.line,
                format!("Undefined property '{}'.", method.lexeme),
            )
        })?;

        Ok(Value::Function(Rc::new(method_fn.bind(object))))
    }

    // ───────────────────────────── calls ─────────────────────────────

    /// Call any callable value with already evaluated arguments.
    pub fn call_value(&mut self, callee: &Value, arguments: Vec<Value>, site: &Token) -> RuntimeResult<Value> {
        let callable = callee.as_callable().ok_or_else(|| {
            RuntimeError::new(site.line, "Can only call functions and classes.")
        })?;

        let arguments = adjust_arguments(arguments, callable.arity(), callable.is_variadic());

        if self.depth >= self.config.max_call_depth {
            return Err(RuntimeError::StackOverflow {
                line: site.line,
                limit: self.config.max_call_depth,
            });
        }

        trace!("call '{}' at depth {}", site.lexeme, self.depth);

        self.depth += 1;
        let result = ensure_sufficient_stack(|| callable.call(self, arguments, site));
        self.depth -= 1;

        result
    }

    /// Define each parameter in `env`; a `null` argument takes the
    /// parameter's default, evaluated inside `env`.
    fn bind_parameters(&mut self, params: &[Param], arguments: Vec<Value>, env: &Env) -> RuntimeResult<()> {
        for (param, argument) in params.iter().zip(arguments) {
            let value = match &param.default {
                Some(default) if matches!(argument, Value::Null) => {
                    self.with_environment(Rc::clone(env), |this| this.evaluate(default))?
                }
                _ => argument,
            };

            env.borrow_mut().define(&param.name.lexeme, value);
        }

        Ok(())
    }

    // ───────────────────────────── modules ─────────────────────────────

    fn import(&mut self, path: &str, site: &Token) -> RuntimeResult<Value> {
        if let Some(module) = stdlib::module(path) {
            return Ok(module);
        }

        info!("Importing '{}' relative to {}", path, self.config.base_dir.display());

        let loaded = self
            .config
            .loader
            .load(&self.config.base_dir, path)
            .map_err(|e| {
                RuntimeError::new(site.line, format!("Couldn't read imported file '{}': {}", path, e))
            })?
            .ok_or_else(|| {
                RuntimeError::new(site.line, format!("Couldn't find imported file '{}'.", path))
            })?;

        let program = runner::compile(&loaded.source).map_err(|errors| {
            let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
            RuntimeError::new(
                site.line,
                format!("Imported file '{}' has errors: {}", path, details.join("; ")),
            )
        })?;

        if self.depth >= self.config.max_call_depth {
            return Err(RuntimeError::StackOverflow {
                line: site.line,
                limit: self.config.max_call_depth,
            });
        }

        let config = Config {
            base_dir: loaded.dir(),
            ..self.config.clone()
        };

        let mut module_interpreter = Interpreter::new(config, stdlib::prelude());
        module_interpreter.depth = self.depth + 1;
        module_interpreter.add_locals(program.locals.clone());

        module_interpreter
            .interpret(&program.statements)
            .map_err(|error| match error {
                RuntimeError::Raised { message, line } => RuntimeError::new(
                    site.line,
                    format!("Error in imported file '{}' (line {}): {}", path, line, message),
                ),
                fatal => fatal,
            })?;

        // The module's functions run on this interpreter when called from here.
        self.add_locals(program.locals);

        let exports = module_interpreter
            .globals
            .borrow()
            .get_local("exports")
            .unwrap_or_default();

        Ok(match exports {
            Value::Dict(entries) => {
                let members = entries.borrow().clone();
                Value::Module(Rc::new(Module::new(&loaded.module_name(), members)))
            }
            other => other,
        })
    }
}

// ───────────────────────────── Callable impls ─────────────────────────────

impl Callable for DragonFunction {
    fn arity(&self) -> usize {
        self.declaration.params.iter().filter(|p| !p.variadic).count()
    }

    fn is_variadic(&self) -> bool {
        self.declaration.is_variadic()
    }

    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>, _site: &Token) -> RuntimeResult<Value> {
        let env = Environment::with_enclosing(Rc::clone(&self.closure));
        interpreter.bind_parameters(&self.declaration.params, arguments, &env)?;

        let completion = interpreter.execute_block(&self.declaration.body, env)?;

        if self.is_initializer {
            return Ok(Environment::get_at(&self.closure, 0, "this").unwrap_or_default());
        }

        match completion {
            Completion::Return(value) => Ok(value),
            _ => Ok(Value::Null),
        }
    }
}

impl Callable for Rc<DragonClass> {
    fn arity(&self) -> usize {
        self.find_method("init").map_or(0, |init| init.arity())
    }

    fn is_variadic(&self) -> bool {
        self.find_method("init").map_or(false, |init| init.is_variadic())
    }

    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>, site: &Token) -> RuntimeResult<Value> {
        let instance = Value::Instance(Rc::new(Instance::new(Rc::clone(self))));

        if let Some(init) = self.find_method("init") {
            init.bind(instance.clone()).call(interpreter, arguments, site)?;
        }

        Ok(instance)
    }
}

// ───────────────────────────── helpers ─────────────────────────────

/// Pad with `null` to `arity` and drop the surplus, or, for variadic
/// callables, gather everything from `arity` onward into one array.
fn adjust_arguments(mut arguments: Vec<Value>, arity: usize, variadic: bool) -> Vec<Value> {
    let rest = if variadic && arguments.len() > arity {
        arguments.split_off(arity)
    } else {
        Vec::new()
    };

    arguments.resize(arity, Value::Null);

    if variadic {
        arguments.push(Value::array(rest));
    }

    arguments
}

fn undefined_variable(name: &Token) -> RuntimeError {
    RuntimeError::new(name.line, format!("Undefined variable '{}'.", name.lexeme))
}

fn number_operands(operator: &Token, left: &Value, right: &Value) -> RuntimeResult<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(RuntimeError::new(operator.line, "Operands must be numbers.")),
    }
}

fn evaluate_binary(operator: &Token, left: Value, right: Value) -> RuntimeResult<Value> {
    match operator.token_type {
        TokenType::EQUAL_EQUAL => return Ok(Value::Bool(left == right)),
        TokenType::BANG_EQUAL => return Ok(Value::Bool(left != right)),
        TokenType::PLUS => match (&left, &right) {
            (Value::Str(a), Value::Str(b)) => return Ok(Value::Str(format!("{}{}", a, b))),
            (Value::Number(a), Value::Number(b)) => return Ok(Value::Number(a + b)),
            _ => {
                return Err(RuntimeError::new(
                    operator.line,
                    "Operands must be two numbers or two strings.",
                ))
            }
        },
        _ => {}
    }

    let (a, b) = number_operands(operator, &left, &right)?;

    let value = match operator.token_type {
        TokenType::MINUS => Value::Number(a - b),
        TokenType::STAR => Value::Number(a * b),
        TokenType::SLASH => Value::Number(a / b),
        TokenType::PERCENT => Value::Number(a % b),
        TokenType::STAR_STAR => Value::Number(a.powf(b)),
        TokenType::GREATER => Value::Bool(a > b),
        TokenType::GREATER_EQUAL => Value::Bool(a >= b),
        TokenType::LESS => Value::Bool(a < b),
        TokenType::LESS_EQUAL => Value::Bool(a <= b),
        TokenType::AMPERSAND => Value::Number(((a as i64) & (b as i64)) as f64),
        TokenType::PIPE => Value::Number(((a as i64) | (b as i64)) as f64),
        TokenType::CARET => Value::Number(((a as i64) ^ (b as i64)) as f64),
        TokenType::LESS_LESS => Value::Number((a as i64).wrapping_shl(b as u32) as f64),
        TokenType::GREATER_GREATER => Value::Number((a as i64).wrapping_shr(b as u32) as f64),
        _ => {
            return Err(RuntimeError::new(
                operator.line,
                format!("Unknown binary operator '{}'.", operator.lexeme),
            ))
        }
    };

    Ok(value)
}

/// `object.name`. Keyed lookups that miss yield `null`.
fn get_property(object: &Value, name: &str, line: usize) -> RuntimeResult<Value> {
    match object {
        Value::Instance(instance) => {
            if let Some(value) = instance.fields.borrow().get(name) {
                return Ok(value.clone());
            }

            Ok(match instance.class.find_method(name) {
                Some(method) => Value::Function(Rc::new(method.bind(object.clone()))),
                None => Value::Null,
            })
        }

        Value::Dict(entries) => Ok(entries.borrow().get(name).cloned().unwrap_or_default()),

        Value::Class(class) => {
            if let Some(value) = class.statics.borrow().get(name) {
                return Ok(value.clone());
            }
            Ok(class
                .find_method(name)
                .map(Value::Function)
                .unwrap_or_default())
        }

        Value::Function(function) => Ok(function
            .properties
            .borrow()
            .get(name)
            .cloned()
            .unwrap_or_default()),

        Value::Module(module) => Ok(module
            .members
            .borrow()
            .get(name)
            .cloned()
            .unwrap_or_default()),

        Value::Array(items) if name == "length" => Ok(Value::Number(items.borrow().len() as f64)),

        Value::Str(s) if name == "length" => Ok(Value::Number(s.chars().count() as f64)),

        Value::Array(_) | Value::Str(_) => Err(RuntimeError::new(
            line,
            format!("Undefined property '{}'.", name),
        )),

        other => Err(RuntimeError::new(
            line,
            format!("Can't read property '{}' of {}.", name, other.type_name()),
        )),
    }
}

/// `object.name = value`.
fn set_property(object: &Value, name: &str, value: Value, line: usize) -> RuntimeResult<()> {
    let table = match object {
        Value::Instance(instance) => &instance.fields,
        Value::Dict(entries) => &**entries,
        Value::Class(class) => &class.statics,
        Value::Function(function) => &function.properties,
        Value::Module(module) => &module.members,
        other => {
            return Err(RuntimeError::new(
                line,
                format!("Can't set property '{}' on {}.", name, other.type_name()),
            ))
        }
    };

    table.borrow_mut().insert(name.to_string(), value);
    Ok(())
}

/// Normalize a possibly negative index against `len`.
fn normalize_index(index: &Value, len: usize, line: usize) -> RuntimeResult<i64> {
    match index {
        Value::Number(n) if n.fract() == 0.0 => {
            let i = *n as i64;
            Ok(if i < 0 { i + len as i64 } else { i })
        }
        _ => Err(RuntimeError::new(line, "Index must be an integer.")),
    }
}

fn in_range(index: i64, len: usize, line: usize) -> RuntimeResult<usize> {
    if index < 0 || index as usize >= len {
        return Err(RuntimeError::new(line, "Index out of range."));
    }
    Ok(index as usize)
}

/// `object[index]`.
fn get_subscript(object: &Value, index: &Value, line: usize) -> RuntimeResult<Value> {
    match object {
        Value::Array(items) => {
            let items = items.borrow();
            let i = normalize_index(index, items.len(), line)?;
            Ok(items[in_range(i, items.len(), line)?].clone())
        }

        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let i = normalize_index(index, chars.len(), line)?;
            Ok(Value::Str(chars[in_range(i, chars.len(), line)?].to_string()))
        }

        Value::Dict(entries) => Ok(entries
            .borrow()
            .get(&index.to_key())
            .cloned()
            .unwrap_or_default()),

        Value::Instance(_) | Value::Class(_) | Value::Function(_) | Value::Module(_) => {
            get_property(object, &index.to_key(), line)
        }

        other => Err(RuntimeError::new(
            line,
            format!("Can't subscript {}.", other.type_name()),
        )),
    }
}

/// Most elements a single write past the end of an array may add.
const MAX_ARRAY_GROWTH: usize = 1 << 20;

/// `object[index] = value`. Arrays grow (padding with `null`) when written
/// past their end, by at most [`MAX_ARRAY_GROWTH`] elements.
fn set_subscript(object: &Value, index: &Value, value: Value, line: usize) -> RuntimeResult<()> {
    match object {
        Value::Array(items) => {
            let mut items = items.borrow_mut();
            let i = normalize_index(index, items.len(), line)?;
            if i < 0 {
                return Err(RuntimeError::new(line, "Index out of range."));
            }

            let i = i as usize;
            if i >= items.len() {
                let grow = i + 1 - items.len();
                if grow > MAX_ARRAY_GROWTH || items.try_reserve(grow).is_err() {
                    return Err(RuntimeError::new(line, "Index out of range."));
                }
                items.resize(i + 1, Value::Null);
            }
            items[i] = value;
            Ok(())
        }

        Value::Str(_) => Err(RuntimeError::new(line, "Strings are immutable.")),

        _ => set_property(object, &index.to_key(), value, line),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::compile;

    #[test]
    fn arguments_are_padded_and_truncated() {
        let args = vec![Value::Number(1.0)];
        assert_eq!(
            adjust_arguments(args, 3, false),
            vec![Value::Number(1.0), Value::Null, Value::Null]
        );

        let args = vec![Value::Number(1.0), Value::Number(2.0)];
        assert_eq!(adjust_arguments(args, 1, false), vec![Value::Number(1.0)]);
    }

    #[test]
    fn variadic_tail_is_collected() {
        let args: Vec<Value> = (1..=5).map(|n| Value::Number(n as f64)).collect();
        let adjusted = adjust_arguments(args, 2, true);

        assert_eq!(adjusted.len(), 3);
        assert_eq!(adjusted[2].to_string(), "[3, 4, 5]");

        let adjusted = adjust_arguments(vec![], 1, true);
        assert_eq!(adjusted[0], Value::Null);
        assert_eq!(adjusted[1].to_string(), "[]");
    }

    #[test]
    fn teardown_releases_the_global_scope() {
        let program = compile(
            "function f() { return g; }\nclass C { m() { return f; } }\nvar g = C();\nvar h = g.m;",
        )
        .unwrap();

        let mut interpreter = Interpreter::new(Config::default(), Bindings::new());
        interpreter.add_locals(program.locals);
        interpreter.interpret(&program.statements).unwrap();

        let globals = Rc::downgrade(&interpreter.globals());
        interpreter.teardown();
        drop(interpreter);

        assert!(globals.upgrade().is_none());
    }
}
