//! Tree-walking interpreter.
//!
//! The [`Interpreter`] owns the current scope, the deferred-group stack,
//! the exit state and the outside-world capabilities (shell, fetcher,
//! table renderer).  Statements return [`ControlFlow`] signals for
//! `break`/`continue`/`return`; failures travel as [`RadError`] and pick up
//! the span of every expression and statement they pass through.

use std::rc::Rc;

use log::{debug, error, warn};

use crate::config::Config;
use crate::error::RadError;
use crate::fetch::{JsonFetcher, NoTransport};
use crate::shell::{ShellExecutor, SystemShell};

use super::ast::{
    BinOp, Expr, ExprKind, Literal, Script, ShellSlot, ShellStmt, ShellTargets, Stmt, StmtKind, Target,
    UnaryOp,
};
use super::builtins;
use super::env::Env;
use super::exit::{catch_panic, Deferred, ExitHandler};
use super::func::{BlockFn, CallArgs, Expected, FnValue, Lambda};
use super::ops;
use super::rad::{PlainRenderer, TableRenderer};
use super::value::{Map, Value};

// ── Signals ───────────────────────────────────────────────────────────────────

/// Non-local control flow out of a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlFlow {
    Break,
    Continue,
    Return(Vec<Value>),
}

/// Which kind of frame a set of deferred groups belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// The whole script; errdefers look at the exit code.
    Script,
    /// A function call; errdefers run when the body failed.
    Call { failed: bool },
}

/// Result of running a script to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    pub exit_code: i32,
    /// Rendered diagnostics for the failure that ended the script, if any.
    pub diagnostics: Vec<String>,
}

// ── Interpreter ───────────────────────────────────────────────────────────────

pub struct Interpreter {
    /// Scope statements currently run in.
    pub(crate) env: Rc<Env>,
    /// Deferred groups, one list per active frame (script frame first).
    pub(crate) defers: Vec<Vec<Deferred>>,
    /// Lines written by `print`/`debug` and rad tables, when not echoing.
    pub output: Vec<String>,
    /// Lines written by `print_err`, when not echoing.
    pub err_output: Vec<String>,
    pub(crate) config: Config,
    pub(crate) shell: Box<dyn ShellExecutor>,
    pub(crate) fetcher: Box<dyn JsonFetcher>,
    pub(crate) renderer: Box<dyn TableRenderer>,
    exit: ExitHandler,
    source: Option<String>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Interpreter {
    fn drop(&mut self) {
        let globals = self.globals();
        self.env = Env::root();
        Env::release(globals);
    }
}

impl Interpreter {
    /// An interpreter that buffers output in [`Interpreter::output`] and
    /// [`Interpreter::err_output`] instead of printing it.
    pub fn new() -> Self {
        let config = Config { echo: false, ..Config::default() };
        Interpreter {
            env: Env::root(),
            defers: Vec::new(),
            output: Vec::new(),
            err_output: Vec::new(),
            shell: Box::new(SystemShell::new(config.shell_program())),
            fetcher: Box::new(NoTransport),
            renderer: Box::new(PlainRenderer),
            config,
            exit: ExitHandler::default(),
            source: None,
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.shell = Box::new(SystemShell::new(config.shell_program()));
        self.config = config;
        self
    }

    pub fn with_shell(mut self, shell: impl ShellExecutor + 'static) -> Self {
        self.shell = Box::new(shell);
        self
    }

    pub fn with_fetcher(mut self, fetcher: impl JsonFetcher + 'static) -> Self {
        self.fetcher = Box::new(fetcher);
        self
    }

    pub fn with_renderer(mut self, renderer: impl TableRenderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    /// The script's top-level scope.  Each [`Interpreter::evaluate`] starts a
    /// fresh one.
    pub fn globals(&self) -> Rc<Env> {
        let mut env = self.env.clone();
        while let Some(parent) = env.parent().cloned() {
            env = parent;
        }
        env
    }

    /// Whether string attributes are rendered in output.
    pub fn color(&self) -> bool {
        self.config.color.unwrap_or(false)
    }

    pub(crate) fn emit(&mut self, line: String) {
        if self.config.echo {
            println!("{line}");
        } else {
            self.output.push(line);
        }
    }

    pub(crate) fn emit_err(&mut self, line: String) {
        if self.config.echo {
            eprintln!("{line}");
        } else {
            self.err_output.push(line);
        }
    }

    // ── Entry point ───────────────────────────────────────────────────────────

    /// Run `script` to completion: its statements, then the script frame's
    /// deferred groups.
    pub fn evaluate(&mut self, script: &Script) -> Outcome {
        Env::release(std::mem::replace(&mut self.env, Env::root()));
        self.source = script.source.clone();
        self.exit = ExitHandler::default();
        self.defers = vec![Vec::new()];

        let mut diagnostics = Vec::new();
        let code = match self.exec_block(&script.stmts) {
            Ok(None | Some(ControlFlow::Return(_))) => 0,
            Ok(Some(cf)) => {
                let e = RadError::bug(format!("{cf:?} escaped to the top level"));
                diagnostics.push(self.report(&e));
                1
            }
            Err(e) => match e.exit_code() {
                Some(code) => code,
                None => {
                    diagnostics.push(self.report(&e));
                    1
                }
            },
        };

        self.exit.begin(code);
        let frame = self.defers.pop().unwrap_or_default();
        if let Err(e) = self.run_deferred(frame, FrameKind::Script) {
            // exits are absorbed while exiting; anything else is a bug
            error!("{e}");
            self.exit.escalate(1);
        }
        Outcome { exit_code: self.exit.code(), diagnostics }
    }

    fn report(&self, e: &RadError) -> String {
        let rendered = e.render(self.source.as_deref());
        error!("{e}");
        rendered
    }

    /// Run a frame's deferred groups, last registered first.
    ///
    /// Failures inside a group are logged and raise the exit code to 1;
    /// the remaining groups still run.  An `exit()` from a group escalates
    /// the code when the script is already exiting, and otherwise is
    /// returned once every group has run.
    pub(crate) fn run_deferred(&mut self, frame: Vec<Deferred>, kind: FrameKind) -> Result<(), RadError> {
        let mut requested_exit: Option<i32> = None;

        for group in frame.into_iter().rev() {
            let failing = match kind {
                FrameKind::Script => self.exit.initial_code() != 0,
                FrameKind::Call { failed } => failed,
            };
            if group.errdefer && !failing {
                debug!("skipping errdefer ({kind:?})");
                continue;
            }

            let saved = std::mem::replace(&mut self.env, group.env.clone());
            let depth = self.defers.len();
            let outcome = catch_panic(|| {
                self.defers.push(Vec::new());
                let result = self.exec_block(&group.body);
                let nested = self.defers.pop().unwrap_or_default();
                let deferred = self.run_deferred(nested, FrameKind::Call { failed: result.is_err() });
                result.and(deferred)
            });
            self.defers.truncate(depth);
            self.env = saved;

            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => match e.exit_code() {
                    Some(code) if self.exit.is_exiting() => self.exit.escalate(code),
                    Some(code) => {
                        requested_exit = Some(match requested_exit {
                            Some(prev) if prev != 0 => prev,
                            _ => code,
                        });
                    }
                    None => {
                        warn!("deferred block failed: {}", e.render(self.source.as_deref()));
                        self.exit.escalate(1);
                    }
                },
                Err(msg) => {
                    error!("deferred block panicked: {msg}");
                    self.exit.escalate(1);
                }
            }
        }

        match requested_exit {
            Some(code) => Err(RadError::Exit { code }),
            None => Ok(()),
        }
    }

    // ── Statements ────────────────────────────────────────────────────────────

    pub(crate) fn exec_block(&mut self, stmts: &[Stmt]) -> Result<Option<ControlFlow>, RadError> {
        for stmt in stmts {
            if let Some(cf) = self.exec_stmt(stmt)? {
                return Ok(Some(cf));
            }
        }
        Ok(None)
    }

    pub(crate) fn exec_stmt(&mut self, stmt: &Stmt) -> Result<Option<ControlFlow>, RadError> {
        self.exec_kind(&stmt.kind).map_err(|e| e.at(stmt.span))
    }

    fn exec_kind(&mut self, kind: &StmtKind) -> Result<Option<ControlFlow>, RadError> {
        match kind {
            StmtKind::Expr(e) => {
                self.eval_multi(e, Expected::Unconstrained)?;
            }

            StmtKind::Assign { targets, values } => {
                let vals = if targets.len() == values.len() {
                    values.iter().map(|v| self.eval(v)).collect::<Result<Vec<_>, _>>()?
                } else if let [single] = values.as_slice() {
                    self.eval_multi(single, Expected::Exactly(targets.len()))?
                } else {
                    Vec::new()
                };
                if vals.len() != targets.len() {
                    return Err(RadError::arity(format!(
                        "cannot assign {} value{} to {} target{}",
                        vals.len().max(values.len()),
                        if vals.len().max(values.len()) == 1 { "" } else { "s" },
                        targets.len(),
                        if targets.len() == 1 { "" } else { "s" },
                    )));
                }
                for (target, v) in targets.iter().zip(vals) {
                    self.assign_target(target, v)?;
                }
            }

            StmtKind::CompoundAssign { target, op, value } => {
                let current = self.read_target(target)?;
                let rhs = self.eval(value)?;
                let updated = ops::binary(*op, &current, &rhs)?;
                self.assign_target(target, updated)?;
            }

            StmtKind::Step { target, delta } => {
                let current = self.read_target(target)?;
                let number = ops::unary(UnaryOp::Plus, &current)?;
                let updated = ops::binary(BinOp::Add, &number, &Value::Int(*delta))?;
                self.assign_target(target, updated)?;
            }

            StmtKind::Unset(name) => {
                if !self.env.unset(name, true) {
                    debug!("unset of unbound '{name}'");
                }
            }

            StmtKind::If { branches, otherwise } => {
                for (cond, body) in branches {
                    if self.eval(cond)?.is_truthy() {
                        return self.exec_block(body);
                    }
                }
                if let Some(body) = otherwise {
                    return self.exec_block(body);
                }
            }

            StmtKind::While { cond, body } => loop {
                if let Some(cond) = cond {
                    if !self.eval(cond)?.is_truthy() {
                        break;
                    }
                }
                match self.in_scope(&[], body)? {
                    Some(ControlFlow::Break) => break,
                    Some(ControlFlow::Continue) | None => {}
                    Some(ret @ ControlFlow::Return(_)) => return Ok(Some(ret)),
                }
            },

            StmtKind::For { vars, iter, body } => {
                let iterable = self.eval(iter)?;
                let rows = for_rows(&iterable, vars.len())?;
                for row in rows {
                    let bindings: Vec<(&str, Value)> = vars.iter().map(String::as_str).zip(row).collect();
                    match self.in_scope(&bindings, body)? {
                        Some(ControlFlow::Break) => break,
                        Some(ControlFlow::Continue) | None => {}
                        Some(ret @ ControlFlow::Return(_)) => return Ok(Some(ret)),
                    }
                }
            }

            StmtKind::Break => return Ok(Some(ControlFlow::Break)),
            StmtKind::Continue => return Ok(Some(ControlFlow::Continue)),
            StmtKind::Return(exprs) => return Ok(Some(ControlFlow::Return(self.eval_return(exprs)?))),

            StmtKind::FnDef(decl) => {
                let func = BlockFn {
                    name: decl.name.clone(),
                    params: decl.params.clone(),
                    body: decl.body.clone(),
                    ret: decl.ret.clone(),
                    env: self.env.clone(),
                };
                self.env.define(&decl.name, Value::Fn(FnValue::Block(Rc::new(func))));
            }

            StmtKind::Defer { body, errdefer } => {
                let frame = self
                    .defers
                    .last_mut()
                    .ok_or_else(|| RadError::bug("defer with no active frame"))?;
                frame.push(Deferred { body: body.clone(), errdefer: *errdefer, env: self.env.clone() });
                debug!("registered {} (group {})", if *errdefer { "errdefer" } else { "defer" }, frame.len());
            }

            StmtKind::Shell(shell) => return self.exec_shell(shell),

            StmtKind::FieldDecl { name, path } => self.env.define_field(name, path.clone()),

            StmtKind::Rad(block) => self.exec_rad(block)?,
        }
        Ok(None)
    }

    /// Run `body` in a fresh child scope with `bindings` defined in it.
    fn in_scope(&mut self, bindings: &[(&str, Value)], body: &[Stmt]) -> Result<Option<ControlFlow>, RadError> {
        let scope = Env::child(&self.env);
        for (name, v) in bindings {
            scope.define(name, v.clone());
        }
        let saved = std::mem::replace(&mut self.env, scope);
        let result = self.exec_block(body);
        Env::release(std::mem::replace(&mut self.env, saved));
        result
    }

    fn read_target(&mut self, target: &Target) -> Result<Value, RadError> {
        let mut v = self.lookup(&target.name)?;
        for idx in &target.path {
            let key = self.eval(idx)?;
            v = v.index(&key).map_err(|e| e.at(idx.span))?;
        }
        Ok(v)
    }

    fn assign_target(&mut self, target: &Target, v: Value) -> Result<(), RadError> {
        let Some((last, prefix)) = target.path.split_last() else {
            self.env.assign(&target.name, v, true);
            return Ok(());
        };
        let mut container = self.lookup(&target.name)?;
        for idx in prefix {
            let key = self.eval(idx)?;
            container = container.index(&key).map_err(|e| e.at(idx.span))?;
        }
        let key = self.eval(last)?;
        container.set_index(&key, v).map_err(|e| e.at(last.span))
    }

    fn exec_shell(&mut self, stmt: &ShellStmt) -> Result<Option<ControlFlow>, RadError> {
        let cmd = self.eval(&stmt.cmd)?.require_str().map_err(|e| e.at(stmt.cmd.span))?.plain();

        let slots: Vec<(ShellSlot, String)> = match &stmt.targets {
            ShellTargets::Positional(names) => {
                if names.len() > 3 {
                    return Err(RadError::arity(format!(
                        "shell statements bind at most 3 values (code, stdout, stderr), got {}",
                        names.len()
                    )));
                }
                [ShellSlot::Code, ShellSlot::Stdout, ShellSlot::Stderr]
                    .into_iter()
                    .zip(names.iter().cloned())
                    .collect()
            }
            ShellTargets::Named(slots) => slots.iter().map(|s| (*s, s.name().to_owned())).collect(),
        };
        let capture_stdout = slots.iter().any(|(s, _)| *s == ShellSlot::Stdout);
        let capture_stderr = slots.iter().any(|(s, _)| *s == ShellSlot::Stderr);
        let quiet = stmt.quiet || self.config.quiet_shell;

        let out = self.shell.execute(&cmd, capture_stdout, capture_stderr, quiet);
        for (slot, name) in &slots {
            let v = match slot {
                ShellSlot::Code => Value::Int(out.exit_code.into()),
                ShellSlot::Stdout => Value::str(out.stdout.as_str()),
                ShellSlot::Stderr => Value::str(out.stderr.as_str()),
            };
            self.env.assign(name, v, true);
        }

        if out.exit_code == 0 {
            return Ok(None);
        }
        if let Some(catch) = &stmt.catch {
            debug!("`{cmd}` exited with {}; running catch block", out.exit_code);
            return self.exec_block(catch);
        }
        if let Some(fail) = &stmt.fail {
            debug!("`{cmd}` exited with {}; running fail block", out.exit_code);
            self.exec_block(fail)?;
        }
        Err(RadError::ShellNonZeroExit { command: cmd, code: out.exit_code })
    }

    // ── Expressions ───────────────────────────────────────────────────────────

    pub(crate) fn eval(&mut self, expr: &Expr) -> Result<Value, RadError> {
        self.eval_kind(expr).map_err(|e| e.at(expr.span))
    }

    fn eval_kind(&mut self, expr: &Expr) -> Result<Value, RadError> {
        Ok(match &expr.kind {
            ExprKind::Literal(lit) => match lit {
                Literal::Int(n) => Value::Int(*n),
                Literal::Float(x) => Value::Float(*x),
                Literal::Str(s) => Value::str(s.as_str()),
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Null => Value::Null,
            },

            ExprKind::Ident(name) => self.lookup(name)?,

            ExprKind::List(items) => {
                Value::list(items.iter().map(|e| self.eval(e)).collect::<Result<_, _>>()?)
            }

            ExprKind::Map(entries) => {
                let map = Map::new();
                for (k, v) in entries {
                    let key = self.eval(k)?;
                    let value = self.eval(v)?;
                    map.insert(key, value).map_err(|e| e.at(k.span))?;
                }
                Value::Map(map)
            }

            ExprKind::Binary { op: BinOp::And, lhs, rhs } => {
                let l = self.eval(lhs)?;
                if l.is_truthy() { self.eval(rhs)? } else { l }
            }
            ExprKind::Binary { op: BinOp::Or, lhs, rhs } => {
                let l = self.eval(lhs)?;
                if l.is_truthy() { l } else { self.eval(rhs)? }
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let l = self.eval(lhs)?;
                let r = self.eval(rhs)?;
                ops::binary(*op, &l, &r)?
            }

            ExprKind::Unary { op, operand } => {
                let v = self.eval(operand)?;
                ops::unary(*op, &v)?
            }

            ExprKind::Ternary { cond, then, otherwise } => {
                if self.eval(cond)?.is_truthy() {
                    self.eval(then)?
                } else {
                    self.eval(otherwise)?
                }
            }

            ExprKind::Index { target, index } => {
                let t = self.eval(target)?;
                let i = self.eval(index)?;
                t.index(&i)?
            }

            ExprKind::Slice { target, start, end } => {
                let t = self.eval(target)?;
                let start = self.eval_bound(start.as_deref())?;
                let end = self.eval_bound(end.as_deref())?;
                t.slice(start, end)?
            }

            ExprKind::Call { .. } => {
                let mut values = self.eval_multi(expr, Expected::Exactly(1))?;
                if values.len() != 1 {
                    return Err(RadError::arity(format!(
                        "call produced {} values where 1 was expected",
                        values.len()
                    )));
                }
                values.swap_remove(0)
            }

            ExprKind::Lambda { params, body } => Value::Fn(FnValue::Lambda(Rc::new(Lambda {
                params: params.clone(),
                body: body.clone(),
                env: self.env.clone(),
            }))),
        })
    }

    fn eval_bound(&mut self, bound: Option<&Expr>) -> Result<Option<i64>, RadError> {
        bound
            .map(|e| self.eval(e)?.require_int().map_err(|err| err.at(e.span)))
            .transpose()
    }

    /// Evaluate an expression that may produce several values.  Only calls
    /// can; anything else yields exactly one.
    pub(crate) fn eval_multi(&mut self, expr: &Expr, expected: Expected) -> Result<Vec<Value>, RadError> {
        let ExprKind::Call { callee, args, named } = &expr.kind else {
            return Ok(vec![self.eval(expr)?]);
        };
        let func = self.resolve_callee(callee)?;
        let args = args.iter().map(|a| self.eval(a)).collect::<Result<Vec<_>, _>>()?;
        let named = named
            .iter()
            .map(|(name, e)| Ok((name.clone(), self.eval(e)?)))
            .collect::<Result<Vec<_>, RadError>>()?;
        let call = CallArgs { args, named, expected, span: expr.span };
        self.call(&func, call).map_err(|e| e.at(expr.span))
    }

    fn resolve_callee(&mut self, callee: &Expr) -> Result<FnValue, RadError> {
        let value = match &callee.kind {
            ExprKind::Ident(name) => match self.env.lookup(name) {
                Some(v) => v,
                None => {
                    return builtins::lookup(name)
                        .map(FnValue::Builtin)
                        .ok_or_else(|| RadError::UnknownFunction { name: name.clone() }.at(callee.span))
                }
            },
            _ => self.eval(callee)?,
        };
        match value {
            Value::Fn(f) => Ok(f),
            other => Err(RadError::type_mismatch(format!("cannot call a {}", other.type_name())).at(callee.span)),
        }
    }

    /// Values of a `return` statement.  A lone call passes all of its
    /// results through.
    pub(crate) fn eval_return(&mut self, exprs: &[Expr]) -> Result<Vec<Value>, RadError> {
        match exprs {
            [single @ Expr { kind: ExprKind::Call { .. }, .. }] => self.eval_multi(single, Expected::Unconstrained),
            _ => exprs.iter().map(|e| self.eval(e)).collect(),
        }
    }

    /// Resolve an identifier: the scope chain, then the builtin table.
    pub fn lookup(&self, name: &str) -> Result<Value, RadError> {
        if let Some(v) = self.env.lookup(name) {
            return Ok(v);
        }
        if let Some(b) = builtins::lookup(name) {
            return Ok(Value::Fn(FnValue::Builtin(b)));
        }
        Err(RadError::UnknownIdentifier { name: name.to_owned(), suggestions: self.env.similar_names(name) })
    }
}

/// Per-iteration bindings for `for` over `iterable`.
fn for_rows(iterable: &Value, vars: usize) -> Result<Vec<Vec<Value>>, RadError> {
    if vars == 0 || vars > 2 {
        return Err(RadError::arity(format!("for loops bind 1 or 2 variables, got {vars}")));
    }
    let indexed = |items: Vec<Value>| -> Vec<Vec<Value>> {
        items
            .into_iter()
            .enumerate()
            .map(|(i, v)| if vars == 2 { vec![Value::Int(i as i64), v] } else { vec![v] })
            .collect()
    };
    Ok(match iterable {
        Value::List(l) => indexed(l.to_vec()),
        Value::Str(s) => indexed((0..s.char_count()).filter_map(|i| s.char_at(i)).map(Value::Str).collect()),
        Value::Map(m) => m
            .entries()
            .into_iter()
            .map(|(k, v)| if vars == 2 { vec![k, v] } else { vec![k] })
            .collect(),
        other => return Err(RadError::type_mismatch(format!("cannot iterate over a {}", other.type_name()))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::script::ast::build::*;
    use crate::script::ast::Span;

    fn run(stmts: Vec<Stmt>) -> (Interpreter, Outcome) {
        let mut interp = Interpreter::new();
        let outcome = interp.evaluate(&script(stmts));
        (interp, outcome)
    }

    fn global(interp: &Interpreter, name: &str) -> Value {
        interp.globals().lookup(name).unwrap_or(Value::Null)
    }

    #[test]
    fn arithmetic_and_print() {
        let (interp, outcome) = run(vec![
            assign("x", bin(BinOp::Add, int(2), int(3))),
            print(vec![ident("x"), string("done")]),
        ]);
        assert_eq!(outcome.exit_code, 0);
        assert_eq!(interp.output, ["5 done"]);
    }

    #[test]
    fn and_or_return_operands() {
        let (interp, _) = run(vec![
            assign("a", bin(BinOp::Or, string(""), string("fallback"))),
            assign("b", bin(BinOp::And, int(0), ident("missing"))),
        ]);
        assert_eq!(global(&interp, "a"), Value::str("fallback"));
        assert_eq!(global(&interp, "b"), Value::Int(0));
    }

    #[test]
    fn loop_variables_do_not_leak() {
        let (interp, outcome) = run(vec![
            assign("total", int(0)),
            for_in(
                &["x"],
                list(vec![int(1), int(2), int(3)]),
                vec![stmt(StmtKind::CompoundAssign { target: target("total"), op: BinOp::Add, value: ident("x") })],
            ),
        ]);
        assert_eq!(outcome.exit_code, 0);
        assert_eq!(global(&interp, "total"), Value::Int(6));
        assert!(!interp.globals().is_defined("x"));
    }

    #[test]
    fn break_and_continue() {
        let (interp, _) = run(vec![
            assign("seen", list(vec![])),
            for_in(
                &["i", "x"],
                list(vec![int(10), int(20), int(30), int(40)]),
                vec![
                    if_else(bin(BinOp::Eq, ident("i"), int(1)), vec![stmt(StmtKind::Continue)], None),
                    if_else(bin(BinOp::Eq, ident("i"), int(3)), vec![stmt(StmtKind::Break)], None),
                    stmt(StmtKind::CompoundAssign {
                        target: target("seen"),
                        op: BinOp::Add,
                        value: list(vec![ident("x")]),
                    }),
                ],
            ),
        ]);
        assert_eq!(global(&interp, "seen"), Value::list(vec![Value::Int(10), Value::Int(30)]));
    }

    #[test]
    fn step_requires_number() {
        let (_, outcome) = run(vec![
            assign("s", string("a")),
            stmt(StmtKind::Step { target: target("s"), delta: 1 }),
        ]);
        assert_eq!(outcome.exit_code, 1);
        assert!(outcome.diagnostics[0].contains("type-mismatch"));
    }

    #[test]
    fn indexed_assignment_mutates_shared_list() {
        let (interp, _) = run(vec![
            assign("a", list(vec![int(1), int(2)])),
            assign("b", ident("a")),
            stmt(StmtKind::Assign {
                targets: vec![Target { name: "b".into(), path: vec![int(-1)] }],
                values: vec![int(9)],
            }),
        ]);
        assert_eq!(global(&interp, "a"), Value::list(vec![Value::Int(1), Value::Int(9)]));
    }

    #[test]
    fn unknown_identifier_suggests() {
        let (_, outcome) = run(vec![assign("name", int(1)), print(vec![ident("nmae")])]);
        assert_eq!(outcome.exit_code, 1);
        assert!(outcome.diagnostics[0].contains("did you mean 'name'"), "{:?}", outcome.diagnostics);
    }

    #[test]
    fn unknown_function() {
        let (_, outcome) = run(vec![expr_stmt(call("nope", vec![]))]);
        assert!(outcome.diagnostics[0].starts_with(&format!("error[{}]", ErrorCode::UnknownFunction)));
    }

    #[test]
    fn diagnostics_point_at_source() {
        let src = "x = 1\ny = x / 0\n";
        let mut div = bin(BinOp::Div, ident("x"), int(0));
        div.span = Some(Span::new(10, 15));
        let s = Script { source: Some(src.into()), stmts: vec![assign("x", int(1)), assign("y", div)] };
        let outcome = Interpreter::new().evaluate(&s);
        assert_eq!(outcome.exit_code, 1);
        assert!(outcome.diagnostics[0].contains("--> 2:5"), "{}", outcome.diagnostics[0]);
    }

    #[test]
    fn builtins_are_values() {
        let (interp, _) = run(vec![
            assign("f", ident("upper")),
            assign("y", expr(ExprKind::Call { callee: Box::new(ident("f")), args: vec![string("hi")], named: vec![] })),
        ]);
        assert_eq!(global(&interp, "y"), Value::str("HI"));
    }
}
