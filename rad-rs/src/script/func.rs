//! Function values and call dispatch.
//!
//! Builtins declare their contract up front ([`Builtin`]); it is checked
//! before the native body runs.  User functions ([`Lambda`], [`BlockFn`])
//! bind arguments in a fresh child of the environment they closed over.

use std::fmt;
use std::rc::Rc;

use crate::error::RadError;

use super::ast::{Expr, LambdaBody, Span, Stmt};
use super::env::Env;
use super::interp::{ControlFlow, FrameKind, Interpreter};
use super::value::{TypeSet, Value};

/// How many results the call site wants back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    /// Expression statements: any count is fine and results are dropped.
    Unconstrained,
    Exactly(usize),
}

/// Result counts a builtin can produce.
#[derive(Debug, Clone, Copy)]
pub enum Returns {
    /// Whatever the caller expects; the count is not checked.
    Any,
    Counts(&'static [usize]),
}

pub type NativeFn = fn(&mut Interpreter, &CallArgs) -> Result<Vec<Value>, RadError>;

/// A native function and its calling contract.
pub struct Builtin {
    pub name: &'static str,
    pub min_args: usize,
    pub max_args: Option<usize>,
    /// Allowed types per position; positions past the end accept anything.
    pub arg_types: &'static [TypeSet],
    pub named: &'static [(&'static str, TypeSet)],
    pub returns: Returns,
    pub body: NativeFn,
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Builtin({})", self.name)
    }
}

impl Builtin {
    /// Validate a call against the contract: positional count, positional
    /// types, named arguments, then the expected result count.
    pub fn check(&self, call: &CallArgs) -> Result<(), RadError> {
        let n = call.args.len();
        if n < self.min_args {
            return Err(RadError::arity(format!(
                "{}() requires at least {} argument{}, got {n}",
                self.name,
                self.min_args,
                plural(self.min_args)
            )));
        }
        if let Some(max) = self.max_args {
            if n > max {
                return Err(RadError::arity(format!(
                    "{}() takes at most {max} argument{}, got {n}",
                    self.name,
                    plural(max)
                )));
            }
        }
        for (i, (arg, allowed)) in call.args.iter().zip(self.arg_types).enumerate() {
            if !allowed.accepts(arg.kind()) {
                return Err(RadError::type_mismatch(format!(
                    "{}() argument {} must be {allowed}, got {}",
                    self.name,
                    i + 1,
                    arg.type_name()
                )));
            }
        }
        for (name, value) in &call.named {
            let Some((_, allowed)) = self.named.iter().find(|(n, _)| n == name) else {
                return Err(RadError::type_mismatch(format!(
                    "{}() has no named argument '{name}'",
                    self.name
                )));
            };
            if !allowed.accepts(value.kind()) {
                return Err(RadError::type_mismatch(format!(
                    "{}() named argument '{name}' must be {allowed}, got {}",
                    self.name,
                    value.type_name()
                )));
            }
        }
        if let (Expected::Exactly(want), Returns::Counts(counts)) = (call.expected, self.returns) {
            if !counts.contains(&want) {
                return Err(RadError::arity(match counts {
                    [0] => format!("{}() returns no value, but {want} expected", self.name),
                    _ => format!(
                        "{}() returns {} value{}, but {want} expected",
                        self.name,
                        join_counts(counts),
                        plural(counts.iter().copied().max().unwrap_or(0))
                    ),
                }));
            }
        }
        Ok(())
    }
}

fn escaped(name: &str, cf: ControlFlow) -> RadError {
    RadError::bug(format!("{cf:?} escaped from {name}()"))
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

fn join_counts(counts: &[usize]) -> String {
    let parts: Vec<String> = counts.iter().map(|c| c.to_string()).collect();
    parts.join(" or ")
}

/// `fn(a, b) expr, ...` or `fn(a) stmt`.
pub struct Lambda {
    pub params: Vec<String>,
    pub body: LambdaBody,
    pub env: Rc<Env>,
}

/// A named function defined with a block body.
pub struct BlockFn {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    pub ret: Option<Vec<Expr>>,
    pub env: Rc<Env>,
}

#[derive(Clone)]
pub enum FnValue {
    Builtin(&'static Builtin),
    Lambda(Rc<Lambda>),
    Block(Rc<BlockFn>),
}

impl FnValue {
    pub fn name(&self) -> &str {
        match self {
            FnValue::Builtin(b) => b.name,
            FnValue::Lambda(_) => "<lambda>",
            FnValue::Block(f) => &f.name,
        }
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &FnValue) -> bool {
        match (self, other) {
            (FnValue::Builtin(a), FnValue::Builtin(b)) => std::ptr::eq(*a, *b),
            (FnValue::Lambda(a), FnValue::Lambda(b)) => Rc::ptr_eq(a, b),
            (FnValue::Block(a), FnValue::Block(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Whether this value is the only handle on a closure over `scope`.
    pub fn captures_only(&self, scope: &Rc<Env>) -> bool {
        match self {
            FnValue::Builtin(_) => false,
            FnValue::Lambda(l) => Rc::strong_count(l) == 1 && Rc::ptr_eq(&l.env, scope),
            FnValue::Block(f) => Rc::strong_count(f) == 1 && Rc::ptr_eq(&f.env, scope),
        }
    }
}

impl fmt::Debug for FnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}

/// Evaluated arguments of one call.
#[derive(Debug, Clone)]
pub struct CallArgs {
    pub args: Vec<Value>,
    pub named: Vec<(String, Value)>,
    pub expected: Expected,
    pub span: Option<Span>,
}

impl CallArgs {
    pub fn new(args: Vec<Value>) -> Self {
        Self { args, named: Vec::new(), expected: Expected::Exactly(1), span: None }
    }

    pub fn expecting(mut self, expected: Expected) -> Self {
        self.expected = expected;
        self
    }

    /// Positional argument `i`.  Only call for positions the contract's
    /// minimum guarantees.
    pub fn arg(&self, i: usize) -> &Value {
        &self.args[i]
    }

    pub fn opt(&self, i: usize) -> Option<&Value> {
        self.args.get(i)
    }

    pub fn named(&self, name: &str) -> Option<&Value> {
        self.named.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Whether the caller asked for `n` results.
    pub fn wants(&self, n: usize) -> bool {
        self.expected == Expected::Exactly(n)
    }
}

// ── Dispatch ──────────────────────────────────────────────────────────────────

impl Interpreter {
    /// Call `f`, enforcing its arity and the caller's expected result count.
    pub fn call(&mut self, f: &FnValue, call: CallArgs) -> Result<Vec<Value>, RadError> {
        match f {
            FnValue::Builtin(b) => {
                b.check(&call).map_err(|e| e.at(call.span))?;
                (b.body)(self, &call).map_err(|e| e.at(call.span))
            }
            FnValue::Lambda(lambda) => {
                let env = bind_params("<lambda>", &lambda.params, &lambda.env, &call)?;
                let returned = self.in_frame(env, |interp| match &lambda.body {
                    LambdaBody::Exprs(exprs) => {
                        let values: Vec<Value> = exprs.iter().map(|e| interp.eval(e)).collect::<Result<_, _>>()?;
                        Ok(Some(values))
                    }
                    LambdaBody::Stmt(stmt) => match interp.exec_stmt(stmt)? {
                        Some(cf @ (ControlFlow::Break | ControlFlow::Continue)) => Err(escaped("<lambda>", cf)),
                        _ => Ok(None),
                    },
                })?;
                check_returns("<lambda>", returned, &call)
            }
            FnValue::Block(func) => {
                let env = bind_params(&func.name, &func.params, &func.env, &call)?;
                let returned = self.in_frame(env, |interp| {
                    match interp.exec_block(&func.body)? {
                        Some(ControlFlow::Return(values)) => Ok(Some(values)),
                        Some(cf) => Err(escaped(&func.name, cf)),
                        None => match &func.ret {
                            Some(exprs) => interp.eval_return(exprs).map(Some),
                            None => Ok(None),
                        },
                    }
                })?;
                check_returns(&func.name, returned, &call)
            }
        }
    }

    /// Run `body` in `env` as a call frame: the frame's deferred groups run
    /// when it finishes, and the caller's environment is restored.
    fn in_frame<T>(
        &mut self,
        env: Rc<Env>,
        body: impl FnOnce(&mut Self) -> Result<T, RadError>,
    ) -> Result<T, RadError> {
        let saved = std::mem::replace(&mut self.env, env);
        self.defers.push(Vec::new());
        let result = body(self);
        let frame = self.defers.pop().unwrap_or_default();
        let failed = match &result {
            Ok(_) => false,
            Err(e) => e.exit_code().map_or(true, |code| code != 0),
        };
        let deferred = self.run_deferred(frame, FrameKind::Call { failed });
        Env::release(std::mem::replace(&mut self.env, saved));
        let value = result?;
        deferred?;
        Ok(value)
    }
}

fn bind_params(name: &str, params: &[String], env: &Rc<Env>, call: &CallArgs) -> Result<Rc<Env>, RadError> {
    if let Some((arg, _)) = call.named.first() {
        return Err(RadError::type_mismatch(format!("{name}() has no named argument '{arg}'")).at(call.span));
    }
    if call.args.len() != params.len() {
        return Err(RadError::arity(format!(
            "{name}() takes {} argument{}, got {}",
            params.len(),
            plural(params.len()),
            call.args.len()
        ))
        .at(call.span));
    }
    let scope = Env::child(env);
    for (param, arg) in params.iter().zip(&call.args) {
        scope.define(param, arg.clone());
    }
    Ok(scope)
}

/// Match what a user function produced against what the caller expects.
/// `None` means the function finished without returning anything.
fn check_returns(name: &str, returned: Option<Vec<Value>>, call: &CallArgs) -> Result<Vec<Value>, RadError> {
    let Expected::Exactly(want) = call.expected else {
        return Ok(returned.unwrap_or_default());
    };
    match returned {
        None if want > 0 => Err(RadError::arity(format!(
            "{name}() did not return a value, but {want} expected"
        ))
        .at(call.span)),
        None => Ok(Vec::new()),
        Some(values) if values.len() != want => Err(RadError::arity(format!(
            "{name}() returned {} value{}, but {want} expected",
            values.len(),
            plural(values.len())
        ))
        .at(call.span)),
        Some(values) => Ok(values),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn noop(_: &mut Interpreter, _: &CallArgs) -> Result<Vec<Value>, RadError> {
        Ok(vec![Value::Null])
    }

    static PAD: Builtin = Builtin {
        name: "pad",
        min_args: 1,
        max_args: Some(2),
        arg_types: &[TypeSet::STR, TypeSet::INT],
        named: &[("fill", TypeSet::STR)],
        returns: Returns::Counts(&[1]),
        body: noop,
    };

    fn code(call: CallArgs) -> Option<ErrorCode> {
        PAD.check(&call).err().map(|e| e.code())
    }

    #[test]
    fn too_few_and_too_many() {
        assert_eq!(code(CallArgs::new(vec![])), Some(ErrorCode::ArityMismatch));
        let three = vec![Value::str("a"), Value::Int(1), Value::Int(2)];
        assert_eq!(code(CallArgs::new(three)), Some(ErrorCode::ArityMismatch));
    }

    #[test]
    fn positional_types() {
        let err = PAD.check(&CallArgs::new(vec![Value::Int(1)])).unwrap_err();
        assert_eq!(err.to_string(), "pad() argument 1 must be str, got int");
        assert_eq!(code(CallArgs::new(vec![Value::str("a"), Value::Int(3)])), None);
    }

    #[test]
    fn named_allow_list() {
        let mut call = CallArgs::new(vec![Value::str("a")]);
        call.named.push(("fill".into(), Value::str("-")));
        assert_eq!(code(call.clone()), None);
        call.named.push(("width".into(), Value::Int(3)));
        assert_eq!(code(call), Some(ErrorCode::TypeMismatch));
    }

    #[test]
    fn expected_result_count() {
        let call = CallArgs::new(vec![Value::str("a")]).expecting(Expected::Exactly(2));
        assert_eq!(code(call), Some(ErrorCode::ArityMismatch));
        let call = CallArgs::new(vec![Value::str("a")]).expecting(Expected::Unconstrained);
        assert_eq!(code(call), None);
    }

    #[test]
    fn any_return_count_is_not_checked() {
        static SPREAD: Builtin = Builtin {
            name: "spread",
            min_args: 0,
            max_args: None,
            arg_types: &[],
            named: &[],
            returns: Returns::Any,
            body: noop,
        };
        for want in [0, 1, 3] {
            let call = CallArgs::new(vec![Value::Int(1)]).expecting(Expected::Exactly(want));
            assert!(SPREAD.check(&call).is_ok(), "expecting {want}");
        }
    }

    #[test]
    fn missing_return_is_arity_error() {
        let call = CallArgs::new(vec![]);
        let err = check_returns("f", None, &call).unwrap_err();
        assert_eq!(err.to_string(), "f() did not return a value, but 1 expected");
        let call = CallArgs::new(vec![]).expecting(Expected::Unconstrained);
        assert!(check_returns("f", None, &call).unwrap().is_empty());
    }
}
