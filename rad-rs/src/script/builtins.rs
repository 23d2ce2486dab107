//! Built-in functions.
//!
//! Every builtin is a static [`Builtin`] record: its calling contract plus a
//! native body.  The contract is checked by [`Interpreter::call`] before
//! the body runs, so bodies index their guaranteed arguments directly.

use std::rc::Rc;
use std::time::Duration;

use log::debug;
use regex::Regex;

use crate::attr::{Attr, Rgb};
use crate::error::{ErrorCode, RadError};
use crate::richstr::RichStr;

use super::ast::SortDir;
use super::func::{Builtin, CallArgs, Returns};
use super::interp::Interpreter;
use super::sort::sort_values;
use super::value::{ErrorValue, TypeSet, Value};

type NativeResult = Result<Vec<Value>, RadError>;

const NONE: Returns = Returns::Counts(&[0]);
const ONE: Returns = Returns::Counts(&[1]);
const ONE_OR_TWO: Returns = Returns::Counts(&[1, 2]);

const STR: TypeSet = TypeSet::STR;
const INT: TypeSet = TypeSet::INT;
const ANY: TypeSet = TypeSet::ANY;
const NUMBER: TypeSet = TypeSet::NUMBER;
const SIZED: TypeSet = STR.union(TypeSet::LIST).union(TypeSet::MAP);
const SCALAR: TypeSet = NUMBER.union(TypeSet::BOOL);

const fn builtin(
    name: &'static str,
    min_args: usize,
    max_args: Option<usize>,
    arg_types: &'static [TypeSet],
    returns: Returns,
    body: super::func::NativeFn,
) -> Builtin {
    Builtin { name, min_args, max_args, arg_types, named: &[], returns, body }
}

static BUILTINS: &[Builtin] = &[
    // ── Output ────────────────────────────────────────────────────────────
    builtin("print", 0, None, &[], NONE, print),
    builtin("print_err", 0, None, &[], NONE, print_err),
    builtin("debug", 0, None, &[], NONE, debug_print),
    // ── Types & conversion ────────────────────────────────────────────────
    builtin("len", 1, Some(1), &[SIZED], ONE, len),
    builtin("type_of", 1, Some(1), &[], ONE, type_of),
    builtin("str", 1, Some(1), &[], ONE, to_str),
    builtin("int", 1, Some(1), &[SCALAR], ONE, to_int),
    builtin("float", 1, Some(1), &[SCALAR], ONE, to_float),
    // ── Strings ───────────────────────────────────────────────────────────
    builtin("upper", 1, Some(1), &[STR], ONE, upper),
    builtin("lower", 1, Some(1), &[STR], ONE, lower),
    builtin("join", 2, Some(2), &[TypeSet::LIST, STR], ONE, join),
    builtin("split", 2, Some(2), &[STR, STR], ONE, split),
    builtin("replace", 3, Some(3), &[STR, STR, STR], ONE, replace),
    builtin("matches", 2, Some(2), &[STR, STR], ONE, matches),
    builtin("starts_with", 2, Some(2), &[STR, STR], ONE, starts_with),
    builtin("ends_with", 2, Some(2), &[STR, STR], ONE, ends_with),
    builtin("truncate", 2, Some(2), &[STR, INT], ONE, truncate),
    // ── Collections ───────────────────────────────────────────────────────
    builtin("keys", 1, Some(1), &[TypeSet::MAP], ONE, keys),
    builtin("values", 1, Some(1), &[TypeSet::MAP], ONE, values),
    builtin("range", 1, Some(3), &[INT, INT, INT], ONE, range),
    builtin("unique", 1, Some(1), &[TypeSet::LIST], ONE, unique),
    Builtin {
        name: "sort",
        min_args: 1,
        max_args: Some(1),
        arg_types: &[TypeSet::LIST],
        named: &[("reverse", TypeSet::BOOL)],
        returns: ONE,
        body: sort,
    },
    // ── Numbers ───────────────────────────────────────────────────────────
    builtin("abs", 1, Some(1), &[NUMBER], ONE, abs),
    builtin("pow", 2, Some(2), &[NUMBER, NUMBER], ONE, pow),
    // ── Control ───────────────────────────────────────────────────────────
    builtin("exit", 0, Some(1), &[INT], NONE, exit),
    builtin("error", 1, Some(1), &[STR], ONE, error),
    builtin("sleep", 1, Some(1), &[NUMBER], NONE, sleep),
    // ── Parsing & fetching ────────────────────────────────────────────────
    builtin("parse_json", 1, Some(1), &[STR], ONE_OR_TWO, parse_json),
    builtin("parse_int", 1, Some(1), &[STR], ONE_OR_TWO, parse_int),
    builtin("parse_float", 1, Some(1), &[STR], ONE_OR_TWO, parse_float),
    builtin("http_get", 1, Some(1), &[STR], ONE_OR_TWO, http_get),
    // ── Styling ───────────────────────────────────────────────────────────
    builtin("hyperlink", 2, Some(2), &[ANY, STR], ONE, hyperlink),
    builtin("rgb", 4, Some(4), &[ANY, INT, INT, INT], ONE, rgb),
];

/// Find a builtin by name.
pub fn lookup(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().chain(ATTR_BUILTINS).find(|b| b.name == name)
}

/// Names of every builtin, in table order.
pub fn names() -> impl Iterator<Item = &'static str> {
    BUILTINS.iter().chain(ATTR_BUILTINS).map(|b| b.name)
}

// ── Output ────────────────────────────────────────────────────────────────────

fn joined(interp: &Interpreter, call: &CallArgs) -> String {
    let color = interp.color();
    let parts: Vec<String> = call.args.iter().map(|v| v.render(color)).collect();
    parts.join(" ")
}

fn print(interp: &mut Interpreter, call: &CallArgs) -> NativeResult {
    let line = joined(interp, call);
    interp.emit(line);
    Ok(Vec::new())
}

fn print_err(interp: &mut Interpreter, call: &CallArgs) -> NativeResult {
    let line = joined(interp, call);
    interp.emit_err(line);
    Ok(Vec::new())
}

fn debug_print(interp: &mut Interpreter, call: &CallArgs) -> NativeResult {
    let line = joined(interp, call);
    debug!(target: "rad::script", "{line}");
    Ok(Vec::new())
}

// ── Types & conversion ────────────────────────────────────────────────────────

fn len(_: &mut Interpreter, call: &CallArgs) -> NativeResult {
    let n = match call.arg(0) {
        Value::Str(s) => s.char_count(),
        Value::List(l) => l.len(),
        Value::Map(m) => m.len(),
        other => return Err(RadError::expected("str | list | map", other.type_name())),
    };
    Ok(vec![Value::Int(n as i64)])
}

fn type_of(_: &mut Interpreter, call: &CallArgs) -> NativeResult {
    Ok(vec![Value::str(call.arg(0).type_name())])
}

fn to_str(_: &mut Interpreter, call: &CallArgs) -> NativeResult {
    Ok(vec![match call.arg(0) {
        s @ Value::Str(_) => s.clone(),
        other => Value::str(other.to_string()),
    }])
}

fn to_int(_: &mut Interpreter, call: &CallArgs) -> NativeResult {
    Ok(vec![match call.arg(0) {
        Value::Float(x) if x.is_finite() => Value::Int(x.trunc() as i64),
        Value::Float(x) => return Err(RadError::type_mismatch(format!("cannot convert {x} to int"))),
        other => Value::Int(other.require_int_allowing_bool()?),
    }])
}

fn to_float(_: &mut Interpreter, call: &CallArgs) -> NativeResult {
    Ok(vec![match call.arg(0) {
        Value::Bool(b) => Value::Float(if *b { 1.0 } else { 0.0 }),
        other => Value::Float(other.require_float_allowing_int()?),
    }])
}

// ── Strings ───────────────────────────────────────────────────────────────────

fn upper(_: &mut Interpreter, call: &CallArgs) -> NativeResult {
    Ok(vec![Value::Str(call.arg(0).require_str()?.map_text(str::to_uppercase))])
}

fn lower(_: &mut Interpreter, call: &CallArgs) -> NativeResult {
    Ok(vec![Value::Str(call.arg(0).require_str()?.map_text(str::to_lowercase))])
}

fn join(_: &mut Interpreter, call: &CallArgs) -> NativeResult {
    let sep = call.arg(1).require_str()?.plain();
    let parts: Vec<String> = call.arg(0).require_list()?.borrow().iter().map(|v| v.to_string()).collect();
    Ok(vec![Value::str(parts.join(&sep))])
}

fn split(_: &mut Interpreter, call: &CallArgs) -> NativeResult {
    let s = call.arg(0).require_str()?.plain();
    let sep = call.arg(1).require_str()?.plain();
    let parts: Vec<Value> = if sep.is_empty() {
        s.chars().map(|c| Value::str(c.to_string())).collect()
    } else {
        s.split(sep.as_str()).map(Value::str).collect()
    };
    Ok(vec![Value::list(parts)])
}

fn compile(pattern: &str) -> Result<Regex, RadError> {
    Regex::new(pattern).map_err(|e| RadError::Parse(format!("invalid regex: {e}")))
}

fn replace(_: &mut Interpreter, call: &CallArgs) -> NativeResult {
    let s = call.arg(0).require_str()?.plain();
    let re = compile(&call.arg(1).require_str()?.plain())?;
    let with = call.arg(2).require_str()?.plain();
    Ok(vec![Value::str(re.replace_all(&s, with.as_str()).into_owned())])
}

fn matches(_: &mut Interpreter, call: &CallArgs) -> NativeResult {
    let s = call.arg(0).require_str()?.plain();
    let re = compile(&call.arg(1).require_str()?.plain())?;
    Ok(vec![Value::Bool(re.is_match(&s))])
}

fn starts_with(_: &mut Interpreter, call: &CallArgs) -> NativeResult {
    let s = call.arg(0).require_str()?.plain();
    let prefix = call.arg(1).require_str()?.plain();
    Ok(vec![Value::Bool(s.starts_with(&prefix))])
}

fn ends_with(_: &mut Interpreter, call: &CallArgs) -> NativeResult {
    let s = call.arg(0).require_str()?.plain();
    let suffix = call.arg(1).require_str()?.plain();
    Ok(vec![Value::Bool(s.ends_with(&suffix))])
}

/// Shorten to at most `max` characters, the last of which becomes `…`.
fn truncate(_: &mut Interpreter, call: &CallArgs) -> NativeResult {
    let s = call.arg(0).require_str()?;
    let max = call.arg(1).require_int()?;
    if max < 1 {
        return Err(RadError::type_mismatch(format!("truncate() requires a length of at least 1, got {max}")));
    }
    let max = usize::try_from(max).unwrap_or(usize::MAX);
    if max >= s.char_count() {
        return Ok(vec![Value::Str(s.clone())]);
    }
    let mut out = s.slice(0, max - 1);
    out.push_str("…");
    Ok(vec![Value::Str(out)])
}

// ── Collections ───────────────────────────────────────────────────────────────

fn keys(_: &mut Interpreter, call: &CallArgs) -> NativeResult {
    Ok(vec![Value::list(call.arg(0).require_map()?.keys())])
}

fn values(_: &mut Interpreter, call: &CallArgs) -> NativeResult {
    Ok(vec![Value::list(call.arg(0).require_map()?.values())])
}

/// Elements in first-seen order, dropping any equal to an earlier one.
fn unique(_: &mut Interpreter, call: &CallArgs) -> NativeResult {
    let mut out: Vec<Value> = Vec::new();
    for item in call.arg(0).require_list()?.borrow().iter() {
        if !out.contains(item) {
            out.push(item.clone());
        }
    }
    Ok(vec![Value::list(out)])
}

/// `range(end)`, `range(start, end)`, `range(start, end, step)`.
fn range(_: &mut Interpreter, call: &CallArgs) -> NativeResult {
    let ints: Vec<i64> = call.args.iter().map(Value::require_int).collect::<Result<_, _>>()?;
    let (start, end, step) = match ints.as_slice() {
        [end] => (0, *end, 1),
        [start, end] => (*start, *end, 1),
        [start, end, step] => (*start, *end, *step),
        _ => return Err(RadError::bug("range() called outside its contract")),
    };
    if step == 0 {
        return Err(RadError::type_mismatch("range() step cannot be 0"));
    }
    let mut out = Vec::new();
    let mut i = start;
    while (step > 0 && i < end) || (step < 0 && i > end) {
        out.push(Value::Int(i));
        i = match i.checked_add(step) {
            Some(next) => next,
            None => break,
        };
    }
    Ok(vec![Value::list(out)])
}

fn sort(_: &mut Interpreter, call: &CallArgs) -> NativeResult {
    let reverse = match call.named("reverse") {
        Some(v) => v.require_bool()?,
        None => false,
    };
    let dir = if reverse { SortDir::Desc } else { SortDir::Asc };
    let items = call.arg(0).require_list()?.to_vec();
    Ok(vec![Value::list(sort_values(&items, dir)?)])
}

// ── Numbers ───────────────────────────────────────────────────────────────────

fn abs(_: &mut Interpreter, call: &CallArgs) -> NativeResult {
    Ok(vec![match call.arg(0) {
        Value::Int(n) => Value::Int(
            n.checked_abs().ok_or_else(|| RadError::type_mismatch(format!("abs() overflows for {n}")))?,
        ),
        other => Value::Float(other.require_float_allowing_int()?.abs()),
    }])
}

fn pow(_: &mut Interpreter, call: &CallArgs) -> NativeResult {
    let base = call.arg(0).require_float_allowing_int()?;
    let exponent = call.arg(1).require_float_allowing_int()?;
    Ok(vec![Value::Float(base.powf(exponent))])
}

// ── Control ───────────────────────────────────────────────────────────────────

fn exit(_: &mut Interpreter, call: &CallArgs) -> NativeResult {
    let code = match call.opt(0) {
        Some(v) => v.require_int()?,
        None => 0,
    };
    let code = i32::try_from(code).map_err(|_| RadError::type_mismatch(format!("exit code {code} out of range")))?;
    Err(RadError::Exit { code })
}

fn error(_: &mut Interpreter, call: &CallArgs) -> NativeResult {
    let msg = call.arg(0).require_str()?.plain();
    Ok(vec![Value::Error(Rc::new(ErrorValue::new(ErrorCode::User, msg)))])
}

fn sleep(_: &mut Interpreter, call: &CallArgs) -> NativeResult {
    let secs = call.arg(0).require_float_allowing_int()?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(RadError::type_mismatch(format!("sleep() needs a non-negative duration, got {secs}")));
    }
    std::thread::sleep(Duration::from_secs_f64(secs));
    Ok(Vec::new())
}

// ── Parsing & fetching ────────────────────────────────────────────────────────

/// With two outputs expected, a failure becomes `(null, error)` instead of
/// propagating.
fn fallible(call: &CallArgs, result: Result<Value, RadError>) -> NativeResult {
    match (result, call.wants(2)) {
        (Ok(v), true) => Ok(vec![v, Value::Null]),
        (Ok(v), false) => Ok(vec![v]),
        (Err(e), true) => Ok(vec![Value::Null, Value::Error(e.to_error_value())]),
        (Err(e), false) => Err(e),
    }
}

fn parse_json(_: &mut Interpreter, call: &CallArgs) -> NativeResult {
    let s = call.arg(0).require_str()?.plain();
    let result = serde_json::from_str::<serde_json::Value>(&s)
        .map(|json| Value::from_json(&json))
        .map_err(|e| RadError::Parse(format!("invalid JSON: {e}")));
    fallible(call, result)
}

fn parse_int(_: &mut Interpreter, call: &CallArgs) -> NativeResult {
    let s = call.arg(0).require_str()?.plain();
    let result = s
        .trim()
        .parse::<i64>()
        .map(Value::Int)
        .map_err(|_| RadError::Parse(format!("cannot parse '{s}' as int")));
    fallible(call, result)
}

fn parse_float(_: &mut Interpreter, call: &CallArgs) -> NativeResult {
    let s = call.arg(0).require_str()?.plain();
    let result = s
        .trim()
        .parse::<f64>()
        .map(Value::Float)
        .map_err(|_| RadError::Parse(format!("cannot parse '{s}' as float")));
    fallible(call, result)
}

fn http_get(interp: &mut Interpreter, call: &CallArgs) -> NativeResult {
    let url = call.arg(0).require_str()?.plain();
    let result = interp.fetcher.fetch(&url).map(|json| Value::from_json(&json));
    fallible(call, result)
}

// ── Styling ───────────────────────────────────────────────────────────────────

fn text_of(v: &Value) -> RichStr {
    match v {
        Value::Str(s) => s.clone(),
        other => RichStr::from(other.to_string()),
    }
}

fn hyperlink(_: &mut Interpreter, call: &CallArgs) -> NativeResult {
    let url = call.arg(1).require_str()?.plain();
    Ok(vec![Value::Str(text_of(call.arg(0)).with_hyperlink(&url))])
}

fn rgb(_: &mut Interpreter, call: &CallArgs) -> NativeResult {
    let mut channels = [0u8; 3];
    for (slot, v) in channels.iter_mut().zip(&call.args[1..]) {
        let n = v.require_int()?;
        *slot = u8::try_from(n)
            .map_err(|_| RadError::type_mismatch(format!("rgb() channels must be 0-255, got {n}")))?;
    }
    let [r, g, b] = channels;
    Ok(vec![Value::Str(text_of(call.arg(0)).with_rgb(Rgb::new(r, g, b)))])
}

fn style(call: &CallArgs, name: &str) -> NativeResult {
    let attr = Attr::from_name(name).ok_or_else(|| RadError::bug(format!("no attribute named '{name}'")))?;
    Ok(vec![Value::Str(text_of(call.arg(0)).with_attr(attr))])
}

macro_rules! attr_builtins {
    ($($name:literal => $func:ident),* $(,)?) => {
        $(
            fn $func(_: &mut Interpreter, call: &CallArgs) -> NativeResult {
                style(call, $name)
            }
        )*

        /// One styling function per attribute name.
        static ATTR_BUILTINS: &[Builtin] = &[
            $( builtin($name, 1, Some(1), &[], ONE, $func), )*
        ];
    };
}

attr_builtins! {
    "black" => attr_black,
    "blue" => attr_blue,
    "bold" => attr_bold,
    "cyan" => attr_cyan,
    "green" => attr_green,
    "italic" => attr_italic,
    "magenta" => attr_magenta,
    "orange" => attr_orange,
    "pink" => attr_pink,
    "plain" => attr_plain,
    "red" => attr_red,
    "underline" => attr_underline,
    "white" => attr_white,
    "yellow" => attr_yellow,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::ATTR_NAMES;
    use crate::script::func::{Expected, FnValue};

    fn call(name: &str, args: Vec<Value>) -> Result<Vec<Value>, RadError> {
        call_expecting(name, args, Expected::Exactly(1))
    }

    fn call_expecting(name: &str, args: Vec<Value>, expected: Expected) -> Result<Vec<Value>, RadError> {
        let mut interp = Interpreter::new();
        let f = FnValue::Builtin(lookup(name).unwrap());
        interp.call(&f, CallArgs::new(args).expecting(expected))
    }

    fn one(name: &str, args: Vec<Value>) -> Value {
        call(name, args).unwrap().remove(0)
    }

    #[test]
    fn every_attribute_has_a_function() {
        for name in ATTR_NAMES {
            assert!(lookup(name).is_some(), "missing builtin {name}");
        }
    }

    #[test]
    fn names_are_unique() {
        let mut all: Vec<&str> = names().collect();
        let n = all.len();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), n);
    }

    #[test]
    fn len_and_type_of() {
        assert_eq!(one("len", vec![Value::str("héllo")]), Value::Int(5));
        assert_eq!(one("type_of", vec![Value::Float(1.0)]), Value::str("float"));
        assert_eq!(call("len", vec![Value::Int(3)]).unwrap_err().code(), ErrorCode::TypeMismatch);
    }

    #[test]
    fn conversions() {
        assert_eq!(one("int", vec![Value::Float(-2.7)]), Value::Int(-2));
        assert_eq!(one("float", vec![Value::Int(2)]), Value::Float(2.0));
        assert_eq!(one("str", vec![Value::Int(7)]), Value::str("7"));
    }

    #[test]
    fn string_helpers() {
        assert_eq!(one("upper", vec![Value::str("abc")]), Value::str("ABC"));
        assert_eq!(
            one("split", vec![Value::str("a,b,c"), Value::str(",")]),
            Value::list(vec![Value::str("a"), Value::str("b"), Value::str("c")])
        );
        assert_eq!(
            one("join", vec![Value::list(vec![Value::Int(1), Value::str("x")]), Value::str("-")]),
            Value::str("1-x")
        );
        assert_eq!(
            one("replace", vec![Value::str("a1b22"), Value::str(r"\d+"), Value::str("#")]),
            Value::str("a#b#")
        );
        assert_eq!(one("matches", vec![Value::str("v1.2"), Value::str(r"^v\d")]), Value::Bool(true));
        let bad = call("matches", vec![Value::str("x"), Value::str("(")]).unwrap_err();
        assert_eq!(bad.code(), ErrorCode::Parse);
    }

    #[test]
    fn prefix_and_suffix() {
        assert_eq!(one("starts_with", vec![Value::str("v1.2"), Value::str("v1")]), Value::Bool(true));
        assert_eq!(one("starts_with", vec![Value::str("v1.2"), Value::str("1")]), Value::Bool(false));
        assert_eq!(one("ends_with", vec![Value::str("a.json"), Value::str(".json")]), Value::Bool(true));
        assert_eq!(one("ends_with", vec![Value::str("a.json"), Value::str("")]), Value::Bool(true));
    }

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(one("truncate", vec![Value::str("hello😀world"), Value::Int(7)]), Value::str("hello😀…"));
        assert_eq!(one("truncate", vec![Value::str("a😀b"), Value::Int(2)]), Value::str("a…"));
        assert_eq!(one("truncate", vec![Value::str("hello"), Value::Int(1)]), Value::str("…"));
        assert_eq!(one("truncate", vec![Value::str("hello"), Value::Int(5)]), Value::str("hello"));
        let err = call("truncate", vec![Value::str("hello"), Value::Int(0)]).unwrap_err();
        assert_eq!(err.to_string(), "truncate() requires a length of at least 1, got 0");
        assert!(call("truncate", vec![Value::str("hello"), Value::Int(-5)]).is_err());
    }

    #[test]
    fn unique_keeps_first_occurrences() {
        let items = vec![Value::Int(2), Value::str("a"), Value::Int(2), Value::Float(1.0), Value::Int(1), Value::str("a")];
        assert_eq!(
            one("unique", vec![Value::list(items)]),
            Value::list(vec![Value::Int(2), Value::str("a"), Value::Float(1.0)])
        );
    }

    #[test]
    fn abs_and_pow() {
        assert_eq!(one("abs", vec![Value::Int(-4)]), Value::Int(4));
        assert!(matches!(one("abs", vec![Value::Float(-2.5)]), Value::Float(x) if x == 2.5));
        assert!(call("abs", vec![Value::Int(i64::MIN)]).is_err());
        assert!(matches!(one("pow", vec![Value::Int(2), Value::Int(10)]), Value::Float(x) if x == 1024.0));
        assert!(matches!(one("pow", vec![Value::Float(2.0), Value::Int(-2)]), Value::Float(x) if x == 0.25));
        assert_eq!(call("pow", vec![Value::str("2"), Value::Int(1)]).unwrap_err().code(), ErrorCode::TypeMismatch);
    }

    #[test]
    fn range_forms() {
        let ints = |v: Value| -> Vec<i64> {
            v.require_list().unwrap().borrow().iter().map(|x| x.require_int().unwrap()).collect()
        };
        assert_eq!(ints(one("range", vec![Value::Int(3)])), [0, 1, 2]);
        assert_eq!(ints(one("range", vec![Value::Int(5), Value::Int(0), Value::Int(-2)])), [5, 3, 1]);
        assert!(call("range", vec![Value::Int(0), Value::Int(3), Value::Int(0)]).is_err());
    }

    #[test]
    fn parse_int_one_or_two_outputs() {
        assert_eq!(one("parse_int", vec![Value::str(" 42 ")]), Value::Int(42));
        let err = call("parse_int", vec![Value::str("x")]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Parse);

        let out = call_expecting("parse_int", vec![Value::str("x")], Expected::Exactly(2)).unwrap();
        assert_eq!(out[0], Value::Null);
        assert_eq!(out[1].require_error().unwrap().code, ErrorCode::Parse);

        let out = call_expecting("parse_int", vec![Value::str("7")], Expected::Exactly(2)).unwrap();
        assert_eq!(out, vec![Value::Int(7), Value::Null]);
    }

    #[test]
    fn parse_json_builds_values() {
        let v = one("parse_json", vec![Value::str(r#"{"a": [1, 2.5, "x"]}"#)]);
        assert_eq!(v.to_string(), r#"{ "a": [1, 2.5, "x"] }"#);
    }

    #[test]
    fn print_returns_nothing() {
        let err = call("print", vec![Value::str("x")]).unwrap_err();
        assert_eq!(err.to_string(), "print() returns no value, but 1 expected");
        assert!(call_expecting("print", vec![], Expected::Unconstrained).unwrap().is_empty());
    }

    #[test]
    fn exit_unwinds_with_code() {
        let err = call_expecting("exit", vec![Value::Int(3)], Expected::Unconstrained).unwrap_err();
        assert_eq!(err.exit_code(), Some(3));
    }

    #[test]
    fn sort_reverse_named_arg() {
        let mut interp = Interpreter::new();
        let f = FnValue::Builtin(lookup("sort").unwrap());
        let mut args = CallArgs::new(vec![Value::list(vec![Value::Int(1), Value::Int(3), Value::Int(2)])]);
        args.named.push(("reverse".into(), Value::Bool(true)));
        let out = interp.call(&f, args).unwrap();
        assert_eq!(out[0], Value::list(vec![Value::Int(3), Value::Int(2), Value::Int(1)]));
    }

    #[test]
    fn styling_keeps_plain_text() {
        let v = one("red", vec![Value::Int(5)]);
        assert_eq!(v, Value::str("5"));
        let Value::Str(s) = v else { panic!("expected str") };
        assert!(s.segments()[0].attr.fg_color().is_some());
        assert!(call("rgb", vec![Value::str("x"), Value::Int(300), Value::Int(0), Value::Int(0)]).is_err());
    }
}
