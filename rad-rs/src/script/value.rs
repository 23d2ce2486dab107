//! Runtime values.
//!
//! [`Value`] is a closed enum.  Lists and maps are shared handles: cloning a
//! `Value::List` aliases the same storage, so assignment never copies.

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::{ErrorCode, RadError};
use crate::richstr::RichStr;

use super::func::FnValue;

// ── Kinds & type sets ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Int,
    Float,
    Str,
    Bool,
    List,
    Map,
    Fn,
    Error,
    Null,
}

impl Kind {
    /// Name reported by `type_of`.
    pub fn name(self) -> &'static str {
        match self {
            Kind::Int => "int",
            Kind::Float => "float",
            Kind::Str => "str",
            Kind::Bool => "bool",
            Kind::List => "list",
            Kind::Map => "map",
            Kind::Fn => "fn",
            Kind::Error => "error",
            Kind::Null => "null",
        }
    }

    const ALL: [Kind; 9] = [
        Kind::Int,
        Kind::Float,
        Kind::Str,
        Kind::Bool,
        Kind::List,
        Kind::Map,
        Kind::Fn,
        Kind::Error,
        Kind::Null,
    ];

    fn bit(self) -> u16 {
        1 << self as u16
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A set of [`Kind`]s accepted by a function parameter.  The empty set
/// accepts anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TypeSet(u16);

impl TypeSet {
    pub const ANY: Self    = Self(0);
    pub const INT: Self    = Self(1 << Kind::Int as u16);
    pub const FLOAT: Self  = Self(1 << Kind::Float as u16);
    pub const STR: Self    = Self(1 << Kind::Str as u16);
    pub const BOOL: Self   = Self(1 << Kind::Bool as u16);
    pub const LIST: Self   = Self(1 << Kind::List as u16);
    pub const MAP: Self    = Self(1 << Kind::Map as u16);
    pub const FN: Self     = Self(1 << Kind::Fn as u16);
    pub const ERROR: Self  = Self(1 << Kind::Error as u16);
    pub const NULL: Self   = Self(1 << Kind::Null as u16);
    pub const NUMBER: Self = Self(Self::INT.0 | Self::FLOAT.0);

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn is_any(self) -> bool {
        self.0 == 0
    }

    pub fn accepts(self, kind: Kind) -> bool {
        self.is_any() || self.0 & kind.bit() != 0
    }
}

impl fmt::Display for TypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_any() {
            return f.write_str("any");
        }
        let names: Vec<&str> = Kind::ALL
            .iter()
            .filter(|k| self.0 & k.bit() != 0)
            .map(|k| k.name())
            .collect();
        f.write_str(&names.join(" | "))
    }
}

// ── Error values ──────────────────────────────────────────────────────────────

/// A first-class error, as produced by `error()` or a recovered failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorValue {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorValue {
    pub fn new(code: ErrorCode, message: String) -> Self {
        Self { code, message }
    }
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

// ── Map keys ──────────────────────────────────────────────────────────────────

/// Hashable projection of a value.  Integral floats share the `Int` key so
/// that key identity agrees with numeric equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MapKey {
    Int(i64),
    Float(u64),
    Str(String),
    Bool(bool),
    Error(ErrorCode, String),
}

// ── Shared collections ────────────────────────────────────────────────────────

/// Shared, mutable list storage.
#[derive(Clone, Default)]
pub struct List(Rc<RefCell<Vec<Value>>>);

impl List {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(items: Vec<Value>) -> Self {
        Self(Rc::new(RefCell::new(items)))
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn borrow(&self) -> Ref<'_, Vec<Value>> {
        self.0.borrow()
    }

    /// Snapshot of the current elements.
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.borrow().clone()
    }

    pub fn get(&self, idx: usize) -> Option<Value> {
        self.0.borrow().get(idx).cloned()
    }

    /// Replace the element at `idx` (negative wraps from the end).
    pub fn set(&self, idx: i64, v: Value) -> Result<(), RadError> {
        let len = self.len();
        let i = resolve_index(idx, len)?;
        self.0.borrow_mut()[i] = v;
        Ok(())
    }

    pub fn replace_all(&self, items: Vec<Value>) {
        *self.0.borrow_mut() = items;
    }

    pub fn ptr_eq(&self, other: &List) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }
}

impl fmt::Debug for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "List({})", Value::List(self.clone()))
    }
}

/// Shared, mutable, insertion-ordered map storage.  Entries keep the
/// original key value alongside the hashed [`MapKey`].
#[derive(Clone, Default)]
pub struct Map(Rc<RefCell<IndexMap<MapKey, (Value, Value)>>>);

impl Map {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn get(&self, key: &Value) -> Result<Option<Value>, RadError> {
        let k = key.map_key()?;
        Ok(self.0.borrow().get(&k).map(|(_, v)| v.clone()))
    }

    pub fn contains_key(&self, key: &Value) -> Result<bool, RadError> {
        let k = key.map_key()?;
        Ok(self.0.borrow().contains_key(&k))
    }

    pub fn insert(&self, key: Value, value: Value) -> Result<(), RadError> {
        let k = key.map_key()?;
        self.0.borrow_mut().insert(k, (key, value));
        Ok(())
    }

    pub fn keys(&self) -> Vec<Value> {
        self.0.borrow().values().map(|(k, _)| k.clone()).collect()
    }

    pub fn values(&self) -> Vec<Value> {
        self.0.borrow().values().map(|(_, v)| v.clone()).collect()
    }

    pub fn entries(&self) -> Vec<(Value, Value)> {
        self.0.borrow().values().cloned().collect()
    }

    pub fn ptr_eq(&self, other: &Map) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }
}

impl fmt::Debug for Map {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Map({})", Value::Map(self.clone()))
    }
}

// A list can hold itself, so walks over nested values track the containers
// they are inside of.
thread_local! {
    static WALKING: RefCell<Vec<(usize, usize)>> = const { RefCell::new(Vec::new()) };
}

/// Marks a container, or a pair of containers being compared, as part of
/// the current walk until dropped.
struct Visit((usize, usize));

impl Visit {
    /// `None` when `key` is already being walked further up.
    fn enter(key: (usize, usize)) -> Option<Visit> {
        WALKING.with(|w| {
            let mut w = w.borrow_mut();
            if w.contains(&key) {
                return None;
            }
            w.push(key);
            Some(Visit(key))
        })
    }
}

impl Drop for Visit {
    fn drop(&mut self) {
        WALKING.with(|w| {
            let mut w = w.borrow_mut();
            if let Some(i) = w.iter().rposition(|k| *k == self.0) {
                w.remove(i);
            }
        });
    }
}

/// Wrap a possibly negative index into `0..len`.
pub fn resolve_index(idx: i64, len: usize) -> Result<usize, RadError> {
    let wrapped = if idx < 0 { idx + len as i64 } else { idx };
    if wrapped < 0 || wrapped >= len as i64 {
        return Err(RadError::IndexOutOfBounds { index: idx, len });
    }
    Ok(wrapped as usize)
}

/// Clamp slice bounds into `0..=len`, wrapping negatives.
fn clamp_bound(idx: Option<i64>, default: usize, len: usize) -> usize {
    match idx {
        None => default,
        Some(i) if i < 0 => (i + len as i64).max(0) as usize,
        Some(i) => (i as usize).min(len),
    }
}

// ── Value ─────────────────────────────────────────────────────────────────────

/// A script runtime value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(RichStr),
    Bool(bool),
    List(List),
    Map(Map),
    Fn(FnValue),
    Error(Rc<ErrorValue>),
    #[default]
    Null,
}

impl Value {
    pub fn str(s: impl Into<RichStr>) -> Value {
        Value::Str(s.into())
    }

    pub fn list(items: Vec<Value>) -> Value {
        Value::List(List::from_vec(items))
    }

    pub fn kind(&self) -> Kind {
        match self {
            Value::Int(_) => Kind::Int,
            Value::Float(_) => Kind::Float,
            Value::Str(_) => Kind::Str,
            Value::Bool(_) => Kind::Bool,
            Value::List(_) => Kind::List,
            Value::Map(_) => Kind::Map,
            Value::Fn(_) => Kind::Fn,
            Value::Error(_) => Kind::Error,
            Value::Null => Kind::Null,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.kind().name()
    }

    /// `0`, `0.0`, `""`, `false`, empty collections and `null` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Int(n) => *n != 0,
            Value::Float(x) => *x != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Bool(b) => *b,
            Value::List(l) => !l.is_empty(),
            Value::Map(m) => !m.is_empty(),
            Value::Fn(_) | Value::Error(_) => true,
            Value::Null => false,
        }
    }

    pub fn map_key(&self) -> Result<MapKey, RadError> {
        Ok(match self {
            Value::Int(n) => MapKey::Int(*n),
            Value::Float(x) if x.fract() == 0.0 && x.abs() < i64::MAX as f64 => MapKey::Int(*x as i64),
            Value::Float(x) => MapKey::Float(x.to_bits()),
            Value::Str(s) => MapKey::Str(s.plain()),
            Value::Bool(b) => MapKey::Bool(*b),
            Value::Error(e) => MapKey::Error(e.code, e.message.clone()),
            other => {
                return Err(RadError::type_mismatch(format!(
                    "{} cannot be used as a map key",
                    other.type_name()
                )))
            }
        })
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn require_int(&self) -> Result<i64, RadError> {
        match self {
            Value::Int(n) => Ok(*n),
            other => Err(RadError::expected(Kind::Int, other.type_name())),
        }
    }

    pub fn require_int_allowing_bool(&self) -> Result<i64, RadError> {
        match self {
            Value::Int(n) => Ok(*n),
            Value::Bool(b) => Ok(*b as i64),
            other => Err(RadError::expected(TypeSet::INT.union(TypeSet::BOOL), other.type_name())),
        }
    }

    pub fn require_float_allowing_int(&self) -> Result<f64, RadError> {
        match self {
            Value::Int(n) => Ok(*n as f64),
            Value::Float(x) => Ok(*x),
            other => Err(RadError::expected(TypeSet::NUMBER, other.type_name())),
        }
    }

    pub fn require_str(&self) -> Result<&RichStr, RadError> {
        match self {
            Value::Str(s) => Ok(s),
            other => Err(RadError::expected(Kind::Str, other.type_name())),
        }
    }

    pub fn require_bool(&self) -> Result<bool, RadError> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(RadError::expected(Kind::Bool, other.type_name())),
        }
    }

    pub fn require_list(&self) -> Result<&List, RadError> {
        match self {
            Value::List(l) => Ok(l),
            other => Err(RadError::expected(Kind::List, other.type_name())),
        }
    }

    pub fn require_map(&self) -> Result<&Map, RadError> {
        match self {
            Value::Map(m) => Ok(m),
            other => Err(RadError::expected(Kind::Map, other.type_name())),
        }
    }

    pub fn require_fn(&self) -> Result<&FnValue, RadError> {
        match self {
            Value::Fn(f) => Ok(f),
            other => Err(RadError::expected(Kind::Fn, other.type_name())),
        }
    }

    pub fn require_error(&self) -> Result<&Rc<ErrorValue>, RadError> {
        match self {
            Value::Error(e) => Ok(e),
            other => Err(RadError::expected(Kind::Error, other.type_name())),
        }
    }

    // ── Indexing ──────────────────────────────────────────────────────────

    pub fn index(&self, idx: &Value) -> Result<Value, RadError> {
        match self {
            Value::List(l) => {
                let i = resolve_index(idx.require_int()?, l.len())?;
                l.get(i).ok_or_else(|| RadError::bug("list shrank during indexing"))
            }
            Value::Str(s) => {
                let i = resolve_index(idx.require_int()?, s.char_count())?;
                s.char_at(i)
                    .map(Value::Str)
                    .ok_or_else(|| RadError::bug("char index resolved past end"))
            }
            Value::Map(m) => m.get(idx)?.ok_or_else(|| RadError::KeyNotFound { key: idx.to_string() }),
            other => Err(RadError::type_mismatch(format!("cannot index a {}", other.type_name()))),
        }
    }

    /// `[start:end]` on lists and strings.  Out-of-range bounds clamp.
    pub fn slice(&self, start: Option<i64>, end: Option<i64>) -> Result<Value, RadError> {
        match self {
            Value::List(l) => {
                let items = l.borrow();
                let len = items.len();
                let (lo, hi) = (clamp_bound(start, 0, len), clamp_bound(end, len, len));
                let out = if lo < hi { items[lo..hi].to_vec() } else { Vec::new() };
                Ok(Value::list(out))
            }
            Value::Str(s) => {
                let len = s.char_count();
                let (lo, hi) = (clamp_bound(start, 0, len), clamp_bound(end, len, len));
                Ok(Value::Str(if lo < hi { s.slice(lo, hi) } else { RichStr::new() }))
            }
            other => Err(RadError::type_mismatch(format!("cannot slice a {}", other.type_name()))),
        }
    }

    /// `target[idx] = v` on lists and maps.
    pub fn set_index(&self, idx: &Value, v: Value) -> Result<(), RadError> {
        match self {
            Value::List(l) => l.set(idx.require_int()?, v),
            Value::Map(m) => m.insert(idx.clone(), v),
            other => Err(RadError::type_mismatch(format!(
                "cannot assign into a {}",
                other.type_name()
            ))),
        }
    }

    // ── JSON ──────────────────────────────────────────────────────────────

    pub fn from_json(json: &serde_json::Value) -> Value {
        use serde_json::Value as J;
        match json {
            J::Null => Value::Null,
            J::Bool(b) => Value::Bool(*b),
            J::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            J::String(s) => Value::str(s.as_str()),
            J::Array(items) => Value::list(items.iter().map(Value::from_json).collect()),
            J::Object(obj) => {
                let map = Map::new();
                for (k, v) in obj {
                    map.0.borrow_mut().insert(MapKey::Str(k.clone()), (Value::str(k.as_str()), Value::from_json(v)));
                }
                Value::Map(map)
            }
        }
    }

    pub fn to_json(&self) -> Result<serde_json::Value, RadError> {
        use serde_json::Value as J;
        Ok(match self {
            Value::Null => J::Null,
            Value::Bool(b) => J::Bool(*b),
            Value::Int(n) => J::from(*n),
            Value::Float(x) => serde_json::Number::from_f64(*x).map_or(J::Null, J::Number),
            Value::Str(s) => J::String(s.plain()),
            Value::Error(e) => J::String(e.message.clone()),
            Value::List(l) => {
                let Some(_visit) = Visit::enter((l.addr(), 0)) else {
                    return Err(RadError::type_mismatch("cannot convert a list that contains itself to JSON"));
                };
                J::Array(l.borrow().iter().map(Value::to_json).collect::<Result<_, _>>()?)
            }
            Value::Map(m) => {
                let Some(_visit) = Visit::enter((m.addr(), 0)) else {
                    return Err(RadError::type_mismatch("cannot convert a map that contains itself to JSON"));
                };
                let mut obj = serde_json::Map::new();
                for (k, v) in m.entries() {
                    let key = match k {
                        Value::Str(s) => s.plain(),
                        other => other.to_string(),
                    };
                    obj.insert(key, v.to_json()?);
                }
                J::Object(obj)
            }
            Value::Fn(_) => return Err(RadError::type_mismatch("cannot convert fn to JSON")),
        })
    }

    /// Display form with string attributes rendered.
    pub fn render(&self, color: bool) -> String {
        match self {
            Value::Str(s) => s.render(color),
            other => other.to_string(),
        }
    }

    /// Nested form: like `Display` but strings are quoted.
    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{:?}", s.plain()),
            other => write!(f, "{other}"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                if a.ptr_eq(b) {
                    return true;
                }
                // a pair already being compared is assumed equal
                let Some(_visit) = Visit::enter((a.addr(), b.addr())) else {
                    return true;
                };
                *a.borrow() == *b.borrow()
            }
            (Value::Map(a), Value::Map(b)) => {
                if a.ptr_eq(b) {
                    return true;
                }
                let Some(_visit) = Visit::enter((a.addr(), b.addr())) else {
                    return true;
                };
                let (a, b) = (a.0.borrow(), b.0.borrow());
                a.len() == b.len()
                    && a.iter().all(|(k, (_, v))| b.get(k).is_some_and(|(_, w)| v == w))
            }
            (Value::Fn(a), Value::Fn(b)) => a.ptr_eq(b),
            (Value::Error(a), Value::Error(b)) => a == b,
            (Value::Null, Value::Null) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::List(l) => {
                let Some(_visit) = Visit::enter((l.addr(), 0)) else {
                    return f.write_str("[...]");
                };
                f.write_str("[")?;
                for (i, v) in l.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    v.fmt_nested(f)?;
                }
                f.write_str("]")
            }
            Value::Map(m) => {
                let Some(_visit) = Visit::enter((m.addr(), 0)) else {
                    return f.write_str("{...}");
                };
                f.write_str("{ ")?;
                for (i, (k, v)) in m.entries().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    k.fmt_nested(f)?;
                    f.write_str(": ")?;
                    v.fmt_nested(f)?;
                }
                f.write_str(if m.is_empty() { "}" } else { " }" })
            }
            Value::Fn(func) => write!(f, "<fn {}>", func.name()),
            Value::Error(e) => write!(f, "{e}"),
            Value::Null => f.write_str("null"),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::str(s)
    }
}

impl From<RichStr> for Value {
    fn from(s: RichStr) -> Self {
        Value::Str(s)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
