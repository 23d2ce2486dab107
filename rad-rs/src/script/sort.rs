//! Multi-key column sorting.
//!
//! Columns are sorted together: a stable sort of the row indices decides a
//! permutation, which is then applied to every column so rows stay intact.

use std::cmp::Ordering;

use crate::error::RadError;

use super::ast::SortDir;
use super::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortRule {
    pub column: usize,
    pub dir: SortDir,
}

impl SortRule {
    pub fn new(column: usize, dir: SortDir) -> Self {
        Self { column, dir }
    }
}

/// Position of a value's type in the cross-type ordering.
fn rank(v: &Value) -> Result<u8, RadError> {
    Ok(match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Int(_) | Value::Float(_) => 2,
        Value::Str(_) => 3,
        Value::List(_) => 4,
        Value::Map(_) => 5,
        Value::Fn(_) | Value::Error(_) => {
            return Err(RadError::type_mismatch(format!("cannot sort {} values", v.type_name())))
        }
    })
}

/// Total order used for sorting.  Callers must have ranked both values
/// successfully first.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    let (Ok(ra), Ok(rb)) = (rank(a), rank(b)) else {
        return Ordering::Equal;
    };
    if ra != rb {
        return ra.cmp(&rb);
    }
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::Str(x), Value::Str(y)) => x.cmp(y),
        (Value::Float(x), Value::Float(y)) => cmp_floats(*x, *y),
        (Value::Int(i), Value::Float(f)) => cmp_int_float(*i, *f),
        (Value::Float(f), Value::Int(i)) => cmp_int_float(*i, *f).reverse(),
        // null vs null, and every list (map) equals every other list (map)
        _ => Ordering::Equal,
    }
}

/// NaN sorts after every other number; `-0.0` equals `0.0`.
fn cmp_floats(x: f64, y: f64) -> Ordering {
    match (x.is_nan(), y.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
    }
}

/// Exact comparison of an int with a float (no rounding of large ints).
fn cmp_int_float(i: i64, f: f64) -> Ordering {
    const TWO_63: f64 = 9_223_372_036_854_775_808.0;
    if f.is_nan() {
        return Ordering::Less;
    }
    if f < -TWO_63 {
        return Ordering::Greater;
    }
    if f >= TWO_63 {
        return Ordering::Less;
    }
    let whole = f.trunc();
    match i.cmp(&(whole as i64)) {
        Ordering::Equal => 0.0_f64.partial_cmp(&(f - whole)).unwrap_or(Ordering::Equal),
        ord => ord,
    }
}

fn directed(ord: Ordering, dir: SortDir) -> Ordering {
    match dir {
        SortDir::Asc => ord,
        SortDir::Desc => ord.reverse(),
    }
}

/// The row permutation that sorts `columns` by `rules`.
pub fn sort_permutation(columns: &[Vec<Value>], rules: &[SortRule]) -> Result<Vec<usize>, RadError> {
    let rows = columns.first().map_or(0, Vec::len);
    if let Some(bad) = columns.iter().find(|c| c.len() != rows) {
        return Err(RadError::arity(format!(
            "cannot sort columns of different lengths ({rows} vs {})",
            bad.len()
        )));
    }
    for rule in rules {
        let col = columns.get(rule.column).ok_or_else(|| {
            RadError::bug(format!("sort rule names column {} of {}", rule.column, columns.len()))
        })?;
        for v in col {
            rank(v)?;
        }
    }

    let mut perm: Vec<usize> = (0..rows).collect();
    perm.sort_by(|&i, &j| {
        rules
            .iter()
            .map(|r| directed(compare_values(&columns[r.column][i], &columns[r.column][j]), r.dir))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    });
    Ok(perm)
}

/// Sort every column in place by `rules`.
pub fn sort_columns(columns: &mut [Vec<Value>], rules: &[SortRule]) -> Result<(), RadError> {
    let perm = sort_permutation(columns, rules)?;
    for col in columns.iter_mut() {
        let reordered: Vec<Value> = perm.iter().map(|&i| col[i].clone()).collect();
        *col = reordered;
    }
    Ok(())
}

/// Rules for a bare `sort` / `sort desc`: every column, in order.
pub fn general_rules(columns: usize, dir: SortDir) -> Vec<SortRule> {
    (0..columns).map(|c| SortRule::new(c, dir)).collect()
}

/// Sorted copy of a single list of values.
pub fn sort_values(values: &[Value], dir: SortDir) -> Result<Vec<Value>, RadError> {
    let mut columns = [values.to_vec()];
    sort_columns(&mut columns, &[SortRule::new(0, dir)])?;
    let [sorted] = columns;
    Ok(sorted)
}
