//! Lexical environments.
//!
//! An [`Env`] is a scope: a variable table, a JSON field-path table and an
//! optional parent.  Scopes are shared through `Rc` so closures can keep
//! their defining scope alive; the tables use interior mutability.
//!
//! A function defined in a scope is stored in that scope and captures it,
//! which forms a reference cycle.  Whoever finishes with a scope hands it to
//! [`Env::release`], which empties the tables when nothing but those
//! self-captures can still reach it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::ast::PathSegment;
use super::value::{List, Value};

#[derive(Default)]
pub struct Env {
    vars: RefCell<HashMap<String, Value>>,
    fields: RefCell<HashMap<String, Vec<PathSegment>>>,
    parent: Option<Rc<Env>>,
}

impl std::fmt::Debug for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<String> = self.vars.borrow().keys().cloned().collect();
        names.sort();
        f.debug_struct("Env")
            .field("vars", &names)
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

impl Env {
    pub fn root() -> Rc<Env> {
        Rc::new(Env::default())
    }

    pub fn child(parent: &Rc<Env>) -> Rc<Env> {
        Rc::new(Env { parent: Some(parent.clone()), ..Env::default() })
    }

    pub fn parent(&self) -> Option<&Rc<Env>> {
        self.parent.as_ref()
    }

    /// Look `name` up here, then outward.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(v) = self.vars.borrow().get(name) {
            return Some(v.clone());
        }
        self.parent.as_ref()?.lookup(name)
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.vars.borrow().contains_key(name)
            || self.parent.as_ref().is_some_and(|p| p.is_defined(name))
    }

    /// Bind `name` in this scope, shadowing any outer binding.
    pub fn define(&self, name: &str, v: Value) {
        self.vars.borrow_mut().insert(name.to_owned(), v);
    }

    /// Write `name`.  With `propagate`, the nearest scope already binding it
    /// is updated; otherwise (or if nothing binds it) this scope is.
    pub fn assign(&self, name: &str, v: Value, propagate: bool) {
        self.owner(name, propagate).define(name, v);
    }

    /// Remove `name`, resolving the scope the same way as [`Env::assign`].
    /// Returns whether a binding was removed.
    pub fn unset(&self, name: &str, propagate: bool) -> bool {
        self.owner(name, propagate).vars.borrow_mut().remove(name).is_some()
    }

    fn owner(&self, name: &str, propagate: bool) -> &Env {
        if propagate && !self.vars.borrow().contains_key(name) {
            let mut scope = self.parent.as_deref();
            while let Some(env) = scope {
                if env.vars.borrow().contains_key(name) {
                    return env;
                }
                scope = env.parent.as_deref();
            }
        }
        self
    }

    /// Declare a JSON field.  The variable starts out as an empty list.
    pub fn define_field(&self, name: &str, path: Vec<PathSegment>) {
        self.fields.borrow_mut().insert(name.to_owned(), path);
        self.assign(name, Value::List(List::new()), true);
    }

    pub fn lookup_field(&self, name: &str) -> Option<Vec<PathSegment>> {
        if let Some(p) = self.fields.borrow().get(name) {
            return Some(p.clone());
        }
        self.parent.as_ref()?.lookup_field(name)
    }

    /// Every name visible from this scope, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut out: Vec<String> = self.vars.borrow().keys().cloned().collect();
        if let Some(p) = &self.parent {
            out.extend(p.names());
        }
        out.sort();
        out.dedup();
        out
    }

    /// Drop every binding and field declared in this scope.
    pub fn clear(&self) {
        let vars = std::mem::take(&mut *self.vars.borrow_mut());
        self.fields.borrow_mut().clear();
        drop(vars);
    }

    /// Give up the caller's handle on `scope`.  The scope is cleared when the
    /// only other handles are functions bound in it that captured it and are
    /// referenced from nowhere else.
    pub fn release(scope: Rc<Env>) {
        let self_captures = scope
            .vars
            .borrow()
            .values()
            .filter(|v| match v {
                Value::Fn(f) => f.captures_only(&scope),
                _ => false,
            })
            .count();
        if Rc::strong_count(&scope) == 1 + self_captures {
            scope.clear();
        }
    }

    /// Up to three visible names close to `name`, nearest first.
    pub fn similar_names(&self, name: &str) -> Vec<String> {
        let budget = (name.chars().count() / 3).max(2);
        let mut scored: Vec<(usize, String)> = self
            .names()
            .into_iter()
            .filter(|n| n != name)
            .map(|n| (edit_distance(name, &n), n))
            .filter(|(d, _)| *d <= budget)
            .collect();
        scored.sort();
        scored.into_iter().take(3).map(|(_, n)| n).collect()
    }
}

/// Levenshtein distance over characters.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        cur[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let subst = prev[j] + usize::from(ca != cb);
            cur[j + 1] = subst.min(prev[j + 1] + 1).min(cur[j] + 1);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}
