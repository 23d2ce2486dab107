//! Syntax tree consumed by the interpreter.
//!
//! Parsing lives outside this crate; a front end hands over a [`Script`]
//! directly or as JSON (every node derives `serde`).  Spans are byte
//! offsets into [`Script::source`] and are optional throughout.

use serde::{Deserialize, Serialize};

/// Byte range `[start, end)` in the script source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Script {
    /// Source text, used only to render diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub stmts: Vec<Stmt>,
}

// ── Expressions ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExprKind {
    Literal(Literal),
    Ident(String),
    List(Vec<Expr>),
    Map(Vec<(Expr, Expr)>),
    Binary { op: BinOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Ternary { cond: Box<Expr>, then: Box<Expr>, otherwise: Box<Expr> },
    Index { target: Box<Expr>, index: Box<Expr> },
    Slice {
        target: Box<Expr>,
        start: Option<Box<Expr>>,
        end: Option<Box<Expr>>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        #[serde(default)]
        named: Vec<(String, Expr)>,
    },
    Lambda { params: Vec<String>, body: LambdaBody },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    Ne,
    In,
    NotIn,
    And,
    Or,
}

impl BinOp {
    /// Source spelling, used in diagnostics.
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::In => "in",
            BinOp::NotIn => "not in",
            BinOp::And => "and",
            BinOp::Or => "or",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Plus,
    Neg,
    /// Prefix `++`: the operand plus one.
    Incr,
    /// Prefix `--`: the operand minus one.
    Decr,
    Not,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Neg => "-",
            UnaryOp::Incr => "++",
            UnaryOp::Decr => "--",
            UnaryOp::Not => "not",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LambdaBody {
    /// `fn(x) x + 1, x - 1`: every expression's value is returned.
    Exprs(Vec<Expr>),
    /// `fn(x) print(x)`: run for effect, returns nothing.
    Stmt(Box<Stmt>),
}

// ── Statements ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stmt {
    pub kind: StmtKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StmtKind {
    Expr(Expr),
    /// `a = x`, `a, b = x, y` or `a, b = f()`.
    Assign { targets: Vec<Target>, values: Vec<Expr> },
    /// `a += x` and friends.
    CompoundAssign { target: Target, op: BinOp, value: Expr },
    /// Statement-level `a++` / `a--`.
    Step { target: Target, delta: i64 },
    /// Remove a binding.
    Unset(String),
    If {
        branches: Vec<(Expr, Vec<Stmt>)>,
        #[serde(default)]
        otherwise: Option<Vec<Stmt>>,
    },
    /// `while cond:`; no condition loops until `break`.
    While { cond: Option<Expr>, body: Vec<Stmt> },
    /// `for x in xs:` or `for i, x in xs:`.
    For { vars: Vec<String>, iter: Expr, body: Vec<Stmt> },
    Break,
    Continue,
    Return(Vec<Expr>),
    FnDef(FnDecl),
    Defer { body: Vec<Stmt>, errdefer: bool },
    Shell(ShellStmt),
    /// `name = json.path...`
    FieldDecl { name: String, path: Vec<PathSegment> },
    Rad(RadBlock),
}

/// Left-hand side of an assignment: a variable, optionally indexed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    #[serde(default)]
    pub path: Vec<Expr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FnDecl {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    /// Trailing `return` used when the body finishes without one.
    #[serde(default)]
    pub ret: Option<Vec<Expr>>,
}

// ── Shell ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellStmt {
    pub targets: ShellTargets,
    pub cmd: Expr,
    #[serde(default)]
    pub quiet: bool,
    /// Runs on non-zero exit; execution then continues.
    #[serde(default)]
    pub catch: Option<Vec<Stmt>>,
    /// Runs on non-zero exit; the failure then propagates.
    #[serde(default)]
    pub fail: Option<Vec<Stmt>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShellTargets {
    /// `code, stdout, stderr` in that order, trailing ones omitted.
    Positional(Vec<String>),
    /// The reserved names, bound to variables of the same name.
    Named(Vec<ShellSlot>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShellSlot {
    Code,
    Stdout,
    Stderr,
}

impl ShellSlot {
    pub fn name(self) -> &'static str {
        match self {
            ShellSlot::Code => "code",
            ShellSlot::Stdout => "stdout",
            ShellSlot::Stderr => "stderr",
        }
    }
}

// ── JSON field paths ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathSegment {
    Key(String),
    /// `*`: every key of a map.
    Wildcard,
    /// `[]`: every element of a list.
    AllElements,
    /// `[N]`, negative counts from the end.
    Index(i64),
}

/// Dotted form of a field path rooted at `json`.
pub fn path_to_string(path: &[PathSegment]) -> String {
    let mut out = String::from("json");
    for seg in path {
        match seg {
            PathSegment::Key(k) => {
                out.push('.');
                out.push_str(k);
            }
            PathSegment::Wildcard => out.push_str(".*"),
            PathSegment::AllElements => out.push_str("[]"),
            PathSegment::Index(i) => out.push_str(&format!("[{i}]")),
        }
    }
    out
}

// ── Rad blocks ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortSpec {
    /// `sort` / `sort desc`: every column, in field order.
    General(SortDir),
    Columns(Vec<(String, SortDir)>),
}

/// What a rad block does once its columns are bound and sorted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RadKind {
    /// Print the columns as a table.
    #[default]
    Rad,
    /// Leave the columns in their variables without printing.
    Request,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RadBlock {
    #[serde(default)]
    pub kind: RadKind,
    /// URL to fetch; `None` for a display block over existing columns.
    #[serde(default)]
    pub source: Option<Expr>,
    pub fields: Vec<String>,
    #[serde(default)]
    pub sort: Option<SortSpec>,
    #[serde(default)]
    pub mods: Vec<FieldMod>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldMod {
    /// Replace every cell with `lambda(cell)`.
    Map { fields: Vec<String>, lambda: Expr },
    /// Apply an attribute to string cells matching `regex`.
    Color { fields: Vec<String>, color: Expr, regex: Expr },
}

/// Terse constructors for building trees by hand.
pub mod build {
    use super::*;

    pub fn expr(kind: ExprKind) -> Expr {
        Expr { kind, span: None }
    }

    pub fn stmt(kind: StmtKind) -> Stmt {
        Stmt { kind, span: None }
    }

    pub fn int(n: i64) -> Expr {
        expr(ExprKind::Literal(Literal::Int(n)))
    }

    pub fn float(x: f64) -> Expr {
        expr(ExprKind::Literal(Literal::Float(x)))
    }

    pub fn string(s: &str) -> Expr {
        expr(ExprKind::Literal(Literal::Str(s.to_owned())))
    }

    pub fn boolean(b: bool) -> Expr {
        expr(ExprKind::Literal(Literal::Bool(b)))
    }

    pub fn null() -> Expr {
        expr(ExprKind::Literal(Literal::Null))
    }

    pub fn ident(name: &str) -> Expr {
        expr(ExprKind::Ident(name.to_owned()))
    }

    pub fn list(items: Vec<Expr>) -> Expr {
        expr(ExprKind::List(items))
    }

    pub fn map(entries: Vec<(Expr, Expr)>) -> Expr {
        expr(ExprKind::Map(entries))
    }

    pub fn bin(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
        expr(ExprKind::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) })
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Expr {
        expr(ExprKind::Unary { op, operand: Box::new(operand) })
    }

    pub fn index(target: Expr, idx: Expr) -> Expr {
        expr(ExprKind::Index { target: Box::new(target), index: Box::new(idx) })
    }

    pub fn call(name: &str, args: Vec<Expr>) -> Expr {
        expr(ExprKind::Call { callee: Box::new(ident(name)), args, named: Vec::new() })
    }

    pub fn call_named(name: &str, args: Vec<Expr>, named: Vec<(&str, Expr)>) -> Expr {
        let named = named.into_iter().map(|(k, v)| (k.to_owned(), v)).collect();
        expr(ExprKind::Call { callee: Box::new(ident(name)), args, named })
    }

    pub fn lambda(params: &[&str], body: Vec<Expr>) -> Expr {
        expr(ExprKind::Lambda {
            params: params.iter().map(|p| p.to_string()).collect(),
            body: LambdaBody::Exprs(body),
        })
    }

    pub fn lambda_stmt(params: &[&str], body: Stmt) -> Expr {
        expr(ExprKind::Lambda {
            params: params.iter().map(|p| p.to_string()).collect(),
            body: LambdaBody::Stmt(Box::new(body)),
        })
    }

    pub fn expr_stmt(e: Expr) -> Stmt {
        stmt(StmtKind::Expr(e))
    }

    pub fn target(name: &str) -> Target {
        Target { name: name.to_owned(), path: Vec::new() }
    }

    pub fn assign(name: &str, value: Expr) -> Stmt {
        stmt(StmtKind::Assign { targets: vec![target(name)], values: vec![value] })
    }

    pub fn assign_many(names: &[&str], values: Vec<Expr>) -> Stmt {
        stmt(StmtKind::Assign {
            targets: names.iter().map(|n| target(n)).collect(),
            values,
        })
    }

    pub fn print(args: Vec<Expr>) -> Stmt {
        expr_stmt(call("print", args))
    }

    pub fn fn_def(name: &str, params: &[&str], body: Vec<Stmt>, ret: Option<Vec<Expr>>) -> Stmt {
        stmt(StmtKind::FnDef(FnDecl {
            name: name.to_owned(),
            params: params.iter().map(|p| p.to_string()).collect(),
            body,
            ret,
        }))
    }

    pub fn ret(values: Vec<Expr>) -> Stmt {
        stmt(StmtKind::Return(values))
    }

    pub fn defer(body: Vec<Stmt>) -> Stmt {
        stmt(StmtKind::Defer { body, errdefer: false })
    }

    pub fn errdefer(body: Vec<Stmt>) -> Stmt {
        stmt(StmtKind::Defer { body, errdefer: true })
    }

    pub fn for_in(vars: &[&str], iter: Expr, body: Vec<Stmt>) -> Stmt {
        stmt(StmtKind::For {
            vars: vars.iter().map(|v| v.to_string()).collect(),
            iter,
            body,
        })
    }

    pub fn if_else(cond: Expr, then: Vec<Stmt>, otherwise: Option<Vec<Stmt>>) -> Stmt {
        stmt(StmtKind::If { branches: vec![(cond, then)], otherwise })
    }

    pub fn shell(targets: ShellTargets, cmd: &str) -> ShellStmt {
        ShellStmt { targets, cmd: string(cmd), quiet: false, catch: None, fail: None }
    }

    pub fn field(name: &str, path: Vec<PathSegment>) -> Stmt {
        stmt(StmtKind::FieldDecl { name: name.to_owned(), path })
    }

    pub fn key(k: &str) -> PathSegment {
        PathSegment::Key(k.to_owned())
    }

    pub fn script(stmts: Vec<Stmt>) -> Script {
        Script { source: None, stmts }
    }
}

#[cfg(test)]
mod tests {
    use super::build::*;
    use super::*;

    #[test]
    fn path_display() {
        let path = vec![key("items"), PathSegment::AllElements, PathSegment::Wildcard, PathSegment::Index(-1)];
        assert_eq!(path_to_string(&path), "json.items[].*[-1]");
    }

    #[test]
    fn script_from_json() {
        let src = r#"{
            "stmts": [
                {"kind": {"assign": {
                    "targets": [{"name": "x"}],
                    "values": [{"kind": {"literal": {"int": 5}}, "span": {"start": 4, "end": 5}}]
                }}}
            ]
        }"#;
        let script: Script = serde_json::from_str(src).unwrap();
        let StmtKind::Assign { targets, values } = &script.stmts[0].kind else {
            panic!("expected assignment");
        };
        assert_eq!(targets[0].name, "x");
        assert_eq!(values[0].span, Some(Span::new(4, 5)));
        assert!(matches!(values[0].kind, ExprKind::Literal(Literal::Int(5))));
    }

    #[test]
    fn builders_round_trip_through_json() {
        let s = script(vec![assign("x", bin(BinOp::Add, int(1), float(2.5))), print(vec![ident("x")])]);
        let json = serde_json::to_string(&s).unwrap();
        let back: Script = serde_json::from_str(&json).unwrap();
        assert_eq!(back.stmts.len(), 2);
    }
}
