//! End-to-end evaluation of hand-built syntax trees.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use serde_json::json;

use rad::config::Config;
use rad::error::ErrorCode;
use rad::fetch::MockFetcher;
use rad::script::ast::build::*;
use rad::script::ast::*;
use rad::script::{Interpreter, Outcome, Value};
use rad::shell::{ShellExecutor, ShellOutput};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn run(stmts: Vec<Stmt>) -> (Interpreter, Outcome) {
    run_with(Interpreter::new(), stmts)
}

fn run_with(mut interp: Interpreter, stmts: Vec<Stmt>) -> (Interpreter, Outcome) {
    let outcome = interp.evaluate(&script(stmts));
    (interp, outcome)
}

fn global(interp: &Interpreter, name: &str) -> Option<Value> {
    interp.globals().lookup(name)
}

fn exit(code: i64) -> Stmt {
    expr_stmt(call("exit", vec![int(code)]))
}

fn say(s: &str) -> Stmt {
    print(vec![string(s)])
}

/// Records every command and answers from a queue of canned results.
#[derive(Clone, Default)]
struct FakeShell {
    calls: Rc<RefCell<Vec<(String, bool, bool, bool)>>>,
    responses: Rc<RefCell<VecDeque<ShellOutput>>>,
}

impl FakeShell {
    fn answering(outputs: Vec<ShellOutput>) -> Self {
        let shell = FakeShell::default();
        shell.responses.borrow_mut().extend(outputs);
        shell
    }
}

impl ShellExecutor for FakeShell {
    fn execute(&mut self, cmd: &str, capture_stdout: bool, capture_stderr: bool, quiet: bool) -> ShellOutput {
        self.calls.borrow_mut().push((cmd.to_owned(), capture_stdout, capture_stderr, quiet));
        self.responses.borrow_mut().pop_front().unwrap_or_default()
    }
}

fn out(stdout: &str, exit_code: i32) -> ShellOutput {
    ShellOutput { stdout: stdout.to_owned(), stderr: String::new(), exit_code }
}

fn shell_stmt(s: ShellStmt) -> Stmt {
    stmt(StmtKind::Shell(s))
}

fn positional(names: &[&str]) -> ShellTargets {
    ShellTargets::Positional(names.iter().map(|n| n.to_string()).collect())
}

// ── Functions and closures ────────────────────────────────────────────────────

#[test]
fn closure_mutation_is_visible_but_locals_are_not() {
    let (interp, outcome) = run(vec![
        assign("count", int(0)),
        fn_def(
            "bump",
            &[],
            vec![
                stmt(StmtKind::CompoundAssign { target: target("count"), op: BinOp::Add, value: int(1) }),
                assign("local", int(5)),
            ],
            None,
        ),
        expr_stmt(call("bump", vec![])),
        expr_stmt(call("bump", vec![])),
    ]);
    assert_eq!(outcome.exit_code, 0);
    assert_eq!(global(&interp, "count"), Some(Value::Int(2)));
    assert_eq!(global(&interp, "local"), None);
}

#[test]
fn lambdas_capture_their_defining_scope() {
    let (interp, outcome) = run(vec![
        assign("make", lambda(&["x"], vec![lambda(&["y"], vec![bin(BinOp::Add, ident("x"), ident("y"))])])),
        assign("add2", call("make", vec![int(2)])),
        assign("r", call("add2", vec![int(3)])),
    ]);
    assert_eq!(outcome.exit_code, 0);
    assert_eq!(global(&interp, "r"), Some(Value::Int(5)));
}

#[test]
fn recursion() {
    let (interp, _) = run(vec![
        fn_def(
            "fact",
            &["n"],
            vec![
                if_else(bin(BinOp::Le, ident("n"), int(1)), vec![ret(vec![int(1)])], None),
                ret(vec![bin(
                    BinOp::Mul,
                    ident("n"),
                    call("fact", vec![bin(BinOp::Sub, ident("n"), int(1))]),
                )]),
            ],
            None,
        ),
        assign("r", call("fact", vec![int(5)])),
    ]);
    assert_eq!(global(&interp, "r"), Some(Value::Int(120)));
}

#[test]
fn multiple_returns_destructure() {
    let (interp, outcome) = run(vec![
        fn_def("pair", &[], vec![ret(vec![int(1), int(2)])], None),
        assign_many(&["a", "b"], vec![call("pair", vec![])]),
    ]);
    assert_eq!(outcome.exit_code, 0);
    assert_eq!(global(&interp, "a"), Some(Value::Int(1)));
    assert_eq!(global(&interp, "b"), Some(Value::Int(2)));
}

#[test]
fn too_many_returned_values_is_an_arity_error() {
    let (_, outcome) = run(vec![
        fn_def("pair", &[], vec![ret(vec![int(1), int(2)])], None),
        assign("x", call("pair", vec![])),
    ]);
    assert_eq!(outcome.exit_code, 1);
    assert!(outcome.diagnostics[0].contains("arity-mismatch"), "{:?}", outcome.diagnostics);
}

#[test]
fn missing_return_value_is_an_arity_error() {
    let (_, outcome) = run(vec![
        fn_def("noret", &[], vec![say("hi")], None),
        assign("x", call("noret", vec![])),
    ]);
    assert_eq!(outcome.exit_code, 1);
    assert!(outcome.diagnostics[0].contains("arity-mismatch"));
}

#[test]
fn assignment_count_mismatch() {
    let (_, outcome) = run(vec![assign_many(&["a", "b"], vec![int(1)])]);
    assert_eq!(outcome.exit_code, 1);
    assert!(outcome.diagnostics[0].contains("arity-mismatch"));
}

#[test]
fn fallible_builtin_with_two_outputs() {
    let (interp, outcome) = run(vec![
        assign_many(&["n", "err"], vec![call("parse_int", vec![string("x")])]),
        assign("t", call("type_of", vec![ident("err")])),
        assign_many(&["m", "ok"], vec![call("parse_int", vec![string("42")])]),
    ]);
    assert_eq!(outcome.exit_code, 0);
    assert_eq!(global(&interp, "n"), Some(Value::Null));
    assert_eq!(global(&interp, "t"), Some(Value::str("error")));
    assert_eq!(global(&interp, "m"), Some(Value::Int(42)));
    assert_eq!(global(&interp, "ok"), Some(Value::Null));
}

#[test]
fn fallible_builtin_with_one_output_fails() {
    let (_, outcome) = run(vec![assign("n", call("parse_int", vec![string("x")]))]);
    assert_eq!(outcome.exit_code, 1);
    assert!(outcome.diagnostics[0].contains("parse"));
}

// ── Membership ────────────────────────────────────────────────────────────────

#[test]
fn map_membership_is_typed() {
    let m = || map(vec![(string("2"), string("x")), (string("a"), int(5))]);
    let (interp, outcome) = run(vec![
        assign("int_key", bin(BinOp::In, int(2), m())),
        assign("str_key", bin(BinOp::In, string("2"), m())),
        assign("value", bin(BinOp::In, int(5), m())),
        assign("absent", bin(BinOp::NotIn, string("z"), m())),
    ]);
    assert_eq!(outcome.exit_code, 0);
    assert_eq!(global(&interp, "int_key"), Some(Value::Bool(false)));
    assert_eq!(global(&interp, "str_key"), Some(Value::Bool(true)));
    assert_eq!(global(&interp, "value"), Some(Value::Bool(false)));
    assert_eq!(global(&interp, "absent"), Some(Value::Bool(true)));
}

#[test]
fn unhashable_membership_fails() {
    let (_, outcome) = run(vec![assign("x", bin(BinOp::In, list(vec![int(1)]), map(vec![])))]);
    assert_eq!(outcome.exit_code, 1);
    assert!(outcome.diagnostics[0].contains(ErrorCode::TypeMismatch.as_str()));
}

#[test]
fn break_inside_a_function_does_not_leave_the_callers_loop() {
    let (interp, outcome) = run(vec![
        fn_def("stop", &[], vec![stmt(StmtKind::Break)], None),
        for_in(&["i"], list(vec![int(1), int(2)]), vec![print(vec![ident("i")]), expr_stmt(call("stop", vec![]))]),
        say("after"),
    ]);
    assert_eq!(outcome.exit_code, 1);
    assert_eq!(interp.output, ["1"]);
    assert!(outcome.diagnostics[0].contains(ErrorCode::InternalBug.as_str()));
    assert!(outcome.diagnostics[0].contains("Break escaped from stop()"));
}

#[test]
fn continue_inside_a_lambda_is_rejected() {
    let (_, outcome) = run(vec![
        assign("skip", lambda_stmt(&[], stmt(StmtKind::Continue))),
        for_in(&["i"], list(vec![int(1)]), vec![expr_stmt(call("skip", vec![]))]),
    ]);
    assert_eq!(outcome.exit_code, 1);
    assert!(outcome.diagnostics[0].contains("Continue escaped from <lambda>()"));
}

// ── Defer and exit ────────────────────────────────────────────────────────────

fn three_defers() -> Vec<Stmt> {
    vec![
        defer(vec![say("D1")]),
        defer(vec![say("D2")]),
        errdefer(vec![say("E")]),
        defer(vec![say("D3")]),
    ]
}

#[test]
fn deferred_groups_run_last_first_and_skip_errdefer_on_success() {
    let (interp, outcome) = run(three_defers());
    assert_eq!(outcome.exit_code, 0);
    assert_eq!(interp.output, ["D3", "D2", "D1"]);
}

#[test]
fn errdefer_runs_on_non_zero_exit() {
    let mut stmts = three_defers();
    stmts.push(exit(1));
    stmts.push(say("unreachable"));
    let (interp, outcome) = run(stmts);
    assert_eq!(outcome.exit_code, 1);
    assert_eq!(interp.output, ["D3", "E", "D2", "D1"]);
}

#[test]
fn errdefer_runs_when_the_script_fails() {
    let (interp, outcome) = run(vec![
        errdefer(vec![say("cleanup")]),
        assign("x", bin(BinOp::Div, int(1), int(0))),
    ]);
    assert_eq!(outcome.exit_code, 1);
    assert_eq!(interp.output, ["cleanup"]);
    assert!(outcome.diagnostics[0].contains("divide-by-zero"));
}

#[test]
fn exit_inside_a_defer_escalates() {
    let (_, outcome) = run(vec![defer(vec![exit(2)]), exit(0)]);
    assert_eq!(outcome.exit_code, 2);
}

#[test]
fn zero_exit_inside_a_defer_keeps_the_failure() {
    let (_, outcome) = run(vec![defer(vec![exit(0)]), exit(3)]);
    assert_eq!(outcome.exit_code, 3);
}

#[test]
fn failing_defer_still_runs_the_rest() {
    let (interp, outcome) = run(vec![
        defer(vec![say("after")]),
        defer(vec![assign("x", bin(BinOp::Div, int(1), int(0)))]),
    ]);
    assert_eq!(outcome.exit_code, 1);
    assert_eq!(interp.output, ["after"]);
}

#[test]
fn function_defers_run_when_the_call_returns() {
    let body = |fail: bool| {
        let mut body = vec![errdefer(vec![say("cleanup")]), defer(vec![say("always")])];
        if fail {
            body.push(assign("y", bin(BinOp::Div, int(1), int(0))));
        }
        body
    };

    let (interp, outcome) = run(vec![
        fn_def("f", &[], body(false), None),
        expr_stmt(call("f", vec![])),
        say("done"),
    ]);
    assert_eq!(outcome.exit_code, 0);
    assert_eq!(interp.output, ["always", "done"]);

    let (interp, outcome) = run(vec![fn_def("f", &[], body(true), None), expr_stmt(call("f", vec![]))]);
    assert_eq!(outcome.exit_code, 1);
    assert_eq!(interp.output, ["always", "cleanup"]);
}

#[test]
fn evaluate_resets_between_runs() {
    let mut interp = Interpreter::new();
    let first = interp.evaluate(&script(vec![exit(4)]));
    assert_eq!(first.exit_code, 4);
    let second = interp.evaluate(&script(vec![say("ok")]));
    assert_eq!(second.exit_code, 0);

    interp.evaluate(&script(vec![assign("secret", int(42))]));
    assert_eq!(global(&interp, "secret"), Some(Value::Int(42)));
    let third = interp.evaluate(&script(vec![print(vec![ident("secret")])]));
    assert_eq!(third.exit_code, 1);
    assert!(third.diagnostics[0].contains(ErrorCode::UnknownIdentifier.as_str()));
    assert_eq!(global(&interp, "secret"), None);
}

#[test]
fn errdefer_follows_the_code_the_exit_began_with() {
    let (interp, outcome) = run(vec![
        errdefer(vec![say("E")]),
        defer(vec![assign("x", bin(BinOp::Div, int(1), int(0)))]),
    ]);
    assert_eq!(outcome.exit_code, 1);
    assert!(interp.output.is_empty(), "{:?}", interp.output);
}

#[test]
fn dropping_the_interpreter_frees_recursive_functions() {
    let (interp, outcome) = run(vec![
        fn_def("f", &["n"], vec![ret(vec![call("f", vec![ident("n")])])], None),
        assign("x", int(1)),
    ]);
    assert_eq!(outcome.exit_code, 0);
    let globals = Rc::downgrade(&interp.globals());
    drop(interp);
    assert!(globals.upgrade().is_none());
}

#[test]
fn re_evaluating_frees_the_previous_globals() {
    let mut interp = Interpreter::new();
    interp.evaluate(&script(vec![fn_def("f", &[], vec![say("f")], None)]));
    let first = Rc::downgrade(&interp.globals());
    interp.evaluate(&script(vec![say("again")]));
    assert!(first.upgrade().is_none());
}

// ── Shell commands ────────────────────────────────────────────────────────────

#[test]
fn shell_binds_code_and_stdout() {
    let shell = FakeShell::answering(vec![out("hi\n", 0)]);
    let calls = shell.calls.clone();
    let (interp, outcome) = run_with(
        Interpreter::new().with_shell(shell),
        vec![shell_stmt(build::shell(positional(&["code", "out"]), "echo hi"))],
    );
    assert_eq!(outcome.exit_code, 0);
    assert_eq!(global(&interp, "code"), Some(Value::Int(0)));
    assert_eq!(global(&interp, "out"), Some(Value::str("hi\n")));
    assert_eq!(calls.borrow()[0], ("echo hi".to_owned(), true, false, false));
}

#[test]
fn named_targets_capture_only_what_they_bind() {
    let shell = FakeShell::answering(vec![ShellOutput {
        stdout: String::new(),
        stderr: "warn\n".to_owned(),
        exit_code: 0,
    }]);
    let calls = shell.calls.clone();
    let (interp, _) = run_with(
        Interpreter::new().with_shell(shell),
        vec![shell_stmt(build::shell(ShellTargets::Named(vec![ShellSlot::Stderr]), "make"))],
    );
    assert_eq!(global(&interp, "stderr"), Some(Value::str("warn\n")));
    assert_eq!(global(&interp, "stdout"), None);
    let (_, cap_out, cap_err, _) = calls.borrow()[0].clone();
    assert!(!cap_out && cap_err);
}

#[test]
fn catch_block_recovers() {
    let mut s = build::shell(positional(&["code"]), "false");
    s.catch = Some(vec![say("caught")]);
    let (interp, outcome) = run_with(
        Interpreter::new().with_shell(FakeShell::answering(vec![out("", 3)])),
        vec![shell_stmt(s), say("next")],
    );
    assert_eq!(outcome.exit_code, 0);
    assert_eq!(interp.output, ["caught", "next"]);
    assert_eq!(global(&interp, "code"), Some(Value::Int(3)));
}

#[test]
fn fail_block_runs_then_propagates() {
    let mut s = build::shell(positional(&[]), "false");
    s.fail = Some(vec![say("failing")]);
    let (interp, outcome) = run_with(
        Interpreter::new().with_shell(FakeShell::answering(vec![out("", 4)])),
        vec![shell_stmt(s), say("unreachable")],
    );
    assert_eq!(outcome.exit_code, 1);
    assert_eq!(interp.output, ["failing"]);
    assert!(outcome.diagnostics[0].contains("shell-non-zero-exit"));
}

#[test]
fn unhandled_shell_failure() {
    let (interp, outcome) = run_with(
        Interpreter::new().with_shell(FakeShell::answering(vec![out("", 1)])),
        vec![shell_stmt(build::shell(positional(&[]), "false")), say("unreachable")],
    );
    assert_eq!(outcome.exit_code, 1);
    assert!(interp.output.is_empty());
}

#[test]
fn quiet_shell_comes_from_config() {
    let shell = FakeShell::default();
    let calls = shell.calls.clone();
    let config = Config { quiet_shell: true, echo: false, ..Config::default() };
    run_with(
        Interpreter::new().with_config(config).with_shell(shell),
        vec![shell_stmt(build::shell(positional(&[]), "true"))],
    );
    assert!(calls.borrow()[0].3);
}

#[test]
fn too_many_shell_targets() {
    let (_, outcome) = run_with(
        Interpreter::new().with_shell(FakeShell::default()),
        vec![shell_stmt(build::shell(positional(&["a", "b", "c", "d"]), "true"))],
    );
    assert_eq!(outcome.exit_code, 1);
    assert!(outcome.diagnostics[0].contains("arity-mismatch"));
}

// ── Rad blocks ────────────────────────────────────────────────────────────────

fn users_fetcher() -> MockFetcher {
    let doc = json!({"users": [
        {"name": "bo", "age": 30},
        {"name": "alice", "age": 41},
        {"name": "cy", "age": 25},
    ]});
    MockFetcher::new().with_rule("example\\.test/users", doc).unwrap()
}

fn users_block(sort: Option<SortSpec>, mods: Vec<FieldMod>) -> Vec<Stmt> {
    users_block_of(RadKind::Rad, sort, mods)
}

fn users_block_of(kind: RadKind, sort: Option<SortSpec>, mods: Vec<FieldMod>) -> Vec<Stmt> {
    vec![
        field("name", vec![key("users"), PathSegment::AllElements, key("name")]),
        field("age", vec![key("users"), PathSegment::AllElements, key("age")]),
        stmt(StmtKind::Rad(RadBlock {
            kind,
            source: Some(string("https://example.test/users")),
            fields: vec!["name".into(), "age".into()],
            sort,
            mods,
        })),
    ]
}

#[test]
fn rad_block_fetches_sorts_and_renders() {
    let sort = SortSpec::Columns(vec![("age".into(), SortDir::Desc)]);
    let (interp, outcome) =
        run_with(Interpreter::new().with_fetcher(users_fetcher()), users_block(Some(sort), vec![]));
    assert_eq!(outcome.exit_code, 0, "{:?}", outcome.diagnostics);
    assert_eq!(interp.output, ["name   age", "alice  41", "bo     30", "cy     25"]);
    assert_eq!(
        global(&interp, "name"),
        Some(Value::list(vec![Value::str("alice"), Value::str("bo"), Value::str("cy")]))
    );
}

#[test]
fn request_block_binds_and_sorts_without_printing() {
    let sort = SortSpec::Columns(vec![("age".into(), SortDir::Asc)]);
    let (interp, outcome) = run_with(
        Interpreter::new().with_fetcher(users_fetcher()),
        users_block_of(RadKind::Request, Some(sort), vec![]),
    );
    assert_eq!(outcome.exit_code, 0, "{:?}", outcome.diagnostics);
    assert!(interp.output.is_empty(), "{:?}", interp.output);
    assert_eq!(
        global(&interp, "age"),
        Some(Value::list(vec![Value::Int(25), Value::Int(30), Value::Int(41)]))
    );
}

#[test]
fn rad_block_needs_fields() {
    let (interp, outcome) = run_with(
        Interpreter::new().with_fetcher(users_fetcher()),
        vec![stmt(StmtKind::Rad(RadBlock {
            kind: RadKind::Rad,
            source: Some(string("https://example.test/users")),
            fields: vec![],
            sort: None,
            mods: vec![],
        }))],
    );
    assert_eq!(outcome.exit_code, 1);
    assert!(outcome.diagnostics[0].contains("no fields specified in rad block"));
    assert!(interp.output.is_empty());
}

#[test]
fn rad_block_map_modifier() {
    let mods = vec![FieldMod::Map {
        fields: vec!["age".into()],
        lambda: lambda(&["a"], vec![bin(BinOp::Mul, ident("a"), int(2))]),
    }];
    let (interp, outcome) = run_with(Interpreter::new().with_fetcher(users_fetcher()), users_block(None, mods));
    assert_eq!(outcome.exit_code, 0, "{:?}", outcome.diagnostics);
    assert_eq!(
        global(&interp, "age"),
        Some(Value::list(vec![Value::Int(60), Value::Int(82), Value::Int(50)]))
    );
}

#[test]
fn rad_block_unknown_sort_column() {
    let sort = SortSpec::Columns(vec![("email".into(), SortDir::Asc)]);
    let (_, outcome) = run_with(Interpreter::new().with_fetcher(users_fetcher()), users_block(Some(sort), vec![]));
    assert_eq!(outcome.exit_code, 1);
    assert!(outcome.diagnostics[0].contains("unknown-identifier"));
}

#[test]
fn rad_block_without_a_mock_fails_to_fetch() {
    let (_, outcome) = run(users_block(None, vec![]));
    assert_eq!(outcome.exit_code, 1);
    assert!(outcome.diagnostics[0].contains("fetch"));
}

#[test]
fn wildcard_keys_and_values_become_parallel_columns() {
    let doc = json!({"items": {"a": {"name": "x"}, "b": {"name": "y"}}});
    let fetcher = MockFetcher::new().with_rule("items", doc).unwrap();
    let (interp, outcome) = run_with(
        Interpreter::new().with_fetcher(fetcher),
        vec![
            field("id", vec![key("items"), PathSegment::Wildcard]),
            field("name", vec![key("items"), PathSegment::Wildcard, key("name")]),
            stmt(StmtKind::Rad(RadBlock {
                kind: RadKind::Rad,
                source: Some(string("https://example.test/items")),
                fields: vec!["id".into(), "name".into()],
                sort: None,
                mods: vec![],
            })),
        ],
    );
    assert_eq!(outcome.exit_code, 0, "{:?}", outcome.diagnostics);
    assert_eq!(global(&interp, "id"), Some(Value::list(vec![Value::str("a"), Value::str("b")])));
    assert_eq!(global(&interp, "name"), Some(Value::list(vec![Value::str("x"), Value::str("y")])));
}

#[test]
fn display_block_requires_equal_columns() {
    let (_, outcome) = run(vec![
        assign("a", list(vec![int(1), int(2)])),
        assign("b", list(vec![int(1)])),
        stmt(StmtKind::Rad(RadBlock {
            kind: RadKind::Rad,
            source: None,
            fields: vec!["a".into(), "b".into()],
            sort: None,
            mods: vec![],
        })),
    ]);
    assert_eq!(outcome.exit_code, 1);
    assert!(outcome.diagnostics[0].contains("arity-mismatch"));
}

// ── Serialized trees ──────────────────────────────────────────────────────────

#[test]
fn script_deserialized_from_json() {
    let tree = json!({
        "source": "print(\"a\" + \"b\")",
        "stmts": [{"kind": {"expr": {"kind": {"call": {
            "callee": {"kind": {"ident": "print"}},
            "args": [{"kind": {"binary": {
                "op": "add",
                "lhs": {"kind": {"literal": {"str": "a"}}},
                "rhs": {"kind": {"literal": {"str": "b"}}}
            }}}],
            "named": []
        }}}}}]
    });
    let script: Script = serde_json::from_value(tree).unwrap();
    let mut interp = Interpreter::new();
    let outcome = interp.evaluate(&script);
    assert_eq!(outcome.exit_code, 0, "{:?}", outcome.diagnostics);
    assert_eq!(interp.output, ["ab"]);
}
