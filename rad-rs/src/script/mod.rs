//! The rad scripting language runtime.
//!
//! A tree-walking interpreter over the syntax tree in [`ast`]:
//!
//! - Dynamic values with shared lists and maps ([`value`])
//! - Lexical scopes and closures ([`env`], [`func`])
//! - Operators ([`ops`]) and builtin functions ([`builtins`])
//! - `defer`/`errdefer`, `exit()` and shell failure handling ([`exit`])
//! - JSON field capture into columns ([`trie`]), column sorting ([`sort`])
//!   and rad blocks ([`rad`])
//!
//! # Quick start
//!
//! ```rust
//! use rad::script::ast::build::*;
//! use rad::script::Interpreter;
//!
//! let script = script(vec![print(vec![bin(rad::script::ast::BinOp::Mul, int(6), int(7))])]);
//! let mut interp = Interpreter::new();
//! let outcome = interp.evaluate(&script);
//! assert_eq!(outcome.exit_code, 0);
//! assert_eq!(interp.output, vec!["42"]);
//! ```

pub mod ast;
pub mod builtins;
pub mod env;
pub mod exit;
pub mod func;
pub mod interp;
pub mod ops;
pub mod rad;
pub mod sort;
pub mod trie;
pub mod value;

// Re-exports for convenience.
pub use interp::{Interpreter, Outcome};
pub use value::Value;
