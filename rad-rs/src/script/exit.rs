//! Exit-code state and deferred groups.
//!
//! The first exit moves the handler from `Running` to `Exiting(code)` and
//! the script frame's deferred groups run.  An exit requested while already
//! exiting (from inside a deferred group) never restarts that process; it
//! only escalates a zero code to the new non-zero one.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use log::debug;

use super::ast::Stmt;
use super::env::Env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitState {
    Running,
    Exiting(i32),
}

#[derive(Debug)]
pub struct ExitHandler {
    state: ExitState,
    /// Code owed by failures recovered while still running (for example a
    /// failed deferred group in a function frame).
    pending: i32,
    /// The code fixed by the first exit request.  Later escalations change
    /// the process status but not this.
    initial: i32,
}

impl Default for ExitHandler {
    fn default() -> Self {
        Self { state: ExitState::Running, pending: 0, initial: 0 }
    }
}

impl ExitHandler {
    pub fn state(&self) -> ExitState {
        self.state
    }

    pub fn is_exiting(&self) -> bool {
        matches!(self.state, ExitState::Exiting(_))
    }

    /// Request an exit.  Returns `true` for the first request, which the
    /// caller answers by running the script frame's deferred groups.
    pub fn begin(&mut self, code: i32) -> bool {
        match self.state {
            ExitState::Running => {
                let code = if code == 0 { self.pending } else { code };
                debug!("exiting with code {code}");
                self.state = ExitState::Exiting(code);
                self.initial = code;
                true
            }
            ExitState::Exiting(_) => {
                self.escalate(code);
                false
            }
        }
    }

    /// Raise a zero exit code to `code`.  Non-zero codes are never replaced.
    pub fn escalate(&mut self, code: i32) {
        match &mut self.state {
            ExitState::Exiting(current) if *current == 0 && code != 0 => {
                debug!("escalating exit code 0 -> {code}");
                *current = code;
            }
            ExitState::Running if self.pending == 0 => self.pending = code,
            _ => {}
        }
    }

    /// The code the process will exit with, as things stand.
    pub fn code(&self) -> i32 {
        match self.state {
            ExitState::Running => self.pending,
            ExitState::Exiting(code) => code,
        }
    }

    /// The code the exit began with.  Zero while still running.
    pub fn initial_code(&self) -> i32 {
        match self.state {
            ExitState::Running => 0,
            ExitState::Exiting(_) => self.initial,
        }
    }
}

/// A `defer` or `errdefer` body, with the scope it was registered in.
#[derive(Debug, Clone)]
pub struct Deferred {
    pub body: Vec<Stmt>,
    pub errdefer: bool,
    pub env: Rc<Env>,
}

/// Run `f`, turning a Rust panic into an `Err` carrying its message.
pub fn catch_panic<T>(f: impl FnOnce() -> T) -> Result<T, String> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(panic_message)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}
