//! Shell command execution.
//!
//! Scripts run shell commands through a [`ShellExecutor`] so embedders and
//! tests can substitute their own.  [`SystemShell`] runs `<shell> -c <cmd>`
//! with the configured shell, capturing only the streams asked for and
//! letting the rest pass through to the terminal.

use std::process::{Command, Stdio};

use log::{debug, info};

/// Result of one command.  Streams that were not captured are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

pub trait ShellExecutor {
    fn execute(&mut self, cmd: &str, capture_stdout: bool, capture_stderr: bool, quiet: bool) -> ShellOutput;
}

#[derive(Debug, Clone)]
pub struct SystemShell {
    shell: String,
}

impl SystemShell {
    pub fn new(shell: impl Into<String>) -> Self {
        Self { shell: shell.into() }
    }
}

fn stdio(capture: bool) -> Stdio {
    if capture { Stdio::piped() } else { Stdio::inherit() }
}

impl ShellExecutor for SystemShell {
    fn execute(&mut self, cmd: &str, capture_stdout: bool, capture_stderr: bool, quiet: bool) -> ShellOutput {
        if !quiet {
            info!("⚡️ {cmd}");
        }
        let result = Command::new(&self.shell)
            .arg("-c")
            .arg(cmd)
            .stdin(Stdio::inherit())
            .stdout(stdio(capture_stdout))
            .stderr(stdio(capture_stderr))
            .output();
        match result {
            Ok(out) => {
                // killed by a signal: no code, report failure
                let exit_code = out.status.code().unwrap_or(1);
                debug!("`{cmd}` exited with {exit_code}");
                ShellOutput {
                    stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
                    exit_code,
                }
            }
            Err(e) => ShellOutput {
                stdout: String::new(),
                stderr: format!("{}: {e}", self.shell),
                exit_code: 127,
            },
        }
    }
}
