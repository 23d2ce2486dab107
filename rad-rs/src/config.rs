//! Runtime configuration file.
//!
//! A small `key = value` format:
//!
//! | Key | Value | Meaning |
//! |-----|-------|---------|
//! | `shell` | path | shell used for shell statements |
//! | `color` | bool | render string attributes (default: stdout is a TTY) |
//! | `quiet_shell` | bool | don't log commands before running them |
//! | `echo` | bool | write script output straight to stdout/stderr |
//! | Lines starting with `;` or `#` | | comment, ignored |
//!
//! Booleans accept `on/off`, `true/false`, `yes/no` and `1/0`.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use thiserror::Error;

// ── Public API ────────────────────────────────────────────────────────────────

/// A non-fatal error encountered while loading a config file.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct ConfigError {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub shell: Option<String>,
    /// `None` leaves the choice to the caller (TTY detection).
    pub color: Option<bool>,
    pub quiet_shell: bool,
    pub echo: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self { shell: None, color: None, quiet_shell: false, echo: true }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config string.
    ///
    /// Bad lines are reported and skipped; the rest of the file still
    /// applies.
    pub fn load_str(s: &str) -> (Self, Vec<ConfigError>) {
        let mut config = Config::new();
        let mut errors = Vec::new();

        for (i, raw) in s.lines().enumerate() {
            let lineno = i + 1;
            let line = raw.trim();

            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                errors.push(ConfigError { line: lineno, message: format!("expected `key = value`, got `{line}`") });
                continue;
            };
            if let Err(message) = config.set(key.trim(), unquote(value.trim())) {
                errors.push(ConfigError { line: lineno, message });
            }
        }

        (config, errors)
    }

    /// Read and parse a config file from disk.
    pub fn load_file(path: &Path) -> std::io::Result<(Self, Vec<ConfigError>)> {
        let s = std::fs::read_to_string(path)?;
        Ok(Self::load_str(&s))
    }

    /// Set one key.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key {
            "shell" => {
                if value.is_empty() {
                    return Err("shell: value cannot be empty".into());
                }
                self.shell = Some(value.to_owned());
            }
            "color" => self.color = Some(parse_bool(key, value)?),
            "quiet_shell" => self.quiet_shell = parse_bool(key, value)?,
            "echo" => self.echo = parse_bool(key, value)?,
            other => return Err(format!("unknown key '{other}'")),
        }
        Ok(())
    }

    /// Apply environment overrides: `RAD_SHELL` (or `SHELL` when no shell
    /// is configured), `NO_COLOR`, `RAD_QUIET_SHELL`.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(sh) = var("RAD_SHELL").filter(|s| !s.is_empty()) {
            self.shell = Some(sh);
        } else if self.shell.is_none() {
            self.shell = var("SHELL").filter(|s| !s.is_empty());
        }
        if var("NO_COLOR").is_some_and(|v| !v.is_empty()) {
            self.color = Some(false);
        }
        if let Some(v) = var("RAD_QUIET_SHELL") {
            self.quiet_shell = parse_bool("RAD_QUIET_SHELL", &v).unwrap_or(!v.is_empty());
        }
    }

    /// [`Config::apply_env`] with the process environment.
    pub fn apply_process_env(&mut self) {
        self.apply_env(|name| std::env::var(name).ok());
    }

    /// The shell to run commands with.
    pub fn shell_program(&self) -> &str {
        self.shell.as_deref().unwrap_or("/bin/sh")
    }
}

/// `<config dir>/rad/config` for this platform, if a home directory exists.
pub fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "rad").map(|dirs| dirs.config_dir().join("config"))
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('"').and_then(|s| s.strip_suffix('"')).unwrap_or(s)
}

fn parse_bool(key: &str, value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        _ => Err(format!("{key}: expected a boolean, got '{value}'")),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
