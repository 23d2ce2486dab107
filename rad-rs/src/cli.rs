//! Command-line argument parsing.
//!
//! Usage:
//!   rad [-dq] [-f[<config>]] [-m <url-regex>=<json-file>]... <script.json>
//!
//! The script is a syntax tree serialized as JSON; `-` reads it from stdin.

use std::path::PathBuf;

pub const USAGE: &str = "Usage: rad [-dq] [-f[<config>]] [-m <url-regex>=<json-file>]... <script.json>";

// ── Public types ──────────────────────────────────────────────────────────────

/// Parsed command-line arguments.
#[derive(Debug, Default)]
pub struct CliArgs {
    /// Config-file specification.
    pub config: ConfigFile,
    /// Debug logging (`-d`).
    pub debug: bool,
    /// Don't log shell commands before running them (`-q`).
    pub quiet_shell: bool,
    /// Canned responses for URLs (`-m`), in the order given.
    pub mocks: Vec<MockSpec>,
    /// Script to run; `-` is stdin.
    pub script: PathBuf,
}

/// How to choose the config file.
#[derive(Debug, Default, PartialEq, Eq)]
pub enum ConfigFile {
    /// The platform config path, if it exists (default).
    #[default]
    Search,
    /// `-f` with no file argument: no config file.
    Skip,
    /// `-f<file>`: load this specific file.
    Explicit(PathBuf),
}

/// `-m <url-regex>=<json-file>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockSpec {
    pub pattern: String,
    pub path: PathBuf,
}

impl MockSpec {
    fn parse(s: &str) -> Result<Self, String> {
        match s.rsplit_once('=') {
            Some((pattern, path)) if !pattern.is_empty() && !path.is_empty() => {
                Ok(MockSpec { pattern: pattern.to_owned(), path: PathBuf::from(path) })
            }
            _ => Err(format!("-m expects <url-regex>=<json-file>, got '{s}'")),
        }
    }
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse `std::env::args()` and return [`CliArgs`] or an error message.
pub fn parse_args() -> Result<CliArgs, String> {
    let raw: Vec<String> = std::env::args().collect();
    parse_argv(raw.get(1..).unwrap_or_default())
}

/// Parse a slice of argument strings (exposed for testing).
pub fn parse_argv(argv: &[String]) -> Result<CliArgs, String> {
    let mut args = CliArgs::default();
    let mut positional: Vec<String> = Vec::new();
    let mut i = 0;

    while i < argv.len() {
        let arg = argv[i].as_str();

        // `--` ends flag processing.
        if arg == "--" {
            i += 1;
            positional.extend(argv[i..].iter().cloned());
            break;
        }

        // Non-flag argument (a lone `-` is stdin).
        if !arg.starts_with('-') || arg == "-" {
            positional.push(arg.to_owned());
            i += 1;
            continue;
        }

        let chars: Vec<char> = arg[1..].chars().collect();
        let mut j = 0;
        while j < chars.len() {
            match chars[j] {
                'd' => args.debug = true,
                'q' => args.quiet_shell = true,

                // -f[<file>]
                'f' => {
                    if j + 1 < chars.len() {
                        let file: String = chars[j + 1..].iter().collect();
                        args.config = ConfigFile::Explicit(PathBuf::from(file));
                        j = chars.len();
                    } else if i + 1 < argv.len() && !argv[i + 1].starts_with('-') && i + 2 < argv.len() {
                        // a following word is the config file only if a script still follows it
                        i += 1;
                        args.config = ConfigFile::Explicit(PathBuf::from(&argv[i]));
                    } else {
                        args.config = ConfigFile::Skip;
                    }
                }

                // -m<regex>=<file>
                'm' => {
                    let spec = if j + 1 < chars.len() {
                        let s: String = chars[j + 1..].iter().collect();
                        j = chars.len();
                        s
                    } else if i + 1 < argv.len() {
                        i += 1;
                        argv[i].clone()
                    } else {
                        return Err("-m requires a <url-regex>=<json-file> argument".to_owned());
                    };
                    args.mocks.push(MockSpec::parse(&spec)?);
                }

                c => return Err(format!("unknown option: -{c}")),
            }
            j += 1;
        }
        i += 1;
    }

    match positional.len() {
        0 => return Err("missing script file".to_owned()),
        1 => args.script = PathBuf::from(positional.remove(0)),
        n => return Err(format!("too many arguments ({n})")),
    }

    Ok(args)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
