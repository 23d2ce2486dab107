use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, warn};

use rad::cli::{self, CliArgs, ConfigFile, MockSpec};
use rad::config::{self, Config};
use rad::fetch::MockFetcher;
use rad::script::ast::Script;
use rad::script::Interpreter;

fn main() {
    let args = match cli::parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("rad: {e}");
            eprintln!("{}", cli::USAGE);
            std::process::exit(2);
        }
    };

    init_logging(args.debug);

    match run(args) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("rad: {e:#}");
            std::process::exit(1);
        }
    }
}

/// `-d` forces debug output; otherwise `RUST_LOG` decides, defaulting to
/// info so shell commands are echoed.
fn init_logging(debug: bool) {
    let env = env_logger::Env::default().default_filter_or("info");
    let mut builder = env_logger::Builder::from_env(env);
    if debug {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.format_timestamp(None).format_target(false).init();
}

fn run(args: CliArgs) -> Result<i32> {
    // ── Configuration ─────────────────────────────────────────────────────────
    let mut config = load_config(&args.config)?;
    config.apply_process_env();
    if args.quiet_shell {
        config.quiet_shell = true;
    }
    if config.color.is_none() {
        let is_tty = unsafe { libc::isatty(libc::STDOUT_FILENO) != 0 };
        config.color = Some(is_tty);
    }
    debug!("config: {config:?}");

    // ── Script ────────────────────────────────────────────────────────────────
    let script = read_script(&args.script)?;

    let mut interp = Interpreter::new().with_config(config);
    if !args.mocks.is_empty() {
        interp = interp.with_fetcher(load_mocks(&args.mocks)?);
    }

    let outcome = interp.evaluate(&script);

    // Output buffered when the config turned echo off.
    for line in interp.output.drain(..) {
        println!("{line}");
    }
    for line in interp.err_output.drain(..) {
        eprintln!("{line}");
    }
    for diag in &outcome.diagnostics {
        eprintln!("{diag}");
    }
    Ok(outcome.exit_code)
}

fn load_config(which: &ConfigFile) -> Result<Config> {
    let path = match which {
        ConfigFile::Skip => return Ok(Config::default()),
        ConfigFile::Explicit(p) => p.clone(),
        ConfigFile::Search => match config::default_path().filter(|p| p.exists()) {
            Some(p) => p,
            None => return Ok(Config::default()),
        },
    };
    let (config, errors) =
        Config::load_file(&path).with_context(|| format!("reading config {}", path.display()))?;
    for e in errors {
        warn!("{}: {e}", path.display());
    }
    debug!("loaded config from {}", path.display());
    Ok(config)
}

fn read_script(path: &Path) -> Result<Script> {
    let text = if path == Path::new("-") {
        let mut s = String::new();
        std::io::stdin().read_to_string(&mut s).context("reading script from stdin")?;
        s
    } else {
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?
    };
    serde_json::from_str(&text).with_context(|| format!("{} is not a valid script tree", path.display()))
}

fn load_mocks(specs: &[MockSpec]) -> Result<MockFetcher> {
    let mut fetcher = MockFetcher::new();
    for spec in specs {
        let text = std::fs::read_to_string(&spec.path)
            .with_context(|| format!("reading mock response {}", spec.path.display()))?;
        let json: serde_json::Value = serde_json::from_str(&text)
            .with_context(|| format!("{} is not valid JSON", spec.path.display()))?;
        fetcher
            .add_rule(&spec.pattern, json)
            .with_context(|| format!("invalid mock pattern '{}'", spec.pattern))?;
    }
    Ok(fetcher)
}
