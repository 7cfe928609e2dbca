//! `smtwire`: run an SMT-LIB2 script against an external solver and print
//! every command with the solver's response.

mod runner;

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use miette::{miette, IntoDiagnostic, WrapErr};
use smtwire_solver::{DialectKind, SolverConfig, SolverSession};
use tracing_subscriber::EnvFilter;

use crate::runner::{run_script, OutputFormat};

#[derive(Parser, Debug)]
#[command(name = "smtwire")]
#[command(about = "Run an SMT-LIB2 script against an external solver")]
#[command(version)]
struct Cli {
    /// Solver executable
    #[arg(long = "exec")]
    exec: String,

    /// SMT-LIB2 script to run
    #[arg(long)]
    file: PathBuf,

    /// Client diagnostic verbosity (2 or more also enables debug logging)
    #[arg(long, default_value_t = 0)]
    verbose: u32,

    /// Value sent to the solver as :verbosity during the handshake
    #[arg(long, default_value_t = 0)]
    solver_verbosity: u32,

    /// Write a transcript of the solver conversation to this file
    #[arg(long)]
    log: Option<PathBuf>,

    /// Reject repeated set-logic and get-assertions without :interactive-mode
    #[arg(long, default_value_t = false)]
    strict: bool,

    /// Per-reply timeout in seconds (0 disables it)
    #[arg(long)]
    timeout: Option<u64>,

    /// Solver dialect: standard, z3 or binary
    #[arg(long)]
    dialect: Option<DialectKind>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// JSON solver configuration; flags override its fields
    #[arg(long)]
    config: Option<PathBuf>,
}

fn solver_config(cli: &Cli) -> miette::Result<SolverConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .into_diagnostic()
                .wrap_err_with(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str(&raw)
                .into_diagnostic()
                .wrap_err_with(|| format!("Invalid solver config {}", path.display()))?
        }
        None => SolverConfig {
            relax: true,
            ..SolverConfig::default()
        },
    };
    config.executable = cli.exec.clone();
    if cli.strict {
        config.relax = false;
    }
    if cli.verbose > 0 {
        config.verbose = cli.verbose;
    }
    if cli.solver_verbosity > 0 {
        config.solver_verbosity = cli.solver_verbosity;
    }
    if let Some(log) = &cli.log {
        config.log_file = Some(log.clone());
    }
    if let Some(timeout) = cli.timeout {
        config.timeout_secs = timeout;
    }
    if let Some(dialect) = cli.dialect {
        config.dialect = dialect;
    }
    Ok(config)
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose >= 2 { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = solver_config(&cli)?;
    let source = fs::read_to_string(&cli.file)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to read script {}", cli.file.display()))?;
    let filename = cli.file.display().to_string();

    let mut session = SolverSession::new(config);
    let started = session.start();
    if let Some(message) = started.error_message() {
        return Err(miette!("{message}"));
    }
    run_script(&mut session, &source, &filename, cli.format)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn relaxed_by_default() {
        let cli = parse(&["smtwire", "--exec", "z3", "--file", "a.smt2"]);
        let config = solver_config(&cli).unwrap();
        assert!(config.relax);
        assert_eq!(config.executable, "z3");
        assert_eq!(config.dialect, DialectKind::Z3);
        assert_eq!(config.timeout(), None);
        assert_eq!(cli.format, OutputFormat::Text);
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("solver.json");
        fs::write(
            &path,
            r#"{"executable": "cvc5", "args": ["--lang", "smt2"], "relax": true, "timeout_secs": 5}"#,
        )
        .unwrap();
        let cli = parse(&[
            "smtwire",
            "--exec",
            "/usr/bin/z3",
            "--file",
            "a.smt2",
            "--config",
            path.to_str().unwrap(),
            "--strict",
            "--timeout",
            "9",
            "--dialect",
            "binary",
            "--format",
            "json",
        ]);
        let config = solver_config(&cli).unwrap();
        assert_eq!(config.executable, "/usr/bin/z3");
        assert_eq!(config.args, vec!["--lang", "smt2"]);
        assert!(!config.relax);
        assert_eq!(config.timeout_secs, 9);
        assert_eq!(config.dialect, DialectKind::Binary);
        assert_eq!(cli.format, OutputFormat::Json);
    }

    #[test]
    fn unknown_dialect_is_rejected() {
        let result = Cli::try_parse_from([
            "smtwire", "--exec", "z3", "--file", "a.smt2", "--dialect", "yices",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn exec_and_file_are_required() {
        assert!(Cli::try_parse_from(["smtwire", "--file", "a.smt2"]).is_err());
        assert!(Cli::try_parse_from(["smtwire", "--exec", "z3"]).is_err());
    }
}
