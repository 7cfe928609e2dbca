//! End-to-end runs of the `smtwire` binary against a shell-script solver.
#![cfg(unix)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const FAKE_SOLVER: &str = r#"
while IFS= read -r line; do
  case "$line" in
    "(check-sat)") echo unsat ;;
    "(get-model)") echo '(error "model is not available")' ;;
    "(exit)") echo success; exit 0 ;;
    *) echo success ;;
  esac
done
"#;

/// The solver script runs under `/bin/sh`, named through a config file so
/// the binary never executes a file it just wrote.
struct Fixture {
    dir: tempfile::TempDir,
    config: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let solver = dir.path().join("fake-solver.sh");
        fs::write(&solver, FAKE_SOLVER).unwrap();
        let config = dir.path().join("solver.json");
        let json = serde_json::json!({ "args": [solver], "relax": true });
        fs::write(&config, json.to_string()).unwrap();
        Self { dir, config }
    }

    fn script(&self, name: &str, text: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, text).unwrap();
        path
    }

    fn run(&self, script: &Path, extra: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_smtwire"))
            .args(["--exec", "/bin/sh", "--config"])
            .arg(&self.config)
            .arg("--file")
            .arg(script)
            .args(extra)
            .env("RUST_LOG", "off")
            .output()
            .expect("failed to run smtwire")
    }
}

#[test]
fn prints_each_command_and_response() {
    let fx = Fixture::new();
    let script = fx.script(
        "unsat.smt2",
        "(set-logic QF_UF)\n(declare-fun p () Bool)\n(assert (and p (not p)))\n(check-sat)\n(get-unsat-core)\n",
    );
    let output = fx.run(&script, &[]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        &lines[..8],
        &[
            "(set-logic QF_UF)",
            "success",
            "(declare-fun p () Bool)",
            "success",
            "(assert (and p (not p)))",
            "success",
            "(check-sat)",
            "unsat",
        ]
    );
    assert_eq!(lines[8], "(get-unsat-core)");
    assert!(lines[9].contains(":produce-unsat-cores"));
}

#[test]
fn json_format_emits_one_object_per_command() {
    let fx = Fixture::new();
    let script = fx.script("json.smt2", "(set-logic QF_UF)\n(check-sat)\n");
    let output = fx.run(&script, &["--format", "json"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<serde_json::Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["command"], "(set-logic QF_UF)");
    assert_eq!(lines[1]["response"]["kind"], "unsat");
}

#[test]
fn malformed_command_aborts() {
    let fx = Fixture::new();
    let script = fx.script("bad.smt2", "(set-logic QF_UF)\n(push 1 2 3)\n(check-sat)\n");
    let output = fx.run(&script, &[]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("A command is not valid. Please check the syntax and try again."));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("(check-sat)"));
}

#[test]
fn regular_output_channel_redirects_responses() {
    let fx = Fixture::new();
    let redirected = fx.dir.path().join("regular.out");
    let script = fx.script(
        "redirect.smt2",
        &format!(
            "(set-option :regular-output-channel \"{}\")\n(set-logic QF_UF)\n",
            redirected.display()
        ),
    );
    let output = fx.run(&script, &[]);
    assert!(output.status.success());
    let text = fs::read_to_string(&redirected).unwrap();
    assert!(text.starts_with("(set-option :regular-output-channel"));
    assert!(text.ends_with("success\n(set-logic QF_UF)\nsuccess\n"));
    assert!(output.stdout.is_empty());
}

#[test]
fn transcript_log_is_written() {
    let fx = Fixture::new();
    let log = fx.dir.path().join("wire.log");
    let script = fx.script("log.smt2", "(set-logic QF_UF)\n");
    let output = fx.run(&script, &["--log", log.to_str().unwrap()]);
    assert!(output.status.success());
    let text = fs::read_to_string(&log).unwrap();
    assert!(text.contains("(set-logic QF_UF)\nOUT: success\n"));
    assert!(text.ends_with("Exiting solver\n"));
}

#[test]
fn missing_solver_fails_to_start() {
    let fx = Fixture::new();
    let script = fx.script("any.smt2", "(check-sat)\n");
    let output = Command::new(env!("CARGO_BIN_EXE_smtwire"))
        .args(["--exec", "/nonexistent/solver", "--file"])
        .arg(&script)
        .env("RUST_LOG", "off")
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to start process"));
}
