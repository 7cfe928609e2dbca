use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dialect::DialectKind;

/// How a session launches and talks to its solver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Path or name of the solver executable.
    pub executable: String,
    pub args: Vec<String>,
    /// Text that ends every framed reply. Empty means "until end of stream".
    pub end_marker: String,
    /// Wire transcript destination.
    pub log_file: Option<PathBuf>,
    /// Allow `set-logic` to be repeated and `get-assertions` without
    /// `:interactive-mode`.
    pub relax: bool,
    /// Sent to the solver as `:verbosity` during the handshake when non-zero.
    pub solver_verbosity: u32,
    /// Client-side diagnostic verbosity.
    pub verbose: u32,
    /// Upper bound on each reply, in seconds. 0 disables it.
    pub timeout_secs: u64,
    pub dialect: DialectKind,
    pub identity: SolverIdentity,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            executable: "z3".into(),
            args: vec!["-smt2".into(), "-in".into()],
            end_marker: "\n".into(),
            log_file: None,
            relax: false,
            solver_verbosity: 0,
            verbose: 0,
            timeout_secs: 0,
            dialect: DialectKind::Z3,
            identity: SolverIdentity::default(),
        }
    }
}

impl SolverConfig {
    /// Z3 reading SMT-LIB2 from stdin.
    pub fn z3(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// Values reported for `get-info :name`, `:authors` and `:version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverIdentity {
    pub name: String,
    pub authors: String,
    pub version: String,
}

impl Default for SolverIdentity {
    fn default() -> Self {
        Self {
            name: "z3-4.3".into(),
            authors: "Leonardo de Moura and Nikolaj Bjorner".into(),
            version: "4.3".into(),
        }
    }
}
