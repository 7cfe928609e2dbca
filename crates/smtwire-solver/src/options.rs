//! Option and info keywords known to the session.

use std::collections::HashMap;
use std::fmt;

use smtwire_syntax::SExpr;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OptionName {
    PrintSuccess,
    ExpandDefinitions,
    InteractiveMode,
    ProduceProofs,
    ProduceUnsatCores,
    ProduceModels,
    ProduceAssignments,
    RegularOutputChannel,
    DiagnosticOutputChannel,
    RandomSeed,
    Verbosity,
    Other(String),
}

impl OptionName {
    /// Accepts the keyword with or without its leading colon.
    pub fn parse(keyword: &str) -> Self {
        match keyword.strip_prefix(':').unwrap_or(keyword) {
            "print-success" => OptionName::PrintSuccess,
            "expand-definitions" => OptionName::ExpandDefinitions,
            "interactive-mode" => OptionName::InteractiveMode,
            "produce-proofs" => OptionName::ProduceProofs,
            "produce-unsat-cores" => OptionName::ProduceUnsatCores,
            "produce-models" => OptionName::ProduceModels,
            "produce-assignments" => OptionName::ProduceAssignments,
            "regular-output-channel" => OptionName::RegularOutputChannel,
            "diagnostic-output-channel" => OptionName::DiagnosticOutputChannel,
            "random-seed" => OptionName::RandomSeed,
            "verbosity" => OptionName::Verbosity,
            other => OptionName::Other(other.to_string()),
        }
    }

    /// Keyword without the colon.
    pub fn as_str(&self) -> &str {
        match self {
            OptionName::PrintSuccess => "print-success",
            OptionName::ExpandDefinitions => "expand-definitions",
            OptionName::InteractiveMode => "interactive-mode",
            OptionName::ProduceProofs => "produce-proofs",
            OptionName::ProduceUnsatCores => "produce-unsat-cores",
            OptionName::ProduceModels => "produce-models",
            OptionName::ProduceAssignments => "produce-assignments",
            OptionName::RegularOutputChannel => "regular-output-channel",
            OptionName::DiagnosticOutputChannel => "diagnostic-output-channel",
            OptionName::RandomSeed => "random-seed",
            OptionName::Verbosity => "verbosity",
            OptionName::Other(name) => name,
        }
    }

    /// Options that can no longer change once a logic is set.
    pub fn must_precede_logic(&self) -> bool {
        matches!(
            self,
            OptionName::InteractiveMode
                | OptionName::ProduceProofs
                | OptionName::ProduceUnsatCores
                | OptionName::ProduceModels
                | OptionName::ProduceAssignments
        )
    }

    /// Options that only configure this client and never reach the solver.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            OptionName::PrintSuccess
                | OptionName::RegularOutputChannel
                | OptionName::DiagnosticOutputChannel
        )
    }
}

impl fmt::Display for OptionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{}", self.as_str())
    }
}

/// Current option values, seeded with the standard defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionTable {
    values: HashMap<OptionName, SExpr>,
}

impl Default for OptionTable {
    fn default() -> Self {
        let values = [
            (OptionName::PrintSuccess, SExpr::bool(true)),
            (OptionName::ExpandDefinitions, SExpr::bool(false)),
            (OptionName::InteractiveMode, SExpr::bool(false)),
            (OptionName::ProduceProofs, SExpr::bool(false)),
            (OptionName::ProduceUnsatCores, SExpr::bool(false)),
            (OptionName::ProduceModels, SExpr::bool(false)),
            (OptionName::ProduceAssignments, SExpr::bool(false)),
            (OptionName::RegularOutputChannel, SExpr::string("stdout")),
            (OptionName::DiagnosticOutputChannel, SExpr::string("stderr")),
            (OptionName::RandomSeed, SExpr::numeral(0)),
            (OptionName::Verbosity, SExpr::numeral(0)),
        ]
        .into_iter()
        .collect();
        Self { values }
    }
}

impl OptionTable {
    pub fn get(&self, name: &OptionName) -> Option<&SExpr> {
        self.values.get(name)
    }

    pub fn set(&mut self, name: OptionName, value: SExpr) {
        self.values.insert(name, value);
    }

    /// True only when the option is set to the symbol `true`.
    pub fn is_enabled(&self, name: &OptionName) -> bool {
        self.get(name).and_then(SExpr::as_bool) == Some(true)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InfoKeyword {
    Name,
    Authors,
    Version,
    ErrorBehavior,
    ReasonUnknown,
    AllStatistics,
    Other(String),
}

impl InfoKeyword {
    pub fn parse(keyword: &str) -> Self {
        match keyword.strip_prefix(':').unwrap_or(keyword) {
            "name" => InfoKeyword::Name,
            "authors" => InfoKeyword::Authors,
            "version" => InfoKeyword::Version,
            "error-behavior" => InfoKeyword::ErrorBehavior,
            "reason-unknown" => InfoKeyword::ReasonUnknown,
            "all-statistics" => InfoKeyword::AllStatistics,
            other => InfoKeyword::Other(other.to_string()),
        }
    }

    /// Keywords whose values belong to the solver and cannot be set.
    pub fn is_predefined(&self) -> bool {
        !matches!(self, InfoKeyword::Other(_))
    }
}
