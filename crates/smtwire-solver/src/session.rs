//! The solver session: protocol state, command gating, and the exchange of
//! each accepted command with the solver.
//!
//! Every precondition lives in [`gate`]. A command that fails its gate is
//! answered with an error [`Response`] and never reaches the solver.
//! Commands that may change satisfiability clear the last verdict before any
//! I/O, so a failed exchange never leaves a stale verdict behind.

use std::collections::HashMap;
use std::iter;

use smtwire_syntax::{parse_sexprs, Command, Expr, SExpr};
use tracing::{debug, info, warn};

use crate::buffer::BufferPool;
use crate::config::SolverConfig;
use crate::dialect::Dialect;
use crate::normalize::{error_message, leading_errors, normalize, rewrite_legacy_bitvectors, ParenAccumulator};
use crate::options::{InfoKeyword, OptionName, OptionTable};
use crate::output::{OutputSink, OutputTarget};
use crate::process::ProcessChannel;
use crate::response::Response;
use crate::transport::{ChannelError, Transport};

/// Classification of the most recent `check-sat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Sat,
    Unsat,
    Unknown,
}

impl From<Verdict> for Response {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Sat => Response::Sat,
            Verdict::Unsat => Response::Unsat,
            Verdict::Unknown => Response::Unknown,
        }
    }
}

/// Protocol-level state of one live solver.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    logic_set: bool,
    /// Assertion count captured when each open scope was entered. The bottom
    /// entry is the outermost scope and is never popped.
    scope_stack: Vec<usize>,
    assertion_count: usize,
    verdict: Option<Verdict>,
    options: OptionTable,
    info: HashMap<String, SExpr>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            logic_set: false,
            scope_stack: vec![0],
            assertion_count: 0,
            verdict: None,
            options: OptionTable::default(),
            info: HashMap::new(),
        }
    }
}

impl SessionState {
    pub fn logic_set(&self) -> bool {
        self.logic_set
    }

    /// Number of scopes, counting the outermost one.
    pub fn scope_depth(&self) -> usize {
        self.scope_stack.len()
    }

    /// Assertions made in the innermost scope.
    pub fn assertion_count(&self) -> usize {
        self.assertion_count
    }

    pub fn verdict(&self) -> Option<Verdict> {
        self.verdict
    }

    pub fn options(&self) -> &OptionTable {
        &self.options
    }

    pub fn info(&self, keyword: &str) -> Option<&SExpr> {
        self.info.get(keyword.strip_prefix(':').unwrap_or(keyword))
    }

    fn push_scopes(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        self.scope_stack.push(self.assertion_count);
        self.scope_stack.extend(iter::repeat(0).take(n - 1));
        self.assertion_count = 0;
    }

    fn pop_scopes(&mut self, n: usize) {
        for _ in 0..n {
            if let Some(count) = self.scope_stack.pop() {
                self.assertion_count = count;
            }
        }
    }
}

fn article(name: &str) -> &'static str {
    match name.chars().next() {
        Some('a' | 'e' | 'i' | 'o' | 'u') => "an",
        _ => "a",
    }
}

fn requires_logic(cmd: &Command) -> bool {
    matches!(
        cmd,
        Command::DeclareFun { .. }
            | Command::DeclareConst { .. }
            | Command::DefineFun { .. }
            | Command::DeclareSort { .. }
            | Command::DefineSort { .. }
            | Command::Assert(_)
            | Command::CheckSat
            | Command::Push(_)
            | Command::Pop(_)
            | Command::GetAssertions
            | Command::GetModel
            | Command::Eval(_)
    )
}

/// Commands answered without talking to the solver.
fn is_local(cmd: &Command) -> bool {
    matches!(
        cmd,
        Command::GetOption(_)
            | Command::SetInfo { .. }
            | Command::GetInfo(_)
            | Command::Echo(_)
            | Command::Exit
    )
}

fn require_option(state: &SessionState, option: OptionName, cmd: &str) -> Result<(), String> {
    if state.options.is_enabled(&option) {
        Ok(())
    } else {
        Err(format!(
            "The {cmd} command is only valid if {option} has been enabled"
        ))
    }
}

/// Decide whether `cmd` may run in `state`. `Err` carries the message of the
/// error response.
pub fn gate(state: &SessionState, cmd: &Command, relax: bool, started: bool) -> Result<(), String> {
    let name = cmd.name();
    if !started && !is_local(cmd) {
        return Err("The solver has not been started".into());
    }
    if matches!(cmd, Command::Assert(_)) && state.scope_stack.is_empty() {
        return Err("All assertion sets have been popped from the stack".into());
    }
    if requires_logic(cmd) && !state.logic_set {
        return Err(format!(
            "The logic must be set before {} {name} command is issued",
            article(name)
        ));
    }
    let verdict = state.verdict;
    match cmd {
        Command::SetLogic(_) if state.logic_set && !relax => Err("Logic is already set".into()),
        Command::SetOption { keyword, value } => {
            let option = OptionName::parse(keyword);
            if option == OptionName::PrintSuccess && value.as_bool().is_none() {
                return Err(format!(
                    "The value of the {option} option must be 'true' or 'false'"
                ));
            }
            if state.logic_set && option.must_precede_logic() {
                return Err(format!(
                    "The value of the {option} option must be set before the set-logic command"
                ));
            }
            Ok(())
        }
        Command::SetInfo { keyword, .. } if InfoKeyword::parse(keyword).is_predefined() => Err(format!(
            "Setting the value of a pre-defined keyword is not permitted: :{}",
            keyword.strip_prefix(':').unwrap_or(keyword)
        )),
        Command::Pop(n) if *n >= state.scope_depth() => Err(format!(
            "The argument to a pop command is too large: {n} vs. a maximum of {}",
            state.scope_depth() - 1
        )),
        Command::GetAssertions if !relax => {
            require_option(state, OptionName::InteractiveMode, name)
        }
        Command::GetModel | Command::Eval(_) if verdict != Some(Verdict::Sat) => Err(format!(
            "The {name} command is only valid immediately after check-sat returned sat"
        )),
        Command::GetProof | Command::GetUnsatCore => {
            let option = if matches!(cmd, Command::GetProof) {
                OptionName::ProduceProofs
            } else {
                OptionName::ProduceUnsatCores
            };
            require_option(state, option, name)?;
            if verdict != Some(Verdict::Unsat) {
                return Err(format!(
                    "The {name} command is only valid immediately after check-sat returned unsat"
                ));
            }
            Ok(())
        }
        Command::GetAssignment | Command::GetValue(_) => {
            let option = if matches!(cmd, Command::GetValue(_)) {
                OptionName::ProduceModels
            } else {
                OptionName::ProduceAssignments
            };
            require_option(state, option, name)?;
            if !matches!(verdict, Some(Verdict::Sat | Verdict::Unknown)) {
                return Err(format!(
                    "The {name} command is only valid immediately after check-sat returned sat or unknown"
                ));
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// One solver process plus the protocol state that goes with it.
#[derive(Debug)]
pub struct SolverSession<T: Transport = ProcessChannel> {
    config: SolverConfig,
    dialect: Dialect,
    transport: T,
    state: SessionState,
    verbose: u32,
    regular: OutputSink,
    diagnostic: OutputSink,
}

impl SolverSession<ProcessChannel> {
    /// A session over a real child process; nothing is spawned until
    /// [`SolverSession::start`].
    pub fn new(config: SolverConfig) -> Self {
        let channel = ProcessChannel::from_config(&config);
        Self::with_transport(config, channel)
    }

    /// Like [`SolverSession::new`], but reads replies into buffers from
    /// `pool`, which other sessions may share.
    pub fn with_pool(config: SolverConfig, pool: BufferPool) -> Self {
        let channel = ProcessChannel::from_config(&config).with_pool(pool);
        Self::with_transport(config, channel)
    }

    /// Process id of the running solver.
    pub fn pid(&self) -> Option<u32> {
        self.transport.pid()
    }
}

impl<T: Transport> SolverSession<T> {
    pub fn with_transport(config: SolverConfig, transport: T) -> Self {
        Self {
            dialect: config.dialect.dialect(),
            verbose: config.verbose,
            config,
            transport,
            state: SessionState::default(),
            regular: OutputSink::stdout(),
            diagnostic: OutputSink::stderr(),
        }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn is_started(&self) -> bool {
        self.transport.is_started()
    }

    pub fn verbose(&self) -> u32 {
        self.verbose
    }

    /// Where command results go; redirected by `:regular-output-channel`.
    pub fn regular_output_mut(&mut self) -> &mut OutputSink {
        &mut self.regular
    }

    /// Where diagnostics go; redirected by `:diagnostic-output-channel`.
    pub fn diagnostic_output_mut(&mut self) -> &mut OutputSink {
        &mut self.diagnostic
    }

    /// Launch the solver and perform the handshake.
    pub fn start(&mut self) -> Response {
        if self.transport.is_started() {
            return Response::error("The solver has already been started");
        }
        if let Err(e) = self.transport.start() {
            warn!(executable = %self.config.executable, error = %e, "solver failed to start");
            return Response::error(format!(
                "Failed to start process {}: {e}",
                self.config.executable
            ));
        }
        self.reinitialize();
        let handshake = self.handshake();
        if handshake.is_error() {
            return handshake;
        }
        info!(solver = %self.config.identity.name, "session started");
        self.diag(&format!("Started {}", self.config.identity.name));
        Response::Success
    }

    /// Every handshake command is acknowledged before the next one is sent.
    fn handshake(&mut self) -> Response {
        let response = self.exchange("(set-option :print-success true)");
        if response.is_error() {
            return response;
        }
        if self.config.solver_verbosity > 0 {
            let wire = format!("(set-option :verbosity {})", self.config.solver_verbosity);
            let response = self.exchange(&wire);
            if response.is_error() {
                return response;
            }
        }
        Response::Success
    }

    fn reinitialize(&mut self) {
        self.state = SessionState::default();
        self.verbose = self.config.verbose;
        self.regular = OutputSink::stdout();
        self.diagnostic = OutputSink::stderr();
    }

    /// Run one command. Never panics and never returns `Err`: every failure
    /// is an error [`Response`].
    pub fn execute(&mut self, cmd: &Command) -> Response {
        debug!(command = cmd.name(), "execute");
        if let Err(message) = gate(&self.state, cmd, self.config.relax, self.transport.is_started()) {
            debug!(command = cmd.name(), %message, "rejected");
            return Response::error(message);
        }
        match cmd {
            Command::SetLogic(logic) => self.set_logic(cmd, logic),
            Command::SetOption { keyword, value } => self.set_option(cmd, keyword, value),
            Command::GetOption(keyword) => self.get_option(keyword),
            Command::SetInfo { keyword, value } => {
                let key = keyword.strip_prefix(':').unwrap_or(keyword);
                self.state.info.insert(key.to_string(), value.clone());
                Response::Success
            }
            Command::GetInfo(keyword) => self.get_info(keyword),
            Command::DeclareFun { .. }
            | Command::DeclareConst { .. }
            | Command::DefineFun { .. }
            | Command::DeclareSort { .. }
            | Command::DefineSort { .. } => {
                self.state.verdict = None;
                self.forward(cmd)
            }
            Command::Assert(_) => {
                self.state.verdict = None;
                let response = self.forward(cmd);
                if !response.is_error() {
                    self.state.assertion_count += 1;
                }
                response
            }
            Command::CheckSat => self.check_sat(),
            Command::Push(n) => self.push(*n),
            Command::Pop(n) => self.pop(*n),
            Command::GetAssertions => self.get_assertions(),
            Command::GetModel => self.get_model(),
            Command::GetProof
            | Command::GetUnsatCore
            | Command::GetAssignment
            | Command::GetValue(_) => match self.wire_text(cmd) {
                Ok(wire) => match self.accumulate(&wire) {
                    Ok(text) => normalize(&text),
                    Err(response) => response,
                },
                Err(response) => response,
            },
            Command::Eval(_) => self.eval(cmd),
            Command::Echo(text) => Response::string(text.clone()),
            Command::Reset => self.reset(),
            Command::Exit => self.exit(),
        }
    }

    /// Send `(reset)`, re-handshake, and return every state field to its
    /// initial value.
    pub fn reset(&mut self) -> Response {
        if !self.transport.is_started() {
            return Response::error("The solver has not been started");
        }
        let response = self.exchange("(reset)");
        self.reinitialize();
        let handshake = self.handshake();
        if handshake.is_error() {
            return handshake;
        }
        info!("session reset");
        response
    }

    /// Send `(exit)` and tear the process down. Safe to call repeatedly.
    pub fn exit(&mut self) -> Response {
        if !self.transport.is_started() {
            return Response::Success;
        }
        if let Err(e) = self.transport.send_and_listen(&["(exit)", "\n"]) {
            debug!(error = %e, "no reply to exit");
        }
        self.transport.exit();
        info!("session ended");
        self.diag(&format!("Ended {}", self.config.identity.name));
        Response::Success
    }

    fn set_logic(&mut self, cmd: &Command, logic: &str) -> Response {
        self.diag(&format!("#set-logic {logic}"));
        if self.state.logic_set {
            // Relaxed re-set: drop every poppable scope, then open a fresh one.
            self.state.verdict = None;
            let depth = self.state.scope_depth();
            let popped = self.pop(depth.saturating_sub(1));
            if popped.is_error() {
                return popped;
            }
            let pushed = self.push(1);
            if pushed.is_error() {
                return pushed;
            }
        }
        let response = self.forward(cmd);
        if !response.is_error() {
            self.state.logic_set = true;
        }
        response
    }

    fn set_option(&mut self, cmd: &Command, keyword: &str, value: &SExpr) -> Response {
        let option = OptionName::parse(keyword);
        match option {
            OptionName::RegularOutputChannel | OptionName::DiagnosticOutputChannel => {
                let regular = option == OptionName::RegularOutputChannel;
                let name = match value {
                    SExpr::String(s) | SExpr::Symbol(s) => s.as_str(),
                    _ if regular => "stdout",
                    _ => "stderr",
                };
                match OutputSink::open(OutputTarget::from_name(name)) {
                    Ok(sink) if regular => self.regular = sink,
                    Ok(sink) => self.diagnostic = sink,
                    Err(e) => {
                        return Response::error(format!(
                            "Failed to open or write to the {} output: {e}",
                            if regular { "regular" } else { "diagnostic" }
                        ))
                    }
                }
            }
            _ if option.is_local() => {}
            _ => {
                let response = self.forward(cmd);
                if response.is_error() {
                    return response;
                }
                if option == OptionName::Verbosity {
                    self.verbose = value
                        .as_u64()
                        .and_then(|v| u32::try_from(v).ok())
                        .unwrap_or(0);
                }
            }
        }
        self.state.options.set(option, value.clone());
        Response::Success
    }

    fn get_option(&self, keyword: &str) -> Response {
        let option = OptionName::parse(keyword);
        match self.state.options.get(&option) {
            Some(value) => Response::Info {
                keyword: option.as_str().to_string(),
                value: value.clone(),
            },
            None => Response::Unsupported,
        }
    }

    fn get_info(&self, keyword: &str) -> Response {
        let key = keyword.strip_prefix(':').unwrap_or(keyword).to_string();
        let identity = &self.config.identity;
        let value = match InfoKeyword::parse(&key) {
            InfoKeyword::ErrorBehavior => SExpr::symbol("continued-execution"),
            InfoKeyword::Name => SExpr::string(identity.name.as_str()),
            InfoKeyword::Authors => SExpr::string(identity.authors.as_str()),
            InfoKeyword::Version => SExpr::string(identity.version.as_str()),
            InfoKeyword::ReasonUnknown | InfoKeyword::AllStatistics => {
                return Response::Unsupported
            }
            InfoKeyword::Other(other) => match self.state.info.get(&other) {
                Some(value) => value.clone(),
                None => return Response::Unsupported,
            },
        };
        Response::Info { keyword: key, value }
    }

    fn check_sat(&mut self) -> Response {
        self.state.verdict = None;
        let reply = match self.transport.send_and_listen(&["(check-sat)", "\n"]) {
            Ok(reply) => reply,
            Err(e) => return self.channel_failure(e),
        };
        let text = rewrite_legacy_bitvectors(&reply);
        if let Some(message) = error_message(&text) {
            return Response::error(message);
        }
        let verdict = if text.contains("unsat") {
            Verdict::Unsat
        } else if text.contains("sat") {
            Verdict::Sat
        } else {
            Verdict::Unknown
        };
        self.state.verdict = Some(verdict);
        verdict.into()
    }

    fn push(&mut self, n: usize) -> Response {
        self.state.verdict = None;
        if n == 0 {
            return Response::Success;
        }
        let response = self.exchange(&format!("(push {n})"));
        if !response.is_error() {
            self.state.push_scopes(n);
        }
        response
    }

    fn pop(&mut self, n: usize) -> Response {
        if n == 0 {
            return Response::Success;
        }
        self.state.verdict = None;
        let response = self.exchange(&format!("(pop {n})"));
        if !response.is_error() {
            self.state.pop_scopes(n);
        }
        response
    }

    fn get_assertions(&mut self) -> Response {
        let text = match self.accumulate("(get-assertions)") {
            Ok(text) => rewrite_legacy_bitvectors(&text).into_owned(),
            Err(response) => return response,
        };
        if let Some(message) = leading_errors(&text) {
            return Response::error(message);
        }
        if let Ok(items) = parse_sexprs(&text) {
            if let [SExpr::List(terms)] = items.as_slice() {
                if terms.iter().all(|t| Expr::from_sexpr(t).is_ok()) {
                    return Response::Values {
                        items: terms.clone(),
                    };
                }
            }
        }
        warn!(reply = text.trim(), "unexpected get-assertions reply");
        Response::error(format!("Unexpected output from the solver: {}", text.trim()))
    }

    fn get_model(&mut self) -> Response {
        let text = match self.accumulate("(get-model)") {
            Ok(text) => rewrite_legacy_bitvectors(&text).into_owned(),
            Err(response) => return response,
        };
        match leading_errors(&text) {
            Some(message) => Response::error(message),
            None => Response::string(text.trim()),
        }
    }

    /// Evaluation cannot change satisfiability, so the verdict survives.
    fn eval(&mut self, cmd: &Command) -> Response {
        let wire = match self.wire_text(cmd) {
            Ok(wire) => wire,
            Err(response) => return response,
        };
        match self.transport.send_and_listen(&[&wire, "\n"]) {
            Ok(reply) => {
                let text = rewrite_legacy_bitvectors(reply.trim());
                match leading_errors(&text) {
                    Some(message) => Response::error(message),
                    None => Response::string(text.into_owned()),
                }
            }
            Err(e) => self.channel_failure(e),
        }
    }

    fn wire_text(&self, cmd: &Command) -> Result<String, Response> {
        self.dialect.translate_command(cmd).map_err(|e| {
            Response::error(format!("Failed to translate the {} command: {e}", cmd.name()))
        })
    }

    fn forward(&mut self, cmd: &Command) -> Response {
        match self.wire_text(cmd) {
            Ok(wire) => self.exchange(&wire),
            Err(response) => response,
        }
    }

    fn exchange(&mut self, wire: &str) -> Response {
        match self.transport.send_and_listen(&[wire, "\n"]) {
            Ok(reply) => normalize(&reply),
            Err(e) => self.channel_failure(e),
        }
    }

    /// Send `wire`, then keep listening until the reply's parentheses
    /// balance.
    fn accumulate(&mut self, wire: &str) -> Result<String, Response> {
        let mut acc = ParenAccumulator::new();
        let mut balanced = match self.transport.send_and_listen(&[wire, "\n"]) {
            Ok(chunk) => acc.push(&chunk),
            Err(e) => return Err(self.channel_failure(e)),
        };
        while !balanced {
            balanced = match self.transport.listen() {
                Ok(chunk) => acc.push(&chunk),
                Err(e) => return Err(self.channel_failure(e)),
            };
        }
        Ok(acc.into_text())
    }

    fn channel_failure(&mut self, err: ChannelError) -> Response {
        match err {
            ChannelError::Timeout(after) => {
                warn!(timeout = ?after, "solver timed out; terminating it");
                self.transport.exit();
                Response::error(format!(
                    "The solver did not respond within {} seconds and was terminated",
                    after.as_secs()
                ))
            }
            other => {
                warn!(error = %other, "solver exchange failed");
                Response::error(format!("Error communicating with the solver: {other}"))
            }
        }
    }

    fn diag(&mut self, text: &str) {
        if self.verbose == 0 {
            return;
        }
        if let Err(e) = self.diagnostic.write_line(text) {
            warn!(error = %e, "failed to write diagnostic output");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ScriptedTransport;
    use std::time::Duration;

    /// A started session that skipped the handshake, so scripted replies
    /// line up with the commands under test.
    fn session(transport: ScriptedTransport) -> SolverSession<ScriptedTransport> {
        let mut s = SolverSession::with_transport(SolverConfig::default(), transport);
        s.transport_mut().start().unwrap();
        s
    }

    fn logic_set() -> SessionState {
        SessionState {
            logic_set: true,
            ..SessionState::default()
        }
    }

    #[test]
    fn gate_requires_a_started_solver() {
        let state = SessionState::default();
        let err = gate(&state, &Command::CheckSat, false, false).unwrap_err();
        assert_eq!(err, "The solver has not been started");
        assert!(gate(&state, &Command::Echo("hi".into()), false, false).is_ok());
        assert!(gate(&state, &Command::GetInfo("name".into()), false, false).is_ok());
    }

    #[test]
    fn gate_requires_logic_with_articles() {
        let state = SessionState::default();
        let assert = Command::Assert(Expr::symbol("p"));
        assert_eq!(
            gate(&state, &assert, false, true).unwrap_err(),
            "The logic must be set before an assert command is issued"
        );
        assert_eq!(
            gate(&state, &Command::Push(1), false, true).unwrap_err(),
            "The logic must be set before a push command is issued"
        );
    }

    #[test]
    fn gate_rejects_repeated_logic_unless_relaxed() {
        let state = logic_set();
        let cmd = Command::SetLogic("QF_LIA".into());
        assert_eq!(gate(&state, &cmd, false, true).unwrap_err(), "Logic is already set");
        assert!(gate(&state, &cmd, true, true).is_ok());
    }

    #[test]
    fn gate_orders_production_options_before_logic() {
        let cmd = Command::SetOption {
            keyword: "produce-models".into(),
            value: SExpr::bool(true),
        };
        assert!(gate(&SessionState::default(), &cmd, false, true).is_ok());
        assert_eq!(
            gate(&logic_set(), &cmd, false, true).unwrap_err(),
            "The value of the :produce-models option must be set before the set-logic command"
        );
    }

    #[test]
    fn gate_checks_print_success_values() {
        let cmd = Command::SetOption {
            keyword: "print-success".into(),
            value: SExpr::numeral(1),
        };
        assert_eq!(
            gate(&SessionState::default(), &cmd, false, true).unwrap_err(),
            "The value of the :print-success option must be 'true' or 'false'"
        );
    }

    #[test]
    fn gate_names_the_maximum_pop() {
        let mut state = logic_set();
        state.push_scopes(2);
        assert!(gate(&state, &Command::Pop(2), false, true).is_ok());
        assert_eq!(
            gate(&state, &Command::Pop(3), false, true).unwrap_err(),
            "The argument to a pop command is too large: 3 vs. a maximum of 2"
        );
    }

    #[test]
    fn gate_verdict_windows() {
        let mut state = logic_set();
        state.options.set(OptionName::ProduceModels, SExpr::bool(true));
        let get_value = Command::GetValue(vec![Expr::symbol("x")]);
        assert!(gate(&state, &get_value, false, true).is_err());
        state.verdict = Some(Verdict::Unknown);
        assert!(gate(&state, &get_value, false, true).is_ok());
        assert!(gate(&state, &Command::GetModel, false, true).is_err());
        state.verdict = Some(Verdict::Sat);
        assert!(gate(&state, &Command::GetModel, false, true).is_ok());
        assert_eq!(
            gate(&state, &Command::GetProof, false, true).unwrap_err(),
            "The get-proof command is only valid if :produce-proofs has been enabled"
        );
    }

    #[test]
    fn gate_rejects_predefined_info() {
        let cmd = Command::SetInfo {
            keyword: "version".into(),
            value: SExpr::string("9"),
        };
        assert_eq!(
            gate(&SessionState::default(), &cmd, false, false).unwrap_err(),
            "Setting the value of a pre-defined keyword is not permitted: :version"
        );
    }

    #[test]
    fn scope_bookkeeping_restores_counts() {
        let mut state = SessionState::default();
        state.assertion_count = 3;
        state.push_scopes(3);
        assert_eq!(state.scope_stack, vec![0, 3, 0, 0]);
        assert_eq!(state.assertion_count, 0);
        state.assertion_count = 5;
        state.pop_scopes(3);
        assert_eq!(state.scope_depth(), 1);
        assert_eq!(state.assertion_count, 3);
    }

    #[test]
    fn start_performs_the_handshake() {
        let config = SolverConfig {
            solver_verbosity: 2,
            ..SolverConfig::default()
        };
        let mut s = SolverSession::with_transport(config, ScriptedTransport::new());
        assert_eq!(s.start(), Response::Success);
        assert_eq!(
            s.transport().sent(),
            &[
                "(set-option :print-success true)\n".to_string(),
                "(set-option :verbosity 2)\n".to_string(),
            ]
        );
        assert!(s.start().is_error());
    }

    #[test]
    fn failed_launch_is_an_error_response() {
        let mut s = SolverSession::with_transport(
            SolverConfig::z3("missing-z3"),
            ScriptedTransport::new().failing_start(),
        );
        let response = s.start();
        assert!(response.error_message().unwrap().starts_with("Failed to start process missing-z3"));
        assert!(!s.is_started());
    }

    #[test]
    fn solver_errors_do_not_set_logic() {
        let mut s = session(ScriptedTransport::new().reply("(error \"unknown logic\")\n"));
        let r = s.execute(&Command::SetLogic("QF_NOPE".into()));
        assert_eq!(r, Response::error("unknown logic"));
        assert!(!s.state().logic_set());
    }

    #[test]
    fn relaxed_set_logic_resets_scopes() {
        let config = SolverConfig {
            relax: true,
            ..SolverConfig::default()
        };
        let mut s = SolverSession::with_transport(config, ScriptedTransport::new());
        s.start();
        s.execute(&Command::SetLogic("QF_UF".into()));
        s.execute(&Command::Push(2));
        s.transport_mut().clear_sent();
        assert_eq!(s.execute(&Command::SetLogic("QF_LIA".into())), Response::Success);
        assert_eq!(
            s.transport().sent(),
            &[
                "(pop 2)\n".to_string(),
                "(push 1)\n".to_string(),
                "(set-logic QF_LIA)\n".to_string(),
            ]
        );
        assert_eq!(s.state().scope_depth(), 2);
    }

    #[test]
    fn print_success_is_recorded_but_not_sent() {
        let mut s = session(ScriptedTransport::new());
        let r = s.execute(&Command::SetOption {
            keyword: "print-success".into(),
            value: SExpr::bool(false),
        });
        assert_eq!(r, Response::Success);
        assert!(s.transport().sent().is_empty());
        assert_eq!(
            s.execute(&Command::GetOption("print-success".into())),
            Response::Info {
                keyword: "print-success".into(),
                value: SExpr::bool(false),
            }
        );
    }

    #[test]
    fn rejected_option_is_not_recorded() {
        let mut s = session(ScriptedTransport::new().reply("(error \"bad value\")\n"));
        let cmd = Command::SetOption {
            keyword: "produce-models".into(),
            value: SExpr::bool(true),
        };
        assert!(s.execute(&cmd).is_error());
        assert!(!s.state().options().is_enabled(&OptionName::ProduceModels));
    }

    #[test]
    fn verbosity_option_updates_client_verbosity() {
        let mut s = session(ScriptedTransport::new());
        s.execute(&Command::SetOption {
            keyword: "verbosity".into(),
            value: SExpr::numeral(3),
        });
        assert_eq!(s.verbose(), 3);
        assert_eq!(s.transport().sent(), &["(set-option :verbosity 3)\n".to_string()]);
    }

    #[test]
    fn unknown_option_is_unsupported() {
        let s = session(ScriptedTransport::new());
        assert_eq!(s.get_option("smt.mbqi"), Response::Unsupported);
    }

    #[test]
    fn info_answers_locally() {
        let mut s = session(ScriptedTransport::new());
        assert_eq!(
            s.execute(&Command::GetInfo("name".into())),
            Response::Info {
                keyword: "name".into(),
                value: SExpr::string("z3-4.3"),
            }
        );
        assert_eq!(
            s.execute(&Command::GetInfo("error-behavior".into())),
            Response::Info {
                keyword: "error-behavior".into(),
                value: SExpr::symbol("continued-execution"),
            }
        );
        assert_eq!(
            s.execute(&Command::GetInfo("reason-unknown".into())),
            Response::Unsupported
        );
        s.execute(&Command::SetInfo {
            keyword: "source".into(),
            value: SExpr::string("handwritten"),
        });
        assert_eq!(
            s.execute(&Command::GetInfo("source".into())),
            Response::Info {
                keyword: "source".into(),
                value: SExpr::string("handwritten"),
            }
        );
        assert!(s.transport().sent().is_empty());
    }

    #[test]
    fn check_sat_classifies_by_substring() {
        let mut s = session(
            ScriptedTransport::new()
                .reply("success\n")
                .reply("sat\n")
                .reply("unknown\n"),
        );
        s.execute(&Command::SetLogic("QF_UF".into()));
        assert_eq!(s.execute(&Command::CheckSat), Response::Sat);
        assert_eq!(s.state().verdict(), Some(Verdict::Sat));
        assert_eq!(s.execute(&Command::CheckSat), Response::Unknown);
    }

    #[test]
    fn check_sat_error_clears_verdict() {
        let mut s = session(
            ScriptedTransport::new()
                .reply("success\n")
                .reply("sat\n")
                .reply("(error \"solver gave up\")\n"),
        );
        s.execute(&Command::SetLogic("QF_UF".into()));
        s.execute(&Command::CheckSat);
        assert_eq!(s.execute(&Command::CheckSat), Response::error("solver gave up"));
        assert_eq!(s.state().verdict(), None);
    }

    #[test]
    fn failed_assert_still_clears_verdict() {
        let mut s = session(
            ScriptedTransport::new()
                .reply("success\n")
                .reply("sat\n")
                .reply_io_error("broken pipe"),
        );
        s.execute(&Command::SetLogic("QF_UF".into()));
        s.execute(&Command::CheckSat);
        let r = s.execute(&Command::Assert(Expr::symbol("p")));
        assert!(r.error_message().unwrap().contains("broken pipe"));
        assert_eq!(s.state().verdict(), None);
        assert_eq!(s.state().assertion_count(), 0);
    }

    #[test]
    fn push_zero_is_local_and_pop_zero_keeps_verdict() {
        let mut s = session(ScriptedTransport::new().reply("success\n").reply("sat\n"));
        s.execute(&Command::SetLogic("QF_UF".into()));
        s.execute(&Command::CheckSat);
        s.transport_mut().clear_sent();
        assert_eq!(s.execute(&Command::Pop(0)), Response::Success);
        assert_eq!(s.state().verdict(), Some(Verdict::Sat));
        assert_eq!(s.execute(&Command::Push(0)), Response::Success);
        assert_eq!(s.state().verdict(), None);
        assert!(s.transport().sent().is_empty());
    }

    #[test]
    fn model_is_accumulated_across_chunks() {
        let mut s = session(
            ScriptedTransport::new()
                .reply("success\n")
                .reply("sat\n")
                .reply("(model \n")
                .reply("  (define-fun x () (_ BitVec 4) bv10[4])\n")
                .reply(")\n"),
        );
        s.execute(&Command::SetLogic("QF_BV".into()));
        s.execute(&Command::CheckSat);
        assert_eq!(
            s.execute(&Command::GetModel),
            Response::string("(model \n  (define-fun x () (_ BitVec 4) #b1010)\n)")
        );
        assert_eq!(s.state().verdict(), Some(Verdict::Sat));
    }

    #[test]
    fn multi_line_assignment_keeps_replies_in_order() {
        let mut s = session(
            ScriptedTransport::new()
                .reply("success\n")
                .reply("success\n")
                .reply("sat\n")
                .reply("((a true)\n")
                .reply(" (b false))\n")
                .reply("success\n")
                .reply("unknown\n"),
        );
        s.execute(&Command::SetOption {
            keyword: "produce-assignments".into(),
            value: SExpr::bool(true),
        });
        s.execute(&Command::SetLogic("QF_UF".into()));
        s.execute(&Command::CheckSat);
        let assignment = s.execute(&Command::GetAssignment);
        assert_eq!(assignment.to_string(), "((a true) (b false))");
        assert_eq!(s.execute(&Command::Push(1)), Response::Success);
        assert_eq!(s.execute(&Command::CheckSat), Response::Unknown);
    }

    #[test]
    fn multi_line_unsat_core_is_accumulated() {
        let mut s = session(
            ScriptedTransport::new()
                .reply("success\n")
                .reply("success\n")
                .reply("unsat\n")
                .reply("(a1\n")
                .reply(" a2)\n"),
        );
        s.execute(&Command::SetOption {
            keyword: "produce-unsat-cores".into(),
            value: SExpr::bool(true),
        });
        s.execute(&Command::SetLogic("QF_UF".into()));
        s.execute(&Command::CheckSat);
        assert_eq!(
            s.execute(&Command::GetUnsatCore),
            Response::Values {
                items: vec![SExpr::symbol("a1"), SExpr::symbol("a2")],
            }
        );
        assert_eq!(s.transport().sent().len(), 4);
    }

    #[test]
    fn eval_returns_trimmed_text_and_keeps_verdict() {
        let mut s = session(
            ScriptedTransport::new()
                .reply("success\n")
                .reply("sat\n")
                .reply("  42\n"),
        );
        s.execute(&Command::SetLogic("QF_LIA".into()));
        s.execute(&Command::CheckSat);
        let r = s.execute(&Command::Eval(Expr::app("-", vec![Expr::symbol("x"), Expr::symbol("y"), Expr::symbol("z")])));
        assert_eq!(r, Response::string("42"));
        assert_eq!(s.transport().sent().last().unwrap(), "(eval (- (- x y) z))\n");
        assert_eq!(s.state().verdict(), Some(Verdict::Sat));
    }

    #[test]
    fn get_assertions_rejects_non_terms() {
        let config = SolverConfig {
            relax: true,
            ..SolverConfig::default()
        };
        let mut s = SolverSession::with_transport(
            config,
            ScriptedTransport::new()
                .reply("success\n")
                .reply("success\n")
                .reply("((f))\n"),
        );
        s.start();
        s.execute(&Command::SetLogic("QF_UF".into()));
        let r = s.execute(&Command::GetAssertions);
        assert_eq!(r, Response::error("Unexpected output from the solver: ((f))"));
    }

    #[test]
    fn timeout_terminates_the_solver() {
        let mut s = session(
            ScriptedTransport::new()
                .reply("success\n")
                .reply_timeout(Duration::from_secs(5)),
        );
        s.execute(&Command::SetLogic("QF_UF".into()));
        let r = s.execute(&Command::CheckSat);
        assert_eq!(
            r,
            Response::error("The solver did not respond within 5 seconds and was terminated")
        );
        assert!(!s.is_started());
        assert_eq!(
            s.execute(&Command::CheckSat),
            Response::error("The solver has not been started")
        );
    }

    #[test]
    fn reset_reinitializes_and_rehandshakes() {
        let mut s = session(ScriptedTransport::new());
        s.execute(&Command::SetLogic("QF_UF".into()));
        s.execute(&Command::Push(1));
        s.execute(&Command::Assert(Expr::symbol("p")));
        s.transport_mut().clear_sent();
        assert_eq!(s.execute(&Command::Reset), Response::Success);
        assert_eq!(s.state(), &SessionState::default());
        assert_eq!(
            s.transport().sent(),
            &[
                "(reset)\n".to_string(),
                "(set-option :print-success true)\n".to_string(),
            ]
        );
    }

    #[test]
    fn exit_is_idempotent() {
        let mut s = session(ScriptedTransport::new());
        assert_eq!(s.execute(&Command::Exit), Response::Success);
        assert_eq!(s.exit(), Response::Success);
        assert_eq!(s.transport().exit_count(), 1);
        assert_eq!(s.transport().sent(), &["(exit)\n".to_string()]);
        let mut never = SolverSession::with_transport(SolverConfig::default(), ScriptedTransport::new());
        assert_eq!(never.exit(), Response::Success);
    }

    #[test]
    fn echo_is_answered_locally() {
        let mut s = session(ScriptedTransport::new());
        assert_eq!(
            s.execute(&Command::Echo("hello".into())),
            Response::string("hello")
        );
        assert!(s.transport().sent().is_empty());
    }
}
