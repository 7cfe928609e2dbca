use clap::ValueEnum;
use miette::{IntoDiagnostic, WrapErr};
use serde_json::json;
use smtwire_solver::{Response, SolverSession, Transport};
use smtwire_syntax::{Command, ScriptReader};
use tracing::debug;

const INVALID_COMMAND: &str = "A command is not valid. Please check the syntax and try again.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// One command and its response as printed on the regular output.
pub(crate) fn render(cmd: &Command, response: &Response, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format!("{cmd}\n{response}"),
        OutputFormat::Json => json!({
            "command": cmd.to_string(),
            "response": response,
        })
        .to_string(),
    }
}

/// Execute every command of `source` in order. A malformed command stops the
/// run; the solver is told to exit either way.
pub(crate) fn run_script<T: Transport>(
    session: &mut SolverSession<T>,
    source: &str,
    filename: &str,
    format: OutputFormat,
) -> miette::Result<()> {
    let reader = match ScriptReader::new(source, filename) {
        Ok(reader) => reader,
        Err(e) => {
            session.exit();
            return Err(miette::Report::new(e).wrap_err(INVALID_COMMAND));
        }
    };

    for item in reader {
        let (cmd, span) = match item {
            Ok(spanned) => (spanned.node, spanned.span),
            Err(e) => {
                session.exit();
                return Err(miette::Report::new(e).wrap_err(INVALID_COMMAND));
            }
        };
        // Errors point at the script command that caused them.
        let response = match session.execute(&cmd) {
            Response::Error {
                message,
                position: None,
            } => Response::error_at(message, span),
            other => other,
        };
        let line = render(&cmd, &response, format);
        session
            .regular_output_mut()
            .write_line(&line)
            .into_diagnostic()
            .wrap_err("Failed to write to the regular output")?;
        if matches!(cmd, Command::Exit) {
            debug!("script issued exit; ignoring the rest");
            return Ok(());
        }
    }

    session.exit();
    Ok(())
}
