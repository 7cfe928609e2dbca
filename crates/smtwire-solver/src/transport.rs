//! The seam between a session and the process it drives.

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("failed to launch `{command}`: {source}")]
    LaunchFailed {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("the solver has not been started")]
    NotStarted,
    #[error("the solver has already been started")]
    AlreadyStarted,
    #[error("solver I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("no reply from the solver within {0:?}")]
    Timeout(Duration),
    #[error("the solver closed its output streams")]
    Closed,
}

/// Framed, request-ordered text exchange with a solver.
///
/// Implementations never reorder or pipeline: each `send_and_listen` returns
/// the complete framed reply to the message it sent.
pub trait Transport {
    fn start(&mut self) -> Result<(), ChannelError>;

    fn is_started(&self) -> bool;

    /// Write all fragments as one message, then read one framed reply.
    fn send_and_listen(&mut self, fragments: &[&str]) -> Result<String, ChannelError>;

    /// Write all fragments as one message without waiting for a reply.
    fn send_no_listen(&mut self, fragments: &[&str]) -> Result<(), ChannelError>;

    /// Read the next framed reply without sending anything.
    fn listen(&mut self) -> Result<String, ChannelError>;

    /// Tear the process down. Calling it again is a no-op.
    fn exit(&mut self);
}

#[derive(Debug)]
enum Scripted {
    Text(String),
    Timeout(Duration),
    Io(String),
}

/// In-memory [`Transport`] that records every message and replays canned
/// replies in order. When the script runs dry it answers `success`.
#[derive(Debug)]
pub struct ScriptedTransport {
    replies: VecDeque<Scripted>,
    sent: Vec<String>,
    started: bool,
    fail_start: bool,
    exits: usize,
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            replies: VecDeque::new(),
            sent: Vec::new(),
            started: false,
            fail_start: false,
            exits: 0,
        }
    }

    /// Queue a reply. Replies are consumed by `send_and_listen` and `listen`.
    pub fn reply(mut self, text: impl Into<String>) -> Self {
        self.push_reply(text);
        self
    }

    pub fn push_reply(&mut self, text: impl Into<String>) {
        self.replies.push_back(Scripted::Text(text.into()));
    }

    pub fn reply_timeout(mut self, after: Duration) -> Self {
        self.replies.push_back(Scripted::Timeout(after));
        self
    }

    pub fn reply_io_error(mut self, message: impl Into<String>) -> Self {
        self.replies.push_back(Scripted::Io(message.into()));
        self
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    /// Every message written so far, in order.
    pub fn sent(&self) -> &[String] {
        &self.sent
    }

    pub fn clear_sent(&mut self) {
        self.sent.clear();
    }

    pub fn exit_count(&self) -> usize {
        self.exits
    }

    fn next_reply(&mut self) -> Result<String, ChannelError> {
        match self.replies.pop_front() {
            None => Ok("success\n".to_string()),
            Some(Scripted::Text(text)) => Ok(text),
            Some(Scripted::Timeout(after)) => Err(ChannelError::Timeout(after)),
            Some(Scripted::Io(message)) => Err(ChannelError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                message,
            ))),
        }
    }
}

impl Transport for ScriptedTransport {
    fn start(&mut self) -> Result<(), ChannelError> {
        if self.started {
            return Err(ChannelError::AlreadyStarted);
        }
        if self.fail_start {
            return Err(ChannelError::LaunchFailed {
                command: "scripted".into(),
                source: io::Error::new(io::ErrorKind::NotFound, "no such executable"),
            });
        }
        self.started = true;
        Ok(())
    }

    fn is_started(&self) -> bool {
        self.started
    }

    fn send_and_listen(&mut self, fragments: &[&str]) -> Result<String, ChannelError> {
        self.send_no_listen(fragments)?;
        self.next_reply()
    }

    fn send_no_listen(&mut self, fragments: &[&str]) -> Result<(), ChannelError> {
        if !self.started {
            return Err(ChannelError::NotStarted);
        }
        self.sent.push(fragments.concat());
        Ok(())
    }

    fn listen(&mut self) -> Result<String, ChannelError> {
        if !self.started {
            return Err(ChannelError::NotStarted);
        }
        self.next_reply()
    }

    fn exit(&mut self) {
        if self.started {
            self.started = false;
            self.exits += 1;
        }
    }
}
