#![doc = include_str!("../README.md")]

//! Layers, leaf first:
//!
//! - [`buffer`]: reusable read buffers shared by channels.
//! - [`process`]: the child process and marker-framed replies, behind the
//!   [`Transport`] seam.
//! - [`dialect`]: solver-specific printing of commands and terms.
//! - [`normalize`]: solver text back into a [`Response`].
//! - [`session`]: the protocol state machine.

pub mod buffer;
pub mod config;
pub mod dialect;
pub mod normalize;
pub mod options;
pub mod output;
pub mod process;
pub mod response;
pub mod session;
pub mod shared;
pub mod transport;

pub use buffer::{BufferPool, PooledBuffer};
pub use config::{SolverConfig, SolverIdentity};
pub use dialect::{Dialect, DialectKind, TranslateError};
pub use normalize::normalize;
pub use options::{InfoKeyword, OptionName, OptionTable};
pub use output::{OutputSink, OutputTarget};
pub use process::ProcessChannel;
pub use response::Response;
pub use session::{gate, SessionState, SolverSession, Verdict};
pub use shared::SharedSession;
pub use transport::{ChannelError, ScriptedTransport, Transport};
