//! Regular and diagnostic output channels, redirectable by `set-option`.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    Stderr,
    File(PathBuf),
}

impl OutputTarget {
    /// `"stdout"` and `"stderr"` name the standard streams; anything else is
    /// a file path.
    pub fn from_name(name: &str) -> Self {
        match name {
            "stdout" => OutputTarget::Stdout,
            "stderr" => OutputTarget::Stderr,
            path => OutputTarget::File(PathBuf::from(path)),
        }
    }
}

#[derive(Debug)]
pub struct OutputSink {
    target: OutputTarget,
    file: Option<File>,
}

impl OutputSink {
    pub fn stdout() -> Self {
        Self {
            target: OutputTarget::Stdout,
            file: None,
        }
    }

    pub fn stderr() -> Self {
        Self {
            target: OutputTarget::Stderr,
            file: None,
        }
    }

    /// Files are opened for appending and created when missing.
    pub fn open(target: OutputTarget) -> io::Result<Self> {
        let file = match &target {
            OutputTarget::File(path) => Some(OpenOptions::new().create(true).append(true).open(path)?),
            OutputTarget::Stdout | OutputTarget::Stderr => None,
        };
        Ok(Self { target, file })
    }

    pub fn target(&self) -> &OutputTarget {
        &self.target
    }

    pub fn write_line(&mut self, text: &str) -> io::Result<()> {
        match (&self.target, self.file.as_mut()) {
            (OutputTarget::File(_), Some(file)) => {
                writeln!(file, "{text}")?;
                file.flush()
            }
            (OutputTarget::Stderr, _) => writeln!(io::stderr().lock(), "{text}"),
            _ => {
                let mut out = io::stdout().lock();
                writeln!(out, "{text}")?;
                out.flush()
            }
        }
    }
}
