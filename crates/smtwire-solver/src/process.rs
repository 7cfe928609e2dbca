//! Child-process channel with marker-framed replies.
//!
//! Stdout and stderr are drained by two reader threads that forward chunks,
//! in arrival order, over one `mpsc` channel. A listen consumes events until
//! the accumulated stdout ends with the end marker, so a solver that fills
//! its stderr pipe can never stall the reader. Bytes that arrive after the
//! marker are kept for the next listen.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Read, Write};
use std::mem;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::buffer::BufferPool;
use crate::config::SolverConfig;
use crate::transport::{ChannelError, Transport};

const READ_CHUNK: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Out,
    Err,
}

#[derive(Debug)]
enum StreamEvent {
    Data(Stream, Vec<u8>),
    Closed(Stream),
}

/// Wire-level transcript of one process: everything sent, plus every reply
/// prefixed with `OUT: ` or `ERR: `. Flushed after each write.
#[derive(Debug)]
struct DiagnosticLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl DiagnosticLog {
    /// Opens `path` for appending; earlier transcripts are kept.
    fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    fn write(&mut self, text: &str) {
        let result = self
            .writer
            .write_all(text.as_bytes())
            .and_then(|()| self.writer.flush());
        if let Err(e) = result {
            warn!(path = %self.path.display(), error = %e, "failed to write diagnostic log");
        }
    }

    fn reply(&mut self, prefix: &str, text: &str) {
        if text.is_empty() {
            return;
        }
        let mut line = format!("{prefix}{text}");
        if !line.ends_with('\n') {
            line.push('\n');
        }
        self.write(&line);
    }
}

#[derive(Debug)]
struct Running {
    child: Child,
    stdin: Option<ChildStdin>,
    events: Receiver<StreamEvent>,
    pending_out: Vec<u8>,
    pending_err: Vec<u8>,
    stdout_open: bool,
    stderr_open: bool,
    log: Option<DiagnosticLog>,
}

impl Running {
    fn record(&mut self, event: StreamEvent, out: &mut Vec<u8>, err: &mut Vec<u8>) {
        match event {
            StreamEvent::Data(Stream::Out, bytes) => out.extend_from_slice(&bytes),
            StreamEvent::Data(Stream::Err, bytes) => err.extend_from_slice(&bytes),
            StreamEvent::Closed(Stream::Out) => self.stdout_open = false,
            StreamEvent::Closed(Stream::Err) => self.stderr_open = false,
        }
    }
}

/// Owns one solver process and its three standard streams.
#[derive(Debug)]
pub struct ProcessChannel {
    command_line: Vec<String>,
    end_marker: Option<String>,
    log_path: Option<PathBuf>,
    read_timeout: Option<Duration>,
    drain_banner: bool,
    pool: BufferPool,
    running: Option<Running>,
}

impl ProcessChannel {
    /// `command_line[0]` is the executable. An empty marker means "read until
    /// the solver closes stdout".
    pub fn new(command_line: Vec<String>, end_marker: Option<String>) -> Self {
        Self {
            command_line,
            end_marker: end_marker.filter(|m| !m.is_empty()),
            log_path: None,
            read_timeout: None,
            drain_banner: false,
            pool: BufferPool::new(),
            running: None,
        }
    }

    pub fn from_config(config: &SolverConfig) -> Self {
        let mut command_line = vec![config.executable.clone()];
        command_line.extend(config.args.iter().cloned());
        let mut channel = Self::new(command_line, Some(config.end_marker.clone()));
        channel.log_path = config.log_file.clone();
        channel.read_timeout = config.timeout();
        channel
    }

    pub fn with_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Share read buffers with other channels built from the same pool.
    pub fn with_pool(mut self, pool: BufferPool) -> Self {
        self.pool = pool;
        self
    }

    /// Read and discard one framed reply right after spawning.
    pub fn with_banner(mut self) -> Self {
        self.drain_banner = true;
        self
    }

    pub fn command_line(&self) -> &[String] {
        &self.command_line
    }

    pub fn pid(&self) -> Option<u32> {
        self.running.as_ref().map(|r| r.child.id())
    }

    fn spawn(&self) -> Result<Running, ChannelError> {
        let joined = self.command_line.join(" ");
        let (program, args) =
            self.command_line
                .split_first()
                .ok_or_else(|| ChannelError::LaunchFailed {
                    command: joined.clone(),
                    source: io::Error::new(io::ErrorKind::InvalidInput, "empty command line"),
                })?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ChannelError::LaunchFailed {
                command: joined.clone(),
                source,
            })?;

        let stdin = child.stdin.take();
        let rx = match start_readers(&mut child) {
            Ok(rx) => rx,
            Err(e) => {
                warn!(error = %e, "cannot read solver output; stopping it");
                reap(&mut child);
                return Err(e.into());
            }
        };

        let log = self.log_path.as_deref().and_then(|path| {
            DiagnosticLog::open(path)
                .map_err(|e| warn!(path = %path.display(), error = %e, "cannot open diagnostic log"))
                .ok()
        });

        Ok(Running {
            child,
            stdin,
            events: rx,
            pending_out: Vec::new(),
            pending_err: Vec::new(),
            stdout_open: true,
            stderr_open: true,
            log,
        })
    }

    fn write_message(&mut self, fragments: &[&str]) -> Result<(), ChannelError> {
        let running = self.running.as_mut().ok_or(ChannelError::NotStarted)?;
        let message = fragments.concat();
        debug!(message = message.trim_end(), "send");
        if let Some(log) = running.log.as_mut() {
            log.write(&message);
        }
        let stdin = running.stdin.as_mut().ok_or(ChannelError::Closed)?;
        stdin.write_all(message.as_bytes())?;
        stdin.flush()?;
        Ok(())
    }

    fn listen_until_marker(&mut self) -> Result<String, ChannelError> {
        let marker = self.end_marker.clone();
        let timeout = self.read_timeout;
        let deadline = timeout.map(|t| Instant::now() + t);
        let running = self.running.as_mut().ok_or(ChannelError::NotStarted)?;

        let mut out = self.pool.acquire();
        let mut err = self.pool.acquire();
        out.append(&mem::take(&mut running.pending_out));
        err.append(&mem::take(&mut running.pending_err));

        let mut scanned = 0;
        loop {
            if let Some(marker) = marker.as_deref() {
                if let Some(end) = find_marker(&out, marker.as_bytes(), scanned) {
                    running.pending_out = out.split_off(end);
                    break;
                }
                scanned = out.len();
            }
            if !running.stdout_open {
                break;
            }
            let event = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    match running.events.recv_timeout(remaining) {
                        Ok(event) => event,
                        Err(RecvTimeoutError::Timeout) => {
                            running.pending_out = out.to_vec();
                            running.pending_err = err.to_vec();
                            return Err(ChannelError::Timeout(timeout.unwrap_or_default()));
                        }
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                None => match running.events.recv() {
                    Ok(event) => event,
                    Err(_) => break,
                },
            };
            let mut stray = Vec::new();
            running.record(event, &mut stray, &mut err);
            out.append(&stray);
        }

        // Pick up diagnostics that raced the marker; later stdout waits.
        while let Ok(event) = running.events.try_recv() {
            let mut later = Vec::new();
            running.record(event, &mut later, &mut err);
            running.pending_out.extend_from_slice(&later);
        }

        if out.is_empty() && err.is_empty() && !running.stdout_open && marker.is_some() {
            return Err(ChannelError::Closed);
        }

        let out = out.to_string_lossy();
        let err = err.to_string_lossy();
        if let Some(log) = running.log.as_mut() {
            log.reply("OUT: ", &out);
            log.reply("ERR: ", &err);
        }
        if err.is_empty() {
            Ok(out)
        } else {
            debug!(stderr = err.trim_end(), "solver wrote diagnostics");
            Ok(err)
        }
    }
}

impl Transport for ProcessChannel {
    fn start(&mut self) -> Result<(), ChannelError> {
        if self.running.is_some() {
            return Err(ChannelError::AlreadyStarted);
        }
        let running = self.spawn()?;
        info!(command = %self.command_line.join(" "), pid = running.child.id(), "solver started");
        self.running = Some(running);
        if self.drain_banner {
            let banner = self.listen_until_marker()?;
            debug!(banner = banner.trim_end(), "drained startup banner");
        }
        Ok(())
    }

    fn is_started(&self) -> bool {
        self.running.is_some()
    }

    fn send_and_listen(&mut self, fragments: &[&str]) -> Result<String, ChannelError> {
        self.write_message(fragments)?;
        self.listen_until_marker()
    }

    fn send_no_listen(&mut self, fragments: &[&str]) -> Result<(), ChannelError> {
        self.write_message(fragments)
    }

    fn listen(&mut self) -> Result<String, ChannelError> {
        self.listen_until_marker()
    }

    fn exit(&mut self) {
        let Some(mut running) = self.running.take() else {
            return;
        };
        drop(running.stdin.take());
        reap(&mut running.child);
        if let Some(log) = running.log.as_mut() {
            log.write("Exiting solver\n");
        }
    }
}

impl Drop for ProcessChannel {
    fn drop(&mut self) {
        self.exit();
    }
}

/// Kill `child` and wait for it.
fn reap(child: &mut Child) {
    if let Err(e) = child.kill() {
        // Already exited on its own.
        debug!(error = %e, "solver kill");
    }
    match child.wait() {
        Ok(status) => info!(%status, "solver exited"),
        Err(e) => warn!(error = %e, "failed to reap solver"),
    }
}

/// Start one reader thread per output stream of `child`.
fn start_readers(child: &mut Child) -> io::Result<Receiver<StreamEvent>> {
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::other("failed to capture solver stdout"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| io::Error::other("failed to capture solver stderr"))?;
    let (tx, rx) = mpsc::channel();
    spawn_reader(stdout, Stream::Out, tx.clone())?;
    spawn_reader(stderr, Stream::Err, tx)?;
    Ok(rx)
}

fn spawn_reader<R>(mut stream: R, kind: Stream, tx: Sender<StreamEvent>) -> io::Result<()>
where
    R: Read + Send + 'static,
{
    let name = match kind {
        Stream::Out => "smtwire-stdout",
        Stream::Err => "smtwire-stderr",
    };
    thread::Builder::new().name(name.into()).spawn(move || {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send(StreamEvent::Data(kind, chunk[..n].to_vec())).is_err() {
                        return;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
        let _ = tx.send(StreamEvent::Closed(kind));
    })?;
    Ok(())
}

/// End offset of the first occurrence of `marker` that finishes at or after
/// `scanned`. Earlier positions were already checked by a previous call.
fn find_marker(haystack: &[u8], marker: &[u8], scanned: usize) -> Option<usize> {
    if haystack.len() < marker.len() {
        return None;
    }
    let from = scanned.saturating_sub(marker.len() - 1);
    haystack[from..]
        .windows(marker.len())
        .position(|w| w == marker)
        .map(|p| from + p + marker.len())
}
