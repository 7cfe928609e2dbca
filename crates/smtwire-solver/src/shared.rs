use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use smtwire_syntax::Command;

use crate::process::ProcessChannel;
use crate::response::Response;
use crate::session::SolverSession;
use crate::transport::Transport;

/// A session that several threads may drive. Commands are serialized by one
/// lock, so each sees the complete reply to its own request.
#[derive(Debug)]
pub struct SharedSession<T: Transport = ProcessChannel> {
    inner: Arc<Mutex<SolverSession<T>>>,
}

impl<T: Transport> Clone for SharedSession<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport> SharedSession<T> {
    pub fn new(session: SolverSession<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    // Session state is consistent between commands, so a panic in another
    // holder does not invalidate it.
    fn lock(&self) -> MutexGuard<'_, SolverSession<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn start(&self) -> Response {
        self.lock().start()
    }

    pub fn execute(&self, cmd: &Command) -> Response {
        self.lock().execute(cmd)
    }

    pub fn exit(&self) -> Response {
        self.lock().exit()
    }

    /// Run `f` with exclusive access to the session.
    pub fn with<R>(&self, f: impl FnOnce(&mut SolverSession<T>) -> R) -> R {
        f(&mut self.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SolverConfig;
    use crate::transport::ScriptedTransport;
    use std::thread;

    #[test]
    fn commands_from_many_threads_are_serialized() {
        let session = SolverSession::with_transport(SolverConfig::default(), ScriptedTransport::new());
        let shared = SharedSession::new(session);
        assert_eq!(shared.start(), Response::Success);
        assert_eq!(
            shared.execute(&Command::SetLogic("QF_UF".into())),
            Response::Success
        );

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let shared = shared.clone();
                thread::spawn(move || {
                    for _ in 0..10 {
                        assert_eq!(shared.execute(&Command::Push(1)), Response::Success);
                        assert_eq!(shared.execute(&Command::Pop(1)), Response::Success);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        shared.with(|s| {
            assert_eq!(s.state().scope_depth(), 1);
            // handshake + set-logic + 80 scope commands
            assert_eq!(s.transport().sent().len(), 82);
        });
    }
}
