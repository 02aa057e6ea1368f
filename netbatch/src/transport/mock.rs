//! Scripted transport for tests.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{Connector, ReadState, ShellChannel};
use crate::credential::Credential;
use crate::error::{AuthFailure, ConnectError, TransmissionError};

/// What the mock does when asked to connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Open,
    Unreachable,
    Reject,
}

/// Observations shared between a connector, its shells and the test.
#[derive(Debug, Default)]
pub(crate) struct MockState {
    pub opens: AtomicUsize,
    pub close_calls: AtomicUsize,
    pub teardowns: AtomicUsize,
    pub sent: Mutex<Vec<String>>,
    pub last_address: Mutex<Option<String>>,
    pub last_user: Mutex<Option<String>>,
}

impl MockState {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub fn teardowns(&self) -> usize {
        self.teardowns.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct MockConnector {
    pub state: Arc<MockState>,
    outcome: Outcome,
    banner: Vec<u8>,
    replies: HashMap<String, Vec<Vec<u8>>>,
    fail_after: Option<usize>,
    silent: bool,
    open_delay: Duration,
}

impl MockConnector {
    pub fn new() -> Self {
        Self {
            state: Arc::new(MockState::default()),
            outcome: Outcome::Open,
            banner: b"\r\nWelcome to router\r\nrouter#".to_vec(),
            replies: HashMap::new(),
            fail_after: None,
            silent: false,
            open_delay: Duration::ZERO,
        }
    }

    pub fn unreachable() -> Self {
        Self {
            outcome: Outcome::Unreachable,
            ..Self::new()
        }
    }

    pub fn rejecting() -> Self {
        Self {
            outcome: Outcome::Reject,
            ..Self::new()
        }
    }

    /// Reply to `command` with these chunks instead of the default echo.
    pub fn with_reply(mut self, command: &str, chunks: &[&str]) -> Self {
        self.replies.insert(
            command.to_string(),
            chunks.iter().map(|c| c.as_bytes().to_vec()).collect(),
        );
        self
    }

    /// Let `n` sends succeed, then fail every later one.
    pub fn fail_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// Take this long to answer `open`, like a host that never responds.
    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = delay;
        self
    }

    /// Never produce output for commands.
    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }
}

impl Connector for MockConnector {
    type Shell = MockShell;

    async fn open(
        &self,
        address: &str,
        credential: Credential,
        timeout: Duration,
    ) -> Result<MockShell, ConnectError> {
        self.state.opens.fetch_add(1, Ordering::SeqCst);
        *self.state.last_address.lock().unwrap() = Some(address.to_string());
        *self.state.last_user.lock().unwrap() = Some(credential.username().to_string());

        if !self.open_delay.is_zero() {
            tokio::time::sleep(self.open_delay).await;
        }

        match self.outcome {
            Outcome::Open => {}
            Outcome::Unreachable => {
                return Err(ConnectError::Timeout {
                    host: address.to_string(),
                    port: 22,
                    timeout,
                });
            }
            Outcome::Reject => {
                return Err(ConnectError::Auth(AuthFailure::Rejected {
                    user: credential.username().to_string(),
                }));
            }
        }

        let mut pending = VecDeque::new();
        if !self.banner.is_empty() {
            pending.push_back(self.banner.clone());
        }

        Ok(MockShell {
            state: self.state.clone(),
            pending,
            replies: self.replies.clone(),
            fail_after: self.fail_after,
            silent: self.silent,
            sends: 0,
            closed: false,
        })
    }
}

#[derive(Debug)]
pub(crate) struct MockShell {
    state: Arc<MockState>,
    pending: VecDeque<Vec<u8>>,
    replies: HashMap<String, Vec<Vec<u8>>>,
    fail_after: Option<usize>,
    silent: bool,
    sends: usize,
    closed: bool,
}

impl ShellChannel for MockShell {
    async fn send(&mut self, data: &[u8]) -> Result<(), TransmissionError> {
        if self.closed || self.fail_after.is_some_and(|n| self.sends >= n) {
            return Err(TransmissionError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "channel closed by remote",
            )));
        }
        self.sends += 1;

        let text = String::from_utf8_lossy(data);
        let command = text.trim_end_matches('\n').to_string();
        self.state.sent.lock().unwrap().push(command.clone());

        if let Some(chunks) = self.replies.get(&command) {
            self.pending.extend(chunks.iter().cloned());
        } else if !self.silent {
            self.pending
                .push_back(format!("{command}\r\noutput of {command}\r\nrouter#").into_bytes());
        }
        Ok(())
    }

    fn try_read(&mut self) -> ReadState {
        match self.pending.pop_front() {
            Some(chunk) => ReadState::Data(chunk),
            None => ReadState::Empty,
        }
    }

    async fn close(&mut self) {
        self.state.close_calls.fetch_add(1, Ordering::SeqCst);
        if !self.closed {
            self.closed = true;
            self.state.teardowns.fetch_add(1, Ordering::SeqCst);
        }
    }
}
