//! One authenticated interactive shell, used for exactly one run.

use std::time::Duration;

use log::{debug, warn};

use crate::channel::{Drained, drain_available};
use crate::commands::CommandLine;
use crate::credential::Credential;
use crate::error::{ConnectError, InputError, TransmissionError};
use crate::transport::{Connector, ShellChannel};

/// An open shell session.
///
/// Created by [`Session::open`], which waits for the login banner to settle
/// and throws it away, so the first drain only sees command output.
pub struct Session<S: ShellChannel> {
    shell: S,
    address: String,
    closed: bool,
}

impl<S: ShellChannel> Session<S> {
    /// Connect, authenticate, open a shell and discard the banner.
    pub async fn open<C>(
        connector: &C,
        address: &str,
        credential: Credential,
        timeout: Duration,
        shell_settle: Duration,
    ) -> Result<Self, ConnectError>
    where
        C: Connector<Shell = S>,
    {
        let mut session = Self::connect(connector, address, credential, timeout).await?;
        session.settle(shell_settle).await;
        Ok(session)
    }

    /// Connect, authenticate and open a shell, leaving the banner unread.
    pub async fn connect<C>(
        connector: &C,
        address: &str,
        credential: Credential,
        timeout: Duration,
    ) -> Result<Self, ConnectError>
    where
        C: Connector<Shell = S>,
    {
        if address.trim().is_empty() {
            return Err(InputError::EmptyAddress.into());
        }
        if timeout.is_zero() {
            return Err(InputError::ZeroTimeout.into());
        }

        let shell = connector.open(address, credential, timeout).await?;
        Ok(Self {
            shell,
            address: address.to_string(),
            closed: false,
        })
    }

    /// Wait for the login banner to settle, then throw it away.
    pub async fn settle(&mut self, delay: Duration) {
        tokio::time::sleep(delay).await;
        let banner = self.drain();
        debug!("{}: discarded {} banner bytes", self.address, banner.byte_len);
    }

    /// Send one command terminated by a newline, in a single write.
    pub async fn send_line(&mut self, command: &CommandLine) -> Result<(), TransmissionError> {
        if self.closed {
            return Err(TransmissionError::Closed);
        }
        let mut line = Vec::with_capacity(command.as_str().len() + 1);
        line.extend_from_slice(command.as_str().as_bytes());
        line.push(b'\n');
        self.shell.send(&line).await
    }

    /// Collect whatever output is buffered right now.
    pub fn drain(&mut self) -> Drained {
        drain_available(&mut self.shell)
    }

    /// Release the shell and the connection. Safe to call more than once.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.shell.close().await;
        debug!("{}: session closed", self.address);
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

impl<S: ShellChannel> Drop for Session<S> {
    fn drop(&mut self) {
        if !self.closed {
            warn!("session to {} dropped without close", self.address);
        }
    }
}
