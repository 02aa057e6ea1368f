//! SSH transport layer.
//!
//! A [`Connector`] turns an address and a credential into an authenticated
//! interactive shell ([`ShellChannel`]). The russh implementation lives in
//! [`SshConnector`]; tests substitute a scripted one.

pub mod config;
mod ssh;

#[cfg(test)]
pub(crate) mod mock;

use std::future::Future;
use std::time::Duration;

use futures_util::FutureExt;

pub use config::{HostKeyVerification, SshConfig};
pub use ssh::{SshConnector, SshShell};

use crate::credential::Credential;
use crate::error::{ConnectError, TransmissionError};

/// Result of a non-blocking read on a shell channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadState {
    /// A chunk of output was ready.
    Data(Vec<u8>),

    /// Nothing is buffered right now.
    Empty,

    /// The remote end closed the channel.
    Closed,
}

/// Poll `future` once and return its output if it is already complete.
///
/// Runs outside tokio's cooperative budget: a drain may take hundreds of
/// queued messages without yielding, and a budgeted receive would start
/// reporting `Pending` partway through.
pub(crate) fn poll_ready<F: Future>(future: F) -> Option<F::Output> {
    tokio::task::unconstrained(future).now_or_never()
}

/// Opens authenticated interactive shells.
pub trait Connector: Send + Sync {
    type Shell: ShellChannel;

    /// Connect to `address`, authenticate and request a PTY shell.
    ///
    /// The credential is consumed; implementations drop it as soon as
    /// authentication has completed. On failure every partially acquired
    /// resource is released before returning.
    fn open(
        &self,
        address: &str,
        credential: Credential,
        timeout: Duration,
    ) -> impl Future<Output = Result<Self::Shell, ConnectError>> + Send;
}

/// An open interactive shell channel.
pub trait ShellChannel: Send {
    /// Write all of `data` to the channel.
    fn send(&mut self, data: &[u8]) -> impl Future<Output = Result<(), TransmissionError>> + Send;

    /// Return one already-buffered chunk without waiting.
    fn try_read(&mut self) -> ReadState;

    /// Release the channel and the connection. Idempotent.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}
