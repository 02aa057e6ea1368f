//! Error types for netbatch.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::driver::RunStatus;

/// Main error type for netbatch operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Caller-supplied input was unusable
    #[error("Invalid input: {0}")]
    Input(#[from] InputError),

    /// The session could not be opened
    #[error("Connect error: {0}")]
    Connect(#[from] ConnectError),

    /// The shell channel failed mid-run
    #[error("Transmission error: {0}")]
    Transmission(#[from] TransmissionError),

    /// Device or account catalog errors
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Credential backend errors
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),
}

/// Input errors, raised before any connection attempt.
#[derive(Error, Debug)]
pub enum InputError {
    /// Target address was empty
    #[error("Target address is empty")]
    EmptyAddress,

    /// Connect timeout was zero
    #[error("Connect timeout must be greater than zero")]
    ZeroTimeout,

    /// The command source held no non-blank lines
    #[error("Command source contains no commands")]
    NoCommands,

    /// Device name not present in the catalog
    #[error("Unknown device '{name}'")]
    UnknownDevice { name: String },

    /// Failed to read the command source
    #[error("Failed to read commands from {path}: {source}")]
    CommandSource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Why authentication did not succeed.
///
/// Only [`AuthFailure::Rejected`] happens after a network attempt; the other
/// two are decided locally by the credential resolver.
#[derive(Error, Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuthFailure {
    /// No credential is configured for the account
    #[error("no credential configured for account '{account}'")]
    MissingCredential { account: String },

    /// The credential backend could not be queried
    #[error("credential backend unavailable for account '{account}': {message}")]
    ResolverUnavailable { account: String, message: String },

    /// The remote end refused the credential
    #[error("remote host rejected credentials for user '{user}'")]
    Rejected { user: String },
}

impl AuthFailure {
    /// Whether the failure was decided without contacting the device.
    pub fn is_local(&self) -> bool {
        !matches!(self, AuthFailure::Rejected { .. })
    }
}

/// Errors while opening a session (transport, authentication, shell).
#[derive(Error, Debug)]
pub enum ConnectError {
    /// Target parameters were invalid
    #[error("{0}")]
    Invalid(#[from] InputError),

    /// TCP connection or name resolution failed
    #[error("Connection failed to {host}:{port}: {source}")]
    Unreachable {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// Connect did not complete in time
    #[error("Connection to {host}:{port} timed out after {timeout:?}")]
    Timeout {
        host: String,
        port: u16,
        timeout: Duration,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Host key not present in known_hosts (strict mode)
    #[error("Host key for {host}:{port} is not in known_hosts")]
    HostKeyUnknown { host: String, port: u16 },

    /// Host key differs from the one recorded in known_hosts
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// known_hosts could not be read
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(AuthFailure),

    /// Failed to open PTY channel
    #[error("Failed to open PTY channel: {0}")]
    PtyOpenFailed(#[source] russh::Error),

    /// Failed to request shell
    #[error("Failed to request shell: {0}")]
    ShellRequestFailed(#[source] russh::Error),
}

impl ConnectError {
    /// Terminal report status for a session that failed to open.
    pub fn status(&self) -> RunStatus {
        match self {
            ConnectError::Auth(_) => RunStatus::AuthFailed,
            _ => RunStatus::Unreachable,
        }
    }

    /// The authentication sub-reason, if this is an authentication failure.
    pub fn auth_failure(&self) -> Option<&AuthFailure> {
        match self {
            ConnectError::Auth(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Shell channel errors after the session is open.
#[derive(Error, Debug)]
pub enum TransmissionError {
    /// Channel was closed by the remote end
    #[error("Channel closed")]
    Closed,

    /// SSH protocol error on the channel
    #[error("Channel SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Device catalog and account list errors.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Failed to read the catalog file
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Catalog file was not valid JSON of the expected shape
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Two devices share a name
    #[error("Duplicate device name '{name}'")]
    DuplicateDevice { name: String },
}

/// Credential backend errors.
#[derive(Error, Debug)]
pub enum CredentialError {
    /// The backend could not be queried
    #[error("Credential backend error: {0}")]
    Backend(String),
}

/// Result type alias using netbatch's Error.
pub type Result<T> = std::result::Result<T, Error>;
