//! SSH connection configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Host key verification mode, analogous to OpenSSH's `StrictHostKeyChecking`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HostKeyVerification {
    /// Reject unknown and changed keys. Connection fails if the host
    /// is not already in known_hosts.
    Strict,

    /// Accept and auto-learn unknown keys, but reject changed keys.
    #[default]
    AcceptNew,

    /// Accept all keys without checking. For lab use only.
    Disabled,
}

/// SSH settings shared by every connection a [`SshConnector`](super::SshConnector) makes.
///
/// Target address, credential and connect timeout are supplied per connection.
#[derive(Debug, Clone)]
pub struct SshConfig {
    /// SSH port (default: 22).
    pub port: u16,

    /// Terminal width for PTY.
    pub terminal_width: u32,

    /// Terminal height for PTY.
    pub terminal_height: u32,

    /// Host key verification mode.
    pub host_key_verification: HostKeyVerification,

    /// Path to known_hosts file. `None` uses `~/.ssh/known_hosts`.
    pub known_hosts_path: Option<PathBuf>,

    /// Drop the connection after this much silence. `None` disables it.
    pub inactivity_timeout: Option<Duration>,
}

impl SshConfig {
    /// Get the socket address for connection. IPv6 hosts are bracketed.
    pub fn socket_addr(&self, host: &str) -> String {
        if host.contains(':') && !host.starts_with('[') {
            format!("[{}]:{}", host, self.port)
        } else {
            format!("{}:{}", host, self.port)
        }
    }
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            port: 22,
            terminal_width: 511,
            terminal_height: 24,
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
            inactivity_timeout: Some(Duration::from_secs(300)),
        }
    }
}
