//! SSH transport implementation using russh.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, trace, warn};
use russh::client::{self, Handle, Msg};
use russh::keys::PublicKey;
use russh::{Channel, ChannelMsg};

use super::config::{HostKeyVerification, SshConfig};
use super::{Connector, ReadState, ShellChannel, poll_ready};
use crate::credential::Credential;
use crate::error::{AuthFailure, ConnectError, TransmissionError};

/// Opens password-authenticated PTY shells over russh.
#[derive(Debug, Clone, Default)]
pub struct SshConnector {
    config: SshConfig,
}

impl SshConnector {
    pub fn new(config: SshConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SshConfig {
        &self.config
    }

    /// Open a PTY channel and request an interactive shell on it.
    async fn open_shell(&self, session: &Handle<SshHandler>) -> Result<Channel<Msg>, ConnectError> {
        let channel = session
            .channel_open_session()
            .await
            .map_err(ConnectError::PtyOpenFailed)?;

        channel
            .request_pty(
                true,
                "xterm",
                self.config.terminal_width,
                self.config.terminal_height,
                0,
                0,
                &[],
            )
            .await
            .map_err(ConnectError::PtyOpenFailed)?;

        channel
            .request_shell(true)
            .await
            .map_err(ConnectError::ShellRequestFailed)?;

        Ok(channel)
    }
}

impl Connector for SshConnector {
    type Shell = SshShell;

    async fn open(
        &self,
        address: &str,
        credential: Credential,
        timeout: Duration,
    ) -> Result<SshShell, ConnectError> {
        let port = self.config.port;
        let ssh_config = Arc::new(client::Config {
            inactivity_timeout: self.config.inactivity_timeout,
            ..Default::default()
        });

        let host_key_error: Arc<Mutex<Option<ConnectError>>> = Arc::new(Mutex::new(None));

        let handler = SshHandler {
            host: address.to_string(),
            port,
            host_key_verification: self.config.host_key_verification.clone(),
            known_hosts_path: self.config.known_hosts_path.clone(),
            host_key_error: host_key_error.clone(),
        };

        debug!("connecting to {}", self.config.socket_addr(address));

        let mut session = tokio::time::timeout(
            timeout,
            client::connect(ssh_config, (address, port), handler),
        )
        .await
        .map_err(|_| ConnectError::Timeout {
            host: address.to_string(),
            port,
            timeout,
        })?
        .map_err(|e| {
            // Prefer the detailed host-key error over russh's generic one
            let stored = host_key_error.lock().ok().and_then(|mut slot| slot.take());
            match (stored, e) {
                (Some(hk_err), _) => hk_err,
                (None, russh::Error::IO(source)) => ConnectError::Unreachable {
                    host: address.to_string(),
                    port,
                    source,
                },
                (None, e) => ConnectError::Ssh(e),
            }
        })?;

        let authenticated = session
            .authenticate_password(credential.username(), credential.expose_secret())
            .await;
        let user = credential.username().to_string();
        drop(credential);

        let success = match authenticated {
            Ok(result) => result.success(),
            Err(e) => {
                disconnect(&session).await;
                return Err(ConnectError::Ssh(e));
            }
        };
        if !success {
            disconnect(&session).await;
            return Err(ConnectError::Auth(AuthFailure::Rejected { user }));
        }

        let channel = match self.open_shell(&session).await {
            Ok(channel) => channel,
            Err(e) => {
                disconnect(&session).await;
                return Err(e);
            }
        };

        debug!("shell open on {}", self.config.socket_addr(address));

        Ok(SshShell {
            session,
            channel,
            remote_closed: false,
            closed: false,
        })
    }
}

async fn disconnect(session: &Handle<SshHandler>) {
    if let Err(e) = session
        .disconnect(russh::Disconnect::ByApplication, "", "en")
        .await
    {
        debug!("disconnect failed: {}", e);
    }
}

/// Interactive shell channel over an authenticated russh session.
///
/// Dropping it without calling [`close`](ShellChannel::close) still releases
/// the connection: the russh background task ends with its last handle.
pub struct SshShell {
    session: Handle<SshHandler>,
    channel: Channel<Msg>,
    remote_closed: bool,
    closed: bool,
}

impl SshShell {
    /// Whether the remote end has sent EOF or closed the channel.
    pub fn is_remote_closed(&self) -> bool {
        self.remote_closed
    }
}

impl ShellChannel for SshShell {
    async fn send(&mut self, data: &[u8]) -> Result<(), TransmissionError> {
        if self.closed || self.remote_closed || self.session.is_closed() {
            return Err(TransmissionError::Closed);
        }
        self.channel.data(data).await?;
        Ok(())
    }

    fn try_read(&mut self) -> ReadState {
        if self.remote_closed {
            return ReadState::Closed;
        }
        loop {
            // Poll once: only messages russh has already queued are taken.
            match poll_ready(self.channel.wait()) {
                None => return ReadState::Empty,
                Some(Some(ChannelMsg::Data { data }))
                | Some(Some(ChannelMsg::ExtendedData { data, .. })) => {
                    return ReadState::Data(data.to_vec());
                }
                Some(Some(ChannelMsg::Eof)) | Some(Some(ChannelMsg::Close)) | Some(None) => {
                    self.remote_closed = true;
                    return ReadState::Closed;
                }
                Some(Some(other)) => trace!("ignoring channel message {:?}", other),
            }
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if !self.remote_closed {
            if let Err(e) = self.channel.close().await {
                debug!("channel close failed: {}", e);
            }
        }
        disconnect(&self.session).await;
    }
}

/// SSH client handler for russh.
struct SshHandler {
    host: String,
    port: u16,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    /// Stores a detailed host-key error so connect() can surface it
    /// instead of the generic russh::Error::UnknownKey.
    host_key_error: Arc<Mutex<Option<ConnectError>>>,
}

impl SshHandler {
    /// Check the host key against known_hosts.
    ///
    /// Returns `Ok(true)` if matched, `Ok(false)` if host not found,
    /// `Err(ConnectError::HostKeyChanged)` if key changed.
    fn check_known_hosts(&self, pubkey: &PublicKey) -> Result<bool, ConnectError> {
        let result = if let Some(ref path) = self.known_hosts_path {
            russh::keys::check_known_hosts_path(&self.host, self.port, pubkey, path)
        } else {
            russh::keys::check_known_hosts(&self.host, self.port, pubkey)
        };

        match result {
            Ok(matched) => Ok(matched),
            Err(russh::keys::Error::KeyChanged { line }) => Err(ConnectError::HostKeyChanged {
                host: self.host.clone(),
                port: self.port,
                line,
            }),
            Err(e) => Err(ConnectError::KnownHosts(e.to_string())),
        }
    }

    /// Save a new host key to known_hosts.
    fn learn_host_key(&self, pubkey: &PublicKey) -> Result<(), ConnectError> {
        let result = if let Some(ref path) = self.known_hosts_path {
            russh::keys::known_hosts::learn_known_hosts_path(&self.host, self.port, pubkey, path)
        } else {
            russh::keys::known_hosts::learn_known_hosts(&self.host, self.port, pubkey)
        };

        result.map_err(|e| ConnectError::KnownHosts(e.to_string()))
    }

    fn reject(&self, error: ConnectError) -> bool {
        if let Ok(mut slot) = self.host_key_error.lock() {
            *slot = Some(error);
        }
        false
    }
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(&mut self, server_public_key: &PublicKey) -> Result<bool, Self::Error> {
        let accepted = match self.host_key_verification {
            HostKeyVerification::Disabled => true,

            HostKeyVerification::AcceptNew => match self.check_known_hosts(server_public_key) {
                Ok(true) => true,
                Ok(false) => {
                    if let Err(e) = self.learn_host_key(server_public_key) {
                        warn!("Failed to save host key: {}", e);
                    }
                    true
                }
                Err(e) => self.reject(e),
            },

            HostKeyVerification::Strict => match self.check_known_hosts(server_public_key) {
                Ok(true) => true,
                Ok(false) => self.reject(ConnectError::HostKeyUnknown {
                    host: self.host.clone(),
                    port: self.port,
                }),
                Err(e) => self.reject(e),
            },
        };
        Ok(accepted)
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    use super::*;
    use crate::driver::RunStatus;

    fn connector(port: u16) -> SshConnector {
        SshConnector::new(SshConfig {
            port,
            host_key_verification: HostKeyVerification::Disabled,
            ..Default::default()
        })
    }

    fn credential() -> Credential {
        Credential::new("admin", "x")
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
            drop(socket);
        });

        let err = connector(port)
            .open("127.0.0.1", credential(), Duration::from_millis(100))
            .await
            .err()
            .unwrap();

        assert!(
            matches!(&err, ConnectError::Timeout { port: p, timeout, .. }
                if *p == port && *timeout == Duration::from_millis(100)),
            "unexpected error {:?}",
            err
        );
        assert_eq!(err.status(), RunStatus::Unreachable);
        server.abort();
    }

    #[tokio::test]
    async fn test_refused_port_is_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = connector(port)
            .open("127.0.0.1", credential(), Duration::from_secs(5))
            .await
            .err()
            .unwrap();

        assert!(
            matches!(&err, ConnectError::Unreachable { port: p, .. } if *p == port),
            "unexpected error {:?}",
            err
        );
        assert_eq!(err.status(), RunStatus::Unreachable);
        assert!(err.auth_failure().is_none());
    }

    #[tokio::test]
    async fn test_server_hanging_up_is_not_an_auth_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let _ = socket.write_all(b"SSH-2.0-OpenSSH_9.6\r\n").await;
            let _ = socket.shutdown().await;
        });

        let err = connector(port)
            .open("127.0.0.1", credential(), Duration::from_secs(5))
            .await
            .err()
            .unwrap();

        assert_eq!(err.status(), RunStatus::Unreachable);
        assert!(err.auth_failure().is_none());
        server.await.unwrap();
    }
}
