//! Builder for creating runners.

use std::time::Duration;

use super::Timing;
use super::runner::Runner;
use crate::credential::CredentialResolver;
use crate::diagnostics::{DiagnosticsSink, LogSink};
use crate::error::{InputError, Result};
use crate::transport::{Connector, SshConfig, SshConnector};

/// Builder for constructing a [`Runner`].
///
/// # Example
///
/// ```rust,no_run
/// use netbatch::credential::EnvResolver;
/// use netbatch::driver::RunnerBuilder;
/// use netbatch::transport::SshConfig;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), netbatch::Error> {
/// let runner = RunnerBuilder::ssh(SshConfig::default(), EnvResolver::default())
///     .connect_timeout(Duration::from_secs(10))
///     .command_settle(Duration::from_millis(800))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct RunnerBuilder<C, R, D = LogSink> {
    connector: C,
    resolver: R,
    sink: D,
    timing: Timing,
    connect_timeout: Duration,
}

impl<C, R> RunnerBuilder<C, R, LogSink> {
    /// Create a builder around a connector and a credential resolver.
    pub fn new(connector: C, resolver: R) -> Self {
        Self {
            connector,
            resolver,
            sink: LogSink,
            timing: Timing::default(),
            connect_timeout: Duration::from_secs(30),
        }
    }
}

impl<R> RunnerBuilder<SshConnector, R, LogSink> {
    /// Create a builder that connects over SSH.
    pub fn ssh(config: SshConfig, resolver: R) -> Self {
        Self::new(SshConnector::new(config), resolver)
    }
}

impl<C, R, D> RunnerBuilder<C, R, D> {
    /// Send diagnostics to `sink` instead of the `log` facade.
    pub fn sink<S>(self, sink: S) -> RunnerBuilder<C, R, S> {
        RunnerBuilder {
            connector: self.connector,
            resolver: self.resolver,
            sink,
            timing: self.timing,
            connect_timeout: self.connect_timeout,
        }
    }

    /// Set the connection timeout (default: 30s).
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set both settle delays at once.
    pub fn timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    /// Set the wait before the login banner is discarded (default: 1s).
    pub fn shell_settle(mut self, delay: Duration) -> Self {
        self.timing.shell_settle = delay;
        self
    }

    /// Set the wait between sending a command and reading its output (default: 500ms).
    pub fn command_settle(mut self, delay: Duration) -> Self {
        self.timing.command_settle = delay;
        self
    }
}

impl<C, R, D> RunnerBuilder<C, R, D>
where
    C: Connector,
    R: CredentialResolver,
    D: DiagnosticsSink,
{
    /// Build the runner.
    ///
    /// Nothing connects until [`Runner::run`] is called.
    pub fn build(self) -> Result<Runner<C, R, D>> {
        if self.connect_timeout.is_zero() {
            return Err(InputError::ZeroTimeout.into());
        }
        Ok(Runner::new(
            self.connector,
            self.resolver,
            self.sink,
            self.timing,
            self.connect_timeout,
        ))
    }
}
