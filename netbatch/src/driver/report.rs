//! Execution report for one run.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::catalog::Device;
use crate::error::{AuthFailure, ConnectError};

/// Status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Session is open and commands are being dispatched.
    Connected,

    /// Credential missing locally or rejected by the device.
    AuthFailed,

    /// The device could not be reached or no shell could be opened.
    Unreachable,

    /// Session opened but dispatch stopped early.
    PartialFailure,

    /// Every command was dispatched.
    Success,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RunStatus::Connected)
    }

    pub fn is_success(self) -> bool {
        matches!(self, RunStatus::Success)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStatus::Connected => "connected",
            RunStatus::AuthFailed => "authentication failed",
            RunStatus::Unreachable => "unreachable",
            RunStatus::PartialFailure => "partial failure",
            RunStatus::Success => "success",
        };
        f.write_str(s)
    }
}

/// Diagnostic attached to a report that did not succeed.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunFailure {
    /// Transport-level failure before the shell was ready
    #[error("device unreachable: {message}")]
    Unreachable { message: String },

    /// Local or remote authentication failure
    #[error("authentication failed: {reason}")]
    AuthFailed { reason: AuthFailure },

    /// The channel failed while sending a command
    #[error("transmission failed sending '{command}': {message}")]
    Transmission { command: String, message: String },

    /// The caller cancelled the run
    #[error("cancelled after {completed} command(s)")]
    Cancelled { completed: usize },
}

impl From<&ConnectError> for RunFailure {
    fn from(error: &ConnectError) -> Self {
        match error {
            ConnectError::Auth(reason) => RunFailure::AuthFailed {
                reason: reason.clone(),
            },
            other => RunFailure::Unreachable {
                message: other.to_string(),
            },
        }
    }
}

impl From<AuthFailure> for RunFailure {
    fn from(reason: AuthFailure) -> Self {
        RunFailure::AuthFailed { reason }
    }
}

/// One command sent and the output collected for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExchangeRecord {
    /// The command line as transmitted, without the newline.
    pub command: String,

    /// Output drained after the settle delay. May be empty.
    pub output: String,

    /// When the command was transmitted.
    pub timestamp: DateTime<Utc>,

    /// Time from transmission to the end of the drain.
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

fn serialize_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// Final outcome of one run against one device.
///
/// Fields are private; a finished report cannot be modified.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    device: String,
    address: String,
    status: RunStatus,
    exchanges: Vec<ExchangeRecord>,
    error: Option<RunFailure>,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
}

impl ExecutionReport {
    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn exchanges(&self) -> &[ExchangeRecord] {
        &self.exchanges
    }

    pub fn error(&self) -> Option<&RunFailure> {
        self.error.as_ref()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

impl fmt::Display for ExecutionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} ({}): {}, {} exchange(s)",
            self.device,
            self.address,
            self.status,
            self.exchanges.len()
        )?;
        if let Some(error) = &self.error {
            writeln!(f, "error: {}", error)?;
        }
        for exchange in &self.exchanges {
            writeln!(f, ">>> {}", exchange.command)?;
            let output = exchange.output.trim();
            if !output.is_empty() {
                writeln!(f, "{}", output)?;
            }
        }
        Ok(())
    }
}

/// A report under construction.
///
/// Created when a run starts. Only the dispatcher appends exchanges;
/// [`finish`](Self::finish) hands out the immutable [`ExecutionReport`].
#[derive(Debug)]
pub struct ReportBuilder {
    device: String,
    address: String,
    status: Option<RunStatus>,
    exchanges: Vec<ExchangeRecord>,
    started_at: DateTime<Utc>,
}

impl ReportBuilder {
    pub fn new(device: &Device) -> Self {
        Self {
            device: device.name.clone(),
            address: device.address.clone(),
            status: None,
            exchanges: Vec::new(),
            started_at: Utc::now(),
        }
    }

    pub(crate) fn connected(&mut self) {
        self.status = Some(RunStatus::Connected);
    }

    pub(crate) fn push(&mut self, record: ExchangeRecord) {
        self.exchanges.push(record);
    }

    /// Current status; `None` until the session has opened.
    pub fn status(&self) -> Option<RunStatus> {
        self.status
    }

    pub fn exchange_count(&self) -> usize {
        self.exchanges.len()
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub(crate) fn finish(self, status: RunStatus, error: Option<RunFailure>) -> ExecutionReport {
        debug_assert!(status.is_terminal());
        ExecutionReport {
            device: self.device,
            address: self.address,
            status,
            exchanges: self.exchanges,
            error,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(command: &str, output: &str) -> ExchangeRecord {
        ExchangeRecord {
            command: command.to_string(),
            output: output.to_string(),
            timestamp: Utc::now(),
            elapsed: Duration::from_millis(512),
        }
    }

    #[test]
    fn test_builder_lifecycle() {
        let mut builder = ReportBuilder::new(&Device::new("core-sw1", "10.0.0.5"));
        assert_eq!(builder.status(), None);

        builder.connected();
        assert_eq!(builder.status(), Some(RunStatus::Connected));

        builder.push(record("show version", "IOS 15.2"));
        let report = builder.finish(RunStatus::Success, None);

        assert_eq!(report.device(), "core-sw1");
        assert_eq!(report.address(), "10.0.0.5");
        assert!(report.is_success());
        assert_eq!(report.exchanges().len(), 1);
        assert!(report.finished_at() >= report.started_at());
    }

    #[test]
    fn test_display() {
        let mut builder = ReportBuilder::new(&Device::new("r1", "10.0.0.1"));
        builder.connected();
        builder.push(record("show clock", "  12:00:00 UTC\r\n"));
        builder.push(record("terminal length 0", ""));
        let report = builder.finish(
            RunStatus::PartialFailure,
            Some(RunFailure::Cancelled { completed: 2 }),
        );

        let text = report.to_string();
        assert!(text.starts_with("r1 (10.0.0.1): partial failure, 2 exchange(s)\n"));
        assert!(text.contains("error: cancelled after 2 command(s)\n"));
        assert!(text.contains(">>> show clock\n12:00:00 UTC\n"));
        assert!(text.ends_with(">>> terminal length 0\n"));
    }

    #[test]
    fn test_serialize() {
        let builder = ReportBuilder::new(&Device::new("r1", "10.0.0.1"));
        let report = builder.finish(
            RunStatus::AuthFailed,
            Some(RunFailure::AuthFailed {
                reason: AuthFailure::MissingCredential {
                    account: "svc-missing".into(),
                },
            }),
        );

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "auth_failed");
        assert_eq!(json["error"]["kind"], "auth_failed");
        assert_eq!(json["error"]["reason"]["kind"], "missing_credential");
        assert_eq!(json["exchanges"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_exchange_elapsed_serialized_as_millis() {
        let json = serde_json::to_value(record("show version", "x")).unwrap();
        assert_eq!(json["elapsed_ms"], 512);

        let mut huge = record("show version", "x");
        huge.elapsed = Duration::MAX;
        let json = serde_json::to_value(huge).unwrap();
        assert_eq!(json["elapsed_ms"], u64::MAX);
    }

    #[test]
    fn test_failure_from_connect_error() {
        let err = ConnectError::Auth(AuthFailure::Rejected { user: "admin".into() });
        assert_eq!(err.status(), RunStatus::AuthFailed);
        assert!(matches!(RunFailure::from(&err), RunFailure::AuthFailed { .. }));

        let err = ConnectError::Timeout {
            host: "192.0.2.1".into(),
            port: 22,
            timeout: Duration::from_secs(5),
        };
        assert_eq!(err.status(), RunStatus::Unreachable);
        assert!(matches!(RunFailure::from(&err), RunFailure::Unreachable { message } if message.contains("192.0.2.1")));
    }
}
