//! Diagnostics sink for sent commands, received output and run outcomes.
//!
//! The engine holds no global logging state: every run reports through the
//! sink it was given. [`LogSink`] forwards to the `log` facade, so the
//! embedding application decides where records end up.

use std::sync::{Arc, Mutex};

use log::{info, warn};

use crate::driver::{RunFailure, RunStatus};

/// Log target used by [`LogSink`].
pub const EXCHANGE_TARGET: &str = "netbatch::exchange";

/// Receiver of per-command and per-run diagnostic records.
pub trait DiagnosticsSink: Send + Sync {
    /// A command line was transmitted.
    fn command_sent(&self, device: &str, command: &str);

    /// Output was drained for the last command. `output` may be empty.
    fn output_received(&self, device: &str, output: &str);

    /// The run reached a terminal status.
    fn run_finished(&self, device: &str, status: RunStatus, error: Option<&RunFailure>);
}

impl<T: DiagnosticsSink + ?Sized> DiagnosticsSink for Arc<T> {
    fn command_sent(&self, device: &str, command: &str) {
        (**self).command_sent(device, command)
    }

    fn output_received(&self, device: &str, output: &str) {
        (**self).output_received(device, output)
    }

    fn run_finished(&self, device: &str, status: RunStatus, error: Option<&RunFailure>) {
        (**self).run_finished(device, status, error)
    }
}

/// Writes records through `log` under [`EXCHANGE_TARGET`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl DiagnosticsSink for LogSink {
    fn command_sent(&self, device: &str, command: &str) {
        info!(target: EXCHANGE_TARGET, "[{}] >>> {}", device, command);
    }

    fn output_received(&self, device: &str, output: &str) {
        info!(target: EXCHANGE_TARGET, "[{}] {}", device, output.trim());
    }

    fn run_finished(&self, device: &str, status: RunStatus, error: Option<&RunFailure>) {
        match error {
            Some(error) => warn!(target: EXCHANGE_TARGET, "[{}] {}: {}", device, status, error),
            None => info!(target: EXCHANGE_TARGET, "[{}] {}", device, status),
        }
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DiagnosticsSink for NullSink {
    fn command_sent(&self, _device: &str, _command: &str) {}

    fn output_received(&self, _device: &str, _output: &str) {}

    fn run_finished(&self, _device: &str, _status: RunStatus, _error: Option<&RunFailure>) {}
}

/// A diagnostic record as captured by [`MemorySink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticRecord {
    CommandSent {
        device: String,
        command: String,
    },
    OutputReceived {
        device: String,
        output: String,
    },
    RunFinished {
        device: String,
        status: RunStatus,
        error: Option<RunFailure>,
    },
}

/// Collects records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<DiagnosticRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the records so far.
    pub fn records(&self) -> Vec<DiagnosticRecord> {
        self.lock().clone()
    }

    fn push(&self, record: DiagnosticRecord) {
        self.lock().push(record);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<DiagnosticRecord>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DiagnosticsSink for MemorySink {
    fn command_sent(&self, device: &str, command: &str) {
        self.push(DiagnosticRecord::CommandSent {
            device: device.to_string(),
            command: command.to_string(),
        });
    }

    fn output_received(&self, device: &str, output: &str) {
        self.push(DiagnosticRecord::OutputReceived {
            device: device.to_string(),
            output: output.to_string(),
        });
    }

    fn run_finished(&self, device: &str, status: RunStatus, error: Option<&RunFailure>) {
        self.push(DiagnosticRecord::RunFinished {
            device: device.to_string(),
            status,
            error: error.cloned(),
        });
    }
}
