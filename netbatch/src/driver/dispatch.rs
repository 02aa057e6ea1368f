//! Sequential command dispatch over an open session.

use std::time::{Duration, Instant};

use chrono::Utc;
use log::{debug, warn};
use tokio_util::sync::CancellationToken;

use super::report::{ExchangeRecord, ExecutionReport, ReportBuilder, RunFailure, RunStatus};
use super::session::Session;
use crate::commands::CommandLine;
use crate::diagnostics::DiagnosticsSink;
use crate::transport::ShellChannel;

/// Drives a command sequence through a [`Session`].
///
/// For each command: send it, sleep for the settle interval, drain what the
/// device has produced, record the exchange. Commands never overlap.
pub struct Dispatcher<'a, D: DiagnosticsSink + ?Sized> {
    sink: &'a D,
    command_settle: Duration,
    cancel: CancellationToken,
}

impl<'a, D: DiagnosticsSink + ?Sized> Dispatcher<'a, D> {
    pub fn new(sink: &'a D, command_settle: Duration) -> Self {
        Self {
            sink,
            command_settle,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop before the next command once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run every command and finish the report.
    ///
    /// The report ends as [`RunStatus::Success`] when every command was
    /// transmitted, or [`RunStatus::PartialFailure`] when a send failed or
    /// the run was cancelled; exchanges recorded until then are kept.
    pub async fn run<S, I>(
        &self,
        session: &mut Session<S>,
        commands: I,
        mut report: ReportBuilder,
    ) -> ExecutionReport
    where
        S: ShellChannel,
        I: IntoIterator<Item = CommandLine>,
    {
        report.connected();
        let device = report.device().to_string();

        for command in commands {
            if self.cancel.is_cancelled() {
                let completed = report.exchange_count();
                warn!("{}: cancelled after {} command(s)", device, completed);
                return report.finish(
                    RunStatus::PartialFailure,
                    Some(RunFailure::Cancelled { completed }),
                );
            }

            let timestamp = Utc::now();
            let start = Instant::now();

            if let Err(e) = session.send_line(&command).await {
                warn!("{}: failed to send {:?}: {}", device, command.as_str(), e);
                return report.finish(
                    RunStatus::PartialFailure,
                    Some(RunFailure::Transmission {
                        command: command.to_string(),
                        message: e.to_string(),
                    }),
                );
            }
            self.sink.command_sent(&device, command.as_str());

            tokio::time::sleep(self.command_settle).await;

            let drained = session.drain();
            debug!(
                "{}: {:?} produced {} bytes in {} chunk(s)",
                device,
                command.as_str(),
                drained.byte_len,
                drained.chunks
            );
            self.sink.output_received(&device, &drained.text);

            report.push(ExchangeRecord {
                command: command.to_string(),
                output: drained.text,
                timestamp,
                elapsed: start.elapsed(),
            });
        }

        report.finish(RunStatus::Success, None)
    }
}
