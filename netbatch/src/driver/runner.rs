//! One run: resolve, connect, dispatch, close, report.

use std::time::Duration;

use log::warn;
use tokio_util::sync::CancellationToken;

use super::Timing;
use super::dispatch::Dispatcher;
use super::phase::RunPhase;
use super::report::{ExecutionReport, ReportBuilder, RunFailure, RunStatus};
use super::session::Session;
use crate::catalog::{Device, DeviceCatalog};
use crate::commands::CommandSource;
use crate::credential::{AccountId, CredentialResolver};
use crate::diagnostics::{DiagnosticsSink, LogSink};
use crate::error::{AuthFailure, InputError};
use crate::transport::Connector;

/// Executes command sequences against devices.
///
/// A runner holds no per-run state, so one runner can drive several devices
/// at once; each [`run`](Self::run) owns its own session.
pub struct Runner<C, R, D = LogSink> {
    connector: C,
    resolver: R,
    sink: D,
    timing: Timing,
    connect_timeout: Duration,
}

impl<C, R, D> Runner<C, R, D>
where
    C: Connector,
    R: CredentialResolver,
    D: DiagnosticsSink,
{
    pub(crate) fn new(
        connector: C,
        resolver: R,
        sink: D,
        timing: Timing,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            connector,
            resolver,
            sink,
            timing,
            connect_timeout,
        }
    }

    /// Run `source` against `device` with the credential of `account`.
    ///
    /// Returns `Err` only for unusable input, before anything is resolved or
    /// connected. Every other outcome, including connection and
    /// authentication failures, is an [`ExecutionReport`].
    pub async fn run(
        &self,
        device: &Device,
        account: &AccountId,
        source: &CommandSource,
        cancel: &CancellationToken,
    ) -> Result<ExecutionReport, InputError> {
        if device.address.trim().is_empty() {
            return Err(InputError::EmptyAddress);
        }
        if self.connect_timeout.is_zero() {
            return Err(InputError::ZeroTimeout);
        }
        if source.command_count() == 0 {
            return Err(InputError::NoCommands);
        }

        let mut phase = RunPhase::Idle;
        let report = ReportBuilder::new(device);

        if cancel.is_cancelled() {
            return Ok(self.cancelled(&mut phase, report));
        }

        let credential = match self.resolver.resolve(account).await {
            Ok(Some(credential)) => credential,
            Ok(None) => {
                let reason = AuthFailure::MissingCredential {
                    account: account.to_string(),
                };
                return Ok(self.abort(&mut phase, report, RunStatus::AuthFailed, reason.into()));
            }
            Err(e) => {
                let reason = AuthFailure::ResolverUnavailable {
                    account: account.to_string(),
                    message: e.to_string(),
                };
                return Ok(self.abort(&mut phase, report, RunStatus::AuthFailed, reason.into()));
            }
        };

        phase.advance(RunPhase::Connecting, &device.name);
        // Connect is polled first: a finished connect always yields its session.
        let connected = tokio::select! {
            biased;
            connected = Session::connect(
                &self.connector,
                &device.address,
                credential,
                self.connect_timeout,
            ) => connected,
            _ = cancel.cancelled() => return Ok(self.cancelled(&mut phase, report)),
        };

        let mut session = match connected {
            Ok(session) => session,
            Err(e) => {
                warn!("{}: {}", device.name, e);
                return Ok(self.abort(&mut phase, report, e.status(), RunFailure::from(&e)));
            }
        };
        phase.advance(RunPhase::ShellReady, &device.name);

        // A cancel here is picked up by the dispatcher before the first send.
        tokio::select! {
            _ = session.settle(self.timing.shell_settle) => {}
            _ = cancel.cancelled() => {}
        }
        phase.advance(RunPhase::Dispatching, &device.name);

        let report = Dispatcher::new(&self.sink, self.timing.command_settle)
            .with_cancellation(cancel.clone())
            .run(&mut session, source.commands(), report)
            .await;

        session.close().await;

        phase.advance(report.status().into(), &device.name);
        self.sink
            .run_finished(report.device(), report.status(), report.error());
        Ok(report)
    }

    /// Look the device up by name in `catalog`, then [`run`](Self::run).
    pub async fn run_named(
        &self,
        catalog: &DeviceCatalog,
        device: &str,
        account: &AccountId,
        source: &CommandSource,
        cancel: &CancellationToken,
    ) -> Result<ExecutionReport, InputError> {
        let device = catalog.get(device).ok_or_else(|| InputError::UnknownDevice {
            name: device.to_string(),
        })?;
        self.run(device, account, source, cancel).await
    }

    /// Finish a run that never reached dispatch.
    fn abort(
        &self,
        phase: &mut RunPhase,
        report: ReportBuilder,
        status: RunStatus,
        failure: RunFailure,
    ) -> ExecutionReport {
        phase.advance(status.into(), report.device());
        self.sink.run_finished(report.device(), status, Some(&failure));
        report.finish(status, Some(failure))
    }

    /// Finish a run cancelled before a shell was opened.
    fn cancelled(&self, phase: &mut RunPhase, report: ReportBuilder) -> ExecutionReport {
        warn!("{}: cancelled before connecting", report.device());
        self.abort(
            phase,
            report,
            RunStatus::Unreachable,
            RunFailure::Cancelled { completed: 0 },
        )
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }
}
