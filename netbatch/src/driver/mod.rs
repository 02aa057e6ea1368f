//! Run orchestration.
//!
//! A run resolves the credential, opens a [`Session`], pushes the command
//! sequence through a [`Dispatcher`] and always closes the session before
//! handing back the [`ExecutionReport`].

mod builder;
mod dispatch;
mod phase;
mod report;
mod runner;
mod session;

pub use builder::RunnerBuilder;
pub use dispatch::Dispatcher;
pub use phase::RunPhase;
pub use report::{ExchangeRecord, ExecutionReport, ReportBuilder, RunFailure, RunStatus};
pub use runner::Runner;
pub use session::Session;

use std::time::Duration;

/// Fixed pauses that give the device time to produce output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Wait after the shell opens before discarding the banner.
    pub shell_settle: Duration,

    /// Wait after each command before draining its output.
    pub command_settle: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            shell_settle: Duration::from_secs(1),
            command_settle: Duration::from_millis(500),
        }
    }
}
