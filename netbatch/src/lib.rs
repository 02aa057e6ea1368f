//! # Netbatch
//!
//! Run a batch of CLI commands against a network device over an SSH
//! interactive shell.
//!
//! A run resolves the account's credential, connects, requests a PTY shell,
//! waits for the login banner to settle and discards it, then sends each
//! command in order. After every command it waits a fixed settle interval
//! and drains whatever output the device has produced. The session is closed
//! on every path and the result comes back as an [`ExecutionReport`].
//!
//! ## Features
//!
//! - Async SSH connections via russh
//! - Distinct unreachable / authentication-failed / partial-failure outcomes
//! - Fixed-delay pacing with drain-what-is-buffered output collection
//! - Pluggable credential resolvers and diagnostics sinks
//! - JSON device catalog with name lookup
//!
//! Output collection does not look for the device prompt. A device that
//! answers slower than the settle interval will have its reply truncated,
//! with the remainder showing up in the next exchange.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use netbatch::catalog::Device;
//! use netbatch::commands::CommandSource;
//! use netbatch::credential::MemoryResolver;
//! use netbatch::transport::SshConfig;
//! use netbatch::{CancellationToken, RunnerBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), netbatch::Error> {
//!     let resolver = MemoryResolver::new().with_account("ops", "admin", "secret");
//!     let runner = RunnerBuilder::ssh(SshConfig::default(), resolver).build()?;
//!
//!     let device = Device::new("core-sw1", "192.168.1.1");
//!     let commands = CommandSource::from("terminal length 0\nshow version\n");
//!
//!     let report = runner
//!         .run(&device, &"ops".into(), &commands, &CancellationToken::new())
//!         .await?;
//!     println!("{}", report);
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod channel;
pub mod commands;
pub mod credential;
pub mod diagnostics;
pub mod driver;
pub mod error;
pub mod transport;

// Re-export main types for convenience
pub use driver::{
    ExchangeRecord, ExecutionReport, RunFailure, RunStatus, Runner, RunnerBuilder, Session, Timing,
};
pub use error::Error;
pub use tokio_util::sync::CancellationToken;
pub use transport::{Connector, ShellChannel, SshConfig, SshConnector};
