//! `netbatch` - run a command file against a device from the catalog.
//!
//! Devices come from `<data-dir>/devices.json`, accounts from
//! `<data-dir>/accounts.json`. Credentials are read from the environment:
//! `NETBATCH_<ACCOUNT>_USERNAME` and `NETBATCH_<ACCOUNT>_SECRET`.
//!
//! ```bash
//! export NETBATCH_OPS_USERNAME=admin NETBATCH_OPS_SECRET=...
//! netbatch run --device core-sw1 --account ops --commands backup.txt
//! ```

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use log::{error, warn};

use netbatch::catalog::{DeviceCatalog, load_accounts};
use netbatch::commands::CommandSource;
use netbatch::credential::{AccountId, EnvResolver};
use netbatch::transport::HostKeyVerification;
use netbatch::{CancellationToken, RunStatus, RunnerBuilder, SshConfig};

/// Run batches of CLI commands against network devices over SSH
#[derive(Parser)]
#[command(name = "netbatch")]
#[command(author, version, about = "Run batches of CLI commands against network devices over SSH")]
struct Cli {
    /// Directory holding devices.json and accounts.json
    #[arg(short = 'D', long, global = true, default_value = "data", env = "NETBATCH_DATA_DIR")]
    data_dir: PathBuf,

    /// Device catalog file (default: <data-dir>/devices.json)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Account list file (default: <data-dir>/accounts.json)
    #[arg(long, global = true)]
    accounts: Option<PathBuf>,

    /// Append log records to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a command file against one device
    Run {
        /// Device name from the catalog
        #[arg(short, long)]
        device: String,

        /// Account whose credential is used
        #[arg(short, long)]
        account: String,

        /// File with one command per line
        #[arg(short, long)]
        commands: PathBuf,

        /// SSH port
        #[arg(short, long, default_value_t = 22)]
        port: u16,

        /// Connect timeout in seconds
        #[arg(short, long, default_value_t = 30)]
        timeout: u64,

        /// Wait after the shell opens, in milliseconds
        #[arg(long, default_value_t = 1000)]
        shell_settle_ms: u64,

        /// Wait after each command before reading output, in milliseconds
        #[arg(long, default_value_t = 500)]
        command_settle_ms: u64,

        /// Host key checking
        #[arg(long, value_enum, default_value = "accept-new")]
        host_key: HostKeyMode,

        /// known_hosts file (default: ~/.ssh/known_hosts)
        #[arg(long)]
        known_hosts: Option<PathBuf>,

        /// Environment variable prefix for credentials
        #[arg(long, default_value = EnvResolver::DEFAULT_PREFIX)]
        credential_prefix: String,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List devices in the catalog
    Devices {
        /// Only devices whose address starts with this prefix
        #[arg(short, long)]
        prefix: Option<String>,
    },

    /// List configured accounts
    Accounts,
}

#[derive(Clone, Copy, ValueEnum)]
enum HostKeyMode {
    Strict,
    AcceptNew,
    Disabled,
}

impl From<HostKeyMode> for HostKeyVerification {
    fn from(mode: HostKeyMode) -> Self {
        match mode {
            HostKeyMode::Strict => HostKeyVerification::Strict,
            HostKeyMode::AcceptNew => HostKeyVerification::AcceptNew,
            HostKeyMode::Disabled => HostKeyVerification::Disabled,
        }
    }
}

const EXIT_PARTIAL: u8 = 1;
const EXIT_NOT_CONNECTED: u8 = 2;
const EXIT_USAGE: u8 = 3;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.log_file.as_deref()) {
        eprintln!("Error: cannot open log file: {e}");
        return ExitCode::from(EXIT_USAGE);
    }

    match execute(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::from(EXIT_USAGE)
        }
    }
}

/// `RUST_LOG` overrides the default `info` filter.
fn init_logging(log_file: Option<&Path>) -> io::Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} {}: {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            record.level(),
            record.args()
        )
    });

    if let Some(path) = log_file {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.init();
    Ok(())
}

async fn execute(cli: Cli) -> Result<ExitCode, netbatch::Error> {
    let catalog_path = cli
        .catalog
        .unwrap_or_else(|| cli.data_dir.join("devices.json"));
    let accounts_path = cli
        .accounts
        .unwrap_or_else(|| cli.data_dir.join("accounts.json"));

    match cli.command {
        Commands::Devices { prefix } => {
            let catalog = DeviceCatalog::load(&catalog_path)?;
            for device in catalog.with_prefix(prefix.as_deref().unwrap_or("")) {
                println!("{}\t{}", device.name, device.address);
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Accounts => {
            for account in load_accounts(&accounts_path)? {
                println!("{}", account);
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Run {
            device,
            account,
            commands,
            port,
            timeout,
            shell_settle_ms,
            command_settle_ms,
            host_key,
            known_hosts,
            credential_prefix,
            json,
        } => {
            let catalog = DeviceCatalog::load(&catalog_path)?;
            let account = AccountId::new(account);
            let known = load_accounts(&accounts_path)?;
            if !known.is_empty() && !known.contains(&account) {
                warn!("account '{}' is not listed in {}", account, accounts_path.display());
            }
            let source = CommandSource::from_path(&commands)?;

            let config = SshConfig {
                port,
                host_key_verification: host_key.into(),
                known_hosts_path: known_hosts,
                ..Default::default()
            };
            let runner = RunnerBuilder::ssh(config, EnvResolver::new(credential_prefix))
                .connect_timeout(Duration::from_secs(timeout))
                .shell_settle(Duration::from_millis(shell_settle_ms))
                .command_settle(Duration::from_millis(command_settle_ms))
                .build()?;

            let cancel = CancellationToken::new();
            let trigger = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupted, cancelling the run");
                    trigger.cancel();
                }
            });

            let report = runner
                .run_named(&catalog, &device, &account, &source, &cancel)
                .await?;

            if json {
                match serde_json::to_string_pretty(&report) {
                    Ok(text) => println!("{}", text),
                    Err(e) => {
                        eprintln!("Error: cannot serialize report: {e}");
                        return Ok(ExitCode::from(EXIT_USAGE));
                    }
                }
            } else {
                print!("{}", report);
            }

            Ok(match report.status() {
                RunStatus::Success => ExitCode::SUCCESS,
                RunStatus::PartialFailure | RunStatus::Connected => ExitCode::from(EXIT_PARTIAL),
                RunStatus::AuthFailed | RunStatus::Unreachable => {
                    ExitCode::from(EXIT_NOT_CONNECTED)
                }
            })
        }
    }
}
