use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use log::LevelFilter;

use poolprobe_api::{
    config::ProbeConfiguration,
    error::{ErrorKind, ProbeError},
    inventory::PoolSelector,
};

use crate::{report::OutputFormat, POOLPROBE_VERSION};

pub const USAGE: &str = "Usage: poolprobe <pool-name> | all";

/// Inventory the physical disks behind ZFS pools
#[derive(Parser, Debug)]
#[clap(version = POOLPROBE_VERSION)]
pub struct Cli {
    /// Pool to inventory, or `all` for every pool
    #[arg(index = 1, conflicts_with = "all")]
    pub pool: Option<String>,

    /// Inventory every pool
    #[arg(long)]
    pub all: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Do not highlight shingled (SMR) drives
    #[arg(long)]
    pub no_color: bool,

    /// Configuration file [default: /etc/poolprobe/config.yaml]
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of disks queried in parallel, overrides the configuration
    #[arg(long)]
    pub workers: Option<usize>,

    /// Timeout in seconds of each tool invocation (0 disables), overrides
    /// the configuration
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Also write every log record as JSON lines to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Logging verbosity [OFF, ERROR, WARN, INFO, DEBUG, TRACE]
    #[arg(short, long, default_value_t = LevelFilter::Warn)]
    pub verbosity: LevelFilter,
}

impl Cli {
    /// Pools selected on the command line, `None` when nothing was selected.
    pub fn selector(&self) -> Option<PoolSelector> {
        if self.all {
            return Some(PoolSelector::All);
        }
        self.pool.as_deref().map(PoolSelector::from_argument)
    }

    /// Applies the command line overrides on top of a loaded configuration.
    pub fn apply_overrides(&self, config: &mut ProbeConfiguration) {
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(timeout) = self.timeout {
            config.command_timeout_seconds = timeout;
        }
    }
}

/// Process exit status of poolprobe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeExitCode {
    Success = 0,
    Setup = 1,
    InvalidPool = 2,
    Failure = 3,
}

impl ProbeExitCode {
    /// Exit status for an error, by the category it was raised with.
    pub fn from_error(error: &ProbeError) -> Self {
        match error.kind() {
            ErrorKind::Initialization(_) => Self::Setup,
            ErrorKind::InvalidInput(_) => Self::InvalidPool,
            ErrorKind::Internal(_) => Self::Failure,
        }
    }

    /// Exit status once setup succeeded. `None` means no pool was selected
    /// and only the usage was printed.
    pub fn from_outcome(outcome: Option<&Result<(), ProbeError>>) -> Self {
        match outcome {
            None | Some(Ok(())) => Self::Success,
            Some(Err(e)) => Self::from_error(e),
        }
    }
}

/// Usage line followed by the pools that can be selected.
pub fn usage_message(pools: &[String]) -> String {
    let mut message = format!("{USAGE}\nAvailable pools:\n");
    if pools.is_empty() {
        message.push_str("  (none)\n");
    }
    for pool in pools {
        message.push_str("  ");
        message.push_str(pool);
        message.push('\n');
    }
    message
}

impl From<ProbeExitCode> for ExitCode {
    fn from(value: ProbeExitCode) -> Self {
        ExitCode::from(value as u8)
    }
}
