use std::{
    io::{self, IsTerminal},
    process::ExitCode,
    time::Duration,
};

use clap::Parser;
use log::{debug, error, info};

use osutils::dependencies;
use poolprobe::{
    cli::{usage_message, Cli, ProbeExitCode},
    logging, report, Host, Inventory, SystemHost, POOLPROBE_VERSION,
};
use poolprobe_api::{
    config::ProbeConfiguration,
    error::{ProbeError, ProbeResultExt},
    inventory::PoolSelector,
};

fn load_configuration(args: &Cli) -> Result<ProbeConfiguration, ProbeError> {
    let mut config = ProbeConfiguration::load(args.config.as_deref())
        .message("Failed to load configuration")?;
    args.apply_overrides(&mut config);
    config
        .validate()
        .message("Invalid command line overrides")?;
    debug!("Configuration: {config:?}");

    if !dependencies::set_default_timeout(Duration::from_secs(config.command_timeout_seconds)) {
        debug!("Command timeout was already set");
    }

    Ok(config)
}

fn run_inventory<H: Host + ?Sized>(
    inventory: &Inventory<'_, H>,
    selector: &PoolSelector,
    args: &Cli,
) -> Result<(), ProbeError> {
    let snapshot = inventory
        .run(selector)
        .message(format!("Failed to inventory pool selection '{selector}'"))?;

    let color = !args.no_color && io::stdout().is_terminal();
    let rendered =
        report::render(&snapshot, args.format, color).message("Failed to render report")?;
    print!("{rendered}");

    Ok(())
}

fn main() -> ExitCode {
    // Parse args
    let args = Cli::parse();

    if let Err(e) = logging::setup_logging(args.verbosity, args.log_file.as_deref()) {
        eprintln!("Failed to initialize logging: {e:?}");
        return ProbeExitCode::Setup.into();
    }
    info!("poolprobe version: {POOLPROBE_VERSION}");

    let config = match load_configuration(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("{e:?}");
            return ProbeExitCode::from_error(&e).into();
        }
    };

    let host = SystemHost::new(&config);
    let inventory = match Inventory::new(&host, config.workers) {
        Ok(inventory) => inventory,
        Err(e) => {
            error!("{e:?}");
            return ProbeExitCode::from_error(&e).into();
        }
    };

    let Some(selector) = args.selector() else {
        eprint!("{}", usage_message(&inventory.available_pools()));
        return ProbeExitCode::from_outcome(None).into();
    };

    let outcome = run_inventory(&inventory, &selector, &args);
    if let Err(e) = &outcome {
        match e.available_pools() {
            Some(pools) => {
                eprintln!("[ERROR] {e}");
                eprint!("{}", usage_message(pools));
            }
            None => error!("poolprobe failed: {e:?}"),
        }
    }
    ProbeExitCode::from_outcome(Some(&outcome)).into()
}
