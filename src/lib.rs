pub mod cli;
pub mod host;
pub mod inventory;
pub mod logging;
pub mod report;

pub use host::{Host, SystemHost};
pub use inventory::Inventory;

/// Version reported by `--version`, overridable at build time.
pub const POOLPROBE_VERSION: &str = match option_env!("POOLPROBE_VERSION") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};
