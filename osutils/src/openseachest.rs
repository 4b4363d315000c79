use std::path::Path;

use anyhow::{Context, Error};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::dependencies::Dependency;

static MANUFACTURE_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Date Of Manufacture.*?(\d{4})").unwrap());
static TERABYTES_WRITTEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Total Bytes Written \(TB\):\s+([0-9.]+)").unwrap());
static POWER_ON_HOURS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Power On Hours:\s+([0-9.]+)").unwrap());

/// Values read from the `openSeaChest_SMART` device information page.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct DeviceInformation {
    pub manufacture_year: Option<i32>,
    pub terabytes_written: Option<f64>,
    pub power_on_hours: Option<u64>,
}

/// Returns the device information page for a SCSI generic channel.
///
/// When `tool` is `None` the binary is looked up in its default locations.
pub fn info(tool: Option<&Path>, channel: impl AsRef<Path>) -> Result<String, Error> {
    let cmd = match tool {
        Some(path) => Dependency::OpenSeaChestSmart.cmd_at(path),
        None => Dependency::OpenSeaChestSmart.cmd(),
    };

    cmd.with_arg("-d")
        .with_arg(channel.as_ref())
        .with_arg("-i")
        .output_and_check()
        .with_context(|| {
            format!(
                "Failed to read device information of '{}'",
                channel.as_ref().display()
            )
        })
}

pub fn parse_info(output: &str) -> DeviceInformation {
    DeviceInformation {
        manufacture_year: MANUFACTURE_YEAR
            .captures(output)
            .and_then(|captures| captures[1].parse().ok()),
        terabytes_written: TERABYTES_WRITTEN
            .captures(output)
            .and_then(|captures| captures[1].parse().ok()),
        // Reported with a fractional part, e.g. `41231.20`.
        power_on_hours: POWER_ON_HOURS
            .captures(output)
            .and_then(|captures| captures[1].parse::<f64>().ok())
            .filter(|hours| hours.is_finite() && *hours >= 0.0)
            .map(|hours| hours.floor() as u64),
    }
}
