use std::path::Path;

use anyhow::{Context, Error};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::dependencies::Dependency;

/// smartctl reports through a bitmask exit status. Only the two lowest bits
/// (command line did not parse, device could not be opened) mean that the
/// output is unusable; the rest describe the health of the disk.
const FATAL_EXIT_MASK: i32 = 0b11;

static MANUFACTURE_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[Mm]anufacture.*?(\d{4})").unwrap());
static SCSI_POWER_ON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Accumulated power on time, hours:minutes\s+(\d+):").unwrap());
static NVME_POWER_ON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Power On Hours:\s+([\d,]+)").unwrap());
static SHINGLED_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bSMR\b").unwrap());

fn run(device_path: &Path, flag: &str) -> Result<String, Error> {
    let output = Dependency::Smartctl
        .cmd()
        .with_arg(flag)
        .with_arg(device_path)
        .output()
        .context("Failed to execute smartctl")?;

    if usable_status(output.code()) {
        return Ok(output.output());
    }
    output
        .check_output()
        .context("smartctl could not query device")
}

/// Whether the output of a smartctl run that exited with `code` can be
/// parsed. A run killed by a signal has no code and no usable output.
fn usable_status(code: Option<i32>) -> bool {
    code.is_some_and(|code| code & FATAL_EXIT_MASK == 0)
}

/// Returns the identity section (`smartctl -i`) of a device.
pub fn info(device_path: impl AsRef<Path>) -> Result<String, Error> {
    run(device_path.as_ref(), "-i").with_context(|| {
        format!(
            "Failed to read identity of '{}'",
            device_path.as_ref().display()
        )
    })
}

/// Returns the attribute section (`smartctl -A`) of a device.
pub fn attributes(device_path: impl AsRef<Path>) -> Result<String, Error> {
    run(device_path.as_ref(), "-A").with_context(|| {
        format!(
            "Failed to read attributes of '{}'",
            device_path.as_ref().display()
        )
    })
}

/// Extracts the manufacture year, reported by SCSI disks as e.g.
/// `Manufactured in week 48 of year 2018`.
pub fn parse_manufacture_year(output: &str) -> Option<i32> {
    MANUFACTURE_YEAR
        .captures(output)
        .and_then(|captures| captures[1].parse().ok())
}

/// Extracts the power-on-hours counter from ATA, SCSI or NVMe output.
pub fn parse_power_on_hours(output: &str) -> Option<u64> {
    parse_ata_power_on_hours(output)
        .or_else(|| {
            SCSI_POWER_ON
                .captures(output)
                .and_then(|captures| captures[1].parse().ok())
        })
        .or_else(|| {
            NVME_POWER_ON
                .captures(output)
                .and_then(|captures| captures[1].replace(',', "").parse().ok())
        })
}

/// Reads the RAW_VALUE column of the `Power_On_Hours` attribute. Some
/// firmwares append minutes and seconds (`12345h+05m+10.123s`), only the
/// leading hours are kept.
fn parse_ata_power_on_hours(output: &str) -> Option<u64> {
    let line = output
        .lines()
        .find(|line| line.split_whitespace().nth(1) == Some("Power_On_Hours"))?;
    let raw = line.split_whitespace().nth(9)?;
    let digits: String = raw.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Whether the identity section flags the disk as shingled (SMR).
pub fn is_shingled(output: &str) -> bool {
    SHINGLED_MARKER.is_match(output)
}
