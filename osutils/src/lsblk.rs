use std::path::{Path, PathBuf};

use anyhow::{Context, Error};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::dependencies::Dependency;

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct LsBlkOutput {
    pub blockdevices: Vec<ScsiDevice>,
}

/// Entry of the SCSI device listing (`lsblk --scsi`).
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct ScsiDevice {
    /// Kernel name, e.g. `sda`.
    pub name: String,
    pub vendor: Option<String>,
    pub model: Option<String>,
    pub serial: Option<String>,
}

/// Lists SCSI disks with their static identity.
pub fn scsi_devices() -> Result<Vec<ScsiDevice>, Error> {
    let output = Dependency::Lsblk
        .cmd()
        .with_arg("--scsi")
        .with_arg("--json")
        .output_and_check()
        .context("Failed to execute lsblk")?;

    let parsed = parse_scsi_output(&output);
    if parsed.is_err() {
        warn!("lsblk output: {}", output);
    }

    parsed
}

fn parse_scsi_output(output: &str) -> Result<Vec<ScsiDevice>, Error> {
    let parsed: LsBlkOutput =
        serde_json::from_str(output).context("Failed to parse lsblk output")?;

    Ok(parsed
        .blockdevices
        .into_iter()
        .map(|device| ScsiDevice {
            name: device.name,
            vendor: clean(device.vendor),
            model: clean(device.model),
            serial: clean(device.serial),
        })
        .collect())
}

/// lsblk pads vendor strings to the SCSI field width.
fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

/// Returns the whole disk holding the given device, or `None` when the device
/// has no parent (it already is a whole disk).
pub fn parent_disk(device_path: impl AsRef<Path>) -> Result<Option<PathBuf>, Error> {
    let output = Dependency::Lsblk
        .cmd()
        .with_arg("--nodeps")
        .with_arg("--noheadings")
        .with_arg("--output")
        .with_arg("PKNAME")
        .with_arg(device_path.as_ref())
        .output_and_check()
        .with_context(|| {
            format!(
                "Failed to get parent of '{}'",
                device_path.as_ref().display()
            )
        })?;

    Ok(parse_parent_kernel_name(&output))
}

fn parse_parent_kernel_name(output: &str) -> Option<PathBuf> {
    output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|name| Path::new("/dev").join(name))
}

/// Returns the human readable size of a device, e.g. `3.6T`.
pub fn size(device_path: impl AsRef<Path>) -> Result<String, Error> {
    let output = Dependency::Lsblk
        .cmd()
        .with_arg(device_path.as_ref())
        .with_arg("--nodeps")
        .with_arg("--noheadings")
        .with_arg("--output")
        .with_arg("SIZE")
        .output_and_check()
        .with_context(|| format!("Failed to get size of '{}'", device_path.as_ref().display()))?;

    Ok(output.trim().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scsi_output() {
        let output = indoc::indoc!(
            r#"
            {
               "blockdevices": [
                  {
                     "name": "sda",
                     "hctl": "0:0:0:0",
                     "type": "disk",
                     "vendor": "ATA     ",
                     "model": "ST8000DM004-2CX188",
                     "rev": "0001",
                     "serial": "ZCT0ABCD",
                     "tran": "sata"
                  },{
                     "name": "sdb",
                     "hctl": "1:0:0:0",
                     "type": "disk",
                     "vendor": "SEAGATE ",
                     "model": "ST4000NM0023",
                     "rev": "0004",
                     "serial": null,
                     "tran": "sas"
                  },{
                     "name": "sr0",
                     "hctl": "2:0:0:0",
                     "type": "rom",
                     "vendor": "   ",
                     "model": "DVD-ROM",
                     "rev": "1.00",
                     "serial": "",
                     "tran": "sata"
                  }
               ]
            }
            "#
        );

        let devices = parse_scsi_output(output).unwrap();
        assert_eq!(devices.len(), 3);
        assert_eq!(
            devices[0],
            ScsiDevice {
                name: "sda".into(),
                vendor: Some("ATA".into()),
                model: Some("ST8000DM004-2CX188".into()),
                serial: Some("ZCT0ABCD".into()),
            }
        );
        assert_eq!(devices[1].vendor.as_deref(), Some("SEAGATE"));
        assert_eq!(devices[1].serial, None);
        assert_eq!(devices[2].vendor, None);
        assert_eq!(devices[2].serial, None);
    }

    #[test]
    fn test_parse_scsi_output_invalid() {
        parse_scsi_output("not json").unwrap_err();
        parse_scsi_output(r#"{"devices": []}"#).unwrap_err();
    }

    #[test]
    fn test_parse_parent_kernel_name() {
        assert_eq!(
            parse_parent_kernel_name("sdb\n"),
            Some(PathBuf::from("/dev/sdb"))
        );
        assert_eq!(
            parse_parent_kernel_name("\nnvme0n1\n"),
            Some(PathBuf::from("/dev/nvme0n1"))
        );
        assert_eq!(parse_parent_kernel_name("   \n"), None);
        assert_eq!(parse_parent_kernel_name(""), None);
    }
}
