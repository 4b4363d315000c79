use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
};

use once_cell::sync::Lazy;
use regex::Regex;

use poolprobe_api::inventory::DeviceState;

static DEVICE_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"/dev/\S+").unwrap());
static DEVICE_STATE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(/dev/\S+)\s+(\w+)").unwrap());

/// Devices named by one pool's status text.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PoolDevices {
    /// Distinct references in first-seen order.
    pub references: Vec<PathBuf>,
    states: HashMap<PathBuf, DeviceState>,
}

impl PoolDevices {
    /// Parses pool status text. Any token starting with `/dev/` is a device
    /// reference; lines starting with a reference followed by a word give that
    /// reference its state.
    pub fn parse(status: &str) -> Self {
        Self {
            references: extract_references(status),
            states: extract_states(status),
        }
    }

    /// State reported for a reference, `Unknown` when no line carried one.
    pub fn state_of(&self, reference: &Path) -> DeviceState {
        self.states
            .get(reference)
            .cloned()
            .unwrap_or(DeviceState::Unknown)
    }
}

fn extract_references(status: &str) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    DEVICE_PATH
        .find_iter(status)
        .map(|found| found.as_str())
        .filter(|reference| seen.insert(*reference))
        .map(PathBuf::from)
        .collect()
}

fn extract_states(status: &str) -> HashMap<PathBuf, DeviceState> {
    status
        .lines()
        .filter_map(|line| DEVICE_STATE_LINE.captures(line))
        .map(|captures| {
            (
                PathBuf::from(&captures[1]),
                DeviceState::from_token(&captures[2]),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATUS: &str = indoc::indoc! {r#"
          pool: tank
         state: DEGRADED
        status: One or more devices could not be used because the label is missing or
                invalid.  Sufficient replicas exist for the pool to continue
                functioning in a degraded state.
        action: Replace the device using 'zpool replace'.
           see: https://openzfs.github.io/openzfs-docs/msg/ZFS-8000-4J
          scan: scrub repaired 0B in 05:12:33 with 0 errors on Sun Oct 11 05:36:34 2026
        config:

                NAME                                          STATE     READ WRITE CKSUM
                tank                                          DEGRADED     0     0     0
                  raidz2-0                                    DEGRADED     0     0     0
                    /dev/disk/by-partuuid/3f1c2a4e-01         ONLINE       0     0     0
                    /dev/sdb1                                 ONLINE       0     0     0
                    /dev/sdc1                                 FAULTED      3   112     0  too many errors
                    /dev/sdd1                                 ONLINE       0     0     0
                logs
                  /dev/nvme0n1p1                              ONLINE       0     0     0
                spares
                  /dev/sde1                                   AVAIL

        errors: No known data errors; last replaced /dev/sdb1
    "#};

    #[test]
    fn test_references_in_first_seen_order() {
        let devices = PoolDevices::parse(STATUS);
        assert_eq!(
            devices.references,
            vec![
                PathBuf::from("/dev/disk/by-partuuid/3f1c2a4e-01"),
                PathBuf::from("/dev/sdb1"),
                PathBuf::from("/dev/sdc1"),
                PathBuf::from("/dev/sdd1"),
                PathBuf::from("/dev/nvme0n1p1"),
                PathBuf::from("/dev/sde1"),
            ]
        );
    }

    #[test]
    fn test_states() {
        let devices = PoolDevices::parse(STATUS);
        let state = |reference: &str| devices.state_of(Path::new(reference));
        assert_eq!(state("/dev/sdb1"), DeviceState::Online);
        assert_eq!(state("/dev/sdc1"), DeviceState::Faulted);
        assert_eq!(state("/dev/sde1"), DeviceState::Avail);
        assert_eq!(state("/dev/sdz1"), DeviceState::Unknown);
    }

    #[test]
    fn test_reference_without_state_line() {
        let devices = PoolDevices::parse("resilvering onto /dev/sdf1 (50% done)\n");
        assert_eq!(devices.references, vec![PathBuf::from("/dev/sdf1")]);
        let state = devices.state_of(Path::new("/dev/sdf1"));
        assert_eq!(state, DeviceState::Unknown);
    }

    #[test]
    fn test_empty_status() {
        let devices = PoolDevices::parse("");
        assert!(devices.references.is_empty());
        assert_eq!(devices, PoolDevices::default());
    }
}
