use std::path::Path;

use log::debug;
use once_cell::sync::OnceCell;

use osutils::{
    lsblk::ScsiDevice,
    openseachest::{self, DeviceInformation},
    smartctl,
};
use poolprobe_api::{
    constants::HOURS_PER_YEAR,
    inventory::{AttributeRecord, BytesWritten, ManufactureYear},
};

use crate::host::{BlockDevices, Diagnostics};

use super::resolve::Resolution;

/// What the general diagnostic tool told us about a disk.
#[derive(Debug, Default, Clone, PartialEq)]
struct GeneralReport {
    manufacture_year: Option<i32>,
    power_on_hours: Option<u64>,
    shingled: bool,
}

/// Gathers the attributes of resolved disks from every source and merges
/// them. A failing source only blanks the fields it is responsible for.
pub struct Aggregator<'a, H: ?Sized> {
    host: &'a H,
    current_year: i32,
    /// Static disk listing, kept once a read succeeds.
    listing: OnceCell<Vec<ScsiDevice>>,
}

impl<'a, H> Aggregator<'a, H>
where
    H: BlockDevices + Diagnostics + ?Sized,
{
    pub fn new(host: &'a H, current_year: i32) -> Self {
        Self {
            host,
            current_year,
            listing: OnceCell::new(),
        }
    }

    pub fn aggregate(&self, resolution: &Resolution) -> AttributeRecord {
        let identity = self.identity(&resolution.disk);
        let general = self.general_report(&resolution.disk);
        let extended = self.extended_report(resolution.channel.path());

        // Extended power-on-hours only fill in when the general tool has none.
        let power_on_hours = general.power_on_hours.or(extended.power_on_hours);

        AttributeRecord {
            size: self.size(&resolution.reference),
            vendor: identity.and_then(|device| device.vendor.clone()),
            model: identity.and_then(|device| device.model.clone()),
            serial: identity.and_then(|device| device.serial.clone()),
            manufacture_year: merge_year(
                extended.manufacture_year,
                general.manufacture_year,
                power_on_hours,
                self.current_year,
            ),
            bytes_written: extended
                .terabytes_written
                .map(|terabytes| BytesWritten { terabytes }),
            shingled: general.shingled,
            partition_uuid: self.partition_uuid(&resolution.reference),
        }
    }

    fn identity(&self, disk: &Path) -> Option<&ScsiDevice> {
        let name = disk.file_name()?.to_str()?;
        // A failed listing is not kept, the next disk reads it again.
        let listing = match self.listing.get_or_try_init(|| self.host.disk_listing()) {
            Ok(listing) => listing,
            Err(e) => {
                debug!("Disk listing unavailable for '{}': {e:?}", disk.display());
                return None;
            }
        };

        let found = listing.iter().find(|device| device.name == name);
        if found.is_none() {
            debug!("Disk '{}' is not in the disk listing", disk.display());
        }
        found
    }

    fn size(&self, reference: &Path) -> Option<String> {
        match self.host.size(reference) {
            Ok(size) if !size.is_empty() => Some(size),
            Ok(_) => None,
            Err(e) => {
                debug!("No size for '{}': {e:?}", reference.display());
                None
            }
        }
    }

    fn partition_uuid(&self, reference: &Path) -> Option<String> {
        self.host
            .partition_uuid(reference)
            .unwrap_or_else(|e| {
                debug!("No partition UUID for '{}': {e:?}", reference.display());
                None
            })
    }

    /// Reads the identity section once for both the manufacture year and the
    /// technology marker. The attribute section is only read when no year
    /// was reported.
    fn general_report(&self, disk: &Path) -> GeneralReport {
        let info = match self.host.general_info(disk) {
            Ok(info) => info,
            Err(e) => {
                debug!("General diagnostics failed for '{}': {e:?}", disk.display());
                return GeneralReport::default();
            }
        };

        let manufacture_year = smartctl::parse_manufacture_year(&info);
        let power_on_hours = match manufacture_year {
            Some(_) => None,
            None => smartctl::parse_power_on_hours(&info).or_else(|| {
                self.host
                    .general_attributes(disk)
                    .map_err(|e| {
                        debug!("No attributes for '{}': {e:?}", disk.display());
                    })
                    .ok()
                    .and_then(|attributes| smartctl::parse_power_on_hours(&attributes))
            }),
        };

        GeneralReport {
            manufacture_year,
            power_on_hours,
            shingled: smartctl::is_shingled(&info),
        }
    }

    fn extended_report(&self, channel: Option<&Path>) -> DeviceInformation {
        let Some(channel) = channel else {
            return DeviceInformation::default();
        };

        match self.host.extended_info(channel) {
            Ok(info) => openseachest::parse_info(&info),
            Err(e) => {
                debug!(
                    "Extended diagnostics failed for '{}': {e:?}",
                    channel.display()
                );
                DeviceInformation::default()
            }
        }
    }
}

/// Picks the manufacture year by precedence: extended report, general report,
/// then an estimate from power-on-hours.
pub fn merge_year(
    extended: Option<i32>,
    general: Option<i32>,
    power_on_hours: Option<u64>,
    current_year: i32,
) -> ManufactureYear {
    match extended.or(general) {
        Some(year) => ManufactureYear::Exact(year),
        None => power_on_hours
            .map(|hours| ManufactureYear::Estimated(estimate_year(hours, current_year)))
            .unwrap_or(ManufactureYear::Unknown),
    }
}

/// Assumes the disk has been powered on continuously since it was made.
pub fn estimate_year(power_on_hours: u64, current_year: i32) -> i32 {
    let years = i32::try_from(power_on_hours / HOURS_PER_YEAR).unwrap_or(i32::MAX);
    current_year.saturating_sub(years)
}

#[cfg(test)]
mod tests {
    use super::*;

    use poolprobe_api::inventory::DiagnosticChannel;

    use crate::inventory::testutils::MockHost;

    fn resolution(reference: &str, disk: &str, channel: Option<&str>) -> Resolution {
        Resolution {
            reference: reference.into(),
            disk: disk.into(),
            channel: match channel {
                Some(path) => DiagnosticChannel::Available(path.into()),
                None => DiagnosticChannel::NotAvailable,
            },
        }
    }

    #[test]
    fn test_merge_year() {
        assert_eq!(
            merge_year(Some(2019), Some(2021), Some(17520), 2024),
            ManufactureYear::Exact(2019)
        );
        assert_eq!(
            merge_year(None, Some(2021), Some(17520), 2024),
            ManufactureYear::Exact(2021)
        );
        assert_eq!(
            merge_year(None, None, Some(17520), 2024),
            ManufactureYear::Estimated(2022)
        );
        assert_eq!(merge_year(None, None, None, 2024), ManufactureYear::Unknown);
    }

    #[test]
    fn test_estimate_year() {
        assert_eq!(estimate_year(17520, 2024), 2022);
        assert_eq!(estimate_year(17519, 2024), 2023);
        assert_eq!(estimate_year(0, 2024), 2024);
        assert_eq!(estimate_year(u64::MAX, 2024), 2024 - i32::MAX);
    }

    #[test]
    fn test_extended_year_wins() {
        let host = MockHost::default()
            .with_general_info("/dev/sdb", "Manufactured in week 10 of year 2021\n")
            .with_extended_info(
                "/dev/sg1",
                "Date Of Manufacture: Week 02, 2019\nTotal Bytes Written (TB): 45.50\n",
            );
        let aggregator = Aggregator::new(&host, 2024);

        let record = aggregator.aggregate(&resolution("/dev/sdb1", "/dev/sdb", Some("/dev/sg1")));
        assert_eq!(record.manufacture_year, ManufactureYear::Exact(2019));
        assert_eq!(record.manufacture_year.to_string(), "2019");
        assert_eq!(record.bytes_written, Some(BytesWritten { terabytes: 45.5 }));
    }

    #[test]
    fn test_estimated_from_general_attributes() {
        let host = MockHost::default()
            .with_general_info("/dev/sdb", "Device Model:     WDC WD40EFRX\n")
            .with_general_attributes(
                "/dev/sdb",
                "  9 Power_On_Hours          0x0032   081   081   000    Old_age   Always       -       17520\n",
            );
        let aggregator = Aggregator::new(&host, 2024);

        let record = aggregator.aggregate(&resolution("/dev/sdb", "/dev/sdb", None));
        assert_eq!(record.manufacture_year, ManufactureYear::Estimated(2022));
        assert_eq!(record.manufacture_year.to_string(), "2022 (est.)");
        assert_eq!(record.bytes_written, None);
        assert!(!record.shingled);
    }

    #[test]
    fn test_extended_power_on_hours_fallback() {
        let host = MockHost::default()
            .with_general_info("/dev/sdc", "Device Model:     ST4000NM0023\n")
            .with_extended_info("/dev/sg2", "Power On Hours: 26280.75\n");
        let aggregator = Aggregator::new(&host, 2024);

        let record = aggregator.aggregate(&resolution("/dev/sdc", "/dev/sdc", Some("/dev/sg2")));
        assert_eq!(record.manufacture_year, ManufactureYear::Estimated(2021));
    }

    #[test]
    fn test_general_attributes_skipped_when_year_known() {
        let host = MockHost::default()
            .with_general_info("/dev/sdb", "Manufactured in week 10 of year 2021\n");
        let aggregator = Aggregator::new(&host, 2024);

        aggregator.aggregate(&resolution("/dev/sdb", "/dev/sdb", None));
        assert_eq!(host.calls("general_attributes"), 0);
        assert_eq!(host.calls("extended_info"), 0);
    }

    #[test]
    fn test_partial_record() {
        let host = MockHost::default()
            .with_listing("sda", "ATA", "WDC WD40EFRX", "WD-WCC4E1234567")
            .with_size("/dev/sdb1", "3.6T")
            .with_partition_uuid("/dev/sdb1", "6c8d1f2e-01")
            .with_general_info("/dev/sdb", "Model Family:     Seagate BarraCuda 3.5 (SMR)\n")
            .with_extended_info(
                "/dev/sg1",
                "Date Of Manufacture: Week 02, 2019\nTotal Bytes Written (TB): 12.00\n",
            );
        let aggregator = Aggregator::new(&host, 2024);

        let record = aggregator.aggregate(&resolution("/dev/sdb1", "/dev/sdb", Some("/dev/sg1")));
        assert_eq!(
            record,
            AttributeRecord {
                size: Some("3.6T".into()),
                vendor: None,
                model: None,
                serial: None,
                manufacture_year: ManufactureYear::Exact(2019),
                bytes_written: Some(BytesWritten { terabytes: 12.0 }),
                shingled: true,
                partition_uuid: Some("6c8d1f2e-01".into()),
            }
        );
    }

    #[test]
    fn test_identity_from_listing() {
        let host = MockHost::default()
            .with_listing("sda", "ATA", "WDC WD40EFRX", "WD-WCC4E1234567")
            .with_listing("sdb", "SEAGATE", "ST4000NM0023", "Z1Z0ABCD");
        let aggregator = Aggregator::new(&host, 2024);

        let record = aggregator.aggregate(&resolution("/dev/sdb2", "/dev/sdb", None));
        assert_eq!(record.vendor.as_deref(), Some("SEAGATE"));
        assert_eq!(record.model.as_deref(), Some("ST4000NM0023"));
        assert_eq!(record.serial.as_deref(), Some("Z1Z0ABCD"));
        assert_eq!(record.size, None);
        assert_eq!(record.manufacture_year, ManufactureYear::Unknown);

        aggregator.aggregate(&resolution("/dev/sda", "/dev/sda", None));
        assert_eq!(host.calls("disk_listing"), 1);
    }

    #[test]
    fn test_failed_listing_is_retried() {
        let host = MockHost::default()
            .with_listing("sda", "ATA", "M1", "S1")
            .with_listing("sdb", "ATA", "M2", "S2")
            .with_listing_failures(1);
        let aggregator = Aggregator::new(&host, 2024);

        let first = aggregator.aggregate(&resolution("/dev/sda", "/dev/sda", None));
        assert_eq!(first.model, None);
        assert_eq!(first.serial, None);

        let second = aggregator.aggregate(&resolution("/dev/sdb", "/dev/sdb", None));
        assert_eq!(second.model.as_deref(), Some("M2"));
        assert_eq!(second.serial.as_deref(), Some("S2"));
        assert_eq!(host.calls("disk_listing"), 2);

        let again = aggregator.aggregate(&resolution("/dev/sda", "/dev/sda", None));
        assert_eq!(again.model.as_deref(), Some("M1"));
        assert_eq!(host.calls("disk_listing"), 2);
    }

    #[test]
    fn test_every_source_failing() {
        let host = MockHost::default();
        let aggregator = Aggregator::new(&host, 2024);

        let record = aggregator.aggregate(&resolution("/dev/sdx", "/dev/sdx", Some("/dev/sg9")));
        assert_eq!(record, AttributeRecord::default());
    }
}
