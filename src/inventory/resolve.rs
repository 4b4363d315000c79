use std::path::{Path, PathBuf};

use log::{debug, warn};
use once_cell::sync::OnceCell;

use osutils::sysfs::ScsiGenericNode;
use poolprobe_api::inventory::DiagnosticChannel;

use crate::host::BlockDevices;

/// Where a device reference leads: the physical disk and its diagnostic
/// channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub reference: PathBuf,
    pub disk: PathBuf,
    pub channel: DiagnosticChannel,
}

/// Maps device references to physical disks. Never fails: a reference that
/// cannot be mapped is taken to be a whole disk, and a disk whose channel
/// cannot be found gets none.
pub struct Resolver<'a, H: ?Sized> {
    host: &'a H,
    /// Channel candidates, kept once a scan succeeds.
    channels: OnceCell<Vec<ScsiGenericNode>>,
}

impl<'a, H> Resolver<'a, H>
where
    H: BlockDevices + ?Sized,
{
    pub fn new(host: &'a H) -> Self {
        Self {
            host,
            channels: OnceCell::new(),
        }
    }

    pub fn resolve(&self, reference: &Path) -> Resolution {
        let disk = self.physical_disk(reference);
        let channel = self.channel(&disk);
        debug!(
            "Resolved '{}' to disk '{}' with channel '{}'",
            reference.display(),
            disk.display(),
            channel
        );

        Resolution {
            reference: reference.to_owned(),
            disk,
            channel,
        }
    }

    fn physical_disk(&self, reference: &Path) -> PathBuf {
        match self.host.parent_disk(reference) {
            Ok(Some(disk)) => disk,
            Ok(None) => reference.to_owned(),
            Err(e) => {
                debug!("Treating '{}' as a whole disk: {e:?}", reference.display());
                reference.to_owned()
            }
        }
    }

    /// Finds the channel attached to the same kernel device as `disk`. With
    /// several matches the lowest numbered channel wins.
    pub fn channel(&self, disk: &Path) -> DiagnosticChannel {
        let target = match self.host.device_link(disk) {
            Ok(target) => target,
            Err(e) => {
                debug!("No device link for '{}': {e:?}", disk.display());
                return DiagnosticChannel::NotAvailable;
            }
        };

        let Some(candidates) = self.channel_candidates() else {
            return DiagnosticChannel::NotAvailable;
        };
        let matches: Vec<_> = candidates
            .iter()
            .filter(|node| node.device == target)
            .collect();

        match matches.as_slice() {
            [] => DiagnosticChannel::NotAvailable,
            [only] => DiagnosticChannel::Available(only.dev_path()),
            [first, ..] => {
                warn!(
                    "Disk '{}' matches {} diagnostic channels ({}), using '{}'",
                    disk.display(),
                    matches.len(),
                    matches
                        .iter()
                        .map(|node| node.name.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                    first.name
                );
                DiagnosticChannel::Available(first.dev_path())
            }
        }
    }

    /// A failed scan is not kept, the next disk scans again.
    fn channel_candidates(&self) -> Option<&[ScsiGenericNode]> {
        match self.channels.get_or_try_init(|| self.host.channel_links()) {
            Ok(channels) => Some(channels),
            Err(e) => {
                debug!("No diagnostic channels available: {e:?}");
                None
            }
        }
    }
}
