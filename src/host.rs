//! Collaborators queried while building an inventory, and their
//! implementation on top of the host's tools.

use std::path::{Path, PathBuf};

use anyhow::{Context, Error};

use osutils::{
    blkid,
    lsblk::{self, ScsiDevice},
    openseachest, smartctl,
    sysfs::{self, ScsiGenericNode},
    zpool,
};
use poolprobe_api::config::ProbeConfiguration;

/// Supplies pool names and raw pool status text.
pub trait PoolManager: Send + Sync {
    fn list_pools(&self) -> Result<Vec<String>, Error>;

    fn pool_status(&self, pool: &str) -> Result<String, Error>;
}

/// Block device topology and static metadata.
pub trait BlockDevices: Send + Sync {
    /// Whole disk holding `device`, `None` when it has no parent.
    fn parent_disk(&self, device: &Path) -> Result<Option<PathBuf>, Error>;

    /// Static identity (vendor, model, serial) of every disk, keyed by kernel
    /// name.
    fn disk_listing(&self) -> Result<Vec<ScsiDevice>, Error>;

    /// Human readable capacity.
    fn size(&self, device: &Path) -> Result<String, Error>;

    fn partition_uuid(&self, device: &Path) -> Result<Option<String>, Error>;

    /// Every whole disk currently present.
    fn system_disks(&self) -> Result<Vec<PathBuf>, Error>;

    /// Canonical kernel device a disk is attached to.
    fn device_link(&self, disk: &Path) -> Result<PathBuf, Error>;

    /// Diagnostic channel candidates with the kernel device each is attached
    /// to.
    fn channel_links(&self) -> Result<Vec<ScsiGenericNode>, Error>;
}

/// Free-text diagnostic readers.
pub trait Diagnostics: Send + Sync {
    /// Identity section of the general diagnostic tool.
    fn general_info(&self, disk: &Path) -> Result<String, Error>;

    /// Attribute section of the general diagnostic tool.
    fn general_attributes(&self, disk: &Path) -> Result<String, Error>;

    /// Vendor specific report, addressed through a diagnostic channel.
    fn extended_info(&self, channel: &Path) -> Result<String, Error>;
}

/// Everything an inventory run needs from the machine.
pub trait Host: PoolManager + BlockDevices + Diagnostics {}

impl<T> Host for T where T: PoolManager + BlockDevices + Diagnostics {}

/// Host backed by `zpool`, `lsblk`, `blkid`, `smartctl`, `openSeaChest_SMART`
/// and sysfs.
pub struct SystemHost {
    sysfs_root: PathBuf,
    disk_pattern: String,
    openseachest_path: Option<PathBuf>,
}

impl SystemHost {
    pub fn new(config: &ProbeConfiguration) -> Self {
        Self {
            sysfs_root: config.sysfs_root.clone(),
            disk_pattern: config.disk_pattern.clone(),
            openseachest_path: config.openseachest_path.clone(),
        }
    }
}

impl PoolManager for SystemHost {
    fn list_pools(&self) -> Result<Vec<String>, Error> {
        zpool::list()
    }

    fn pool_status(&self, pool: &str) -> Result<String, Error> {
        zpool::status(pool)
    }
}

impl BlockDevices for SystemHost {
    fn parent_disk(&self, device: &Path) -> Result<Option<PathBuf>, Error> {
        lsblk::parent_disk(device)
    }

    fn disk_listing(&self) -> Result<Vec<ScsiDevice>, Error> {
        lsblk::scsi_devices()
    }

    fn size(&self, device: &Path) -> Result<String, Error> {
        lsblk::size(device)
    }

    fn partition_uuid(&self, device: &Path) -> Result<Option<String>, Error> {
        blkid::get_partition_uuid(device)
    }

    fn system_disks(&self) -> Result<Vec<PathBuf>, Error> {
        let disks = glob::glob(&self.disk_pattern)
            .with_context(|| format!("Invalid disk pattern '{}'", self.disk_pattern))?
            .flatten()
            .collect();
        Ok(disks)
    }

    fn device_link(&self, disk: &Path) -> Result<PathBuf, Error> {
        sysfs::block_device_link(&self.sysfs_root, disk)
    }

    fn channel_links(&self) -> Result<Vec<ScsiGenericNode>, Error> {
        sysfs::scsi_generic_nodes(&self.sysfs_root)
    }
}

impl Diagnostics for SystemHost {
    fn general_info(&self, disk: &Path) -> Result<String, Error> {
        smartctl::info(disk)
    }

    fn general_attributes(&self, disk: &Path) -> Result<String, Error> {
        smartctl::attributes(disk)
    }

    fn extended_info(&self, channel: &Path) -> Result<String, Error> {
        openseachest::info(self.openseachest_path.as_deref(), channel)
    }
}
