//! In-memory host answering from canned responses. Anything not configured
//! fails the way a missing tool would.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::{bail, Error};

use osutils::{lsblk::ScsiDevice, sysfs::ScsiGenericNode};

use crate::host::{BlockDevices, Diagnostics, PoolManager};

/// Queries answered by the pool manager rather than a device.
const POOL_QUERIES: [&str; 2] = ["list_pools", "pool_status"];

#[derive(Default)]
pub struct MockHost {
    pools: Vec<(String, String)>,
    failing_pool_list: bool,
    parents: HashMap<PathBuf, PathBuf>,
    listing: Vec<ScsiDevice>,
    listing_failures: usize,
    sizes: HashMap<PathBuf, String>,
    partition_uuids: HashMap<PathBuf, String>,
    system_disks: Vec<PathBuf>,
    device_links: HashMap<PathBuf, PathBuf>,
    channels: Vec<ScsiGenericNode>,
    channel_scan_failures: usize,
    general_info: HashMap<PathBuf, String>,
    general_attributes: HashMap<PathBuf, String>,
    extended_info: HashMap<PathBuf, String>,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl MockHost {
    pub fn with_pool(mut self, name: &str, status: &str) -> Self {
        self.pools.push((name.into(), status.into()));
        self
    }

    pub fn with_failing_pool_list(mut self) -> Self {
        self.failing_pool_list = true;
        self
    }

    pub fn with_parent(mut self, device: &str, disk: &str) -> Self {
        self.parents.insert(device.into(), disk.into());
        self
    }

    pub fn with_listing(mut self, name: &str, vendor: &str, model: &str, serial: &str) -> Self {
        self.listing.push(ScsiDevice {
            name: name.into(),
            vendor: Some(vendor.into()),
            model: Some(model.into()),
            serial: Some(serial.into()),
        });
        self
    }

    /// Fails the first `count` disk listings.
    pub fn with_listing_failures(mut self, count: usize) -> Self {
        self.listing_failures = count;
        self
    }

    pub fn with_size(mut self, device: &str, size: &str) -> Self {
        self.sizes.insert(device.into(), size.into());
        self
    }

    pub fn with_partition_uuid(mut self, device: &str, uuid: &str) -> Self {
        self.partition_uuids.insert(device.into(), uuid.into());
        self
    }

    pub fn with_system_disks(mut self, disks: &[&str]) -> Self {
        self.system_disks = disks.iter().map(PathBuf::from).collect();
        self
    }

    pub fn with_device_link(mut self, disk: &str, device: &str) -> Self {
        self.device_links.insert(disk.into(), device.into());
        self
    }

    pub fn with_channel(mut self, name: &str, device: &str) -> Self {
        self.channels.push(ScsiGenericNode {
            name: name.into(),
            device: device.into(),
        });
        self
    }

    pub fn with_failing_channel_scan(self) -> Self {
        self.with_channel_scan_failures(usize::MAX)
    }

    /// Fails the first `count` channel scans.
    pub fn with_channel_scan_failures(mut self, count: usize) -> Self {
        self.channel_scan_failures = count;
        self
    }

    pub fn with_general_info(mut self, disk: &str, info: &str) -> Self {
        self.general_info.insert(disk.into(), info.into());
        self
    }

    pub fn with_general_attributes(mut self, disk: &str, attributes: &str) -> Self {
        self.general_attributes.insert(disk.into(), attributes.into());
        self
    }

    pub fn with_extended_info(mut self, channel: &str, info: &str) -> Self {
        self.extended_info.insert(channel.into(), info.into());
        self
    }

    /// Number of times a collaborator method was called.
    pub fn calls(&self, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(method)
            .copied()
            .unwrap_or_default()
    }

    /// Number of calls that touched a device.
    pub fn device_queries(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(method, _)| !POOL_QUERIES.contains(*method))
            .map(|(_, count)| count)
            .sum()
    }

    fn record(&self, method: &'static str) {
        *self.calls.lock().unwrap().entry(method).or_default() += 1;
    }
}

fn lookup(map: &HashMap<PathBuf, String>, key: &Path, what: &str) -> Result<String, Error> {
    match map.get(key) {
        Some(value) => Ok(value.clone()),
        None => bail!("No {what} for '{}'", key.display()),
    }
}

impl PoolManager for MockHost {
    fn list_pools(&self) -> Result<Vec<String>, Error> {
        self.record("list_pools");
        if self.failing_pool_list {
            bail!("zpool not found");
        }
        Ok(self.pools.iter().map(|(name, _)| name.clone()).collect())
    }

    fn pool_status(&self, pool: &str) -> Result<String, Error> {
        self.record("pool_status");
        match self.pools.iter().find(|(name, _)| name == pool) {
            Some((_, status)) => Ok(status.clone()),
            None => bail!("No such pool '{pool}'"),
        }
    }
}

impl BlockDevices for MockHost {
    fn parent_disk(&self, device: &Path) -> Result<Option<PathBuf>, Error> {
        self.record("parent_disk");
        Ok(self.parents.get(device).cloned())
    }

    fn disk_listing(&self) -> Result<Vec<ScsiDevice>, Error> {
        self.record("disk_listing");
        if self.listing.is_empty() {
            bail!("lsblk not found");
        }
        if self.calls("disk_listing") <= self.listing_failures {
            bail!("lsblk timed out");
        }
        Ok(self.listing.clone())
    }

    fn size(&self, device: &Path) -> Result<String, Error> {
        self.record("size");
        lookup(&self.sizes, device, "size")
    }

    fn partition_uuid(&self, device: &Path) -> Result<Option<String>, Error> {
        self.record("partition_uuid");
        Ok(self.partition_uuids.get(device).cloned())
    }

    fn system_disks(&self) -> Result<Vec<PathBuf>, Error> {
        self.record("system_disks");
        Ok(self.system_disks.clone())
    }

    fn device_link(&self, disk: &Path) -> Result<PathBuf, Error> {
        self.record("device_link");
        match self.device_links.get(disk) {
            Some(link) => Ok(link.clone()),
            None => bail!("No device link for '{}'", disk.display()),
        }
    }

    fn channel_links(&self) -> Result<Vec<ScsiGenericNode>, Error> {
        self.record("channel_links");
        if self.calls("channel_links") <= self.channel_scan_failures {
            bail!("Permission denied");
        }
        Ok(self.channels.clone())
    }
}

impl Diagnostics for MockHost {
    fn general_info(&self, disk: &Path) -> Result<String, Error> {
        self.record("general_info");
        lookup(&self.general_info, disk, "general info")
    }

    fn general_attributes(&self, disk: &Path) -> Result<String, Error> {
        self.record("general_attributes");
        lookup(&self.general_attributes, disk, "general attributes")
    }

    fn extended_info(&self, channel: &Path) -> Result<String, Error> {
        self.record("extended_info");
        lookup(&self.extended_info, channel, "extended info")
    }
}
