use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Error};
use log::trace;

/// A SCSI generic node together with the device it is attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScsiGenericNode {
    /// Kernel name, e.g. `sg2`.
    pub name: String,
    /// Canonical sysfs path of the attached device.
    pub device: PathBuf,
}

impl ScsiGenericNode {
    pub fn dev_path(&self) -> PathBuf {
        Path::new("/dev").join(&self.name)
    }
}

/// Returns the canonical sysfs device a block device is attached to.
pub fn block_device_link(
    sysfs_root: impl AsRef<Path>,
    disk: impl AsRef<Path>,
) -> Result<PathBuf, Error> {
    let name = disk
        .as_ref()
        .file_name()
        .with_context(|| format!("Invalid disk path '{}'", disk.as_ref().display()))?;
    let link = sysfs_root.as_ref().join("block").join(name).join("device");

    link.canonicalize()
        .with_context(|| format!("Failed to resolve '{}'", link.display()))
}

/// Lists every SCSI generic node with the device it is attached to, ordered
/// by node number. Nodes whose device cannot be resolved are skipped.
pub fn scsi_generic_nodes(sysfs_root: impl AsRef<Path>) -> Result<Vec<ScsiGenericNode>, Error> {
    let class = sysfs_root.as_ref().join("class/scsi_generic");
    let mut nodes: Vec<_> = fs::read_dir(&class)
        .with_context(|| format!("Failed to read '{}'", class.display()))?
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.starts_with("sg") {
                return None;
            }
            match entry.path().join("device").canonicalize() {
                Ok(device) => Some(ScsiGenericNode { name, device }),
                Err(e) => {
                    trace!("Skipping SCSI generic node '{name}': {e}");
                    None
                }
            }
        })
        .collect();

    nodes.sort_by_key(|node| (node_number(&node.name), node.name.clone()));
    Ok(nodes)
}

fn node_number(name: &str) -> u32 {
    name.trim_start_matches("sg").parse().unwrap_or(u32::MAX)
}
