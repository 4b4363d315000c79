pub mod blkid;
pub mod dependencies;
pub mod lsblk;
pub mod openseachest;
pub mod smartctl;
pub mod sysfs;
pub mod zpool;
