use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::constants::{NOT_AVAILABLE_MARKER, UNKNOWN_MARKER};

/// Which pools an inventory run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolSelector {
    All,
    Named(String),
}

impl PoolSelector {
    /// Interprets a command line argument. `all` and `--all` select every
    /// pool, anything else names a single pool.
    pub fn from_argument(argument: &str) -> Self {
        match argument {
            "all" | "--all" => Self::All,
            name => Self::Named(name.to_owned()),
        }
    }
}

impl Display for PoolSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::All => f.write_str("all"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// State reported by the pool manager for one device, or `Unused` for disks
/// that no pool claims.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceState {
    Online,
    Degraded,
    Faulted,
    Offline,
    Unavail,
    Removed,
    Avail,
    Inuse,
    Unused,
    Other(String),
    Unknown,
}

impl DeviceState {
    /// Parses a state word from pool status output.
    pub fn from_token(token: &str) -> Self {
        match token.to_ascii_uppercase().as_str() {
            "ONLINE" => Self::Online,
            "DEGRADED" => Self::Degraded,
            "FAULTED" => Self::Faulted,
            "OFFLINE" => Self::Offline,
            "UNAVAIL" => Self::Unavail,
            "REMOVED" => Self::Removed,
            "AVAIL" => Self::Avail,
            "INUSE" => Self::Inuse,
            "UNUSED" => Self::Unused,
            "UNKNOWN" => Self::Unknown,
            _ => Self::Other(token.to_owned()),
        }
    }
}

impl Display for DeviceState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let label = match self {
            Self::Online => "ONLINE",
            Self::Degraded => "DEGRADED",
            Self::Faulted => "FAULTED",
            Self::Offline => "OFFLINE",
            Self::Unavail => "UNAVAIL",
            Self::Removed => "REMOVED",
            Self::Avail => "AVAIL",
            Self::Inuse => "INUSE",
            Self::Unused => "UNUSED",
            Self::Other(word) => return f.write_str(&word.to_ascii_uppercase()),
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(label)
    }
}

/// Secondary low-level interface of a physical disk (a SCSI generic node).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticChannel {
    Available(PathBuf),
    NotAvailable,
}

impl DiagnosticChannel {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Available(path) => Some(path),
            Self::NotAvailable => None,
        }
    }
}

impl Display for DiagnosticChannel {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Available(path) => write!(f, "{}", path.display()),
            Self::NotAvailable => f.write_str(NOT_AVAILABLE_MARKER),
        }
    }
}

/// Year a disk was made, tagged with how it was obtained.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(tag = "confidence", content = "year", rename_all = "kebab-case")]
pub enum ManufactureYear {
    /// Reported by a diagnostic tool.
    Exact(i32),
    /// Derived from power-on-hours, assuming continuous operation.
    Estimated(i32),
    #[default]
    Unknown,
}

impl Display for ManufactureYear {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Exact(year) => write!(f, "{year}"),
            Self::Estimated(year) => write!(f, "{year} (est.)"),
            Self::Unknown => f.write_str(UNKNOWN_MARKER),
        }
    }
}

/// Total data written to a disk over its lifetime.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BytesWritten {
    pub terabytes: f64,
}

impl Display for BytesWritten {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{:.2} TB", self.terabytes)
    }
}

/// Facts gathered about one physical disk. Every field degrades to unknown
/// on its own.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AttributeRecord {
    pub size: Option<String>,
    pub vendor: Option<String>,
    pub model: Option<String>,
    pub serial: Option<String>,
    pub manufacture_year: ManufactureYear,
    pub bytes_written: Option<BytesWritten>,
    /// Drive-managed shingled magnetic recording.
    pub shingled: bool,
    /// Stable partition identifier of the referenced device, when it has one.
    pub partition_uuid: Option<String>,
}

/// One reported row: a physical disk, how it was reached and what is known
/// about it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiskRecord {
    /// Device path as the pool manager knows it, or the disk path itself for
    /// unclaimed disks.
    pub reference: PathBuf,
    pub disk: PathBuf,
    pub channel: DiagnosticChannel,
    pub state: DeviceState,
    pub attributes: AttributeRecord,
}

impl DiskRecord {
    /// Display label: the partition identifier when available, otherwise the
    /// reference path.
    pub fn label(&self) -> String {
        match &self.attributes.partition_uuid {
            Some(uuid) => uuid.clone(),
            None => self.reference.to_string_lossy().to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PoolInventory {
    pub name: String,
    /// Disks in the order their references first appear in the pool status.
    pub disks: Vec<DiskRecord>,
}

/// Result of one inventory run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct InventorySnapshot {
    pub pools: Vec<PoolInventory>,
    /// Disks present on the host but claimed by no processed pool, ordered
    /// by path.
    pub unclaimed: Vec<DiskRecord>,
}

impl InventorySnapshot {
    /// Every physical disk claimed by a pool in this snapshot.
    pub fn claimed_disks(&self) -> impl Iterator<Item = &Path> {
        self.pools
            .iter()
            .flat_map(|pool| pool.disks.iter())
            .map(|record| record.disk.as_path())
    }
}

/// Renders an optional attribute, falling back to the unknown marker.
pub fn or_unknown(value: Option<&str>) -> &str {
    value.unwrap_or(UNKNOWN_MARKER)
}
