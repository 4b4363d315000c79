use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    constants::{
        COMMAND_TIMEOUT_SECONDS_DEFAULT, CONFIG_PATH_DEFAULT, DISK_PATTERN_DEFAULT,
        SYSFS_ROOT_DEFAULT, WORKERS_DEFAULT,
    },
    error::{InitializationError, ProbeError, ReportError},
};

/// Tunables for an inventory run, read from an optional YAML file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProbeConfiguration {
    /// Number of threads used to resolve and aggregate disks.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Upper bound for a single external tool invocation. Zero disables the
    /// limit.
    #[serde(default = "default_command_timeout_seconds")]
    pub command_timeout_seconds: u64,

    /// Glob matching every whole disk present on the host.
    #[serde(default = "default_disk_pattern")]
    pub disk_pattern: String,

    /// Where sysfs is mounted.
    #[serde(default = "default_sysfs_root")]
    pub sysfs_root: PathBuf,

    /// Explicit location of `openSeaChest_SMART`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openseachest_path: Option<PathBuf>,
}

fn default_workers() -> usize {
    WORKERS_DEFAULT
}

fn default_command_timeout_seconds() -> u64 {
    COMMAND_TIMEOUT_SECONDS_DEFAULT
}

fn default_disk_pattern() -> String {
    DISK_PATTERN_DEFAULT.into()
}

fn default_sysfs_root() -> PathBuf {
    SYSFS_ROOT_DEFAULT.into()
}

impl Default for ProbeConfiguration {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            command_timeout_seconds: default_command_timeout_seconds(),
            disk_pattern: default_disk_pattern(),
            sysfs_root: default_sysfs_root(),
            openseachest_path: None,
        }
    }
}

impl ProbeConfiguration {
    /// Loads the configuration.
    ///
    /// With no explicit path, a missing default file yields the built-in
    /// defaults. An explicit path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ProbeError> {
        let (path, explicit) = match path {
            Some(path) => (path, true),
            None => (Path::new(CONFIG_PATH_DEFAULT), false),
        };

        if !explicit && !path.exists() {
            log::debug!(
                "Configuration file not found at {}, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(path).structured(InitializationError::LoadConfiguration {
                path: path.to_string_lossy().to_string(),
            })?;

        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ProbeError> {
        let config: Self = serde_yaml::from_str(contents)
            .structured(InitializationError::ParseConfiguration)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ProbeError> {
        if self.workers == 0 {
            return Err(ProbeError::new(InitializationError::InvalidConfiguration {
                reason: "workers must be at least 1".into(),
            }));
        }

        if self.disk_pattern.trim().is_empty() {
            return Err(ProbeError::new(InitializationError::InvalidConfiguration {
                reason: "diskPattern must not be empty".into(),
            }));
        }

        Ok(())
    }
}
