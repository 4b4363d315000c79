/// Path to load the configuration from when `--config` is not given.
pub const CONFIG_PATH_DEFAULT: &str = "/etc/poolprobe/config.yaml";

/// Default glob matching every whole disk on the host.
pub const DISK_PATTERN_DEFAULT: &str = "/dev/sd?";

/// Default mount point of sysfs.
pub const SYSFS_ROOT_DEFAULT: &str = "/sys";

/// Default number of threads resolving and aggregating disks.
pub const WORKERS_DEFAULT: usize = 4;

/// Default limit for a single external tool invocation, in seconds.
pub const COMMAND_TIMEOUT_SECONDS_DEFAULT: u64 = 30;

/// Location of the extended diagnostic tool relative to `$HOME`.
pub const OPENSEACHEST_HOME_RELATIVE_PATH: &str = ".cache/openseachest/openSeaChest_SMART";

/// Hours in a (non-leap) year, used to turn power-on-hours into an age.
pub const HOURS_PER_YEAR: u64 = 8760;

/// Marker rendered for any attribute no source could provide.
pub const UNKNOWN_MARKER: &str = "unknown";

/// Marker rendered for a missing diagnostic channel.
pub const NOT_AVAILABLE_MARKER: &str = "N/A";
