use std::path::Path;

use anyhow::{Context, Error};

use crate::dependencies::{Dependency, DependencyError};

/// blkid exit status when the requested tag was not found on the device.
const EXIT_TAG_NOT_FOUND: i32 = 2;

fn run(device_path: impl AsRef<Path>, tag: &str) -> Result<Option<String>, Error> {
    let result = Dependency::Blkid
        .cmd()
        .with_arg("-o") // output format
        .with_arg("value") // single value
        .with_arg("-s") // tag
        .with_arg(tag)
        .with_arg(device_path.as_ref())
        .output_and_check();

    match result {
        Ok(output) => Ok(non_empty(&output)),
        Err(e) if is_tag_not_found(&e) => Ok(None),
        Err(e) => Err(e).context("Failed to execute blkid"),
    }
}

fn is_tag_not_found(error: &DependencyError) -> bool {
    matches!(
        error,
        DependencyError::ExecutionFailed {
            code: Some(EXIT_TAG_NOT_FOUND),
            ..
        }
    )
}

fn non_empty(output: &str) -> Option<String> {
    Some(output.trim())
        .filter(|value| !value.is_empty())
        .map(String::from)
}

/// Returns the PARTUUID of a device, `None` when it has none (e.g. a whole
/// disk without a partition table entry).
pub fn get_partition_uuid(device_path: impl AsRef<Path>) -> Result<Option<String>, Error> {
    run(device_path, "PARTUUID")
}
