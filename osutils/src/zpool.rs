use anyhow::{Context, Error};

use crate::dependencies::Dependency;

/// Lists the names of all imported pools.
pub fn list() -> Result<Vec<String>, Error> {
    let output = Dependency::Zpool
        .cmd()
        .with_arg("list")
        .with_arg("-H") // scripted mode, no header
        .with_arg("-o")
        .with_arg("name")
        .output_and_check()
        .context("Failed to list pools")?;

    Ok(parse_pool_names(&output))
}

fn parse_pool_names(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Returns the verbose status of a pool, with full device paths.
pub fn status(pool: &str) -> Result<String, Error> {
    Dependency::Zpool
        .cmd()
        .with_arg("status")
        .with_arg("-v")
        .with_arg("-P") // full paths instead of last component
        .with_arg(pool)
        .output_and_check()
        .with_context(|| format!("Failed to get status of pool '{pool}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pool_names() {
        assert_eq!(parse_pool_names("tank\nbackup\n"), vec!["tank", "backup"]);
        assert_eq!(parse_pool_names("  tank \n\n"), vec!["tank"]);
        assert!(parse_pool_names("").is_empty());
    }
}
