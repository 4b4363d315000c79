use std::{collections::HashSet, path::PathBuf};

use chrono::Datelike;
use log::{debug, info, warn};
use rayon::{prelude::*, ThreadPool, ThreadPoolBuilder};

use poolprobe_api::{
    error::{InitializationError, InvalidInputError, ProbeError, ReportError},
    inventory::{DeviceState, DiskRecord, InventorySnapshot, PoolInventory, PoolSelector},
};

use crate::host::Host;

pub mod aggregate;
pub mod extract;
pub mod resolve;
#[cfg(test)]
pub(crate) mod testutils;

use aggregate::Aggregator;
use extract::PoolDevices;
use resolve::{Resolution, Resolver};

/// Builds inventory snapshots of the pools on a host.
pub struct Inventory<'a, H: ?Sized> {
    host: &'a H,
    workers: ThreadPool,
    current_year: i32,
}

impl<'a, H> Inventory<'a, H>
where
    H: Host + ?Sized,
{
    /// Creates an inventory that queries disks on at most `workers` threads.
    pub fn new(host: &'a H, workers: usize) -> Result<Self, ProbeError> {
        let workers = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|index| format!("poolprobe-worker-{index}"))
            .build()
            .structured(InitializationError::WorkerPool)?;

        Ok(Self {
            host,
            workers,
            current_year: chrono::Local::now().year(),
        })
    }

    /// Fixes the year manufacture estimates are computed against.
    pub fn with_current_year(mut self, current_year: i32) -> Self {
        self.current_year = current_year;
        self
    }

    /// Names of the pools known to the host, empty when they cannot be
    /// listed.
    pub fn available_pools(&self) -> Vec<String> {
        match self.host.list_pools() {
            Ok(pools) => pools,
            Err(e) => {
                warn!("Failed to list pools: {e:?}");
                Vec::new()
            }
        }
    }

    /// Inventories the selected pools, then every system disk none of them
    /// claims. An unknown pool name fails before any device is queried.
    pub fn run(&self, selector: &PoolSelector) -> Result<InventorySnapshot, ProbeError> {
        let pools = select_pools(selector, self.available_pools())?;
        info!("Inventorying pools: {}", pools.join(", "));

        let resolver = Resolver::new(self.host);
        let aggregator = Aggregator::new(self.host, self.current_year);
        let mut seen = HashSet::new();
        let mut claimed = HashSet::new();

        let pools: Vec<PoolInventory> = pools
            .into_iter()
            .map(|name| {
                let disks = self.inventory_pool(
                    &name,
                    &resolver,
                    &aggregator,
                    &mut seen,
                    &mut claimed,
                );
                PoolInventory { name, disks }
            })
            .collect();

        let unclaimed = self.inventory_unclaimed(&resolver, &aggregator, &claimed);

        Ok(InventorySnapshot { pools, unclaimed })
    }

    fn inventory_pool(
        &self,
        name: &str,
        resolver: &Resolver<'_, H>,
        aggregator: &Aggregator<'_, H>,
        seen: &mut HashSet<PathBuf>,
        claimed: &mut HashSet<PathBuf>,
    ) -> Vec<DiskRecord> {
        let status = self.host.pool_status(name).unwrap_or_else(|e| {
            warn!("Failed to read status of pool '{name}': {e:?}");
            String::new()
        });
        let devices = PoolDevices::parse(&status);
        debug!(
            "Pool '{name}' references {} device(s)",
            devices.references.len()
        );

        let fresh: Vec<&PathBuf> = devices
            .references
            .iter()
            .filter(|reference| seen.insert(reference.to_path_buf()))
            .collect();

        let resolutions: Vec<Resolution> = self.workers.install(|| {
            fresh
                .par_iter()
                .map(|reference| resolver.resolve(reference))
                .collect()
        });

        // Claims are taken in first-seen order so that the same reference
        // wins no matter how the resolutions were scheduled.
        let resolutions: Vec<Resolution> = resolutions
            .into_iter()
            .filter(|resolution| {
                let first = claimed.insert(resolution.disk.clone());
                if !first {
                    debug!(
                        "Skipping '{}', disk '{}' is already reported",
                        resolution.reference.display(),
                        resolution.disk.display()
                    );
                }
                first
            })
            .collect();

        self.workers.install(|| {
            resolutions
                .par_iter()
                .map(|resolution| DiskRecord {
                    reference: resolution.reference.clone(),
                    disk: resolution.disk.clone(),
                    channel: resolution.channel.clone(),
                    state: devices.state_of(&resolution.reference),
                    attributes: aggregator.aggregate(resolution),
                })
                .collect()
        })
    }

    fn inventory_unclaimed(
        &self,
        resolver: &Resolver<'_, H>,
        aggregator: &Aggregator<'_, H>,
        claimed: &HashSet<PathBuf>,
    ) -> Vec<DiskRecord> {
        let mut disks = self.host.system_disks().unwrap_or_else(|e| {
            warn!("Failed to enumerate system disks: {e:?}");
            Vec::new()
        });
        disks.sort();
        disks.dedup();
        disks.retain(|disk| !claimed.contains(disk));
        debug!("{} disk(s) are not claimed by any pool", disks.len());

        self.workers.install(|| {
            disks
                .par_iter()
                .map(|disk| {
                    let resolution = Resolution {
                        reference: disk.clone(),
                        disk: disk.clone(),
                        channel: resolver.channel(disk),
                    };
                    DiskRecord {
                        attributes: aggregator.aggregate(&resolution),
                        reference: resolution.reference,
                        disk: resolution.disk,
                        channel: resolution.channel,
                        state: DeviceState::Unused,
                    }
                })
                .collect()
        })
    }
}

fn select_pools(
    selector: &PoolSelector,
    available: Vec<String>,
) -> Result<Vec<String>, ProbeError> {
    match selector {
        PoolSelector::All => Ok(available),
        PoolSelector::Named(pool) if available.contains(pool) => Ok(vec![pool.clone()]),
        PoolSelector::Named(pool) => Err(ProbeError::new(InvalidInputError::UnknownPool {
            pool: pool.clone(),
            available,
        })),
    }
}
