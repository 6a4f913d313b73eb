//! System health probe behind `GET /health`.

use std::collections::BTreeMap;

use serde::Serialize;
use sysinfo::Disks;
use tracing::warn;

use crate::storage::StorageLayout;

/// Below this much free space on the storage filesystem the server reports
/// itself unhealthy.
pub const MIN_FREE_BYTES: u64 = 1024 * 1024 * 1024;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub healthy: bool,
    pub checks: BTreeMap<String, String>,
}

pub fn check_system_health(layout: &StorageLayout) -> HealthStatus {
    let mut healthy = true;
    let mut checks = BTreeMap::new();

    // Storage root must exist and be a directory.
    if layout.storage_root().is_dir() {
        checks.insert("storage".to_owned(), "OK".to_owned());
    } else {
        healthy = false;
        checks.insert(
            "storage".to_owned(),
            "FAIL - Directory not accessible".to_owned(),
        );
    }

    // Temp root must be creatable.
    match std::fs::create_dir_all(layout.temp_root()) {
        Ok(()) => {
            checks.insert("temp_storage".to_owned(), "OK".to_owned());
        }
        Err(err) => {
            healthy = false;
            checks.insert("temp_storage".to_owned(), format!("FAIL - {err}"));
        }
    }

    // Free space on the filesystem holding the storage root.
    match free_space_for(layout) {
        Some(free) => {
            let free_gb = free as f64 / MIN_FREE_BYTES as f64;
            if free < MIN_FREE_BYTES {
                healthy = false;
                checks.insert(
                    "disk_space".to_owned(),
                    format!("WARN - Low disk space: {free_gb:.2}GB"),
                );
            } else {
                checks.insert(
                    "disk_space".to_owned(),
                    format!("OK - {free_gb:.2}GB free"),
                );
            }
        }
        None => {
            checks.insert("disk_space".to_owned(), "UNKNOWN".to_owned());
        }
    }

    if !healthy {
        warn!(?checks, "health probe degraded");
    }

    HealthStatus {
        status: if healthy { "OK" } else { "UNHEALTHY" }.to_owned(),
        healthy,
        checks,
    }
}

/// Available bytes on the disk whose mount point is the deepest prefix of
/// the storage root.
fn free_space_for(layout: &StorageLayout) -> Option<u64> {
    let root = layout.storage_root().canonicalize().ok()?;
    let disks = Disks::new_with_refreshed_list();
    disks
        .list()
        .iter()
        .filter(|disk| root.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len())
        .map(|disk| disk.available_space())
}
