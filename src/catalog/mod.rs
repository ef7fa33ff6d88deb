// src/catalog/mod.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod query;
pub mod service;

pub use query::PopularDevice;
pub use service::{network_available, CatalogService, FetchConfig, FetchError};

/// Prices for one device as listed on the sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Full retail price, the one tax is computed against.
    pub msrp: f64,
    /// Suggested prepaid-plan price, when the sheet lists one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prepaid: Option<f64>,
    /// Shortened name for display surfaces.
    pub display_name: String,
}

/// The normalized device price table. Built by one ingestion pass, read-only
/// afterward; refreshes replace the whole catalog rather than mutating it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceCatalog {
    /// Device name → prices. `BTreeMap` keeps "first N" slices stable.
    pub devices: BTreeMap<String, DeviceRecord>,
    pub fetched_at: DateTime<Utc>,
}

impl DeviceCatalog {
    pub fn empty() -> Self {
        Self {
            devices: BTreeMap::new(),
            fetched_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

/// Where the catalog acquisition currently stands. Written only by the
/// fetch service; everyone else reads a snapshot.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadingStatus {
    pub is_loading: bool,
    pub has_loaded: bool,
    pub device_count: usize,
    /// Human-readable cause of the most recent failure, if any. A load that
    /// fell back to cached data appends a "using cached data" note here.
    pub last_error: Option<String>,
    /// Failed attempts within the current or most recent load.
    pub retry_count: u32,
}
