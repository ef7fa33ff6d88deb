// src/catalog/service.rs

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use sysinfo::Networks;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use url::Url;

use super::{DeviceCatalog, DeviceRecord, LoadingStatus, PopularDevice};
use crate::ingest;
use crate::store::{CacheKey, CacheStore};

/// Published CSV export of the device price sheet.
const SHEET_CSV_URL: &str =
    "https://docs.google.com/spreadsheets/d/1oN_d2juKl41aYapyN7c3HskEdVswgusn/export?format=csv";

/// Why a catalog load failed. The rendered message is what lands in
/// [`LoadingStatus::last_error`].
#[derive(Error, Debug)]
pub enum FetchError {
    /// Sheet URL no longer resolves (HTTP 404).
    #[error("price sheet not found (HTTP 404)")]
    NotFound,

    /// Sheet is no longer shared publicly.
    #[error("access to price sheet denied (HTTP {0})")]
    AccessDenied(u16),

    /// Any other non-success HTTP status.
    #[error("price sheet request failed (HTTP {0})")]
    Status(u16),

    /// Transport-level failure (DNS, connect, timeout, TLS).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// 200 with nothing in it.
    #[error("price sheet response was empty")]
    EmptyBody,

    /// The pipeline ran but produced no devices; treated as a failed load
    /// even though the HTTP call succeeded.
    #[error("no usable device rows in price sheet")]
    EmptyCatalog,

    /// The runtime reports no connectivity; the network attempt was skipped.
    #[error("no network connectivity")]
    Offline,
}

/// Tunables for the fetch pipeline.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub url: String,
    /// Total attempts per load, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles each retry after that.
    pub initial_backoff: Duration,
    pub request_timeout: Duration,
    /// How long an in-memory catalog satisfies calls without any I/O.
    pub memory_ttl: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            url: SHEET_CSV_URL.to_string(),
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            request_timeout: Duration::from_secs(30),
            memory_ttl: Duration::from_secs(5 * 60),
        }
    }
}

/// True when some non-loopback interface carries a non-loopback address.
/// The closest stand-in for "is this machine on a network" short of probing.
pub fn network_available() -> bool {
    let networks = Networks::new_with_refreshed_list();
    networks.iter().any(|(_, data)| {
        data.ip_networks()
            .iter()
            .any(|network| !network.addr.is_loopback())
    })
}

struct ServiceState {
    catalog: Option<Arc<DeviceCatalog>>,
    /// When the in-memory catalog was installed; governs the memory TTL.
    loaded_at: Option<Instant>,
    /// When the last load attempt finished. Callers that queued behind an
    /// in-flight load compare against this to avoid a duplicate fetch.
    completed_at: Option<Instant>,
    status: LoadingStatus,
}

/// Owns the device catalog and everything about acquiring it: memory and
/// durable caching, retry with backoff, offline detection, fallback, and
/// the single-flight guarantee. The only writer of [`LoadingStatus`].
pub struct CatalogService {
    client: Client,
    config: FetchConfig,
    store: CacheStore,
    connectivity: fn() -> bool,
    state: Mutex<ServiceState>,
    /// Serializes load attempts; held across the whole fetch pipeline.
    flight: tokio::sync::Mutex<()>,
}

impl CatalogService {
    pub fn new(config: FetchConfig, store: CacheStore) -> Result<Self> {
        Url::parse(&config.url).with_context(|| format!("invalid sheet URL {}", config.url))?;
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            client,
            config,
            store,
            connectivity: network_available,
            state: Mutex::new(ServiceState {
                catalog: None,
                loaded_at: None,
                completed_at: None,
                status: LoadingStatus::default(),
            }),
            flight: tokio::sync::Mutex::new(()),
        })
    }

    /// Replace the connectivity probe. Tests use this to force offline.
    pub fn with_connectivity(mut self, probe: fn() -> bool) -> Self {
        self.connectivity = probe;
        self
    }

    /// Current catalog, regardless of freshness.
    pub fn catalog(&self) -> Option<Arc<DeviceCatalog>> {
        self.state.lock().unwrap().catalog.clone()
    }

    pub fn get_loading_status(&self) -> LoadingStatus {
        self.state.lock().unwrap().status.clone()
    }

    pub fn lookup(&self, name: &str) -> Option<DeviceRecord> {
        self.catalog()?.lookup(name).cloned()
    }

    pub fn search(&self, query: &str, limit: usize) -> Vec<String> {
        self.catalog()
            .map(|catalog| catalog.search(query, limit))
            .unwrap_or_default()
    }

    pub fn popular(&self, limit: usize) -> Vec<PopularDevice> {
        self.catalog()
            .map(|catalog| catalog.popular(limit))
            .unwrap_or_default()
    }

    /// Force a full re-fetch, bypassing both cache tiers.
    pub async fn refresh(&self) -> Arc<DeviceCatalog> {
        self.fetch_catalog(true).await
    }

    /// Get the device catalog, fetching it if needed.
    ///
    /// Never returns an error: total failure yields an empty catalog and
    /// leaves the cause in [`LoadingStatus::last_error`]. Concurrent callers
    /// share one underlying load.
    pub async fn fetch_catalog(&self, force_refresh: bool) -> Arc<DeviceCatalog> {
        if !force_refresh {
            if let Some(catalog) = self.fresh_catalog() {
                return catalog;
            }
        }

        let waited_from = Instant::now();
        let _flight = self.flight.lock().await;

        // A load that finished while we were queued on the flight lock
        // already answers this call, forced or not.
        {
            let state = self.state.lock().unwrap();
            if let (Some(completed_at), Some(catalog)) =
                (state.completed_at, state.catalog.as_ref())
            {
                if completed_at >= waited_from {
                    return Arc::clone(catalog);
                }
            }
        }

        if !force_refresh {
            if let Some(catalog) = self.fresh_catalog() {
                return catalog;
            }
            if let Some(cached) = self.store.load::<DeviceCatalog>(CacheKey::DeviceData) {
                let catalog = Arc::new(cached);
                debug!(devices = catalog.len(), "serving catalog from durable cache");
                self.install_cached(Arc::clone(&catalog));
                return catalog;
            }
        }

        self.run_load().await
    }

    fn fresh_catalog(&self) -> Option<Arc<DeviceCatalog>> {
        let state = self.state.lock().unwrap();
        let loaded_at = state.loaded_at?;
        if loaded_at.elapsed() < self.config.memory_ttl {
            state.catalog.clone()
        } else {
            None
        }
    }

    async fn run_load(&self) -> Arc<DeviceCatalog> {
        {
            let mut state = self.state.lock().unwrap();
            state.status.is_loading = true;
            state.status.retry_count = 0;
        }

        let outcome = if (self.connectivity)() {
            self.attempt_with_retry().await
        } else {
            info!("no network connectivity, skipping fetch");
            Err(FetchError::Offline)
        };

        match outcome {
            Ok(catalog) => {
                info!(devices = catalog.len(), "catalog loaded");
                let catalog = Arc::new(catalog);
                if let Err(err) = self.store.save(CacheKey::DeviceData, catalog.as_ref()) {
                    warn!(error = %err, "failed to persist catalog");
                }
                self.finish_load(Arc::clone(&catalog), None);
                catalog
            }
            Err(err) => {
                error!(error = %err, "catalog load failed");

                // last known good: in-memory first, then the durable cache
                // even past its expiry
                let fallback = self
                    .state
                    .lock()
                    .unwrap()
                    .catalog
                    .clone()
                    .filter(|catalog| !catalog.is_empty())
                    .or_else(|| {
                        self.store
                            .load_stale::<DeviceCatalog>(CacheKey::DeviceData)
                            .map(Arc::new)
                    });

                match fallback {
                    Some(catalog) => {
                        warn!(devices = catalog.len(), "falling back to cached device data");
                        self.finish_load(
                            Arc::clone(&catalog),
                            Some(format!("{err}; using cached data")),
                        );
                        catalog
                    }
                    None => {
                        let catalog = Arc::new(DeviceCatalog::empty());
                        self.finish_load(Arc::clone(&catalog), Some(err.to_string()));
                        catalog
                    }
                }
            }
        }
    }

    async fn attempt_with_retry(&self) -> Result<DeviceCatalog, FetchError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.attempt().await {
                Ok(catalog) => return Ok(catalog),
                Err(err) if attempt < self.config.max_attempts => {
                    {
                        let mut state = self.state.lock().unwrap();
                        state.status.retry_count = attempt;
                    }
                    let backoff = self.config.initial_backoff * 2u32.pow(attempt - 1);
                    warn!(
                        attempt,
                        delay_ms = backoff.as_millis() as u64,
                        error = %err,
                        "retrying catalog fetch"
                    );
                    sleep(backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn attempt(&self) -> Result<DeviceCatalog, FetchError> {
        let resp = self.client.get(&self.config.url).send().await?;
        let status = resp.status();
        match status {
            StatusCode::NOT_FOUND => return Err(FetchError::NotFound),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(FetchError::AccessDenied(status.as_u16()))
            }
            s if !s.is_success() => return Err(FetchError::Status(status.as_u16())),
            _ => {}
        }

        let body = resp.text().await?;
        if body.trim().is_empty() {
            return Err(FetchError::EmptyBody);
        }

        let catalog = ingest::build_catalog_from_text(&body).await;
        if catalog.is_empty() {
            return Err(FetchError::EmptyCatalog);
        }
        Ok(catalog)
    }

    /// Install the outcome of a finished load attempt. Failed loads also
    /// sit out the memory TTL so a dead sheet is not hammered.
    fn finish_load(&self, catalog: Arc<DeviceCatalog>, error: Option<String>) {
        let now = Instant::now();
        let mut state = self.state.lock().unwrap();
        state.status.is_loading = false;
        if !catalog.is_empty() {
            state.status.has_loaded = true;
        }
        state.status.device_count = catalog.len();
        state.status.last_error = error;
        state.catalog = Some(catalog);
        state.loaded_at = Some(now);
        state.completed_at = Some(now);
    }

    /// Install a catalog read from the durable cache. Not a load attempt:
    /// `completed_at` stays untouched so a queued forced refresh still runs.
    fn install_cached(&self, catalog: Arc<DeviceCatalog>) {
        let mut state = self.state.lock().unwrap();
        state.status.has_loaded = true;
        state.status.device_count = catalog.len();
        state.status.last_error = None;
        state.catalog = Some(catalog);
        state.loaded_at = Some(Instant::now());
    }
}
