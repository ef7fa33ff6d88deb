// src/store/mod.rs

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::tax::TaxBreakdown;

/// Newest-first history lists are capped at this many entries.
const MAX_HISTORY_ENTRIES: usize = 50;

/// The fixed durable-cache entries, each with its own expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKey {
    DeviceData,
    SearchHistory,
    CalculationHistory,
    Preferences,
}

impl CacheKey {
    pub fn file_name(&self) -> &'static str {
        match self {
            CacheKey::DeviceData => "devices.json",
            CacheKey::SearchHistory => "search_history.json",
            CacheKey::CalculationHistory => "calculation_history.json",
            CacheKey::Preferences => "preferences.json",
        }
    }

    /// How long an entry stays valid. Device data goes stale within a day;
    /// the user-facing histories and preferences live much longer.
    pub fn expires_in(&self) -> Duration {
        match self {
            CacheKey::DeviceData => Duration::hours(24),
            CacheKey::SearchHistory => Duration::days(7),
            CacheKey::CalculationHistory => Duration::days(30),
            CacheKey::Preferences => Duration::days(365),
        }
    }
}

/// On-disk envelope wrapped around every cached value.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    data: T,
    timestamp: DateTime<Utc>,
    /// Seconds until `data` is considered stale.
    expires_in: i64,
}

impl<T> Envelope<T> {
    fn expired(&self) -> bool {
        Utc::now() >= self.timestamp + Duration::seconds(self.expires_in)
    }
}

/// A search the user ran, for the recent-searches surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchEntry {
    pub query: String,
    pub at: DateTime<Utc>,
}

/// One completed tax calculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationEntry {
    pub state: String,
    pub amount: f64,
    pub tax_amount: f64,
    pub total_amount: f64,
    pub at: DateTime<Utc>,
}

/// Durable user preferences.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_state: Option<String>,
}

/// Durable JSON cache: one envelope file per [`CacheKey`] under a single
/// directory. Corrupt or expired entries read as absent.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating cache directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    fn path(&self, key: CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    pub fn save<T: Serialize>(&self, key: CacheKey, data: &T) -> Result<()> {
        let envelope = Envelope {
            data,
            timestamp: Utc::now(),
            expires_in: key.expires_in().num_seconds(),
        };
        let json = serde_json::to_string_pretty(&envelope)
            .with_context(|| format!("serializing {}", key.file_name()))?;

        // write to a sibling tmp file first so readers never see a torn entry
        let path = self.path(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("renaming {} into place", tmp.display()))?;
        Ok(())
    }

    /// Load a cached value, treating missing, corrupt, and expired entries
    /// all as absent.
    pub fn load<T: DeserializeOwned>(&self, key: CacheKey) -> Option<T> {
        let envelope = self.read_envelope::<T>(key)?;
        if envelope.expired() {
            return None;
        }
        Some(envelope.data)
    }

    /// Load a cached value even if it has expired. Used on the fetch failure
    /// path, where stale data beats no data.
    pub fn load_stale<T: DeserializeOwned>(&self, key: CacheKey) -> Option<T> {
        self.read_envelope::<T>(key).map(|envelope| envelope.data)
    }

    pub fn remove(&self, key: CacheKey) -> Result<()> {
        let path = self.path(key);
        if path.exists() {
            fs::remove_file(&path).with_context(|| format!("removing {}", path.display()))?;
        }
        Ok(())
    }

    fn read_envelope<T: DeserializeOwned>(&self, key: CacheKey) -> Option<Envelope<T>> {
        let path = self.path(key);
        let text = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&text) {
            Ok(envelope) => Some(envelope),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping corrupt cache entry");
                None
            }
        }
    }

    /// Prepend a search to the recent-search history, newest first, bounded.
    pub fn record_search(&self, query: &str) -> Result<()> {
        let mut history: Vec<SearchEntry> = self.load(CacheKey::SearchHistory).unwrap_or_default();
        history.insert(
            0,
            SearchEntry {
                query: query.to_string(),
                at: Utc::now(),
            },
        );
        history.truncate(MAX_HISTORY_ENTRIES);
        self.save(CacheKey::SearchHistory, &history)
    }

    /// Prepend a completed calculation to the calculation history.
    pub fn record_calculation(
        &self,
        state: &str,
        amount: f64,
        breakdown: &TaxBreakdown,
    ) -> Result<()> {
        let mut history: Vec<CalculationEntry> =
            self.load(CacheKey::CalculationHistory).unwrap_or_default();
        history.insert(
            0,
            CalculationEntry {
                state: state.to_string(),
                amount,
                tax_amount: breakdown.tax_amount,
                total_amount: breakdown.total_amount,
                at: Utc::now(),
            },
        );
        history.truncate(MAX_HISTORY_ENTRIES);
        self.save(CacheKey::CalculationHistory, &history)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
