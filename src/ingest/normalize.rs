// src/ingest/normalize.rs

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use tracing::trace;

use super::detect::ColumnMap;
use super::RawRow;
use crate::catalog::{DeviceCatalog, DeviceRecord};

/// MSRPs at or below this are scraped noise (section separators, placeholder
/// rows), not prices.
const MIN_PLAUSIBLE_MSRP: f64 = 2.0;

/// Rows normalized per batch before yielding back to the runtime.
const NORMALIZE_CHUNK_ROWS: usize = 250;

/// Device names shorter than this are codes or stray cells.
const MIN_NAME_LEN: usize = 2;

/// Known full sheet names → short display names.
static DISPLAY_NAMES: &[(&str, &str)] = &[
    ("Apple iPhone 17 - Lavender 256GB", "iPhone 17"),
    ("Samsung Galaxy S25 Silver Shadow 128GB", "Galaxy S25"),
    ("moto g play - 2024", "Moto G Play"),
    ("Samsung Galaxy A16 5G", "Samsung Galaxy A16"),
    ("Apple iPhone 15 Black 128GB", "iPhone 15 128GB"),
    ("Samsung Galaxy S24 128GB", "Samsung Galaxy S24 128GB"),
    ("Google Pixel 8", "Google Pixel 8"),
    ("OnePlus 12", "OnePlus 12"),
];

/// Trailing "- Color 256GB" variant suffix.
static VARIANT_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*-\s*[a-z][a-z ]*\d+\s*[gt]b$").expect("valid variant regex"));

/// Trailing bare storage suffix, e.g. " 128GB".
static STORAGE_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+\d+\s*[gt]b$").expect("valid storage regex"));

/// Maximum words kept in a derived display name.
const DISPLAY_NAME_MAX_WORDS: usize = 3;

/// Parse a price cell: `$` and thousands separators stripped, anything
/// non-numeric counts as zero.
pub fn parse_price(raw: &str) -> f64 {
    raw.replace(['$', ','], "").trim().parse().unwrap_or(0.0)
}

/// Shorten a sheet device name for display. Exact dictionary entries win;
/// otherwise variant and storage suffixes are stripped and the name is
/// capped at three words.
pub fn display_name(name: &str) -> String {
    if let Some((_, short)) = DISPLAY_NAMES.iter().find(|(full, _)| *full == name) {
        return short.to_string();
    }

    let stripped = VARIANT_SUFFIX.replace(name, "");
    let stripped = STORAGE_SUFFIX.replace(&stripped, "");
    let stripped = stripped.trim();

    if stripped.is_empty() {
        return name.to_string();
    }

    let words: Vec<&str> = stripped.split_whitespace().collect();
    if words.len() > DISPLAY_NAME_MAX_WORDS {
        words[..DISPLAY_NAME_MAX_WORDS].join(" ")
    } else {
        stripped.to_string()
    }
}

/// Normalize one raw row into a catalog entry, or `None` if the row is
/// unusable. Unusable rows are skipped silently.
fn normalize_row(row: &RawRow, columns: &ColumnMap) -> Option<(String, DeviceRecord)> {
    let name = row.get(&columns.name)?.trim();
    if name.is_empty() || name.eq_ignore_ascii_case("nan") || name.chars().count() < MIN_NAME_LEN {
        return None;
    }

    let msrp = parse_price(row.get(&columns.price)?);
    if msrp <= MIN_PLAUSIBLE_MSRP {
        trace!(device = name, msrp, "dropping row with implausible price");
        return None;
    }

    let prepaid = columns
        .prepaid
        .as_ref()
        .and_then(|col| row.get(col))
        .filter(|cell| !cell.trim().is_empty())
        .map(|cell| parse_price(cell))
        .filter(|price| *price > 0.0);

    Some((
        name.to_string(),
        DeviceRecord {
            msrp,
            prepaid,
            display_name: display_name(name),
        },
    ))
}

/// Build a catalog from raw rows in one synchronous pass. Later duplicates
/// of a device name overwrite earlier ones.
pub fn build_catalog(rows: &[RawRow], columns: &ColumnMap) -> DeviceCatalog {
    let mut devices = BTreeMap::new();
    for row in rows {
        if let Some((name, record)) = normalize_row(row, columns) {
            devices.insert(name, record);
        }
    }
    DeviceCatalog {
        devices,
        fetched_at: Utc::now(),
    }
}

/// Like [`build_catalog`], but yields control to the runtime between row
/// batches so a large sheet cannot monopolize the executor.
pub async fn build_catalog_chunked(rows: &[RawRow], columns: &ColumnMap) -> DeviceCatalog {
    let mut devices = BTreeMap::new();
    for chunk in rows.chunks(NORMALIZE_CHUNK_ROWS) {
        for row in chunk {
            if let Some((name, record)) = normalize_row(row, columns) {
                devices.insert(name, record);
            }
        }
        tokio::task::yield_now().await;
    }
    DeviceCatalog {
        devices,
        fetched_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> ColumnMap {
        ColumnMap {
            name: "Phone".to_string(),
            price: "MSRP".to_string(),
            prepaid: Some("Prepaid".to_string()),
        }
    }

    fn row(name: &str, msrp: &str, prepaid: &str) -> RawRow {
        [
            ("Phone".to_string(), name.to_string()),
            ("MSRP".to_string(), msrp.to_string()),
            ("Prepaid".to_string(), prepaid.to_string()),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn parses_currency_formatting() {
        assert_eq!(parse_price("$1,234.50"), 1234.50);
        assert_eq!(parse_price("899.99"), 899.99);
        assert_eq!(parse_price(" $49 "), 49.0);
    }

    #[test]
    fn garbage_price_is_zero() {
        assert_eq!(parse_price("garbage"), 0.0);
        assert_eq!(parse_price(""), 0.0);
    }

    #[test]
    fn implausible_msrp_rows_are_dropped() {
        let rows = vec![
            row("Galaxy A16", "$1.50", ""),
            row("Pixel 8", "2.00", ""),
            row("iPhone 15", "$899.99", ""),
        ];
        let catalog = build_catalog(&rows, &columns());
        assert_eq!(catalog.devices.len(), 1);
        assert!(catalog.devices.contains_key("iPhone 15"));
    }

    #[test]
    fn nan_and_short_names_are_dropped() {
        let rows = vec![
            row("nan", "499.99", ""),
            row("NaN", "499.99", ""),
            row("x", "499.99", ""),
            row("", "499.99", ""),
        ];
        assert!(build_catalog(&rows, &columns()).devices.is_empty());
    }

    #[test]
    fn prepaid_attached_only_when_positive() {
        let rows = vec![
            row("Pixel 8", "499.99", "$399.99"),
            row("Pixel 8a", "399.99", "junk"),
            row("Pixel 9", "799.99", ""),
        ];
        let catalog = build_catalog(&rows, &columns());
        assert_eq!(catalog.devices["Pixel 8"].prepaid, Some(399.99));
        assert_eq!(catalog.devices["Pixel 8a"].prepaid, None);
        assert_eq!(catalog.devices["Pixel 9"].prepaid, None);
    }

    #[test]
    fn duplicate_names_keep_the_last_row() {
        let rows = vec![row("Pixel 8", "499.99", ""), row("Pixel 8", "450.00", "")];
        let catalog = build_catalog(&rows, &columns());
        assert_eq!(catalog.devices["Pixel 8"].msrp, 450.00);
    }

    #[test]
    fn display_name_dictionary_hit() {
        assert_eq!(display_name("Apple iPhone 17 - Lavender 256GB"), "iPhone 17");
        assert_eq!(display_name("moto g play - 2024"), "Moto G Play");
    }

    #[test]
    fn display_name_strips_suffixes_and_caps_words() {
        // unmapped five-word name with a storage suffix
        assert_eq!(
            display_name("Samsung Galaxy Z Fold Ultra 128GB"),
            "Samsung Galaxy Z"
        );
        // unmapped variant suffix
        assert_eq!(
            display_name("Nokia G42 - So Purple 128GB"),
            "Nokia G42"
        );
    }

    #[test]
    fn display_name_falls_back_to_original() {
        assert_eq!(display_name("Pixel 8"), "Pixel 8");
    }

    #[tokio::test]
    async fn chunked_build_matches_synchronous_build() {
        let rows: Vec<RawRow> = (0..600)
            .map(|i| row(&format!("Device {i:04}"), "499.99", ""))
            .collect();
        let cols = columns();
        let sync_catalog = build_catalog(&rows, &cols);
        let chunked = build_catalog_chunked(&rows, &cols).await;
        assert_eq!(sync_catalog.devices, chunked.devices);
        assert_eq!(chunked.devices.len(), 600);
    }
}
