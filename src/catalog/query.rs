// src/catalog/query.rs

use serde::Serialize;

use super::{DeviceCatalog, DeviceRecord};

/// Devices surfaced first by [`DeviceCatalog::popular`], in order of
/// preference. Names must match the sheet exactly.
static PREFERRED_DEVICES: &[&str] = &[
    "Apple iPhone 17 - Lavender 256GB",
    "Samsung Galaxy S25 Silver Shadow 128GB",
    "moto g play - 2024",
    "Samsung Galaxy A16 5G",
];

/// A catalog entry shaped for a picker or homepage tile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopularDevice {
    pub name: String,
    pub price: f64,
    pub display_name: String,
}

impl DeviceCatalog {
    /// Exact-name lookup.
    pub fn lookup(&self, name: &str) -> Option<&DeviceRecord> {
        self.devices.get(name)
    }

    /// Case-insensitive substring search over device names, truncated to
    /// `limit`. An empty query returns the first `limit` names in catalog
    /// order.
    pub fn search(&self, query: &str, limit: usize) -> Vec<String> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return self.devices.keys().take(limit).cloned().collect();
        }
        self.devices
            .keys()
            .filter(|name| name.to_lowercase().contains(&query))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Up to `limit` devices for a default display: the preferred list
    /// first (those actually present), then other entries in catalog order.
    pub fn popular(&self, limit: usize) -> Vec<PopularDevice> {
        let mut picks: Vec<PopularDevice> = Vec::with_capacity(limit);

        for name in PREFERRED_DEVICES {
            if picks.len() >= limit {
                break;
            }
            if let Some(record) = self.devices.get(*name) {
                picks.push(PopularDevice {
                    name: name.to_string(),
                    price: record.msrp,
                    display_name: record.display_name.clone(),
                });
            }
        }

        if picks.len() < limit {
            for (name, record) in &self.devices {
                if picks.len() >= limit {
                    break;
                }
                if picks.iter().any(|p| &p.name == name) {
                    continue;
                }
                picks.push(PopularDevice {
                    name: name.clone(),
                    price: record.msrp,
                    display_name: record.display_name.clone(),
                });
            }
        }

        picks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::display_name;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn catalog_of(names: &[(&str, f64)]) -> DeviceCatalog {
        let devices: BTreeMap<String, DeviceRecord> = names
            .iter()
            .map(|(name, msrp)| {
                (
                    name.to_string(),
                    DeviceRecord {
                        msrp: *msrp,
                        prepaid: None,
                        display_name: display_name(name),
                    },
                )
            })
            .collect();
        DeviceCatalog {
            devices,
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn lookup_is_exact() {
        let catalog = catalog_of(&[("Google Pixel 8", 499.99)]);
        assert!(catalog.lookup("Google Pixel 8").is_some());
        assert!(catalog.lookup("google pixel 8").is_none());
        assert!(catalog.lookup("Pixel").is_none());
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let catalog = catalog_of(&[
            ("Apple iPhone 15 Black 128GB", 729.99),
            ("Google Pixel 8", 499.99),
            ("Samsung Galaxy A16 5G", 199.99),
        ]);
        assert_eq!(catalog.search("pixel", 10), vec!["Google Pixel 8"]);
        assert_eq!(catalog.search("IPHONE", 10).len(), 1);
        assert!(catalog.search("nokia", 10).is_empty());
    }

    #[test]
    fn empty_query_returns_first_names_in_catalog_order() {
        let catalog = catalog_of(&[("C", 10.0), ("A", 10.0), ("B", 10.0)]);
        assert_eq!(catalog.search("", 2), vec!["A", "B"]);
    }

    #[test]
    fn search_respects_limit() {
        let catalog = catalog_of(&[("Pixel 8", 10.0), ("Pixel 8a", 10.0), ("Pixel 9", 10.0)]);
        assert_eq!(catalog.search("pixel", 2).len(), 2);
    }

    #[test]
    fn popular_prefers_the_fixed_list_then_fills() {
        let catalog = catalog_of(&[
            ("Apple iPhone 17 - Lavender 256GB", 1099.99),
            ("Google Pixel 8", 499.99),
            ("Samsung Galaxy A16 5G", 199.99),
            ("Aardvark Phone", 49.99),
        ]);
        let popular = catalog.popular(3);
        assert_eq!(popular.len(), 3);
        // preferred entries first, in preference order
        assert_eq!(popular[0].name, "Apple iPhone 17 - Lavender 256GB");
        assert_eq!(popular[0].display_name, "iPhone 17");
        assert_eq!(popular[1].name, "Samsung Galaxy A16 5G");
        // then catalog-order fill
        assert_eq!(popular[2].name, "Aardvark Phone");
    }

    #[test]
    fn popular_on_empty_catalog_is_empty() {
        assert!(DeviceCatalog::empty().popular(4).is_empty());
    }
}
