// src/tax/mod.rs

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// State-level sales tax rates for all 50 US states, as percentages
/// (2024 figures; local taxes are not included).
static STATE_TAX_RATES: &[(&str, f64)] = &[
    ("Alabama", 4.00),
    ("Alaska", 0.00), // no state sales tax
    ("Arizona", 5.60),
    ("Arkansas", 6.50),
    ("California", 7.25),
    ("Colorado", 2.90),
    ("Connecticut", 6.35),
    ("Delaware", 0.00), // no state sales tax
    ("Florida", 6.00),
    ("Georgia", 4.00),
    ("Hawaii", 4.17),
    ("Idaho", 6.00),
    ("Illinois", 6.25),
    ("Indiana", 7.00),
    ("Iowa", 6.00),
    ("Kansas", 6.50),
    ("Kentucky", 6.00),
    ("Louisiana", 4.45),
    ("Maine", 5.50),
    ("Maryland", 6.00),
    ("Massachusetts", 6.25),
    ("Michigan", 6.00),
    ("Minnesota", 6.88),
    ("Mississippi", 7.00),
    ("Missouri", 4.23),
    ("Montana", 0.00), // no state sales tax
    ("Nebraska", 5.50),
    ("Nevada", 6.85),
    ("New Hampshire", 0.00), // no state sales tax
    ("New Jersey", 6.63),
    ("New Mexico", 5.13),
    ("New York", 4.00),
    ("North Carolina", 4.75),
    ("North Dakota", 5.00),
    ("Ohio", 5.75),
    ("Oklahoma", 4.50),
    ("Oregon", 0.00), // no state sales tax
    ("Pennsylvania", 6.00),
    ("Rhode Island", 7.00),
    ("South Carolina", 6.00),
    ("South Dakota", 4.20),
    ("Tennessee", 7.00),
    ("Texas", 6.25),
    ("Utah", 6.10),
    ("Vermont", 6.00),
    ("Virginia", 5.30),
    ("Washington", 6.50),
    ("West Virginia", 6.00),
    ("Wisconsin", 5.00),
    ("Wyoming", 4.00),
];

static RATE_BY_STATE: Lazy<HashMap<&'static str, f64>> =
    Lazy::new(|| STATE_TAX_RATES.iter().copied().collect());

/// Tax and total for a single purchase, both rounded to cents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaxBreakdown {
    pub tax_amount: f64,
    pub total_amount: f64,
}

/// Sales tax rate for `state` as a percentage (e.g. 6.25 for 6.25%).
/// Unknown state names yield 0.00.
pub fn get_tax_rate(state: &str) -> f64 {
    RATE_BY_STATE.get(state).copied().unwrap_or(0.00)
}

/// Compute sales tax for `amount` at `rate_percent`. Negative amounts
/// yield a zero breakdown.
pub fn calculate_sales_tax(amount: f64, rate_percent: f64) -> TaxBreakdown {
    if amount < 0.0 {
        return TaxBreakdown {
            tax_amount: 0.00,
            total_amount: 0.00,
        };
    }
    let tax_amount = round_cents(amount * (rate_percent / 100.0));
    let total_amount = round_cents(amount + amount * (rate_percent / 100.0));
    TaxBreakdown {
        tax_amount,
        total_amount,
    }
}

/// All 50 state names in alphabetical order.
pub fn all_states() -> Vec<&'static str> {
    let mut states: Vec<&'static str> = STATE_TAX_RATES.iter().map(|(name, _)| *name).collect();
    states.sort_unstable();
    states
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
