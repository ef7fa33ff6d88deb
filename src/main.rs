use anyhow::Result;
use salestax::{
    catalog::{CatalogService, FetchConfig},
    store::CacheStore,
    tax,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();
    info!("startup");

    // ─── 2) build store + catalog service ────────────────────────────
    let store = CacheStore::new("cache")?;
    let service = CatalogService::new(FetchConfig::default(), store.clone())?;

    // ─── 3) load the device catalog ──────────────────────────────────
    let catalog = service.fetch_catalog(false).await;
    let status = service.get_loading_status();
    match &status.last_error {
        Some(err) => warn!(devices = catalog.len(), error = %err, "catalog ready"),
        None => info!(devices = catalog.len(), "catalog ready"),
    }

    // ─── 4) show the popular subset ──────────────────────────────────
    for device in catalog.popular(4) {
        info!(name = %device.display_name, price = device.price, "popular device");
    }

    // ─── 5) sample quote: most popular device, Tennessee ─────────────
    if let Some(device) = catalog.popular(1).first() {
        let state = "Tennessee";
        let breakdown = tax::calculate_sales_tax(device.price, tax::get_tax_rate(state));
        info!(
            device = %device.display_name,
            state,
            amount = device.price,
            tax = breakdown.tax_amount,
            total = breakdown.total_amount,
            "sample quote"
        );
        store.record_calculation(state, device.price, &breakdown)?;
    }

    Ok(())
}
