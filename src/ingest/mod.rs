// src/ingest/mod.rs

use std::collections::HashMap;
use tracing::{debug, warn};

use crate::catalog::DeviceCatalog;

pub mod detect;
pub mod normalize;
pub mod parse;

pub use detect::{detect_columns, find_header_index, ColumnMap};
pub use normalize::{build_catalog, build_catalog_chunked, display_name, parse_price};
pub use parse::{data_rows, document_lines, split_line};

/// One data row keyed by header name.
pub type RawRow = HashMap<String, String>;

/// Run the full ingestion pipeline over a raw CSV document: locate the
/// header, classify its columns, and normalize the data rows.
///
/// Undetectable documents yield an empty catalog rather than an error; the
/// caller decides whether that counts as a failed load.
pub async fn build_catalog_from_text(text: &str) -> DeviceCatalog {
    let lines = document_lines(text);
    let header_index = find_header_index(&lines);

    let Some(header_line) = lines.get(header_index) else {
        warn!(lines = lines.len(), "document too short for a header row");
        return DeviceCatalog::empty();
    };
    let headers = split_line(header_line);

    let Some(columns) = detect_columns(&headers) else {
        warn!(?headers, "no usable name/price columns detected");
        return DeviceCatalog::empty();
    };

    let rows = data_rows(&lines[header_index + 1..], &headers);
    debug!(
        header_index,
        rows = rows.len(),
        name_column = %columns.name,
        price_column = %columns.price,
        "ingesting price sheet"
    );

    build_catalog_chunked(&rows, &columns).await
}
