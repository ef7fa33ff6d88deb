// src/ingest/detect.rs

/// How many leading lines to scan for the header row.
const HEADER_SCAN_LINES: usize = 10;

/// Row used when no line in the scan window looks like a header. Matches
/// the sheet layout this pipeline was built against (three title lines,
/// then headers).
const HEADER_FALLBACK_ROW: usize = 3;

/// Keywords that mark a line as the header row.
static HEADER_KEYWORDS: &[&str] = &["phone", "device", "sap"];

/// Fixed column positions tried first: B for names, E for MSRP, I for the
/// suggested prepaid price.
const NAME_COLUMN_INDEX: usize = 1;
const PRICE_COLUMN_INDEX: usize = 4;
const PREPAID_COLUMN_INDEX: usize = 8;

static NAME_KEYWORDS: &[&str] = &["phone", "device", "equipment"];
static PRICE_KEYWORDS: &[&str] = &["purchase", "payment", "price", "msrp"];
static PREPAID_KEYWORDS: &[&str] = &["prepaid", "suggested"];

/// Header names of the columns the normalizer reads from each raw row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    pub name: String,
    pub price: String,
    pub prepaid: Option<String>,
}

/// Index of the header line: the earliest of the first ten lines containing
/// a header keyword, else the fixed fallback row.
pub fn find_header_index(lines: &[&str]) -> usize {
    lines
        .iter()
        .take(HEADER_SCAN_LINES)
        .position(|line| {
            let lower = line.to_lowercase();
            HEADER_KEYWORDS.iter().any(|kw| lower.contains(kw))
        })
        .unwrap_or(HEADER_FALLBACK_ROW)
}

type Strategy = fn(&[String]) -> Option<ColumnMap>;

/// Detection strategies, tried in order. Layout changes in the sheet break
/// the positional guess first, so the name scan backs it up.
static STRATEGIES: &[Strategy] = &[detect_by_position, detect_by_name];

/// Classify the header row's columns. `None` means the document cannot be
/// ingested; callers treat that as an empty catalog, not an error.
pub fn detect_columns(headers: &[String]) -> Option<ColumnMap> {
    STRATEGIES.iter().find_map(|strategy| strategy(headers))
}

fn detect_by_position(headers: &[String]) -> Option<ColumnMap> {
    let name = headers.get(NAME_COLUMN_INDEX)?;
    let price = headers.get(PRICE_COLUMN_INDEX)?;
    Some(ColumnMap {
        name: name.clone(),
        price: price.clone(),
        prepaid: headers.get(PREPAID_COLUMN_INDEX).cloned(),
    })
}

fn detect_by_name(headers: &[String]) -> Option<ColumnMap> {
    let name = find_by_keywords(headers, NAME_KEYWORDS)?;
    let price = find_by_keywords(headers, PRICE_KEYWORDS)?;
    Some(ColumnMap {
        name,
        price,
        prepaid: find_by_keywords(headers, PREPAID_KEYWORDS),
    })
}

fn find_by_keywords(headers: &[String], keywords: &[&str]) -> Option<String> {
    headers
        .iter()
        .find(|header| {
            let lower = header.to_lowercase();
            keywords.iter().any(|kw| lower.contains(kw))
        })
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn finds_header_line_by_keyword() {
        let lines = vec!["Price List", "Updated 2024", "SAP,Phone,Tier", "data"];
        assert_eq!(find_header_index(&lines), 2);
    }

    #[test]
    fn earliest_keyword_line_wins() {
        let lines = vec!["Device Pricing", "ignored", "SAP,Phone", "data"];
        assert_eq!(find_header_index(&lines), 0);
    }

    #[test]
    fn falls_back_to_fixed_row() {
        let lines = vec!["a", "b", "c", "Name,Cost", "data"];
        assert_eq!(find_header_index(&lines), HEADER_FALLBACK_ROW);
    }

    #[test]
    fn positional_detection_uses_columns_b_e_i() {
        let hs = headers(&[
            "SAP", "Phone", "Tier", "Term", "RIC Purchase Payment", "Down", "Monthly", "Tax",
            "Suggested Prepaid",
        ]);
        let cols = detect_columns(&hs).unwrap();
        assert_eq!(cols.name, "Phone");
        assert_eq!(cols.price, "RIC Purchase Payment");
        assert_eq!(cols.prepaid.as_deref(), Some("Suggested Prepaid"));
    }

    #[test]
    fn positional_detection_without_prepaid_column() {
        let hs = headers(&["SAP", "Phone", "Tier", "Term", "MSRP"]);
        let cols = detect_columns(&hs).unwrap();
        assert_eq!(cols.name, "Phone");
        assert_eq!(cols.price, "MSRP");
        assert_eq!(cols.prepaid, None);
    }

    #[test]
    fn name_scan_backs_up_positional_detection() {
        let hs = headers(&["Device Name", "MSRP"]);
        let cols = detect_columns(&hs).unwrap();
        assert_eq!(cols.name, "Device Name");
        assert_eq!(cols.price, "MSRP");
        assert_eq!(cols.prepaid, None);
    }

    #[test]
    fn undetectable_headers_yield_none() {
        assert_eq!(detect_columns(&headers(&["Foo", "Bar"])), None);
        assert_eq!(detect_columns(&[]), None);
    }

    #[test]
    fn detection_is_idempotent() {
        let hs = headers(&["Phone", "Purchase Price"]);
        assert_eq!(detect_columns(&hs), detect_columns(&hs));
    }
}
