// src/ingest/parse.rs

use super::RawRow;

/// Split one CSV line into trimmed fields.
///
/// Double quotes wrap fields so embedded commas stay literal; `""` inside a
/// quoted field is one literal quote. Malformed quoting never errors: an
/// unterminated quote simply consumes the rest of the line.
pub fn split_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    // escaped quote
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(field.trim().to_string());
                field.clear();
            }
            _ => field.push(c),
        }
    }
    // the last field has no trailing separator
    fields.push(field.trim().to_string());
    fields
}

/// Split a document into its non-empty lines, tolerating `\r\n` endings.
pub fn document_lines(text: &str) -> Vec<&str> {
    text.lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .collect()
}

/// Assemble raw rows from the data lines that follow the header.
///
/// A row maps header name → cell text. Rows with fewer fields than headers,
/// and rows whose fields are all blank, are dropped.
pub fn data_rows(lines: &[&str], headers: &[String]) -> Vec<RawRow> {
    lines
        .iter()
        .filter_map(|line| {
            let fields = split_line(line);
            if fields.len() < headers.len() {
                return None;
            }
            if fields.iter().all(|f| f.is_empty()) {
                return None;
            }
            Some(
                headers
                    .iter()
                    .cloned()
                    .zip(fields.into_iter())
                    .collect::<RawRow>(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_plain_fields() {
        assert_eq!(split_line("a,b,c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn quoted_field_keeps_embedded_comma() {
        assert_eq!(split_line(r#"a,"b,c",d"#), vec!["a", "b,c", "d"]);
    }

    #[test]
    fn doubled_quote_is_literal() {
        assert_eq!(split_line(r#""He said ""hi""""#), vec![r#"He said "hi""#]);
    }

    #[test]
    fn fields_are_trimmed() {
        assert_eq!(split_line("  a , b ,c  "), vec!["a", "b", "c"]);
    }

    #[test]
    fn trailing_separator_emits_empty_field() {
        assert_eq!(split_line("a,b,"), vec!["a", "b", ""]);
    }

    #[test]
    fn unterminated_quote_consumes_to_end_of_line() {
        assert_eq!(split_line(r#"a,"b,c"#), vec!["a", "b,c"]);
    }

    #[test]
    fn document_lines_drops_blanks_and_carriage_returns() {
        let text = "first\r\n\r\n  \nsecond\nthird\n";
        assert_eq!(document_lines(text), vec!["first", "second", "third"]);
    }

    #[test]
    fn short_and_blank_rows_are_dropped() {
        let headers: Vec<String> = ["Name", "Price"].iter().map(|s| s.to_string()).collect();
        let rows = data_rows(&["only-one-field", ",", "Pixel 8,499.99"], &headers);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["Name"], "Pixel 8");
        assert_eq!(rows[0]["Price"], "499.99");
    }
}
