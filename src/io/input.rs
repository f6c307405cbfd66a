use std::path::Path;

use indexmap::IndexMap;
use tracing::debug;

use crate::error::ParseError;
use crate::models::SpendRecord;

/// Header synonyms, matched by substring against the lowercased header cell
pub const BUSINESS_COLUMN_SYNONYMS: &[&str] = &["business", "company", "name"];
pub const PRODUCT_COLUMN_SYNONYMS: &[&str] = &["product", "item"];
pub const SPEND_COLUMN_SYNONYMS: &[&str] = &["spend", "amount", "total"];

/// Product label for rows in files without a product column
pub const DEFAULT_PRODUCT: &str = "General";

const DELIMITER: char = ',';

/// Read a spend file and aggregate it into per-business records
pub fn parse_spend_file(path: &Path) -> Result<Vec<SpendRecord>, ParseError> {
    let content = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_spend_csv(&content)
}

/// Aggregate delimited spend data, reporting why nothing usable came out.
///
/// Fields are split on a bare comma; quoted fields and escaped delimiters are
/// not supported.
pub fn parse_spend_csv(text: &str) -> Result<Vec<SpendRecord>, ParseError> {
    let mut lines = text.lines();
    let header = lines.next().unwrap_or_default();
    let columns = ColumnLayout::from_header(header)?;

    let mut records: IndexMap<String, SpendRecord> = IndexMap::new();
    let mut skipped = 0usize;

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(DELIMITER).map(str::trim).collect();
        let business = fields.get(columns.business).copied().unwrap_or_default();
        if business.is_empty() {
            skipped += 1;
            continue;
        }

        let product = columns
            .product
            .and_then(|i| fields.get(i).copied())
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_PRODUCT);
        let amount = coerce_amount(fields.get(columns.spend).copied().unwrap_or_default());

        records
            .entry(business.to_string())
            .or_insert_with(|| SpendRecord::empty(business.to_string()))
            .add_spend(product.to_string(), amount);
    }

    if skipped > 0 {
        debug!("Skipped {} rows without a business name", skipped);
    }

    if records.is_empty() {
        return Err(ParseError::NoRecords);
    }

    let mut records: Vec<SpendRecord> = records.into_values().collect();
    // sort_by is stable, so equal totals keep first-seen order
    records.sort_by(|a, b| b.total_spend().total_cmp(&a.total_spend()));

    Ok(records)
}

/// Aggregate delimited spend data, yielding an empty list on any failure
pub fn aggregate_spend_csv(text: &str) -> Vec<SpendRecord> {
    parse_spend_csv(text).unwrap_or_else(|e| {
        debug!("Spend data produced no records: {}", e);
        Vec::new()
    })
}

/// Strip currency symbols and thousands separators, then parse. Zero on failure.
///
/// Every character other than digits, `.` and `-` is dropped before parsing, so
/// exponent forms are mangled (`1e3` reads as `13`) and a malformed number such
/// as `12.5.0` reads as zero rather than its leading value.
pub fn coerce_amount(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    cleaned.parse::<f64>().unwrap_or(0.0)
}

/// Column positions resolved from the header line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnLayout {
    business: usize,
    product: Option<usize>,
    spend: usize,
}

impl ColumnLayout {
    fn from_header(header: &str) -> Result<Self, ParseError> {
        let headers: Vec<String> = header
            .split(DELIMITER)
            .map(|h| h.trim().to_lowercase())
            .collect();

        let business = find_column(&headers, BUSINESS_COLUMN_SYNONYMS).ok_or_else(|| {
            ParseError::MissingColumn {
                column: "business",
                expected: BUSINESS_COLUMN_SYNONYMS.join(", "),
            }
        })?;
        let spend = find_column(&headers, SPEND_COLUMN_SYNONYMS).ok_or_else(|| {
            ParseError::MissingColumn {
                column: "spend",
                expected: SPEND_COLUMN_SYNONYMS.join(", "),
            }
        })?;
        let product = find_column(&headers, PRODUCT_COLUMN_SYNONYMS);

        Ok(Self {
            business,
            product,
            spend,
        })
    }
}

/// First column, left to right, whose header contains any synonym
fn find_column(headers: &[String], synonyms: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| synonyms.iter().any(|s| h.contains(s)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregates_currency_formatted_rows() {
        let csv = "Business,Product,Spend\nAcme,Widget,$1000.00\nAcme,Gadget,500\n";
        let records = aggregate_spend_csv(csv);

        assert_eq!(records.len(), 1);
        let acme = &records[0];
        assert_eq!(acme.business_name(), "Acme");
        assert_eq!(acme.total_spend(), 1500.0);
        assert_eq!(acme.products()["Widget"], 1000.0);
        assert_eq!(acme.products()["Gadget"], 500.0);
    }

    #[test]
    fn test_quoted_fields_are_not_unquoted() {
        let csv = "Business,Product,Spend\nAcme,Widget,\"$1,000.00\"\n";
        let records = aggregate_spend_csv(csv);

        // The quoted amount splits on its thousands separator
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].total_spend(), 1.0);
    }

    #[test]
    fn test_coerce_amount_strips_symbols_and_separators() {
        assert_eq!(coerce_amount("$1,000.00"), 1000.0);
        assert_eq!(coerce_amount("€ 2.500"), 2.5);
        assert_eq!(coerce_amount("500"), 500.0);
        assert_eq!(coerce_amount("-42"), -42.0);
        assert_eq!(coerce_amount("n/a"), 0.0);
        assert_eq!(coerce_amount("1e3"), 13.0);
        assert_eq!(coerce_amount("12.5.0"), 0.0);
        assert_eq!(coerce_amount(""), 0.0);
    }

    #[test]
    fn test_repeated_product_accumulates() {
        let csv = "company,item,amount\nAcme,Widget,100\nAcme,Widget,250\nAcme,Gadget,50\n";
        let records = aggregate_spend_csv(csv);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].products()["Widget"], 350.0);
        assert_eq!(records[0].total_spend(), 400.0);
    }

    #[test]
    fn test_one_record_per_business_and_totals_match() {
        let csv = "Business Name,Product,Total Spend\n\
                   Acme,Widget,100\n\
                   Globex,Gizmo,75\n\
                   acme,Widget,5\n\
                   Acme,Gadget,20\n\
                   Globex,Gizmo,25\n";
        let records = aggregate_spend_csv(csv);

        // Business names are case-sensitive
        let names: Vec<_> = records.iter().map(|r| r.business_name()).collect();
        assert_eq!(names, vec!["Acme", "Globex", "acme"]);

        for record in &records {
            let sum: f64 = record.products().values().sum();
            assert_eq!(record.total_spend(), sum);
        }
    }

    #[test]
    fn test_total_matches_breakdown_with_interleaved_cents() {
        let csv = "business,product,spend\n\
                   Acme,Widget,0.10\n\
                   Acme,Gadget,0.10\n\
                   Acme,Widget,19.99\n\
                   Globex,Gizmo,3.30\n\
                   Globex,Gadget,0.07\n\
                   Globex,Gizmo,1.15\n";
        let records = aggregate_spend_csv(csv);

        assert_eq!(records.len(), 2);
        for record in &records {
            let sum: f64 = record.products().values().sum();
            assert_eq!(record.total_spend(), sum);
        }
    }

    #[test]
    fn test_sort_is_descending_and_stable() {
        let csv = "business,spend\nA,300\nB,900\nC,900\nD,100\n";
        let records = aggregate_spend_csv(csv);

        let names: Vec<_> = records.iter().map(|r| r.business_name()).collect();
        assert_eq!(names, vec!["B", "C", "A", "D"]);
        assert!(records.windows(2).all(|w| w[0].total_spend() >= w[1].total_spend()));
    }

    #[test]
    fn test_missing_product_column_uses_placeholder() {
        let csv = "Company,Amount\nAcme,10\nAcme,15\n";
        let records = aggregate_spend_csv(csv);

        assert_eq!(records[0].product_count(), 1);
        assert_eq!(records[0].products()[DEFAULT_PRODUCT], 25.0);
    }

    #[test]
    fn test_rows_without_business_are_skipped() {
        let csv = "business,product,spend\n,Widget,100\n   ,Widget,5\nAcme,Widget,bad\n\n";
        let records = aggregate_spend_csv(csv);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].business_name(), "Acme");
        assert_eq!(records[0].total_spend(), 0.0);
    }

    #[test]
    fn test_missing_required_columns_is_empty_not_error() {
        assert!(aggregate_spend_csv("product,spend\nWidget,10\n").is_empty());
        assert!(aggregate_spend_csv("business,product\nAcme,Widget\n").is_empty());
        assert!(aggregate_spend_csv("foo,bar\n1,2\n").is_empty());
        assert!(aggregate_spend_csv("").is_empty());
    }

    #[test]
    fn test_header_only_is_empty_not_error() {
        assert!(aggregate_spend_csv("business,product,spend\n").is_empty());
    }

    #[test]
    fn test_parse_reports_reason() {
        match parse_spend_csv("product,spend\nWidget,10\n") {
            Err(ParseError::MissingColumn { column, .. }) => assert_eq!(column, "business"),
            other => panic!("expected missing business column, got {:?}", other),
        }
        match parse_spend_csv("business,item\nAcme,Widget\n") {
            Err(ParseError::MissingColumn { column, .. }) => assert_eq!(column, "spend"),
            other => panic!("expected missing spend column, got {:?}", other),
        }
        assert!(matches!(
            parse_spend_csv("business,spend\n"),
            Err(ParseError::NoRecords)
        ));
    }

    #[test]
    fn test_short_rows_default_spend_to_zero() {
        let csv = "business,product,spend\nAcme,Widget\nAcme,Gadget,12\n";
        let records = aggregate_spend_csv(csv);

        assert_eq!(records[0].products()["Widget"], 0.0);
        assert_eq!(records[0].total_spend(), 12.0);
    }

    #[test]
    fn test_parse_spend_file_missing_path() {
        let err = parse_spend_file(Path::new("/nonexistent/spend.csv")).unwrap_err();
        assert!(matches!(err, ParseError::Io { .. }));
    }

    #[test]
    fn test_parse_spend_file_reads_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spend.csv");
        std::fs::write(&path, "business,spend\r\nAcme,10\r\nGlobex,20\r\n").unwrap();

        let records = parse_spend_file(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].business_name(), "Globex");
    }
}
