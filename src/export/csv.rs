// 📄 CSV Export - one row per (record × category × line)

use crate::record::QuarterlyRecord;
use anyhow::{Context, Result};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use serde::Serialize;

pub const CSV_HEADERS: [&str; 5] = ["Company", "Year", "Quarter", "Category", "Content"];

/// One flattened export row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    pub company: String,
    pub year: String,
    pub quarter: String,
    pub category: String,
    pub content: String,
}

impl ExportRow {
    fn fields(&self) -> [&str; 5] {
        [
            self.company.as_str(),
            self.year.as_str(),
            self.quarter.as_str(),
            self.category.as_str(),
            self.content.as_str(),
        ]
    }
}

/// Flatten records into export rows.
///
/// Empty categories contribute nothing; the row count of a record always
/// equals its innovation count.
pub fn export_rows<'a>(records: impl IntoIterator<Item = &'a QuarterlyRecord>) -> Vec<ExportRow> {
    let mut rows = Vec::new();

    for record in records {
        let company = record.company_name.clone().unwrap_or_default();
        let year = record.year.map(|y| y.to_string()).unwrap_or_default();
        let quarter = record
            .quarter
            .map(|q| q.label().to_string())
            .unwrap_or_default();

        for (category, field) in record.non_empty_categories() {
            for line in field.lines() {
                rows.push(ExportRow {
                    company: company.clone(),
                    year: year.clone(),
                    quarter: quarter.clone(),
                    category: category.display_name().to_string(),
                    content: line.text.to_string(),
                });
            }
        }
    }

    rows
}

/// Render rows as CSV text: header first, every field quoted, `\n` between rows
pub fn write_csv(rows: &[ExportRow]) -> Result<String> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer
        .write_record(CSV_HEADERS)
        .context("Failed to write CSV header")?;
    for row in rows {
        writer
            .write_record(row.fields())
            .context("Failed to write CSV row")?;
    }

    let mut bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV writer: {}", e.error()))?;
    if bytes.last() == Some(&b'\n') {
        bytes.pop();
    }

    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

pub fn records_to_csv<'a>(records: impl IntoIterator<Item = &'a QuarterlyRecord>) -> Result<String> {
    write_csv(&export_rows(records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Category, CategoryField, CategoryItem, Quarter};
    use crate::stats::innovation_count;

    #[test]
    fn test_numbered_lines_become_rows() {
        let record = QuarterlyRecord::new("Acme Pay", 2024, Quarter::Q1)
            .with_lines(Category::Products, "1. Card issuance\n2. \n3. API launch");
        let rows = export_rows([&record]);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].content, "Card issuance");
        assert_eq!(rows[1].content, "API launch");
        assert!(rows.iter().all(|r| r.category == "Products" && r.quarter == "Q1"));
    }

    #[test]
    fn test_empty_categories_are_excluded() {
        let record = QuarterlyRecord::new("Acme Pay", 2024, Quarter::Q2)
            .with_lines(Category::BusinessModel, "")
            .with_category(Category::Launches, CategoryField::Items(vec![]))
            .with_category(
                Category::ApiUpdates,
                CategoryField::Items(vec![CategoryItem::new("Webhooks v2", "https://a.example")]),
            );
        let rows = export_rows([&record]);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].category, "API Updates");
        assert_eq!(rows.len(), innovation_count(&record));
    }

    #[test]
    fn test_csv_quoting() {
        let record = QuarterlyRecord::new("Acme \"Pay\", Inc", 2023, Quarter::Q4)
            .with_lines(Category::Regions, "1. Kenya");
        let csv = records_to_csv([&record]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], r#""Company","Year","Quarter","Category","Content""#);
        assert_eq!(
            lines[1],
            r#""Acme ""Pay"", Inc","2023","Q4","Regions","Kenya""#
        );
        assert!(!csv.ends_with('\n'));
    }

    #[test]
    fn test_missing_company_exports_empty_field() {
        let mut record = QuarterlyRecord::new("x", 2024, Quarter::Q3)
            .with_lines(Category::Other, "1. Misc");
        record.company_name = None;
        let csv = records_to_csv([&record]).unwrap();
        assert!(csv.lines().nth(1).unwrap().starts_with(r#""","2024","Q3""#));
    }

    #[test]
    fn test_empty_input_is_header_only() {
        let csv = records_to_csv(std::iter::empty()).unwrap();
        assert_eq!(csv, r#""Company","Year","Quarter","Category","Content""#);
    }
}
