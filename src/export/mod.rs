// 📤 Export - CSV and PDF documents from any record selection
//
// Exports take a plain slice of records, independent of which view produced
// it. The caller decides the file name; helpers below build the names the
// dashboard uses.

pub mod csv;
pub mod pdf;

use crate::config::PdfSettings;
use crate::record::{Quarter, QuarterlyRecord};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

pub use self::csv::{export_rows, records_to_csv, write_csv, ExportRow, CSV_HEADERS};
pub use self::pdf::{
    layout_comparison_report, layout_quarterly_report, render_pdf, render_pdf_at, PdfDocument,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Pdf,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv;charset=utf-8",
            ExportFormat::Pdf => "application/pdf",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "csv" => Some(ExportFormat::Csv),
            "pdf" => Some(ExportFormat::Pdf),
            _ => None,
        }
    }
}

/// A finished file, ready to write to disk or send as a download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDocument {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl ExportDocument {
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.filename.replace('"', ""))
    }
}

/// Build a CSV or PDF export. `filename` is given without extension.
pub fn build_document(
    records: &[&QuarterlyRecord],
    format: ExportFormat,
    filename: &str,
    pdf_settings: &PdfSettings,
) -> Result<ExportDocument> {
    let bytes = match format {
        ExportFormat::Csv => records_to_csv(records.iter().copied())?.into_bytes(),
        ExportFormat::Pdf => render_pdf(&layout_quarterly_report(records, pdf_settings))?,
    };

    let document = ExportDocument {
        filename: with_extension(filename, format),
        content_type: format.content_type(),
        bytes,
    };
    info!(
        filename = %document.filename,
        records = records.len(),
        bytes = document.bytes.len(),
        "built export"
    );
    Ok(document)
}

/// Company-vs-project comparison PDF for one period
pub fn build_comparison_document(
    company: &str,
    year: i32,
    quarter: Quarter,
    company_records: &[&QuarterlyRecord],
    project_records: &[&QuarterlyRecord],
    pdf_settings: &PdfSettings,
) -> Result<ExportDocument> {
    let layout = layout_comparison_report(
        company,
        year,
        quarter.as_str(),
        company_records,
        project_records,
        pdf_settings,
    );
    Ok(ExportDocument {
        filename: with_extension(&comparison_filename(company, year, quarter), ExportFormat::Pdf),
        content_type: ExportFormat::Pdf.content_type(),
        bytes: render_pdf(&layout)?,
    })
}

// ============================================================================
// FILE NAMES
// ============================================================================

/// Drop path separators and control characters; blank names become "export"
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|ch| match ch {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            ch if ch.is_control() => '_',
            ch => ch,
        })
        .collect();
    let cleaned = cleaned.trim_matches('.').trim();
    if cleaned.is_empty() {
        "export".to_string()
    } else {
        cleaned.to_string()
    }
}

fn with_extension(filename: &str, format: ExportFormat) -> String {
    format!("{}.{}", sanitize_filename(filename), format.extension())
}

pub fn all_records_filename() -> String {
    "all-quarterly-data".to_string()
}

pub fn filtered_records_filename() -> String {
    "filtered-quarterly-data".to_string()
}

/// "{company}-all-quarters"
pub fn company_filename(company: &str) -> String {
    format!("{}-all-quarters", company)
}

/// "{company}-{year}-{quarter}"
pub fn company_period_filename(company: &str, year: i32, quarter: Quarter) -> String {
    format!("{}-{}-{}", company, year, quarter.as_str())
}

/// "timeline-{year}-{quarter}"
pub fn timeline_filename(year: i32, quarter: Quarter) -> String {
    format!("timeline-{}-{}", year, quarter.as_str())
}

/// "{company}_{year}_{QUARTER}_Analysis"
pub fn analysis_filename(company: &str, year: i32, quarter: Quarter) -> String {
    format!("{}_{}_{}_Analysis", company, year, quarter.label())
}

/// "{company}_Comparison_{year}_{quarter}"
pub fn comparison_filename(company: &str, year: i32, quarter: Quarter) -> String {
    format!("{}_Comparison_{}_{}", company, year, quarter.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Category;

    fn sample() -> Vec<QuarterlyRecord> {
        vec![
            QuarterlyRecord::new("Acme Pay", 2024, Quarter::Q1)
                .with_lines(Category::Products, "1. Card issuance\n2. \n3. API launch"),
            QuarterlyRecord::new("Beta Bank", 2023, Quarter::Q4)
                .with_lines(Category::Regions, "1. Kenya"),
        ]
    }

    #[test]
    fn test_build_csv_document() {
        let records = sample();
        let refs: Vec<&QuarterlyRecord> = records.iter().collect();
        let doc = build_document(&refs, ExportFormat::Csv, "all-quarterly-data", &PdfSettings::default())
            .unwrap();

        assert_eq!(doc.filename, "all-quarterly-data.csv");
        assert_eq!(doc.content_type, "text/csv;charset=utf-8");
        let text = String::from_utf8(doc.bytes).unwrap();
        assert_eq!(text.lines().count(), 1 + 3);
    }

    #[test]
    fn test_build_pdf_document() {
        let records = sample();
        let refs: Vec<&QuarterlyRecord> = records.iter().collect();
        let doc = build_document(
            &refs,
            ExportFormat::Pdf,
            &analysis_filename("Acme Pay", 2024, Quarter::Q1),
            &PdfSettings::default(),
        )
        .unwrap();

        assert_eq!(doc.filename, "Acme Pay_2024_Q1_Analysis.pdf");
        assert!(doc.bytes.starts_with(b"%PDF-1.4"));
        assert_eq!(
            doc.content_disposition(),
            "attachment; filename=\"Acme Pay_2024_Q1_Analysis.pdf\""
        );
    }

    #[test]
    fn test_comparison_document() {
        let records = sample();
        let doc = build_comparison_document(
            "Acme Pay",
            2024,
            Quarter::Q1,
            &[&records[0]],
            &[],
            &PdfSettings::default(),
        )
        .unwrap();
        assert_eq!(doc.filename, "Acme Pay_Comparison_2024_q1.pdf");
        assert_eq!(doc.content_type, "application/pdf");
    }

    #[test]
    fn test_filenames() {
        assert_eq!(company_filename("Acme"), "Acme-all-quarters");
        assert_eq!(company_period_filename("Acme", 2024, Quarter::Q2), "Acme-2024-q2");
        assert_eq!(timeline_filename(2023, Quarter::Q4), "timeline-2023-q4");
        assert_eq!(sanitize_filename("../etc/passwd"), "_etc_passwd");
        assert_eq!(sanitize_filename("   "), "export");
        assert_eq!(ExportFormat::from_name("PDF"), Some(ExportFormat::Pdf));
        assert_eq!(ExportFormat::from_name("xls"), None);
    }
}
