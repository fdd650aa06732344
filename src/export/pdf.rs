// 🖨️ PDF Reports - page layout model + minimal PDF 1.4 writer
//
// Layout and rendering are separate steps. `layout_*` produce a
// `PdfDocument` of positioned text runs (millimetres, y grows downward) that
// tests can inspect; `render_pdf` serializes it with the standard Helvetica
// fonts, so no font files are embedded.

use crate::config::PdfSettings;
use crate::record::QuarterlyRecord;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

/// Title used when a report has no records to show
pub const EMPTY_REPORT_TITLE: &str = "Quarterly Innovation Report";

const MM_TO_PT: f32 = 72.0 / 25.4;
const BULLET: &str = "\u{2022} ";

// Vertical steps in millimetres
const TITLE_GAP: f32 = 15.0;
const BODY_LINE: f32 = 6.0;
const PARAGRAPH_GAP: f32 = 10.0;
const HEADER_GAP: f32 = 8.0;
const BULLET_GAP: f32 = 2.0;
const SECTION_GAP: f32 = 5.0;
const BULLET_INDENT: f32 = 5.0;
const BULLET_WRAP_INSET: f32 = 10.0;

// Comparison report
const COMPARISON_TITLE_GAP: f32 = 20.0;
const COMPARISON_HEADING_SIZE: f32 = 14.0;
const COMPARISON_HEADING_GAP: f32 = 10.0;
const COMPARISON_TEXT_SIZE: f32 = 10.0;
const COMPARISON_LINE: f32 = 4.0;
const COMPARISON_PARAGRAPH_GAP: f32 = 5.0;
const COMPARISON_SECTION_GAP: f32 = 10.0;

// ============================================================================
// LAYOUT MODEL
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource_name(&self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }
}

/// One line of text at an absolute position (top-left origin, mm)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextRun {
    pub x_mm: f32,
    pub y_mm: f32,
    pub font: Font,
    pub size: f32,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Page {
    pub runs: Vec<TextRun>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PdfDocument {
    pub title: String,
    pub page_width_mm: f32,
    pub page_height_mm: f32,
    pub pages: Vec<Page>,
}

impl PdfDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn runs(&self) -> impl Iterator<Item = &TextRun> {
        self.pages.iter().flat_map(|page| page.runs.iter())
    }
}

/// Writes runs top to bottom, opening pages as needed
struct LayoutCursor<'a> {
    settings: &'a PdfSettings,
    pages: Vec<Page>,
    y: f32,
}

impl<'a> LayoutCursor<'a> {
    fn new(settings: &'a PdfSettings) -> Self {
        LayoutCursor {
            settings,
            pages: vec![Page::default()],
            y: settings.margin_mm,
        }
    }

    fn new_page(&mut self) {
        self.pages.push(Page::default());
        self.y = self.settings.margin_mm;
    }

    fn break_if_below(&mut self, limit: f32) {
        if self.y > limit {
            self.new_page();
        }
    }

    fn text_at(&mut self, x_mm: f32, y_mm: f32, font: Font, size: f32, text: impl Into<String>) {
        if let Some(page) = self.pages.last_mut() {
            page.runs.push(TextRun {
                x_mm,
                y_mm,
                font,
                size,
                text: text.into(),
            });
        }
    }

    fn text(&mut self, x_mm: f32, font: Font, size: f32, text: impl Into<String>) {
        let y = self.y;
        self.text_at(x_mm, y, font, size, text);
    }

    /// Multi-line block; moves to a new page first if its last line would
    /// cross the bottom margin. Returns the y just below the last line.
    fn block(&mut self, x_mm: f32, size: f32, line_height: f32, lines: &[String]) -> f32 {
        if lines.is_empty() {
            return self.y;
        }
        let last_line_y = self.y + (lines.len() - 1) as f32 * line_height;
        if last_line_y > self.settings.bottom_y() && self.y > self.settings.margin_mm {
            self.new_page();
        }
        for (i, line) in lines.iter().enumerate() {
            let y = self.y + i as f32 * line_height;
            if y > self.settings.bottom_y() {
                // Block taller than a whole page: continue on the next one
                self.new_page();
                return self.block(x_mm, size, line_height, &lines[i..]);
            }
            self.text_at(x_mm, y, Font::Regular, size, line.clone());
        }
        self.y + lines.len() as f32 * line_height
    }

    fn finish(self, title: String) -> PdfDocument {
        PdfDocument {
            title,
            page_width_mm: self.settings.page_width_mm,
            page_height_mm: self.settings.page_height_mm,
            pages: self.pages,
        }
    }
}

// ============================================================================
// TEXT MEASUREMENT
// ============================================================================

/// Helvetica advance widths (1/1000 em) for ASCII 32..=126
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0..?
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // @..O
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // P.._
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // `..o
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // p..~
];

fn char_width(ch: char) -> u16 {
    match ch {
        ' '..='~' => HELVETICA_WIDTHS[ch as usize - 32],
        '\u{2022}' => 350,
        _ => 556,
    }
}

/// Rendered width of `text` in millimetres at `size` points
pub fn text_width_mm(text: &str, size: f32) -> f32 {
    let units: u32 = text.chars().map(|ch| u32::from(char_width(ch))).sum();
    units as f32 / 1000.0 * size / MM_TO_PT
}

/// Greedy word wrap to `max_width_mm`. Explicit newlines start new lines;
/// words wider than the line are split by character.
pub fn wrap_text(text: &str, size: f32, max_width_mm: f32) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();

        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current, word)
            };
            if text_width_mm(&candidate, size) <= max_width_mm {
                current = candidate;
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if text_width_mm(word, size) <= max_width_mm {
                current = word.to_string();
                continue;
            }
            for ch in word.chars() {
                current.push(ch);
                if current.chars().count() > 1 && text_width_mm(&current, size) > max_width_mm {
                    current.pop();
                    lines.push(std::mem::take(&mut current));
                    current.push(ch);
                }
            }
        }

        if !current.is_empty() {
            lines.push(current);
        }
    }

    lines
}

// ============================================================================
// REPORT LAYOUTS
// ============================================================================

/// "{company} - {year} {QUARTER} Analysis"
pub fn report_title(record: &QuarterlyRecord) -> String {
    let period = record.period_label();
    if period.is_empty() {
        format!("{} Analysis", record.company_label())
    } else {
        format!("{} - {} Analysis", record.company_label(), period)
    }
}

/// Quarterly analysis report: one page per record, then an
/// information paragraph and a bullet section per non-empty category.
pub fn layout_quarterly_report(records: &[&QuarterlyRecord], settings: &PdfSettings) -> PdfDocument {
    let mut cursor = LayoutCursor::new(settings);
    let margin = settings.margin_mm;
    let body = settings.body_font_size;

    if records.is_empty() {
        cursor.text(margin, Font::Bold, settings.title_font_size, EMPTY_REPORT_TITLE);
        return cursor.finish(EMPTY_REPORT_TITLE.to_string());
    }

    for (index, record) in records.iter().enumerate() {
        if index > 0 {
            cursor.new_page();
        }

        cursor.text(margin, Font::Bold, settings.title_font_size, report_title(record));
        cursor.y += TITLE_GAP;

        if let Some(information) = record.information.as_deref() {
            let lines = wrap_text(information, body, settings.usable_width_mm());
            if !lines.is_empty() {
                cursor.y = cursor.block(margin, body, BODY_LINE, &lines) + PARAGRAPH_GAP;
            }
        }

        for (category, field) in record.non_empty_categories() {
            cursor.break_if_below(settings.section_break_y());
            cursor.text(margin, Font::Bold, body, format!("{}:", category.display_name()));
            cursor.y += HEADER_GAP;

            for line in field.lines() {
                let wrapped = wrap_text(
                    &format!("{}{}", BULLET, line.text),
                    body,
                    settings.usable_width_mm() - BULLET_WRAP_INSET,
                );
                cursor.y =
                    cursor.block(margin + BULLET_INDENT, body, BODY_LINE, &wrapped) + BULLET_GAP;
            }
            cursor.y += SECTION_GAP;
        }
    }

    let title = match records {
        [single] => report_title(single),
        _ => EMPTY_REPORT_TITLE.to_string(),
    };
    cursor.finish(title)
}

/// Company-vs-project comparison for one period: the information
/// paragraphs of each side under its own heading.
pub fn layout_comparison_report(
    company: &str,
    year: i32,
    quarter: &str,
    company_records: &[&QuarterlyRecord],
    project_records: &[&QuarterlyRecord],
    settings: &PdfSettings,
) -> PdfDocument {
    let mut cursor = LayoutCursor::new(settings);
    let margin = settings.margin_mm;
    let title = format!("Comparison: {} - {} {}", company, year, quarter);

    cursor.text(margin, Font::Bold, settings.title_font_size, title.clone());
    cursor.y += COMPARISON_TITLE_GAP;

    let sections = [
        ("Company Analysis:", company_records),
        ("Project Analysis:", project_records),
    ];
    for (index, (heading, records)) in sections.iter().enumerate() {
        if index > 0 {
            cursor.y += COMPARISON_SECTION_GAP;
        }
        if records.is_empty() {
            continue;
        }

        cursor.break_if_below(settings.section_break_y());
        cursor.text(margin, Font::Bold, COMPARISON_HEADING_SIZE, *heading);
        cursor.y += COMPARISON_HEADING_GAP;

        for record in records.iter() {
            let Some(information) = record.information.as_deref() else {
                continue;
            };
            let lines = wrap_text(information, COMPARISON_TEXT_SIZE, settings.usable_width_mm());
            if lines.is_empty() {
                continue;
            }
            cursor.y = cursor.block(margin, COMPARISON_TEXT_SIZE, COMPARISON_LINE, &lines)
                + COMPARISON_PARAGRAPH_GAP;
        }
    }

    cursor.finish(title)
}

// ============================================================================
// PDF SERIALIZATION
// ============================================================================

/// Map a char to its WinAnsiEncoding byte
fn win_ansi_byte(ch: char) -> u8 {
    match ch {
        ' '..='~' => ch as u8,
        '\t' => b' ',
        '\u{a0}'..='\u{ff}' => ch as u32 as u8,
        '\u{20ac}' => 0x80,
        '\u{201a}' => 0x82,
        '\u{0192}' => 0x83,
        '\u{201e}' => 0x84,
        '\u{2026}' => 0x85,
        '\u{2020}' => 0x86,
        '\u{2021}' => 0x87,
        '\u{02c6}' => 0x88,
        '\u{2030}' => 0x89,
        '\u{0160}' => 0x8a,
        '\u{2039}' => 0x8b,
        '\u{0152}' => 0x8c,
        '\u{017d}' => 0x8e,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201c}' => 0x93,
        '\u{201d}' => 0x94,
        '\u{2022}' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\u{02dc}' => 0x98,
        '\u{2122}' => 0x99,
        '\u{0161}' => 0x9a,
        '\u{203a}' => 0x9b,
        '\u{0153}' => 0x9c,
        '\u{017e}' => 0x9e,
        '\u{0178}' => 0x9f,
        _ => b'?',
    }
}

/// PDF literal string body: WinAnsi bytes, `\ ( )` escaped, high bytes octal
pub fn pdf_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match win_ansi_byte(ch) {
            b'\\' => out.push_str("\\\\"),
            b'(' => out.push_str("\\("),
            b')' => out.push_str("\\)"),
            byte if byte >= 0x80 => out.push_str(&format!("\\{:03o}", byte)),
            byte => out.push(byte as char),
        }
    }
    out
}

fn content_stream(page: &Page, page_height_mm: f32) -> String {
    let mut stream = String::new();
    for run in &page.runs {
        stream.push_str(&format!(
            "BT /{} {:.1} Tf {:.2} {:.2} Td ({}) Tj ET\n",
            run.font.resource_name(),
            run.size,
            run.x_mm * MM_TO_PT,
            (page_height_mm - run.y_mm) * MM_TO_PT,
            pdf_string(&run.text)
        ));
    }
    stream
}

/// Serializes numbered objects and records their byte offsets for the xref table
struct ObjectWriter {
    buf: Vec<u8>,
    offsets: Vec<usize>,
}

impl ObjectWriter {
    fn object(&mut self, number: usize, body: &str) -> Result<()> {
        debug_assert_eq!(number, self.offsets.len() + 1);
        self.offsets.push(self.buf.len());
        write!(self.buf, "{} 0 obj\n{}\nendobj\n", number, body).context("Failed to write PDF object")
    }
}

/// Render with the current time as the creation date
pub fn render_pdf(document: &PdfDocument) -> Result<Vec<u8>> {
    render_pdf_at(document, Utc::now())
}

pub fn render_pdf_at(document: &PdfDocument, created: DateTime<Utc>) -> Result<Vec<u8>> {
    // 1 catalog, 2 page tree, 3-4 fonts, 5 info, then (page, contents) pairs
    const FIRST_PAGE_OBJECT: usize = 6;

    let mut writer = ObjectWriter {
        buf: Vec::new(),
        offsets: Vec::new(),
    };
    writer.buf.extend_from_slice(b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n");

    let kids: Vec<String> = (0..document.pages.len())
        .map(|i| format!("{} 0 R", FIRST_PAGE_OBJECT + 2 * i))
        .collect();

    writer.object(1, "<< /Type /Catalog /Pages 2 0 R >>")?;
    writer.object(
        2,
        &format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            document.pages.len()
        ),
    )?;
    writer.object(
        3,
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>",
    )?;
    writer.object(
        4,
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>",
    )?;
    writer.object(
        5,
        &format!(
            "<< /Title ({}) /Producer (innovation-insights) /CreationDate (D:{}Z) >>",
            pdf_string(&document.title),
            created.format("%Y%m%d%H%M%S")
        ),
    )?;

    let width_pt = document.page_width_mm * MM_TO_PT;
    let height_pt = document.page_height_mm * MM_TO_PT;

    for (i, page) in document.pages.iter().enumerate() {
        let page_object = FIRST_PAGE_OBJECT + 2 * i;
        let stream = content_stream(page, document.page_height_mm);

        writer.object(
            page_object,
            &format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {} 0 R >>",
                width_pt,
                height_pt,
                page_object + 1
            ),
        )?;
        writer.object(
            page_object + 1,
            &format!(
                "<< /Length {} >>\nstream\n{}endstream",
                stream.len(),
                stream
            ),
        )?;
    }

    let xref_offset = writer.buf.len();
    let object_count = writer.offsets.len() + 1;
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", object_count);
    for offset in &writer.offsets {
        xref.push_str(&format!("{:010} 00000 n \n", offset));
    }
    xref.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R /Info 5 0 R >>\nstartxref\n{}\n%%EOF\n",
        object_count, xref_offset
    ));
    writer.buf.extend_from_slice(xref.as_bytes());

    Ok(writer.buf)
}
