// 🔥 Innovation Heatmap - (company, year, quarter) → innovation count
//
// The matrix always covers the full cross-product of companies × years ×
// quarters; cells without a record hold 0 rather than being absent.

use crate::record::{Quarter, QuarterlyRecord};
use crate::stats::innovation_count;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Companies shown when the heatmap is not in admin mode
pub const DEFAULT_VISIBLE_COMPANIES: usize = 15;

/// Row labels longer than this are truncated with "..."
pub const LABEL_MAX_CHARS: usize = 20;

// ============================================================================
// INTENSITY
// ============================================================================

/// Presentation bucket for a cell count
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intensity {
    None,     // 0
    Low,      // 1-2
    Medium,   // 3-5
    High,     // 6-10
    VeryHigh, // 11+
}

impl Intensity {
    pub fn from_count(count: usize) -> Self {
        match count {
            0 => Intensity::None,
            1..=2 => Intensity::Low,
            3..=5 => Intensity::Medium,
            6..=10 => Intensity::High,
            _ => Intensity::VeryHigh,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Intensity::None => "none",
            Intensity::Low => "low",
            Intensity::Medium => "medium",
            Intensity::High => "high",
            Intensity::VeryHigh => "very-high",
        }
    }
}

// ============================================================================
// MATRIX
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapMatrix {
    /// Distinct company names, ascending
    companies: Vec<String>,
    /// Distinct years, newest first
    years: Vec<i32>,
    company_index: HashMap<String, usize>,
    year_index: HashMap<i32, usize>,
    /// Dense [company][year][quarter] counts
    counts: Vec<usize>,
}

impl HeatmapMatrix {
    /// Build the matrix. Records missing company, year or quarter are skipped;
    /// two records landing on the same cell add up.
    pub fn build<'a>(records: impl IntoIterator<Item = &'a QuarterlyRecord>) -> Self {
        let mut placed: Vec<(&str, i32, Quarter, usize)> = Vec::new();
        let mut skipped = 0usize;

        for record in records {
            let company = record.company_name.as_deref().filter(|name| !name.trim().is_empty());
            match (company, record.year, record.quarter) {
                (Some(company), Some(year), Some(quarter)) => {
                    placed.push((company, year, quarter, innovation_count(record)));
                }
                _ => skipped += 1,
            }
        }

        if skipped > 0 {
            debug!(skipped, "records without company/year/quarter left out of heatmap");
        }

        let companies: Vec<String> = placed
            .iter()
            .map(|(company, ..)| company.to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let mut years: Vec<i32> = placed
            .iter()
            .map(|(_, year, ..)| *year)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        years.reverse();

        let company_index: HashMap<String, usize> = companies
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();
        let year_index: HashMap<i32, usize> =
            years.iter().enumerate().map(|(i, y)| (*y, i)).collect();

        let mut matrix = HeatmapMatrix {
            counts: vec![0; companies.len() * years.len() * Quarter::ALL.len()],
            companies,
            years,
            company_index,
            year_index,
        };

        for (company, year, quarter, count) in placed {
            if let Some(slot) = matrix.slot(company, year, quarter) {
                matrix.counts[slot] += count;
            }
        }

        matrix
    }

    fn slot(&self, company: &str, year: i32, quarter: Quarter) -> Option<usize> {
        let c = *self.company_index.get(company)?;
        let y = *self.year_index.get(&year)?;
        let q = (quarter.weight() - 1) as usize;
        Some((c * self.years.len() + y) * Quarter::ALL.len() + q)
    }

    /// Cell value; `None` only for a company or year outside the axes
    pub fn get(&self, company: &str, year: i32, quarter: Quarter) -> Option<usize> {
        self.slot(company, year, quarter).map(|slot| self.counts[slot])
    }

    pub fn companies(&self) -> &[String] {
        &self.companies
    }

    pub fn years(&self) -> &[i32] {
        &self.years
    }

    pub fn cell_count(&self) -> usize {
        self.counts.len()
    }

    pub fn max_count(&self) -> usize {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    /// Cells with at least one innovation
    pub fn active_cells(&self) -> usize {
        self.counts.iter().filter(|c| **c > 0).count()
    }

    /// All companies in admin mode, otherwise the first `limit`
    pub fn visible_companies(&self, admin: bool, limit: usize) -> &[String] {
        if admin {
            &self.companies
        } else {
            &self.companies[..self.companies.len().min(limit)]
        }
    }

    /// Render-ready rows for the visible companies
    pub fn rows(&self, admin: bool, limit: usize) -> Vec<HeatmapRow> {
        self.visible_companies(admin, limit)
            .iter()
            .map(|company| HeatmapRow {
                company: company.clone(),
                label: truncate_label(company),
                cells: self
                    .years
                    .iter()
                    .flat_map(|year| Quarter::ALL.iter().map(move |q| (*year, *q)))
                    .map(|(year, quarter)| {
                        let count = self.get(company, year, quarter).unwrap_or(0);
                        HeatmapCell {
                            year,
                            quarter,
                            count,
                            intensity: Intensity::from_count(count),
                            tooltip: format!(
                                "{} - {} {}: {} innovations",
                                company,
                                quarter.label(),
                                year,
                                count
                            ),
                        }
                    })
                    .collect(),
            })
            .collect()
    }

    /// Serializable snapshot for API responses
    pub fn view(&self, admin: bool, limit: usize) -> HeatmapView {
        let rows = self.rows(admin, limit);
        HeatmapView {
            years: self.years.clone(),
            quarters: Quarter::ALL.to_vec(),
            total_companies: self.companies.len(),
            companies_shown: rows.len(),
            active_cells: self.active_cells(),
            max_count: self.max_count(),
            rows,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapCell {
    pub year: i32,
    pub quarter: Quarter,
    pub count: usize,
    pub intensity: Intensity,
    pub tooltip: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapRow {
    pub company: String,
    pub label: String,
    pub cells: Vec<HeatmapCell>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapView {
    pub years: Vec<i32>,
    pub quarters: Vec<Quarter>,
    pub total_companies: usize,
    pub companies_shown: usize,
    pub active_cells: usize,
    pub max_count: usize,
    pub rows: Vec<HeatmapRow>,
}

/// "Very Long Company Name Inc" → "Very Long Company Na..."
pub fn truncate_label(company: &str) -> String {
    if company.chars().count() > LABEL_MAX_CHARS {
        let head: String = company.chars().take(LABEL_MAX_CHARS).collect();
        format!("{}...", head)
    } else {
        company.to_string()
    }
}
