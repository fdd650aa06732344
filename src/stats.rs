// 📊 Innovation Statistics - counts shared by every view and export
//
// `innovation_count` is the only place a record's total is computed.
// Table rows, company summaries, heatmap cells and export totals all call it.

use crate::record::{Category, QuarterlyRecord};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

// ============================================================================
// PER-RECORD COUNT
// ============================================================================

/// Number of lines in one category of a record (0 when absent)
pub fn category_count(record: &QuarterlyRecord, category: Category) -> usize {
    record
        .category(category)
        .map(|field| field.line_count())
        .unwrap_or(0)
}

/// Sum of non-empty lines/items across all nine categories
pub fn innovation_count(record: &QuarterlyRecord) -> usize {
    Category::ALL
        .iter()
        .map(|category| category_count(record, *category))
        .sum()
}

/// Total innovations across a set of records
pub fn total_innovations<'a>(records: impl IntoIterator<Item = &'a QuarterlyRecord>) -> usize {
    records.into_iter().map(innovation_count).sum()
}

/// Integer average rounded half up; an empty set averages to 0
pub fn average_per_record(total: usize, record_count: usize) -> usize {
    if record_count == 0 {
        return 0;
    }
    (2 * total + record_count) / (2 * record_count)
}

// ============================================================================
// AGGREGATE STATISTICS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InnovationStats {
    pub record_count: usize,
    pub company_count: usize,
    pub year_count: usize,
    pub quarter_count: usize,
    pub total_innovations: usize,
    pub per_category: BTreeMap<Category, usize>,
    /// Categories with a total above zero
    pub active_categories: usize,
    pub average_per_record: usize,
}

impl InnovationStats {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a QuarterlyRecord>) -> Self {
        let mut record_count = 0;
        let mut companies = HashSet::new();
        let mut years = HashSet::new();
        let mut quarters = HashSet::new();
        let mut per_category: BTreeMap<Category, usize> =
            Category::ALL.iter().map(|c| (*c, 0)).collect();

        for record in records {
            record_count += 1;

            if let Some(name) = record.company_name.as_deref().filter(|n| !n.trim().is_empty()) {
                companies.insert(name);
            }
            if let Some(year) = record.year {
                years.insert(year);
            }
            if let Some(quarter) = record.quarter {
                quarters.insert(quarter);
            }

            for category in Category::ALL {
                *per_category.entry(category).or_insert(0) += category_count(record, category);
            }
        }

        let total_innovations = per_category.values().sum();
        let active_categories = per_category.values().filter(|count| **count > 0).count();

        InnovationStats {
            record_count,
            company_count: companies.len(),
            year_count: years.len(),
            quarter_count: quarters.len(),
            total_innovations,
            per_category,
            active_categories,
            average_per_record: average_per_record(total_innovations, record_count),
        }
    }

    pub fn category_total(&self, category: Category) -> usize {
        self.per_category.get(&category).copied().unwrap_or(0)
    }

    pub fn summary(&self) -> String {
        format!(
            "Records: {}, Companies: {}, Innovations: {} (avg {} per record, {} active categories)",
            self.record_count,
            self.company_count,
            self.total_innovations,
            self.average_per_record,
            self.active_categories
        )
    }
}

// ============================================================================
// CATEGORY DISTRIBUTION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    pub category: Category,
    pub label: &'static str,
    pub count: usize,
    /// Rounded share of the overall total, 0 when the total is 0
    pub percentage: u32,
}

/// Per-category share of all innovations, in display order
pub fn category_distribution<'a>(
    records: impl IntoIterator<Item = &'a QuarterlyRecord>,
) -> Vec<CategoryShare> {
    let stats = InnovationStats::from_records(records);
    let total = stats.total_innovations;

    Category::ALL
        .iter()
        .map(|category| {
            let count = stats.category_total(*category);
            let percentage = if total > 0 {
                ((200 * count + total) / (2 * total)) as u32
            } else {
                0
            };
            CategoryShare {
                category: *category,
                label: category.display_name(),
                count,
                percentage,
            }
        })
        .collect()
}

/// Slices worth drawing in a pie chart (count above zero)
pub fn pie_slices(distribution: &[CategoryShare]) -> Vec<&CategoryShare> {
    distribution.iter().filter(|share| share.count > 0).collect()
}
