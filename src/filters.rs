// 🔎 Dashboard State - filters, search, sort and expanded rows as plain values
//
// Nothing here is global: callers own a `DashboardState` and pass it to the
// functions that derive views from the immutable record set.

use crate::grouping::{sort_records, SortConfig, SortKey};
use crate::record::{Category, Quarter, QuarterlyRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Number of years offered in the year picker
pub const YEAR_OPTIONS: usize = 10;

// ============================================================================
// FILTERS
// ============================================================================

/// Dashboard filter selection. `None` means "all".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quarter: Option<Quarter>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl DashboardFilters {
    /// Only year and quarter selected. Project snapshots carry a project id
    /// rather than a company name, so they are matched by period alone.
    pub fn period(year: i32, quarter: Quarter) -> Self {
        DashboardFilters::default().with_year(year).with_quarter(quarter)
    }

    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = Some(company.into());
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_quarter(mut self, quarter: Quarter) -> Self {
        self.quarter = Some(quarter);
        self
    }

    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    pub fn is_active(&self) -> bool {
        self.company_id.is_some()
            || self.company.is_some()
            || self.year.is_some()
            || self.quarter.is_some()
            || self.search_term().is_some()
    }

    /// All selected filters must match (AND)
    pub fn matches(&self, record: &QuarterlyRecord) -> bool {
        if let Some(id) = self.company_id {
            if record.company_id != Some(id) {
                return false;
            }
        }
        if let Some(company) = &self.company {
            let same = record
                .company_name
                .as_deref()
                .map(|name| name.eq_ignore_ascii_case(company.trim()))
                .unwrap_or(false);
            if !same {
                return false;
            }
        }
        if self.year.is_some() && record.year != self.year {
            return false;
        }
        if self.quarter.is_some() && record.quarter != self.quarter {
            return false;
        }
        match self.search_term() {
            Some(term) => matches_search(record, &term),
            None => true,
        }
    }

    pub fn apply<'a>(
        &self,
        records: impl IntoIterator<Item = &'a QuarterlyRecord>,
    ) -> Vec<&'a QuarterlyRecord> {
        records.into_iter().filter(|r| self.matches(r)).collect()
    }

    /// Badge text for the "Active filters" strip
    pub fn active_labels(&self, company_name: Option<&str>) -> Vec<String> {
        let mut labels = Vec::new();
        if let Some(id) = self.company_id {
            labels.push(format!(
                "Company: {}",
                company_name
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("#{}", id))
            ));
        }
        if let Some(company) = &self.company {
            labels.push(format!("Company: {}", company));
        }
        if let Some(year) = self.year {
            labels.push(format!("Year: {}", year));
        }
        if let Some(quarter) = self.quarter {
            labels.push(format!("Quarter: {}", quarter.label()));
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.trim().is_empty()) {
            labels.push(format!("Search: {}", search));
        }
        labels
    }
}

/// Case-insensitive match on company name or any category line
/// (`term` must already be lower-cased)
fn matches_search(record: &QuarterlyRecord, term: &str) -> bool {
    let company_match = record
        .company_name
        .as_deref()
        .map(|name| name.to_lowercase().contains(term))
        .unwrap_or(false);
    if company_match {
        return true;
    }

    Category::ALL.iter().any(|category| {
        record
            .category(*category)
            .map(|field| {
                field
                    .lines()
                    .iter()
                    .any(|line| line.text.to_lowercase().contains(term))
            })
            .unwrap_or(false)
    })
}

/// Year picker options: the current year and the nine before it
pub fn year_options(current_year: i32) -> Vec<i32> {
    (0..YEAR_OPTIONS as i32).map(|i| current_year - i).collect()
}

// ============================================================================
// VIEW STATE
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActiveView {
    #[default]
    Table,
    Company,
    Timeline,
}

/// Row keys currently expanded in the table view
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpandedRows(BTreeSet<String>);

impl ExpandedRows {
    /// "{company}-{year}-{quarter}"
    pub fn row_key(record: &QuarterlyRecord) -> String {
        format!(
            "{}-{}-{}",
            record.company_label(),
            record.year.map(|y| y.to_string()).unwrap_or_default(),
            record.quarter.map(|q| q.as_str()).unwrap_or_default()
        )
    }

    /// Flip a row; returns whether it is now expanded
    pub fn toggle(&mut self, key: &str) -> bool {
        if self.0.remove(key) {
            false
        } else {
            self.0.insert(key.to_string());
            true
        }
    }

    pub fn is_expanded(&self, key: &str) -> bool {
        self.0.contains(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Everything the dashboard remembers between renders
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardState {
    pub filters: DashboardFilters,
    pub active_view: ActiveView,
    pub sort: Option<SortConfig>,
    pub expanded: ExpandedRows,
}

impl DashboardState {
    /// Replace the filter selection; expanded rows refer to the old rows
    pub fn apply_filters(&mut self, filters: DashboardFilters) {
        self.filters = filters;
        self.expanded = ExpandedRows::default();
    }

    pub fn reset(&mut self) {
        self.filters = DashboardFilters::default();
        self.expanded = ExpandedRows::default();
    }

    pub fn toggle_sort(&mut self, key: SortKey) {
        self.sort = Some(SortConfig::toggle(self.sort, key));
    }

    /// Filtered records, in table sort order
    pub fn visible_records<'a>(
        &self,
        records: impl IntoIterator<Item = &'a QuarterlyRecord>,
    ) -> Vec<&'a QuarterlyRecord> {
        sort_records(self.filters.apply(records), self.sort)
    }
}
