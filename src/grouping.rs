// 🗂️ Grouping & Sorting - company and timeline views over borrowed records
//
// Views hold `&QuarterlyRecord`, never copies: every record of the input
// lands in at most one group, and source records are never mutated.

use crate::record::{Quarter, QuarterlyRecord};
use crate::stats::innovation_count;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::Hash;
use tracing::debug;

// ============================================================================
// GROUPED VIEW
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct Group<'a, K> {
    pub key: K,
    pub records: Vec<&'a QuarterlyRecord>,
}

/// Ordered key → records mapping
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct GroupedView<'a, K> {
    groups: Vec<Group<'a, K>>,
}

impl<'a, K: Eq> GroupedView<'a, K> {
    pub fn groups(&self) -> &[Group<'a, K>] {
        &self.groups
    }

    pub fn get(&self, key: &K) -> Option<&[&'a QuarterlyRecord]> {
        self.groups
            .iter()
            .find(|g| &g.key == key)
            .map(|g| g.records.as_slice())
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.groups.iter().map(|g| &g.key)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Records across all groups
    pub fn record_count(&self) -> usize {
        self.groups.iter().map(|g| g.records.len()).sum()
    }

    pub fn into_groups(self) -> Vec<Group<'a, K>> {
        self.groups
    }
}

/// Partition records by key, groups in first-appearance order.
///
/// Records whose key selector returns `None` are skipped.
pub fn group_by<'a, K, F>(
    records: impl IntoIterator<Item = &'a QuarterlyRecord>,
    key_of: F,
) -> GroupedView<'a, K>
where
    K: Eq + Hash + Clone,
    F: Fn(&QuarterlyRecord) -> Option<K>,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<Group<'a, K>> = Vec::new();
    let mut skipped = 0usize;

    for record in records {
        let Some(key) = key_of(record) else {
            skipped += 1;
            continue;
        };

        let slot = *index.entry(key.clone()).or_insert_with(|| {
            groups.push(Group {
                key,
                records: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].records.push(record);
    }

    if skipped > 0 {
        debug!(skipped, "records without a grouping key left out of view");
    }

    GroupedView { groups }
}

// ============================================================================
// COMPARATORS
// ============================================================================

/// Newest first: year descending, then quarter descending (q4 > q1)
pub fn newest_first(a: &QuarterlyRecord, b: &QuarterlyRecord) -> Ordering {
    b.year.cmp(&a.year).then_with(|| b.quarter.cmp(&a.quarter))
}

/// Company name ascending, case-insensitive; unnamed records last
pub fn by_company_name(a: &QuarterlyRecord, b: &QuarterlyRecord) -> Ordering {
    match (&a.company_name, &b.company_name) {
        (Some(x), Some(y)) => x.to_lowercase().cmp(&y.to_lowercase()),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

// ============================================================================
// COMPANY VIEW
// ============================================================================

/// Group by company name; quarters within a company newest first.
///
/// `Vec::sort_by` is stable, so two records with the same (year, quarter)
/// keep their input order.
pub fn group_by_company<'a>(
    records: impl IntoIterator<Item = &'a QuarterlyRecord>,
) -> GroupedView<'a, String> {
    let mut view = group_by(records, |r| {
        r.company_name
            .as_ref()
            .filter(|name| !name.trim().is_empty())
            .cloned()
    });
    for group in &mut view.groups {
        group.records.sort_by(|a, b| newest_first(a, b));
    }
    view
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanySummary {
    pub company: String,
    pub quarters: usize,
    pub innovations: usize,
}

pub fn company_summaries(view: &GroupedView<'_, String>) -> Vec<CompanySummary> {
    view.groups()
        .iter()
        .map(|group| CompanySummary {
            company: group.key.clone(),
            quarters: group.records.len(),
            innovations: group.records.iter().map(|r| innovation_count(r)).sum(),
        })
        .collect()
}

// ============================================================================
// TIMELINE VIEW
// ============================================================================

/// (year, quarter) period key; orders chronologically
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    pub year: i32,
    pub quarter: Quarter,
}

impl Period {
    pub fn new(year: i32, quarter: Quarter) -> Self {
        Period { year, quarter }
    }

    pub fn of(record: &QuarterlyRecord) -> Option<Self> {
        Some(Period::new(record.year?, record.quarter?))
    }

    pub fn label(&self) -> String {
        format!("{} {}", self.quarter.label(), self.year)
    }
}

/// Group by (year, quarter), periods newest first, companies A→Z inside
pub fn group_by_timeline<'a>(
    records: impl IntoIterator<Item = &'a QuarterlyRecord>,
) -> GroupedView<'a, Period> {
    let mut view = group_by(records, Period::of);
    view.groups.sort_by(|a, b| b.key.cmp(&a.key));
    for group in &mut view.groups {
        group.records.sort_by(|a, b| by_company_name(a, b));
    }
    view
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodSummary {
    pub period: Period,
    pub label: String,
    pub companies: usize,
    pub innovations: usize,
}

pub fn period_summaries(view: &GroupedView<'_, Period>) -> Vec<PeriodSummary> {
    view.groups()
        .iter()
        .map(|group| PeriodSummary {
            period: group.key,
            label: group.key.label(),
            companies: group.records.len(),
            innovations: group.records.iter().map(|r| innovation_count(r)).sum(),
        })
        .collect()
}

// ============================================================================
// TABLE SORT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Company,
    Year,
    Quarter,
}

impl SortKey {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "company" => Some(SortKey::Company),
            "year" => Some(SortKey::Year),
            "quarter" => Some(SortKey::Quarter),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortConfig {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortConfig {
    pub fn asc(key: SortKey) -> Self {
        SortConfig {
            key,
            direction: SortDirection::Asc,
        }
    }

    /// Column-header click: same key while ascending flips to descending,
    /// anything else sorts ascending by the clicked key
    pub fn toggle(current: Option<SortConfig>, key: SortKey) -> SortConfig {
        match current {
            Some(c) if c.key == key && c.direction == SortDirection::Asc => SortConfig {
                key,
                direction: SortDirection::Desc,
            },
            _ => SortConfig::asc(key),
        }
    }

    fn compare(&self, a: &QuarterlyRecord, b: &QuarterlyRecord) -> Ordering {
        match self.key {
            SortKey::Company => compare_present(
                a.company_name.as_deref(),
                b.company_name.as_deref(),
                self.direction,
            ),
            SortKey::Year => compare_present(a.year, b.year, self.direction),
            SortKey::Quarter => compare_present(a.quarter, b.quarter, self.direction),
        }
    }
}

// Missing values sort last in both directions
fn compare_present<T: Ord>(a: Option<T>, b: Option<T>, direction: SortDirection) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => match direction {
            SortDirection::Asc => x.cmp(&y),
            SortDirection::Desc => y.cmp(&x),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Table rows in display order; `None` keeps input order
pub fn sort_records<'a>(
    records: impl IntoIterator<Item = &'a QuarterlyRecord>,
    sort: Option<SortConfig>,
) -> Vec<&'a QuarterlyRecord> {
    let mut rows: Vec<&QuarterlyRecord> = records.into_iter().collect();
    if let Some(config) = sort {
        rows.sort_by(|a, b| config.compare(a, b));
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Category;
    use std::ptr;

    fn record(company: &str, year: i32, quarter: Quarter, products: &str) -> QuarterlyRecord {
        QuarterlyRecord::new(company, year, quarter).with_lines(Category::Products, products)
    }

    fn sample() -> Vec<QuarterlyRecord> {
        vec![
            record("Zeta", 2023, Quarter::Q2, "1. a"),
            record("Acme", 2023, Quarter::Q1, "1. b"),
            record("Acme", 2024, Quarter::Q1, "1. c\n2. d"),
            record("Zeta", 2024, Quarter::Q3, "1. e"),
            record("Acme", 2023, Quarter::Q4, "1. f"),
            record("beta", 2024, Quarter::Q3, ""),
        ]
    }

    #[test]
    fn test_group_by_company_sorts_newest_first() {
        let records = sample();
        let view = group_by_company(&records);

        let keys: Vec<&String> = view.keys().collect();
        assert_eq!(keys, vec!["Zeta", "Acme", "beta"]);

        let acme = view.get(&"Acme".to_string()).unwrap();
        let periods: Vec<(Option<i32>, Option<Quarter>)> =
            acme.iter().map(|r| (r.year, r.quarter)).collect();
        assert_eq!(
            periods,
            vec![
                (Some(2024), Some(Quarter::Q1)),
                (Some(2023), Some(Quarter::Q4)),
                (Some(2023), Some(Quarter::Q1)),
            ]
        );
    }

    #[test]
    fn test_grouping_is_a_partition() {
        let records = sample();
        let view = group_by_company(&records);

        assert_eq!(view.record_count(), records.len());
        for original in &records {
            let hits = view
                .groups()
                .iter()
                .flat_map(|g| g.records.iter())
                .filter(|r| ptr::eq(**r, original))
                .count();
            assert_eq!(hits, 1);
        }
    }

    #[test]
    fn test_same_period_keeps_source_order() {
        let first = record("Acme", 2024, Quarter::Q2, "1. first");
        let second = record("Acme", 2024, Quarter::Q2, "1. second");
        let older = record("Acme", 2022, Quarter::Q4, "1. older");
        let records = vec![first, older, second];

        let view = group_by_company(&records);
        let acme = view.get(&"Acme".to_string()).unwrap();
        assert!(ptr::eq(acme[0], &records[0]));
        assert!(ptr::eq(acme[1], &records[2]));
        assert!(ptr::eq(acme[2], &records[1]));
    }

    #[test]
    fn test_missing_keys_are_skipped() {
        let mut anonymous = record("x", 2024, Quarter::Q1, "1. a");
        anonymous.company_name = None;
        let mut undated = record("Acme", 2024, Quarter::Q1, "1. a");
        undated.year = None;
        let records = vec![anonymous, undated];

        let by_company = group_by_company(&records);
        assert_eq!(by_company.record_count(), 1);
        assert!(ptr::eq(by_company.groups()[0].records[0], &records[1]));

        let timeline = group_by_timeline(&records);
        assert_eq!(timeline.record_count(), 1);
        assert!(ptr::eq(timeline.groups()[0].records[0], &records[0]));
    }

    #[test]
    fn test_empty_input_yields_empty_view() {
        let records: Vec<QuarterlyRecord> = Vec::new();
        assert!(group_by_company(&records).is_empty());
        assert!(group_by_timeline(&records).is_empty());
    }

    #[test]
    fn test_timeline_orders_periods_and_companies() {
        let records = sample();
        let view = group_by_timeline(&records);

        let keys: Vec<Period> = view.keys().copied().collect();
        assert_eq!(
            keys,
            vec![
                Period::new(2024, Quarter::Q3),
                Period::new(2024, Quarter::Q1),
                Period::new(2023, Quarter::Q4),
                Period::new(2023, Quarter::Q2),
                Period::new(2023, Quarter::Q1),
            ]
        );

        let q3 = view.get(&Period::new(2024, Quarter::Q3)).unwrap();
        let names: Vec<&str> = q3.iter().filter_map(|r| r.company_name.as_deref()).collect();
        assert_eq!(names, vec!["beta", "Zeta"]);
        assert_eq!(view.record_count(), records.len());
    }

    #[test]
    fn test_summaries_use_innovation_count() {
        let records = sample();
        let companies = company_summaries(&group_by_company(&records));
        let acme = companies.iter().find(|s| s.company == "Acme").unwrap();
        assert_eq!(acme.quarters, 3);
        assert_eq!(acme.innovations, 4);

        let periods = period_summaries(&group_by_timeline(&records));
        assert_eq!(periods[0].label, "Q3 2024");
        assert_eq!(periods[0].companies, 2);
        assert_eq!(periods[0].innovations, 1);
    }

    #[test]
    fn test_sort_toggle_rule() {
        let first = SortConfig::toggle(None, SortKey::Year);
        assert_eq!(first, SortConfig::asc(SortKey::Year));

        let second = SortConfig::toggle(Some(first), SortKey::Year);
        assert_eq!(second.direction, SortDirection::Desc);

        let third = SortConfig::toggle(Some(second), SortKey::Year);
        assert_eq!(third.direction, SortDirection::Asc);

        let other = SortConfig::toggle(Some(second), SortKey::Company);
        assert_eq!(other, SortConfig::asc(SortKey::Company));
    }

    #[test]
    fn test_sort_records_is_stable_and_puts_missing_last() {
        let mut records = sample();
        records[1].year = None;

        let rows = sort_records(&records, Some(SortConfig::toggle(None, SortKey::Year)));
        let years: Vec<Option<i32>> = rows.iter().map(|r| r.year).collect();
        assert_eq!(
            years,
            vec![Some(2023), Some(2023), Some(2024), Some(2024), Some(2024), None]
        );
        // stable within 2023: Zeta (index 0) before Acme Q4 (index 4)
        assert!(ptr::eq(rows[0], &records[0]));
        assert!(ptr::eq(rows[1], &records[4]));

        let desc = sort_records(
            &records,
            Some(SortConfig {
                key: SortKey::Year,
                direction: SortDirection::Desc,
            }),
        );
        assert_eq!(desc.first().and_then(|r| r.year), Some(2024));
        assert_eq!(desc.last().and_then(|r| r.year), None);

        let unsorted = sort_records(&records, None);
        assert!(ptr::eq(unsorted[0], &records[0]));
    }

    #[test]
    fn test_sort_names_parse_case_insensitively() {
        assert_eq!(SortKey::from_name("Company"), Some(SortKey::Company));
        assert_eq!(SortKey::from_name(" quarter "), Some(SortKey::Quarter));
        assert_eq!(SortKey::from_name("innovations"), None);
        assert_eq!(SortDirection::from_name("DESC"), Some(SortDirection::Desc));
        assert_eq!(SortDirection::from_name("down"), None);
    }
}
