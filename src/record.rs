// 📇 Quarterly Records - canonical in-memory shape of quarterly innovation data
// One record = one company's innovation summary for one fiscal quarter

use crate::categories::CategoryLine;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// QUARTER
// ============================================================================

/// Fiscal quarter. Declaration order is the ordering weight (Q1 < Q4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quarter {
    #[serde(alias = "Q1")]
    Q1,
    #[serde(alias = "Q2")]
    Q2,
    #[serde(alias = "Q3")]
    Q3,
    #[serde(alias = "Q4")]
    Q4,
}

impl Quarter {
    pub const ALL: [Quarter; 4] = [Quarter::Q1, Quarter::Q2, Quarter::Q3, Quarter::Q4];

    /// Ordering weight: q1=1 .. q4=4
    pub fn weight(self) -> u8 {
        match self {
            Quarter::Q1 => 1,
            Quarter::Q2 => 2,
            Quarter::Q3 => 3,
            Quarter::Q4 => 4,
        }
    }

    /// Parse "q3" / "Q3" (surrounding whitespace ignored)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "q1" => Some(Quarter::Q1),
            "q2" => Some(Quarter::Q2),
            "q3" => Some(Quarter::Q3),
            "q4" => Some(Quarter::Q4),
            _ => None,
        }
    }

    /// Wire form used by the API ("q1")
    pub fn as_str(self) -> &'static str {
        match self {
            Quarter::Q1 => "q1",
            Quarter::Q2 => "q2",
            Quarter::Q3 => "q3",
            Quarter::Q4 => "q4",
        }
    }

    /// Display form ("Q1")
    pub fn label(self) -> &'static str {
        match self {
            Quarter::Q1 => "Q1",
            Quarter::Q2 => "Q2",
            Quarter::Q3 => "Q3",
            Quarter::Q4 => "Q4",
        }
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// CATEGORY
// ============================================================================

/// One of the nine fixed innovation dimensions.
///
/// Declaration order is the display order used by every view and export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Products,
    Processes,
    BusinessModel,
    Regions,
    Launches,
    SecurityUpdates,
    ApiUpdates,
    AccountAggregatorUpdates,
    Other,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Products,
        Category::Processes,
        Category::BusinessModel,
        Category::Regions,
        Category::Launches,
        Category::SecurityUpdates,
        Category::ApiUpdates,
        Category::AccountAggregatorUpdates,
        Category::Other,
    ];

    /// Field name in API responses
    pub fn key(&self) -> &'static str {
        match self {
            Category::Products => "products",
            Category::Processes => "processes",
            Category::BusinessModel => "business_model",
            Category::Regions => "regions",
            Category::Launches => "launches",
            Category::SecurityUpdates => "security_updates",
            Category::ApiUpdates => "api_updates",
            Category::AccountAggregatorUpdates => "account_aggregator_updates",
            Category::Other => "other",
        }
    }

    /// Human-readable name for section headers and CSV rows
    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Products => "Products",
            Category::Processes => "Processes",
            Category::BusinessModel => "Business Model",
            Category::Regions => "Regions",
            Category::Launches => "Launches",
            Category::SecurityUpdates => "Security Updates",
            Category::ApiUpdates => "API Updates",
            Category::AccountAggregatorUpdates => "Account Aggregator Updates",
            Category::Other => "Other",
        }
    }

    /// Compact badge name (timeline cards)
    pub fn short_name(&self) -> &'static str {
        match self {
            Category::AccountAggregatorUpdates => "AA Updates",
            other => other.display_name(),
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Category::ALL.iter().copied().find(|c| c.key() == key)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// ============================================================================
// CATEGORY FIELD
// ============================================================================

/// Structured category entry: one innovation plus the link it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryItem {
    pub content: String,
    #[serde(default)]
    pub source: String,
}

impl CategoryItem {
    pub fn new(content: impl Into<String>, source: impl Into<String>) -> Self {
        CategoryItem {
            content: content.into(),
            source: source.into(),
        }
    }
}

/// Canonical representation of a category field.
///
/// `Lines` holds numbered-line text after normalization (prefix stripped),
/// `Items` holds structured `{content, source}` entries. Build these through
/// `categories::normalize_value` / `CategoryField::from_text` so every
/// consumer sees the same lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "values", rename_all = "snake_case")]
pub enum CategoryField {
    Lines(Vec<String>),
    Items(Vec<CategoryItem>),
}

impl Default for CategoryField {
    fn default() -> Self {
        CategoryField::Lines(Vec::new())
    }
}

impl CategoryField {
    /// Normalize raw numbered-line text ("1. Foo\n2. Bar")
    pub fn from_text(text: &str) -> Self {
        CategoryField::Lines(crate::categories::parse_numbered_lines(text))
    }

    pub fn from_items(items: Vec<CategoryItem>) -> Self {
        CategoryField::Items(
            items
                .into_iter()
                .filter(|item| !item.content.trim().is_empty())
                .collect(),
        )
    }

    /// Ordered display lines; blank entries never appear
    pub fn lines(&self) -> Vec<CategoryLine<'_>> {
        crate::categories::display_lines(self)
    }

    pub fn line_count(&self) -> usize {
        self.lines().len()
    }

    pub fn is_empty(&self) -> bool {
        self.line_count() == 0
    }
}

// ============================================================================
// QUARTERLY RECORD
// ============================================================================

/// One company's innovation summary for one (year, quarter) pair.
///
/// Grouping keys are optional: an API element missing one is still kept,
/// it is only skipped by the views that need that key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QuarterlyRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<u64>,

    pub company_name: Option<String>,
    pub year: Option<i32>,
    pub quarter: Option<Quarter>,

    /// Free-text analysis summary (rendered in PDF reports)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub information: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Absent categories are treated as empty
    pub categories: BTreeMap<Category, CategoryField>,
}

impl QuarterlyRecord {
    pub fn new(company_name: impl Into<String>, year: i32, quarter: Quarter) -> Self {
        QuarterlyRecord {
            company_name: Some(company_name.into()),
            year: Some(year),
            quarter: Some(quarter),
            ..Default::default()
        }
    }

    /// Builder pattern: add record id
    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    /// Builder pattern: add company id
    pub fn with_company_id(mut self, company_id: u64) -> Self {
        self.company_id = Some(company_id);
        self
    }

    /// Builder pattern: add analysis summary
    pub fn with_information(mut self, information: impl Into<String>) -> Self {
        self.information = Some(information.into());
        self
    }

    /// Builder pattern: set one category field
    pub fn with_category(mut self, category: Category, field: CategoryField) -> Self {
        self.categories.insert(category, field);
        self
    }

    /// Builder pattern: set one category from numbered-line text
    pub fn with_lines(self, category: Category, text: &str) -> Self {
        self.with_category(category, CategoryField::from_text(text))
    }

    pub fn category(&self, category: Category) -> Option<&CategoryField> {
        self.categories.get(&category)
    }

    /// Categories that have at least one line, in display order
    pub fn non_empty_categories(&self) -> impl Iterator<Item = (Category, &CategoryField)> + '_ {
        Category::ALL.iter().filter_map(move |c| {
            self.categories
                .get(c)
                .filter(|field| !field.is_empty())
                .map(|field| (*c, field))
        })
    }

    /// Company name, or a stand-in built from the company id
    pub fn company_label(&self) -> String {
        match (&self.company_name, self.company_id) {
            (Some(name), _) if !name.trim().is_empty() => name.clone(),
            (_, Some(id)) => format!("Company #{}", id),
            _ => "Unknown company".to_string(),
        }
    }

    /// "2024 Q1", degrading to whichever half is known
    pub fn period_label(&self) -> String {
        match (self.year, self.quarter) {
            (Some(year), Some(quarter)) => format!("{} {}", year, quarter.label()),
            (Some(year), None) => year.to_string(),
            (None, Some(quarter)) => quarter.label().to_string(),
            (None, None) => String::new(),
        }
    }
}
