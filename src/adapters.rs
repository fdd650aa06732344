// 🔌 Endpoint Adapters - one adapter per API response shape
//
// The analytics API returns quarterly data in several shapes:
// - grouped quarterly data: `company_name` + numbered-line text per category
// - company quarter data:   `company` id + `{content, sources}` arrays,
//                            top level or nested under `extra_info`
// - snapshot analysis:      `company` (project) id + arrays, five categories
// Each adapter converts its shape into `QuarterlyRecord` exactly once.

use crate::categories::normalize_value;
use crate::record::{Category, QuarterlyRecord, Quarter};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info, warn};

// ============================================================================
// ENDPOINT
// ============================================================================

/// Which API endpoint produced a response document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Endpoint {
    GroupedQuarterlyData,
    CompanyQuarterData,
    SnapshotAnalysis,
}

impl Endpoint {
    pub fn name(&self) -> &'static str {
        match self {
            Endpoint::GroupedQuarterlyData => "grouped-quarterly-data",
            Endpoint::CompanyQuarterData => "quarter-data",
            Endpoint::SnapshotAnalysis => "snapshot-analysis",
        }
    }

    /// API path the response comes from
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::GroupedQuarterlyData => "/api/grouped-quarterly-data/",
            Endpoint::CompanyQuarterData => "/api/quarter-data/",
            Endpoint::SnapshotAnalysis => "/snapshots/snapshot-analysis/",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "grouped-quarterly-data" | "grouped" => Some(Endpoint::GroupedQuarterlyData),
            "quarter-data" | "company-quarter-data" | "company" => {
                Some(Endpoint::CompanyQuarterData)
            }
            "snapshot-analysis" | "snapshot" | "project" => Some(Endpoint::SnapshotAnalysis),
            _ => None,
        }
    }
}

// ============================================================================
// COMPANY DIRECTORY
// ============================================================================

/// Company id → name lookup built from the companies list endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompanyDirectory {
    names: HashMap<u64, String>,
}

impl CompanyDirectory {
    pub fn new() -> Self {
        CompanyDirectory::default()
    }

    pub fn insert(&mut self, id: u64, name: impl Into<String>) {
        self.names.insert(id, name.into());
    }

    pub fn name(&self, id: u64) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Build from a `/api/companies` response (array of `{id, name, ...}`)
    pub fn from_json(doc: &Value) -> Result<Self> {
        let companies = response_array(doc).context("companies response is not a list")?;

        let mut directory = CompanyDirectory::new();
        for company in companies {
            match (
                company.get("id").and_then(as_u64),
                company.get("name").and_then(Value::as_str),
            ) {
                (Some(id), Some(name)) => directory.insert(id, name.trim()),
                _ => warn!("skipping company entry without id/name"),
            }
        }
        Ok(directory)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let doc = read_json(path)?;
        CompanyDirectory::from_json(&doc)
            .with_context(|| format!("Failed to read companies from {}", path.display()))
    }
}

// ============================================================================
// ADAPTER TRAIT
// ============================================================================

/// Converts one element of an endpoint's response into a record
pub trait RecordAdapter: Send + Sync {
    fn endpoint(&self) -> Endpoint;

    /// Categories this endpoint can carry
    fn categories(&self) -> &'static [Category] {
        &Category::ALL
    }

    /// `None` when the element is not an object
    fn adapt(&self, element: &Value, directory: &CompanyDirectory) -> Option<QuarterlyRecord>;
}

/// Grouped quarterly data: company name + numbered-line strings
pub struct GroupedQuarterlyAdapter;

impl RecordAdapter for GroupedQuarterlyAdapter {
    fn endpoint(&self) -> Endpoint {
        Endpoint::GroupedQuarterlyData
    }

    fn adapt(&self, element: &Value, directory: &CompanyDirectory) -> Option<QuarterlyRecord> {
        let mut record = base_record(element, directory)?;
        if let Some(name) = non_blank_str(element.get("company_name")) {
            record.company_name = Some(name);
        }
        fill_categories(&mut record, element, self.categories());
        Some(record)
    }
}

/// Company quarter data: company id + structured item arrays
pub struct CompanyQuarterAdapter;

impl RecordAdapter for CompanyQuarterAdapter {
    fn endpoint(&self) -> Endpoint {
        Endpoint::CompanyQuarterData
    }

    fn adapt(&self, element: &Value, directory: &CompanyDirectory) -> Option<QuarterlyRecord> {
        let mut record = base_record(element, directory)?;
        fill_categories(&mut record, element, self.categories());
        Some(record)
    }
}

const SNAPSHOT_CATEGORIES: [Category; 5] = [
    Category::Products,
    Category::Processes,
    Category::BusinessModel,
    Category::Regions,
    Category::Other,
];

/// Project snapshot analysis: five categories only
pub struct SnapshotAnalysisAdapter;

impl RecordAdapter for SnapshotAnalysisAdapter {
    fn endpoint(&self) -> Endpoint {
        Endpoint::SnapshotAnalysis
    }

    fn categories(&self) -> &'static [Category] {
        &SNAPSHOT_CATEGORIES
    }

    fn adapt(&self, element: &Value, directory: &CompanyDirectory) -> Option<QuarterlyRecord> {
        let mut record = base_record(element, directory)?;
        fill_categories(&mut record, element, self.categories());
        Some(record)
    }
}

// ============================================================================
// SHARED FIELD EXTRACTION
// ============================================================================

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_year(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|y| i32::try_from(y).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn non_blank_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Fields every endpoint shares. Missing or malformed values stay `None`.
fn base_record(element: &Value, directory: &CompanyDirectory) -> Option<QuarterlyRecord> {
    if !element.is_object() {
        return None;
    }

    let company_id = element.get("company").and_then(as_u64);
    let company_name = non_blank_str(element.get("company_name"))
        .or_else(|| company_id.and_then(|id| directory.name(id)).map(str::to_string));

    let quarter = element.get("quarter").and_then(Value::as_str).and_then(Quarter::parse);
    if quarter.is_none() && element.get("quarter").is_some() {
        debug!(value = ?element.get("quarter"), "unrecognised quarter value");
    }

    Some(QuarterlyRecord {
        id: element.get("id").and_then(as_u64),
        company_id,
        company_name,
        year: element.get("year").and_then(as_year),
        quarter,
        information: non_blank_str(element.get("information")),
        source: non_blank_str(element.get("source")),
        categories: Default::default(),
    })
}

/// Categories sit at the top level, or under `extra_info` on company quarter data
fn fill_categories(record: &mut QuarterlyRecord, element: &Value, categories: &[Category]) {
    let extra_info = element.get("extra_info").filter(|v| v.is_object());
    for category in categories {
        let value = element
            .get(category.key())
            .or_else(|| extra_info.and_then(|extra| extra.get(category.key())));
        if let Some(value) = value {
            record.categories.insert(*category, normalize_value(value));
        }
    }
}

// ============================================================================
// FACTORY FUNCTIONS
// ============================================================================

pub fn get_adapter(endpoint: Endpoint) -> Box<dyn RecordAdapter> {
    match endpoint {
        Endpoint::GroupedQuarterlyData => Box::new(GroupedQuarterlyAdapter),
        Endpoint::CompanyQuarterData => Box::new(CompanyQuarterAdapter),
        Endpoint::SnapshotAnalysis => Box::new(SnapshotAnalysisAdapter),
    }
}

/// Response array: a bare list, or a paginated `{"results": [...]}`
fn response_array(doc: &Value) -> Result<&Vec<Value>> {
    match doc {
        Value::Array(items) => Ok(items),
        Value::Object(map) => map
            .get("results")
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow::anyhow!("JSON object missing 'results' array")),
        _ => Err(anyhow::anyhow!("expected a JSON array of records")),
    }
}

/// Guess the endpoint from the first object in the response.
///
/// `company_name` → grouped data; an `extra_info` object or a category only
/// company quarter data carries (launches, security/api/aa updates) →
/// company quarter data;
/// otherwise snapshot analysis. An empty list counts as grouped data.
pub fn detect_endpoint(doc: &Value) -> Result<Endpoint> {
    let items = response_array(doc)?;
    let Some(first) = items.iter().find(|v| v.is_object()) else {
        return Ok(Endpoint::GroupedQuarterlyData);
    };

    if first.get("company_name").is_some() {
        return Ok(Endpoint::GroupedQuarterlyData);
    }

    let company_only = [
        Category::Launches,
        Category::SecurityUpdates,
        Category::ApiUpdates,
        Category::AccountAggregatorUpdates,
    ];
    if company_only.iter().any(|c| first.get(c.key()).is_some())
        || first.get("extra_info").is_some_and(Value::is_object)
    {
        return Ok(Endpoint::CompanyQuarterData);
    }

    if first.get("company").is_some() {
        return Ok(Endpoint::SnapshotAnalysis);
    }

    Err(anyhow::anyhow!(
        "Could not detect endpoint: records have neither 'company_name' nor 'company'"
    ))
}

/// Adapt a whole response; non-object elements are skipped with a warning
pub fn adapt_response(
    adapter: &dyn RecordAdapter,
    doc: &Value,
    directory: &CompanyDirectory,
) -> Result<Vec<QuarterlyRecord>> {
    let items = response_array(doc)
        .with_context(|| format!("Invalid {} response", adapter.endpoint().name()))?;

    let mut records = Vec::with_capacity(items.len());
    for (index, element) in items.iter().enumerate() {
        match adapter.adapt(element, directory) {
            Some(record) => records.push(record),
            None => warn!(index, endpoint = adapter.endpoint().name(), "skipping malformed element"),
        }
    }
    Ok(records)
}

fn read_json(path: &Path) -> Result<Value> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse JSON from {}", path.display()))
}

/// Load records from a saved API response.
///
/// The endpoint is detected from the document when not given.
pub fn load_records(
    path: &Path,
    endpoint: Option<Endpoint>,
    directory: &CompanyDirectory,
) -> Result<Vec<QuarterlyRecord>> {
    let doc = read_json(path)?;
    let endpoint = match endpoint {
        Some(e) => e,
        None => detect_endpoint(&doc)
            .with_context(|| format!("Failed to detect endpoint of {}", path.display()))?,
    };

    let adapter = get_adapter(endpoint);
    let records = adapt_response(adapter.as_ref(), &doc, directory)?;
    info!(
        path = %path.display(),
        endpoint = endpoint.name(),
        records = records.len(),
        "loaded quarterly records"
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::CategoryField;
    use crate::stats::innovation_count;
    use serde_json::json;

    fn directory() -> CompanyDirectory {
        CompanyDirectory::from_json(&json!([
            {"id": 1, "name": "Acme Pay", "is_active": true},
            {"id": 2, "name": " Beta Bank "},
            {"id": "x"},
        ]))
        .unwrap()
    }

    #[test]
    fn test_company_directory() {
        let dir = directory();
        assert_eq!(dir.len(), 2);
        assert_eq!(dir.name(2), Some("Beta Bank"));
        assert_eq!(dir.name(9), None);
        assert!(CompanyDirectory::from_json(&json!("nope")).is_err());
    }

    #[test]
    fn test_endpoint_names() {
        for endpoint in [
            Endpoint::GroupedQuarterlyData,
            Endpoint::CompanyQuarterData,
            Endpoint::SnapshotAnalysis,
        ] {
            assert_eq!(Endpoint::from_name(endpoint.name()), Some(endpoint));
        }
        assert_eq!(Endpoint::from_name("bogus"), None);
    }

    #[test]
    fn test_grouped_quarterly_adapter() {
        let doc = json!([{
            "id": 10,
            "company_name": "Acme Pay",
            "year": 2024,
            "quarter": "q1",
            "products": "1. Card issuance\n2. \n3. API launch",
            "business_model": "",
            "regions": "1. Kenya",
            "other": null
        }]);

        let records = adapt_response(&GroupedQuarterlyAdapter, &doc, &CompanyDirectory::new()).unwrap();
        assert_eq!(records.len(), 1);

        let r = &records[0];
        assert_eq!(r.id, Some(10));
        assert_eq!(r.company_name.as_deref(), Some("Acme Pay"));
        assert_eq!(r.year, Some(2024));
        assert_eq!(r.quarter, Some(Quarter::Q1));
        assert_eq!(
            r.category(Category::Products),
            Some(&CategoryField::Lines(vec!["Card issuance".into(), "API launch".into()]))
        );
        assert!(r.category(Category::BusinessModel).unwrap().is_empty());
        assert_eq!(innovation_count(r), 3);
    }

    #[test]
    fn test_company_quarter_adapter_resolves_names() {
        let doc = json!([{
            "id": 5,
            "company": 2,
            "year": "2023",
            "quarter": "Q4",
            "information": "Strong quarter",
            "launches": [{"content": "Credit line", "sources": "https://b.example"}],
            "api_updates": [],
            "products": 17
        }]);

        let records = adapt_response(&CompanyQuarterAdapter, &doc, &directory()).unwrap();
        let r = &records[0];
        assert_eq!(r.company_id, Some(2));
        assert_eq!(r.company_name.as_deref(), Some("Beta Bank"));
        assert_eq!(r.year, Some(2023));
        assert_eq!(r.quarter, Some(Quarter::Q4));
        assert_eq!(r.information.as_deref(), Some("Strong quarter"));
        assert_eq!(innovation_count(r), 1);
        assert!(r.category(Category::Products).unwrap().is_empty());
    }

    #[test]
    fn test_company_quarter_categories_under_extra_info() {
        let doc = json!([{
            "company": 1,
            "year": 2024,
            "quarter": "q1",
            "extra_info": {
                "products": [{"content": "Card issuance", "sources": "https://a.example"}],
                "business_model": [{"content": "Revenue share", "sources": ""}]
            }
        }]);

        assert_eq!(detect_endpoint(&doc).unwrap(), Endpoint::CompanyQuarterData);

        let records = adapt_response(&CompanyQuarterAdapter, &doc, &directory()).unwrap();
        let r = &records[0];
        assert_eq!(innovation_count(r), 2);
        let lines = r.category(Category::Products).unwrap().lines();
        assert_eq!(lines[0].text, "Card issuance");
        assert_eq!(lines[0].source, Some("https://a.example"));
    }

    #[test]
    fn test_top_level_category_wins_over_extra_info() {
        let doc = json!([{
            "company": 1,
            "products": [{"content": "Top level", "sources": ""}],
            "extra_info": {"products": [{"content": "Nested", "sources": ""}]}
        }]);
        let records = adapt_response(&CompanyQuarterAdapter, &doc, &directory()).unwrap();
        let lines = records[0].category(Category::Products).unwrap().lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "Top level");
    }

    #[test]
    fn test_snapshot_adapter_ignores_company_only_categories() {
        let doc = json!([{
            "company": 1,
            "year": 2024,
            "quarter": "q2",
            "products": [{"content": "Savings pot", "sources": ""}],
            "launches": [{"content": "not part of this endpoint", "sources": ""}]
        }]);

        let records = adapt_response(&SnapshotAnalysisAdapter, &doc, &directory()).unwrap();
        let r = &records[0];
        assert_eq!(r.company_name.as_deref(), Some("Acme Pay"));
        assert!(r.category(Category::Launches).is_none());
        assert_eq!(innovation_count(r), 1);
    }

    #[test]
    fn test_malformed_elements_are_tolerated() {
        let doc = json!([
            "not an object",
            {"company_name": "NoDate"},
            {"company_name": "BadQuarter", "year": 2024, "quarter": "q9"}
        ]);

        let records = adapt_response(&GroupedQuarterlyAdapter, &doc, &CompanyDirectory::new()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].year, None);
        assert_eq!(records[1].quarter, None);
        assert!(records.iter().all(|r| innovation_count(r) == 0));
    }

    #[test]
    fn test_detect_endpoint() {
        assert_eq!(
            detect_endpoint(&json!([{"company_name": "A"}])).unwrap(),
            Endpoint::GroupedQuarterlyData
        );
        assert_eq!(
            detect_endpoint(&json!([{"company": 1, "security_updates": []}])).unwrap(),
            Endpoint::CompanyQuarterData
        );
        assert_eq!(
            detect_endpoint(&json!({"results": [{"company": 1, "products": []}]})).unwrap(),
            Endpoint::SnapshotAnalysis
        );
        assert_eq!(detect_endpoint(&json!([])).unwrap(), Endpoint::GroupedQuarterlyData);
        assert!(detect_endpoint(&json!([{"year": 2024}])).is_err());
        assert!(detect_endpoint(&json!(42)).is_err());
    }
}
