// Innovation Insights - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod record;      // Canonical quarterly record + category model
pub mod categories;  // Numbered-line parsing, one normalization path
pub mod adapters;    // One adapter per API endpoint shape
pub mod stats;       // Innovation counts, aggregate stats, distribution
pub mod grouping;    // Company / timeline grouping, table sort
pub mod heatmap;     // Company × year × quarter matrix
pub mod filters;     // Dashboard filters, search, view state
pub mod export;      // CSV + PDF documents
pub mod config;      // TOML configuration

// Re-export commonly used types
pub use record::{Category, CategoryField, CategoryItem, Quarter, QuarterlyRecord};
pub use categories::{normalize_value, parse_numbered_lines, strip_numbering, CategoryLine};
pub use adapters::{
    adapt_response, detect_endpoint, get_adapter, load_records,
    CompanyDirectory, Endpoint, RecordAdapter,
    CompanyQuarterAdapter, GroupedQuarterlyAdapter, SnapshotAnalysisAdapter,
};
pub use stats::{
    category_distribution, innovation_count, total_innovations,
    CategoryShare, InnovationStats,
};
pub use grouping::{
    group_by, group_by_company, group_by_timeline, sort_records,
    company_summaries, period_summaries,
    CompanySummary, GroupedView, Period, PeriodSummary, SortConfig, SortDirection, SortKey,
};
pub use heatmap::{HeatmapMatrix, HeatmapView, Intensity};
pub use filters::{ActiveView, DashboardFilters, DashboardState, ExpandedRows};
pub use export::{build_comparison_document, build_document, ExportDocument, ExportFormat};
pub use config::{AppConfig, PdfSettings};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
