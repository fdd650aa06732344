// Innovation Insights - Web Server
// REST API with Axum over an immutable, pre-loaded record set

use anyhow::Context;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use innovation_insights::adapters::{load_records, CompanyDirectory};
use innovation_insights::export::{self, build_document, ExportDocument, ExportFormat};
use innovation_insights::grouping::{
    company_summaries, group_by_company, group_by_timeline, period_summaries, sort_records,
    SortConfig, SortDirection, SortKey,
};
use innovation_insights::heatmap::HeatmapMatrix;
use innovation_insights::stats::{category_distribution, innovation_count, InnovationStats};
use innovation_insights::{AppConfig, DashboardFilters, Quarter, QuarterlyRecord};

/// Shared application state
#[derive(Clone)]
struct AppState {
    records: Arc<Vec<QuarterlyRecord>>,
    config: Arc<AppConfig>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: (),
            error: Some(message.into()),
        }
    }
}

/// Query parameters shared by every view endpoint
#[derive(Debug, Default, Deserialize)]
struct ViewQuery {
    company: Option<String>,
    company_id: Option<u64>,
    year: Option<i32>,
    /// Unrecognised values are ignored rather than rejected
    quarter: Option<String>,
    search: Option<String>,
    #[serde(default)]
    admin: bool,
    filename: Option<String>,
    /// Table column: company, year or quarter
    sort: Option<String>,
    /// asc (default) or desc
    direction: Option<String>,
}

impl ViewQuery {
    fn filters(&self) -> DashboardFilters {
        DashboardFilters {
            company_id: self.company_id,
            company: self.company.clone(),
            year: self.year,
            quarter: self.quarter.as_deref().and_then(Quarter::parse),
            search: self.search.clone(),
        }
    }

    fn sort_config(&self) -> Option<SortConfig> {
        let key = self.sort.as_deref().and_then(SortKey::from_name)?;
        let direction = self
            .direction
            .as_deref()
            .and_then(SortDirection::from_name)
            .unwrap_or(SortDirection::Asc);
        Some(SortConfig { key, direction })
    }
}

/// Table row: the record plus its innovation count
#[derive(Serialize)]
struct RecordResponse<'a> {
    #[serde(flatten)]
    record: &'a QuarterlyRecord,
    period: String,
    innovations: usize,
}

impl<'a> From<&'a QuarterlyRecord> for RecordResponse<'a> {
    fn from(record: &'a QuarterlyRecord) -> Self {
        Self {
            record,
            period: record.period_label(),
            innovations: innovation_count(record),
        }
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/records - Filtered records in table order
async fn get_records(State(state): State<AppState>, Query(query): Query<ViewQuery>) -> Response {
    let selected = query.filters().apply(state.records.iter());
    let rows = sort_records(selected, query.sort_config());
    let response: Vec<RecordResponse> = rows.into_iter().map(RecordResponse::from).collect();
    Json(ApiResponse::ok(response)).into_response()
}

/// GET /api/stats - Dashboard stat cards
async fn get_stats(State(state): State<AppState>, Query(query): Query<ViewQuery>) -> Response {
    let selected = query.filters().apply(state.records.iter());
    Json(ApiResponse::ok(InnovationStats::from_records(selected))).into_response()
}

/// GET /api/distribution - Innovations per category
async fn get_distribution(
    State(state): State<AppState>,
    Query(query): Query<ViewQuery>,
) -> Response {
    let selected = query.filters().apply(state.records.iter());
    Json(ApiResponse::ok(category_distribution(selected))).into_response()
}

/// GET /api/companies - Company view summaries
async fn get_companies(State(state): State<AppState>, Query(query): Query<ViewQuery>) -> Response {
    let selected = query.filters().apply(state.records.iter());
    let view = group_by_company(selected);
    Json(ApiResponse::ok(company_summaries(&view))).into_response()
}

/// GET /api/timeline - Timeline view summaries
async fn get_timeline(State(state): State<AppState>, Query(query): Query<ViewQuery>) -> Response {
    let selected = query.filters().apply(state.records.iter());
    let view = group_by_timeline(selected);
    Json(ApiResponse::ok(period_summaries(&view))).into_response()
}

/// GET /api/heatmap - Company × year × quarter matrix
async fn get_heatmap(State(state): State<AppState>, Query(query): Query<ViewQuery>) -> Response {
    let selected = query.filters().apply(state.records.iter());
    let matrix = HeatmapMatrix::build(selected);
    let view = matrix.view(query.admin, state.config.heatmap.visible_companies);
    Json(ApiResponse::ok(view)).into_response()
}

/// GET /api/export/csv - Download filtered records as CSV
async fn export_csv(State(state): State<AppState>, Query(query): Query<ViewQuery>) -> Response {
    export_response(&state, &query, ExportFormat::Csv)
}

/// GET /api/export/pdf - Download filtered records as a PDF report
async fn export_pdf(State(state): State<AppState>, Query(query): Query<ViewQuery>) -> Response {
    export_response(&state, &query, ExportFormat::Pdf)
}

fn export_response(state: &AppState, query: &ViewQuery, format: ExportFormat) -> Response {
    let filters = query.filters();
    let selected = filters.apply(state.records.iter());
    let filename = query.filename.clone().unwrap_or_else(|| {
        if filters.is_active() {
            export::filtered_records_filename()
        } else {
            export::all_records_filename()
        }
    });

    match build_document(&selected, format, &filename, &state.config.pdf) {
        Ok(document) => download(document),
        Err(e) => {
            error!("Error building {} export: {:#}", format.extension(), e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::failure("export failed")),
            )
                .into_response()
        }
    }
}

fn download(document: ExportDocument) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, document.content_type.to_string()),
            (header::CONTENT_DISPOSITION, document.content_disposition()),
        ],
        document.bytes,
    )
        .into_response()
}

fn app(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/records", get(get_records))
        .route("/stats", get(get_stats))
        .route("/distribution", get(get_distribution))
        .route("/companies", get(get_companies))
        .route("/timeline", get(get_timeline))
        .route("/heatmap", get(get_heatmap))
        .route("/export/csv", get(export_csv))
        .route("/export/pdf", get(export_pdf))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("🌐 Innovation Insights - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = AppConfig::load()?;

    let directory = match &config.server.companies_path {
        Some(path) => CompanyDirectory::load(path)?,
        None => CompanyDirectory::new(),
    };
    let records = load_records(&config.server.data_path, None, &directory)?;
    println!(
        "✓ Loaded {} records from {}",
        records.len(),
        config.server.data_path.display()
    );

    let addr = config.server.bind_address();
    let state = AppState {
        records: Arc::new(records),
        config: Arc::new(config),
    };

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to address {}", addr))?;

    info!(%addr, "server listening");
    println!("\n🚀 Server running on http://{}", addr);
    println!("   API: http://{}/api/records", addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app(state))
        .await
        .context("Server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use innovation_insights::record::Category;
    use tower::ServiceExt;

    fn state() -> AppState {
        let records = vec![
            QuarterlyRecord::new("Acme Pay", 2024, Quarter::Q1)
                .with_company_id(1)
                .with_lines(Category::Products, "1. Card issuance\n2. \n3. API launch"),
            QuarterlyRecord::new("Beta Bank", 2023, Quarter::Q4)
                .with_company_id(2)
                .with_lines(Category::Regions, "1. Kenya"),
        ];
        AppState {
            records: Arc::new(records),
            config: Arc::new(AppConfig::default()),
        }
    }

    async fn get_json(uri: &str) -> serde_json::Value {
        let response = app(state())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        let json = get_json("/api/stats").await;
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["record_count"], 2);
        assert_eq!(json["data"]["total_innovations"], 3);
    }

    #[tokio::test]
    async fn test_records_filters_and_unknown_quarter() {
        let json = get_json("/api/records?year=2024").await;
        assert_eq!(json["data"].as_array().unwrap().len(), 1);
        assert_eq!(json["data"][0]["innovations"], 2);

        let json = get_json("/api/records?quarter=q9").await;
        assert_eq!(json["data"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_records_follow_requested_sort() {
        let json = get_json("/api/records?sort=company&direction=desc").await;
        assert_eq!(json["data"][0]["company_name"], "Beta Bank");
        assert_eq!(json["data"][1]["company_name"], "Acme Pay");

        let json = get_json("/api/records?sort=year").await;
        assert_eq!(json["data"][0]["year"], 2023);

        let json = get_json("/api/records?sort=innovations&direction=desc").await;
        assert_eq!(json["data"][0]["company_name"], "Acme Pay");
    }

    #[tokio::test]
    async fn test_heatmap_endpoint() {
        let json = get_json("/api/heatmap").await;
        assert_eq!(json["data"]["total_companies"], 2);
        assert_eq!(json["data"]["years"], serde_json::json!([2024, 2023]));
    }

    #[tokio::test]
    async fn test_csv_download() {
        let response = app(state())
            .oneshot(
                Request::builder()
                    .uri("/api/export/csv?company=Acme%20Pay")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"filtered-quarterly-data.csv\""
        );
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert_eq!(text.lines().count(), 3);
    }
}
