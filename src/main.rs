// Innovation Insights - CLI
// Loads a saved API response and prints views or writes exports

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use innovation_insights::adapters::{load_records, CompanyDirectory, Endpoint};
use innovation_insights::export::{self, build_comparison_document, build_document, ExportFormat};
use innovation_insights::grouping::{
    company_summaries, group_by_company, group_by_timeline, period_summaries,
};
use innovation_insights::heatmap::HeatmapMatrix;
use innovation_insights::stats::{category_distribution, pie_slices, InnovationStats};
use innovation_insights::{AppConfig, DashboardFilters, Quarter, QuarterlyRecord};

/// Quarterly fintech innovation insights
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Saved API response (defaults to server.data_path from the config)
    #[arg(short, long, global = true)]
    data: Option<PathBuf>,

    /// Companies list used to resolve company ids
    #[arg(short, long, global = true)]
    companies: Option<PathBuf>,

    /// Response shape: grouped-quarterly-data, quarter-data, snapshot-analysis
    #[arg(short, long, global = true, value_parser = parse_endpoint)]
    endpoint: Option<Endpoint>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Record, company and innovation totals
    Summary,
    /// Per-company quarters and innovations
    Companies,
    /// Periods newest first with the companies reporting in each
    Timeline,
    /// Innovation counts per company × year × quarter
    Heatmap {
        /// Show every company instead of the configured limit
        #[arg(long)]
        admin: bool,
    },
    /// Share of innovations per category
    Distribution,
    /// Write a CSV or PDF export of the (filtered) records
    Export {
        #[arg(value_parser = parse_format)]
        format: ExportFormat,
        #[arg(long)]
        company: Option<String>,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long, value_parser = parse_quarter)]
        quarter: Option<Quarter>,
        #[arg(long)]
        search: Option<String>,
        /// File name without extension
        #[arg(long)]
        filename: Option<String>,
        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
    /// Company-vs-project comparison PDF for one period
    Compare {
        company: String,
        year: i32,
        #[arg(value_parser = parse_quarter)]
        quarter: Quarter,
        /// Saved snapshot-analysis response for the company's project
        #[arg(long)]
        project_data: Option<PathBuf>,
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
}

fn parse_endpoint(value: &str) -> Result<Endpoint, String> {
    Endpoint::from_name(value).ok_or_else(|| format!("unknown endpoint: {}", value))
}

fn parse_format(value: &str) -> Result<ExportFormat, String> {
    ExportFormat::from_name(value).ok_or_else(|| format!("expected csv or pdf, got: {}", value))
}

fn parse_quarter(value: &str) -> Result<Quarter, String> {
    Quarter::parse(value).ok_or_else(|| format!("expected q1..q4, got: {}", value))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load()?;

    let directory = match cli.companies.as_ref().or(config.server.companies_path.as_ref()) {
        Some(path) => CompanyDirectory::load(path)?,
        None => CompanyDirectory::new(),
    };
    let data_path = cli.data.clone().unwrap_or_else(|| config.server.data_path.clone());
    let records = load_records(&data_path, cli.endpoint, &directory)?;

    match cli.command {
        Commands::Summary => print_summary(&records),
        Commands::Companies => print_companies(&records),
        Commands::Timeline => print_timeline(&records),
        Commands::Heatmap { admin } => {
            print_heatmap(&records, admin, config.heatmap.visible_companies)
        }
        Commands::Distribution => print_distribution(&records),
        Commands::Export {
            format,
            company,
            year,
            quarter,
            search,
            filename,
            output,
        } => {
            let filters = DashboardFilters {
                company,
                year,
                quarter,
                search,
                ..Default::default()
            };
            let selected = filters.apply(&records);
            let name = filename.unwrap_or_else(|| {
                if filters.is_active() {
                    export::filtered_records_filename()
                } else {
                    export::all_records_filename()
                }
            });

            let document = build_document(&selected, format, &name, &config.pdf)?;
            let path = write_document(&output, &document.filename, &document.bytes)?;
            println!("✓ Exported {} records → {}", selected.len(), path.display());
        }
        Commands::Compare {
            company,
            year,
            quarter,
            project_data,
            output,
        } => {
            let period = DashboardFilters::period(year, quarter);
            let company_side = period.clone().with_company(company.clone()).apply(&records);

            let project_records = match project_data {
                Some(path) => load_records(&path, Some(Endpoint::SnapshotAnalysis), &directory)?,
                None => Vec::new(),
            };
            let project_side = period.apply(&project_records);

            let document = build_comparison_document(
                &company,
                year,
                quarter,
                &company_side,
                &project_side,
                &config.pdf,
            )?;
            let path = write_document(&output, &document.filename, &document.bytes)?;
            println!(
                "✓ Comparison written ({} company / {} project records) → {}",
                company_side.len(),
                project_side.len(),
                path.display()
            );
        }
    }

    Ok(())
}

fn write_document(dir: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
    let path = dir.join(filename);
    std::fs::write(&path, bytes)
        .with_context(|| format!("Failed to write export: {}", path.display()))?;
    Ok(path)
}

fn print_summary(records: &[QuarterlyRecord]) {
    let stats = InnovationStats::from_records(records);

    println!("📊 Quarterly Innovation Summary");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("  Records:      {}", stats.record_count);
    println!("  Companies:    {}", stats.company_count);
    println!("  Years:        {}", stats.year_count);
    println!("  Quarters:     {}", stats.quarter_count);
    println!("  Innovations:  {}", stats.total_innovations);
    println!("  Avg/record:   {}", stats.average_per_record);
    println!("  Categories:   {} active", stats.active_categories);
}

fn print_companies(records: &[QuarterlyRecord]) {
    let view = group_by_company(records);

    println!("🏢 Companies ({})", view.len());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for summary in company_summaries(&view) {
        println!(
            "  {:<30} {:>3} quarters  {:>4} innovations",
            summary.company, summary.quarters, summary.innovations
        );
    }
}

fn print_timeline(records: &[QuarterlyRecord]) {
    let view = group_by_timeline(records);

    println!("🗓️  Timeline ({} periods)", view.len());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for summary in period_summaries(&view) {
        println!(
            "  {:<8} {:>3} companies  {:>4} innovations",
            summary.label, summary.companies, summary.innovations
        );
    }
}

fn print_heatmap(records: &[QuarterlyRecord], admin: bool, limit: usize) {
    let matrix = HeatmapMatrix::build(records);
    let view = matrix.view(admin, limit);

    println!(
        "🔥 Innovation Heatmap ({} of {} companies, max {})",
        view.companies_shown, view.total_companies, view.max_count
    );
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let mut header = format!("  {:<23}", "");
    for year in &view.years {
        header.push_str(&format!("│ {:<19}", year));
    }
    println!("{}", header);

    for row in &view.rows {
        let mut line = format!("  {:<23}", row.label);
        for chunk in row.cells.chunks(Quarter::ALL.len()) {
            line.push('│');
            for cell in chunk {
                line.push_str(&format!(" {:>3} ", cell.count));
            }
        }
        println!("{}", line);
    }
}

fn print_distribution(records: &[QuarterlyRecord]) {
    let distribution = category_distribution(records);

    println!("🥧 Category Distribution");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for share in pie_slices(&distribution) {
        println!("  {:<28} {:>5}  {:>3}%", share.label, share.count, share.percentage);
    }
}
