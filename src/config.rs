// ⚙️ Configuration - TOML settings with defaults for every field
//
// Lookup order: $INSIGHTS_CONFIG, then ./insights.toml, then built-in
// defaults. A handful of INSIGHTS_* variables override individual fields.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::heatmap::DEFAULT_VISIBLE_COMPANIES;

pub const CONFIG_ENV: &str = "INSIGHTS_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "insights.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub pdf: PdfSettings,
    #[serde(default)]
    pub heatmap: HeatmapConfig,
}

// ============================================================================
// SERVER
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Saved API response with the quarterly records
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,
    /// Optional companies list used to resolve company ids to names
    #[serde(default)]
    pub companies_path: Option<PathBuf>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_data_path() -> PathBuf {
    PathBuf::from("data/quarterly.json")
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: default_host(),
            port: default_port(),
            data_path: default_data_path(),
            companies_path: None,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ============================================================================
// PDF
// ============================================================================

/// Page geometry and fonts for PDF reports (A4 portrait by default)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfSettings {
    #[serde(default = "default_page_width")]
    pub page_width_mm: f32,
    #[serde(default = "default_page_height")]
    pub page_height_mm: f32,
    #[serde(default = "default_margin")]
    pub margin_mm: f32,
    #[serde(default = "default_title_font_size")]
    pub title_font_size: f32,
    #[serde(default = "default_body_font_size")]
    pub body_font_size: f32,
    /// A section header starting below `page_height_mm - reserve` moves to a new page
    #[serde(default = "default_section_break_reserve")]
    pub section_break_reserve_mm: f32,
}

fn default_page_width() -> f32 {
    210.0
}

fn default_page_height() -> f32 {
    297.0
}

fn default_margin() -> f32 {
    20.0
}

fn default_title_font_size() -> f32 {
    16.0
}

fn default_body_font_size() -> f32 {
    12.0
}

fn default_section_break_reserve() -> f32 {
    40.0
}

impl Default for PdfSettings {
    fn default() -> Self {
        PdfSettings {
            page_width_mm: default_page_width(),
            page_height_mm: default_page_height(),
            margin_mm: default_margin(),
            title_font_size: default_title_font_size(),
            body_font_size: default_body_font_size(),
            section_break_reserve_mm: default_section_break_reserve(),
        }
    }
}

impl PdfSettings {
    /// Printable width between the side margins
    pub fn usable_width_mm(&self) -> f32 {
        self.page_width_mm - 2.0 * self.margin_mm
    }

    /// Lowest y at which a new section header may start
    pub fn section_break_y(&self) -> f32 {
        self.page_height_mm - self.section_break_reserve_mm
    }

    /// Lowest y a text line may occupy
    pub fn bottom_y(&self) -> f32 {
        self.page_height_mm - self.margin_mm
    }

    fn validate(&self) -> Result<()> {
        if self.usable_width_mm() <= 10.0 {
            anyhow::bail!(
                "pdf margins ({} mm) leave no room on a {} mm wide page",
                self.margin_mm,
                self.page_width_mm
            );
        }
        if self.section_break_y() <= self.margin_mm {
            anyhow::bail!(
                "pdf section_break_reserve_mm ({}) is larger than the page allows",
                self.section_break_reserve_mm
            );
        }
        if self.title_font_size <= 0.0 || self.body_font_size <= 0.0 {
            anyhow::bail!("pdf font sizes must be positive");
        }
        Ok(())
    }
}

// ============================================================================
// HEATMAP
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapConfig {
    /// Companies shown outside admin mode
    #[serde(default = "default_visible_companies")]
    pub visible_companies: usize,
}

fn default_visible_companies() -> usize {
    DEFAULT_VISIBLE_COMPANIES
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        HeatmapConfig {
            visible_companies: default_visible_companies(),
        }
    }
}

// ============================================================================
// LOADING
// ============================================================================

impl AppConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(text).context("Invalid configuration TOML")?;
        config.pdf.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        AppConfig::from_toml_str(&text)
            .with_context(|| format!("Failed to load config from {}", path.display()))
    }

    /// Load `.env`, then the config file, then apply environment overrides
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "loaded .env");
        }

        let mut config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => AppConfig::from_file(Path::new(&path))?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                AppConfig::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => {
                info!("no config file found, using defaults");
                AppConfig::default()
            }
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply INSIGHTS_HOST / INSIGHTS_PORT / INSIGHTS_DATA / INSIGHTS_COMPANIES
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("INSIGHTS_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("INSIGHTS_PORT") {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("INSIGHTS_PORT is not a valid port: {}", port))?;
        }
        if let Some(data) = lookup("INSIGHTS_DATA") {
            self.server.data_path = PathBuf::from(data);
        }
        if let Some(companies) = lookup("INSIGHTS_COMPANIES") {
            self.server.companies_path = Some(PathBuf::from(companies));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.server.bind_address(), "127.0.0.1:3000");
        assert_eq!(config.pdf.page_width_mm, 210.0);
        assert_eq!(config.pdf.section_break_y(), 257.0);
        assert_eq!(config.heatmap.visible_companies, 15);
    }

    #[test]
    fn test_partial_sections() {
        let config = AppConfig::from_toml_str(
            r#"
            [server]
            port = 8080
            companies_path = "data/companies.json"

            [pdf]
            margin_mm = 15.0

            [heatmap]
            visible_companies = 25
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(
            config.server.companies_path,
            Some(PathBuf::from("data/companies.json"))
        );
        assert_eq!(config.pdf.margin_mm, 15.0);
        assert_eq!(config.pdf.usable_width_mm(), 180.0);
        assert_eq!(config.pdf.title_font_size, 16.0);
        assert_eq!(config.heatmap.visible_companies, 25);
    }

    #[test]
    fn test_invalid_pdf_geometry_is_rejected() {
        assert!(AppConfig::from_toml_str("[pdf]\nmargin_mm = 120.0").is_err());
        assert!(AppConfig::from_toml_str("[pdf]\nsection_break_reserve_mm = 290.0").is_err());
        assert!(AppConfig::from_toml_str("[server]\nport = \"abc\"").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("INSIGHTS_PORT", "9090"),
            ("INSIGHTS_DATA", "/tmp/q.json"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config
            .apply_env(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.data_path, PathBuf::from("/tmp/q.json"));
        assert_eq!(config.server.companies_path, None);

        let bad = |key: &str| (key == "INSIGHTS_PORT").then(|| "port".to_string());
        assert!(AppConfig::default().apply_env(bad).is_err());
    }
}
