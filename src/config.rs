use std::path::PathBuf;

use anyhow::Result;
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub network: NetworkConfig,
    pub window: WindowConfig,
    pub filters: FilterConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    /// Scheme, host and port of the analytics service, e.g. `http://localhost:8080`.
    pub base_url: String,
    /// Path under which every analytics endpoint lives.
    pub api_prefix: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            api_prefix: "/api/analytics".to_string(),
        }
    }
}

impl BackendConfig {
    /// Join base URL and prefix into the analytics root.
    ///
    /// Slashes at the seam are collapsed so `http://host/` + `api/analytics/`
    /// and `http://host` + `/api/analytics` give the same root.
    pub fn analytics_root(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let prefix = self.api_prefix.trim_matches('/');
        if prefix.is_empty() {
            base.to_string()
        } else {
            format!("{}/{}", base, prefix)
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct NetworkConfig {
    /// Deadline for snapshot GET lookups.
    pub lookup_timeout_secs: u64,
    /// Deadline for filtered POST analyses.
    pub analysis_timeout_secs: u64,
    pub health_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            lookup_timeout_secs: 10,
            analysis_timeout_secs: 30,
            health_timeout_secs: 5,
            connect_timeout_secs: 5,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WindowConfig {
    pub title: String,
    pub width: f32,
    pub height: f32,
    pub sidebar_width: f32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Restaurant Analytics Dashboard".to_string(),
            width: 1200.0,
            height: 800.0,
            sidebar_width: 250.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FilterConfig {
    /// How far before today the start date picker begins.
    pub default_lookback_days: i64,
    /// Whether panels start with date/outlet filters applied (POST) or as snapshots (GET).
    pub use_filters: bool,
    /// Outlet ids offered in the outlet selector besides "All Outlets".
    pub outlets: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            default_lookback_days: 30,
            use_filters: true,
            outlets: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ExportConfig {
    /// Target directory for CSV exports; the downloads folder when unset.
    pub directory: Option<PathBuf>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        // Load .env file (silently ignore if not present)
        let _ = dotenvy::dotenv();

        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rms-dashboard");

        let builder = Config::builder()
            // 1. Defaults
            // Backend
            .set_default("backend.base_url", "http://localhost:8080")?
            .set_default("backend.api_prefix", "/api/analytics")?
            // Network
            .set_default("network.lookup_timeout_secs", 10)?
            .set_default("network.analysis_timeout_secs", 30)?
            .set_default("network.health_timeout_secs", 5)?
            .set_default("network.connect_timeout_secs", 5)?
            // Window
            .set_default("window.title", "Restaurant Analytics Dashboard")?
            .set_default("window.width", 1200.0)?
            .set_default("window.height", 800.0)?
            .set_default("window.sidebar_width", 250.0)?
            // Filters
            .set_default("filters.default_lookback_days", 30)?
            .set_default("filters.use_filters", true)?
            .set_default("filters.outlets", Vec::<String>::new())?
            // Export
            .set_default("export.directory", None::<String>)?

            // 2. Local config file (optional, lowest priority)
            .add_source(File::from(PathBuf::from("config.toml")).required(false))

            // 3. User config directory (optional, overrides local)
            .add_source(File::from(config_dir.join("config.toml")).required(false))

            // 4. Environment variables (RMS__BACKEND__BASE_URL=...)
            .add_source(
                Environment::with_prefix("RMS")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("filters.outlets")
                    .try_parsing(true),
            );

        let s = builder.build()?;
        Ok(s.try_deserialize()?)
    }
}
