//! Restaurant analytics dashboard.
//!
//! This module exposes the analytics fetch workflow (client, background
//! task, panel state and result formatting) independently of the GUI so it
//! can be tested and reused from the headless CLI.

pub mod analysis;
pub mod api;
pub mod config;
pub mod export;
pub mod format;
pub mod panel;
pub mod task;

// GUI-only modules
#[cfg(feature = "gui")]
pub mod style;
#[cfg(feature = "gui")]
pub mod widgets;

// Re-export commonly used types
pub use analysis::{
    AnalysisDescriptor, AnalysisFilters, AnalysisRequest, AnalysisType, RequestScope,
};
pub use api::{AnalysisOutcome, AnalyticsClient, FailureKind, FetchError, Payload};
pub use config::AppConfig;
pub use format::{
    ChartView, RevenueShare, SummaryLine, TableRow, render_report, revenue_shares, summarize,
    to_charts, to_table,
};
pub use panel::{AnalyticsPanel, PanelError, PanelResult};
pub use task::{FetchEvent, FetchHandle, FetchTask};
