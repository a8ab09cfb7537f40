//! Per-analysis panel state.
//!
//! One [`AnalyticsPanel`] exists per analysis type. It owns the filter
//! inputs, gates the trigger while a fetch is in flight and turns the
//! terminal outcome into displayable rows and charts. It holds no toolkit
//! types; the GUI reads it and feeds it events.

use chrono::NaiveDate;
use thiserror::Error;

use crate::{
    analysis::{AnalysisFilters, AnalysisType, DATE_FORMAT, RequestScope, lookback_start},
    api::{AnalysisOutcome, Payload},
    format::{self, ChartView, SummaryLine, TableRow},
    task::FetchEvent,
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PanelError {
    #[error("Invalid {field} date '{value}', expected YYYY-MM-DD")]
    InvalidDate { field: &'static str, value: String },
    #[error("Start date {start} is after end date {end}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },
    #[error("An analysis is already running")]
    Busy,
}

/// Everything a panel shows after a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelResult {
    pub table: Vec<TableRow>,
    pub charts: Vec<ChartView>,
    pub summary: Vec<SummaryLine>,
}

impl PanelResult {
    pub fn from_payload(analysis: AnalysisType, payload: &Payload) -> Self {
        Self {
            table: format::to_table(payload),
            charts: format::to_charts(analysis, payload),
            summary: format::summarize(analysis, payload),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalyticsPanel {
    analysis: AnalysisType,
    pub start_date: String,
    pub end_date: String,
    /// `None` means all outlets.
    pub outlet: Option<String>,
    pub use_filters: bool,
    running: bool,
    /// `None` while running means indeterminate.
    progress: Option<u8>,
    result: Option<PanelResult>,
    error: Option<String>,
}

impl AnalyticsPanel {
    pub fn new(analysis: AnalysisType, today: NaiveDate, lookback_days: i64, use_filters: bool) -> Self {
        let start = lookback_start(today, lookback_days);
        Self {
            analysis,
            start_date: start.format(DATE_FORMAT).to_string(),
            end_date: today.format(DATE_FORMAT).to_string(),
            outlet: None,
            use_filters,
            running: false,
            progress: None,
            result: None,
            error: None,
        }
    }

    pub fn analysis(&self) -> AnalysisType {
        self.analysis
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// The trigger control is enabled only while idle.
    pub fn can_trigger(&self) -> bool {
        !self.running
    }

    pub fn progress(&self) -> Option<u8> {
        self.progress
    }

    pub fn result(&self) -> Option<&PanelResult> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Validate the filters and mark the panel as running.
    ///
    /// Rejected with [`PanelError::Busy`] while a fetch is in flight; the
    /// panel state is left untouched in that case. Validation failures are
    /// also kept as the panel's inline error.
    pub fn trigger(&mut self) -> Result<AnalysisFilters, PanelError> {
        if self.running {
            return Err(PanelError::Busy);
        }

        let filters = match self.filters() {
            Ok(filters) => filters,
            Err(e) => {
                self.error = Some(e.to_string());
                return Err(e);
            }
        };

        self.running = true;
        self.progress = None;
        self.error = None;
        Ok(filters)
    }

    fn filters(&self) -> Result<AnalysisFilters, PanelError> {
        let start = parse_date("start", &self.start_date)?;
        let end = parse_date("end", &self.end_date)?;
        if start > end {
            return Err(PanelError::InvertedRange { start, end });
        }

        Ok(AnalysisFilters {
            start_date: start,
            end_date: end,
            outlet_id: self.outlet.clone().filter(|o| !o.trim().is_empty()),
            scope: if self.use_filters {
                RequestScope::Filtered
            } else {
                RequestScope::Snapshot
            },
        })
    }

    pub fn apply(&mut self, event: FetchEvent) {
        match event {
            FetchEvent::Progress(value) => self.on_progress(value),
            FetchEvent::Finished(outcome) => self.on_outcome(outcome),
        }
    }

    pub fn on_progress(&mut self, value: u8) {
        if !self.running {
            return;
        }
        if self.progress.is_none_or(|current| value > current) {
            self.progress = Some(value);
        }
    }

    pub fn on_outcome(&mut self, outcome: AnalysisOutcome) {
        if !self.running {
            tracing::debug!(analysis = %self.analysis, "Ignoring outcome for idle panel");
            return;
        }
        self.running = false;
        self.progress = None;

        match outcome {
            Ok(payload) => {
                self.result = Some(PanelResult::from_payload(self.analysis, &payload));
                self.error = None;
            }
            Err(e) => {
                self.result = None;
                self.error = Some(e.to_string());
            }
        }
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }
}

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, PanelError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| PanelError::InvalidDate {
        field,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::FetchError;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn panel() -> AnalyticsPanel {
        AnalyticsPanel::new(AnalysisType::RevenueAnalysis, today(), 30, true)
    }

    fn revenue_payload() -> Payload {
        match json!({"totalRevenue": 1000, "paymentMethodRevenue": {"card": 600, "cash": 400}}) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_new_panel_defaults_to_lookback_window() {
        let p = panel();
        assert_eq!(p.start_date, "2024-05-16");
        assert_eq!(p.end_date, "2024-06-15");
        assert!(p.can_trigger());
        assert!(p.result().is_none());
    }

    #[test]
    fn test_huge_lookback_starts_today() {
        let p = AnalyticsPanel::new(AnalysisType::PeakDining, today(), 1_000_000_000, true);
        assert_eq!(p.start_date, "2024-06-15");
        assert_eq!(p.end_date, "2024-06-15");
    }

    #[test]
    fn test_trigger_disables_until_outcome() {
        let mut p = panel();
        let filters = p.trigger().unwrap();
        assert_eq!(filters.scope, RequestScope::Filtered);
        assert!(p.is_running());
        assert!(!p.can_trigger());
        assert_eq!(p.progress(), None);

        assert_eq!(p.trigger(), Err(PanelError::Busy));
        assert!(p.is_running(), "rejected trigger leaves the run in place");

        p.on_outcome(Ok(revenue_payload()));
        assert!(p.can_trigger());
    }

    #[test]
    fn test_snapshot_scope_when_filters_off() {
        let mut p = panel();
        p.use_filters = false;
        assert_eq!(p.trigger().unwrap().scope, RequestScope::Snapshot);
    }

    #[test]
    fn test_blank_outlet_means_all_outlets() {
        let mut p = panel();
        p.outlet = Some("  ".to_string());
        assert_eq!(p.trigger().unwrap().outlet_id, None);
    }

    #[test]
    fn test_inverted_range_is_rejected_and_shown() {
        let mut p = panel();
        p.start_date = "2024-07-01".to_string();
        p.end_date = "2024-06-01".to_string();

        let err = p.trigger().unwrap_err();
        assert!(matches!(err, PanelError::InvertedRange { .. }));
        assert!(p.can_trigger());
        assert!(p.error().unwrap().contains("after end date"));
    }

    #[test]
    fn test_invalid_date_is_rejected() {
        let mut p = panel();
        p.end_date = "15/06/2024".to_string();
        let err = p.trigger().unwrap_err();
        assert_eq!(
            err,
            PanelError::InvalidDate {
                field: "end",
                value: "15/06/2024".to_string()
            }
        );
    }

    #[test]
    fn test_same_day_range_is_allowed() {
        let mut p = panel();
        p.start_date = "2024-06-15".to_string();
        assert!(p.trigger().is_ok());
    }

    #[test]
    fn test_progress_only_moves_forward_while_running() {
        let mut p = panel();
        p.on_progress(50);
        assert_eq!(p.progress(), None, "idle panel ignores progress");

        p.trigger().unwrap();
        p.apply(FetchEvent::Progress(30));
        p.apply(FetchEvent::Progress(10));
        assert_eq!(p.progress(), Some(30));
        p.apply(FetchEvent::Progress(70));
        assert_eq!(p.progress(), Some(70));
    }

    #[test]
    fn test_success_builds_result() {
        let mut p = panel();
        p.trigger().unwrap();
        p.apply(FetchEvent::Finished(Ok(revenue_payload())));

        let result = p.result().unwrap();
        assert_eq!(result.table[0], ("totalRevenue".to_string(), "1000".to_string()));
        assert_eq!(result.table[1].0, "paymentMethodRevenue.card");
        assert_eq!(result.charts[0].bars.len(), 2);
        assert!(result.summary.iter().any(|l| l.value == "LKR 600.00 (60.0%)"));
        assert!(p.error().is_none());
        assert_eq!(p.progress(), None);
    }

    #[test]
    fn test_failure_drops_stale_result() {
        let mut p = panel();
        p.trigger().unwrap();
        p.on_outcome(Ok(revenue_payload()));
        assert!(p.result().is_some());

        p.trigger().unwrap();
        p.on_outcome(Err(FetchError::Timeout(30)));
        assert!(p.result().is_none());
        assert_eq!(p.error(), Some("Request timed out after 30s"));
        assert!(p.can_trigger());
    }

    #[test]
    fn test_outcome_for_idle_panel_is_ignored() {
        let mut p = panel();
        p.on_outcome(Err(FetchError::Timeout(30)));
        assert!(p.error().is_none());
    }
}
