//! Analysis catalogue.
//!
//! Every analysis the backend offers is described once here: its wire key,
//! the two endpoint families it can be fetched through, and which parts of
//! its payload are charted. Panels, the client and the formatter all work
//! from these descriptors instead of per-type code.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, TimeDelta};
use serde::Serialize;

use crate::api::FetchError;

/// Wire format of request dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// First day of a `days`-long window ending at `end`.
///
/// Negative lookbacks count as zero. A lookback that leaves chrono's date
/// range falls back to `end` instead of panicking.
pub fn lookback_start(end: NaiveDate, days: i64) -> NaiveDate {
    TimeDelta::try_days(days.max(0))
        .and_then(|delta| end.checked_sub_signed(delta))
        .unwrap_or(end)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisType {
    PeakDining,
    CustomerSegmentation,
    RevenueAnalysis,
    MenuAnalysis,
    SeasonalBehavior,
    AnomalyDetection,
    BranchPerformance,
}

impl AnalysisType {
    pub const ALL: [AnalysisType; 7] = [
        AnalysisType::PeakDining,
        AnalysisType::CustomerSegmentation,
        AnalysisType::RevenueAnalysis,
        AnalysisType::MenuAnalysis,
        AnalysisType::SeasonalBehavior,
        AnalysisType::AnomalyDetection,
        AnalysisType::BranchPerformance,
    ];

    pub fn descriptor(self) -> &'static AnalysisDescriptor {
        match self {
            AnalysisType::PeakDining => &PEAK_DINING,
            AnalysisType::CustomerSegmentation => &CUSTOMER_SEGMENTATION,
            AnalysisType::RevenueAnalysis => &REVENUE_ANALYSIS,
            AnalysisType::MenuAnalysis => &MENU_ANALYSIS,
            AnalysisType::SeasonalBehavior => &SEASONAL_BEHAVIOR,
            AnalysisType::AnomalyDetection => &ANOMALY_DETECTION,
            AnalysisType::BranchPerformance => &BRANCH_PERFORMANCE,
        }
    }

    /// Key sent as `analysisType` and accepted on the command line.
    pub fn key(self) -> &'static str {
        self.descriptor().key
    }

    pub fn title(self) -> &'static str {
        self.descriptor().title
    }
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for AnalysisType {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnalysisType::ALL
            .into_iter()
            .find(|t| t.key() == s)
            .ok_or_else(|| FetchError::UnknownAnalysisType(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// Which endpoint family a request goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestScope {
    /// GET without a body; the backend answers for its whole data set.
    Snapshot,
    /// POST carrying the date range and outlet.
    #[default]
    Filtered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub method: HttpMethod,
    pub path: &'static str,
}

/// How the keys of a charted series are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOrder {
    /// Payload order.
    AsReceived,
    /// Ascending by numeric key (hours, months); falls back to payload order
    /// when any key is not a number.
    Numeric,
}

/// What the values of a series measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueUnit {
    Count,
    Currency,
    Percent,
    Score,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartSpec {
    /// Payload keys holding the series, first present wins.
    pub keys: &'static [&'static str],
    pub title: &'static str,
    pub x_label: &'static str,
    pub unit: ValueUnit,
    pub order: KeyOrder,
}

#[derive(Debug)]
pub struct AnalysisDescriptor {
    pub kind: AnalysisType,
    pub key: &'static str,
    pub title: &'static str,
    pub snapshot: Endpoint,
    pub filtered: Endpoint,
    pub charts: &'static [ChartSpec],
}

impl AnalysisDescriptor {
    pub fn endpoint(&self, scope: RequestScope) -> Endpoint {
        match scope {
            RequestScope::Snapshot => self.snapshot,
            RequestScope::Filtered => self.filtered,
        }
    }
}

const fn get(path: &'static str) -> Endpoint {
    Endpoint {
        method: HttpMethod::Get,
        path,
    }
}

const fn post(path: &'static str) -> Endpoint {
    Endpoint {
        method: HttpMethod::Post,
        path,
    }
}

const fn chart(
    keys: &'static [&'static str],
    title: &'static str,
    x_label: &'static str,
    unit: ValueUnit,
    order: KeyOrder,
) -> ChartSpec {
    ChartSpec {
        keys,
        title,
        x_label,
        unit,
        order,
    }
}

static PEAK_DINING: AnalysisDescriptor = AnalysisDescriptor {
    kind: AnalysisType::PeakDining,
    key: "peak_dining",
    title: "Peak Dining Analysis",
    snapshot: get("/peak-dining"),
    filtered: post("/peak-dining"),
    charts: &[
        chart(&["hourly", "ordersByHour"], "Orders by Hour", "Hour of Day", ValueUnit::Count, KeyOrder::Numeric),
        chart(&["daily", "ordersByDay"], "Orders by Day", "Day of Week", ValueUnit::Count, KeyOrder::AsReceived),
        chart(&["monthly", "ordersByMonth"], "Orders by Month", "Month", ValueUnit::Count, KeyOrder::Numeric),
    ],
};

static CUSTOMER_SEGMENTATION: AnalysisDescriptor = AnalysisDescriptor {
    kind: AnalysisType::CustomerSegmentation,
    key: "customer_segmentation",
    title: "Customer Segmentation",
    snapshot: get("/customer-segment"),
    filtered: post("/customer-segmentation"),
    charts: &[
        chart(&["genderDistribution", "customerCountByGender"], "Gender Distribution", "Gender", ValueUnit::Count, KeyOrder::AsReceived),
        chart(&["ageDistribution", "customerCountByAgeGroup"], "Age Distribution", "Age Group", ValueUnit::Count, KeyOrder::AsReceived),
        chart(&["loyaltyDistribution", "customerCountByTier"], "Loyalty Group Distribution", "Loyalty Group", ValueUnit::Count, KeyOrder::AsReceived),
        chart(&["loyaltyAvgSpending", "averageSpendByTier"], "Average Spending by Loyalty Group", "Loyalty Group", ValueUnit::Currency, KeyOrder::AsReceived),
    ],
};

static REVENUE_ANALYSIS: AnalysisDescriptor = AnalysisDescriptor {
    kind: AnalysisType::RevenueAnalysis,
    key: "revenue_analysis",
    title: "Revenue Analysis",
    snapshot: get("/revenue"),
    filtered: post("/revenue-analysis"),
    charts: &[
        chart(&["paymentMethodRevenue", "revenueByPaymentMethod"], "Revenue by Payment Method", "Payment Method", ValueUnit::Currency, KeyOrder::AsReceived),
        chart(&["revenueByHour"], "Revenue by Hour", "Hour of Day", ValueUnit::Currency, KeyOrder::Numeric),
        chart(&["revenueByOutlet"], "Revenue by Outlet", "Outlet", ValueUnit::Currency, KeyOrder::AsReceived),
    ],
};

static MENU_ANALYSIS: AnalysisDescriptor = AnalysisDescriptor {
    kind: AnalysisType::MenuAnalysis,
    key: "menu_analysis",
    title: "Menu Item Analysis",
    snapshot: get("/menu-items"),
    filtered: post("/menu-analysis"),
    charts: &[
        chart(&["topItems"], "Top Items by Order Count", "Item", ValueUnit::Count, KeyOrder::AsReceived),
        chart(&["itemRevenue"], "Top Items by Revenue", "Item", ValueUnit::Currency, KeyOrder::AsReceived),
        chart(&["categoryDistribution"], "Category Distribution", "Category", ValueUnit::Count, KeyOrder::AsReceived),
    ],
};

static SEASONAL_BEHAVIOR: AnalysisDescriptor = AnalysisDescriptor {
    kind: AnalysisType::SeasonalBehavior,
    key: "seasonal_behavior",
    title: "Seasonal Behavior",
    snapshot: get("/seasonal"),
    filtered: post("/seasonal-behavior"),
    charts: &[
        chart(&["monthlyRevenue"], "Monthly Revenue", "Month", ValueUnit::Currency, KeyOrder::Numeric),
        chart(&["monthlyOrders"], "Monthly Order Count", "Month", ValueUnit::Count, KeyOrder::Numeric),
    ],
};

static ANOMALY_DETECTION: AnalysisDescriptor = AnalysisDescriptor {
    kind: AnalysisType::AnomalyDetection,
    key: "anomaly_detection",
    title: "Anomaly Detection",
    snapshot: get("/anomaly"),
    filtered: post("/anomaly-detection"),
    charts: &[
        chart(&["anomalyDays", "orderCountAnomalies"], "Anomalous Days", "Date", ValueUnit::Count, KeyOrder::AsReceived),
        chart(&["revenueAnomalies"], "Revenue Anomalies", "Period", ValueUnit::Currency, KeyOrder::AsReceived),
        chart(&["cancellationAnomalies"], "Cancellation Anomalies", "Outlet", ValueUnit::Percent, KeyOrder::AsReceived),
    ],
};

static BRANCH_PERFORMANCE: AnalysisDescriptor = AnalysisDescriptor {
    kind: AnalysisType::BranchPerformance,
    key: "branch_performance",
    title: "Branch Performance",
    snapshot: get("/branch-performance"),
    filtered: post("/branch-performance"),
    charts: &[
        chart(&["branchRevenue", "regionalPerformance"], "Revenue by Branch", "Branch", ValueUnit::Currency, KeyOrder::AsReceived),
        chart(&["branchOrders", "outletRankings"], "Orders by Branch", "Branch", ValueUnit::Count, KeyOrder::AsReceived),
        chart(&["branchAvgOrder", "efficiencyAnalysis"], "Average Order by Branch", "Branch", ValueUnit::Score, KeyOrder::AsReceived),
    ],
};

/// User-selected filters, already validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisFilters {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub outlet_id: Option<String>,
    pub scope: RequestScope,
}

/// One analysis run against the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub analysis: AnalysisType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub outlet_id: Option<String>,
    pub scope: RequestScope,
}

impl AnalysisRequest {
    pub fn new(analysis: AnalysisType, filters: AnalysisFilters) -> Self {
        Self {
            analysis,
            start_date: filters.start_date,
            end_date: filters.end_date,
            outlet_id: filters.outlet_id,
            scope: filters.scope,
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        self.analysis.descriptor().endpoint(self.scope)
    }

    pub fn body(&self) -> RequestBody {
        RequestBody {
            start_date: self.start_date.format(DATE_FORMAT).to_string(),
            end_date: self.end_date.format(DATE_FORMAT).to_string(),
            outlet_id: self.outlet_id.clone(),
            analysis_type: self.analysis.key().to_string(),
        }
    }
}

/// JSON body of a filtered POST.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBody {
    pub start_date: String,
    pub end_date: String,
    pub outlet_id: Option<String>,
    pub analysis_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_lookback_start_clamps_out_of_range_values() {
        let end = date(2024, 1, 1);
        assert_eq!(lookback_start(end, 30), date(2023, 12, 2));
        assert_eq!(lookback_start(end, -5), end);
        assert_eq!(lookback_start(end, 1_000_000_000), end);
        assert_eq!(lookback_start(end, i64::MAX), end);
    }

    #[test]
    fn test_keys_round_trip_through_from_str() {
        for analysis in AnalysisType::ALL {
            let parsed: AnalysisType = analysis.key().parse().unwrap();
            assert_eq!(parsed, analysis);
        }
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = "weather_forecast".parse::<AnalysisType>().unwrap_err();
        assert!(matches!(err, FetchError::UnknownAnalysisType(ref k) if k == "weather_forecast"));
    }

    #[test]
    fn test_descriptor_kind_matches_type() {
        for analysis in AnalysisType::ALL {
            assert_eq!(analysis.descriptor().kind, analysis);
            assert!(!analysis.descriptor().charts.is_empty());
        }
    }

    #[test]
    fn test_snapshot_endpoints_are_get_and_filtered_are_post() {
        for analysis in AnalysisType::ALL {
            let d = analysis.descriptor();
            assert_eq!(d.snapshot.method, HttpMethod::Get);
            assert_eq!(d.filtered.method, HttpMethod::Post);
            assert!(d.snapshot.path.starts_with('/'));
            assert!(d.filtered.path.starts_with('/'));
        }
    }

    #[test]
    fn test_documented_paths() {
        let snapshot: Vec<_> = AnalysisType::ALL
            .iter()
            .map(|t| t.descriptor().snapshot.path)
            .collect();
        assert_eq!(
            snapshot,
            [
                "/peak-dining",
                "/customer-segment",
                "/revenue",
                "/menu-items",
                "/seasonal",
                "/anomaly",
                "/branch-performance"
            ]
        );

        let filtered: Vec<_> = AnalysisType::ALL
            .iter()
            .map(|t| t.descriptor().filtered.path)
            .collect();
        assert_eq!(
            filtered,
            [
                "/peak-dining",
                "/customer-segmentation",
                "/revenue-analysis",
                "/menu-analysis",
                "/seasonal-behavior",
                "/anomaly-detection",
                "/branch-performance"
            ]
        );
    }

    #[test]
    fn test_request_body_serializes_camel_case() {
        let request = AnalysisRequest::new(
            AnalysisType::RevenueAnalysis,
            AnalysisFilters {
                start_date: date(2024, 1, 1),
                end_date: date(2024, 1, 31),
                outlet_id: Some("OUT-7".to_string()),
                scope: RequestScope::Filtered,
            },
        );

        let json = serde_json::to_value(request.body()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "startDate": "2024-01-01",
                "endDate": "2024-01-31",
                "outletId": "OUT-7",
                "analysisType": "revenue_analysis"
            })
        );
    }

    #[test]
    fn test_request_body_all_outlets_is_null() {
        let request = AnalysisRequest::new(
            AnalysisType::PeakDining,
            AnalysisFilters {
                start_date: date(2024, 3, 1),
                end_date: date(2024, 3, 1),
                outlet_id: None,
                scope: RequestScope::Filtered,
            },
        );

        let json = serde_json::to_value(request.body()).unwrap();
        assert!(json["outletId"].is_null());
    }

    #[test]
    fn test_request_endpoint_follows_scope() {
        let filters = AnalysisFilters {
            start_date: date(2024, 3, 1),
            end_date: date(2024, 3, 2),
            outlet_id: None,
            scope: RequestScope::Snapshot,
        };
        let request = AnalysisRequest::new(AnalysisType::SeasonalBehavior, filters);
        assert_eq!(request.endpoint(), get("/seasonal"));
    }
}
