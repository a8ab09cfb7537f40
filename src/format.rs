//! Payload formatting.
//!
//! Pure transforms from a backend payload to what panels display: a flat
//! metric table, per-type chart series, headline summaries and a plain-text
//! report. Nothing here computes metrics; values are passed through as the
//! backend sent them. Missing parts of a payload render as "no data".

use serde_json::Value;

use crate::{
    analysis::{AnalysisType, ChartSpec, KeyOrder, ValueUnit},
    api::Payload,
};

/// One `(label, value)` row of the metric table.
pub type TableRow = (String, String);

/// Flatten a payload into table rows, in payload order.
///
/// Nested objects are flattened one level as `outer.inner`; anything deeper
/// is rendered as compact JSON.
pub fn to_table(payload: &Payload) -> Vec<TableRow> {
    let mut rows = Vec::with_capacity(payload.len());
    for (key, value) in payload {
        match value {
            Value::Object(inner) => {
                for (sub_key, sub_value) in inner {
                    rows.push((format!("{}.{}", key, sub_key), stringify(sub_value)));
                }
            }
            other => rows.push((key.clone(), stringify(other))),
        }
    }
    rows
}

/// Render a scalar the way a user expects to read it; strings lose their quotes.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub label: String,
    pub value: f64,
}

/// Series for one chart; empty `bars` means "no data".
#[derive(Debug, Clone, PartialEq)]
pub struct ChartView {
    pub title: &'static str,
    pub x_label: &'static str,
    pub unit: ValueUnit,
    pub bars: Vec<Bar>,
}

impl ChartView {
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn max_value(&self) -> f64 {
        self.bars.iter().map(|b| b.value).fold(0.0, f64::max)
    }
}

/// Build every chart the analysis declares, in declaration order.
pub fn to_charts(analysis: AnalysisType, payload: &Payload) -> Vec<ChartView> {
    analysis
        .descriptor()
        .charts
        .iter()
        .map(|spec| chart_view(spec, payload))
        .collect()
}

fn chart_view(spec: &ChartSpec, payload: &Payload) -> ChartView {
    let series = spec
        .keys
        .iter()
        .find_map(|key| payload.get(*key).and_then(Value::as_object));

    let mut bars: Vec<Bar> = series
        .map(|map| {
            map.iter()
                .filter_map(|(label, value)| {
                    value.as_f64().map(|value| Bar {
                        label: label.clone(),
                        value,
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    if spec.order == KeyOrder::Numeric {
        let numeric: Option<Vec<i64>> = bars.iter().map(|b| b.label.parse().ok()).collect();
        if let Some(keys) = numeric {
            let mut keyed: Vec<(i64, Bar)> = keys.into_iter().zip(bars).collect();
            keyed.sort_by_key(|(k, _)| *k);
            bars = keyed.into_iter().map(|(_, b)| b).collect();
        }
    }

    ChartView {
        title: spec.title,
        x_label: spec.x_label,
        unit: spec.unit,
        bars,
    }
}

// ==================== Revenue shares ====================

#[derive(Debug, Clone, PartialEq)]
pub struct RevenueShare {
    pub method: String,
    pub revenue: f64,
    /// Share of `totalRevenue`, 0 when the total is zero or absent.
    pub percent: f64,
}

/// Revenue per payment method with its share of the total.
pub fn revenue_shares(payload: &Payload) -> Vec<RevenueShare> {
    let total = number(payload, "totalRevenue").unwrap_or(0.0);
    let Some(methods) = ["paymentMethodRevenue", "revenueByPaymentMethod"]
        .iter()
        .find_map(|key| payload.get(*key).and_then(Value::as_object))
    else {
        return Vec::new();
    };

    methods
        .iter()
        .filter_map(|(method, value)| {
            let revenue = value.as_f64()?;
            let percent = if total > 0.0 {
                revenue / total * 100.0
            } else {
                0.0
            };
            Some(RevenueShare {
                method: method.clone(),
                revenue,
                percent,
            })
        })
        .collect()
}

// ==================== Summaries ====================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryLine {
    pub label: String,
    pub value: String,
}

impl SummaryLine {
    fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Headline figures for an analysis. Absent fields are skipped, except the
/// peak-dining headlines which read "N/A".
pub fn summarize(analysis: AnalysisType, payload: &Payload) -> Vec<SummaryLine> {
    let mut lines = Vec::new();
    match analysis {
        AnalysisType::PeakDining => {
            let peak_hour = payload
                .get("peakHour")
                .and_then(Value::as_i64)
                .map(|h| format!("{:02}:00", h))
                .unwrap_or_else(|| "N/A".to_string());
            let peak_day = payload
                .get("peakDay")
                .map(stringify)
                .unwrap_or_else(|| "N/A".to_string());
            lines.push(SummaryLine::new("Peak Hour", peak_hour));
            lines.push(SummaryLine::new("Peak Day", peak_day));
            push_count(&mut lines, payload, "totalOrders", "Total Orders");
        }
        AnalysisType::CustomerSegmentation => {
            push_count(&mut lines, payload, "totalCustomers", "Total Customers");
            push_currency(&mut lines, payload, "averageCustomerValue", "Average Customer Value");
            push_text(&mut lines, payload, "topPerformingSegment", "Top Segment");
        }
        AnalysisType::RevenueAnalysis => {
            push_currency(&mut lines, payload, "totalRevenue", "Total Revenue");
            push_count(&mut lines, payload, "totalOrders", "Total Orders");
            if payload.contains_key("avgOrderValue") {
                push_currency(&mut lines, payload, "avgOrderValue", "Average Order Value");
            } else {
                push_currency(&mut lines, payload, "averageOrderValue", "Average Order Value");
            }
            for share in revenue_shares(payload) {
                lines.push(SummaryLine::new(
                    share.method,
                    format!("{} ({:.1}%)", format_lkr(share.revenue), share.percent),
                ));
            }
        }
        AnalysisType::MenuAnalysis => {
            if let Some((item, count)) = payload
                .get("topItems")
                .and_then(Value::as_object)
                .and_then(|items| items.iter().next())
            {
                lines.push(SummaryLine::new(
                    "Most Ordered",
                    format!("{} ({} orders)", item, stringify(count)),
                ));
            }
        }
        AnalysisType::SeasonalBehavior => {}
        AnalysisType::AnomalyDetection => {
            if let Some(avg) = number(payload, "averageDaily") {
                lines.push(SummaryLine::new("Average Daily Orders", format!("{:.2}", avg)));
            }
            if let Some(std_dev) = number(payload, "stdDeviation") {
                lines.push(SummaryLine::new("Standard Deviation", format!("{:.2}", std_dev)));
            }
            if let Some(days) = payload.get("anomalyDays").and_then(Value::as_object) {
                lines.push(SummaryLine::new("Anomalous Days", days.len().to_string()));
            }
            if let Some(score) = number(payload, "overallAnomalyScore") {
                lines.push(SummaryLine::new("Anomaly Score", format!("{:.2}", score)));
            }
        }
        AnalysisType::BranchPerformance => {
            push_list(&mut lines, payload, "topPerformers", "Top Performers");
            push_list(&mut lines, payload, "bottomPerformers", "Needs Attention");
        }
    }
    lines
}

fn number(payload: &Payload, key: &str) -> Option<f64> {
    payload.get(key).and_then(Value::as_f64)
}

fn push_count(lines: &mut Vec<SummaryLine>, payload: &Payload, key: &str, label: &str) {
    if let Some(n) = number(payload, key) {
        lines.push(SummaryLine::new(label, format_count(n)));
    }
}

fn push_currency(lines: &mut Vec<SummaryLine>, payload: &Payload, key: &str, label: &str) {
    if let Some(n) = number(payload, key) {
        lines.push(SummaryLine::new(label, format_lkr(n)));
    }
}

fn push_text(lines: &mut Vec<SummaryLine>, payload: &Payload, key: &str, label: &str) {
    if let Some(value) = payload.get(key).filter(|v| !v.is_null()) {
        lines.push(SummaryLine::new(label, stringify(value)));
    }
}

fn push_list(lines: &mut Vec<SummaryLine>, payload: &Payload, key: &str, label: &str) {
    if let Some(items) = payload.get(key).and_then(Value::as_array) {
        if !items.is_empty() {
            let joined: Vec<String> = items.iter().map(stringify).collect();
            lines.push(SummaryLine::new(label, joined.join(", ")));
        }
    }
}

// ==================== Number formatting ====================

/// `LKR 1,234.50`
pub fn format_lkr(amount: f64) -> String {
    format!("LKR {}", format_thousands(amount, 2))
}

/// Whole counts without decimals, fractional ones with two.
pub fn format_count(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format_thousands(value, 0)
    } else {
        format_thousands(value, 2)
    }
}

/// Value rendered according to its unit.
pub fn format_value(value: f64, unit: ValueUnit) -> String {
    match unit {
        ValueUnit::Count => format_count(value),
        ValueUnit::Currency => format_lkr(value),
        ValueUnit::Percent => format!("{:.1}%", value),
        ValueUnit::Score => format_thousands(value, 2),
    }
}

fn format_thousands(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && formatted.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };

    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}

// ==================== Text report ====================

/// Multi-section plain-text report, as shown by the headless CLI.
pub fn render_report(analysis: AnalysisType, payload: &Payload) -> String {
    let mut out = format!("=== {} ===\n\n", analysis.title().to_uppercase());

    if payload.is_empty() {
        out.push_str("No data returned.\n");
        return out;
    }

    let summary = summarize(analysis, payload);
    for line in &summary {
        out.push_str(&format!("{}: {}\n", line.label, line.value));
    }

    for chart in to_charts(analysis, payload) {
        out.push_str(&format!("\n{}:\n", chart.title));
        if chart.is_empty() {
            out.push_str("  No data\n");
            continue;
        }
        for bar in &chart.bars {
            out.push_str(&format!("  {}: {}\n", bar.label, format_value(bar.value, chart.unit)));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Payload {
        match value {
            Value::Object(map) => map,
            _ => panic!("test payload must be an object"),
        }
    }

    fn rows(pairs: &[(&str, &str)]) -> Vec<TableRow> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    // ==================== to_table Tests ====================

    #[test]
    fn test_to_table_flattens_one_level_in_order() {
        let p = payload(json!({"a": 1, "b": {"x": 2, "y": 3}}));
        assert_eq!(to_table(&p), rows(&[("a", "1"), ("b.x", "2"), ("b.y", "3")]));
    }

    #[test]
    fn test_to_table_empty_payload() {
        assert!(to_table(&Payload::new()).is_empty());
    }

    #[test]
    fn test_to_table_keeps_payload_order_not_alphabetical() {
        let p = payload(json!({"zeta": 1, "alpha": 2}));
        assert_eq!(to_table(&p), rows(&[("zeta", "1"), ("alpha", "2")]));
    }

    #[test]
    fn test_to_table_strings_lose_quotes() {
        let p = payload(json!({"peakDay": "FRIDAY", "daily": {"MONDAY": 12}}));
        assert_eq!(to_table(&p), rows(&[("peakDay", "FRIDAY"), ("daily.MONDAY", "12")]));
    }

    #[test]
    fn test_to_table_deeper_nesting_is_json() {
        let p = payload(json!({"outletMetrics": {"OUT-1": {"totalOrders": 4}}}));
        assert_eq!(
            to_table(&p),
            rows(&[("outletMetrics.OUT-1", r#"{"totalOrders":4}"#)])
        );
    }

    #[test]
    fn test_to_table_arrays_null_and_bools() {
        let p = payload(json!({"topPerformers": ["A", "B"], "forecast": null, "ok": true}));
        assert_eq!(
            to_table(&p),
            rows(&[("topPerformers", r#"["A","B"]"#), ("forecast", "null"), ("ok", "true")])
        );
    }

    #[test]
    fn test_to_table_empty_nested_object_yields_no_rows() {
        let p = payload(json!({"hourly": {}, "peakHour": 19}));
        assert_eq!(to_table(&p), rows(&[("peakHour", "19")]));
    }

    #[test]
    fn test_to_table_floats() {
        let p = payload(json!({"avgOrderValue": 1250.5}));
        assert_eq!(to_table(&p), rows(&[("avgOrderValue", "1250.5")]));
    }

    // ==================== to_charts Tests ====================

    #[test]
    fn test_peak_dining_charts_pass_values_through() {
        let p = payload(json!({
            "peakHour": 19,
            "hourly": {"19": 40, "8": 5, "12": 22},
            "daily": {"MONDAY": 10, "FRIDAY": 30},
        }));

        let charts = to_charts(AnalysisType::PeakDining, &p);
        assert_eq!(charts.len(), 3);

        let hourly = &charts[0];
        assert_eq!(hourly.title, "Orders by Hour");
        let labels: Vec<_> = hourly.bars.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, ["8", "12", "19"]);
        assert_eq!(hourly.bars[2].value, 40.0);

        let daily = &charts[1];
        let labels: Vec<_> = daily.bars.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, ["MONDAY", "FRIDAY"]);

        assert!(charts[2].is_empty(), "monthly absent means no data");
    }

    #[test]
    fn test_charts_accept_alternate_keys() {
        let p = payload(json!({"ordersByHour": {"9": 3}}));
        let charts = to_charts(AnalysisType::PeakDining, &p);
        assert_eq!(charts[0].bars, vec![Bar { label: "9".into(), value: 3.0 }]);
    }

    #[test]
    fn test_charts_skip_non_numeric_entries() {
        let p = payload(json!({"topItems": {"Kottu": 9, "Hoppers": "n/a"}}));
        let charts = to_charts(AnalysisType::MenuAnalysis, &p);
        assert_eq!(charts[0].bars.len(), 1);
        assert_eq!(charts[0].bars[0].label, "Kottu");
    }

    #[test]
    fn test_numeric_order_falls_back_when_keys_are_names() {
        let p = payload(json!({"monthlyRevenue": {"MARCH": 3.0, "JANUARY": 1.0}}));
        let charts = to_charts(AnalysisType::SeasonalBehavior, &p);
        let labels: Vec<_> = charts[0].bars.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, ["MARCH", "JANUARY"]);
    }

    #[test]
    fn test_charts_on_empty_payload_are_all_empty() {
        for analysis in AnalysisType::ALL {
            let charts = to_charts(analysis, &Payload::new());
            assert!(charts.iter().all(ChartView::is_empty));
        }
    }

    #[test]
    fn test_chart_series_that_is_not_an_object_is_no_data() {
        let p = payload(json!({"hourly": [1, 2, 3]}));
        assert!(to_charts(AnalysisType::PeakDining, &p)[0].is_empty());
    }

    // ==================== Revenue share Tests ====================

    #[test]
    fn test_revenue_shares_percentages() {
        let p = payload(json!({
            "totalRevenue": 1000,
            "paymentMethodRevenue": {"card": 600, "cash": 400}
        }));
        let shares = revenue_shares(&p);
        assert_eq!(shares.len(), 2);
        assert_eq!(shares[0].method, "card");
        assert!((shares[0].percent - 60.0).abs() < 1e-9);
        assert_eq!(shares[1].method, "cash");
        assert!((shares[1].percent - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_revenue_shares_zero_total() {
        let p = payload(json!({
            "totalRevenue": 0,
            "paymentMethodRevenue": {"card": 600, "cash": 400}
        }));
        let shares = revenue_shares(&p);
        assert!(shares.iter().all(|s| s.percent == 0.0));
    }

    #[test]
    fn test_revenue_shares_without_breakdown() {
        let p = payload(json!({"totalRevenue": 1000}));
        assert!(revenue_shares(&p).is_empty());
    }

    // ==================== Summary Tests ====================

    #[test]
    fn test_peak_dining_summary() {
        let p = payload(json!({"peakHour": 9, "peakDay": "SATURDAY"}));
        let lines = summarize(AnalysisType::PeakDining, &p);
        assert_eq!(lines[0], SummaryLine::new("Peak Hour", "09:00"));
        assert_eq!(lines[1], SummaryLine::new("Peak Day", "SATURDAY"));
    }

    #[test]
    fn test_peak_dining_summary_missing_fields() {
        let lines = summarize(AnalysisType::PeakDining, &Payload::new());
        assert_eq!(lines[0].value, "N/A");
        assert_eq!(lines[1].value, "N/A");
    }

    #[test]
    fn test_revenue_summary_lines() {
        let p = payload(json!({
            "totalRevenue": 1000,
            "totalOrders": 8,
            "avgOrderValue": 125,
            "paymentMethodRevenue": {"card": 600, "cash": 400}
        }));
        let lines = summarize(AnalysisType::RevenueAnalysis, &p);
        let rendered: Vec<String> = lines
            .iter()
            .map(|l| format!("{}: {}", l.label, l.value))
            .collect();
        assert_eq!(
            rendered,
            [
                "Total Revenue: LKR 1,000.00",
                "Total Orders: 8",
                "Average Order Value: LKR 125.00",
                "card: LKR 600.00 (60.0%)",
                "cash: LKR 400.00 (40.0%)",
            ]
        );
    }

    #[test]
    fn test_anomaly_summary_counts_days() {
        let p = payload(json!({
            "averageDaily": 41.333,
            "stdDeviation": 4.5,
            "anomalyDays": {"2024-02-14": 90, "2024-04-13": 88}
        }));
        let lines = summarize(AnalysisType::AnomalyDetection, &p);
        assert_eq!(lines[0].value, "41.33");
        assert_eq!(lines[2], SummaryLine::new("Anomalous Days", "2"));
    }

    // ==================== Formatting Tests ====================

    #[test]
    fn test_format_lkr() {
        assert_eq!(format_lkr(0.0), "LKR 0.00");
        assert_eq!(format_lkr(999.5), "LKR 999.50");
        assert_eq!(format_lkr(1234567.891), "LKR 1,234,567.89");
        assert_eq!(format_lkr(-1500.0), "LKR -1,500.00");
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(12.0), "12");
        assert_eq!(format_count(12000.0), "12,000");
        assert_eq!(format_count(2.5), "2.50");
    }

    #[test]
    fn test_format_negative_zero_has_no_sign() {
        assert_eq!(format_lkr(-0.001), "LKR 0.00");
    }

    // ==================== Report Tests ====================

    #[test]
    fn test_render_report_sections() {
        let p = payload(json!({
            "peakHour": 19,
            "peakDay": "FRIDAY",
            "hourly": {"19": 40},
        }));
        let report = render_report(AnalysisType::PeakDining, &p);
        assert!(report.starts_with("=== PEAK DINING ANALYSIS ===\n\n"));
        assert!(report.contains("Peak Hour: 19:00\n"));
        assert!(report.contains("\nOrders by Hour:\n  19: 40\n"));
        assert!(report.contains("\nOrders by Day:\n  No data\n"));
    }

    #[test]
    fn test_render_report_empty_payload() {
        let report = render_report(AnalysisType::SeasonalBehavior, &Payload::new());
        assert!(report.ends_with("No data returned.\n"));
    }

    #[test]
    fn test_render_report_currency_series() {
        let p = payload(json!({"monthlyRevenue": {"1": 1500.0}}));
        let report = render_report(AnalysisType::SeasonalBehavior, &p);
        assert!(report.contains("  1: LKR 1,500.00\n"));
    }

    mod proptest_tests {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #[test]
            fn thousands_grouping_preserves_digits(n in -1_000_000_000_000i64..1_000_000_000_000) {
                let formatted = format_thousands(n as f64, 0);
                prop_assert_eq!(formatted.replace(',', ""), n.to_string());
            }

            #[test]
            fn revenue_shares_stay_within_bounds(
                cash in 0.0f64..1e6,
                card in 0.0f64..1e6,
            ) {
                let p = payload(json!({
                    "totalRevenue": cash + card,
                    "paymentMethodRevenue": {"Cash": cash, "Card": card}
                }));
                let shares = revenue_shares(&p);
                prop_assert_eq!(shares.len(), 2);
                for share in &shares {
                    prop_assert!(share.percent >= 0.0 && share.percent <= 100.0 + 1e-9);
                }
            }
        }
    }
}
