//! Aggregates over a history window.

use super::ratios::percent_change;
use crate::types::NormalizedMetrics;

/// Totals, averages and growth across a window of records.
///
/// Counters in insight payloads are cumulative, so totals are taken from the
/// newest record while rates are averaged over the whole window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowSummary {
    pub points: usize,
    pub total_impressions: f64,
    pub total_clicks: f64,
    pub total_conversions: f64,
    pub total_spend: f64,
    pub total_revenue: f64,
    pub avg_ctr: f64,
    pub avg_conversion_rate: f64,
    pub avg_cpc: f64,
    pub avg_roi: f64,
    /// Percent change from the oldest to the newest record
    pub impressions_growth: f64,
    pub clicks_growth: f64,
    pub conversions_growth: f64,
    pub revenue_growth: f64,
}

impl WindowSummary {
    /// Summarize `records` (oldest first). An empty window yields all zeros.
    pub fn from_records(records: &[NormalizedMetrics]) -> Self {
        let (Some(first), Some(last)) = (records.first(), records.last()) else {
            return Self::default();
        };

        let n = records.len() as f64;
        let avg = |f: fn(&NormalizedMetrics) -> f64| records.iter().map(f).sum::<f64>() / n;

        Self {
            points: records.len(),
            total_impressions: last.impressions,
            total_clicks: last.clicks,
            total_conversions: last.conversions,
            total_spend: last.spend,
            total_revenue: last.revenue,
            avg_ctr: avg(|m| m.ctr),
            avg_conversion_rate: avg(|m| m.conversion_rate),
            avg_cpc: avg(|m| m.cpc),
            avg_roi: avg(|m| m.roi),
            impressions_growth: percent_change(last.impressions, first.impressions),
            clicks_growth: percent_change(last.clicks, first.clicks),
            conversions_growth: percent_change(last.conversions, first.conversions),
            revenue_growth: percent_change(last.revenue, first.revenue),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use serde_json::json;

    fn metrics(value: serde_json::Value) -> NormalizedMetrics {
        normalize(&serde_json::from_value(value).unwrap(), 100.0)
    }

    #[test]
    fn test_empty_window() {
        assert_eq!(WindowSummary::from_records(&[]), WindowSummary::default());
    }

    #[test]
    fn test_window_summary() {
        let records = vec![
            metrics(json!({"impressions": 1000, "clicks": 20, "conversions": 1, "spend": 50})),
            metrics(json!({"impressions": 1500, "clicks": 30, "conversions": 2, "spend": 100})),
        ];
        let summary = WindowSummary::from_records(&records);

        assert_eq!(summary.points, 2);
        assert_eq!(summary.total_impressions, 1500.0);
        assert_eq!(summary.total_spend, 100.0);
        assert_eq!(summary.total_revenue, 200.0);
        assert_eq!(summary.impressions_growth, 50.0);
        assert_eq!(summary.conversions_growth, 100.0);
        assert_eq!(summary.revenue_growth, 100.0);
        // roi: 100% then 100%
        assert_eq!(summary.avg_roi, 100.0);
        assert!((summary.avg_ctr - 2.0).abs() < 1e-9);
    }
}
