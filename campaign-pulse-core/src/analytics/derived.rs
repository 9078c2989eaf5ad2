//! Metrics derived from the latest normalized record.

use serde::Serialize;

use super::ratios::{budget_utilization, finite_or_zero, trend, Trend};
use crate::types::NormalizedMetrics;

/// Weighted blend of CTR and conversion rate, rounded to one decimal.
pub fn performance_score(m: &NormalizedMetrics) -> f64 {
    performance_score_of(Some(m.ctr), Some(m.conversion_rate))
}

/// [`performance_score`] for inputs that may be missing; 0 when either is.
pub fn performance_score_of(ctr: Option<f64>, conversion_rate: Option<f64>) -> f64 {
    match (ctr, conversion_rate) {
        (Some(ctr), Some(conversion_rate)) => {
            finite_or_zero(((ctr * 0.4 + conversion_rate * 0.6) * 10.0).round() / 10.0)
        }
        _ => 0.0,
    }
}

/// Spend per conversion, 0 without conversions.
pub fn cost_per_conversion(m: &NormalizedMetrics) -> f64 {
    if m.conversions > 0.0 {
        finite_or_zero(m.spend / m.conversions)
    } else {
        0.0
    }
}

/// Label for a performance score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PerformanceGrade {
    Excellent,
    Good,
    NeedsImprovement,
}

impl PerformanceGrade {
    pub fn from_score(score: f64) -> Self {
        if score >= 7.0 {
            PerformanceGrade::Excellent
        } else if score >= 5.0 {
            PerformanceGrade::Good
        } else {
            PerformanceGrade::NeedsImprovement
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PerformanceGrade::Excellent => "Excellent",
            PerformanceGrade::Good => "Good",
            PerformanceGrade::NeedsImprovement => "Needs Improvement",
        }
    }
}

/// One efficiency ratio compared against its target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EfficiencyMetric {
    pub name: &'static str,
    pub value: f64,
    pub target: f64,
    /// For cost metrics lower is better
    pub lower_is_better: bool,
}

impl EfficiencyMetric {
    /// True when the value is on the good side of its target.
    pub fn meets_target(&self) -> bool {
        if self.lower_is_better {
            self.value <= self.target
        } else {
            self.value >= self.target
        }
    }
}

/// Efficiency ratios shown next to the performance charts.
pub fn efficiency_metrics(
    m: &NormalizedMetrics,
    revenue_per_conversion: f64,
) -> Vec<EfficiencyMetric> {
    let roi_potential = if m.spend > 0.0 {
        finite_or_zero(m.conversions * revenue_per_conversion / m.spend * 100.0)
    } else {
        0.0
    };
    let conversion_efficiency = if m.clicks > 0.0 {
        finite_or_zero(m.conversions / m.clicks * 100.0)
    } else {
        0.0
    };

    vec![
        EfficiencyMetric {
            name: "Click Efficiency",
            value: m.engagement,
            target: 2.5,
            lower_is_better: false,
        },
        EfficiencyMetric {
            name: "Conversion Efficiency",
            value: conversion_efficiency,
            target: 10.0,
            lower_is_better: false,
        },
        EfficiencyMetric {
            name: "Cost Efficiency",
            value: cost_per_conversion(m),
            target: 50.0,
            lower_is_better: true,
        },
        EfficiencyMetric {
            name: "ROI Potential",
            value: roi_potential,
            target: 200.0,
            lower_is_better: false,
        },
    ]
}

/// Everything a detail view derives from the current (and previous) record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedMetrics {
    pub ctr: f64,
    pub conversion_rate: f64,
    pub cpc: f64,
    pub cost_per_conversion: f64,
    pub revenue: f64,
    pub roi: f64,
    pub engagement: f64,
    pub performance_score: f64,
    pub grade: PerformanceGrade,
    /// 0 when the campaign has no budget
    pub budget_utilization: f64,
    #[serde(skip)]
    pub impressions_trend: Trend,
    #[serde(skip)]
    pub clicks_trend: Trend,
    #[serde(skip)]
    pub conversions_trend: Trend,
    #[serde(skip)]
    pub spend_trend: Trend,
    pub efficiency: Vec<EfficiencyMetric>,
}

impl DerivedMetrics {
    pub fn compute(
        current: &NormalizedMetrics,
        previous: Option<&NormalizedMetrics>,
        total_budget: Option<f64>,
        revenue_per_conversion: f64,
    ) -> Self {
        let score = performance_score(current);
        Self {
            ctr: current.ctr,
            conversion_rate: current.conversion_rate,
            cpc: current.cpc,
            cost_per_conversion: cost_per_conversion(current),
            revenue: current.revenue,
            roi: current.roi,
            engagement: current.engagement,
            performance_score: score,
            grade: PerformanceGrade::from_score(score),
            budget_utilization: total_budget
                .map(|budget| budget_utilization(current.spend, budget))
                .unwrap_or(0.0),
            impressions_trend: trend(current.impressions, previous.map(|p| p.impressions)),
            clicks_trend: trend(current.clicks, previous.map(|p| p.clicks)),
            conversions_trend: trend(current.conversions, previous.map(|p| p.conversions)),
            spend_trend: trend(current.spend, previous.map(|p| p.spend)),
            efficiency: efficiency_metrics(current, revenue_per_conversion),
        }
    }
}
