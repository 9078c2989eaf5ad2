//! Derived metrics engine
//!
//! Pure, stateless functions over [`NormalizedMetrics`](crate::types::NormalizedMetrics):
//! - Basic ratios (CTR, conversion rate, CPC, ROI, engagement)
//! - Performance score and grade
//! - Efficiency ratios against targets
//! - Trends and percent change against a previous record
//! - Window summaries over a history buffer
//!
//! Every function is total: division by zero and overflow produce 0, never
//! `NaN` or infinity.

pub mod derived;
pub mod ratios;
pub mod summary;

pub use derived::{
    cost_per_conversion, efficiency_metrics, performance_score, performance_score_of,
    DerivedMetrics, EfficiencyMetric, PerformanceGrade,
};
pub use ratios::{
    budget_utilization, conversion_rate, cpc, ctr, engagement, percent_change, revenue, roi,
    trend, Trend,
};
pub use summary::WindowSummary;
