//! Basic campaign ratios.
//!
//! All functions are total: a zero (or non-positive) denominator yields 0 and
//! non-finite intermediate results collapse to 0.

/// Replace `NaN`/`inf` with 0.
pub(crate) fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

fn percent_of(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        finite_or_zero(part / whole * 100.0)
    } else {
        0.0
    }
}

/// Click-through rate: clicks/impressions*100.
pub fn ctr(clicks: f64, impressions: f64) -> f64 {
    percent_of(clicks, impressions)
}

/// Conversions per click in percent.
pub fn conversion_rate(conversions: f64, clicks: f64) -> f64 {
    percent_of(conversions, clicks)
}

/// Engagement rate: clicks/impressions*100.
pub fn engagement(clicks: f64, impressions: f64) -> f64 {
    percent_of(clicks, impressions)
}

/// Cost per click.
pub fn cpc(spend: f64, clicks: f64) -> f64 {
    if clicks > 0.0 {
        finite_or_zero(spend / clicks)
    } else {
        0.0
    }
}

/// Revenue attributed to `conversions`.
pub fn revenue(conversions: f64, revenue_per_conversion: f64) -> f64 {
    finite_or_zero(conversions * revenue_per_conversion)
}

/// Return on investment in percent: (revenue-spend)/spend*100, 0 without spend.
pub fn roi(revenue: f64, spend: f64) -> f64 {
    if spend > 0.0 {
        finite_or_zero((revenue - spend) / spend * 100.0)
    } else {
        0.0
    }
}

/// Relative change from `previous` to `current` in percent.
///
/// Defined as 0 when `previous` is 0, so a first observation never reports
/// an infinite jump.
pub fn percent_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        0.0
    } else {
        finite_or_zero((current - previous) / previous * 100.0)
    }
}

/// Share of `total_budget` already spent, capped at 100%.
pub fn budget_utilization(spend: f64, total_budget: f64) -> f64 {
    if total_budget > 0.0 {
        finite_or_zero(spend / total_budget * 100.0).min(100.0)
    } else {
        0.0
    }
}

/// Direction and size of a change, as shown next to a KPI.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trend {
    /// Absolute change in whole percent
    pub percent: f64,
    /// True when the value grew or stayed flat
    pub is_positive: bool,
}

impl Trend {
    pub const FLAT: Trend = Trend {
        percent: 0.0,
        is_positive: true,
    };
}

/// Trend of `current` against an optional `previous` value.
pub fn trend(current: f64, previous: Option<f64>) -> Trend {
    match previous {
        Some(previous) if previous != 0.0 => {
            let diff = current - previous;
            Trend {
                percent: finite_or_zero((diff.abs() / previous.abs() * 100.0).round()),
                is_positive: diff >= 0.0,
            }
        }
        _ => Trend::FLAT,
    }
}
