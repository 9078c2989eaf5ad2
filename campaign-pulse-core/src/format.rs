//! Formatting helpers for metric displays.

use chrono::{DateTime, Utc};

/// Group the integer part with commas: `1234567.8` -> `"1,234,568"`.
pub fn format_thousands(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Dollar amount with two decimals: `1234.5` -> `"$1,234.50"`.
pub fn format_currency(value: f64) -> String {
    if !value.is_finite() {
        return "$0.00".to_string();
    }
    let cents = (value.abs() * 100.0).round();
    let whole = (cents / 100.0).trunc();
    let frac = cents - whole * 100.0;
    let sign = if value < 0.0 && cents > 0.0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, format_thousands(whole), frac as u64)
}

/// Short count: `950` -> `"950"`, `1500` -> `"1.5K"`, `3400000` -> `"3.4M"`.
pub fn format_compact(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let abs = value.abs();
    if abs >= 1_000_000.0 {
        format!("{:.1}M", value / 1_000_000.0)
    } else if abs >= 1_000.0 {
        format!("{:.1}K", value / 1_000.0)
    } else {
        format!("{:.0}", value)
    }
}

/// Percentage with `decimals` digits: `2.456` -> `"2.46%"`.
pub fn format_percent(value: f64, decimals: usize) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    format!("{:.*}%", decimals, value)
}

/// Format a timestamp as relative time (e.g., "2m ago").
pub fn format_relative_time(ts: DateTime<Utc>) -> String {
    format_relative_time_from(ts, Utc::now())
}

/// [`format_relative_time`] against an explicit `now`.
pub fn format_relative_time_from(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let duration = now.signed_duration_since(ts);

    if duration.num_seconds() < 1 {
        "just now".to_string()
    } else if duration.num_seconds() < 60 {
        format!("{}s ago", duration.num_seconds())
    } else if duration.num_minutes() < 60 {
        format!("{}m ago", duration.num_minutes())
    } else if duration.num_hours() < 24 {
        format!("{}h ago", duration.num_hours())
    } else if duration.num_days() < 7 {
        format!("{}d ago", duration.num_days())
    } else {
        ts.format("%b %d").to_string()
    }
}

/// Format an optional timestamp as relative time, or "never" if missing.
pub fn format_relative_time_opt(ts: Option<DateTime<Utc>>) -> String {
    match ts {
        Some(ts) => format_relative_time(ts),
        None => "never".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0.0), "0");
        assert_eq!(format_thousands(999.0), "999");
        assert_eq!(format_thousands(1234.0), "1,234");
        assert_eq!(format_thousands(1234567.8), "1,234,568");
        assert_eq!(format_thousands(-4500.0), "-4,500");
        assert_eq!(format_thousands(f64::NAN), "0");
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(1234.5), "$1,234.50");
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(2.999), "$3.00");
        assert_eq!(format_currency(-60.0), "-$60.00");
    }

    #[test]
    fn test_format_compact() {
        assert_eq!(format_compact(950.0), "950");
        assert_eq!(format_compact(1500.0), "1.5K");
        assert_eq!(format_compact(3_400_000.0), "3.4M");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(2.456, 2), "2.46%");
        assert_eq!(format_percent(f64::INFINITY, 1), "0.0%");
    }

    #[test]
    fn test_relative_time() {
        let now = Utc::now();
        assert_eq!(format_relative_time_from(now, now), "just now");
        assert_eq!(format_relative_time_from(now - Duration::seconds(5), now), "5s ago");
        assert_eq!(format_relative_time_from(now - Duration::minutes(3), now), "3m ago");
        assert_eq!(format_relative_time_from(now - Duration::hours(2), now), "2h ago");
        assert_eq!(format_relative_time_opt(None), "never");
    }
}
