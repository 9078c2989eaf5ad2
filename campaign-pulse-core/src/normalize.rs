//! Metrics normalization
//!
//! Every number that enters the system from the network passes through
//! [`normalize`]. It is total: missing, null, non-numeric, negative or
//! non-finite inputs become 0, so no `NaN` ever reaches a buffer or a view.
//!
//! Rates (`ctr`, `cpc`, `conversion_rate`) supplied by the payload are kept;
//! absent ones are recomputed from the counters with zero-denominator guards.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use crate::analytics;
use crate::types::{NormalizedMetrics, RawMetricsPayload};

/// Default revenue attributed to one conversion.
pub const DEFAULT_REVENUE_PER_CONVERSION: f64 = 100.0;

/// Convert a raw payload into a canonical record.
///
/// The result has `is_realtime = false`; the stream controller marks its own
/// records with [`NormalizedMetrics::into_realtime`].
pub fn normalize(raw: &RawMetricsPayload, revenue_per_conversion: f64) -> NormalizedMetrics {
    let impressions = counter(raw.impressions.as_ref());
    let clicks = counter(raw.clicks.as_ref());
    let conversions = counter(raw.conversions.as_ref());
    let spend = counter(raw.spend.as_ref());

    let ctr = supplied_rate(raw.ctr.as_ref()).unwrap_or_else(|| analytics::ctr(clicks, impressions));
    let conversion_rate = supplied_rate(raw.conversion_rate.as_ref())
        .unwrap_or_else(|| analytics::conversion_rate(conversions, clicks));
    let cpc = supplied_rate(raw.cpc.as_ref()).unwrap_or_else(|| analytics::cpc(spend, clicks));

    let revenue = analytics::revenue(conversions, revenue_per_conversion);

    NormalizedMetrics {
        timestamp: raw
            .timestamp
            .as_ref()
            .and_then(parse_timestamp)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        impressions,
        clicks,
        conversions,
        spend,
        ctr,
        conversion_rate,
        cpc,
        revenue,
        roi: analytics::roi(revenue, spend),
        engagement: analytics::engagement(clicks, impressions),
        is_realtime: false,
    }
}

/// Coerce a JSON value into a finite number.
///
/// Accepts JSON numbers and numeric strings. Returns `None` for null,
/// booleans, arrays, objects, non-numeric strings and non-finite values.
pub fn safe_number(value: Option<&Value>) -> Option<f64> {
    let number = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

/// Counter fields default to 0 and never go negative.
fn counter(value: Option<&Value>) -> f64 {
    safe_number(value).unwrap_or(0.0).max(0.0)
}

/// A rate the payload supplied itself, clamped to be non-negative.
fn supplied_rate(value: Option<&Value>) -> Option<f64> {
    safe_number(value).map(|rate| rate.max(0.0))
}

/// Parse an event timestamp.
///
/// Accepts RFC 3339 strings, naive `YYYY-MM-DD[T ]HH:MM:SS[.f]` strings
/// (taken as UTC) and epoch milliseconds as a number or numeric string.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
                return Some(ts.with_timezone(&Utc));
            }
            for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
                if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
                    return Some(naive.and_utc());
                }
            }
            s.parse::<f64>().ok().and_then(from_epoch_millis)
        }
        Value::Number(n) => n.as_f64().and_then(from_epoch_millis),
        _ => None,
    }
}

fn from_epoch_millis(millis: f64) -> Option<DateTime<Utc>> {
    if !millis.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis(millis.round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> RawMetricsPayload {
        serde_json::from_value(value).unwrap()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 0.01,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_snapshot_without_conversions() {
        let m = normalize(
            &payload(json!({
                "timestamp": "2024-05-01T10:00:00Z",
                "impressions": 1000,
                "clicks": 20,
                "spend": 50,
            })),
            DEFAULT_REVENUE_PER_CONVERSION,
        );

        assert_close(m.ctr, 2.0);
        assert_close(m.cpc, 2.5);
        assert_close(m.conversion_rate, 0.0);
        assert_close(m.revenue, 0.0);
        assert_close(m.roi, -100.0);
        assert_close(m.engagement, 2.0);
        assert_eq!(m.conversions, 0.0);
        assert!(!m.is_realtime);
        assert_eq!(m.timestamp.to_rfc3339(), "2024-05-01T10:00:00+00:00");
    }

    #[test]
    fn test_stream_event_revenue_and_roi() {
        let m = normalize(
            &payload(json!({
                "timestamp": "2024-05-01T10:00:05Z",
                "impressions": 1200,
                "clicks": 30,
                "conversions": 2,
                "spend": 60,
            })),
            100.0,
        );

        assert_close(m.revenue, 200.0);
        assert_close(m.roi, 233.33);
        assert_close(m.ctr, 2.5);
        assert_close(m.conversion_rate, 6.67);
        assert_close(m.cpc, 2.0);
    }

    #[test]
    fn test_supplied_rates_are_kept() {
        let m = normalize(
            &payload(json!({
                "impressions": 1000,
                "clicks": 20,
                "spend": 50,
                "ctr": 3.1,
                "cpc": "1.75",
                "conversion_rate": 4,
            })),
            100.0,
        );
        assert_close(m.ctr, 3.1);
        assert_close(m.cpc, 1.75);
        assert_close(m.conversion_rate, 4.0);
        // engagement is always recomputed
        assert_close(m.engagement, 2.0);
    }

    #[test]
    fn test_zero_denominators() {
        let m = normalize(&payload(json!({"conversions": 3})), 100.0);
        assert_eq!(m.ctr, 0.0);
        assert_eq!(m.cpc, 0.0);
        assert_eq!(m.conversion_rate, 0.0);
        assert_eq!(m.engagement, 0.0);
        assert_eq!(m.roi, 0.0);
        assert_eq!(m.revenue, 300.0);
        assert_eq!(m.timestamp, DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn test_malformed_payloads_stay_finite() {
        let inputs = [
            json!({}),
            json!({"impressions": null, "clicks": "abc", "spend": true}),
            json!({"impressions": -50, "clicks": -3, "conversions": -1, "spend": -9.5}),
            json!({"impressions": "1e400", "clicks": "NaN", "spend": "inf"}),
            json!({"impressions": [1], "clicks": {"n": 2}, "ctr": "x", "cpc": null}),
            json!({"impressions": 1e308, "clicks": 1e308, "conversions": 1e308, "spend": 1e-300}),
            json!({"ctr": -4, "cpc": -1, "conversion_rate": -2}),
        ];

        for input in inputs {
            let m = normalize(&payload(input.clone()), 100.0);
            for (name, value) in [
                ("impressions", m.impressions),
                ("clicks", m.clicks),
                ("conversions", m.conversions),
                ("spend", m.spend),
                ("ctr", m.ctr),
                ("conversion_rate", m.conversion_rate),
                ("cpc", m.cpc),
                ("revenue", m.revenue),
                ("engagement", m.engagement),
            ] {
                assert!(
                    value.is_finite() && value >= 0.0,
                    "{name} = {value} for {input}"
                );
            }
            assert!(m.roi.is_finite(), "roi = {} for {input}", m.roi);
        }
    }

    #[test]
    fn test_safe_number() {
        assert_eq!(safe_number(Some(&json!(12))), Some(12.0));
        assert_eq!(safe_number(Some(&json!(" 7.5 "))), Some(7.5));
        assert_eq!(safe_number(Some(&json!("seven"))), None);
        assert_eq!(safe_number(Some(&json!(null))), None);
        assert_eq!(safe_number(Some(&json!("NaN"))), None);
        assert_eq!(safe_number(None), None);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = "2024-05-01T10:00:00+00:00";
        for value in [
            json!("2024-05-01T10:00:00Z"),
            json!("2024-05-01T12:00:00+02:00"),
            json!("2024-05-01T10:00:00"),
            json!("2024-05-01 10:00:00.000"),
            json!(1714557600000i64),
            json!("1714557600000"),
        ] {
            let ts = parse_timestamp(&value).unwrap_or_else(|| panic!("failed on {value}"));
            assert_eq!(ts.to_rfc3339(), expected, "for {value}");
        }
        assert!(parse_timestamp(&json!("yesterday")).is_none());
        assert!(parse_timestamp(&json!(false)).is_none());
    }
}
