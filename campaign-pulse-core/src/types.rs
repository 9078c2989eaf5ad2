//! Core domain types for campaign-pulse
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Campaign** | An advertising campaign with budget, platforms and status |
//! | **Insight snapshot** | A point-in-time aggregate of impressions/clicks/conversions/spend |
//! | **Raw payload** | An insight snapshot or stream event exactly as the API sent it |
//! | **Normalized metrics** | The canonical record produced from a raw payload |
//! | **CTR** | Click-through rate, clicks/impressions*100 |
//! | **CPC** | Cost per click, spend/clicks |
//! | **ROI** | Return on investment, (revenue-spend)/spend*100 |
//!
//! Raw payloads are untyped on purpose: the API may omit fields, send nulls or
//! send strings where numbers belong. Only [`crate::normalize::normalize`] turns
//! them into [`NormalizedMetrics`]; nothing else reads numbers out of a raw payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

// ============================================
// Campaign
// ============================================

/// Opaque identifier of a campaign.
///
/// Scopes API calls and stream connections. Never changes for an open detail view.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CampaignId(String);

impl CampaignId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Percent-encoded form for use inside a URL path.
    pub fn url_segment(&self) -> String {
        urlencoding::encode(&self.0).into_owned()
    }
}

impl std::fmt::Display for CampaignId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CampaignId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for CampaignId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Lifecycle status of a campaign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Active,
    Paused,
    Completed,
    Draft,
    /// Any status string this client does not know about
    #[default]
    #[serde(other)]
    Unknown,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Active => "active",
            CampaignStatus::Paused => "paused",
            CampaignStatus::Completed => "completed",
            CampaignStatus::Draft => "draft",
            CampaignStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Static attributes of a campaign as returned by `GET /campaigns/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub brand_id: String,
    #[serde(default)]
    pub status: CampaignStatus,
    /// Total budget
    #[serde(default)]
    pub budget: f64,
    #[serde(default)]
    pub daily_budget: f64,
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub spend: Option<f64>,
    #[serde(default)]
    pub clicks: Option<f64>,
    #[serde(default)]
    pub impressions: Option<f64>,
    #[serde(default)]
    pub conversions: Option<f64>,
    #[serde(default)]
    pub ctr: Option<f64>,
    #[serde(default)]
    pub conversion_rate: Option<f64>,
    #[serde(default)]
    pub avg_cpc: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub target_audience: Option<String>,
    /// awareness, traffic, engagement, leads, sales, app_installs
    #[serde(default)]
    pub objective: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Campaign {
    /// Human-friendly name, falling back to the id.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            self.id.as_str()
        } else {
            &self.name
        }
    }
}

/// Aggregate insights across all campaigns (`GET /campaigns/insights`).
///
/// Fields the client does not model are kept in `extra` so the dashboard can
/// still show them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalInsights {
    #[serde(default)]
    pub total_campaigns: f64,
    #[serde(default)]
    pub active_campaigns: f64,
    #[serde(default)]
    pub paused_campaigns: f64,
    #[serde(default)]
    pub completed_campaigns: f64,
    #[serde(default)]
    pub total_impressions: f64,
    #[serde(default)]
    pub total_clicks: f64,
    #[serde(default)]
    pub total_conversions: f64,
    #[serde(default)]
    pub total_spend: f64,
    #[serde(default)]
    pub avg_ctr: f64,
    #[serde(default)]
    pub avg_cpc: f64,
    #[serde(default)]
    pub avg_conversion_rate: f64,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

// ============================================
// Metrics
// ============================================

/// An insight snapshot or stream event before normalization.
///
/// Every field is an optional JSON value; see [`crate::normalize`] for how each
/// is coerced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMetricsPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impressions: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clicks: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversions: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spend: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctr: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpc: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversion_rate: Option<Value>,
}

impl RawMetricsPayload {
    /// Decode a payload from JSON. Anything but an object is a parse error;
    /// serde would otherwise read an array positionally into the fields.
    pub fn from_value(value: Value) -> crate::error::Result<Self> {
        match value {
            Value::Object(_) => Ok(serde_json::from_value(value)?),
            other => Err(crate::error::Error::Parse(format!(
                "expected a metrics object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Decode the `data` of one stream event.
    pub fn from_json(data: &str) -> crate::error::Result<Self> {
        Self::from_value(serde_json::from_str(data)?)
    }

    /// Replace a missing or unparseable timestamp with `observed_at`.
    ///
    /// Payloads without a usable timestamp would otherwise all normalize to the
    /// epoch and be dropped as duplicates of each other.
    pub fn stamped_if_missing(mut self, observed_at: DateTime<Utc>) -> Self {
        let usable = self
            .timestamp
            .as_ref()
            .and_then(crate::normalize::parse_timestamp)
            .is_some();
        if !usable {
            self.timestamp = Some(Value::String(observed_at.to_rfc3339()));
        }
        self
    }
}

/// Name of a JSON value's type, for error messages.
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Canonical metrics record.
///
/// Built only by [`crate::normalize::normalize`]. Counters are finite and
/// non-negative; `revenue`, `roi` and `engagement` are always derived from
/// the counters of the same record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedMetrics {
    /// Event time; two records with the same timestamp are the same event
    pub timestamp: DateTime<Utc>,
    pub impressions: f64,
    pub clicks: f64,
    pub conversions: f64,
    pub spend: f64,
    /// Click-through rate in percent
    pub ctr: f64,
    /// Conversions per click in percent
    pub conversion_rate: f64,
    /// Cost per click
    pub cpc: f64,
    /// conversions * revenue per conversion
    pub revenue: f64,
    /// Return on spend in percent; the only field that may be negative
    pub roi: f64,
    /// clicks/impressions in percent
    pub engagement: f64,
    /// True when the record came from the live stream rather than a snapshot
    pub is_realtime: bool,
}

impl NormalizedMetrics {
    /// Mark this record as delivered by the live stream.
    pub fn into_realtime(mut self) -> Self {
        self.is_realtime = true;
        self
    }
}
