//! # campaign-pulse-core
//!
//! Core library for campaign-pulse - a live terminal dashboard for marketing
//! campaign metrics.
//!
//! This library provides:
//! - Domain types for campaigns and metrics payloads
//! - An HTTP client for the campaign API and its server-push stream
//! - Normalization of untyped payloads into canonical records
//! - A stream controller with duplicate suppression and fixed-delay reconnects
//! - Bounded history buffers and derived metrics (CTR, ROI, efficiency)
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! Data flows one way:
//! - **Raw:** JSON from `GET /campaigns/{id}/insights` or the SSE stream
//! - **Normalized:** [`NormalizedMetrics`], produced only by [`normalize()`]
//! - **Derived:** history windows and [`analytics::DerivedMetrics`], recomputed on demand
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use campaign_pulse_core::{CampaignClient, CampaignId, Config, LiveCampaignView, StreamSettings};
//!
//! # async fn run() -> campaign_pulse_core::Result<()> {
//! let config = Config::load()?;
//! let client = CampaignClient::new(&config.api)?;
//! let id = CampaignId::from("camp_001");
//!
//! let mut view = LiveCampaignView::new(
//!     id.clone(),
//!     Arc::new(client.clone()),
//!     StreamSettings::from(&config.stream),
//!     &config.history,
//! );
//! view.seed(&client.fetch_insight_snapshot(&id).await?);
//! view.start();
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use api::CampaignClient;
pub use config::Config;
pub use error::{Error, Result};
pub use history::{HistoryBuffer, TimeRange};
pub use live::LiveCampaignView;
pub use normalize::normalize;
pub use stream::{
    StreamConnectionState, StreamController, StreamSettings, StreamStatus, StreamTransport,
    Subscription,
};
pub use types::*;

// Public modules
pub mod analytics;
pub mod api;
pub mod config;
pub mod error;
pub mod format;
pub mod history;
pub mod live;
pub mod logging;
pub mod normalize;
pub mod stream;
pub mod types;
