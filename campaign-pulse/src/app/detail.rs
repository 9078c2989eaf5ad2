use super::*;

use campaign_pulse_core::{LiveCampaignView, StreamSettings, TimeRange};
use std::sync::Arc;

/// State of the campaign detail view.
pub struct CampaignDetail {
    /// Campaign attributes, if the fetch succeeded
    pub campaign: Option<Campaign>,
    /// Live metrics and history
    pub live: LiveCampaignView,
    /// Window shown by the charts
    pub time_range: TimeRange,
    /// Last fetch error, shown until the next successful refresh
    pub error: Option<String>,
}

impl CampaignDetail {
    /// Total budget, when the campaign has one.
    pub fn budget(&self) -> Option<f64> {
        self.campaign
            .as_ref()
            .map(|c| c.budget)
            .filter(|budget| *budget > 0.0)
    }

    pub fn title(&self) -> String {
        match &self.campaign {
            Some(campaign) => campaign.display_name().to_string(),
            None => self.live.campaign_id().to_string(),
        }
    }
}

impl App {
    // ========== Campaign Detail Methods ==========

    /// Open the detail view for `id`, fetch its data and start streaming.
    pub fn open_campaign(&mut self, id: CampaignId) {
        // Stream tasks are spawned onto our runtime
        let enter = self.runtime.enter();

        match &mut self.detail {
            Some(detail) => {
                detail.live.switch_campaign(id);
                detail.campaign = None;
                detail.error = None;
            }
            None => {
                let live = LiveCampaignView::new(
                    id,
                    Arc::new(self.client.clone()),
                    StreamSettings::from(&self.config.stream),
                    &self.config.history,
                );
                self.detail = Some(CampaignDetail {
                    campaign: None,
                    live,
                    time_range: TimeRange::default(),
                    error: None,
                });
            }
        }
        drop(enter);

        self.view_mode = ViewMode::CampaignDetail;
        self.refresh_detail();

        if self.config.stream.enabled {
            let _enter = self.runtime.enter();
            if let Some(detail) = &mut self.detail {
                detail.live.start();
            }
        }
    }

    /// Refetch the campaign record and its insight snapshot.
    pub(super) fn refresh_detail(&mut self) {
        let Some(detail) = &mut self.detail else {
            return;
        };
        let id = detail.live.campaign_id().clone();

        match self.runtime.block_on(self.client.fetch_campaign(&id)) {
            Ok(campaign) => {
                detail.campaign = Some(campaign);
                detail.error = None;
            }
            Err(e) => {
                tracing::warn!(campaign_id = %id, error = %e, "Failed to fetch campaign");
                detail.error = Some(e.to_string());
            }
        }

        match self.runtime.block_on(self.client.fetch_insight_snapshot(&id)) {
            Ok(snapshot) => {
                detail.live.seed(&snapshot);
            }
            Err(e) => {
                tracing::warn!(campaign_id = %id, error = %e, "Failed to fetch insight snapshot");
                detail.error.get_or_insert_with(|| e.to_string());
            }
        }
    }

    /// Leave the detail view; the stream is closed and its history discarded.
    fn close_detail(&mut self) {
        if let Some(detail) = &mut self.detail {
            detail.live.reset();
            detail.campaign = None;
            detail.error = None;
        }
        self.view_mode = ViewMode::CampaignList;
        if self.campaigns.is_empty() {
            self.load_campaigns();
        }
    }

    /// Handle keyboard input in detail view.
    pub(super) fn handle_detail_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
            }
            KeyCode::Esc | KeyCode::Backspace => {
                self.close_detail();
            }
            KeyCode::Char('s') => {
                let _enter = self.runtime.enter();
                if let Some(detail) = &mut self.detail {
                    let enabled = !detail.live.is_streaming_enabled();
                    detail.live.toggle(enabled);
                }
            }
            KeyCode::Char('r') => {
                self.refresh_detail();
            }
            KeyCode::Char(c @ '1'..='3') => {
                let idx = (c as usize) - ('1' as usize);
                if let Some(detail) = &mut self.detail {
                    detail.time_range = TimeRange::ALL[idx];
                }
            }
            _ => {}
        }
    }
}
