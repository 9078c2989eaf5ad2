//! Application state for the TUI.

mod detail;

use campaign_pulse_core::{Campaign, CampaignClient, CampaignId, Config, GlobalInsights};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::widgets::TableState;
use tokio::runtime::Runtime;

pub use detail::CampaignDetail;

/// Current view mode
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum ViewMode {
    /// Campaign table with global insights (default)
    #[default]
    CampaignList,
    /// One campaign with live metrics
    CampaignDetail,
}

/// Main application state.
pub struct App {
    /// Campaign API client
    client: CampaignClient,
    /// Loaded configuration
    config: Config,
    /// Current view mode
    pub view_mode: ViewMode,
    /// Campaigns loaded for the list view
    pub campaigns: Vec<Campaign>,
    /// Table selection state
    pub table_state: TableState,
    /// Aggregate insights across all campaigns
    pub insights: Option<GlobalInsights>,
    /// Last error from loading the list view
    pub list_error: Option<String>,
    /// Open campaign (kept after Esc so reopening reuses its controller slot)
    pub detail: Option<CampaignDetail>,
    /// Whether the app should quit
    pub should_quit: bool,
    /// Runs HTTP calls and stream tasks; dropped last
    runtime: Runtime,
}

impl App {
    /// Create a new app instance.
    pub fn new(runtime: Runtime, client: CampaignClient, config: Config) -> Self {
        Self {
            client,
            config,
            view_mode: ViewMode::default(),
            campaigns: Vec::new(),
            table_state: TableState::default(),
            insights: None,
            list_error: None,
            detail: None,
            should_quit: false,
            runtime,
        }
    }

    /// API base URL shown in the header.
    pub fn base_url(&self) -> &str {
        self.client.base_url()
    }

    /// Load campaigns and global insights for the list view.
    pub fn load_campaigns(&mut self) {
        self.view_mode = ViewMode::CampaignList;

        match self.runtime.block_on(self.client.list_campaigns()) {
            Ok(campaigns) => {
                tracing::info!(count = campaigns.len(), "Loaded campaigns");
                self.campaigns = campaigns;
                self.list_error = None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load campaigns");
                self.list_error = Some(e.to_string());
            }
        }

        match self.runtime.block_on(self.client.fetch_global_insights()) {
            Ok(insights) => self.insights = Some(insights),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load global insights");
                self.insights = None;
            }
        }

        // Keep the selection in range after a reload
        if self.campaigns.is_empty() {
            self.table_state.select(None);
        } else {
            let selected = self
                .table_state
                .selected()
                .unwrap_or(0)
                .min(self.campaigns.len() - 1);
            self.table_state.select(Some(selected));
        }
    }

    /// Called once per frame.
    pub fn tick(&mut self) {
        if self.view_mode == ViewMode::CampaignDetail {
            if let Some(detail) = &mut self.detail {
                detail.live.drain();
            }
        }
    }

    /// Handle keyboard input.
    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        match self.view_mode {
            ViewMode::CampaignList => self.handle_list_key(key),
            ViewMode::CampaignDetail => self.handle_detail_key(key),
        }
    }

    /// Handle keyboard input in list view.
    fn handle_list_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Enter => {
                if let Some(campaign) = self.selected_campaign() {
                    let id = campaign.id.clone();
                    self.open_campaign(id);
                }
            }
            KeyCode::Char('r') => {
                self.load_campaigns();
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.select_next();
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.select_previous();
            }
            KeyCode::Home | KeyCode::Char('g') => {
                if !self.campaigns.is_empty() {
                    self.table_state.select(Some(0));
                }
            }
            KeyCode::End | KeyCode::Char('G') => {
                if !self.campaigns.is_empty() {
                    self.table_state.select(Some(self.campaigns.len() - 1));
                }
            }
            _ => {}
        }
    }

    fn selected_campaign(&self) -> Option<&Campaign> {
        self.table_state
            .selected()
            .and_then(|i| self.campaigns.get(i))
    }

    fn select_next(&mut self) {
        if self.campaigns.is_empty() {
            return;
        }
        let i = match self.table_state.selected() {
            Some(i) => (i + 1).min(self.campaigns.len() - 1),
            None => 0,
        };
        self.table_state.select(Some(i));
    }

    fn select_previous(&mut self) {
        if self.campaigns.is_empty() {
            return;
        }
        let i = self.table_state.selected().map_or(0, |i| i.saturating_sub(1));
        self.table_state.select(Some(i));
    }
}
