//! Live campaign view model
//!
//! Glues one [`StreamController`] to the history buffers a detail view draws
//! from. The HTTP snapshot seeds it, the stream keeps it current, and the UI
//! calls [`LiveCampaignView::drain`] once per frame to pull new records in.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::analytics::{DerivedMetrics, WindowSummary};
use crate::config::HistoryConfig;
use crate::history::{HistoryBuffer, TimeRange};
use crate::normalize::normalize;
use crate::stream::{StreamController, StreamSettings, StreamStatus, StreamTransport, Subscription};
use crate::types::{CampaignId, NormalizedMetrics, RawMetricsPayload};

/// Current metrics plus rolling history for one campaign.
pub struct LiveCampaignView {
    transport: Arc<dyn StreamTransport>,
    settings: StreamSettings,
    controller: StreamController,
    subscription: Subscription,
    /// Feeds the 7 and 30 point charts
    short_history: HistoryBuffer,
    /// Feeds the 90 point charts
    long_history: HistoryBuffer,
    last_updated: Option<DateTime<Utc>>,
}

impl LiveCampaignView {
    /// Create a stopped view for `campaign_id`.
    pub fn new(
        campaign_id: CampaignId,
        transport: Arc<dyn StreamTransport>,
        settings: StreamSettings,
        history: &HistoryConfig,
    ) -> Self {
        let controller = StreamController::new(campaign_id, Arc::clone(&transport), settings.clone());
        let subscription = controller.subscribe();
        Self {
            transport,
            settings,
            controller,
            subscription,
            short_history: HistoryBuffer::new(history.short_window),
            long_history: HistoryBuffer::new(history.long_window),
            last_updated: None,
        }
    }

    pub fn campaign_id(&self) -> &CampaignId {
        self.controller.campaign_id()
    }

    /// Point the view at another campaign.
    ///
    /// The old controller is stopped before the new one exists, and history
    /// from the old campaign is discarded. The new controller starts only if
    /// the old one was enabled.
    pub fn switch_campaign(&mut self, campaign_id: CampaignId) {
        if &campaign_id == self.campaign_id() {
            return;
        }
        let was_enabled = self.controller.is_enabled();

        tracing::info!(from = %self.campaign_id(), to = %campaign_id, "Switching campaign");
        self.remount(campaign_id);

        if was_enabled {
            self.controller.start();
        }
    }

    /// Close the view: stop streaming and discard history, current metrics
    /// and duplicate-suppression state. The view stays bound to its campaign
    /// and can be seeded and started again.
    pub fn reset(&mut self) {
        tracing::debug!(campaign_id = %self.campaign_id(), "Resetting live view");
        let campaign_id = self.campaign_id().clone();
        self.remount(campaign_id);
    }

    /// Replace the controller with a stopped one for `campaign_id` and clear history.
    fn remount(&mut self, campaign_id: CampaignId) {
        self.controller.stop();
        self.controller = StreamController::new(
            campaign_id,
            Arc::clone(&self.transport),
            self.settings.clone(),
        );
        self.subscription = self.controller.subscribe();
        self.short_history.clear();
        self.long_history.clear();
        self.last_updated = None;
    }

    /// Apply an HTTP insight snapshot.
    ///
    /// A snapshot older than what the stream already delivered is ignored.
    pub fn seed(&mut self, raw: &RawMetricsPayload) -> NormalizedMetrics {
        let now = Utc::now();
        let metrics = normalize(
            &raw.clone().stamped_if_missing(now),
            self.settings.revenue_per_conversion,
        );
        if self.controller.seed(metrics.clone()) {
            self.push(metrics.clone());
            self.last_updated = Some(now);
        } else {
            tracing::debug!(campaign_id = %self.campaign_id(), "Snapshot older than stream, ignored");
        }
        metrics
    }

    /// Move every record published since the last call into history.
    /// Returns how many arrived.
    pub fn drain(&mut self) -> usize {
        let records = self.subscription.drain();
        let count = records.len();
        for record in records {
            self.push(record);
        }
        if count > 0 {
            self.last_updated = Some(Utc::now());
        }
        count
    }

    fn push(&mut self, record: NormalizedMetrics) {
        self.long_history.append(record.clone());
        self.short_history.append(record);
    }

    pub fn start(&mut self) {
        self.controller.start();
    }

    pub fn stop(&mut self) {
        self.controller.stop();
    }

    pub fn toggle(&mut self, enabled: bool) {
        self.controller.toggle(enabled);
    }

    pub fn is_streaming_enabled(&self) -> bool {
        self.controller.is_enabled()
    }

    pub fn status(&self) -> StreamStatus {
        self.controller.state()
    }

    /// Most recent record from either the snapshot or the stream.
    pub fn current(&self) -> Option<NormalizedMetrics> {
        self.controller.current_metrics()
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    fn buffer_for(&self, range: TimeRange) -> &HistoryBuffer {
        if range.points() <= self.short_history.capacity() {
            &self.short_history
        } else {
            &self.long_history
        }
    }

    /// Records covered by `range`, oldest first.
    pub fn history(&self, range: TimeRange) -> Vec<NormalizedMetrics> {
        self.buffer_for(range).recent(range.points())
    }

    /// One field over `range`, oldest first.
    pub fn series(&self, range: TimeRange, field: fn(&NormalizedMetrics) -> f64) -> Vec<f64> {
        self.buffer_for(range).series(range.points(), field)
    }

    pub fn summary(&self, range: TimeRange) -> WindowSummary {
        WindowSummary::from_records(&self.history(range))
    }

    /// Derived metrics for the newest record against the one before it.
    pub fn derived(&self, total_budget: Option<f64>) -> Option<DerivedMetrics> {
        let rpc = self.settings.revenue_per_conversion;
        match self.short_history.latest() {
            Some(latest) => Some(DerivedMetrics::compute(
                latest,
                self.short_history.previous(),
                total_budget,
                rpc,
            )),
            None => self
                .current()
                .map(|current| DerivedMetrics::compute(&current, None, total_budget, rpc)),
        }
    }
}

impl std::fmt::Debug for LiveCampaignView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveCampaignView")
            .field("controller", &self.controller)
            .field("short_history", &self.short_history.len())
            .field("long_history", &self.long_history.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::stream::{MessageStream, StreamConnectionState};
    use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
    use futures::future::BoxFuture;
    use futures::StreamExt;
    use serde_json::json;
    use std::sync::Mutex;

    /// Hands out one pre-opened channel per campaign id.
    #[derive(Default)]
    struct ChannelTransport {
        streams: Mutex<Vec<(CampaignId, UnboundedReceiver<Result<String>>)>>,
    }

    impl ChannelTransport {
        fn open(&self, id: &str) -> UnboundedSender<Result<String>> {
            let (tx, rx) = unbounded();
            self.streams.lock().unwrap().push((CampaignId::from(id), rx));
            tx
        }
    }

    impl StreamTransport for ChannelTransport {
        fn connect(&self, campaign_id: &CampaignId) -> BoxFuture<'static, Result<MessageStream>> {
            let mut streams = self.streams.lock().unwrap();
            let stream = match streams.iter().position(|(id, _)| id == campaign_id) {
                Some(i) => streams.remove(i).1.boxed(),
                None => futures::stream::pending().boxed(),
            };
            Box::pin(async move { Ok(stream) })
        }
    }

    fn view(transport: &Arc<ChannelTransport>) -> LiveCampaignView {
        LiveCampaignView::new(
            CampaignId::from("c1"),
            Arc::clone(transport) as Arc<dyn StreamTransport>,
            StreamSettings::default(),
            &HistoryConfig::default(),
        )
    }

    fn event(second: u32, clicks: u64) -> Result<String> {
        Ok(json!({
            "timestamp": format!("2024-05-01T10:{:02}:{:02}Z", second / 60, second % 60),
            "impressions": 1000 + clicks * 10,
            "clicks": clicks,
            "conversions": 1,
            "spend": 40,
        })
        .to_string())
    }

    async fn wait_until_live(view: &LiveCampaignView) {
        let mut status = view.controller.status();
        status
            .wait_for(|s| s.state == StreamConnectionState::Streaming)
            .await
            .expect("controller dropped");
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_then_stream_fill_history() {
        let transport = Arc::new(ChannelTransport::default());
        let tx = transport.open("c1");
        let mut view = view(&transport);

        let snapshot: RawMetricsPayload = serde_json::from_value(json!({
            "timestamp": "2024-05-01T10:00:00Z",
            "impressions": 1000,
            "clicks": 20,
            "spend": 50,
        }))
        .unwrap();
        let seeded = view.seed(&snapshot);
        assert!(!seeded.is_realtime);
        assert_eq!(view.history(TimeRange::Week).len(), 1);
        assert_eq!(view.current(), Some(seeded));

        view.start();
        wait_until_live(&view).await;
        // same timestamp as the snapshot
        tx.unbounded_send(event(0, 99)).unwrap();
        tx.unbounded_send(event(5, 30)).unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        assert_eq!(view.drain(), 1);
        let history = view.history(TimeRange::Month);
        assert_eq!(history.len(), 2);
        assert!(history[1].is_realtime);
        assert_eq!(history[1].clicks, 30.0);
        assert!(view.last_updated().is_some());

        let derived = view.derived(Some(100.0)).unwrap();
        assert_eq!(derived.budget_utilization, 40.0);
        assert_eq!(derived.clicks_trend.percent, 50.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_time_ranges_pick_windows() {
        let transport = Arc::new(ChannelTransport::default());
        let tx = transport.open("c1");
        let mut view = view(&transport);
        view.start();
        wait_until_live(&view).await;

        for i in 1..=100 {
            tx.unbounded_send(event(i, i as u64)).unwrap();
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(view.drain(), 100);

        assert_eq!(view.history(TimeRange::Week).len(), 7);
        assert_eq!(view.history(TimeRange::Month).len(), 30);
        assert_eq!(view.history(TimeRange::Quarter).len(), 90);
        assert_eq!(
            view.series(TimeRange::Week, |m| m.clicks),
            (94..=100u32).map(f64::from).collect::<Vec<_>>()
        );
        assert_eq!(view.summary(TimeRange::Quarter).points, 90);
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_campaign_resets_state() {
        let transport = Arc::new(ChannelTransport::default());
        let tx = transport.open("c1");
        let tx2 = transport.open("c2");
        let mut view = view(&transport);
        view.start();
        wait_until_live(&view).await;

        tx.unbounded_send(event(1, 10)).unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(view.drain(), 1);

        view.switch_campaign(CampaignId::from("c2"));
        assert_eq!(view.campaign_id().as_str(), "c2");
        assert!(view.history(TimeRange::Quarter).is_empty());
        assert!(view.current().is_none());
        assert!(view.is_streaming_enabled());
        wait_until_live(&view).await;

        // late events from the old campaign never arrive
        let _ = tx.unbounded_send(event(2, 11));
        tx2.unbounded_send(event(3, 12)).unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(view.drain(), 1);
        assert_eq!(view.current().unwrap().clicks, 12.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_discards_history_before_reopening() {
        let transport = Arc::new(ChannelTransport::default());
        let tx = transport.open("c1");
        let mut view = view(&transport);

        let snapshot: RawMetricsPayload = serde_json::from_value(json!({
            "timestamp": "2024-05-01T10:00:00Z",
            "impressions": 1000,
            "clicks": 20,
        }))
        .unwrap();
        view.seed(&snapshot);
        view.start();
        wait_until_live(&view).await;
        tx.unbounded_send(event(5, 30)).unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(view.drain(), 1);
        assert_eq!(view.history(TimeRange::Week).len(), 2);

        view.reset();
        assert_eq!(view.campaign_id().as_str(), "c1");
        assert!(!view.is_streaming_enabled());
        assert_eq!(view.status().state, StreamConnectionState::Disconnected);
        assert!(view.history(TimeRange::Quarter).is_empty());
        assert!(view.current().is_none());
        assert!(view.last_updated().is_none());

        // reopening the same campaign: the old snapshot is accepted again
        view.switch_campaign(CampaignId::from("c1"));
        view.seed(&snapshot);
        assert_eq!(view.history(TimeRange::Week).len(), 1);
        assert_eq!(view.current().unwrap().clicks, 20.0);

        let tx = transport.open("c1");
        view.start();
        wait_until_live(&view).await;
        tx.unbounded_send(event(5, 30)).unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(view.drain(), 1);
        assert_eq!(view.history(TimeRange::Week).len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_derived_without_history() {
        let transport = Arc::new(ChannelTransport::default());
        let mut view = view(&transport);
        assert!(view.derived(None).is_none());
        assert_eq!(view.status().state, StreamConnectionState::Disconnected);

        view.toggle(true);
        assert!(view.is_streaming_enabled());
        view.toggle(false);
        assert!(!view.is_streaming_enabled());
    }
}
