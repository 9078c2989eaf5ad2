//! Live metrics stream controller
//!
//! One [`StreamController`] owns the server-push connection of one campaign.
//! It runs a single Tokio task that connects, parses and normalizes every
//! event, suppresses duplicates and publishes the result to the current
//! metrics slot and to every [`Subscription`]. When the connection fails or
//! closes it waits a fixed delay and reconnects, forever, until stopped.
//!
//! ```text
//!   Disconnected --start--> Connecting --open--> Streaming
//!        ^                      ^                    |
//!        |                      |                error/close
//!       stop                  delay                  v
//!        +------------------ ErrorBackoff <----------+
//! ```
//!
//! Every connection carries a generation number. `stop()` bumps the
//! generation under the shared lock, and the task re-checks it under the same
//! lock before publishing or changing status, so nothing from a superseded
//! connection is observable after `stop()` returns.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::StreamConfig;
use crate::error::Result;
use crate::normalize::{normalize, DEFAULT_REVENUE_PER_CONVERSION};
use crate::types::{CampaignId, NormalizedMetrics, RawMetricsPayload};

/// Event payloads (the `data` of each SSE event) in transport order.
pub type MessageStream = BoxStream<'static, Result<String>>;

/// Opens the server-push connection for a campaign.
///
/// Implemented over HTTP by [`crate::api::CampaignClient`]; tests use
/// in-memory fakes.
pub trait StreamTransport: Send + Sync + 'static {
    fn connect(&self, campaign_id: &CampaignId) -> BoxFuture<'static, Result<MessageStream>>;
}

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Streaming,
    /// Connection lost, waiting to reconnect
    ErrorBackoff,
}

impl StreamConnectionState {
    pub fn label(&self) -> &'static str {
        match self {
            StreamConnectionState::Disconnected => "disconnected",
            StreamConnectionState::Connecting => "connecting",
            StreamConnectionState::Streaming => "live",
            StreamConnectionState::ErrorBackoff => "reconnecting",
        }
    }
}

/// State plus the reason for the last connection failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamStatus {
    pub state: StreamConnectionState,
    /// Cleared on every successful open
    pub error: Option<String>,
}

impl StreamStatus {
    fn new(state: StreamConnectionState, error: Option<String>) -> Self {
        Self { state, error }
    }

    pub fn is_live(&self) -> bool {
        self.state == StreamConnectionState::Streaming
    }

    pub fn is_reconnecting(&self) -> bool {
        self.state == StreamConnectionState::ErrorBackoff
            || (self.state == StreamConnectionState::Connecting && self.error.is_some())
    }
}

/// Controller tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamSettings {
    /// Fixed wait between a lost connection and the next attempt
    pub reconnect_delay: Duration,
    pub revenue_per_conversion: f64,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(5),
            revenue_per_conversion: DEFAULT_REVENUE_PER_CONVERSION,
        }
    }
}

impl From<&StreamConfig> for StreamSettings {
    fn from(config: &StreamConfig) -> Self {
        Self {
            reconnect_delay: config.reconnect_delay(),
            revenue_per_conversion: config.revenue_per_conversion,
        }
    }
}

/// Receiving end of the published records.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<NormalizedMetrics>,
}

impl Subscription {
    /// Next published record, if one is waiting.
    pub fn try_next(&mut self) -> Option<NormalizedMetrics> {
        self.rx.try_recv().ok()
    }

    /// Wait for the next published record. `None` once the controller is gone.
    pub async fn recv(&mut self) -> Option<NormalizedMetrics> {
        self.rx.recv().await
    }

    /// Everything published since the last call, oldest first.
    pub fn drain(&mut self) -> Vec<NormalizedMetrics> {
        std::iter::from_fn(|| self.try_next()).collect()
    }
}

/// Published timestamps remembered for duplicate suppression.
const RECENT_TIMESTAMPS: usize = 256;

struct Inner {
    generation: u64,
    enabled: bool,
    /// Newest timestamp published or seeded
    last_timestamp: Option<DateTime<Utc>>,
    /// Bounded window of published timestamps, oldest first
    recent: VecDeque<DateTime<Utc>>,
    subscribers: Vec<mpsc::UnboundedSender<NormalizedMetrics>>,
}

impl Inner {
    fn new() -> Self {
        Self {
            generation: 0,
            enabled: false,
            last_timestamp: None,
            recent: VecDeque::with_capacity(RECENT_TIMESTAMPS),
            subscribers: Vec::new(),
        }
    }

    fn is_duplicate(&self, timestamp: DateTime<Utc>) -> bool {
        self.recent.contains(&timestamp)
    }

    fn remember(&mut self, timestamp: DateTime<Utc>) {
        if self.recent.len() == RECENT_TIMESTAMPS {
            self.recent.pop_front();
        }
        self.recent.push_back(timestamp);
        if self.last_timestamp.map_or(true, |last| timestamp > last) {
            self.last_timestamp = Some(timestamp);
        }
    }
}

enum Publish {
    Delivered,
    Duplicate,
    Superseded,
}

struct Shared {
    campaign_id: CampaignId,
    inner: Mutex<Inner>,
    status_tx: watch::Sender<StreamStatus>,
    current_tx: watch::Sender<Option<NormalizedMetrics>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the status if `generation` is still current.
    fn set_status(
        &self,
        generation: u64,
        state: StreamConnectionState,
        error: Option<String>,
    ) -> bool {
        let inner = self.lock();
        if inner.generation != generation {
            return false;
        }
        self.status_tx.send_replace(StreamStatus::new(state, error));
        true
    }

    /// Record a failure. Returns false when no reconnect should follow.
    fn enter_backoff(&self, generation: u64, reason: &str) -> bool {
        let inner = self.lock();
        if inner.generation != generation {
            return false;
        }
        if !inner.enabled {
            self.status_tx.send_replace(StreamStatus::default());
            return false;
        }
        self.status_tx.send_replace(StreamStatus::new(
            StreamConnectionState::ErrorBackoff,
            Some(reason.to_string()),
        ));
        true
    }

    fn publish(&self, generation: u64, metrics: NormalizedMetrics) -> Publish {
        let mut inner = self.lock();
        if inner.generation != generation {
            return Publish::Superseded;
        }

        // Keyed on exact timestamp equality against the recent window, so a
        // server replaying earlier events after a reconnect delivers nothing.
        // Two distinct events sharing a timestamp collapse into the first one.
        if inner.is_duplicate(metrics.timestamp) {
            return Publish::Duplicate;
        }
        if let Some(last) = inner.last_timestamp {
            if metrics.timestamp < last {
                warn!(
                    campaign_id = %self.campaign_id,
                    timestamp = %metrics.timestamp,
                    last = %last,
                    "Out-of-order stream event"
                );
            }
        }

        inner.remember(metrics.timestamp);
        inner
            .subscribers
            .retain(|subscriber| subscriber.send(metrics.clone()).is_ok());
        self.current_tx.send_replace(Some(metrics));
        Publish::Delivered
    }
}

/// Owns the live connection for one campaign.
pub struct StreamController {
    campaign_id: CampaignId,
    settings: StreamSettings,
    transport: Arc<dyn StreamTransport>,
    shared: Arc<Shared>,
    task: Option<JoinHandle<()>>,
}

impl StreamController {
    /// Create a stopped controller bound to `campaign_id`.
    pub fn new(
        campaign_id: CampaignId,
        transport: Arc<dyn StreamTransport>,
        settings: StreamSettings,
    ) -> Self {
        let (status_tx, _) = watch::channel(StreamStatus::default());
        let (current_tx, _) = watch::channel(None);
        let shared = Arc::new(Shared {
            campaign_id: campaign_id.clone(),
            inner: Mutex::new(Inner::new()),
            status_tx,
            current_tx,
        });

        Self {
            campaign_id,
            settings,
            transport,
            shared,
            task: None,
        }
    }

    pub fn campaign_id(&self) -> &CampaignId {
        &self.campaign_id
    }

    pub fn settings(&self) -> &StreamSettings {
        &self.settings
    }

    /// Open the connection. No-op while a connection task is running.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }

        let generation = {
            let mut inner = self.shared.lock();
            inner.generation += 1;
            inner.enabled = true;
            self.shared.status_tx.send_replace(StreamStatus::new(
                StreamConnectionState::Connecting,
                None,
            ));
            inner.generation
        };

        info!(campaign_id = %self.campaign_id, generation, "Starting metrics stream");
        self.task = Some(tokio::spawn(run_connection(
            Arc::clone(&self.shared),
            Arc::clone(&self.transport),
            self.settings.clone(),
            generation,
        )));
    }

    /// Close the connection and cancel any pending reconnect. Idempotent.
    pub fn stop(&mut self) {
        {
            let mut inner = self.shared.lock();
            inner.generation += 1;
            inner.enabled = false;
            self.shared.status_tx.send_replace(StreamStatus::default());
        }

        if let Some(task) = self.task.take() {
            task.abort();
            info!(campaign_id = %self.campaign_id, "Stopped metrics stream");
        }
    }

    /// Enable or disable streaming.
    pub fn toggle(&mut self, enabled: bool) {
        if enabled {
            self.start();
        } else {
            self.stop();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.lock().enabled
    }

    fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Current status value.
    pub fn state(&self) -> StreamStatus {
        self.shared.status_tx.borrow().clone()
    }

    /// Watch status changes.
    pub fn status(&self) -> watch::Receiver<StreamStatus> {
        self.shared.status_tx.subscribe()
    }

    /// Watch the most recent record.
    pub fn current(&self) -> watch::Receiver<Option<NormalizedMetrics>> {
        self.shared.current_tx.subscribe()
    }

    pub fn current_metrics(&self) -> Option<NormalizedMetrics> {
        self.shared.current_tx.borrow().clone()
    }

    /// Receive every record published from now on.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.shared.lock().subscribers.push(tx);
        Subscription { rx }
    }

    /// Initialise the current slot from an HTTP snapshot.
    ///
    /// Rejected (returns false) when the stream already published something at
    /// or after the snapshot's timestamp. A stream event repeating the
    /// snapshot's timestamp is suppressed as a duplicate.
    pub fn seed(&self, metrics: NormalizedMetrics) -> bool {
        let mut inner = self.shared.lock();
        if inner
            .last_timestamp
            .is_some_and(|last| metrics.timestamp <= last)
        {
            return false;
        }
        inner.remember(metrics.timestamp);
        self.shared.current_tx.send_replace(Some(metrics));
        true
    }
}

impl Drop for StreamController {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for StreamController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamController")
            .field("campaign_id", &self.campaign_id)
            .field("settings", &self.settings)
            .field("status", &self.state())
            .finish_non_exhaustive()
    }
}

async fn run_connection(
    shared: Arc<Shared>,
    transport: Arc<dyn StreamTransport>,
    settings: StreamSettings,
    generation: u64,
) {
    let campaign_id = shared.campaign_id.clone();

    loop {
        let reason = match transport.connect(&campaign_id).await {
            Ok(mut messages) => {
                if !shared.set_status(generation, StreamConnectionState::Streaming, None) {
                    return;
                }
                info!(campaign_id = %campaign_id, "Metrics stream connected");

                loop {
                    match messages.next().await {
                        Some(Ok(data)) => {
                            if !handle_message(&shared, generation, &data, &settings) {
                                return;
                            }
                        }
                        Some(Err(e)) => break e.to_string(),
                        None => break "stream closed by server".to_string(),
                    }
                }
            }
            Err(e) => e.to_string(),
        };

        if !shared.enter_backoff(generation, &reason) {
            return;
        }
        warn!(
            campaign_id = %campaign_id,
            error = %reason,
            delay_secs = settings.reconnect_delay.as_secs_f64(),
            "Metrics stream lost, reconnecting"
        );

        tokio::time::sleep(settings.reconnect_delay).await;

        if !shared.set_status(generation, StreamConnectionState::Connecting, Some(reason)) {
            return;
        }
    }
}

/// Parse, normalize and publish one event. Returns false once superseded.
fn handle_message(shared: &Shared, generation: u64, data: &str, settings: &StreamSettings) -> bool {
    let raw = match RawMetricsPayload::from_json(data) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(
                campaign_id = %shared.campaign_id,
                error = %e,
                "Dropping malformed stream event"
            );
            return true;
        }
    };

    let metrics = normalize(
        &raw.stamped_if_missing(Utc::now()),
        settings.revenue_per_conversion,
    )
    .into_realtime();

    match shared.publish(generation, metrics) {
        Publish::Delivered => true,
        Publish::Duplicate => {
            debug!(campaign_id = %shared.campaign_id, "Dropping duplicate stream event");
            true
        }
        Publish::Superseded => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use futures::channel::mpsc::{unbounded, UnboundedSender};
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    type EventSender = UnboundedSender<Result<String>>;

    enum Step {
        Fail(&'static str),
        Open(futures::channel::mpsc::UnboundedReceiver<Result<String>>),
    }

    /// Replays scripted connection outcomes; stays open forever once the
    /// script runs out.
    #[derive(Default)]
    struct ScriptedTransport {
        attempts: AtomicUsize,
        script: Mutex<VecDeque<Step>>,
    }

    impl ScriptedTransport {
        fn open(&self) -> EventSender {
            let (tx, rx) = unbounded();
            self.script.lock().unwrap().push_back(Step::Open(rx));
            tx
        }

        fn fail(&self, reason: &'static str) {
            self.script.lock().unwrap().push_back(Step::Fail(reason));
        }

        fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    impl StreamTransport for ScriptedTransport {
        fn connect(&self, _campaign_id: &CampaignId) -> BoxFuture<'static, Result<MessageStream>> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let step = self.script.lock().unwrap().pop_front();
            Box::pin(async move {
                match step {
                    Some(Step::Fail(reason)) => Err(Error::Network(reason.to_string())),
                    Some(Step::Open(rx)) => Ok(rx.boxed()),
                    None => Ok(futures::stream::pending().boxed()),
                }
            })
        }
    }

    fn controller(transport: &Arc<ScriptedTransport>) -> StreamController {
        StreamController::new(
            CampaignId::from("c1"),
            Arc::clone(transport) as Arc<dyn StreamTransport>,
            StreamSettings::default(),
        )
    }

    fn event(timestamp: &str, clicks: u64) -> Result<String> {
        Ok(json!({
            "timestamp": timestamp,
            "impressions": 1200,
            "clicks": clicks,
            "conversions": 2,
            "spend": 60,
        })
        .to_string())
    }

    async fn wait_for_state(
        status: &mut watch::Receiver<StreamStatus>,
        state: StreamConnectionState,
    ) -> StreamStatus {
        status
            .wait_for(|s| s.state == state)
            .await
            .expect("controller dropped")
            .clone()
    }

    const T1: &str = "2024-05-01T10:00:05Z";
    const T2: &str = "2024-05-01T10:00:10Z";
    const T3: &str = "2024-05-01T10:00:15Z";

    #[tokio::test(start_paused = true)]
    async fn test_stream_event_is_published() {
        let transport = Arc::new(ScriptedTransport::default());
        let tx = transport.open();
        let mut controller = controller(&transport);
        let mut status = controller.status();
        let mut sub = controller.subscribe();

        assert_eq!(controller.state().state, StreamConnectionState::Disconnected);
        controller.start();
        let live = wait_for_state(&mut status, StreamConnectionState::Streaming).await;
        assert!(live.error.is_none());

        tx.unbounded_send(event(T1, 30)).unwrap();
        let m = sub.recv().await.unwrap();
        assert_eq!(m.revenue, 200.0);
        assert!((m.roi - 233.33).abs() < 0.01);
        assert!(m.is_realtime);
        assert_eq!(controller.current_metrics(), Some(m));
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_timestamps_are_suppressed() {
        let transport = Arc::new(ScriptedTransport::default());
        let tx = transport.open();
        let mut controller = controller(&transport);
        let mut sub = controller.subscribe();
        let mut other = controller.subscribe();
        controller.start();

        tx.unbounded_send(event(T1, 30)).unwrap();
        tx.unbounded_send(event(T1, 99)).unwrap();
        tx.unbounded_send(event(T2, 40)).unwrap();

        let first = sub.recv().await.unwrap();
        let second = sub.recv().await.unwrap();
        assert_eq!(first.clicks, 30.0);
        assert_eq!(second.clicks, 40.0);
        assert!(sub.try_next().is_none());

        assert_eq!(other.drain(), vec![first, second.clone()]);
        assert_eq!(controller.current_metrics(), Some(second));
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_event_is_dropped() {
        let transport = Arc::new(ScriptedTransport::default());
        let tx = transport.open();
        let mut controller = controller(&transport);
        let mut sub = controller.subscribe();
        controller.start();

        tx.unbounded_send(Ok("{not json".to_string())).unwrap();
        tx.unbounded_send(Ok("42".to_string())).unwrap();
        tx.unbounded_send(event(T1, 30)).unwrap();

        assert_eq!(sub.recv().await.unwrap().clicks, 30.0);
        assert_eq!(controller.state().state, StreamConnectionState::Streaming);
    }

    #[tokio::test(start_paused = true)]
    async fn test_array_event_is_dropped() {
        let transport = Arc::new(ScriptedTransport::default());
        let tx = transport.open();
        let mut controller = controller(&transport);
        let mut sub = controller.subscribe();
        controller.start();

        tx.unbounded_send(Ok("[1,2,3]".to_string())).unwrap();
        tx.unbounded_send(Ok(json!([T1, 1200, 30]).to_string())).unwrap();
        tx.unbounded_send(event(T2, 40)).unwrap();

        let m = sub.recv().await.unwrap();
        assert_eq!(m.clicks, 40.0);
        assert_eq!(m.timestamp.to_rfc3339(), "2024-05-01T10:00:10+00:00");
        assert!(sub.try_next().is_none());
        assert_eq!(controller.current_metrics(), Some(m));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_timestamp_is_stamped_on_receipt() {
        let transport = Arc::new(ScriptedTransport::default());
        let tx = transport.open();
        let mut controller = controller(&transport);
        let mut sub = controller.subscribe();
        controller.start();

        let before = Utc::now();
        tx.unbounded_send(Ok(json!({"clicks": 1}).to_string())).unwrap();
        let m = sub.recv().await.unwrap();
        assert!(m.timestamp >= before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnects_once_after_delay_without_replaying() {
        let transport = Arc::new(ScriptedTransport::default());
        let first = transport.open();
        let second = transport.open();
        let mut controller = controller(&transport);
        let mut status = controller.status();
        let mut sub = controller.subscribe();
        controller.start();

        first.unbounded_send(event(T1, 30)).unwrap();
        assert_eq!(sub.recv().await.unwrap().clicks, 30.0);
        drop(first);

        let backoff = wait_for_state(&mut status, StreamConnectionState::ErrorBackoff).await;
        let backoff_at = Instant::now();
        assert!(backoff.error.is_some());
        assert!(backoff.is_reconnecting());
        assert_eq!(transport.attempts(), 1);

        tokio::time::sleep(Duration::from_millis(4900)).await;
        assert_eq!(transport.attempts(), 1);

        let live = wait_for_state(&mut status, StreamConnectionState::Streaming).await;
        assert!(live.error.is_none());
        assert_eq!(transport.attempts(), 2);
        assert!(backoff_at.elapsed() >= Duration::from_secs(5));

        second.unbounded_send(event(T1, 30)).unwrap();
        second.unbounded_send(event(T2, 40)).unwrap();
        assert_eq!(sub.recv().await.unwrap().clicks, 40.0);
        assert!(sub.try_next().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_replaying_earlier_events_delivers_only_new_ones() {
        let transport = Arc::new(ScriptedTransport::default());
        let first = transport.open();
        let second = transport.open();
        let mut controller = controller(&transport);
        let mut status = controller.status();
        let mut sub = controller.subscribe();
        controller.start();

        first.unbounded_send(event(T1, 30)).unwrap();
        first.unbounded_send(event(T2, 40)).unwrap();
        assert_eq!(sub.recv().await.unwrap().clicks, 30.0);
        assert_eq!(sub.recv().await.unwrap().clicks, 40.0);
        drop(first);

        wait_for_state(&mut status, StreamConnectionState::ErrorBackoff).await;
        wait_for_state(&mut status, StreamConnectionState::Streaming).await;

        second.unbounded_send(event(T1, 30)).unwrap();
        second.unbounded_send(event(T2, 40)).unwrap();
        second.unbounded_send(event(T3, 50)).unwrap();
        assert_eq!(sub.recv().await.unwrap().clicks, 50.0);
        assert!(sub.try_next().is_none());
        assert_eq!(controller.current_metrics().unwrap().clicks, 50.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unseen_older_event_is_still_published() {
        let transport = Arc::new(ScriptedTransport::default());
        let tx = transport.open();
        let mut controller = controller(&transport);
        let mut sub = controller.subscribe();
        controller.start();

        tx.unbounded_send(event(T2, 40)).unwrap();
        tx.unbounded_send(event(T1, 30)).unwrap();
        tx.unbounded_send(event(T2, 99)).unwrap();

        assert_eq!(sub.recv().await.unwrap().clicks, 40.0);
        assert_eq!(sub.recv().await.unwrap().clicks, 30.0);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(sub.try_next().is_none());
    }

    #[test]
    fn test_recent_timestamp_window_is_bounded() {
        let base = DateTime::parse_from_rfc3339(T1).unwrap().with_timezone(&Utc);
        let mut inner = Inner::new();
        for i in 0..=RECENT_TIMESTAMPS as i64 {
            inner.remember(base + chrono::Duration::seconds(i));
        }
        assert_eq!(inner.recent.len(), RECENT_TIMESTAMPS);
        assert!(!inner.is_duplicate(base));
        assert!(inner.is_duplicate(base + chrono::Duration::seconds(1)));
        assert_eq!(
            inner.last_timestamp,
            Some(base + chrono::Duration::seconds(RECENT_TIMESTAMPS as i64))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_failure_enters_backoff() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.fail("connection refused");
        let mut controller = controller(&transport);
        let mut status = controller.status();
        controller.start();

        let backoff = wait_for_state(&mut status, StreamConnectionState::ErrorBackoff).await;
        assert!(backoff.error.unwrap().contains("connection refused"));

        wait_for_state(&mut status, StreamConnectionState::Streaming).await;
        assert_eq!(transport.attempts(), 2);
        assert!(controller.state().error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_pending_reconnect() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.fail("refused");
        let mut controller = controller(&transport);
        let mut status = controller.status();
        controller.start();

        wait_for_state(&mut status, StreamConnectionState::ErrorBackoff).await;
        controller.stop();
        assert_eq!(controller.state(), StreamStatus::default());
        assert!(!controller.is_enabled());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(transport.attempts(), 1);
        assert_eq!(controller.state().state, StreamConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent_and_blocks_delivery() {
        let transport = Arc::new(ScriptedTransport::default());
        let tx = transport.open();
        let mut controller = controller(&transport);
        let mut status = controller.status();
        let mut sub = controller.subscribe();
        controller.start();
        wait_for_state(&mut status, StreamConnectionState::Streaming).await;

        controller.stop();
        controller.stop();
        let _ = tx.unbounded_send(event(T1, 30));
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(sub.try_next().is_none());
        assert!(controller.current_metrics().is_none());
        assert_eq!(controller.state().state, StreamConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle() {
        let transport = Arc::new(ScriptedTransport::default());
        let mut controller = controller(&transport);
        let mut status = controller.status();

        controller.toggle(false);
        assert_eq!(transport.attempts(), 0);

        controller.toggle(true);
        wait_for_state(&mut status, StreamConnectionState::Streaming).await;
        controller.toggle(true);
        tokio::task::yield_now().await;
        assert_eq!(transport.attempts(), 1);
        assert!(controller.is_enabled());

        controller.toggle(false);
        assert_eq!(controller.state().state, StreamConnectionState::Disconnected);

        controller.toggle(true);
        wait_for_state(&mut status, StreamConnectionState::Streaming).await;
        assert_eq!(transport.attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_reconnecting() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.fail("refused");
        let mut controller = controller(&transport);
        let mut status = controller.status();
        controller.start();
        wait_for_state(&mut status, StreamConnectionState::ErrorBackoff).await;

        drop(controller);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(transport.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_seed_suppresses_snapshot_replay() {
        let transport = Arc::new(ScriptedTransport::default());
        let tx = transport.open();
        let mut controller = controller(&transport);
        let mut sub = controller.subscribe();

        let snapshot: RawMetricsPayload =
            serde_json::from_value(json!({"timestamp": T1, "impressions": 1000})).unwrap();
        assert!(controller.seed(normalize(&snapshot, 100.0)));
        assert_eq!(controller.current_metrics().unwrap().impressions, 1000.0);
        assert!(!controller.seed(normalize(&snapshot, 100.0)));

        controller.start();
        tx.unbounded_send(event(T1, 30)).unwrap();
        tx.unbounded_send(event(T2, 40)).unwrap();
        assert_eq!(sub.recv().await.unwrap().clicks, 40.0);
        assert!(sub.try_next().is_none());
    }
}
