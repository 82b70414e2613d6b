// ── Segment status poller ──
//
// Fetches the device list of the selected segment on a fixed interval and
// on demand, and publishes the result through watch channels. Every
// request is numbered; a response older than the newest request issued is
// dropped so it cannot overwrite fresher data. A failed refresh schedules
// one retry, and scheduling a new retry cancels the previous one.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Local};
use ipmon_api::{DeviceRecord, IpmonClient};
use serde::Serialize;
use strum::Display;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{DEFAULT_POLL_INTERVAL, DEFAULT_RETRY_DELAY, DEFAULT_SEGMENT, MonitorConfig};
use crate::error::CoreError;
use crate::table::StatusGrid;

/// Text shown until the first successful refresh.
pub const PLACEHOLDER: &str = "Loading device status...";

/// Whether a refresh is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PollState {
    #[default]
    Idle,
    Refreshing,
}

/// Result of one successful refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub segment: String,
    pub records: Vec<DeviceRecord>,
    pub grid: StatusGrid,
    pub fetched_at: DateTime<Local>,
    /// Sequence number of the request that produced this snapshot.
    pub seq: u64,
}

/// What the status table currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableView {
    /// Preliminary message; no data has arrived yet.
    Placeholder(String),
    Loaded(Arc<StatusSnapshot>),
}

impl TableView {
    pub fn snapshot(&self) -> Option<&StatusSnapshot> {
        match self {
            Self::Placeholder(_) => None,
            Self::Loaded(snapshot) => Some(snapshot),
        }
    }
}

/// How a single [`StatusPoller::refresh`] call ended.
#[derive(Debug)]
pub enum RefreshOutcome {
    /// The table was replaced.
    Applied(Arc<StatusSnapshot>),
    /// A newer request was issued while this one was in flight; its
    /// response was dropped.
    Stale { seq: u64 },
    /// The request failed and a retry was scheduled.
    Failed {
        error: CoreError,
        retry_in: Duration,
    },
    /// The poller was shut down before the request finished.
    Cancelled,
}

impl RefreshOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

/// Pacing of the poller.
#[derive(Debug, Clone)]
pub struct PollerSettings {
    pub poll_interval: Duration,
    pub retry_delay: Duration,
    pub default_segment: String,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            retry_delay: DEFAULT_RETRY_DELAY,
            default_segment: DEFAULT_SEGMENT.into(),
        }
    }
}

impl From<&MonitorConfig> for PollerSettings {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            poll_interval: config.poll_interval,
            retry_delay: config.retry_delay,
            default_segment: config.default_segment.clone(),
        }
    }
}

struct PendingRetry {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Periodic segment status refresher. Cheaply cloneable; clones share
/// state.
#[derive(Clone)]
pub struct StatusPoller {
    inner: Arc<Inner>,
}

struct Inner {
    client: IpmonClient,
    settings: PollerSettings,
    segment: watch::Sender<String>,
    view: watch::Sender<TableView>,
    state: watch::Sender<PollState>,
    in_flight: AtomicUsize,
    /// Highest sequence number handed out.
    issued: AtomicU64,
    retry: Mutex<Option<PendingRetry>>,
    cancel: CancellationToken,
    task_handles: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
}

/// Keeps `in_flight` and the published state in step, even when a
/// refresh future is dropped mid-request.
struct InFlight<'a> {
    inner: &'a Inner,
}

impl<'a> InFlight<'a> {
    fn enter(inner: &'a Inner) -> Self {
        if inner.in_flight.fetch_add(1, Ordering::SeqCst) == 0 {
            inner.state.send_replace(PollState::Refreshing);
        }
        Self { inner }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.inner.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.inner.state.send_replace(PollState::Idle);
        }
    }
}

impl StatusPoller {
    pub fn new(client: IpmonClient, settings: PollerSettings) -> Self {
        let (segment, _) = watch::channel(settings.default_segment.clone());
        let (view, _) = watch::channel(TableView::Placeholder(PLACEHOLDER.into()));
        let (state, _) = watch::channel(PollState::Idle);
        Self {
            inner: Arc::new(Inner {
                client,
                settings,
                segment,
                view,
                state,
                in_flight: AtomicUsize::new(0),
                issued: AtomicU64::new(0),
                retry: Mutex::new(None),
                cancel: CancellationToken::new(),
                task_handles: tokio::sync::Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Result<Self, CoreError> {
        Ok(Self::new(config.client()?, PollerSettings::from(config)))
    }

    pub fn settings(&self) -> &PollerSettings {
        &self.inner.settings
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe_view(&self) -> watch::Receiver<TableView> {
        self.inner.view.subscribe()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<PollState> {
        self.inner.state.subscribe()
    }

    pub fn subscribe_segment(&self) -> watch::Receiver<String> {
        self.inner.segment.subscribe()
    }

    pub fn view(&self) -> TableView {
        self.inner.view.borrow().clone()
    }

    pub fn state(&self) -> PollState {
        *self.inner.state.borrow()
    }

    pub fn current_segment(&self) -> String {
        self.inner.segment.borrow().clone()
    }

    /// Change the selected segment. The next timer tick uses it.
    pub fn select_segment(&self, segment: impl Into<String>) {
        let segment = segment.into();
        debug!(%segment, "segment selected");
        self.inner.segment.send_replace(segment);
    }

    // ── Refresh ──────────────────────────────────────────────────────

    /// Fetch `segment` and replace the table with the result.
    pub async fn refresh(&self, segment: &str) -> RefreshOutcome {
        let inner = &*self.inner;
        let seq = inner.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let _in_flight = InFlight::enter(inner);
        debug!(segment, seq, "refreshing segment status");

        let result = tokio::select! {
            biased;
            () = inner.cancel.cancelled() => return RefreshOutcome::Cancelled,
            result = inner.client.segment_status(segment) => result,
        };

        if seq < inner.issued.load(Ordering::SeqCst) {
            debug!(segment, seq, "dropping stale status response");
            return RefreshOutcome::Stale { seq };
        }

        match result {
            Ok(records) => {
                self.cancel_retry();
                let snapshot = Arc::new(StatusSnapshot {
                    segment: segment.to_owned(),
                    grid: StatusGrid::from_records(&records),
                    records,
                    fetched_at: Local::now(),
                    seq,
                });
                info!(segment, devices = snapshot.records.len(), "status table updated");
                inner.view.send_replace(TableView::Loaded(Arc::clone(&snapshot)));
                RefreshOutcome::Applied(snapshot)
            }
            Err(e) => {
                let error = CoreError::from(e);
                let retry_in = inner.settings.retry_delay;
                warn!(segment, error = %error, retry_in = ?retry_in, "status refresh failed");
                self.schedule_retry();
                RefreshOutcome::Failed { error, retry_in }
            }
        }
    }

    /// Refresh the currently selected segment in the background.
    pub fn refresh_now(&self) -> JoinHandle<RefreshOutcome> {
        let poller = self.clone();
        let segment = self.current_segment();
        tokio::spawn(async move { poller.refresh(&segment).await })
    }

    // ── Retry slot ───────────────────────────────────────────────────

    /// Arm the single retry slot. The retry refreshes whatever segment is
    /// selected when it fires, not the one that failed.
    fn schedule_retry(&self) {
        let Ok(mut slot) = self.inner.retry.lock() else {
            warn!("retry slot poisoned, not retrying");
            return;
        };
        if let Some(previous) = slot.take() {
            previous.cancel.cancel();
        }

        let cancel = self.inner.cancel.child_token();
        let delay = self.inner.settings.retry_delay;
        let poller = self.clone();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                biased;
                () = token.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    let segment = poller.current_segment();
                    debug!(%segment, "retrying status refresh");
                    let _ = poller.refresh(&segment).await;
                }
            }
        });
        *slot = Some(PendingRetry { cancel, handle });
    }

    fn cancel_retry(&self) {
        if let Ok(mut slot) = self.inner.retry.lock() {
            if let Some(pending) = slot.take() {
                debug!("cancelling pending retry");
                pending.cancel.cancel();
            }
        }
    }

    /// Whether a retry is waiting to fire.
    pub fn pending_retry(&self) -> bool {
        self.inner.retry.lock().is_ok_and(|slot| {
            slot.as_ref()
                .is_some_and(|p| !p.cancel.is_cancelled() && !p.handle.is_finished())
        })
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Select the default segment, refresh it right away, then keep
    /// refreshing whatever segment is selected every poll interval.
    pub async fn start(&self) {
        self.select_segment(self.inner.settings.default_segment.clone());
        let poller = self.clone();
        let handle = tokio::spawn(poll_task(poller, self.inner.cancel.clone()));
        self.inner.task_handles.lock().await.push(handle);
        info!(
            interval = ?self.inner.settings.poll_interval,
            segment = %self.inner.settings.default_segment,
            "status polling started"
        );
    }

    /// Stop the timer, any pending retry and in-flight refreshes.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        self.cancel_retry();
        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("status poller stopped");
    }
}

/// Timer loop. The first tick fires immediately.
async fn poll_task(poller: StatusPoller, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(poller.inner.settings.poll_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let segment = poller.current_segment();
                let _ = poller.refresh(&segment).await;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use url::Url;

    use super::*;

    fn offline_poller() -> StatusPoller {
        let client = IpmonClient::new(
            Url::parse("http://127.0.0.1:9").unwrap(),
            "",
            &ipmon_api::TransportConfig::default(),
        )
        .unwrap();
        StatusPoller::new(client, PollerSettings::default())
    }

    #[tokio::test]
    async fn starts_with_placeholder_and_default_segment() {
        let poller = offline_poller();
        assert_eq!(poller.view(), TableView::Placeholder(PLACEHOLDER.into()));
        assert_eq!(poller.current_segment(), "85");
        assert_eq!(poller.state(), PollState::Idle);
    }
}
