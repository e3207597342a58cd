use crate::core::cache::{prepare, CheckoutCache};
use crate::core::models::CheckoutRecord;
use crate::core::settings::Settings;
use crate::source::{CheckoutSource, FetchError};
use crate::ui::{BoardFrame, BoardView, ErrorFrame, LabelFrame, Renderer};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct BoardConfig {
    pub data_interval: Duration,
    pub label_interval: Duration,
    pub clock_interval: Duration,
    pub view: BoardView,
}

impl BoardConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            data_interval: settings.refresh.data_interval(),
            label_interval: settings.refresh.label_interval(),
            clock_interval: settings.refresh.clock_interval(),
            view: BoardView::new(
                settings.board.previous_list_size,
                settings.labels.clone(),
                settings.board.clock_format,
            ),
        }
    }
}

/// What a single data refresh ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The cache was replaced; holds the number of called entries.
    Updated(usize),
    Failed,
    /// Another fetch was still outstanding.
    Skipped,
    /// The board was stopped before or during the fetch.
    Inactive,
}

const IDLE: u64 = 0;

/// Marks a fetch as outstanding for one lifecycle epoch. A holder left over
/// from an earlier epoch does not block the current one, and releasing only
/// clears the slot if it still belongs to this holder.
struct InFlight<'a> {
    slot: &'a AtomicU64,
    epoch: u64,
}

impl<'a> InFlight<'a> {
    fn acquire(slot: &'a AtomicU64, epoch: u64) -> Option<Self> {
        slot.fetch_update(Ordering::AcqRel, Ordering::Acquire, |holder| {
            (holder != epoch).then_some(epoch)
        })
        .ok()
        .map(|_| Self { slot, epoch })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let _ = self
            .slot
            .compare_exchange(self.epoch, IDLE, Ordering::AcqRel, Ordering::Acquire);
    }
}

struct Shared<R: Renderer> {
    source: Arc<dyn CheckoutSource>,
    renderer: Arc<Mutex<R>>,
    cache: CheckoutCache,
    config: BoardConfig,
    clock: Clock,
    stopped: AtomicBool,
    /// Bumped by every `start` and `stop`; work begun under an older value
    /// never touches the cache or the screen. Never `IDLE`.
    epoch: AtomicU64,
    in_flight: AtomicU64,
    consecutive_failures: AtomicU32,
}

impl<R: Renderer> Shared<R> {
    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    fn is_current(&self, epoch: u64) -> bool {
        !self.is_stopped() && self.epoch() == epoch
    }

    async fn render<F>(&self, epoch: u64, draw: F)
    where
        F: FnOnce(&mut R) -> anyhow::Result<()>,
    {
        let mut renderer = self.renderer.lock().await;
        if !self.is_current(epoch) {
            return;
        }
        if let Err(e) = draw(&mut *renderer) {
            tracing::warn!(error = %e, "Failed to draw board");
        }
    }

    async fn fetch_and_refresh(&self) -> RefreshOutcome {
        let epoch = self.epoch();
        if !self.is_current(epoch) {
            return RefreshOutcome::Inactive;
        }

        let Some(_in_flight) = InFlight::acquire(&self.in_flight, epoch) else {
            tracing::debug!("Previous fetch still in flight, skipping refresh");
            return RefreshOutcome::Skipped;
        };

        let result = self.source.fetch().await;

        if !self.is_current(epoch) {
            tracing::debug!(epoch, "Board stopped or restarted during fetch, discarding result");
            return RefreshOutcome::Inactive;
        }

        match result {
            Ok(records) => self.apply_records(epoch, records).await,
            Err(e) => self.apply_failure(epoch, e).await,
        }
    }

    async fn apply_records(&self, epoch: u64, records: Vec<CheckoutRecord>) -> RefreshOutcome {
        let received = records.len();
        let prepared = prepare(records);

        // Cache swap and full draw happen under one renderer lock.
        let mut renderer = self.renderer.lock().await;
        if !self.is_current(epoch) {
            tracing::debug!(epoch, "Board stopped before applying fetch, discarding result");
            return RefreshOutcome::Inactive;
        }
        let generation = self.cache.replace(prepared).await;

        let failures = self.consecutive_failures.swap(0, Ordering::SeqCst);
        if failures > 0 {
            tracing::info!(failures, "Data source recovered");
        }

        let frame = BoardFrame::project(&generation, &self.config.view, self.now());
        if let Err(e) = renderer.render_full(&frame) {
            tracing::warn!(error = %e, "Failed to draw board");
        }
        drop(renderer);

        tracing::debug!(received, called = generation.len(), "Refreshed checkouts");
        RefreshOutcome::Updated(generation.len())
    }

    async fn apply_failure(&self, epoch: u64, error: FetchError) -> RefreshOutcome {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::warn!(
            kind = error.kind(),
            error = %error,
            consecutive_failures = failures,
            "Failed to fetch checkouts"
        );
        if let FetchError::Status { body, .. } = &error {
            tracing::debug!(%body, "Data source error body");
        }

        let frame = ErrorFrame::new(&self.config.view, error.to_string());
        self.render(epoch, |r| r.render_error(&frame)).await;
        RefreshOutcome::Failed
    }

    async fn refresh_labels_only(&self) {
        let epoch = self.epoch();
        if !self.is_current(epoch) {
            return;
        }
        let generation = self.cache.snapshot().await;
        let labels = LabelFrame::project(&generation, &self.config.view, self.now());
        self.render(epoch, |r| r.render_labels(&labels)).await;
    }

    async fn refresh_clock(&self) {
        let epoch = self.epoch();
        let text = self.config.view.clock_text(self.now());
        self.render(epoch, |r| r.render_clock(&text)).await;
    }
}

struct Running {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

/// Owns one board: the cache, the renderer and the timers that keep both
/// fresh.
pub struct BoardController<R: Renderer + 'static> {
    shared: Arc<Shared<R>>,
    running: Option<Running>,
}

impl<R: Renderer + 'static> BoardController<R> {
    pub fn new(config: BoardConfig, source: Arc<dyn CheckoutSource>, renderer: R) -> Self {
        Self::with_renderer(config, source, Arc::new(Mutex::new(renderer)))
    }

    /// Builds a controller that draws on a renderer shared with a previous
    /// controller, e.g. after a config reload.
    pub fn with_renderer(
        config: BoardConfig,
        source: Arc<dyn CheckoutSource>,
        renderer: Arc<Mutex<R>>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                source,
                renderer,
                cache: CheckoutCache::new(),
                config,
                clock: Arc::new(Utc::now),
                stopped: AtomicBool::new(false),
                epoch: AtomicU64::new(IDLE + 1),
                in_flight: AtomicU64::new(IDLE),
                consecutive_failures: AtomicU32::new(0),
            }),
            running: None,
        }
    }

    /// Replaces the wall clock used for labels and the clock display.
    /// Only valid before the controller is shared with running tasks.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        if let Some(shared) = Arc::get_mut(&mut self.shared) {
            shared.clock = clock;
        } else {
            tracing::warn!("Clock can only be replaced before the board starts");
        }
        self
    }

    pub fn renderer(&self) -> Arc<Mutex<R>> {
        Arc::clone(&self.shared.renderer)
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.shared.consecutive_failures.load(Ordering::SeqCst)
    }

    pub async fn snapshot(&self) -> Arc<[CheckoutRecord]> {
        self.shared.cache.snapshot().await
    }

    /// Draws the clock and arms the data, label and clock timers. The data
    /// timer fires at once, so the first fetch runs in the background and a
    /// slow data source never holds up the caller.
    pub async fn start(&mut self) {
        if self.running.is_some() {
            tracing::debug!("Board already running");
            return;
        }

        self.shared.epoch.fetch_add(1, Ordering::SeqCst);
        self.shared.stopped.store(false, Ordering::SeqCst);

        let config = &self.shared.config;
        tracing::info!(
            source = %self.shared.source.describe(),
            data_interval_ms = config.data_interval.as_millis() as u64,
            label_interval_ms = config.label_interval.as_millis() as u64,
            previous_list_size = config.view.previous_list_size,
            "Starting checkout board"
        );

        self.shared.refresh_clock().await;

        let (shutdown, shutdown_rx) = watch::channel(false);

        let data = Arc::clone(&self.shared);
        let labels = Arc::clone(&self.shared);
        let clock = Arc::clone(&self.shared);

        let tasks = vec![
            tokio::spawn(run_periodic(
                self.shared.config.data_interval,
                FirstTick::Run,
                shutdown_rx.clone(),
                move || {
                    let data = Arc::clone(&data);
                    async move {
                        data.fetch_and_refresh().await;
                    }
                },
            )),
            tokio::spawn(run_periodic(
                self.shared.config.label_interval,
                FirstTick::Skip,
                shutdown_rx.clone(),
                move || {
                    let labels = Arc::clone(&labels);
                    async move { labels.refresh_labels_only().await }
                },
            )),
            tokio::spawn(run_periodic(
                self.shared.config.clock_interval,
                FirstTick::Skip,
                shutdown_rx,
                move || {
                    let clock = Arc::clone(&clock);
                    async move { clock.refresh_clock().await }
                },
            )),
        ];

        self.running = Some(Running { shutdown, tasks });
    }

    /// One data refresh: fetch, filter, sort, replace the cache, redraw.
    pub async fn fetch_and_refresh(&self) -> RefreshOutcome {
        self.shared.fetch_and_refresh().await
    }

    /// Runs a data refresh in the background, e.g. on an external request.
    pub fn trigger_refresh(&self) -> JoinHandle<RefreshOutcome> {
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move { shared.fetch_and_refresh().await })
    }

    /// Recomputes elapsed labels against the cached records. No I/O.
    pub async fn refresh_labels_only(&self) {
        self.shared.refresh_labels_only().await
    }

    /// Cancels every timer. Fetches already in flight finish but leave the
    /// cache and screen alone, even if the board is started again before
    /// they return. Safe to call repeatedly or before `start`.
    pub fn stop(&mut self) {
        if !self.shared.stopped.swap(true, Ordering::SeqCst) {
            self.shared.epoch.fetch_add(1, Ordering::SeqCst);
        }

        let Some(running) = self.running.take() else {
            return;
        };

        let _ = running.shutdown.send(true);
        tracing::info!(tasks = running.tasks.len(), "Stopped checkout board");
    }

    /// Stops the board and waits briefly for its timer tasks to wind down.
    pub async fn shutdown(&mut self) {
        let tasks = self
            .running
            .as_mut()
            .map(|running| std::mem::take(&mut running.tasks))
            .unwrap_or_default();
        self.stop();

        for task in tasks {
            if tokio::time::timeout(SHUTDOWN_GRACE, task).await.is_err() {
                tracing::debug!("Board task still finishing a fetch, detaching");
            }
        }
    }
}

impl<R: Renderer + 'static> Drop for BoardController<R> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Whether a timer acts on the immediate first tick of its interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FirstTick {
    Run,
    Skip,
}

async fn run_periodic<F, Fut>(
    period: Duration,
    first: FirstTick,
    mut shutdown: watch::Receiver<bool>,
    mut tick: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    if first == FirstTick::Skip {
        interval.tick().await;
    }

    loop {
        tokio::select! {
            _ = interval.tick() => tick().await,
            _ = shutdown.changed() => break,
        }
    }
}
