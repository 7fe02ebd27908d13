//! Polling scheduler and fetch-select-render cycle.
//!
//! A cycle runs immediately on start and then every interval. Cycles are
//! spawned independently, so a slow fetch can still be in flight when the
//! next one starts. Each cycle takes a sequence number when it starts and
//! only renders if no newer cycle has rendered already.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Local;
use tokio::sync::{Mutex, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::client::FeedSource;
use crate::filters::Selector;
use crate::render::{Renderer, TIME_FORMAT};
use crate::surface::Surface;

/// What a single cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The selection was rendered
    Rendered { selected: usize, total: usize },
    /// Fetched fine, but a newer cycle had already rendered
    Stale,
    /// The fetch failed; a notice was appended
    Failed,
}

/// Latest-wins ordering of overlapping cycles.
#[derive(Debug, Default)]
struct CycleGate {
    started: AtomicU64,
    rendered: AtomicU64,
}

impl CycleGate {
    fn begin(&self) -> u64 {
        self.started.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Claim the right to render for `seq`. Fails if a newer cycle already did.
    fn try_claim(&self, seq: u64) -> bool {
        self.rendered
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                (seq > last).then_some(seq)
            })
            .is_ok()
    }
}

struct Shared<F, S> {
    source: F,
    selector: Selector,
    renderer: Renderer,
    surface: Arc<Mutex<S>>,
    gate: CycleGate,
}

/// Fetches, selects and renders onto a shared surface.
pub struct Poller<F, S> {
    shared: Arc<Shared<F, S>>,
}

impl<F, S> Clone for Poller<F, S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<F, S> Poller<F, S>
where
    F: FeedSource,
    S: Surface + Send + 'static,
{
    #[must_use]
    pub fn new(source: F, selector: Selector, renderer: Renderer, surface: Arc<Mutex<S>>) -> Self {
        Self {
            shared: Arc::new(Shared {
                source,
                selector,
                renderer,
                surface,
                gate: CycleGate::default(),
            }),
        }
    }

    /// Run one cycle now.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let shared = &self.shared;
        let seq = shared.gate.begin();
        info!(
            cycle = seq,
            "calling get at {}",
            Local::now().format(TIME_FORMAT)
        );

        let result = shared.source.fetch().await;

        let mut surface = shared.surface.lock().await;
        let outcome = match result {
            Ok(feed) => {
                if shared.gate.try_claim(seq) {
                    info!(cycle = seq, "data acquired: {} events", feed.events.len());
                    let selection = shared.selector.select(&feed.events);
                    shared
                        .renderer
                        .render(&mut *surface, &selection, Local::now());
                    CycleOutcome::Rendered {
                        selected: selection.selected(),
                        total: selection.total,
                    }
                } else {
                    debug!(cycle = seq, "discarding stale result");
                    CycleOutcome::Stale
                }
            }
            Err(e) => {
                warn!(cycle = seq, "fetch failed, will retry: {}", e);
                surface.append_notice(format!(
                    r#"<p class="error">ERROR: Something went wrong getting data at {}.</p>"#,
                    Local::now().format(TIME_FORMAT)
                ));
                CycleOutcome::Failed
            }
        };

        if let Err(e) = surface.flush().await {
            warn!(cycle = seq, "failed to publish page: {}", e);
        }
        debug!(cycle = seq, ?outcome, "complete");
        outcome
    }

    /// Start polling: one cycle immediately, then one every `interval`.
    ///
    /// Polling continues until [`PollerHandle::stop`] is called or the
    /// handle is dropped.
    #[must_use]
    pub fn spawn(self, interval: Duration) -> PollerHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut cycles = JoinSet::new();

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let poller = self.clone();
                        cycles.spawn(async move { poller.run_cycle().await });
                    }
                    Some(_) = cycles.join_next(), if !cycles.is_empty() => {}
                    _ = stop_rx.changed() => break,
                }
            }

            // In-flight fetches are not cancelled
            while cycles.join_next().await.is_some() {}
            debug!("poller stopped");
        });

        PollerHandle { stop_tx, task }
    }
}

/// Handle to a running poller.
#[derive(Debug)]
pub struct PollerHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Stop scheduling new cycles and wait for in-flight ones to finish.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.task.await {
            warn!("poller task ended abnormally: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::errors::RoadtailError;
    use crate::models::EventFeed;
    use crate::models::tests::sample_feed;
    use crate::surface::HtmlPage;

    type Scripted = (Duration, Result<EventFeed, String>);

    /// Replays scripted responses, one per call, then repeats the last.
    struct ScriptedSource {
        script: std::sync::Mutex<VecDeque<Scripted>>,
        last: std::sync::Mutex<Option<Scripted>>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedSource {
        fn new(script: Vec<Scripted>) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let source = Self {
                script: std::sync::Mutex::new(script.into()),
                last: std::sync::Mutex::new(None),
                calls: Arc::clone(&calls),
            };
            (source, calls)
        }

        fn next(&self) -> Scripted {
            let mut script = self.script.lock().unwrap();
            let mut last = self.last.lock().unwrap();
            match script.pop_front() {
                Some(step) => {
                    *last = Some(step.clone());
                    step
                }
                None => last.clone().expect("empty script"),
            }
        }
    }

    impl FeedSource for ScriptedSource {
        async fn fetch(&self) -> Result<EventFeed, RoadtailError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let (delay, result) = self.next();
            tokio::time::sleep(delay).await;
            result.map_err(RoadtailError::InvalidResponse)
        }
    }

    fn fire() -> Selector {
        Selector::Subtype {
            tag: "FIRE".to_string(),
        }
    }

    fn empty_feed() -> EventFeed {
        serde_json::from_str(r#"{"events": []}"#).unwrap()
    }

    fn poller(script: Vec<Scripted>) -> (Poller<ScriptedSource, HtmlPage>, Arc<Mutex<HtmlPage>>, Arc<AtomicUsize>) {
        let (source, calls) = ScriptedSource::new(script);
        let surface = Arc::new(Mutex::new(HtmlPage::default()));
        let poller = Poller::new(source, fire(), Renderer::default(), Arc::clone(&surface));
        (poller, surface, calls)
    }

    #[tokio::test]
    async fn test_cycle_renders_selection() {
        let (poller, surface, _) = poller(vec![(Duration::ZERO, Ok(sample_feed()))]);

        let outcome = poller.run_cycle().await;
        assert_eq!(outcome, CycleOutcome::Rendered { selected: 2, total: 5 });

        let page = surface.lock().await;
        assert_eq!(page.count(), "2 fire events of 5 total events");
        assert_eq!(page.table().matches("<tr>").count(), 2);
        assert!(!page.timestamp().is_empty());
        assert_eq!(page.notices().count(), 0);
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_previous_render() {
        let (poller, surface, _) = poller(vec![
            (Duration::ZERO, Ok(sample_feed())),
            (Duration::ZERO, Err("boom".to_string())),
        ]);

        poller.run_cycle().await;
        let before = surface.lock().await.clone();

        let outcome = poller.run_cycle().await;
        assert_eq!(outcome, CycleOutcome::Failed);

        let after = surface.lock().await;
        assert_eq!(after.table(), before.table());
        assert_eq!(after.count(), before.count());
        assert_eq!(after.timestamp(), before.timestamp());
        assert_eq!(after.notices().count(), 1);
        assert!(after.notices().all(|n| n.contains("ERROR")));
    }

    #[tokio::test]
    async fn test_empty_feed_renders_placeholder() {
        let (poller, surface, _) = poller(vec![(Duration::ZERO, Ok(empty_feed()))]);
        poller.run_cycle().await;

        let page = surface.lock().await;
        assert_eq!(page.count(), "0 fire events of 0 total events");
        assert_eq!(page.table(), crate::render::NO_EVENTS_HTML);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_older_cycle_is_discarded() {
        let (poller, surface, _) = poller(vec![
            (Duration::from_secs(60), Ok(sample_feed())),
            (Duration::from_secs(1), Ok(empty_feed())),
        ]);

        let slow = tokio::spawn({
            let poller = poller.clone();
            async move { poller.run_cycle().await }
        });
        // Let the slow cycle start first
        tokio::time::sleep(Duration::from_millis(10)).await;
        let fast = poller.run_cycle().await;
        let slow = slow.await.unwrap();

        assert_eq!(fast, CycleOutcome::Rendered { selected: 0, total: 0 });
        assert_eq!(slow, CycleOutcome::Stale);
        assert_eq!(surface.lock().await.count(), "0 fire events of 0 total events");
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_immediately_then_every_interval() {
        let interval = Duration::from_secs(15 * 60);
        let (poller, _, calls) = poller(vec![(Duration::ZERO, Ok(sample_feed()))]);

        let handle = poller.spawn(interval);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(interval).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        tokio::time::sleep(interval * 2).await;
        assert_eq!(calls.load(Ordering::SeqCst), 4);

        handle.stop().await;
        tokio::time::sleep(interval * 3).await;
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_do_not_stop_polling() {
        let interval = Duration::from_secs(60);
        let (poller, surface, calls) = poller(vec![(Duration::ZERO, Err("down".to_string()))]);

        let handle = poller.spawn(interval);
        tokio::time::sleep(interval * 3 + Duration::from_secs(1)).await;
        handle.stop().await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(surface.lock().await.notices().count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_waits_for_in_flight_cycle() {
        let (poller, surface, _) = poller(vec![(Duration::from_secs(30), Ok(sample_feed()))]);

        let handle = poller.spawn(Duration::from_secs(900));
        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.stop().await;

        assert_eq!(surface.lock().await.count(), "2 fire events of 5 total events");
    }
}
