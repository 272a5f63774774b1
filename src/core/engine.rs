use crate::core::events::SyncEvent;
use crate::core::page::Page;
use crate::core::reconciler::{CycleReport, Reconcile};
use crate::core::scheduler::PollScheduler;
use crate::core::visibility::VisibilityGate;
use crate::plugins::registry::StatusFetcher;
use futures::FutureExt;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tokio::time::Duration;

pub type SharedPage = Arc<Mutex<dyn Page>>;

/// Keeps a rendered page in step with the batch status endpoint.
#[derive(Clone)]
pub struct SyncEngine {
    fetcher: Arc<dyn StatusFetcher>,
    page: SharedPage,
    scheduler: Arc<PollScheduler>,
    event_tx: broadcast::Sender<SyncEvent>,
}

impl SyncEngine {
    pub fn new(
        fetcher: Arc<dyn StatusFetcher>,
        page: SharedPage,
        gate: Arc<dyn VisibilityGate>,
        interval: Duration,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            fetcher,
            page,
            scheduler: Arc::new(PollScheduler::new(interval, gate)),
            event_tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.event_tx.subscribe()
    }

    /// Start polling with the given strategy. A second call while running is
    /// ignored, whatever strategy it passes.
    pub fn start(&self, strategy: Arc<dyn Reconcile>) -> bool {
        let engine = self.clone();
        let name = strategy.name();
        let started = self.scheduler.start(Box::new(move || {
            let engine = engine.clone();
            let strategy = strategy.clone();
            async move {
                engine.run_cycle(strategy.as_ref()).await;
            }
            .boxed()
        }));
        if started {
            let _ = self.event_tx.send(SyncEvent::SchedulerStarted { strategy: name });
        }
        started
    }

    pub fn stop(&self) -> bool {
        let stopped = self.scheduler.stop();
        if stopped {
            let _ = self.event_tx.send(SyncEvent::SchedulerStopped);
        }
        stopped
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn interval(&self) -> Duration {
        self.scheduler.interval()
    }

    /// One fetch + reconcile pass. Failures drop the cycle and are only
    /// logged; the next tick tries again.
    pub async fn run_cycle(&self, strategy: &dyn Reconcile) -> Option<CycleReport> {
        let records = match self.fetcher.fetch_batch_status().await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(
                    fetcher = self.fetcher.name(),
                    status = ?e.status(),
                    "poll cycle dropped: {}",
                    e
                );
                let _ = self.event_tx.send(SyncEvent::CycleFailed { message: e.to_string() });
                return None;
            }
        };

        let report = {
            let mut page = self.page.lock().await;
            strategy.reconcile(&records, &mut *page)
        };
        tracing::debug!(
            strategy = strategy.name(),
            records = report.records,
            marked_done = report.marked_done,
            progressed = report.progressed,
            protected = report.protected,
            missing = report.missing,
            failed = report.failed,
            "poll cycle applied"
        );
        let _ = self.event_tx.send(SyncEvent::CycleApplied { strategy: strategy.name(), report: report.clone() });
        Some(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::FetchError;
    use crate::core::model::{EntityStatus, Slot};
    use crate::core::page::MemoryPage;
    use crate::core::reconciler::testing::record;
    use crate::core::visibility::FlagGate;
    use crate::plugins::series::reconciler::SeriesReconciler;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays scripted responses; once exhausted, returns an empty batch.
    #[derive(Default)]
    struct ScriptedFetcher {
        script: std::sync::Mutex<VecDeque<Result<Vec<EntityStatus>, FetchError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedFetcher {
        fn push(&self, response: Result<Vec<EntityStatus>, FetchError>) {
            self.script.lock().unwrap().push_back(response);
        }
    }

    #[async_trait]
    impl StatusFetcher for ScriptedFetcher {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn fetch_batch_status(&self) -> Result<Vec<EntityStatus>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script.lock().unwrap().pop_front().unwrap_or_else(|| Ok(vec![]))
        }
    }

    fn server_error() -> FetchError {
        FetchError::Status { status: StatusCode::INTERNAL_SERVER_ERROR, operation: "test" }
    }

    fn setup(gate: Arc<FlagGate>) -> (SyncEngine, Arc<ScriptedFetcher>, Arc<Mutex<MemoryPage>>) {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let mut page = MemoryPage::with_done_template("done");
        page.add_summary("a", &[Slot::Percent], None);
        let page = Arc::new(Mutex::new(page));
        let engine = SyncEngine::new(fetcher.clone(), page.clone(), gate, Duration::from_millis(1000));
        (engine, fetcher, page)
    }

    #[tokio::test]
    async fn failed_cycle_leaves_page_untouched() {
        let (engine, fetcher, page) = setup(Arc::new(FlagGate::new(true)));
        let mut events = engine.subscribe();
        fetcher.push(Err(server_error()));

        assert!(engine.run_cycle(&SeriesReconciler::new()).await.is_none());

        assert_eq!(page.lock().await.summary("a").unwrap().slot(Slot::Percent), Some(""));
        assert!(matches!(events.recv().await.unwrap(), SyncEvent::CycleFailed { .. }));
    }

    #[tokio::test]
    async fn applied_cycle_patches_page_and_reports() {
        let (engine, fetcher, page) = setup(Arc::new(FlagGate::new(true)));
        fetcher.push(Ok(vec![record("a", "A", 40, ""), record("b", "A", 5, "")]));

        let report = engine.run_cycle(&SeriesReconciler::new()).await.unwrap();

        assert_eq!(report.records, 2);
        assert_eq!(report.progressed, 1);
        assert_eq!(report.missing, 1);
        assert_eq!(page.lock().await.summary("a").unwrap().slot(Slot::Percent), Some("40%"));
    }

    #[tokio::test(start_paused = true)]
    async fn scheduler_survives_failures_and_recovers_next_tick() {
        let (engine, fetcher, page) = setup(Arc::new(FlagGate::new(true)));
        fetcher.push(Err(server_error()));
        fetcher.push(Ok(vec![record("a", "D", 100, "")]));

        assert!(engine.start(Arc::new(SeriesReconciler::new())));
        tokio::time::sleep(Duration::from_millis(2_500)).await;

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
        assert!(engine.is_running());
        assert_eq!(page.lock().await.summary("a").unwrap().content, "done");
        assert!(engine.stop());
    }

    #[tokio::test(start_paused = true)]
    async fn no_fetch_while_hidden() {
        let gate = Arc::new(FlagGate::new(false));
        let (engine, fetcher, _page) = setup(gate.clone());

        engine.start(Arc::new(SeriesReconciler::new()));
        assert!(!engine.start(Arc::new(SeriesReconciler::new())));
        tokio::time::sleep(Duration::from_millis(20_500)).await;
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);

        gate.set_visible(true);
        tokio::time::sleep(Duration::from_millis(1_000)).await;
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    /// Answers every request after a fixed delay.
    struct SlowFetcher {
        delay: Duration,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl StatusFetcher for SlowFetcher {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn fetch_batch_status(&self) -> Result<Vec<EntityStatus>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(vec![record("a", "D", 100, "")])
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stop_lets_in_flight_cycle_finish() {
        let fetcher = Arc::new(SlowFetcher { delay: Duration::from_millis(500), calls: AtomicUsize::new(0) });
        let mut page = MemoryPage::with_done_template("done");
        page.add_summary("a", &[Slot::Percent], None);
        let page = Arc::new(Mutex::new(page));
        let engine = SyncEngine::new(fetcher.clone(), page.clone(), Arc::new(FlagGate::new(true)), Duration::from_millis(1000));
        assert_eq!(engine.interval(), Duration::from_millis(1000));

        engine.start(Arc::new(SeriesReconciler::new()));
        tokio::time::sleep(Duration::from_millis(1_200)).await;
        assert!(engine.stop());
        assert_ne!(page.lock().await.summary("a").unwrap().content, "done");

        tokio::time::sleep(Duration::from_millis(2_000)).await;
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(page.lock().await.summary("a").unwrap().content, "done");
    }

    #[tokio::test]
    async fn stop_before_start_is_a_no_op() {
        let (engine, _fetcher, _page) = setup(Arc::new(FlagGate::new(true)));
        assert!(!engine.stop());
        assert!(!engine.is_running());
    }
}
