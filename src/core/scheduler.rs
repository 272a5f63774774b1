use crate::core::visibility::VisibilityGate;
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

pub type TickFn = Box<dyn FnMut() -> BoxFuture<'static, ()> + Send>;

/// Owns the single repeating poll timer.
///
/// Visibility gates the action, not the timer: while hidden the timer keeps
/// its cadence and each tick is skipped. Each cycle runs as its own task so
/// `stop` cancels only the timer; a cycle already in flight runs to the end.
/// A tick that fires while a cycle is still running is skipped.
pub struct PollScheduler {
    interval: Duration,
    gate: Arc<dyn VisibilityGate>,
    handle: Mutex<Option<JoinHandle<()>>>,
    in_flight: Arc<AtomicBool>,
}

/// Clears the in-flight flag when the cycle task ends, panics included.
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl PollScheduler {
    pub fn new(interval: Duration, gate: Arc<dyn VisibilityGate>) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            gate,
            handle: Mutex::new(None),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Starts the timer unless one is already active. Must be called from
    /// within a tokio runtime. Returns `true` if a timer was started.
    pub fn start(&self, mut on_tick: TickFn) -> bool {
        let mut handle = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        if handle.as_ref().is_some_and(|h| !h.is_finished()) {
            tracing::debug!("poll scheduler already running");
            return false;
        }

        let period = self.interval;
        let gate = self.gate.clone();
        let in_flight = self.in_flight.clone();
        *handle = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !gate.is_visible() {
                    tracing::trace!("page hidden, skipping tick");
                    continue;
                }
                if in_flight.swap(true, Ordering::AcqRel) {
                    tracing::debug!("previous cycle still running, skipping tick");
                    continue;
                }
                let guard = InFlight(in_flight.clone());
                let cycle = on_tick();
                tokio::spawn(async move {
                    let _guard = guard;
                    cycle.await;
                });
            }
        }));
        tracing::info!(interval_ms = period.as_millis() as u64, "poll scheduler started");
        true
    }

    /// Cancels the timer. A cycle already in flight is left to finish.
    /// Returns `true` if a timer was running.
    pub fn stop(&self) -> bool {
        let taken = self.handle.lock().unwrap_or_else(PoisonError::into_inner).take();
        match taken {
            Some(h) => {
                let was_running = !h.is_finished();
                h.abort();
                if was_running {
                    tracing::info!("poll scheduler stopped");
                }
                was_running
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        if let Some(h) = self.handle.get_mut().unwrap_or_else(PoisonError::into_inner).take() {
            h.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::visibility::FlagGate;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_tick(counter: Arc<AtomicUsize>) -> TickFn {
        Box::new(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            .boxed()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn double_start_keeps_a_single_timer() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let scheduler = PollScheduler::new(Duration::from_millis(1000), Arc::new(FlagGate::new(true)));

        assert!(scheduler.start(counting_tick(ticks.clone())));
        assert!(!scheduler.start(counting_tick(ticks.clone())));

        tokio::time::sleep(Duration::from_millis(5_500)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 5);
        assert!(scheduler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn hidden_page_skips_ticks_until_visible_again() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(FlagGate::new(false));
        let scheduler = PollScheduler::new(Duration::from_millis(1000), gate.clone());
        scheduler.start(counting_tick(ticks.clone()));

        tokio::time::sleep(Duration::from_millis(10_500)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);

        gate.set_visible(true);
        tokio::time::sleep(Duration::from_millis(1_000)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
    }

    fn slow_tick(started: Arc<AtomicUsize>, finished: Arc<AtomicUsize>, work: Duration) -> TickFn {
        Box::new(move || {
            let started = started.clone();
            let finished = finished.clone();
            async move {
                started.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(work).await;
                finished.fetch_add(1, Ordering::SeqCst);
            }
            .boxed()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn slow_cycle_skips_overlapping_ticks() {
        let started = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));
        let scheduler = PollScheduler::new(Duration::from_millis(1000), Arc::new(FlagGate::new(true)));
        scheduler.start(slow_tick(started.clone(), finished.clone(), Duration::from_millis(2_500)));

        // Cycle from 1000 to 3500; ticks at 2000 and 3000 are skipped.
        tokio::time::sleep(Duration::from_millis(4_200)).await;
        assert_eq!(started.load(Ordering::SeqCst), 2);
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_lets_running_cycle_finish() {
        let started = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));
        let scheduler = PollScheduler::new(Duration::from_millis(1000), Arc::new(FlagGate::new(true)));
        scheduler.start(slow_tick(started.clone(), finished.clone(), Duration::from_millis(500)));

        tokio::time::sleep(Duration::from_millis(1_200)).await;
        assert!(scheduler.stop());
        assert_eq!(finished.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2_000)).await;
        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent_and_allows_restart() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let scheduler = PollScheduler::new(Duration::from_millis(1000), Arc::new(FlagGate::new(true)));

        assert!(!scheduler.stop());
        scheduler.start(counting_tick(ticks.clone()));
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert!(scheduler.stop());
        assert!(!scheduler.stop());
        assert!(!scheduler.is_running());

        tokio::time::sleep(Duration::from_millis(3_000)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);

        assert!(scheduler.start(counting_tick(ticks.clone())));
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
    }
}
