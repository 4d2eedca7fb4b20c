//! Periodic completion check for the timer engine.
//!
//! The ticker only observes: on each tick it locks the engine and asks it
//! whether the active slot ran out. Elapsed time always comes from the
//! engine's clock, so a late or skipped tick delays completion detection
//! but never shifts the remaining time.
//!
//! At most one tick task exists. It is cancelled and recreated whenever the
//! active kind or running flag changes, and cancelled when the ticker drops.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::types::{EngineSnapshot, TimerKind};

use super::timer::TimerEngine;

/// Refresh period of the completion check.
pub const TICK_INTERVAL: Duration = Duration::from_millis(200);

/// Engine shared between the ticker and request handlers.
pub type SharedEngine = Arc<Mutex<TimerEngine>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TickKey {
    kind: TimerKind,
    running: bool,
}

impl From<&EngineSnapshot> for TickKey {
    fn from(snapshot: &EngineSnapshot) -> Self {
        Self {
            kind: snapshot.active_kind,
            running: snapshot.is_running,
        }
    }
}

/// Owns the single periodic completion-check task.
pub struct Ticker {
    engine: SharedEngine,
    period: Duration,
    current: Option<(TickKey, JoinHandle<()>)>,
}

impl Ticker {
    /// Creates an idle ticker for `engine` with the default period.
    pub fn new(engine: SharedEngine) -> Self {
        Self::with_period(engine, TICK_INTERVAL)
    }

    /// Creates an idle ticker with a custom period.
    pub fn with_period(engine: SharedEngine, period: Duration) -> Self {
        Self {
            engine,
            period,
            current: None,
        }
    }

    /// Brings the tick task in line with `snapshot`.
    ///
    /// A new task is spawned only when the active slot is running; any
    /// existing task is cancelled first if the key changed or it exited.
    pub fn sync(&mut self, snapshot: &EngineSnapshot) {
        let key = TickKey::from(snapshot);

        if let Some((current, handle)) = &self.current {
            if *current == key && !handle.is_finished() {
                return;
            }
        }
        self.cancel();

        if key.running {
            tracing::debug!("Scheduling ticker for {}", key.kind);
            let handle = tokio::spawn(run_ticks(self.engine.clone(), self.period));
            self.current = Some((key, handle));
        }
    }

    /// Cancels the tick task, if any.
    pub fn cancel(&mut self) {
        if let Some((key, handle)) = self.current.take() {
            tracing::debug!("Cancelling ticker for {}", key.kind);
            handle.abort();
        }
    }

    #[cfg(test)]
    fn scheduled_kind(&self) -> Option<TimerKind> {
        self.current
            .as_ref()
            .filter(|(_, handle)| !handle.is_finished())
            .map(|(key, _)| key.kind)
    }

    /// Returns true if a tick task is alive.
    pub fn is_scheduled(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|(_, handle)| !handle.is_finished())
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Tick loop: runs until the engine stops running.
///
/// With `auto_cycle` enabled the next slot is started right after a
/// completion; that decision lives here, not in the engine. The loop always
/// checks the live active slot, so it keeps covering the new kind until the
/// owner's next `sync` sees the changed key and replaces the task.
async fn run_ticks(engine: SharedEngine, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let mut timer = engine.lock().await;
        if let Some(completion) = timer.tick() {
            tracing::info!("{} finished, {} is next", completion.kind, completion.next);
            if timer.settings().auto_cycle {
                timer.start();
            }
        }

        if !timer.is_running() {
            break;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::daemon::clock::ManualClock;
    use crate::daemon::timer::{EngineContext, TimerEvent};
    use crate::store::MemoryStore;
    use crate::types::TimerSettings;
    use tokio::sync::mpsc;

    const T0: i64 = 1_700_000_000_000;

    fn create_engine(
        settings: TimerSettings,
    ) -> (
        SharedEngine,
        Arc<ManualClock>,
        mpsc::UnboundedReceiver<TimerEvent>,
    ) {
        let clock = Arc::new(ManualClock::new(T0));
        let (tx, rx) = mpsc::unbounded_channel();
        let ctx = EngineContext::new(Arc::new(MemoryStore::new()), clock.clone());
        let engine = TimerEngine::open(settings, ctx, tx);
        (Arc::new(Mutex::new(engine)), clock, rx)
    }

    fn count_focus_completions(rx: &mut mpsc::UnboundedReceiver<TimerEvent>) -> usize {
        let mut count = 0;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, TimerEvent::FocusSessionCompleted(_)) {
                count += 1;
            }
        }
        count
    }

    #[tokio::test]
    async fn test_idle_engine_schedules_nothing() {
        let (engine, _clock, _rx) = create_engine(TimerSettings::default());
        let mut ticker = Ticker::new(engine.clone());

        let snapshot = engine.lock().await.snapshot();
        ticker.sync(&snapshot);

        assert!(!ticker.is_scheduled());
    }

    #[tokio::test]
    async fn test_running_engine_schedules_task() {
        let (engine, _clock, _rx) = create_engine(TimerSettings::default());
        let mut ticker = Ticker::new(engine.clone());

        let snapshot = engine.lock().await.start();
        ticker.sync(&snapshot);
        assert!(ticker.is_scheduled());

        let snapshot = engine.lock().await.pause();
        ticker.sync(&snapshot);
        assert!(!ticker.is_scheduled());
    }

    #[tokio::test]
    async fn test_completion_detected_by_ticks() {
        let (engine, clock, mut rx) = create_engine(TimerSettings::default());
        let mut ticker = Ticker::with_period(engine.clone(), Duration::from_millis(20));

        let snapshot = engine.lock().await.start();
        ticker.sync(&snapshot);
        clock.advance_secs(1500);

        tokio::time::sleep(Duration::from_millis(200)).await;

        let engine = engine.lock().await;
        assert_eq!(engine.active_kind(), TimerKind::ShortBreak);
        assert!(!engine.is_running());
        assert_eq!(count_focus_completions(&mut rx), 1);
        assert!(!ticker.is_scheduled());
    }

    #[tokio::test]
    async fn test_duplicate_sync_keeps_single_task() {
        let (engine, clock, mut rx) = create_engine(TimerSettings::default());
        let mut ticker = Ticker::with_period(engine.clone(), Duration::from_millis(20));

        let snapshot = engine.lock().await.start();
        for _ in 0..5 {
            ticker.sync(&snapshot);
        }
        clock.advance_secs(1500);
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(count_focus_completions(&mut rx), 1);
        assert_eq!(engine.lock().await.completed_focus_count(), 1);
    }

    #[tokio::test]
    async fn test_auto_cycle_starts_next_slot() {
        let settings = TimerSettings {
            auto_cycle: true,
            ..TimerSettings::default()
        };
        let (engine, clock, _rx) = create_engine(settings);
        let mut ticker = Ticker::with_period(engine.clone(), Duration::from_millis(20));

        let snapshot = engine.lock().await.start();
        ticker.sync(&snapshot);
        clock.advance_secs(1500);
        tokio::time::sleep(Duration::from_millis(200)).await;

        let engine = engine.lock().await;
        assert_eq!(engine.active_kind(), TimerKind::ShortBreak);
        assert!(engine.is_running());
    }

    #[tokio::test]
    async fn test_kind_change_replaces_task() {
        let settings = TimerSettings {
            auto_cycle: true,
            ..TimerSettings::default()
        };
        let (engine, clock, mut rx) = create_engine(settings);
        let mut ticker = Ticker::with_period(engine.clone(), Duration::from_millis(20));

        let snapshot = engine.lock().await.start();
        ticker.sync(&snapshot);
        clock.advance_secs(1500);
        tokio::time::sleep(Duration::from_millis(200)).await;

        let snapshot = engine.lock().await.snapshot();
        assert_eq!(snapshot.active_kind, TimerKind::ShortBreak);
        assert!(snapshot.is_running);

        ticker.sync(&snapshot);
        ticker.sync(&snapshot);
        assert_eq!(ticker.scheduled_kind(), Some(TimerKind::ShortBreak));
        while rx.try_recv().is_ok() {}

        clock.advance_secs(300);
        tokio::time::sleep(Duration::from_millis(200)).await;

        let mut break_completions = 0;
        while let Ok(event) = rx.try_recv() {
            if matches!(
                event,
                TimerEvent::Completed {
                    kind: TimerKind::ShortBreak,
                    ..
                }
            ) {
                break_completions += 1;
            }
        }
        assert_eq!(break_completions, 1);

        let timer = engine.lock().await;
        assert_eq!(timer.active_kind(), TimerKind::Focus);
        assert!(timer.is_running());
    }

    #[tokio::test]
    async fn test_drop_cancels_task() {
        let (engine, clock, mut rx) = create_engine(TimerSettings::default());
        let mut ticker = Ticker::with_period(engine.clone(), Duration::from_millis(20));

        let snapshot = engine.lock().await.start();
        ticker.sync(&snapshot);
        drop(ticker);

        clock.advance_secs(1500);
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(engine.lock().await.is_running());
        assert_eq!(count_focus_completions(&mut rx), 0);
    }
}
