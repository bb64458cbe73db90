//! Per-folder debounce/inactivity state machine.
//!
//! A [`FolderWatch`] tracks the last qualifying change under its root and
//! runs at most one checker task at a time. The checker polls at a fixed
//! tick, rereading `last_activity` under the watch lock before deciding to
//! fire, so a change arriving just before the deadline pushes the quiet
//! signal out instead of firing stale. Exactly one quiet signal is emitted
//! per burst, no earlier than the inactivity period after the last
//! qualifying event and no later than one tick past that.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::dispatch::{self, DeliveryTarget};

/// How often the checker task re-evaluates elapsed inactivity. This bounds
/// both quiet-signal latency and `stop()` cancellation latency.
pub const DEFAULT_POLL_TICK: Duration = Duration::from_secs(10);

/// Lifecycle state of a watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchState {
    /// No pending quiet check.
    Idle,
    /// A checker task is active.
    Monitoring,
    /// Terminal; the watch accepts no further events.
    Stopped,
}

impl std::fmt::Display for WatchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WatchState::Idle => write!(f, "idle"),
            WatchState::Monitoring => write!(f, "monitoring"),
            WatchState::Stopped => write!(f, "stopped"),
        }
    }
}

/// One raw filesystem change, scoped to a watch's root.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub is_directory: bool,
}

impl ChangeEvent {
    /// Directory events and hidden paths (final segment starting with `.`)
    /// never count as activity.
    pub fn qualifies(&self) -> bool {
        if self.is_directory {
            return false;
        }
        !self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().starts_with('.'))
            .unwrap_or(false)
    }
}

/// Mutable state shared between the event-producer path and the checker task.
struct Shared {
    state: WatchState,
    /// Monotonic clock for elapsed math (respects tokio's paused clock).
    last_activity: Instant,
    /// Wall-clock timestamp of the last qualifying event, for status output.
    last_activity_wall: Option<jiff::Timestamp>,
}

/// Debounce state for one monitored root.
pub struct FolderWatch {
    name: String,
    inactivity_period: Duration,
    poll_tick: Duration,
    shared: Arc<Mutex<Shared>>,
    stop_signal: Arc<Notify>,
    target: Arc<DeliveryTarget>,
    /// Every checker task spawned and not yet reaped. A finished burst's
    /// task can still be mid-delivery when the next burst starts a new one,
    /// so `stop()` must await all of them, not just the newest.
    checkers: Mutex<Vec<JoinHandle<()>>>,
}

impl FolderWatch {
    pub fn new(
        name: impl Into<String>,
        inactivity_period: Duration,
        poll_tick: Duration,
        target: DeliveryTarget,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            inactivity_period,
            poll_tick,
            shared: Arc::new(Mutex::new(Shared {
                state: WatchState::Idle,
                last_activity: Instant::now(),
                last_activity_wall: None,
            })),
            stop_signal: Arc::new(Notify::new()),
            target: Arc::new(target),
            checkers: Mutex::new(Vec::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inactivity_period(&self) -> Duration {
        self.inactivity_period
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WatchState {
        self.shared.lock().state
    }

    /// Wall-clock time of the last qualifying event, if any.
    pub fn last_activity(&self) -> Option<jiff::Timestamp> {
        self.shared.lock().last_activity_wall
    }

    /// Feed one raw change event into the state machine.
    ///
    /// Non-qualifying events are ignored entirely. A qualifying event bumps
    /// `last_activity` and, when the watch is `Idle`, starts the checker
    /// task; when already `Monitoring`, only the timestamp moves.
    pub fn handle_event(self: &Arc<Self>, event: &ChangeEvent) {
        if !event.qualifies() {
            return;
        }

        let mut shared = self.shared.lock();
        match shared.state {
            WatchState::Stopped => return,
            WatchState::Monitoring => {
                shared.last_activity = Instant::now();
                shared.last_activity_wall = Some(jiff::Timestamp::now());
            }
            WatchState::Idle => {
                shared.last_activity = Instant::now();
                shared.last_activity_wall = Some(jiff::Timestamp::now());
                shared.state = WatchState::Monitoring;
                let mut checkers = self.checkers.lock();
                checkers.retain(|handle| !handle.is_finished());
                checkers.push(self.spawn_checker());
            }
        }
        tracing::info!("[{}] change detected: {}", self.name, event.path.display());
    }

    /// Stop the watch permanently.
    ///
    /// Transitions to `Stopped`, wakes the checkers, and waits for every
    /// spawned checker task — including one still finishing a delivery from
    /// an earlier burst — to terminate. Once this returns, no quiet signal
    /// for this watch will ever fire. A checker that is mid-sleep notices
    /// the transition within one poll tick.
    pub async fn stop(&self) {
        let handles = {
            let mut shared = self.shared.lock();
            shared.state = WatchState::Stopped;
            std::mem::take(&mut *self.checkers.lock())
        };
        self.stop_signal.notify_waiters();
        for handle in handles {
            let _ = handle.await;
        }
        tracing::debug!("[{}] watch stopped", self.name);
    }

    fn spawn_checker(&self) -> JoinHandle<()> {
        let shared = Arc::clone(&self.shared);
        let stop = Arc::clone(&self.stop_signal);
        let target = Arc::clone(&self.target);
        let tick = self.poll_tick;
        let period = self.inactivity_period;
        let name = self.name.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = stop.notified() => return,
                    _ = tokio::time::sleep(tick) => {}
                }

                // Reread last_activity under the lock so an event racing the
                // deadline defers the signal instead of firing stale.
                let fire = {
                    let mut shared = shared.lock();
                    match shared.state {
                        WatchState::Stopped | WatchState::Idle => return,
                        WatchState::Monitoring => {
                            if shared.last_activity.elapsed() >= period {
                                shared.state = WatchState::Idle;
                                true
                            } else {
                                false
                            }
                        }
                    }
                };

                if fire {
                    tracing::info!("[{name}] no changes detected for {}s", period.as_secs());
                    dispatch::deliver(&target).await;
                    return;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::channel::testing::{DelayedChannel, RecordingChannel};

    fn make_watch(
        period_secs: u64,
        tick_secs: u64,
        send_outcome: bool,
    ) -> (Arc<FolderWatch>, Arc<AtomicUsize>) {
        let channel = RecordingChannel::new(send_outcome);
        let count = channel.count.clone();
        let watch = FolderWatch::new(
            "w",
            Duration::from_secs(period_secs),
            Duration::from_secs(tick_secs),
            DeliveryTarget {
                folder: "w".to_string(),
                template: "Sync complete for {folder}".to_string(),
                channel: Box::new(channel),
            },
        );
        (watch, count)
    }

    fn file_event(name: &str) -> ChangeEvent {
        ChangeEvent {
            path: PathBuf::from("/watched").join(name),
            is_directory: false,
        }
    }

    async fn advance(d: Duration) {
        // Paused-clock sleep: wakes every timer due before the deadline.
        tokio::time::sleep(d).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_signal_fires_after_last_event_in_burst() {
        let (watch, count) = make_watch(5, 1, true);

        // Qualifying events at t=0, t=1, t=2.
        watch.handle_event(&file_event("a.txt"));
        advance(Duration::from_secs(1)).await;
        watch.handle_event(&file_event("b.txt"));
        advance(Duration::from_secs(1)).await;
        watch.handle_event(&file_event("c.txt"));

        // Nothing before t=7 (last event at t=2 plus 5s of quiet).
        advance(Duration::from_millis(4900)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(watch.state(), WatchState::Monitoring);

        // The tick at t=7 fires exactly one signal.
        advance(Duration::from_millis(1200)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(watch.state(), WatchState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_yields_exactly_one_signal() {
        let (watch, count) = make_watch(2, 1, true);

        for i in 0..25 {
            watch.handle_event(&file_event(&format!("f{i}.dat")));
        }

        advance(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(watch.state(), WatchState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_directory_and_hidden_events_ignored() {
        let (watch, count) = make_watch(1, 1, true);

        watch.handle_event(&ChangeEvent {
            path: PathBuf::from("/watched/subdir"),
            is_directory: true,
        });
        watch.handle_event(&file_event(".tmp-sync"));
        watch.handle_event(&ChangeEvent {
            path: PathBuf::from("/watched/nested/.hidden"),
            is_directory: false,
        });

        assert_eq!(watch.state(), WatchState::Idle);
        assert!(watch.last_activity().is_none());

        advance(Duration::from_secs(30)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_event_defers_the_signal() {
        let (watch, count) = make_watch(5, 1, true);

        watch.handle_event(&file_event("a.txt"));
        advance(Duration::from_millis(4500)).await;
        watch.handle_event(&file_event("b.txt"));

        // The old deadline (t=5) must not fire.
        advance(Duration::from_secs(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        // New deadline is t=9.5; the checker tick at t=10 fires it.
        advance(Duration::from_millis(5700)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_suppresses_pending_signal() {
        let (watch, count) = make_watch(2, 1, true);

        watch.handle_event(&file_event("a.txt"));
        assert_eq!(watch.state(), WatchState::Monitoring);

        watch.stop().await;
        assert_eq!(watch.state(), WatchState::Stopped);

        advance(Duration::from_secs(20)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        // Stopped is terminal: further events do nothing.
        watch.handle_event(&file_event("b.txt"));
        assert_eq!(watch.state(), WatchState::Stopped);
        advance(Duration::from_secs(20)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_waits_for_in_flight_delivery() {
        let channel = DelayedChannel::new(Duration::from_secs(30));
        let completed = channel.completed.clone();
        let watch = FolderWatch::new(
            "w",
            Duration::from_secs(1),
            Duration::from_secs(1),
            DeliveryTarget {
                folder: "w".to_string(),
                template: "{folder}".to_string(),
                channel: Box::new(channel),
            },
        );

        // First burst fires at t=1; the send is still in flight afterwards.
        watch.handle_event(&file_event("a.txt"));
        advance(Duration::from_millis(1500)).await;
        assert_eq!(watch.state(), WatchState::Idle);
        assert_eq!(completed.load(Ordering::SeqCst), 0);

        // A new burst starts a second checker while the first task is still
        // delivering.
        watch.handle_event(&file_event("b.txt"));
        assert_eq!(watch.state(), WatchState::Monitoring);

        // stop() must wait out the in-flight delivery too; once it returns
        // nothing lands afterwards.
        watch.stop().await;
        assert_eq!(completed.load(Ordering::SeqCst), 1);
        assert_eq!(watch.state(), WatchState::Stopped);

        advance(Duration::from_secs(120)).await;
        assert_eq!(completed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_from_idle_is_fine() {
        let (watch, count) = make_watch(1, 1, true);
        watch.stop().await;
        assert_eq!(watch.state(), WatchState::Stopped);
        advance(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_send_returns_to_idle_and_keeps_working() {
        let (watch, count) = make_watch(2, 1, false);

        watch.handle_event(&file_event("a.txt"));
        advance(Duration::from_millis(3500)).await;

        // Send failed, but the watch is back to Idle and keeps operating.
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(watch.state(), WatchState::Idle);

        watch.handle_event(&file_event("b.txt"));
        assert_eq!(watch.state(), WatchState::Monitoring);
        advance(Duration::from_millis(3500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_qualifies() {
        assert!(file_event("data.bin").qualifies());
        assert!(!file_event(".DS_Store").qualifies());
        assert!(
            !ChangeEvent {
                path: PathBuf::from("/watched/dir"),
                is_directory: true,
            }
            .qualifies()
        );
    }
}
