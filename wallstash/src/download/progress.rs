//! Per-reference transfer state, observable by consumers.
//!
//! Running attempts report [`TransferEvent`]s; the tracker folds them into a
//! [`TransferState`] per reference and republishes every visible change on a
//! broadcast channel. Consumers either poll [`ProgressTracker::state`] or
//! [`subscribe`](ProgressTracker::subscribe).
//!
//! Each reference remembers the attempt that currently owns it. Events from
//! any other attempt (a cancelled one, or one superseded by a retry) are
//! dropped, so a late chunk callback can never resurrect a cancelled
//! download or move progress backwards.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, trace};

use super::state::{AttemptId, StatusUpdate, TransferEvent, TransferEventKind, TransferState};

/// Default capacity of the update channel.
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug)]
struct Record {
    state: TransferState,
    attempt: AttemptId,
}

/// Tracks download state for every reference the coordinator has touched.
#[derive(Debug)]
pub struct ProgressTracker {
    records: Mutex<HashMap<String, Record>>,
    next_attempt: AtomicU64,
    updates: broadcast::Sender<StatusUpdate>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    /// Create a tracker with the default update channel capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a tracker whose update channel buffers `capacity` messages.
    ///
    /// Slow subscribers that fall further behind observe
    /// `RecvError::Lagged` and skip ahead.
    pub fn with_capacity(capacity: usize) -> Self {
        let (updates, _) = broadcast::channel(capacity.max(1));
        Self {
            records: Mutex::new(HashMap::new()),
            next_attempt: AtomicU64::new(1),
            updates,
        }
    }

    /// Receive every state change from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusUpdate> {
        self.updates.subscribe()
    }

    /// Current state of `reference`; `NotStarted` if never seen.
    pub fn state(&self, reference: &str) -> TransferState {
        self.records
            .lock()
            .get(reference)
            .map(|r| r.state.clone())
            .unwrap_or_default()
    }

    /// Current progress fraction of `reference`.
    pub fn progress(&self, reference: &str) -> f64 {
        self.state(reference).progress()
    }

    /// All tracked references and their states, sorted by reference.
    pub fn snapshot(&self) -> Vec<(String, TransferState)> {
        let mut all: Vec<_> = self
            .records
            .lock()
            .iter()
            .map(|(reference, record)| (reference.clone(), record.state.clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    /// Start a new attempt for `reference`.
    ///
    /// The state becomes `Downloading` at 0.0 and any earlier attempt for the
    /// same reference is superseded.
    pub fn begin_attempt(&self, reference: &str) -> AttemptId {
        let attempt = self.fresh_attempt();
        self.set(reference, attempt, TransferState::Downloading { progress: 0.0 });
        debug!(reference = %reference, attempt = %attempt, "Attempt started");
        attempt
    }

    /// Apply an event from a running attempt.
    ///
    /// Returns `false` if the event was discarded as stale or redundant.
    pub fn apply(&self, event: TransferEvent) -> bool {
        let update = {
            let mut records = self.records.lock();
            let Some(record) = records.get_mut(&event.reference) else {
                trace!(reference = %event.reference, "Event for unknown reference discarded");
                return false;
            };
            if record.attempt != event.attempt {
                trace!(
                    reference = %event.reference,
                    event_attempt = %event.attempt,
                    current_attempt = %record.attempt,
                    "Stale event discarded"
                );
                return false;
            }
            let TransferState::Downloading { progress: current } = record.state else {
                return false;
            };

            let next = match event.kind {
                TransferEventKind::Progress(fraction) => {
                    let fraction = if fraction.is_finite() {
                        fraction.clamp(0.0, 1.0)
                    } else {
                        0.0
                    };
                    if fraction <= current {
                        return false;
                    }
                    TransferState::Downloading { progress: fraction }
                }
                TransferEventKind::Completed => TransferState::Completed,
                TransferEventKind::Failed(reason) => TransferState::Failed { reason },
            };
            record.state = next.clone();
            StatusUpdate {
                reference: event.reference,
                state: next,
            }
        };

        self.publish(update);
        true
    }

    /// Record that `reference` is already cached.
    ///
    /// Supersedes any running attempt.
    pub fn mark_completed(&self, reference: &str) {
        let attempt = self.fresh_attempt();
        self.set(reference, attempt, TransferState::Completed);
    }

    /// Abandon the running attempt for `reference`.
    ///
    /// The state returns to `NotStarted` and the record is dropped. Returns
    /// `false` if nothing was running.
    pub fn cancel(&self, reference: &str) -> bool {
        self.stop(reference, None, TransferState::NotStarted)
    }

    /// Like [`cancel`](Self::cancel), but leaves the state `Paused`.
    pub fn pause(&self, reference: &str) -> bool {
        self.stop(reference, None, TransferState::Paused)
    }

    /// Stop `reference` only if `attempt` still owns it.
    ///
    /// A newer attempt that replaced `attempt` is left untouched.
    pub(crate) fn stop_attempt(
        &self,
        reference: &str,
        attempt: AttemptId,
        state: TransferState,
    ) -> bool {
        self.stop(reference, Some(attempt), state)
    }

    /// Forget `reference` entirely (e.g. after its artifact was deleted).
    pub fn forget(&self, reference: &str) {
        let removed = self.records.lock().remove(reference).is_some();
        if removed {
            self.publish(StatusUpdate {
                reference: reference.to_string(),
                state: TransferState::NotStarted,
            });
        }
    }

    /// Number of references with a tracked state.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether no reference has a tracked state.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    fn stop(&self, reference: &str, owner: Option<AttemptId>, state: TransferState) -> bool {
        {
            let mut records = self.records.lock();
            let Some(record) = records.get_mut(reference) else {
                return false;
            };
            if !record.state.is_active() || owner.is_some_and(|owner| owner != record.attempt) {
                return false;
            }

            if state == TransferState::NotStarted {
                // Events from the stopped attempt find no record and drop
                records.remove(reference);
            } else {
                // A fresh id no attempt owns, so late events from the stopped one drop
                record.attempt = self.fresh_attempt();
                record.state = state.clone();
            }
        }

        self.publish(StatusUpdate {
            reference: reference.to_string(),
            state,
        });
        true
    }

    fn set(&self, reference: &str, attempt: AttemptId, state: TransferState) {
        let changed = {
            let mut records = self.records.lock();
            let record = records.entry(reference.to_string()).or_insert(Record {
                state: TransferState::NotStarted,
                attempt,
            });
            let changed = record.state != state;
            record.state = state.clone();
            record.attempt = attempt;
            changed
        };

        if changed {
            self.publish(StatusUpdate {
                reference: reference.to_string(),
                state,
            });
        }
    }

    fn fresh_attempt(&self) -> AttemptId {
        AttemptId(self.next_attempt.fetch_add(1, Ordering::Relaxed))
    }

    fn publish(&self, update: StatusUpdate) {
        // No subscribers is fine
        let _ = self.updates.send(update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut broadcast::Receiver<StatusUpdate>) -> Vec<TransferState> {
        let mut states = Vec::new();
        while let Ok(update) = rx.try_recv() {
            states.push(update.state);
        }
        states
    }

    #[test]
    fn test_unknown_reference_is_not_started() {
        let tracker = ProgressTracker::new();
        assert_eq!(tracker.state("42"), TransferState::NotStarted);
        assert_eq!(tracker.progress("42"), 0.0);
    }

    #[test]
    fn test_progress_is_monotonic() {
        let tracker = ProgressTracker::new();
        let mut rx = tracker.subscribe();
        let attempt = tracker.begin_attempt("42");

        for fraction in [0.1, 0.3, 0.3, 0.7, 0.2, 1.0] {
            tracker.apply(TransferEvent::progress("42", attempt, fraction));
        }
        tracker.apply(TransferEvent::completed("42", attempt));

        let states = drain(&mut rx);
        let fractions: Vec<f64> = states
            .iter()
            .filter_map(|s| match s {
                TransferState::Downloading { progress } => Some(*progress),
                _ => None,
            })
            .collect();
        assert_eq!(fractions, vec![0.0, 0.1, 0.3, 0.7, 1.0]);
        assert_eq!(states.last(), Some(&TransferState::Completed));
    }

    #[test]
    fn test_new_attempt_resets_progress() {
        let tracker = ProgressTracker::new();
        let first = tracker.begin_attempt("42");
        tracker.apply(TransferEvent::progress("42", first, 0.8));
        tracker.apply(TransferEvent::failed("42", first, "connection reset"));
        assert_eq!(
            tracker.state("42"),
            TransferState::Failed {
                reason: "connection reset".into()
            }
        );

        let second = tracker.begin_attempt("42");
        assert_ne!(first, second);
        assert_eq!(tracker.progress("42"), 0.0);

        // Late events from the first attempt are ignored
        assert!(!tracker.apply(TransferEvent::progress("42", first, 0.9)));
        assert_eq!(tracker.progress("42"), 0.0);
    }

    #[test]
    fn test_events_after_cancel_are_discarded() {
        let tracker = ProgressTracker::new();
        let attempt = tracker.begin_attempt("42");
        tracker.apply(TransferEvent::progress("42", attempt, 0.5));

        assert!(tracker.cancel("42"));
        assert_eq!(tracker.state("42"), TransferState::NotStarted);

        assert!(!tracker.apply(TransferEvent::progress("42", attempt, 0.6)));
        assert!(!tracker.apply(TransferEvent::completed("42", attempt)));
        assert_eq!(tracker.state("42"), TransferState::NotStarted);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_stop_attempt_spares_newer_attempt() {
        let tracker = ProgressTracker::new();
        let old = tracker.begin_attempt("42");
        let current = tracker.begin_attempt("42");

        assert!(!tracker.stop_attempt("42", old, TransferState::NotStarted));
        assert!(!tracker.stop_attempt("42", old, TransferState::Paused));
        assert_eq!(
            tracker.state("42"),
            TransferState::Downloading { progress: 0.0 }
        );

        assert!(tracker.apply(TransferEvent::progress("42", current, 0.5)));
        assert!(tracker.apply(TransferEvent::completed("42", current)));
        assert_eq!(tracker.state("42"), TransferState::Completed);
    }

    #[test]
    fn test_stop_attempt_stops_owner() {
        let tracker = ProgressTracker::new();
        let attempt = tracker.begin_attempt("42");
        let mut rx = tracker.subscribe();

        assert!(tracker.stop_attempt("42", attempt, TransferState::Paused));
        assert_eq!(tracker.state("42"), TransferState::Paused);
        assert_eq!(drain(&mut rx), vec![TransferState::Paused]);
        assert!(!tracker.apply(TransferEvent::completed("42", attempt)));
    }

    #[test]
    fn test_cancel_idle_reference_is_noop() {
        let tracker = ProgressTracker::new();
        assert!(!tracker.cancel("42"));

        tracker.mark_completed("42");
        assert!(!tracker.cancel("42"));
        assert_eq!(tracker.state("42"), TransferState::Completed);
    }

    #[test]
    fn test_pause_leaves_paused_state() {
        let tracker = ProgressTracker::new();
        let attempt = tracker.begin_attempt("42");
        assert!(tracker.pause("42"));
        assert_eq!(tracker.state("42"), TransferState::Paused);
        assert!(!tracker.apply(TransferEvent::progress("42", attempt, 0.5)));
    }

    #[test]
    fn test_terminal_state_ignores_further_events() {
        let tracker = ProgressTracker::new();
        let attempt = tracker.begin_attempt("42");
        tracker.apply(TransferEvent::completed("42", attempt));

        assert!(!tracker.apply(TransferEvent::failed("42", attempt, "late")));
        assert_eq!(tracker.state("42"), TransferState::Completed);
    }

    #[test]
    fn test_non_finite_progress_clamped() {
        let tracker = ProgressTracker::new();
        let attempt = tracker.begin_attempt("42");
        assert!(!tracker.apply(TransferEvent::progress("42", attempt, f64::NAN)));
        assert!(tracker.apply(TransferEvent::progress("42", attempt, 7.5)));
        assert_eq!(tracker.progress("42"), 1.0);
    }

    #[test]
    fn test_snapshot_and_forget() {
        let tracker = ProgressTracker::new();
        tracker.begin_attempt("b");
        tracker.mark_completed("a");

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].0, "a");

        tracker.forget("a");
        assert_eq!(tracker.snapshot().len(), 1);
        assert_eq!(tracker.state("a"), TransferState::NotStarted);
    }
}
