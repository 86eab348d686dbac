// ABOUTME: Clock and timer abstraction injected into the engine
// ABOUTME: Includes a manually advanced scheduler for deterministic timer tests

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Handle of a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

/// What a timer is for. The engine routes expiries by kind and ignores any
/// expiry whose id it no longer tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    BindTimeout,
    EnquireLink,
    ResponseTimeout(u32),
}

/// Clock plus schedule-after / cancel, as seen by the engine.
///
/// Expiry is delivered by whoever drives the engine, by calling
/// `SmppEngine::timer_fired` with the id and kind returned here.
pub trait Scheduler: Send {
    fn now(&self) -> Instant;

    fn schedule(&mut self, kind: TimerKind, after: Duration) -> TimerId;

    /// Cancelling an unknown or already fired timer is a no-op
    fn cancel(&mut self, id: TimerId);
}

#[derive(Debug)]
struct ManualState {
    now: Instant,
    next_id: u64,
    // Keyed by (deadline, id) so equal deadlines fire in scheduling order
    timers: BTreeMap<(Instant, TimerId), TimerKind>,
}

/// Scheduler whose clock only moves when told to.
///
/// Clones share state, so a test can keep one handle while the engine owns
/// another.
#[derive(Debug, Clone)]
pub struct ManualScheduler {
    state: Arc<Mutex<ManualState>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ManualState {
                now: Instant::now(),
                next_id: 0,
                timers: BTreeMap::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ManualState> {
        // A panic while holding the lock can only come from a failing test
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Move the clock forward by `by`, invoking `fire` for every timer that
    /// falls due, in deadline order. Timers scheduled from inside `fire`
    /// fire in the same call if their deadline is within the window.
    pub fn advance<F>(&self, by: Duration, mut fire: F)
    where
        F: FnMut(TimerId, TimerKind),
    {
        let target = self.lock().now + by;
        loop {
            let due = {
                let mut state = self.lock();
                let next = state
                    .timers
                    .keys()
                    .next()
                    .copied()
                    .filter(|(deadline, _)| *deadline <= target);
                match next {
                    Some(key) => {
                        let kind = state.timers.remove(&key);
                        state.now = key.0;
                        kind.map(|kind| (key.1, kind))
                    }
                    None => None,
                }
            };

            match due {
                Some((id, kind)) => fire(id, kind),
                None => break,
            }
        }
        self.lock().now = target;
    }

    /// Number of timers still scheduled
    pub fn pending(&self) -> usize {
        self.lock().timers.len()
    }

    pub fn is_scheduled(&self, kind: TimerKind) -> bool {
        self.lock().timers.values().any(|k| *k == kind)
    }
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for ManualScheduler {
    fn now(&self) -> Instant {
        self.lock().now
    }

    fn schedule(&mut self, kind: TimerKind, after: Duration) -> TimerId {
        let mut state = self.lock();
        state.next_id += 1;
        let id = TimerId(state.next_id);
        let deadline = state.now + after;
        state.timers.insert((deadline, id), kind);
        id
    }

    fn cancel(&mut self, id: TimerId) {
        self.lock().timers.retain(|(_, timer), _| *timer != id);
    }
}
