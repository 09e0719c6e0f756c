//! Re-armable inactivity timer for Tranquil.
//!
//! A single-shot timer that expires a session after a period with no
//! recorded activity. Every user interaction re-arms it; logout cancels it.
//!
//! # Generations
//!
//! Re-arming and firing can interleave in any order: a scheduled expiry may
//! already be on its way to the owner when the user taps the screen and the
//! timer is re-armed. To keep that race harmless, every [`arm`] and
//! [`cancel`] bumps a generation counter, and every scheduled expiry
//! carries the generation it was armed under:
//!
//! ```text
//! arm()    → gen 1, schedule Expiry{1} at t+T
//! arm()    → gen 2, abort Expiry{1}, schedule Expiry{2} at t'+T
//! Expiry{1} arrives anyway (sent before the abort) → claim() = false
//! Expiry{2} arrives → claim() = true, timer disarmed
//! Expiry{2} arrives again → claim() = false
//! ```
//!
//! The owner calls [`claim`] when it *processes* an expiry, not when the
//! task sends it. Only a claim that matches the current generation of an
//! armed timer counts, so each arm yields at most one honoured expiry.
//!
//! # Integration
//!
//! The timer delivers expiries through a callback, which typically forwards
//! into the owner's event channel:
//!
//! ```ignore
//! let timer = InactivityTimer::new(timeout, move |expiry| {
//!     let _ = events_tx.send(Event::Expired(expiry));
//! });
//! // later, in the owner's loop:
//! Event::Expired(expiry) if timer.claim(expiry) => logout(Timeout),
//! ```
//!
//! [`arm`]: InactivityTimer::arm
//! [`cancel`]: InactivityTimer::cancel
//! [`claim`]: InactivityTimer::claim

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace};

// ---------------------------------------------------------------------------
// Expiry
// ---------------------------------------------------------------------------

/// An expiry delivered by a scheduled timer task.
///
/// Only meaningful to the timer that produced it, via
/// [`InactivityTimer::claim`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Expiry {
    /// Generation the timer was armed under when this expiry was scheduled.
    pub generation: u64,
}

/// Callback that receives scheduled expiries.
type ExpirySink = Arc<dyn Fn(Expiry) + Send + Sync + 'static>;

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Counters describing what the timer has done so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimerStats {
    /// Times the timer was armed (including re-arms).
    pub arms: u64,
    /// Times the timer was cancelled.
    pub cancels: u64,
    /// Expiries that were honoured by [`InactivityTimer::claim`].
    pub expiries: u64,
    /// Expiries that arrived stale and were ignored.
    pub stale: u64,
}

// ---------------------------------------------------------------------------
// Timer
// ---------------------------------------------------------------------------

/// A single-shot, re-armable timer with generation-tagged expiries.
///
/// Not shared: one owner (the session manager's task) holds it by value and
/// drives it through `&mut self`. Must be armed from inside a Tokio runtime.
pub struct InactivityTimer {
    duration: Duration,
    generation: u64,
    armed: bool,
    deadline: Option<TokioInstant>,
    task: Option<JoinHandle<()>>,
    on_expire: ExpirySink,
    stats: TimerStats,
}

impl InactivityTimer {
    /// Creates a disarmed timer that will expire `duration` after each arm.
    pub fn new<F>(duration: Duration, on_expire: F) -> Self
    where
        F: Fn(Expiry) + Send + Sync + 'static,
    {
        Self {
            duration,
            generation: 0,
            armed: false,
            deadline: None,
            task: None,
            on_expire: Arc::new(on_expire),
            stats: TimerStats::default(),
        }
    }

    /// Arms (or re-arms) the timer for the configured duration.
    ///
    /// Any previously scheduled expiry is aborted and, should it still
    /// arrive, will be rejected by [`claim`](Self::claim). Returns the new
    /// generation.
    pub fn arm(&mut self) -> u64 {
        self.arm_for(self.duration)
    }

    /// Arms (or re-arms) the timer for a one-off `duration`.
    pub fn arm_for(&mut self, duration: Duration) -> u64 {
        self.abort_task();
        self.generation += 1;
        self.armed = true;
        self.stats.arms += 1;

        let generation = self.generation;
        let deadline = TokioInstant::now() + duration;
        let on_expire = Arc::clone(&self.on_expire);
        self.deadline = Some(deadline);
        self.task = Some(tokio::spawn(async move {
            time::sleep_until(deadline).await;
            trace!(generation, "inactivity timer fired");
            on_expire(Expiry { generation });
        }));

        debug!(
            generation,
            timeout_ms = duration.as_millis() as u64,
            "inactivity timer armed"
        );
        generation
    }

    /// Cancels the timer without scheduling a new expiry.
    ///
    /// Bumps the generation so any expiry already in flight is stale.
    /// Safe to call when not armed.
    pub fn cancel(&mut self) {
        self.abort_task();
        self.generation += 1;
        self.stats.cancels += 1;
        if self.armed {
            debug!(generation = self.generation, "inactivity timer cancelled");
        }
        self.armed = false;
        self.deadline = None;
    }

    /// Decides whether a delivered expiry should be acted on.
    ///
    /// Returns `true` exactly once per arm: when `expiry` carries the current
    /// generation and the timer is still armed. The timer is disarmed as a
    /// side effect. Every other expiry is stale and returns `false`.
    pub fn claim(&mut self, expiry: Expiry) -> bool {
        if self.armed && expiry.generation == self.generation {
            self.armed = false;
            self.deadline = None;
            self.abort_task();
            self.stats.expiries += 1;
            debug!(generation = expiry.generation, "inactivity timer expired");
            true
        } else {
            self.stats.stale += 1;
            trace!(
                stale = expiry.generation,
                current = self.generation,
                armed = self.armed,
                "ignoring stale expiry"
            );
            false
        }
    }

    /// Whether an expiry is currently scheduled and unclaimed.
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// The current generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The configured duration used by [`arm`](Self::arm).
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Changes the duration used by future arms. Does not affect an expiry
    /// that is already scheduled.
    pub fn set_duration(&mut self, duration: Duration) {
        self.duration = duration;
    }

    /// When the scheduled expiry is due, if armed.
    pub fn deadline(&self) -> Option<TokioInstant> {
        self.deadline
    }

    /// Time left until the scheduled expiry, if armed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(TokioInstant::now()))
    }

    /// Snapshot of the timer's counters.
    pub fn stats(&self) -> &TimerStats {
        &self.stats
    }

    fn abort_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl fmt::Debug for InactivityTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InactivityTimer")
            .field("duration", &self.duration)
            .field("generation", &self.generation)
            .field("armed", &self.armed)
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

impl Drop for InactivityTimer {
    fn drop(&mut self) {
        self.abort_task();
    }
}
