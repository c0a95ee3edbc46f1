//! The cooperative-yield capability the work loop runs against.
//!
//! The scheduler core depends only on [`Deadline`] and [`IdleScheduler`]; any
//! host runtime's idle-callback primitive can stand behind them, and the
//! timer-based [`TimerScheduler`] is the portable default. Substituting one
//! source of slices for another never changes traversal behavior, only where
//! the yield points land.

use std::cell::Cell;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use rustc_hash::FxHashSet;

/// Reports how much of the current cooperative slice remains.
pub trait Deadline {
    fn time_remaining(&self) -> Duration;
}

/// Deadline measured against a wall-clock expiry.
pub struct TimerDeadline {
    expires_at: Instant,
}

impl TimerDeadline {
    /// Creates a deadline expiring `budget` from now.
    pub fn after(budget: Duration) -> Self {
        Self {
            expires_at: Instant::now() + budget,
        }
    }
}

impl Deadline for TimerDeadline {
    fn time_remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}

/// Deadline that grants a fixed number of budget queries before expiring.
///
/// The work loop queries the deadline once per unit of work, so
/// `CountedDeadline::new(1)` forces a yield after every unit. Deterministic
/// regardless of wall-clock speed.
pub struct CountedDeadline {
    remaining: Cell<u32>,
}

impl CountedDeadline {
    pub fn new(units: u32) -> Self {
        Self {
            remaining: Cell::new(units),
        }
    }
}

impl Deadline for CountedDeadline {
    fn time_remaining(&self) -> Duration {
        let remaining = self.remaining.get();
        if remaining == 0 {
            Duration::ZERO
        } else {
            self.remaining.set(remaining - 1);
            Duration::from_secs(1)
        }
    }
}

/// Handle identifying a scheduled callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TaskHandle(u64);

/// Work callback granted one slice per invocation; returns `true` to be
/// rescheduled for another.
pub type IdleCallback = Box<dyn FnMut(&dyn Deadline) -> bool>;

/// Cooperative-yield capability supplied by the host runtime.
pub trait IdleScheduler {
    /// Schedules `callback` to run when idle time is next available, with
    /// `budget_hint` as the requested slice length.
    fn schedule(&mut self, callback: IdleCallback, budget_hint: Duration) -> TaskHandle;

    /// Cancels a scheduled callback. Cancelling an already-finished handle is
    /// a no-op.
    fn cancel(&mut self, handle: TaskHandle);
}

struct ScheduledTask {
    handle: TaskHandle,
    budget: Duration,
    callback: IdleCallback,
}

/// Timer-based default: grants fixed-budget slices from a FIFO queue.
#[derive(Default)]
pub struct TimerScheduler {
    queue: VecDeque<ScheduledTask>,
    cancelled: FxHashSet<TaskHandle>,
    next_handle: u64,
}

impl TimerScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs queued callbacks, granting each a timer slice of its requested
    /// budget, until no callback asks to run again.
    pub fn run_until_idle(&mut self) {
        while let Some(mut task) = self.queue.pop_front() {
            if self.cancelled.remove(&task.handle) {
                continue;
            }
            let deadline = TimerDeadline::after(task.budget);
            if (task.callback)(&deadline) {
                self.queue.push_back(task);
            }
        }
    }
}

impl IdleScheduler for TimerScheduler {
    fn schedule(&mut self, callback: IdleCallback, budget_hint: Duration) -> TaskHandle {
        let handle = TaskHandle(self.next_handle);
        self.next_handle += 1;
        self.queue.push_back(ScheduledTask {
            handle,
            budget: budget_hint,
            callback,
        });
        handle
    }

    fn cancel(&mut self, handle: TaskHandle) {
        self.cancelled.insert(handle);
    }
}
