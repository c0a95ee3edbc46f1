//! Incremental UI-tree reconciliation with cooperative time-sliced
//! scheduling.
//!
//! `weft` builds a work-in-progress fiber tree from an immutable element
//! description, diffs it against the previously committed tree through
//! double-buffered `alternate` links, and applies only the necessary
//! mutations to a host rendering surface. Traversal is interruptible between
//! units of work so a host runtime can reclaim control mid-pass; commit is
//! synchronous and never observable half-applied.
//!
//! The engine is generic over its surface: callers supply a [`HostBackend`]
//! for node creation and mutation and (optionally) an [`IdleScheduler`] as
//! the source of cooperative slices. See [`Scheduler`] for the driver and
//! [`create_element`]/[`create_text_element`] for building input trees.

mod commit;
mod element;
mod error;
mod fiber;
mod host;
mod idle;
mod reconcile;
mod scheduler;

pub use element::{
    create_element, create_text_element, Element, ElementKind, EventHandler, PropValue, Props,
    TEXT_PROP,
};
pub use error::EngineError;
pub use fiber::{EffectKind, FiberId, FiberKind};
pub use host::{HostBackend, HostError, HostNodeId};
#[cfg(any(test, feature = "test-support"))]
pub use host::test::{HostOp, TestBackend, TestNode};
pub use idle::{
    CountedDeadline, Deadline, IdleCallback, IdleScheduler, TaskHandle, TimerDeadline,
    TimerScheduler,
};
pub use scheduler::{
    drive, CommitReport, PassReport, Scheduler, SchedulerConfig, SchedulerPhase, SliceOutcome,
    StepOutcome,
};
