//! The cooperative driver: unit-of-work traversal with suspend/resume.
//!
//! A pass builds a work-in-progress fiber tree one unit at a time, yielding
//! between units whenever the current slice's deadline is close. Resumption
//! picks up exactly where the last unit left off; the traversal order is a
//! pure function of the tree shape, independent of where the yields land.
//! When the traversal completes with recorded effects, commit runs
//! synchronously in the same slice and the work-in-progress tree becomes the
//! new current tree.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::commit;
use crate::element::Element;
use crate::error::EngineError;
use crate::fiber::{EffectKind, Fiber, FiberArena, FiberId};
use crate::host::{HostBackend, HostNodeId};
use crate::idle::{Deadline, IdleScheduler, TaskHandle};
use crate::reconcile;

/// Phase of the driver's state machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SchedulerPhase {
    /// No root scheduled.
    #[default]
    Idle,
    /// Traversal in progress; a next unit of work exists.
    Working,
    /// Traversal finished with effects recorded; commit has not run yet.
    PendingCommit,
}

/// Tuning for the cooperative work loop.
#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// Slice length requested from the yield source when driving.
    pub budget_hint: Duration,
    /// Remaining-time floor below which the loop yields instead of starting
    /// another unit.
    pub yield_threshold: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            budget_hint: Duration::from_millis(8),
            yield_threshold: Duration::from_millis(1),
        }
    }
}

impl SchedulerConfig {
    pub fn with_budget_hint(mut self, budget_hint: Duration) -> Self {
        self.budget_hint = budget_hint;
        self
    }

    pub fn with_yield_threshold(mut self, yield_threshold: Duration) -> Self {
        self.yield_threshold = yield_threshold;
        self
    }
}

/// Counters for one reconciliation pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Units of work performed.
    pub units: usize,
    /// Fresh fibers created for placed positions.
    pub fibers_created: usize,
    /// Working copies created for reused positions.
    pub fibers_reused: usize,
    /// Old fibers marked for deletion.
    pub deletions_scheduled: usize,
    /// Times the driver yielded back to the host.
    pub yields: usize,
}

/// Counts of host mutations applied by one commit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CommitReport {
    pub placed: usize,
    pub updated: usize,
    pub deleted: usize,
}

/// What one driver slice accomplished.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SliceOutcome {
    /// Nothing was scheduled.
    Idle,
    /// The slice budget ran out with traversal still in progress.
    Yielded,
    /// Traversal completed and the pass committed.
    Committed(CommitReport),
    /// Traversal completed with an empty effect chain; nothing to commit and
    /// the current tree is unchanged.
    Unchanged,
}

/// What a single [`Scheduler::step`] accomplished.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// Nothing was scheduled.
    Idle,
    /// One unit of work was performed; traversal continues.
    Worked,
    /// Traversal is complete with effects recorded; commit may run.
    ReadyToCommit,
    /// Traversal completed with no effects; the pass was concluded in place.
    CleanPass,
}

/// An incremental reconciliation engine over one host container.
///
/// All state lives on the instance; independent schedulers never share
/// anything and can coexist over different containers.
pub struct Scheduler {
    arena: FiberArena,
    current_root: Option<FiberId>,
    wip_root: Option<FiberId>,
    next_unit: Option<FiberId>,
    pending_commit: Option<FiberId>,
    phase: SchedulerPhase,
    config: SchedulerConfig,
    pass: PassReport,
    passes: u64,
    last_error: Option<EngineError>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    pub fn with_config(config: SchedulerConfig) -> Self {
        Self {
            arena: FiberArena::new(),
            current_root: None,
            wip_root: None,
            next_unit: None,
            pending_commit: None,
            phase: SchedulerPhase::Idle,
            config,
            pass: PassReport::default(),
            passes: 0,
            last_error: None,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn phase(&self) -> SchedulerPhase {
        self.phase
    }

    /// Number of passes scheduled so far.
    pub fn pass_count(&self) -> u64 {
        self.passes
    }

    /// Counters for the in-flight (or most recently scheduled) pass.
    pub fn pass_report(&self) -> PassReport {
        self.pass
    }

    /// Fibers currently held by the arena, across both buffers.
    pub fn fiber_count(&self) -> usize {
        self.arena.len()
    }

    /// Length of the root effect chain. Meaningful once traversal has
    /// finished (the chain is still distributed across subtrees mid-pass).
    pub fn pending_effect_count(&self) -> usize {
        self.pending_commit
            .or(self.wip_root)
            .and_then(|root| self.arena.get(root))
            .map(|fiber| fiber.effects.len())
            .unwrap_or(0)
    }

    /// Error stashed by [`drive`] when a driven pass failed.
    pub fn take_last_error(&mut self) -> Option<EngineError> {
        self.last_error.take()
    }

    /// Begins (or restarts) a pass rendering `element` into `container`.
    ///
    /// Scheduling while a previous pass is mid-traversal discards that pass's
    /// work-in-progress tree wholesale; last write wins on the root
    /// reference. Safe to call from within a yield callback.
    pub fn schedule_root(&mut self, element: Element, container: HostNodeId) {
        if self.wip_root.is_some() {
            log::trace!("[SCHED] discarding in-flight pass {}", self.passes);
            self.abandon_pass();
        }
        let mut root = Fiber::root(container, self.current_root);
        root.pending_children = vec![element];
        let root = self.arena.insert(root);
        self.wip_root = Some(root);
        self.next_unit = Some(root);
        self.pending_commit = None;
        self.phase = SchedulerPhase::Working;
        self.passes += 1;
        self.pass = PassReport::default();
        log::trace!("[SCHED] pass {} scheduled, root {root:?}", self.passes);
    }

    /// Performs exactly one unit of work.
    pub fn step(&mut self, host: &mut dyn HostBackend) -> Result<StepOutcome, EngineError> {
        let Some(unit) = self.next_unit else {
            return Ok(match self.phase {
                SchedulerPhase::PendingCommit => StepOutcome::ReadyToCommit,
                _ => StepOutcome::Idle,
            });
        };
        self.pass.units += 1;
        match self.perform_unit_of_work(host, unit) {
            Ok(next) => {
                self.next_unit = next;
                if next.is_some() {
                    return Ok(StepOutcome::Worked);
                }
                if self.pending_commit.is_some() {
                    self.phase = SchedulerPhase::PendingCommit;
                    Ok(StepOutcome::ReadyToCommit)
                } else {
                    self.conclude_clean_pass();
                    Ok(StepOutcome::CleanPass)
                }
            }
            Err(err) => {
                log::warn!("[SCHED] pass {} abandoned: {err}", self.passes);
                self.abandon_pass();
                Err(err)
            }
        }
    }

    /// Runs units of work until the deadline nears, then yields. A traversal
    /// that completes within the slice commits synchronously in the same
    /// call; commit itself is never interrupted.
    pub fn run_slice(
        &mut self,
        host: &mut dyn HostBackend,
        deadline: &dyn Deadline,
    ) -> Result<SliceOutcome, EngineError> {
        if self.phase == SchedulerPhase::Idle {
            return Ok(SliceOutcome::Idle);
        }
        while self.phase == SchedulerPhase::Working {
            if deadline.time_remaining() <= self.config.yield_threshold {
                self.pass.yields += 1;
                log::trace!("[SCHED] yielding after {} units", self.pass.units);
                return Ok(SliceOutcome::Yielded);
            }
            self.step(host)?;
        }
        match self.phase {
            SchedulerPhase::PendingCommit => match self.commit_pending(host)? {
                Some(report) => Ok(SliceOutcome::Committed(report)),
                None => Ok(SliceOutcome::Unchanged),
            },
            _ => Ok(SliceOutcome::Unchanged),
        }
    }

    /// Applies the pending commit, if any, and advances the current tree.
    pub fn commit_pending(
        &mut self,
        host: &mut dyn HostBackend,
    ) -> Result<Option<CommitReport>, EngineError> {
        if self.phase != SchedulerPhase::PendingCommit {
            return Ok(None);
        }
        let Some(root) = self.pending_commit else {
            self.conclude_clean_pass();
            return Ok(None);
        };
        match commit::commit_root(&mut self.arena, host, root) {
            Ok(report) => {
                self.current_root = Some(root);
                self.wip_root = None;
                self.next_unit = None;
                self.pending_commit = None;
                self.phase = SchedulerPhase::Idle;
                self.relink_alternates(root);
                let reclaimed = self.arena.sweep(Some(root));
                log::debug!(
                    "[COMMIT] pass {} committed ({} placed, {} updated, {} deleted, {reclaimed} fibers reclaimed)",
                    self.passes,
                    report.placed,
                    report.updated,
                    report.deleted,
                );
                Ok(Some(report))
            }
            Err(err) => {
                log::warn!("[COMMIT] pass {} failed: {err}", self.passes);
                self.abandon_pass();
                Err(err)
            }
        }
    }

    /// Processes one fiber, then picks the next unit: the fiber's first child
    /// if it produced one, otherwise the nearest completed ancestor's sibling.
    /// Completion merges each subtree's effects upward; an ancestor ending up
    /// with a non-empty chain records the work-in-progress root as the
    /// pending-commit target.
    fn perform_unit_of_work(
        &mut self,
        host: &mut dyn HostBackend,
        unit: FiberId,
    ) -> Result<Option<FiberId>, EngineError> {
        reconcile::begin_work(&mut self.arena, host, unit, &mut self.pass)?;
        if let Some(child) = self.arena.get(unit).and_then(|fiber| fiber.first_child) {
            return Ok(Some(child));
        }
        let mut completed = unit;
        loop {
            self.complete_unit(completed);
            let (sibling, parent) = match self.arena.get(completed) {
                Some(fiber) => (fiber.next_sibling, fiber.parent),
                None => (None, None),
            };
            if let Some(sibling) = sibling {
                return Ok(Some(sibling));
            }
            match parent {
                Some(parent) => completed = parent,
                None => return Ok(None),
            }
        }
    }

    fn complete_unit(&mut self, id: FiberId) {
        let Some(parent) = self.arena.get(id).and_then(|fiber| fiber.parent) else {
            // The work-in-progress root itself completed.
            let has_effects = self
                .arena
                .get(id)
                .is_some_and(|fiber| !fiber.effects.is_empty());
            if has_effects {
                self.pending_commit = self.wip_root;
            }
            return;
        };
        let (mut effects, own_effect) = {
            let Some(fiber) = self.arena.get_mut(id) else {
                return;
            };
            (std::mem::take(&mut fiber.effects), fiber.effect)
        };
        if own_effect != EffectKind::None {
            effects.push(id);
        }
        if let Some(fiber) = self.arena.get_mut(parent) {
            fiber.effects.append(&mut effects);
            if !fiber.effects.is_empty() {
                self.pending_commit = self.wip_root;
            }
        }
    }

    /// Re-establishes symmetric alternate pairing from the just-committed
    /// tree, so the sweep keeps exactly the last committed pair of buffers.
    fn relink_alternates(&mut self, root: FiberId) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let (alternate, first_child, next_sibling) = match self.arena.get(id) {
                Some(fiber) => (fiber.alternate, fiber.first_child, fiber.next_sibling),
                None => continue,
            };
            if let Some(alternate) = alternate {
                if let Some(old) = self.arena.get_mut(alternate) {
                    old.alternate = Some(id);
                }
            }
            stack.extend([first_child, next_sibling].into_iter().flatten());
        }
    }

    /// Traversal finished without recording any effect: the committed tree is
    /// already what the caller asked for. Drop the work-in-progress tree.
    fn conclude_clean_pass(&mut self) {
        self.wip_root = None;
        self.next_unit = None;
        self.pending_commit = None;
        self.phase = SchedulerPhase::Idle;
        let reclaimed = self.arena.sweep(self.current_root);
        log::trace!(
            "[SCHED] pass {} concluded clean ({reclaimed} fibers reclaimed)",
            self.passes
        );
    }

    /// Drops the work-in-progress tree without committing. The current tree
    /// pointer stays where it was; deletion marks left on it are cleared so
    /// they cannot leak into the next pass.
    fn abandon_pass(&mut self) {
        self.wip_root = None;
        self.next_unit = None;
        self.pending_commit = None;
        self.phase = SchedulerPhase::Idle;
        self.arena.sweep(self.current_root);
        self.arena.clear_effect_marks();
    }
}

/// Attaches the scheduler's work loop to a cooperative yield source.
///
/// The scheduled callback runs one slice per grant and reschedules itself
/// until the scheduler goes idle. A failed pass is logged and stashed on the
/// scheduler ([`Scheduler::take_last_error`]); the callback then stops
/// rescheduling.
pub fn drive(
    scheduler: &Rc<RefCell<Scheduler>>,
    host: &Rc<RefCell<dyn HostBackend>>,
    idle: &mut dyn IdleScheduler,
) -> TaskHandle {
    let budget_hint = scheduler.borrow().config().budget_hint;
    let scheduler = Rc::clone(scheduler);
    let host = Rc::clone(host);
    idle.schedule(
        Box::new(move |deadline| {
            let mut scheduler = scheduler.borrow_mut();
            let mut host = host.borrow_mut();
            match scheduler.run_slice(&mut *host, deadline) {
                Ok(SliceOutcome::Yielded) => true,
                Ok(_) => scheduler.phase() == SchedulerPhase::Working,
                Err(err) => {
                    log::warn!("[SCHED] driven pass failed: {err}");
                    scheduler.last_error = Some(err);
                    false
                }
            }
        }),
        budget_hint,
    )
}
