//! Per-fiber work: instance materialization and child reconciliation.
//!
//! `begin_work` runs exactly once per fiber per pass. Child reconciliation is
//! a single pass pairing the new element list against the old sibling chain
//! by position and kind; a reorder without that pairing holding degrades to
//! delete-and-recreate. Keys are carried but deliberately not matched on,
//! which keeps the walk O(n) and the effect ordering position-stable.

use crate::element::{Element, ElementKind, Props, TEXT_PROP};
use crate::error::EngineError;
use crate::fiber::{EffectKind, Fiber, FiberArena, FiberId, FiberKind};
use crate::host::{apply_props, HostBackend};
use crate::scheduler::PassReport;

/// Processes one fiber: materializes its host instance if needed and builds
/// its child chain from the pending element children.
pub(crate) fn begin_work(
    arena: &mut FiberArena,
    host: &mut dyn HostBackend,
    unit: FiberId,
    pass: &mut PassReport,
) -> Result<(), EngineError> {
    let Some(kind) = arena.get(unit).map(|fiber| fiber.kind) else {
        return Ok(());
    };
    match kind {
        FiberKind::Root => reconcile_children(arena, unit, pass),
        FiberKind::Host => {
            materialize(arena, host, unit)?;
            reconcile_children(arena, unit, pass);
        }
        FiberKind::Text => materialize(arena, host, unit)?,
    }
    Ok(())
}

/// Creates the detached host instance for a fiber that has none yet, applying
/// its initial props. Runs during the work phase so that by commit time every
/// placed fiber's parent instance already exists, even when the parent's own
/// place effect has not been applied yet.
fn materialize(
    arena: &mut FiberArena,
    host: &mut dyn HostBackend,
    unit: FiberId,
) -> Result<(), EngineError> {
    let (element_kind, props) = {
        let Some(fiber) = arena.get(unit) else {
            return Ok(());
        };
        if fiber.host.is_some() {
            return Ok(());
        }
        (fiber.element_kind.clone(), fiber.pending_props.clone())
    };

    let instance = match element_kind {
        Some(ElementKind::Host(tag)) => {
            if tag.is_empty() {
                return Err(EngineError::MalformedElement("host element tag is empty"));
            }
            let node = host.create_node(&tag)?;
            apply_props(host, node, &Props::default(), &props)?;
            node
        }
        Some(ElementKind::Text) => host.create_text(props.str(TEXT_PROP).unwrap_or(""))?,
        None => {
            return Err(EngineError::MalformedElement(
                "fiber has no instantiation rule",
            ));
        }
    };

    if let Some(fiber) = arena.get_mut(unit) {
        fiber.host = Some(instance);
    }
    log::trace!("[RECONCILE] materialized {instance:?} for {unit:?}");
    Ok(())
}

/// Walks the new element list and the old sibling chain in lockstep,
/// producing the work-in-progress child chain.
///
/// At each position: matching kinds reuse the old fiber through a fresh
/// working copy; a new element without a compatible predecessor is placed; an
/// old fiber with no compatible successor is marked deleted and recorded on
/// the parent's effect list at the position it was discovered. Deleted fibers
/// never join the new chain.
fn reconcile_children(arena: &mut FiberArena, parent: FiberId, pass: &mut PassReport) {
    let mut elements = {
        let Some(fiber) = arena.get_mut(parent) else {
            return;
        };
        std::mem::take(&mut fiber.pending_children)
    };
    let mut old_child = arena
        .get(parent)
        .and_then(|fiber| fiber.alternate)
        .and_then(|alternate| arena.get(alternate))
        .and_then(|alternate| alternate.first_child);
    let mut previous: Option<FiberId> = None;

    for element in elements.drain(..) {
        let next_old = old_child
            .and_then(|id| arena.get(id))
            .and_then(|fiber| fiber.next_sibling);
        let Element {
            kind,
            key,
            props,
            children,
        } = element;

        // Snapshot what a reuse needs from the old occupant before mutating
        // the arena.
        let reusable = old_child.and_then(|old| {
            let old_fiber = arena.get(old)?;
            (old_fiber.element_kind.as_ref() == Some(&kind)).then(|| {
                (
                    old,
                    old_fiber.kind,
                    old_fiber.host,
                    old_fiber.committed_props.clone(),
                )
            })
        });

        let child = match reusable {
            Some((old, fiber_kind, instance, committed)) => {
                let effect = if props == committed {
                    EffectKind::None
                } else {
                    EffectKind::Update
                };
                let fiber = Fiber {
                    kind: fiber_kind,
                    element_kind: Some(kind),
                    key,
                    host: instance,
                    pending_props: props,
                    committed_props: committed,
                    pending_children: children,
                    parent: Some(parent),
                    first_child: None,
                    next_sibling: None,
                    alternate: Some(old),
                    effect,
                    effects: Vec::new(),
                };
                pass.fibers_reused += 1;
                arena.insert(fiber)
            }
            None => {
                if let Some(old) = old_child {
                    mark_deleted(arena, parent, old, pass);
                }
                let fiber = Fiber {
                    kind: match kind {
                        ElementKind::Host(_) => FiberKind::Host,
                        ElementKind::Text => FiberKind::Text,
                    },
                    element_kind: Some(kind),
                    key,
                    host: None,
                    pending_props: props,
                    committed_props: Props::default(),
                    pending_children: children,
                    parent: Some(parent),
                    first_child: None,
                    next_sibling: None,
                    alternate: None,
                    effect: EffectKind::Place,
                    effects: Vec::new(),
                };
                pass.fibers_created += 1;
                arena.insert(fiber)
            }
        };

        match previous {
            None => {
                if let Some(fiber) = arena.get_mut(parent) {
                    fiber.first_child = Some(child);
                }
            }
            Some(previous) => {
                if let Some(fiber) = arena.get_mut(previous) {
                    fiber.next_sibling = Some(child);
                }
            }
        }
        previous = Some(child);
        old_child = next_old;
    }

    // Old occupants past the end of the new list.
    while let Some(old) = old_child {
        let next = arena.get(old).and_then(|fiber| fiber.next_sibling);
        mark_deleted(arena, parent, old, pass);
        old_child = next;
    }
}

fn mark_deleted(arena: &mut FiberArena, parent: FiberId, old: FiberId, pass: &mut PassReport) {
    let Some(fiber) = arena.get_mut(old) else {
        return;
    };
    fiber.effect = EffectKind::Delete;
    if let Some(fiber) = arena.get_mut(parent) {
        fiber.effects.push(old);
    }
    pass.deletions_scheduled += 1;
    log::trace!("[RECONCILE] delete scheduled for {old:?} under {parent:?}");
}
