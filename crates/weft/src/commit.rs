//! Synchronous application of a pass's collected effects.
//!
//! Commit is the only phase that mutates the attached host tree. It walks the
//! root's effect list in order and is never interrupted, so partial
//! application is observable only if a host primitive fails; in that case the
//! error propagates and mutations already applied stay applied.

use crate::error::EngineError;
use crate::fiber::{EffectKind, FiberArena, FiberId};
use crate::host::{apply_props, HostBackend, HostNodeId};
use crate::scheduler::CommitReport;

/// Applies every effect collected under `root`, clearing each fiber's effect
/// mark as it goes. The drained effect list is never replayed.
pub(crate) fn commit_root(
    arena: &mut FiberArena,
    host: &mut dyn HostBackend,
    root: FiberId,
) -> Result<CommitReport, EngineError> {
    let effects = match arena.get_mut(root) {
        Some(fiber) => std::mem::take(&mut fiber.effects),
        None => Vec::new(),
    };
    log::trace!("[COMMIT] applying {} effects under {root:?}", effects.len());

    let mut report = CommitReport::default();
    for id in effects {
        apply_effect(arena, host, id, &mut report)?;
        if let Some(fiber) = arena.get_mut(id) {
            fiber.effect = EffectKind::None;
        }
    }
    Ok(report)
}

fn apply_effect(
    arena: &mut FiberArena,
    host: &mut dyn HostBackend,
    id: FiberId,
    report: &mut CommitReport,
) -> Result<(), EngineError> {
    let effect = arena.get(id).map(|fiber| fiber.effect).unwrap_or_default();
    match effect {
        EffectKind::None => {}
        EffectKind::Place => {
            let Some(instance) = arena.get(id).and_then(|fiber| fiber.host) else {
                return Ok(());
            };
            let Some(target) = host_parent(arena, id) else {
                return Ok(());
            };
            host.append_child(target, instance)?;
            promote_props(arena, id);
            report.placed += 1;
        }
        EffectKind::Update => {
            let Some(instance) = arena.get(id).and_then(|fiber| fiber.host) else {
                return Ok(());
            };
            let old = arena
                .get(id)
                .and_then(|fiber| fiber.alternate)
                .and_then(|alternate| arena.get(alternate))
                .map(|alternate| alternate.committed_props.clone())
                .unwrap_or_default();
            let new = arena
                .get(id)
                .map(|fiber| fiber.pending_props.clone())
                .unwrap_or_default();
            apply_props(host, instance, &old, &new)?;
            promote_props(arena, id);
            report.updated += 1;
        }
        EffectKind::Delete => {
            let Some(target) = host_parent(arena, id) else {
                return Ok(());
            };
            remove_subtree(arena, host, id, target)?;
            report.deleted += 1;
        }
    }
    Ok(())
}

/// Finds the nearest ancestor with a materialized host instance.
fn host_parent(arena: &FiberArena, id: FiberId) -> Option<HostNodeId> {
    let mut cursor = arena.get(id)?.parent;
    while let Some(parent) = cursor {
        let fiber = arena.get(parent)?;
        if let Some(instance) = fiber.host {
            return Some(instance);
        }
        cursor = fiber.parent;
    }
    None
}

/// Detaches a deleted fiber's instance from `target`. A fiber with no
/// materialized node of its own instead detaches each materialized child.
fn remove_subtree(
    arena: &FiberArena,
    host: &mut dyn HostBackend,
    id: FiberId,
    target: HostNodeId,
) -> Result<(), EngineError> {
    if let Some(instance) = arena.get(id).and_then(|fiber| fiber.host) {
        host.remove_child(target, instance)?;
        return Ok(());
    }
    let mut child = arena.get(id).and_then(|fiber| fiber.first_child);
    while let Some(id) = child {
        remove_subtree(arena, host, id, target)?;
        child = arena.get(id).and_then(|fiber| fiber.next_sibling);
    }
    Ok(())
}

fn promote_props(arena: &mut FiberArena, id: FiberId) {
    if let Some(fiber) = arena.get_mut(id) {
        fiber.committed_props = fiber.pending_props.clone();
    }
}
