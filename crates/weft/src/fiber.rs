//! Mutable work-tracking records mirroring the element tree.
//!
//! Fibers live in a slotmap arena and address each other by key, so parent
//! and alternate back-references carry no ownership and cannot form reference
//! cycles. Two logical trees coexist: the current (last committed) tree and
//! the work-in-progress tree being built this pass, cross-linked through
//! `alternate`. Unreachable generations are reclaimed by [`FiberArena::sweep`]
//! once a pass concludes.

use std::borrow::Cow;

use rustc_hash::FxHashSet;
use slotmap::SlotMap;

use crate::element::{Element, ElementKind, Props};
use crate::host::HostNodeId;

slotmap::new_key_type! {
    /// Stable handle addressing a fiber in the arena.
    pub struct FiberId;
}

/// Role of a fiber in the tree. Closed set; reconciliation matches on it
/// exhaustively.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FiberKind {
    /// Anchors a pass and holds the host container instance.
    Root,
    /// Instantiates a host node.
    Host,
    /// Instantiates a host text node.
    Text,
}

/// Host mutation a fiber requires at commit time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EffectKind {
    /// No mutation required.
    #[default]
    None,
    /// Insert the fiber's instance under its host parent.
    Place,
    /// Apply the prop delta to the existing instance.
    Update,
    /// Detach the fiber's instance (or its materialized descendants).
    Delete,
}

/// Per-node work record for one reconciliation pass.
pub(crate) struct Fiber {
    pub kind: FiberKind,
    /// Element kind this fiber instantiates; `None` for the root marker.
    pub element_kind: Option<ElementKind>,
    /// Stable identity carried from the element. Not used for matching.
    pub key: Option<Cow<'static, str>>,
    /// Concrete host instance once materialized.
    pub host: Option<HostNodeId>,
    /// Props proposed for this pass.
    pub pending_props: Props,
    /// Props currently reflected on the host instance.
    pub committed_props: Props,
    /// Element children awaiting reconciliation; drained by begin_work.
    pub pending_children: Vec<Element>,
    /// Non-owning back link.
    pub parent: Option<FiberId>,
    pub first_child: Option<FiberId>,
    pub next_sibling: Option<FiberId>,
    /// Counterpart representing the same logical node in the other buffer.
    pub alternate: Option<FiberId>,
    /// Mutation this fiber requires at commit.
    pub effect: EffectKind,
    /// Subtree effect list in traversal-completion order: deletions at the
    /// position they were discovered, then completed descendants, then self.
    pub effects: Vec<FiberId>,
}

impl Fiber {
    /// Creates a root-marker fiber anchored on the host container.
    pub fn root(container: HostNodeId, alternate: Option<FiberId>) -> Self {
        Self {
            kind: FiberKind::Root,
            element_kind: None,
            key: None,
            host: Some(container),
            pending_props: Props::default(),
            committed_props: Props::default(),
            pending_children: Vec::new(),
            parent: None,
            first_child: None,
            next_sibling: None,
            alternate,
            effect: EffectKind::None,
            effects: Vec::new(),
        }
    }
}

/// Owns every fiber; all tree links are keys into this arena.
#[derive(Default)]
pub(crate) struct FiberArena {
    fibers: SlotMap<FiberId, Fiber>,
}

impl FiberArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, fiber: Fiber) -> FiberId {
        self.fibers.insert(fiber)
    }

    pub fn get(&self, id: FiberId) -> Option<&Fiber> {
        self.fibers.get(id)
    }

    pub fn get_mut(&mut self, id: FiberId) -> Option<&mut Fiber> {
        self.fibers.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.fibers.len()
    }

    /// Reclaims every fiber unreachable from `root`.
    ///
    /// The active tree is traversed through child and sibling links; each
    /// fiber in it additionally keeps its `alternate` alive, one hop and no
    /// further. Discarded work-in-progress generations, deleted subtrees, and
    /// anything older than the last committed pair of buffers falls out.
    /// Returns the number of slots reclaimed.
    pub fn sweep(&mut self, root: Option<FiberId>) -> usize {
        let before = self.fibers.len();
        let mut live = FxHashSet::default();
        let mut stack = Vec::new();
        if let Some(root) = root {
            stack.push(root);
        }
        while let Some(id) = stack.pop() {
            if !self.fibers.contains_key(id) || !live.insert(id) {
                continue;
            }
            let fiber = &self.fibers[id];
            if let Some(alternate) = fiber.alternate {
                live.insert(alternate);
            }
            stack.extend(
                [fiber.first_child, fiber.next_sibling]
                    .into_iter()
                    .flatten(),
            );
        }
        self.fibers.retain(|id, _| live.contains(&id));
        before - self.fibers.len()
    }

    /// Clears effect bookkeeping on every surviving fiber.
    ///
    /// Used when a pass is abandoned: deletions marked on the current tree
    /// during the discarded pass must not leak into the next one.
    pub fn clear_effect_marks(&mut self) {
        for fiber in self.fibers.values_mut() {
            fiber.effect = EffectKind::None;
            fiber.effects.clear();
        }
    }
}
