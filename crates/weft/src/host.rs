//! The seam between the engine and the rendering surface it mutates.
//!
//! The engine never touches host nodes directly; every creation and mutation
//! goes through [`HostBackend`], and nodes are addressed by the opaque ids the
//! backend mints. The committer is the only caller that mutates the attached
//! tree; the work phase only creates detached instances.

use thiserror::Error;

use crate::element::{EventHandler, PropValue, Props, EVENT_PREFIX};

/// Opaque identifier for a host-surface node, minted by the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HostNodeId(u64);

impl HostNodeId {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Error reported by a host primitive.
#[derive(Debug, Error)]
#[error("host mutation failed: {0}")]
pub struct HostError(String);

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Capabilities the engine consumes from the host-integration layer.
///
/// All operations are fallible; failures propagate to the engine's caller
/// without rollback of mutations already applied.
pub trait HostBackend {
    /// Creates a detached host node for the given tag.
    fn create_node(&mut self, tag: &str) -> Result<HostNodeId, HostError>;

    /// Creates a detached host text node with the given payload.
    fn create_text(&mut self, text: &str) -> Result<HostNodeId, HostError>;

    /// Appends `child` as the last child of `parent`.
    fn append_child(&mut self, parent: HostNodeId, child: HostNodeId) -> Result<(), HostError>;

    /// Detaches `child` from `parent`.
    fn remove_child(&mut self, parent: HostNodeId, child: HostNodeId) -> Result<(), HostError>;

    /// Sets a plain prop on a node.
    fn set_prop(&mut self, node: HostNodeId, name: &str, value: &PropValue)
        -> Result<(), HostError>;

    /// Clears a plain prop from a node.
    fn clear_prop(&mut self, node: HostNodeId, name: &str) -> Result<(), HostError>;

    /// Attaches an event handler to a node.
    fn attach_handler(
        &mut self,
        node: HostNodeId,
        event: &str,
        handler: EventHandler,
    ) -> Result<(), HostError>;

    /// Detaches the handler bound for `event` on a node.
    fn detach_handler(&mut self, node: HostNodeId, event: &str) -> Result<(), HostError>;
}

/// Maps an event-prefixed prop name to its host event name.
///
/// Returns `None` for plain props. "onClick" and "onclick" both bind "click".
pub(crate) fn event_name(prop: &str) -> Option<String> {
    prop.strip_prefix(EVENT_PREFIX)
        .map(|event| event.to_ascii_lowercase())
}

/// Applies the delta between two prop sets to a host node.
///
/// Props present only in `old` are cleared, props that are new or changed are
/// set. Event-prefixed props are routed through handler attach/detach, with
/// a changed handler detached before its replacement is attached. `children`
/// never reaches this routine; elements hold them structurally.
pub(crate) fn apply_props(
    host: &mut dyn HostBackend,
    node: HostNodeId,
    old: &Props,
    new: &Props,
) -> Result<(), HostError> {
    for (name, value) in old.iter() {
        if new.get(name).is_some() {
            continue;
        }
        match event_name(name) {
            Some(event) if value.is_handler() => host.detach_handler(node, &event)?,
            _ => host.clear_prop(node, name)?,
        }
    }

    for (name, value) in new.iter() {
        let prior = old.get(name);
        if prior == Some(value) {
            continue;
        }
        match (event_name(name), value) {
            (Some(event), PropValue::Handler(handler)) => {
                if prior.is_some() {
                    host.detach_handler(node, &event)?;
                }
                host.attach_handler(node, &event, handler.clone())?;
            }
            _ => host.set_prop(node, name, value)?,
        }
    }

    Ok(())
}

#[cfg(any(test, feature = "test-support"))]
pub mod test;
