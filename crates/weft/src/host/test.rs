//! In-memory host double: an instance arena plus a mutation log.
//!
//! Gated behind `test-support` so downstream crates can drive the engine
//! against it in their own tests.

use crate::element::{EventHandler, PropValue, TEXT_PROP};

use super::{HostBackend, HostError, HostNodeId};

/// One recorded host mutation, in application order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostOp {
    CreateNode { node: HostNodeId, tag: String },
    CreateText { node: HostNodeId, text: String },
    Append { parent: HostNodeId, child: HostNodeId },
    Remove { parent: HostNodeId, child: HostNodeId },
    SetProp { node: HostNodeId, name: String },
    ClearProp { node: HostNodeId, name: String },
    Attach { node: HostNodeId, event: String },
    Detach { node: HostNodeId, event: String },
}

/// A fake host node.
#[derive(Default)]
pub struct TestNode {
    pub tag: String,
    pub text: Option<String>,
    pub props: Vec<(String, PropValue)>,
    pub handlers: Vec<(String, EventHandler)>,
    pub children: Vec<HostNodeId>,
}

/// Host backend recording every mutation against an in-memory node arena.
#[derive(Default)]
pub struct TestBackend {
    nodes: Vec<TestNode>,
    /// Every mutation applied, in order.
    pub ops: Vec<HostOp>,
    fail_appends: bool,
}

impl TestBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mints a container node to schedule roots into. Not recorded in `ops`.
    pub fn create_root(&mut self) -> HostNodeId {
        self.alloc(TestNode {
            tag: "#root".to_string(),
            ..TestNode::default()
        })
    }

    /// Makes every subsequent `append_child` fail, for exercising commit
    /// failure paths.
    pub fn set_fail_appends(&mut self, fail: bool) {
        self.fail_appends = fail;
    }

    pub fn node(&self, id: HostNodeId) -> &TestNode {
        &self.nodes[id.raw() as usize]
    }

    pub fn children(&self, id: HostNodeId) -> &[HostNodeId] {
        &self.node(id).children
    }

    pub fn text(&self, id: HostNodeId) -> Option<&str> {
        self.node(id).text.as_deref()
    }

    /// Total nodes ever created, including detached ones.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn alloc(&mut self, node: TestNode) -> HostNodeId {
        let id = HostNodeId::from_raw(self.nodes.len() as u64);
        self.nodes.push(node);
        id
    }

    fn node_mut(&mut self, id: HostNodeId) -> Result<&mut TestNode, HostError> {
        self.nodes
            .get_mut(id.raw() as usize)
            .ok_or_else(|| HostError::new(format!("unknown node {id:?}")))
    }
}

impl HostBackend for TestBackend {
    fn create_node(&mut self, tag: &str) -> Result<HostNodeId, HostError> {
        let node = self.alloc(TestNode {
            tag: tag.to_string(),
            ..TestNode::default()
        });
        self.ops.push(HostOp::CreateNode {
            node,
            tag: tag.to_string(),
        });
        Ok(node)
    }

    fn create_text(&mut self, text: &str) -> Result<HostNodeId, HostError> {
        let node = self.alloc(TestNode {
            tag: "#text".to_string(),
            text: Some(text.to_string()),
            ..TestNode::default()
        });
        self.ops.push(HostOp::CreateText {
            node,
            text: text.to_string(),
        });
        Ok(node)
    }

    fn append_child(&mut self, parent: HostNodeId, child: HostNodeId) -> Result<(), HostError> {
        if self.fail_appends {
            return Err(HostError::new("append rejected"));
        }
        self.node_mut(parent)?.children.push(child);
        self.ops.push(HostOp::Append { parent, child });
        Ok(())
    }

    fn remove_child(&mut self, parent: HostNodeId, child: HostNodeId) -> Result<(), HostError> {
        let node = self.node_mut(parent)?;
        let index = node
            .children
            .iter()
            .position(|id| *id == child)
            .ok_or_else(|| HostError::new(format!("{child:?} is not a child of {parent:?}")))?;
        node.children.remove(index);
        self.ops.push(HostOp::Remove { parent, child });
        Ok(())
    }

    fn set_prop(
        &mut self,
        node: HostNodeId,
        name: &str,
        value: &PropValue,
    ) -> Result<(), HostError> {
        let record = self.node_mut(node)?;
        if name == TEXT_PROP {
            if let PropValue::Str(text) = value {
                record.text = Some(text.to_string());
            }
        }
        match record.props.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value.clone(),
            None => record.props.push((name.to_string(), value.clone())),
        }
        self.ops.push(HostOp::SetProp {
            node,
            name: name.to_string(),
        });
        Ok(())
    }

    fn clear_prop(&mut self, node: HostNodeId, name: &str) -> Result<(), HostError> {
        let record = self.node_mut(node)?;
        record.props.retain(|(n, _)| n != name);
        if name == TEXT_PROP {
            record.text = None;
        }
        self.ops.push(HostOp::ClearProp {
            node,
            name: name.to_string(),
        });
        Ok(())
    }

    fn attach_handler(
        &mut self,
        node: HostNodeId,
        event: &str,
        handler: EventHandler,
    ) -> Result<(), HostError> {
        let record = self.node_mut(node)?;
        if record.handlers.iter().any(|(e, _)| e == event) {
            return Err(HostError::new(format!(
                "handler already attached for {event:?} on {node:?}"
            )));
        }
        record.handlers.push((event.to_string(), handler));
        self.ops.push(HostOp::Attach {
            node,
            event: event.to_string(),
        });
        Ok(())
    }

    fn detach_handler(&mut self, node: HostNodeId, event: &str) -> Result<(), HostError> {
        let record = self.node_mut(node)?;
        let index = record
            .handlers
            .iter()
            .position(|(e, _)| e == event)
            .ok_or_else(|| HostError::new(format!("no handler for {event:?} on {node:?}")))?;
        record.handlers.remove(index);
        self.ops.push(HostOp::Detach {
            node,
            event: event.to_string(),
        });
        Ok(())
    }
}
