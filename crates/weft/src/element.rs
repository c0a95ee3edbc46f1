//! Immutable descriptions of desired UI state.
//!
//! Elements are plain data: a kind (host tag or text marker), an optional
//! stable key, an ordered prop list, and nested children. They are produced
//! by the caller, handed to [`Scheduler::schedule_root`](crate::Scheduler),
//! and consumed by reconciliation; the engine never mutates them in place.
//! Everything that actually changes across frames lives in the fiber tree,
//! not here.

use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::error::EngineError;

/// Callback attached to a host node for an event-prefixed prop.
pub type EventHandler = Rc<dyn Fn()>;

/// Props whose name starts with this prefix are event-handler bindings
/// ("onclick" binds the "click" event) rather than plain attributes.
pub(crate) const EVENT_PREFIX: &str = "on";

/// Name of the prop carrying a text element's payload.
pub const TEXT_PROP: &str = "text";

/// A single prop value.
#[derive(Clone)]
pub enum PropValue {
    /// Plain string attribute/field value.
    Str(Cow<'static, str>),
    /// Numeric attribute/field value.
    Number(f64),
    /// Boolean attribute/field value.
    Bool(bool),
    /// Event-handler binding. Compared by callback identity.
    Handler(EventHandler),
}

impl PropValue {
    pub(crate) fn is_handler(&self) -> bool {
        matches!(self, PropValue::Handler(_))
    }
}

impl PartialEq for PropValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PropValue::Str(a), PropValue::Str(b)) => a == b,
            (PropValue::Number(a), PropValue::Number(b)) => a == b,
            (PropValue::Bool(a), PropValue::Bool(b)) => a == b,
            (PropValue::Handler(a), PropValue::Handler(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Str(value) => f.debug_tuple("Str").field(value).finish(),
            PropValue::Number(value) => f.debug_tuple("Number").field(value).finish(),
            PropValue::Bool(value) => f.debug_tuple("Bool").field(value).finish(),
            PropValue::Handler(_) => f.write_str("Handler(..)"),
        }
    }
}

impl From<&'static str> for PropValue {
    fn from(value: &'static str) -> Self {
        PropValue::Str(Cow::Borrowed(value))
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Str(Cow::Owned(value))
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Number(value)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

/// Ordered name→value prop mapping.
///
/// Insertion order is preserved and lookups are linear; prop sets are small
/// enough that a flat list beats a map. Equality is mapping equality, not
/// order equality.
#[derive(Clone, Debug, Default)]
pub struct Props {
    entries: SmallVec<[(Cow<'static, str>, PropValue); 4]>,
}

impl Props {
    /// Creates an empty prop list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<Cow<'static, str>>, value: impl Into<PropValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Inserts or replaces the prop with the given name.
    pub fn set(&mut self, name: impl Into<Cow<'static, str>>, value: impl Into<PropValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Looks up a prop by name.
    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.entries
            .iter()
            .find(|(n, _)| n.as_ref() == name)
            .map(|(_, v)| v)
    }

    /// Removes and returns the prop with the given name.
    pub fn remove(&mut self, name: &str) -> Option<PropValue> {
        let index = self.entries.iter().position(|(n, _)| n.as_ref() == name)?;
        Some(self.entries.remove(index).1)
    }

    /// Convenience accessor for string-valued props.
    pub fn str(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            PropValue::Str(value) => Some(value.as_ref()),
            _ => None,
        }
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.entries.iter().map(|(n, v)| (n.as_ref(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PartialEq for Props {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .all(|(name, value)| other.get(name.as_ref()) == Some(value))
    }
}

/// What an element instantiates on the host surface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ElementKind {
    /// A host node with the given tag.
    Host(Cow<'static, str>),
    /// A host text node; the payload lives in the [`TEXT_PROP`] prop.
    Text,
}

/// An immutable description of desired UI at one tree position.
#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    pub kind: ElementKind,
    /// Stable identity carried through to the fiber. Child matching pairs by
    /// position and kind only, so the key does not affect reuse decisions.
    pub key: Option<Cow<'static, str>>,
    pub props: Props,
    pub children: Vec<Element>,
}

/// Builds a host element, extracting the reserved `key` and `ref` entries
/// out of the prop mapping.
///
/// Rejects elements the engine could never instantiate: empty tags, non-string
/// `key` values, and event-prefixed props that don't carry a handler.
pub fn create_element(
    tag: impl Into<Cow<'static, str>>,
    mut props: Props,
    children: Vec<Element>,
) -> Result<Element, EngineError> {
    let tag = tag.into();
    if tag.is_empty() {
        return Err(EngineError::MalformedElement("host element tag is empty"));
    }

    let key = match props.remove("key") {
        None => None,
        Some(PropValue::Str(key)) => Some(key),
        Some(_) => {
            return Err(EngineError::MalformedElement("`key` prop is not a string"));
        }
    };
    if props.remove("ref").is_some() {
        // Refs are a host-integration concern; the core drops them.
        log::trace!("[ELEMENT] dropping `ref` prop on <{tag}>");
    }

    for (name, value) in props.iter() {
        if name.starts_with(EVENT_PREFIX) && !value.is_handler() {
            return Err(EngineError::MalformedElement(
                "event-prefixed prop does not carry a handler",
            ));
        }
    }

    Ok(Element {
        kind: ElementKind::Host(tag),
        key,
        props,
        children,
    })
}

/// Builds a text element with the given payload.
pub fn create_text_element(text: impl Into<Cow<'static, str>>) -> Element {
    Element {
        kind: ElementKind::Text,
        key: None,
        props: Props::new().with(TEXT_PROP, PropValue::Str(text.into())),
        children: Vec::new(),
    }
}

#[cfg(test)]
mod tests;
