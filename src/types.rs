//! Core types for spark-reconciler.
//!
//! These types define the foundation that everything builds on.
//! Props and state are dynamic maps of [`Value`]s; both are reference-counted
//! and immutable once shared, so "did it change?" is a pointer comparison.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::vnode::{Description, Node};

// =============================================================================
// Reserved prop names
// =============================================================================

/// Identity key. Never written to the host.
pub const KEY: &str = "key";

/// Child descriptions of an element or component.
pub const CHILDREN: &str = "children";

/// Raw markup that replaces an element's content wholesale.
pub const INNER_HTML: &str = "dangerouslySetInnerHTML";

/// Controlled-input value.
pub const VALUE: &str = "value";

/// Controlled-input checked state.
pub const CHECKED: &str = "checked";

/// Target container of a portal description.
pub const CONTAINER: &str = "container";

// =============================================================================
// Host Handles
// =============================================================================

/// Non-owning handle to a host resource.
///
/// The host owns the resource; instances only remember which one they are
/// bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostId(pub usize);

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// Key
// =============================================================================

/// Identity key used by child reconciliation to match descriptions to instances.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Int(i64),
    Str(Rc<str>),
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Str(value.into())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Str(value.into())
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Int(value)
    }
}

impl From<i32> for Key {
    fn from(value: i32) -> Self {
        Key::Int(value as i64)
    }
}

impl From<usize> for Key {
    fn from(value: usize) -> Self {
        Key::Int(value as i64)
    }
}

// =============================================================================
// Value
// =============================================================================

/// Event handler stored in props.
pub type Handler = Rc<dyn Fn(&Value)>;

/// A dynamic prop or state value.
///
/// Equality is *strict*: scalars and strings compare by content, everything
/// reference-counted compares by pointer. See [`Value::same`].
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    /// Raw markup for [`INNER_HTML`].
    Html(Rc<str>),
    /// Renderable content, usually under [`CHILDREN`].
    Node(Node),
    /// A host resource, e.g. a portal [`CONTAINER`].
    Host(HostId),
    Handler(Handler),
    Opaque(Rc<dyn Any>),
}

impl Value {
    /// Strict equality.
    ///
    /// `Float(NaN)` is never the same as itself. Handlers, opaque values and
    /// descriptions are compared by identity.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Html(a), Value::Html(b)) => Rc::ptr_eq(a, b),
            (Value::Node(a), Value::Node(b)) => a.same(b),
            (Value::Host(a), Value::Host(b)) => a == b,
            (Value::Handler(a), Value::Handler(b)) => Rc::ptr_eq(a, b),
            (Value::Opaque(a), Value::Opaque(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_host(&self) -> Option<HostId> {
        match self {
            Value::Host(id) => Some(*id),
            _ => None,
        }
    }

    /// Markup of an [`INNER_HTML`] value.
    pub fn as_html(&self) -> Option<&str> {
        match self {
            Value::Html(s) => Some(s),
            _ => None,
        }
    }

    pub fn downcast<T: 'static>(&self) -> Option<&T> {
        match self {
            Value::Opaque(any) => any.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Raw markup value for [`INNER_HTML`].
    pub fn html(markup: impl Into<Rc<str>>) -> Self {
        Value::Html(markup.into())
    }

    pub fn handler(f: impl Fn(&Value) + 'static) -> Self {
        Value::Handler(Rc::new(f))
    }

    pub fn opaque<T: 'static>(value: T) -> Self {
        Value::Opaque(Rc::new(value))
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Float(x) => write!(f, "Float({x})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Html(s) => write!(f, "Html({s:?})"),
            Value::Node(n) => write!(f, "Node({n:?})"),
            Value::Host(id) => write!(f, "Host({id})"),
            Value::Handler(_) => f.write_str("Handler(..)"),
            Value::Opaque(_) => f.write_str("Opaque(..)"),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Int(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value.into())
    }
}

impl From<Rc<str>> for Value {
    fn from(value: Rc<str>) -> Self {
        Value::Str(value)
    }
}

impl From<HostId> for Value {
    fn from(value: HostId) -> Self {
        Value::Host(value)
    }
}

impl From<Node> for Value {
    fn from(value: Node) -> Self {
        Value::Node(value)
    }
}

impl From<Rc<Description>> for Value {
    fn from(value: Rc<Description>) -> Self {
        Value::Node(Node::Element(value))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

// =============================================================================
// Props / State
// =============================================================================

/// Ordered map backing [`Props`].
pub type Map = BTreeMap<Rc<str>, Value>;

/// Immutable, reference-counted prop mapping.
///
/// Cloning is cheap and keeps identity: [`Props::ptr_eq`] tells whether two
/// handles refer to the same mapping.
#[derive(Clone, Default)]
pub struct Props(Rc<Map>);

/// Component state shares the props representation.
///
/// The pending snapshot of a class component starts as an alias of its
/// committed state; [`Props::merge`] copies on the first write only.
pub type State = Props;

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: Map) -> Self {
        Self(Rc::new(map))
    }

    /// Chainable insert, used while building a fresh mapping.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        Rc::make_mut(&mut self.0).insert(key.into(), value.into());
        self
    }

    /// Shallow-merge `partial` into this mapping.
    ///
    /// If the mapping is shared (e.g. the pending state still aliases the
    /// committed one) it is cloned first; otherwise it is updated in place.
    pub fn merge(&mut self, partial: Map) {
        if partial.is_empty() {
            return;
        }
        Rc::make_mut(&mut self.0).extend(partial);
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Props) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (&**k, v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The `children` prop as renderable content.
    pub fn children(&self) -> Node {
        match self.0.get(CHILDREN) {
            Some(Value::Node(node)) => node.clone(),
            Some(Value::Str(s)) => Node::Text(s.clone()),
            Some(Value::Int(i)) => Node::Text(i.to_string().into()),
            Some(Value::Float(x)) => Node::Text(x.to_string().into()),
            _ => Node::Empty,
        }
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_int)
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

/// Build a [`Map`] from `(key, value)` pairs.
pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Map
where
    K: Into<Rc<str>>,
    V: Into<Value>,
{
    entries
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_equality() {
        assert!(Value::from("a").same(&Value::from("a")));
        assert!(!Value::from("a").same(&Value::from("b")));
        assert!(Value::Int(3).same(&Value::Float(3.0)));
        assert!(!Value::Float(f64::NAN).same(&Value::Float(f64::NAN)));

        let html = Value::html("<b>x</b>");
        assert!(html.same(&html.clone()));
        assert!(!html.same(&Value::html("<b>x</b>")));

        let h = Value::handler(|_| {});
        assert!(h.same(&h.clone()));
        assert!(!h.same(&Value::handler(|_| {})));
    }

    #[test]
    fn test_props_identity() {
        let a = Props::new().with("id", "x");
        let b = a.clone();
        assert!(a.ptr_eq(&b));

        let c = Props::new().with("id", "x");
        assert!(!a.ptr_eq(&c));
    }

    #[test]
    fn test_merge_copies_on_first_write() {
        let committed = Props::new().with("count", 1);
        let mut pending = committed.clone();
        assert!(pending.ptr_eq(&committed));

        pending.merge(map([("count", 2)]));
        assert!(!pending.ptr_eq(&committed));
        assert_eq!(committed.int("count"), Some(1));
        assert_eq!(pending.int("count"), Some(2));

        // Empty merges leave the alias intact.
        let mut alias = committed.clone();
        alias.merge(Map::new());
        assert!(alias.ptr_eq(&committed));
    }

    #[test]
    fn test_children_coercion() {
        let props = Props::new().with(CHILDREN, "hello");
        assert!(matches!(props.children(), Node::Text(ref s) if &**s == "hello"));
        assert!(matches!(Props::new().children(), Node::Empty));

        let int = Props::new().with(CHILDREN, 7);
        assert!(matches!(int.children(), Node::Text(ref s) if &**s == "7"));
        let float = Props::new().with(CHILDREN, 2.5);
        assert!(matches!(float.children(), Node::Text(ref s) if &**s == "2.5"));
    }
}
