//! Descriptions - immutable "what to render here" values.
//!
//! A [`Description`] is created fresh on every render pass and never mutated
//! afterwards. Each one is stamped with a per-thread identity token so the
//! walk can tell "the exact description I applied last time" apart from "new
//! content that happens to look the same".
//!
//! ```text
//! h("div", props, children) ──► Description { ty: Element("div"), props, key, id: 17 }
//!                                          │
//!                    patch() compares id ──┘ against Instance::description_id
//! ```

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::component::{ClassType, Context, FunctionType};
use crate::types::{CHILDREN, CONTAINER, HostId, Key, Props, Value};

// =============================================================================
// Identity Tokens
// =============================================================================

/// Render-pass identity token of a description. `0` means "none applied yet".
pub type DescriptionId = u64;

thread_local! {
    /// Next identity token to hand out.
    static NEXT_ID: Cell<DescriptionId> = const { Cell::new(1) };
}

fn next_id() -> DescriptionId {
    NEXT_ID.with(|next| {
        let id = next.get();
        next.set(id + 1);
        id
    })
}

/// How a description came to exist.
///
/// Only descriptions built through this module's constructors carry
/// [`Origin::Created`]; the walk rejects everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Created,
    Foreign,
}

// =============================================================================
// Node Type
// =============================================================================

/// What a description renders.
#[derive(Clone)]
pub enum NodeType {
    /// Host primitive tag (`"div"`, `"input"`, ...).
    Element(Rc<str>),
    /// Groups children without a host resource of its own.
    Fragment,
    /// Renders children into the `container` prop instead of the current target.
    Portal,
    Function(FunctionType),
    Class(ClassType),
}

impl NodeType {
    /// Type identity used for child matching.
    pub fn same(&self, other: &NodeType) -> bool {
        match (self, other) {
            (NodeType::Element(a), NodeType::Element(b)) => a == b,
            (NodeType::Fragment, NodeType::Fragment) => true,
            (NodeType::Portal, NodeType::Portal) => true,
            (NodeType::Function(a), NodeType::Function(b)) => a.ptr_eq(b),
            (NodeType::Class(a), NodeType::Class(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Context this type consumes, if it declared one.
    pub fn context_type(&self) -> Option<&Context> {
        match self {
            NodeType::Function(f) => f.context_type(),
            NodeType::Class(c) => c.context_type(),
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            NodeType::Element(tag) => tag,
            NodeType::Fragment => "Fragment",
            NodeType::Portal => "Portal",
            NodeType::Function(f) => f.name(),
            NodeType::Class(c) => c.name(),
        }
    }
}

impl fmt::Debug for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeType::Element(tag) => write!(f, "Element({tag})"),
            other => f.write_str(other.name()),
        }
    }
}

// =============================================================================
// Description
// =============================================================================

/// Immutable render description (a "virtual node").
pub struct Description {
    origin: Origin,
    ty: NodeType,
    props: Props,
    key: Option<Key>,
    id: DescriptionId,
}

impl Description {
    /// Create a description with a fresh identity token.
    pub fn new(ty: NodeType, props: Props, key: Option<Key>) -> Rc<Self> {
        Rc::new(Self {
            origin: Origin::Created,
            ty,
            props,
            key,
            id: next_id(),
        })
    }

    /// Assemble a description from raw parts (e.g. decoded from the wire).
    ///
    /// The result is marked [`Origin::Foreign`] and will be ignored by the walk.
    pub fn from_parts(ty: NodeType, props: Props, key: Option<Key>, id: DescriptionId) -> Rc<Self> {
        Rc::new(Self {
            origin: Origin::Foreign,
            ty,
            props,
            key,
            id,
        })
    }

    #[inline]
    pub fn ty(&self) -> &NodeType {
        &self.ty
    }

    #[inline]
    pub fn props(&self) -> &Props {
        &self.props
    }

    #[inline]
    pub fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    #[inline]
    pub fn id(&self) -> DescriptionId {
        self.id
    }

    #[inline]
    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn is_trusted(&self) -> bool {
        self.origin == Origin::Created
    }

    /// A `Fragment` without a key, i.e. a wrapper the walk may unwrap.
    pub fn is_bare_fragment(&self) -> bool {
        matches!(self.ty, NodeType::Fragment) && self.key.is_none()
    }

    /// Portal target, if this describes a portal.
    pub fn container(&self) -> Option<HostId> {
        self.props.get(CONTAINER).and_then(Value::as_host)
    }
}

impl fmt::Debug for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Description")
            .field("ty", &self.ty)
            .field("key", &self.key)
            .field("id", &self.id)
            .finish()
    }
}

// =============================================================================
// Node - render output
// =============================================================================

/// Anything a component can render or a parent can hold as children.
#[derive(Clone, Default)]
pub enum Node {
    /// Renders nothing.
    #[default]
    Empty,
    Text(Rc<str>),
    Element(Rc<Description>),
    List(Rc<[Node]>),
}

impl Node {
    /// Strict identity: text by content, everything else by pointer.
    pub fn same(&self, other: &Node) -> bool {
        match (self, other) {
            (Node::Empty, Node::Empty) => true,
            (Node::Text(a), Node::Text(b)) => a == b,
            (Node::Element(a), Node::Element(b)) => Rc::ptr_eq(a, b),
            (Node::List(a), Node::List(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn list(nodes: impl IntoIterator<Item = Node>) -> Node {
        Node::List(nodes.into_iter().collect())
    }

    /// Coerce into a list of siblings.
    pub fn into_vec(self) -> Vec<Node> {
        match self {
            Node::List(nodes) => nodes.to_vec(),
            other => vec![other],
        }
    }

    pub fn description(&self) -> Option<&Rc<Description>> {
        match self {
            Node::Element(d) => Some(d),
            _ => None,
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Empty => f.write_str("Empty"),
            Node::Text(s) => write!(f, "Text({s:?})"),
            Node::Element(d) => write!(f, "{:?}#{}", d.ty(), d.id()),
            Node::List(nodes) => f.debug_list().entries(nodes.iter()).finish(),
        }
    }
}

impl From<Rc<Description>> for Node {
    fn from(value: Rc<Description>) -> Self {
        Node::Element(value)
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node::Text(value.into())
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Node::Text(value.into())
    }
}

impl From<Vec<Node>> for Node {
    fn from(value: Vec<Node>) -> Self {
        Node::List(value.into())
    }
}

impl<T: Into<Node>> From<Option<T>> for Node {
    fn from(value: Option<T>) -> Self {
        value.map_or(Node::Empty, Into::into)
    }
}

// =============================================================================
// Construction helpers
// =============================================================================

fn with_children(props: Props, children: Node) -> Props {
    match children {
        Node::Empty => props,
        children => props.with(CHILDREN, children),
    }
}

/// Create an element description.
///
/// ```ignore
/// let node = h("ul", Props::new().with("class", "list"), vec![
///     h("li", Props::new(), "one".into()),
/// ].into());
/// ```
pub fn h(tag: &str, props: Props, children: Node) -> Node {
    Node::Element(Description::new(
        NodeType::Element(tag.into()),
        with_children(props, children),
        None,
    ))
}

/// Create a keyed element description.
pub fn h_keyed(tag: &str, key: impl Into<Key>, props: Props, children: Node) -> Node {
    Node::Element(Description::new(
        NodeType::Element(tag.into()),
        with_children(props, children),
        Some(key.into()),
    ))
}

/// Create a component description.
pub fn component(ty: NodeType, props: Props, key: Option<Key>) -> Node {
    Node::Element(Description::new(ty, props, key))
}

/// Create a function component description.
pub fn function(ty: &FunctionType, props: Props) -> Node {
    component(NodeType::Function(ty.clone()), props, None)
}

/// Create a class component description.
pub fn class(ty: &ClassType, props: Props) -> Node {
    component(NodeType::Class(ty.clone()), props, None)
}

pub fn text(content: impl Into<Rc<str>>) -> Node {
    Node::Text(content.into())
}

/// Group children without a host resource.
pub fn fragment(children: impl Into<Node>) -> Node {
    Node::Element(Description::new(
        NodeType::Fragment,
        with_children(Props::new(), children.into()),
        None,
    ))
}

/// Render `children` into `container`.
pub fn portal(container: HostId, children: impl Into<Node>) -> Node {
    Node::Element(Description::new(
        NodeType::Portal,
        with_children(Props::new().with(CONTAINER, container), children.into()),
        None,
    ))
}
