//! Instance - the persistent, mutable node of the retained tree.
//!
//! One instance exists per logical tree position for as long as that position
//! keeps rendering the same type. It owns its component and its children;
//! the parent link is weak and only used for sibling lookup.
//!
//! Instances are shared as [`InstanceRef`] (`Rc<RefCell<Instance>>`) because
//! the commit queue, component handles and error hooks all need to reach them
//! after the walk has moved on. The walk never holds a borrow across a call
//! into component code or a collaborator.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use super::flags::InstanceFlags;
use crate::component::Mounted;
use crate::error::Interrupt;
use crate::types::{HostId, Key, Props};
use crate::vnode::{DescriptionId, NodeType};

/// Shared handle to an instance.
pub type InstanceRef = Rc<RefCell<Instance>>;

/// Deferred post-mutation action.
pub type CommitCallback = Box<dyn FnOnce() -> Result<(), Interrupt>>;

/// What an instance renders.
#[derive(Clone, Debug)]
pub enum InstanceType {
    Text,
    Node(NodeType),
}

// =============================================================================
// Instance
// =============================================================================

pub struct Instance {
    pub(crate) ty: InstanceType,
    pub(crate) flags: InstanceFlags,
    /// Last committed props (element / component instances).
    pub(crate) props: Props,
    /// Last committed content (text instances).
    pub(crate) text: Rc<str>,
    pub(crate) key: Option<Key>,
    pub(crate) component: Option<Mounted>,
    /// `None` until the first successful render.
    pub(crate) children: Option<Vec<InstanceRef>>,
    pub(crate) dom: Option<HostId>,
    pub(crate) commit_callbacks: VecDeque<CommitCallback>,
    pub(crate) description_id: DescriptionId,
    pub(crate) parent: Weak<RefCell<Instance>>,
}

impl Instance {
    fn blank(ty: InstanceType, kind: InstanceFlags, key: Option<Key>) -> Self {
        Self {
            ty,
            flags: kind,
            props: Props::new(),
            text: "".into(),
            key,
            component: None,
            children: None,
            dom: None,
            commit_callbacks: VecDeque::new(),
            description_id: 0,
            parent: Weak::new(),
        }
    }

    /// Text leaf bound to `dom`.
    pub fn text(content: Rc<str>, dom: HostId) -> InstanceRef {
        let mut instance = Self::blank(InstanceType::Text, InstanceFlags::TEXT, None);
        instance.text = content;
        instance.dom = Some(dom);
        Rc::new(RefCell::new(instance))
    }

    /// Instance for a description type. Host elements need `dom`.
    pub fn for_type(ty: &NodeType, key: Option<Key>, dom: Option<HostId>) -> InstanceRef {
        let kind = match ty {
            NodeType::Element(_) => InstanceFlags::ELEMENT,
            NodeType::Portal => InstanceFlags::ROOT,
            NodeType::Class(_) => InstanceFlags::CLASS,
            NodeType::Fragment | NodeType::Function(_) => InstanceFlags::FUNCTION,
        };
        let mut instance = Self::blank(InstanceType::Node(ty.clone()), kind, key);
        instance.dom = dom;
        Rc::new(RefCell::new(instance))
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    #[inline]
    pub fn flags(&self) -> InstanceFlags {
        self.flags
    }

    #[inline]
    pub fn set_flags(&mut self, flags: InstanceFlags) {
        self.flags.insert(flags);
    }

    #[inline]
    pub fn clear_flags(&mut self, flags: InstanceFlags) {
        self.flags.remove(flags);
    }

    pub fn ty(&self) -> &InstanceType {
        &self.ty
    }

    pub fn node_type(&self) -> Option<&NodeType> {
        match &self.ty {
            InstanceType::Node(ty) => Some(ty),
            InstanceType::Text => None,
        }
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub fn text_content(&self) -> &str {
        &self.text
    }

    pub fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    pub fn dom(&self) -> Option<HostId> {
        self.dom
    }

    pub fn set_dom(&mut self, dom: Option<HostId>) {
        self.dom = dom;
    }

    pub fn children(&self) -> Option<&[InstanceRef]> {
        self.children.as_deref()
    }

    pub fn set_children(&mut self, children: Option<Vec<InstanceRef>>) {
        self.children = children;
    }

    pub fn description_id(&self) -> DescriptionId {
        self.description_id
    }

    pub fn parent(&self) -> Option<InstanceRef> {
        self.parent.upgrade()
    }

    pub fn set_parent(&mut self, parent: &InstanceRef) {
        self.parent = Rc::downgrade(parent);
    }

    pub fn component(&self) -> Option<&Mounted> {
        self.component.as_ref()
    }

    pub(crate) fn take_component(&mut self) -> Option<Mounted> {
        self.component.take()
    }

    pub fn pending_commit_callbacks(&self) -> usize {
        self.commit_callbacks.len()
    }

    pub fn name(&self) -> &str {
        match &self.ty {
            InstanceType::Text => "#text",
            InstanceType::Node(ty) => ty.name(),
        }
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("ty", &self.ty)
            .field("flags", &self.flags)
            .field("dom", &self.dom)
            .field("children", &self.children.as_ref().map(Vec::len))
            .field("description_id", &self.description_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_type() {
        let el = Instance::for_type(&NodeType::Element("div".into()), None, Some(HostId(1)));
        assert_eq!(el.borrow().flags().kind(), InstanceFlags::ELEMENT);

        let portal = Instance::for_type(&NodeType::Portal, None, None);
        assert_eq!(portal.borrow().flags().kind(), InstanceFlags::ROOT);

        let frag = Instance::for_type(&NodeType::Fragment, None, None);
        assert_eq!(frag.borrow().flags().kind(), InstanceFlags::FUNCTION);

        let txt = Instance::text("hi".into(), HostId(2));
        assert_eq!(txt.borrow().flags().kind(), InstanceFlags::TEXT);
        assert_eq!(txt.borrow().text_content(), "hi");
    }

    #[test]
    fn test_children_unset_until_rendered() {
        let inst = Instance::for_type(&NodeType::Fragment, None, None);
        assert!(inst.borrow().children().is_none());
        inst.borrow_mut().set_children(Some(Vec::new()));
        assert_eq!(inst.borrow().children().map(<[_]>::len), Some(0));
    }

    #[test]
    fn test_parent_is_weak() {
        let parent = Instance::for_type(&NodeType::Fragment, None, None);
        let child = Instance::for_type(&NodeType::Fragment, None, None);
        child.borrow_mut().set_parent(&parent);
        assert!(child.borrow().parent().is_some());
        drop(parent);
        assert!(child.borrow().parent().is_none());
    }
}
