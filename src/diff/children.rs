//! Child reconciliation.
//!
//! [`ChildReconciler`] is the seam between the walk and everything that
//! allocates, orders or tears down child instances. [`KeyedChildren`] is the
//! default: it matches by `(key, type)`, preferring the old child at the same
//! position, and fixes host order with a single backwards placement pass.
//!
//! ```text
//! old:  [a] [b] [c]           new: [c] [a] [d]
//!        │   │   │                  │   │   │
//!        └───┼───┼──── patch ───────┼───┘   │
//!            │   └──── patch ───────┘       │
//!            └──────── unmount       mount ─┘
//! ```

use std::rc::Rc;

use tracing::warn;

use crate::component::Mounted;
use crate::engine::{Instance, InstanceFlags, InstanceRef, RenderPass};
use crate::types::{CONTAINER, HostId, Value};
use crate::vnode::{Node, NodeType};

pub trait ChildReconciler {
    /// Create instances for `nodes` under `instance` and insert their host
    /// nodes before `cursor` (`None` appends).
    fn mount(
        &self,
        pass: &mut RenderPass<'_>,
        nodes: &[Node],
        instance: &InstanceRef,
        cursor: Option<HostId>,
    );

    /// Reconcile `instance`'s existing children against `nodes`.
    ///
    /// `cursor` is the first host node of the insertion target, used when
    /// the instance has no reconciled children to diff against.
    fn diff(
        &self,
        pass: &mut RenderPass<'_>,
        nodes: &[Node],
        instance: &InstanceRef,
        cursor: Option<HostId>,
    );

    /// Move the host nodes below `instance` into `target`, before `next_sibling`.
    fn insert_component_dom(
        &self,
        pass: &mut RenderPass<'_>,
        instance: &InstanceRef,
        next_sibling: Option<HostId>,
        target: HostId,
    );

    /// Next host node after `instance`'s subtree in document order.
    fn dom_sibling(&self, pass: &RenderPass<'_>, instance: &InstanceRef) -> Option<HostId>;
}

/// Default keyed reconciler.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyedChildren;

impl ChildReconciler for KeyedChildren {
    fn mount(
        &self,
        pass: &mut RenderPass<'_>,
        nodes: &[Node],
        instance: &InstanceRef,
        cursor: Option<HostId>,
    ) {
        let mut children = Vec::new();
        for node in flatten(nodes) {
            let Some(child) = create(pass, &node, instance) else {
                continue;
            };
            if let Some(parent) = pass.parent_dom() {
                for dom in top_level_host_nodes(&child, Some(parent)) {
                    // Nested mounts already appended their nodes.
                    let host = pass.host();
                    if host.parent(dom) != Some(parent) || cursor.is_some() {
                        host.insert_before(parent, dom, cursor);
                    }
                }
            }
            children.push(child);
        }
        instance.borrow_mut().set_children(Some(children));
    }

    fn diff(
        &self,
        pass: &mut RenderPass<'_>,
        nodes: &[Node],
        instance: &InstanceRef,
        cursor: Option<HostId>,
    ) {
        let old = instance.borrow().children().map(<[_]>::to_vec);
        let Some(old) = old else {
            return self.mount(pass, nodes, instance, cursor);
        };

        let mut used = vec![false; old.len()];
        let mut next = Vec::new();
        for (index, node) in flatten(nodes).iter().enumerate() {
            let child = match find_match(&old, &used, index, node) {
                Some(found) => {
                    used[found] = true;
                    let child = old[found].clone();
                    pass.patch(node, &child);
                    child
                }
                None => match create(pass, node, instance) {
                    Some(child) => child,
                    None => continue,
                },
            };
            next.push(child);
        }

        for (child, used) in old.iter().zip(&used) {
            if !used {
                unmount(pass, child, true);
            }
        }

        instance.borrow_mut().set_children(Some(next.clone()));

        let flags = instance.borrow().flags();
        let owns_target = flags.contains(InstanceFlags::ELEMENT)
            || (flags.contains(InstanceFlags::ROOT) && !is_inline_portal(instance));
        let anchor = if owns_target {
            None
        } else {
            self.dom_sibling(pass, instance)
        };
        place(pass, &next, anchor);
    }

    fn insert_component_dom(
        &self,
        pass: &mut RenderPass<'_>,
        instance: &InstanceRef,
        next_sibling: Option<HostId>,
        target: HostId,
    ) {
        let children = instance.borrow().children().map(<[_]>::to_vec);
        for child in children.iter().flatten() {
            for dom in top_level_host_nodes(child, None) {
                pass.host().insert_before(target, dom, next_sibling);
            }
        }
    }

    fn dom_sibling(&self, _pass: &RenderPass<'_>, instance: &InstanceRef) -> Option<HostId> {
        next_host_after(instance)
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn flatten(nodes: &[Node]) -> Vec<Node> {
    fn walk(nodes: &[Node], out: &mut Vec<Node>) {
        for node in nodes {
            match node {
                Node::Empty => {}
                Node::List(inner) => walk(inner, out),
                other => out.push(other.clone()),
            }
        }
    }
    let mut out = Vec::with_capacity(nodes.len());
    walk(nodes, &mut out);
    out
}

fn is_match(child: &InstanceRef, node: &Node) -> bool {
    let child = child.borrow();
    match node {
        Node::Text(_) => child.flags().contains(InstanceFlags::TEXT),
        Node::Element(desc) => {
            child.key() == desc.key() && child.node_type().is_some_and(|ty| ty.same(desc.ty()))
        }
        Node::Empty | Node::List(_) => false,
    }
}

fn find_match(old: &[InstanceRef], used: &[bool], index: usize, node: &Node) -> Option<usize> {
    if index < old.len() && !used[index] && is_match(&old[index], node) {
        return Some(index);
    }
    (0..old.len()).find(|&i| !used[i] && is_match(&old[i], node))
}

/// Allocate and render a child instance for `node`.
fn create(pass: &mut RenderPass<'_>, node: &Node, parent: &InstanceRef) -> Option<InstanceRef> {
    match node {
        Node::Text(content) => {
            let dom = pass.host().create_text(content);
            let child = Instance::text(content.clone(), dom);
            child.borrow_mut().set_parent(parent);
            Some(child)
        }
        Node::Element(desc) => {
            if !desc.is_trusted() {
                warn!(description = ?desc, "rejected foreign description");
                return None;
            }
            let inherit_svg = {
                let p = parent.borrow();
                p.flags().contains(InstanceFlags::SVG)
                    && !matches!(p.node_type(), Some(NodeType::Element(tag)) if &**tag == "foreignObject")
            };
            let child = match desc.ty() {
                NodeType::Element(tag) => {
                    let svg = inherit_svg || &**tag == "svg";
                    let dom = pass.host().create_element(tag, svg);
                    let child = Instance::for_type(desc.ty(), desc.key().cloned(), Some(dom));
                    if svg {
                        child.borrow_mut().set_flags(InstanceFlags::SVG);
                    }
                    child
                }
                ty => {
                    let child = Instance::for_type(ty, desc.key().cloned(), None);
                    if inherit_svg {
                        child.borrow_mut().set_flags(InstanceFlags::SVG);
                    }
                    child
                }
            };
            child.borrow_mut().set_parent(parent);
            pass.patch(node, &child);
            Some(child)
        }
        Node::Empty | Node::List(_) => None,
    }
}

/// Put the host nodes of `children` in order, ending right before `anchor`.
fn place(pass: &mut RenderPass<'_>, children: &[InstanceRef], anchor: Option<HostId>) {
    let Some(parent) = pass.parent_dom() else {
        return;
    };
    let mut cursor = anchor;
    for child in children.iter().rev() {
        for dom in top_level_host_nodes(child, Some(parent)).into_iter().rev() {
            let host = pass.host();
            if host.parent(dom) != Some(parent) || host.next_sibling(dom) != cursor {
                host.insert_before(parent, dom, cursor);
            }
            cursor = Some(dom);
        }
    }
}

fn container_of(instance: &Instance) -> Option<HostId> {
    instance.props().get(CONTAINER).and_then(Value::as_host)
}

/// Host node that `instance`'s top-level host nodes are inserted into.
fn enclosing_target(instance: &InstanceRef) -> Option<HostId> {
    let parent = instance.borrow().parent()?;
    let (flags, dom, container) = {
        let p = parent.borrow();
        (p.flags(), p.dom(), container_of(&p))
    };
    if flags.contains(InstanceFlags::ELEMENT) {
        dom
    } else if flags.contains(InstanceFlags::ROOT) {
        container
    } else {
        enclosing_target(&parent)
    }
}

/// A portal rendering into the same container as its surroundings.
///
/// Its host nodes are siblings of the nodes around it and take part in
/// ordering like those of any other component.
fn is_inline_portal(instance: &InstanceRef) -> bool {
    let container = {
        let inst = instance.borrow();
        if !inst.flags().contains(InstanceFlags::ROOT) {
            return false;
        }
        container_of(&inst)
    };
    container.is_some() && container == enclosing_target(instance)
}

/// Whether a portal instance contributes its nodes to `target`.
fn renders_into(instance: &Instance, target: Option<HostId>) -> bool {
    target.is_some() && container_of(instance) == target
}

/// Host nodes directly inserted into `target` by `instance`.
///
/// Portals contribute only when their container is `target` itself.
pub(crate) fn top_level_host_nodes(instance: &InstanceRef, target: Option<HostId>) -> Vec<HostId> {
    fn collect(instance: &InstanceRef, target: Option<HostId>, out: &mut Vec<HostId>) {
        let inst = instance.borrow();
        if inst.flags().intersects(InstanceFlags::HOST) {
            out.extend(inst.dom());
            return;
        }
        if inst.flags().contains(InstanceFlags::ROOT) && !renders_into(&inst, target) {
            return;
        }
        for child in inst.children().into_iter().flatten() {
            collect(child, target, out);
        }
    }
    let mut out = Vec::new();
    collect(instance, target, &mut out);
    out
}

fn first_host_node(instance: &InstanceRef, target: Option<HostId>) -> Option<HostId> {
    let inst = instance.borrow();
    if inst.flags().intersects(InstanceFlags::HOST) {
        return inst.dom();
    }
    if inst.flags().contains(InstanceFlags::ROOT) && !renders_into(&inst, target) {
        return None;
    }
    inst.children()?
        .iter()
        .find_map(|child| first_host_node(child, target))
}

fn next_host_after(instance: &InstanceRef) -> Option<HostId> {
    let parent = instance.borrow().parent()?;
    let target = enclosing_target(instance);
    {
        let p = parent.borrow();
        let siblings = p.children()?;
        let index = siblings.iter().position(|c| Rc::ptr_eq(c, instance))?;
        let found = siblings[index + 1..]
            .iter()
            .find_map(|sibling| first_host_node(sibling, target));
        if found.is_some() {
            return found;
        }
        if p.flags().contains(InstanceFlags::ELEMENT) {
            return None;
        }
    }
    if parent.borrow().flags().contains(InstanceFlags::ROOT) && !is_inline_portal(&parent) {
        return None;
    }
    next_host_after(&parent)
}

/// Tear down `instance` and its subtree.
///
/// Class components get `component_will_unmount`, parents before children.
/// With `remove_dom`, top-level host nodes are detached; nodes below a
/// removed element go with it.
pub fn unmount(pass: &mut RenderPass<'_>, instance: &InstanceRef, remove_dom: bool) {
    let (component, children, dom, flags) = {
        let mut inst = instance.borrow_mut();
        inst.commit_callbacks.clear();
        (
            inst.take_component(),
            inst.children.take(),
            inst.dom(),
            inst.flags(),
        )
    };

    if let Some(Mounted::Class(component)) = &component {
        component.imp.borrow_mut().component_will_unmount();
    }

    let is_host = flags.intersects(InstanceFlags::HOST);
    if is_host && remove_dom {
        if let Some(dom) = dom {
            pass.host().remove(dom);
        }
    }

    let nested = if flags.contains(InstanceFlags::ROOT) {
        true
    } else if is_host {
        false
    } else {
        remove_dom
    };
    for child in children.iter().flatten() {
        unmount(pass, child, nested);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;
    use crate::options::Options;
    use crate::types::Props;
    use crate::vnode::{fragment, h, h_keyed};

    fn element(pass: &mut RenderPass<'_>, tag: &str) -> InstanceRef {
        let dom = pass.host().create_element(tag, false);
        Instance::for_type(&NodeType::Element(tag.into()), None, Some(dom))
    }

    #[test]
    fn test_flatten_skips_empty() {
        let nodes = [
            Node::Empty,
            Node::list([Node::from("a"), Node::Empty, Node::list([Node::from("b")])]),
        ];
        let flat = flatten(&nodes);
        assert_eq!(flat.len(), 2);
    }

    #[test]
    fn test_keyed_reorder() {
        let mut host = MemoryHost::new();
        let mut pass = RenderPass::new(&mut host, Rc::new(Options::default()), None);
        let ul = element(&mut pass, "ul");
        let ul_dom = ul.borrow().dom();
        pass.set_parent_dom(ul_dom);

        let items = |keys: &[&str]| -> Vec<Node> {
            keys.iter()
                .map(|k| h_keyed("li", *k, Props::new(), Node::from(*k)))
                .collect()
        };

        KeyedChildren.diff(&mut pass, &items(&["a", "b", "c"]), &ul, None);
        let before = ul.borrow().children().unwrap().to_vec();

        KeyedChildren.diff(&mut pass, &items(&["c", "a"]), &ul, None);
        let after = ul.borrow().children().unwrap().to_vec();
        assert_eq!(after.len(), 2);
        assert!(Rc::ptr_eq(&after[0], &before[2]));
        assert!(Rc::ptr_eq(&after[1], &before[0]));
        drop(pass);

        assert_eq!(host.markup(ul_dom.unwrap()), "<li>c</li><li>a</li>");
    }

    #[test]
    fn test_svg_is_inherited() {
        let mut host = MemoryHost::new();
        let mut pass = RenderPass::new(&mut host, Rc::new(Options::default()), None);
        let div = element(&mut pass, "div");
        pass.set_parent_dom(div.borrow().dom());

        let tree = h("svg", Props::new(), fragment(h("path", Props::new(), Node::Empty)));
        KeyedChildren.mount(&mut pass, &[tree], &div, None);

        let first_child = |inst: &InstanceRef| inst.borrow().children().unwrap()[0].clone();

        let svg = first_child(&div);
        assert!(svg.borrow().flags().contains(InstanceFlags::SVG));

        let path = first_child(&first_child(&svg));
        assert!(path.borrow().flags().contains(InstanceFlags::SVG));
        assert!(!div.borrow().flags().contains(InstanceFlags::SVG));
    }

    #[test]
    fn test_dom_sibling_skips_empty_components() {
        let mut host = MemoryHost::new();
        let mut pass = RenderPass::new(&mut host, Rc::new(Options::default()), None);
        let div = element(&mut pass, "div");
        pass.set_parent_dom(div.borrow().dom());

        let nodes = [fragment(Node::Empty), fragment(Node::Empty), h("b", Props::new(), Node::Empty)];
        KeyedChildren.mount(&mut pass, &nodes, &div, None);

        let children = div.borrow().children().unwrap().to_vec();
        let b_dom = children[2].borrow().dom();
        assert!(b_dom.is_some());
        assert_eq!(KeyedChildren.dom_sibling(&pass, &children[0]), b_dom);
        assert_eq!(KeyedChildren.dom_sibling(&pass, &children[2]), None);
    }
}
