//! In-memory host.
//!
//! Keeps nodes in an arena indexed by [`HostId`] and records every mutation,
//! so callers can assert both on the resulting tree and on how it got there.
//!
//! Meant for tests: slots are never freed, so a removed node stays
//! addressable (detached) for the lifetime of the host.

use std::collections::BTreeMap;

use super::Host;
use crate::types::{HostId, Value};

/// One mutation applied through the [`Host`] trait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    CreateElement(HostId, String),
    CreateText(HostId, String),
    SetText(HostId, String),
    SetProperty(HostId, String),
    RemoveProperty(HostId, String),
    SetInnerHtml(HostId, String),
    Insert {
        parent: HostId,
        node: HostId,
        before: Option<HostId>,
    },
    Remove(HostId),
}

#[derive(Debug, Clone)]
enum NodeKind {
    Element { tag: String, svg: bool },
    Text(String),
}

#[derive(Debug, Clone)]
struct MemoryNode {
    kind: NodeKind,
    parent: Option<HostId>,
    children: Vec<HostId>,
    props: BTreeMap<String, Value>,
    /// Values changed behind the engine's back.
    live: BTreeMap<String, Value>,
    html: Option<String>,
    controlled: bool,
    controlled_value: Option<Value>,
}

impl MemoryNode {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            props: BTreeMap::new(),
            live: BTreeMap::new(),
            html: None,
            controlled: false,
            controlled_value: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryHost {
    nodes: Vec<MemoryNode>,
    log: Vec<Mutation>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detached container element without logging it.
    pub fn container(&mut self) -> HostId {
        self.alloc(NodeKind::Element {
            tag: "root".into(),
            svg: false,
        })
    }

    fn alloc(&mut self, kind: NodeKind) -> HostId {
        let id = HostId(self.nodes.len());
        self.nodes.push(MemoryNode::new(kind));
        id
    }

    fn node(&self, id: HostId) -> Option<&MemoryNode> {
        self.nodes.get(id.0)
    }

    fn node_mut(&mut self, id: HostId) -> Option<&mut MemoryNode> {
        self.nodes.get_mut(id.0)
    }

    fn detach(&mut self, id: HostId) {
        let parent = self.node_mut(id).and_then(|n| n.parent.take());
        if let Some(parent) = parent.and_then(|p| self.node_mut(p)) {
            parent.children.retain(|c| *c != id);
        }
    }

    // -------------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------------

    pub fn mutations(&self) -> &[Mutation] {
        &self.log
    }

    pub fn clear_mutations(&mut self) {
        self.log.clear();
    }

    pub fn children_of(&self, id: HostId) -> &[HostId] {
        self.node(id).map_or(&[], |n| &n.children)
    }

    pub fn property(&self, id: HostId, name: &str) -> Option<&Value> {
        self.node(id).and_then(|n| n.props.get(name))
    }

    pub fn tag(&self, id: HostId) -> Option<&str> {
        match self.node(id).map(|n| &n.kind) {
            Some(NodeKind::Element { tag, .. }) => Some(tag),
            _ => None,
        }
    }

    pub fn is_svg(&self, id: HostId) -> bool {
        matches!(
            self.node(id).map(|n| &n.kind),
            Some(NodeKind::Element { svg: true, .. })
        )
    }

    pub fn text(&self, id: HostId) -> Option<&str> {
        match self.node(id).map(|n| &n.kind) {
            Some(NodeKind::Text(s)) => Some(s),
            _ => None,
        }
    }

    /// Simulate a change the engine did not make, e.g. user typing.
    pub fn set_live_property(&mut self, id: HostId, name: &str, value: impl Into<Value>) {
        if let Some(node) = self.node_mut(id) {
            node.live.insert(name.to_owned(), value.into());
        }
    }

    pub fn set_controlled(&mut self, id: HostId, controlled: bool) {
        if let Some(node) = self.node_mut(id) {
            node.controlled = controlled;
        }
    }

    pub fn controlled_value(&self, id: HostId) -> Option<&Value> {
        self.node(id).and_then(|n| n.controlled_value.as_ref())
    }

    /// Serialized content of `id` (children only).
    pub fn markup(&self, id: HostId) -> String {
        let mut out = String::new();
        if let Some(node) = self.node(id) {
            self.write_content(node, &mut out);
        }
        out
    }

    /// Serialized `id` including its own tag.
    pub fn outer_markup(&self, id: HostId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    fn write_content(&self, node: &MemoryNode, out: &mut String) {
        match &node.html {
            Some(html) => out.push_str(html),
            None => {
                for child in &node.children {
                    self.write_node(*child, out);
                }
            }
        }
    }

    fn write_node(&self, id: HostId, out: &mut String) {
        let Some(node) = self.node(id) else { return };
        match &node.kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Element { tag, .. } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in &node.props {
                    let rendered = match value {
                        Value::Str(s) => s.to_string(),
                        Value::Int(i) => i.to_string(),
                        Value::Float(x) => x.to_string(),
                        Value::Bool(true) => {
                            out.push(' ');
                            out.push_str(name);
                            continue;
                        }
                        _ => continue,
                    };
                    out.push_str(&format!(" {name}=\"{rendered}\""));
                }
                out.push('>');
                self.write_content(node, out);
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}

impl Host for MemoryHost {
    fn create_element(&mut self, tag: &str, svg: bool) -> HostId {
        let id = self.alloc(NodeKind::Element {
            tag: tag.to_owned(),
            svg,
        });
        self.log.push(Mutation::CreateElement(id, tag.to_owned()));
        id
    }

    fn create_text(&mut self, text: &str) -> HostId {
        let id = self.alloc(NodeKind::Text(text.to_owned()));
        self.log.push(Mutation::CreateText(id, text.to_owned()));
        id
    }

    fn set_text(&mut self, node: HostId, text: &str) {
        if let Some(n) = self.node_mut(node) {
            n.kind = NodeKind::Text(text.to_owned());
        }
        self.log.push(Mutation::SetText(node, text.to_owned()));
    }

    fn set_property(
        &mut self,
        node: HostId,
        name: &str,
        value: Option<&Value>,
        _old: Option<&Value>,
        _svg: bool,
    ) {
        let Some(n) = self.node_mut(node) else { return };
        n.live.remove(name);
        match value {
            Some(value) => {
                n.props.insert(name.to_owned(), value.clone());
                self.log.push(Mutation::SetProperty(node, name.to_owned()));
            }
            None => {
                n.props.remove(name);
                self.log.push(Mutation::RemoveProperty(node, name.to_owned()));
            }
        }
    }

    fn live_property(&self, node: HostId, name: &str) -> Option<Value> {
        let n = self.node(node)?;
        n.live.get(name).or_else(|| n.props.get(name)).cloned()
    }

    fn inner_html(&self, node: HostId) -> String {
        self.markup(node)
    }

    fn set_inner_html(&mut self, node: HostId, markup: &str) {
        let children = match self.node_mut(node) {
            Some(n) => {
                n.html = (!markup.is_empty()).then(|| markup.to_owned());
                std::mem::take(&mut n.children)
            }
            None => return,
        };
        for child in children {
            if let Some(c) = self.node_mut(child) {
                c.parent = None;
            }
        }
        self.log.push(Mutation::SetInnerHtml(node, markup.to_owned()));
    }

    fn parent(&self, node: HostId) -> Option<HostId> {
        self.node(node).and_then(|n| n.parent)
    }

    fn first_child(&self, node: HostId) -> Option<HostId> {
        self.node(node).and_then(|n| n.children.first().copied())
    }

    fn next_sibling(&self, node: HostId) -> Option<HostId> {
        let parent = self.node(self.node(node)?.parent?)?;
        let index = parent.children.iter().position(|c| *c == node)?;
        parent.children.get(index + 1).copied()
    }

    fn insert_before(&mut self, parent: HostId, node: HostId, before: Option<HostId>) {
        self.detach(node);
        let Some(p) = self.node_mut(parent) else { return };
        let index = before
            .and_then(|b| p.children.iter().position(|c| *c == b))
            .unwrap_or(p.children.len());
        p.children.insert(index, node);
        // Markup and tracked children are mutually exclusive.
        p.html = None;
        if let Some(n) = self.node_mut(node) {
            n.parent = Some(parent);
        }
        self.log.push(Mutation::Insert {
            parent,
            node,
            before,
        });
    }

    fn remove(&mut self, node: HostId) {
        self.detach(node);
        self.log.push(Mutation::Remove(node));
    }

    fn is_controlled(&self, node: HostId) -> bool {
        self.node(node).is_some_and(|n| n.controlled)
    }

    fn record_controlled_value(&mut self, node: HostId, value: &Value) {
        if let Some(n) = self.node_mut(node) {
            n.controlled_value = Some(value.clone());
        }
    }
}
