//! Host-element patching.
//!
//! Reserved props (`key`, `children`, raw markup) never reach the host as
//! properties. Controlled `value` / `checked` are compared against the live
//! host value, not only against the previous prop.

use std::rc::Rc;

use tracing::warn;

use crate::engine::{InstanceFlags, InstanceRef, RenderPass};
use crate::types::{CHECKED, CHILDREN, INNER_HTML, KEY, VALUE, Value};
use crate::vnode::{Description, Node};

fn markup(value: Option<&Value>) -> Option<Rc<str>> {
    match value {
        Some(Value::Html(markup)) => Some(markup.clone()),
        _ => None,
    }
}

/// Diff `instance`'s committed props against `desc` and write the
/// difference to its host element, then reconcile its children.
pub fn patch_host_element(pass: &mut RenderPass<'_>, desc: &Description, instance: &InstanceRef) {
    let (dom, old_props, svg) = {
        let inst = instance.borrow();
        (inst.dom(), inst.props().clone(), inst.flags().contains(InstanceFlags::SVG))
    };
    let Some(dom) = dom else {
        warn!(tag = desc.ty().name(), "element instance without host node");
        return;
    };
    let new_props = desc.props().clone();
    instance.borrow_mut().props = new_props.clone();

    for (name, value) in old_props.iter() {
        match name {
            KEY | CHILDREN | INNER_HTML => {}
            _ if !new_props.contains_key(name) => {
                pass.host().set_property(dom, name, None, Some(value), svg);
            }
            _ => {}
        }
    }

    let mut children = Node::Empty;
    for (name, value) in new_props.iter() {
        match name {
            KEY | INNER_HTML => {}
            CHILDREN => children = new_props.children(),
            _ => {
                let old = old_props.get(name);
                let changed = !old.is_some_and(|old| old.same(value));
                let diverged = (name == VALUE || name == CHECKED)
                    && !value.is_null()
                    && !pass
                        .host_ref()
                        .live_property(dom, name)
                        .is_some_and(|live| live.same(value));
                if changed || diverged {
                    pass.host().set_property(dom, name, Some(value), old, svg);
                }
            }
        }
    }

    let old_html = markup(old_props.get(INNER_HTML));
    match markup(new_props.get(INNER_HTML)) {
        Some(html) => {
            let stale = match &old_html {
                None => true,
                Some(old) => *old != html && pass.host_ref().inner_html(dom) != *html,
            };
            if stale {
                let reconciled = instance
                    .borrow()
                    .children()
                    .is_some_and(|children| !children.is_empty());
                if reconciled {
                    let reconciler = pass.options().children().clone();
                    reconciler.diff(pass, &[], instance, None);
                }
                pass.host().set_inner_html(dom, &html);
            }
            instance.borrow_mut().set_children(None);
        }
        None => {
            if old_html.is_some() {
                pass.host().set_inner_html(dom, "");
            }
            let saved = pass.parent_dom();
            pass.set_parent_dom(Some(dom));
            let cursor = pass.host_ref().first_child(dom);
            let reconciler = pass.options().children().clone();
            reconciler.diff(pass, &children.into_vec(), instance, cursor);
            pass.set_parent_dom(saved);
        }
    }

    let controlled = [VALUE, CHECKED]
        .into_iter()
        .find_map(|name| new_props.get(name).filter(|value| !value.is_null()));
    if let Some(value) = controlled {
        if pass.host_ref().is_controlled(dom) {
            pass.host().record_controlled_value(dom, value);
        }
    }
}
