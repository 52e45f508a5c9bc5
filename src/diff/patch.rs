//! The reconciler walk.
//!
//! ```text
//! patch(node, instance)
//!   text?      ── write if changed, done
//!   foreign?   ── reject
//!   element?   ── patch_host_element, done
//!   portal?    ── retarget insertion, relocate host nodes
//!   component  ── execute ─┬─ skip-children ── adopt props
//!                          └─ output ── mount | diff children
//!   failure    ── flag suspended / errored, report
//!   always     ── after-diff hook, reset transient modes, adopt id
//! ```

use std::rc::Rc;

use tracing::{debug, trace, warn};

use super::element::patch_host_element;
use crate::component::class::render_class_component;
use crate::component::function::render_function_component;
use crate::component::ComponentContext;
use crate::engine::{InstanceFlags, InstanceRef, RESET_MODE, RenderPass};
use crate::error::Interrupt;
use crate::types::{CONTAINER, Value};
use crate::vnode::{Description, Node};

/// Reconcile `instance` against `node`.
///
/// Failures never escape: a component that suspends or errors leaves its
/// instance flagged and is handed to the error hook, and the caller moves on
/// to the next sibling.
pub fn patch(pass: &mut RenderPass<'_>, node: &Node, instance: &InstanceRef) {
    let flags = instance.borrow().flags();

    if flags.contains(InstanceFlags::TEXT) {
        match node {
            Node::Text(content) => patch_text(pass, content, instance),
            other => warn!(node = ?other, "text instance patched with non-text node"),
        }
        return;
    }

    let Some(desc) = node.description().map(|d| &**d) else {
        warn!(node = ?node, "expected a description");
        return;
    };
    if !desc.is_trusted() {
        warn!(description = ?desc, "rejected foreign description");
        return;
    }

    trace!(instance = instance.borrow().name(), id = desc.id(), "patch");

    let options = pass.options().clone();
    if let Some(hook) = &options.before_diff {
        hook(instance, desc);
    }

    if flags.contains(InstanceFlags::ELEMENT) {
        if desc.id() != instance.borrow().description_id() {
            patch_host_element(pass, desc, instance);
            instance.borrow_mut().description_id = desc.id();
        } else {
            debug!(tag = desc.ty().name(), "identity bail-out");
        }
        if let Some(hook) = &options.after_diff {
            hook(instance);
        }
        instance.borrow_mut().flags &= RESET_MODE;
        return;
    }

    let entry_dom = pass.parent_dom();
    let scope = pass.save_scope();

    if flags.contains(InstanceFlags::ROOT) {
        let target = desc.container();
        pass.set_parent_dom(target);

        let previous = instance.borrow().props().get(CONTAINER).and_then(Value::as_host);
        if previous != target {
            let children = options.children().clone();
            let next_sibling = if target == entry_dom {
                children.dom_sibling(pass, instance)
            } else {
                None
            };
            if let Some(target) = target {
                children.insert_component_dom(pass, instance, next_sibling, target);
            }
        }
    }

    let result = render_component(pass, desc, instance);
    pass.restore_scope(scope);

    if let Err(interrupt) = result {
        let mode = if interrupt.is_suspense() {
            InstanceFlags::SUSPENDED
        } else {
            InstanceFlags::ERRORED
        };
        instance.borrow_mut().set_flags(mode);
        options.report(&interrupt, instance);
    }

    if let Some(hook) = &options.after_diff {
        hook(instance);
    }
    let mut inst = instance.borrow_mut();
    inst.flags &= RESET_MODE;
    inst.description_id = desc.id();
}

fn patch_text(pass: &mut RenderPass<'_>, content: &Rc<str>, instance: &InstanceRef) {
    let dom = {
        let inst = instance.borrow();
        if inst.text_content() == &**content {
            return;
        }
        inst.dom()
    };
    if let Some(dom) = dom {
        pass.host().set_text(dom, content);
    }
    instance.borrow_mut().text = content.clone();
}

/// Execute the component at `instance` and reconcile what it rendered.
fn render_component(
    pass: &mut RenderPass<'_>,
    desc: &Description,
    instance: &InstanceRef,
) -> Result<(), Interrupt> {
    instance.borrow_mut().flags.toggle_error_recovery();

    let context = match desc.ty().context_type() {
        Some(ctx) => ComponentContext::Value(ctx.resolve(pass.context())),
        None => ComponentContext::Ambient(pass.context().clone()),
    };
    let (is_new, is_class) = {
        let inst = instance.borrow();
        (
            inst.component().is_none(),
            inst.flags().contains(InstanceFlags::CLASS),
        )
    };

    let output = if is_class {
        render_class_component(pass, desc, instance, context)?
    } else {
        render_function_component(pass, desc, instance, context)?
    };

    let skipped = instance.borrow().flags().contains(InstanceFlags::SKIP_CHILDREN);
    if skipped {
        let mut inst = instance.borrow_mut();
        inst.props = desc.props().clone();
        inst.clear_flags(InstanceFlags::SKIP_CHILDREN);
        if desc.id() == inst.description_id {
            inst.clear_flags(InstanceFlags::DIRTY);
        }
    } else {
        let output = match &output {
            Node::Element(d) if d.is_bare_fragment() => d.props().children(),
            other => other.clone(),
        };
        let nodes = output.into_vec();
        let children = pass.options().children().clone();

        let (never_rendered, flags, own_dom) = {
            let inst = instance.borrow();
            (inst.children().is_none(), inst.flags(), inst.dom())
        };
        if never_rendered {
            let resuming = InstanceFlags::HYDRATE | InstanceFlags::SUSPENDED;
            let cursor = if flags.contains(resuming) {
                own_dom
            } else if is_new || flags.contains(InstanceFlags::HYDRATE) {
                None
            } else {
                children.dom_sibling(pass, instance)
            };
            children.mount(pass, &nodes, instance, cursor);
        } else {
            children.diff(pass, &nodes, instance, None);
        }
    }

    if instance.borrow().pending_commit_callbacks() > 0 {
        pass.schedule_commit(instance);
    }
    Ok(())
}
