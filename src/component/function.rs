//! Function component executor.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, warn};

use super::{ComponentContext, FunctionCx, FunctionState, Mounted, RenderFn};
use crate::engine::{InstanceFlags, InstanceRef, RenderPass};
use crate::error::Interrupt;
use crate::vnode::{Description, Node, NodeType};

/// Upper bound on self-triggered invocations within one attempt.
pub const MAX_RERENDERS: usize = 25;

/// Fragments and portals render their children.
fn render_children() -> Rc<RenderFn> {
    Rc::new(|cx: &mut FunctionCx<'_>| Ok(cx.props().children()))
}

/// Run a function-shaped component (including fragments and portals).
pub(crate) fn render_function_component(
    pass: &mut RenderPass<'_>,
    desc: &Description,
    instance: &InstanceRef,
    context: ComponentContext,
) -> Result<Node, Interrupt> {
    let props = desc.props().clone();

    let existing = match instance.borrow().component() {
        Some(Mounted::Function(state)) => Some(state.clone()),
        _ => None,
    };
    let state = match existing {
        Some(state) => state,
        None => {
            let state = Rc::new(RefCell::new(FunctionState {
                props: props.clone(),
                context: context.clone(),
                provided: None,
            }));
            let mut inst = instance.borrow_mut();
            inst.component = Some(Mounted::Function(state.clone()));
            inst.set_flags(InstanceFlags::DIRTY);
            state
        }
    };

    if desc.id() == instance.borrow().description_id() {
        debug!(component = desc.ty().name(), "identity bail-out");
        state.borrow_mut().props = props;
        instance.borrow_mut().set_flags(InstanceFlags::SKIP_CHILDREN);
        return Ok(Node::Empty);
    }

    {
        let mut s = state.borrow_mut();
        s.props = props.clone();
        s.context = context.clone();
    }
    instance.borrow_mut().props = props.clone();

    let render = match instance.borrow().node_type() {
        Some(NodeType::Function(ty)) => ty.render_fn(),
        _ => render_children(),
    };
    let options = pass.options().clone();

    let mut provided;
    let mut output;
    let mut count = 0;
    loop {
        count += 1;
        instance.borrow_mut().clear_flags(InstanceFlags::DIRTY);
        if let Some(hook) = &options.before_render {
            hook(instance);
        }
        provided = None;
        let mut cx = FunctionCx {
            props: &props,
            context: &context,
            instance,
            provided: &mut provided,
        };
        output = render(&mut cx)?;

        if !instance.borrow().flags().contains(InstanceFlags::DIRTY) {
            break;
        }
        if count >= MAX_RERENDERS {
            warn!(
                component = desc.ty().name(),
                limit = MAX_RERENDERS,
                "re-render limit reached, keeping last output"
            );
            break;
        }
    }
    instance.borrow_mut().clear_flags(InstanceFlags::DIRTY);

    if let Some(values) = &provided {
        let mut extended = (**pass.context()).clone();
        extended.extend(values.iter().map(|(id, value)| (*id, value.clone())));
        pass.set_context(Rc::new(extended));
    }
    state.borrow_mut().provided = provided;

    Ok(output)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::component::FunctionType;
    use crate::engine::Instance;
    use crate::host::MemoryHost;
    use crate::options::Options;
    use crate::types::Props;
    use crate::vnode::{Description, NodeType};

    fn setup(ty: &FunctionType) -> (Rc<Description>, InstanceRef) {
        let node_type = NodeType::Function(ty.clone());
        let desc = Description::new(node_type.clone(), Props::new(), None);
        let instance = Instance::for_type(&node_type, None, None);
        (desc, instance)
    }

    #[test]
    fn test_rerender_cap() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let ty = FunctionType::new("Loop", move |cx| {
            counter.set(counter.get() + 1);
            cx.request_rerender();
            Ok(Node::Empty)
        });
        let (desc, instance) = setup(&ty);

        let mut host = MemoryHost::new();
        let mut pass = RenderPass::new(&mut host, Rc::new(Options::default()), None);
        let result = render_function_component(&mut pass, &desc, &instance, Default::default());

        assert!(result.is_ok());
        assert_eq!(calls.get(), MAX_RERENDERS);
        assert!(!instance.borrow().flags().contains(InstanceFlags::DIRTY));
    }

    #[test]
    fn test_rerender_until_clean() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let ty = FunctionType::new("Settle", move |cx| {
            counter.set(counter.get() + 1);
            if counter.get() < 3 {
                cx.request_rerender();
            }
            Ok(Node::Empty)
        });
        let (desc, instance) = setup(&ty);

        let mut host = MemoryHost::new();
        let mut pass = RenderPass::new(&mut host, Rc::new(Options::default()), None);
        render_function_component(&mut pass, &desc, &instance, Default::default()).unwrap();
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_provided_values_extend_context() {
        let ctx = crate::component::create_context("none");
        let provided = ctx.clone();
        let ty = FunctionType::new("P", move |cx| {
            cx.provide(&provided, "set");
            Ok(Node::Empty)
        });
        let (desc, instance) = setup(&ty);

        let mut host = MemoryHost::new();
        let mut pass = RenderPass::new(&mut host, Rc::new(Options::default()), None);
        let before = pass.context().clone();
        render_function_component(&mut pass, &desc, &instance, Default::default()).unwrap();

        assert!(before.is_empty());
        assert!(ctx.resolve(pass.context()).same(&"set".into()));
    }
}
