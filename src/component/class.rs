//! Class component executor.
//!
//! Mount: construct → derive state → will-mount → queue did-mount → render.
//! Update: derive state → will-receive-props → should-update gate →
//! will-update → render → snapshot → queue did-update.
//!
//! Only the implementation cell is held across a lifecycle call. Slots are
//! borrowed per access, and the instance is never borrowed while component
//! code runs.

use std::rc::Rc;

use tracing::debug;

use super::{ClassCx, ClassInstance, ClassSlots, ComponentContext, Lifecycle, Mounted};
use crate::engine::{InstanceFlags, InstanceRef, RenderPass, add_commit_callback};
use crate::error::Interrupt;
use crate::types::{Props, Value};
use crate::vnode::{Description, Node, NodeType};

fn class_cx<'a>(component: &'a ClassInstance, instance: &'a InstanceRef) -> ClassCx<'a> {
    ClassCx {
        slots: &component.slots,
        instance,
    }
}

pub(crate) fn render_class_component(
    pass: &mut RenderPass<'_>,
    desc: &Description,
    instance: &InstanceRef,
    context: ComponentContext,
) -> Result<Node, Interrupt> {
    let ty = match instance.borrow().node_type() {
        Some(NodeType::Class(ty)) => ty.clone(),
        _ => return Ok(Node::Empty),
    };
    let new_props = desc.props().clone();

    let existing = match instance.borrow().component() {
        Some(Mounted::Class(component)) => Some(component.clone()),
        _ => None,
    };
    let (component, is_new) = match existing {
        Some(component) => (component, false),
        None => {
            let mut imp = ty.construct(&new_props, &context)?;
            let state = imp.initial_state().map(Props::from_map).unwrap_or_default();
            let slots = ClassSlots {
                props: new_props.clone(),
                next_state: state.clone(),
                state,
                context: context.clone(),
            };
            let component = Rc::new(ClassInstance::new(imp, slots));
            let mut inst = instance.borrow_mut();
            inst.component = Some(Mounted::Class(component.clone()));
            inst.set_flags(InstanceFlags::DIRTY);
            (component, true)
        }
    };

    let derive = ty.derive_state().cloned();
    if let Some(derive) = &derive {
        let partial = {
            let pending = component.next_state();
            derive(&new_props, &pending)
        };
        if let Some(partial) = partial {
            component.slots.borrow_mut().next_state.merge(partial);
        }
    }

    let old_props = component.props();
    let old_state = component.state();
    let hooks = component.imp.borrow().lifecycle();

    if is_new {
        if derive.is_none() && hooks.contains(Lifecycle::WILL_MOUNT) {
            component
                .imp
                .borrow_mut()
                .component_will_mount(&mut class_cx(&component, instance))?;
        }
        if hooks.contains(Lifecycle::DID_MOUNT) {
            // Queued now so it runs on the first commit, even after a suspension.
            let component = component.clone();
            let weak = Rc::downgrade(instance);
            add_commit_callback(instance, move || {
                let Some(instance) = weak.upgrade() else {
                    return Ok(());
                };
                component
                    .imp
                    .borrow_mut()
                    .component_did_mount(&mut class_cx(&component, &instance))
            });
        }
    } else {
        if derive.is_none()
            && !new_props.ptr_eq(&old_props)
            && hooks.contains(Lifecycle::WILL_RECEIVE_PROPS)
        {
            component.imp.borrow_mut().component_will_receive_props(
                &mut class_cx(&component, instance),
                &new_props,
                &context,
            )?;
        }

        let forced = instance.borrow().flags().contains(InstanceFlags::FORCE_UPDATE);
        let rejected = if !forced && hooks.contains(Lifecycle::SHOULD_UPDATE) {
            let next_state = component.next_state();
            !component.imp.borrow_mut().should_component_update(
                &mut class_cx(&component, instance),
                &new_props,
                &next_state,
                &context,
            )?
        } else {
            false
        };

        if rejected || desc.id() == instance.borrow().description_id() {
            debug!(component = ty.name(), rejected, "class update skipped");
            {
                let mut slots = component.slots.borrow_mut();
                slots.props = new_props;
                slots.commit_state();
            }
            instance.borrow_mut().set_flags(InstanceFlags::SKIP_CHILDREN);
            return Ok(Node::Empty);
        }

        if hooks.contains(Lifecycle::WILL_UPDATE) {
            let next_state = component.next_state();
            component.imp.borrow_mut().component_will_update(
                &mut class_cx(&component, instance),
                &new_props,
                &next_state,
                &context,
            )?;
        }
    }

    {
        let mut slots = component.slots.borrow_mut();
        slots.context = context;
        slots.props = new_props.clone();
        slots.commit_state();
    }
    instance.borrow_mut().props = new_props;

    if let Some(hook) = &pass.options().before_render {
        hook(instance);
    }
    instance
        .borrow_mut()
        .clear_flags(InstanceFlags::DIRTY | InstanceFlags::FORCE_UPDATE);

    let output = component
        .imp
        .borrow_mut()
        .render(&mut class_cx(&component, instance))?;
    // Updates issued during render are kept for the next pass.
    component.slots.borrow_mut().commit_state();

    let provided = component
        .imp
        .borrow()
        .child_context(&class_cx(&component, instance));
    if let Some(values) = provided {
        let mut extended = (**pass.context()).clone();
        extended.extend(values);
        pass.set_context(Rc::new(extended));
    }

    if !is_new {
        let snapshot = if hooks.contains(Lifecycle::SNAPSHOT) {
            component.imp.borrow_mut().get_snapshot_before_update(
                &mut class_cx(&component, instance),
                &old_props,
                &old_state,
            )?
        } else {
            Value::Null
        };

        if hooks.contains(Lifecycle::DID_UPDATE) {
            let component = component.clone();
            let weak = Rc::downgrade(instance);
            add_commit_callback(instance, move || {
                let Some(instance) = weak.upgrade() else {
                    return Ok(());
                };
                component.imp.borrow_mut().component_did_update(
                    &mut class_cx(&component, &instance),
                    &old_props,
                    &old_state,
                    &snapshot,
                )
            });
        }
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::component::{ClassType, Component};
    use crate::engine::Instance;
    use crate::host::MemoryHost;
    use crate::options::Options;
    use crate::types::{Map, State, map};

    type Log = Rc<RefCell<Vec<&'static str>>>;

    struct Recorder {
        log: Log,
        allow_update: bool,
    }

    impl Component for Recorder {
        fn initial_state(&mut self) -> Option<Map> {
            Some(map([("n", 0)]))
        }

        fn render(&mut self, _cx: &mut ClassCx<'_>) -> Result<Node, Interrupt> {
            self.log.borrow_mut().push("render");
            Ok(Node::Empty)
        }

        fn component_will_mount(&mut self, _cx: &mut ClassCx<'_>) -> Result<(), Interrupt> {
            self.log.borrow_mut().push("will_mount");
            Ok(())
        }

        fn component_did_mount(&mut self, _cx: &mut ClassCx<'_>) -> Result<(), Interrupt> {
            self.log.borrow_mut().push("did_mount");
            Ok(())
        }

        fn should_component_update(
            &mut self,
            _cx: &mut ClassCx<'_>,
            _next_props: &Props,
            _next_state: &State,
            _context: &ComponentContext,
        ) -> Result<bool, Interrupt> {
            self.log.borrow_mut().push("should_update");
            Ok(self.allow_update)
        }
    }

    fn recorder_type(log: &Log, allow_update: bool) -> ClassType {
        let log = log.clone();
        ClassType::new("Recorder", move |_, _| {
            Ok(Box::new(Recorder {
                log: log.clone(),
                allow_update,
            }))
        })
    }

    #[test]
    fn test_mount_order() {
        let log: Log = Rc::default();
        let ty = NodeType::Class(recorder_type(&log, true));
        let instance = Instance::for_type(&ty, None, None);
        let desc = Description::new(ty, Props::new(), None);

        let mut host = MemoryHost::new();
        let mut pass = RenderPass::new(&mut host, Rc::new(Options::default()), None);
        render_class_component(&mut pass, &desc, &instance, Default::default()).unwrap();

        assert_eq!(*log.borrow(), vec!["will_mount", "render"]);
        assert_eq!(instance.borrow().pending_commit_callbacks(), 1);

        let state = instance.borrow().component().and_then(Mounted::state);
        assert_eq!(state.and_then(|s| s.int("n")), Some(0));
    }

    #[test]
    fn test_should_update_false_skips_render() {
        let log: Log = Rc::default();
        let ty = NodeType::Class(recorder_type(&log, false));
        let instance = Instance::for_type(&ty, None, None);

        let mut host = MemoryHost::new();
        let mut pass = RenderPass::new(&mut host, Rc::new(Options::default()), None);
        let first = Description::new(ty.clone(), Props::new(), None);
        render_class_component(&mut pass, &first, &instance, Default::default()).unwrap();
        instance.borrow_mut().description_id = first.id();
        log.borrow_mut().clear();

        let props = Props::new().with("x", 1);
        let second = Description::new(ty, props.clone(), None);
        render_class_component(&mut pass, &second, &instance, Default::default()).unwrap();

        assert_eq!(*log.borrow(), vec!["should_update"]);
        assert!(instance.borrow().flags().contains(InstanceFlags::SKIP_CHILDREN));
        let committed = instance.borrow().component().map(Mounted::props);
        assert!(committed.is_some_and(|p| p.ptr_eq(&props)));
    }

    struct Introspect {
        seen: Rc<RefCell<Vec<Option<i64>>>>,
    }

    impl Component for Introspect {
        fn initial_state(&mut self) -> Option<Map> {
            Some(map([("n", 3)]))
        }

        fn render(&mut self, cx: &mut ClassCx<'_>) -> Result<Node, Interrupt> {
            let state = cx.instance().borrow().component().and_then(Mounted::state);
            self.seen.borrow_mut().push(state.and_then(|s| s.int("n")));
            Ok(Node::Empty)
        }

        fn component_did_mount(&mut self, cx: &mut ClassCx<'_>) -> Result<(), Interrupt> {
            let props = cx.instance().borrow().component().map(Mounted::props);
            self.seen.borrow_mut().push(props.and_then(|p| p.int("x")));
            Ok(())
        }
    }

    #[test]
    fn test_component_can_inspect_itself_during_lifecycle() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let record = seen.clone();
        let ty = NodeType::Class(ClassType::new("Introspect", move |_, _| {
            Ok(Box::new(Introspect {
                seen: record.clone(),
            }))
        }));
        let instance = Instance::for_type(&ty, None, None);
        let desc = Description::new(ty, Props::new().with("x", 5), None);

        let mut host = MemoryHost::new();
        let mut pass = RenderPass::new(&mut host, Rc::new(Options::default()), None);
        render_class_component(&mut pass, &desc, &instance, Default::default()).unwrap();
        pass.schedule_commit(&instance);
        pass.commit(&instance);

        assert_eq!(*seen.borrow(), vec![Some(3), Some(5)]);
    }
}
