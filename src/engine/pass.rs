//! RenderPass - state threaded through one render pass.
//!
//! Holds what would otherwise be process-wide: the current insertion target,
//! the ambient context mapping and the commit queue. The walk saves the first
//! two before descending into an instance and restores them on the way out,
//! so sibling subtrees never see each other's scope.

use std::rc::Rc;

use super::commit::commit_root;
use super::instance::InstanceRef;
use crate::component::ContextMap;
use crate::diff;
use crate::host::Host;
use crate::options::Options;
use crate::types::HostId;
use crate::vnode::Node;

pub struct RenderPass<'h> {
    host: &'h mut dyn Host,
    options: Rc<Options>,
    parent_dom: Option<HostId>,
    pub(crate) context: ContextMap,
    pub(crate) commit_queue: Vec<InstanceRef>,
}

/// Insertion target and context captured on entry to an instance.
pub(crate) struct Scope {
    parent_dom: Option<HostId>,
    context: ContextMap,
}

impl<'h> RenderPass<'h> {
    /// Fresh pass state: target `container`, empty context, empty queue.
    pub fn new(host: &'h mut dyn Host, options: Rc<Options>, container: Option<HostId>) -> Self {
        Self {
            host,
            options,
            parent_dom: container,
            context: ContextMap::default(),
            commit_queue: Vec::new(),
        }
    }

    #[inline]
    pub fn host(&mut self) -> &mut dyn Host {
        &mut *self.host
    }

    #[inline]
    pub fn host_ref(&self) -> &dyn Host {
        &*self.host
    }

    /// Shared handle; clone it before calling into a collaborator.
    #[inline]
    pub fn options(&self) -> &Rc<Options> {
        &self.options
    }

    #[inline]
    pub fn parent_dom(&self) -> Option<HostId> {
        self.parent_dom
    }

    #[inline]
    pub fn set_parent_dom(&mut self, parent_dom: Option<HostId>) {
        self.parent_dom = parent_dom;
    }

    pub fn context(&self) -> &ContextMap {
        &self.context
    }

    pub(crate) fn set_context(&mut self, context: ContextMap) {
        self.context = context;
    }

    pub(crate) fn save_scope(&self) -> Scope {
        Scope {
            parent_dom: self.parent_dom,
            context: self.context.clone(),
        }
    }

    pub(crate) fn restore_scope(&mut self, scope: Scope) {
        self.parent_dom = scope.parent_dom;
        self.context = scope.context;
    }

    /// Queue `instance` for the commit drain. Scheduling twice is a no-op.
    pub fn schedule_commit(&mut self, instance: &InstanceRef) {
        if !self.commit_queue.iter().any(|queued| Rc::ptr_eq(queued, instance)) {
            self.commit_queue.push(instance.clone());
        }
    }

    /// Instances waiting for the drain.
    pub fn queued(&self) -> &[InstanceRef] {
        &self.commit_queue
    }

    /// Reconcile `instance` against `node`.
    pub fn patch(&mut self, node: &Node, instance: &InstanceRef) {
        diff::patch(self, node, instance);
    }

    /// Drain the commit queue.
    pub fn commit(&mut self, root: &InstanceRef) {
        commit_root(self, root);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Instance;
    use crate::host::MemoryHost;
    use crate::vnode::NodeType;

    #[test]
    fn test_scope_restore() {
        let mut host = MemoryHost::new();
        let container = host.container();
        let mut pass = RenderPass::new(&mut host, Rc::new(Options::default()), Some(container));

        let scope = pass.save_scope();
        pass.set_parent_dom(Some(HostId(99)));
        let mut extended = (**pass.context()).clone();
        extended.insert(crate::component::create_context(0).id(), 1.into());
        pass.set_context(Rc::new(extended));

        pass.restore_scope(scope);
        assert_eq!(pass.parent_dom(), Some(container));
        assert!(pass.context().is_empty());
    }

    #[test]
    fn test_schedule_is_idempotent() {
        let mut host = MemoryHost::new();
        let mut pass = RenderPass::new(&mut host, Rc::new(Options::default()), None);
        let inst = Instance::for_type(&NodeType::Fragment, None, None);

        pass.schedule_commit(&inst);
        pass.schedule_commit(&inst);
        assert_eq!(pass.queued().len(), 1);
    }
}
