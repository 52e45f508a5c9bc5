//! Root - entry point for rendering into a host container.
//!
//! ```ignore
//! let mut host = MemoryHost::new();
//! let container = host.container();
//! let root = Root::new(container);
//! root.render(&mut host, h("p", Props::new(), "hello".into()));
//! ```

use std::rc::Rc;

use tracing::trace;

use super::instance::{Instance, InstanceRef};
use super::pass::RenderPass;
use crate::host::Host;
use crate::options::Options;
use crate::types::HostId;
use crate::vnode::{NodeType, Node, portal};

/// A tree rendered into one container.
///
/// The root instance is a root-portal targeting the container, so every
/// render goes through the same walk as a nested portal.
pub struct Root {
    container: HostId,
    instance: InstanceRef,
    options: Rc<Options>,
}

impl Root {
    pub fn new(container: HostId) -> Self {
        Self::with_options(container, Options::default())
    }

    pub fn with_options(container: HostId, options: Options) -> Self {
        Self {
            container,
            instance: Instance::for_type(&NodeType::Portal, None, None),
            options: Rc::new(options),
        }
    }

    pub fn container(&self) -> HostId {
        self.container
    }

    pub fn instance(&self) -> &InstanceRef {
        &self.instance
    }

    pub fn options(&self) -> &Rc<Options> {
        &self.options
    }

    /// Run one complete pass: walk, then drain the commit queue.
    pub fn render(&self, host: &mut dyn Host, node: impl Into<Node>) {
        trace!(container = %self.container, "render pass");
        let description = portal(self.container, node);
        let mut pass = RenderPass::new(host, self.options.clone(), Some(self.container));
        pass.patch(&description, &self.instance);
        pass.commit(&self.instance);
    }

    /// Render nothing, unmounting the whole tree.
    pub fn unmount(&self, host: &mut dyn Host) {
        self.render(host, Node::Empty);
    }
}
