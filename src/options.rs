//! Options - collaborators and pass-lifecycle hooks.
//!
//! Every hook is optional. The child reconciler defaults to
//! [`KeyedChildren`]; the error reporter defaults to logging.
//!
//! ```ignore
//! let options = Options::new()
//!     .on_error(|err, instance| boundary::handle(err, instance))
//!     .after_diff(|instance| devtools::record(instance));
//! let root = Root::with_options(container, options);
//! ```

use std::fmt;
use std::rc::Rc;

use tracing::error;

use crate::diff::{ChildReconciler, KeyedChildren};
use crate::engine::InstanceRef;
use crate::error::Interrupt;
use crate::vnode::Description;

/// Receives every interrupt caught by the walk or the commit drain.
pub type ErrorHook = Rc<dyn Fn(&Interrupt, &InstanceRef)>;

/// Runs before the commit queue drains, with a snapshot of the queue.
pub type CommitHook = Rc<dyn Fn(&InstanceRef, &[InstanceRef])>;

/// Runs before an instance is diffed against a description.
pub type DiffHook = Rc<dyn Fn(&InstanceRef, &Description)>;

/// Runs with a single instance (after diff, before render).
pub type InstanceHook = Rc<dyn Fn(&InstanceRef)>;

#[derive(Clone)]
pub struct Options {
    pub(crate) children: Rc<dyn ChildReconciler>,
    pub(crate) catch_error: Option<ErrorHook>,
    pub(crate) on_commit: Option<CommitHook>,
    pub(crate) before_diff: Option<DiffHook>,
    pub(crate) after_diff: Option<InstanceHook>,
    pub(crate) before_render: Option<InstanceHook>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            children: Rc::new(KeyedChildren),
            catch_error: None,
            on_commit: None,
            before_diff: None,
            after_diff: None,
            before_render: None,
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the mount / child-diff collaborator.
    pub fn with_children(mut self, children: impl ChildReconciler + 'static) -> Self {
        self.children = Rc::new(children);
        self
    }

    pub fn on_error(mut self, hook: impl Fn(&Interrupt, &InstanceRef) + 'static) -> Self {
        self.catch_error = Some(Rc::new(hook));
        self
    }

    pub fn on_commit(mut self, hook: impl Fn(&InstanceRef, &[InstanceRef]) + 'static) -> Self {
        self.on_commit = Some(Rc::new(hook));
        self
    }

    pub fn before_diff(mut self, hook: impl Fn(&InstanceRef, &Description) + 'static) -> Self {
        self.before_diff = Some(Rc::new(hook));
        self
    }

    pub fn after_diff(mut self, hook: impl Fn(&InstanceRef) + 'static) -> Self {
        self.after_diff = Some(Rc::new(hook));
        self
    }

    pub fn before_render(mut self, hook: impl Fn(&InstanceRef) + 'static) -> Self {
        self.before_render = Some(Rc::new(hook));
        self
    }

    pub fn children(&self) -> &Rc<dyn ChildReconciler> {
        &self.children
    }

    /// Forward an interrupt to the error hook, or log it when none is set.
    pub fn report(&self, interrupt: &Interrupt, instance: &InstanceRef) {
        match &self.catch_error {
            Some(hook) => hook(interrupt, instance),
            None => {
                let name = instance.borrow().name().to_owned();
                error!(instance = %name, error = %interrupt, "unhandled render interrupt");
            }
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("catch_error", &self.catch_error.is_some())
            .field("on_commit", &self.on_commit.is_some())
            .field("before_diff", &self.before_diff.is_some())
            .field("after_diff", &self.after_diff.is_some())
            .field("before_render", &self.before_render.is_some())
            .finish_non_exhaustive()
    }
}
