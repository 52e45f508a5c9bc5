//! Commit queue - deferred post-mutation callbacks.
//!
//! Callbacks are stored on the instance that registered them. The walk queues
//! an instance once it holds at least one; [`commit_root`] drains the queue
//! after the whole pass has applied its mutations.

use tracing::debug;

use super::instance::InstanceRef;
use super::pass::RenderPass;
use crate::error::Interrupt;

/// Append a callback to `instance`'s pending commit callbacks.
pub fn add_commit_callback(
    instance: &InstanceRef,
    callback: impl FnOnce() -> Result<(), Interrupt> + 'static,
) {
    instance
        .borrow_mut()
        .commit_callbacks
        .push_back(Box::new(callback));
}

/// Run every queued instance's callbacks, FIFO per instance.
///
/// The queue is taken before anything runs: callbacks that schedule more work
/// land on the next drain. A failing callback is reported against its
/// instance, the rest of that instance's callbacks stay queued, and draining
/// moves on to the next instance.
pub fn commit_root(pass: &mut RenderPass<'_>, root: &InstanceRef) {
    let queue = std::mem::take(&mut pass.commit_queue);
    let options = pass.options().clone();

    debug!(queued = queue.len(), "draining commit queue");

    if let Some(hook) = &options.on_commit {
        hook(root, &queue);
    }

    for instance in &queue {
        let count = instance.borrow().commit_callbacks.len();
        for _ in 0..count {
            // Borrow ends before the callback runs.
            let next = instance.borrow_mut().commit_callbacks.pop_front();
            let Some(callback) = next else { break };
            if let Err(err) = callback() {
                options.report(&err, instance);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::engine::Instance;
    use crate::host::MemoryHost;
    use crate::options::Options;
    use crate::vnode::NodeType;

    fn instance() -> InstanceRef {
        Instance::for_type(&NodeType::Fragment, None, None)
    }

    #[test]
    fn test_fifo_per_instance() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let inst = instance();
        for i in 0..3 {
            let log = log.clone();
            add_commit_callback(&inst, move || {
                log.borrow_mut().push(i);
                Ok(())
            });
        }

        let mut host = MemoryHost::new();
        let mut pass = RenderPass::new(&mut host, Rc::new(Options::default()), None);
        pass.schedule_commit(&inst);
        pass.commit(&inst);

        assert_eq!(*log.borrow(), vec![0, 1, 2]);
        assert_eq!(inst.borrow().pending_commit_callbacks(), 0);
        assert!(pass.queued().is_empty());
    }

    #[test]
    fn test_failure_is_isolated() {
        let ran = Rc::new(RefCell::new(Vec::new()));
        let reported = Rc::new(RefCell::new(0));

        let first = instance();
        add_commit_callback(&first, || Err(Interrupt::fail("boom")));
        {
            let ran = ran.clone();
            add_commit_callback(&first, move || {
                ran.borrow_mut().push("first-after");
                Ok(())
            });
        }
        let second = instance();
        {
            let ran = ran.clone();
            add_commit_callback(&second, move || {
                ran.borrow_mut().push("second");
                Ok(())
            });
        }

        let counter = reported.clone();
        let options = Options::new().on_error(move |_, _| *counter.borrow_mut() += 1);
        let mut host = MemoryHost::new();
        let mut pass = RenderPass::new(&mut host, Rc::new(options), None);
        pass.schedule_commit(&first);
        pass.schedule_commit(&second);
        pass.commit(&first);

        assert_eq!(*ran.borrow(), vec!["second"]);
        assert_eq!(*reported.borrow(), 1);
        assert_eq!(first.borrow().pending_commit_callbacks(), 1);
    }
}
