//! Reconciler engine - instance tree, pass state and commit queue.
//!
//! The engine manages the core data structures:
//! - Flags: kind / mode / signal bits of an instance
//! - Instance: the persistent node of the retained tree
//! - RenderPass: insertion target, context and commit queue of one pass
//! - Commit: deferred post-mutation callbacks
//! - Root: runs a whole pass against a host container
//!
//! # Architecture
//!
//! ```text
//! Root::render(node)
//!   └─ RenderPass ── patch(root) ── patch(child) ── ...   (depth first)
//!                                        │
//!                  commit_root ◄─────────┘ instances with callbacks
//! ```

mod commit;
mod flags;
mod instance;
mod pass;
mod root;

pub use commit::*;
pub use flags::*;
pub use instance::*;
pub use pass::RenderPass;
pub use root::*;
