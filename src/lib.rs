//! # spark-reconciler
//!
//! Retained-tree reconciliation engine.
//!
//! Every render pass produces a fresh tree of immutable [`Description`]s. The
//! engine walks its persistent tree of [`Instance`]s against it, runs
//! component logic with a fixed lifecycle order, applies the minimal set of
//! host mutations through the [`Host`] trait, and finally drains the commit
//! queue of post-mutation callbacks.
//!
//! ## Architecture
//!
//! ```text
//! Node (descriptions) ──► patch ──► component executor ──► child reconciler
//!                           │                                   │
//!                           └── host-element patcher ◄──────────┘
//!                                        │
//!                                    Host trait ──► commit queue drain
//! ```
//!
//! State that a pass needs everywhere (insertion target, context mapping,
//! commit queue) lives in an explicit [`RenderPass`] threaded through the
//! walk, never in globals.
//!
//! ## Modules
//!
//! - [`types`] - Values, props, keys, host handles
//! - [`vnode`] - Descriptions and render output
//! - [`engine`] - Instances, flags, pass state, commit queue, roots
//! - [`component`] - Function and class components, context
//! - [`diff`] - The walk, element patching, child reconciliation
//! - [`host`] - The host contract and an in-memory host
//! - [`options`] - Hooks and collaborators
//! - [`error`] - Interrupts: render errors and suspensions

pub mod component;
pub mod diff;
pub mod engine;
pub mod error;
pub mod host;
pub mod options;
pub mod types;
pub mod vnode;

// Re-export commonly used items
pub use types::*;

pub use component::{
    ClassCx, ClassType, Component, ComponentContext, Context, FunctionCx, FunctionType, Lifecycle,
    Mounted, create_context,
};

pub use diff::{ChildReconciler, KeyedChildren, patch};

pub use engine::{
    Instance, InstanceFlags, InstanceRef, RESET_MODE, RenderPass, Root, add_commit_callback,
    commit_root,
};

pub use error::{Awaitable, ComponentError, Interrupt, Pending, Suspension};

pub use host::{Host, MemoryHost, Mutation};

pub use options::Options;

pub use vnode::{
    Description, Node, NodeType, class, component as component_node, fragment, function, h,
    h_keyed, portal, text,
};
