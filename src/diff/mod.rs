//! Diff - reconciling instances against fresh descriptions.
//!
//! - [`patch`] - the per-instance walk (mount vs update vs skip)
//! - [`patch_host_element`] - property-level diff of one host element
//! - [`ChildReconciler`] - mount / child diff / relocation / sibling lookup

mod children;
mod element;
mod patch;

pub use children::{ChildReconciler, KeyedChildren, unmount};
pub use element::patch_host_element;
pub use patch::patch;
