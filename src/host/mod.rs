//! Host - the contract a rendering target must satisfy.
//!
//! The engine never owns host resources. It creates them, positions them and
//! writes properties through this trait, and remembers them by [`HostId`].
//!
//! - [`Host`] - the trait
//! - [`MemoryHost`] - in-memory implementation for tests

mod memory;

pub use memory::{MemoryHost, Mutation};

use crate::types::{HostId, Value};

pub trait Host {
    /// Create a detached element.
    fn create_element(&mut self, tag: &str, svg: bool) -> HostId;

    /// Create a detached text resource.
    fn create_text(&mut self, text: &str) -> HostId;

    fn set_text(&mut self, node: HostId, text: &str);

    /// Apply (`value = Some`) or clear (`value = None`) one property.
    ///
    /// `svg` tells attribute-vs-property decisions apart; the engine does not
    /// interpret it.
    fn set_property(
        &mut self,
        node: HostId,
        name: &str,
        value: Option<&Value>,
        old: Option<&Value>,
        svg: bool,
    );

    /// Current live value of a property, which may differ from the last
    /// written one (e.g. after user input).
    fn live_property(&self, node: HostId, name: &str) -> Option<Value>;

    fn inner_html(&self, node: HostId) -> String;

    /// Replace the content of `node` with raw markup. `""` clears it.
    fn set_inner_html(&mut self, node: HostId, markup: &str);

    fn parent(&self, node: HostId) -> Option<HostId>;

    fn first_child(&self, node: HostId) -> Option<HostId>;

    fn next_sibling(&self, node: HostId) -> Option<HostId>;

    /// Insert (or move) `node` under `parent`, before `before` or at the end.
    fn insert_before(&mut self, parent: HostId, node: HostId, before: Option<HostId>);

    /// Detach `node` and its subtree.
    fn remove(&mut self, node: HostId);

    /// Whether `node` is a controlled input.
    fn is_controlled(&self, _node: HostId) -> bool {
        false
    }

    /// Remember the value last applied to a controlled input.
    fn record_controlled_value(&mut self, _node: HostId, _value: &Value) {}
}
