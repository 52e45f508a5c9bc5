//! Components - user logic the walk executes.
//!
//! Two shapes, dispatched on the instance's kind bit:
//! - [`FunctionType`]: a callable `(cx) -> Node`. It may ask to be invoked
//!   again within the same attempt via [`FunctionCx::request_rerender`].
//! - [`ClassType`]: constructs a [`Component`] once and drives its lifecycle
//!   on every pass.
//!
//! # Context
//!
//! [`create_context`] returns a [`Context`]. Its [`provider`](Context::provider)
//! makes `props.value` visible to every descendant; component types that
//! declare a [`context_type`](ClassType::context_type) receive the nearest
//! provided value (or the default) as [`ComponentContext::Value`]. Types that
//! declare nothing receive the whole ambient mapping.

pub(crate) mod class;
pub(crate) mod function;

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::engine::{InstanceFlags, InstanceRef};
use crate::error::Interrupt;
use crate::types::{Map, Props, State, VALUE, Value};
use crate::vnode::Node;

// =============================================================================
// Context
// =============================================================================

/// Identity of a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

thread_local! {
    static CONTEXT_COUNTER: Cell<u64> = const { Cell::new(0) };
}

/// Provided values keyed by context.
pub type ContextValues = HashMap<ContextId, Value>;

/// The ambient context mapping. Extended by copy, never mutated in place.
pub type ContextMap = Rc<ContextValues>;

#[derive(Clone)]
pub struct Context(Rc<ContextDef>);

struct ContextDef {
    id: ContextId,
    default: Value,
    provider: FunctionType,
}

/// Create a context with a default value for consumers outside any provider.
pub fn create_context(default: impl Into<Value>) -> Context {
    let id = CONTEXT_COUNTER.with(|counter| {
        let next = counter.get() + 1;
        counter.set(next);
        ContextId(next)
    });
    let provider = FunctionType::new("Provider", move |cx| {
        let value = cx.props().get(VALUE).cloned().unwrap_or_default();
        cx.provide_id(id, value);
        Ok(cx.props().children())
    });
    Context(Rc::new(ContextDef {
        id,
        default: default.into(),
        provider,
    }))
}

impl Context {
    pub fn id(&self) -> ContextId {
        self.0.id
    }

    pub fn default_value(&self) -> &Value {
        &self.0.default
    }

    /// Function component providing `props.value` to its subtree.
    pub fn provider(&self) -> &FunctionType {
        &self.0.provider
    }

    /// Resolve against an ambient mapping, falling back to the default.
    pub fn resolve(&self, map: &ContextValues) -> Value {
        map.get(&self.0.id)
            .cloned()
            .unwrap_or_else(|| self.0.default.clone())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Context").field(&self.0.id).finish()
    }
}

/// Context a component receives.
#[derive(Clone, Debug)]
pub enum ComponentContext {
    /// No context type declared: the full ambient mapping.
    Ambient(ContextMap),
    /// Declared context type: the resolved value.
    Value(Value),
}

impl ComponentContext {
    pub fn value(&self) -> Option<&Value> {
        match self {
            ComponentContext::Value(v) => Some(v),
            ComponentContext::Ambient(_) => None,
        }
    }

    /// Look up `context` in an ambient mapping.
    pub fn lookup(&self, context: &Context) -> Option<Value> {
        match self {
            ComponentContext::Ambient(map) => map.get(&context.id()).cloned(),
            ComponentContext::Value(_) => None,
        }
    }
}

impl Default for ComponentContext {
    fn default() -> Self {
        ComponentContext::Ambient(ContextMap::default())
    }
}

// =============================================================================
// Function components
// =============================================================================

/// Render callable of a function component.
pub type RenderFn = dyn Fn(&mut FunctionCx<'_>) -> Result<Node, Interrupt>;

#[derive(Clone)]
pub struct FunctionType(Rc<FunctionDef>);

#[derive(Clone)]
struct FunctionDef {
    name: Rc<str>,
    render: Rc<RenderFn>,
    context_type: Option<Context>,
}

impl FunctionType {
    pub fn new(
        name: &str,
        render: impl Fn(&mut FunctionCx<'_>) -> Result<Node, Interrupt> + 'static,
    ) -> Self {
        Self(Rc::new(FunctionDef {
            name: name.into(),
            render: Rc::new(render),
            context_type: None,
        }))
    }

    pub fn context_type(&self) -> Option<&Context> {
        self.0.context_type.as_ref()
    }

    /// Consume `context`. Returns a new type identity.
    pub fn with_context_type(&self, context: &Context) -> Self {
        let mut def = (*self.0).clone();
        def.context_type = Some(context.clone());
        Self(Rc::new(def))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    #[inline]
    pub fn ptr_eq(&self, other: &FunctionType) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn render_fn(&self) -> Rc<RenderFn> {
        self.0.render.clone()
    }
}

/// Per-instance storage of a function component.
#[derive(Debug, Default)]
pub struct FunctionState {
    pub(crate) props: Props,
    pub(crate) context: ComponentContext,
    /// Values provided to descendants by the latest invocation.
    pub(crate) provided: Option<ContextValues>,
}

impl FunctionState {
    pub fn props(&self) -> &Props {
        &self.props
    }
}

/// What a function component sees while rendering.
pub struct FunctionCx<'a> {
    pub(crate) props: &'a Props,
    pub(crate) context: &'a ComponentContext,
    pub(crate) instance: &'a InstanceRef,
    pub(crate) provided: &'a mut Option<ContextValues>,
}

impl FunctionCx<'_> {
    pub fn props(&self) -> &Props {
        self.props
    }

    pub fn context(&self) -> &ComponentContext {
        self.context
    }

    pub fn instance(&self) -> &InstanceRef {
        self.instance
    }

    /// Ask to be invoked again before this patch attempt ends.
    pub fn request_rerender(&self) {
        self.instance.borrow_mut().set_flags(InstanceFlags::DIRTY);
    }

    /// Provide `value` for `context` to every descendant.
    pub fn provide(&mut self, context: &Context, value: impl Into<Value>) {
        self.provide_id(context.id(), value.into());
    }

    pub(crate) fn provide_id(&mut self, id: ContextId, value: Value) {
        self.provided.get_or_insert_with(HashMap::new).insert(id, value);
    }
}

// =============================================================================
// Class components
// =============================================================================

bitflags::bitflags! {
    /// Optional lifecycle hooks a [`Component`] implements.
    ///
    /// Hooks outside this set are never called. Defaults to all of them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Lifecycle: u16 {
        const WILL_MOUNT = 1 << 0;
        const DID_MOUNT = 1 << 1;
        const WILL_RECEIVE_PROPS = 1 << 2;
        const SHOULD_UPDATE = 1 << 3;
        const WILL_UPDATE = 1 << 4;
        const SNAPSHOT = 1 << 5;
        const DID_UPDATE = 1 << 6;
    }
}

/// A stateful component with lifecycle.
///
/// Props, state and context are owned by the framework and reached through
/// [`ClassCx`]; the implementor only keeps its own fields.
pub trait Component: 'static {
    fn lifecycle(&self) -> Lifecycle {
        Lifecycle::all()
    }

    /// State right after construction. `None` means empty.
    fn initial_state(&mut self) -> Option<Map> {
        None
    }

    fn render(&mut self, cx: &mut ClassCx<'_>) -> Result<Node, Interrupt>;

    fn component_will_mount(&mut self, _cx: &mut ClassCx<'_>) -> Result<(), Interrupt> {
        Ok(())
    }

    fn component_did_mount(&mut self, _cx: &mut ClassCx<'_>) -> Result<(), Interrupt> {
        Ok(())
    }

    fn component_will_receive_props(
        &mut self,
        _cx: &mut ClassCx<'_>,
        _next_props: &Props,
        _context: &ComponentContext,
    ) -> Result<(), Interrupt> {
        Ok(())
    }

    fn should_component_update(
        &mut self,
        _cx: &mut ClassCx<'_>,
        _next_props: &Props,
        _next_state: &State,
        _context: &ComponentContext,
    ) -> Result<bool, Interrupt> {
        Ok(true)
    }

    fn component_will_update(
        &mut self,
        _cx: &mut ClassCx<'_>,
        _next_props: &Props,
        _next_state: &State,
        _context: &ComponentContext,
    ) -> Result<(), Interrupt> {
        Ok(())
    }

    fn get_snapshot_before_update(
        &mut self,
        _cx: &mut ClassCx<'_>,
        _prev_props: &Props,
        _prev_state: &State,
    ) -> Result<Value, Interrupt> {
        Ok(Value::Null)
    }

    fn component_did_update(
        &mut self,
        _cx: &mut ClassCx<'_>,
        _prev_props: &Props,
        _prev_state: &State,
        _snapshot: &Value,
    ) -> Result<(), Interrupt> {
        Ok(())
    }

    /// Values to provide to descendants. `None` provides nothing.
    fn child_context(&self, _cx: &ClassCx<'_>) -> Option<ContextValues> {
        None
    }

    /// Called by child reconciliation when the instance is removed.
    fn component_will_unmount(&mut self) {}
}

/// Builds a component from its first props.
pub type Constructor = dyn Fn(&Props, &ComponentContext) -> Result<Box<dyn Component>, Interrupt>;

/// Static `getDerivedStateFromProps`: partial state to merge, if any.
pub type DeriveStateFn = dyn Fn(&Props, &State) -> Option<Map>;

#[derive(Clone)]
pub struct ClassType(Rc<ClassDef>);

#[derive(Clone)]
struct ClassDef {
    name: Rc<str>,
    construct: Rc<Constructor>,
    derive_state: Option<Rc<DeriveStateFn>>,
    context_type: Option<Context>,
}

impl ClassType {
    pub fn new(
        name: &str,
        construct: impl Fn(&Props, &ComponentContext) -> Result<Box<dyn Component>, Interrupt> + 'static,
    ) -> Self {
        Self(Rc::new(ClassDef {
            name: name.into(),
            construct: Rc::new(construct),
            derive_state: None,
            context_type: None,
        }))
    }

    /// Class whose component is built with `Default`.
    pub fn of<C: Component + Default>(name: &str) -> Self {
        Self::new(name, |_, _| Ok(Box::new(C::default())))
    }

    /// Attach a static derive-state step. Returns a new type identity.
    pub fn derive_state_from_props(
        &self,
        derive: impl Fn(&Props, &State) -> Option<Map> + 'static,
    ) -> Self {
        let mut def = (*self.0).clone();
        def.derive_state = Some(Rc::new(derive));
        Self(Rc::new(def))
    }

    /// Consume `context`. Returns a new type identity.
    pub fn with_context_type(&self, context: &Context) -> Self {
        let mut def = (*self.0).clone();
        def.context_type = Some(context.clone());
        Self(Rc::new(def))
    }

    pub fn context_type(&self) -> Option<&Context> {
        self.0.context_type.as_ref()
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    #[inline]
    pub fn ptr_eq(&self, other: &ClassType) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn construct(
        &self,
        props: &Props,
        context: &ComponentContext,
    ) -> Result<Box<dyn Component>, Interrupt> {
        (self.0.construct)(props, context)
    }

    pub(crate) fn derive_state(&self) -> Option<&Rc<DeriveStateFn>> {
        self.0.derive_state.as_ref()
    }
}

/// Framework-owned slots of a class component.
#[derive(Debug, Default)]
pub struct ClassSlots {
    pub(crate) props: Props,
    pub(crate) state: State,
    /// Pending snapshot; aliases `state` until something writes to it.
    pub(crate) next_state: State,
    pub(crate) context: ComponentContext,
}

impl ClassSlots {
    /// Make the pending snapshot the committed state.
    pub(crate) fn commit_state(&mut self) {
        self.state = self.next_state.clone();
    }
}

/// A constructed class component and its slots.
///
/// The implementation and the slots live in separate cells. Lifecycle calls
/// hold the implementation cell only, and slots are borrowed just long enough
/// to read or write a value, so a component may inspect its own instance
/// (including [`Mounted::props`] / [`Mounted::state`]) while it runs.
pub struct ClassInstance {
    pub(crate) imp: RefCell<Box<dyn Component>>,
    pub(crate) slots: RefCell<ClassSlots>,
}

impl ClassInstance {
    pub(crate) fn new(imp: Box<dyn Component>, slots: ClassSlots) -> Self {
        Self {
            imp: RefCell::new(imp),
            slots: RefCell::new(slots),
        }
    }

    pub fn props(&self) -> Props {
        self.slots.borrow().props.clone()
    }

    pub fn state(&self) -> State {
        self.slots.borrow().state.clone()
    }

    pub fn next_state(&self) -> State {
        self.slots.borrow().next_state.clone()
    }

    pub fn context(&self) -> ComponentContext {
        self.slots.borrow().context.clone()
    }
}

/// What a class component sees inside a lifecycle call.
pub struct ClassCx<'a> {
    pub(crate) slots: &'a RefCell<ClassSlots>,
    pub(crate) instance: &'a InstanceRef,
}

impl ClassCx<'_> {
    pub fn props(&self) -> Props {
        self.slots.borrow().props.clone()
    }

    pub fn state(&self) -> State {
        self.slots.borrow().state.clone()
    }

    /// Pending state, including updates not yet committed.
    pub fn next_state(&self) -> State {
        self.slots.borrow().next_state.clone()
    }

    pub fn context(&self) -> ComponentContext {
        self.slots.borrow().context.clone()
    }

    pub fn instance(&self) -> &InstanceRef {
        self.instance
    }

    /// Merge `partial` into the pending state and mark the instance dirty.
    pub fn set_state(&mut self, partial: Map) {
        self.slots.borrow_mut().next_state.merge(partial);
        self.instance.borrow_mut().set_flags(InstanceFlags::DIRTY);
    }

    /// Render on the next pass even if `should_component_update` says no.
    pub fn force_update(&mut self) {
        self.instance
            .borrow_mut()
            .set_flags(InstanceFlags::FORCE_UPDATE | InstanceFlags::DIRTY);
    }
}

// =============================================================================
// Mounted component
// =============================================================================

/// Live component owned by an instance.
#[derive(Clone)]
pub enum Mounted {
    Function(Rc<RefCell<FunctionState>>),
    Class(Rc<ClassInstance>),
}

impl Mounted {
    /// Props last handed to the component.
    pub fn props(&self) -> Props {
        match self {
            Mounted::Function(f) => f.borrow().props.clone(),
            Mounted::Class(c) => c.props(),
        }
    }

    /// Committed state of a class component.
    pub fn state(&self) -> Option<State> {
        match self {
            Mounted::Function(_) => None,
            Mounted::Class(c) => Some(c.state()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_resolution() {
        let theme = create_context("light");
        let other = create_context(0);
        assert_ne!(theme.id(), other.id());

        let mut map = ContextValues::new();
        assert!(theme.resolve(&map).same(&Value::from("light")));

        map.insert(theme.id(), "dark".into());
        assert!(theme.resolve(&map).same(&Value::from("dark")));
    }

    #[test]
    fn test_type_identity() {
        let a = FunctionType::new("A", |_| Ok(Node::Empty));
        let b = FunctionType::new("A", |_| Ok(Node::Empty));
        assert!(a.ptr_eq(&a.clone()));
        assert!(!a.ptr_eq(&b));

        let ctx = create_context(Value::Null);
        let consumer = a.with_context_type(&ctx);
        assert!(!consumer.ptr_eq(&a));
        assert_eq!(consumer.context_type().map(Context::id), Some(ctx.id()));
    }
}
