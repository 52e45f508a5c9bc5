//! Errors and suspension signals.
//!
//! Component code never unwinds through the walk. Every entry point returns
//! `Result<_, Interrupt>`; the walk catches the interrupt at the instance it
//! came from, sets the matching mode flag and hands it to the error-reporting
//! hook.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

// =============================================================================
// Component Error
// =============================================================================

/// A genuine failure raised by component code.
#[derive(Debug, Error)]
pub enum ComponentError {
    #[error("{0}")]
    Message(String),
    #[error("{0}")]
    Source(Box<dyn std::error::Error + 'static>),
}

impl From<Box<dyn std::error::Error + 'static>> for ComponentError {
    fn from(value: Box<dyn std::error::Error + 'static>) -> Self {
        ComponentError::Source(value)
    }
}

impl ComponentError {
    pub fn msg(message: impl Into<String>) -> Self {
        ComponentError::Message(message.into())
    }
}

// =============================================================================
// Interrupt
// =============================================================================

/// Why a component stopped rendering.
#[derive(Debug, Error)]
pub enum Interrupt {
    /// Not ready yet; the awaited value will trigger a later pass.
    #[error("render suspended on a pending value")]
    Suspended(Suspension),
    #[error(transparent)]
    Failed(#[from] ComponentError),
}

impl Interrupt {
    /// Shorthand for a message failure.
    pub fn fail(message: impl Into<String>) -> Self {
        Interrupt::Failed(ComponentError::msg(message))
    }

    pub fn suspend(on: Rc<dyn Awaitable>) -> Self {
        Interrupt::Suspended(Suspension(on))
    }

    #[inline]
    pub fn is_suspense(&self) -> bool {
        matches!(self, Interrupt::Suspended(_))
    }
}

// =============================================================================
// Suspension
// =============================================================================

/// Something that will eventually be ready.
pub trait Awaitable {
    /// Register `wake` to run once the value settles.
    ///
    /// Runs immediately if it already has.
    fn then(&self, wake: Box<dyn FnOnce()>);

    fn is_settled(&self) -> bool;
}

/// The deferred value a component suspended on.
#[derive(Clone)]
pub struct Suspension(pub Rc<dyn Awaitable>);

impl Suspension {
    pub fn awaitable(&self) -> &Rc<dyn Awaitable> {
        &self.0
    }
}

impl fmt::Debug for Suspension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suspension")
            .field("settled", &self.0.is_settled())
            .finish()
    }
}

/// Settle-once [`Awaitable`].
#[derive(Default)]
pub struct Pending {
    settled: Cell<bool>,
    listeners: RefCell<Vec<Box<dyn FnOnce()>>>,
}

impl Pending {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Mark settled and run every registered listener once.
    pub fn resolve(&self) {
        if self.settled.replace(true) {
            return;
        }
        let listeners = std::mem::take(&mut *self.listeners.borrow_mut());
        for wake in listeners {
            wake();
        }
    }
}

impl Awaitable for Pending {
    fn then(&self, wake: Box<dyn FnOnce()>) {
        if self.settled.get() {
            wake();
        } else {
            self.listeners.borrow_mut().push(wake);
        }
    }

    fn is_settled(&self) -> bool {
        self.settled.get()
    }
}
