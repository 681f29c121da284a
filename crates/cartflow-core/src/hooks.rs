//! # Cart Hooks
//!
//! The extension point of a cart: its invoice identity, a guard per event
//! and enter/exit callbacks per state.
//!
//! ## Default Behaviour
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Method            Default                 Typical override            │
//! │  ──────            ───────                 ────────────────            │
//! │  invoice_id()      Err(NotImplemented)     read the invoice column     │
//! │  guard(event)      true (permit)           stock check, address check  │
//! │  on_exit(state)    nothing                 release a reservation       │
//! │  on_enter(state)   nothing                 start a payment, send email │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Hooks receive a read-only [`Contents`] view of the cart; they cannot
//! change items from inside a transition.

use crate::cart::Contents;
use crate::error::{CartError, CartResult};
use crate::state::{CartEvent, CartState};
use crate::storage::StorageEngine;

/// Per-cart-type behaviour consulted by the state machine.
pub trait CartHooks<S: StorageEngine> {
    /// The stable, externally assigned invoice id of this cart.
    ///
    /// ## Errors
    /// `CartError::NotImplemented` unless the concrete cart type provides it.
    fn invoice_id(&self) -> CartResult<&str> {
        Err(CartError::NotImplemented {
            accessor: "invoice_id",
        })
    }

    /// Returning `false` halts the transition without an error.
    fn guard(&mut self, _event: CartEvent, _cart: &Contents<'_, S>) -> bool {
        true
    }

    /// Called after the guard passed, before the state changes.
    fn on_exit(&mut self, _state: CartState, _cart: &Contents<'_, S>) {}

    /// Called right after the state changed.
    fn on_enter(&mut self, _state: CartState, _cart: &Contents<'_, S>) {}
}

/// Hooks that permit everything and provide no invoice id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoopHooks;

impl<S: StorageEngine> CartHooks<S> for NoopHooks {}

/// Hooks that only provide an invoice id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceId(String);

impl InvoiceId {
    pub fn new(invoice_id: impl Into<String>) -> Self {
        InvoiceId(invoice_id.into())
    }
}

impl<S: StorageEngine> CartHooks<S> for InvoiceId {
    fn invoice_id(&self) -> CartResult<&str> {
        Ok(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorageEngine;

    type Engine = MemoryStorageEngine;

    #[test]
    fn test_noop_hooks_have_no_invoice_id() {
        let result = <NoopHooks as CartHooks<Engine>>::invoice_id(&NoopHooks);
        assert!(matches!(
            result,
            Err(CartError::NotImplemented {
                accessor: "invoice_id"
            })
        ));
    }

    #[test]
    fn test_default_guard_permits() {
        let storage = Engine::new();
        let contents = Contents::new(&storage);

        for event in CartEvent::ALL {
            assert!(CartHooks::<Engine>::guard(&mut NoopHooks, event, &contents));
        }
    }

    #[test]
    fn test_invoice_id_hooks() {
        let hooks = InvoiceId::new("INV-0042");
        assert_eq!(
            <InvoiceId as CartHooks<Engine>>::invoice_id(&hooks).unwrap(),
            "INV-0042"
        );
    }
}
