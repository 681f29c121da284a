//! # Shopping Cart
//!
//! The cart aggregate: items kept by a storage engine, order totals, limits,
//! and the checkout state machine.
//!
//! ## Cart Structure
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              Cart<S, H>                                 │
//! │                                                                         │
//! │  ┌──────────────────────┐   ┌──────────────┐   ┌──────────────────┐    │
//! │  │   S: StorageEngine   │   │ StateMachine │   │  H: CartHooks    │    │
//! │  │  Widget   ×2  $4.00  │   │   shopping   │   │  guard / enter / │    │
//! │  │  Gadget   ×1  $9.99  │   │              │   │  exit / invoice  │    │
//! │  └──────────────────────┘   └──────────────┘   └──────────────────┘    │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  OrderTotalCollection      sub_total          $17.99             │  │
//! │  │                            Sales tax           $1.48             │  │
//! │  │                            Shipping            $4.95             │  │
//! │  │                            ─────────────────────────             │  │
//! │  │                            total              $24.42             │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Merge Rules
//! - Adding an item whose identity is already stored adds to that line's
//!   quantity. The incoming object is dropped.
//! - Adding a new identity stores the item with the requested quantity.
//! - Removing more than is stored removes the line; removing an absent
//!   item does nothing.
//!
//! ## Example
//! ```rust
//! use cartflow_core::cart::{Cart, RemoveQuantity};
//! use cartflow_core::config::CartConfig;
//! use cartflow_core::hooks::NoopHooks;
//! use cartflow_core::item::MemoryItem;
//! use cartflow_core::money::Money;
//! use cartflow_core::state::CartState;
//! use cartflow_core::storage::MemoryStorageEngine;
//!
//! let mut cart = Cart::new(CartConfig::new(MemoryStorageEngine::<MemoryItem>::new()), NoopHooks);
//! let widget = MemoryItem::with_id(1, "Widget", Money::from_cents(1000));
//!
//! cart.add_to_cart(widget.clone(), 5).unwrap();
//! cart.add_to_cart(widget.clone(), 2).unwrap();
//! assert_eq!(cart.quantity(), 7);
//! assert_eq!(cart.sub_total().unwrap(), Money::from_cents(7000));
//!
//! cart.remove_from_cart(&widget, RemoveQuantity::All).unwrap();
//! assert!(cart.is_empty());
//!
//! assert!(cart.checkout());
//! assert_eq!(cart.state(), CartState::Checkout);
//! ```

use tracing::{debug, trace};

use crate::config::{CartConfig, CartLimits};
use crate::error::{CartError, CartResult};
use crate::hooks::{CartHooks, NoopHooks};
use crate::item::Item;
use crate::money::Money;
use crate::state::{CartEvent, CartState, StateMachine, TransitionOutcome};
use crate::storage::StorageEngine;
use crate::totals::{OrderTotal, OrderTotalCollection};
use crate::validation::{validate_line_count, validate_merged_quantity, validate_quantity};

// =============================================================================
// Contents (read-only view)
// =============================================================================

/// A read-only view of a cart's lines.
///
/// Handed to guards, hooks and total strategies.
#[derive(Debug)]
pub struct Contents<'a, S: StorageEngine> {
    storage: &'a S,
}

impl<S: StorageEngine> Clone for Contents<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: StorageEngine> Copy for Contents<'_, S> {}

impl<'a, S: StorageEngine> Contents<'a, S> {
    pub fn new(storage: &'a S) -> Self {
        Contents { storage }
    }

    /// Σ quantity × unit price. Zero for an empty cart.
    ///
    /// ## Errors
    /// - `CartError::PriceConversion` if any stored price cannot be read
    /// - `CartError::AmountOverflow` if the sum does not fit in `Money`
    pub fn sub_total(&self) -> CartResult<Money> {
        self.storage.iter().try_fold(Money::zero(), |acc, item| {
            acc.checked_add(item.line_total()?)
                .ok_or_else(|| CartError::amount_overflow("sub_total"))
        })
    }

    /// Σ item quantities. Zero for an empty cart.
    pub fn quantity(&self) -> u64 {
        self.storage
            .iter()
            .map(|item| u64::from(item.quantity()))
            .sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a S::Item> {
        self.storage.iter()
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// The stored line with the same identity as `item`.
    pub fn find(&self, item: &S::Item) -> Option<&'a S::Item> {
        self.storage.iter().find(|stored| stored.same_line(item))
    }
}

// =============================================================================
// Remove Quantity
// =============================================================================

/// How much of a line `remove_from_cart` takes away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveQuantity {
    Units(u32),
    /// The whole line, whatever its quantity.
    All,
}

impl From<u32> for RemoveQuantity {
    fn from(units: u32) -> Self {
        RemoveQuantity::Units(units)
    }
}

// =============================================================================
// Cart
// =============================================================================

/// A shopping cart over storage engine `S`, customised by hooks `H`.
#[derive(Debug)]
pub struct Cart<S: StorageEngine, H: CartHooks<S> = NoopHooks> {
    storage: S,
    totals: OrderTotalCollection<S>,
    limits: CartLimits,
    machine: StateMachine,
    hooks: H,
}

impl<S: StorageEngine, H: CartHooks<S>> Cart<S, H> {
    /// Creates a cart in the `shopping` state.
    pub fn new(config: CartConfig<S>, hooks: H) -> Self {
        Self::resume(config, hooks, CartState::Shopping)
    }

    /// Creates a cart in a previously persisted state.
    pub fn resume(config: CartConfig<S>, hooks: H, state: CartState) -> Self {
        let (storage, totals, limits) = config.into_parts();
        debug!(state = %state, lines = storage.len(), "Cart opened");

        Cart {
            storage,
            totals,
            limits,
            machine: StateMachine::resume(state),
            hooks,
        }
    }

    /// The externally assigned invoice id, provided by the hooks.
    pub fn invoice_id(&self) -> CartResult<&str> {
        self.hooks.invoice_id()
    }

    #[inline]
    pub fn state(&self) -> CartState {
        self.machine.state()
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn limits(&self) -> CartLimits {
        self.limits
    }

    pub fn contents(&self) -> Contents<'_, S> {
        Contents::new(&self.storage)
    }

    /// Consumes the cart, returning its storage engine and hooks.
    pub fn into_parts(self) -> (S, H) {
        (self.storage, self.hooks)
    }

    // -------------------------------------------------------------------------
    // Items
    // -------------------------------------------------------------------------

    /// Adds `quantity` units of `item`.
    ///
    /// ## Errors
    /// - `Validation` if `quantity` is 0, the line would exceed
    ///   `max_item_quantity` (or `u32::MAX` when unlimited), or a new line
    ///   would exceed `max_lines`
    /// - `Storage` if the engine fails
    ///
    /// On error the cart is unchanged.
    pub fn add_to_cart(&mut self, mut item: S::Item, quantity: u32) -> CartResult<()> {
        validate_quantity(quantity, self.limits.max_item_quantity)?;

        match self.storage.find_index(&item) {
            Some(index) => {
                let stored = self.storage.at(index)?.quantity();
                let merged =
                    validate_merged_quantity(stored, quantity, self.limits.max_item_quantity)?;

                self.storage.set_quantity(index, merged)?;
                debug!(item = ?item.id(), index, quantity = merged, "Merged into existing cart line");
            }
            None => {
                validate_line_count(self.storage.len(), self.limits.max_lines)?;

                item.set_quantity(quantity);
                debug!(item = ?item.id(), quantity, "Appending cart line");
                self.storage.append(item)?;
            }
        }

        Ok(())
    }

    /// Removes units of `item`'s line. Absent items are ignored.
    ///
    /// ```rust
    /// # use cartflow_core::cart::Cart;
    /// # use cartflow_core::config::CartConfig;
    /// # use cartflow_core::hooks::NoopHooks;
    /// # use cartflow_core::item::MemoryItem;
    /// # use cartflow_core::money::Money;
    /// # use cartflow_core::storage::MemoryStorageEngine;
    /// let mut cart = Cart::new(CartConfig::new(MemoryStorageEngine::<MemoryItem>::new()), NoopHooks);
    /// let item = MemoryItem::with_id(7, "Pen", Money::from_cents(150));
    /// cart.add_to_cart(item.clone(), 3).unwrap();
    ///
    /// cart.remove_from_cart(&item, 1).unwrap();
    /// assert_eq!(cart.quantity(), 2);
    ///
    /// cart.remove_from_cart(&item, 10).unwrap();
    /// assert!(cart.find(&item).is_none());
    /// ```
    pub fn remove_from_cart(
        &mut self,
        item: &S::Item,
        quantity: impl Into<RemoveQuantity>,
    ) -> CartResult<()> {
        let Some(index) = self.storage.find_index(item) else {
            trace!(item = ?item.id(), "Item not in cart, nothing to remove");
            return Ok(());
        };

        let stored = self.storage.at(index)?.quantity();
        let requested = match quantity.into() {
            RemoveQuantity::Units(units) => units,
            RemoveQuantity::All => stored,
        };

        if stored > requested {
            let remaining = stored - requested;
            self.storage.set_quantity(index, remaining)?;
            debug!(item = ?item.id(), index, quantity = remaining, "Decremented cart line");
        } else {
            self.storage.remove_at(index)?;
            debug!(item = ?item.id(), index, "Removed cart line");
        }

        Ok(())
    }

    /// Removes every line through the storage engine.
    pub fn clear(&mut self) -> CartResult<()> {
        while let Some(last) = self.storage.len().checked_sub(1) {
            self.storage.remove_at(last)?;
        }
        debug!("Cart cleared");
        Ok(())
    }

    /// The line at `index`, in insertion order.
    pub fn line(&self, index: usize) -> CartResult<&S::Item> {
        Ok(self.storage.at(index)?)
    }

    pub fn lines(&self) -> impl Iterator<Item = &S::Item> {
        self.storage.iter()
    }

    /// The stored line with the same identity as `item`.
    pub fn find(&self, item: &S::Item) -> Option<&S::Item> {
        self.contents().find(item)
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    // -------------------------------------------------------------------------
    // Aggregates
    // -------------------------------------------------------------------------

    /// Σ item quantities.
    pub fn quantity(&self) -> u64 {
        self.contents().quantity()
    }

    /// Σ quantity × unit price.
    pub fn sub_total(&self) -> CartResult<Money> {
        self.contents().sub_total()
    }

    /// Every configured order total, in configured order.
    pub fn order_totals(&self) -> CartResult<Vec<OrderTotal>> {
        self.totals.compute(&self.contents())
    }

    /// Grand total: sub-total plus every order total.
    pub fn total(&self) -> CartResult<Money> {
        let sub_total = self.sub_total()?;
        self.order_totals()?
            .iter()
            .try_fold(sub_total, |acc, total| acc.checked_add(total.value))
            .ok_or_else(|| CartError::amount_overflow("total"))
    }

    // -------------------------------------------------------------------------
    // State
    // -------------------------------------------------------------------------

    /// Fires `event` against the state machine.
    pub fn fire(&mut self, event: CartEvent) -> TransitionOutcome {
        let contents = Contents::new(&self.storage);
        self.machine.fire(event, &mut self.hooks, &contents)
    }

    pub fn permits(&self, event: CartEvent) -> bool {
        self.machine.permits(event)
    }

    pub fn permitted_events(&self) -> Vec<CartEvent> {
        self.machine.permitted_events()
    }

    pub fn continue_shopping(&mut self) -> bool {
        self.fire(CartEvent::ContinueShopping).is_transitioned()
    }

    pub fn checkout(&mut self) -> bool {
        self.fire(CartEvent::Checkout).is_transitioned()
    }

    pub fn check_payment(&mut self) -> bool {
        self.fire(CartEvent::CheckPayment).is_transitioned()
    }

    pub fn payment_successful(&mut self) -> bool {
        self.fire(CartEvent::PaymentSuccessful).is_transitioned()
    }

    pub fn payment_failed(&mut self) -> bool {
        self.fire(CartEvent::PaymentFailed).is_transitioned()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{StorageError, StorageResult, ValidationError};
    use crate::hooks::InvoiceId;
    use crate::item::MemoryItem;
    use crate::money::BasisPoints;
    use crate::storage::{
        CartItemRecord, MemoryRecordStore, MemoryStorageEngine, RecordStorageEngine, RecordStore,
    };
    use crate::totals::{ShippingTotal, TaxTotal};
    use std::cell::RefCell;
    use std::rc::Rc;
    use uuid::Uuid;

    type Engine = MemoryStorageEngine;

    fn cart() -> Cart<Engine> {
        Cart::new(CartConfig::new(Engine::new()), NoopHooks)
    }

    fn ten_dollar_item() -> MemoryItem {
        MemoryItem::with_id(1, "Widget", Money::from_cents(1000))
    }

    // -------------------------------------------------------------------------
    // Recording hooks
    // -------------------------------------------------------------------------

    #[derive(Debug, Default)]
    struct Recorder {
        calls: Vec<String>,
        block: Option<CartEvent>,
    }

    impl CartHooks<Engine> for Recorder {
        fn guard(&mut self, event: CartEvent, _cart: &Contents<'_, Engine>) -> bool {
            self.calls.push(format!("guard:{event}"));
            self.block != Some(event)
        }

        fn on_exit(&mut self, state: CartState, _cart: &Contents<'_, Engine>) {
            self.calls.push(format!("exit:{state}"));
        }

        fn on_enter(&mut self, state: CartState, _cart: &Contents<'_, Engine>) {
            self.calls.push(format!("enter:{state}"));
        }
    }

    /// Refuses checkout while the cart is empty.
    #[derive(Debug, Default)]
    struct NonEmptyCheckout;

    impl CartHooks<Engine> for NonEmptyCheckout {
        fn guard(&mut self, event: CartEvent, cart: &Contents<'_, Engine>) -> bool {
            event != CartEvent::Checkout || !cart.is_empty()
        }
    }

    // -------------------------------------------------------------------------
    // Items
    // -------------------------------------------------------------------------

    #[test]
    fn test_add_then_merge_then_remove_scenario() {
        let mut cart = cart();
        let item = ten_dollar_item();

        cart.add_to_cart(item.clone(), 5).unwrap();
        assert_eq!(cart.quantity(), 5);
        assert_eq!(cart.sub_total().unwrap(), Money::from_cents(5000));

        cart.add_to_cart(item.clone(), 2).unwrap();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.line(0).unwrap().quantity(), 7);

        cart.remove_from_cart(&item, 3).unwrap();
        assert_eq!(cart.find(&item).unwrap().quantity(), 4);

        cart.remove_from_cart(&item, 4).unwrap();
        assert!(cart.find(&item).is_none());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_added_item_takes_requested_quantity() {
        let mut cart = cart();
        let mut item = ten_dollar_item();
        item.set_quantity(40);

        cart.add_to_cart(item, 3).unwrap();
        assert_eq!(cart.quantity(), 3);
    }

    #[test]
    fn test_merge_drops_incoming_object() {
        let mut cart = cart();
        cart.add_to_cart(ten_dollar_item(), 1).unwrap();

        let renamed = MemoryItem::with_id(1, "Renamed", Money::from_cents(1));
        cart.add_to_cart(renamed, 1).unwrap();

        let line = cart.line(0).unwrap();
        assert_eq!(line.name(), "Widget");
        assert_eq!(line.price(), Money::from_cents(1000));
        assert_eq!(line.quantity(), 2);
    }

    #[test]
    fn test_remove_more_than_stored_removes_line() {
        let mut cart = cart();
        let item = ten_dollar_item();
        cart.add_to_cart(item.clone(), 2).unwrap();

        cart.remove_from_cart(&item, 50).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove_all_and_absent() {
        let mut cart = cart();
        let item = ten_dollar_item();
        let other = MemoryItem::with_id(2, "Other", Money::from_cents(5));

        cart.remove_from_cart(&other, 1).unwrap();
        assert!(cart.is_empty());

        cart.add_to_cart(item.clone(), 9).unwrap();
        cart.add_to_cart(other.clone(), 1).unwrap();
        cart.remove_from_cart(&item, RemoveQuantity::All).unwrap();

        assert_eq!(cart.len(), 1);
        assert_eq!(*cart.line(0).unwrap().id(), 2);
    }

    #[test]
    fn test_empty_cart_aggregates() {
        let cart = cart();
        assert_eq!(cart.quantity(), 0);
        assert_eq!(cart.sub_total().unwrap(), Money::zero());
        assert_eq!(cart.total().unwrap(), Money::zero());
    }

    #[test]
    fn test_lines_keep_insertion_order() {
        let mut cart = cart();
        for id in [3, 1, 2] {
            cart.add_to_cart(MemoryItem::with_id(id, "x", Money::from_cents(100)), 1)
                .unwrap();
        }

        let ids: Vec<u64> = cart.lines().map(|line| *line.id()).collect();
        assert_eq!(ids, vec![3, 1, 2]);
        assert!(matches!(
            cart.line(3),
            Err(CartError::Storage(StorageError::IndexOutOfBounds { .. }))
        ));
    }

    #[test]
    fn test_clear() {
        let mut cart = cart();
        cart.add_to_cart(MemoryItem::new("a", Money::from_cents(1)), 1)
            .unwrap();
        cart.add_to_cart(MemoryItem::new("b", Money::from_cents(1)), 1)
            .unwrap();

        cart.clear().unwrap();
        assert!(cart.is_empty());
    }

    // -------------------------------------------------------------------------
    // Limits
    // -------------------------------------------------------------------------

    #[test]
    fn test_zero_quantity_rejected() {
        let mut cart = cart();
        let result = cart.add_to_cart(ten_dollar_item(), 0);

        assert!(matches!(
            result,
            Err(CartError::Validation(ValidationError::MustBePositive { .. }))
        ));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_line_quantity_limit() {
        let limits = CartLimits {
            max_item_quantity: Some(5),
            max_lines: Some(10),
        };
        let mut cart = Cart::new(CartConfig::new(Engine::new()).with_limits(limits), NoopHooks);
        let item = ten_dollar_item();

        cart.add_to_cart(item.clone(), 4).unwrap();
        let result = cart.add_to_cart(item.clone(), 2);

        assert!(matches!(
            result,
            Err(CartError::Validation(ValidationError::OutOfRange { .. }))
        ));
        assert_eq!(cart.quantity(), 4);
    }

    #[test]
    fn test_line_count_limit() {
        let limits = CartLimits {
            max_item_quantity: None,
            max_lines: Some(2),
        };
        let mut cart = Cart::new(CartConfig::new(Engine::new()).with_limits(limits), NoopHooks);

        cart.add_to_cart(MemoryItem::with_id(1, "a", Money::from_cents(1)), 1)
            .unwrap();
        cart.add_to_cart(MemoryItem::with_id(2, "b", Money::from_cents(1)), 1)
            .unwrap();
        assert!(cart
            .add_to_cart(MemoryItem::with_id(3, "c", Money::from_cents(1)), 1)
            .is_err());

        // merging into an existing line is still fine
        cart.add_to_cart(MemoryItem::with_id(1, "a", Money::from_cents(1)), 1)
            .unwrap();
        assert_eq!(cart.len(), 2);
        assert_eq!(cart.quantity(), 3);
    }

    #[test]
    fn test_default_cart_has_no_limits() {
        let mut cart = cart();
        let item = ten_dollar_item();

        cart.add_to_cart(item.clone(), 600).unwrap();
        cart.add_to_cart(item.clone(), 600).unwrap();
        assert_eq!(cart.find(&item).unwrap().quantity(), 1200);

        for id in 2..=101 {
            cart.add_to_cart(MemoryItem::with_id(id, "x", Money::from_cents(1)), 1)
                .unwrap();
        }
        assert_eq!(cart.len(), 101);
    }

    #[test]
    fn test_merge_past_u32_is_rejected() {
        let mut cart = cart();
        let item = ten_dollar_item();
        cart.add_to_cart(item.clone(), u32::MAX).unwrap();

        let result = cart.add_to_cart(item.clone(), 1);
        assert!(matches!(
            result,
            Err(CartError::Validation(ValidationError::OutOfRange { .. }))
        ));
        assert_eq!(cart.quantity(), u64::from(u32::MAX));
    }

    // -------------------------------------------------------------------------
    // Totals
    // -------------------------------------------------------------------------

    #[test]
    fn test_order_totals_and_grand_total() {
        let config = CartConfig::new(Engine::new())
            .with_total(TaxTotal::new("Tax", BasisPoints::from_bps(825)))
            .with_total(ShippingTotal::new("Shipping", Money::from_cents(495)));
        let mut cart = Cart::new(config, NoopHooks);

        cart.add_to_cart(ten_dollar_item(), 1).unwrap();

        let totals = cart.order_totals().unwrap();
        assert_eq!(
            totals,
            vec![
                OrderTotal::new("Tax", Money::from_cents(83)),
                OrderTotal::new("Shipping", Money::from_cents(495)),
            ]
        );
        assert_eq!(cart.total().unwrap(), Money::from_cents(1578));
    }

    #[test]
    fn test_amount_overflow_is_an_error() {
        let mut store = MemoryRecordStore::new();
        let mut row = CartItemRecord::new("sku-gold", "Gold bar", Money::zero());
        row.price = Some("90000000000000000".to_string());
        row.quantity = 2;
        store.seed("INV-9", row);

        let engine = RecordStorageEngine::open(store, "INV-9").unwrap();
        let config = CartConfig::new(engine)
            .with_total(TaxTotal::new("Tax", BasisPoints::from_bps(825)));
        let cart = Cart::new(config, NoopHooks);

        assert!(matches!(
            cart.sub_total(),
            Err(CartError::AmountOverflow { .. })
        ));
        assert!(matches!(
            cart.order_totals(),
            Err(CartError::AmountOverflow { .. })
        ));
        assert!(matches!(cart.total(), Err(CartError::AmountOverflow { .. })));
    }

    #[test]
    fn test_sum_of_lines_overflow_is_an_error() {
        let mut cart = cart();
        let half = Money::from_cents(i64::MAX / 2 + 1);
        cart.add_to_cart(MemoryItem::with_id(1, "a", half), 1).unwrap();
        cart.add_to_cart(MemoryItem::with_id(2, "b", half), 1).unwrap();

        assert!(matches!(
            cart.sub_total(),
            Err(CartError::AmountOverflow { .. })
        ));
    }

    #[test]
    fn test_total_overflow_is_an_error() {
        let config = CartConfig::new(Engine::new())
            .with_total_fn("Surcharge", |_| Ok(Money::from_cents(i64::MAX)));
        let mut cart = Cart::new(config, NoopHooks);
        cart.add_to_cart(ten_dollar_item(), 1).unwrap();

        assert_eq!(cart.order_totals().unwrap().len(), 1);
        assert!(matches!(cart.total(), Err(CartError::AmountOverflow { .. })));
    }

    // -------------------------------------------------------------------------
    // State machine
    // -------------------------------------------------------------------------

    #[test]
    fn test_happy_path_checkout() {
        let mut cart = cart();

        assert!(cart.checkout());
        assert!(cart.check_payment());
        assert!(cart.payment_successful());
        assert_eq!(cart.state(), CartState::Completed);

        assert!(!cart.checkout());
        assert_eq!(cart.state(), CartState::Completed);
        assert!(cart.permitted_events().is_empty());
    }

    #[test]
    fn test_failed_payment_and_retry() {
        let mut cart = cart();
        cart.checkout();
        cart.check_payment();

        assert!(cart.payment_failed());
        assert_eq!(cart.state(), CartState::Failed);

        assert!(cart.permits(CartEvent::Checkout));
        assert!(!cart.permits(CartEvent::CheckPayment));
        assert!(cart.continue_shopping());
        assert_eq!(cart.state(), CartState::Shopping);
    }

    #[test]
    fn test_disallowed_event_is_silent() {
        let mut cart = cart();

        assert_eq!(
            cart.fire(CartEvent::PaymentSuccessful),
            TransitionOutcome::NotPermitted {
                state: CartState::Shopping,
                event: CartEvent::PaymentSuccessful,
            }
        );
        assert!(!cart.continue_shopping());
        assert_eq!(cart.state(), CartState::Shopping);
    }

    #[test]
    fn test_hooks_fire_exit_then_enter() {
        let mut cart = Cart::new(CartConfig::new(Engine::new()), Recorder::default());

        assert!(cart.checkout());
        assert_eq!(
            cart.hooks().calls,
            vec!["guard:checkout", "exit:shopping", "enter:checkout"]
        );
    }

    #[test]
    fn test_blocked_transition_fires_no_hooks() {
        let recorder = Recorder {
            block: Some(CartEvent::Checkout),
            ..Recorder::default()
        };
        let mut cart = Cart::new(CartConfig::new(Engine::new()), recorder);

        assert_eq!(
            cart.fire(CartEvent::Checkout),
            TransitionOutcome::Blocked {
                state: CartState::Shopping,
                event: CartEvent::Checkout,
            }
        );
        assert_eq!(cart.state(), CartState::Shopping);
        assert_eq!(cart.hooks().calls, vec!["guard:checkout"]);

        cart.hooks_mut().calls.clear();
        assert!(!cart.payment_successful());
        assert!(cart.hooks().calls.is_empty());
    }

    #[test]
    fn test_guard_sees_cart_contents() {
        let mut cart = Cart::new(CartConfig::new(Engine::new()), NonEmptyCheckout);

        assert!(!cart.checkout());
        cart.add_to_cart(ten_dollar_item(), 1).unwrap();
        assert!(cart.checkout());
    }

    #[test]
    fn test_resume_in_persisted_state() {
        let cart: Cart<Engine> = Cart::resume(
            CartConfig::new(Engine::new()),
            NoopHooks,
            CartState::VerifyingPayment,
        );

        assert_eq!(cart.state(), CartState::VerifyingPayment);
        assert!(cart.permits(CartEvent::PaymentSuccessful));
    }

    #[test]
    fn test_invoice_id() {
        assert!(matches!(
            cart().invoice_id(),
            Err(CartError::NotImplemented { .. })
        ));

        let cart: Cart<Engine, InvoiceId> =
            Cart::new(CartConfig::new(Engine::new()), InvoiceId::new("INV-7"));
        assert_eq!(cart.invoice_id().unwrap(), "INV-7");
    }

    // -------------------------------------------------------------------------
    // Record-backed cart
    // -------------------------------------------------------------------------

    #[test]
    fn test_record_backed_cart_writes_through() {
        let store = Rc::new(RefCell::new(MemoryRecordStore::new()));
        let engine = RecordStorageEngine::open(Rc::clone(&store), "INV-1").unwrap();
        let mut cart = Cart::new(CartConfig::new(engine), InvoiceId::new("INV-1"));

        let mug = CartItemRecord::new("sku-mug", "Mug", Money::from_cents(1250));
        cart.add_to_cart(mug.clone(), 2).unwrap();
        cart.add_to_cart(mug.clone(), 1).unwrap();

        assert_eq!(store.borrow().rows("INV-1").len(), 1);
        assert_eq!(store.borrow().rows("INV-1")[0].quantity, 3);
        assert_eq!(cart.sub_total().unwrap(), Money::from_cents(3750));

        cart.remove_from_cart(&mug, RemoveQuantity::All).unwrap();
        assert!(store.borrow().rows("INV-1").is_empty());
    }

    /// A record store whose writes can be switched off.
    #[derive(Debug, Default)]
    struct FlakyStore {
        inner: MemoryRecordStore,
        failing: bool,
    }

    impl FlakyStore {
        fn check(&self) -> StorageResult<()> {
            if self.failing {
                return Err(StorageError::backend("connection lost"));
            }
            Ok(())
        }
    }

    impl RecordStore for FlakyStore {
        fn load(&self, invoice_id: &str) -> StorageResult<Vec<CartItemRecord>> {
            self.inner.load(invoice_id)
        }

        fn insert(&mut self, invoice_id: &str, record: &CartItemRecord) -> StorageResult<()> {
            self.check()?;
            self.inner.insert(invoice_id, record)
        }

        fn update_quantity(
            &mut self,
            invoice_id: &str,
            record_id: Uuid,
            quantity: u32,
        ) -> StorageResult<()> {
            self.check()?;
            self.inner.update_quantity(invoice_id, record_id, quantity)
        }

        fn delete(&mut self, invoice_id: &str, record_id: Uuid) -> StorageResult<()> {
            self.check()?;
            self.inner.delete(invoice_id, record_id)
        }
    }

    fn line_quantities<S, H>(cart: &Cart<S, H>) -> Vec<(String, u32)>
    where
        S: StorageEngine<Item = CartItemRecord>,
        H: CartHooks<S>,
    {
        cart.lines()
            .map(|line| (line.item_id.clone(), line.quantity))
            .collect()
    }

    #[test]
    fn test_store_failure_leaves_cart_unchanged() {
        let store = Rc::new(RefCell::new(FlakyStore::default()));
        let engine = RecordStorageEngine::open(Rc::clone(&store), "INV-3").unwrap();
        let mut cart = Cart::new(CartConfig::new(engine), NoopHooks);

        let mug = CartItemRecord::new("sku-mug", "Mug", Money::from_cents(1250));
        let pen = CartItemRecord::new("sku-pen", "Pen", Money::from_cents(150));
        cart.add_to_cart(mug.clone(), 3).unwrap();
        cart.add_to_cart(pen.clone(), 1).unwrap();

        let before = line_quantities(&cart);
        store.borrow_mut().failing = true;

        let cup = CartItemRecord::new("sku-cup", "Cup", Money::from_cents(700));
        let results = [
            ("merge", cart.add_to_cart(mug.clone(), 1)),
            ("append", cart.add_to_cart(cup, 1)),
            ("decrement", cart.remove_from_cart(&mug, 1)),
            ("remove all", cart.remove_from_cart(&pen, RemoveQuantity::All)),
            ("clear", cart.clear()),
        ];

        for (operation, result) in results {
            assert!(
                matches!(result, Err(CartError::Storage(StorageError::Backend(_)))),
                "{operation}: {result:?}"
            );
        }
        assert_eq!(line_quantities(&cart), before);
        assert_eq!(cart.quantity(), 4);

        let stored: Vec<u32> = store
            .borrow()
            .inner
            .rows("INV-3")
            .iter()
            .map(|row| row.quantity)
            .collect();
        assert_eq!(stored, vec![3, 1]);

        store.borrow_mut().failing = false;
        cart.clear().unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_record_backed_cart_rejects_bad_price() {
        let mut store = MemoryRecordStore::new();
        let mut row = CartItemRecord::new("sku-x", "Broken", Money::from_cents(100));
        row.price = Some("ten dollars".to_string());
        row.quantity = 1;
        store.seed("INV-2", row);

        let engine = RecordStorageEngine::open(store, "INV-2").unwrap();
        let cart = Cart::new(CartConfig::new(engine), NoopHooks);

        assert_eq!(cart.len(), 1);
        assert!(matches!(
            cart.sub_total(),
            Err(CartError::PriceConversion { .. })
        ));
    }
}
