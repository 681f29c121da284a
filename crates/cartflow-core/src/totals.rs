//! # Order Totals
//!
//! Named monetary lines computed from the cart after the items: tax,
//! shipping, discounts, anything a host registers.
//!
//! ## Computation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  OrderTotalCollection (configured order)                                │
//! │                                                                         │
//! │   Contents ──► [ Tax ] ──► [ Shipping ] ──► [ Discount ] ──► [ fn ]    │
//! │   (read-only)     │             │                │              │       │
//! │                   ▼             ▼                ▼              ▼       │
//! │              ("Tax", 0.83) ("Shipping", 4.95) ("Promo", -1.00) (...)   │
//! │                                                                         │
//! │   First Err aborts the whole computation. No partial list.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Strategies only ever see a [`Contents`] view, so they cannot change the
//! cart they are pricing.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::cart::Contents;
use crate::error::{CartError, CartResult};
use crate::money::{BasisPoints, Money};
use crate::storage::StorageEngine;

// =============================================================================
// Order Total
// =============================================================================

/// One computed line below the items, e.g. `("Tax", $0.83)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderTotal {
    pub name: String,
    pub value: Money,
}

impl OrderTotal {
    pub fn new(name: impl Into<String>, value: Money) -> Self {
        OrderTotal {
            name: name.into(),
            value,
        }
    }
}

// =============================================================================
// Strategy Trait
// =============================================================================

/// Computes one order total from a read-only view of the cart.
pub trait TotalStrategy<S: StorageEngine>: fmt::Debug {
    /// Name of the produced total.
    fn name(&self) -> &str;

    fn compute(&self, cart: &Contents<'_, S>) -> CartResult<OrderTotal>;
}

// =============================================================================
// Built-in Strategies
// =============================================================================

/// `sub_total × rate`, rounded half-up to the cent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxTotal {
    name: String,
    rate: BasisPoints,
}

impl TaxTotal {
    pub fn new(name: impl Into<String>, rate: BasisPoints) -> Self {
        TaxTotal {
            name: name.into(),
            rate,
        }
    }

    pub fn rate(&self) -> BasisPoints {
        self.rate
    }
}

impl<S: StorageEngine> TotalStrategy<S> for TaxTotal {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute(&self, cart: &Contents<'_, S>) -> CartResult<OrderTotal> {
        let tax = cart
            .sub_total()?
            .checked_percentage_of(self.rate)
            .ok_or_else(|| CartError::amount_overflow(self.name.as_str()))?;
        Ok(OrderTotal::new(self.name.as_str(), tax))
    }
}

/// A flat shipping charge.
///
/// Zero for an empty cart, and zero once the sub-total reaches `free_over`
/// when a threshold is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShippingTotal {
    name: String,
    flat: Money,
    free_over: Option<Money>,
}

impl ShippingTotal {
    pub fn new(name: impl Into<String>, flat: Money) -> Self {
        ShippingTotal {
            name: name.into(),
            flat,
            free_over: None,
        }
    }

    pub fn free_over(mut self, threshold: Money) -> Self {
        self.free_over = Some(threshold);
        self
    }
}

impl<S: StorageEngine> TotalStrategy<S> for ShippingTotal {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute(&self, cart: &Contents<'_, S>) -> CartResult<OrderTotal> {
        if cart.is_empty() {
            return Ok(OrderTotal::new(self.name.as_str(), Money::zero()));
        }

        let charge = match self.free_over {
            Some(threshold) if cart.sub_total()? >= threshold => Money::zero(),
            _ => self.flat,
        };
        Ok(OrderTotal::new(self.name.as_str(), charge))
    }
}

/// A percentage off the sub-total, reported as a negative line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscountTotal {
    name: String,
    rate: BasisPoints,
}

impl DiscountTotal {
    pub fn new(name: impl Into<String>, rate: BasisPoints) -> Self {
        DiscountTotal {
            name: name.into(),
            rate,
        }
    }
}

impl<S: StorageEngine> TotalStrategy<S> for DiscountTotal {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute(&self, cart: &Contents<'_, S>) -> CartResult<OrderTotal> {
        let discount = cart
            .sub_total()?
            .checked_percentage_of(self.rate)
            .and_then(|amount| amount.checked_neg())
            .ok_or_else(|| CartError::amount_overflow(self.name.as_str()))?;
        Ok(OrderTotal::new(self.name.as_str(), discount))
    }
}

/// A named closure. Built through [`OrderTotalCollection::push_fn`].
pub struct FnTotal<F> {
    name: String,
    compute: F,
}

impl<F> fmt::Debug for FnTotal<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTotal")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<S, F> TotalStrategy<S> for FnTotal<F>
where
    S: StorageEngine,
    F: Fn(&Contents<'_, S>) -> CartResult<Money>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn compute(&self, cart: &Contents<'_, S>) -> CartResult<OrderTotal> {
        let value = (self.compute)(cart)?;
        Ok(OrderTotal::new(self.name.as_str(), value))
    }
}

// =============================================================================
// Collection
// =============================================================================

/// Ordered list of total strategies.
#[derive(Debug)]
pub struct OrderTotalCollection<S: StorageEngine> {
    strategies: Vec<Box<dyn TotalStrategy<S>>>,
}

impl<S: StorageEngine> OrderTotalCollection<S> {
    pub fn new() -> Self {
        OrderTotalCollection {
            strategies: Vec::new(),
        }
    }

    /// Appends a strategy; it runs after every strategy already present.
    pub fn push(&mut self, strategy: impl TotalStrategy<S> + 'static) {
        self.strategies.push(Box::new(strategy));
    }

    /// Appends a named closure strategy.
    ///
    /// ```rust
    /// use cartflow_core::error::CartError;
    /// use cartflow_core::money::Money;
    /// use cartflow_core::storage::MemoryStorageEngine;
    /// use cartflow_core::totals::OrderTotalCollection;
    ///
    /// let mut totals = OrderTotalCollection::<MemoryStorageEngine>::new();
    /// totals.push_fn("Handling", |cart| {
    ///     let lines = u32::try_from(cart.len()).unwrap_or(u32::MAX);
    ///     Money::from_cents(50)
    ///         .checked_mul_quantity(lines)
    ///         .ok_or_else(|| CartError::amount_overflow("Handling"))
    /// });
    /// assert_eq!(totals.names(), vec!["Handling"]);
    /// ```
    pub fn push_fn<F>(&mut self, name: impl Into<String>, compute: F)
    where
        F: Fn(&Contents<'_, S>) -> CartResult<Money> + 'static,
    {
        self.push(FnTotal {
            name: name.into(),
            compute,
        });
    }

    /// Inserts a strategy at `index`; an index past the end appends.
    pub fn insert(&mut self, index: usize, strategy: impl TotalStrategy<S> + 'static) {
        let index = index.min(self.strategies.len());
        self.strategies.insert(index, Box::new(strategy));
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Strategy names in run order.
    pub fn names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Runs every strategy in order. The first error aborts.
    pub fn compute(&self, cart: &Contents<'_, S>) -> CartResult<Vec<OrderTotal>> {
        self.strategies
            .iter()
            .map(|strategy| strategy.compute(cart))
            .collect()
    }
}

impl<S: StorageEngine> Default for OrderTotalCollection<S> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
