//! # Cart Items
//!
//! The `Item` trait every cart line implements, and `MemoryItem`, the
//! in-process reference implementation.
//!
//! ## Identity
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Two items are the SAME CART LINE iff their ids compare equal.          │
//! │                                                                         │
//! │   MemoryItem { id: 7, "Tea", $3.00 }  ─┐                               │
//! │                                        ├──► same line (merge)          │
//! │   MemoryItem { id: 7, "Tea", $2.50 }  ─┘    price/name are ignored     │
//! │                                                                         │
//! │   MemoryItem { id: 8, "Tea", $3.00 }  ────► different line             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{CartError, CartResult};
use crate::money::Money;

// =============================================================================
// Item Trait
// =============================================================================

/// A line that can live in a cart.
///
/// Quantities are owned by the storage engine once the item is added; the
/// cart writes them through [`StorageEngine::set_quantity`].
///
/// [`StorageEngine::set_quantity`]: crate::storage::StorageEngine::set_quantity
pub trait Item: fmt::Debug {
    /// Comparison key used to decide whether two items are the same line.
    type Id: PartialEq + fmt::Debug;

    fn id(&self) -> &Self::Id;

    fn name(&self) -> &str;

    /// Unit price.
    ///
    /// ## Errors
    /// `CartError::PriceConversion` when the stored price is missing or not
    /// a number. Items holding typed `Money` never fail.
    fn unit_price(&self) -> CartResult<Money>;

    fn quantity(&self) -> u32;

    fn set_quantity(&mut self, quantity: u32);

    /// True when `other` is the same cart line.
    fn same_line(&self, other: &Self) -> bool {
        self.id() == other.id()
    }

    /// `quantity × unit_price`.
    ///
    /// ## Errors
    /// `CartError::AmountOverflow` when the product does not fit in `Money`.
    fn line_total(&self) -> CartResult<Money> {
        self.unit_price()?
            .checked_mul_quantity(self.quantity())
            .ok_or_else(|| CartError::amount_overflow("line_total"))
    }
}

// =============================================================================
// Memory Item
// =============================================================================

static NEXT_MEMORY_ITEM_ID: AtomicU64 = AtomicU64::new(1);

/// An item that lives only in process memory.
///
/// Ids come from a process-wide sequence, so two `MemoryItem::new` calls
/// never produce the same line. Use [`MemoryItem::with_id`] to refer to an
/// existing line (e.g. a catalog entry the host already knows).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryItem {
    id: u64,
    name: String,
    price: Money,
    #[serde(default)]
    quantity: u32,
}

impl MemoryItem {
    /// Creates an item with the next sequence id and quantity 0.
    pub fn new(name: impl Into<String>, price: Money) -> Self {
        let id = NEXT_MEMORY_ITEM_ID.fetch_add(1, Ordering::Relaxed);
        Self::with_id(id, name, price)
    }

    /// Creates an item with an explicit id.
    pub fn with_id(id: u64, name: impl Into<String>, price: Money) -> Self {
        MemoryItem {
            id,
            name: name.into(),
            price,
            quantity: 0,
        }
    }

    #[inline]
    pub fn price(&self) -> Money {
        self.price
    }
}

impl Item for MemoryItem {
    type Id = u64;

    fn id(&self) -> &u64 {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn unit_price(&self) -> CartResult<Money> {
        Ok(self.price)
    }

    fn quantity(&self) -> u32 {
        self.quantity
    }

    fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
