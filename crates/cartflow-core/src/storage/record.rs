//! # Record-Backed Storage Engine
//!
//! Binds a cart to rows owned by something outside the crate (a database
//! table, a remote service, a test double).
//!
//! ## Write-Through Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   RecordStorageEngine Operations                        │
//! │                                                                         │
//! │  Cart call            RecordStore call          Mirror change           │
//! │  ─────────            ────────────────          ─────────────           │
//! │                                                                         │
//! │  open(invoice) ─────► load(invoice) ──────────► rows = loaded          │
//! │                                                                         │
//! │  append(row) ───────► insert(invoice, row) ───► rows.push(row)         │
//! │                                                                         │
//! │  set_quantity(i, n) ► update_quantity(id, n) ─► rows[i].quantity = n   │
//! │                                                                         │
//! │  remove_at(i) ──────► delete(id) ─────────────► rows.remove(i)         │
//! │                                                                         │
//! │  NOTE: The store is written FIRST. If it fails, the mirror is left     │
//! │        untouched and the StorageError goes straight to the caller.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Transactions, schemas and ownership wiring are the store's business. The
//! engine only needs the four synchronous calls of [`RecordStore`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{CartError, CartResult, StorageError, StorageResult};
use crate::item::Item;
use crate::money::Money;

use super::{out_of_bounds, StorageEngine};

// =============================================================================
// Cart Item Record
// =============================================================================

/// A cart line as persisted by a record store.
///
/// ## Design Notes
/// - `id`: row identifier, assigned when the record is created
/// - `item_id`: reference to the original catalog item; this is the line
///   identity used for merging
/// - `price`: the raw price column. Rows come from outside the crate, so the
///   value is only parsed when a total is computed. Negative prices are
///   rejected at that point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItemRecord {
    /// Row id (UUID v4).
    pub id: Uuid,

    /// Original item reference.
    pub item_id: String,

    /// Item name at time of adding.
    pub name: String,

    /// Raw price column, e.g. `"10.99"`.
    pub price: Option<String>,

    /// Quantity in cart.
    pub quantity: u32,

    /// When this row was created.
    pub created_at: DateTime<Utc>,
}

impl CartItemRecord {
    /// Creates a fresh row for an item, freezing its price.
    pub fn new(item_id: impl Into<String>, name: impl Into<String>, price: Money) -> Self {
        CartItemRecord {
            id: Uuid::new_v4(),
            item_id: item_id.into(),
            name: name.into(),
            price: Some(price.to_decimal_string()),
            quantity: 0,
            created_at: Utc::now(),
        }
    }
}

impl Item for CartItemRecord {
    type Id = String;

    fn id(&self) -> &String {
        &self.item_id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn unit_price(&self) -> CartResult<Money> {
        let raw = self
            .price
            .as_deref()
            .ok_or_else(|| CartError::price_conversion(&self.item_id, ""))?;
        match raw.parse::<Money>() {
            Ok(price) if !price.is_negative() => Ok(price),
            _ => Err(CartError::price_conversion(&self.item_id, raw)),
        }
    }

    fn quantity(&self) -> u32 {
        self.quantity
    }

    fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
    }
}

// =============================================================================
// Record Store
// =============================================================================

/// The external owner of cart rows.
///
/// Implementations must be synchronous: when a call returns `Ok`, the change
/// is durable (or at least visible) on the owner's side.
pub trait RecordStore: fmt::Debug {
    /// All rows of the invoice, in insertion order.
    fn load(&self, invoice_id: &str) -> StorageResult<Vec<CartItemRecord>>;

    fn insert(&mut self, invoice_id: &str, record: &CartItemRecord) -> StorageResult<()>;

    fn update_quantity(
        &mut self,
        invoice_id: &str,
        record_id: Uuid,
        quantity: u32,
    ) -> StorageResult<()>;

    fn delete(&mut self, invoice_id: &str, record_id: Uuid) -> StorageResult<()>;
}

/// A store shared between the cart and the host on one thread.
impl<R: RecordStore> RecordStore for Rc<RefCell<R>> {
    fn load(&self, invoice_id: &str) -> StorageResult<Vec<CartItemRecord>> {
        self.borrow().load(invoice_id)
    }

    fn insert(&mut self, invoice_id: &str, record: &CartItemRecord) -> StorageResult<()> {
        self.borrow_mut().insert(invoice_id, record)
    }

    fn update_quantity(
        &mut self,
        invoice_id: &str,
        record_id: Uuid,
        quantity: u32,
    ) -> StorageResult<()> {
        self.borrow_mut()
            .update_quantity(invoice_id, record_id, quantity)
    }

    fn delete(&mut self, invoice_id: &str, record_id: Uuid) -> StorageResult<()> {
        self.borrow_mut().delete(invoice_id, record_id)
    }
}

// =============================================================================
// Record Storage Engine
// =============================================================================

/// A storage engine that mirrors the rows of one invoice and writes every
/// change through to its [`RecordStore`].
#[derive(Debug)]
pub struct RecordStorageEngine<R: RecordStore> {
    store: R,
    invoice_id: String,
    rows: Vec<CartItemRecord>,
}

impl<R: RecordStore> RecordStorageEngine<R> {
    /// Binds to the rows of `invoice_id`, loading any that already exist.
    ///
    /// ## Errors
    /// Whatever the store returns from `load`.
    pub fn open(store: R, invoice_id: impl Into<String>) -> StorageResult<Self> {
        let invoice_id = invoice_id.into();
        let rows = store.load(&invoice_id)?;
        debug!(invoice_id = %invoice_id, rows = rows.len(), "Opened record-backed cart storage");

        Ok(RecordStorageEngine {
            store,
            invoice_id,
            rows,
        })
    }

    /// Re-reads the rows from the store, dropping the current mirror.
    ///
    /// Use after the host changed rows behind the cart's back.
    pub fn reload(&mut self) -> StorageResult<()> {
        self.rows = self.store.load(&self.invoice_id)?;
        Ok(())
    }

    pub fn invoice_id(&self) -> &str {
        &self.invoice_id
    }

    /// The underlying store.
    pub fn store(&self) -> &R {
        &self.store
    }

    /// Releases the store.
    pub fn into_store(self) -> R {
        self.store
    }
}

impl<R: RecordStore> StorageEngine for RecordStorageEngine<R> {
    type Item = CartItemRecord;

    fn append(&mut self, item: CartItemRecord) -> StorageResult<()> {
        self.store.insert(&self.invoice_id, &item)?;
        debug!(invoice_id = %self.invoice_id, row = %item.id, item_id = %item.item_id, "Inserted cart row");
        self.rows.push(item);
        Ok(())
    }

    fn at(&self, index: usize) -> StorageResult<&CartItemRecord> {
        self.rows
            .get(index)
            .ok_or_else(|| out_of_bounds(index, self.rows.len()))
    }

    fn set_quantity(&mut self, index: usize, quantity: u32) -> StorageResult<()> {
        let len = self.rows.len();
        let row = self
            .rows
            .get_mut(index)
            .ok_or_else(|| out_of_bounds(index, len))?;

        self.store
            .update_quantity(&self.invoice_id, row.id, quantity)?;
        debug!(invoice_id = %self.invoice_id, row = %row.id, quantity, "Updated cart row quantity");
        row.quantity = quantity;
        Ok(())
    }

    fn remove_at(&mut self, index: usize) -> StorageResult<CartItemRecord> {
        let row_id = self.at(index)?.id;

        self.store.delete(&self.invoice_id, row_id)?;
        debug!(invoice_id = %self.invoice_id, row = %row_id, "Deleted cart row");
        Ok(self.rows.remove(index))
    }

    fn iter(&self) -> impl Iterator<Item = &CartItemRecord> {
        self.rows.iter()
    }

    fn len(&self) -> usize {
        self.rows.len()
    }
}

// =============================================================================
// Memory Record Store
// =============================================================================

/// An in-process [`RecordStore`] keyed by invoice id.
///
/// Stands in for a database table in tests and single-process hosts.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    tables: HashMap<String, Vec<CartItemRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The rows currently held for an invoice.
    pub fn rows(&self, invoice_id: &str) -> &[CartItemRecord] {
        self.tables
            .get(invoice_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Seeds a row directly, bypassing any cart.
    pub fn seed(&mut self, invoice_id: impl Into<String>, record: CartItemRecord) {
        self.tables.entry(invoice_id.into()).or_default().push(record);
    }

    fn row_mut(&mut self, invoice_id: &str, record_id: Uuid) -> StorageResult<&mut CartItemRecord> {
        self.tables
            .get_mut(invoice_id)
            .and_then(|rows| rows.iter_mut().find(|row| row.id == record_id))
            .ok_or_else(|| row_not_found(invoice_id, record_id))
    }
}

fn row_not_found(invoice_id: &str, record_id: Uuid) -> StorageError {
    StorageError::backend(format!("row {record_id} not found for invoice {invoice_id}"))
}

impl RecordStore for MemoryRecordStore {
    fn load(&self, invoice_id: &str) -> StorageResult<Vec<CartItemRecord>> {
        Ok(self.rows(invoice_id).to_vec())
    }

    fn insert(&mut self, invoice_id: &str, record: &CartItemRecord) -> StorageResult<()> {
        let rows = self.tables.entry(invoice_id.to_string()).or_default();
        if rows.iter().any(|row| row.id == record.id) {
            return Err(StorageError::backend(format!(
                "row {} already exists for invoice {invoice_id}",
                record.id
            )));
        }
        rows.push(record.clone());
        Ok(())
    }

    fn update_quantity(
        &mut self,
        invoice_id: &str,
        record_id: Uuid,
        quantity: u32,
    ) -> StorageResult<()> {
        self.row_mut(invoice_id, record_id)?.quantity = quantity;
        Ok(())
    }

    fn delete(&mut self, invoice_id: &str, record_id: Uuid) -> StorageResult<()> {
        let rows = self
            .tables
            .get_mut(invoice_id)
            .ok_or_else(|| row_not_found(invoice_id, record_id))?;
        let position = rows
            .iter()
            .position(|row| row.id == record_id)
            .ok_or_else(|| row_not_found(invoice_id, record_id))?;
        rows.remove(position);
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
