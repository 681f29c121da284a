//! # Storage Engines
//!
//! The `StorageEngine` trait a cart is bound to, plus the two engines that
//! ship with the crate.
//!
//! ## Engine Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Storage Engines                                │
//! │                                                                         │
//! │  Cart ──► StorageEngine (trait)                                        │
//! │              │                                                          │
//! │              ├── MemoryStorageEngine   Vec<I>, owned by the cart       │
//! │              │                                                          │
//! │              └── RecordStorageEngine   mirror of rows owned by a       │
//! │                      │                 RecordStore, written through    │
//! │                      ▼                 on every mutation               │
//! │                  RecordStore (trait, implemented by the host)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Contract
//! - Lines are kept in insertion order.
//! - `find_index` compares by item identity, never by reference.
//! - `append` does not enforce uniqueness; the cart merges before appending.
//! - `at`, `set_quantity` and `remove_at` fail with
//!   `StorageError::IndexOutOfBounds` for a bad index.
//! - Every call is synchronous; when it returns, the change is visible to
//!   whoever owns the backing rows.

use std::fmt;

use crate::error::{StorageError, StorageResult};
use crate::item::Item;

pub mod memory;
pub mod record;

pub use memory::MemoryStorageEngine;
pub use record::{CartItemRecord, MemoryRecordStore, RecordStorageEngine, RecordStore};

/// An ordered, identity-indexable collection of cart lines.
pub trait StorageEngine: fmt::Debug {
    type Item: Item;

    /// Position of the stored line with the same identity as `item`.
    fn find_index(&self, item: &Self::Item) -> Option<usize> {
        self.iter().position(|stored| stored.same_line(item))
    }

    /// Adds a line at the end.
    fn append(&mut self, item: Self::Item) -> StorageResult<()>;

    fn at(&self, index: usize) -> StorageResult<&Self::Item>;

    /// Overwrites the quantity of the line at `index`.
    fn set_quantity(&mut self, index: usize, quantity: u32) -> StorageResult<()>;

    /// Removes and returns the line at `index`.
    fn remove_at(&mut self, index: usize) -> StorageResult<Self::Item>;

    /// Lines in insertion order. Each call starts from the first line.
    fn iter(&self) -> impl Iterator<Item = &Self::Item>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub(crate) fn out_of_bounds(index: usize, len: usize) -> StorageError {
    StorageError::IndexOutOfBounds { index, len }
}
