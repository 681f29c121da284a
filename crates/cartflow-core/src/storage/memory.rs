//! # In-Memory Storage Engine
//!
//! A plain ordered `Vec` owned by the cart. The default engine for carts that
//! do not need to outlive the process.

use crate::error::StorageResult;
use crate::item::{Item, MemoryItem};

use super::{out_of_bounds, StorageEngine};

/// Stores cart lines in a `Vec`, in insertion order.
#[derive(Debug, Clone)]
pub struct MemoryStorageEngine<I: Item = MemoryItem> {
    items: Vec<I>,
}

impl<I: Item> MemoryStorageEngine<I> {
    /// Creates an empty engine.
    pub fn new() -> Self {
        MemoryStorageEngine { items: Vec::new() }
    }

    /// Creates an engine holding `items` as-is.
    ///
    /// No merging happens here: lines sharing an identity stay separate.
    pub fn with_items(items: impl Into<Vec<I>>) -> Self {
        MemoryStorageEngine {
            items: items.into(),
        }
    }

    /// Consumes the engine, returning the stored lines.
    pub fn into_items(self) -> Vec<I> {
        self.items
    }
}

impl<I: Item> Default for MemoryStorageEngine<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Item> StorageEngine for MemoryStorageEngine<I> {
    type Item = I;

    fn append(&mut self, item: I) -> StorageResult<()> {
        self.items.push(item);
        Ok(())
    }

    fn at(&self, index: usize) -> StorageResult<&I> {
        self.items
            .get(index)
            .ok_or_else(|| out_of_bounds(index, self.items.len()))
    }

    fn set_quantity(&mut self, index: usize, quantity: u32) -> StorageResult<()> {
        let len = self.items.len();
        let item = self
            .items
            .get_mut(index)
            .ok_or_else(|| out_of_bounds(index, len))?;
        item.set_quantity(quantity);
        Ok(())
    }

    fn remove_at(&mut self, index: usize) -> StorageResult<I> {
        if index >= self.items.len() {
            return Err(out_of_bounds(index, self.items.len()));
        }
        Ok(self.items.remove(index))
    }

    fn iter(&self) -> impl Iterator<Item = &I> {
        self.items.iter()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
