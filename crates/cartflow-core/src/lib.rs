//! # cartflow-core: Shopping Cart Engine
//!
//! A shopping cart with pluggable storage, a guarded checkout state machine
//! and configurable order totals. Synchronous, single-threaded, no I/O of its
//! own apart from reading an optional settings file.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        cartflow Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Host application                             │   │
//! │  │   CartSettings (toml + env) ──► CartConfig ──► Cart::new        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ cartflow-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   cart    │  │   state   │  │  totals   │  │  storage  │  │   │
//! │  │   │ add/remove│  │ shopping  │  │   tax     │  │  memory   │  │   │
//! │  │   │ sub_total │  │ checkout… │  │ shipping  │  │  record   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └─────┬─────┘  │   │
//! │  └───────────────────────────────────────────────────────┼─────────┘   │
//! │                                                          │              │
//! │  ┌───────────────────────────────────────────────────────▼─────────┐   │
//! │  │              RecordStore (owned by the host)                    │   │
//! │  │          cart_items rows keyed by invoice id                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`cart`] - The cart aggregate and its read-only [`Contents`] view
//! - [`item`] - The `Item` trait and in-memory items
//! - [`storage`] - Storage engines (memory and record-backed)
//! - [`state`] - Checkout state machine
//! - [`hooks`] - Guards, enter/exit hooks and invoice identity
//! - [`totals`] - Order total strategies
//! - [`config`] - Settings file and cart construction
//! - [`money`] - Money type with integer arithmetic
//! - [`error`] - Error types
//! - [`validation`] - Limit checks
//!
//! ## Example Usage
//!
//! ```rust
//! use cartflow_core::{Cart, CartConfig, CartSettings, MemoryItem, MemoryStorageEngine, Money, NoopHooks};
//!
//! let settings = CartSettings::from_toml_str(r#"
//!     [[totals]]
//!     kind = "tax"
//!     name = "Sales tax"
//!     rate_bps = 825
//! "#).unwrap();
//!
//! let storage = MemoryStorageEngine::<MemoryItem>::new();
//! let mut cart = Cart::new(CartConfig::from_settings(storage, &settings), NoopHooks);
//!
//! cart.add_to_cart(MemoryItem::new("Widget", Money::from_cents(1000)), 1).unwrap();
//!
//! // $10.00 + 8.25% tax ($0.825 → $0.83)
//! assert_eq!(cart.total().unwrap(), Money::from_cents(1083));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod config;
pub mod error;
pub mod hooks;
pub mod item;
pub mod money;
pub mod state;
pub mod storage;
pub mod totals;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use cartflow_core::Cart` instead of
// `use cartflow_core::cart::Cart`

pub use cart::{Cart, Contents, RemoveQuantity};
pub use config::{CartConfig, CartLimits, CartSettings, TotalSpec};
pub use error::{CartError, CartResult, StorageError, ValidationError};
pub use hooks::{CartHooks, InvoiceId, NoopHooks};
pub use item::{Item, MemoryItem};
pub use money::{BasisPoints, Money};
pub use state::{CartEvent, CartState, StateMachine, TransitionOutcome};
pub use storage::{
    CartItemRecord, MemoryRecordStore, MemoryStorageEngine, RecordStorageEngine, RecordStore,
    StorageEngine,
};
pub use totals::{OrderTotal, OrderTotalCollection, TotalStrategy};
