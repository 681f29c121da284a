//! # Cart Configuration
//!
//! Two layers: [`CartSettings`], the host-editable file, and [`CartConfig`],
//! the immutable value a cart is constructed from.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     CARTFLOW_MAX_ITEM_QUANTITY=50                                      │
//! │     CARTFLOW_MAX_LINES=20                                              │
//! │                                                                         │
//! │  2. TOML Settings File                                                 │
//! │     passed explicitly by the host                                      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     no quantity or line limits, no order totals                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Settings File Format
//! ```toml
//! # cart.toml
//! # Limits are optional; leave them out to allow any quantity and size.
//! max_item_quantity = 999
//! max_lines = 100
//!
//! [[totals]]
//! kind = "discount"
//! name = "Member discount"
//! rate_bps = 500
//!
//! [[totals]]
//! kind = "tax"
//! name = "Sales tax"
//! rate_bps = 825
//!
//! [[totals]]
//! kind = "shipping"
//! name = "Shipping"
//! flat_cents = 495
//! free_over_cents = 5000
//! ```
//!
//! Totals run in file order.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::cart::Contents;
use crate::error::{CartError, CartResult, ValidationError};
use crate::money::{BasisPoints, Money};
use crate::storage::StorageEngine;
use crate::totals::{DiscountTotal, OrderTotalCollection, ShippingTotal, TaxTotal, TotalStrategy};
use crate::validation::{validate_amount_cents, validate_rate_bps, validate_total_name};

/// Environment variable overriding `max_item_quantity`.
pub const ENV_MAX_ITEM_QUANTITY: &str = "CARTFLOW_MAX_ITEM_QUANTITY";

/// Environment variable overriding `max_lines`.
pub const ENV_MAX_LINES: &str = "CARTFLOW_MAX_LINES";

// =============================================================================
// Limits
// =============================================================================

/// Quantity and size limits enforced by `add_to_cart`.
///
/// The default enforces nothing; a host opts in through [`CartSettings`] or
/// [`CartConfig::with_limits`]. Zero quantities are rejected either way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CartLimits {
    /// Highest quantity a single line may hold.
    pub max_item_quantity: Option<u32>,
    /// Highest number of distinct lines.
    pub max_lines: Option<usize>,
}

impl CartLimits {
    /// No limits.
    pub const fn unbounded() -> Self {
        CartLimits {
            max_item_quantity: None,
            max_lines: None,
        }
    }
}

// =============================================================================
// Total Specs
// =============================================================================

/// A built-in order total as written in the settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TotalSpec {
    Tax {
        name: String,
        rate_bps: u32,
    },
    Shipping {
        name: String,
        flat_cents: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        free_over_cents: Option<i64>,
    },
    Discount {
        name: String,
        rate_bps: u32,
    },
}

impl TotalSpec {
    pub fn name(&self) -> &str {
        match self {
            TotalSpec::Tax { name, .. }
            | TotalSpec::Shipping { name, .. }
            | TotalSpec::Discount { name, .. } => name,
        }
    }

    fn validate(&self) -> CartResult<()> {
        validate_total_name(self.name())?;

        match self {
            TotalSpec::Tax { rate_bps, .. } | TotalSpec::Discount { rate_bps, .. } => {
                validate_rate_bps("rate_bps", *rate_bps)?;
            }
            TotalSpec::Shipping {
                flat_cents,
                free_over_cents,
                ..
            } => {
                validate_amount_cents("flat_cents", *flat_cents)?;
                if let Some(threshold) = free_over_cents {
                    validate_amount_cents("free_over_cents", *threshold)?;
                }
            }
        }

        Ok(())
    }

    fn push_into<S: StorageEngine>(&self, totals: &mut OrderTotalCollection<S>) {
        match self {
            TotalSpec::Tax { name, rate_bps } => {
                totals.push(TaxTotal::new(name.as_str(), BasisPoints::from_bps(*rate_bps)));
            }
            TotalSpec::Shipping {
                name,
                flat_cents,
                free_over_cents,
            } => {
                let mut shipping = ShippingTotal::new(name.as_str(), Money::from_cents(*flat_cents));
                if let Some(threshold) = free_over_cents {
                    shipping = shipping.free_over(Money::from_cents(*threshold));
                }
                totals.push(shipping);
            }
            TotalSpec::Discount { name, rate_bps } => {
                totals.push(DiscountTotal::new(
                    name.as_str(),
                    BasisPoints::from_bps(*rate_bps),
                ));
            }
        }
    }
}

// =============================================================================
// Cart Settings
// =============================================================================

/// Host-editable cart settings.
///
/// Limits left out of the file are not enforced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_item_quantity: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_lines: Option<usize>,

    /// Built-in order totals, in run order.
    #[serde(default)]
    pub totals: Vec<TotalSpec>,
}

impl CartSettings {
    /// Loads settings: defaults, then the file (if it exists), then the
    /// environment, then validation.
    pub fn load(path: Option<&Path>) -> CartResult<Self> {
        let mut settings = Self::default();

        if let Some(path) = path {
            if path.exists() {
                info!(?path, "Loading cart settings from file");
                let contents = std::fs::read_to_string(path)?;
                settings = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Cart settings file not found, using defaults");
            }
        }

        settings.apply_env_overrides()?;
        settings.validate()?;

        Ok(settings)
    }

    /// Loads settings or returns defaults if loading fails.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            warn!("Failed to load cart settings: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Parses and validates settings from a TOML string. The environment is
    /// not consulted.
    pub fn from_toml_str(contents: &str) -> CartResult<Self> {
        let settings: CartSettings = toml::from_str(contents)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Serializes the settings back to TOML.
    pub fn to_toml_string(&self) -> CartResult<String> {
        toml::to_string_pretty(self).map_err(|e| CartError::InvalidConfig(e.to_string()))
    }

    /// Validates the settings.
    pub fn validate(&self) -> CartResult<()> {
        if self.max_item_quantity == Some(0) {
            return Err(ValidationError::MustBePositive {
                field: "max_item_quantity".to_string(),
            }
            .into());
        }

        if self.max_lines == Some(0) {
            return Err(ValidationError::MustBePositive {
                field: "max_lines".to_string(),
            }
            .into());
        }

        let mut seen = HashSet::new();
        for spec in &self.totals {
            spec.validate()?;

            if !seen.insert(spec.name()) {
                return Err(ValidationError::Duplicate {
                    field: "total name".to_string(),
                    value: spec.name().to_string(),
                }
                .into());
            }
        }

        Ok(())
    }

    /// The limits part of the settings.
    pub fn limits(&self) -> CartLimits {
        CartLimits {
            max_item_quantity: self.max_item_quantity,
            max_lines: self.max_lines,
        }
    }

    fn apply_env_overrides(&mut self) -> CartResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies `CARTFLOW_*` overrides read through `lookup`.
    ///
    /// ## Errors
    /// `CartError::InvalidConfig` when a variable is set but is not a number.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> CartResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_MAX_ITEM_QUANTITY) {
            self.max_item_quantity = Some(parse_override(ENV_MAX_ITEM_QUANTITY, &raw)?);
            debug!(
                max_item_quantity = ?self.max_item_quantity,
                "Overriding max item quantity from environment"
            );
        }

        if let Some(raw) = lookup(ENV_MAX_LINES) {
            self.max_lines = Some(parse_override(ENV_MAX_LINES, &raw)?);
            debug!(max_lines = ?self.max_lines, "Overriding max lines from environment");
        }

        Ok(())
    }
}

fn parse_override<T: std::str::FromStr>(key: &str, raw: &str) -> CartResult<T> {
    raw.trim().parse().map_err(|_| {
        warn!(key, value = raw, "Unparsable cart setting in environment");
        CartError::InvalidConfig(format!("{key} must be a whole number, got '{raw}'"))
    })
}

// =============================================================================
// Cart Config
// =============================================================================

/// Everything a cart is constructed from: its storage engine, its order
/// totals and its limits.
///
/// ```rust
/// use cartflow_core::config::CartConfig;
/// use cartflow_core::item::MemoryItem;
/// use cartflow_core::money::{BasisPoints, Money};
/// use cartflow_core::storage::MemoryStorageEngine;
/// use cartflow_core::totals::TaxTotal;
///
/// let config = CartConfig::new(MemoryStorageEngine::<MemoryItem>::new())
///     .with_total(TaxTotal::new("Tax", BasisPoints::from_bps(825)))
///     .with_total_fn("Handling", |_| Ok(Money::from_cents(100)));
///
/// assert_eq!(config.totals().names(), vec!["Tax", "Handling"]);
/// ```
#[derive(Debug)]
pub struct CartConfig<S: StorageEngine> {
    storage: S,
    totals: OrderTotalCollection<S>,
    limits: CartLimits,
}

impl<S: StorageEngine> CartConfig<S> {
    /// No limits, no order totals.
    pub fn new(storage: S) -> Self {
        CartConfig {
            storage,
            totals: OrderTotalCollection::new(),
            limits: CartLimits::default(),
        }
    }

    /// Limits and built-in totals taken from `settings`.
    pub fn from_settings(storage: S, settings: &CartSettings) -> Self {
        let mut totals = OrderTotalCollection::new();
        for spec in &settings.totals {
            spec.push_into(&mut totals);
        }

        debug!(
            totals = totals.len(),
            max_item_quantity = ?settings.max_item_quantity,
            max_lines = ?settings.max_lines,
            "Cart config built from settings"
        );

        CartConfig {
            storage,
            totals,
            limits: settings.limits(),
        }
    }

    pub fn with_limits(mut self, limits: CartLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_total(mut self, strategy: impl TotalStrategy<S> + 'static) -> Self {
        self.totals.push(strategy);
        self
    }

    pub fn with_total_fn<F>(mut self, name: impl Into<String>, compute: F) -> Self
    where
        F: Fn(&Contents<'_, S>) -> CartResult<Money> + 'static,
    {
        self.totals.push_fn(name, compute);
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn totals(&self) -> &OrderTotalCollection<S> {
        &self.totals
    }

    pub fn limits(&self) -> CartLimits {
        self.limits
    }

    pub(crate) fn into_parts(self) -> (S, OrderTotalCollection<S>, CartLimits) {
        (self.storage, self.totals, self.limits)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
