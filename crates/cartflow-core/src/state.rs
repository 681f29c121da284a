//! # Checkout State Machine
//!
//! The lifecycle every cart goes through, from shopping to a completed (or
//! failed) payment.
//!
//! ## Transition Table
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │            continue_shopping                                            │
//! │   ┌──────────────────────────────────────────────┐                     │
//! │   ▼                                              │                     │
//! │ SHOPPING ──checkout──► CHECKOUT ──check_payment──► VERIFYING_PAYMENT   │
//! │   ▲                       ▲  ▲                       │        │         │
//! │   │                       │  └──────checkout─────────┘        │         │
//! │   │                       │                  payment_successful│        │
//! │   │                  checkout                                 ▼         │
//! │   │                       │                 payment_failed  COMPLETED  │
//! │   │                       │                       │        (terminal)  │
//! │   └──continue_shopping── FAILED ◄─────────────────┘                    │
//! │                                                                         │
//! │  continue_shopping is also allowed from CHECKOUT and VERIFYING_PAYMENT │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Firing Order
//! 1. Allow-list lookup. Not listed → `NotPermitted`, nothing runs.
//! 2. Guard. False → `Blocked`, no hooks run.
//! 3. Exit hook of the source state.
//! 4. State changes.
//! 5. Enter hook of the target state.
//!
//! Neither a disallowed event nor a guard veto is an error.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};
use ts_rs::TS;

use crate::cart::Contents;
use crate::hooks::CartHooks;
use crate::storage::StorageEngine;

// =============================================================================
// Cart State
// =============================================================================

/// Where a cart is in its checkout lifecycle.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CartState {
    /// Items are being added and removed.
    #[default]
    Shopping,
    /// Customer is entering checkout details.
    Checkout,
    /// Waiting on the payment provider.
    VerifyingPayment,
    /// Paid. No further transitions.
    Completed,
    /// Payment was declined.
    Failed,
}

impl CartState {
    pub const ALL: [CartState; 5] = [
        CartState::Shopping,
        CartState::Checkout,
        CartState::VerifyingPayment,
        CartState::Completed,
        CartState::Failed,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            CartState::Shopping => "shopping",
            CartState::Checkout => "checkout",
            CartState::VerifyingPayment => "verifying_payment",
            CartState::Completed => "completed",
            CartState::Failed => "failed",
        }
    }

    /// True when no event leaves this state.
    pub fn is_terminal(&self) -> bool {
        CartEvent::ALL
            .iter()
            .all(|event| !event.sources().contains(self))
    }
}

impl fmt::Display for CartState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CartState {
    type Err = ParseStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CartState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| ParseStateError::new("cart state", s))
    }
}

// =============================================================================
// Cart Event
// =============================================================================

/// A request to move the cart to another state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CartEvent {
    ContinueShopping,
    Checkout,
    CheckPayment,
    PaymentSuccessful,
    PaymentFailed,
}

impl CartEvent {
    pub const ALL: [CartEvent; 5] = [
        CartEvent::ContinueShopping,
        CartEvent::Checkout,
        CartEvent::CheckPayment,
        CartEvent::PaymentSuccessful,
        CartEvent::PaymentFailed,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            CartEvent::ContinueShopping => "continue_shopping",
            CartEvent::Checkout => "checkout",
            CartEvent::CheckPayment => "check_payment",
            CartEvent::PaymentSuccessful => "payment_successful",
            CartEvent::PaymentFailed => "payment_failed",
        }
    }

    /// States this event may fire from.
    pub const fn sources(&self) -> &'static [CartState] {
        match self {
            CartEvent::ContinueShopping => &[
                CartState::Checkout,
                CartState::VerifyingPayment,
                CartState::Failed,
            ],
            CartEvent::Checkout => &[
                CartState::Shopping,
                CartState::VerifyingPayment,
                CartState::Failed,
            ],
            CartEvent::CheckPayment => &[CartState::Checkout],
            CartEvent::PaymentSuccessful | CartEvent::PaymentFailed => {
                &[CartState::VerifyingPayment]
            }
        }
    }

    pub const fn target(&self) -> CartState {
        match self {
            CartEvent::ContinueShopping => CartState::Shopping,
            CartEvent::Checkout => CartState::Checkout,
            CartEvent::CheckPayment => CartState::VerifyingPayment,
            CartEvent::PaymentSuccessful => CartState::Completed,
            CartEvent::PaymentFailed => CartState::Failed,
        }
    }
}

impl fmt::Display for CartEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CartEvent {
    type Err = ParseStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CartEvent::ALL
            .into_iter()
            .find(|event| event.as_str() == s)
            .ok_or_else(|| ParseStateError::new("cart event", s))
    }
}

/// A string did not name a known state or event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseStateError {
    kind: &'static str,
    value: String,
}

impl ParseStateError {
    fn new(kind: &'static str, value: &str) -> Self {
        ParseStateError {
            kind,
            value: value.to_string(),
        }
    }
}

/// Target state of `event` fired from `state`, if the allow-list permits it.
pub fn transition(state: CartState, event: CartEvent) -> Option<CartState> {
    event.sources().contains(&state).then(|| event.target())
}

// =============================================================================
// Transition Outcome
// =============================================================================

/// What happened when an event was fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Guard passed, hooks ran, state changed.
    Transitioned { from: CartState, to: CartState },
    /// The event is allowed here but the guard said no.
    Blocked { state: CartState, event: CartEvent },
    /// The event is not allowed from this state.
    NotPermitted { state: CartState, event: CartEvent },
}

impl TransitionOutcome {
    pub fn is_transitioned(&self) -> bool {
        matches!(self, TransitionOutcome::Transitioned { .. })
    }
}

// =============================================================================
// State Machine
// =============================================================================

/// Holds the current state and applies the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StateMachine {
    state: CartState,
}

impl StateMachine {
    /// A machine in the initial `shopping` state.
    pub fn new() -> Self {
        Self::default()
    }

    /// A machine restored to a previously persisted state.
    pub fn resume(state: CartState) -> Self {
        StateMachine { state }
    }

    #[inline]
    pub fn state(&self) -> CartState {
        self.state
    }

    /// True when the allow-list lets `event` fire now. Guards are not asked.
    pub fn permits(&self, event: CartEvent) -> bool {
        transition(self.state, event).is_some()
    }

    /// Every event the allow-list lets fire now.
    pub fn permitted_events(&self) -> Vec<CartEvent> {
        CartEvent::ALL
            .into_iter()
            .filter(|event| self.permits(*event))
            .collect()
    }

    /// Fires `event`, consulting `hooks` for the guard and enter/exit calls.
    pub fn fire<S, H>(
        &mut self,
        event: CartEvent,
        hooks: &mut H,
        cart: &Contents<'_, S>,
    ) -> TransitionOutcome
    where
        S: StorageEngine,
        H: CartHooks<S> + ?Sized,
    {
        let from = self.state;

        let Some(to) = transition(from, event) else {
            debug!(event = %event, state = %from, "Event not permitted from current state");
            return TransitionOutcome::NotPermitted { state: from, event };
        };

        if !hooks.guard(event, cart) {
            debug!(event = %event, state = %from, "Transition blocked by guard");
            return TransitionOutcome::Blocked { state: from, event };
        }

        hooks.on_exit(from, cart);
        self.state = to;
        hooks.on_enter(to, cart);

        info!(event = %event, from = %from, to = %to, "Cart transitioned");
        TransitionOutcome::Transitioned { from, to }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
