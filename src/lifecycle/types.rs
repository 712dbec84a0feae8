// Core types for the auction lifecycle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::LifecycleError;

pub type AuctionId = String;

/// Position of an auction in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuctionState {
    /// Being prepared by the auctioneer, not visible to bidders
    Draft,
    /// Published with a start time
    Scheduled,
    /// Accepting bids
    Active,
    /// Closing window before the end time
    Ending,
    /// Bidding closed
    Ended,
    /// Winner determined, waiting for payment
    PaymentPending,
    /// Payment received, ready to ship
    PaymentCompleted,
    /// Handed to the carrier
    Shipped,
    /// Prize received by the winner (terminal)
    Delivered,
    /// Payment or delivery contested
    Disputed,
    /// Withdrawn before completion (terminal)
    Cancelled,
}

impl AuctionState {
    /// Every state, in lifecycle order
    pub const ALL: [AuctionState; 11] = [
        AuctionState::Draft,
        AuctionState::Scheduled,
        AuctionState::Active,
        AuctionState::Ending,
        AuctionState::Ended,
        AuctionState::PaymentPending,
        AuctionState::PaymentCompleted,
        AuctionState::Shipped,
        AuctionState::Delivered,
        AuctionState::Disputed,
        AuctionState::Cancelled,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            AuctionState::Draft => "draft",
            AuctionState::Scheduled => "scheduled",
            AuctionState::Active => "active",
            AuctionState::Ending => "ending",
            AuctionState::Ended => "ended",
            AuctionState::PaymentPending => "payment_pending",
            AuctionState::PaymentCompleted => "payment_completed",
            AuctionState::Shipped => "shipped",
            AuctionState::Delivered => "delivered",
            AuctionState::Disputed => "disputed",
            AuctionState::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AuctionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for AuctionState {
    type Err = LifecycleError;

    /// Boundary validation for state names coming from outside the crate
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AuctionState::ALL
            .iter()
            .copied()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| LifecycleError::UnknownState {
                value: s.to_string(),
            })
    }
}

/// Identity that triggered a transition
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Actor {
    System,
    User(String),
}

impl Actor {
    pub const SYSTEM_ID: &'static str = "system";

    pub fn user(id: impl Into<String>) -> Self {
        Actor::from(id.into())
    }

    pub fn is_system(&self) -> bool {
        matches!(self, Actor::System)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Actor::System => Self::SYSTEM_ID,
            Actor::User(id) => id,
        }
    }
}

impl From<String> for Actor {
    fn from(id: String) -> Self {
        if id == Self::SYSTEM_ID {
            Actor::System
        } else {
            Actor::User(id)
        }
    }
}

impl From<&str> for Actor {
    fn from(id: &str) -> Self {
        Actor::from(id.to_string())
    }
}

impl From<Actor> for String {
    fn from(actor: Actor) -> Self {
        match actor {
            Actor::System => Actor::SYSTEM_ID.to_string(),
            Actor::User(id) => id,
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// An auction and its lifecycle position.
///
/// `current_state` is private: it only changes through
/// [`request_transition`](super::request_transition). The remaining
/// attributes belong to collaborators (bidding, payment, shipping).
/// Serialize-only: snapshots are never read back into an `Auction`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Auction {
    pub id: AuctionId,
    pub title: String,
    current_state: AuctionState,
    pub current_bid: u64,
    pub bids_count: u32,
    pub winner: Option<String>,
    pub payment_status: Option<String>,
    pub shipping_status: Option<String>,
    pub ends_at: Option<DateTime<Utc>>,
}

impl Auction {
    /// New auction in `draft`
    pub fn new(id: impl Into<AuctionId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            current_state: AuctionState::Draft,
            current_bid: 0,
            bids_count: 0,
            winner: None,
            payment_status: None,
            shipping_status: None,
            ends_at: None,
        }
    }

    pub fn current_state(&self) -> AuctionState {
        self.current_state
    }

    pub(super) fn with_state(&self, state: AuctionState) -> Self {
        Self {
            current_state: state,
            ..self.clone()
        }
    }

    #[cfg(test)]
    pub(crate) fn at_state(id: &str, state: AuctionState) -> Self {
        Self::new(id, format!("Lot {id}")).with_state(state)
    }
}

/// Audit entry for one applied transition. Never edited after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub auction_id: AuctionId,
    pub from: AuctionState,
    pub to: AuctionState,
    pub timestamp: DateTime<Utc>,
    pub triggered_by: Actor,
}
