use thiserror::Error;

use super::types::{AuctionId, AuctionState};

/// Errors raised by the lifecycle core. Every error leaves the auction and
/// the audit log untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("Invalid transition for auction {auction_id}: {from} -> {to} is not allowed")]
    InvalidTransition {
        auction_id: AuctionId,
        from: AuctionState,
        to: AuctionState,
    },

    #[error("Unknown auction state: {value:?}")]
    UnknownState { value: String },
}
