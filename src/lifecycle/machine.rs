use chrono::{DateTime, Utc};

use super::error::LifecycleError;
use super::table::can_transition;
use super::types::{Actor, Auction, AuctionState, TransitionRecord};

/// Attempt to move `auction` to `target`.
///
/// Returns the updated snapshot and the audit record to append. The input
/// auction is never modified, so a rejected request has no effect.
pub fn request_transition(
    auction: &Auction,
    target: AuctionState,
    actor: Actor,
) -> Result<(Auction, TransitionRecord), LifecycleError> {
    request_transition_at(auction, target, actor, Utc::now())
}

/// Same as [`request_transition`] with an explicit timestamp
pub fn request_transition_at(
    auction: &Auction,
    target: AuctionState,
    actor: Actor,
    at: DateTime<Utc>,
) -> Result<(Auction, TransitionRecord), LifecycleError> {
    let from = auction.current_state();

    if !can_transition(from, target) {
        return Err(LifecycleError::InvalidTransition {
            auction_id: auction.id.clone(),
            from,
            to: target,
        });
    }

    let record = TransitionRecord {
        auction_id: auction.id.clone(),
        from,
        to: target,
        timestamp: at,
        triggered_by: actor,
    };

    Ok((auction.with_state(target), record))
}
