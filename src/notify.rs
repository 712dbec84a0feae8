use tracing::{info, warn};

use crate::lifecycle::{Auction, AuctionState, TransitionRecord};

/// Hook invoked by the store after a transition has been applied.
/// Never called for rejected requests.
pub trait TransitionListener: Send + Sync {
    fn on_transition(&self, auction: &Auction, record: &TransitionRecord);
}

/// Announces the winner once an auction moves to `payment_pending`
#[derive(Debug, Default)]
pub struct WinnerNotifier;

impl TransitionListener for WinnerNotifier {
    fn on_transition(&self, auction: &Auction, record: &TransitionRecord) {
        if record.to != AuctionState::PaymentPending {
            return;
        }

        match &auction.winner {
            Some(winner) => info!(
                auction_id = %auction.id,
                winner = %winner,
                amount = auction.current_bid,
                "Notifying winner that payment is due"
            ),
            None => warn!(
                auction_id = %auction.id,
                "Auction awaiting payment has no recorded winner"
            ),
        }
    }
}
