// Transition graph for the auction lifecycle

use super::types::AuctionState;
use super::types::AuctionState::*;

/// Ordered legal successors of `state`. Empty for terminal states.
pub fn available_transitions(state: AuctionState) -> &'static [AuctionState] {
    match state {
        Draft => &[Scheduled, Cancelled],
        Scheduled => &[Active, Cancelled],
        Active => &[Ending, Cancelled],
        Ending => &[Ended],
        Ended => &[PaymentPending, Cancelled],
        PaymentPending => &[PaymentCompleted, Disputed, Cancelled],
        PaymentCompleted => &[Shipped],
        Shipped => &[Delivered, Disputed],
        Disputed => &[PaymentCompleted, Cancelled],
        Delivered | Cancelled => &[],
    }
}

pub fn is_terminal(state: AuctionState) -> bool {
    available_transitions(state).is_empty()
}

pub fn can_transition(from: AuctionState, to: AuctionState) -> bool {
    available_transitions(from).contains(&to)
}

impl AuctionState {
    pub fn available_transitions(self) -> &'static [AuctionState] {
        available_transitions(self)
    }

    pub fn is_terminal(self) -> bool {
        is_terminal(self)
    }

    pub fn can_transition_to(self, to: AuctionState) -> bool {
        can_transition(self, to)
    }
}
