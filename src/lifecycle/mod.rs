// Auction Lifecycle Module
//
// The closed state set, the transition graph and the single operation that
// moves an auction between states. Everything here is pure: no logging, no
// shared state, no I/O.

pub mod error;
pub mod machine;
pub mod table;
pub mod types;


pub use error::LifecycleError;
pub use machine::{request_transition, request_transition_at};
pub use table::{available_transitions, can_transition, is_terminal};
pub use types::{Actor, Auction, AuctionId, AuctionState, TransitionRecord};
