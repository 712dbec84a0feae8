// Auction Lifecycle Library - authoritative auction state machine
// This exposes the core components for testing and integration

pub mod lifecycle;
pub mod store;
pub mod notify;
pub mod report;
pub mod presentation;
pub mod scenario;
pub mod config;
pub mod telemetry;

// Re-export key types for easy access
pub use lifecycle::{
    available_transitions, is_terminal, request_transition, Actor, Auction, AuctionId,
    AuctionState, LifecycleError, TransitionRecord,
};
pub use store::{AuctionStore, SharedAuctionStore, StoreError};
pub use notify::{TransitionListener, WinnerNotifier};
pub use report::HistoryReport;
pub use presentation::{metadata, Severity, StateMetadata};
pub use scenario::{Scenario, ScenarioError, StepOutcome};
pub use crate::config::LifecycleConfig;
pub use telemetry::init_telemetry;
