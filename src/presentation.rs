// Presentation metadata for auction states
//
// Views look up labels, icons and severities here instead of switching on
// state names. The lifecycle core never depends on this module.

use serde::Serialize;
use std::fmt;

use crate::lifecycle::AuctionState;

/// How urgently a state needs attention, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Neutral,
    Info,
    Success,
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Neutral => "NEUTRAL",
            Severity::Info => "INFO",
            Severity::Success => "SUCCESS",
            Severity::Warning => "WARNING",
            Severity::Critical => "CRITICAL",
        };
        f.pad(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StateMetadata {
    pub label: &'static str,
    pub icon: &'static str,
    pub severity: Severity,
}

pub fn metadata(state: AuctionState) -> StateMetadata {
    let (label, icon, severity) = match state {
        AuctionState::Draft => ("Draft", "file-edit", Severity::Neutral),
        AuctionState::Scheduled => ("Scheduled", "calendar", Severity::Info),
        AuctionState::Active => ("Active", "gavel", Severity::Success),
        AuctionState::Ending => ("Ending soon", "timer", Severity::Warning),
        AuctionState::Ended => ("Ended", "flag", Severity::Info),
        AuctionState::PaymentPending => ("Payment pending", "credit-card", Severity::Warning),
        AuctionState::PaymentCompleted => ("Paid", "check-circle", Severity::Success),
        AuctionState::Shipped => ("Shipped", "truck", Severity::Info),
        AuctionState::Delivered => ("Delivered", "package-check", Severity::Success),
        AuctionState::Disputed => ("Disputed", "alert-triangle", Severity::Critical),
        AuctionState::Cancelled => ("Cancelled", "x-circle", Severity::Neutral),
    };

    StateMetadata {
        label,
        icon,
        severity,
    }
}
