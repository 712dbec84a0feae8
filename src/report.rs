use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::lifecycle::{Actor, Auction, AuctionId, AuctionState, TransitionRecord};

/// Summary of one auction's audit trail, for reporting and export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryReport {
    pub auction_id: AuctionId,
    pub title: String,
    pub current_state: AuctionState,
    pub is_terminal: bool,
    pub transitions_count: usize,
    pub first_transition: Option<DateTime<Utc>>,
    pub last_transition: Option<DateTime<Utc>>,
    /// Distinct actors in order of first appearance
    pub actors: Vec<Actor>,
    /// How many times the auction entered each state
    pub state_entries: BTreeMap<AuctionState, u32>,
    pub history: Vec<TransitionRecord>,
}

impl HistoryReport {
    pub fn new(auction: &Auction, history: Vec<TransitionRecord>) -> Self {
        let mut actors: Vec<Actor> = Vec::new();
        let mut state_entries = BTreeMap::new();

        for record in &history {
            if !actors.contains(&record.triggered_by) {
                actors.push(record.triggered_by.clone());
            }
            *state_entries.entry(record.to).or_insert(0) += 1;
        }

        Self {
            auction_id: auction.id.clone(),
            title: auction.title.clone(),
            current_state: auction.current_state(),
            is_terminal: auction.current_state().is_terminal(),
            transitions_count: history.len(),
            first_transition: history.first().map(|r| r.timestamp),
            last_transition: history.last().map(|r| r.timestamp),
            actors,
            state_entries,
            history,
        }
    }

    /// Number of times the auction was disputed
    pub fn disputes(&self) -> u32 {
        self.state_entries
            .get(&AuctionState::Disputed)
            .copied()
            .unwrap_or(0)
    }
}
