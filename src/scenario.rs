// Scripted transition scenarios, used by `auctionctl replay`

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::lifecycle::{Actor, Auction, AuctionId, TransitionRecord};
use crate::store::{AuctionStore, StoreError};

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid scenario file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub auctions: Vec<ScenarioAuction>,
    #[serde(default)]
    pub steps: Vec<ScenarioStep>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioAuction {
    pub id: AuctionId,
    pub title: String,
    /// Closing time used by sweep steps
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
}

/// One scenario step: either a transition request or a system sweep
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ScenarioStep {
    Transition {
        auction: AuctionId,
        /// Requested state name, validated when the step runs
        to: String,
        #[serde(default = "system_actor")]
        actor: String,
    },
    Sweep {
        sweep_at: DateTime<Utc>,
    },
}

fn system_actor() -> String {
    Actor::SYSTEM_ID.to_string()
}

/// Result of one scenario step. Rejections are outcomes, not failures.
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    /// Auction named by a transition step; sweeps cover every auction
    pub auction_id: Option<AuctionId>,
    pub requested: String,
    pub applied: Vec<TransitionRecord>,
    pub error: Option<String>,
}

impl StepOutcome {
    pub fn is_applied(&self) -> bool {
        !self.applied.is_empty()
    }
}

impl Scenario {
    pub fn from_toml(content: &str) -> Result<Self, ScenarioError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Register the scenario's auctions in `store`
    pub fn seed(&self, store: &mut AuctionStore) -> Result<(), ScenarioError> {
        for auction in &self.auctions {
            store.insert(Auction::new(auction.id.clone(), auction.title.clone()))?;
            if let Some(ends_at) = auction.ends_at {
                store.set_ends_at(&auction.id, ends_at)?;
            }
        }
        Ok(())
    }

    /// Apply every step in order, collecting outcomes. Sweep steps use
    /// `ending_window`.
    pub fn run(&self, store: &mut AuctionStore, ending_window: Duration) -> Vec<StepOutcome> {
        self.steps
            .iter()
            .enumerate()
            .map(|(index, step)| match step {
                ScenarioStep::Transition { auction, to, actor } => {
                    let result =
                        store.request_transition_named(auction, to, Actor::from(actor.as_str()));
                    debug!(step = index, auction_id = %auction, ok = result.is_ok(), "Scenario step");

                    let (applied, error) = match result {
                        Ok((_, record)) => (vec![record], None),
                        Err(e) => (Vec::new(), Some(e.to_string())),
                    };
                    StepOutcome {
                        index,
                        auction_id: Some(auction.clone()),
                        requested: to.clone(),
                        applied,
                        error,
                    }
                }
                ScenarioStep::Sweep { sweep_at } => {
                    let applied = store.advance_expired(*sweep_at, ending_window);
                    debug!(step = index, transitions = applied.len(), "Scenario sweep");

                    StepOutcome {
                        index,
                        auction_id: None,
                        requested: format!("sweep at {}", sweep_at.to_rfc3339()),
                        applied,
                        error: None,
                    }
                }
            })
            .collect()
    }
}
