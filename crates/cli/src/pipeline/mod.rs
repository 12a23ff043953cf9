//! Sequential per-entity workflows over injected clients.
//!
//! Every pipeline walks its entities one at a time, records per-entity failures in a
//! [`ProblemLog`](crate::problems::ProblemLog) and moves on to the next entity.

mod offboard;
mod onboard;
mod ping;

#[cfg(test)]
pub(crate) mod mocks;

use std::collections::HashSet;

pub use offboard::{OffboardAction, OffboardReport, Offboarding};
pub use onboard::{OnboardReport, Onboarding, DEFAULT_CLUSTER_OPERATORS};
pub use ping::{ping_operators, PingReport};

/// `ids` in first-seen order without repeats.
pub fn dedup_ids(ids: &[u64]) -> Vec<u64> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
