//! Deterministic closure raffle.
//!
//! The winner is a pure function of the eligible set, the tanda id, the
//! closure instant and the last event id. Insertion order of the eligible
//! set does not matter because it is sorted first.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::foundation::{EventId, TandaId, Timestamp, UserId};

/// Inputs fixed at the moment of closure.
#[derive(Debug, Clone)]
pub struct RaffleInput<'a> {
    pub tanda_id: TandaId,
    pub closed_at: Timestamp,
    pub last_event_id: Option<&'a EventId>,
    pub eligible: Vec<UserId>,
}

/// Auditable record of a draw, stored in the `RaffleDrawn` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaffleOutcome {
    pub eligible: Vec<UserId>,
    pub eligibles_hash: String,
    pub seed: String,
    pub seed_hash: String,
    pub winner_index: usize,
    pub winner: UserId,
}

/// Draws a winner, or `None` when nobody is eligible.
pub fn draw(input: RaffleInput<'_>) -> Option<RaffleOutcome> {
    let mut eligible = input.eligible;
    eligible.sort();
    eligible.dedup();
    if eligible.is_empty() {
        return None;
    }

    let joined = eligible
        .iter()
        .map(UserId::as_str)
        .collect::<Vec<_>>()
        .join(",");
    let eligibles_hash = hex::encode(Sha256::digest(joined.as_bytes()));

    let seed = format!(
        "{}{}{}{}",
        input.tanda_id,
        input.closed_at.as_millis(),
        input.last_event_id.map(EventId::as_str).unwrap_or_default(),
        eligible.len()
    );
    let digest = Sha256::digest(seed.as_bytes());
    let head = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    let winner_index = head as usize % eligible.len();
    let winner = eligible[winner_index].clone();

    Some(RaffleOutcome {
        eligible,
        eligibles_hash,
        seed,
        seed_hash: hex::encode(digest),
        winner_index,
        winner,
    })
}
