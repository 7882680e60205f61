use crate::models::Candidate;
use std::cmp::Reverse;

/// Orders candidates by pixel area, largest first. Ties keep discovery order.
pub fn rank_candidates(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates.sort_by_key(|c| Reverse(c.quality));
    candidates
}
