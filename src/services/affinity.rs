use serde::Serialize;
use std::collections::BTreeSet;

use crate::models::{AttributeClass, Candidate};

/// Genres and tropes of everything liked this session
///
/// Only ever grows: a dislike never retracts an earlier like.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AffinityState {
    pub liked_genres: BTreeSet<String>,
    pub liked_tropes: BTreeSet<String>,
}

impl AffinityState {
    pub fn is_empty(&self) -> bool {
        self.liked_genres.is_empty() && self.liked_tropes.is_empty()
    }
}

/// Number of the candidate's genres and tropes that have been liked
///
/// Genres and tropes weigh the same. Used only for ordering, never to filter.
pub fn score(candidate: &Candidate, affinity: &AffinityState) -> usize {
    let genres = candidate
        .tags(AttributeClass::Genres)
        .iter()
        .filter(|g| affinity.liked_genres.contains(g.as_str()))
        .count();
    let tropes = candidate
        .tags(AttributeClass::Tropes)
        .iter()
        .filter(|t| affinity.liked_tropes.contains(t.as_str()))
        .count();

    genres + tropes
}

/// Returns `affinity` extended with the liked candidate's genres and tropes
pub fn record_like(affinity: &AffinityState, candidate: &Candidate) -> AffinityState {
    let mut next = affinity.clone();
    next.liked_genres
        .extend(candidate.tags(AttributeClass::Genres).iter().cloned());
    next.liked_tropes
        .extend(candidate.tags(AttributeClass::Tropes).iter().cloned());
    next
}
