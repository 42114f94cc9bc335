use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::models::{Candidate, CandidateId};

use super::affinity::{score, AffinityState};

/// What happens to excluded ids when a feedback re-query replaces the results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionPolicy {
    /// A replacement is a fresh batch: prior dislikes are forgotten
    #[default]
    ClearOnReplace,
    /// Disliked ids stay hidden even if the new batch contains them
    Preserve,
}

/// Candidates currently eligible for display, in display order
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    candidates: Vec<Candidate>,
    /// Position of each candidate in the batch the recommender sent
    arrival: HashMap<CandidateId, usize>,
    excluded: HashSet<CandidateId>,
}

impl ResultSet {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self {
            arrival: arrival_order(&candidates),
            candidates,
            excluded: HashSet::new(),
        }
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn get(&self, id: &CandidateId) -> Option<&Candidate> {
        self.candidates.iter().find(|c| &c.id == id)
    }

    pub fn contains(&self, id: &CandidateId) -> bool {
        self.get(id).is_some()
    }

    pub fn is_excluded(&self, id: &CandidateId) -> bool {
        self.excluded.contains(id)
    }

    pub fn excluded_count(&self) -> usize {
        self.excluded.len()
    }

    /// Sorts by descending affinity score, keeping recommender order on ties
    ///
    /// `pinned`, when present in the set, goes first regardless of score.
    pub fn reorder_by_affinity(&mut self, affinity: &AffinityState, pinned: Option<&CandidateId>) {
        let excluded = &self.excluded;
        self.candidates.retain(|c| !excluded.contains(&c.id));

        let arrival = &self.arrival;
        self.candidates.sort_by_cached_key(|c| {
            let is_pinned = pinned.is_some_and(|id| id == &c.id);
            let position = arrival.get(&c.id).copied().unwrap_or(usize::MAX);
            (!is_pinned, std::cmp::Reverse(score(c, affinity)), position)
        });
    }

    /// Removes a candidate for the rest of the session
    ///
    /// Returns `false`, changing nothing, if the id is not displayed.
    pub fn exclude(&mut self, id: &CandidateId) -> bool {
        let Some(position) = self.candidates.iter().position(|c| &c.id == id) else {
            return false;
        };
        self.candidates.remove(position);
        self.excluded.insert(id.clone());
        true
    }

    /// Swaps in a new batch according to `policy`
    ///
    /// Returns the number of candidates that are now displayed.
    pub fn replace_all(&mut self, candidates: Vec<Candidate>, policy: ExclusionPolicy) -> usize {
        self.arrival = arrival_order(&candidates);
        match policy {
            ExclusionPolicy::ClearOnReplace => {
                self.excluded.clear();
                self.candidates = candidates;
            }
            ExclusionPolicy::Preserve => {
                let excluded = &self.excluded;
                self.candidates = candidates
                    .into_iter()
                    .filter(|c| !excluded.contains(&c.id))
                    .collect();
            }
        }
        self.candidates.len()
    }

    /// Candidates of `batch` that `replace_all` would keep under `policy`
    pub fn admissible(&self, batch: &[Candidate], policy: ExclusionPolicy) -> usize {
        match policy {
            ExclusionPolicy::ClearOnReplace => batch.len(),
            ExclusionPolicy::Preserve => batch.iter().filter(|c| !self.excluded.contains(&c.id)).count(),
        }
    }
}

fn arrival_order(candidates: &[Candidate]) -> HashMap<CandidateId, usize> {
    candidates
        .iter()
        .enumerate()
        .map(|(position, c)| (c.id.clone(), position))
        .collect()
}
