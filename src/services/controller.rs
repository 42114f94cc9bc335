use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{collections::HashMap, num::NonZeroUsize};

use crate::{
    error::{AppError, AppResult},
    models::{Candidate, CandidateId, FeedbackRequest, Preferences, Reaction},
};

use super::{
    affinity::{record_like, AffinityState},
    pagination::{Pager, PagingPolicy},
    result_set::{ExclusionPolicy, ResultSet},
};

/// Where a session is in the query/browse/feedback cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Nothing searched yet
    Idle,
    /// Waiting on the recommender for a new search
    Querying,
    /// Results shown, reactions accepted
    Browsing,
    /// Waiting on the recommender for a feedback re-query
    Submitting,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Querying => "querying",
            Phase::Browsing => "browsing",
            Phase::Submitting => "submitting",
        }
    }

    fn in_flight(&self) -> bool {
        matches!(self, Phase::Querying | Phase::Submitting)
    }
}

pub const DEFAULT_PAGE_SIZE: NonZeroUsize = match NonZeroUsize::new(4) {
    Some(size) => size,
    None => unreachable!(),
};

/// Per-session presentation and replacement policies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub page_size: NonZeroUsize,
    pub paging_policy: PagingPolicy,
    pub exclusion_policy: ExclusionPolicy,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            paging_policy: PagingPolicy::Clamped,
            exclusion_policy: ExclusionPolicy::ClearOnReplace,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Non-fatal message for the user about the last request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl Notice {
    fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
            at: Utc::now(),
        }
    }

    fn error(error: &AppError) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: error.to_string(),
            at: Utc::now(),
        }
    }
}

/// Permission to apply one recommender response to the session that issued it
#[derive(Debug, Clone)]
pub struct QueryTicket {
    sequence: u64,
    preferences: Preferences,
}

impl QueryTicket {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }
}

#[derive(Debug, Clone)]
pub struct FeedbackTicket {
    sequence: u64,
    request: FeedbackRequest,
}

impl FeedbackTicket {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn request(&self) -> &FeedbackRequest {
        &self.request
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum QueryOutcome {
    Applied { results: usize },
    /// The session was reset or re-queried while this request was in flight
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReactOutcome {
    Applied,
    /// The candidate is no longer displayed
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FeedbackOutcome {
    Replaced { results: usize },
    /// The recommender had nothing new; current results were kept
    NoNewResults,
    Stale,
}

/// Session state and the transitions between search, browsing and feedback
///
/// Network calls happen outside the controller: `begin_*` hands out a ticket
/// and `complete_*` applies the response only if no later request or reset
/// superseded it.
#[derive(Debug)]
pub struct FeedbackController {
    phase: Phase,
    /// Phase restored when an in-flight request fails
    resume: Phase,
    results: ResultSet,
    affinity: AffinityState,
    reactions: HashMap<CandidateId, Reaction>,
    /// Query that produced the current results
    preferences: Option<Preferences>,
    pager: Pager,
    settings: SessionSettings,
    sequence: u64,
    notice: Option<Notice>,
}

impl Default for FeedbackController {
    fn default() -> Self {
        Self::new(SessionSettings::default())
    }
}

impl FeedbackController {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            phase: Phase::Idle,
            resume: Phase::Idle,
            results: ResultSet::default(),
            affinity: AffinityState::default(),
            reactions: HashMap::new(),
            preferences: None,
            pager: Pager::new(settings.page_size, settings.paging_policy),
            settings,
            sequence: 0,
            notice: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn results(&self) -> &ResultSet {
        &self.results
    }

    pub fn affinity(&self) -> &AffinityState {
        &self.affinity
    }

    pub fn reaction(&self, id: &CandidateId) -> Reaction {
        self.reactions.get(id).copied().unwrap_or_default()
    }

    pub fn preferences(&self) -> Option<&Preferences> {
        self.preferences.as_ref()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn pager(&self) -> &Pager {
        &self.pager
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Candidates on the current page
    pub fn visible(&self) -> &[Candidate] {
        self.pager.slice(self.results.candidates())
    }

    /// Starts a new search
    pub fn begin_query(&mut self, preferences: Preferences) -> AppResult<QueryTicket> {
        if self.phase.in_flight() {
            return Err(AppError::Busy);
        }

        let preferences = preferences.validated().map_err(|e| self.fail_fast(e))?;

        self.sequence += 1;
        self.resume = self.phase;
        self.phase = Phase::Querying;

        tracing::info!(
            sequence = self.sequence,
            kind = preferences.kind(),
            "Query submitted"
        );

        Ok(QueryTicket {
            sequence: self.sequence,
            preferences,
        })
    }

    /// Applies the recommender's answer to a search
    ///
    /// A new search starts from scratch: affinity, reactions and exclusions
    /// are all cleared.
    pub fn complete_query(
        &mut self,
        ticket: QueryTicket,
        result: AppResult<Vec<Candidate>>,
    ) -> AppResult<QueryOutcome> {
        if !self.is_current(ticket.sequence, Phase::Querying) {
            tracing::debug!(
                sequence = ticket.sequence,
                current = self.sequence,
                "Discarding stale query response"
            );
            return Ok(QueryOutcome::Stale);
        }

        let candidates = match result {
            Ok(candidates) => candidates,
            Err(e) => return Err(self.fail_in_flight(e)),
        };

        let count = candidates.len();
        self.results = ResultSet::new(candidates);
        self.affinity = AffinityState::default();
        self.reactions.clear();
        self.preferences = Some(ticket.preferences);
        self.pager.reset();
        self.phase = Phase::Browsing;
        self.notice = if count == 0 {
            Some(Notice::info("No recommendations found for the given preferences."))
        } else {
            None
        };

        tracing::info!(sequence = ticket.sequence, results = count, "Query results applied");

        Ok(QueryOutcome::Applied { results: count })
    }

    /// Records a reaction to a displayed candidate
    ///
    /// A like grows the affinity and re-ranks with the liked candidate first;
    /// a dislike removes the candidate for good; neutral only records.
    pub fn react(&mut self, id: &CandidateId, reaction: Reaction) -> AppResult<ReactOutcome> {
        if self.phase != Phase::Browsing {
            return Err(AppError::InvalidTransition {
                action: "react",
                phase: self.phase.as_str(),
            });
        }

        let Some(candidate) = self.results.get(id) else {
            tracing::debug!(candidate_id = %id, "Ignoring reaction to candidate not on display");
            return Ok(ReactOutcome::Ignored);
        };

        match reaction {
            Reaction::Like => {
                self.affinity = record_like(&self.affinity, candidate);
                self.results.reorder_by_affinity(&self.affinity, Some(id));
                if self.pager.policy() == PagingPolicy::Wrapping {
                    self.pager.focus(1, self.results.len());
                }
                self.reactions.insert(id.clone(), reaction);
            }
            Reaction::Dislike => {
                self.results.exclude(id);
                self.pager.clamp(self.results.len());
                self.reactions.insert(id.clone(), reaction);
            }
            Reaction::Neutral => {
                self.reactions.insert(id.clone(), reaction);
            }
            Reaction::None => {
                self.reactions.remove(id);
            }
        }

        tracing::debug!(
            candidate_id = %id,
            reaction = reaction.as_str(),
            remaining = self.results.len(),
            "Reaction recorded"
        );

        Ok(ReactOutcome::Applied)
    }

    /// Starts a feedback re-query for the current results
    pub fn begin_feedback(&mut self, text: &str) -> AppResult<FeedbackTicket> {
        if self.phase.in_flight() {
            return Err(AppError::Busy);
        }
        if self.phase != Phase::Browsing {
            return Err(AppError::InvalidTransition {
                action: "submit feedback",
                phase: self.phase.as_str(),
            });
        }

        let text = text.trim();
        if text.is_empty() {
            return Err(self.fail_fast(AppError::ValidationFailure(
                "Feedback cannot be empty".to_string(),
            )));
        }

        let Some(original_preferences) = self.preferences.clone() else {
            return Err(AppError::Internal(
                "Browsing session has no originating query".to_string(),
            ));
        };

        self.sequence += 1;
        self.resume = Phase::Browsing;
        self.phase = Phase::Submitting;

        tracing::info!(sequence = self.sequence, "Feedback submitted");

        Ok(FeedbackTicket {
            sequence: self.sequence,
            request: FeedbackRequest {
                feedback_text: text.to_string(),
                original_preferences,
            },
        })
    }

    /// Applies the recommender's answer to feedback
    ///
    /// An empty answer, or one made up entirely of excluded candidates under
    /// [`ExclusionPolicy::Preserve`], leaves the results untouched.
    pub fn complete_feedback(
        &mut self,
        ticket: FeedbackTicket,
        result: AppResult<Vec<Candidate>>,
    ) -> AppResult<FeedbackOutcome> {
        if !self.is_current(ticket.sequence, Phase::Submitting) {
            tracing::debug!(
                sequence = ticket.sequence,
                current = self.sequence,
                "Discarding stale feedback response"
            );
            return Ok(FeedbackOutcome::Stale);
        }

        let batch = match result {
            Ok(batch) => batch,
            Err(e) => return Err(self.fail_in_flight(e)),
        };

        self.phase = Phase::Browsing;

        let policy = self.settings.exclusion_policy;
        if self.results.admissible(&batch, policy) == 0 {
            self.notice = Some(Notice::info(
                "No new recommendations came back; keeping the current list.",
            ));
            tracing::info!(sequence = ticket.sequence, "Feedback produced no new results");
            return Ok(FeedbackOutcome::NoNewResults);
        }

        let count = self.results.replace_all(batch, policy);
        self.reactions.clear();
        self.pager.reset();
        self.notice = None;

        tracing::info!(sequence = ticket.sequence, results = count, "Feedback results applied");

        Ok(FeedbackOutcome::Replaced { results: count })
    }

    /// Discards everything and returns to `Idle`; in-flight responses become stale
    pub fn reset(&mut self) {
        self.sequence += 1;
        self.phase = Phase::Idle;
        self.resume = Phase::Idle;
        self.results = ResultSet::default();
        self.affinity = AffinityState::default();
        self.reactions.clear();
        self.preferences = None;
        self.pager.reset();
        self.notice = None;

        tracing::info!(sequence = self.sequence, "Session reset");
    }

    pub fn next_page(&mut self) -> bool {
        self.pager.next(self.results.len())
    }

    pub fn prev_page(&mut self) -> bool {
        self.pager.prev(self.results.len())
    }

    fn is_current(&self, sequence: u64, expected: Phase) -> bool {
        sequence == self.sequence && self.phase == expected
    }

    /// Records a notice for a request rejected before any network call
    fn fail_fast(&mut self, error: AppError) -> AppError {
        self.notice = Some(Notice::error(&error));
        error
    }

    /// Rolls back an in-flight request that failed
    fn fail_in_flight(&mut self, error: AppError) -> AppError {
        tracing::warn!(
            sequence = self.sequence,
            phase = self.phase.as_str(),
            error = %error,
            "Recommender request failed"
        );
        self.phase = self.resume;
        self.notice = Some(Notice::error(&error));
        error
    }
}
