/// External recommender abstraction
///
/// The recommendation service is an opaque collaborator: given a preference
/// query or free-text feedback it returns a ranked list of candidates. The
/// session layer only depends on this trait, so tests can drive it with a
/// mock or an in-process stub.
use crate::{
    error::AppResult,
    models::{Candidate, FeedbackRequest, Preferences},
};

pub mod http;

pub use http::{Endpoints, HttpRecommender};

/// Trait for recommendation back-ends
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Recommender: Send + Sync {
    /// Ranked candidates for a preference query
    ///
    /// An empty list means nothing matched; it is not an error.
    async fn recommend(&self, preferences: &Preferences) -> AppResult<Vec<Candidate>>;

    /// Ranked candidates refined by user feedback
    ///
    /// An empty list means the recommender had nothing new to offer.
    async fn refine(&self, request: &FeedbackRequest) -> AppResult<Vec<Candidate>>;

    /// Recommender name for logging and debugging
    fn name(&self) -> &'static str;
}
