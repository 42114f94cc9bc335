use std::sync::Arc;

use crate::services::{Recommender, SessionSettings, SessionStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionStore,
}

impl AppState {
    /// Creates state with no sessions, backed by `recommender`
    pub fn new(recommender: Arc<dyn Recommender>, settings: SessionSettings) -> Self {
        Self {
            sessions: SessionStore::new(recommender, settings),
        }
    }
}
