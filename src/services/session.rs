use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc,
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{CandidateId, Preferences, Reaction},
    services::{
        controller::{FeedbackController, FeedbackOutcome, QueryOutcome, ReactOutcome, SessionSettings},
        providers::Recommender,
    },
};

/// One user's browsing session
///
/// The controller mutex is the only path to the session state. It is never
/// held across a recommender call, so a reset can land while a request is in
/// flight; the response is then discarded.
///
/// The recommender call and the completion that follows it run on their own
/// task. A caller that goes away mid-request still leaves the session settled.
pub struct Session {
    id: Uuid,
    controller: Arc<Mutex<FeedbackController>>,
    recommender: Arc<dyn Recommender>,
    last_active_ms: AtomicI64,
}

impl Session {
    pub fn new(recommender: Arc<dyn Recommender>, settings: SessionSettings) -> Self {
        Self {
            id: Uuid::new_v4(),
            controller: Arc::new(Mutex::new(FeedbackController::new(settings))),
            recommender,
            last_active_ms: AtomicI64::new(Utc::now().timestamp_millis()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn last_active(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.last_active_ms.load(Ordering::Relaxed))
            .unwrap_or_default()
    }

    fn touch(&self) {
        self.last_active_ms
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    /// Runs a new search against the recommender
    #[tracing::instrument(skip_all, fields(session_id = %self.id, recommender = self.recommender.name()))]
    pub async fn submit_query(&self, preferences: Preferences) -> AppResult<QueryOutcome> {
        self.touch();
        let ticket = self.controller.lock().await.begin_query(preferences)?;

        let controller = self.controller.clone();
        let recommender = self.recommender.clone();
        let task = tokio::spawn(
            async move {
                let result = recommender.recommend(ticket.preferences()).await;
                let mut controller = controller.lock().await;
                controller.complete_query(ticket, result)
            }
            .in_current_span(),
        );

        task.await
            .map_err(|e| AppError::Internal(format!("Query task failed: {}", e)))?
    }

    /// Sends free-text feedback and swaps in the refined results
    #[tracing::instrument(skip_all, fields(session_id = %self.id, recommender = self.recommender.name()))]
    pub async fn submit_feedback(&self, text: &str) -> AppResult<FeedbackOutcome> {
        self.touch();
        let ticket = self.controller.lock().await.begin_feedback(text)?;

        let controller = self.controller.clone();
        let recommender = self.recommender.clone();
        let task = tokio::spawn(
            async move {
                let result = recommender.refine(ticket.request()).await;
                let mut controller = controller.lock().await;
                controller.complete_feedback(ticket, result)
            }
            .in_current_span(),
        );

        task.await
            .map_err(|e| AppError::Internal(format!("Feedback task failed: {}", e)))?
    }

    pub async fn react(&self, id: &CandidateId, reaction: Reaction) -> AppResult<ReactOutcome> {
        self.touch();
        self.controller.lock().await.react(id, reaction)
    }

    pub async fn reset(&self) {
        self.touch();
        self.controller.lock().await.reset();
    }

    pub async fn next_page(&self) -> bool {
        self.touch();
        self.controller.lock().await.next_page()
    }

    pub async fn prev_page(&self) -> bool {
        self.touch();
        self.controller.lock().await.prev_page()
    }

    /// Reads the session state under the lock
    pub async fn inspect<R>(&self, f: impl FnOnce(&FeedbackController) -> R) -> R {
        let controller = self.controller.lock().await;
        f(&controller)
    }
}

/// All live sessions, keyed by id
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Arc<Session>>>>,
    recommender: Arc<dyn Recommender>,
    settings: SessionSettings,
}

impl SessionStore {
    pub fn new(recommender: Arc<dyn Recommender>, settings: SessionSettings) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            recommender,
            settings,
        }
    }

    pub async fn create(&self) -> Arc<Session> {
        let session = Arc::new(Session::new(self.recommender.clone(), self.settings));
        self.sessions
            .write()
            .await
            .insert(session.id(), session.clone());

        tracing::info!(session_id = %session.id(), "Session created");
        session
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Arc<Session>> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::SessionNotFound(id.to_string()))
    }

    pub async fn remove(&self, id: Uuid) -> AppResult<()> {
        match self.sessions.write().await.remove(&id) {
            Some(_) => {
                tracing::info!(session_id = %id, "Session discarded");
                Ok(())
            }
            None => Err(AppError::SessionNotFound(id.to_string())),
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drops sessions last touched before `cutoff`; returns how many went
    pub async fn evict_inactive_since(&self, cutoff: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.last_active() >= cutoff);
        before - sessions.len()
    }

    pub async fn evict_idle(&self, ttl: Duration) -> usize {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let cutoff = Utc::now()
            .checked_sub_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.evict_inactive_since(cutoff).await
    }
}

/// Handle for stopping the idle-session sweeper
pub struct SweeperHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl SweeperHandle {
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Session sweeper shutdown signal sent");
    }
}

/// Spawns a background task that evicts sessions idle for longer than `ttl`
pub fn spawn_sweeper(store: SessionStore, interval: Duration, ttl: Duration) -> SweeperHandle {
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

    tokio::spawn(async move {
        tracing::info!(interval_secs = interval.as_secs(), ttl_secs = ttl.as_secs(), "Session sweeper started");
        let mut ticker = tokio::time::interval(interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = store.evict_idle(ttl).await;
                    if evicted > 0 {
                        let remaining = store.len().await;
                        tracing::info!(evicted, remaining, "Evicted idle sessions");
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Session sweeper stopped");
                    break;
                }
            }
        }
    });

    SweeperHandle { shutdown_tx }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttributeClass, Candidate, FeedbackRequest};
    use crate::services::controller::Phase;
    use crate::services::providers::MockRecommender;
    use tokio::sync::Notify;
    use tokio_test::assert_ok;

    fn batch() -> Vec<Candidate> {
        vec![
            Candidate::new("A", "A").with_tags(AttributeClass::Genres, ["Drama"]),
            Candidate::new("B", "B").with_tags(AttributeClass::Genres, ["Comedy"]),
        ]
    }

    fn prefs() -> Preferences {
        Preferences::natural_language("dramas", ["Netflix"])
    }

    /// Recommender that holds every call until released
    struct GatedRecommender {
        started: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait::async_trait]
    impl Recommender for GatedRecommender {
        async fn recommend(&self, _preferences: &Preferences) -> AppResult<Vec<Candidate>> {
            self.started.notify_one();
            self.release.notified().await;
            Ok(batch())
        }

        async fn refine(&self, _request: &FeedbackRequest) -> AppResult<Vec<Candidate>> {
            self.started.notify_one();
            self.release.notified().await;
            Ok(batch())
        }

        fn name(&self) -> &'static str {
            "gated"
        }
    }

    fn gated() -> (Arc<Session>, Arc<Notify>, Arc<Notify>) {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let recommender = GatedRecommender {
            started: started.clone(),
            release: release.clone(),
        };
        let session = Arc::new(Session::new(Arc::new(recommender), SessionSettings::default()));
        (session, started, release)
    }

    #[tokio::test]
    async fn test_submit_query_applies_results() {
        let mut mock = MockRecommender::new();
        mock.expect_name().return_const("mock");
        mock.expect_recommend()
            .times(1)
            .returning(|_| Ok(batch()));

        let session = Session::new(Arc::new(mock), SessionSettings::default());
        let outcome = session.submit_query(prefs()).await.unwrap();

        assert_eq!(outcome, QueryOutcome::Applied { results: 2 });
        assert_eq!(session.inspect(|c| c.phase()).await, Phase::Browsing);
    }

    #[tokio::test]
    async fn test_invalid_query_never_reaches_recommender() {
        let mut mock = MockRecommender::new();
        mock.expect_name().return_const("mock");
        mock.expect_recommend().never();

        let session = Session::new(Arc::new(mock), SessionSettings::default());
        let result = session
            .submit_query(Preferences::natural_language(" ", Vec::<String>::new()))
            .await;

        assert!(matches!(result, Err(AppError::ValidationFailure(_))));
    }

    #[tokio::test]
    async fn test_empty_feedback_never_reaches_recommender() {
        let mut mock = MockRecommender::new();
        mock.expect_name().return_const("mock");
        mock.expect_recommend().returning(|_| Ok(batch()));
        mock.expect_refine().never();

        let session = Session::new(Arc::new(mock), SessionSettings::default());
        session.submit_query(prefs()).await.unwrap();

        let result = session.submit_feedback("").await;
        assert!(matches!(result, Err(AppError::ValidationFailure(_))));
        assert_eq!(session.inspect(|c| c.results().len()).await, 2);
    }

    #[tokio::test]
    async fn test_feedback_with_no_new_results() {
        let mut mock = MockRecommender::new();
        mock.expect_name().return_const("mock");
        mock.expect_recommend().returning(|_| Ok(batch()));
        mock.expect_refine()
            .withf(|request| request.feedback_text == "more comedies")
            .times(1)
            .returning(|_| Ok(Vec::new()));

        let session = Session::new(Arc::new(mock), SessionSettings::default());
        session.submit_query(prefs()).await.unwrap();
        session.react(&"B".into(), Reaction::Like).await.unwrap();
        let before: Vec<CandidateId> = session
            .inspect(|c| c.results().candidates().iter().map(|m| m.id.clone()).collect())
            .await;

        let outcome = session.submit_feedback("more comedies").await.unwrap();
        assert_eq!(outcome, FeedbackOutcome::NoNewResults);

        let after: Vec<CandidateId> = session
            .inspect(|c| c.results().candidates().iter().map(|m| m.id.clone()).collect())
            .await;
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_network_failure_keeps_previous_results() {
        let mut mock = MockRecommender::new();
        mock.expect_name().return_const("mock");
        let mut calls = 0;
        mock.expect_recommend().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Ok(batch())
            } else {
                Err(AppError::NetworkFailure("connection refused".to_string()))
            }
        });

        let session = Session::new(Arc::new(mock), SessionSettings::default());
        session.submit_query(prefs()).await.unwrap();

        let result = session.submit_query(prefs()).await;
        assert!(matches!(result, Err(AppError::NetworkFailure(_))));
        assert_eq!(session.inspect(|c| c.phase()).await, Phase::Browsing);
        assert_eq!(session.inspect(|c| c.results().len()).await, 2);
    }

    #[tokio::test]
    async fn test_reset_discards_in_flight_response() {
        let (session, started, release) = gated();

        let task = tokio::spawn({
            let session = session.clone();
            async move { session.submit_query(prefs()).await }
        });

        started.notified().await;
        session.reset().await;
        release.notify_one();

        let outcome = task.await.unwrap().unwrap();
        assert_eq!(outcome, QueryOutcome::Stale);
        assert_eq!(session.inspect(|c| c.phase()).await, Phase::Idle);
        assert!(session.inspect(|c| c.results().is_empty()).await);
    }

    #[tokio::test]
    async fn test_dropped_query_still_settles_session() {
        let (session, started, release) = gated();

        let caller = tokio::spawn({
            let session = session.clone();
            async move { session.submit_query(prefs()).await }
        });

        started.notified().await;
        caller.abort();
        assert!(caller.await.unwrap_err().is_cancelled());

        release.notify_one();
        tokio::time::timeout(Duration::from_secs(5), async {
            while session.inspect(|c| c.phase()).await != Phase::Browsing {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("query never completed after its caller went away");

        assert_eq!(session.inspect(|c| c.results().len()).await, 2);

        let retry = tokio::spawn({
            let session = session.clone();
            async move { session.submit_query(prefs()).await }
        });
        started.notified().await;
        release.notify_one();
        assert_eq!(retry.await.unwrap().unwrap(), QueryOutcome::Applied { results: 2 });
    }

    #[tokio::test]
    async fn test_dropped_feedback_still_settles_session() {
        let (session, started, release) = gated();

        let query = tokio::spawn({
            let session = session.clone();
            async move { session.submit_query(prefs()).await }
        });
        started.notified().await;
        release.notify_one();
        query.await.unwrap().unwrap();

        let caller = tokio::spawn({
            let session = session.clone();
            async move { session.submit_feedback("more comedies").await }
        });
        started.notified().await;
        caller.abort();
        let _ = caller.await;
        release.notify_one();

        tokio::time::timeout(Duration::from_secs(5), async {
            while session.inspect(|c| c.phase()).await != Phase::Browsing {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("feedback never completed after its caller went away");

        assert_ok!(session.react(&"A".into(), Reaction::Like).await);
    }

    #[tokio::test]
    async fn test_concurrent_query_is_rejected() {
        let (session, started, release) = gated();

        let task = tokio::spawn({
            let session = session.clone();
            async move { session.submit_query(prefs()).await }
        });

        started.notified().await;
        let second = session.submit_query(prefs()).await;
        assert!(matches!(second, Err(AppError::Busy)));

        release.notify_one();
        let outcome = task.await.unwrap().unwrap();
        assert_eq!(outcome, QueryOutcome::Applied { results: 2 });
    }

    #[tokio::test]
    async fn test_store_lifecycle() {
        let store = SessionStore::new(Arc::new(MockRecommender::new()), SessionSettings::default());
        let session = store.create().await;

        assert_eq!(store.get(session.id()).await.unwrap().id(), session.id());
        assert_eq!(store.len().await, 1);

        store.remove(session.id()).await.unwrap();
        assert!(matches!(
            store.get(session.id()).await,
            Err(AppError::SessionNotFound(_))
        ));
        assert!(store.remove(session.id()).await.is_err());
    }

    #[tokio::test]
    async fn test_evict_inactive_sessions() {
        let store = SessionStore::new(Arc::new(MockRecommender::new()), SessionSettings::default());
        store.create().await;
        store.create().await;

        let past = Utc::now() - chrono::Duration::hours(1);
        assert_eq!(store.evict_inactive_since(past).await, 0);
        assert_eq!(store.evict_idle(Duration::from_secs(3600)).await, 0);

        let future = Utc::now() + chrono::Duration::hours(1);
        assert_eq!(store.evict_inactive_since(future).await, 2);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_sweeper_evicts_idle_sessions() {
        let store = SessionStore::new(Arc::new(MockRecommender::new()), SessionSettings::default());
        store.create().await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        let sweeper = spawn_sweeper(store.clone(), Duration::from_millis(10), Duration::ZERO);
        tokio::time::timeout(Duration::from_secs(5), async {
            while store.len().await > 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("sweeper never evicted the idle session");

        sweeper.shutdown().await;
    }
}
