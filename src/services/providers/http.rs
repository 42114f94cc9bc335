/// HTTP recommender client
///
/// Talks to the recommendation back-end over JSON:
/// 1. Structured query: POST {recommend_path} with `{ genres, actors, min_rating }`
/// 2. Natural-language query: POST {natural_language_path} with
///    `{ natural_language_query, streaming_services }`
/// 3. Feedback: POST {feedback_path} with `{ feedbackText, originalPreferences }`
///
/// All three answer `{ "recommendations": [...] }`. The query endpoints answer
/// 404 when nothing matched.
use std::time::Duration;

use anyhow::Context;
use reqwest::{Client as HttpClient, StatusCode, Url};
use serde::Serialize;

use crate::{
    error::{AppError, AppResult},
    models::{candidates_from_wire, Candidate, FeedbackRequest, Preferences, WireCandidate},
    services::providers::Recommender,
};

/// Endpoint paths on the recommender host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub recommend: String,
    pub natural_language: String,
    pub feedback: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            recommend: "/api/recommend".to_string(),
            natural_language: "/api/recommendationsv2".to_string(),
            feedback: "/api/feedback".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpRecommender {
    http_client: HttpClient,
    recommend_url: Url,
    natural_language_url: Url,
    feedback_url: Url,
}

impl HttpRecommender {
    pub fn new(base_url: &str, endpoints: &Endpoints, timeout: Duration) -> anyhow::Result<Self> {
        let http_client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("failed to build recommender client")?;

        let base_url = Url::parse(base_url).context("invalid recommender base URL")?;
        let join = |path: &str| {
            base_url
                .join(path)
                .with_context(|| format!("invalid recommender path {}", path))
        };

        Ok(Self {
            http_client,
            recommend_url: join(&endpoints.recommend)?,
            natural_language_url: join(&endpoints.natural_language)?,
            feedback_url: join(&endpoints.feedback)?,
        })
    }

    /// POSTs `body` and returns the status with the raw response text
    async fn post<B: Serialize + ?Sized>(&self, url: &Url, body: &B) -> AppResult<(StatusCode, String)> {
        let response = self.http_client.post(url.clone()).json(body).send().await?;
        let status = response.status();
        let text = response.text().await?;
        Ok((status, text))
    }
}

fn upstream_error(status: StatusCode, body: &str) -> AppError {
    AppError::NetworkFailure(format!("Recommender returned status {}: {}", status, body))
}

/// Extracts candidates from a `{ "recommendations": [...] }` body
///
/// When `required` is false a missing or null field reads as an empty list.
/// Entries that fail to parse are skipped.
fn parse_recommendations(body: &str, required: bool) -> AppResult<Vec<Candidate>> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| AppError::InvalidResponse(format!("Response is not JSON: {}", e)))?;

    let entries = match value.get("recommendations") {
        Some(serde_json::Value::Array(entries)) => entries,
        None | Some(serde_json::Value::Null) if !required => return Ok(Vec::new()),
        None | Some(serde_json::Value::Null) => {
            return Err(AppError::InvalidResponse(
                "Response is missing recommendations".to_string(),
            ))
        }
        Some(_) => {
            return Err(AppError::InvalidResponse(
                "recommendations is not a list".to_string(),
            ))
        }
    };

    let wire: Vec<WireCandidate> = entries
        .iter()
        .filter_map(|entry| match serde_json::from_value::<WireCandidate>(entry.clone()) {
            Ok(candidate) => Some(candidate),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed recommendation");
                None
            }
        })
        .collect();

    Ok(candidates_from_wire(wire))
}

#[async_trait::async_trait]
impl Recommender for HttpRecommender {
    async fn recommend(&self, preferences: &Preferences) -> AppResult<Vec<Candidate>> {
        let url = match preferences {
            Preferences::Legacy(_) => &self.recommend_url,
            Preferences::NaturalLanguage(_) => &self.natural_language_url,
        };

        let (status, body) = self.post(url, preferences).await?;

        if status == StatusCode::NOT_FOUND {
            tracing::info!(
                kind = preferences.kind(),
                recommender = "http",
                "Recommender found no matches"
            );
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(upstream_error(status, &body));
        }

        let candidates = parse_recommendations(&body, true)?;

        tracing::info!(
            kind = preferences.kind(),
            results = candidates.len(),
            recommender = "http",
            "Recommendations fetched"
        );

        Ok(candidates)
    }

    async fn refine(&self, request: &FeedbackRequest) -> AppResult<Vec<Candidate>> {
        let (status, body) = self.post(&self.feedback_url, request).await?;

        if !status.is_success() {
            return Err(upstream_error(status, &body));
        }

        let candidates = parse_recommendations(&body, false)?;

        tracing::info!(
            results = candidates.len(),
            recommender = "http",
            "Refined recommendations fetched"
        );

        Ok(candidates)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
