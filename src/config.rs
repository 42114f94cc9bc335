use std::{num::NonZeroUsize, time::Duration};

use serde::Deserialize;

use crate::services::{
    controller::DEFAULT_PAGE_SIZE, providers::Endpoints, ExclusionPolicy, PagingPolicy,
    SessionSettings,
};

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Base URL of the external recommendation service
    #[serde(default = "default_recommender_url")]
    pub recommender_url: String,

    /// Path of the genres/actors/min-rating endpoint
    #[serde(default = "default_recommend_path")]
    pub recommend_path: String,

    /// Path of the natural-language endpoint
    #[serde(default = "default_natural_language_path")]
    pub natural_language_path: String,

    /// Path of the feedback endpoint
    #[serde(default = "default_feedback_path")]
    pub feedback_path: String,

    /// Per-request timeout for recommender calls
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Candidates per page; zero is rejected at load
    #[serde(default = "default_page_size")]
    pub page_size: NonZeroUsize,

    #[serde(default)]
    pub paging_policy: PagingPolicy,

    #[serde(default)]
    pub exclusion_policy: ExclusionPolicy,

    /// Sessions untouched for this long are evicted
    #[serde(default = "default_session_idle_ttl_secs")]
    pub session_idle_ttl_secs: u64,

    #[serde(default = "default_session_sweep_interval_secs")]
    pub session_sweep_interval_secs: u64,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_recommender_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_recommend_path() -> String {
    "/api/recommend".to_string()
}

fn default_natural_language_path() -> String {
    "/api/recommendationsv2".to_string()
}

fn default_feedback_path() -> String {
    "/api/feedback".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_page_size() -> NonZeroUsize {
    DEFAULT_PAGE_SIZE
}

fn default_session_idle_ttl_secs() -> u64 {
    1800
}

fn default_session_sweep_interval_secs() -> u64 {
    60
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn session_idle_ttl(&self) -> Duration {
        Duration::from_secs(self.session_idle_ttl_secs)
    }

    pub fn session_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session_sweep_interval_secs.max(1))
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            recommend: self.recommend_path.clone(),
            natural_language: self.natural_language_path.clone(),
            feedback: self.feedback_path.clone(),
        }
    }

    /// Per-session controller settings
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            page_size: self.page_size,
            paging_policy: self.paging_policy,
            exclusion_policy: self.exclusion_policy,
        }
    }
}
