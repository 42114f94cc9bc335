//! Preference-adaptive movie recommendation sessions.
//!
//! A session sends the user's taste signals to an external recommender, keeps
//! the returned candidates in an ordered, exclusion-aware list, and re-ranks
//! that list as the user likes and dislikes titles. Free-text feedback asks the
//! recommender for a fresh batch.

pub mod api;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
