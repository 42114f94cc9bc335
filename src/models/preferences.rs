use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

const MAX_RATING: f64 = 10.0;

/// Structured taste signals: genres, actors and a rating floor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyPreferences {
    /// Comma-separated genres
    #[serde(default)]
    pub genres: String,
    /// Comma-separated actors
    #[serde(default)]
    pub actors: String,
    #[serde(default, alias = "minRating")]
    pub min_rating: f64,
}

/// Free-text request restricted to a set of streaming services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NaturalLanguageQuery {
    #[serde(alias = "query", alias = "naturalLanguageQuery")]
    pub natural_language_query: String,
    #[serde(default, alias = "streamingServices")]
    pub streaming_services: Vec<String>,
}

/// A preference query in either of the two request shapes the recommender
/// understands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Preferences {
    NaturalLanguage(NaturalLanguageQuery),
    Legacy(LegacyPreferences),
}

impl Preferences {
    pub fn legacy(genres: &str, actors: &str, min_rating: f64) -> Self {
        Preferences::Legacy(LegacyPreferences {
            genres: genres.to_string(),
            actors: actors.to_string(),
            min_rating,
        })
    }

    pub fn natural_language<I, S>(query: &str, streaming_services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Preferences::NaturalLanguage(NaturalLanguageQuery {
            natural_language_query: query.to_string(),
            streaming_services: streaming_services.into_iter().map(Into::into).collect(),
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Preferences::NaturalLanguage(_) => "natural_language",
            Preferences::Legacy(_) => "legacy",
        }
    }

    /// Checks the query and returns it with whitespace and duplicate
    /// services cleaned up
    pub fn validated(self) -> AppResult<Self> {
        match self {
            Preferences::NaturalLanguage(query) => {
                let text = query.natural_language_query.trim();
                if text.is_empty() {
                    return Err(AppError::ValidationFailure(
                        "Please enter what you're looking for".to_string(),
                    ));
                }

                let mut services: Vec<String> = Vec::new();
                for service in &query.streaming_services {
                    let service = service.trim();
                    if !service.is_empty() && !services.iter().any(|s| s == service) {
                        services.push(service.to_string());
                    }
                }

                Ok(Preferences::NaturalLanguage(NaturalLanguageQuery {
                    natural_language_query: text.to_string(),
                    streaming_services: services,
                }))
            }
            Preferences::Legacy(prefs) => {
                if !prefs.min_rating.is_finite()
                    || prefs.min_rating < 0.0
                    || prefs.min_rating > MAX_RATING
                {
                    return Err(AppError::ValidationFailure(format!(
                        "Minimum rating must be between 0 and {}",
                        MAX_RATING
                    )));
                }

                let genres = prefs.genres.trim();
                let actors = prefs.actors.trim();
                if genres.is_empty() && actors.is_empty() {
                    return Err(AppError::ValidationFailure(
                        "Enter at least one genre or actor".to_string(),
                    ));
                }

                Ok(Preferences::Legacy(LegacyPreferences {
                    genres: genres.to_string(),
                    actors: actors.to_string(),
                    min_rating: prefs.min_rating,
                }))
            }
        }
    }
}

/// Free-text feedback on the current results, sent with the query that
/// produced them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub feedback_text: String,
    pub original_preferences: Preferences,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_untagged_natural_language_shape() {
        let prefs: Preferences = serde_json::from_value(json!({
            "natural_language_query": "sci-fi with plot twists",
            "streaming_services": ["Netflix"]
        }))
        .unwrap();

        assert_eq!(prefs, Preferences::natural_language("sci-fi with plot twists", ["Netflix"]));
    }

    #[test]
    fn test_front_end_aliases() {
        let prefs: Preferences = serde_json::from_value(json!({
            "query": "heist movies",
            "streamingServices": ["Hulu", "Disney+"]
        }))
        .unwrap();

        assert_eq!(prefs.kind(), "natural_language");
    }

    #[test]
    fn test_untagged_legacy_shape() {
        let prefs: Preferences = serde_json::from_value(json!({
            "genres": "Drama,Crime",
            "actors": "Morgan Freeman",
            "min_rating": 7.5
        }))
        .unwrap();

        assert_eq!(prefs, Preferences::legacy("Drama,Crime", "Morgan Freeman", 7.5));
    }

    #[test]
    fn test_serializes_to_backend_keys() {
        let value = serde_json::to_value(Preferences::legacy("Drama", "", 6.0)).unwrap();
        assert_eq!(value, json!({ "genres": "Drama", "actors": "", "min_rating": 6.0 }));

        let value = serde_json::to_value(Preferences::natural_language("x", Vec::<String>::new())).unwrap();
        assert_eq!(value, json!({ "natural_language_query": "x", "streaming_services": [] }));
    }

    #[test]
    fn test_blank_query_rejected() {
        let result = Preferences::natural_language("   ", ["Netflix"]).validated();
        assert!(matches!(result, Err(AppError::ValidationFailure(_))));
    }

    #[test]
    fn test_services_trimmed_and_deduplicated() {
        let prefs = Preferences::natural_language(" comedies ", [" Netflix", "Netflix", "", "Hulu"])
            .validated()
            .unwrap();

        assert_eq!(prefs, Preferences::natural_language("comedies", ["Netflix", "Hulu"]));
    }

    #[test]
    fn test_rating_out_of_range_rejected() {
        for rating in [-1.0, 10.5, f64::NAN] {
            let result = Preferences::legacy("Drama", "", rating).validated();
            assert!(matches!(result, Err(AppError::ValidationFailure(_))));
        }
    }

    #[test]
    fn test_legacy_needs_genre_or_actor() {
        let result = Preferences::legacy(" ", "", 5.0).validated();
        assert!(matches!(result, Err(AppError::ValidationFailure(_))));

        assert!(Preferences::legacy("", "Tom Hanks", 5.0).validated().is_ok());
    }

    #[test]
    fn test_feedback_request_wire_shape() {
        let request = FeedbackRequest {
            feedback_text: "more comedies".to_string(),
            original_preferences: Preferences::natural_language("funny", Vec::<String>::new()),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["feedbackText"], "more comedies");
        assert_eq!(value["originalPreferences"]["natural_language_query"], "funny");
    }
}
