mod candidate;
mod preferences;
mod reaction;

pub use candidate::{
    candidates_from_wire, AttributeClass, Attributes, Candidate, CandidateId, Metadata, Runtime,
    WireCandidate,
};
pub use preferences::{FeedbackRequest, LegacyPreferences, NaturalLanguageQuery, Preferences};
pub use reaction::Reaction;
