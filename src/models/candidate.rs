use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fmt::Display,
    str::FromStr,
};
use uuid::Uuid;

const SYNTHETIC_PREFIX: &str = "syn-";

/// Namespace for ids derived from title, year and batch ordinal
const SYNTHETIC_NAMESPACE: Uuid = Uuid::from_u128(0x6c1f_2b0e_8e4d_4a57_9f0c_3d2a_51c7_e0b4);

/// Stable identity of a candidate within a session
///
/// Titles are not unique (remakes, re-releases), so they are never used as
/// keys directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CandidateId {
    /// Identifier issued by the recommender
    Issued(String),
    /// Identifier derived locally when the recommender sent none
    Synthetic(Uuid),
}

impl CandidateId {
    /// Derives an id from the display fields of a candidate
    ///
    /// `ordinal` counts earlier entries of the same batch with the same title
    /// and year, so duplicates stay distinct while identical batches map to
    /// identical ids.
    pub fn synthetic(title: &str, year: Option<i32>, ordinal: usize) -> Self {
        let year = year.map(|y| y.to_string()).unwrap_or_default();
        let name = format!("{}\u{1f}{}\u{1f}{}", title, year, ordinal);
        CandidateId::Synthetic(Uuid::new_v5(&SYNTHETIC_NAMESPACE, name.as_bytes()))
    }
}

impl Display for CandidateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CandidateId::Issued(id) => write!(f, "{}", id),
            CandidateId::Synthetic(id) => write!(f, "{}{}", SYNTHETIC_PREFIX, id),
        }
    }
}

impl FromStr for CandidateId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let synthetic = s
            .strip_prefix(SYNTHETIC_PREFIX)
            .and_then(|rest| Uuid::parse_str(rest).ok());

        Ok(match synthetic {
            Some(uuid) => CandidateId::Synthetic(uuid),
            None => CandidateId::Issued(s.to_string()),
        })
    }
}

impl From<&str> for CandidateId {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(id) => id,
            Err(never) => match never {},
        }
    }
}

impl Serialize for CandidateId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CandidateId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(CandidateId::from(raw.as_str()))
    }
}

/// Named class of descriptive tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeClass {
    Genres,
    Tropes,
    Cast,
    StreamingServices,
}

/// Tag sets per attribute class
///
/// Tags keep their first-seen order for display; duplicates are collapsed so
/// each class behaves as a set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<AttributeClass, Vec<String>>);

impl Attributes {
    /// Adds tags to a class, trimming them and skipping blanks and duplicates
    pub fn insert<I, S>(&mut self, class: AttributeClass, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let existing = self.0.entry(class).or_default();
        for tag in tags {
            let tag = tag.as_ref().trim();
            if tag.is_empty() || existing.iter().any(|t| t == tag) {
                continue;
            }
            existing.push(tag.to_string());
        }
        if existing.is_empty() {
            self.0.remove(&class);
        }
    }

    /// Tags of a class; absent classes are empty
    pub fn tags(&self, class: AttributeClass) -> &[String] {
        self.0.get(&class).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Runtime as sent by the recommender: minutes or free text such as "2h 28m"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Runtime {
    Minutes(u64),
    Text(String),
}

impl Runtime {
    fn from_wire(value: serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f.round() as u64))
                .filter(|m| *m > 0)
                .map(Runtime::Minutes),
            serde_json::Value::String(s) => {
                let s = s.trim();
                if s.is_empty() || s == "0" {
                    None
                } else {
                    Some(Runtime::Text(s.to_string()))
                }
            }
            _ => None,
        }
    }
}

/// Display-only fields; never inspected by ranking
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub title: String,
    pub year: Option<i32>,
    pub runtime: Option<Runtime>,
    pub description: Option<String>,
    pub explanation: Option<String>,
}

/// One recommendable movie
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub attributes: Attributes,
    /// Quality signal from the recommender (rating out of 10)
    pub score: Option<f64>,
    pub metadata: Metadata,
}

impl Candidate {
    pub fn new(id: impl Into<CandidateId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: Attributes::default(),
            score: None,
            metadata: Metadata {
                title: title.into(),
                ..Metadata::default()
            },
        }
    }

    pub fn with_tags<I, S>(mut self, class: AttributeClass, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.attributes.insert(class, tags);
        self
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn tags(&self, class: AttributeClass) -> &[String] {
        self.attributes.tags(class)
    }

    pub fn title(&self) -> &str {
        &self.metadata.title
    }
}

// ============================================================================
// Recommender wire types
// ============================================================================

/// A candidate as it appears in a `recommendations` array
///
/// Accepts both the documented field names and the ones the recommender
/// back-end actually emits (`primaryTitle`, `AllPeople`, ...). Every field is
/// optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireCandidate {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default, alias = "primaryTitle")]
    pub title: Option<String>,
    #[serde(default)]
    pub genres: Option<Vec<String>>,
    #[serde(default, alias = "Tropes")]
    pub tropes: Option<Vec<String>>,
    #[serde(default, alias = "AllPeople")]
    pub cast: Option<Vec<String>>,
    #[serde(default, alias = "StreamingServices")]
    pub streaming_services: Option<Vec<String>>,
    #[serde(default, alias = "averageRating")]
    pub rating: Option<f64>,
    #[serde(default, alias = "startYear")]
    pub year: Option<f64>,
    #[serde(default, alias = "duration", alias = "runtimeMinutes")]
    pub runtime: Option<serde_json::Value>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "llmExplanation")]
    pub explanation: Option<String>,
}

impl WireCandidate {
    /// Id sent by the recommender, unless it collides with the synthetic namespace
    fn issued_id(&self) -> Option<String> {
        let id = match self.id.as_ref()? {
            serde_json::Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
            serde_json::Value::Number(n) => n.to_string(),
            _ => return None,
        };

        if id.starts_with(SYNTHETIC_PREFIX) {
            tracing::warn!(id = %id, "Ignoring issued id with the synthetic prefix");
            return None;
        }
        Some(id)
    }

    fn title(&self) -> Option<&str> {
        self.title.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    fn year(&self) -> Option<i32> {
        self.year
            .filter(|y| y.is_finite() && *y >= 1.0 && *y <= i32::MAX as f64)
            .map(|y| y.trunc() as i32)
    }

    fn into_candidate(self, id: CandidateId) -> Candidate {
        let year = self.year();
        let title = self.title().unwrap_or_default().to_string();
        let score = self.rating.filter(|r| r.is_finite() && *r != 0.0);
        let runtime = self.runtime.and_then(Runtime::from_wire);

        let mut attributes = Attributes::default();
        attributes.insert(AttributeClass::Genres, self.genres.unwrap_or_default());
        attributes.insert(AttributeClass::Tropes, self.tropes.unwrap_or_default());
        attributes.insert(AttributeClass::Cast, self.cast.unwrap_or_default());
        attributes.insert(
            AttributeClass::StreamingServices,
            self.streaming_services.unwrap_or_default(),
        );

        let description = self
            .description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| describe(&attributes, year));

        Candidate {
            id,
            attributes,
            score,
            metadata: Metadata {
                title,
                year,
                runtime,
                description: Some(description),
                explanation: self.explanation.filter(|e| !e.trim().is_empty()),
            },
        }
    }
}

/// Fallback blurb built from genres, year and the first few cast members
fn describe(attributes: &Attributes, year: Option<i32>) -> String {
    let genres = attributes.tags(AttributeClass::Genres);
    let cast = attributes.tags(AttributeClass::Cast);

    let mut text = if genres.is_empty() {
        "A movie".to_string()
    } else {
        format!("A {} movie", genres.join(", "))
    };
    if let Some(year) = year {
        text.push_str(&format!(" from {}", year));
    }
    if !cast.is_empty() {
        let lead: Vec<&str> = cast.iter().take(3).map(String::as_str).collect();
        text.push_str(&format!(" featuring {}", lead.join(", ")));
    }
    text.push('.');
    text
}

/// Converts one recommender batch into candidates with unique ids
///
/// Entries with neither an id nor a title are dropped, as are repeated
/// recommender-issued ids (first occurrence wins).
pub fn candidates_from_wire(batch: Vec<WireCandidate>) -> Vec<Candidate> {
    let mut seen_issued: HashSet<String> = HashSet::new();
    let mut ordinals: HashMap<(String, Option<i32>), usize> = HashMap::new();
    let mut candidates = Vec::with_capacity(batch.len());

    for wire in batch {
        let id = match (wire.issued_id(), wire.title()) {
            (Some(issued), _) => {
                if !seen_issued.insert(issued.clone()) {
                    tracing::warn!(id = %issued, "Dropping duplicate candidate id in batch");
                    continue;
                }
                CandidateId::Issued(issued)
            }
            (None, Some(title)) => {
                let key = (title.to_string(), wire.year());
                let ordinal = ordinals.entry(key).or_insert(0);
                let id = CandidateId::synthetic(title, wire.year(), *ordinal);
                *ordinal += 1;
                id
            }
            (None, None) => {
                tracing::warn!("Dropping candidate with neither id nor title");
                continue;
            }
        };

        candidates.push(wire.into_candidate(id));
    }

    candidates
}
