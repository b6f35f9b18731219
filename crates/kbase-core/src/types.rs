//! Domain types shared by the retrieval and answering engines.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

pub type PassageId = String;

/// Name of the collection used when the caller does not pick one.
pub const DEFAULT_COLLECTION: &str = "default";

/// A bounded span of document text stored and retrieved as a unit.
///
/// - `id`: unique within its collection (`<source>:<sequence_index>`)
/// - `text`: the chunk payload
/// - `source`: identifier of the originating document (file name or
///   external id), reported back to callers as provenance
/// - `sequence_index`: position within the parent document
/// - `score_metadata`: per-query scoring annotations (e.g. the rerank
///   score); mutations stay on the query-local copy and are never
///   written back to any store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    pub id: PassageId,
    pub text: String,
    pub source: String,
    pub sequence_index: usize,
    #[serde(default)]
    pub score_metadata: HashMap<String, f32>,
}

impl Passage {
    pub fn new(id: impl Into<String>, text: impl Into<String>, source: impl Into<String>, sequence_index: usize) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            source: source.into(),
            sequence_index,
            score_metadata: HashMap::new(),
        }
    }
}

/// One plain-text segment handed over by a document loader, with the
/// provenance the loader extracted alongside it.
#[derive(Debug, Clone)]
pub struct Segment {
    pub text: String,
    pub source: String,
    pub page: usize,
}

/// The unit returned to the caller for one answered question.
/// `sources` is deduplicated and unordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    pub answer: String,
    pub sources: BTreeSet<String>,
}

/// Per-source passage count inside one collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub source: String,
    pub passages: usize,
}
