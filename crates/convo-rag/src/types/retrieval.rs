//! Retrieval results and the context block handed to the answer model

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Context used when the index returns nothing
pub const NO_MATCH_CONTEXT: &str = "No relevant information found.";

/// Separator between concatenated passages
pub const PASSAGE_SEPARATOR: &str = "\n\n";

/// One candidate passage from the vector index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalMatch {
    /// Passage text (the `text` metadata field)
    pub text: String,
    /// Similarity score, higher is more relevant
    pub score: f32,
    /// Remaining metadata stored with the vector
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// How a context block came to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextStatus {
    /// Built from retrieved passages
    Passages,
    /// The index had no matches
    NoMatch,
    /// Retrieval failed; the text describes the failure
    Unavailable,
}

/// Text-only context block for one query
///
/// Scores and metadata are dropped here; the answer model only sees text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievedContext {
    text: String,
    status: ContextStatus,
}

impl RetrievedContext {
    /// Concatenate the first `limit` matches, which must already be sorted
    /// by descending score. Falls back to the no-match sentinel when empty.
    pub fn from_matches(matches: &[RetrievalMatch], limit: usize) -> Self {
        if matches.is_empty() || limit == 0 {
            return Self::no_match();
        }

        let text = matches
            .iter()
            .take(limit)
            .map(|m| m.text.as_str())
            .collect::<Vec<_>>()
            .join(PASSAGE_SEPARATOR);

        Self {
            text,
            status: ContextStatus::Passages,
        }
    }

    pub fn no_match() -> Self {
        Self {
            text: NO_MATCH_CONTEXT.to_string(),
            status: ContextStatus::NoMatch,
        }
    }

    /// Describe a retrieval failure in place of passages
    pub fn unavailable(reason: impl fmt::Display) -> Self {
        Self {
            text: format!("Error retrieving context: {}", reason),
            status: ContextStatus::Unavailable,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn status(&self) -> ContextStatus {
        self.status
    }

    pub fn is_degraded(&self) -> bool {
        self.status != ContextStatus::Passages
    }
}

impl fmt::Display for RetrievedContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
