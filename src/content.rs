//! Daily content payloads and the provider seam.
//!
//! Content generation (LLM or otherwise) is an external collaborator; the
//! pipeline only sees a [`ContentPayload`]. Providers degrade to a safe
//! default payload internally; a failed provider never fails a render.

use std::path::Path;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One render's worth of text content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentPayload {
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    /// Narration source text; may be empty.
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
}

impl ContentPayload {
    /// Narration text: `body`, or the title/subtitle concatenation when the
    /// body is absent.
    pub fn narration(&self) -> String {
        if self.body.trim().is_empty() {
            format!("{}. {}", self.title, self.subtitle)
        } else {
            self.body.clone()
        }
    }

    /// Safe default payload used when a provider cannot produce content.
    pub fn fallback(date: NaiveDate) -> Self {
        Self {
            title: format!("Daily Reel — {}", date.format("%Y-%m-%d")),
            subtitle: "Something worth watching".to_string(),
            body: String::new(),
            hashtags: vec!["#daily".to_string()],
        }
    }
}

/// Source of one payload per calendar day.
pub trait ContentProvider {
    /// Return the payload for `date`. Implementations recover internally;
    /// this never fails from the pipeline's point of view.
    fn daily_content(&self, date: NaiveDate) -> ContentPayload;
}

/// Catalog-backed provider with deterministic day selection.
///
/// The same UTC date always picks the same entry, so re-runs on one day
/// produce the same title.
#[derive(Clone, Debug, Default)]
pub struct CatalogProvider {
    entries: Vec<ContentPayload>,
}

impl CatalogProvider {
    pub fn new(entries: Vec<ContentPayload>) -> Self {
        Self { entries }
    }

    /// Load a catalog from a JSON array of payloads. A missing or malformed
    /// file degrades to an empty catalog (and therefore fallback payloads).
    pub fn from_json_file(path: &Path) -> Self {
        let entries = match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<Vec<ContentPayload>>(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to parse catalog, using fallback content");
                    Vec::new()
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read catalog, using fallback content");
                Vec::new()
            }
        };
        Self { entries }
    }

    fn index_for(&self, date: NaiveDate) -> Option<usize> {
        if self.entries.is_empty() {
            return None;
        }
        // Same scheme as `%Y%j`: year * 1000 + day-of-year.
        let key = date.year() as i64 * 1000 + i64::from(date.ordinal());
        Some((key.unsigned_abs() as usize) % self.entries.len())
    }
}

impl ContentProvider for CatalogProvider {
    fn daily_content(&self, date: NaiveDate) -> ContentPayload {
        match self.index_for(date) {
            Some(idx) => self.entries[idx].clone(),
            None => ContentPayload::fallback(date),
        }
    }
}
