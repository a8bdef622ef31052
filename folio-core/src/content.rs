//! Content index
//!
//! Build-time list of published resources. The route gate queries it by slug to
//! find a post's access requirement; list views page through it.

use crate::access::AccessRequirement;
use crate::error::{ErrorContext, FolioError, FolioResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// A single content resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentEntry {
    pub slug: String,
    pub title: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub need_access: bool,
}

impl ContentEntry {
    pub fn requirement(&self) -> AccessRequirement {
        AccessRequirement::from(self.need_access)
    }
}

/// One page of published entries
#[derive(Debug, Clone, Serialize)]
pub struct ContentPage<'a> {
    pub page: usize,
    pub total_pages: usize,
    pub entries: Vec<&'a ContentEntry>,
}

/// Slug-addressable index of content entries
#[derive(Debug, Clone, Default)]
pub struct ContentIndex {
    entries: Vec<ContentEntry>,
    by_slug: HashMap<String, usize>,
}

impl ContentIndex {
    pub fn from_entries(entries: Vec<ContentEntry>) -> Self {
        let by_slug = entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| (entry.slug.clone(), idx))
            .collect();
        Self { entries, by_slug }
    }

    /// Load the index from a JSON array file
    pub fn from_file<P: AsRef<Path>>(path: P) -> FolioResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| FolioError::Config {
            message: format!("Failed to read content index {}: {}", path.display(), e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("content")
                .with_operation("read_index")
                .with_suggestion("Check content.index_path in the configuration"),
        })?;

        let entries: Vec<ContentEntry> =
            serde_json::from_str(&content).map_err(|e| FolioError::Config {
                message: format!("Failed to parse content index: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("content").with_operation("parse_index"),
            })?;

        debug!("Loaded {} content entries from {}", entries.len(), path.display());
        Ok(Self::from_entries(entries))
    }

    pub fn get(&self, slug: &str) -> Option<&ContentEntry> {
        self.by_slug.get(slug).map(|&idx| &self.entries[idx])
    }

    /// Access requirement of the resource at `slug`, if it exists
    pub fn requirement(&self, slug: &str) -> Option<AccessRequirement> {
        self.get(slug).map(ContentEntry::requirement)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Non-draft entries, newest first
    pub fn published(&self) -> Vec<&ContentEntry> {
        let mut published: Vec<_> = self.entries.iter().filter(|e| !e.draft).collect();
        published.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.slug.cmp(&b.slug)));
        published
    }

    /// 1-based page of published entries. Out-of-range pages come back empty.
    pub fn page(&self, page: usize, per_page: usize) -> ContentPage<'_> {
        let published = self.published();
        let per_page = per_page.max(1);
        let total_pages = published.len().div_ceil(per_page).max(1);
        let page = page.max(1);

        let entries = published
            .into_iter()
            .skip((page - 1).saturating_mul(per_page))
            .take(per_page)
            .collect();

        ContentPage {
            page,
            total_pages,
            entries,
        }
    }
}
