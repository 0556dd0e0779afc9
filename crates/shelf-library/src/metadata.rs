//! Linked catalog metadata
//!
//! Fetching from catalog sites happens elsewhere; the library only stores
//! what was linked and treats its presence as user data worth keeping.

use serde::{Deserialize, Serialize};

/// Catalog a metadata record was linked from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MetadataSource {
    F95zone,
    Dlsite,
    Vndb,
    Fakku,
    Mangagamer,
    Johren,
    /// Entered by hand
    #[default]
    Manual,
}

/// Game metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameMetadata {
    #[serde(default)]
    pub source: MetadataSource,
    pub source_url: Option<String>,
    pub title: Option<String>,
    pub developer: Option<String>,
    pub version: Option<String>,
    pub release_date: Option<String>,
    pub description: Option<String>,
    pub cover_url: Option<String>,
    pub rating: Option<f32>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl GameMetadata {
    /// Create empty metadata
    pub fn new(source: MetadataSource) -> Self {
        Self {
            source,
            ..Self::default()
        }
    }

    /// Merge with another metadata (non-empty fields take precedence)
    pub fn merge(&mut self, other: &GameMetadata) {
        if self.source_url.is_none() {
            self.source_url = other.source_url.clone();
        }
        if self.title.is_none() {
            self.title = other.title.clone();
        }
        if self.developer.is_none() {
            self.developer = other.developer.clone();
        }
        if self.version.is_none() {
            self.version = other.version.clone();
        }
        if self.release_date.is_none() {
            self.release_date = other.release_date.clone();
        }
        if self.description.is_none() {
            self.description = other.description.clone();
        }
        if self.cover_url.is_none() {
            self.cover_url = other.cover_url.clone();
        }
        if self.rating.is_none() {
            self.rating = other.rating;
        }
        for tag in &other.tags {
            if !self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
                self.tags.push(tag.clone());
            }
        }
    }
}
