//! Query shape normalization and canonical cache keys.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Result limit applied when a shape does not specify one.
pub const DEFAULT_LIMIT: u32 = 10;
/// Language tag applied when a shape does not specify one.
pub const DEFAULT_LANGUAGE: &str = "en";

/// A structured query request as the surrounding handlers see it.
///
/// All fields except the free-text term are optional; missing fields default
/// during normalization rather than failing. Input validation is the
/// caller's responsibility — the shape is treated as best-effort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryShape {
    pub term: String,
    pub language: Option<String>,
    pub category: Option<String>,
    pub limit: Option<u32>,
    pub filters: Option<HashMap<String, String>>,
}

impl QueryShape {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            language: None,
            category: None,
            limit: None,
            filters: None,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_filters(mut self, filters: HashMap<String, String>) -> Self {
        self.filters = Some(filters);
        self
    }

    /// Canonical cache key for this shape.
    pub fn cache_key(&self) -> QueryKey {
        QueryKey::from_shape(self)
    }
}

/// Canonical string key derived from a [`QueryShape`].
///
/// Two semantically identical shapes always produce the same key. The key
/// embeds the normalized term verbatim, which is what makes substring-based
/// invalidation work against raw key text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryKey(String);

impl QueryKey {
    fn from_shape(shape: &QueryShape) -> Self {
        let mut parts: BTreeMap<&str, String> = BTreeMap::new();
        parts.insert("q", shape.term.trim().to_lowercase());
        parts.insert(
            "lang",
            shape
                .language
                .as_deref()
                .unwrap_or(DEFAULT_LANGUAGE)
                .trim()
                .to_lowercase(),
        );
        parts.insert(
            "cat",
            shape.category.as_deref().unwrap_or("").trim().to_lowercase(),
        );
        parts.insert("limit", shape.limit.unwrap_or(DEFAULT_LIMIT).to_string());

        // BTreeMap iteration order makes the serialization independent of
        // filter insertion order.
        let filters: BTreeMap<&str, &str> = shape
            .filters
            .iter()
            .flatten()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        parts.insert(
            "filters",
            serde_json::to_string(&filters).unwrap_or_default(),
        );

        Self(serde_json::to_string(&parts).unwrap_or_default())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
