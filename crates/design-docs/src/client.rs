use crate::document::Document;
use crate::error::DdocResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The primitives a document database client has to offer.
///
/// `get` fails with `DdocError::NotFound` for absent or deleted keys, `put`
/// fails with `DdocError::Conflict` when the revision does not match, and
/// `all_docs` is a lexicographic range query over document keys.
#[async_trait]
pub trait DocumentClient: Send + Sync {
    async fn get(&self, id: &str) -> DdocResult<Document>;

    async fn put(&self, doc: Document) -> DdocResult<WriteResult>;

    async fn all_docs(&self, options: AllDocsOptions) -> DdocResult<AllDocsResponse>;
}

/// Acknowledgement of a successful write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteResult {
    pub ok: bool,
    pub id: String,
    pub rev: String,
}

/// Range query parameters for `all_docs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllDocsOptions {
    pub start_key: Option<String>,
    pub end_key: Option<String>,
    pub inclusive_end: bool,
    pub include_docs: bool,
    pub descending: bool,
    pub limit: Option<usize>,
}

impl Default for AllDocsOptions {
    fn default() -> Self {
        Self {
            start_key: None,
            end_key: None,
            inclusive_end: true,
            include_docs: false,
            descending: false,
            limit: None,
        }
    }
}

impl AllDocsOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_key(mut self, key: impl Into<String>) -> Self {
        self.start_key = Some(key.into());
        self
    }

    pub fn end_key(mut self, key: impl Into<String>) -> Self {
        self.end_key = Some(key.into());
        self
    }

    pub fn inclusive_end(mut self, inclusive: bool) -> Self {
        self.inclusive_end = inclusive;
        self
    }

    pub fn include_docs(mut self, include: bool) -> Self {
        self.include_docs = include;
        self
    }

    pub fn descending(mut self, descending: bool) -> Self {
        self.descending = descending;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllDocsResponse {
    pub total_rows: usize,
    pub offset: usize,
    pub rows: Vec<AllDocsRow>,
}

/// One row of an `all_docs` result. `doc` is only filled in when the query
/// asked for `include_docs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllDocsRow {
    pub id: String,
    pub key: String,
    pub value: RowValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<Document>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowValue {
    pub rev: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_are_inclusive_and_bodiless() {
        let opts = AllDocsOptions::new();
        assert!(opts.inclusive_end);
        assert!(!opts.include_docs);
        assert!(!opts.descending);
        assert_eq!(opts.limit, None);
    }

    #[test]
    fn builder_sets_range() {
        let opts = AllDocsOptions::new()
            .start_key("a")
            .end_key("b")
            .inclusive_end(false)
            .include_docs(true)
            .limit(10);
        assert_eq!(opts.start_key.as_deref(), Some("a"));
        assert_eq!(opts.end_key.as_deref(), Some("b"));
        assert!(!opts.inclusive_end);
        assert!(opts.include_docs);
        assert_eq!(opts.limit, Some(10));
    }
}
