use crate::client::{
    AllDocsOptions, AllDocsResponse, AllDocsRow, DocumentClient, RowValue, WriteResult,
};
use crate::document::Document;
use crate::error::{DdocError, DdocResult};
use crate::id::DESIGN_PREFIX;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::ops::Bound;
use tokio::sync::RwLock;
use tracing::debug;

const LOCAL_PREFIX: &str = "_local/";

#[derive(Debug, Clone)]
struct StoredDoc {
    generation: u64,
    doc: Document,
}

impl StoredDoc {
    fn rev(&self) -> &str {
        self.doc.rev().unwrap_or_default()
    }
}

/// An in-memory document database.
///
/// Documents live in a BTreeMap keyed by `_id`, so range queries come out in
/// key order. Every write must carry the current `_rev` of the document it
/// replaces; deletions leave tombstones that `get` and `all_docs` hide.
#[derive(Debug, Default)]
pub struct MemoryClient {
    docs: RwLock<BTreeMap<String, StoredDoc>>,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (non-deleted) documents.
    pub async fn len(&self) -> usize {
        self.docs
            .read()
            .await
            .values()
            .filter(|stored| !stored.doc.is_deleted())
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn validate_id(id: &str) -> DdocResult<()> {
        if id.is_empty() {
            return Err(DdocError::Validation("document id must not be empty".to_string()));
        }
        if id.starts_with('_') && !id.starts_with(DESIGN_PREFIX) && !id.starts_with(LOCAL_PREFIX) {
            return Err(DdocError::Validation(format!(
                "only reserved document ids may start with underscore: {id}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentClient for MemoryClient {
    async fn get(&self, id: &str) -> DdocResult<Document> {
        let docs = self.docs.read().await;
        match docs.get(id) {
            Some(stored) if stored.doc.is_deleted() => Err(DdocError::NotFound {
                id: id.to_owned(),
                reason: "deleted".to_string(),
            }),
            Some(stored) => Ok(stored.doc.clone()),
            None => Err(DdocError::not_found(id)),
        }
    }

    async fn put(&self, mut doc: Document) -> DdocResult<WriteResult> {
        Self::validate_id(doc.id())?;
        let id = doc.id().to_owned();

        let mut docs = self.docs.write().await;
        let previous = docs.get(&id);
        let matches = match (previous, doc.rev()) {
            (Some(stored), rev) if !stored.doc.is_deleted() => rev == Some(stored.rev()),
            // Tombstones may be overwritten without a revision.
            (Some(stored), Some(rev)) => rev == stored.rev(),
            (Some(_), None) => true,
            (None, rev) => rev.is_none(),
        };
        if !matches {
            debug!(%id, given = ?doc.rev(), "rejecting write with stale revision");
            return Err(DdocError::Conflict { id });
        }

        let generation = previous.map_or(0, |stored| stored.generation) + 1;
        let rev = format!("{generation}-{}", uuid::Uuid::now_v7().simple());
        doc.set_rev(Some(rev.clone()));
        debug!(%id, %rev, deleted = doc.is_deleted(), "stored document");
        docs.insert(id.clone(), StoredDoc { generation, doc });

        Ok(WriteResult { ok: true, id, rev })
    }

    async fn all_docs(&self, options: AllDocsOptions) -> DdocResult<AllDocsResponse> {
        let docs = self.docs.read().await;
        let total_rows = docs.values().filter(|stored| !stored.doc.is_deleted()).count();

        // In descending order the start key is the upper end of the range.
        let (low_key, high_key) = if options.descending {
            (options.end_key.as_deref(), options.start_key.as_deref())
        } else {
            (options.start_key.as_deref(), options.end_key.as_deref())
        };
        let end_bound = |key: &str| {
            if options.inclusive_end {
                Bound::Included(key.to_owned())
            } else {
                Bound::Excluded(key.to_owned())
            }
        };
        let (lower, upper) = if options.descending {
            (
                low_key.map_or(Bound::Unbounded, end_bound),
                high_key.map_or(Bound::Unbounded, |key| Bound::Included(key.to_owned())),
            )
        } else {
            (
                low_key.map_or(Bound::Unbounded, |key| Bound::Included(key.to_owned())),
                high_key.map_or(Bound::Unbounded, end_bound),
            )
        };

        if let (Some(low), Some(high)) = (low_key, high_key) {
            if low > high {
                return Ok(AllDocsResponse {
                    total_rows,
                    offset: 0,
                    rows: Vec::new(),
                });
            }
        }

        let live = |stored: &&StoredDoc| !stored.doc.is_deleted();
        let in_range: Vec<&StoredDoc> = if options.descending {
            docs.range((lower, upper)).rev().map(|(_, s)| s).filter(live).collect()
        } else {
            docs.range((lower, upper)).map(|(_, s)| s).filter(live).collect()
        };

        let offset = docs
            .iter()
            .filter(|(_, stored)| !stored.doc.is_deleted())
            .filter(|(key, _)| match (options.descending, high_key, low_key) {
                (false, _, Some(low)) => key.as_str() < low,
                (true, Some(high), _) => key.as_str() > high,
                _ => false,
            })
            .count();

        let rows = in_range
            .into_iter()
            .take(options.limit.unwrap_or(usize::MAX))
            .map(|stored| AllDocsRow {
                id: stored.doc.id().to_owned(),
                key: stored.doc.id().to_owned(),
                value: RowValue {
                    rev: stored.rev().to_owned(),
                },
                doc: options.include_docs.then(|| stored.doc.clone()),
            })
            .collect();

        Ok(AllDocsResponse {
            total_rows,
            offset,
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn doc(id: &str) -> Document {
        Document::new(id, Map::new())
    }

    async fn seeded(ids: &[&str]) -> MemoryClient {
        let client = MemoryClient::new();
        for id in ids {
            client.put(doc(id)).await.unwrap();
        }
        client
    }

    fn keys(response: &AllDocsResponse) -> Vec<&str> {
        response.rows.iter().map(|row| row.key.as_str()).collect()
    }

    #[tokio::test]
    async fn put_and_get() {
        let client = MemoryClient::new();
        let mut body = doc("users/1");
        body.set("name", json!("Alice")).unwrap();

        let written = client.put(body).await.unwrap();
        assert!(written.ok);
        assert_eq!(written.id, "users/1");
        assert!(written.rev.starts_with("1-"));

        let stored = client.get("users/1").await.unwrap();
        assert_eq!(stored.rev(), Some(written.rev.as_str()));
        assert_eq!(stored.get("name"), Some(&json!("Alice")));
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let client = MemoryClient::new();
        let err = client.get("nope").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.status(), 404);
    }

    #[tokio::test]
    async fn update_requires_current_rev() {
        let client = seeded(&["a"]).await;

        let err = client.put(doc("a")).await.unwrap_err();
        assert!(matches!(err, DdocError::Conflict { .. }));

        let current = client.get("a").await.unwrap();
        let written = client.put(current.clone()).await.unwrap();
        assert!(written.rev.starts_with("2-"));

        // The old revision is stale now.
        let err = client.put(current).await.unwrap_err();
        assert_eq!(err.status(), 409);
    }

    #[tokio::test]
    async fn rev_on_new_document_conflicts() {
        let client = MemoryClient::new();
        let mut body = doc("a");
        body.set_rev(Some("1-abc".into()));
        assert!(matches!(client.put(body).await, Err(DdocError::Conflict { .. })));
    }

    #[tokio::test]
    async fn delete_leaves_tombstone() {
        let client = seeded(&["a", "b"]).await;
        let mut current = client.get("a").await.unwrap();
        current.mark_deleted();
        let written = client.put(current).await.unwrap();
        assert!(written.rev.starts_with("2-"));

        match client.get("a").await {
            Err(DdocError::NotFound { reason, .. }) => assert_eq!(reason, "deleted"),
            other => panic!("expected not found, got {other:?}"),
        }
        assert_eq!(client.len().await, 1);

        // Recreating after deletion continues the revision history.
        let written = client.put(doc("a")).await.unwrap();
        assert!(written.rev.starts_with("3-"));
    }

    #[tokio::test]
    async fn reserved_ids_rejected() {
        let client = MemoryClient::new();
        for id in ["", "_users", "_all_docs"] {
            let err = client.put(doc(id)).await.unwrap_err();
            assert_eq!(err.status(), 400, "{id:?} should be rejected");
        }
        assert!(client.put(doc("_design/x")).await.is_ok());
        assert!(client.put(doc("_local/x")).await.is_ok());
    }

    #[tokio::test]
    async fn all_docs_range_in_key_order() {
        let client = seeded(&["c", "a", "e", "b", "d"]).await;

        let all = client.all_docs(AllDocsOptions::new()).await.unwrap();
        assert_eq!(keys(&all), vec!["a", "b", "c", "d", "e"]);
        assert_eq!(all.total_rows, 5);
        assert!(all.rows.iter().all(|row| row.doc.is_none()));

        let inclusive = client
            .all_docs(AllDocsOptions::new().start_key("b").end_key("d"))
            .await
            .unwrap();
        assert_eq!(keys(&inclusive), vec!["b", "c", "d"]);
        assert_eq!(inclusive.offset, 1);

        let exclusive = client
            .all_docs(AllDocsOptions::new().start_key("b").end_key("d").inclusive_end(false))
            .await
            .unwrap();
        assert_eq!(keys(&exclusive), vec!["b", "c"]);
    }

    #[tokio::test]
    async fn all_docs_descending_and_limit() {
        let client = seeded(&["a", "b", "c", "d"]).await;

        let desc = client
            .all_docs(AllDocsOptions::new().descending(true).start_key("c").end_key("a"))
            .await
            .unwrap();
        assert_eq!(keys(&desc), vec!["c", "b", "a"]);
        assert_eq!(desc.offset, 1);

        let limited = client
            .all_docs(AllDocsOptions::new().limit(2))
            .await
            .unwrap();
        assert_eq!(keys(&limited), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn inverted_range_is_empty() {
        let client = seeded(&["a", "b"]).await;
        let result = client
            .all_docs(AllDocsOptions::new().start_key("b").end_key("a"))
            .await
            .unwrap();
        assert!(result.rows.is_empty());
    }

    #[tokio::test]
    async fn all_docs_includes_bodies_and_skips_tombstones() {
        let client = seeded(&["a", "b"]).await;
        let mut b = client.get("b").await.unwrap();
        b.mark_deleted();
        client.put(b).await.unwrap();

        let result = client
            .all_docs(AllDocsOptions::new().include_docs(true))
            .await
            .unwrap();
        assert_eq!(keys(&result), vec!["a"]);
        let body = result.rows[0].doc.as_ref().unwrap();
        assert_eq!(body.id(), "a");
        assert_eq!(body.rev(), Some(result.rows[0].value.rev.as_str()));
    }
}
