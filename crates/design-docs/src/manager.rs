use crate::client::{AllDocsOptions, DocumentClient, WriteResult};
use crate::design::{json_type, DesignDocument, Views};
use crate::error::{DdocError, DdocResult};
use crate::id::{DesignDocId, DESIGN_RANGE_END, DESIGN_RANGE_START};
use crate::view::{PutDesignDocOptions, ViewDefinition};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Design-document helpers available on every [`DocumentClient`].
///
/// Each method is one fetch followed by at most one write. Nothing is
/// retried: a stale revision surfaces as `DdocError::Conflict` and every
/// other failure is handed back unchanged.
#[async_trait]
pub trait DesignDocExt: DocumentClient {
    /// Create `_design/<name>` or merge views into it.
    ///
    /// Views with a name already present are overwritten, all other stored
    /// views are kept. A missing document is created; any other lookup
    /// failure is returned as-is.
    async fn put_design_doc(
        &self,
        name: &str,
        options: PutDesignDocOptions,
    ) -> DdocResult<WriteResult> {
        let id = DesignDocId::new(name)?;
        let mut ddoc = match self.get(&id.as_doc_id()).await {
            Ok(doc) => {
                debug!(%id, "merging views into existing design document");
                DesignDocument::try_from(doc)?
            }
            Err(err) if err.is_not_found() => {
                info!(%id, "creating design document");
                DesignDocument::new(id)
            }
            Err(err) => {
                warn!(%id, error = %err, "design document lookup failed");
                return Err(err);
            }
        };
        ddoc.merge_views(&options.views)?;
        self.put(ddoc.into_document()?).await
    }

    /// Every design document, full bodies, in key order.
    async fn get_all_design_docs(&self) -> DdocResult<Vec<DesignDocument>> {
        let response = self.all_docs(design_range()).await?;
        debug!(rows = response.rows.len(), "listed design documents");
        response
            .rows
            .into_iter()
            .map(|row| match row.doc {
                Some(doc) => DesignDocument::try_from(doc),
                None => Err(DdocError::Client(format!(
                    "all_docs row {} came back without a document body",
                    row.id
                ))),
            })
            .collect()
    }

    /// Names (without the `_design/` prefix) of every design document.
    async fn get_design_doc_names(&self) -> DdocResult<Vec<String>> {
        let response = self
            .all_docs(design_range().include_docs(false))
            .await?;
        response
            .rows
            .iter()
            .map(|row| DesignDocId::parse(&row.id).map(|id| id.name().to_owned()))
            .collect()
    }

    async fn get_design_doc(&self, name: &str) -> DdocResult<DesignDocument> {
        fetch(self, name).await
    }

    /// Write a tombstone for `_design/<name>`.
    async fn delete_design_doc(&self, name: &str) -> DdocResult<WriteResult> {
        let mut ddoc = fetch(self, name).await?;
        ddoc.mark_deleted();
        let written = self.put(ddoc.into_document()?).await?;
        info!(id = %written.id, rev = %written.rev, "deleted design document");
        Ok(written)
    }

    async fn delete_all_views(&self, name: &str) -> DdocResult<WriteResult> {
        let mut ddoc = fetch(self, name).await?;
        ddoc.clear_views();
        self.put(ddoc.into_document()?).await
    }

    /// Remove one view. The document is written back even when the view
    /// was not there.
    async fn delete_view(&self, name: &str, view_name: &str) -> DdocResult<WriteResult> {
        let mut ddoc = fetch(self, name).await?;
        if ddoc.remove_view(view_name).is_none() {
            debug!(id = %ddoc.id(), view_name, "view not present, saving unchanged");
        }
        self.put(ddoc.into_document()?).await
    }

    /// The `views` mapping as stored, empty when the document has none.
    async fn get_all_views(&self, name: &str) -> DdocResult<Views> {
        let ddoc = fetch(self, name).await?;
        match ddoc.views_value() {
            None | Some(Value::Null) => Ok(Views::new()),
            Some(Value::Object(views)) => Ok(views.clone()),
            Some(other) => Err(DdocError::InvalidViews {
                id: ddoc.id().to_string(),
                found: json_type(other),
            }),
        }
    }

    /// The raw entry stored under `view_name`, `None` when there is none.
    async fn get_view(&self, name: &str, view_name: &str) -> DdocResult<Option<Value>> {
        let ddoc = fetch(self, name).await?;
        Ok(ddoc.view(view_name).cloned())
    }

    /// Like [`DesignDocExt::get_view`], read as a map/reduce definition.
    /// Entries of another shape (Mango indexes) fail with `Malformed`.
    async fn get_view_definition(
        &self,
        name: &str,
        view_name: &str,
    ) -> DdocResult<Option<ViewDefinition>> {
        fetch(self, name).await?.view_definition(view_name)
    }
}

impl<C: DocumentClient + ?Sized> DesignDocExt for C {}

fn design_range() -> AllDocsOptions {
    AllDocsOptions::new()
        .start_key(DESIGN_RANGE_START)
        .end_key(DESIGN_RANGE_END)
        .inclusive_end(false)
        .include_docs(true)
}

async fn fetch<C: DocumentClient + ?Sized>(client: &C, name: &str) -> DdocResult<DesignDocument> {
    let id = DesignDocId::new(name)?;
    debug!(%id, "fetching design document");
    let doc = client.get(&id.as_doc_id()).await?;
    DesignDocument::try_from(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryClient;
    use crate::view::ViewSpec;
    use serde_json::json;

    fn views(specs: &[(&str, &str)]) -> PutDesignDocOptions {
        PutDesignDocOptions::new(
            specs
                .iter()
                .map(|(name, map)| ViewSpec::new(*name, *map))
                .collect(),
        )
    }

    #[tokio::test]
    async fn put_creates_then_merges() {
        let client = MemoryClient::new();
        let first = client
            .put_design_doc("idx", views(&[("a", "map-a"), ("b", "map-b")]))
            .await
            .unwrap();
        assert!(first.rev.starts_with("1-"));

        let second = client
            .put_design_doc("idx", views(&[("b", "map-b2"), ("c", "map-c")]))
            .await
            .unwrap();
        assert!(second.rev.starts_with("2-"));

        let all = client.get_all_views("idx").await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all["a"], json!({ "map": "map-a" }));
        assert_eq!(all["b"], json!({ "map": "map-b2" }));
        assert_eq!(all["c"], json!({ "map": "map-c" }));
    }

    #[tokio::test]
    async fn empty_name_is_rejected_before_io() {
        let client = MemoryClient::new();
        let err = client.put_design_doc("", views(&[])).await.unwrap_err();
        assert!(matches!(err, DdocError::Validation(_)));
        assert!(client.is_empty().await);
    }

    #[tokio::test]
    async fn get_view_absent_is_none() {
        let client = MemoryClient::new();
        client
            .put_design_doc("idx", views(&[("a", "map-a")]))
            .await
            .unwrap();

        assert_eq!(
            client.get_view("idx", "a").await.unwrap(),
            Some(json!({ "map": "map-a" }))
        );
        assert_eq!(
            client.get_view_definition("idx", "a").await.unwrap(),
            Some(ViewDefinition::new("map-a"))
        );
        assert_eq!(client.get_view("idx", "zzz").await.unwrap(), None);
        assert_eq!(client.get_view_definition("idx", "zzz").await.unwrap(), None);
        assert!(client.get_view("other", "a").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn design_doc_names_in_key_order() {
        let client = MemoryClient::new();
        for name in ["zeta", "alpha", "mid"] {
            client.put_design_doc(name, views(&[])).await.unwrap();
        }
        assert_eq!(
            client.get_design_doc_names().await.unwrap(),
            vec!["alpha", "mid", "zeta"]
        );
    }

    #[tokio::test]
    async fn works_through_trait_object() {
        let client: Box<dyn DocumentClient> = Box::new(MemoryClient::new());
        client
            .put_design_doc("idx", views(&[("a", "map-a")]))
            .await
            .unwrap();
        let ddoc = client.get_design_doc("idx").await.unwrap();
        assert_eq!(ddoc.view_names(), vec!["a"]);
    }
}
