use crate::document::Document;
use crate::error::{DdocError, DdocResult};
use crate::id::DesignDocId;
use crate::view::{ViewDefinition, ViewSpec};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// View name -> stored view entry, exactly as the document holds it.
pub type Views = Map<String, Value>;

const VIEWS_FIELD: &str = "views";

/// A design document: a specially keyed document holding view definitions.
///
/// The body is kept as raw JSON. `views` entries are only touched by name:
/// entries written through [`DesignDocument::merge_views`] are built from
/// [`ViewDefinition`], every other entry (Mango indexes, views carrying
/// `options`, ...) and every other field is written back byte for byte.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignDocument {
    #[serde(rename = "_id")]
    id: DesignDocId,
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    rev: Option<String>,
    #[serde(rename = "_deleted", default, skip_serializing_if = "is_false")]
    deleted: bool,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// `null`, `false`, `0` and `""` count as "no views yet".
fn is_unset(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl DesignDocument {
    /// A fresh design document with an empty `views` mapping.
    pub fn new(id: DesignDocId) -> Self {
        let mut fields = Map::new();
        fields.insert(VIEWS_FIELD.to_string(), Value::Object(Views::new()));
        Self {
            id,
            rev: None,
            deleted: false,
            fields,
        }
    }

    pub fn id(&self) -> &DesignDocId {
        &self.id
    }

    pub fn name(&self) -> &str {
        self.id.name()
    }

    pub fn rev(&self) -> Option<&str> {
        self.rev.as_deref()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn mark_deleted(&mut self) {
        self.deleted = true;
    }

    /// The raw `views` field, whatever it holds.
    pub fn views_value(&self) -> Option<&Value> {
        self.fields.get(VIEWS_FIELD)
    }

    /// The `views` mapping, if the field holds an object.
    pub fn views(&self) -> Option<&Views> {
        self.views_value()?.as_object()
    }

    /// The raw entry stored under `view_name`.
    pub fn view(&self, view_name: &str) -> Option<&Value> {
        self.views()?.get(view_name)
    }

    /// Read `view_name` as a map/reduce definition.
    pub fn view_definition(&self, view_name: &str) -> DdocResult<Option<ViewDefinition>> {
        self.view(view_name)
            .map(|entry| serde_json::from_value::<ViewDefinition>(entry.clone()))
            .transpose()
            .map_err(|source| DdocError::Malformed {
                id: self.id.to_string(),
                source,
            })
    }

    pub fn view_names(&self) -> Vec<&str> {
        self.views()
            .into_iter()
            .flat_map(|views| views.keys().map(String::as_str))
            .collect()
    }

    /// Merge views in: same-named entries are overwritten, all others kept.
    ///
    /// A missing or empty `views` field becomes an empty mapping first; a
    /// `views` field holding anything else is refused.
    pub fn merge_views(&mut self, specs: &[ViewSpec]) -> DdocResult<()> {
        let id = self.id.to_string();
        let entries = specs
            .iter()
            .map(|spec| {
                serde_json::to_value(spec.to_definition())
                    .map(|entry| (spec.view_name.clone(), entry))
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| DdocError::Malformed {
                id: id.clone(),
                source,
            })?;

        let views = self
            .fields
            .entry(VIEWS_FIELD)
            .or_insert(Value::Null);
        if is_unset(views) {
            *views = Value::Object(Views::new());
        }
        let views = match views {
            Value::Object(views) => views,
            other => {
                return Err(DdocError::InvalidViews {
                    id,
                    found: json_type(other),
                })
            }
        };
        views.extend(entries);
        Ok(())
    }

    /// Remove one view. When the entry (or an object-valued `views` field) is
    /// missing, the document is left exactly as it was.
    pub fn remove_view(&mut self, view_name: &str) -> Option<Value> {
        self.fields
            .get_mut(VIEWS_FIELD)?
            .as_object_mut()?
            .remove(view_name)
    }

    pub fn clear_views(&mut self) {
        self.fields
            .insert(VIEWS_FIELD.to_string(), Value::Object(Views::new()));
    }

    /// Every field other than `_id`, `_rev` and `_deleted`, `views` included.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.fields
    }

    pub fn to_value(&self) -> DdocResult<Value> {
        serde_json::to_value(self).map_err(|source| DdocError::Malformed {
            id: self.id.to_string(),
            source,
        })
    }

    pub fn into_document(self) -> DdocResult<Document> {
        let id = self.id.to_string();
        let value = self.to_value()?;
        serde_json::from_value(value).map_err(|source| DdocError::Malformed { id, source })
    }
}

impl TryFrom<Document> for DesignDocument {
    type Error = DdocError;

    fn try_from(doc: Document) -> DdocResult<Self> {
        let id = doc.id().to_owned();
        if !DesignDocId::is_design_id(&id) {
            return Err(DdocError::Validation(format!(
                "not a design document id: {id}"
            )));
        }
        serde_json::from_value(doc.to_value()).map_err(|source| DdocError::Malformed { id, source })
    }
}
