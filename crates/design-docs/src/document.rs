use crate::error::{DdocError, DdocResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A document as the database client stores it.
///
/// System fields (`_id`, `_rev`, `_deleted`) are kept apart from the user
/// fields. Every other field travels untouched in `fields`, so documents
/// round-trip through the client without losing data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "_id")]
    id: String,
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

impl Document {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            rev: None,
            deleted: false,
            fields,
        }
    }

    /// Read a document from a JSON object carrying at least `_id`.
    pub fn from_value(value: Value) -> DdocResult<Self> {
        serde_json::from_value(value)
            .map_err(|err| DdocError::Validation(format!("not a document: {err}")))
    }

    /// The JSON body clients see, system fields included.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("_id".to_string(), Value::String(self.id.clone()));
        if let Some(rev) = &self.rev {
            map.insert("_rev".to_string(), Value::String(rev.clone()));
        }
        if self.deleted {
            map.insert("_deleted".to_string(), Value::Bool(true));
        }
        for (k, v) in &self.fields {
            map.insert(k.clone(), v.clone());
        }
        Value::Object(map)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn rev(&self) -> Option<&str> {
        self.rev.as_deref()
    }

    pub fn set_rev(&mut self, rev: Option<String>) {
        self.rev = rev;
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Flag the document as deleted. Writing it afterwards leaves a tombstone.
    pub fn mark_deleted(&mut self) {
        self.deleted = true;
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Set a user field. Names starting with `_` are reserved.
    pub fn set(&mut self, field: impl Into<String>, value: Value) -> DdocResult<()> {
        let field = field.into();
        if field.starts_with('_') {
            return Err(DdocError::Validation(format!(
                "cannot set system field: {field}"
            )));
        }
        self.fields.insert(field, value);
        Ok(())
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }
}
