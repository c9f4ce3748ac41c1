use crate::error::{DdocError, DdocResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Key prefix shared by every design document.
pub const DESIGN_PREFIX: &str = "_design/";

/// Lower bound of the key range holding design documents.
pub const DESIGN_RANGE_START: &str = "_design";

/// Upper bound of the key range holding design documents. `\u{ffff}` sorts
/// after every character that can follow `_design` in a key.
pub const DESIGN_RANGE_END: &str = "_design\u{ffff}";

/// The `_id` of a design document: `_design/` followed by a non-empty name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DesignDocId {
    name: String,
}

impl DesignDocId {
    /// Build the id for a design name. The name itself must not be empty.
    pub fn new(name: impl Into<String>) -> DdocResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(DdocError::Validation(
                "design document name must not be empty".to_string(),
            ));
        }
        Ok(Self { name })
    }

    /// Parse a full document id such as `_design/users`.
    pub fn parse(id: &str) -> DdocResult<Self> {
        match id.strip_prefix(DESIGN_PREFIX) {
            Some(name) => Self::new(name),
            None => Err(DdocError::Validation(format!(
                "not a design document id: {id}"
            ))),
        }
    }

    pub fn is_design_id(id: &str) -> bool {
        id.starts_with(DESIGN_PREFIX)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn as_doc_id(&self) -> String {
        format!("{DESIGN_PREFIX}{}", self.name)
    }
}

impl fmt::Display for DesignDocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{DESIGN_PREFIX}{}", self.name)
    }
}

impl TryFrom<String> for DesignDocId {
    type Error = DdocError;

    fn try_from(id: String) -> DdocResult<Self> {
        Self::parse(&id)
    }
}

impl From<DesignDocId> for String {
    fn from(id: DesignDocId) -> Self {
        id.as_doc_id()
    }
}
