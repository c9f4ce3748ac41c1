use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A stored view: the source text of a map function and, optionally, of a
/// reduce function. The database engine compiles and runs the source; this
/// crate only stores it. Other keys of a stored entry (`options`, ...) are
/// carried in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewDefinition {
    pub map: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reduce: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ViewDefinition {
    pub fn new(map: impl Into<String>) -> Self {
        Self {
            map: map.into(),
            reduce: None,
            extra: Map::new(),
        }
    }

    pub fn with_reduce(mut self, reduce: impl Into<String>) -> Self {
        self.reduce = Some(reduce.into());
        self
    }
}

/// Reducers the database engine provides natively, referenced by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinReduce {
    Count,
    Sum,
    Stats,
    ApproxCountDistinct,
}

impl BuiltinReduce {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Count => "_count",
            Self::Sum => "_sum",
            Self::Stats => "_stats",
            Self::ApproxCountDistinct => "_approx_count_distinct",
        }
    }
}

impl fmt::Display for BuiltinReduce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One view to add to a design document.
///
/// Functions are given as source text, exactly as they should be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewSpec {
    pub view_name: String,
    pub map_function: String,
    pub reduce_function: Option<String>,
}

impl ViewSpec {
    pub fn new(view_name: impl Into<String>, map_function: impl Into<String>) -> Self {
        Self {
            view_name: view_name.into(),
            map_function: map_function.into(),
            reduce_function: None,
        }
    }

    pub fn with_reduce(mut self, reduce_function: impl Into<String>) -> Self {
        self.reduce_function = Some(reduce_function.into());
        self
    }

    pub fn with_builtin_reduce(self, reduce: BuiltinReduce) -> Self {
        self.with_reduce(reduce.as_str())
    }

    /// The definition stored under `view_name`.
    pub fn to_definition(&self) -> ViewDefinition {
        ViewDefinition {
            map: self.map_function.clone(),
            reduce: self.reduce_function.clone(),
            extra: Map::new(),
        }
    }
}

/// Options for `put_design_doc`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutDesignDocOptions {
    pub views: Vec<ViewSpec>,
}

impl PutDesignDocOptions {
    pub fn new(views: Vec<ViewSpec>) -> Self {
        Self { views }
    }

    pub fn view(mut self, view: ViewSpec) -> Self {
        self.views.push(view);
        self
    }
}
