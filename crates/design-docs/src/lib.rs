pub mod client;
pub mod design;
pub mod document;
pub mod error;
pub mod id;
pub mod manager;
pub mod memory;
pub mod view;

pub use client::{
    AllDocsOptions, AllDocsResponse, AllDocsRow, DocumentClient, RowValue, WriteResult,
};
pub use design::{DesignDocument, Views};
pub use document::Document;
pub use error::{DdocError, DdocResult};
pub use id::{DesignDocId, DESIGN_PREFIX, DESIGN_RANGE_END, DESIGN_RANGE_START};
pub use manager::DesignDocExt;
pub use memory::MemoryClient;
pub use view::{BuiltinReduce, PutDesignDocOptions, ViewDefinition, ViewSpec};
