//! Graph document model.

mod document;

pub use document::{ConnectionDef, Endpoint, ExportDef, GraphDocument, Metadata, ProcessDef};
