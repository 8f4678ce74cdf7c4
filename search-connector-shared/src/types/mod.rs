//! This module defines the core data structures used across the search connector.
//! It re-exports the document and schema types.

pub mod document;
pub mod schema;

pub use document::{document_from_source, Document, DocumentError};
pub use schema::SchemaNode;
