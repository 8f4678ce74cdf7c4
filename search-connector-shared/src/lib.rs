//! # Search Connector Shared
//!
//! This crate defines the data structures shared across the search connector:
//! documents as they travel to and from the search engine, the schema tree
//! derived from an index definition, and the sanitizer that prunes documents
//! against that schema before they are written.

pub mod sanitizer;
pub mod types;

pub use sanitizer::{check_against, sanitize};
pub use types::document::{document_from_source, Document, DocumentError};
pub use types::schema::SchemaNode;
