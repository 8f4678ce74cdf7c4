//! OpenSearch implementation of the backend capabilities.
//!
//! This module provides a concrete implementation of `IndexBackend`,
//! `WriteBackend` and `ScrollBackend` using OpenSearch, plus the connection
//! factory that builds it.

mod backend;
mod connection;
pub mod wire;

pub use backend::OpenSearchBackend;
pub use connection::OpenSearchConnectionFactory;
