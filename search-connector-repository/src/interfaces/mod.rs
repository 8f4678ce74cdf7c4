//! Backend capability interfaces.
//!
//! The connector never talks to the search engine directly. Each concern is a
//! separate capability trait so components depend only on what they use and
//! tests can substitute mock implementations.

mod connection_factory;
mod index_backend;
mod scroll_backend;
mod write_backend;

pub use connection_factory::ConnectionFactory;
pub use index_backend::IndexBackend;
pub use scroll_backend::ScrollBackend;
pub use write_backend::WriteBackend;
