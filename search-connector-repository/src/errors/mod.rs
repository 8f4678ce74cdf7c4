//! Error types for the search connector repository.
//!
//! This module provides a unified error type for all connector operations.

mod connector_error;

pub use connector_error::ConnectorError;
