//! Build provenance resolution.
//!
//! [`ProvenanceResolver`] composes the change graph and the build ledger of a
//! [`harvest_storage::Storage`] to answer which changes a build introduced
//! relative to the previous good build. It never writes.

pub mod error;
pub mod resolver;

pub use error::{QueryError, Result};
pub use resolver::{BuildReport, ProvenanceResolver};
