//! Reductions over a [`SchemaDiff`](crate::diff::SchemaDiff)
//!
//! Everything here reads a diff and returns a new value; the input is never
//! touched.

pub mod filter;
pub mod health;
pub mod json;

pub use filter::{apply_filters, DiffFilters};
pub use health::{HealthCheck, HealthReport, Severity};
pub use json::DiffSummary;
