//! pgcompare CLI library
//!
//! File handling around the pgcompare core: loading snapshots, rendering
//! reports and writing stage files. The binary (main.rs) wires these to
//! subcommands.

pub mod error;
pub mod loader;
pub mod report;
pub mod writer;
