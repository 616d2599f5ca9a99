//! Record linkage for the restaurant catalog.
//!
//! A reconciliation pass snapshots the population, partitions it into blocks,
//! clusters duplicate records inside each block and collapses every cluster
//! into one canonical record. Mentions are matched against the same store
//! independently of any pass.
//!
//! Everything here is generic over [`ri_core::store::RecordStore`].

pub mod blocking;
pub mod canonical;
pub mod catalog;
pub mod cluster;
pub mod config;
pub mod error;
pub mod mention;
pub mod reconcile;
pub mod similarity;

pub use config::ReconcileConfig;
pub use error::{LinkageError, Result};
pub use mention::{Mention, record_mention};
pub use reconcile::{ReconcileReport, reconcile};

#[cfg(test)]
mod tests;
