//! Domain types for the restaurant inspection catalog: restaurant records,
//! inspections, the upstream feed row, linkage edges and mention matches,
//! plus the [`store::RecordStore`] trait every backend implements.
//!
//! No I/O happens here.

pub mod error;
pub mod feed;
pub mod inspection;
pub mod linkage;
pub mod restaurant;
pub mod store;

pub use error::{Error, Result};
