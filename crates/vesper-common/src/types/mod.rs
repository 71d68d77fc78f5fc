//! Core types for VesperDB.

mod ids;

pub use ids::{Lsn, PageId};
