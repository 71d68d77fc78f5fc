//! # vesper-common
//!
//! Common types and constants for VesperDB.
//!
//! This crate provides the foundational types shared across all VesperDB
//! components:
//!
//! - **Types**: Core identifiers (`PageId`, `Lsn`) with sentinel values
//! - **Constants**: System-wide constants and limits
//!
//! ## Example
//!
//! ```rust
//! use vesper_common::types::{Lsn, PageId};
//!
//! let page_id = PageId::new(42);
//! assert!(page_id.is_valid());
//! assert!(!Lsn::INVALID.is_valid());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constants;
pub mod types;

// Re-export commonly used items at the crate root
pub use constants::*;
pub use types::{Lsn, PageId};
