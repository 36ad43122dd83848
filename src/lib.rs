//! Plain-text Order-of-Battle Management
//!
//! Units are markdown documents stored in a directory. The unit hierarchy is
//! kept in memory as a [`Forest`] with denormalized ancestor and descendant
//! closures that are maintained incrementally on every mutation.

pub mod domain;
pub use domain::{Config, Echelon, Forest, ReparentError, ReparentOutcome, Uic, Unit};

/// Filesystem storage and directory management for units.
pub mod storage;
pub use storage::Registry;
