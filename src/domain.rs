//! Domain models for order-of-battle management.
//!
//! This module contains the core domain types including units, unit
//! identification codes (UICs), echelons, the hierarchy forest, and
//! configuration.

mod config;
pub use config::Config;

/// Echelon levels and their ordering.
pub mod echelon;
pub use echelon::{Echelon, ParseError as EchelonParseError};

/// The unit forest and its maintained hierarchy closures.
pub mod forest;
pub use forest::{
    ClosureIssue, EchelonViolation, Forest, InsertError, InsertOutcome, RebuildError,
    RebuildOutcome, ReparentError, ReparentOutcome,
};

/// Unit identification code (UIC) types and parsing.
pub mod uic;
pub use uic::{Error as UicError, Uic};

/// Unit domain model.
pub mod unit;
pub use unit::Unit;
