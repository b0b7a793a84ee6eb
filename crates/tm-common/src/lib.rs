//! Time Machine common types, IDs, and errors.
//!
//! This crate provides foundational types shared across tm-core modules:
//! - The scalar value model pushed into server variables
//! - Run identifiers
//! - The unified error taxonomy with stable codes

pub mod error;
pub mod id;
pub mod value;

pub use error::{Error, Result};
pub use id::RunId;
pub use value::{Value, ValueKind};
