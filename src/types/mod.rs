//! Shared types for Horta

pub mod error;

pub use error::{HortaError, Result};
