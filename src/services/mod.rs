//! Service layer
//!
//! Cross-entity rules that sit between the HTTP handlers and the `db`
//! modules. Domain events are applied synchronously inside the transaction
//! that produced them.

pub mod propagation;

pub use propagation::{apply, DomainEvent};
