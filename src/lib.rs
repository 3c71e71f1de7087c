//! Horta - community garden management backend
//!
//! A JSON-over-HTTP service for the people and plots of a community garden:
//! users and groups, gardens, products, plots, events and who attends them,
//! plantings and the harvests that close them out.
//!
//! ## Services
//!
//! - **Auth**: argon2 password hashing, HS256 bearer tokens, group allow-lists
//! - **Store**: SQLite via rusqlite, one transaction per mutating request
//! - **Propagation**: a recorded harvest marks the matching plantings as harvested
//! - **Audit**: fire-and-forget MongoDB trail of every mutation and login

pub mod audit;
pub mod auth;
pub mod config;
pub mod db;
pub mod routes;
pub mod server;
pub mod services;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{HortaError, Result};
