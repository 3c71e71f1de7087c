//! Authentication and authorization for Horta
//!
//! Provides:
//! - Password hashing with Argon2
//! - JWT token generation and validation
//! - Group allow-lists and the per-route access table

pub mod jwt;
pub mod password;
pub mod permissions;

pub use jwt::{extract_token_from_header, Claims, JwtValidator};
pub use password::{hash_password, verify_password};
pub use permissions::{required_access, Access, AccessPolicy, GroupAllowList};
