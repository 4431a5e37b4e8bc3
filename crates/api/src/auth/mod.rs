//! Authentication primitives.
//!
//! - [`password`] -- Argon2id password hashing and the password policy.
//! - [`jwt`] -- access tokens and opaque refresh tokens.

pub mod jwt;
pub mod password;
