//! Request extractors for authentication, authorization and validated bodies.
//!
//! - [`auth::AuthUser`] -- the caller, from a JWT Bearer token.
//! - [`rbac::RequireAdmin`] -- the caller, required to be an admin.
//! - [`validated::ValidatedJson`] -- a JSON body that passed `validator` rules.

pub mod auth;
pub mod rbac;
pub mod validated;
