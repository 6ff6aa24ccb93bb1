// ============================
// crates/backend-lib/src/handlers/mod.rs
// ============================
//! HTTP handlers. They extract, call the auth service and map errors;
//! no decisions are made here.
pub mod auth;
pub mod clients;
pub mod extract;

pub use extract::{client_address, BearerToken, ClientMeta, ProxyTrust, TenantAuth};
