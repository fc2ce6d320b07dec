//! Backend access: wire types and the REST client.

pub mod api;
pub mod types;

pub use api::{ApiClient, ApiError, AuthHooks, Backend};

#[cfg(test)]
#[path = "fake_backend_test.rs"]
pub(crate) mod fake_backend;
