//! Transport client for the backend REST API.
//!
//! - `types`: request/response records, matching the JSON contract.
//! - `endpoints`: the fixed endpoint table (method + path).
//! - `client`: the [`Api`] trait and its HTTP implementation.

pub mod client;
pub mod endpoints;
#[cfg(test)]
pub(crate) mod testing;
pub mod types;

pub use client::{Api, HttpApiClient};
pub use endpoints::Endpoint;
