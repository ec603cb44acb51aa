//! HTTP client for a `run_sql` style query endpoint.

mod client;

pub use client::{SqlApiClient, parse_result};
