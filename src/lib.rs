pub mod aggregator;
pub mod auth;
pub mod config;
pub mod error;
pub mod fetch;
pub mod handler;
pub mod infra;
pub mod output;
pub mod query;
pub mod services;
pub mod table;

pub use aggregator::{AggregateOptions, ZeroTotalPolicy, aggregate, aggregate_with};
pub use error::AggregateError;
