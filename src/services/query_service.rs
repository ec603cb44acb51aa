//! Trait for running SQL against a remote tabular-query service.

use anyhow::Result;

use crate::aggregator::types::Table;

/// Abstraction over a service that executes SQL and returns a header-led
/// table (row 0 = column names).
#[async_trait::async_trait]
pub trait QueryService: Send + Sync {
    async fn run_sql(&self, sql: &str) -> Result<Table>;
}
