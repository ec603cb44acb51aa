use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::aggregator::types::Table;
use crate::config::ServiceConfig;
use crate::fetch::auth::StaticHeaders;
use crate::fetch::{BasicClient, HttpClient};
use crate::services::query_service::QueryService;

#[derive(Serialize)]
struct RunSqlArgs<'a> {
    sql: &'a str,
}

#[derive(Serialize)]
struct RunSqlRequest<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    args: RunSqlArgs<'a>,
}

pub struct SqlApiClient<C = StaticHeaders<BasicClient>> {
    endpoint: String,
    http: C,
}

impl SqlApiClient {
    /// Builds a client that authenticates with the configured admin secret
    /// and role headers.
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let http = StaticHeaders::new(
            BasicClient::with_timeout(config.timeout)?,
            [
                ("x-hasura-admin-secret", config.admin_secret.as_str()),
                ("X-Hasura-Role", config.role.as_str()),
            ],
        )?;
        Ok(Self::with_client(&config.base_url, http))
    }
}

impl<C: HttpClient> SqlApiClient<C> {
    pub fn with_client(base_url: &str, http: C) -> Self {
        Self {
            endpoint: format!("{}/v1/query", base_url.trim_end_matches('/')),
            http,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl<C: HttpClient> QueryService for SqlApiClient<C> {
    #[tracing::instrument(skip(self, sql), fields(endpoint = %self.endpoint))]
    async fn run_sql(&self, sql: &str) -> Result<Table> {
        debug!(sql, "Running query");
        let body = serde_json::to_vec(&RunSqlRequest {
            kind: "run_sql",
            args: RunSqlArgs { sql },
        })?;

        let response = self.http.post_json(&self.endpoint, body).await?;
        let table = parse_result(response)?;

        debug!(rows = table.len(), "Query returned");
        Ok(table)
    }
}

/// Extracts the `result` array of arrays from a `run_sql` response.
pub fn parse_result(mut response: Value) -> Result<Table> {
    if let Some(error) = response.get("error").and_then(Value::as_str) {
        return Err(anyhow!("Query service error: {}", error));
    }

    let result = response
        .get_mut("result")
        .map(Value::take)
        .ok_or_else(|| anyhow!("Query response has no 'result' field"))?;

    serde_json::from_value(result)
        .map_err(|e| anyhow!("Query 'result' is not an array of rows: {}", e))
}
