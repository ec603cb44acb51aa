//! Request flow: authorize, build the query, run it, rank the result.

use thiserror::Error;
use tracing::{info, warn};

use crate::aggregator::types::RankedGroups;
use crate::aggregator::{AggregateOptions, aggregate_with};
use crate::auth::TokenTable;
use crate::error::AggregateError;
use crate::query::{ModelRequest, QuerySource, build_sql};
use crate::services::query_service::QueryService;

/// Caller identity presented with a request.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub token: String,
}

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("invalid-token")]
    InvalidToken,
    #[error("{0}")]
    BadRequest(String),
    #[error("query failed: {0:#}")]
    Query(anyhow::Error),
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

impl HandlerError {
    /// Short machine-readable code for response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            HandlerError::InvalidToken => "invalid-token",
            HandlerError::BadRequest(_) => "bad-request",
            HandlerError::Query(_) => "query-failed",
            HandlerError::Aggregate(_) => "malformed-result",
        }
    }
}

/// Serves ranking requests against one query service.
///
/// The token table and query source are explicit configuration owned by the
/// handler; nothing is read from process-wide state.
pub struct Handler<Q> {
    service: Q,
    tokens: TokenTable,
    source: QuerySource,
    options: AggregateOptions,
}

impl<Q: QueryService> Handler<Q> {
    pub fn new(service: Q, tokens: TokenTable) -> Self {
        Self {
            service,
            tokens,
            source: QuerySource::default(),
            options: AggregateOptions::default(),
        }
    }

    pub fn with_source(mut self, source: QuerySource) -> Self {
        self.source = source;
        self
    }

    pub fn with_options(mut self, options: AggregateOptions) -> Self {
        self.options = options;
        self
    }

    /// Handles one request. Nothing is queried unless the credentials match
    /// the token table and the request names a score field and group fields.
    #[tracing::instrument(skip(self, credentials), fields(username = %credentials.username, year = request.year))]
    pub async fn handle(
        &self,
        credentials: &Credentials,
        request: &ModelRequest,
    ) -> Result<RankedGroups, HandlerError> {
        if !self.tokens.is_valid(&credentials.username, &credentials.token) {
            warn!("Rejected request with invalid token");
            return Err(HandlerError::InvalidToken);
        }

        request
            .validate()
            .map_err(|e| HandlerError::BadRequest(e.to_string()))?;

        let sql = build_sql(request, &self.source);
        let table = self
            .service
            .run_sql(&sql)
            .await
            .map_err(HandlerError::Query)?;

        let groups = aggregate_with(
            &table,
            &request.score_field,
            &request.group_fields,
            &self.options,
        )?;

        info!(
            groups = groups.len(),
            coercion_warnings = groups.warnings().len(),
            "Request ranked"
        );
        Ok(groups)
    }
}
