use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Method, Request, Response};
use serde_json::Value;

/// Executes a prepared request. Wrappers implement `execute` to decorate
/// requests (credentials, headers) before handing them to an inner client;
/// `post_json` then goes through the decorated path.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;

    /// POSTs an encoded JSON `body` to `url` and parses the JSON response.
    ///
    /// # Errors
    ///
    /// Fails on transport errors, on a non-success status (the body is
    /// included in the message) and on a response that is not JSON.
    async fn post_json(&self, url: &str, body: Vec<u8>) -> Result<Value> {
        let mut req = Request::new(Method::POST, url.parse()?);
        req.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        *req.body_mut() = Some(body.into());

        let resp = self
            .execute(req)
            .await
            .map_err(|e| anyhow!("Failed to send request: {}", e))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow!("Query service returned status {}: {}", status, text));
        }

        resp.json()
            .await
            .map_err(|e| anyhow!("Failed to parse response: {}", e))
    }
}
