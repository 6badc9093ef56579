use crate::application::ports::{ActionDispatcher, DispatchResponse};
use crate::domain::value_objects::offline::{ActionTarget, HttpVerb, OfflinePayload};
use crate::shared::config::OfflineQueueConfig;
use crate::shared::error::AppError;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;

/// キューのアクションを HTTP でリモートへ送る。
///
/// 非 2xx も `Ok` で返し、トランスポート障害のみ `Err` にする。
#[derive(Clone)]
pub struct HttpActionDispatcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpActionDispatcher {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::ConfigurationError(format!("HTTP client: {e}")))?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &OfflineQueueConfig) -> Result<Self, AppError> {
        Self::new(config.remote_base_url.clone(), config.dispatch_timeout())
    }

    fn url_for(&self, target: &ActionTarget) -> String {
        format!("{}{}", self.base_url, target.endpoint())
    }
}

fn method_for(verb: HttpVerb) -> Method {
    match verb {
        HttpVerb::Get => Method::GET,
        HttpVerb::Post => Method::POST,
        HttpVerb::Put => Method::PUT,
        HttpVerb::Patch => Method::PATCH,
        HttpVerb::Delete => Method::DELETE,
    }
}

/// GET ではペイロードをクエリ文字列に展開する。文字列以外の値は JSON 表記にする。
fn query_pairs(payload: &OfflinePayload) -> Vec<(String, String)> {
    match payload.as_json() {
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| {
                let rendered = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (key.clone(), rendered)
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[async_trait]
impl ActionDispatcher for HttpActionDispatcher {
    async fn dispatch(
        &self,
        target: &ActionTarget,
        payload: &OfflinePayload,
    ) -> Result<DispatchResponse, AppError> {
        let request = self
            .client
            .request(method_for(target.verb()), self.url_for(target));
        let request = match target.verb() {
            HttpVerb::Get => request.query(&query_pairs(payload)),
            _ => request.json(payload.as_json()),
        };

        let response = request.send().await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        let body = if bytes.is_empty() {
            None
        } else {
            serde_json::from_slice::<Value>(&bytes).ok()
        };

        tracing::debug!(
            target: "offline::queue",
            endpoint = %target,
            status,
            "offline action dispatched"
        );

        Ok(DispatchResponse::new(status, body))
    }
}
