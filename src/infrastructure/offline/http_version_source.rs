use crate::application::ports::EntityVersionSource;
use crate::domain::value_objects::offline::EntityId;
use crate::shared::config::{ENTITY_ID_PLACEHOLDER, OfflineQueueConfig};
use crate::shared::error::AppError;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct VersionBody {
    version: u64,
}

/// `GET {base}{version_path}` でエンティティの最新バージョンを取得する。
#[derive(Clone)]
pub struct HttpEntityVersionSource {
    client: reqwest::Client,
    base_url: String,
    version_path: String,
}

impl HttpEntityVersionSource {
    pub fn new(
        base_url: impl Into<String>,
        version_path: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let version_path: String = version_path.into();
        if !version_path.contains(ENTITY_ID_PLACEHOLDER) {
            return Err(AppError::ConfigurationError(format!(
                "version path must contain {ENTITY_ID_PLACEHOLDER}"
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::ConfigurationError(format!("HTTP client: {e}")))?;
        let base_url: String = base_url.into();

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            version_path,
        })
    }

    pub fn from_config(config: &OfflineQueueConfig) -> Result<Self, AppError> {
        Self::new(
            config.remote_base_url.clone(),
            config.version_path.clone(),
            config.dispatch_timeout(),
        )
    }

    fn url_for(&self, entity_id: &EntityId) -> String {
        let path = self
            .version_path
            .replace(ENTITY_ID_PLACEHOLDER, entity_id.as_str());
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl EntityVersionSource for HttpEntityVersionSource {
    async fn current_version(&self, entity_id: &EntityId) -> Result<u64, AppError> {
        let response = self.client.get(self.url_for(entity_id)).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("entity {entity_id}")));
        }
        if !status.is_success() {
            return Err(AppError::Network(format!(
                "version lookup for {entity_id} returned {status}"
            )));
        }

        let body: VersionBody = response.json().await?;
        Ok(body.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source(server: &MockServer) -> HttpEntityVersionSource {
        HttpEntityVersionSource::new(
            server.uri(),
            "/api/entities/{entity_id}/version",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn entity(id: &str) -> EntityId {
        EntityId::new(id.to_string()).unwrap()
    }

    #[tokio::test]
    async fn reads_version_from_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/entities/task-9/version"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"version": 5})))
            .mount(&server)
            .await;

        assert_eq!(source(&server).current_version(&entity("task-9")).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = source(&server)
            .current_version(&entity("task-9"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Network(_)));
    }

    #[tokio::test]
    async fn undecodable_body_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rev": "x"})))
            .mount(&server)
            .await;

        assert!(
            source(&server)
                .current_version(&entity("task-9"))
                .await
                .is_err()
        );
    }

    #[test]
    fn rejects_path_without_placeholder() {
        let result = HttpEntityVersionSource::new(
            "http://localhost",
            "/api/version",
            Duration::from_secs(1),
        );
        assert!(matches!(result, Err(AppError::ConfigurationError(_))));
    }
}
