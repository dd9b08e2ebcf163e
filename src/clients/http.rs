//! # HTTP Service Clients
//!
//! reqwest-backed implementations of the resource-service traits. All
//! requests carry a bearer token, run under a bounded timeout, and are
//! wrapped in the configured [`RetryPolicy`]. Long-running create operations
//! are polled to a terminal state before the resource is returned, so an ID
//! handed to the orchestrator is always valid.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::clients::error::{PlatformError, PlatformResult};
use crate::clients::retry::RetryPolicy;
use crate::clients::{
    CreatedResource, OntologyDefinition, RelationshipBindingSpec, RemoteBinding, RemoteFile,
    StaticBindingSpec, TimeseriesBindingSpec,
};
use crate::config::DemoforgeConfig;

/// Connection settings for the HTTP clients
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub base_url: String,
    pub bearer_token: String,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    pub poll_timeout: Duration,
    pub retry: RetryPolicy,
}

impl HttpClientConfig {
    /// Build from loaded tool configuration plus the resolved auth token
    pub fn from_config(config: &DemoforgeConfig, bearer_token: String) -> Self {
        Self {
            base_url: config.platform.base_url.clone(),
            bearer_token,
            request_timeout: config.request_timeout(),
            poll_interval: Duration::from_millis(config.platform.poll_interval_ms),
            poll_timeout: Duration::from_millis(config.platform.poll_timeout_ms),
            retry: RetryPolicy::from(&config.backoff),
        }
    }
}

/// Long-running operation document returned by the platform
#[derive(Debug, Deserialize)]
struct OperationDoc {
    status: String,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    resource: Option<CreatedResource>,
}

/// Shared request plumbing for the three service clients
#[derive(Clone)]
struct PlatformHttp {
    client: Client,
    base_url: Url,
    config: Arc<HttpClientConfig>,
}

impl PlatformHttp {
    fn new(config: HttpClientConfig) -> PlatformResult<Self> {
        // Url::join treats a path without a trailing slash as a file and
        // would drop its last segment
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| PlatformError::invalid_request(format!("invalid base URL: {e}")))?;

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::AUTHORIZATION,
            format!("Bearer {}", config.bearer_token)
                .parse()
                .map_err(|e| PlatformError::invalid_request(format!("invalid bearer token: {e}")))?,
        );

        let client = Client::builder()
            .timeout(config.request_timeout)
            .default_headers(headers)
            .user_agent(format!("demoforge/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(PlatformError::from)?;

        Ok(Self {
            client,
            base_url,
            config: Arc::new(config),
        })
    }

    fn url(&self, path: &str) -> PlatformResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| PlatformError::invalid_request(format!("invalid URL path '{path}': {e}")))
    }

    async fn check(&self, response: Response) -> PlatformResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs);
        let body = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::TOO_MANY_REQUESTS => PlatformError::RateLimited { retry_after },
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PlatformError::Unauthorized {
                message: body,
            },
            StatusCode::NOT_FOUND => PlatformError::not_found(body),
            StatusCode::CONFLICT => PlatformError::conflict(body),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                PlatformError::invalid_request(body)
            }
            s if s.is_server_error() => PlatformError::internal(format!("{s}: {body}")),
            s => PlatformError::internal(format!("unexpected status {s}: {body}")),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> PlatformResult<T> {
        let url = self.url(path)?;
        self.config
            .retry
            .call(path, || async {
                let response = self.client.get(url.clone()).send().await?;
                let response = self.check(response).await?;
                response
                    .json::<T>()
                    .await
                    .map_err(|e| PlatformError::internal(format!("malformed response: {e}")))
            })
            .await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> PlatformResult<T> {
        let url = self.url(path)?;
        self.config
            .retry
            .call(path, || async {
                let response = self.client.post(url.clone()).json(body).send().await?;
                let response = self.check(response).await?;
                response
                    .json::<T>()
                    .await
                    .map_err(|e| PlatformError::internal(format!("malformed response: {e}")))
            })
            .await
    }

    /// POST without a meaningful response body
    async fn post_ack<B: Serialize>(&self, path: &str, body: &B) -> PlatformResult<()> {
        let url = self.url(path)?;
        self.config
            .retry
            .call(path, || async {
                let response = self.client.post(url.clone()).json(body).send().await?;
                self.check(response).await.map(|_| ())
            })
            .await
    }

    async fn put_bytes(&self, path: &str, content: &[u8]) -> PlatformResult<()> {
        let url = self.url(path)?;
        self.config
            .retry
            .call(path, || async {
                let response = self
                    .client
                    .put(url.clone())
                    .body(content.to_vec())
                    .send()
                    .await?;
                self.check(response).await.map(|_| ())
            })
            .await
    }

    async fn delete(&self, path: &str) -> PlatformResult<()> {
        let url = self.url(path)?;
        self.config
            .retry
            .call(path, || async {
                let response = self.client.delete(url.clone()).send().await?;
                self.check(response).await.map(|_| ())
            })
            .await
    }

    /// Issue a create call and poll the returned operation to a terminal
    /// state. Each poll runs under the request timeout; the whole wait is
    /// bounded by `poll_timeout` and surfaces as a distinct, retryable
    /// timeout error when exhausted.
    async fn create_and_wait<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> PlatformResult<CreatedResource> {
        #[derive(Debug, Deserialize)]
        struct CreateAccepted {
            #[serde(default)]
            operation_id: Option<String>,
            #[serde(default)]
            resource: Option<CreatedResource>,
        }

        let accepted: CreateAccepted = self.post_json(path, body).await?;
        if let Some(resource) = accepted.resource {
            // some services complete synchronously
            return Ok(resource);
        }
        let operation_id = accepted.operation_id.ok_or_else(|| {
            PlatformError::internal("create response carried neither a resource nor an operation")
        })?;

        let deadline = tokio::time::Instant::now() + self.config.poll_timeout;
        loop {
            let operation: OperationDoc =
                self.get_json(&format!("operations/{operation_id}")).await?;
            match operation.status.as_str() {
                "succeeded" => {
                    return operation.resource.ok_or_else(|| {
                        PlatformError::internal("succeeded operation reported no resource")
                    });
                }
                "failed" | "cancelled" => {
                    return Err(PlatformError::OperationFailed {
                        state: operation.status,
                        message: operation.error.unwrap_or_default(),
                    });
                }
                state => {
                    debug!(operation_id = %operation_id, state, "operation still running");
                }
            }
            if tokio::time::Instant::now() + self.config.poll_interval > deadline {
                return Err(PlatformError::timeout(
                    format!("operation {operation_id}"),
                    self.config.poll_timeout.as_secs(),
                ));
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    async fn find_by_name(
        &self,
        collection: &str,
        workspace_id: &str,
        name: &str,
    ) -> PlatformResult<Option<CreatedResource>> {
        #[derive(Debug, Deserialize)]
        struct Listing {
            #[serde(default)]
            items: Vec<CreatedResource>,
        }
        let listing: Listing = self
            .get_json(&format!("workspaces/{workspace_id}/{collection}?name={name}"))
            .await?;
        // the filter is advisory; match exactly on our side
        Ok(listing.items.into_iter().find(|r| r.name == name))
    }
}

/// HTTP implementation of [`crate::clients::LakehouseService`]
#[derive(Clone)]
pub struct HttpLakehouseService {
    http: PlatformHttp,
}

/// HTTP implementation of [`crate::clients::EventhouseService`]
#[derive(Clone)]
pub struct HttpEventhouseService {
    http: PlatformHttp,
}

/// HTTP implementation of [`crate::clients::OntologyService`]
#[derive(Clone)]
pub struct HttpOntologyService {
    http: PlatformHttp,
}

impl HttpLakehouseService {
    pub fn new(config: HttpClientConfig) -> PlatformResult<Self> {
        Ok(Self {
            http: PlatformHttp::new(config)?,
        })
    }
}

impl HttpEventhouseService {
    pub fn new(config: HttpClientConfig) -> PlatformResult<Self> {
        Ok(Self {
            http: PlatformHttp::new(config)?,
        })
    }
}

impl HttpOntologyService {
    pub fn new(config: HttpClientConfig) -> PlatformResult<Self> {
        Ok(Self {
            http: PlatformHttp::new(config)?,
        })
    }
}

#[async_trait::async_trait]
impl crate::clients::LakehouseService for HttpLakehouseService {
    async fn find_by_name(
        &self,
        workspace_id: &str,
        name: &str,
    ) -> PlatformResult<Option<CreatedResource>> {
        self.http.find_by_name("lakehouses", workspace_id, name).await
    }

    async fn create(&self, workspace_id: &str, name: &str) -> PlatformResult<CreatedResource> {
        self.http
            .create_and_wait(
                &format!("workspaces/{workspace_id}/lakehouses"),
                &json!({ "name": name }),
            )
            .await
    }

    async fn get(&self, id: &str) -> PlatformResult<CreatedResource> {
        self.http.get_json(&format!("lakehouses/{id}")).await
    }

    async fn list_files(&self, id: &str) -> PlatformResult<Vec<RemoteFile>> {
        #[derive(Debug, Deserialize)]
        struct Files {
            #[serde(default)]
            items: Vec<RemoteFile>,
        }
        let files: Files = self.http.get_json(&format!("lakehouses/{id}/files")).await?;
        Ok(files.items)
    }

    async fn upload_file(&self, id: &str, name: &str, content: &[u8]) -> PlatformResult<()> {
        self.http
            .put_bytes(&format!("lakehouses/{id}/files/{name}"), content)
            .await
    }

    async fn list_tables(&self, id: &str) -> PlatformResult<Vec<String>> {
        #[derive(Debug, Deserialize)]
        struct Tables {
            #[serde(default)]
            items: Vec<String>,
        }
        let tables: Tables = self.http.get_json(&format!("lakehouses/{id}/tables")).await?;
        Ok(tables.items)
    }

    async fn load_table(&self, id: &str, table: &str, source_file: &str) -> PlatformResult<()> {
        self.http
            .post_ack(
                &format!("lakehouses/{id}/tables"),
                &json!({ "name": table, "source_file": source_file }),
            )
            .await
    }

    async fn delete(&self, id: &str) -> PlatformResult<()> {
        self.http.delete(&format!("lakehouses/{id}")).await
    }
}

#[async_trait::async_trait]
impl crate::clients::EventhouseService for HttpEventhouseService {
    async fn find_by_name(
        &self,
        workspace_id: &str,
        name: &str,
    ) -> PlatformResult<Option<CreatedResource>> {
        self.http.find_by_name("eventhouses", workspace_id, name).await
    }

    async fn create(&self, workspace_id: &str, name: &str) -> PlatformResult<CreatedResource> {
        self.http
            .create_and_wait(
                &format!("workspaces/{workspace_id}/eventhouses"),
                &json!({ "name": name }),
            )
            .await
    }

    async fn get(&self, id: &str) -> PlatformResult<CreatedResource> {
        self.http.get_json(&format!("eventhouses/{id}")).await
    }

    async fn table_row_count(&self, id: &str, table: &str) -> PlatformResult<u64> {
        #[derive(Debug, Deserialize)]
        struct RowCount {
            count: u64,
        }
        match self
            .http
            .get_json::<RowCount>(&format!("eventhouses/{id}/tables/{table}/count"))
            .await
        {
            Ok(rows) => Ok(rows.count),
            Err(PlatformError::NotFound { .. }) => Ok(0),
            Err(e) => Err(e),
        }
    }

    async fn ingest(
        &self,
        id: &str,
        table: &str,
        file_name: &str,
        content: &[u8],
    ) -> PlatformResult<()> {
        self.http
            .put_bytes(&format!("eventhouses/{id}/files/{file_name}"), content)
            .await?;
        self.http
            .post_ack(
                &format!("eventhouses/{id}/tables/{table}/ingest"),
                &json!({ "source_file": file_name }),
            )
            .await
    }

    async fn delete(&self, id: &str) -> PlatformResult<()> {
        self.http.delete(&format!("eventhouses/{id}")).await
    }
}

#[async_trait::async_trait]
impl crate::clients::OntologyService for HttpOntologyService {
    async fn find_by_name(
        &self,
        workspace_id: &str,
        name: &str,
    ) -> PlatformResult<Option<CreatedResource>> {
        self.http.find_by_name("ontologies", workspace_id, name).await
    }

    async fn create(
        &self,
        workspace_id: &str,
        name: &str,
        definition: &OntologyDefinition,
    ) -> PlatformResult<CreatedResource> {
        self.http
            .create_and_wait(
                &format!("workspaces/{workspace_id}/ontologies"),
                &json!({ "name": name, "definition": definition }),
            )
            .await
    }

    async fn get(&self, id: &str) -> PlatformResult<CreatedResource> {
        self.http.get_json(&format!("ontologies/{id}")).await
    }

    async fn list_bindings(&self, id: &str) -> PlatformResult<Vec<RemoteBinding>> {
        #[derive(Debug, Deserialize)]
        struct Bindings {
            #[serde(default)]
            items: Vec<RemoteBinding>,
        }
        let bindings: Bindings = self
            .http
            .get_json(&format!("ontologies/{id}/bindings"))
            .await?;
        Ok(bindings.items)
    }

    async fn bind_static(&self, id: &str, spec: &StaticBindingSpec) -> PlatformResult<()> {
        self.http
            .post_ack(&format!("ontologies/{id}/bindings/static"), spec)
            .await
    }

    async fn bind_timeseries(&self, id: &str, spec: &TimeseriesBindingSpec) -> PlatformResult<()> {
        self.http
            .post_ack(&format!("ontologies/{id}/bindings/timeseries"), spec)
            .await
    }

    async fn bind_relationship(
        &self,
        id: &str,
        spec: &RelationshipBindingSpec,
    ) -> PlatformResult<()> {
        self.http
            .post_ack(&format!("ontologies/{id}/bindings/relationships"), spec)
            .await
    }

    async fn delete(&self, id: &str) -> PlatformResult<()> {
        self.http.delete(&format!("ontologies/{id}")).await
    }
}
