//! HTTP adapter for the remote record API.
//!
//! Resource layout: `{base}/api/resource/{entity}[/{id}]`. Credentials and JSON
//! content negotiation are installed once as default headers of the session.

use crate::client::response::{extract_document, extract_rows, normalize_record, parse_body};
use crate::client::retry::retry_with_policy;
use crate::client::RecordClient;
use crate::config::{ConnectionConfig, RecsyncConfig, MAX_PAGE_SIZE};
use crate::error::{ApiError, RemoteError};
use crate::types::{ExternalRecordRef, Fields, Record, RetryPolicy};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, Url};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, trace};

/// HTTP record client
pub struct HttpRecordClient {
    client: Client,
    base_url: Url,
    page_size: usize,
    retry: RetryPolicy,
    throttle_statuses: Vec<u16>,
}

// Helper function to map transport errors to RemoteError
fn map_transport_error(error: reqwest::Error) -> RemoteError {
    let message = if error.is_timeout() {
        format!("Request timeout: {}", error)
    } else if error.is_connect() {
        format!("Connection error: {}", error)
    } else {
        format!("HTTP error: {}", error)
    };
    RemoteError::TransientNetwork {
        message,
        status: error.status().map(|s| s.as_u16()),
        body: None,
        attempts: 1,
    }
}

fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<String, RemoteError> {
    serde_json::to_string(value)
        .map_err(|e| RemoteError::Decode(format!("Failed to encode query: {}", e)))
}

fn session_headers(connection: &ConnectionConfig) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    let mut auth = HeaderValue::from_str(&connection.authorization())
        .map_err(|e| ApiError::ConfigError(format!("Invalid API credentials: {}", e)))?;
    auth.set_sensitive(true);
    headers.insert(AUTHORIZATION, auth);
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}

impl HttpRecordClient {
    pub fn new(
        connection: &ConnectionConfig,
        retry: RetryPolicy,
        throttle_statuses: Vec<u16>,
    ) -> Result<Self, ApiError> {
        let base_url = Url::parse(connection.base_url.trim_end_matches('/')).map_err(|e| {
            ApiError::ConfigError(format!("Invalid base URL '{}': {}", connection.base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::ConfigError(format!(
                "Base URL '{}' cannot carry a resource path",
                connection.base_url
            )));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&connection.page_size) {
            return Err(ApiError::ConfigError(format!(
                "connection.page_size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        let client = Client::builder()
            .default_headers(session_headers(connection)?)
            .connect_timeout(Duration::from_secs(connection.connect_timeout_secs))
            .timeout(Duration::from_secs(connection.timeout_secs))
            .build()
            .map_err(|e| ApiError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            page_size: connection.page_size,
            retry,
            throttle_statuses,
        })
    }

    /// Build the adapter from a loaded configuration.
    pub fn from_config(config: &RecsyncConfig) -> Result<Self, ApiError> {
        Self::new(
            &config.connection,
            config.retry.clone(),
            config.throttle.statuses.clone(),
        )
    }

    /// `{base}/api/resource/{entity}[/{id}]` with every segment percent-encoded.
    pub fn resource_url(&self, entity_type: &str, id: Option<&str>) -> Result<Url, RemoteError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                RemoteError::Decode(format!("Base URL cannot carry a path: {}", self.base_url))
            })?;
            segments.pop_if_empty().extend(["api", "resource", entity_type]);
            if let Some(id) = id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    fn list_query(
        &self,
        filter: &Fields,
        fields: &[String],
        offset: usize,
    ) -> Result<Vec<(&'static str, String)>, RemoteError> {
        let mut query = vec![
            ("limit_page_length", self.page_size.to_string()),
            ("limit_start", offset.to_string()),
        ];
        if !filter.is_empty() {
            query.push(("filters", encode_json(filter)?));
        }
        let fields: Vec<&str> = if fields.is_empty() {
            vec!["name"]
        } else {
            fields.iter().map(String::as_str).collect()
        };
        query.push(("fields", encode_json(&fields)?));
        Ok(query)
    }

    /// Send one logical request, retrying transient failures per the retry policy.
    async fn send(
        &self,
        method: Method,
        url: Url,
        query: &[(&'static str, String)],
        body: Option<&Value>,
    ) -> Result<Value, RemoteError> {
        let label = format!("{} {}", method, url.path());
        let label = label.as_str();
        let client = &self.client;
        let throttle_statuses = self.throttle_statuses.as_slice();
        retry_with_policy(&self.retry, label, RemoteError::is_transient, move |attempt| {
            let mut request = client.request(method.clone(), url.clone()).query(query);
            if let Some(body) = body {
                request = request.json(body);
            }
            async move {
                trace!(request = label, attempt, "Sending request");
                let response = request.send().await.map_err(map_transport_error)?;
                let status = response.status();
                let text = response.text().await.map_err(map_transport_error)?;
                if status.is_success() {
                    return Ok(parse_body(&text));
                }
                debug!(request = label, status = status.as_u16(), "Request rejected");
                Err(RemoteError::from_status(
                    status.as_u16(),
                    text,
                    throttle_statuses,
                ))
            }
        })
        .await
    }

    async fn fetch_page(
        &self,
        entity_type: &str,
        filter: &Fields,
        fields: &[String],
        offset: usize,
    ) -> Result<Vec<Record>, RemoteError> {
        let url = self.resource_url(entity_type, None)?;
        let query = self.list_query(filter, fields, offset)?;
        let body = self.send(Method::GET, url, &query, None).await?;
        extract_rows(entity_type, &body)
    }
}

#[async_trait]
impl RecordClient for HttpRecordClient {
    async fn list(
        &self,
        entity_type: &str,
        filter: &Fields,
        fields: &[String],
    ) -> Result<Vec<Record>, RemoteError> {
        let mut rows = Vec::new();
        let mut offset = 0usize;
        loop {
            let page = self.fetch_page(entity_type, filter, fields, offset).await?;
            let page_len = page.len();
            rows.extend(page);
            if page_len < self.page_size {
                break;
            }
            offset += page_len;
        }
        debug!(entity_type, count = rows.len(), "Listed records");
        Ok(rows)
    }

    async fn get(&self, entity_type: &str, id: &str) -> Result<Record, RemoteError> {
        let url = self.resource_url(entity_type, Some(id))?;
        let body = self.send(Method::GET, url, &[], None).await?;
        extract_document(entity_type, &body)
    }

    async fn create(
        &self,
        entity_type: &str,
        payload: Fields,
    ) -> Result<ExternalRecordRef, RemoteError> {
        let mut body = payload;
        body.insert("doctype".to_string(), Value::String(entity_type.to_string()));
        let body = Value::Object(body);
        let url = self.resource_url(entity_type, None)?;
        let response = self.send(Method::POST, url, &[], Some(&body)).await?;
        normalize_record(entity_type, &response)
    }

    async fn update(
        &self,
        entity_type: &str,
        id: &str,
        partial: Fields,
    ) -> Result<ExternalRecordRef, RemoteError> {
        let body = Value::Object(partial);
        let url = self.resource_url(entity_type, Some(id))?;
        let response = self.send(Method::PUT, url, &[], Some(&body)).await?;
        normalize_record(entity_type, &response)
    }

    async fn delete(&self, entity_type: &str, id: &str) -> Result<(), RemoteError> {
        let url = self.resource_url(entity_type, Some(id))?;
        self.send(Method::DELETE, url, &[], None).await?;
        Ok(())
    }
}
