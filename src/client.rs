//! Remote Record Client
//!
//! Unified interface over the remote record-management API. The HTTP adapter
//! handles paging, authentication and transient retries; the throttle guard wraps
//! any client to absorb rate limiting; the in-memory client stands in for the
//! remote during tests and rehearsals.

use crate::error::RemoteError;
use crate::types::{ExternalRecordRef, Fields, Record};
use async_trait::async_trait;
use std::sync::Arc;

pub mod http;
pub mod memory;
pub mod response;
pub mod retry;
pub mod throttle;

pub use http::HttpRecordClient;
pub use memory::{CallKind, InMemoryRecordClient};
pub use throttle::ThrottleGuard;

/// Record client trait
#[async_trait]
pub trait RecordClient: Send + Sync {
    /// List every record matching `filter`, projecting `fields`. Paging is internal.
    async fn list(
        &self,
        entity_type: &str,
        filter: &Fields,
        fields: &[String],
    ) -> Result<Vec<Record>, RemoteError>;

    /// Fetch a single record by identifier
    async fn get(&self, entity_type: &str, id: &str) -> Result<Record, RemoteError>;

    /// Create a record; the returned ref carries the normalized identifier
    async fn create(
        &self,
        entity_type: &str,
        payload: Fields,
    ) -> Result<ExternalRecordRef, RemoteError>;

    /// Apply a partial update (also used for submit/cancel via docstatus)
    async fn update(
        &self,
        entity_type: &str,
        id: &str,
        partial: Fields,
    ) -> Result<ExternalRecordRef, RemoteError>;

    async fn delete(&self, entity_type: &str, id: &str) -> Result<(), RemoteError>;

    /// Existence check; a not-found response is a negative answer, not an error.
    async fn exists(&self, entity_type: &str, id: &str) -> Result<bool, RemoteError> {
        match self.get(entity_type, id).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }
}

#[async_trait]
impl<C: RecordClient + ?Sized> RecordClient for Arc<C> {
    async fn list(
        &self,
        entity_type: &str,
        filter: &Fields,
        fields: &[String],
    ) -> Result<Vec<Record>, RemoteError> {
        (**self).list(entity_type, filter, fields).await
    }

    async fn get(&self, entity_type: &str, id: &str) -> Result<Record, RemoteError> {
        (**self).get(entity_type, id).await
    }

    async fn create(
        &self,
        entity_type: &str,
        payload: Fields,
    ) -> Result<ExternalRecordRef, RemoteError> {
        (**self).create(entity_type, payload).await
    }

    async fn update(
        &self,
        entity_type: &str,
        id: &str,
        partial: Fields,
    ) -> Result<ExternalRecordRef, RemoteError> {
        (**self).update(entity_type, id, partial).await
    }

    async fn delete(&self, entity_type: &str, id: &str) -> Result<(), RemoteError> {
        (**self).delete(entity_type, id).await
    }

    async fn exists(&self, entity_type: &str, id: &str) -> Result<bool, RemoteError> {
        (**self).exists(entity_type, id).await
    }
}
