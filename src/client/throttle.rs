//! Throttle guard: wraps any record client and absorbs rate-limit responses.
//!
//! Layered outside the adapter's own transient retry loop, so the two budgets are
//! tuned independently. Only throttling-class errors are retried here.

use crate::client::retry::retry_with_policy;
use crate::client::RecordClient;
use crate::error::RemoteError;
use crate::types::{ExternalRecordRef, Fields, Record, RetryPolicy};
use async_trait::async_trait;

pub struct ThrottleGuard<C> {
    inner: C,
    policy: RetryPolicy,
}

impl<C: RecordClient> ThrottleGuard<C> {
    pub fn new(inner: C, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

}

#[async_trait]
impl<C: RecordClient> RecordClient for ThrottleGuard<C> {
    async fn list(
        &self,
        entity_type: &str,
        filter: &Fields,
        fields: &[String],
    ) -> Result<Vec<Record>, RemoteError> {
        let inner = &self.inner;
        retry_with_policy(&self.policy, "throttle:list", RemoteError::is_throttle, move |_| {
            inner.list(entity_type, filter, fields)
        })
        .await
    }

    async fn get(&self, entity_type: &str, id: &str) -> Result<Record, RemoteError> {
        let inner = &self.inner;
        retry_with_policy(&self.policy, "throttle:get", RemoteError::is_throttle, move |_| {
            inner.get(entity_type, id)
        })
        .await
    }

    async fn create(
        &self,
        entity_type: &str,
        payload: Fields,
    ) -> Result<ExternalRecordRef, RemoteError> {
        let inner = &self.inner;
        let payload = &payload;
        retry_with_policy(&self.policy, "throttle:create", RemoteError::is_throttle, move |_| {
            inner.create(entity_type, payload.clone())
        })
        .await
    }

    async fn update(
        &self,
        entity_type: &str,
        id: &str,
        partial: Fields,
    ) -> Result<ExternalRecordRef, RemoteError> {
        let inner = &self.inner;
        let partial = &partial;
        retry_with_policy(&self.policy, "throttle:update", RemoteError::is_throttle, move |_| {
            inner.update(entity_type, id, partial.clone())
        })
        .await
    }

    async fn delete(&self, entity_type: &str, id: &str) -> Result<(), RemoteError> {
        let inner = &self.inner;
        retry_with_policy(&self.policy, "throttle:delete", RemoteError::is_throttle, move |_| {
            inner.delete(entity_type, id)
        })
        .await
    }
}
