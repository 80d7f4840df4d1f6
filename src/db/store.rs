// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Backend-agnostic document store contract.
//!
//! Services talk to `Arc<dyn DocumentStore>` so the same code runs against
//! Firestore in production and the in-memory store in tests.

use super::{sanitize::strip_unset, CollectionPath, DocumentPath};
use crate::error::AppError;
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

/// Field map of a stored document (without its id).
pub type DocumentData = serde_json::Map<String, Value>;

/// Live change notifications for one collection.
///
/// Yields `Ok(())` whenever a watched document changes. A backend failure is
/// reported as a single `Err`, after which the feed ends; feeds never
/// reconnect on their own. Dropping the feed releases the backend listener.
pub type ChangeFeed = BoxStream<'static, Result<(), AppError>>;

/// A stored document: its id plus field data.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: DocumentData,
}

impl Document {
    /// Deserialize into a model, exposing the document id as the `id` field.
    pub fn into_model<T: DeserializeOwned>(self) -> Result<T, AppError> {
        let mut data = self.data;
        data.insert("id".to_string(), Value::String(self.id.clone()));
        serde_json::from_value(Value::Object(data)).map_err(|e| {
            AppError::Database(format!("Malformed document {}: {}", self.id, e))
        })
    }
}

/// Equality filter on a single top-level field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFilter {
    pub field: String,
    pub value: String,
}

impl FieldFilter {
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Check a document against the filter.
    pub fn matches(&self, data: &DocumentData) -> bool {
        data.get(&self.field).and_then(Value::as_str) == Some(self.value.as_str())
    }
}

/// Serialize a write payload into document fields.
///
/// Unset values are stripped and the `id` key is dropped, since the id is the
/// document key rather than a stored field.
pub fn to_document_data<T: Serialize>(payload: &T) -> Result<DocumentData, AppError> {
    let value = serde_json::to_value(payload)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize payload: {}", e)))?;

    match strip_unset(value) {
        Value::Object(mut map) => {
            map.remove("id");
            Ok(map)
        }
        other => Err(AppError::Internal(anyhow::anyhow!(
            "Payload must serialize to an object, got {}",
            other
        ))),
    }
}

/// Hierarchical key-scoped CRUD store with change notification.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new document with a generated id and return the id.
    async fn create(&self, collection: &CollectionPath, data: DocumentData)
        -> Result<String, AppError>;

    /// Write a whole document at a known id, replacing existing fields.
    async fn set(&self, doc: &DocumentPath, data: DocumentData) -> Result<(), AppError>;

    /// Read one document. Absent documents are `Ok(None)`.
    async fn get(&self, doc: &DocumentPath) -> Result<Option<Document>, AppError>;

    /// Read all documents of a collection, optionally filtered.
    async fn list(
        &self,
        collection: &CollectionPath,
        filter: Option<&FieldFilter>,
    ) -> Result<Vec<Document>, AppError>;

    /// Merge the given top-level fields into an existing document.
    ///
    /// Fails with `AppError::NotFound` if the document does not exist.
    async fn update(&self, doc: &DocumentPath, data: DocumentData) -> Result<(), AppError>;

    /// Delete a document. Deleting an absent document succeeds.
    async fn delete(&self, doc: &DocumentPath) -> Result<(), AppError>;

    /// Start observing a collection, optionally only documents matching `filter`.
    async fn watch(
        &self,
        collection: &CollectionPath,
        filter: Option<&FieldFilter>,
    ) -> Result<ChangeFeed, AppError>;
}
