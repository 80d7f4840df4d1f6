// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper implementing the document store contract.
//!
//! Documents are addressed by hierarchical paths (`users/{uid}/vehicles/...`),
//! read and written as JSON field maps, and observed through Firestore listen
//! targets.

use super::store::{ChangeFeed, Document, DocumentData, DocumentStore, FieldFilter};
use super::{CollectionPath, DocumentPath};
use crate::error::AppError;
use async_trait::async_trait;
use firestore::FirestoreListenSupport;
use futures_util::{Stream, StreamExt};
use gcloud_sdk::google::firestore::v1::{listen_response::ResponseType, ListenResponse};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

/// Listen target ids must be unique per listener; a process-wide counter is enough.
static NEXT_TARGET_ID: AtomicU32 = AtomicU32::new(1);

/// Metadata keys the firestore crate injects when deserializing documents.
const FIRESTORE_ID_KEY: &str = "_firestore_id";
const FIRESTORE_META_PREFIX: &str = "_firestore";

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// Absolute parent path for a collection (`projects/.../documents[/parent]`).
    fn parent_path(client: &firestore::FirestoreDb, collection: &CollectionPath) -> String {
        match collection.parent() {
            Some(parent) => format!("{}/{}", client.get_documents_path(), parent),
            None => client.get_documents_path().to_string(),
        }
    }
}

/// Split a deserialized Firestore object into id and user fields.
fn into_document(value: Value, fallback_id: Option<&str>) -> Result<Document, AppError> {
    let Value::Object(mut map) = value else {
        return Err(AppError::Database(
            "Firestore returned a non-object document".to_string(),
        ));
    };

    let id = map
        .get(FIRESTORE_ID_KEY)
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| fallback_id.map(str::to_string))
        .ok_or_else(|| AppError::Database("Firestore document without id".to_string()))?;

    map.retain(|key, _| !key.starts_with(FIRESTORE_META_PREFIX));
    Ok(Document { id, data: map })
}

fn db_error(e: impl std::fmt::Display) -> AppError {
    AppError::Database(e.to_string())
}

#[async_trait]
impl DocumentStore for FirestoreDb {
    async fn create(
        &self,
        collection: &CollectionPath,
        data: DocumentData,
    ) -> Result<String, AppError> {
        let client = self.get_client()?;
        let parent = Self::parent_path(client, collection);
        let id = uuid::Uuid::new_v4().simple().to_string();

        let _: () = client
            .fluent()
            .insert()
            .into(collection.name())
            .document_id(&id)
            .parent(&parent)
            .object(&Value::Object(data))
            .execute()
            .await
            .map_err(db_error)?;

        tracing::debug!(collection = %collection, id = %id, "Document created");
        Ok(id)
    }

    async fn set(&self, doc: &DocumentPath, data: DocumentData) -> Result<(), AppError> {
        let client = self.get_client()?;
        let parent = Self::parent_path(client, doc.parent());

        let _: () = client
            .fluent()
            .update()
            .in_col(doc.parent().name())
            .document_id(doc.id())
            .parent(&parent)
            .object(&Value::Object(data))
            .execute()
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn get(&self, doc: &DocumentPath) -> Result<Option<Document>, AppError> {
        let client = self.get_client()?;
        let parent = Self::parent_path(client, doc.parent());

        let value: Option<Value> = client
            .fluent()
            .select()
            .by_id_in(doc.parent().name())
            .parent(&parent)
            .obj()
            .one(doc.id())
            .await
            .map_err(db_error)?;

        value
            .map(|value| into_document(value, Some(doc.id())))
            .transpose()
    }

    async fn list(
        &self,
        collection: &CollectionPath,
        filter: Option<&FieldFilter>,
    ) -> Result<Vec<Document>, AppError> {
        let client = self.get_client()?;
        let parent = Self::parent_path(client, collection);

        let query = client
            .fluent()
            .select()
            .from(collection.name())
            .parent(&parent);

        let values: Vec<Value> = match filter {
            Some(filter) => {
                let field = filter.field.clone();
                let value = filter.value.clone();
                query
                    .filter(move |q| q.for_all([q.field(field.as_str()).eq(value.clone())]))
                    .obj()
                    .query()
                    .await
            }
            None => query.obj().query().await,
        }
        .map_err(db_error)?;

        values
            .into_iter()
            .map(|value| into_document(value, None))
            .collect()
    }

    async fn update(&self, doc: &DocumentPath, data: DocumentData) -> Result<(), AppError> {
        let client = self.get_client()?;
        let parent = Self::parent_path(client, doc.parent());
        // Field mask: only the given top-level fields are replaced.
        let fields: Vec<String> = data.keys().cloned().collect();

        let result: Result<(), _> = client
            .fluent()
            .update()
            .fields(fields)
            .in_col(doc.parent().name())
            .precondition(firestore::FirestoreWritePrecondition::Exists(true))
            .document_id(doc.id())
            .parent(&parent)
            .object(&Value::Object(data))
            .execute()
            .await;

        match result {
            Ok(()) => Ok(()),
            Err(firestore::errors::FirestoreError::DataNotFoundError(_)) => {
                Err(AppError::NotFound(doc.to_string()))
            }
            Err(e) => Err(db_error(e)),
        }
    }

    async fn delete(&self, doc: &DocumentPath) -> Result<(), AppError> {
        let client = self.get_client()?;
        let parent = Self::parent_path(client, doc.parent());

        client
            .fluent()
            .delete()
            .from(doc.parent().name())
            .document_id(doc.id())
            .parent(&parent)
            .execute()
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn watch(
        &self,
        collection: &CollectionPath,
        filter: Option<&FieldFilter>,
    ) -> Result<ChangeFeed, AppError> {
        let client = self.get_client()?;
        let parent = Self::parent_path(client, collection);

        let mut query = firestore::FirestoreQueryParams::new(collection.name().into())
            .with_parent(parent);
        if let Some(filter) = filter {
            query = query.with_filter(firestore::FirestoreQueryFilter::Compare(Some(
                firestore::FirestoreQueryFilterCompare::Equal(
                    filter.field.clone(),
                    filter.value.clone().into(),
                ),
            )));
        }

        let target = firestore::FirestoreListenerTargetParams::new(
            firestore::FirestoreListenerTarget::new(NEXT_TARGET_ID.fetch_add(1, Ordering::Relaxed)),
            firestore::FirestoreTargetType::Query(query),
            HashMap::new(),
        );

        let responses = client
            .listen_doc_changes(vec![target])
            .await
            .map_err(db_error)?;

        tracing::debug!(collection = %collection, filtered = filter.is_some(), "Listen stream opened");
        Ok(change_feed(responses, collection.to_string()))
    }
}

/// Turn a raw listen response stream into a change feed.
///
/// `FirestoreListener` restarts failed streams on its own, so feeds are built
/// on `listen_doc_changes` directly.
///
/// Document events become `Ok(())`. A stream error, a target removed with a
/// cause, or the server closing the stream becomes one `Err`, and the feed
/// ends there. Dropping the feed cancels the listen call.
fn change_feed<S>(responses: S, collection: String) -> ChangeFeed
where
    S: Stream<Item = firestore::FirestoreResult<ListenResponse>> + Send + 'static,
{
    let state = (responses.boxed(), collection, false);

    futures_util::stream::unfold(state, |(mut responses, collection, done)| async move {
        if done {
            return None;
        }
        loop {
            let event = match responses.next().await {
                Some(Ok(response)) => response.response_type,
                Some(Err(e)) => {
                    tracing::warn!(collection = %collection, error = %e, "Listen stream failed");
                    return Some((Err(db_error(e)), (responses, collection, true)));
                }
                None => {
                    tracing::warn!(collection = %collection, "Listen stream closed by server");
                    let err = AppError::Database(format!("Listen stream on {} closed", collection));
                    return Some((Err(err), (responses, collection, true)));
                }
            };

            match event {
                Some(
                    ResponseType::DocumentChange(_)
                    | ResponseType::DocumentDelete(_)
                    | ResponseType::DocumentRemove(_)
                    | ResponseType::Filter(_),
                ) => return Some((Ok(()), (responses, collection, false))),
                Some(ResponseType::TargetChange(change)) => {
                    if let Some(cause) = change.cause {
                        tracing::warn!(
                            collection = %collection,
                            code = cause.code,
                            message = %cause.message,
                            "Listen target removed"
                        );
                        let err = AppError::Database(format!(
                            "Listen target on {} removed: {}",
                            collection, cause.message
                        ));
                        return Some((Err(err), (responses, collection, true)));
                    }
                }
                None => {}
            }
        }
    })
    .boxed()
}
