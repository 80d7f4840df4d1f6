// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process document store.
//!
//! Backs `BACKEND=memory` and the test suite. Collections are keyed by their
//! full path string; every write broadcasts the changed collection path and
//! the document's fields before and after, so open change feeds can apply
//! their filter and re-read.

use super::store::{ChangeFeed, Document, DocumentData, DocumentStore, FieldFilter};
use super::{CollectionPath, DocumentPath};
use crate::error::AppError;
use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::StreamExt;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
enum StoreEvent {
    Changed(Arc<Change>),
    Unavailable,
}

#[derive(Debug)]
struct Change {
    collection: String,
    before: Option<DocumentData>,
    after: Option<DocumentData>,
}

impl Change {
    fn is_visible(&self, collection: &str, filter: Option<&FieldFilter>) -> bool {
        if self.collection != collection {
            return false;
        }
        let Some(filter) = filter else {
            return true;
        };
        [&self.before, &self.after]
            .into_iter()
            .flatten()
            .any(|data| filter.matches(data))
    }
}

struct Inner {
    collections: DashMap<String, BTreeMap<String, DocumentData>>,
    events: broadcast::Sender<StoreEvent>,
    available: AtomicBool,
}

/// In-memory `DocumentStore`.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                collections: DashMap::new(),
                events,
                available: AtomicBool::new(true),
            }),
        }
    }

    /// Simulate a backend outage (or recovery).
    ///
    /// While unavailable every operation fails with `AppError::Database`, and
    /// open change feeds receive an error.
    pub fn set_available(&self, available: bool) {
        let was = self.inner.available.swap(available, Ordering::SeqCst);
        if was && !available {
            tracing::warn!("Memory store marked unavailable");
            let _ = self.inner.events.send(StoreEvent::Unavailable);
        }
    }

    /// Number of documents in a collection (test helper).
    pub fn count(&self, collection: &CollectionPath) -> usize {
        self.inner
            .collections
            .get(&collection.to_string())
            .map(|docs| docs.len())
            .unwrap_or(0)
    }

    fn check_available(&self) -> Result<(), AppError> {
        if self.inner.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(AppError::Database("Memory store unavailable".to_string()))
        }
    }

    fn notify(
        &self,
        collection: &CollectionPath,
        before: Option<DocumentData>,
        after: Option<DocumentData>,
    ) {
        // No receivers is fine
        let _ = self.inner.events.send(StoreEvent::Changed(Arc::new(Change {
            collection: collection.to_string(),
            before,
            after,
        })));
    }
}

struct WatchState {
    rx: broadcast::Receiver<StoreEvent>,
    collection: String,
    filter: Option<FieldFilter>,
    failed: bool,
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create(
        &self,
        collection: &CollectionPath,
        data: DocumentData,
    ) -> Result<String, AppError> {
        self.check_available()?;
        let id = uuid::Uuid::new_v4().simple().to_string();

        self.inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), data.clone());

        self.notify(collection, None, Some(data));
        Ok(id)
    }

    async fn set(&self, doc: &DocumentPath, data: DocumentData) -> Result<(), AppError> {
        self.check_available()?;
        let before = self
            .inner
            .collections
            .entry(doc.parent().to_string())
            .or_default()
            .insert(doc.id().to_string(), data.clone());

        self.notify(doc.parent(), before, Some(data));
        Ok(())
    }

    async fn get(&self, doc: &DocumentPath) -> Result<Option<Document>, AppError> {
        self.check_available()?;
        Ok(self
            .inner
            .collections
            .get(&doc.parent().to_string())
            .and_then(|docs| docs.get(doc.id()).cloned())
            .map(|data| Document {
                id: doc.id().to_string(),
                data,
            }))
    }

    async fn list(
        &self,
        collection: &CollectionPath,
        filter: Option<&FieldFilter>,
    ) -> Result<Vec<Document>, AppError> {
        self.check_available()?;
        let Some(docs) = self.inner.collections.get(&collection.to_string()) else {
            return Ok(Vec::new());
        };

        Ok(docs
            .iter()
            .filter(|(_, data)| filter.map(|f| f.matches(data)).unwrap_or(true))
            .map(|(id, data)| Document {
                id: id.clone(),
                data: data.clone(),
            })
            .collect())
    }

    async fn update(&self, doc: &DocumentPath, data: DocumentData) -> Result<(), AppError> {
        self.check_available()?;
        let (before, after) = {
            let mut docs = self
                .inner
                .collections
                .get_mut(&doc.parent().to_string())
                .ok_or_else(|| AppError::NotFound(doc.to_string()))?;
            let existing = docs
                .get_mut(doc.id())
                .ok_or_else(|| AppError::NotFound(doc.to_string()))?;
            let before = existing.clone();
            existing.extend(data);
            (before, existing.clone())
        };

        self.notify(doc.parent(), Some(before), Some(after));
        Ok(())
    }

    async fn delete(&self, doc: &DocumentPath) -> Result<(), AppError> {
        self.check_available()?;
        let removed = self
            .inner
            .collections
            .get_mut(&doc.parent().to_string())
            .and_then(|mut docs| docs.remove(doc.id()));

        if let Some(before) = removed {
            self.notify(doc.parent(), Some(before), None);
        }
        Ok(())
    }

    async fn watch(
        &self,
        collection: &CollectionPath,
        filter: Option<&FieldFilter>,
    ) -> Result<ChangeFeed, AppError> {
        self.check_available()?;
        let state = WatchState {
            rx: self.inner.events.subscribe(),
            collection: collection.to_string(),
            filter: filter.cloned(),
            failed: false,
        };

        let feed = futures_util::stream::unfold(state, |mut state| async move {
            if state.failed {
                return None;
            }
            loop {
                match state.rx.recv().await {
                    Ok(StoreEvent::Changed(change)) => {
                        if change.is_visible(&state.collection, state.filter.as_ref()) {
                            return Some((Ok(()), state));
                        }
                    }
                    Ok(StoreEvent::Unavailable) => {
                        state.failed = true;
                        let err = AppError::Database("Memory store unavailable".to_string());
                        return Some((Err(err), state));
                    }
                    // Missed notifications are covered by the next full re-read.
                    Err(RecvError::Lagged(_)) => return Some((Ok(()), state)),
                    Err(RecvError::Closed) => return None,
                }
            }
        });

        Ok(feed.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{legacy_vehicles_col, vehicles_col};
    use serde_json::json;

    fn data(value: serde_json::Value) -> DocumentData {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[tokio::test]
    async fn test_create_get_update_delete() {
        let store = MemoryStore::new();
        let col = vehicles_col("u1");

        let id = store
            .create(&col, data(json!({ "make": "Honda", "mileage": 10 })))
            .await
            .unwrap();
        let doc = col.doc(&id);

        store
            .update(&doc, data(json!({ "mileage": 20 })))
            .await
            .unwrap();
        let fetched = store.get(&doc).await.unwrap().unwrap();
        assert_eq!(fetched.data["make"], json!("Honda"));
        assert_eq!(fetched.data["mileage"], json!(20));

        store.delete(&doc).await.unwrap();
        assert!(store.get(&doc).await.unwrap().is_none());
        // Idempotent
        store.delete(&doc).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_missing_document_is_not_found() {
        let store = MemoryStore::new();
        let doc = vehicles_col("u1").doc("nope");
        let err = store.update(&doc, DocumentData::new()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_with_filter() {
        let store = MemoryStore::new();
        let col = legacy_vehicles_col();
        store
            .create(&col, data(json!({ "userId": "u1" })))
            .await
            .unwrap();
        store
            .create(&col, data(json!({ "userId": "u2" })))
            .await
            .unwrap();

        let filter = FieldFilter::eq("userId", "u1");
        assert_eq!(store.list(&col, Some(&filter)).await.unwrap().len(), 1);
        assert_eq!(store.list(&col, None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_watch_only_sees_its_collection() {
        let store = MemoryStore::new();
        let mut feed = store.watch(&vehicles_col("u1"), None).await.unwrap();

        store
            .create(&vehicles_col("u2"), DocumentData::new())
            .await
            .unwrap();
        store
            .create(&vehicles_col("u1"), DocumentData::new())
            .await
            .unwrap();

        let first = feed.next().await.unwrap();
        assert!(first.is_ok());
        // Only one notification was for u1
        let pending =
            tokio::time::timeout(std::time::Duration::from_millis(50), feed.next()).await;
        assert!(pending.is_err());
    }

    #[tokio::test]
    async fn test_unavailable_fails_ops_and_feeds() {
        let store = MemoryStore::new();
        let col = vehicles_col("u1");
        let mut feed = store.watch(&col, None).await.unwrap();

        store.set_available(false);
        assert!(matches!(
            store.list(&col, None).await,
            Err(AppError::Database(_))
        ));
        assert!(matches!(feed.next().await, Some(Err(AppError::Database(_)))));

        // The feed does not survive recovery
        store.set_available(true);
        assert!(store.list(&col, None).await.is_ok());
        store.create(&col, DocumentData::new()).await.unwrap();
        assert!(feed.next().await.is_none());
    }

    #[tokio::test]
    async fn test_filtered_watch_ignores_other_owners() {
        let store = MemoryStore::new();
        let col = legacy_vehicles_col();
        let filter = FieldFilter::eq("userId", "u1");
        let mut feed = store.watch(&col, Some(&filter)).await.unwrap();

        for _ in 0..5 {
            store
                .create(&col, data(json!({ "userId": "u2" })))
                .await
                .unwrap();
        }
        let quiet =
            tokio::time::timeout(std::time::Duration::from_millis(50), feed.next()).await;
        assert!(quiet.is_err(), "another owner's writes must not wake the feed");

        let mine = store
            .create(&col, data(json!({ "userId": "u1" })))
            .await
            .unwrap();
        assert!(matches!(feed.next().await, Some(Ok(()))));

        // Deleting a matching document is still a change for the watcher
        store.delete(&col.doc(mine)).await.unwrap();
        assert!(matches!(feed.next().await, Some(Ok(()))));
    }
}
