//! Database layer (document store).
//!
//! Data lives in a hierarchical, per-user document tree:
//!
//! ```text
//! users/{uid}
//! users/{uid}/vehicles/{vehicleId}
//! users/{uid}/vehicles/{vehicleId}/maintenanceTasks/{taskId}
//! users/{uid}/tasks/{taskId}
//! vehicles/{vehicleId}                  (legacy, filtered by userId)
//! ```

pub mod firestore;
pub mod memory;
pub mod sanitize;
pub mod store;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;
pub use sanitize::strip_unset;
pub use store::{
    to_document_data, ChangeFeed, Document, DocumentData, DocumentStore, FieldFilter,
};

use std::fmt;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const VEHICLES: &str = "vehicles";
    pub const MAINTENANCE_TASKS: &str = "maintenanceTasks";
    pub const TASKS: &str = "tasks";
    /// Legacy root collection, documents carry a `userId` field.
    pub const LEGACY_VEHICLES: &str = "vehicles";
}

/// Path to a collection, possibly nested under parent documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath {
    /// `(collection, document id)` pairs from the root down to the parent document.
    parents: Vec<(String, String)>,
    name: String,
}

impl CollectionPath {
    /// A top-level collection.
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            parents: Vec::new(),
            name: name.into(),
        }
    }

    /// Path of the document `id` inside this collection.
    pub fn doc(&self, id: impl Into<String>) -> DocumentPath {
        DocumentPath {
            collection: self.clone(),
            id: id.into(),
        }
    }

    /// Collection name (last segment).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent document path relative to the database root, if nested.
    pub fn parent(&self) -> Option<String> {
        if self.parents.is_empty() {
            return None;
        }
        Some(
            self.parents
                .iter()
                .map(|(col, id)| format!("{}/{}", col, id))
                .collect::<Vec<_>>()
                .join("/"),
        )
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.parent() {
            Some(parent) => write!(f, "{}/{}", parent, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Path to a single document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentPath {
    collection: CollectionPath,
    id: String,
}

impl DocumentPath {
    /// Sub-collection `name` under this document.
    pub fn collection(&self, name: impl Into<String>) -> CollectionPath {
        let mut parents = self.collection.parents.clone();
        parents.push((self.collection.name.clone(), self.id.clone()));
        CollectionPath {
            parents,
            name: name.into(),
        }
    }

    /// Collection containing this document.
    pub fn parent(&self) -> &CollectionPath {
        &self.collection
    }

    /// Document id (last segment).
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

// ─── Well-known paths ────────────────────────────────────────────

/// `users/{uid}`
pub fn user_doc(uid: &str) -> DocumentPath {
    CollectionPath::root(collections::USERS).doc(uid)
}

/// `users/{uid}/vehicles`
pub fn vehicles_col(uid: &str) -> CollectionPath {
    user_doc(uid).collection(collections::VEHICLES)
}

/// `users/{uid}/vehicles/{vehicle_id}/maintenanceTasks`
pub fn maintenance_col(uid: &str, vehicle_id: &str) -> CollectionPath {
    vehicles_col(uid)
        .doc(vehicle_id)
        .collection(collections::MAINTENANCE_TASKS)
}

/// `users/{uid}/tasks`
pub fn tasks_col(uid: &str) -> CollectionPath {
    user_doc(uid).collection(collections::TASKS)
}

/// `vehicles` (legacy flat collection)
pub fn legacy_vehicles_col() -> CollectionPath {
    CollectionPath::root(collections::LEGACY_VEHICLES)
}
