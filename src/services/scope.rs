//! Owner scope: the authenticated uid that partitions all user data.

use crate::db::{self, CollectionPath, DocumentPath};
use crate::error::AppError;
use std::fmt;

/// A resolved identity, required by every data operation.
///
/// There is no way to build one without a uid, so a data call without an
/// authenticated session fails before it can reach the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnerScope {
    uid: String,
}

impl OwnerScope {
    pub fn new(uid: impl Into<String>) -> Result<Self, AppError> {
        let uid = uid.into();
        if uid.trim().is_empty() {
            return Err(AppError::Unauthorized);
        }
        Ok(Self { uid })
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn profile_doc(&self) -> DocumentPath {
        db::user_doc(&self.uid)
    }

    pub fn vehicles(&self) -> CollectionPath {
        db::vehicles_col(&self.uid)
    }

    pub fn maintenance_tasks(&self, vehicle_id: &str) -> CollectionPath {
        db::maintenance_col(&self.uid, vehicle_id)
    }

    pub fn tasks(&self) -> CollectionPath {
        db::tasks_col(&self.uid)
    }
}

impl fmt::Display for OwnerScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uid)
    }
}
