//! User profile model for storage and API.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// User profile stored at `users/{uid}`.
///
/// The counters are denormalized display metrics. They are adjusted by
/// separate calls after vehicle/task writes and can drift; `recount`
/// re-derives them from the live collections.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserProfile {
    /// Identity provider subject id (also used as document ID)
    pub uid: String,
    pub email: String,
    #[serde(default)]
    pub display_name: String,
    pub phone_number: Option<String>,
    /// Profile picture URL or storage reference
    pub photo_url: Option<String>,
    /// When the profile was provisioned (ISO 8601)
    pub created_at: String,
    #[serde(default)]
    pub vehicle_count: u32,
    #[serde(default)]
    pub maintenance_task_count: u32,
}

impl UserProfile {
    /// Fresh profile for a newly signed-up identity.
    pub fn new(uid: &str, email: &str, display_name: Option<&str>, now: &str) -> Self {
        Self {
            uid: uid.to_string(),
            email: email.to_string(),
            display_name: display_name.unwrap_or_default().to_string(),
            phone_number: None,
            photo_url: None,
            created_at: now.to_string(),
            vehicle_count: 0,
            maintenance_task_count: 0,
        }
    }
}

/// Editable profile fields. Unset fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[validate(length(min = 1, max = 100))]
    pub display_name: Option<String>,
    #[validate(length(max = 30))]
    pub phone_number: Option<String>,
    #[validate(length(max = 2048))]
    pub photo_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_reads_document_without_counters() {
        let json = serde_json::json!({
            "uid": "u1",
            "email": "a@b.c",
            "displayName": "Ann",
            "createdAt": "2024-01-01T00:00:00Z"
        });
        let profile: UserProfile = serde_json::from_value(json).unwrap();
        assert_eq!(profile.uid, "u1");
        assert_eq!(profile.vehicle_count, 0);
        assert_eq!(profile.photo_url, None);
    }

    #[test]
    fn test_profile_update_validation() {
        let update = ProfileUpdate {
            display_name: Some(String::new()),
            ..Default::default()
        };
        assert!(update.validate().is_err());
        assert!(ProfileUpdate::default().validate().is_ok());
    }
}
