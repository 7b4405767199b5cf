use crate::models::MemberRole;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Links an identity-provider subject to a role within one organization.
/// `subject_id` carries a unique index, so a subject belongs to at most one
/// organization at a time. Records are created when an invitation is
/// accepted on the provider side and mutated only through the org-scoped
/// user endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    #[serde(rename = "_id")]
    pub id: String,
    pub subject_id: String,
    pub email: String,
    pub role: MemberRole,
    pub org_id: String,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Membership {
    pub fn new(subject_id: String, email: String, role: MemberRole, org_id: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            subject_id,
            email,
            role,
            org_id,
            created_at: now,
            updated_at: now,
        }
    }
}
