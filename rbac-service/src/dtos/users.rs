use crate::models::{MemberRole, Membership};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub subject_id: String,
    pub email: String,
    pub role: MemberRole,
    pub org_id: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Membership> for UserResponse {
    fn from(membership: Membership) -> Self {
        Self {
            id: membership.id,
            subject_id: membership.subject_id,
            email: membership.email,
            role: membership.role,
            org_id: membership.org_id,
            created_at: membership.created_at.to_rfc3339(),
            updated_at: membership.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgUsersResponse {
    pub users: Vec<UserResponse>,
    pub total: u64,
    pub org_id: String,
}

#[derive(Debug, Serialize)]
pub struct UserBody {
    pub user: UserResponse,
}

/// The role is accepted as a raw string and parsed in the handler so an
/// out-of-set value produces a 400 with a message naming the valid roles.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRoleRequest {
    #[serde(default)]
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct RoleBreakdown {
    pub admin: u64,
    pub member: u64,
}

#[derive(Debug, Serialize)]
pub struct UsersByRole {
    pub admin: Vec<UserResponse>,
    pub member: Vec<UserResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllUsersResponse {
    pub users: Vec<UserResponse>,
    pub total: u64,
    pub breakdown: RoleBreakdown,
    pub users_by_role: UsersByRole,
}
