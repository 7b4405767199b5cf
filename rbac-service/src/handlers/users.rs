//! Org-scoped user management and the global user list.
//!
//! `:userId` path segments are identity-provider subject ids; membership
//! documents are keyed by them within an organization.

use axum::{
    extract::{Path, State},
    Json,
};
use futures::stream::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};

use crate::authz;
use crate::dtos::{
    AllUsersResponse, MessageResponse, OrgUsersResponse, RoleBreakdown, UpdateUserRoleRequest,
    UserBody, UserResponse, UsersByRole,
};
use crate::middleware::CurrentIdentity;
use crate::models::{MemberRole, Role};
use crate::startup::AppState;
use service_core::error::AppError;

/// GET /org/:id/users
pub async fn list_org_users(
    State(state): State<AppState>,
    Path(id): Path<String>,
    CurrentIdentity(identity): CurrentIdentity,
) -> Result<Json<OrgUsersResponse>, AppError> {
    authz::require_role(&identity, &[Role::Superadmin, Role::Admin])?;
    authz::require_org_access(&identity, &id)?;

    let find_options = FindOptions::builder()
        .sort(doc! { "created_at": -1 })
        .build();
    let mut cursor = state
        .db
        .memberships()
        .find(doc! { "org_id": &id }, find_options)
        .await?;

    let mut users = Vec::new();
    while let Some(membership) = cursor.try_next().await? {
        users.push(UserResponse::from(membership));
    }

    let total = users.len() as u64;
    Ok(Json(OrgUsersResponse {
        users,
        total,
        org_id: id,
    }))
}

/// GET /org/:id/users/:userId
pub async fn get_org_user(
    State(state): State<AppState>,
    Path((id, user_id)): Path<(String, String)>,
    CurrentIdentity(identity): CurrentIdentity,
) -> Result<Json<UserBody>, AppError> {
    authz::require_role(&identity, &[Role::Superadmin, Role::Admin])?;
    authz::require_org_access(&identity, &id)?;

    let membership = state
        .db
        .memberships()
        .find_one(doc! { "org_id": &id, "subject_id": &user_id }, None)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found in this organization")))?;

    Ok(Json(UserBody {
        user: membership.into(),
    }))
}

/// PATCH /org/:id/users/:userId
pub async fn update_org_user_role(
    State(state): State<AppState>,
    Path((id, user_id)): Path<(String, String)>,
    CurrentIdentity(identity): CurrentIdentity,
    Json(req): Json<UpdateUserRoleRequest>,
) -> Result<Json<UserBody>, AppError> {
    authz::require_role(&identity, &[Role::Superadmin, Role::Admin])?;
    authz::require_org_access(&identity, &id)?;

    let role: MemberRole = req
        .role
        .parse()
        .map_err(|e: String| AppError::BadRequest(anyhow::anyhow!(e)))?;

    let options = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build();
    let membership = state
        .db
        .memberships()
        .find_one_and_update(
            doc! { "org_id": &id, "subject_id": &user_id },
            doc! { "$set": { "role": role.as_str(), "updated_at": mongodb::bson::DateTime::now() } },
            options,
        )
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found in this organization")))?;

    tracing::info!(org_id = %id, subject = %user_id, role = %role, "Membership role updated");

    Ok(Json(UserBody {
        user: membership.into(),
    }))
}

/// DELETE /org/:id/users/:userId
pub async fn remove_org_user(
    State(state): State<AppState>,
    Path((id, user_id)): Path<(String, String)>,
    CurrentIdentity(identity): CurrentIdentity,
) -> Result<Json<MessageResponse>, AppError> {
    authz::require_role(&identity, &[Role::Superadmin, Role::Admin])?;
    authz::require_org_access(&identity, &id)?;

    let result = state
        .db
        .memberships()
        .delete_one(doc! { "org_id": &id, "subject_id": &user_id }, None)
        .await?;
    if result.deleted_count == 0 {
        return Err(AppError::NotFound(anyhow::anyhow!(
            "User not found in this organization"
        )));
    }

    tracing::info!(org_id = %id, subject = %user_id, "Membership removed");

    Ok(Json(MessageResponse {
        message: format!("User {} removed from organization", user_id),
    }))
}

/// GET /users
pub async fn list_all_users(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
) -> Result<Json<AllUsersResponse>, AppError> {
    authz::require_role(&identity, &[Role::Superadmin])?;

    let find_options = FindOptions::builder()
        .sort(doc! { "created_at": -1 })
        .build();
    let mut cursor = state.db.memberships().find(doc! {}, find_options).await?;

    let mut users = Vec::new();
    let mut admins = Vec::new();
    let mut members = Vec::new();
    while let Some(membership) = cursor.try_next().await? {
        let user = UserResponse::from(membership);
        match user.role {
            MemberRole::Admin => admins.push(user.clone()),
            MemberRole::Member => members.push(user.clone()),
        }
        users.push(user);
    }

    let total = users.len() as u64;
    let breakdown = RoleBreakdown {
        admin: admins.len() as u64,
        member: members.len() as u64,
    };

    Ok(Json(AllUsersResponse {
        users,
        total,
        breakdown,
        users_by_role: UsersByRole {
            admin: admins,
            member: members,
        },
    }))
}
