//! Organization CRUD and invitation handlers.
//!
//! Each handler opens with its authorization policy: the role allow-list
//! first, then the org-scope check where the route is org-scoped.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use futures::stream::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use validator::Validate;

use crate::authz;
use crate::dtos::{
    CreateOrganizationRequest, InviteRequest, MessageResponse, OrganizationBody,
    OrganizationListResponse, OrganizationResponse, UpdateOrganizationRequest,
};
use crate::middleware::CurrentIdentity;
use crate::models::{MemberRole, Organization, Role};
use crate::startup::AppState;
use service_core::error::AppError;

/// GET /org
pub async fn list_organizations(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
) -> Result<Json<OrganizationListResponse>, AppError> {
    authz::require_role(&identity, &[Role::Superadmin])?;

    let find_options = FindOptions::builder()
        .sort(doc! { "created_at": -1 })
        .build();
    let mut cursor = state
        .db
        .organizations()
        .find(doc! {}, find_options)
        .await?;

    let mut organizations = Vec::new();
    while let Some(org) = cursor.try_next().await? {
        organizations.push(OrganizationResponse::from(org));
    }

    let total = organizations.len() as u64;
    Ok(Json(OrganizationListResponse {
        organizations,
        total,
    }))
}

/// GET /org/:id
pub async fn get_organization(
    State(state): State<AppState>,
    Path(id): Path<String>,
    CurrentIdentity(identity): CurrentIdentity,
) -> Result<Json<OrganizationBody>, AppError> {
    authz::require_role(&identity, &[Role::Superadmin, Role::Admin, Role::Member])?;
    authz::require_org_access(&identity, &id)?;

    let organization = state
        .db
        .organizations()
        .find_one(doc! { "_id": &id }, None)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Organization not found")))?;

    Ok(Json(OrganizationBody {
        organization: organization.into(),
    }))
}

/// POST /org
///
/// Persists the organization, then asks the identity provider to invite its
/// first admin. An organization nobody can administer is useless, so a failed
/// invitation rolls the insert back before the error is returned.
pub async fn create_organization(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    Json(req): Json<CreateOrganizationRequest>,
) -> Result<(StatusCode, Json<OrganizationBody>), AppError> {
    authz::require_role(&identity, &[Role::Superadmin])?;
    req.validate()?;

    let organization = Organization::new(req.name);
    state
        .db
        .organizations()
        .insert_one(&organization, None)
        .await?;

    if let Err(err) = state
        .invitations
        .send_invitation(&req.admin_email, &organization.id, MemberRole::Admin)
        .await
    {
        tracing::warn!(
            org_id = %organization.id,
            "Rolling back organization after failed admin invitation"
        );
        state
            .db
            .organizations()
            .delete_one(doc! { "_id": &organization.id }, None)
            .await?;
        return Err(err);
    }

    tracing::info!(org_id = %organization.id, name = %organization.name, "Organization created");

    Ok((
        StatusCode::CREATED,
        Json(OrganizationBody {
            organization: organization.into(),
        }),
    ))
}

/// PATCH /org/:id
pub async fn update_organization(
    State(state): State<AppState>,
    Path(id): Path<String>,
    CurrentIdentity(identity): CurrentIdentity,
    Json(req): Json<UpdateOrganizationRequest>,
) -> Result<Json<OrganizationBody>, AppError> {
    authz::require_role(&identity, &[Role::Superadmin])?;
    req.validate()?;

    let name = req
        .name
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("name is required")))?;

    let options = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build();
    let organization = state
        .db
        .organizations()
        .find_one_and_update(
            doc! { "_id": &id },
            doc! { "$set": { "name": &name, "updated_at": mongodb::bson::DateTime::now() } },
            options,
        )
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Organization not found")))?;

    Ok(Json(OrganizationBody {
        organization: organization.into(),
    }))
}

/// DELETE /org/:id
pub async fn delete_organization(
    State(state): State<AppState>,
    Path(id): Path<String>,
    CurrentIdentity(identity): CurrentIdentity,
) -> Result<Json<MessageResponse>, AppError> {
    authz::require_role(&identity, &[Role::Superadmin])?;

    let result = state
        .db
        .organizations()
        .delete_one(doc! { "_id": &id }, None)
        .await?;
    if result.deleted_count == 0 {
        return Err(AppError::NotFound(anyhow::anyhow!("Organization not found")));
    }

    // Memberships go second; a crash in between leaves orphaned memberships
    // rather than an organization whose members were already removed.
    let removed = state.db.delete_org_memberships(&id).await?;
    tracing::info!(org_id = %id, memberships_removed = removed, "Organization deleted");

    Ok(Json(MessageResponse {
        message: format!("Organization deleted along with {} member(s)", removed),
    }))
}

/// POST /org/:id/invite
pub async fn invite_admin(
    State(state): State<AppState>,
    Path(id): Path<String>,
    CurrentIdentity(identity): CurrentIdentity,
    Json(req): Json<InviteRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    authz::require_role(&identity, &[Role::Superadmin])?;
    req.validate()?;

    ensure_org_exists(&state, &id).await?;
    state
        .invitations
        .send_invitation(&req.email, &id, MemberRole::Admin)
        .await?;

    Ok(Json(MessageResponse {
        message: format!("Admin invitation sent to {}", req.email),
    }))
}

/// POST /org/:id/invite-member
pub async fn invite_member(
    State(state): State<AppState>,
    Path(id): Path<String>,
    CurrentIdentity(identity): CurrentIdentity,
    Json(req): Json<InviteRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    authz::require_role(&identity, &[Role::Admin])?;
    authz::require_org_access(&identity, &id)?;
    req.validate()?;

    ensure_org_exists(&state, &id).await?;
    state
        .invitations
        .send_invitation(&req.email, &id, MemberRole::Member)
        .await?;

    Ok(Json(MessageResponse {
        message: format!("Member invitation sent to {}", req.email),
    }))
}

async fn ensure_org_exists(state: &AppState, id: &str) -> Result<(), AppError> {
    state
        .db
        .organizations()
        .find_one(doc! { "_id": id }, None)
        .await?
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Organization not found")))
}
