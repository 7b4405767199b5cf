use serde::Serialize;

pub mod orgs;
pub mod users;

pub use orgs::{
    CreateOrganizationRequest, InviteRequest, OrganizationBody, OrganizationListResponse,
    OrganizationResponse, UpdateOrganizationRequest,
};
pub use users::{
    AllUsersResponse, OrgUsersResponse, RoleBreakdown, UpdateUserRoleRequest, UserBody,
    UserResponse, UsersByRole,
};

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
