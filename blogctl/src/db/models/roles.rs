//! Database models for roles.

use crate::db::models::Protected;
use crate::types::{PermissionId, RoleId};

#[derive(Debug, Clone)]
pub struct RoleCreateDBRequest {
    pub name: String,
    pub immutable: bool,
    pub permission_ids: Vec<PermissionId>,
}

/// `permission_ids`, when present, replaces the role's whole permission set.
#[derive(Debug, Clone, Default)]
pub struct RoleUpdateDBRequest {
    pub name: Option<String>,
    pub permission_ids: Option<Vec<PermissionId>>,
}

#[derive(Debug, Clone)]
pub struct RoleDBResponse {
    pub id: RoleId,
    pub name: String,
    pub immutable: bool,
    pub permission_ids: Vec<PermissionId>,
}

impl Protected for RoleDBResponse {
    const ENTITY: &'static str = "role";

    fn is_immutable(&self) -> bool {
        self.immutable
    }
}
