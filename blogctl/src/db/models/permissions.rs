//! Database models for permissions.

use crate::db::models::Protected;
use crate::types::PermissionId;

#[derive(Debug, Clone)]
pub struct PermissionCreateDBRequest {
    pub name: String,
    pub immutable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionDBResponse {
    pub id: PermissionId,
    pub name: String,
    pub immutable: bool,
}

impl Protected for PermissionDBResponse {
    const ENTITY: &'static str = "permission";

    fn is_immutable(&self) -> bool {
        self.immutable
    }
}
