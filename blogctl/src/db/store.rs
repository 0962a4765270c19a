//! Storage traits for the credential graph and published content.
//!
//! A store is the data access layer behind the API: handlers never touch SQL directly, they go
//! through these traits. Lookups return `Ok(None)` on a miss and reserve errors for actual
//! storage failures or constraint violations.
//!
//! Two implementations exist:
//!
//! - [`crate::db::postgres::PgStore`]: production storage over a `sqlx` pool
//! - [`crate::db::memory::MemoryStore`]: arena tables behind a lock, used in tests and for
//!   throwaway instances
//!
//! Uniqueness of user emails, role names and permission names is enforced by the store itself
//! and reported as [`DbError::UniqueViolation`](crate::db::errors::DbError::UniqueViolation), so
//! two racing creations with the same key cannot both succeed.

use async_trait::async_trait;

use crate::db::errors::Result;
use crate::db::models::{
    blogs::{BlogCreateDBRequest, BlogDBResponse, BlogFilter, BlogUpdateDBRequest},
    categories::{CategoryCreateDBRequest, CategoryDBResponse, CategoryUpdateDBRequest},
    permissions::{PermissionCreateDBRequest, PermissionDBResponse},
    roles::{RoleCreateDBRequest, RoleDBResponse, RoleUpdateDBRequest},
    series::{SeriesCreateDBRequest, SeriesDBResponse, SeriesUpdateDBRequest},
    users::{UserCreateDBRequest, UserDBResponse, UserUpdateDBRequest},
};
use crate::types::{BlogId, CategoryId, PermissionId, RoleId, SeriesId, UserId};

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, request: &UserCreateDBRequest) -> Result<UserDBResponse>;

    async fn get_user(&self, id: UserId) -> Result<Option<UserDBResponse>>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserDBResponse>>;

    async fn list_users(&self) -> Result<Vec<UserDBResponse>>;

    /// Fails with `NotFound` if the user does not exist
    async fn update_user(&self, id: UserId, request: &UserUpdateDBRequest) -> Result<UserDBResponse>;

    /// Deletes the user along with their series and blogs. Returns false if nothing was deleted.
    async fn delete_user(&self, id: UserId) -> Result<bool>;

    /// Idempotent: assigning a role the user already has is a no-op
    async fn add_user_role(&self, user_id: UserId, role_id: RoleId) -> Result<()>;

    async fn remove_user_role(&self, user_id: UserId, role_id: RoleId) -> Result<()>;
}

#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn create_role(&self, request: &RoleCreateDBRequest) -> Result<RoleDBResponse>;

    async fn get_role(&self, id: RoleId) -> Result<Option<RoleDBResponse>>;

    async fn find_role_by_name(&self, name: &str) -> Result<Option<RoleDBResponse>>;

    /// Fetch the subset of `ids` that exist
    async fn get_roles(&self, ids: &[RoleId]) -> Result<Vec<RoleDBResponse>>;

    async fn list_roles(&self) -> Result<Vec<RoleDBResponse>>;

    async fn update_role(&self, id: RoleId, request: &RoleUpdateDBRequest) -> Result<RoleDBResponse>;

    async fn delete_role(&self, id: RoleId) -> Result<bool>;

    /// Replace the role's permission set wholesale
    async fn set_role_permissions(&self, role_id: RoleId, permission_ids: &[PermissionId]) -> Result<()>;

    async fn add_role_permission(&self, role_id: RoleId, permission_id: PermissionId) -> Result<()>;

    async fn remove_role_permission(&self, role_id: RoleId, permission_id: PermissionId) -> Result<()>;

    async fn get_role_permissions(&self, role_id: RoleId) -> Result<Vec<PermissionDBResponse>>;
}

#[async_trait]
pub trait PermissionStore: Send + Sync {
    async fn create_permission(&self, request: &PermissionCreateDBRequest) -> Result<PermissionDBResponse>;

    async fn get_permission(&self, id: PermissionId) -> Result<Option<PermissionDBResponse>>;

    async fn find_permission_by_name(&self, name: &str) -> Result<Option<PermissionDBResponse>>;

    /// Fetch the subset of `ids` that exist
    async fn get_permissions(&self, ids: &[PermissionId]) -> Result<Vec<PermissionDBResponse>>;

    async fn list_permissions(&self) -> Result<Vec<PermissionDBResponse>>;

    async fn rename_permission(&self, id: PermissionId, name: &str) -> Result<PermissionDBResponse>;

    async fn delete_permission(&self, id: PermissionId) -> Result<bool>;
}

#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn create_category(&self, request: &CategoryCreateDBRequest) -> Result<CategoryDBResponse>;

    async fn get_category(&self, id: CategoryId) -> Result<Option<CategoryDBResponse>>;

    /// Fetch the subset of `ids` that exist
    async fn get_categories(&self, ids: &[CategoryId]) -> Result<Vec<CategoryDBResponse>>;

    async fn list_categories(&self) -> Result<Vec<CategoryDBResponse>>;

    async fn update_category(&self, id: CategoryId, request: &CategoryUpdateDBRequest) -> Result<CategoryDBResponse>;

    async fn delete_category(&self, id: CategoryId) -> Result<bool>;
}

#[async_trait]
pub trait SeriesStore: Send + Sync {
    async fn create_series(&self, request: &SeriesCreateDBRequest) -> Result<SeriesDBResponse>;

    async fn get_series(&self, id: SeriesId) -> Result<Option<SeriesDBResponse>>;

    async fn list_series(&self, author_id: Option<UserId>) -> Result<Vec<SeriesDBResponse>>;

    async fn update_series(&self, id: SeriesId, request: &SeriesUpdateDBRequest) -> Result<SeriesDBResponse>;

    /// Deletes the series and detaches its blogs
    async fn delete_series(&self, id: SeriesId) -> Result<bool>;
}

#[async_trait]
pub trait BlogStore: Send + Sync {
    async fn create_blog(&self, request: &BlogCreateDBRequest) -> Result<BlogDBResponse>;

    async fn get_blog(&self, id: BlogId) -> Result<Option<BlogDBResponse>>;

    async fn list_blogs(&self, filter: &BlogFilter) -> Result<Vec<BlogDBResponse>>;

    async fn update_blog(&self, id: BlogId, request: &BlogUpdateDBRequest) -> Result<BlogDBResponse>;

    async fn delete_blog(&self, id: BlogId) -> Result<bool>;
}

/// Everything the application needs from storage.
pub trait Store: UserStore + RoleStore + PermissionStore + CategoryStore + SeriesStore + BlogStore {}

impl<T> Store for T where T: UserStore + RoleStore + PermissionStore + CategoryStore + SeriesStore + BlogStore {}
