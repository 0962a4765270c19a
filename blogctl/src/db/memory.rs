//! In-memory store.
//!
//! Tables are arena-style maps keyed by surrogate id, with the many-to-many associations kept as
//! explicit join sets. Every write holds the single write guard for its whole check-then-insert,
//! which gives the same uniqueness guarantees as the postgres constraints.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::instrument;

use crate::db::errors::{DbError, Result};
use crate::db::models::{
    blogs::{BlogCreateDBRequest, BlogDBResponse, BlogFilter, BlogUpdateDBRequest},
    categories::{CategoryCreateDBRequest, CategoryDBResponse, CategoryUpdateDBRequest},
    permissions::{PermissionCreateDBRequest, PermissionDBResponse},
    roles::{RoleCreateDBRequest, RoleDBResponse, RoleUpdateDBRequest},
    series::{SeriesCreateDBRequest, SeriesDBResponse, SeriesUpdateDBRequest},
    users::{UserCreateDBRequest, UserDBResponse, UserUpdateDBRequest},
};
use crate::db::store::{BlogStore, CategoryStore, PermissionStore, RoleStore, SeriesStore, UserStore};
use crate::types::{BlogId, CategoryId, PermissionId, RoleId, SeriesId, UserId};

#[derive(Debug, Clone)]
struct UserRow {
    name: String,
    email: String,
    password_hash: String,
    about: Option<String>,
    immutable: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct RoleRow {
    name: String,
    immutable: bool,
}

#[derive(Debug, Clone)]
struct PermissionRow {
    name: String,
    immutable: bool,
}

#[derive(Debug, Clone)]
struct SeriesRow {
    title: String,
    description: Option<String>,
    author_id: UserId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct BlogRow {
    title: String,
    content: Value,
    author_id: UserId,
    series_id: Option<SeriesId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Last id handed out per table
#[derive(Debug, Default)]
struct Sequences {
    users: i64,
    roles: i64,
    permissions: i64,
    categories: i64,
    series: i64,
    blogs: i64,
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

#[derive(Debug, Default)]
struct Tables {
    sequences: Sequences,
    users: BTreeMap<UserId, UserRow>,
    roles: BTreeMap<RoleId, RoleRow>,
    permissions: BTreeMap<PermissionId, PermissionRow>,
    categories: BTreeMap<CategoryId, CategoryDBResponse>,
    series: BTreeMap<SeriesId, SeriesRow>,
    blogs: BTreeMap<BlogId, BlogRow>,
    user_roles: BTreeSet<(UserId, RoleId)>,
    role_permissions: BTreeSet<(RoleId, PermissionId)>,
    blog_categories: BTreeSet<(BlogId, CategoryId)>,
}

impl Tables {
    fn user_response(&self, id: UserId, row: &UserRow) -> UserDBResponse {
        UserDBResponse {
            id,
            name: row.name.clone(),
            email: row.email.clone(),
            password_hash: row.password_hash.clone(),
            about: row.about.clone(),
            immutable: row.immutable,
            role_ids: self
                .user_roles
                .range((id, RoleId::MIN)..=(id, RoleId::MAX))
                .map(|(_, role_id)| *role_id)
                .collect(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }

    fn role_response(&self, id: RoleId, row: &RoleRow) -> RoleDBResponse {
        RoleDBResponse {
            id,
            name: row.name.clone(),
            immutable: row.immutable,
            permission_ids: self
                .role_permissions
                .range((id, PermissionId::MIN)..=(id, PermissionId::MAX))
                .map(|(_, permission_id)| *permission_id)
                .collect(),
        }
    }

    fn blog_response(&self, id: BlogId, row: &BlogRow) -> BlogDBResponse {
        BlogDBResponse {
            id,
            title: row.title.clone(),
            content: row.content.clone(),
            author_id: row.author_id,
            category_ids: self
                .blog_categories
                .range((id, CategoryId::MIN)..=(id, CategoryId::MAX))
                .map(|(_, category_id)| *category_id)
                .collect(),
            series_id: row.series_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }

    fn email_taken(&self, email: &str, except: Option<UserId>) -> bool {
        self.users.iter().any(|(id, row)| row.email == email && Some(*id) != except)
    }

    fn role_name_taken(&self, name: &str, except: Option<RoleId>) -> bool {
        self.roles.iter().any(|(id, row)| row.name == name && Some(*id) != except)
    }

    fn permission_name_taken(&self, name: &str, except: Option<PermissionId>) -> bool {
        self.permissions.iter().any(|(id, row)| row.name == name && Some(*id) != except)
    }

    fn check_roles_exist(&self, role_ids: &[RoleId]) -> Result<()> {
        match role_ids.iter().find(|id| !self.roles.contains_key(id)) {
            Some(missing) => Err(DbError::foreign_key(
                "user_roles",
                "user_roles_role_id_fkey",
                format!("role {missing} does not exist"),
            )),
            None => Ok(()),
        }
    }

    fn check_permissions_exist(&self, permission_ids: &[PermissionId]) -> Result<()> {
        match permission_ids.iter().find(|id| !self.permissions.contains_key(id)) {
            Some(missing) => Err(DbError::foreign_key(
                "role_permissions",
                "role_permissions_permission_id_fkey",
                format!("permission {missing} does not exist"),
            )),
            None => Ok(()),
        }
    }

    fn check_categories_exist(&self, category_ids: &[CategoryId]) -> Result<()> {
        match category_ids.iter().find(|id| !self.categories.contains_key(id)) {
            Some(missing) => Err(DbError::foreign_key(
                "blog_categories",
                "blog_categories_category_id_fkey",
                format!("category {missing} does not exist"),
            )),
            None => Ok(()),
        }
    }

    fn check_series_exists(&self, series_id: Option<SeriesId>) -> Result<()> {
        match series_id {
            Some(id) if !self.series.contains_key(&id) => Err(DbError::foreign_key(
                "blogs",
                "blogs_series_id_fkey",
                format!("series {id} does not exist"),
            )),
            _ => Ok(()),
        }
    }

    fn set_role_permissions(&mut self, role_id: RoleId, permission_ids: &[PermissionId]) {
        self.role_permissions.retain(|(role, _)| *role != role_id);
        for permission_id in permission_ids {
            self.role_permissions.insert((role_id, *permission_id));
        }
    }

    fn set_blog_categories(&mut self, blog_id: BlogId, category_ids: &[CategoryId]) {
        self.blog_categories.retain(|(blog, _)| *blog != blog_id);
        for category_id in category_ids {
            self.blog_categories.insert((blog_id, *category_id));
        }
    }

    fn remove_blog(&mut self, blog_id: BlogId) -> bool {
        self.blog_categories.retain(|(blog, _)| *blog != blog_id);
        self.blogs.remove(&blog_id).is_some()
    }
}

/// Store backed by in-process tables.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    #[instrument(skip(self, request), fields(email = %request.email), err)]
    async fn create_user(&self, request: &UserCreateDBRequest) -> Result<UserDBResponse> {
        let mut tables = self.tables.write().await;
        if tables.email_taken(&request.email, None) {
            return Err(DbError::unique(
                "users",
                "users_email_key",
                format!("duplicate key value violates unique constraint: {}", request.email),
            ));
        }
        tables.check_roles_exist(&request.role_ids)?;

        let id = next_id(&mut tables.sequences.users);
        let now = Utc::now();
        let row = UserRow {
            name: request.name.clone(),
            email: request.email.clone(),
            password_hash: request.password_hash.clone(),
            about: request.about.clone(),
            immutable: request.immutable,
            created_at: now,
            updated_at: now,
        };
        for role_id in &request.role_ids {
            tables.user_roles.insert((id, *role_id));
        }
        let response = tables.user_response(id, &row);
        tables.users.insert(id, row);
        Ok(response)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<UserDBResponse>> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id).map(|row| tables.user_response(id, row)))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserDBResponse>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|(_, row)| row.email == email)
            .map(|(id, row)| tables.user_response(*id, row)))
    }

    async fn list_users(&self) -> Result<Vec<UserDBResponse>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().map(|(id, row)| tables.user_response(*id, row)).collect())
    }

    #[instrument(skip(self, request), err)]
    async fn update_user(&self, id: UserId, request: &UserUpdateDBRequest) -> Result<UserDBResponse> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&id) {
            return Err(DbError::NotFound);
        }
        if let Some(email) = &request.email
            && tables.email_taken(email, Some(id))
        {
            return Err(DbError::unique(
                "users",
                "users_email_key",
                format!("duplicate key value violates unique constraint: {email}"),
            ));
        }
        if let Some(role_ids) = &request.role_ids {
            tables.check_roles_exist(role_ids)?;
            tables.user_roles.retain(|(user, _)| *user != id);
            for role_id in role_ids {
                tables.user_roles.insert((id, *role_id));
            }
        }

        let row = tables.users.get_mut(&id).ok_or(DbError::NotFound)?;
        if let Some(name) = &request.name {
            row.name = name.clone();
        }
        if let Some(email) = &request.email {
            row.email = email.clone();
        }
        if let Some(password_hash) = &request.password_hash {
            row.password_hash = password_hash.clone();
        }
        if let Some(about) = &request.about {
            row.about = Some(about.clone());
        }
        row.updated_at = Utc::now();
        let row = row.clone();
        Ok(tables.user_response(id, &row))
    }

    #[instrument(skip(self), err)]
    async fn delete_user(&self, id: UserId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }
        tables.user_roles.retain(|(user, _)| *user != id);

        let owned_blogs: Vec<BlogId> = tables
            .blogs
            .iter()
            .filter(|(_, blog)| blog.author_id == id)
            .map(|(blog_id, _)| *blog_id)
            .collect();
        for blog_id in owned_blogs {
            tables.remove_blog(blog_id);
        }

        let owned_series: BTreeSet<SeriesId> = tables
            .series
            .iter()
            .filter(|(_, series)| series.author_id == id)
            .map(|(series_id, _)| *series_id)
            .collect();
        tables.series.retain(|series_id, _| !owned_series.contains(series_id));
        for blog in tables.blogs.values_mut() {
            if blog.series_id.is_some_and(|series_id| owned_series.contains(&series_id)) {
                blog.series_id = None;
            }
        }
        Ok(true)
    }

    async fn add_user_role(&self, user_id: UserId, role_id: RoleId) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user_id) {
            return Err(DbError::NotFound);
        }
        tables.check_roles_exist(&[role_id])?;
        tables.user_roles.insert((user_id, role_id));
        Ok(())
    }

    async fn remove_user_role(&self, user_id: UserId, role_id: RoleId) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.user_roles.remove(&(user_id, role_id));
        Ok(())
    }
}

#[async_trait]
impl RoleStore for MemoryStore {
    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create_role(&self, request: &RoleCreateDBRequest) -> Result<RoleDBResponse> {
        let mut tables = self.tables.write().await;
        if tables.role_name_taken(&request.name, None) {
            return Err(DbError::unique(
                "roles",
                "roles_name_key",
                format!("duplicate key value violates unique constraint: {}", request.name),
            ));
        }
        tables.check_permissions_exist(&request.permission_ids)?;

        let id = next_id(&mut tables.sequences.roles);
        let row = RoleRow {
            name: request.name.clone(),
            immutable: request.immutable,
        };
        tables.set_role_permissions(id, &request.permission_ids);
        let response = tables.role_response(id, &row);
        tables.roles.insert(id, row);
        Ok(response)
    }

    async fn get_role(&self, id: RoleId) -> Result<Option<RoleDBResponse>> {
        let tables = self.tables.read().await;
        Ok(tables.roles.get(&id).map(|row| tables.role_response(id, row)))
    }

    async fn find_role_by_name(&self, name: &str) -> Result<Option<RoleDBResponse>> {
        let tables = self.tables.read().await;
        Ok(tables
            .roles
            .iter()
            .find(|(_, row)| row.name == name)
            .map(|(id, row)| tables.role_response(*id, row)))
    }

    async fn get_roles(&self, ids: &[RoleId]) -> Result<Vec<RoleDBResponse>> {
        let tables = self.tables.read().await;
        let wanted: BTreeSet<RoleId> = ids.iter().copied().collect();
        Ok(wanted
            .into_iter()
            .filter_map(|id| tables.roles.get(&id).map(|row| tables.role_response(id, row)))
            .collect())
    }

    async fn list_roles(&self) -> Result<Vec<RoleDBResponse>> {
        let tables = self.tables.read().await;
        Ok(tables.roles.iter().map(|(id, row)| tables.role_response(*id, row)).collect())
    }

    #[instrument(skip(self, request), err)]
    async fn update_role(&self, id: RoleId, request: &RoleUpdateDBRequest) -> Result<RoleDBResponse> {
        let mut tables = self.tables.write().await;
        if !tables.roles.contains_key(&id) {
            return Err(DbError::NotFound);
        }
        if let Some(name) = &request.name
            && tables.role_name_taken(name, Some(id))
        {
            return Err(DbError::unique(
                "roles",
                "roles_name_key",
                format!("duplicate key value violates unique constraint: {name}"),
            ));
        }
        if let Some(permission_ids) = &request.permission_ids {
            tables.check_permissions_exist(permission_ids)?;
            tables.set_role_permissions(id, permission_ids);
        }
        let row = tables.roles.get_mut(&id).ok_or(DbError::NotFound)?;
        if let Some(name) = &request.name {
            row.name = name.clone();
        }
        let row = row.clone();
        Ok(tables.role_response(id, &row))
    }

    #[instrument(skip(self), err)]
    async fn delete_role(&self, id: RoleId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.roles.remove(&id).is_none() {
            return Ok(false);
        }
        tables.role_permissions.retain(|(role, _)| *role != id);
        tables.user_roles.retain(|(_, role)| *role != id);
        Ok(true)
    }

    #[instrument(skip(self, permission_ids), fields(count = permission_ids.len()), err)]
    async fn set_role_permissions(&self, role_id: RoleId, permission_ids: &[PermissionId]) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.roles.contains_key(&role_id) {
            return Err(DbError::NotFound);
        }
        tables.check_permissions_exist(permission_ids)?;
        tables.set_role_permissions(role_id, permission_ids);
        Ok(())
    }

    async fn add_role_permission(&self, role_id: RoleId, permission_id: PermissionId) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.roles.contains_key(&role_id) {
            return Err(DbError::NotFound);
        }
        tables.check_permissions_exist(&[permission_id])?;
        tables.role_permissions.insert((role_id, permission_id));
        Ok(())
    }

    async fn remove_role_permission(&self, role_id: RoleId, permission_id: PermissionId) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.role_permissions.remove(&(role_id, permission_id));
        Ok(())
    }

    async fn get_role_permissions(&self, role_id: RoleId) -> Result<Vec<PermissionDBResponse>> {
        let tables = self.tables.read().await;
        Ok(tables
            .role_permissions
            .range((role_id, PermissionId::MIN)..=(role_id, PermissionId::MAX))
            .filter_map(|(_, permission_id)| {
                tables.permissions.get(permission_id).map(|row| PermissionDBResponse {
                    id: *permission_id,
                    name: row.name.clone(),
                    immutable: row.immutable,
                })
            })
            .collect())
    }
}

fn permission_response(id: PermissionId, row: &PermissionRow) -> PermissionDBResponse {
    PermissionDBResponse {
        id,
        name: row.name.clone(),
        immutable: row.immutable,
    }
}

#[async_trait]
impl PermissionStore for MemoryStore {
    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create_permission(&self, request: &PermissionCreateDBRequest) -> Result<PermissionDBResponse> {
        let mut tables = self.tables.write().await;
        if tables.permission_name_taken(&request.name, None) {
            return Err(DbError::unique(
                "permissions",
                "permissions_name_key",
                format!("duplicate key value violates unique constraint: {}", request.name),
            ));
        }
        let id = next_id(&mut tables.sequences.permissions);
        let row = PermissionRow {
            name: request.name.clone(),
            immutable: request.immutable,
        };
        let response = permission_response(id, &row);
        tables.permissions.insert(id, row);
        Ok(response)
    }

    async fn get_permission(&self, id: PermissionId) -> Result<Option<PermissionDBResponse>> {
        let tables = self.tables.read().await;
        Ok(tables.permissions.get(&id).map(|row| permission_response(id, row)))
    }

    async fn find_permission_by_name(&self, name: &str) -> Result<Option<PermissionDBResponse>> {
        let tables = self.tables.read().await;
        Ok(tables
            .permissions
            .iter()
            .find(|(_, row)| row.name == name)
            .map(|(id, row)| permission_response(*id, row)))
    }

    async fn get_permissions(&self, ids: &[PermissionId]) -> Result<Vec<PermissionDBResponse>> {
        let tables = self.tables.read().await;
        let wanted: BTreeSet<PermissionId> = ids.iter().copied().collect();
        Ok(wanted
            .into_iter()
            .filter_map(|id| tables.permissions.get(&id).map(|row| permission_response(id, row)))
            .collect())
    }

    async fn list_permissions(&self) -> Result<Vec<PermissionDBResponse>> {
        let tables = self.tables.read().await;
        Ok(tables.permissions.iter().map(|(id, row)| permission_response(*id, row)).collect())
    }

    #[instrument(skip(self), err)]
    async fn rename_permission(&self, id: PermissionId, name: &str) -> Result<PermissionDBResponse> {
        let mut tables = self.tables.write().await;
        if tables.permission_name_taken(name, Some(id)) {
            return Err(DbError::unique(
                "permissions",
                "permissions_name_key",
                format!("duplicate key value violates unique constraint: {name}"),
            ));
        }
        let row = tables.permissions.get_mut(&id).ok_or(DbError::NotFound)?;
        row.name = name.to_string();
        Ok(permission_response(id, row))
    }

    #[instrument(skip(self), err)]
    async fn delete_permission(&self, id: PermissionId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.permissions.remove(&id).is_none() {
            return Ok(false);
        }
        tables.role_permissions.retain(|(_, permission)| *permission != id);
        Ok(true)
    }
}

#[async_trait]
impl CategoryStore for MemoryStore {
    async fn create_category(&self, request: &CategoryCreateDBRequest) -> Result<CategoryDBResponse> {
        let mut tables = self.tables.write().await;
        let id = next_id(&mut tables.sequences.categories);
        let category = CategoryDBResponse {
            id,
            title: request.title.clone(),
            description: request.description.clone(),
        };
        tables.categories.insert(id, category.clone());
        Ok(category)
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<CategoryDBResponse>> {
        Ok(self.tables.read().await.categories.get(&id).cloned())
    }

    async fn get_categories(&self, ids: &[CategoryId]) -> Result<Vec<CategoryDBResponse>> {
        let tables = self.tables.read().await;
        let wanted: BTreeSet<CategoryId> = ids.iter().copied().collect();
        Ok(wanted.into_iter().filter_map(|id| tables.categories.get(&id).cloned()).collect())
    }

    async fn list_categories(&self) -> Result<Vec<CategoryDBResponse>> {
        Ok(self.tables.read().await.categories.values().cloned().collect())
    }

    async fn update_category(&self, id: CategoryId, request: &CategoryUpdateDBRequest) -> Result<CategoryDBResponse> {
        let mut tables = self.tables.write().await;
        let category = tables.categories.get_mut(&id).ok_or(DbError::NotFound)?;
        if let Some(title) = &request.title {
            category.title = title.clone();
        }
        if let Some(description) = &request.description {
            category.description = Some(description.clone());
        }
        Ok(category.clone())
    }

    async fn delete_category(&self, id: CategoryId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.categories.remove(&id).is_none() {
            return Ok(false);
        }
        tables.blog_categories.retain(|(_, category)| *category != id);
        Ok(true)
    }
}

fn series_response(id: SeriesId, row: &SeriesRow) -> SeriesDBResponse {
    SeriesDBResponse {
        id,
        title: row.title.clone(),
        description: row.description.clone(),
        author_id: row.author_id,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

#[async_trait]
impl SeriesStore for MemoryStore {
    async fn create_series(&self, request: &SeriesCreateDBRequest) -> Result<SeriesDBResponse> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&request.author_id) {
            return Err(DbError::foreign_key(
                "series",
                "series_author_id_fkey",
                format!("user {} does not exist", request.author_id),
            ));
        }
        let id = next_id(&mut tables.sequences.series);
        let now = Utc::now();
        let row = SeriesRow {
            title: request.title.clone(),
            description: request.description.clone(),
            author_id: request.author_id,
            created_at: now,
            updated_at: now,
        };
        let response = series_response(id, &row);
        tables.series.insert(id, row);
        Ok(response)
    }

    async fn get_series(&self, id: SeriesId) -> Result<Option<SeriesDBResponse>> {
        let tables = self.tables.read().await;
        Ok(tables.series.get(&id).map(|row| series_response(id, row)))
    }

    async fn list_series(&self, author_id: Option<UserId>) -> Result<Vec<SeriesDBResponse>> {
        let tables = self.tables.read().await;
        Ok(tables
            .series
            .iter()
            .filter(|(_, row)| author_id.is_none_or(|author| row.author_id == author))
            .map(|(id, row)| series_response(*id, row))
            .collect())
    }

    async fn update_series(&self, id: SeriesId, request: &SeriesUpdateDBRequest) -> Result<SeriesDBResponse> {
        let mut tables = self.tables.write().await;
        let row = tables.series.get_mut(&id).ok_or(DbError::NotFound)?;
        if let Some(title) = &request.title {
            row.title = title.clone();
        }
        if let Some(description) = &request.description {
            row.description = Some(description.clone());
        }
        row.updated_at = Utc::now();
        Ok(series_response(id, row))
    }

    async fn delete_series(&self, id: SeriesId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.series.remove(&id).is_none() {
            return Ok(false);
        }
        for blog in tables.blogs.values_mut() {
            if blog.series_id == Some(id) {
                blog.series_id = None;
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl BlogStore for MemoryStore {
    async fn create_blog(&self, request: &BlogCreateDBRequest) -> Result<BlogDBResponse> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&request.author_id) {
            return Err(DbError::foreign_key(
                "blogs",
                "blogs_author_id_fkey",
                format!("user {} does not exist", request.author_id),
            ));
        }
        tables.check_categories_exist(&request.category_ids)?;
        tables.check_series_exists(request.series_id)?;

        let id = next_id(&mut tables.sequences.blogs);
        let now = Utc::now();
        let row = BlogRow {
            title: request.title.clone(),
            content: request.content.clone(),
            author_id: request.author_id,
            series_id: request.series_id,
            created_at: now,
            updated_at: now,
        };
        tables.set_blog_categories(id, &request.category_ids);
        let response = tables.blog_response(id, &row);
        tables.blogs.insert(id, row);
        Ok(response)
    }

    async fn get_blog(&self, id: BlogId) -> Result<Option<BlogDBResponse>> {
        let tables = self.tables.read().await;
        Ok(tables.blogs.get(&id).map(|row| tables.blog_response(id, row)))
    }

    async fn list_blogs(&self, filter: &BlogFilter) -> Result<Vec<BlogDBResponse>> {
        let tables = self.tables.read().await;
        Ok(tables
            .blogs
            .iter()
            .filter(|(_, row)| filter.author_id.is_none_or(|author| row.author_id == author))
            .filter(|(_, row)| filter.series_id.is_none_or(|series| row.series_id == Some(series)))
            .filter(|(id, _)| {
                filter
                    .category_id
                    .is_none_or(|category| tables.blog_categories.contains(&(**id, category)))
            })
            .map(|(id, row)| tables.blog_response(*id, row))
            .collect())
    }

    async fn update_blog(&self, id: BlogId, request: &BlogUpdateDBRequest) -> Result<BlogDBResponse> {
        let mut tables = self.tables.write().await;
        if !tables.blogs.contains_key(&id) {
            return Err(DbError::NotFound);
        }
        if let Some(category_ids) = &request.category_ids {
            tables.check_categories_exist(category_ids)?;
        }
        tables.check_series_exists(request.series_id)?;
        if let Some(category_ids) = &request.category_ids {
            tables.set_blog_categories(id, category_ids);
        }

        let row = tables.blogs.get_mut(&id).ok_or(DbError::NotFound)?;
        if let Some(title) = &request.title {
            row.title = title.clone();
        }
        if let Some(content) = &request.content {
            row.content = content.clone();
        }
        if let Some(series_id) = request.series_id {
            row.series_id = Some(series_id);
        }
        row.updated_at = Utc::now();
        let row = row.clone();
        Ok(tables.blog_response(id, &row))
    }

    async fn delete_blog(&self, id: BlogId) -> Result<bool> {
        Ok(self.tables.write().await.remove_blog(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user_request(email: &str, role_ids: Vec<RoleId>) -> UserCreateDBRequest {
        UserCreateDBRequest {
            name: "Test User".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            about: None,
            immutable: false,
            role_ids,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_is_unique_violation() {
        let store = MemoryStore::new();
        store.create_user(&user_request("a@x.com", vec![])).await.unwrap();

        let err = store.create_user(&user_request("a@x.com", vec![])).await.unwrap_err();
        assert!(err.is_unique_violation());
        assert_eq!(store.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_role_permission_join_round_trip() {
        let store = MemoryStore::new();
        let view = store
            .create_permission(&PermissionCreateDBRequest {
                name: "VIEW_BLOG".to_string(),
                immutable: true,
            })
            .await
            .unwrap();
        let create = store
            .create_permission(&PermissionCreateDBRequest {
                name: "CREATE_BLOG".to_string(),
                immutable: true,
            })
            .await
            .unwrap();
        let role = store
            .create_role(&RoleCreateDBRequest {
                name: "EDITOR".to_string(),
                immutable: false,
                permission_ids: vec![view.id],
            })
            .await
            .unwrap();
        assert_eq!(role.permission_ids, vec![view.id]);

        store.add_role_permission(role.id, create.id).await.unwrap();
        let names: Vec<String> = store
            .get_role_permissions(role.id)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["VIEW_BLOG".to_string(), "CREATE_BLOG".to_string()]);

        store.set_role_permissions(role.id, &[create.id]).await.unwrap();
        let role = store.get_role(role.id).await.unwrap().unwrap();
        assert_eq!(role.permission_ids, vec![create.id]);
    }

    #[tokio::test]
    async fn test_unknown_role_is_foreign_key_violation() {
        let store = MemoryStore::new();
        let err = store.create_user(&user_request("a@x.com", vec![42])).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
        assert!(store.find_user_by_email("a@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_deleting_user_removes_their_content() {
        let store = MemoryStore::new();
        let author = store.create_user(&user_request("a@x.com", vec![])).await.unwrap();
        let other = store.create_user(&user_request("b@x.com", vec![])).await.unwrap();
        let series = store
            .create_series(&SeriesCreateDBRequest {
                title: "Rust".to_string(),
                description: None,
                author_id: author.id,
            })
            .await
            .unwrap();
        store
            .create_blog(&BlogCreateDBRequest {
                title: "Ownership".to_string(),
                content: json!({"body": "..."}),
                author_id: author.id,
                category_ids: vec![],
                series_id: Some(series.id),
            })
            .await
            .unwrap();
        let surviving = store
            .create_blog(&BlogCreateDBRequest {
                title: "Borrowing".to_string(),
                content: json!({"body": "..."}),
                author_id: other.id,
                category_ids: vec![],
                series_id: Some(series.id),
            })
            .await
            .unwrap();

        assert!(store.delete_user(author.id).await.unwrap());

        let blogs = store.list_blogs(&BlogFilter::default()).await.unwrap();
        assert_eq!(blogs.len(), 1);
        assert_eq!(blogs[0].id, surviving.id);
        assert_eq!(blogs[0].series_id, None);
        assert!(store.get_series(series.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_blog_filters() {
        let store = MemoryStore::new();
        let author = store.create_user(&user_request("a@x.com", vec![])).await.unwrap();
        let rust = store
            .create_category(&CategoryCreateDBRequest {
                title: "Rust".to_string(),
                description: None,
            })
            .await
            .unwrap();
        let tagged = store
            .create_blog(&BlogCreateDBRequest {
                title: "Tagged".to_string(),
                content: json!({}),
                author_id: author.id,
                category_ids: vec![rust.id],
                series_id: None,
            })
            .await
            .unwrap();
        store
            .create_blog(&BlogCreateDBRequest {
                title: "Untagged".to_string(),
                content: json!({}),
                author_id: author.id,
                category_ids: vec![],
                series_id: None,
            })
            .await
            .unwrap();

        let by_category = store
            .list_blogs(&BlogFilter {
                category_id: Some(rust.id),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_category.len(), 1);
        assert_eq!(by_category[0].id, tagged.id);

        let by_author = store
            .list_blogs(&BlogFilter {
                author_id: Some(author.id),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_author.len(), 2);
    }
}
