use async_trait::async_trait;
use sqlx::FromRow;
use tracing::instrument;

use super::PgStore;
use crate::db::errors::{DbError, Result};
use crate::db::models::{
    permissions::{PermissionCreateDBRequest, PermissionDBResponse},
    roles::{RoleCreateDBRequest, RoleDBResponse, RoleUpdateDBRequest},
};
use crate::db::store::{PermissionStore, RoleStore};
use crate::types::{PermissionId, RoleId};

const SELECT_ROLES: &str = r#"
    SELECT r.id, r.name, r.immutable,
           COALESCE(ARRAY_AGG(rp.permission_id ORDER BY rp.permission_id) FILTER (WHERE rp.permission_id IS NOT NULL), '{}') AS permission_ids
    FROM roles r
    LEFT JOIN role_permissions rp ON rp.role_id = r.id
"#;

#[derive(Debug, FromRow)]
struct Role {
    id: RoleId,
    name: String,
    immutable: bool,
    permission_ids: Vec<PermissionId>,
}

impl From<Role> for RoleDBResponse {
    fn from(role: Role) -> Self {
        Self {
            id: role.id,
            name: role.name,
            immutable: role.immutable,
            permission_ids: role.permission_ids,
        }
    }
}

#[derive(Debug, FromRow)]
struct Permission {
    id: PermissionId,
    name: String,
    immutable: bool,
}

impl From<Permission> for PermissionDBResponse {
    fn from(permission: Permission) -> Self {
        Self {
            id: permission.id,
            name: permission.name,
            immutable: permission.immutable,
        }
    }
}

async fn fetch_role<'e, E>(executor: E, id: RoleId) -> Result<Option<RoleDBResponse>>
where
    E: sqlx::PgExecutor<'e>,
{
    let role = sqlx::query_as::<_, Role>(&format!("{SELECT_ROLES} WHERE r.id = $1 GROUP BY r.id"))
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(role.map(RoleDBResponse::from))
}

async fn replace_permissions(conn: &mut sqlx::PgConnection, role_id: RoleId, permission_ids: &[PermissionId]) -> Result<()> {
    sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
        .bind(role_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("INSERT INTO role_permissions (role_id, permission_id) SELECT $1, UNNEST($2::BIGINT[]) ON CONFLICT DO NOTHING")
        .bind(role_id)
        .bind(permission_ids)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[async_trait]
impl RoleStore for PgStore {
    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create_role(&self, request: &RoleCreateDBRequest) -> Result<RoleDBResponse> {
        let mut tx = self.pool.begin().await?;
        let id: RoleId = sqlx::query_scalar("INSERT INTO roles (name, immutable) VALUES ($1, $2) RETURNING id")
            .bind(&request.name)
            .bind(request.immutable)
            .fetch_one(&mut *tx)
            .await?;
        replace_permissions(&mut tx, id, &request.permission_ids).await?;
        let role = fetch_role(&mut *tx, id).await?.ok_or(DbError::NotFound)?;
        tx.commit().await?;
        Ok(role)
    }

    #[instrument(skip(self), err)]
    async fn get_role(&self, id: RoleId) -> Result<Option<RoleDBResponse>> {
        fetch_role(&self.pool, id).await
    }

    #[instrument(skip(self), err)]
    async fn find_role_by_name(&self, name: &str) -> Result<Option<RoleDBResponse>> {
        let role = sqlx::query_as::<_, Role>(&format!("{SELECT_ROLES} WHERE r.name = $1 GROUP BY r.id"))
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(role.map(RoleDBResponse::from))
    }

    #[instrument(skip(self), err)]
    async fn get_roles(&self, ids: &[RoleId]) -> Result<Vec<RoleDBResponse>> {
        let roles = sqlx::query_as::<_, Role>(&format!("{SELECT_ROLES} WHERE r.id = ANY($1) GROUP BY r.id ORDER BY r.id"))
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(roles.into_iter().map(RoleDBResponse::from).collect())
    }

    #[instrument(skip(self), err)]
    async fn list_roles(&self) -> Result<Vec<RoleDBResponse>> {
        let roles = sqlx::query_as::<_, Role>(&format!("{SELECT_ROLES} GROUP BY r.id ORDER BY r.id"))
            .fetch_all(&self.pool)
            .await?;
        Ok(roles.into_iter().map(RoleDBResponse::from).collect())
    }

    #[instrument(skip(self, request), err)]
    async fn update_role(&self, id: RoleId, request: &RoleUpdateDBRequest) -> Result<RoleDBResponse> {
        let mut tx = self.pool.begin().await?;
        let updated: Option<RoleId> = sqlx::query_scalar("UPDATE roles SET name = COALESCE($2, name) WHERE id = $1 RETURNING id")
            .bind(id)
            .bind(&request.name)
            .fetch_optional(&mut *tx)
            .await?;
        if updated.is_none() {
            return Err(DbError::NotFound);
        }
        if let Some(permission_ids) = &request.permission_ids {
            replace_permissions(&mut tx, id, permission_ids).await?;
        }
        let role = fetch_role(&mut *tx, id).await?.ok_or(DbError::NotFound)?;
        tx.commit().await?;
        Ok(role)
    }

    #[instrument(skip(self), err)]
    async fn delete_role(&self, id: RoleId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM roles WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, permission_ids), fields(count = permission_ids.len()), err)]
    async fn set_role_permissions(&self, role_id: RoleId, permission_ids: &[PermissionId]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let exists: Option<RoleId> = sqlx::query_scalar("SELECT id FROM roles WHERE id = $1 FOR UPDATE")
            .bind(role_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(DbError::NotFound);
        }
        replace_permissions(&mut tx, role_id, permission_ids).await?;
        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn add_role_permission(&self, role_id: RoleId, permission_id: PermissionId) -> Result<()> {
        sqlx::query("INSERT INTO role_permissions (role_id, permission_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(role_id)
            .bind(permission_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn remove_role_permission(&self, role_id: RoleId, permission_id: PermissionId) -> Result<()> {
        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1 AND permission_id = $2")
            .bind(role_id)
            .bind(permission_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn get_role_permissions(&self, role_id: RoleId) -> Result<Vec<PermissionDBResponse>> {
        let permissions = sqlx::query_as::<_, Permission>(
            r#"
            SELECT p.id, p.name, p.immutable
            FROM permissions p
            JOIN role_permissions rp ON rp.permission_id = p.id
            WHERE rp.role_id = $1
            ORDER BY p.id
            "#,
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(permissions.into_iter().map(PermissionDBResponse::from).collect())
    }
}

#[async_trait]
impl PermissionStore for PgStore {
    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create_permission(&self, request: &PermissionCreateDBRequest) -> Result<PermissionDBResponse> {
        let permission = sqlx::query_as::<_, Permission>(
            "INSERT INTO permissions (name, immutable) VALUES ($1, $2) RETURNING id, name, immutable",
        )
        .bind(&request.name)
        .bind(request.immutable)
        .fetch_one(&self.pool)
        .await?;
        Ok(permission.into())
    }

    #[instrument(skip(self), err)]
    async fn get_permission(&self, id: PermissionId) -> Result<Option<PermissionDBResponse>> {
        let permission = sqlx::query_as::<_, Permission>("SELECT id, name, immutable FROM permissions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(permission.map(PermissionDBResponse::from))
    }

    #[instrument(skip(self), err)]
    async fn find_permission_by_name(&self, name: &str) -> Result<Option<PermissionDBResponse>> {
        let permission = sqlx::query_as::<_, Permission>("SELECT id, name, immutable FROM permissions WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(permission.map(PermissionDBResponse::from))
    }

    #[instrument(skip(self), err)]
    async fn get_permissions(&self, ids: &[PermissionId]) -> Result<Vec<PermissionDBResponse>> {
        let permissions = sqlx::query_as::<_, Permission>("SELECT id, name, immutable FROM permissions WHERE id = ANY($1) ORDER BY id")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(permissions.into_iter().map(PermissionDBResponse::from).collect())
    }

    #[instrument(skip(self), err)]
    async fn list_permissions(&self) -> Result<Vec<PermissionDBResponse>> {
        let permissions = sqlx::query_as::<_, Permission>("SELECT id, name, immutable FROM permissions ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(permissions.into_iter().map(PermissionDBResponse::from).collect())
    }

    #[instrument(skip(self), err)]
    async fn rename_permission(&self, id: PermissionId, name: &str) -> Result<PermissionDBResponse> {
        let permission = sqlx::query_as::<_, Permission>("UPDATE permissions SET name = $2 WHERE id = $1 RETURNING id, name, immutable")
            .bind(id)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        permission.map(PermissionDBResponse::from).ok_or(DbError::NotFound)
    }

    #[instrument(skip(self), err)]
    async fn delete_permission(&self, id: PermissionId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM permissions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
