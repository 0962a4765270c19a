use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use tracing::instrument;

use super::PgStore;
use crate::db::errors::{DbError, Result};
use crate::db::models::users::{UserCreateDBRequest, UserDBResponse, UserUpdateDBRequest};
use crate::db::store::UserStore;
use crate::types::{RoleId, UserId};

const SELECT_USERS: &str = r#"
    SELECT u.id, u.name, u.email, u.password_hash, u.about, u.immutable, u.created_at, u.updated_at,
           COALESCE(ARRAY_AGG(ur.role_id ORDER BY ur.role_id) FILTER (WHERE ur.role_id IS NOT NULL), '{}') AS role_ids
    FROM users u
    LEFT JOIN user_roles ur ON ur.user_id = u.id
"#;

#[derive(Debug, FromRow)]
struct User {
    id: UserId,
    name: String,
    email: String,
    password_hash: String,
    about: Option<String>,
    immutable: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    role_ids: Vec<RoleId>,
}

impl From<User> for UserDBResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            about: user.about,
            immutable: user.immutable,
            role_ids: user.role_ids,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

async fn fetch_user<'e, E>(executor: E, id: UserId) -> Result<Option<UserDBResponse>>
where
    E: sqlx::PgExecutor<'e>,
{
    let user = sqlx::query_as::<_, User>(&format!("{SELECT_USERS} WHERE u.id = $1 GROUP BY u.id"))
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(user.map(UserDBResponse::from))
}

/// Repeated ids collapse onto one join row.
async fn insert_roles(conn: &mut sqlx::PgConnection, user_id: UserId, role_ids: &[RoleId]) -> Result<()> {
    sqlx::query("INSERT INTO user_roles (user_id, role_id) SELECT $1, UNNEST($2::BIGINT[]) ON CONFLICT DO NOTHING")
        .bind(user_id)
        .bind(role_ids)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[async_trait]
impl UserStore for PgStore {
    #[instrument(skip(self, request), fields(email = %request.email), err)]
    async fn create_user(&self, request: &UserCreateDBRequest) -> Result<UserDBResponse> {
        let mut tx = self.pool.begin().await?;

        let id: UserId = sqlx::query_scalar(
            r#"
            INSERT INTO users (name, email, password_hash, about, immutable)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&request.name)
        .bind(&request.email)
        .bind(&request.password_hash)
        .bind(&request.about)
        .bind(request.immutable)
        .fetch_one(&mut *tx)
        .await?;

        insert_roles(&mut tx, id, &request.role_ids).await?;

        let user = fetch_user(&mut *tx, id).await?.ok_or(DbError::NotFound)?;
        tx.commit().await?;
        Ok(user)
    }

    #[instrument(skip(self), err)]
    async fn get_user(&self, id: UserId) -> Result<Option<UserDBResponse>> {
        fetch_user(&self.pool, id).await
    }

    #[instrument(skip(self), err)]
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, User>(&format!("{SELECT_USERS} WHERE u.email = $1 GROUP BY u.id"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user.map(UserDBResponse::from))
    }

    #[instrument(skip(self), err)]
    async fn list_users(&self) -> Result<Vec<UserDBResponse>> {
        let users = sqlx::query_as::<_, User>(&format!("{SELECT_USERS} GROUP BY u.id ORDER BY u.id"))
            .fetch_all(&self.pool)
            .await?;
        Ok(users.into_iter().map(UserDBResponse::from).collect())
    }

    #[instrument(skip(self, request), err)]
    async fn update_user(&self, id: UserId, request: &UserUpdateDBRequest) -> Result<UserDBResponse> {
        let mut tx = self.pool.begin().await?;

        let updated: Option<UserId> = sqlx::query_scalar(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                password_hash = COALESCE($4, password_hash),
                about = COALESCE($5, about),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(&request.name)
        .bind(&request.email)
        .bind(&request.password_hash)
        .bind(&request.about)
        .fetch_optional(&mut *tx)
        .await?;
        if updated.is_none() {
            return Err(DbError::NotFound);
        }

        if let Some(role_ids) = &request.role_ids {
            sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            insert_roles(&mut tx, id, role_ids).await?;
        }

        let user = fetch_user(&mut *tx, id).await?.ok_or(DbError::NotFound)?;
        tx.commit().await?;
        Ok(user)
    }

    #[instrument(skip(self), err)]
    async fn delete_user(&self, id: UserId) -> Result<bool> {
        // series, blogs and join rows go with the user via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), err)]
    async fn add_user_role(&self, user_id: UserId, role_id: RoleId) -> Result<()> {
        sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(user_id)
            .bind(role_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn remove_user_role(&self, user_id: UserId, role_id: RoleId) -> Result<()> {
        sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role_id = $2")
            .bind(user_id)
            .bind(role_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
