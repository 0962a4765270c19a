//! HTTP request handlers for all API endpoints.
//!
//! Handlers validate input, apply ownership and immutability rules, and call the store. Route
//! authorities have already been checked by the authorization gate when a handler runs.
//!
//! - [`auth`]: registration, login and the caller's identity
//! - [`users`]: user CRUD and role assignment
//! - [`roles`]: role CRUD and permission assignment
//! - [`permissions`]: permission CRUD
//! - [`categories`], [`series`], [`blogs`]: content CRUD

pub mod auth;
pub mod blogs;
pub mod categories;
pub mod permissions;
pub mod roles;
pub mod series;
pub mod users;

use std::collections::BTreeSet;

use crate::auth::identity::Identity;
use crate::db::errors::DbError;
use crate::db::store::{CategoryStore, PermissionStore, RoleStore, Store, UserStore};
use crate::errors::Error;
use crate::types::{CategoryId, Operation, PermissionId, RoleId, UserId};

/// Turn a unique violation into a 409 with `message`, keep any other storage error as is.
pub(crate) fn conflict_on_unique(err: DbError, message: impl FnOnce() -> String) -> Error {
    if err.is_unique_violation() {
        Error::Conflict { message: message() }
    } else {
        Error::Database(err)
    }
}

/// 404 naming every id in `requested` that is not in `found`, e.g.
/// `Roles not found with IDs: [4, 9]`.
fn ensure_all_found(resource: &str, requested: &[i64], found: impl IntoIterator<Item = i64>) -> Result<(), Error> {
    let found: BTreeSet<i64> = found.into_iter().collect();
    let missing: BTreeSet<i64> = requested.iter().copied().filter(|id| !found.contains(id)).collect();
    if missing.is_empty() {
        return Ok(());
    }
    Err(Error::NotFound {
        resource: resource.to_string(),
        field: "IDs".to_string(),
        value: format!("{:?}", missing.into_iter().collect::<Vec<_>>()),
    })
}

pub(crate) async fn ensure_roles_exist(store: &dyn Store, ids: &[RoleId]) -> Result<(), Error> {
    let roles = store.get_roles(ids).await?;
    ensure_all_found("Roles", ids, roles.iter().map(|r| r.id))
}

pub(crate) async fn ensure_permissions_exist(store: &dyn Store, ids: &[PermissionId]) -> Result<(), Error> {
    let permissions = store.get_permissions(ids).await?;
    ensure_all_found("Permissions", ids, permissions.iter().map(|p| p.id))
}

pub(crate) async fn ensure_categories_exist(store: &dyn Store, ids: &[CategoryId]) -> Result<(), Error> {
    let categories = store.get_categories(ids).await?;
    ensure_all_found("Categories", ids, categories.iter().map(|c| c.id))
}

/// The author a new series or blog is attributed to. Only administrators may name someone other
/// than themselves.
pub(crate) async fn resolve_author(store: &dyn Store, caller: &Identity, requested: Option<UserId>, resource: &str) -> Result<UserId, Error> {
    match requested {
        None => Ok(caller.id),
        Some(id) if id == caller.id => Ok(id),
        Some(id) if caller.is_admin() => {
            store.get_user(id).await?.ok_or_else(|| Error::not_found("User", id))?;
            Ok(id)
        }
        Some(id) => Err(Error::InsufficientPermissions {
            action: Operation::Create,
            resource: format!("{resource} for user {id}"),
        }),
    }
}

/// Reject `operation` on a resource owned by `owner` unless the caller owns it or is an admin.
pub(crate) fn ensure_owner(caller: &Identity, owner: UserId, operation: Operation, resource: String) -> Result<(), Error> {
    if caller.can_act_for(owner) {
        Ok(())
    } else {
        Err(Error::InsufficientPermissions {
            action: operation,
            resource,
        })
    }
}
