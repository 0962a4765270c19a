//! Default data seeding.
//!
//! [`seed_defaults`] runs once at startup, before the server accepts traffic, and guarantees the
//! baseline RBAC graph exists:
//!
//! 1. every permission in [`CATALOG`], marked immutable
//! 2. the ADMIN and USER roles, marked immutable
//! 3. the default grants of those two roles, rewritten on every run
//! 4. the configured admin account, marked immutable and holding ADMIN
//!
//! Existing records are left alone apart from step 3, so running it any number of times yields
//! the same state as running it once.
//!
//! Step 3 discards any permissions an administrator granted to or revoked from ADMIN or USER
//! through the API since the last start.

use tracing::{debug, info, instrument};

use crate::{
    auth::{
        password::{self, Argon2Params},
        permissions::{ADMIN_ROLE, CATALOG, DEFAULT_ROLES},
    },
    config::AdminConfig,
    db::{
        models::{
            permissions::PermissionCreateDBRequest, roles::RoleCreateDBRequest, roles::RoleDBResponse,
            users::UserCreateDBRequest,
        },
        store::{PermissionStore, RoleStore, Store, UserStore},
    },
    errors::Error,
    types::PermissionId,
};

/// Seed the catalog, default roles and admin account.
///
/// # Errors
///
/// Fails with [`Error::NotFound`] if a default grant names a permission that does not exist,
/// and with storage errors as they occur. Either is fatal at startup.
#[instrument(skip_all, fields(admin = %admin.email))]
pub async fn seed_defaults(store: &dyn Store, admin: &AdminConfig, params: Argon2Params) -> Result<(), Error> {
    seed_permissions(store).await?;

    for (name, grants) in DEFAULT_ROLES {
        let role = ensure_role(store, name).await?;
        let permission_ids = resolve_permissions(store, grants).await?;
        store.set_role_permissions(role.id, &permission_ids).await?;
        info!("Reset {} permissions on role {name}", permission_ids.len());
    }

    seed_admin(store, admin, params).await?;

    info!("Default data in place");
    Ok(())
}

async fn seed_permissions(store: &dyn Store) -> Result<(), Error> {
    let mut created = 0;
    for name in CATALOG {
        if store.find_permission_by_name(name).await?.is_some() {
            continue;
        }
        let request = PermissionCreateDBRequest {
            name: name.to_string(),
            immutable: true,
        };
        match store.create_permission(&request).await {
            Ok(_) => created += 1,
            // Another instance seeded it first
            Err(e) if e.is_unique_violation() => debug!("Permission {name} appeared concurrently"),
            Err(e) => return Err(e.into()),
        }
    }
    info!("Created {created} of {} catalog permissions", CATALOG.len());
    Ok(())
}

async fn ensure_role(store: &dyn Store, name: &str) -> Result<RoleDBResponse, Error> {
    if let Some(role) = store.find_role_by_name(name).await? {
        return Ok(role);
    }

    let request = RoleCreateDBRequest {
        name: name.to_string(),
        immutable: true,
        permission_ids: vec![],
    };
    match store.create_role(&request).await {
        Ok(role) => {
            info!("Created role {name}");
            Ok(role)
        }
        Err(e) if e.is_unique_violation() => store
            .find_role_by_name(name)
            .await?
            .ok_or_else(|| role_not_found(name)),
        Err(e) => Err(e.into()),
    }
}

async fn resolve_permissions(store: &dyn Store, names: &[&str]) -> Result<Vec<PermissionId>, Error> {
    let mut ids = Vec::with_capacity(names.len());
    for name in names {
        let permission = store.find_permission_by_name(name).await?.ok_or_else(|| Error::NotFound {
            resource: "Permission".to_string(),
            field: "name".to_string(),
            value: name.to_string(),
        })?;
        ids.push(permission.id);
    }
    Ok(ids)
}

async fn seed_admin(store: &dyn Store, admin: &AdminConfig, params: Argon2Params) -> Result<(), Error> {
    if store.find_user_by_email(&admin.email).await?.is_some() {
        debug!("Admin account already exists");
        return Ok(());
    }

    let admin_role = store.find_role_by_name(ADMIN_ROLE).await?.ok_or_else(|| role_not_found(ADMIN_ROLE))?;
    let password_hash = password::hash_password(admin.password.clone(), params).await?;

    let request = UserCreateDBRequest {
        name: admin.name.clone(),
        email: admin.email.clone(),
        password_hash,
        about: admin.about.clone(),
        immutable: true,
        role_ids: vec![admin_role.id],
    };
    match store.create_user(&request).await {
        Ok(user) => info!("Created admin account {} ({})", user.email, user.id),
        Err(e) if e.is_unique_violation() => debug!("Admin account appeared concurrently"),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

fn role_not_found(name: &str) -> Error {
    Error::NotFound {
        resource: "Role".to_string(),
        field: "name".to_string(),
        value: name.to_string(),
    }
}
