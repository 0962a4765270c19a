//! Authenticated identity resolution.
//!
//! An [`Identity`] is built from the credential store on every request that presents a valid
//! token. Nothing is cached between requests, so a permission granted to or revoked from a role
//! is visible on the caller's very next request.

use std::collections::BTreeSet;

use tracing::{instrument, trace};

use crate::auth::permissions::ADMIN_ROLE;
use crate::db::store::{RoleStore, Store, UserStore};
use crate::errors::Error;
use crate::types::UserId;

/// The caller of a request, with their flattened authority set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: UserId,
    pub name: String,
    pub email: String,
    /// Only for credential checks on login; never serialized
    pub password_hash: String,
    pub roles: BTreeSet<String>,
    /// Union of permission names across all of the user's roles
    pub authorities: BTreeSet<String>,
}

impl Identity {
    /// Exact, case-sensitive membership test.
    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.contains(authority)
    }

    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|role| role.eq_ignore_ascii_case(ADMIN_ROLE))
    }

    /// Admins may act on anyone's resources; everyone else only on their own.
    pub fn can_act_for(&self, owner: UserId) -> bool {
        self.is_admin() || self.id == owner
    }
}

/// Load the user with `email` and flatten their roles into an authority set.
///
/// Fails with `NotFound` when no such user exists, including a user deleted after their token
/// was issued.
#[instrument(skip(store), err)]
pub async fn resolve(store: &dyn Store, email: &str) -> Result<Identity, Error> {
    let user = store.find_user_by_email(email).await?.ok_or_else(|| Error::NotFound {
        resource: "User".to_string(),
        field: "email".to_string(),
        value: email.to_string(),
    })?;

    let roles = store.get_roles(&user.role_ids).await?;

    let mut authorities = BTreeSet::new();
    for role in &roles {
        for permission in store.get_role_permissions(role.id).await? {
            authorities.insert(permission.name);
        }
    }
    trace!("Resolved {} authorities for {}", authorities.len(), user.email);

    Ok(Identity {
        id: user.id,
        name: user.name,
        email: user.email,
        password_hash: user.password_hash,
        roles: roles.into_iter().map(|role| role.name).collect(),
        authorities,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::db::models::{
        permissions::PermissionCreateDBRequest, roles::RoleCreateDBRequest, users::UserCreateDBRequest,
    };
    use crate::db::store::{PermissionStore, RoleStore, UserStore};
    use crate::types::{PermissionId, RoleId};

    async fn permission(store: &MemoryStore, name: &str) -> PermissionId {
        store
            .create_permission(&PermissionCreateDBRequest {
                name: name.to_string(),
                immutable: false,
            })
            .await
            .unwrap()
            .id
    }

    async fn role(store: &MemoryStore, name: &str, permission_ids: Vec<PermissionId>) -> RoleId {
        store
            .create_role(&RoleCreateDBRequest {
                name: name.to_string(),
                immutable: false,
                permission_ids,
            })
            .await
            .unwrap()
            .id
    }

    async fn user(store: &MemoryStore, email: &str, role_ids: Vec<RoleId>) -> UserId {
        store
            .create_user(&UserCreateDBRequest {
                name: "Someone".to_string(),
                email: email.to_string(),
                password_hash: "hash".to_string(),
                about: None,
                immutable: false,
                role_ids,
            })
            .await
            .unwrap()
            .id
    }

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_authorities_are_union_of_role_permissions() {
        let store = MemoryStore::new();
        let read = permission(&store, "READ").await;
        let write = permission(&store, "WRITE").await;
        let delete = permission(&store, "DELETE").await;
        let reader = role(&store, "READER", vec![read]).await;
        let editor = role(&store, "EDITOR", vec![read, write]).await;
        let _janitor = role(&store, "JANITOR", vec![delete]).await;
        user(&store, "a@x.com", vec![reader, editor]).await;

        let identity = resolve(&store, "a@x.com").await.unwrap();

        assert_eq!(identity.authorities, set(&["READ", "WRITE"]));
        assert_eq!(identity.roles, set(&["EDITOR", "READER"]));
        assert!(identity.has_authority("WRITE"));
        assert!(!identity.has_authority("write"));
        assert!(!identity.has_authority("DELETE"));
    }

    #[tokio::test]
    async fn test_user_without_roles_has_no_authorities() {
        let store = MemoryStore::new();
        user(&store, "nobody@x.com", vec![]).await;

        let identity = resolve(&store, "nobody@x.com").await.unwrap();
        assert!(identity.authorities.is_empty());
        assert!(!identity.is_admin());
    }

    #[tokio::test]
    async fn test_permission_changes_visible_on_next_resolution() {
        let store = MemoryStore::new();
        let read = permission(&store, "READ").await;
        let publish = permission(&store, "PUBLISH").await;
        let writer = role(&store, "WRITER", vec![read]).await;
        user(&store, "w@x.com", vec![writer]).await;

        assert!(!resolve(&store, "w@x.com").await.unwrap().has_authority("PUBLISH"));

        store.add_role_permission(writer, publish).await.unwrap();
        assert!(resolve(&store, "w@x.com").await.unwrap().has_authority("PUBLISH"));

        store.remove_role_permission(writer, publish).await.unwrap();
        assert!(!resolve(&store, "w@x.com").await.unwrap().has_authority("PUBLISH"));
    }

    #[tokio::test]
    async fn test_unknown_email_is_not_found() {
        let store = MemoryStore::new();
        match resolve(&store, "ghost@x.com").await {
            Err(Error::NotFound { resource, field, value }) => {
                assert_eq!(resource, "User");
                assert_eq!(field, "email");
                assert_eq!(value, "ghost@x.com");
            }
            other => panic!("expected not found, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_admin_role_and_ownership() {
        let store = MemoryStore::new();
        let admin = role(&store, "ADMIN", vec![]).await;
        let admin_id = user(&store, "root@x.com", vec![admin]).await;
        let other_id = user(&store, "other@x.com", vec![]).await;

        let root = resolve(&store, "root@x.com").await.unwrap();
        assert!(root.is_admin());
        assert!(root.can_act_for(other_id));

        let other = resolve(&store, "other@x.com").await.unwrap();
        assert!(other.can_act_for(other_id));
        assert!(!other.can_act_for(admin_id));
    }
}
