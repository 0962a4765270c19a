//! The fixed authority catalog and the default role grants.
//!
//! Authorities are plain strings compared by exact match. Every name in [`CATALOG`] is seeded as
//! an immutable permission at startup.

pub const VIEW_USER: &str = "VIEW_USER";
pub const CREATE_USER: &str = "CREATE_USER";
pub const UPDATE_USER: &str = "UPDATE_USER";
pub const DELETE_USER: &str = "DELETE_USER";

pub const VIEW_BLOG: &str = "VIEW_BLOG";
pub const CREATE_BLOG: &str = "CREATE_BLOG";
pub const UPDATE_BLOG: &str = "UPDATE_BLOG";
pub const DELETE_BLOG: &str = "DELETE_BLOG";

pub const VIEW_CATEGORY: &str = "VIEW_CATEGORY";
pub const CREATE_CATEGORY: &str = "CREATE_CATEGORY";
pub const UPDATE_CATEGORY: &str = "UPDATE_CATEGORY";
pub const DELETE_CATEGORY: &str = "DELETE_CATEGORY";

pub const VIEW_SERIES: &str = "VIEW_SERIES";
pub const CREATE_SERIES: &str = "CREATE_SERIES";
pub const UPDATE_SERIES: &str = "UPDATE_SERIES";
pub const DELETE_SERIES: &str = "DELETE_SERIES";

/// Guards role and permission management.
pub const ADMINISTRATOR: &str = "ADMINISTRATOR";

pub const ADMIN_ROLE: &str = "ADMIN";
pub const USER_ROLE: &str = "USER";

/// Every seeded permission, in creation order.
pub const CATALOG: [&str; 17] = [
    VIEW_USER,
    CREATE_USER,
    UPDATE_USER,
    DELETE_USER,
    VIEW_BLOG,
    CREATE_BLOG,
    UPDATE_BLOG,
    DELETE_BLOG,
    VIEW_CATEGORY,
    CREATE_CATEGORY,
    UPDATE_CATEGORY,
    DELETE_CATEGORY,
    VIEW_SERIES,
    CREATE_SERIES,
    UPDATE_SERIES,
    DELETE_SERIES,
    ADMINISTRATOR,
];

/// ADMIN holds the whole catalog.
pub const ADMIN_PERMISSIONS: &[&str] = &CATALOG;

/// USER manages content but not accounts.
pub const USER_PERMISSIONS: &[&str] = &[
    VIEW_BLOG,
    CREATE_BLOG,
    UPDATE_BLOG,
    DELETE_BLOG,
    VIEW_CATEGORY,
    CREATE_CATEGORY,
    UPDATE_CATEGORY,
    DELETE_CATEGORY,
    VIEW_SERIES,
    CREATE_SERIES,
    UPDATE_SERIES,
    DELETE_SERIES,
];

/// The default roles and the permissions the bootstrapper rewrites onto them every start.
pub const DEFAULT_ROLES: [(&str, &[&str]); 2] = [(ADMIN_ROLE, ADMIN_PERMISSIONS), (USER_ROLE, USER_PERMISSIONS)];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_catalog_names_are_unique() {
        let unique: BTreeSet<_> = CATALOG.iter().collect();
        assert_eq!(unique.len(), CATALOG.len());
    }

    #[test]
    fn test_role_grants_come_from_catalog() {
        for (_, grants) in DEFAULT_ROLES {
            assert!(grants.iter().all(|p| CATALOG.contains(p)));
        }
    }

    #[test]
    fn test_user_role_cannot_manage_accounts() {
        for authority in [VIEW_USER, CREATE_USER, UPDATE_USER, DELETE_USER, ADMINISTRATOR] {
            assert!(!USER_PERMISSIONS.contains(&authority));
            assert!(ADMIN_PERMISSIONS.contains(&authority));
        }
    }
}
