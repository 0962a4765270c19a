//! Extractor for the authenticated caller.
//!
//! The authorization gate resolves the caller once per request and stores the [`Identity`] in
//! the request extensions. Handlers take `Identity` as an argument to read it back. On a route
//! the gate treats as public no identity is stored and extraction fails with 401.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::auth::identity::Identity;
use crate::errors::Error;

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .ok_or(Error::Unauthenticated { message: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use std::collections::BTreeSet;

    #[tokio::test]
    async fn test_missing_identity_is_unauthenticated() {
        let (mut parts, _) = Request::new(()).into_parts();
        let result = Identity::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(Error::Unauthenticated { message: None })));
    }

    #[tokio::test]
    async fn test_identity_read_from_extensions() {
        let identity = Identity {
            id: 3,
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: String::new(),
            roles: BTreeSet::new(),
            authorities: BTreeSet::from(["VIEW_BLOG".to_string()]),
        };
        let (mut parts, _) = Request::new(()).into_parts();
        parts.extensions.insert(identity.clone());

        let extracted = Identity::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(extracted, identity);
    }
}
