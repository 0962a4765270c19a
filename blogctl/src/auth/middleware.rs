//! The authorization gate.
//!
//! Every request passes through [`authorization_gate_middleware`] before any handler runs. The
//! gate looks up what the route requires in the [`AccessPolicy`], then:
//!
//! - public routes pass straight through, whether or not a token is present
//! - otherwise a valid bearer token is required, or the request ends with 401
//! - the token's subject is resolved to a fresh [`Identity`] from the store
//! - if the route names an authority the identity lacks, the request ends with 403
//!
//! The resolved identity is stored in the request extensions for handlers to extract.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, Method, header},
    middleware::Next,
    response::Response,
};
use tracing::{debug, info, trace};

use crate::{
    AppState,
    auth::{
        identity::{self, Identity},
        permissions::*,
    },
    errors::Error,
    types::Operation,
};

/// What a route demands of its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    /// Any valid token
    Authenticated,
    /// A valid token whose identity holds this exact authority
    Authority(&'static str),
}

/// One row of the route table.
#[derive(Debug, Clone)]
pub struct RouteRule {
    /// `None` matches every method
    pub method: Option<Method>,
    /// Exact path, or a prefix ending in `/**` that also matches the bare prefix
    pub pattern: &'static str,
    pub access: Access,
}

impl RouteRule {
    pub fn any(pattern: &'static str, access: Access) -> Self {
        Self {
            method: None,
            pattern,
            access,
        }
    }

    pub fn on(method: Method, pattern: &'static str, access: Access) -> Self {
        Self {
            method: Some(method),
            pattern,
            access,
        }
    }

    fn matches(&self, method: &Method, path: &str) -> bool {
        let method_matches = match &self.method {
            None => true,
            // HEAD is served by GET handlers
            Some(m) => m == method || (*m == Method::GET && *method == Method::HEAD),
        };
        method_matches && path_matches(self.pattern, path)
    }
}

fn path_matches(pattern: &str, path: &str) -> bool {
    match pattern.strip_suffix("/**") {
        Some(prefix) => path == prefix || path.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('/')),
        None => path == pattern,
    }
}

/// Ordered route table. The first matching rule decides; unmatched paths under `/api` require
/// authentication and everything else is public.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    rules: Vec<RouteRule>,
}

impl AccessPolicy {
    pub fn new(rules: Vec<RouteRule>) -> Self {
        Self { rules }
    }

    pub fn requirement(&self, method: &Method, path: &str) -> Access {
        // CORS preflights carry no credentials
        if *method == Method::OPTIONS {
            return Access::Public;
        }
        if let Some(rule) = self.rules.iter().find(|rule| rule.matches(method, path)) {
            return rule.access;
        }
        if path_matches("/api/**", path) {
            Access::Authenticated
        } else {
            Access::Public
        }
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        use Access::{Authority, Public};

        let mut rules = vec![
            RouteRule::any("/api/auth/login", Public),
            RouteRule::any("/api/auth/register", Public),
            RouteRule::any("/api/openapi.json", Public),
            RouteRule::any("/api/docs/**", Public),
            RouteRule::any("/api/auth/me", Authority(VIEW_USER)),
            RouteRule::any("/api/roles/**", Authority(ADMINISTRATOR)),
            RouteRule::any("/api/permissions/**", Authority(ADMINISTRATOR)),
            RouteRule::on(Method::GET, "/api/categories/**", Public),
            RouteRule::on(Method::GET, "/api/series/**", Public),
            RouteRule::on(Method::GET, "/api/blogs/**", Public),
            RouteRule::on(Method::GET, "/api/users/**", Authority(VIEW_USER)),
        ];

        let writes: [(&'static str, [&'static str; 3]); 4] = [
            ("/api/users/**", [CREATE_USER, UPDATE_USER, DELETE_USER]),
            ("/api/categories/**", [CREATE_CATEGORY, UPDATE_CATEGORY, DELETE_CATEGORY]),
            ("/api/series/**", [CREATE_SERIES, UPDATE_SERIES, DELETE_SERIES]),
            ("/api/blogs/**", [CREATE_BLOG, UPDATE_BLOG, DELETE_BLOG]),
        ];
        for (pattern, [create, update, delete]) in writes {
            rules.push(RouteRule::on(Method::POST, pattern, Authority(create)));
            rules.push(RouteRule::on(Method::PUT, pattern, Authority(update)));
            rules.push(RouteRule::on(Method::DELETE, pattern, Authority(delete)));
        }

        Self::new(rules)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Implementation for [`authorization_gate_middleware`]. Returns the request, carrying the
/// caller's identity when one was required, or the error that ends it.
pub(crate) async fn authorize(state: &AppState, mut request: Request) -> Result<Request, Error> {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let access = state.policy.requirement(&method, &path);
    if access == Access::Public {
        trace!("Public route {method} {path}");
        return Ok(request);
    }

    let Some(claims) = bearer_token(request.headers()).and_then(|token| state.tokens.verify(token)) else {
        debug!("Rejected {method} {path}: missing or invalid bearer token");
        return Err(Error::Unauthenticated { message: None });
    };

    // Resolved fresh every request so role changes apply immediately
    let identity: Identity = identity::resolve(state.store.as_ref(), &claims.sub).await?;

    if let Access::Authority(required) = access
        && !identity.has_authority(required)
    {
        info!("Denied {method} {path} for {}: missing authority {required}", identity.email);
        return Err(Error::InsufficientPermissions {
            action: Operation::from_method(&method),
            resource: path,
        });
    }

    trace!("Allowed {method} {path} for {}", identity.email);
    request.extensions_mut().insert(identity);
    Ok(request)
}

/// Per-request allow/deny decision, run before routing reaches any handler.
pub async fn authorization_gate_middleware(State(state): State<AppState>, request: Request, next: Next) -> Result<Response, Error> {
    let request = authorize(&state, request).await?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::UserStore;
    use crate::test_utils::{ADMIN_EMAIL, ADMIN_PASSWORD, create_test_app, login, register};
    use axum::http::{HeaderValue, StatusCode};
    use serde_json::Value;

    #[test]
    fn test_path_patterns() {
        assert!(path_matches("/api/users/**", "/api/users"));
        assert!(path_matches("/api/users/**", "/api/users/7/roles"));
        assert!(!path_matches("/api/users/**", "/api/usersx"));
        assert!(path_matches("/api/auth/login", "/api/auth/login"));
        assert!(!path_matches("/api/auth/login", "/api/auth/login/extra"));
    }

    #[test]
    fn test_default_route_table() {
        let policy = AccessPolicy::default();
        let req = |m: Method, p: &str| policy.requirement(&m, p);

        assert_eq!(req(Method::POST, "/api/auth/login"), Access::Public);
        assert_eq!(req(Method::POST, "/api/auth/register"), Access::Public);
        assert_eq!(req(Method::GET, "/api/auth/me"), Access::Authority(VIEW_USER));
        assert_eq!(req(Method::GET, "/api/blogs"), Access::Public);
        assert_eq!(req(Method::HEAD, "/api/blogs/3"), Access::Public);
        assert_eq!(req(Method::GET, "/api/series/users/1"), Access::Public);
        assert_eq!(req(Method::POST, "/api/blogs"), Access::Authority(CREATE_BLOG));
        assert_eq!(req(Method::PUT, "/api/categories/2"), Access::Authority(UPDATE_CATEGORY));
        assert_eq!(req(Method::DELETE, "/api/series/2"), Access::Authority(DELETE_SERIES));
        assert_eq!(req(Method::GET, "/api/users/1"), Access::Authority(VIEW_USER));
        assert_eq!(req(Method::POST, "/api/users"), Access::Authority(CREATE_USER));
        assert_eq!(req(Method::GET, "/api/roles"), Access::Authority(ADMINISTRATOR));
        assert_eq!(req(Method::DELETE, "/api/permissions/X"), Access::Authority(ADMINISTRATOR));
        assert_eq!(req(Method::PATCH, "/api/blogs/1"), Access::Authenticated);
        assert_eq!(req(Method::GET, "/api/unknown"), Access::Authenticated);
        assert_eq!(req(Method::GET, "/healthz"), Access::Public);
        assert_eq!(req(Method::OPTIONS, "/api/users"), Access::Public);
    }

    #[test]
    fn test_first_match_wins() {
        let policy = AccessPolicy::new(vec![
            RouteRule::any("/api/things/**", Access::Public),
            RouteRule::any("/api/things/**", Access::Authority("NEVER")),
        ]);
        assert_eq!(policy.requirement(&Method::POST, "/api/things/1"), Access::Public);
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));
    }

    #[test_log::test(tokio::test)]
    async fn test_missing_token_gets_structured_401() {
        let (server, _) = create_test_app().await;

        let response = server.get("/api/users").await;
        response.assert_status(StatusCode::UNAUTHORIZED);

        let body: Value = response.json();
        assert_eq!(body["error"], "Unauthorized");
        assert_eq!(body["message"], crate::errors::MISSING_TOKEN_MESSAGE);
        assert!(body["timestamp"].as_i64().is_some_and(|ts| ts > 0));
    }

    #[test_log::test(tokio::test)]
    async fn test_invalid_token_is_unauthenticated() {
        let (server, _) = create_test_app().await;

        let response = server.get("/api/users").authorization_bearer("not.a.token").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[test_log::test(tokio::test)]
    async fn test_public_routes_need_no_token() {
        let (server, _) = create_test_app().await;

        server.get("/api/blogs").await.assert_status_ok();
        server.get("/api/categories").await.assert_status_ok();
        server.get("/healthz").await.assert_status_ok();
    }

    #[test_log::test(tokio::test)]
    async fn test_user_lacking_authority_gets_403() {
        let (server, _) = create_test_app().await;
        let token = register(&server, "Reader", "reader@example.com", "secret1").await;

        let response = server.get("/api/users").authorization_bearer(&token).await;
        response.assert_status(StatusCode::FORBIDDEN);
        let body: Value = response.json();
        assert_eq!(body["error"], "Access Denied");
        assert_eq!(body["message"], "Insufficient permissions to read /api/users");
    }

    #[test_log::test(tokio::test)]
    async fn test_admin_passes_gate() {
        let (server, _) = create_test_app().await;
        let token = login(&server, ADMIN_EMAIL, ADMIN_PASSWORD).await;

        server.get("/api/users").authorization_bearer(&token).await.assert_status_ok();
        server.get("/api/roles").authorization_bearer(&token).await.assert_status_ok();
    }

    #[test_log::test(tokio::test)]
    async fn test_token_for_deleted_user_is_not_found() {
        let (server, state) = create_test_app().await;
        let token = register(&server, "Gone", "gone@example.com", "secret1").await;

        let user = state.store.find_user_by_email("gone@example.com").await.unwrap().unwrap();
        state.store.delete_user(user.id).await.unwrap();

        let response = server.post("/api/blogs").authorization_bearer(&token).json(&serde_json::json!({})).await;
        response.assert_status(StatusCode::NOT_FOUND);
    }
}
