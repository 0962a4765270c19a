//! # blogctl: Blog platform backend
//!
//! `blogctl` serves a JSON API for publishing blogs, organised into categories and series, with
//! role-based access control over every route.
//!
//! ## Overview
//!
//! Users authenticate with email and password and receive an HS512-signed bearer token. Every
//! later request presents that token. Before any handler runs, the authorization gate
//! ([`auth::middleware`]) decides what the route requires, resolves the token's user to a fresh
//! set of authorities (the union of the permissions of all their roles) and lets the request
//! through or rejects it with 401 or 403.
//!
//! Because authorities are resolved from storage on every request, granting a permission to a
//! role, or a role to a user, takes effect on the affected users' very next request without
//! issuing new tokens.
//!
//! ## Architecture
//!
//! - **API layer** ([`api`]): axum handlers, request/response models and validation
//! - **Auth layer** ([`auth`]): tokens, password hashing, identity resolution and the gate
//! - **Storage** ([`db`]): store traits with PostgreSQL and in-memory implementations
//! - **Bootstrap** ([`bootstrap`]): seeds the permission catalog, the ADMIN and USER roles and the
//!   admin account before the server accepts traffic
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use blogctl::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = blogctl::config::Args::parse();
//!     let config = Config::load(&args)?;
//!     blogctl::telemetry::init_telemetry(config.log_format)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.

pub mod api;
pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod db;
pub mod errors;
mod openapi;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Json, Router, ServiceExt,
    http::{HeaderValue, Method, header},
    middleware::from_fn_with_state,
    routing::{get, post},
};
use bon::Builder;
use tokio::net::TcpListener;
use tower::Layer;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::{
    api::handlers,
    auth::{
        middleware::{AccessPolicy, authorization_gate_middleware},
        password::Argon2Params,
        session::TokenService,
    },
    config::{CorsOrigin, DatabaseConfig},
    db::{memory::MemoryStore, postgres::PgStore, store::Store},
    openapi::ApiDoc,
};
pub use config::Config;

/// Application state shared across all request handlers.
///
/// - `store`: the credential and content store
/// - `config`: application configuration, read-only after startup
/// - `tokens`: mints and verifies bearer tokens
/// - `policy`: the route table consulted by the authorization gate
#[derive(Clone, Builder)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Config,
    pub tokens: TokenService,
    #[builder(default)]
    pub policy: Arc<AccessPolicy>,
}

/// Get the blogctl database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let cors_config = &config.auth.security.cors;

    let allow_origin = if cors_config.allowed_origins.iter().any(|o| matches!(o, CorsOrigin::Wildcard)) {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in &cors_config.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                // Origins never carry a trailing slash
                origins.push(url.as_str().trim_end_matches('/').parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(cors_config.allow_credentials);

    if let Some(max_age) = cors_config.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router with every endpoint plus request tracing.
///
/// Neither the authorization gate nor CORS is part of the router. [`Application::serve`] wraps
/// the finished router in the gate, so it runs before path matching on every request, and wraps
/// that in CORS, so the gate's rejections still carry CORS headers.
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let api_routes = Router::new()
        // Authentication
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/me", get(handlers::auth::me))
        // Users
        .route("/users", get(handlers::users::list_users).post(handlers::users::create_user))
        .route(
            "/users/{id}",
            get(handlers::users::get_user)
                .put(handlers::users::update_user)
                .delete(handlers::users::delete_user),
        )
        .route("/users/{id}/roles", get(handlers::users::get_user_roles))
        .route(
            "/users/{id}/roles/{role_name}",
            post(handlers::users::add_user_role).delete(handlers::users::remove_user_role),
        )
        // Roles
        .route("/roles", get(handlers::roles::list_roles).post(handlers::roles::create_role))
        .route(
            "/roles/{id}",
            get(handlers::roles::get_role)
                .put(handlers::roles::update_role)
                .delete(handlers::roles::delete_role),
        )
        .route("/roles/{id}/permissions", get(handlers::roles::get_role_permissions))
        .route(
            "/roles/{id}/permissions/{permission_name}",
            post(handlers::roles::add_role_permission).delete(handlers::roles::remove_role_permission),
        )
        // Permissions
        .route(
            "/permissions",
            get(handlers::permissions::list_permissions).post(handlers::permissions::create_permission),
        )
        .route(
            "/permissions/{name}",
            get(handlers::permissions::get_permission)
                .put(handlers::permissions::update_permission)
                .delete(handlers::permissions::delete_permission),
        )
        // Categories
        .route(
            "/categories",
            get(handlers::categories::list_categories).post(handlers::categories::create_category),
        )
        .route(
            "/categories/{id}",
            get(handlers::categories::get_category)
                .put(handlers::categories::update_category)
                .delete(handlers::categories::delete_category),
        )
        // Series
        .route("/series", get(handlers::series::list_series).post(handlers::series::create_series))
        .route("/series/users/{user_id}", get(handlers::series::list_series_by_user))
        .route(
            "/series/{id}",
            get(handlers::series::get_series)
                .put(handlers::series::update_series)
                .delete(handlers::series::delete_series),
        )
        // Blogs
        .route("/blogs", get(handlers::blogs::list_blogs).post(handlers::blogs::create_blog))
        .route("/blogs/users/{user_id}", get(handlers::blogs::list_blogs_by_user))
        .route("/blogs/series/{series_id}", get(handlers::blogs::list_blogs_by_series))
        .route("/blogs/categories/{category_id}", get(handlers::blogs::list_blogs_by_category))
        .route(
            "/blogs/{id}",
            get(handlers::blogs::get_blog)
                .put(handlers::blogs::update_blog)
                .delete(handlers::blogs::delete_blog),
        )
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }));

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .nest("/api", api_routes)
        .merge(Scalar::with_url("/api/docs", ApiDoc::openapi()))
        .with_state(state.clone());

    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Open the configured store. Postgres runs pending migrations on connect.
async fn connect_store(config: &Config) -> anyhow::Result<Arc<dyn Store>> {
    match &config.database {
        DatabaseConfig::Memory => {
            info!("Using in-memory storage; data is lost on shutdown");
            Ok(Arc::new(MemoryStore::new()))
        }
        DatabaseConfig::Postgres { url, pool } => {
            let store = PgStore::connect(url, pool).await.context("Failed to connect to database")?;
            Ok(Arc::new(store))
        }
    }
}

/// The ready-to-serve application: storage connected, defaults seeded, routes built.
pub struct Application {
    router: Router,
    app_state: AppState,
    cors: CorsLayer,
    config: Config,
}

impl Application {
    /// Connect storage, seed default data and build the router.
    ///
    /// Seeding finishes before this returns, so no request is ever served against an unseeded
    /// store.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting blogctl with configuration: {:#?}", config);

        let store = connect_store(&config).await?;

        bootstrap::seed_defaults(store.as_ref(), &config.admin, Argon2Params::from(&config.auth.password))
            .await
            .context("Failed to seed default data")?;

        let tokens = TokenService::from_config(&config)?;
        let app_state = AppState::builder().store(store).config(config.clone()).tokens(tokens).build();
        let router = build_router(&app_state)?;
        let cors = create_cors_layer(&config)?;

        Ok(Self {
            router,
            app_state,
            cors,
            config,
        })
    }

    #[cfg(test)]
    pub fn into_test_server(self) -> (axum_test::TestServer, AppState) {
        let state = self.app_state.clone();
        // Same layering as serve
        let middleware = from_fn_with_state(self.app_state, authorization_gate_middleware);
        let service = self.cors.layer(middleware.layer(self.router)).into_make_service();
        let server = axum_test::TestServer::new(service).expect("Failed to create test server");
        (server, state)
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("blogctl listening on http://{}", bind_addr);

        // CORS outermost, then the gate before path matching
        let middleware = from_fn_with_state(self.app_state, authorization_gate_middleware);
        let service = self.cors.layer(middleware.layer(self.router));

        axum::serve(listener, service.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::UserStore;
    use crate::test_utils::{create_test_app, create_test_config};
    use axum::http::StatusCode;

    #[test_log::test(tokio::test)]
    async fn test_health_and_docs_are_public() {
        let (server, _) = create_test_app().await;

        let response = server.get("/healthz").await;
        response.assert_status_ok();
        response.assert_text("OK");

        let doc: serde_json::Value = server.get("/api/openapi.json").await.json();
        assert!(doc["paths"]["/api/auth/login"].is_object());

        server.get("/api/docs").await.assert_status_ok();
    }

    #[test_log::test(tokio::test)]
    async fn test_gate_rejections_carry_cors_headers() {
        let (server, _) = create_test_app().await;
        let origin = "http://localhost:3000";

        let response = server.get("/api/blogs").add_header("origin", origin).await;
        response.assert_status_ok();
        assert_eq!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), origin);

        let response = server.get("/api/users").add_header("origin", origin).await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), origin);
        let body: serde_json::Value = response.json();
        assert_eq!(body["error"], "Unauthorized");

        let response = server.get("/api/users").add_header("origin", "https://elsewhere.example").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[test_log::test(tokio::test)]
    async fn test_unknown_api_route_requires_token() {
        let (server, _) = create_test_app().await;
        server.get("/api/nowhere").await.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_cors_layer_accepts_configured_origins() {
        let mut config = create_test_config();
        config.auth.security.cors.allowed_origins = vec![CorsOrigin::Url("https://blog.example.com/".parse().unwrap())];
        assert!(create_cors_layer(&config).is_ok());

        config.auth.security.cors.allowed_origins = vec![CorsOrigin::Wildcard];
        config.auth.security.cors.allow_credentials = false;
        assert!(create_cors_layer(&config).is_ok());
    }

    #[test_log::test(tokio::test)]
    async fn test_application_seeds_before_serving() {
        let app = Application::new(create_test_config()).await.unwrap();
        let (_server, state) = app.into_test_server();

        let admin = state.store.find_user_by_email(&state.config.admin.email).await.unwrap();
        assert!(admin.is_some_and(|user| user.immutable));
    }

    #[test_log::test(tokio::test)]
    async fn test_missing_secret_fails_startup() {
        let mut config = create_test_config();
        config.secret_key = None;
        assert!(Application::new(config).await.is_err());
    }
}
