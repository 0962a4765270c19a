//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//! - **[`validation`]**: The validating JSON extractor
//!
//! # API Structure
//!
//! - **Authentication** (`/api/auth/*`): registration, login, current identity
//! - **Users** (`/api/users/*`): account management and role assignment
//! - **Roles** (`/api/roles/*`) and **Permissions** (`/api/permissions/*`): the RBAC graph
//! - **Categories**, **Series**, **Blogs**: published content
//!
//! Which authority each route needs is decided by the
//! [`AccessPolicy`](crate::auth::middleware::AccessPolicy), not by the handlers. Handlers only add
//! ownership checks on top.
//!
//! # OpenAPI Documentation
//!
//! All endpoints are documented with `utoipa`. The document is served at `/api/openapi.json` and
//! rendered at `/api/docs`.

pub mod handlers;
pub mod models;
pub mod validation;
