//! OpenAPI documentation for the `/api` surface.
//!
//! Served as JSON at `/api/openapi.json` and rendered with Scalar at `/api/docs`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::{api, errors};

/// Registers the bearer token scheme referenced by protected operations.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "BearerAuth".to_string(),
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "Token from `POST /api/auth/login`, sent in the `Authorization` header:\n\n\
                            ```\nAuthorization: Bearer YOUR_TOKEN\n```",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "blogctl",
        description = "Blog platform API with role-based access control. Every route lists the authority it requires."
    ),
    modifiers(&SecurityAddon),
    paths(
        api::handlers::auth::register,
        api::handlers::auth::login,
        api::handlers::auth::me,
        api::handlers::users::create_user,
        api::handlers::users::list_users,
        api::handlers::users::get_user,
        api::handlers::users::get_user_roles,
        api::handlers::users::update_user,
        api::handlers::users::delete_user,
        api::handlers::users::add_user_role,
        api::handlers::users::remove_user_role,
        api::handlers::roles::create_role,
        api::handlers::roles::list_roles,
        api::handlers::roles::get_role,
        api::handlers::roles::get_role_permissions,
        api::handlers::roles::update_role,
        api::handlers::roles::delete_role,
        api::handlers::roles::add_role_permission,
        api::handlers::roles::remove_role_permission,
        api::handlers::permissions::create_permission,
        api::handlers::permissions::list_permissions,
        api::handlers::permissions::get_permission,
        api::handlers::permissions::update_permission,
        api::handlers::permissions::delete_permission,
        api::handlers::categories::create_category,
        api::handlers::categories::list_categories,
        api::handlers::categories::get_category,
        api::handlers::categories::update_category,
        api::handlers::categories::delete_category,
        api::handlers::series::create_series,
        api::handlers::series::list_series,
        api::handlers::series::list_series_by_user,
        api::handlers::series::get_series,
        api::handlers::series::update_series,
        api::handlers::series::delete_series,
        api::handlers::blogs::create_blog,
        api::handlers::blogs::list_blogs,
        api::handlers::blogs::get_blog,
        api::handlers::blogs::list_blogs_by_user,
        api::handlers::blogs::list_blogs_by_series,
        api::handlers::blogs::list_blogs_by_category,
        api::handlers::blogs::update_blog,
        api::handlers::blogs::delete_blog,
    ),
    components(
        schemas(
            errors::ErrorBody,
            errors::FieldError,
            api::models::MessageResponse,
            api::models::auth::RegisterRequest,
            api::models::auth::RegisterResponse,
            api::models::auth::LoginRequest,
            api::models::auth::LoginResponse,
            api::models::auth::MeResponse,
            api::models::users::UserCreate,
            api::models::users::UserUpdate,
            api::models::users::UserResponse,
            api::models::roles::RoleCreate,
            api::models::roles::RoleUpdate,
            api::models::roles::RoleResponse,
            api::models::permissions::PermissionRequest,
            api::models::permissions::PermissionResponse,
            api::models::categories::CategoryCreate,
            api::models::categories::CategoryUpdate,
            api::models::categories::CategoryResponse,
            api::models::series::SeriesCreate,
            api::models::series::SeriesUpdate,
            api::models::series::SeriesResponse,
            api::models::blogs::BlogCreate,
            api::models::blogs::BlogUpdate,
            api::models::blogs::BlogResponse,
        )
    ),
    tags(
        (name = "authentication", description = "Registration, login and the current identity"),
        (name = "users", description = "User accounts and their roles"),
        (name = "roles", description = "Roles and their permissions (ADMINISTRATOR)"),
        (name = "permissions", description = "The permission catalog (ADMINISTRATOR)"),
        (name = "categories", description = "Blog categories"),
        (name = "series", description = "Blog series"),
        (name = "blogs", description = "Blog posts"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_routes_and_bearer_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/auth/login"));
        assert!(doc.paths.paths.contains_key("/api/roles/{id}/permissions/{permission_name}"));
        assert!(doc.paths.paths.contains_key("/api/blogs/categories/{category_id}"));

        let schemes = &doc.components.as_ref().unwrap().security_schemes;
        assert!(schemes.contains_key("BearerAuth"));
    }
}
