//! Route definitions for the API.

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::handlers;
use crate::auth::{require_user, Authenticator};
use crate::storage::UserDirectory;
use crate::AppState;

/// Security scheme modifier for OpenAPI.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            // `INIT_DATA:<query>` or `JWT:<token>`
            components.add_security_scheme(
                "authorization",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("Authorization"))),
            );
        }
    }
}

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health_check,
        handlers::login,
        handlers::get_current_user,
    ),
    components(schemas(
        crate::api::types::HealthResponse,
        crate::api::types::LoginResponse,
        crate::api::types::UserInfo,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "users", description = "Login and current user"),
        (name = "health", description = "Health and status endpoints")
    ),
    info(
        title = "Mini App Gateway API",
        version = "0.1.0",
        description = "Authentication gateway for mini-app backends",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

/// Build the API router.
///
/// Every `/v1/users` route runs behind [`require_user`].
pub fn build_router<D: UserDirectory>(
    state: AppState,
    authenticator: Arc<Authenticator<D>>,
) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let user_routes = Router::new()
        .route("/v1/users/login", post(handlers::login))
        .route("/v1/users/me", get(handlers::get_current_user))
        .layer(middleware::from_fn_with_state(
            authenticator,
            require_user::<D>,
        ))
        .with_state(state.clone());

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/v1/health", get(handlers::health_check))
        .with_state(state);

    Router::new()
        .merge(user_routes)
        .merge(public_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
