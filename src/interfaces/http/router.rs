//! API Router with Swagger UI

use std::sync::Arc;
use std::time::Instant;

use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post, put},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::application::identity::AuthService;
use crate::config::ServerConfig;
use crate::interfaces::http::common::{ApiResponse, EmptyData};
use crate::interfaces::http::middleware::{
    auth_middleware, error_detail_middleware, optional_auth_middleware, role_gate, AuthState,
    ErrorDetailMode, ADMIN_ONLY,
};
use crate::interfaces::http::modules::metrics::{http_metrics_middleware, MetricsState};
use crate::interfaces::http::modules::request_id::request_id_middleware;
use crate::interfaces::http::modules::{auth, health, metrics, root, users};

/// Security scheme modifier for OpenAPI
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "Session token from /api/v1/auth/verify-otp. The `token` cookie is accepted too.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        // Service
        root::service_info,
        health::health_check,
        // Auth
        auth::register,
        auth::login,
        auth::resend_otp,
        auth::verify_otp,
        auth::logout,
        auth::get_current_user,
        auth::check_email,
        // Users
        users::list_users,
        users::set_user_active,
    ),
    components(
        schemas(
            ApiResponse<String>,
            EmptyData,
            root::ServiceInfo,
            health::HealthResponse,
            health::ComponentHealth,
            auth::RegisterRequest,
            auth::RegisteredUser,
            auth::LoginRequest,
            auth::OtpSentResponse,
            auth::ResendOtpRequest,
            auth::OtpResentResponse,
            auth::VerifyOtpRequest,
            auth::LoginResponse,
            auth::CheckEmailRequest,
            auth::CheckEmailResponse,
            users::UserDto,
            users::SetActiveRequest,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Service information and health check"),
        (name = "Authentication", description = "Signup, two-step password + OTP login, session and logout"),
        (name = "Users", description = "Admin user management"),
    ),
    info(
        title = "CareList Auth API",
        version = "1.0.0",
        description = "Credential & session authority for the CareList hospital management system",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

/// Everything the router needs from the rest of the application.
pub struct RouterDeps {
    pub service: Arc<AuthService>,
    pub prometheus: PrometheusHandle,
    pub cookie_secure: bool,
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    // Credentialed CORS cannot use wildcards.
    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Create the API router with all routes
pub fn create_api_router(deps: RouterDeps, server: &ServerConfig) -> Router {
    let auth_state = AuthState {
        service: deps.service.clone(),
    };

    let auth_handler_state = auth::AuthHandlerState {
        service: deps.service.clone(),
        cookie_secure: deps.cookie_secure,
    };

    // Auth routes (public)
    let auth_public_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/resend-otp", post(auth::resend_otp))
        .route("/verify-otp", post(auth::verify_otp))
        .route("/check-email", post(auth::check_email))
        .with_state(auth_handler_state.clone());

    // Auth routes (protected)
    let auth_protected_routes = Router::new()
        .route("/me", get(auth::get_current_user))
        .route("/logout", post(auth::logout))
        .layer(middleware::from_fn_with_state(
            auth_state.clone(),
            auth_middleware,
        ))
        .with_state(auth_handler_state);

    let auth_routes = auth_public_routes.merge(auth_protected_routes);

    // User management (admin only). The role gate runs inside the auth layer.
    let user_routes = Router::new()
        .route("/", get(users::list_users))
        .route("/{id}/active", put(users::set_user_active))
        .layer(middleware::from_fn_with_state(ADMIN_ONLY, role_gate))
        .layer(middleware::from_fn_with_state(
            auth_state.clone(),
            auth_middleware,
        ))
        .with_state(users::UserHandlerState {
            service: deps.service.clone(),
        });

    let root_routes = Router::new()
        .route("/", get(root::service_info))
        .layer(middleware::from_fn_with_state(
            auth_state,
            optional_auth_middleware,
        ));

    let health_routes = Router::new()
        .route("/health", get(health::health_check))
        .with_state(health::HealthState {
            service: deps.service,
            started_at: Arc::new(Instant::now()),
        });

    let metrics_routes = Router::new()
        .route("/metrics", get(metrics::prometheus_metrics))
        .with_state(MetricsState {
            handle: deps.prometheus,
        });

    let swagger_routes = SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi());

    Router::new()
        .merge(swagger_routes)
        .merge(root_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .nest("/api/v1/auth", auth_routes)
        .nest("/api/v1/users", user_routes)
        .layer(middleware::from_fn_with_state(
            ErrorDetailMode {
                expose: server.is_development(),
            },
            error_detail_middleware,
        ))
        .layer(middleware::from_fn(http_metrics_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(server))
}

// ── Tests ──────────────────────────────────────────────────────
