use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::handlers::{admin, public};
use crate::middleware::admin_auth_middleware;
use crate::state::AppState;

/// Multipart framing on top of the file itself
const UPLOAD_OVERHEAD_BYTES: usize = 64 * 1024;

/// The full HTTP surface: public reads, auth, the webhook, the admin tier and
/// uploaded files
pub fn app(state: AppState) -> Router {
    let uploads = ServeDir::new(&state.config.upload.dir);

    Router::new()
        .route("/", get(public::site::root))
        .route("/health", get(public::site::health))
        .merge(content_routes())
        .merge(auth_routes())
        .nest("/api/admin", admin_routes(&state))
        .nest_service(&state.config.upload.public_prefix, uploads)
        // Global middleware
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn content_routes() -> Router<AppState> {
    use public::{blog, catalog, portfolio, revalidate, settings};

    Router::new()
        .route("/api/blog", get(blog::list))
        .route("/api/blog/:slug", get(blog::show))
        .route("/api/portfolio", get(portfolio::list))
        .route("/api/portfolio/:slug", get(portfolio::show))
        .route("/api/categories", get(catalog::categories))
        .route("/api/portfolio-categories", get(catalog::portfolio_categories))
        .route("/api/technologies", get(catalog::technologies))
        .route("/api/settings", get(settings::show))
        .route("/api/revalidate", post(revalidate::revalidate))
}

fn auth_routes() -> Router<AppState> {
    use public::auth;

    Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/refresh", post(auth::refresh))
        .route("/api/auth/me", get(auth::me))
}

fn admin_routes(state: &AppState) -> Router<AppState> {
    use admin::{blog, cache, categories, portfolio, settings, technologies, upload};

    let upload_limit = DefaultBodyLimit::max(state.config.upload.max_bytes + UPLOAD_OVERHEAD_BYTES);

    Router::new()
        .route("/blog", get(blog::list).post(blog::create))
        .route("/blog/:id", get(blog::show).put(blog::update).delete(blog::delete))
        .route("/portfolio", get(portfolio::list).post(portfolio::create))
        .route(
            "/portfolio/:id",
            get(portfolio::show).put(portfolio::update).delete(portfolio::delete),
        )
        .route("/categories", get(categories::list).post(categories::create))
        .route(
            "/categories/:id",
            get(categories::show).put(categories::update).delete(categories::delete),
        )
        .route("/technologies", get(technologies::list).post(technologies::create))
        .route(
            "/technologies/:id",
            get(technologies::show).put(technologies::update).delete(technologies::delete),
        )
        .route("/settings", get(settings::show).put(settings::update).post(settings::update))
        .route("/upload", post(upload::upload).layer(upload_limit))
        .route("/cache/clear", post(cache::clear))
        // Token and role are checked before any handler runs
        .route_layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
}

/// Explicit origins with credentials (the auth cookies); permissive only when
/// nothing is configured at all
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let configured = if config.security.cors_origins.is_empty() {
        vec![config.server.site_url.clone()]
    } else {
        config.security.cors_origins.clone()
    };
    let origins: Vec<HeaderValue> = configured
        .iter()
        .filter(|o| !o.is_empty())
        .filter_map(|o| HeaderValue::from_str(o.trim_end_matches('/')).ok())
        .collect();

    if origins.is_empty() {
        tracing::warn!("No CORS origins configured, allowing any origin without credentials");
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}
