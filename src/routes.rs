// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, profile, progress, quiz},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, resolve_identity},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, me, categories, quiz, progress, admin).
/// * Resolves the caller's identity on every request; protected routers
///   then require it.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
        HeaderValue::from_static("http://localhost:5173"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth_routes = Router::new()
        .route("/signup", post(auth::sign_up))
        .route("/signin", post(auth::sign_in))
        // Protected session routes
        .merge(
            Router::new()
                .route("/signout", post(auth::sign_out))
                .route("/flush", post(auth::flush_session))
                .layer(middleware::from_fn(auth_middleware)),
        );

    let me_routes = Router::new()
        .route("/", get(profile::get_me).put(profile::update_me))
        .layer(middleware::from_fn(auth_middleware));

    let category_routes = Router::new()
        .route("/", get(quiz::list_categories))
        .merge(
            Router::new()
                .route("/{category}/labels", get(quiz::list_labels))
                .layer(middleware::from_fn(auth_middleware)),
        );

    let quiz_routes = Router::new()
        .route("/{category}/{label}", get(quiz::get_quiz))
        .route("/{category}/{label}/submit", post(quiz::submit_quiz))
        .layer(middleware::from_fn(auth_middleware));

    let progress_routes = Router::new()
        .route("/api/ranking", get(progress::get_ranking))
        .merge(
            Router::new()
                .route("/api/progress", get(progress::get_progress))
                .layer(middleware::from_fn(auth_middleware)),
        );

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users))
        .route("/users/bulk-delete", post(admin::bulk_delete_users))
        .route("/users/{uid}", delete(admin::delete_user))
        .route(
            "/content/{category}/{label}",
            get(admin::get_label_content).put(admin::save_label_content),
        )
        .route("/content/{category}/labels", post(admin::allocate_label))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn(auth_middleware));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/me", me_routes)
        .nest("/api/categories", category_routes)
        .nest("/api/quiz", quiz_routes)
        .nest("/api/admin", admin_routes)
        .merge(progress_routes)
        // Global Middleware (applied from outside in)
        .layer(middleware::from_fn_with_state(state.clone(), resolve_identity))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
