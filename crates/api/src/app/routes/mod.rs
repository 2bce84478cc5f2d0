use axum::{
    Router,
    routing::{get, post},
};

pub mod audit;
pub mod auth;
pub mod impersonation;
pub mod principals;
pub mod system;

/// Endpoints reachable without a session token.
pub fn public_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/auth/login", post(auth::login))
        .route("/auth/register", post(auth::register))
}

/// Endpoints that require a live session token.
pub fn router() -> Router {
    Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/whoami", get(system::whoami))
        .route("/policy", get(system::policy))
        .route("/events", get(system::events))
        .route(
            "/impersonation",
            post(impersonation::start).delete(impersonation::stop),
        )
        .nest("/audit", audit::router())
        .nest("/principals", principals::router())
}
