use axum::{
    http::{HeaderName, Method},
    middleware::from_fn_with_state,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod bookings;
pub mod credentials;
pub mod error;
pub mod middleware;
pub mod state;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
            HeaderName::from_static(middleware::auth::LEGACY_TOKEN_HEADER),
        ]);

    let protected = Router::new()
        .merge(bookings::routes())
        .merge(auth::protected_routes())
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::session_auth_middleware,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(auth::routes())
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
