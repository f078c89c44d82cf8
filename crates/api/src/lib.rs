pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;

use axum::{
    Router,
    routing::{get, post, put},
};
use state::AppState;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/me", get(routes::auth::me))
        .route("/me", put(routes::auth::update_me));

    let alert_routes = Router::new()
        .route("/", get(routes::alert::list))
        .route("/unread", get(routes::alert::unread))
        .route("/stats", get(routes::alert::stats))
        .route("/read-all", put(routes::alert::mark_all_read))
        .route("/{alert_id}", get(routes::alert::get))
        .route("/{alert_id}/read", put(routes::alert::mark_read))
        .route("/{alert_id}/dismiss", put(routes::alert::dismiss));

    let email_routes = Router::new()
        .route("/", get(routes::email::list))
        .route("/{email_id}/read", put(routes::email::mark_read));

    let calendar_routes = Router::new().route("/", get(routes::calendar::upcoming));

    let api = Router::new()
        .nest("/auth", auth_routes)
        .nest("/alert", alert_routes)
        .nest("/email", email_routes)
        .nest("/calendar", calendar_routes);

    let health = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api)
        .merge(health)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
