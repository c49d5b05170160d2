// routes.rs
use std::sync::Arc;

use axum::{middleware, routing::get, Extension, Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::{
    handler::{
        applications::applications_handler,
        auth::auth_handler,
        chat::chat_handler,
        contracts::contracts_handler,
        notifications::notifications_handler,
        payments::{payments_handler, webhook_handler},
        projects::projects_handler,
        users::{admin_handler, users_handler},
        ws::ws_handler,
    },
    middleware::{admin_only, auth},
    AppState,
};

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "Server is running"
    }))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    // The gateway webhook authenticates with its body signature, not a session
    let payment_routes = Router::new()
        .merge(payments_handler().layer(middleware::from_fn(auth)))
        .merge(webhook_handler());

    let api_route = Router::new()
        .nest("/auth", auth_handler())
        .nest("/users", users_handler().layer(middleware::from_fn(auth)))
        .nest(
            "/admin",
            admin_handler()
                .layer(middleware::from_fn(admin_only))
                .layer(middleware::from_fn(auth)),
        )
        .nest(
            "/projects",
            projects_handler().layer(middleware::from_fn(auth)),
        )
        .nest(
            "/applications",
            applications_handler().layer(middleware::from_fn(auth)),
        )
        .nest(
            "/contracts",
            contracts_handler().layer(middleware::from_fn(auth)),
        )
        .nest("/payments", payment_routes)
        .nest("/chat", chat_handler().layer(middleware::from_fn(auth)))
        .nest(
            "/notifications",
            notifications_handler().layer(middleware::from_fn(auth)),
        )
        .layer(TraceLayer::new_for_http())
        .layer(Extension(app_state.clone()));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_route)
        .nest(
            "/ws",
            ws_handler()
                .layer(middleware::from_fn(auth))
                .layer(Extension(app_state)),
        )
}
