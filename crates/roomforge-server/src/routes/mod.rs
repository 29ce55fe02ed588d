//! Axum router construction.
//!
//! [`build`] assembles the complete application router, including:
//! - Middleware layers (CORS, per-request trace-ID injection)
//! - Optional Swagger UI / OpenAPI spec endpoint (disable with `ROOMFORGE_ENABLE_SWAGGER=false`)
//! - Health / heartbeat route
//! - The `/room/*` job submission & polling surface
//! - `/queue/status`, optionally protected by a bearer token

pub mod doc;
mod health;
mod queue;
mod room;

use std::sync::Arc;

use axum::middleware::from_fn_with_state;
use axum::Router;
use utoipa_swagger_ui::SwaggerUi;

use crate::middleware::auth::check_admin_auth;
use crate::middleware::cors::cors_layer;
use crate::middleware::TraceLayer;
use crate::state::AppState;

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let cors = cors_layer(Arc::clone(&state));

    let queue_router = queue::router()
        .route_layer(from_fn_with_state(Arc::clone(&state), check_admin_auth));

    let api_router = Router::new()
        .merge(health::router())
        .merge(room::router())
        .merge(queue_router);

    let mut app = Router::new().merge(api_router);

    // Enabled by default; disable with ROOMFORGE_ENABLE_SWAGGER=false in
    // production to avoid exposing the API structure to potential attackers.
    if state.config.enable_swagger {
        let api_doc = doc::get_docs();
        app = app.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api_doc));
    }

    app
        // Outermost layers execute first on the way in.
        .layer(TraceLayer::new(Arc::clone(&state)))
        .layer(cors)
        .with_state(state)
}
