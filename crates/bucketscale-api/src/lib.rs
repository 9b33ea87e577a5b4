//! bucketscale-api — exposes trigger decisions to an orchestrator.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/api/v1/triggers` | List every trigger's latest status |
//! | GET | `/api/v1/triggers/{name}` | One trigger's status |
//! | GET | `/metrics` | Prometheus exposition |

pub mod handlers;
pub mod prometheus;

use axum::Router;
use axum::routing::get;
use bucketscale_trigger::DecisionBoard;

pub use prometheus::render_prometheus;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub board: DecisionBoard,
}

/// Build the complete router (REST + metrics).
pub fn build_router(board: DecisionBoard) -> Router {
    let state = ApiState { board };

    let api_routes = Router::new()
        .route("/triggers", get(handlers::list_triggers))
        .route("/triggers/{name}", get(handlers::get_trigger))
        .with_state(state.clone());

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::prometheus_metrics).with_state(state))
}
