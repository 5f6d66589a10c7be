pub mod invocations;
pub mod ping;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the API router. Apply layers and `.with_state(..)` at the call site.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/invocations", post(invocations::invoke))
        .route("/ping", get(ping::ping))
}
