use axum::Router;

use crate::state::AppState;

mod admin;
mod health;
mod readings;
mod users;
mod ws;

// ---

pub fn router(state: AppState) -> Router {
    // ---
    Router::new()
        .merge(readings::router())
        .merge(users::router())
        .merge(admin::router())
        .merge(ws::router())
        .merge(health::router())
        .with_state(state)
}
