use axum::{routing::get, Router};

use crate::api::handlers::{self, AppState};
use crate::store::traits::Store;

pub fn create_router<S: Store + 'static>() -> Router<AppState<S>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        .route(
            "/test-definitions",
            get(handlers::list_test_definitions::<S>).post(handlers::create_test_definition::<S>),
        )
        .route(
            "/test-definitions/:id",
            get(handlers::get_test_definition::<S>)
                .patch(handlers::update_test_definition::<S>)
                .delete(handlers::delete_test_definition::<S>),
        )
}
