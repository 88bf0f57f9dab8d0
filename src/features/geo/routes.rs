use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::features::geo::handlers;
use crate::features::geo::services::ProximityService;
use crate::modules::stores::RedisStore;

/// Generic proximity routes, relative to a backend prefix
pub fn routes(service: Arc<ProximityService>) -> Router {
    Router::new()
        // Static list routes must come before {kind}
        .route("/cities", get(handlers::list_cities))
        .route("/districts", get(handlers::list_districts))
        .route("/{kind}", post(handlers::create_entity))
        .route(
            "/{kind}/{id}/{distance}",
            get(handlers::find_nearest_by_id),
        )
        .route(
            "/{kind}/{lat}/{lng}/{distance}",
            get(handlers::find_nearest),
        )
        .with_state(service)
}

/// Redis-only index routes, relative to the redis prefix
pub fn redis_index_routes(store: Arc<RedisStore>) -> Router {
    Router::new()
        .route("/members/{kind}", get(handlers::list_members))
        .route(
            "/nearest/{lat}/{lng}/{distance}",
            get(handlers::nearest_districts),
        )
        .with_state(store)
}
