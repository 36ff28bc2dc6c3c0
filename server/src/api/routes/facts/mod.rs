//! Fact query endpoints
//!
//! Every handler derives a per-request cancellation token from the shutdown
//! token. The drop guard cancels it if the handler future is dropped, e.g.
//! when the client disconnects, which abandons the in-flight store query.

pub mod aggregate;
pub mod raw;
pub mod timeseries;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tokio_util::sync::CancellationToken;

use crate::api::middleware::method_not_allowed;
use crate::domain::FactsService;

pub const FACTS_PATH: &str = "/api/facts";
pub const AGGREGATE_PATH: &str = "/api/facts/aggregate";
pub const TIMESERIES_PATH: &str = "/api/facts/timeseries";

#[derive(Clone)]
pub struct FactsApiState {
    pub facts: Arc<FactsService>,
    pub shutdown: CancellationToken,
}

impl FactsApiState {
    /// Token for one request; cancelled on shutdown or when the guard drops
    fn request_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }
}

pub fn routes(facts: Arc<FactsService>, shutdown: CancellationToken) -> Router<()> {
    let state = FactsApiState { facts, shutdown };

    Router::new()
        .route(FACTS_PATH, get(raw::list_facts).fallback(method_not_allowed))
        .route(
            AGGREGATE_PATH,
            post(aggregate::aggregate_facts).fallback(method_not_allowed),
        )
        .route(
            TIMESERIES_PATH,
            get(timeseries::facts_timeseries).fallback(method_not_allowed),
        )
        .with_state(state)
}
