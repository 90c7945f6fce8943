use std::sync::Arc;

use crate::access::bearer::JwtVerifier;
use crate::access::rate_limit::RateLimiter;
use crate::scoring::provider::ScoreProvider;
use crate::screening::service::ScreeningService;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub screening: ScreeningService,
    pub jwt: JwtVerifier,
    /// Throttles public-token writes. Redis-backed with Postgres, in-process otherwise.
    pub rate_limiter: Arc<dyn RateLimiter>,
    pub scores: Arc<dyn ScoreProvider>,
}
