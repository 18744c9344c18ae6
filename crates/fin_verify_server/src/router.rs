//! Router construction for the verification server.

use std::sync::Arc;

use axum::{
    middleware as axum_mw,
    routing::{get, post},
    Extension, Router,
};
use fin_verify_core::ChallengeOrchestrator;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::jwt::{jwt_auth, JwtConfig};

/// Build the full axum router with all routes and middleware.
pub fn build_router(orchestrator: Arc<ChallengeOrchestrator>, jwt_config: JwtConfig) -> Router {
    // Routes that require JWT authentication
    let protected = Router::new()
        .route("/verify/generate-otp", post(handlers::verify::generate_otp))
        .route("/verify/submit-otp", post(handlers::verify::submit_otp))
        .route("/verify/passbook", post(handlers::verify::passbook))
        .route("/verify/summaries", get(handlers::verify::summaries))
        .route("/verify/latest", get(handlers::verify::latest))
        .route("/consent/upsert", post(handlers::consent::upsert))
        .route("/consent/check", get(handlers::consent::check))
        .route("/rls/check", get(handlers::consent::rls_check))
        .route("/tax/itr/collect", post(handlers::tax::collect))
        .route("/tax/itr", get(handlers::tax::list))
        .layer(axum_mw::from_fn(jwt_auth))
        .layer(Extension(jwt_config));

    // Public routes (no auth)
    let public = Router::new().route("/health", get(handlers::health::health));

    public.merge(protected).layer(Extension(orchestrator)).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
    )
}
