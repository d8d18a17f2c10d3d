use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::middleware::from_fn;
use axum::Router;
use tower_governor::{governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer};
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{api, middleware, static_files};

pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let config = state.config.clone();
    let body_limit = config.max_body_bytes();
    let rate_limit_rpm = config.rate_limit.login_requests_per_minute;

    // CORS: same-origin only by default (no cross-origin requests allowed)
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    // Per-IP limit on login attempts, ahead of the account-level throttle
    let period_per_request = 60 / rate_limit_rpm.max(1);
    let governor_config = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(period_per_request.max(1).into())
            .burst_size(rate_limit_rpm.max(1))
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("invalid login rate limit configuration"))?,
    );

    let auth_routes =
        api::auth_router().layer(GovernorLayer::<_, _, axum::body::Body>::new(governor_config));

    let api_routes = auth_routes
        .merge(api::public_router())
        .merge(api::admin_router());

    let base_router = Router::new()
        .nest("/api", api_routes)
        .nest_service("/uploads", ServeDir::new(&config.storage.upload_dir))
        .fallback(static_files::static_handler);

    let router = if config.tls.is_enabled() {
        base_router.layer(from_fn(middleware::security_headers::security_headers_with_hsts))
    } else {
        base_router.layer(from_fn(middleware::security_headers::security_headers))
    };

    Ok(router
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}
