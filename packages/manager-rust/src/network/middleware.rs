//! HTTP middleware stack for the status server.
//!
//! The first layer listed is the outermost: it sees the request first and
//! the response last.

use axum::http::StatusCode;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::config::StatusConfig;

/// The composed Tower layer type produced by [`build_http_layers`].
type HttpLayers = tower::layer::util::Stack<
    TimeoutLayer,
    tower::layer::util::Stack<
        TraceLayer<tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>>,
        tower::layer::util::Identity,
    >,
>;

/// Builds the status server's middleware stack.
///
/// 1. `Tracing` -- logs request/response with structured trace spans
/// 2. `Timeout` -- answers 408 when a request exceeds `request_timeout`
#[must_use]
pub fn build_http_layers(config: &StatusConfig) -> HttpLayers {
    ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout,
        ))
        .into_inner()
}
