//! Cross-origin policy.

use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderName, HeaderValue, Method,
};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::CorsConfig;
use crate::security::rate_limit::{LIMIT_HEADER, REMAINING_HEADER, RESET_HEADER};

/// Build the CORS layer. Origins that are not valid header values are
/// skipped with a warning.
///
/// Methods and headers are listed explicitly because credentialed CORS
/// forbids wildcards.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT])
        .expose_headers([
            HeaderName::from_static(LIMIT_HEADER),
            HeaderName::from_static(REMAINING_HEADER),
            HeaderName::from_static(RESET_HEADER),
            HeaderName::from_static("x-request-id"),
        ])
        .allow_credentials(config.allow_credentials)
}
