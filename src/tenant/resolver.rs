//! Tenant resolution middleware.
//!
//! Turns an optional `Authorization: Bearer <token>` header into a
//! [`TenantContext`] in request extensions. Resolution never fails the
//! request: a missing or rejected credential leaves the context absent and
//! protected handlers answer 401 themselves.

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, Request},
    middleware::Next,
    response::Response,
};

use crate::auth::{TokenCodec, TokenError, TokenKind};
use crate::http::paths;
use crate::http::server::AppState;
use crate::tenant::context::{CredentialRejection, RequestAttributes, TenantContext};

/// Outcome of inspecting a request's credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Anonymous,
    Resolved(TenantContext),
    Rejected(CredentialRejection),
}

/// Extract the bearer token, if any. The scheme is matched case-insensitively.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Decode the caller's access token into a tenant context.
pub fn resolve(headers: &HeaderMap, codec: &TokenCodec) -> Resolution {
    let Some(token) = bearer_token(headers) else {
        return Resolution::Anonymous;
    };

    match codec.verify_kind(token, TokenKind::Access) {
        Ok(claims) => Resolution::Resolved(TenantContext::from(&claims)),
        Err(TokenError::Expired) => Resolution::Rejected(CredentialRejection::Expired),
        Err(e) => {
            tracing::debug!(error = %e, "Bearer token rejected");
            Resolution::Rejected(CredentialRejection::Invalid)
        }
    }
}

pub async fn resolve_tenant(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if paths::skips_resolution(req.uri().path()) {
        return next.run(req).await;
    }

    match resolve(req.headers(), &state.tokens) {
        Resolution::Anonymous => {}
        Resolution::Resolved(ctx) => {
            tracing::debug!(tenant_id = %ctx.tenant_id, subject = %ctx.subject_id, "Tenant resolved");
            if let Some(attributes) = req.extensions().get::<RequestAttributes>() {
                attributes.set_tenant(ctx.clone());
            }
            req.extensions_mut().insert(ctx);
        }
        Resolution::Rejected(rejection) => {
            req.extensions_mut().insert(rejection);
        }
    }

    next.run(req).await
}
