//! Handler extractors for authenticated, tenant-scoped requests.

use axum::{
    extract::{FromRequest, FromRequestParts},
    http::request::Parts,
};

use crate::error::ApiError;
use crate::http::server::AppState;
use crate::store::Session;
use crate::tenant::{CredentialRejection, TenantContext};

/// The caller's resolved tenant context. Rejects with 401 when absent,
/// reporting an expired token distinctly from an invalid one.
#[derive(Debug, Clone)]
pub struct AuthContext(pub TenantContext);

impl<S: Send + Sync> FromRequestParts<S> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(ctx) = parts.extensions.get::<TenantContext>() {
            return Ok(AuthContext(ctx.clone()));
        }
        match parts.extensions.get::<CredentialRejection>() {
            Some(rejection) => Err((*rejection).into()),
            None => Err(ApiError::Unauthorized("Not authenticated".into())),
        }
    }
}

/// A persistence session bound to the caller's tenant.
pub struct TenantSession(pub Session);

impl FromRequestParts<AppState> for TenantSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthContext(ctx) = AuthContext::from_request_parts(parts, state).await?;
        let mut session = Session::open(state.persistence.clone());
        session.set_tenant_context(ctx.tenant_id)?;
        Ok(TenantSession(session))
    }
}

/// `axum::Json` whose rejections answer in the `{detail, type}` shape.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `axum::extract::Path` with `ApiError` rejections.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// `axum::extract::Query` with `ApiError` rejections.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);
