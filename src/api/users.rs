//! Users within the caller's organization.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::auth::{check_password, hash_blocking};
use crate::api::extract::{ApiJson, ApiPath, AuthContext, TenantSession};
use crate::api::MessageResponse;
use crate::auth::{require_role, Role};
use crate::error::ApiError;
use crate::http::server::AppState;
use crate::models::user::is_valid_email;
use crate::models::{NewUser, UserUpdate, UserView};

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: Role,
}

pub async fn me(
    AuthContext(ctx): AuthContext,
    TenantSession(session): TenantSession,
) -> Result<Json<UserView>, ApiError> {
    Ok(Json(session.get_user(ctx.subject_id).await?.into()))
}

pub async fn list(
    AuthContext(ctx): AuthContext,
    TenantSession(session): TenantSession,
) -> Result<Json<Vec<UserView>>, ApiError> {
    require_role(&ctx, Role::Admin)?;
    let users = session.list_users().await?;
    Ok(Json(users.into_iter().map(UserView::from).collect()))
}

pub async fn create(
    State(state): State<AppState>,
    AuthContext(ctx): AuthContext,
    TenantSession(session): TenantSession,
    ApiJson(request): ApiJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserView>), ApiError> {
    require_role(&ctx, Role::Admin)?;

    if !is_valid_email(&request.email) {
        return Err(ApiError::Validation("Invalid email address".into()));
    }
    check_password(&request.password, state.config().auth.min_password_length)?;

    let password_hash = hash_blocking(request.password).await?;
    let user = session
        .create_user(NewUser {
            email: request.email,
            password_hash,
            full_name: request.full_name,
            role: request.role,
        })
        .await?;

    tracing::info!(tenant_id = %ctx.tenant_id, user_id = %user.id, role = user.role.as_str(), "User created");
    Ok((StatusCode::CREATED, Json(user.into())))
}

pub async fn update(
    AuthContext(ctx): AuthContext,
    TenantSession(session): TenantSession,
    ApiPath(user_id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<UserUpdate>,
) -> Result<Json<UserView>, ApiError> {
    require_role(&ctx, Role::Admin)?;
    let user = session.update_user(user_id, update).await?;
    Ok(Json(user.into()))
}

pub async fn delete(
    AuthContext(ctx): AuthContext,
    TenantSession(session): TenantSession,
    ApiPath(user_id): ApiPath<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    require_role(&ctx, Role::Admin)?;

    // Existence first, so a foreign id is 404 rather than 400.
    let user = session.get_user(user_id).await?;
    if user.id == ctx.subject_id {
        return Err(ApiError::BadRequest("Cannot delete your own account".into()));
    }

    session.delete_user(user_id).await?;
    tracing::info!(tenant_id = %ctx.tenant_id, user_id = %user_id, "User deleted");
    Ok(Json(MessageResponse::new("User deleted successfully")))
}
