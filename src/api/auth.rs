//! Registration, login and token refresh.

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::extract::ApiJson;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::{Identity, Role, TokenKind};
use crate::error::ApiError;
use crate::http::server::AppState;
use crate::models::organization::is_valid_slug;
use crate::models::user::is_valid_email;
use crate::models::{NewUser, Organization, User};
use crate::tasks::Job;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub organization_name: String,
    pub organization_slug: String,
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

fn identity_of(user: &User) -> Identity {
    Identity {
        subject: user.id,
        email: user.email.clone(),
        tenant_id: user.organization_id,
        role: user.role,
    }
}

fn token_pair(state: &AppState, identity: &Identity, refresh_token: Option<String>) -> Result<TokenResponse, ApiError> {
    let access_token = state.tokens.issue_access(identity)?;
    let refresh_token = match refresh_token {
        Some(token) => token,
        None => state.tokens.issue_refresh(identity)?,
    };
    Ok(TokenResponse {
        access_token,
        refresh_token,
        token_type: "bearer".to_string(),
        expires_in: state.tokens.access_ttl_secs(),
    })
}

/// Check password length against the configured minimum.
pub(crate) fn check_password(password: &str, min_len: usize) -> Result<(), ApiError> {
    if password.chars().count() < min_len {
        return Err(ApiError::Validation(format!(
            "Password must be at least {min_len} characters"
        )));
    }
    Ok(())
}

/// Hash on the blocking pool.
pub(crate) async fn hash_blocking(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::from)
}

async fn verify_blocking(password: String, hash: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    let config = state.config();
    if !config.features.signup {
        return Err(ApiError::Forbidden("Signup is currently disabled".into()));
    }

    let name = request.organization_name.trim();
    if name.is_empty() || name.len() > 255 {
        return Err(ApiError::Validation("Organization name must be 1-255 characters".into()));
    }
    if !is_valid_slug(&request.organization_slug) {
        return Err(ApiError::Validation(
            "Organization slug must be 3-100 lowercase letters, digits or hyphens".into(),
        ));
    }
    if !is_valid_email(&request.email) {
        return Err(ApiError::Validation("Invalid email address".into()));
    }
    check_password(&request.password, config.auth.min_password_length)?;

    let password_hash = hash_blocking(request.password).await?;
    let organization = Organization::new(name.to_string(), request.organization_slug, Utc::now());
    let admin = NewUser {
        email: request.email,
        password_hash,
        full_name: request.full_name,
        role: Role::Admin,
    };

    let (organization, user) = state.persistence.register_organization(organization, admin).await?;
    state.tiers.set(organization.id, organization.subscription_tier);

    tracing::info!(
        organization_id = %organization.id,
        slug = %organization.slug,
        user_id = %user.id,
        "Organization registered"
    );

    state.tasks.enqueue(Job::WelcomeNotification {
        email: user.email.clone(),
        organization_name: organization.name.clone(),
    });

    let tokens = token_pair(&state, &identity_of(&user), None)?;
    Ok((StatusCode::CREATED, Json(tokens)))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let invalid = || ApiError::Unauthorized("Incorrect email or password".into());

    let user = state
        .persistence
        .user_by_email(&request.email)
        .await?
        .ok_or_else(invalid)?;

    if !verify_blocking(request.password, user.password_hash.clone()).await? {
        tracing::info!(user_id = %user.id, "Login failed: wrong password");
        return Err(invalid());
    }
    if !user.is_active {
        return Err(ApiError::Forbidden("User account is disabled".into()));
    }

    let organization = state.persistence.organization_by_id(user.organization_id).await?;
    let organization = match organization {
        Some(org) if org.is_active => org,
        _ => return Err(ApiError::Forbidden("Organization is disabled".into())),
    };

    state.persistence.record_login(user.id, Utc::now()).await?;
    state.tiers.set(organization.id, organization.subscription_tier);

    tracing::info!(user_id = %user.id, organization_id = %organization.id, "User logged in");
    Ok(Json(token_pair(&state, &identity_of(&user), None)?))
}

pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RefreshRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let rejected = || ApiError::Unauthorized("Could not validate refresh token".into());

    let claims = state
        .tokens
        .verify_kind(&request.refresh_token, TokenKind::Refresh)
        .map_err(|e| {
            tracing::debug!(error = %e, "Refresh token rejected");
            rejected()
        })?;

    let user = match state.persistence.user_by_id(claims.sub).await? {
        Some(user) if user.is_active => user,
        _ => return Err(rejected()),
    };

    Ok(Json(token_pair(&state, &identity_of(&user), Some(request.refresh_token))?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_minimum() {
        assert!(check_password("12345678", 8).is_ok());
        assert!(matches!(check_password("1234567", 8), Err(ApiError::Validation(_))));
    }
}
