//! Settings, profile and account administration.

use axum::extract::{Path, State};
use axum::routing::{delete, get, put};
use axum::{Extension, Json, Router, middleware};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::Result;
use crate::router::{ApiResponse, Deleted, Valid};
use crate::user::{AuthUser, Settings, SettingsPatch, User, UserRepository};
use crate::{AppState, ServerError};

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/settings", get(get_settings).put(update_settings))
        .route("/profile", put(update_profile))
        .route("/password", put(update_password))
        .route("/{id}/activate", put(set_active))
        .route("/{id}", delete(delete_user))
        .route_layer(middleware::from_fn_with_state(state, super::gate))
}

/// Handler to read the caller's settings document.
pub async fn get_settings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ApiResponse<Settings>>> {
    let user = UserRepository::new(state.db.postgres.clone())
        .find_by_id(auth.id)
        .await?
        .ok_or(ServerError::Unauthorized)?;

    Ok(ApiResponse::new(user.settings))
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SettingsBody {
    pub settings: SettingsPatch,
}

/// Handler to update settings, section by section. A section absent from the
/// body keeps its stored value; a present section is replaced whole.
pub async fn update_settings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Valid(body): Valid<SettingsBody>,
) -> Result<Json<ApiResponse<Settings>>> {
    let repo = UserRepository::new(state.db.postgres.clone());
    let mut user = repo
        .find_by_id(auth.id)
        .await?
        .ok_or(ServerError::Unauthorized)?;

    user.settings.merge(body.settings);
    repo.update_settings(auth.id, &user.settings).await?;

    Ok(ApiResponse::new(user.settings))
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ProfileBody {
    #[validate(length(min = 1, max = 50, message = "Name must be 1 to 50 characters long."))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 50, message = "Role must be 1 to 50 characters long."))]
    pub role: Option<String>,
}

/// Handler to update display name and role label.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Valid(body): Valid<ProfileBody>,
) -> Result<Json<ApiResponse<User>>> {
    let user = UserRepository::new(state.db.postgres.clone())
        .update_profile(auth.id, body.name, body.role)
        .await?
        .ok_or(ServerError::Unauthorized)?;

    Ok(ApiResponse::new(user))
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PasswordBody {
    #[validate(length(min = 1, message = "Current password is required."))]
    pub current_password: String,
    #[validate(length(min = 6, message = "Password must contain at least 6 characters."))]
    pub new_password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PasswordChanged {
    pub changed: bool,
}

/// Handler to rotate the caller's password. The current password is verified
/// first; existing session tokens stay valid until they expire.
pub async fn update_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Valid(body): Valid<PasswordBody>,
) -> Result<Json<ApiResponse<PasswordChanged>>> {
    let repo = UserRepository::new(state.db.postgres.clone());
    let user = repo
        .find_by_id(auth.id)
        .await?
        .ok_or(ServerError::Unauthorized)?;

    if !state
        .crypto
        .verify_password(&body.current_password, &user.password)?
    {
        return Err(ServerError::InvalidCredentials);
    }

    let phc_hash = state.crypto.hash_password(&body.new_password)?;
    let changed = repo.update_password(auth.id, &phc_hash).await?;
    tracing::info!(user_id = %auth.id, "password rotated");

    Ok(ApiResponse::new(PasswordChanged { changed }))
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ActivateBody {
    pub is_active: bool,
}

/// Handler for the administrative activation toggle.
pub async fn set_active(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
    Valid(body): Valid<ActivateBody>,
) -> Result<Json<ApiResponse<User>>> {
    if !auth.is_admin {
        return Err(ServerError::Unauthorized);
    }

    let user = UserRepository::new(state.db.postgres.clone())
        .set_active(user_id, body.is_active)
        .await?
        .ok_or(ServerError::NotFound("user"))?;
    tracing::info!(target = %user_id, active = body.is_active, admin = %auth.id, "activity flag updated");

    Ok(ApiResponse::new(user))
}

/// Handler for administrative account removal. The target's tasks are left in
/// place and become unreachable rather than being cascaded.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Deleted>>> {
    if !auth.is_admin {
        return Err(ServerError::Unauthorized);
    }

    let found = UserRepository::new(state.db.postgres.clone())
        .delete(user_id)
        .await?;
    if !found {
        return Err(ServerError::NotFound("user"));
    }
    tracing::info!(target = %user_id, admin = %auth.id, "user deleted");

    Ok(ApiResponse::new(Deleted { id: user_id }))
}
