//! Registration, login and email probe.

use axum::routing::post;
use axum::{Json, Router, extract::State, http::StatusCode};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::Result;
use crate::router::{ApiResponse, Valid};
use crate::user::{Settings, User, UserRepository};
use crate::{AppState, ServerError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/check-email", post(check_email))
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegisterBody {
    #[validate(length(min = 1, max = 50, message = "Name must be 1 to 50 characters long."))]
    pub name: String,
    #[validate(email(message = "Email must be formatted."))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must contain at least 6 characters."))]
    pub password: String,
    #[validate(length(min = 1, max = 50, message = "Role must be 1 to 50 characters long."))]
    pub role: String,
    /// Accepted from older clients, not stored.
    pub title: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub status: bool,
    pub user: User,
    pub token: String,
}

/// Handler to create user.
///
/// Emails are lowercased before the uniqueness check, so two registrations
/// differing only by case collide.
pub async fn register(
    State(state): State<AppState>,
    Valid(body): Valid<RegisterBody>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let email = body.email.to_lowercase();
    let repo = UserRepository::new(state.db.postgres.clone());

    if repo.email_exists(&email).await? {
        return Err(ServerError::Conflict);
    }

    let password = state.crypto.hash_password(&body.password)?;
    let user = repo
        .insert(&User {
            id: Uuid::new_v4(),
            name: body.name,
            email,
            role: body.role,
            password,
            is_admin: false,
            is_active: true,
            settings: Settings::default(),
            created_at: Utc::now(),
        })
        .await?;

    let token = state.token.create(user.id)?;
    tracing::info!(user_id = %user.id, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            status: true,
            user,
            token,
        }),
    ))
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct LoginBody {
    #[validate(email(message = "Email must be formatted."))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
}

/// Handler to authenticate and issue a session token.
///
/// Unknown email and wrong password are indistinguishable; the unknown-email
/// path still burns one argon2 verification so timing does not leak account
/// existence.
pub async fn login(
    State(state): State<AppState>,
    Valid(body): Valid<LoginBody>,
) -> Result<Json<AuthResponse>> {
    let email = body.email.to_lowercase();
    let repo = UserRepository::new(state.db.postgres.clone());

    let Some(user) = repo.find_by_email(&email).await? else {
        state.crypto.verify_decoy(&body.password);
        return Err(ServerError::InvalidCredentials);
    };

    if !user.is_active {
        return Err(ServerError::Deactivated);
    }

    if !state.crypto.verify_password(&body.password, &user.password)? {
        return Err(ServerError::InvalidCredentials);
    }

    let token = state.token.create(user.id)?;

    Ok(Json(AuthResponse {
        status: true,
        user,
        token,
    }))
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CheckEmailBody {
    #[validate(email(message = "Email must be formatted."))]
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckEmail {
    pub exists: bool,
}

/// Existence probe used by the registration form. Not an authentication
/// decision by itself.
pub async fn check_email(
    State(state): State<AppState>,
    Valid(body): Valid<CheckEmailBody>,
) -> Result<Json<ApiResponse<CheckEmail>>> {
    let exists = UserRepository::new(state.db.postgres.clone())
        .email_exists(&body.email.to_lowercase())
        .await?;

    Ok(ApiResponse::new(CheckEmail { exists }))
}
