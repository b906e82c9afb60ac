//! HTTP routes.

pub mod auth;
pub mod notifications;
pub mod tasks;
pub mod users;

use axum::Json;
use axum::extract::{FromRequest, FromRequestParts, Query, Request, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, header};
use axum::middleware;
use axum::response::Response;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::user::UserRepository;
use crate::{AppState, ServerError};

const BEARER: &str = "Bearer ";
const TOKEN_COOKIE: &str = "token";

/// Success envelope: `{"status": true, "data": ...}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Json<Self> {
        Json(Self { status: true, data })
    }
}

/// Acknowledgement payload for delete-like operations.
#[derive(Debug, Serialize, Deserialize)]
pub struct Deleted {
    pub id: Uuid,
}

/// JSON extractor running `validator` rules before the handler.
pub struct Valid<T>(pub T);

impl<S, T> FromRequest<S> for Valid<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// Query extractor whose rejection flows through [`ServerError`], so a
/// malformed query string gets the same failure envelope as everything else.
pub struct ValidQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == TOKEN_COOKIE).then(|| value.to_owned())
        })
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix(BEARER)
        .map(str::to_owned)
}

/// Access gate for protected sub-routers.
///
/// Accepts the session token from the `token` cookie first, then from the
/// `Authorization: Bearer` header. On success the authenticated identity is
/// attached as a request extension; the gate itself has no side effect.
pub(crate) async fn gate(
    State(state): State<AppState>,
    mut req: Request,
    next: middleware::Next,
) -> Result<Response, ServerError> {
    let headers = req.headers();
    let token = cookie_token(headers)
        .or_else(|| bearer_token(headers))
        .ok_or(ServerError::Unauthorized)?;

    let claims = state
        .token
        .decode(&token)
        .map_err(|_| ServerError::Unauthorized)?;

    let identity = UserRepository::new(state.db.postgres.clone())
        .identity(claims.sub)
        .await?
        .ok_or(ServerError::Unauthorized)?;

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

/// MUST NEVER be used in production.
#[cfg(test)]
pub(crate) fn state(pool: sqlx::PgPool) -> AppState {
    use std::sync::Arc;

    let config = crate::config::Configuration::default();
    let crypto = crate::crypto::PasswordManager::new(Some(crate::config::Argon2 {
        memory_cost: 1024,
        iterations: 1,
        parallelism: 1,
        hash_length: 32,
    }))
    .expect("cannot build password manager");

    AppState {
        config: Arc::new(config),
        db: crate::database::Database { postgres: pool },
        crypto: Arc::new(crypto),
        token: crate::token::TokenManager::new("taskhub-tests", "an-hmac-secret-for-tests"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(name: header::HeaderName, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_cookie_token_extraction() {
        let headers = headers(header::COOKIE, "theme=dark; token=abc.def.ghi; lang=en");
        assert_eq!(cookie_token(&headers), Some("abc.def.ghi".to_owned()));

        let headers = self::headers(header::COOKIE, "theme=dark");
        assert_eq!(cookie_token(&headers), None);
    }

    #[test]
    fn test_bearer_token_extraction() {
        let headers = headers(header::AUTHORIZATION, "Bearer abc.def.ghi");
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi".to_owned()));

        let headers = self::headers(header::AUTHORIZATION, "Basic dXNlcjpwYXNz");
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_cookie_takes_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("token=from-cookie"));
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer from-header"),
        );

        let token = cookie_token(&headers).or_else(|| bearer_token(&headers));
        assert_eq!(token, Some("from-cookie".to_owned()));
    }
}
