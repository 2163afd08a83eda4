use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use sqlx::SqlitePool;

use crate::auth::SESSION_COOKIE;
use crate::error::AppError;
use crate::models::User;

/// The authenticated requester; rejects with a login redirect.
pub struct CurrentUser(pub User);

/// The requester if a valid session cookie is present, `None` otherwise.
pub struct MaybeUser(pub Option<User>);

pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

async fn session_user(pool: &SqlitePool, headers: &HeaderMap) -> Result<Option<User>, AppError> {
    let Some(token) = session_token(headers) else {
        return Ok(None);
    };

    let user = sqlx::query_as::<_, User>(
        "SELECT u.id, u.username, u.password_hash, u.joined
         FROM sessions s
         JOIN users u ON u.id = s.user_id
         WHERE s.token = ?",
    )
    .bind(&token)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

impl<S> FromRequestParts<S> for CurrentUser
where
    SqlitePool: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let pool = SqlitePool::from_ref(state);

        match session_user(&pool, &parts.headers).await? {
            Some(user) => Ok(CurrentUser(user)),
            None => Err(AppError::login_redirect(parts.uri.path())),
        }
    }
}

impl<S> FromRequestParts<S> for MaybeUser
where
    SqlitePool: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let pool = SqlitePool::from_ref(state);
        Ok(MaybeUser(session_user(&pool, &parts.headers).await?))
    }
}
