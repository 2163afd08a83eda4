use axum::{
    extract::{Query, State},
    http::header::SET_COOKIE,
    http::HeaderMap,
    response::{AppendHeaders, Html, IntoResponse, Redirect, Response},
    Form,
};
use chrono::Utc;
use serde::Deserialize;

use crate::error::AppError;
use crate::extractors::session_token;
use crate::{auth, render, AppState};

const MIN_PASSWORD_LENGTH: usize = 3;
const MAX_USERNAME_LENGTH: usize = 50;

#[derive(Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub next: Option<String>,
}

#[derive(Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

pub async fn login_form(Query(query): Query<LoginQuery>) -> Html<String> {
    Html(render::login_page(query.next.as_deref(), None))
}

pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let user = auth::find_user_by_username(&state.db, &form.username)
        .await?
        .filter(|u| auth::verify_password(&form.password, &u.password_hash));

    let Some(user) = user else {
        return Ok(Html(render::login_page(
            form.next.as_deref(),
            Some("Invalid username or password."),
        ))
        .into_response());
    };

    let token = auth::open_session(&state.db, user.id).await?;

    // Only same-site targets; anything else falls back to the index.
    let target = form
        .next
        .filter(|n| n.starts_with('/'))
        .unwrap_or_else(|| "/".to_string());

    Ok((
        AppendHeaders([(SET_COOKIE, auth::session_cookie(&token))]),
        Redirect::to(&target),
    )
        .into_response())
}

pub async fn signup_form() -> Html<String> {
    Html(render::signup_page("", &[]))
}

fn validate_signup(form: &SignupForm) -> Vec<String> {
    let mut errors = Vec::new();

    let username = form.username.trim();
    if username.is_empty() {
        errors.push("Username is required.".to_string());
    } else if username.len() > MAX_USERNAME_LENGTH {
        errors.push("Username is too long.".to_string());
    } else if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        errors.push("Username may only contain letters, digits, '-' and '_'.".to_string());
    }

    if form.password.len() < MIN_PASSWORD_LENGTH {
        errors.push("Password must be at least 3 characters.".to_string());
    }

    errors
}

pub async fn signup(
    State(state): State<AppState>,
    Form(form): Form<SignupForm>,
) -> Result<Response, AppError> {
    let errors = validate_signup(&form);
    if !errors.is_empty() {
        return Ok(Html(render::signup_page(&form.username, &errors)).into_response());
    }

    let username = form.username.trim();
    let password_hash = auth::hash_password(&form.password)?;

    let inserted = sqlx::query("INSERT INTO users (username, password_hash, joined) VALUES (?, ?, ?)")
        .bind(username)
        .bind(&password_hash)
        .bind(Utc::now())
        .execute(&state.db)
        .await;

    match inserted {
        Ok(_) => {}
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
            return Ok(Html(render::signup_page(
                username,
                &["That username is already taken.".to_string()],
            ))
            .into_response());
        }
        Err(e) => return Err(e.into()),
    }

    let user = auth::find_user_by_username(&state.db, username)
        .await?
        .ok_or_else(|| anyhow::anyhow!("user vanished right after signup"))?;
    let token = auth::open_session(&state.db, user.id).await?;

    Ok((
        AppendHeaders([(SET_COOKIE, auth::session_cookie(&token))]),
        Redirect::to("/"),
    )
        .into_response())
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if let Some(token) = session_token(&headers) {
        auth::close_session(&state.db, &token).await?;
    }

    Ok((
        AppendHeaders([(SET_COOKIE, auth::clear_session_cookie())]),
        Redirect::to("/"),
    )
        .into_response())
}
