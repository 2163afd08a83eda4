#![allow(dead_code)]

use std::str::FromStr;

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tower::ServiceExt;
use uuid::Uuid;

use citrine::config::AppConfig;
use citrine::{auth, routes, AppState};

pub const BOUNDARY: &str = "citrine-test-boundary";

/// Smallest valid GIF, used as the upload fixture.
pub const SMALL_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00,
    0x00, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0C, 0x0A, 0x00, 0x3B,
];

pub struct TestApp {
    pub state: AppState,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with_ttl(20).await
    }

    pub async fn spawn_with_ttl(cache_ttl_secs: u64) -> Self {
        // One connection keeps the in-memory database alive for the
        // whole test.
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .expect("sqlite options")
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .expect("open in-memory database");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("run migrations");

        let media_root = std::env::temp_dir().join(format!("citrine-test-{}", Uuid::new_v4()));
        let config = AppConfig {
            database_url: "sqlite::memory:".to_string(),
            run_migrations: false,
            server_addr: "127.0.0.1:0".to_string(),
            media_root: media_root.to_string_lossy().into_owned(),
            cache_ttl_secs,
        };

        TestApp {
            state: AppState::new(pool, config),
        }
    }

    pub fn router(&self) -> Router {
        routes::create_router(self.state.clone())
    }

    // === Fixtures ===

    pub async fn create_user(&self, username: &str) -> i64 {
        sqlx::query("INSERT INTO users (username, password_hash, joined) VALUES (?, ?, ?)")
            .bind(username)
            .bind("unused-test-hash")
            .bind(Utc::now())
            .execute(&self.state.db)
            .await
            .expect("insert user")
            .last_insert_rowid()
    }

    /// Open a session for the user and return the request cookie.
    pub async fn login(&self, user_id: i64) -> String {
        let token = auth::open_session(&self.state.db, user_id)
            .await
            .expect("open session");
        format!("session={token}")
    }

    pub async fn create_group(&self, title: &str, slug: &str) -> i64 {
        sqlx::query("INSERT INTO groups (title, slug, description) VALUES (?, ?, ?)")
            .bind(title)
            .bind(slug)
            .bind(format!("{title} description"))
            .execute(&self.state.db)
            .await
            .expect("insert group")
            .last_insert_rowid()
    }

    pub async fn create_post(&self, author_id: i64, text: &str, group_id: Option<i64>) -> i64 {
        sqlx::query(
            "INSERT INTO posts (text, pub_date, author_id, group_id) VALUES (?, ?, ?, ?)",
        )
        .bind(text)
        .bind(Utc::now())
        .bind(author_id)
        .bind(group_id)
        .execute(&self.state.db)
        .await
        .expect("insert post")
        .last_insert_rowid()
    }

    pub async fn count(&self, table: &str) -> i64 {
        let sql = format!("SELECT COUNT(*) FROM {table}");
        sqlx::query_scalar::<_, i64>(&sql)
            .fetch_one(&self.state.db)
            .await
            .expect("count rows")
    }

    // === Requests ===

    pub async fn get(&self, path: &str) -> Response<Body> {
        let request = Request::builder()
            .uri(path)
            .body(Body::empty())
            .expect("build request");
        self.router().oneshot(request).await.expect("handle request")
    }

    pub async fn get_as(&self, path: &str, cookie: &str) -> Response<Body> {
        let request = Request::builder()
            .uri(path)
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .expect("build request");
        self.router().oneshot(request).await.expect("handle request")
    }

    pub async fn post_form(
        &self,
        path: &str,
        cookie: Option<&str>,
        body: &str,
    ) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = builder
            .body(Body::from(body.to_string()))
            .expect("build request");
        self.router().oneshot(request).await.expect("handle request")
    }

    pub async fn post_multipart(
        &self,
        path: &str,
        cookie: Option<&str>,
        body: Vec<u8>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method("POST").uri(path).header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = builder.body(Body::from(body)).expect("build request");
        self.router().oneshot(request).await.expect("handle request")
    }
}

/// Encode a post form the way a browser submits it.
pub fn multipart_body(
    fields: &[(&str, &str)],
    file: Option<(&str, &str, &[u8])>,
) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((name, filename, data)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; \
                 filename=\"{filename}\"\r\nContent-Type: image/gif\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

pub fn assert_redirects_to(response: &Response<Body>, target: &str) {
    assert!(
        response.status().is_redirection(),
        "expected a redirect, got {}",
        response.status()
    );
    assert_eq!(location(response), target);
}

pub fn assert_login_redirect(response: &Response<Body>) {
    assert!(
        response.status().is_redirection(),
        "expected a redirect, got {}",
        response.status()
    );
    assert!(
        location(response).starts_with("/auth/login/"),
        "expected a login redirect, got {}",
        location(response)
    );
}

pub fn assert_status(response: &Response<Body>, status: StatusCode) {
    assert_eq!(response.status(), status);
}
