pub mod accounts;
pub mod pages;
pub mod posts;

use crate::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(posts::index))
        .route("/group/{slug}/", get(posts::group_list))
        .route("/profile/{username}/", get(posts::profile))
        .route("/profile/{username}/follow/", get(posts::profile_follow))
        .route("/profile/{username}/unfollow/", get(posts::profile_unfollow))
        .route("/posts/{post_id}/", get(posts::post_detail))
        .route(
            "/create/",
            get(posts::post_create_form).post(posts::post_create),
        )
        .route(
            "/posts/{post_id}/edit/",
            get(posts::post_edit_form).post(posts::post_edit),
        )
        .route("/posts/{post_id}/comment/", post(posts::add_comment))
        .route("/follow/", get(posts::follow_index))
        .route("/about/author/", get(pages::about_author))
        .route("/about/tech/", get(pages::about_tech))
        .route(
            "/auth/signup/",
            get(accounts::signup_form).post(accounts::signup),
        )
        .route(
            "/auth/login/",
            get(accounts::login_form).post(accounts::login),
        )
        .route("/auth/logout/", get(accounts::logout))
        .fallback(pages::not_found)
        .with_state(state)
}
