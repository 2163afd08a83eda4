use axum::{
    http::StatusCode,
    response::Html,
};

use crate::extractors::MaybeUser;
use crate::render;

pub async fn about_author(MaybeUser(viewer): MaybeUser) -> Html<String> {
    Html(render::about_author_page(viewer.as_ref()))
}

pub async fn about_tech(MaybeUser(viewer): MaybeUser) -> Html<String> {
    Html(render::about_tech_page(viewer.as_ref()))
}

pub async fn not_found() -> (StatusCode, Html<String>) {
    (StatusCode::NOT_FOUND, Html(render::not_found_page()))
}
