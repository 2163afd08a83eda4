use axum::{
    extract::{Multipart, Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::error::AppError;
use crate::extractors::{CurrentUser, MaybeUser};
use crate::models::{CommentView, Group, Post, PostView};
use crate::params::{Page, PageQuery, PageWindow};
use crate::{auth, render, AppState};

/// Cache key family for the index listing; one entry per page number.
const INDEX_CACHE_KEY: &str = "index_page";

const POST_VIEW_SELECT: &str = "SELECT
        p.id,
        p.text,
        p.pub_date,
        p.author_id,
        p.group_id,
        p.image,
        u.username AS author_username,
        g.title AS group_title
    FROM posts p
    JOIN users u ON u.id = p.author_id
    LEFT JOIN groups g ON g.id = p.group_id";

enum PostFilter {
    All,
    InGroup(i64),
    ByAuthor(i64),
    FollowedBy(i64),
}

impl PostFilter {
    fn where_clause(&self) -> &'static str {
        match self {
            PostFilter::All => "",
            PostFilter::InGroup(_) => "WHERE p.group_id = ?",
            PostFilter::ByAuthor(_) => "WHERE p.author_id = ?",
            PostFilter::FollowedBy(_) => {
                "WHERE p.author_id IN (SELECT author_id FROM follows WHERE user_id = ?)"
            }
        }
    }

    fn bind_id(&self) -> Option<i64> {
        match self {
            PostFilter::All => None,
            PostFilter::InGroup(id) | PostFilter::ByAuthor(id) | PostFilter::FollowedBy(id) => {
                Some(*id)
            }
        }
    }
}

/// Count, clamp the requested page, and fetch one window of posts,
/// newest first.
async fn load_page(
    pool: &SqlitePool,
    filter: PostFilter,
    requested: i64,
) -> Result<Page<PostView>, AppError> {
    let count_sql = format!("SELECT COUNT(*) FROM posts p {}", filter.where_clause());
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    if let Some(id) = filter.bind_id() {
        count_query = count_query.bind(id);
    }
    let total_items = count_query.fetch_one(pool).await?;

    let window = PageWindow::clamp(total_items, requested);

    let page_sql = format!(
        "{POST_VIEW_SELECT} {} ORDER BY p.pub_date DESC, p.id DESC LIMIT ? OFFSET ?",
        filter.where_clause()
    );
    let mut page_query = sqlx::query_as::<_, PostView>(&page_sql);
    if let Some(id) = filter.bind_id() {
        page_query = page_query.bind(id);
    }
    let items = page_query
        .bind(window.limit())
        .bind(window.offset())
        .fetch_all(pool)
        .await?;

    Ok(window.into_page(items))
}

async fn list_groups(pool: &SqlitePool) -> Result<Vec<Group>, AppError> {
    let groups =
        sqlx::query_as::<_, Group>("SELECT id, title, slug, description FROM groups ORDER BY title")
            .fetch_all(pool)
            .await?;
    Ok(groups)
}

async fn find_post(pool: &SqlitePool, post_id: i64) -> Result<Option<Post>, AppError> {
    let post = sqlx::query_as::<_, Post>(
        "SELECT id, text, pub_date, author_id, group_id, image FROM posts WHERE id = ?",
    )
    .bind(post_id)
    .fetch_optional(pool)
    .await?;
    Ok(post)
}

pub async fn index(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Query(params): Query<PageQuery>,
) -> Result<Response, AppError> {
    let cache_key = format!("{INDEX_CACHE_KEY}:p{}", params.number());
    if let Some(body) = state.cache.get(&cache_key) {
        return Ok(Html(body).into_response());
    }

    let page = load_page(&state.db, PostFilter::All, params.number()).await?;
    let body = render::index_page(&page, viewer.as_ref());
    state.cache.put(cache_key, body.clone());

    Ok(Html(body).into_response())
}

pub async fn group_list(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(slug): Path<String>,
    Query(params): Query<PageQuery>,
) -> Result<Html<String>, AppError> {
    let group =
        sqlx::query_as::<_, Group>("SELECT id, title, slug, description FROM groups WHERE slug = ?")
            .bind(&slug)
            .fetch_optional(&state.db)
            .await?
            .ok_or(AppError::NotFound)?;

    let page = load_page(&state.db, PostFilter::InGroup(group.id), params.number()).await?;

    Ok(Html(render::group_page(&group, &page, viewer.as_ref())))
}

pub async fn profile(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(username): Path<String>,
    Query(params): Query<PageQuery>,
) -> Result<Html<String>, AppError> {
    let author = auth::find_user_by_username(&state.db, &username)
        .await?
        .ok_or(AppError::NotFound)?;

    let page = load_page(&state.db, PostFilter::ByAuthor(author.id), params.number()).await?;

    // Follow controls only make sense for someone else's profile.
    let following = match &viewer {
        Some(user) if user.id != author.id => {
            Some(follow_exists(&state.db, user.id, author.id).await?)
        }
        _ => None,
    };

    Ok(Html(render::profile_page(
        &author,
        &page,
        following,
        viewer.as_ref(),
    )))
}

pub async fn follow_index(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<PageQuery>,
) -> Result<Html<String>, AppError> {
    let page = load_page(&state.db, PostFilter::FollowedBy(user.id), params.number()).await?;
    Ok(Html(render::follow_page(&page, Some(&user))))
}

pub async fn post_detail(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(post_id): Path<i64>,
) -> Result<Html<String>, AppError> {
    let sql = format!("{POST_VIEW_SELECT} WHERE p.id = ?");
    let post = sqlx::query_as::<_, PostView>(&sql)
        .bind(post_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound)?;

    let comments = sqlx::query_as::<_, CommentView>(
        "SELECT c.id, c.text, c.created, u.username AS author_username
         FROM comments c
         JOIN users u ON u.id = c.author_id
         WHERE c.post_id = ?
         ORDER BY c.created ASC, c.id ASC",
    )
    .bind(post_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Html(render::post_detail_page(
        &post,
        &comments,
        viewer.as_ref(),
    )))
}

// === Post form ===

struct PostForm {
    text: String,
    group: String,
    image: Option<ImageUpload>,
}

struct ImageUpload {
    file_name: String,
    data: Vec<u8>,
}

struct ValidPost {
    text: String,
    group_id: Option<i64>,
    image: Option<ImageUpload>,
}

impl PostForm {
    async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = PostForm {
            text: String::new(),
            group: String::new(),
            image: None,
        };

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
        {
            let name = field.name().map(str::to_string);
            match name.as_deref() {
                Some("text") => {
                    form.text = field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?;
                }
                Some("group") => {
                    form.group = field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?;
                }
                Some("image") => {
                    let file_name = field.file_name().map(str::to_string);
                    let data = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?;
                    // Browsers submit an empty file part when nothing was picked.
                    if let Some(file_name) = file_name {
                        if !data.is_empty() {
                            form.image = Some(ImageUpload {
                                file_name,
                                data: data.to_vec(),
                            });
                        }
                    }
                }
                _ => {}
            }
        }

        Ok(form)
    }

    fn group_id(&self) -> Option<i64> {
        self.group.trim().parse::<i64>().ok()
    }

    fn validate(self, groups: &[Group]) -> Result<ValidPost, (Self, Vec<String>)> {
        let mut errors = Vec::new();

        let text = self.text.trim().to_string();
        if text.is_empty() {
            errors.push("Post text is required.".to_string());
        }

        let group_id = match self.group.trim() {
            "" => None,
            raw => match raw.parse::<i64>() {
                Ok(id) if groups.iter().any(|g| g.id == id) => Some(id),
                _ => {
                    errors.push("Select a valid group.".to_string());
                    None
                }
            },
        };

        if errors.is_empty() {
            Ok(ValidPost {
                text,
                group_id,
                image: self.image,
            })
        } else {
            Err((self, errors))
        }
    }
}

pub async fn post_create_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Html<String>, AppError> {
    let groups = list_groups(&state.db).await?;
    Ok(Html(render::post_form_page(
        &groups,
        "",
        None,
        &[],
        None,
        Some(&user),
    )))
}

pub async fn post_create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let form = PostForm::from_multipart(multipart).await?;
    let groups = list_groups(&state.db).await?;

    match form.validate(&groups) {
        Ok(valid) => {
            let image_path = match &valid.image {
                Some(upload) => Some(state.media.save_post_image(&upload.file_name, &upload.data)?),
                None => None,
            };

            sqlx::query(
                "INSERT INTO posts (text, pub_date, author_id, group_id, image)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&valid.text)
            .bind(Utc::now())
            .bind(user.id)
            .bind(valid.group_id)
            .bind(&image_path)
            .execute(&state.db)
            .await?;

            Ok(Redirect::to(&format!("/profile/{}/", user.username)).into_response())
        }
        Err((form, errors)) => Ok(Html(render::post_form_page(
            &groups,
            &form.text,
            form.group_id(),
            &errors,
            None,
            Some(&user),
        ))
        .into_response()),
    }
}

pub async fn post_edit_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<i64>,
) -> Result<Response, AppError> {
    let post = find_post(&state.db, post_id)
        .await?
        .ok_or(AppError::NotFound)?;

    if post.author_id != user.id {
        return Ok(Redirect::to(&format!("/posts/{post_id}/")).into_response());
    }

    let groups = list_groups(&state.db).await?;
    Ok(Html(render::post_form_page(
        &groups,
        &post.text,
        post.group_id,
        &[],
        Some(post.id),
        Some(&user),
    ))
    .into_response())
}

pub async fn post_edit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<i64>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let post = find_post(&state.db, post_id)
        .await?
        .ok_or(AppError::NotFound)?;

    // Only the author may edit; everyone else is bounced to the post.
    if post.author_id != user.id {
        return Ok(Redirect::to(&format!("/posts/{post_id}/")).into_response());
    }

    let form = PostForm::from_multipart(multipart).await?;
    let groups = list_groups(&state.db).await?;

    match form.validate(&groups) {
        Ok(valid) => {
            let image_path = match &valid.image {
                Some(upload) => Some(state.media.save_post_image(&upload.file_name, &upload.data)?),
                None => post.image,
            };

            // Identity, author, and pub_date stay untouched.
            sqlx::query("UPDATE posts SET text = ?, group_id = ?, image = ? WHERE id = ?")
                .bind(&valid.text)
                .bind(valid.group_id)
                .bind(&image_path)
                .bind(post.id)
                .execute(&state.db)
                .await?;

            Ok(Redirect::to(&format!("/posts/{post_id}/")).into_response())
        }
        Err((form, errors)) => Ok(Html(render::post_form_page(
            &groups,
            &form.text,
            form.group_id(),
            &errors,
            Some(post_id),
            Some(&user),
        ))
        .into_response()),
    }
}

// === Comments ===

#[derive(Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub text: String,
}

pub async fn add_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<i64>,
    Form(form): Form<CommentForm>,
) -> Result<Redirect, AppError> {
    find_post(&state.db, post_id)
        .await?
        .ok_or(AppError::NotFound)?;

    // An empty comment is dropped without feedback; the redirect below
    // happens either way.
    let text = form.text.trim();
    if !text.is_empty() {
        sqlx::query("INSERT INTO comments (post_id, author_id, text, created) VALUES (?, ?, ?, ?)")
            .bind(post_id)
            .bind(user.id)
            .bind(text)
            .bind(Utc::now())
            .execute(&state.db)
            .await?;
    }

    Ok(Redirect::to(&format!("/posts/{post_id}/")))
}

// === Follow edges ===

async fn follow_exists(pool: &SqlitePool, user_id: i64, author_id: i64) -> Result<bool, AppError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM follows WHERE user_id = ? AND author_id = ?",
    )
    .bind(user_id)
    .bind(author_id)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

pub async fn profile_follow(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(username): Path<String>,
) -> Result<Redirect, AppError> {
    let author = auth::find_user_by_username(&state.db, &username)
        .await?
        .ok_or(AppError::NotFound)?;

    // Following yourself is a silent no-op; the unique constraint makes
    // a concurrent duplicate insert a no-op as well.
    if author.id != user.id {
        let inserted = sqlx::query("INSERT INTO follows (user_id, author_id) VALUES (?, ?)")
            .bind(user.id)
            .bind(author.id)
            .execute(&state.db)
            .await;

        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {}
            Err(e) => return Err(e.into()),
        }
    }

    Ok(Redirect::to(&format!("/profile/{}/", author.username)))
}

pub async fn profile_unfollow(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(username): Path<String>,
) -> Result<Redirect, AppError> {
    let author = auth::find_user_by_username(&state.db, &username)
        .await?
        .ok_or(AppError::NotFound)?;

    sqlx::query("DELETE FROM follows WHERE user_id = ? AND author_id = ?")
        .bind(user.id)
        .bind(author.id)
        .execute(&state.db)
        .await?;

    Ok(Redirect::to(&format!("/profile/{}/", author.username)))
}
