use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::models::{CommentView, Group, PostView, User};
use crate::params::Page;

fn e(text: &str) -> String {
    encode_text(text).to_string()
}

fn attr(value: &str) -> String {
    encode_double_quoted_attribute(value).to_string()
}

fn layout(title: &str, viewer: Option<&User>, body: &str) -> String {
    let account = match viewer {
        Some(user) => format!(
            r#"<a href="/profile/{u}/">{name}</a> <a href="/follow/">Feed</a> <a href="/create/">New post</a> <a href="/auth/logout/">Log out</a>"#,
            u = attr(&user.username),
            name = e(&user.username),
        ),
        None => r#"<a href="/auth/login/">Log in</a> <a href="/auth/signup/">Sign up</a>"#
            .to_string(),
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>{title} · Citrine</title></head>
<body>
<nav><a href="/">Citrine</a> <a href="/about/author/">Author</a> <a href="/about/tech/">Tech</a> | {account}</nav>
<main>
{body}
</main>
</body>
</html>
"#,
        title = e(title),
    )
}

fn post_card(post: &PostView) -> String {
    let group_line = match (&post.group_id, &post.group_title) {
        (Some(_), Some(title)) => format!(r#" in <span class="group">{}</span>"#, e(title)),
        _ => String::new(),
    };
    let image = match &post.image {
        Some(path) => format!(r#"<img src="/media/{}" alt="">"#, attr(path)),
        None => String::new(),
    };

    format!(
        r#"<article class="post" data-post-id="{id}">
<header><a href="/profile/{author_attr}/">{author}</a>{group_line} · {date}</header>
{image}
<p>{text}</p>
<footer><a href="/posts/{id}/">Open</a></footer>
</article>"#,
        id = post.id,
        author_attr = attr(&post.author_username),
        author = e(&post.author_username),
        date = post.pub_date.format("%Y-%m-%d %H:%M"),
        text = e(&post.text),
    )
}

fn posts_section(page: &Page<PostView>, base_path: &str) -> String {
    let mut out = String::new();
    for post in &page.items {
        out.push_str(&post_card(post));
        out.push('\n');
    }
    if page.items.is_empty() {
        out.push_str("<p>No posts yet.</p>\n");
    }

    let mut nav = String::new();
    if page.has_previous() {
        nav.push_str(&format!(
            r#"<a href="{base_path}?page={}">Previous</a> "#,
            page.number() - 1
        ));
    }
    nav.push_str(&format!(
        "page {} of {}",
        page.number(),
        page.total_pages()
    ));
    if page.has_next() {
        nav.push_str(&format!(
            r#" <a href="{base_path}?page={}">Next</a>"#,
            page.number() + 1
        ));
    }
    out.push_str(&format!("<nav class=\"pages\">{nav}</nav>"));
    out
}

pub fn index_page(page: &Page<PostView>, viewer: Option<&User>) -> String {
    let body = format!("<h1>Latest posts</h1>\n{}", posts_section(page, "/"));
    layout("Latest posts", viewer, &body)
}

pub fn group_page(group: &Group, page: &Page<PostView>, viewer: Option<&User>) -> String {
    let body = format!(
        "<h1>{title}</h1>\n<p>{description}</p>\n{posts}",
        title = e(&group.title),
        description = e(&group.description),
        posts = posts_section(page, &format!("/group/{}/", attr(&group.slug))),
    );
    layout(&group.title, viewer, &body)
}

pub fn profile_page(
    author: &User,
    page: &Page<PostView>,
    following: Option<bool>,
    viewer: Option<&User>,
) -> String {
    let follow_controls = match following {
        Some(true) => format!(
            r#"<a class="unfollow" href="/profile/{}/unfollow/">Unfollow</a>"#,
            attr(&author.username)
        ),
        Some(false) => format!(
            r#"<a class="follow" href="/profile/{}/follow/">Follow</a>"#,
            attr(&author.username)
        ),
        None => String::new(),
    };
    let body = format!(
        "<h1>Posts by {name}</h1>\n<p>{count} post(s). {follow_controls}</p>\n{posts}",
        name = e(&author.username),
        count = page.window.total_items,
        posts = posts_section(page, &format!("/profile/{}/", attr(&author.username))),
    );
    layout(&author.username, viewer, &body)
}

pub fn follow_page(page: &Page<PostView>, viewer: Option<&User>) -> String {
    let body = format!(
        "<h1>Posts from authors you follow</h1>\n{}",
        posts_section(page, "/follow/")
    );
    layout("Your feed", viewer, &body)
}

pub fn post_detail_page(
    post: &PostView,
    comments: &[CommentView],
    viewer: Option<&User>,
) -> String {
    let mut comment_block = String::from("<h2>Comments</h2>\n");
    for comment in comments {
        comment_block.push_str(&format!(
            r#"<div class="comment"><b>{author}</b> ({date}): {text}</div>
"#,
            author = e(&comment.author_username),
            date = comment.created.format("%Y-%m-%d %H:%M"),
            text = e(&comment.text),
        ));
    }
    if comments.is_empty() {
        comment_block.push_str("<p>No comments yet.</p>\n");
    }

    let comment_form = if viewer.is_some() {
        format!(
            r#"<form method="post" action="/posts/{}/comment/">
<textarea name="text" required></textarea>
<button type="submit">Add comment</button>
</form>"#,
            post.id
        )
    } else {
        r#"<p><a href="/auth/login/">Log in</a> to comment.</p>"#.to_string()
    };

    let edit_link = match viewer {
        Some(user) if user.id == post.author_id => {
            format!(r#"<p><a href="/posts/{}/edit/">Edit</a></p>"#, post.id)
        }
        _ => String::new(),
    };

    let body = format!(
        "{card}\n{edit_link}\n{comment_block}\n{comment_form}",
        card = post_card(post),
    );
    layout("Post", viewer, &body)
}

pub fn post_form_page(
    groups: &[Group],
    text: &str,
    group_id: Option<i64>,
    errors: &[String],
    edit_post_id: Option<i64>,
    viewer: Option<&User>,
) -> String {
    let (heading, action) = match edit_post_id {
        Some(id) => ("Edit post", format!("/posts/{id}/edit/")),
        None => ("New post", "/create/".to_string()),
    };

    let mut options = String::from(r#"<option value="">(no group)</option>"#);
    for group in groups {
        let selected = if group_id == Some(group.id) {
            " selected"
        } else {
            ""
        };
        options.push_str(&format!(
            r#"<option value="{id}"{selected}>{title}</option>"#,
            id = group.id,
            title = e(&group.title),
        ));
    }

    let body = format!(
        r#"<h1>{heading}</h1>
{errors}
<form method="post" action="{action}" enctype="multipart/form-data">
<textarea name="text">{text}</textarea>
<select name="group">{options}</select>
<input type="file" name="image">
<button type="submit">Save</button>
</form>"#,
        errors = error_list(errors),
        text = e(text),
    );
    layout(heading, viewer, &body)
}

pub fn login_page(next: Option<&str>, error: Option<&str>) -> String {
    let next_field = match next {
        Some(next) => format!(r#"<input type="hidden" name="next" value="{}">"#, attr(next)),
        None => String::new(),
    };
    let error_block = match error {
        Some(msg) => format!(r#"<ul class="errors"><li>{}</li></ul>"#, e(msg)),
        None => String::new(),
    };
    let body = format!(
        r#"<h1>Log in</h1>
{error_block}
<form method="post" action="/auth/login/">
<input name="username" placeholder="Username">
<input name="password" type="password" placeholder="Password">
{next_field}
<button type="submit">Log in</button>
</form>"#,
    );
    layout("Log in", None, &body)
}

pub fn signup_page(username: &str, errors: &[String]) -> String {
    let body = format!(
        r#"<h1>Sign up</h1>
{errors}
<form method="post" action="/auth/signup/">
<input name="username" value="{username}" placeholder="Username">
<input name="password" type="password" placeholder="Password">
<button type="submit">Sign up</button>
</form>"#,
        errors = error_list(errors),
        username = attr(username),
    );
    layout("Sign up", None, &body)
}

fn error_list(errors: &[String]) -> String {
    if errors.is_empty() {
        return String::new();
    }
    let mut out = String::from(r#"<ul class="errors">"#);
    for error in errors {
        out.push_str(&format!("<li>{}</li>", e(error)));
    }
    out.push_str("</ul>");
    out
}

pub fn about_author_page(viewer: Option<&User>) -> String {
    let body = "<h1>About the author</h1>\n<p>Citrine is written and run by one person \
                who wanted a quiet corner of the internet for posting.</p>";
    layout("About the author", viewer, body)
}

pub fn about_tech_page(viewer: Option<&User>) -> String {
    let body = "<h1>Technology</h1>\n<p>Citrine is a small Rust service: axum handlers \
                over a SQLite database, with server-rendered pages.</p>";
    layout("Technology", viewer, body)
}

pub fn error_page(title: &str, message: &str) -> String {
    let body = format!("<h1>{}</h1>\n<p>{}</p>", e(title), e(message));
    layout(title, None, &body)
}

pub fn not_found_page() -> String {
    error_page("404 Not Found", "The page you were looking for does not exist.")
}

pub fn server_error_page() -> String {
    error_page("500 Server Error", "Something went wrong on our side.")
}
