use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use uuid::Uuid;

/// Subdirectory of the media root that post images land in.
const POST_IMAGE_DIR: &str = "posts";

/// Owns the media root directory and the naming of stored uploads.
/// Serving the files back is left to the web server in front.
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store an uploaded post image and return its relative media path,
    /// e.g. `posts/small.gif`. A name already taken gets a short random
    /// suffix before the extension.
    pub fn save_post_image(&self, file_name: &str, data: &[u8]) -> anyhow::Result<String> {
        let dir = self.root.join(POST_IMAGE_DIR);
        fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

        let mut name = sanitize_file_name(file_name);
        if dir.join(&name).exists() {
            name = decollide(&name);
        }

        let target = dir.join(&name);
        fs::write(&target, data).with_context(|| format!("writing {}", target.display()))?;

        Ok(format!("{POST_IMAGE_DIR}/{name}"))
    }
}

/// Strip any path components and characters that do not belong in a
/// stored file name.
fn sanitize_file_name(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload");

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches(|c| c == '.' || c == '_').is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

fn decollide(name: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    let short = &suffix[..8];
    match name.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem}_{short}.{ext}"),
        None => format!("{name}_{short}"),
    }
}
