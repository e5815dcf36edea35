//! Published posts as the static-site generator sees them:
//! `<content_dir>/<slug>/index.md`, a front matter block followed by the
//! markdown body. Only `title`, `slug` and `tags` are read from the header.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::core::text::content_hash;
use crate::infra::io::read_text;

/// File name of a post inside its directory.
pub const POST_FILE: &str = "index.md";

/// An already-published post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingPost {
    pub path: PathBuf,
    pub slug: String,
    pub title: String,
    pub tags: Vec<String>,
    pub content: String,
    /// BLAKE3 hex digest of `content`.
    pub hash: String,
}

/// Front matter fields the guard cares about; everything else is ignored.
#[derive(Debug, Default, Deserialize)]
struct FrontMatter {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    tags: Option<Tags>,
}

/// `tags` may be a single string or a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Tags {
    One(String),
    Many(Vec<String>),
}

impl From<Tags> for Vec<String> {
    fn from(tags: Tags) -> Self {
        match tags {
            Tags::One(t) => vec![t],
            Tags::Many(ts) => ts,
        }
    }
}

/// Split a document into `(front matter, body)`.
///
/// Recognizes YAML (`---`) and TOML (`+++`) fences on the first line. A
/// document without a fence has no header and is all body.
fn split_front_matter(doc: &str) -> Result<(Option<(&str, char)>, &str)> {
    let first_line_end = doc.find('\n').unwrap_or(doc.len());
    let fence = doc[..first_line_end].trim_end();

    let kind = match fence {
        "---" => '-',
        "+++" => '+',
        _ => return Ok((None, doc)),
    };

    let rest = doc.get(first_line_end + 1..).unwrap_or("");
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == fence {
            let header = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Ok((Some((header, kind)), body));
        }
        offset += line.len();
    }

    bail!("unterminated front matter (missing closing {fence})")
}

/// Parse one post document.
pub fn parse_post(doc: &str, path: &Path) -> Result<ExistingPost> {
    let (header, body) = split_front_matter(doc)?;

    let fm: FrontMatter = match header {
        None => FrontMatter::default(),
        Some((raw, _)) if raw.trim().is_empty() => FrontMatter::default(),
        Some((raw, '-')) => serde_yaml::from_str::<Option<FrontMatter>>(raw)
            .context("invalid YAML front matter")?
            .unwrap_or_default(),
        Some((raw, _)) => toml::from_str(raw).context("invalid TOML front matter")?,
    };

    let dir_slug = path
        .parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(ExistingPost {
        path: path.to_path_buf(),
        slug: fm.slug.filter(|s| !s.is_empty()).unwrap_or(dir_slug),
        title: fm.title.unwrap_or_default(),
        tags: fm.tags.map(Vec::from).unwrap_or_default(),
        hash: content_hash(body),
        content: body.to_string(),
    })
}

/// Load every `<content_dir>/*/index.md`, sorted by path.
///
/// A missing content directory yields no posts. Posts that cannot be read
/// or parsed are skipped with a warning.
pub fn load_existing_posts(content_dir: &Path) -> Result<Vec<ExistingPost>> {
    if !content_dir.exists() {
        debug!("Content dir {} does not exist", content_dir.display());
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(content_dir)
        .with_context(|| format!("read content dir: {}", content_dir.display()))?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .map(|p| p.join(POST_FILE))
        .filter(|p| p.is_file())
        .collect();
    files.sort();

    let mut posts = Vec::with_capacity(files.len());
    for file in files {
        match read_text(&file).and_then(|doc| parse_post(&doc, &file)) {
            Ok(p) => posts.push(p),
            Err(e) => warn!("Could not load post {}: {e:#}", file.display()),
        }
    }

    debug!(count = posts.len(), "Loaded existing posts");
    Ok(posts)
}
