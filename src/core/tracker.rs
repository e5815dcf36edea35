//! Persistent keyword-usage and post-provenance store.
//!
//! One JSON document with `posts`, `keywords` and `metadata` blocks. The
//! store is loaded once per invocation, mutated in memory and written back
//! with an atomic replace after every mutation. A single writer is assumed;
//! two concurrent invocations can lose each other's updates.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::text;
use crate::infra::io::{read_text, write_atomic};

/// Default maximum number of posts per keyword.
pub const DEFAULT_USAGE_CAP: usize = 3;

/// Length of the hex post identifier.
const POST_ID_LEN: usize = 12;

/// Provenance of one generated post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub keyword: String,
    pub title: String,
    pub content_hash: String,
    pub file_path: String,
    #[serde(alias = "created_at")]
    pub created: String, // RFC3339
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_status() -> String {
    "published".to_string()
}

/// Usage of one keyword. `usage_count` always equals `posts.len()`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordUsage {
    #[serde(default)]
    pub usage_count: usize,
    #[serde(default)]
    pub last_used: Option<String>, // RFC3339
    #[serde(default, alias = "post_ids")]
    pub posts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerMetadata {
    pub created: String,
    pub last_updated: String,
}

impl Default for TrackerMetadata {
    fn default() -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            created: now.clone(),
            last_updated: now,
        }
    }
}

/// On-disk document shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerData {
    #[serde(default)]
    pub posts: IndexMap<String, PostRecord>,
    #[serde(default)]
    pub keywords: IndexMap<String, KeywordUsage>,
    #[serde(default)]
    pub metadata: TrackerMetadata,
}

/// The tracking store bound to its file.
#[derive(Debug)]
pub struct ContentTracker {
    path: PathBuf,
    data: TrackerData,
    usage_cap: usize,
    brand: String,
}

impl ContentTracker {
    /// Load the store at `path`. A missing or unreadable file yields an
    /// empty store; this never fails.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let data = if path.exists() {
            match read_text(&path).and_then(|s| {
                serde_json::from_str::<TrackerData>(&s)
                    .with_context(|| format!("parse tracker: {}", path.display()))
            }) {
                Ok(d) => d,
                Err(e) => {
                    warn!("Could not load content tracker, starting empty: {e:#}");
                    TrackerData::default()
                }
            }
        } else {
            debug!("No tracker at {}, starting empty", path.display());
            TrackerData::default()
        };

        let mut tracker = Self {
            path,
            data,
            usage_cap: DEFAULT_USAGE_CAP,
            brand: String::new(),
        };
        tracker.repair_counts();
        tracker
    }

    /// Override the per-keyword usage cap.
    pub fn with_usage_cap(mut self, cap: usize) -> Self {
        self.usage_cap = cap;
        self
    }

    /// Site-branding suffix ignored when comparing titles.
    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = brand.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn usage_cap(&self) -> usize {
        self.usage_cap
    }

    pub fn data(&self) -> &TrackerData {
        &self.data
    }

    /// Number of recorded posts for `keyword`; zero if never seen.
    pub fn usage_count(&self, keyword: &str) -> usize {
        self.data
            .keywords
            .get(keyword)
            .map_or(0, |k| k.usage_count)
    }

    /// Raw `last_used` timestamp for `keyword`, if any.
    pub fn last_used(&self, keyword: &str) -> Option<&str> {
        self.data
            .keywords
            .get(keyword)
            .and_then(|k| k.last_used.as_deref())
    }

    /// Whether `keyword` has reached the usage cap.
    pub fn is_exhausted(&self, keyword: &str) -> bool {
        self.usage_count(keyword) >= self.usage_cap
    }

    /// Exact case-insensitive title match against any tracked post, or the
    /// keyword's usage cap already reached.
    pub fn is_duplicate_title(&self, keyword: &str, title: &str) -> bool {
        let wanted = text::title_key(title, &self.brand);

        let title_taken = self
            .data
            .posts
            .values()
            .any(|p| text::title_key(&p.title, &self.brand) == wanted);

        title_taken || self.is_exhausted(keyword)
    }

    /// `(keyword, usage_count)` in store order.
    pub fn keyword_usage(&self) -> impl Iterator<Item = (&str, usize)> {
        self.data
            .keywords
            .iter()
            .map(|(k, u)| (k.as_str(), u.usage_count))
    }

    /// Record a newly published post and persist the store.
    ///
    /// Returns the post id: the first 12 hex digits of
    /// BLAKE3(`"{keyword}_{title}"`).
    pub fn record_post(
        &mut self,
        keyword: &str,
        title: &str,
        content_hash: &str,
        file_path: &str,
    ) -> Result<String> {
        let post_id = post_id(keyword, title);
        let now = Utc::now().to_rfc3339();

        if self.data.posts.contains_key(&post_id) {
            warn!(%post_id, keyword, "Post id already tracked; overwriting its record");
        }

        self.data.posts.insert(
            post_id.clone(),
            PostRecord {
                keyword: keyword.to_string(),
                title: title.to_string(),
                content_hash: content_hash.to_string(),
                file_path: file_path.to_string(),
                created: now.clone(),
                status: default_status(),
            },
        );

        let usage = self
            .data
            .keywords
            .entry(keyword.to_string())
            .or_default();
        usage.posts.push(post_id.clone());
        usage.usage_count = usage.posts.len();
        usage.last_used = Some(now);

        self.save()?;
        info!(%post_id, keyword, usage = self.usage_count(keyword), "Recorded post");
        Ok(post_id)
    }

    /// Administrative reset: zero usage, clear posts and `last_used`.
    /// Returns `false` if the keyword was never tracked.
    pub fn reset(&mut self, keyword: &str) -> Result<bool> {
        let Some(usage) = self.data.keywords.get_mut(keyword) else {
            return Ok(false);
        };

        *usage = KeywordUsage::default();
        self.save()?;
        info!(keyword, "Reset keyword usage");
        Ok(true)
    }

    /// Write the whole store with an atomic replace.
    pub fn save(&mut self) -> Result<()> {
        self.data.metadata.last_updated = Utc::now().to_rfc3339();
        let json = serde_json::to_string_pretty(&self.data).context("serialize tracker")?;
        write_atomic(&self.path, json.as_bytes())
            .with_context(|| format!("save tracker: {}", self.path.display()))
    }

    /// Restore `usage_count == posts.len()` for hand-edited files.
    fn repair_counts(&mut self) {
        for (keyword, usage) in self.data.keywords.iter_mut() {
            if usage.usage_count != usage.posts.len() {
                warn!(
                    keyword = keyword.as_str(),
                    stored = usage.usage_count,
                    posts = usage.posts.len(),
                    "Usage count disagrees with post list; using post list"
                );
                usage.usage_count = usage.posts.len();
            }
        }
    }
}

/// Deterministic post identifier for a keyword/title pair.
pub fn post_id(keyword: &str, title: &str) -> String {
    let hex = blake3::hash(format!("{keyword}_{title}").as_bytes()).to_hex();
    hex.as_str()[..POST_ID_LEN].to_string()
}
