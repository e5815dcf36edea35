//! Duplicate-content guard.
//!
//! Runs before a post is committed and answers one question: does the
//! candidate repeat what is already published? The guard only reads; it
//! reports a [`GuardVerdict`] with human-readable reasons and leaves the
//! decision to discard or force-publish to the caller.
//!
//! Checks, any of which marks a duplicate:
//! 1. keyword overuse (usage cap reached in the tracking store)
//! 2. title duplicate (equal title keys, or similarity above threshold)
//! 3. content duplicate (identical hash, similarity above threshold, or a
//!    large shared-phrase overlap)
//!
//! [`DuplicateGuard::jaccard_gate`] is a separate, coarser word-set check
//! run on final generated text. It does not replace check 3.
//!
//! Every check walks all posts; this is meant for hundreds of posts, not
//! tens of thousands.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

use crate::core::posts::ExistingPost;
use crate::core::text;
use crate::core::tracker::ContentTracker;

/// Thresholds for the guard's checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Posts allowed per keyword.
    pub usage_cap: usize,
    /// Title similarity above this is a duplicate.
    pub title_threshold: f64,
    /// Body similarity above this is a duplicate.
    pub content_threshold: f64,
    /// Shared-phrase ratio above this (with enough phrases) is a duplicate.
    pub phrase_overlap_ratio: f64,
    /// Shared phrases needed, strictly more than this.
    pub phrase_overlap_min: usize,
    /// Word-set Jaccard above this fails the post-generation gate.
    pub jaccard_threshold: f64,
    /// Default cutoff for `find_similar_posts`.
    pub similar_threshold: f64,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            usage_cap: crate::core::tracker::DEFAULT_USAGE_CAP,
            title_threshold: 0.85,
            content_threshold: 0.70,
            phrase_overlap_ratio: 0.5,
            phrase_overlap_min: 10,
            jaccard_threshold: 0.75,
            similar_threshold: 0.5,
        }
    }
}

/// Outcome of a guard run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GuardVerdict {
    pub is_duplicate: bool,
    pub reasons: Vec<String>,
}

impl GuardVerdict {
    fn flag(&mut self, reason: String) {
        self.is_duplicate = true;
        self.reasons.push(reason);
    }
}

/// A published post ranked by similarity to a candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarPost {
    pub title: String,
    pub slug: String,
    pub path: PathBuf,
    pub title_similarity: f64,
    pub content_similarity: f64,
    pub overall_similarity: f64,
}

/// Corpus-level duplicate statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateStats {
    pub total_posts: usize,
    pub unique_hashes: usize,
    /// Hashes shared by more than one post.
    pub duplicate_hashes: usize,
    /// Keyword usage from the tracking store, most used first (top ten).
    pub most_used_keywords: Vec<(String, usize)>,
}

/// The guard over a loaded set of published posts.
#[derive(Debug)]
pub struct DuplicateGuard<'a> {
    posts: &'a [ExistingPost],
    tracker: &'a ContentTracker,
    config: GuardConfig,
    brand: String,
}

impl<'a> DuplicateGuard<'a> {
    pub fn new(posts: &'a [ExistingPost], tracker: &'a ContentTracker, config: GuardConfig) -> Self {
        Self {
            posts,
            tracker,
            config,
            brand: String::new(),
        }
    }

    /// Site-branding suffix ignored when comparing titles.
    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = brand.into();
        self
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Reason string if `keyword` has reached the usage cap.
    pub fn check_keyword_overuse(&self, keyword: &str) -> Option<String> {
        let used = self.tracker.usage_count(keyword);
        (used >= self.config.usage_cap).then(|| {
            format!(
                "Keyword '{keyword}' already used {used} times (max: {})",
                self.config.usage_cap
            )
        })
    }

    /// Reason string if `title` matches or closely resembles a post title.
    pub fn check_title_duplicate(&self, title: &str) -> Option<String> {
        let key = text::title_key(title, &self.brand);

        for post in self.posts {
            let existing = text::title_key(&post.title, &self.brand);

            if key == existing {
                return Some(format!("Exact title match: {}", post.title));
            }

            let sim = text::ratio(&key, &existing);
            if sim > self.config.title_threshold {
                return Some(format!(
                    "High similarity ({}) with: {}",
                    percent(sim),
                    post.title
                ));
            }
        }

        None
    }

    /// Reason string if `content` duplicates a post body, using
    /// `threshold` for the overall similarity ratio.
    pub fn check_content_duplicate(&self, content: &str, threshold: f64) -> Option<String> {
        let hash = text::content_hash(content);
        let norm = text::normalize(content);
        let phrases = text::key_phrases(content);

        for post in self.posts {
            if post.content.trim().is_empty() {
                continue;
            }

            if post.hash == hash {
                return Some(format!("Identical content to post: {}", post.title));
            }

            let sim = text::ratio(&norm, &text::normalize(&post.content));
            if sim > threshold {
                return Some(format!(
                    "High content similarity ({}) with post: {}",
                    percent(sim),
                    post.title
                ));
            }

            let post_phrases = text::key_phrases(&post.content);
            if let Some((shared, ratio)) = text::phrase_overlap(&phrases, &post_phrases)
                && ratio > self.config.phrase_overlap_ratio
                && shared > self.config.phrase_overlap_min
            {
                return Some(format!(
                    "High phrase overlap ({}, {shared} phrases) with: {}",
                    percent(ratio),
                    post.title
                ));
            }
        }

        None
    }

    /// Run keyword, title and content checks with the configured content
    /// threshold.
    pub fn check(&self, keyword: &str, title: &str, content: &str) -> GuardVerdict {
        self.check_with_threshold(keyword, title, content, self.config.content_threshold)
    }

    /// [`check`](Self::check) with a caller-supplied content threshold.
    #[instrument(skip(self, content), fields(posts = self.posts.len()))]
    pub fn check_with_threshold(
        &self,
        keyword: &str,
        title: &str,
        content: &str,
        threshold: f64,
    ) -> GuardVerdict {
        let mut verdict = GuardVerdict::default();

        if let Some(msg) = self.check_keyword_overuse(keyword) {
            verdict.flag(format!("Keyword overuse: {msg}"));
        }
        if let Some(msg) = self.check_title_duplicate(title) {
            verdict.flag(format!("Title duplicate: {msg}"));
        }
        if let Some(msg) = self.check_content_duplicate(content, threshold) {
            verdict.flag(format!("Content duplicate: {msg}"));
        }

        debug!(duplicate = verdict.is_duplicate, reasons = verdict.reasons.len(), "Guard finished");
        verdict
    }

    /// Post-generation gate: word-set Jaccard against every post body.
    /// Returns the first post above the threshold and its score.
    pub fn jaccard_gate(&self, content: &str) -> Option<(&'a ExistingPost, f64)> {
        self.posts.iter().find_map(|post| {
            let sim = text::jaccard(content, &post.content);
            (sim > self.config.jaccard_threshold).then_some((post, sim))
        })
    }

    /// Posts whose mean title/content similarity exceeds `threshold`,
    /// most similar first.
    pub fn find_similar_posts(&self, title: &str, content: &str, threshold: f64) -> Vec<SimilarPost> {
        let title_key = text::title_key(title, &self.brand);
        let norm = text::normalize(content);

        let mut out: Vec<SimilarPost> = self
            .posts
            .iter()
            .filter_map(|post| {
                let title_similarity =
                    text::ratio(&title_key, &text::title_key(&post.title, &self.brand));
                let content_similarity = if post.content.is_empty() {
                    0.0
                } else {
                    text::ratio(&norm, &text::normalize(&post.content))
                };
                let overall_similarity = (title_similarity + content_similarity) / 2.0;

                (overall_similarity > threshold).then(|| SimilarPost {
                    title: post.title.clone(),
                    slug: post.slug.clone(),
                    path: post.path.clone(),
                    title_similarity,
                    content_similarity,
                    overall_similarity,
                })
            })
            .collect();

        out.sort_by(|a, b| b.overall_similarity.total_cmp(&a.overall_similarity));
        out
    }

    /// Hash and keyword-usage statistics for the corpus.
    pub fn duplicate_stats(&self) -> DuplicateStats {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for post in self.posts {
            *counts.entry(post.hash.as_str()).or_default() += 1;
        }

        let mut usage: Vec<(String, usize)> = self
            .tracker
            .keyword_usage()
            .map(|(k, n)| (k.to_string(), n))
            .collect();
        usage.sort_by(|a, b| b.1.cmp(&a.1));
        usage.truncate(10);

        DuplicateStats {
            total_posts: self.posts.len(),
            unique_hashes: counts.len(),
            duplicate_hashes: counts.values().filter(|&&n| n > 1).count(),
            most_used_keywords: usage,
        }
    }

    /// Find posts whose body is byte-identical to an earlier post (by
    /// path order) and, unless `dry_run`, delete them along with their
    /// directory if it ends up empty. Returns the duplicates found on a dry
    /// run, otherwise only those actually removed.
    pub fn cleanup_duplicates(&self, dry_run: bool) -> Vec<PathBuf> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut duplicates = Vec::new();

        for post in self.posts {
            if seen.insert(post.hash.as_str()) {
                continue;
            }

            if dry_run {
                duplicates.push(post.path.clone());
                continue;
            }
            if let Err(e) = fs::remove_file(&post.path) {
                error!("Could not remove duplicate {}: {e}", post.path.display());
                continue;
            }
            if let Some(parent) = post.path.parent()
                && fs::read_dir(parent).is_ok_and(|mut d| d.next().is_none())
                && let Err(e) = fs::remove_dir(parent)
            {
                error!("Could not remove empty dir {}: {e}", parent.display());
            }
            info!("Removed duplicate post {}", post.path.display());
            duplicates.push(post.path.clone());
        }

        duplicates
    }
}

fn percent(ratio: f64) -> String {
    format!("{:.2}%", ratio * 100.0)
}
