//! Single-post generation run.
//!
//! select keyword -> title -> tracker title check -> relevant products ->
//! prompt -> LLM call with retry -> quality check -> duplicate guard ->
//! Jaccard gate -> write post -> record in store -> flip CSV flag.
//!
//! Every early exit is an [`Outcome`], not an error: "nothing generated" is
//! a normal result. Errors are reserved for unreadable configuration and
//! failed writes.
//!
//! Writes happen in a fixed order: post file, then store, then CSV. A crash
//! after the first leaves a post the store does not count; the guard's
//! title and content checks still see the file on the next run.

pub mod client;
pub mod post;
pub mod prompt;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::core::guard::{DuplicateGuard, GuardConfig};
use crate::core::keywords::{load_keywords, mark_keyword_used, select_best_keyword};
use crate::core::posts::{POST_FILE, load_existing_posts};
use crate::core::text::content_hash;
use crate::core::tracker::ContentTracker;
use crate::infra::io::write_atomic;

pub use client::{ContentGenerator, GenerateError, OpenAiGenerator, RetryPolicy};
pub use post::{PostFrontMatter, QualityIssue, create_slug, create_title, render_post};
pub use prompt::{Prompt, build_prompt, load_products, relevant_products};

/// LLM and quality-gate settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// OpenAI-compatible API root, without `/chat/completions`.
    pub api_base: String,
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub timeout_secs: u64,
    pub min_chars: usize,
    /// Minimum count of `#` characters in the body.
    pub min_headings: usize,
    pub min_paragraphs: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            max_tokens: 4000,
            temperature: 0.7,
            max_attempts: 3,
            base_delay_ms: 1000,
            timeout_secs: 120,
            min_chars: 1000,
            min_headings: 3,
            min_paragraphs: 5,
        }
    }
}

impl GeneratorConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
        }
    }
}

/// Site identity used in titles, front matter and prompts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Brand appended to titles and ignored when comparing them.
    pub name: String,
    pub base_url: String,
    pub author: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "SmartPetBuys".to_string(),
            base_url: "https://www.smartpetbuys.com".to_string(),
            author: "SmartPetBuys Editorial Team".to_string(),
        }
    }
}

/// Where a candidate was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectStage {
    /// Title already tracked or keyword at its cap.
    Tracker,
    /// Generated text failed the structural checks.
    Quality,
    /// Duplicate guard verdict.
    Guard,
    /// Word-set Jaccard gate.
    Similarity,
}

impl RejectStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tracker => "tracker",
            Self::Quality => "quality",
            Self::Guard => "guard",
            Self::Similarity => "similarity",
        }
    }
}

/// Result of one generation run.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// No row has `publish = yes`.
    NoKeywords,
    /// Every publishable keyword is at its cap.
    NoneAvailable,
    /// Dry run stopped before the LLM call.
    DryRun {
        keyword: String,
        title: String,
        products: usize,
        prompt: Prompt,
    },
    GenerationFailed {
        keyword: String,
        error: String,
    },
    Rejected {
        keyword: String,
        stage: RejectStage,
        reasons: Vec<String>,
    },
    Generated {
        keyword: String,
        title: String,
        post_id: String,
        path: PathBuf,
        chars: usize,
        usage: usize,
        csv_updated: bool,
    },
}

impl Outcome {
    pub fn is_generated(&self) -> bool {
        matches!(self, Self::Generated { .. })
    }
}

/// Inputs of a generation run.
#[derive(Debug, Clone)]
pub struct Pipeline<'a> {
    pub keywords_csv: &'a Path,
    pub content_dir: &'a Path,
    pub products: &'a Path,
    pub guard: &'a GuardConfig,
    pub generator: &'a GeneratorConfig,
    pub site: &'a SiteConfig,
    pub dry_run: bool,
}

impl Pipeline<'_> {
    /// Run once for the best available keyword.
    #[instrument(skip_all, fields(dry_run = self.dry_run))]
    pub fn run(&self, tracker: &mut ContentTracker, llm: &dyn ContentGenerator) -> Result<Outcome> {
        let records = load_keywords(self.keywords_csv)?;
        if !records.iter().any(|r| r.publish) {
            info!("No keywords marked for publishing");
            return Ok(Outcome::NoKeywords);
        }

        let Some(selection) = select_best_keyword(&records, tracker, Utc::now()) else {
            info!("No available keywords (all may be overused)");
            return Ok(Outcome::NoneAvailable);
        };
        let keyword = selection.candidate.keyword.clone();
        info!(%keyword, score = selection.score, "Selected keyword");

        let title = create_title(&keyword, &self.site.name);
        if tracker.is_duplicate_title(&keyword, &title) {
            info!(%keyword, "Title already tracked or keyword exhausted");
            return Ok(Outcome::Rejected {
                keyword,
                stage: RejectStage::Tracker,
                reasons: vec![format!("Title or keyword already tracked: {title}")],
            });
        }

        let products = load_products(self.products)?;
        let ranked = relevant_products(&products, &keyword);
        info!("Found {} relevant products", ranked.len());
        let prompt = build_prompt(&keyword, &ranked, self.site);

        if self.dry_run {
            return Ok(Outcome::DryRun {
                keyword,
                title,
                products: ranked.len(),
                prompt,
            });
        }

        let content = match self.generator.retry_policy().run(llm, &prompt) {
            Ok(c) => c,
            Err(e) => {
                error!(%keyword, "Failed to generate content: {e}");
                return Ok(Outcome::GenerationFailed {
                    keyword,
                    error: e.to_string(),
                });
            }
        };

        if let Err(issue) = post::validate_quality(&content, self.generator) {
            warn!(%keyword, "Generated content failed quality checks: {issue}");
            return Ok(Outcome::Rejected {
                keyword,
                stage: RejectStage::Quality,
                reasons: vec![issue.to_string()],
            });
        }

        let existing = load_existing_posts(self.content_dir)?;
        {
            let guard = DuplicateGuard::new(&existing, tracker, self.guard.clone())
                .with_brand(self.site.name.as_str());

            let verdict = guard.check(&keyword, &title, &content);
            if verdict.is_duplicate {
                warn!(%keyword, "Duplicate content detected");
                return Ok(Outcome::Rejected {
                    keyword,
                    stage: RejectStage::Guard,
                    reasons: verdict.reasons,
                });
            }

            if let Some((post, sim)) = guard.jaccard_gate(&content) {
                warn!(%keyword, "High similarity ({:.1}%) with existing post", sim * 100.0);
                return Ok(Outcome::Rejected {
                    keyword,
                    stage: RejectStage::Similarity,
                    reasons: vec![format!(
                        "Word overlap {:.1}% with: {}",
                        sim * 100.0,
                        post.title
                    )],
                });
            }
        }

        let slug = create_slug(&keyword, Local::now());
        let front = PostFrontMatter::new(&keyword, &title, &slug, self.site, Utc::now());
        let doc = render_post(&front, &content)?;
        let path = self.content_dir.join(&slug).join(POST_FILE);
        write_atomic(&path, doc.as_bytes())
            .with_context(|| format!("write post: {}", path.display()))?;

        let post_id = tracker.record_post(
            &keyword,
            &title,
            &content_hash(&content),
            &path.to_string_lossy(),
        )?;

        let csv_updated = match mark_keyword_used(self.keywords_csv, &keyword) {
            Ok(updated) => updated,
            Err(e) => {
                error!(%keyword, "Post saved but keywords CSV not updated: {e:#}");
                false
            }
        };

        let usage = tracker.usage_count(&keyword);
        info!(%post_id, path = %path.display(), chars = content.len(), usage, "Generated post");

        Ok(Outcome::Generated {
            keyword,
            title,
            post_id,
            path,
            chars: content.chars().count(),
            usage,
            csv_updated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::fs;
    use tempfile::TempDir;

    struct Canned {
        body: String,
        calls: Cell<usize>,
    }

    impl Canned {
        fn new(body: impl Into<String>) -> Self {
            Self {
                body: body.into(),
                calls: Cell::new(0),
            }
        }
    }

    impl ContentGenerator for Canned {
        fn generate(&self, _prompt: &Prompt) -> Result<String, GenerateError> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.body.clone())
        }
    }

    struct Down;

    impl ContentGenerator for Down {
        fn generate(&self, _prompt: &Prompt) -> Result<String, GenerateError> {
            Err(GenerateError::EmptyResponse)
        }
    }

    fn article(topic: &str) -> String {
        let para = |n: usize| {
            format!(
                "Section {n} explains how {topic} choices differ by size, temperament and \
                 budget, with practical notes owners can apply today."
            )
        };
        format!(
            "Intro about {topic} for careful owners.\n\n## Why it matters\n\n{}\n\n{}\n\n\
             ## Top Product Recommendations\n\n{}\n\n{}\n\n## Buying Guide\n\n{}\n\n{}\n\n\
             ## FAQ\n\n{}\n\n{}",
            para(1),
            para(2),
            para(3),
            para(4),
            para(5),
            para(6),
            para(7),
            para(8)
        )
    }

    struct Fixture {
        tmp: TempDir,
        guard: GuardConfig,
        generator: GeneratorConfig,
        site: SiteConfig,
    }

    impl Fixture {
        fn new(csv: &str) -> Self {
            let tmp = TempDir::new().unwrap();
            fs::write(tmp.path().join("keywords.csv"), csv).unwrap();
            let generator = GeneratorConfig {
                base_delay_ms: 0,
                ..GeneratorConfig::default()
            };
            Self {
                tmp,
                guard: GuardConfig::default(),
                generator,
                site: SiteConfig::default(),
            }
        }

        fn csv(&self) -> PathBuf {
            self.tmp.path().join("keywords.csv")
        }

        fn content_dir(&self) -> PathBuf {
            self.tmp.path().join("content/posts")
        }

        fn tracker(&self) -> ContentTracker {
            ContentTracker::load(self.tmp.path().join("data/content_tracker.json"))
                .with_brand(self.site.name.as_str())
        }

        fn run(&self, dry_run: bool, llm: &dyn ContentGenerator) -> Outcome {
            let csv = self.csv();
            let content = self.content_dir();
            let products = self.tmp.path().join("data/products.json");
            let pipeline = Pipeline {
                keywords_csv: &csv,
                content_dir: &content,
                products: &products,
                guard: &self.guard,
                generator: &self.generator,
                site: &self.site,
                dry_run,
            };
            pipeline.run(&mut self.tracker(), llm).unwrap()
        }
    }

    #[test]
    fn full_run_writes_post_tracks_it_and_flips_csv() {
        let fx = Fixture::new("keyword,priority,estimated_volume,publish\ndog chew toys,high,1200,yes\n");
        let body = article("dog chew toys");

        let outcome = fx.run(false, &Canned::new(body.clone()));
        let Outcome::Generated {
            keyword,
            title,
            path,
            usage,
            csv_updated,
            ..
        } = outcome
        else {
            panic!("expected a generated post, got {outcome:?}");
        };

        assert_eq!(keyword, "dog chew toys");
        assert_eq!(title, "Dog Chew Toys — SmartPetBuys");
        assert_eq!(usage, 1);
        assert!(csv_updated);

        let posts = load_existing_posts(&fx.content_dir()).unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].path, path);
        assert_eq!(posts[0].title, title);
        assert_eq!(posts[0].hash, content_hash(&body));

        assert_eq!(fx.tracker().usage_count("dog chew toys"), 1);
        let csv = fs::read_to_string(fx.csv()).unwrap();
        assert!(csv.contains("dog chew toys,high,1200,no"));
    }

    #[test]
    fn dry_run_stops_before_the_llm() {
        let fx = Fixture::new("keyword,publish\ncat litter,yes\n");
        let llm = Canned::new(article("cat litter"));

        let outcome = fx.run(true, &llm);
        assert!(matches!(outcome, Outcome::DryRun { ref keyword, .. } if keyword == "cat litter"));
        assert_eq!(llm.calls.get(), 0);
        assert!(!fx.content_dir().exists());
        assert!(fs::read_to_string(fx.csv()).unwrap().contains("cat litter,yes"));
    }

    #[test]
    fn nothing_to_publish() {
        let fx = Fixture::new("keyword,publish\ncat litter,no\n");
        assert_eq!(fx.run(false, &Canned::new("x")), Outcome::NoKeywords);
    }

    #[test]
    fn exhausted_keywords_are_not_available() {
        let fx = Fixture::new("keyword,publish\ncat litter,yes\n");
        let mut t = fx.tracker();
        for i in 0..3 {
            t.record_post("cat litter", &format!("t{i}"), "h", "p").unwrap();
        }
        assert_eq!(fx.run(false, &Canned::new("x")), Outcome::NoneAvailable);
    }

    #[test]
    fn llm_failure_is_an_outcome() {
        let fx = Fixture::new("keyword,publish\ncat litter,yes\n");
        let outcome = fx.run(false, &Down);
        assert!(matches!(outcome, Outcome::GenerationFailed { .. }));
        assert!(!fx.content_dir().exists());
    }

    #[test]
    fn thin_content_is_rejected() {
        let fx = Fixture::new("keyword,publish\ncat litter,yes\n");
        let outcome = fx.run(false, &Canned::new("Too short."));
        assert!(matches!(
            outcome,
            Outcome::Rejected {
                stage: RejectStage::Quality,
                ..
            }
        ));
    }

    #[test]
    fn regenerated_copy_is_caught_by_the_guard() {
        let fx = Fixture::new("keyword,publish\ndog chew toys,yes\ncat litter,yes\n");
        let body = article("dog chew toys");

        assert!(fx.run(false, &Canned::new(body.clone())).is_generated());

        // Second run picks the other keyword but the model repeats itself
        let outcome = fx.run(false, &Canned::new(body));
        let Outcome::Rejected {
            keyword,
            stage,
            reasons,
        } = outcome
        else {
            panic!("expected a rejection, got {outcome:?}");
        };
        assert_eq!(keyword, "cat litter");
        assert_eq!(stage, RejectStage::Guard);
        assert!(reasons.iter().any(|r| r.starts_with("Content duplicate:")));
        assert_eq!(load_existing_posts(&fx.content_dir()).unwrap().len(), 1);
    }

    #[test]
    fn distinct_articles_on_a_shared_template_are_both_published() {
        let fx = Fixture::new("keyword,publish\ndog chew toys,yes\ncat litter,yes\n");
        let dog = include_str!("../../../tests/fixtures/dog_chew_toys.md");
        let cat = include_str!("../../../tests/fixtures/cat_litter.md");

        let first = fx.run(false, &Canned::new(dog));
        assert!(matches!(first, Outcome::Generated { ref keyword, .. } if keyword == "dog chew toys"));

        let second = fx.run(false, &Canned::new(cat));
        assert!(
            matches!(second, Outcome::Generated { ref keyword, .. } if keyword == "cat litter"),
            "expected a second post, got {second:?}"
        );
        assert_eq!(load_existing_posts(&fx.content_dir()).unwrap().len(), 2);
    }

    #[test]
    fn reset_keyword_stops_at_the_tracker_title_check() {
        let fx = Fixture::new("keyword,publish\ndog chew toys,yes\n");
        let dog = include_str!("../../../tests/fixtures/dog_chew_toys.md");
        assert!(fx.run(false, &Canned::new(dog)).is_generated());

        // Written back as `no`; publish it again and clear its usage
        fs::write(fx.csv(), "keyword,publish\ndog chew toys,yes\n").unwrap();
        assert!(fx.tracker().reset("dog chew toys").unwrap());

        let llm = Canned::new(dog);
        let outcome = fx.run(false, &llm);
        assert!(matches!(
            outcome,
            Outcome::Rejected {
                stage: RejectStage::Tracker,
                ..
            }
        ));
        assert_eq!(llm.calls.get(), 0);
    }
}
