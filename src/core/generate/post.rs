//! Turning generated markdown into a publishable post: title, slug, front
//! matter and a cheap structural quality check.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, SecondsFormat, Utc};
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use super::{GeneratorConfig, SiteConfig};

static SLUG_STRIP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9\s-]").expect("static regex"));
static SLUG_SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));

/// `"dog chew toys"` -> `"Dog Chew Toys — SmartPetBuys"`.
pub fn create_title(keyword: &str, brand: &str) -> String {
    let words: Vec<String> = keyword.split_whitespace().map(capitalize).collect();
    format!("{} — {brand}", words.join(" "))
}

fn capitalize(word: &str) -> String {
    let lower = word.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// URL slug with a local-time suffix so regenerated keywords never collide:
/// `dog-chew-toys-20250101-093000`.
pub fn create_slug(keyword: &str, now: DateTime<Local>) -> String {
    let base = SLUG_STRIP.replace_all(keyword.trim(), "");
    let base = SLUG_SPACES.replace_all(&base, "-").to_lowercase();
    format!("{base}-{}", now.format("%Y%m%d-%H%M%S"))
}

/// Stock hero image chosen from the keyword.
pub fn hero_image(keyword: &str) -> &'static str {
    let k = keyword.to_lowercase();
    if k.contains("dog") {
        "https://images.unsplash.com/photo-1537151608828-ea2b11777ee8?w=1200&h=600&fit=crop&q=80&auto=format"
    } else if k.contains("cat") {
        "https://images.unsplash.com/photo-1514888286974-6c03e2ca1dba?w=1200&h=600&fit=crop&q=80&auto=format"
    } else if k.contains("food") {
        "https://images.unsplash.com/photo-1589924691995-400dc9ecc119?w=1200&h=600&fit=crop&q=80&auto=format"
    } else if k.contains("toy") {
        "https://images.unsplash.com/photo-1601758228041-f3b2795255f1?w=1200&h=600&fit=crop&q=80&auto=format"
    } else {
        "https://images.unsplash.com/photo-1548199973-03cce0bbc87b?w=1200&h=600&fit=crop&q=80&auto=format"
    }
}

/// Front matter written ahead of the body. Field names follow the site
/// theme's expectations, hence the camelCase exceptions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostFrontMatter {
    pub title: String,
    pub date: String,
    pub lastmod: String,
    pub slug: String,
    pub tags: Vec<String>,
    pub categories: Vec<String>,
    pub description: String,
    pub featured_image: String,
    pub draft: bool,
    pub canonical: String,
    pub robots: String,
    pub keywords: String,
    pub author: String,
    #[serde(rename = "readingTime")]
    pub reading_time: bool,
    #[serde(rename = "wordCount")]
    pub word_count: bool,
    #[serde(rename = "socialImage")]
    pub social_image: String,
    #[serde(rename = "twitterCard")]
    pub twitter_card: String,
    #[serde(rename = "ogType")]
    pub og_type: String,
    #[serde(rename = "ogTitle")]
    pub og_title: String,
    #[serde(rename = "ogDescription")]
    pub og_description: String,
    #[serde(rename = "ogImage")]
    pub og_image: String,
    pub weight: u8,
    pub priority: f32,
    pub schema: serde_json::Value,
}

impl PostFrontMatter {
    pub fn new(keyword: &str, title: &str, slug: &str, site: &SiteConfig, now: DateTime<Utc>) -> Self {
        let lower = keyword.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));

        let category = if !has(&["review", "best", "top"]) && has(&["guide", "how", "tips"]) {
            "Guides"
        } else {
            "Reviews"
        };

        let mut tags = vec![lower.clone(), "pet products".to_string()];
        if category == "Reviews" {
            tags.extend(["reviews".to_string(), "buying guide".to_string()]);
        }
        if lower.contains("dog") {
            tags.extend(["dog supplies".to_string(), "dog care".to_string()]);
        }
        if lower.contains("cat") {
            tags.extend(["cat supplies".to_string(), "cat care".to_string()]);
        }
        if lower.contains("puppy") {
            tags.push("puppy care".to_string());
        }
        let keywords = tags.join(", ");

        let description = format!(
            "Expert review of the best {lower} for pets. Compare top products, read detailed \
             buying guides, and find the perfect {lower} for your furry friend."
        );
        let stamp = now.to_rfc3339_opts(SecondsFormat::Secs, true);
        let base = site.base_url.trim_end_matches('/');
        let canonical = format!("{base}/posts/{slug}/");
        let image = hero_image(keyword).to_string();

        let schema = serde_json::json!({
            "@context": "https://schema.org",
            "@type": "Article",
            "headline": title,
            "description": description,
            "image": image,
            "author": { "@type": "Organization", "name": site.name, "url": base },
            "publisher": {
                "@type": "Organization",
                "name": site.name,
                "logo": { "@type": "ImageObject", "url": format!("{base}/images/smartpetbuys_logo.png") },
                "url": base,
            },
            "datePublished": stamp,
            "dateModified": stamp,
            "mainEntityOfPage": { "@type": "WebPage", "@id": canonical },
            "articleSection": category,
            "keywords": keywords,
        });

        Self {
            title: title.to_string(),
            date: stamp.clone(),
            lastmod: stamp,
            slug: slug.to_string(),
            tags,
            categories: vec![category.to_string()],
            description: description.clone(),
            featured_image: image.clone(),
            draft: false,
            canonical,
            robots: "index, follow".to_string(),
            keywords,
            author: site.author.clone(),
            reading_time: true,
            word_count: true,
            social_image: image.clone(),
            twitter_card: "summary_large_image".to_string(),
            og_type: "article".to_string(),
            og_title: title.to_string(),
            og_description: description,
            og_image: image,
            weight: if category == "Reviews" { 1 } else { 2 },
            priority: if lower.contains("best") { 0.8 } else { 0.6 },
            schema,
        }
    }
}

/// `---\n<yaml>---\n\n<body>`.
pub fn render_post(front: &PostFrontMatter, body: &str) -> Result<String> {
    let yaml = serde_yaml::to_string(front).context("serialize front matter")?;
    Ok(format!("---\n{yaml}---\n\n{}\n", body.trim_end()))
}

/// Why generated text was rejected before duplicate checks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QualityIssue {
    #[error("content too short ({chars} chars, minimum {min})")]
    TooShort { chars: usize, min: usize },

    #[error("content lacks heading structure ({found} '#', minimum {min})")]
    FewHeadings { found: usize, min: usize },

    #[error("content has too few paragraphs ({found}, minimum {min})")]
    FewParagraphs { found: usize, min: usize },
}

/// Structural checks on the raw body: length, `#` count and blank-line
/// separated paragraphs.
pub fn validate_quality(content: &str, cfg: &GeneratorConfig) -> Result<(), QualityIssue> {
    let chars = content.trim().chars().count();
    if chars < cfg.min_chars {
        return Err(QualityIssue::TooShort {
            chars,
            min: cfg.min_chars,
        });
    }

    let hashes = content.matches('#').count();
    if hashes < cfg.min_headings {
        return Err(QualityIssue::FewHeadings {
            found: hashes,
            min: cfg.min_headings,
        });
    }

    let paragraphs = content
        .split("\n\n")
        .filter(|p| !p.trim().is_empty())
        .count();
    if paragraphs < cfg.min_paragraphs {
        return Err(QualityIssue::FewParagraphs {
            found: paragraphs,
            min: cfg.min_paragraphs,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn title_is_capitalized_and_branded() {
        assert_eq!(
            create_title("dog CHEW toys", "SmartPetBuys"),
            "Dog Chew Toys — SmartPetBuys"
        );
    }

    #[test]
    fn slug_strips_symbols_and_stamps_time() {
        let now = Local.with_ymd_and_hms(2025, 1, 2, 9, 30, 5).unwrap();
        assert_eq!(
            create_slug("Best Cat Litter (2025)!", now),
            "best-cat-litter-2025-20250102-093005"
        );
    }

    #[test]
    fn front_matter_round_trips_through_yaml() {
        let now = Utc.with_ymd_and_hms(2025, 1, 2, 9, 30, 5).unwrap();
        let fm = PostFrontMatter::new(
            "best dog toys",
            "Best Dog Toys — SmartPetBuys",
            "best-dog-toys-1",
            &SiteConfig::default(),
            now,
        );
        assert_eq!(fm.categories, vec!["Reviews"]);
        assert!(fm.tags.contains(&"dog care".to_string()));
        assert_eq!(fm.date, "2025-01-02T09:30:05Z");
        assert_eq!(fm.priority, 0.8);

        let doc = render_post(&fm, "## Intro\nBody").unwrap();
        let parsed = crate::core::posts::parse_post(&doc, std::path::Path::new("p/x/index.md")).unwrap();
        assert_eq!(parsed.title, "Best Dog Toys — SmartPetBuys");
        assert_eq!(parsed.slug, "best-dog-toys-1");
        assert_eq!(parsed.content, "\n## Intro\nBody\n");
    }

    #[test]
    fn guides_are_categorized() {
        let fm = PostFrontMatter::new("how to groom a cat", "t", "s", &SiteConfig::default(), Utc::now());
        assert_eq!(fm.categories, vec!["Guides"]);
        assert_eq!(fm.weight, 2);
    }

    #[test]
    fn quality_gate() {
        let cfg = GeneratorConfig::default();
        assert!(matches!(
            validate_quality("short", &cfg),
            Err(QualityIssue::TooShort { .. })
        ));

        let flat = "word ".repeat(300);
        assert!(matches!(
            validate_quality(&flat, &cfg),
            Err(QualityIssue::FewHeadings { .. })
        ));

        let para = "Plenty of helpful sentences about pets and their products here. ".repeat(4);
        let good = format!("## A\n\n{para}\n\n## B\n\n{para}\n\n## C\n\n{para}\n\n{para}");
        assert_eq!(validate_quality(&good, &cfg), Ok(()));

        let one_block = format!("## A ## B ## C {}", para.repeat(4));
        assert!(matches!(
            validate_quality(&one_block, &cfg),
            Err(QualityIssue::FewParagraphs { found: 1, .. })
        ));
    }
}
