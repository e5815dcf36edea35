//! Shared test utilities for integration tests
//!
//! Builds a throwaway blog workspace: keyword CSV, published posts and
//! (optionally) a tracking store, laid out at the default config paths.

#![allow(dead_code)]

use assert_fs::prelude::*;

pub const KEYWORDS_CSV: &str = "\
keyword,priority,estimated_volume,publish
dog chew toys,high,1200,yes
cat litter,medium,\"2,500\",yes
bird cages,low,300,no
puppy training treats,high,900,no
";

pub const DOG_BODY: &str = "Choosing durable chew toys keeps puppies busy. Rubber chew toys \
survive aggressive chewers, rope toys clean teeth, puzzle feeders slow eating, squeaky \
plush toys entertain gentle dogs, and treat dispensing balls reward curious puppies \
during long afternoons alone.";

pub const CAT_BODY: &str = "Clumping clay litter controls odor quickly. Silica crystals \
absorb moisture, pine pellets reduce tracking, walnut shells compost easily, and paper \
litter helps cats recovering from surgery.";

/// Write `content/posts/<slug>/index.md` with YAML front matter.
pub fn write_post(tmp: &assert_fs::TempDir, slug: &str, title: &str, body: &str)
{
    tmp.child(format!("content/posts/{slug}/index.md"))
        .write_str(&format!("---\ntitle: \"{title}\"\nslug: {slug}\n---\n\n{body}\n"))
        .expect("write post");
}

/// A workspace with the keyword list and one published dog post.
pub fn make_blog() -> assert_fs::TempDir
{
    let tmp = assert_fs::TempDir::new().expect("tempdir");

    tmp.child("keywords.csv")
        .write_str(KEYWORDS_CSV)
        .expect("write keywords");

    write_post(&tmp, "best-dog-chew-toys", "Dog Chew Toys — SmartPetBuys", DOG_BODY);

    tmp
}

/// Tracking store with `count` posts recorded for `keyword`.
pub fn write_tracker(tmp: &assert_fs::TempDir, keyword: &str, count: usize)
{
    let ids: Vec<String> = (0..count).map(|i| format!("id{i:010}")).collect();
    let posts: serde_json::Map<String, serde_json::Value> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            (
                id.clone(),
                serde_json::json!({
                    "keyword": keyword,
                    "title": format!("{keyword} {i}"),
                    "content_hash": "h",
                    "file_path": "p",
                    "created": "2025-01-01T00:00:00+00:00",
                    "status": "published"
                }),
            )
        })
        .collect();

    let store = serde_json::json!({
        "posts": posts,
        "keywords": {
            keyword: {
                "usage_count": count,
                "last_used": "2025-01-01T00:00:00+00:00",
                "posts": ids
            }
        },
        "metadata": {
            "created": "2025-01-01T00:00:00+00:00",
            "last_updated": "2025-01-01T00:00:00+00:00"
        }
    });

    tmp.child("data/content_tracker.json")
        .write_str(&serde_json::to_string_pretty(&store).expect("json"))
        .expect("write tracker");
}
