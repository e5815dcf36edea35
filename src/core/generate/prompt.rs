//! Products database and prompt construction.

use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::SiteConfig;
use crate::infra::io::read_text;

/// Products offered to the model per post.
pub const MAX_PRODUCTS: usize = 5;

/// One entry of the products database.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Product {
    pub name: String,
    #[serde(default)]
    pub blurb: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub brand: Option<String>,
    // Numbers or preformatted strings in the wild
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default)]
    pub rating: Option<Value>,
    #[serde(default)]
    pub review_count: Option<Value>,
}

impl Product {
    /// Declared brand, else the first word of the name.
    pub fn brand_or_guess(&self) -> &str {
        self.brand
            .as_deref()
            .filter(|b| !b.trim().is_empty())
            .or_else(|| self.name.split_whitespace().next())
            .unwrap_or("Quality Brand")
    }
}

/// A product chosen for a keyword.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedProduct<'a> {
    pub id: &'a str,
    pub product: &'a Product,
    pub score: u32,
}

/// Load `products.json` (id -> product). A missing file is an empty
/// database.
pub fn load_products(path: &Path) -> Result<IndexMap<String, Product>> {
    if !path.exists() {
        debug!("No products database at {}", path.display());
        return Ok(IndexMap::new());
    }
    let raw = read_text(path)?;
    serde_json::from_str(&raw).with_context(|| format!("parse products: {}", path.display()))
}

/// Keyword category triggers and the product terms they boost.
const CATEGORY_TERMS: &[(&str, &[&str])] = &[
    ("treat", &["treat", "training", "snack", "bites"]),
    ("training", &["treat", "training", "snack", "bites"]),
    ("food", &["food", "kibble", "nutrition", "diet"]),
    ("weight", &["weight", "diet", "nutrition", "food"]),
    ("toy", &["toy", "play", "puzzle", "ball"]),
    ("health", &["health", "supplement", "vitamin", "probiotic"]),
    ("grooming", &["groom", "brush", "nail", "clip", "shampoo"]),
    ("dental", &["dental", "teeth", "chew", "oral"]),
    ("bed", &["bed", "mattress", "cushion", "sleep"]),
    ("leash", &["leash", "collar", "harness", "walk"]),
    ("litter", &["litter", "box", "toilet", "waste"]),
    ("carrier", &["carrier", "crate", "transport", "travel"]),
];

/// First category whose term list hits the keyword.
fn primary_terms(keyword: &str) -> Option<&'static [&'static str]> {
    CATEGORY_TERMS
        .iter()
        .find(|(_, terms)| terms.iter().any(|t| keyword.contains(*t)))
        .map(|(_, terms)| *terms)
}

/// Relevance of one product to a lowercased keyword.
fn relevance(id: &str, product: &Product, keyword: &str) -> u32 {
    let text = format!("{} {}", product.name, product.blurb).to_lowercase();
    let mut score = 0;

    if let Some(terms) = primary_terms(keyword) {
        score += 3 * terms.iter().filter(|t| text.contains(**t)).count() as u32;
    }
    score += keyword
        .split_whitespace()
        .filter(|w| text.contains(*w))
        .count() as u32;

    for pet in ["dog", "cat"] {
        if keyword.contains(pet) && text.contains(pet) {
            score += 2;
        }
    }

    if (keyword.contains("training") || keyword.contains("treat"))
        && (id.starts_with("treats-") || text.contains("treat") || text.contains("training"))
    {
        score += 5;
    }

    score
}

/// Up to [`MAX_PRODUCTS`] products with positive relevance, best first.
/// Ties keep database order.
pub fn relevant_products<'a>(
    products: &'a IndexMap<String, Product>,
    keyword: &str,
) -> Vec<RankedProduct<'a>> {
    let keyword = keyword.to_lowercase();
    let mut ranked: Vec<RankedProduct<'a>> = products
        .iter()
        .filter_map(|(id, product)| {
            let score = relevance(id, product, &keyword);
            (score > 0).then_some(RankedProduct {
                id: id.as_str(),
                product,
                score,
            })
        })
        .collect();

    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked.truncate(MAX_PRODUCTS);
    ranked
}

/// Chat prompt pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

fn show(v: &Option<Value>, fallback: &str) -> String {
    match v {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => fallback.to_string(),
        Some(other) => other.to_string(),
    }
}

fn product_block(ranked: &RankedProduct<'_>) -> String {
    let p = ranked.product;
    format!(
        "\nPRODUCT: {} by {}\n\
         - Price: ${}\n\
         - Rating: {}★ ({} reviews)\n\
         - Description: {}\n\
         - Affiliate URL: {}\n\
         - Product Image: {}\n\
         - Product ID: {}\n",
        p.name,
        p.brand_or_guess(),
        show(&p.price, "29.99"),
        show(&p.rating, "4.5"),
        show(&p.review_count, "1,000+"),
        p.blurb,
        p.url,
        p.image,
        ranked.id,
    )
}

/// Build the prompt for `keyword`, featuring `products` verbatim.
pub fn build_prompt(keyword: &str, products: &[RankedProduct<'_>], site: &SiteConfig) -> Prompt {
    let system = "You are a professional pet content writer specializing in helpful, \
                  SEO-optimized articles about pet products and care."
        .to_string();

    let mut product_info = String::new();
    if !products.is_empty() {
        product_info.push_str(
            "\n\nRELEVANT PRODUCTS TO FEATURE (must include these with exact details):\n",
        );
        for p in products {
            product_info.push_str(&product_block(p));
        }
    }

    let user = format!(
        r#"You are a professional pet content writer for {name}, a trusted pet product review and recommendation site.

Write a comprehensive, SEO-optimized blog post about "{keyword}".

REQUIREMENTS:
- 1200-1500 words
- Professional, helpful and engaging tone
- Practical advice and buying guide information
- Markdown with ## and ### headings
- An introduction that uses the target keyword in the first 100 words
- Bullet points and lists for readability
- A conclusion with a call to action

STRUCTURE:
1. Introduction
2. Two or three educational sections with ## headings
3. ## Top Product Recommendations (one product card per product below)
4. ## Buying Guide: What to Look For
5. ## Frequently Asked Questions
6. Conclusion

Use the target keyword "{keyword}" naturally 3-5 times. Always use the exact product data provided (name, price, rating, image, affiliate URL). Avoid overly promotional language.
{product_info}
Write the blog post content only (no front matter). Start with the introduction.
"#,
        name = site.name,
    );

    Prompt { system, user }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> IndexMap<String, Product> {
        serde_json::from_str(
            r#"{
              "toy-1": {"name": "KONG Classic Dog Toy", "blurb": "Durable rubber chew toy", "url": "u1", "image": "i1"},
              "treats-1": {"name": "Zuke's Mini Naturals", "blurb": "Soft training bites for dogs", "url": "u2", "image": "i2", "price": 9.99},
              "litter-1": {"name": "Arm & Hammer Clump", "blurb": "Cat litter", "url": "u3", "image": "i3", "brand": "Arm & Hammer"}
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn training_keywords_favor_treats() {
        let products = db();
        let ranked = relevant_products(&products, "Dog Training Treats");
        assert_eq!(ranked[0].id, "treats-1");
        assert!(ranked.iter().all(|r| r.id != "litter-1"));
    }

    #[test]
    fn unrelated_keyword_finds_nothing() {
        let products = db();
        assert!(relevant_products(&products, "aquarium heater").is_empty());
    }

    #[test]
    fn prompt_carries_product_details() {
        let products = db();
        let ranked = relevant_products(&products, "cat litter");
        let prompt = build_prompt("cat litter", &ranked, &SiteConfig::default());

        assert!(prompt.user.contains(r#"blog post about "cat litter""#));
        assert!(prompt.user.contains("PRODUCT: Arm & Hammer Clump by Arm & Hammer"));
        assert!(prompt.user.contains("- Price: $29.99"));
        assert!(prompt.user.contains("SmartPetBuys"));
        assert!(prompt.user.contains("1200-1500 words"));
    }

    #[test]
    fn brand_falls_back_to_first_word() {
        let products = db();
        assert_eq!(products["toy-1"].brand_or_guess(), "KONG");
    }

    #[test]
    fn missing_database_is_empty() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert!(load_products(&tmp.path().join("products.json")).unwrap().is_empty());
    }
}
