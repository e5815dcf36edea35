//! Text normalization and similarity scoring shared by the selector and the
//! duplicate guard.
//!
//! Everything here is pure: no I/O, no clocks. Similarity is computed over
//! *normalized* text so that markdown decoration, casing and filler words do
//! not inflate the score.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use itertools::Itertools;
use regex::Regex;

/// Words dropped by [`normalize`]: articles, conjunctions, common
/// prepositions and auxiliary verbs.
pub const STOP_WORDS: &[&str] = &[
    "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "from", "as",
    "is", "are", "was", "were", "be", "been", "have", "has", "had", "do", "does", "did", "will",
    "would", "should", "could", "can", "may", "might", "must", "shall", "a", "an",
];

/// Markdown punctuation stripped before tokenizing.
static MARKDOWN_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[#*`_\[\]()]").expect("static regex"));

static STOP_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| STOP_WORDS.iter().copied().collect());

/// Two-word phrases must be at least this many characters to count.
const MIN_BIGRAM_CHARS: usize = 7;
/// Three-word phrases must be at least this many characters to count.
const MIN_TRIGRAM_CHARS: usize = 11;

/// Lowercase, collapse whitespace, strip markdown punctuation, then drop
/// stop words and tokens of two characters or fewer.
///
/// Idempotent: `normalize(&normalize(x)) == normalize(x)`.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = MARKDOWN_PUNCT.replace_all(&lowered, "");

    stripped
        .split_whitespace()
        .filter(|w| !STOP_SET.contains(w) && w.chars().count() > 2)
        .join(" ")
}

/// Sequences at least this long drop "popular" characters from the match
/// index, as difflib's autojunk does.
const AUTOJUNK_MIN_LEN: usize = 200;

/// Ratcliff/Obershelp ratio `2*M / (|a| + |b|)` of two already-normalized
/// strings, in `[0, 1]`, where M is the total size of the matching blocks
/// found by repeatedly taking the longest common run and recursing on both
/// sides of it. Two empty strings are identical (1.0).
///
/// Arguments are put in a fixed order first, so the ratio is symmetric.
pub fn ratio(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }

    let (a, b) = if a <= b { (a, b) } else { (b, a) };
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let matched = BlockMatcher::new(&a, &b).matched_len();
    2.0 * matched as f64 / (a.len() + b.len()) as f64
}

/// Longest-matching-block search over two char sequences.
struct BlockMatcher<'a> {
    a: &'a [char],
    b: &'a [char],
    /// Positions of each non-popular character of `b`, ascending.
    b2j: HashMap<char, Vec<usize>>,
}

impl<'a> BlockMatcher<'a> {
    fn new(a: &'a [char], b: &'a [char]) -> Self {
        let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, &c) in b.iter().enumerate() {
            b2j.entry(c).or_default().push(j);
        }

        // In long texts every common letter matches everywhere; keep only
        // characters that occur in at most 1% of positions as anchors.
        if b.len() >= AUTOJUNK_MIN_LEN {
            let limit = b.len() / 100 + 1;
            b2j.retain(|_, js| js.len() <= limit);
        }

        Self { a, b, b2j }
    }

    /// `(i, j, size)` of the longest run `a[i..i+size] == b[j..j+size]`
    /// inside the given ranges, earliest in `a` then `b` on ties.
    fn longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> (usize, usize, usize) {
        let (mut best_i, mut best_j, mut best) = (alo, blo, 0);

        // Run length ending at each j for the previous i
        let mut prev: HashMap<usize, usize> = HashMap::new();
        for i in alo..ahi {
            let mut next: HashMap<usize, usize> = HashMap::new();
            if let Some(js) = self.b2j.get(&self.a[i]) {
                for &j in js {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = j
                        .checked_sub(1)
                        .and_then(|pj| prev.get(&pj))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    next.insert(j, k);
                    if k > best {
                        best_i = i + 1 - k;
                        best_j = j + 1 - k;
                        best = k;
                    }
                }
            }
            prev = next;
        }

        // Anchors skip popular characters; grow the run over them.
        while best_i > alo && best_j > blo && self.a[best_i - 1] == self.b[best_j - 1] {
            best_i -= 1;
            best_j -= 1;
            best += 1;
        }
        while best_i + best < ahi
            && best_j + best < bhi
            && self.a[best_i + best] == self.b[best_j + best]
        {
            best += 1;
        }

        (best_i, best_j, best)
    }

    /// Total characters covered by matching blocks.
    fn matched_len(&self) -> usize {
        let mut total = 0;
        let mut pending = vec![(0, self.a.len(), 0, self.b.len())];

        while let Some((alo, ahi, blo, bhi)) = pending.pop() {
            let (i, j, k) = self.longest_match(alo, ahi, blo, bhi);
            if k == 0 {
                continue;
            }
            total += k;
            if alo < i && blo < j {
                pending.push((alo, i, blo, j));
            }
            if i + k < ahi && j + k < bhi {
                pending.push((i + k, ahi, j + k, bhi));
            }
        }

        total
    }
}

/// Similarity of two raw texts: [`ratio`] over their normalized forms.
pub fn similarity(a: &str, b: &str) -> f64 {
    ratio(&normalize(a), &normalize(b))
}

/// Extract 2- and 3-word shingles from normalized text, skipping phrases
/// too short to be meaningful.
pub fn key_phrases(text: &str) -> HashSet<String> {
    let norm = normalize(text);
    let words: Vec<&str> = norm.split_whitespace().collect();

    let mut phrases = HashSet::new();

    for pair in words.windows(2) {
        let phrase = pair.join(" ");
        if phrase.chars().count() >= MIN_BIGRAM_CHARS {
            phrases.insert(phrase);
        }
    }

    for triple in words.windows(3) {
        let phrase = triple.join(" ");
        if phrase.chars().count() >= MIN_TRIGRAM_CHARS {
            phrases.insert(phrase);
        }
    }

    phrases
}

/// Shared-phrase overlap: `(|A ∩ B|, |A ∩ B| / min(|A|, |B|))`.
/// Returns `None` when either side has no phrases.
pub fn phrase_overlap(a: &HashSet<String>, b: &HashSet<String>) -> Option<(usize, f64)> {
    if a.is_empty() || b.is_empty() {
        return None;
    }

    let shared = a.intersection(b).count();
    let smaller = a.len().min(b.len());

    Some((shared, shared as f64 / smaller as f64))
}

/// Word-set Jaccard similarity over lowercased whitespace tokens.
/// No stop-word removal; either side empty gives 0.0.
pub fn jaccard(a: &str, b: &str) -> f64 {
    let a_lower = a.to_lowercase();
    let b_lower = b.to_lowercase();
    let words_a: HashSet<&str> = a_lower.split_whitespace().collect();
    let words_b: HashSet<&str> = b_lower.split_whitespace().collect();

    if words_a.is_empty() || words_b.is_empty() {
        return 0.0;
    }

    let inter = words_a.intersection(&words_b).count();
    let union = words_a.union(&words_b).count();

    inter as f64 / union as f64
}

/// Remove a trailing site-branding suffix such as ` — SmartPetBuys` or
/// ` | SmartPetBuys` (case-insensitive). Titles without the suffix are
/// returned unchanged.
pub fn strip_brand<'a>(title: &'a str, brand: &str) -> &'a str {
    let trimmed = title.trim_end();
    if brand.is_empty() || trimmed.len() < brand.len() {
        return trimmed;
    }

    let split = trimmed.len() - brand.len();
    let Some(tail) = trimmed.get(split..) else {
        return trimmed;
    };
    if !tail.eq_ignore_ascii_case(brand) {
        return trimmed;
    }

    let head = trimmed[..split].trim_end_matches(|c: char| {
        c.is_whitespace() || matches!(c, '—' | '–' | '-' | '|' | ':' | '·')
    });

    // A title that is nothing but the brand keeps it.
    if head.is_empty() { trimmed } else { head }
}

/// Comparison key for titles: branding removed, then normalized.
pub fn title_key(title: &str, brand: &str) -> String {
    normalize(strip_brand(title, brand))
}

/// BLAKE3 hex digest used as the content hash of a post body. Leading and
/// trailing whitespace is not part of the hash.
pub fn content_hash(content: &str) -> String {
    blake3::hash(content.trim().as_bytes()).to_hex().to_string()
}
