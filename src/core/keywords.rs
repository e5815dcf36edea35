//! Keyword list loading, rotation scoring and selection.
//!
//! The operator maintains a CSV with at least `keyword` and `publish`
//! columns, optionally `priority` and `estimated_volume`. Selection is a
//! pure function of that list, the tracking store and a clock reading; the
//! caller marks a keyword used only after its post is durably written.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::tracker::ContentTracker;
use crate::infra::io::{strip_bom, write_atomic};

/// Maximum recency bonus, also granted to never-used keywords.
const MAX_RECENCY_BONUS: f64 = 2.0;
/// Days of disuse that earn one point of recency bonus.
const RECENCY_DAYS_PER_POINT: f64 = 30.0;
/// Score subtracted per recorded post.
const USAGE_PENALTY: f64 = 0.5;

/// Configuration errors in the keyword list. These abort the operation.
#[derive(Debug, thiserror::Error)]
pub enum KeywordError {
    #[error("Keywords file not found: {0}")]
    NotFound(PathBuf),

    #[error("Keywords file {path} is missing required column '{column}'")]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("Failed to read keywords file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed keywords CSV {path}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Priority tier of a keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum Priority {
    High,
    Medium,
    Low,
    /// Any unrecognized value; weighted like `low`.
    Other(String),
}

impl Priority {
    /// Parse a CSV cell; blank means `medium`.
    pub fn parse(raw: &str) -> Self {
        let v = raw.trim();
        match v.to_ascii_lowercase().as_str() {
            "" | "medium" => Priority::Medium,
            "high" => Priority::High,
            "low" => Priority::Low,
            _ => Priority::Other(v.to_string()),
        }
    }

    /// Selection weight: high 3, medium 2, low and unrecognized 1.
    pub fn weight(&self) -> f64 {
        match self {
            Priority::High => 3.0,
            Priority::Medium => 2.0,
            Priority::Low | Priority::Other(_) => 1.0,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::High => f.write_str("high"),
            Priority::Medium => f.write_str("medium"),
            Priority::Low => f.write_str("low"),
            Priority::Other(s) => f.write_str(s),
        }
    }
}

impl From<Priority> for String {
    fn from(p: Priority) -> Self {
        p.to_string()
    }
}

/// One row of the keyword list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordRecord {
    pub keyword: String,
    pub priority: Priority,
    pub estimated_volume: u64,
    pub publish: bool,
}

/// A keyword annotated with its usage from the tracking store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub keyword: String,
    pub priority: Priority,
    pub estimated_volume: u64,
    pub usage_count: usize,
    pub last_used: Option<String>,
}

impl Candidate {
    fn from_record(rec: &KeywordRecord, tracker: &ContentTracker) -> Self {
        Self {
            keyword: rec.keyword.clone(),
            priority: rec.priority.clone(),
            estimated_volume: rec.estimated_volume,
            usage_count: tracker.usage_count(&rec.keyword),
            last_used: tracker.last_used(&rec.keyword).map(str::to_string),
        }
    }

    /// `priority_weight + volume/1000 - usage*0.5 + recency_bonus`.
    pub fn score(&self, now: DateTime<Utc>) -> f64 {
        self.priority.weight() + self.estimated_volume as f64 / 1000.0
            - self.usage_count as f64 * USAGE_PENALTY
            + recency_bonus(self.last_used.as_deref(), now)
    }
}

/// `min(days_since_last_used / 30, 2)`. Never used or unparseable
/// timestamps earn the full bonus; future timestamps earn none.
pub fn recency_bonus(last_used: Option<&str>, now: DateTime<Utc>) -> f64 {
    let Some(raw) = last_used else {
        return MAX_RECENCY_BONUS;
    };

    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(ts) => {
            let days = (now - ts.with_timezone(&Utc)).num_days().max(0);
            (days as f64 / RECENCY_DAYS_PER_POINT).min(MAX_RECENCY_BONUS)
        }
        Err(_) => MAX_RECENCY_BONUS,
    }
}

/// Winner of a selection round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Selection {
    pub candidate: Candidate,
    pub score: f64,
}

/// Column positions resolved from the header row.
struct Columns {
    keyword: usize,
    publish: usize,
    priority: Option<usize>,
    volume: Option<usize>,
}

impl Columns {
    fn resolve(headers: &csv::StringRecord, path: &Path) -> Result<Self, KeywordError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let missing = |column| KeywordError::MissingColumn {
            path: path.to_path_buf(),
            column,
        };

        Ok(Self {
            keyword: find("keyword").ok_or_else(|| missing("keyword"))?,
            publish: find("publish").ok_or_else(|| missing("publish"))?,
            priority: find("priority"),
            volume: find("estimated_volume"),
        })
    }
}

fn parse_publish(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" | "1" => Some(true),
        "no" | "n" | "false" | "0" => Some(false),
        _ => None,
    }
}

fn read_csv(path: &Path) -> Result<String, KeywordError> {
    if !path.exists() {
        return Err(KeywordError::NotFound(path.to_path_buf()));
    }
    let raw = fs::read_to_string(path).map_err(|source| KeywordError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(strip_bom(&raw).to_string())
}

fn csv_reader(text: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes())
}

/// Load the keyword list.
///
/// A missing file or missing required column is a [`KeywordError`]. Rows
/// with a blank keyword are skipped; rows with a blank or unrecognized
/// publish flag, or a non-numeric volume, are skipped with a warning.
pub fn load_keywords(path: &Path) -> Result<Vec<KeywordRecord>, KeywordError> {
    let text = read_csv(path)?;
    let csv_err = |source| KeywordError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut rdr = csv_reader(&text);
    let cols = Columns::resolve(rdr.headers().map_err(csv_err)?, path)?;

    let mut out = Vec::new();
    for (i, row) in rdr.records().enumerate() {
        let row = row.map_err(csv_err)?;
        let line = i + 2; // 1-based, after the header
        let cell = |idx: Option<usize>| idx.and_then(|c| row.get(c)).unwrap_or("").trim();

        let keyword = cell(Some(cols.keyword));
        if keyword.is_empty() {
            continue;
        }

        let Some(publish) = parse_publish(cell(Some(cols.publish))) else {
            warn!(line, keyword, "Skipping keyword row: publish must be yes or no");
            continue;
        };

        let volume_raw = cell(cols.volume);
        let estimated_volume = if volume_raw.is_empty() {
            0
        } else {
            match volume_raw.replace(',', "").parse::<u64>() {
                Ok(v) => v,
                Err(_) => {
                    warn!(line, keyword, volume_raw, "Skipping keyword row: bad estimated_volume");
                    continue;
                }
            }
        };

        out.push(KeywordRecord {
            keyword: keyword.to_string(),
            priority: Priority::parse(cell(cols.priority)),
            estimated_volume,
            publish,
        });
    }

    debug!(count = out.len(), path = %path.display(), "Loaded keywords");
    Ok(out)
}

/// Keywords flagged for publishing and still under the usage cap.
pub fn publishable_keywords(records: &[KeywordRecord], tracker: &ContentTracker) -> Vec<Candidate> {
    records
        .iter()
        .filter(|r| r.publish && !tracker.is_exhausted(&r.keyword))
        .map(|r| Candidate::from_record(r, tracker))
        .collect()
}

/// Pick the highest-scoring publishable keyword. Ties go to the earliest
/// row. `None` means no keyword is available.
pub fn select_best_keyword(
    records: &[KeywordRecord],
    tracker: &ContentTracker,
    now: DateTime<Utc>,
) -> Option<Selection> {
    let mut best: Option<Selection> = None;

    for candidate in publishable_keywords(records, tracker) {
        let score = candidate.score(now);
        if best.as_ref().is_none_or(|b| score > b.score) {
            best = Some(Selection { candidate, score });
        }
    }

    match &best {
        Some(s) => debug!(keyword = %s.candidate.keyword, score = s.score, "Selected keyword"),
        None => info!("No available keywords"),
    }
    best
}

/// Summary counts over the keyword list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordStats {
    pub total_keywords: usize,
    pub publishable_keywords: usize,
    pub overused_keywords: usize,
    pub never_used_keywords: usize,
    /// Total recorded posts per priority tier.
    pub usage_by_priority: IndexMap<String, usize>,
}

pub fn keyword_stats(records: &[KeywordRecord], tracker: &ContentTracker) -> KeywordStats {
    let mut stats = KeywordStats {
        total_keywords: records.len(),
        publishable_keywords: 0,
        overused_keywords: 0,
        never_used_keywords: 0,
        usage_by_priority: ["high", "medium", "low"]
            .into_iter()
            .map(|p| (p.to_string(), 0))
            .collect(),
    };

    for rec in records {
        let usage = tracker.usage_count(&rec.keyword);
        let exhausted = tracker.is_exhausted(&rec.keyword);

        if rec.publish && !exhausted {
            stats.publishable_keywords += 1;
        } else if exhausted {
            stats.overused_keywords += 1;
        } else if usage == 0 {
            stats.never_used_keywords += 1;
        }

        if let Some(total) = stats
            .usage_by_priority
            .get_mut(rec.priority.to_string().as_str())
        {
            *total += usage;
        }
    }

    stats
}

/// High-value keywords not yet flagged for publishing that could still be
/// used, by priority then volume.
pub fn suggest_keywords(
    records: &[KeywordRecord],
    tracker: &ContentTracker,
    count: usize,
) -> Vec<String> {
    let mut pool: Vec<&KeywordRecord> = records
        .iter()
        .filter(|r| !r.publish && !tracker.is_exhausted(&r.keyword))
        .collect();

    // Stable: equal keys keep list order
    pool.sort_by(|a, b| {
        b.priority
            .weight()
            .total_cmp(&a.priority.weight())
            .then(b.estimated_volume.cmp(&a.estimated_volume))
    });

    pool.into_iter()
        .take(count)
        .map(|r| r.keyword.clone())
        .collect()
}

/// Set `publish` to `no` for `keyword` in the CSV, keeping every other
/// cell. Returns whether any row matched.
pub fn mark_keyword_used(path: &Path, keyword: &str) -> Result<bool> {
    let text = read_csv(path)?;
    let mut rdr = csv_reader(&text);
    let headers = rdr.headers().context("read keywords header")?.clone();
    let cols = Columns::resolve(&headers, path)?;

    let mut wtr = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());
    wtr.write_record(&headers).context("write keywords header")?;

    let mut matched = false;
    for row in rdr.records() {
        let row = row.context("read keywords row")?;
        let is_target = row
            .get(cols.keyword)
            .is_some_and(|k| k.trim() == keyword);

        if is_target && row.len() > cols.publish {
            matched = true;
            let updated: csv::StringRecord = row
                .iter()
                .enumerate()
                .map(|(i, v)| if i == cols.publish { "no" } else { v })
                .collect();
            wtr.write_record(&updated).context("write keywords row")?;
        } else {
            wtr.write_record(&row).context("write keywords row")?;
        }
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flush keywords csv: {}", e.error()))?;
    write_atomic(path, &bytes)?;

    if matched {
        info!(keyword, "Marked keyword as used");
    } else {
        warn!(keyword, "Keyword not found in keywords file");
    }
    Ok(matched)
}
