//! Command handlers: load what a command needs from the config, call into
//! `core`, and render the result as colored text, tables or JSON.

pub mod dupes_cmd;
pub mod generate_cmd;
pub mod keywords_cmd;

use std::fmt::Display;
use std::path::Path;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use serde::Serialize;

use crate::cli::AppContext;
use crate::core::tracker::ContentTracker;
use crate::infra::config::Config;
use crate::infra::io::read_text;

/// Exit status for "duplicate detected" and "unknown keyword".
pub const EXIT_FLAGGED: u8 = 3;

/// Terminal styling that honours `--no-color`.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    enabled: bool,
}

impl Palette {
    pub fn new(ctx: &AppContext) -> Self {
        Self {
            enabled: !ctx.no_color,
        }
    }

    pub fn good(&self, s: impl Display) -> String {
        if self.enabled { s.green().bold().to_string() } else { s.to_string() }
    }

    pub fn bad(&self, s: impl Display) -> String {
        if self.enabled { s.red().bold().to_string() } else { s.to_string() }
    }

    pub fn warn(&self, s: impl Display) -> String {
        if self.enabled { s.yellow().to_string() } else { s.to_string() }
    }

    pub fn name(&self, s: impl Display) -> String {
        if self.enabled { s.cyan().to_string() } else { s.to_string() }
    }

    pub fn dim(&self, s: impl Display) -> String {
        if self.enabled { s.dimmed().to_string() } else { s.to_string() }
    }
}

/// Tracking store configured with the cap and brand from `cfg`.
pub(crate) fn open_tracker(cfg: &Config) -> ContentTracker {
    ContentTracker::load(&cfg.paths.tracker)
        .with_usage_cap(cfg.guard.usage_cap)
        .with_brand(cfg.site.name.as_str())
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("serialize JSON output")?;
    println!("{out}");
    Ok(())
}

/// Body text from an inline argument or a file; empty when neither is given.
pub(crate) fn candidate_body(inline: Option<String>, file: Option<&Path>) -> Result<String> {
    match (inline, file) {
        (Some(text), _) => Ok(text),
        (None, Some(path)) => read_text(path),
        (None, None) => Ok(String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_without_color_is_plain() {
        let p = Palette::new(&AppContext {
            quiet: false,
            no_color: true,
            dry_run: false,
        });
        assert_eq!(p.good("ok"), "ok");
        assert_eq!(p.bad(3), "3");
    }

    #[test]
    fn palette_with_color_escapes() {
        let p = Palette::new(&AppContext {
            quiet: false,
            no_color: false,
            dry_run: false,
        });
        assert!(p.good("ok").contains("\u{1b}["));
    }

    #[test]
    fn body_prefers_inline_text() {
        let tmp = tempfile::TempDir::new().unwrap();
        let f = tmp.path().join("body.md");
        std::fs::write(&f, "from file").unwrap();

        assert_eq!(candidate_body(Some("inline".into()), Some(&f)).unwrap(), "inline");
        assert_eq!(candidate_body(None, Some(&f)).unwrap(), "from file");
        assert_eq!(candidate_body(None, None).unwrap(), "");
    }
}
