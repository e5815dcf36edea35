//! `postguard keywords ...`

use std::process::ExitCode;

use anyhow::Result;
use chrono::Utc;
use serde_json::json;
use tabled::{Table, Tabled, settings::Style};
use tracing::instrument;

use super::{EXIT_FLAGGED, Palette, open_tracker, print_json};
use crate::cli::{AppContext, KeywordsCommand};
use crate::core::keywords::{keyword_stats, load_keywords, select_best_keyword, suggest_keywords};
use crate::infra::config::Config;

#[instrument(skip_all)]
pub fn run(cmd: KeywordsCommand, cfg: &Config, ctx: &AppContext) -> Result<ExitCode> {
    let paint = Palette::new(ctx);
    let mut tracker = open_tracker(cfg);

    match cmd {
        KeywordsCommand::Stats(flag) => {
            let records = load_keywords(&cfg.paths.keywords)?;
            let stats = keyword_stats(&records, &tracker);

            if flag.json {
                print_json(&stats)?;
            } else {
                println!("Keyword statistics ({})", paint.dim(cfg.paths.keywords.display()));
                println!("  Total:        {}", stats.total_keywords);
                println!("  Publishable:  {}", paint.good(stats.publishable_keywords));
                println!("  Overused:     {}", paint.warn(stats.overused_keywords));
                println!("  Never used:   {}", stats.never_used_keywords);
                println!("  Posts by priority:");
                for (tier, n) in &stats.usage_by_priority {
                    println!("    {tier:<8}{n}");
                }
            }
        }

        KeywordsCommand::Suggest(args) => {
            let records = load_keywords(&cfg.paths.keywords)?;
            let picks = suggest_keywords(&records, &tracker, args.count);

            if picks.is_empty() {
                if !ctx.quiet {
                    println!("{}", paint.warn("No unpublished keywords left to suggest"));
                }
            } else {
                if !ctx.quiet {
                    println!("Suggested keywords to enable:");
                }
                for (i, k) in picks.iter().enumerate() {
                    println!("{:>3}. {}", i + 1, paint.name(k));
                }
            }
        }

        KeywordsCommand::Next(flag) => {
            let records = load_keywords(&cfg.paths.keywords)?;
            let best = select_best_keyword(&records, &tracker, Utc::now());

            match (best, flag.json) {
                (Some(sel), true) => print_json(&json!({
                    "keyword": sel.candidate.keyword,
                    "score": sel.score,
                    "priority": sel.candidate.priority,
                    "estimated_volume": sel.candidate.estimated_volume,
                    "usage_count": sel.candidate.usage_count,
                    "last_used": sel.candidate.last_used,
                }))?,
                (None, true) => print_json(&json!({ "keyword": null }))?,
                (Some(sel), false) => {
                    println!(
                        "{} {} (score {:.2}, {} priority, volume {}, used {}/{})",
                        paint.good("Next:"),
                        paint.name(&sel.candidate.keyword),
                        sel.score,
                        sel.candidate.priority,
                        sel.candidate.estimated_volume,
                        sel.candidate.usage_count,
                        tracker.usage_cap(),
                    );
                }
                (None, false) => println!("{}", paint.warn("No keyword available")),
            }
        }

        KeywordsCommand::Reset(args) => {
            let used = tracker.usage_count(&args.keyword);
            let known = tracker.data().keywords.contains_key(&args.keyword);

            if !known {
                eprintln!("{} keyword not tracked: {}", paint.bad("error:"), args.keyword);
                return Ok(ExitCode::from(EXIT_FLAGGED));
            }

            if ctx.dry_run {
                println!(
                    "{} reset '{}' (currently used {used} times)",
                    paint.warn("DRY RUN: Would"),
                    args.keyword
                );
                return Ok(ExitCode::SUCCESS);
            }

            tracker.reset(&args.keyword)?;
            if !ctx.quiet {
                println!("{} '{}' (was used {used} times)", paint.good("Reset"), args.keyword);
            }
        }

        KeywordsCommand::List => {
            #[derive(Tabled)]
            struct Row {
                keyword: String,
                priority: String,
                volume: u64,
                publish: &'static str,
                used: String,
                last_used: String,
            }

            let records = load_keywords(&cfg.paths.keywords)?;
            let rows: Vec<Row> = records
                .iter()
                .map(|r| Row {
                    keyword: r.keyword.clone(),
                    priority: r.priority.to_string(),
                    volume: r.estimated_volume,
                    publish: if r.publish { "yes" } else { "no" },
                    used: format!("{}/{}", tracker.usage_count(&r.keyword), tracker.usage_cap()),
                    last_used: tracker
                        .last_used(&r.keyword)
                        .map(|s| s.chars().take(10).collect())
                        .unwrap_or_else(|| "-".to_string()),
                })
                .collect();

            let mut table = Table::new(rows);
            table.with(Style::sharp());
            println!("{table}");
        }
    }

    Ok(ExitCode::SUCCESS)
}
