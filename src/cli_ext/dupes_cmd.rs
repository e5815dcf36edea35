//! `postguard dupes ...`

use std::process::ExitCode;

use anyhow::Result;
use tabled::{Table, Tabled, settings::Style};
use tracing::{info, instrument};

use super::{EXIT_FLAGGED, Palette, candidate_body, open_tracker, print_json};
use crate::cli::{AppContext, DupesCommand};
use crate::core::guard::DuplicateGuard;
use crate::core::posts::load_existing_posts;
use crate::infra::config::Config;

#[instrument(skip_all)]
pub fn run(cmd: DupesCommand, cfg: &Config, ctx: &AppContext) -> Result<ExitCode> {
    let paint = Palette::new(ctx);
    let tracker = open_tracker(cfg);
    let posts = load_existing_posts(&cfg.paths.content_dir)?;
    let guard = DuplicateGuard::new(&posts, &tracker, cfg.guard.clone())
        .with_brand(cfg.site.name.as_str());

    match cmd {
        DupesCommand::Check(args) => {
            let body = candidate_body(args.content, args.content_file.as_deref())?;
            let threshold = args.threshold.unwrap_or(cfg.guard.content_threshold);
            let verdict = guard.check_with_threshold(&args.keyword, &args.title, &body, threshold);

            if args.json {
                print_json(&verdict)?;
            } else if verdict.is_duplicate {
                println!("{} {}", paint.bad("DUPLICATE"), args.title);
                for reason in &verdict.reasons {
                    println!("  - {reason}");
                }
            } else if !ctx.quiet {
                println!(
                    "{} no duplicates among {} posts",
                    paint.good("OK"),
                    posts.len()
                );
            }

            if verdict.is_duplicate {
                return Ok(ExitCode::from(EXIT_FLAGGED));
            }
        }

        DupesCommand::Stats(flag) => {
            let stats = guard.duplicate_stats();

            if flag.json {
                print_json(&stats)?;
            } else {
                println!("Duplicate statistics ({})", paint.dim(cfg.paths.content_dir.display()));
                println!("  Posts:             {}", stats.total_posts);
                println!("  Unique hashes:     {}", stats.unique_hashes);
                let dupes = if stats.duplicate_hashes > 0 {
                    paint.bad(stats.duplicate_hashes)
                } else {
                    paint.good(stats.duplicate_hashes)
                };
                println!("  Duplicated hashes: {dupes}");
                if !stats.most_used_keywords.is_empty() {
                    println!("  Most used keywords:");
                    for (k, n) in &stats.most_used_keywords {
                        println!("    {n:>3}  {}", paint.name(k));
                    }
                }
            }
        }

        DupesCommand::Similar(args) => {
            let body = candidate_body(None, args.content_file.as_deref())?;
            let threshold = args.threshold.unwrap_or(cfg.guard.similar_threshold);
            let found = guard.find_similar_posts(&args.title, &body, threshold);

            if args.json {
                print_json(&found)?;
            } else if found.is_empty() {
                if !ctx.quiet {
                    println!("No posts above {:.0}% similarity", threshold * 100.0);
                }
            } else {
                #[derive(Tabled)]
                struct Row {
                    overall: String,
                    title: String,
                    content: String,
                    post: String,
                }

                let rows: Vec<Row> = found
                    .iter()
                    .map(|s| Row {
                        overall: format!("{:.1}%", s.overall_similarity * 100.0),
                        title: format!("{:.1}%", s.title_similarity * 100.0),
                        content: format!("{:.1}%", s.content_similarity * 100.0),
                        post: s.title.clone(),
                    })
                    .collect();

                let mut table = Table::new(rows);
                table.with(Style::sharp());
                println!("{table}");
            }
        }

        DupesCommand::Cleanup(args) => {
            let dry_run = ctx.dry_run || !args.yes;
            let removed = guard.cleanup_duplicates(dry_run);

            if removed.is_empty() {
                if !ctx.quiet {
                    println!("{}", paint.good("No exact duplicates found"));
                }
            } else {
                let verb = if dry_run { "Would remove" } else { "Removed" };
                for path in &removed {
                    println!("{} {}", paint.warn(verb), path.display());
                }
                if dry_run && !ctx.quiet {
                    println!("{}", paint.dim("Re-run with --yes to delete"));
                }
            }
            info!(count = removed.len(), dry_run, "Cleanup finished");
        }
    }

    Ok(ExitCode::SUCCESS)
}
