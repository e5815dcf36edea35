//! `postguard generate`

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::instrument;

use super::{Palette, open_tracker};
use crate::cli::AppContext;
use crate::core::generate::{
    ContentGenerator, GenerateError, OpenAiGenerator, Outcome, Pipeline, Prompt,
};
use crate::infra::config::Config;

/// Shows a spinner while the wrapped generator is working.
struct WithSpinner<'a> {
    inner: &'a dyn ContentGenerator,
    quiet: bool,
}

impl ContentGenerator for WithSpinner<'_> {
    fn generate(&self, prompt: &Prompt) -> Result<String, GenerateError> {
        let pb = if self.quiet {
            ProgressBar::hidden()
        } else {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed}] {msg}") {
                pb.set_style(style);
            }
            pb.set_message("Waiting for the model...");
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        };

        let result = self.inner.generate(prompt);
        pb.finish_and_clear();
        result
    }
}

/// Placeholder for dry runs, where the model is never called.
struct Offline;

impl ContentGenerator for Offline {
    fn generate(&self, _prompt: &Prompt) -> Result<String, GenerateError> {
        Err(GenerateError::EmptyResponse)
    }
}

#[instrument(skip_all)]
pub fn run(cfg: &Config, ctx: &AppContext) -> Result<ExitCode> {
    let paint = Palette::new(ctx);
    let mut tracker = open_tracker(cfg);

    let pipeline = Pipeline {
        keywords_csv: &cfg.paths.keywords,
        content_dir: &cfg.paths.content_dir,
        products: &cfg.paths.products,
        guard: &cfg.guard,
        generator: &cfg.generator,
        site: &cfg.site,
        dry_run: ctx.dry_run,
    };

    let outcome = if ctx.dry_run {
        pipeline.run(&mut tracker, &Offline)?
    } else {
        let client = OpenAiGenerator::from_config(&cfg.generator)?;
        let llm = WithSpinner {
            inner: &client,
            quiet: ctx.quiet,
        };
        pipeline.run(&mut tracker, &llm)?
    };

    report(&outcome, &paint, ctx);
    Ok(ExitCode::SUCCESS)
}

fn report(outcome: &Outcome, paint: &Palette, ctx: &AppContext) {
    match outcome {
        Outcome::Generated {
            keyword,
            title,
            post_id,
            path,
            chars,
            usage,
            csv_updated,
        } => {
            println!("{} {}", paint.good("Generated"), path.display());
            if !ctx.quiet {
                println!("  Keyword:  {} (used {usage} times)", paint.name(keyword));
                println!("  Title:    {title}");
                println!("  Post id:  {post_id}");
                println!("  Length:   {chars} characters");
                if !csv_updated {
                    println!("  {}", paint.warn("Keyword CSV was not updated"));
                }
            }
        }
        Outcome::DryRun {
            keyword,
            title,
            products,
            prompt,
        } => {
            println!("{}", paint.warn("DRY RUN: Would generate:"));
            println!("  Keyword:  {}", paint.name(keyword));
            println!("  Title:    {title}");
            println!("  Products: {products}");
            println!("  Prompt:   {} characters", prompt.user.chars().count());
        }
        _ if ctx.quiet => {}
        Outcome::NoKeywords => println!("No keywords marked for publishing"),
        Outcome::NoneAvailable => println!("No available keywords (all may be overused)"),
        Outcome::GenerationFailed { keyword, error } => {
            println!("{} generation failed for {}: {error}", paint.bad("No post:"), paint.name(keyword));
        }
        Outcome::Rejected {
            keyword,
            stage,
            reasons,
        } => {
            println!(
                "{} candidate for {} rejected ({})",
                paint.bad("No post:"),
                paint.name(keyword),
                stage.as_str(),
            );
            for reason in reasons {
                println!("  - {reason}");
            }
        }
    }
}
