use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::{AppContext, InitArgs};
use crate::core::generate::{GeneratorConfig, SiteConfig};
use crate::core::guard::GuardConfig;

/// Config files probed in the working directory, first match wins.
pub const CONFIG_FILES: [&str; 4] =
    ["postguard.toml", ".postguard.toml", "postguard.yaml", "postguard.json"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config
{
    /// Data file locations
    pub paths: PathsConfig,

    /// Duplicate guard thresholds and the per-keyword usage cap
    pub guard: GuardConfig,

    /// LLM client and quality gate
    pub generator: GeneratorConfig,

    /// Site identity used in titles and front matter
    pub site: SiteConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig
{
    pub keywords: PathBuf,
    pub tracker: PathBuf,
    pub content_dir: PathBuf,
    pub products: PathBuf,
}

impl Default for PathsConfig
{
    fn default() -> Self
    {
        Self {
            keywords: PathBuf::from("keywords.csv"),
            tracker: PathBuf::from("data/content_tracker.json"),
            content_dir: PathBuf::from("content/posts"),
            products: PathBuf::from("data/products.json"),
        }
    }
}

impl PathsConfig
{
    /// Expand `~` and `$VAR` in every path.
    fn expand(&mut self) -> Result<()>
    {
        for p in [&mut self.keywords, &mut self.tracker, &mut self.content_dir, &mut self.products]
        {
            let raw = p.to_string_lossy().into_owned();
            let expanded = shellexpand::full(&raw)
                .with_context(|| format!("Failed to expand path {raw}"))?;
            *p = PathBuf::from(expanded.as_ref());
        }
        Ok(())
    }
}

/// Layer defaults, the config file (explicit or first of [`CONFIG_FILES`])
/// and `POSTGUARD_*` environment variables (`__` between nested keys, e.g.
/// `POSTGUARD_GUARD__USAGE_CAP=5`).
pub fn load_config(explicit: Option<&Path>) -> Result<Config>
{
    let mut builder = config::Config::builder();

    match explicit
    {
        Some(path) =>
        {
            if !path.exists()
            {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            builder = builder.add_source(config::File::from(path).required(true));
        }
        None =>
        {
            if let Some(path) = CONFIG_FILES.iter().map(Path::new).find(|p| p.exists())
            {
                builder = builder.add_source(config::File::from(path));
            }
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("POSTGUARD")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let cfg = builder
        .build()
        .context("Failed to load configuration")?;
    let mut parsed: Config = cfg
        .try_deserialize()
        .context("Failed to parse configuration")?;

    parsed.paths.expand()?;
    validate(&parsed)?;
    Ok(parsed)
}

fn validate(cfg: &Config) -> Result<()>
{
    let g = &cfg.guard;
    for (name, v) in [
        ("guard.title_threshold", g.title_threshold),
        ("guard.content_threshold", g.content_threshold),
        ("guard.phrase_overlap_ratio", g.phrase_overlap_ratio),
        ("guard.jaccard_threshold", g.jaccard_threshold),
        ("guard.similar_threshold", g.similar_threshold),
    ]
    {
        if !(0.0..=1.0).contains(&v)
        {
            anyhow::bail!("{name} must be between 0 and 1, got {v}");
        }
    }
    if g.usage_cap == 0
    {
        anyhow::bail!("guard.usage_cap must be at least 1");
    }
    Ok(())
}

pub fn init(
    args: InitArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config_path = args
        .path
        .join(CONFIG_FILES[0]);

    if config_path.exists() && !args.force
    {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let toml_string = toml::to_string_pretty(&Config::default())
        .context("Failed to serialize default config")?;

    if ctx.dry_run
    {
        print!("{toml_string}");
        return Ok(());
    }

    std::fs::create_dir_all(&args.path).context("Failed to create config directory")?;
    std::fs::write(&config_path, toml_string).context("Failed to write config file")?;

    if !ctx.quiet
    {
        println!("Created config file at {}", config_path.display());
    }
    Ok(())
}
