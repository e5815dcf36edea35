use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shared application context for global flags
#[derive(Clone, Debug)]
pub struct AppContext {
    pub quiet: bool,    // global --quiet
    pub no_color: bool, // global --no-color
    pub dry_run: bool,  // global --dry-run
}

#[derive(Parser)]
#[command(name = "postguard")]
#[command(
    about = "Keyword selection, duplicate-content guarding and usage tracking for an automated blog"
)]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Suppress non-essential output and all logs below error
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Show what would be done without writing anything
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Config file (default: first of postguard.toml, .postguard.toml,
    /// postguard.yaml, postguard.json)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn context(&self) -> AppContext {
        AppContext {
            quiet: self.quiet,
            no_color: self.no_color,
            dry_run: self.dry_run,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Inspect and select keywords from the keyword CSV
    #[command(subcommand)]
    Keywords(KeywordsCommand),

    /// Check candidates against published posts
    #[command(subcommand)]
    Dupes(DupesCommand),

    /// Generate one post for the best available keyword
    Generate,

    /// Initialize a postguard.toml config file
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Subcommand)]
pub enum KeywordsCommand {
    /// Keyword counts and usage by priority
    Stats(JsonFlag),

    /// Unpublished keywords worth enabling next
    Suggest(SuggestArgs),

    /// The keyword the generator would pick now
    Next(JsonFlag),

    /// Clear a keyword's usage count and post list
    Reset(ResetArgs),

    /// All keywords with their usage
    List,
}

#[derive(Debug, Args)]
pub struct JsonFlag {
    /// Emit JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct SuggestArgs {
    /// How many keywords to suggest
    #[arg(short = 'n', long, default_value = "5")]
    pub count: usize,
}

#[derive(Debug, Args)]
pub struct ResetArgs {
    /// Keyword exactly as it appears in the store
    pub keyword: String,
}

#[derive(Debug, Subcommand)]
pub enum DupesCommand {
    /// Run the duplicate guard on a candidate post
    Check(CheckArgs),

    /// Content-hash and keyword-usage statistics
    Stats(JsonFlag),

    /// Published posts similar to a title (and optional body)
    Similar(SimilarArgs),

    /// Remove posts whose body exactly repeats an earlier post
    Cleanup(CleanupArgs),
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Target keyword of the candidate
    pub keyword: String,

    /// Candidate title
    pub title: String,

    /// Candidate body text
    #[arg(conflicts_with = "content_file")]
    pub content: Option<String>,

    /// Read the candidate body from a file
    #[arg(long, value_name = "FILE")]
    pub content_file: Option<PathBuf>,

    /// Content similarity threshold (default from config)
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Emit JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct SimilarArgs {
    /// Candidate title
    pub title: String,

    /// Read the candidate body from a file
    #[arg(long, value_name = "FILE")]
    pub content_file: Option<PathBuf>,

    /// Minimum mean similarity (default from config)
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Emit JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct CleanupArgs {
    /// Actually delete; without this only the duplicates are listed
    #[arg(long)]
    pub yes: bool,
}

#[derive(Debug, Parser)]
pub struct InitArgs {
    /// Directory to initialize config in
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Output directory; if omitted and --stdout not set, prints error
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Print completion script to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,
}
