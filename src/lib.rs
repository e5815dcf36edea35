//! **postguard** - keyword selection, duplicate-content guarding and usage
//! tracking for an automated affiliate blog.
//!
//! A keyword CSV drives generation, a JSON store counts how often each
//! keyword has been used, and every candidate post is checked against the
//! published posts before it is written.

/// Command-line interface with clap integration
pub mod cli;

/// Command handlers (text, table and JSON output)
pub mod cli_ext;

/// Shell completion generation
pub mod completion;

/// Domain logic, free of terminal output
pub mod core {
    /// Normalization, similarity ratios, shingles and hashes
    pub mod text;

    /// Keyword CSV loading, scoring and selection
    pub mod keywords;
    pub use keywords::{KeywordRecord, Priority, select_best_keyword};

    /// Persistent keyword-usage and post store
    pub mod tracker;
    pub use tracker::ContentTracker;

    /// Published posts with front matter
    pub mod posts;
    pub use posts::{ExistingPost, load_existing_posts};

    /// Duplicate-content checks over published posts
    pub mod guard;
    pub use guard::{DuplicateGuard, GuardConfig, GuardVerdict};

    /// One-post generation run through an LLM
    pub mod generate;
}

/// Infrastructure - configuration, file I/O and logging
pub mod infra {
    /// Layered configuration (file + POSTGUARD_* env)
    pub mod config;
    pub use config::{Config, init as config_init, load_config};

    /// BOM-tolerant reads and atomic replace
    pub mod io;

    /// tracing subscriber setup
    pub mod logging;
}

// Strategic re-exports for clean CLI interface
pub use cli::{AppContext, Cli, Commands};
pub use core::{ContentTracker, DuplicateGuard, GuardVerdict};
pub use infra::{Config, load_config};
