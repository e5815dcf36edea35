use anyhow::Result;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter directive for a `-v` count.
pub fn level_for(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the stderr subscriber. Call once at startup.
///
/// `--quiet` forces `error` and ignores `RUST_LOG`; otherwise `RUST_LOG`
/// wins over the `-v` count.
pub fn init(verbose: u8, quiet: bool, no_color: bool) -> Result<()> {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if std::env::var_os("RUST_LOG").is_some() {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_for(verbose)))
    } else {
        EnvFilter::new(level_for(verbose))
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose >= 2)
        .with_ansi(!no_color);

    // Already installed is fine (tests, embedding)
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();

    Ok(())
}
