use std::process::ExitCode;

use clap::Parser;
use postguard::cli::{Cli, Commands};
use postguard::cli_ext::{dupes_cmd, generate_cmd, keywords_cmd};
use postguard::infra::{config, logging};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Build a context once, pass everywhere
    let ctx = cli.context();

    if let Err(e) = logging::init(cli.verbose, cli.quiet, cli.no_color) {
        eprintln!("error: {e:#}");
        return ExitCode::FAILURE;
    }

    let config_file = cli.config.as_deref();
    let result = match cli.command {
        Commands::Init(args) => config::init(args, &ctx).map(|()| ExitCode::SUCCESS),
        Commands::Completions(args) => {
            postguard::completion::run(args, &ctx).map(|()| ExitCode::SUCCESS)
        }
        Commands::Keywords(cmd) => config::load_config(config_file)
            .and_then(|cfg| keywords_cmd::run(cmd, &cfg, &ctx)),
        Commands::Dupes(cmd) => config::load_config(config_file)
            .and_then(|cfg| dupes_cmd::run(cmd, &cfg, &ctx)),
        Commands::Generate => {
            config::load_config(config_file).and_then(|cfg| generate_cmd::run(&cfg, &ctx))
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
