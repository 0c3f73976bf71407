//! `harvest` -- build provenance CLI.
//!
//! Parses CLI arguments with clap, resolves the runtime context, and
//! dispatches to command handlers.

mod cli;
mod commands;
mod context;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use context::RuntimeContext;

/// Filter used by `-v` when neither `HARVEST_LOG` nor `log-filter` is set.
const VERBOSE_FILTER: &str = "harvest=debug,harvest_storage=debug,harvest_query=debug";

fn init_logging(ctx: &RuntimeContext) {
    let filter = match EnvFilter::try_from_env("HARVEST_LOG") {
        Ok(filter) => Some(filter),
        Err(_) if ctx.verbose => Some(EnvFilter::new(VERBOSE_FILTER)),
        Err(_) => ctx.config.log_filter.as_deref().map(EnvFilter::new),
    };
    if let Some(filter) = filter {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let ctx = RuntimeContext::from_global_args(&cli.global)?;
    init_logging(&ctx);

    match cli.command {
        Some(Commands::Init(args)) => commands::init::run(&ctx, &args),
        Some(Commands::Repo(args)) => commands::repo::run_repo(&ctx, &args),
        Some(Commands::Branch(args)) => commands::repo::run_branch(&ctx, &args),
        Some(Commands::Change(args)) => commands::change::run(&ctx, &args),
        Some(Commands::Issue(args)) => commands::issue::run(&ctx, &args),
        Some(Commands::Project(args)) => commands::catalog::run_project(&ctx, &args),
        Some(Commands::Platform(args)) => commands::catalog::run_platform(&ctx, &args),
        Some(Commands::Integration(args)) => commands::catalog::run_integration(&ctx, &args),
        Some(Commands::Build(args)) => commands::build::run(&ctx, &args),
        Some(Commands::Config(args)) => commands::config_cmd::run(&ctx, &args),
        Some(Commands::Stats) => commands::stats::run(&ctx),
        Some(Commands::Version) => commands::version::run(&ctx),
        None => {
            use clap::CommandFactory;
            Cli::command().print_help().ok();
            println!();
            Ok(())
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let json = cli.global.json;

    // Handle errors: print message and exit with code 1
    if let Err(e) = run(cli) {
        if json {
            let err_json = serde_json::json!({
                "error": format!("{:#}", e),
            });
            if let Ok(s) = serde_json::to_string_pretty(&err_json) {
                eprintln!("{}", s);
            }
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
}
