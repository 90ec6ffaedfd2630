use galley::cli::commands::{CliArgs, Commands};
use galley::cli::handlers::{handle_build, handle_launch, handle_plan, handle_prune};
use galley::util::logging::{
    init_logging, json_from_env, level_from_env, parse_level, LoggingConfig,
};
use galley::VERSION;

use clap::Parser;
use tracing::{debug, Level};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("galley v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Build(build_args) => handle_build(build_args).await,
        Commands::Plan(plan_args) => handle_plan(plan_args).await,
        Commands::Launch(launch_args) => handle_launch(launch_args).await,
        Commands::Prune(prune_args) => handle_prune(prune_args).await,
    };

    std::process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs) {
    let level = if let Some(level_str) = &args.log_level {
        parse_level(level_str)
    } else if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::ERROR
    } else {
        level_from_env()
    };

    init_logging(LoggingConfig {
        level,
        use_json: json_from_env(),
    });
}
