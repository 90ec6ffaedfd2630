use crate::config::Variant;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Multi-stage application image builder
#[derive(Parser, Debug)]
#[command(
    name = "galley",
    about = "Multi-stage application image builder with content-addressed dependency caching",
    version,
    long_about = "galley builds runnable application images from a source tree, a dependency \
                  manifest and a galley.toml contract. Dependencies are installed once per \
                  manifest into a content-addressed store and reused by reference; images are \
                  assembled, given a schema artifact when the application supports \
                  introspection, and stamped with a single launch directive."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(
        short = 'v',
        long,
        global = true,
        help = "Increase verbosity"
    )]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Build an application image",
        long_about = "Runs the full pipeline: dependency cache, runtime assembly, optional \
                      schema export, entrypoint selection.\n\n\
                      Examples:\n  \
                      galley build\n  \
                      galley build /path/to/app --variant dev\n  \
                      galley build --format json --export svc.tar.gz"
    )]
    Build(BuildArgs),

    #[command(
        about = "Show the image spec a build would produce",
        long_about = "Resolves the configuration, manifest and launch directive without \
                      installing or assembling anything.\n\n\
                      Examples:\n  \
                      galley plan\n  \
                      galley plan /path/to/app --format yaml"
    )]
    Plan(PlanArgs),

    #[command(
        about = "Run a built image's launch directive",
        long_about = "Executes the image's launch directive and exits with the server \
                      process's own exit code.\n\n\
                      Examples:\n  \
                      galley launch images/svc"
    )]
    Launch(LaunchArgs),

    #[command(
        about = "Clean up the environment store",
        long_about = "Removes stale producer locks and staging leftovers; with --all, \
                      published environments as well."
    )]
    Prune(PruneArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct BuildArgs {
    #[arg(
        value_name = "PATH",
        help = "Path to application source (defaults to current directory)"
    )]
    pub source_path: Option<PathBuf>,

    #[arg(
        long,
        value_enum,
        default_value = "prod",
        help = "Deployment variant"
    )]
    pub variant: VariantArg,

    #[arg(
        long,
        value_name = "DIR",
        default_value = ".galley-store",
        help = "Environment store directory"
    )]
    pub store: PathBuf,

    #[arg(
        short = 'o',
        long,
        value_name = "DIR",
        default_value = "images",
        help = "Directory built images are published to"
    )]
    pub output: PathBuf,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(
        long,
        value_name = "FILE",
        help = "Also export the built image as a gzipped tarball"
    )]
    pub export: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct PlanArgs {
    #[arg(
        value_name = "PATH",
        help = "Path to application source (defaults to current directory)"
    )]
    pub source_path: Option<PathBuf>,

    #[arg(
        long,
        value_enum,
        default_value = "prod",
        help = "Deployment variant"
    )]
    pub variant: VariantArg,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct LaunchArgs {
    #[arg(value_name = "IMAGE", help = "Path to a built image directory")]
    pub image_path: PathBuf,
}

#[derive(Parser, Debug, Clone)]
pub struct PruneArgs {
    #[arg(
        long,
        value_name = "DIR",
        default_value = ".galley-store",
        help = "Environment store directory"
    )]
    pub store: PathBuf,

    #[arg(long, help = "Also remove published environments")]
    pub all: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantArg {
    /// Development: live reload enabled
    Dev,
    /// Production: no reload, delegated scripts allowed
    Prod,
}

impl From<VariantArg> for Variant {
    fn from(arg: VariantArg) -> Self {
        match arg {
            VariantArg::Dev => Variant::Development,
            VariantArg::Prod => Variant::Production,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Human,
    Json,
    Yaml,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_defaults() {
        let args = CliArgs::try_parse_from(["galley", "build"]).unwrap();
        match args.command {
            Commands::Build(build) => {
                assert!(build.source_path.is_none());
                assert_eq!(build.variant, VariantArg::Prod);
                assert_eq!(build.format, OutputFormatArg::Human);
                assert!(build.export.is_none());
            }
            _ => panic!("Expected build subcommand"),
        }
    }

    #[test]
    fn test_variant_mapping() {
        assert_eq!(Variant::from(VariantArg::Dev), Variant::Development);
        assert_eq!(Variant::from(VariantArg::Prod), Variant::Production);
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(CliArgs::try_parse_from(["galley", "-q", "-v", "build"]).is_err());
    }

    #[test]
    fn test_launch_requires_image_path() {
        assert!(CliArgs::try_parse_from(["galley", "launch"]).is_err());
        let args = CliArgs::try_parse_from(["galley", "launch", "images/svc"]).unwrap();
        match args.command {
            Commands::Launch(launch) => {
                assert_eq!(launch.image_path, PathBuf::from("images/svc"));
            }
            _ => panic!("Expected launch subcommand"),
        }
    }
}
