//! Subcommand handlers
//!
//! Each handler returns the process exit code: 0 on success, 1 on error,
//! except `launch`, which exits with the launched process's own code.

use super::commands::{BuildArgs, LaunchArgs, PlanArgs, PruneArgs};
use super::output::OutputFormatter;
use crate::config::AppConfig;
use crate::export::export_image;
use crate::image::{
    ImageMetadata, ImageSpec, BuildReport, LISTEN_PORT, SCHEMA_ARTIFACT_FILE,
};
use crate::installer::ProcessInstaller;
use crate::launch;
use crate::pipeline::phases::entrypoint;
use crate::pipeline::{BuildContext, BuildPipeline};
use crate::progress::LoggingHandler;
use crate::store::CacheStore;
use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

fn resolve_source(path: Option<&PathBuf>) -> Result<PathBuf> {
    let path = path.cloned().unwrap_or_else(|| PathBuf::from("."));
    path.canonicalize()
        .with_context(|| format!("Source path does not exist: {}", path.display()))
}

pub async fn handle_build(args: &BuildArgs) -> i32 {
    match run_build(args).await {
        Ok(output) => {
            println!("{}", output);
            0
        }
        Err(err) => {
            error!("Build failed: {:#}", err);
            eprintln!("Error: {:#}", err);
            1
        }
    }
}

async fn run_build(args: &BuildArgs) -> Result<String> {
    let source_root = resolve_source(args.source_path.as_ref())?;
    let config = AppConfig::load(&source_root)?;
    let installer = Arc::new(ProcessInstaller::new(config.installer.clone()));
    let store = CacheStore::open(&args.store)?;

    let mut context = BuildContext::new(
        source_root,
        args.output.clone(),
        config,
        args.variant.into(),
        installer,
        store,
    )?;

    let report: BuildReport = BuildPipeline::new(Some(Box::new(LoggingHandler)))
        .execute(&mut context)
        .await?;

    if let Some(archive) = &args.export {
        export_image(&report.image_path, archive)?;
    }

    OutputFormatter::new(args.format.into()).format_report(&report)
}

pub async fn handle_plan(args: &PlanArgs) -> i32 {
    match run_plan(args) {
        Ok(output) => {
            println!("{}", output);
            0
        }
        Err(err) => {
            eprintln!("Error: {:#}", err);
            1
        }
    }
}

fn run_plan(args: &PlanArgs) -> Result<String> {
    let source_root = resolve_source(args.source_path.as_ref())?;
    let config = AppConfig::load(&source_root)?;
    let manifest = crate::manifest::Manifest::load(&config.manifest_path(&source_root))?;
    let variant = args.variant.into();

    // For planning, a declared startup script is checked against the source
    // tree, since no overlay exists yet
    let directive = entrypoint::select(&config, variant, &source_root)?;

    let spec = ImageSpec {
        version: "1.0".to_string(),
        metadata: ImageMetadata {
            name: config.name.clone(),
            variant: variant.to_string(),
            build_id: Uuid::new_v4().to_string(),
            built_at: Utc::now(),
            environment: manifest.digest().to_string(),
        },
        env: config.env.clone(),
        port: LISTEN_PORT,
        schema_artifact: config
            .introspect
            .is_some()
            .then(|| SCHEMA_ARTIFACT_FILE.to_string()),
        launch: directive,
    };

    OutputFormatter::new(args.format.into()).format_spec(&spec)
}

pub async fn handle_launch(args: &LaunchArgs) -> i32 {
    match launch::launch(&args.image_path).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            1
        }
    }
}

pub async fn handle_prune(args: &PruneArgs) -> i32 {
    match run_prune(&args.store, args.all) {
        Ok(summary) => {
            println!("{}", summary);
            0
        }
        Err(err) => {
            eprintln!("Error: {:#}", err);
            1
        }
    }
}

fn run_prune(store_path: &Path, all: bool) -> Result<String> {
    let store = CacheStore::open(store_path)?;
    let report = store.prune(all)?;
    Ok(format!(
        "Pruned {} lock(s), {} staging dir(s), {} environment(s)",
        report.removed_locks, report.removed_staging, report.removed_envs
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_source_rejects_missing_path() {
        let missing = PathBuf::from("/nonexistent/source");
        assert!(resolve_source(Some(&missing)).is_err());
    }

    #[tokio::test]
    async fn test_prune_on_fresh_store() {
        let dir = tempfile::tempdir().unwrap();
        let summary = run_prune(&dir.path().join("store"), false).unwrap();
        assert!(summary.contains("0 lock(s)"));
    }
}
