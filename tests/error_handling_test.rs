//! Error handling integration tests
//!
//! Covers the fail-fast taxonomy: missing configuration, missing manifests,
//! failed installs, failed schema export and broken entrypoint references.
//! Every failure must leave the output directory without a published image.

mod support;

use galley::config::{AppConfig, ConfigError, Variant};
use galley::error::{
    BuildError, DependencyInstallError, EntrypointError, SchemaExportError,
};
use galley::installer::MockInstaller;
use galley::pipeline::BuildPipeline;
use std::sync::Arc;
use support::{build_context, write_app, BASE_CONFIG};
use tempfile::TempDir;

fn assert_no_image(output: &std::path::Path) {
    assert!(
        !output.join("svc").exists(),
        "failed build must not publish an image"
    );
}

#[test]
fn test_missing_config_detected() {
    let dir = TempDir::new().unwrap();
    let err = AppConfig::load(dir.path()).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound(_)));
}

#[test]
fn test_missing_manifest_fails_before_any_stage() {
    let dir = TempDir::new().unwrap();
    let source = write_app(dir.path(), "libfoo\n", BASE_CONFIG);
    std::fs::remove_file(source.join("deps.txt")).unwrap();

    let config = AppConfig::load(&source).unwrap();
    let store = galley::store::CacheStore::open(&dir.path().join("store")).unwrap();
    let err = galley::pipeline::BuildContext::new(
        source,
        dir.path().join("out"),
        config,
        Variant::Production,
        Arc::new(MockInstaller::new()),
        store,
    )
    .unwrap_err();

    assert!(matches!(err, BuildError::Manifest(_)));
}

#[tokio::test]
async fn test_install_failure_aborts_build() {
    let dir = TempDir::new().unwrap();
    let source = write_app(dir.path(), "libgood\nlibbad\n", BASE_CONFIG);
    let installer = Arc::new(MockInstaller::new());
    installer.fail_on("libbad");
    let output = dir.path().join("out");

    let mut context = build_context(
        &source,
        &output,
        &dir.path().join("store"),
        installer.clone(),
        Variant::Production,
    );
    let err = BuildPipeline::new(None).execute(&mut context).await.unwrap_err();

    match err {
        BuildError::DependencyInstall(DependencyInstallError::Package { spec, .. }) => {
            assert_eq!(spec, "libbad");
        }
        other => panic!("Expected DependencyInstall, got {:?}", other),
    }
    assert_no_image(&output);
}

#[tokio::test]
async fn test_install_failure_releases_the_key_for_retry() {
    let dir = TempDir::new().unwrap();
    let source = write_app(dir.path(), "libflaky\n", BASE_CONFIG);
    let store = dir.path().join("store");

    let failing = Arc::new(MockInstaller::new());
    failing.fail_on("libflaky");
    let mut context = build_context(
        &source,
        &dir.path().join("out"),
        &store,
        failing,
        Variant::Production,
    );
    BuildPipeline::new(None).execute(&mut context).await.unwrap_err();

    // A later build of the same manifest must be able to produce the
    // environment afresh
    let healthy = Arc::new(MockInstaller::new());
    let mut retry = build_context(
        &source,
        &dir.path().join("out"),
        &store,
        healthy.clone(),
        Variant::Production,
    );
    let report = BuildPipeline::new(None).execute(&mut retry).await.unwrap();

    assert!(!report.reused_environment);
    assert_eq!(healthy.dependency_call_count(), 1);
}

#[tokio::test]
async fn test_schema_export_failure_publishes_nothing() {
    let dir = TempDir::new().unwrap();
    let config = format!(
        "{}introspect = [\"sh\", \"-c\", \"exit 1\"]\n",
        BASE_CONFIG
    );
    let source = write_app(dir.path(), "libfoo\n", &config);
    let output = dir.path().join("out");

    let mut context = build_context(
        &source,
        &output,
        &dir.path().join("store"),
        Arc::new(MockInstaller::new()),
        Variant::Production,
    );
    let err = BuildPipeline::new(None).execute(&mut context).await.unwrap_err();

    assert!(matches!(
        err,
        BuildError::SchemaExport(SchemaExportError::CommandFailed { status: 1, .. })
    ));
    assert_no_image(&output);
}

#[tokio::test]
async fn test_empty_schema_output_publishes_nothing() {
    let dir = TempDir::new().unwrap();
    let config = format!("{}introspect = [\"true\"]\n", BASE_CONFIG);
    let source = write_app(dir.path(), "libfoo\n", &config);
    let output = dir.path().join("out");

    let mut context = build_context(
        &source,
        &output,
        &dir.path().join("store"),
        Arc::new(MockInstaller::new()),
        Variant::Production,
    );
    let err = BuildPipeline::new(None).execute(&mut context).await.unwrap_err();

    assert!(matches!(
        err,
        BuildError::SchemaExport(SchemaExportError::EmptyOutput)
    ));
    assert_no_image(&output);
}

#[tokio::test]
async fn test_missing_entrypoint_script_publishes_nothing() {
    let dir = TempDir::new().unwrap();
    let config = format!("{}entrypoint_script = \"entrypoint.sh\"\n", BASE_CONFIG);
    // Script declared but never written into the source tree
    let source = write_app(dir.path(), "libfoo\n", &config);
    let output = dir.path().join("out");

    let mut context = build_context(
        &source,
        &output,
        &dir.path().join("store"),
        Arc::new(MockInstaller::new()),
        Variant::Production,
    );
    let err = BuildPipeline::new(None).execute(&mut context).await.unwrap_err();

    assert!(matches!(
        err,
        BuildError::Entrypoint(EntrypointError::ScriptMissing { .. })
    ));
    assert_no_image(&output);
}

#[tokio::test]
async fn test_failed_build_leaves_no_staging_behind() {
    let dir = TempDir::new().unwrap();
    let config = format!("{}introspect = [\"sh\", \"-c\", \"exit 7\"]\n", BASE_CONFIG);
    let source = write_app(dir.path(), "libfoo\n", &config);
    let output = dir.path().join("out");

    let mut context = build_context(
        &source,
        &output,
        &dir.path().join("store"),
        Arc::new(MockInstaller::new()),
        Variant::Production,
    );
    BuildPipeline::new(None).execute(&mut context).await.unwrap_err();

    let entries: Vec<_> = std::fs::read_dir(&output)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert!(entries.is_empty(), "unexpected leftovers: {:?}", entries);
}
