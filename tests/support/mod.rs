//! Shared fixtures for integration tests

use galley::config::{AppConfig, Variant};
use galley::installer::MockInstaller;
use galley::pipeline::BuildContext;
use galley::store::CacheStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const BASE_CONFIG: &str = r#"
name = "svc"
command = ["appserver", "main:app"]
installer = { dependency = ["pkg", "install", "{spec}", "--into", "{env}"] }
"#;

/// Write a minimal application source tree and return its root
pub fn write_app(root: &Path, manifest: &str, config: &str) -> PathBuf {
    let source = root.join("app-src");
    std::fs::create_dir_all(&source).unwrap();
    std::fs::write(source.join("deps.txt"), manifest).unwrap();
    std::fs::write(source.join("galley.toml"), config).unwrap();
    std::fs::write(source.join("server.py"), "print('serving')\n").unwrap();
    source
}

/// Build a context over an existing source tree, sharing `installer` and the
/// store at `store_root`
pub fn build_context(
    source: &Path,
    output: &Path,
    store_root: &Path,
    installer: Arc<MockInstaller>,
    variant: Variant,
) -> BuildContext {
    let config = AppConfig::load(source).unwrap();
    let store = CacheStore::open(store_root).unwrap();
    BuildContext::new(
        source.to_path_buf(),
        output.to_path_buf(),
        config,
        variant,
        installer,
        store,
    )
    .unwrap()
}
