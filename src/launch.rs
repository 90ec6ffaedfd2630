//! Image launch handoff
//!
//! Reads a built image's spec and executes its launch directive. galley's
//! responsibility ends at the handoff: the child's exit code is returned
//! as-is, so a delegated script that fails before starting the server
//! surfaces its own code, exactly as a container runtime would report it.

use crate::error::LaunchError;
use crate::image::{APP_DIR, DEPS_LINK, IMAGE_SPEC_FILE, ImageSpec, LaunchDirective};
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info};

/// Read the image spec from an image root
pub fn read_spec(image_root: &Path) -> Result<ImageSpec, LaunchError> {
    let path = image_root.join(IMAGE_SPEC_FILE);
    if !path.is_file() {
        return Err(LaunchError::SpecMissing(path));
    }

    let content = std::fs::read_to_string(&path).map_err(|source| LaunchError::SpecRead {
        path: path.clone(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| LaunchError::SpecParse { path, source })
}

/// Execute an image's launch directive and wait for the process
///
/// Returns the child's exit code. A process terminated by a signal is
/// reported as a failure code.
pub async fn launch(image_root: &Path) -> Result<i32, LaunchError> {
    let image_root = if !image_root.is_dir() {
        return Err(LaunchError::ImageMissing(image_root.to_path_buf()));
    } else {
        image_root
            .canonicalize()
            .map_err(|source| LaunchError::SpecRead {
                path: image_root.to_path_buf(),
                source,
            })?
    };

    let spec = read_spec(&image_root)?;
    let argv = spec.launch.argv();
    let command_display = argv.join(" ");

    // Scripts are addressed relative to the image root; direct commands come
    // from the environment's PATH
    let program = match &spec.launch {
        LaunchDirective::DelegatedScript { script } => image_root.join(script),
        LaunchDirective::DirectCommand { .. } => Path::new(&argv[0]).to_path_buf(),
    };

    info!(command = %command_display, "Handing off to server process");
    let mut command = Command::new(&program);
    command
        .args(&argv[1..])
        .current_dir(image_root.join(APP_DIR))
        .env("GALLEY_DEPS", image_root.join(DEPS_LINK))
        .env("PORT", spec.port.to_string());
    for (key, value) in &spec.env {
        command.env(key, value);
    }

    let status = command
        .status()
        .await
        .map_err(|source| LaunchError::Spawn {
            command: command_display,
            source,
        })?;

    let code = status.code().unwrap_or(1);
    debug!(code, "Server process exited");
    Ok(code)
}
