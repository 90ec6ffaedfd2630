//! Image tarball export
//!
//! Packages a published image directory as a gzipped tarball for shipping to
//! another host. Symlinks (the environment import) are preserved as links,
//! not followed, so the archive stays self-describing about what it
//! references.

use anyhow::{Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::path::Path;
use tracing::info;

/// Write `image_root` as a gzipped tarball at `output`
///
/// The archive's top-level directory is the image directory's name.
pub fn export_image(image_root: &Path, output: &Path) -> Result<()> {
    let name = image_root
        .file_name()
        .and_then(|n| n.to_str())
        .context("Image path has no directory name")?;

    let file = File::create(output)
        .with_context(|| format!("Failed to create archive {}", output.display()))?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.follow_symlinks(false);

    builder
        .append_dir_all(name, image_root)
        .with_context(|| format!("Failed to archive {}", image_root.display()))?;

    builder
        .into_inner()
        .and_then(|encoder| encoder.finish())
        .with_context(|| format!("Failed to finalize archive {}", output.display()))?;

    info!(archive = %output.display(), "Image exported");
    Ok(())
}
