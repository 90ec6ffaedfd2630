//! Content-addressed environment store
//!
//! Cached environments live at `<root>/envs/<algorithm>/<hash>`, keyed by the
//! digest of the manifest's canonical form. An environment is produced into a
//! staging directory and renamed into place together with its completion
//! marker, so readers only ever observe complete environments. Production is
//! serialized per key through a lock file: at most one producer, any number of
//! readers once the marker exists. Published environments are never mutated.

use crate::digest::Digest;
use crate::error::StoreError;
use crate::manifest::Manifest;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use uuid::Uuid;

/// Completion marker written as the last step of environment production
pub const MARKER_FILE: &str = "CACHE_MANIFEST";

/// How often a waiting build re-checks another producer's progress
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A published, immutable cached environment
#[derive(Debug, Clone)]
pub struct CachedEnv {
    pub digest: Digest,
    pub path: PathBuf,
}

/// Result of [`CacheStore::acquire`]: either a published environment or the
/// exclusive right to produce one
#[derive(Debug)]
pub enum EnvSlot {
    Ready(CachedEnv),
    Producer(EnvProducer),
}

#[derive(Debug)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    /// Open (creating if needed) a store rooted at `root`
    pub fn open(root: &Path) -> Result<Self, StoreError> {
        for dir in [root.to_path_buf(), root.join("locks"), root.join("staging")] {
            fs::create_dir_all(&dir).map_err(|source| StoreError::Init {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn env_path(&self, digest: &Digest) -> PathBuf {
        digest.to_env_path(&self.root)
    }

    fn lock_path(&self, digest: &Digest) -> PathBuf {
        self.root
            .join("locks")
            .join(format!("{}-{}.lock", digest.algorithm(), digest.hash()))
    }

    /// Look up a published environment, verifying its completion marker
    pub fn lookup(&self, digest: &Digest) -> Result<Option<CachedEnv>, StoreError> {
        let path = self.env_path(digest);
        let marker = path.join(MARKER_FILE);

        if !marker.is_file() {
            return Ok(None);
        }

        let content = fs::read_to_string(&marker).map_err(|source| StoreError::Io {
            path: marker.clone(),
            source,
        })?;

        let recorded = content
            .lines()
            .next()
            .and_then(|line| Digest::parse(line.trim()).ok())
            .ok_or_else(|| StoreError::CorruptMarker {
                digest: digest.clone(),
            })?;

        if &recorded != digest {
            return Err(StoreError::CorruptMarker {
                digest: digest.clone(),
            });
        }

        Ok(Some(CachedEnv {
            digest: digest.clone(),
            path,
        }))
    }

    /// Resolve an environment slot for `digest`
    ///
    /// Returns `Ready` when a published environment exists. Otherwise takes
    /// the per-key producer lock and returns a [`EnvProducer`]; if another
    /// build holds the lock, waits for its result up to `timeout`.
    pub async fn acquire(&self, digest: &Digest, timeout: Duration) -> Result<EnvSlot, StoreError> {
        let started = Instant::now();
        let lock_path = self.lock_path(digest);

        loop {
            if let Some(env) = self.lookup(digest)? {
                return Ok(EnvSlot::Ready(env));
            }

            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&lock_path)
            {
                Ok(_) => {
                    // The previous holder may have published between our
                    // lookup and the lock acquisition
                    if let Some(env) = self.lookup(digest)? {
                        let _ = fs::remove_file(&lock_path);
                        return Ok(EnvSlot::Ready(env));
                    }

                    let staging = self
                        .root
                        .join("staging")
                        .join(format!("env-{}", Uuid::new_v4()));
                    fs::create_dir_all(&staging).map_err(|source| StoreError::Io {
                        path: staging.clone(),
                        source,
                    })?;

                    debug!(digest = %digest, staging = %staging.display(), "Producing environment");
                    return Ok(EnvSlot::Producer(EnvProducer {
                        digest: digest.clone(),
                        staging,
                        target: self.env_path(digest),
                        lock: lock_path,
                        committed: false,
                    }));
                }
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                    if started.elapsed() >= timeout {
                        return Err(StoreError::LockTimeout {
                            digest: digest.clone(),
                            waited: started.elapsed(),
                        });
                    }
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
                Err(source) => {
                    return Err(StoreError::Io {
                        path: lock_path,
                        source,
                    });
                }
            }
        }
    }

    /// Remove stale locks and staging leftovers; with `all`, published
    /// environments as well
    pub fn prune(&self, all: bool) -> Result<PruneReport, StoreError> {
        let mut report = PruneReport::default();

        for dir in ["locks", "staging"] {
            let path = self.root.join(dir);
            for entry in fs::read_dir(&path).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })? {
                let entry = entry.map_err(|source| StoreError::Io {
                    path: path.clone(),
                    source,
                })?;
                let removed = if entry.path().is_dir() {
                    fs::remove_dir_all(entry.path())
                } else {
                    fs::remove_file(entry.path())
                };
                match removed {
                    Ok(()) if dir == "locks" => report.removed_locks += 1,
                    Ok(()) => report.removed_staging += 1,
                    Err(err) => warn!(path = %entry.path().display(), error = %err, "Failed to prune entry"),
                }
            }
        }

        if all {
            let envs = self.root.join("envs");
            if envs.is_dir() {
                for algorithm in fs::read_dir(&envs).map_err(|source| StoreError::Io {
                    path: envs.clone(),
                    source,
                })? {
                    let algorithm = algorithm.map_err(|source| StoreError::Io {
                        path: envs.clone(),
                        source,
                    })?;
                    for env in fs::read_dir(algorithm.path()).map_err(|source| StoreError::Io {
                        path: algorithm.path(),
                        source,
                    })? {
                        let env = env.map_err(|source| StoreError::Io {
                            path: algorithm.path(),
                            source,
                        })?;
                        match fs::remove_dir_all(env.path()) {
                            Ok(()) => report.removed_envs += 1,
                            Err(err) => warn!(path = %env.path().display(), error = %err, "Failed to prune environment"),
                        }
                    }
                }
            }
        }

        Ok(report)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PruneReport {
    pub removed_locks: usize,
    pub removed_staging: usize,
    pub removed_envs: usize,
}

/// Exclusive right to produce one environment
///
/// Dropping an uncommitted producer discards the staging directory and
/// releases the lock, so a failed build leaves the key free for the next one.
#[derive(Debug)]
pub struct EnvProducer {
    digest: Digest,
    staging: PathBuf,
    target: PathBuf,
    lock: PathBuf,
    committed: bool,
}

impl EnvProducer {
    /// Directory the installer populates
    pub fn staging_root(&self) -> &Path {
        &self.staging
    }

    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    /// Publish the staged environment: write the completion marker, rename
    /// into the content-addressed location, release the lock
    pub fn commit(mut self, manifest: &Manifest) -> Result<CachedEnv, StoreError> {
        let marker = self.staging.join(MARKER_FILE);
        let content = format!("{}\n{}", self.digest, manifest.canonical());
        fs::write(&marker, content).map_err(|source| StoreError::Io {
            path: marker,
            source,
        })?;

        if let Some(parent) = self.target.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        fs::rename(&self.staging, &self.target).map_err(|source| StoreError::Io {
            path: self.target.clone(),
            source,
        })?;

        let _ = fs::remove_file(&self.lock);
        self.committed = true;

        debug!(digest = %self.digest, "Environment published");
        Ok(CachedEnv {
            digest: self.digest.clone(),
            path: self.target.clone(),
        })
    }
}

impl Drop for EnvProducer {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_dir_all(&self.staging);
            let _ = fs::remove_file(&self.lock);
        }
    }
}
