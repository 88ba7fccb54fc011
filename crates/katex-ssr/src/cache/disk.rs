//! Persistent tier of the render cache.

use std::fs;
use std::io::{ErrorKind, Write};

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::NamedTempFile;
use tracing::warn;

use super::CACHE_TARGET;
use super::key::CacheKey;

/// One HTML file per key under `<root>/<shard>/<key>.html`.
///
/// Failures are logged and treated as misses. Persistence only saves work;
/// a cold directory yields the same output as a warm one.
#[derive(Debug, Clone)]
pub(super) struct DiskStore {
    root: Utf8PathBuf,
}

impl DiskStore {
    pub(super) fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub(super) fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn path_for(&self, key: &CacheKey) -> Utf8PathBuf {
        self.root
            .join(key.shard())
            .join(format!("{}.html", key.as_str()))
    }

    pub(super) fn contains(&self, key: &CacheKey) -> bool {
        self.path_for(key).is_file()
    }

    pub(super) fn load(&self, key: &CacheKey) -> Option<String> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(html) => Some(html),
            Err(error) if error.kind() == ErrorKind::NotFound => None,
            Err(error) => {
                warn!(
                    target: CACHE_TARGET,
                    path = %path,
                    %error,
                    "failed to read cached render; rendering again"
                );
                None
            }
        }
    }

    pub(super) fn store(&self, key: &CacheKey, html: &str) {
        let path = self.path_for(key);
        if let Err(error) = write_atomically(&path, html) {
            warn!(
                target: CACHE_TARGET,
                path = %path,
                %error,
                "failed to persist rendered formula"
            );
        }
    }
}

fn write_atomically(path: &Utf8Path, contents: &str) -> std::io::Result<()> {
    let Some(dir) = path.parent() else {
        return Err(std::io::Error::other("cache path has no parent directory"));
    };
    fs::create_dir_all(dir)?;
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    match file.persist(path) {
        Ok(_) => Ok(()),
        // A concurrent writer stored the same content first.
        Err(error) if error.error.kind() == ErrorKind::AlreadyExists => Ok(()),
        Err(error) => Err(error.error),
    }
}
