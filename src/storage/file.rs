use std::{
    fs,
    hash::{DefaultHasher, Hash, Hasher},
    io::ErrorKind,
    path::{Path, PathBuf},
};

use tracing::{info, warn};

use super::{from_json, to_json, LinkStore, SentLinks};
use crate::error::StoreError;

/// Sent links kept in a single local JSON file.
pub struct FileStorage {
    path: PathBuf,
    cap: usize,
    /// Hash of the content seen at `load`; `None` when the file did not exist.
    revision: Option<String>,
}

impl FileStorage {
    #[must_use]
    pub fn new(path: &Path, cap: usize) -> Self {
        Self {
            path: path.to_path_buf(),
            cap,
            revision: None,
        }
    }

    fn current_revision(&self) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(revision_of(&content))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn revision_of(content: &str) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

impl LinkStore for FileStorage {
    async fn load(&mut self) -> SentLinks {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no state file yet, starting empty");
                self.revision = None;
                return SentLinks::default();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "could not read state file");
                self.revision = None;
                return SentLinks::default();
            }
        };

        self.revision = Some(revision_of(&content));
        match from_json(&content) {
            Ok(links) => {
                info!(count = links.len(), path = %self.path.display(), "loaded sent links");
                links
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "malformed state file, starting empty");
                SentLinks::default()
            }
        }
    }

    /// Write the newest `cap` links through a temporary file and a rename.
    async fn save(&mut self, links: &SentLinks) -> Result<usize, StoreError> {
        let found = self.current_revision()?;
        if found != self.revision {
            return Err(StoreError::Conflict {
                loaded: self.revision.clone(),
                found,
            });
        }

        let latest = links.latest(self.cap);
        let content = to_json(&latest)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, &content)?;
        fs::rename(&tmp_path, &self.path)?;

        self.revision = Some(revision_of(&content));
        info!(count = latest.len(), path = %self.path.display(), "saved sent links");
        Ok(latest.len())
    }
}
