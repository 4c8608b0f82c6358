//! Key-value preferences that back the flag store.
//!
//! Values are kept in memory and only reach durable storage on [`Prefs::save`].
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use bevy::prelude::*;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const PREFS_FILE_NAME: &str = "prefs.json";
const FALLBACK_PREFS_PATH: &str = "flagkeeper_prefs.json";

#[derive(Debug, Error)]
pub enum PrefsError {
    #[error("prefs file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed prefs: {0}")]
    Json(#[from] serde_json::Error),
}

/// String and float values addressed by key, plus an explicit flush.
pub trait Prefs: Send + Sync + 'static {
    fn get_string(&self, key: &str) -> Option<String>;
    fn set_string(&mut self, key: &str, value: &str);
    fn get_float(&self, key: &str) -> Option<f32>;
    fn set_float(&mut self, key: &str, value: f32);
    /// Write everything set so far to durable storage.
    fn save(&mut self) -> Result<(), PrefsError>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct PrefsData {
    #[serde(default)]
    strings: BTreeMap<String, String>,
    #[serde(default)]
    floats: BTreeMap<String, f32>,
}

/// Prefs that never leave memory. Clones share the same values, so a handle
/// kept outside the store can observe what the store wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryPrefs {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    data: PrefsData,
    saves: usize,
}

impl MemoryPrefs {
    fn with_inner<R>(&self, f: impl FnOnce(&mut MemoryInner) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Number of times [`Prefs::save`] has been called.
    pub fn save_count(&self) -> usize {
        self.with_inner(|inner| inner.saves)
    }
}

impl Prefs for MemoryPrefs {
    fn get_string(&self, key: &str) -> Option<String> {
        self.with_inner(|inner| inner.data.strings.get(key).cloned())
    }

    fn set_string(&mut self, key: &str, value: &str) {
        self.with_inner(|inner| {
            inner.data.strings.insert(key.to_owned(), value.to_owned());
        });
    }

    fn get_float(&self, key: &str) -> Option<f32> {
        self.with_inner(|inner| inner.data.floats.get(key).copied())
    }

    fn set_float(&mut self, key: &str, value: f32) {
        self.with_inner(|inner| {
            inner.data.floats.insert(key.to_owned(), value);
        });
    }

    fn save(&mut self) -> Result<(), PrefsError> {
        self.with_inner(|inner| inner.saves += 1);
        Ok(())
    }
}

/// Prefs persisted as a JSON document on disk.
#[derive(Debug)]
pub struct FilePrefs {
    path: PathBuf,
    data: PrefsData,
}

impl FilePrefs {
    /// Open the prefs file at `path`. A missing or unreadable file yields
    /// empty prefs; the file is (re)created on the next save.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = if path.exists() {
            match read_prefs(&path) {
                Ok(data) => data,
                Err(err) => {
                    warn!("Ignoring unreadable prefs: {err}");
                    PrefsData::default()
                }
            }
        } else {
            debug!("No prefs at {:?}, starting empty", path);
            PrefsData::default()
        };

        Self { path, data }
    }

    /// Platform config directory, or the working directory when none exists.
    pub fn default_path() -> PathBuf {
        match ProjectDirs::from("io", "flagkeeper", "flagkeeper") {
            Some(dirs) => dirs.config_dir().join(PREFS_FILE_NAME),
            None => PathBuf::from(FALLBACK_PREFS_PATH),
        }
    }

    #[cfg(test)]
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

fn read_prefs(path: &Path) -> Result<PrefsData, PrefsError> {
    let text = fs::read_to_string(path).map_err(|source| PrefsError::Io {
        path: path.to_owned(),
        source,
    })?;
    if text.trim().is_empty() {
        return Ok(PrefsData::default());
    }
    Ok(serde_json::from_str(&text)?)
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> PrefsError + '_ {
    move |source| PrefsError::Io {
        path: path.to_owned(),
        source,
    }
}

impl Prefs for FilePrefs {
    fn get_string(&self, key: &str) -> Option<String> {
        self.data.strings.get(key).cloned()
    }

    fn set_string(&mut self, key: &str, value: &str) {
        self.data.strings.insert(key.to_owned(), value.to_owned());
    }

    fn get_float(&self, key: &str) -> Option<f32> {
        self.data.floats.get(key).copied()
    }

    fn set_float(&mut self, key: &str, value: f32) {
        self.data.floats.insert(key.to_owned(), value);
    }

    fn save(&mut self) -> Result<(), PrefsError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(io_error(parent))?;
        }

        // Write beside the target and rename so a crash never leaves half a file.
        let text = serde_json::to_string_pretty(&self.data)?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, text).map_err(io_error(&staging))?;
        fs::rename(&staging, &self.path).map_err(io_error(&self.path))?;
        Ok(())
    }
}
