// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Workspace settings document.
//!
//! Settings live in `<workspace>/.tether/settings.json`, a JSON object whose
//! keys are owned by different parts of the tool. Keys this crate does not
//! know about are preserved when the document is rewritten.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SettingsError;
use crate::retry::{RetryPolicy, DEFAULT_DELAY_MS, DEFAULT_MAX_ATTEMPTS};

pub const SETTINGS_DIR: &str = ".tether";
pub const SETTINGS_FILE: &str = "settings.json";

/// Key holding the list of quarantined addresses.
pub const BLACKLIST_KEY: &str = "blacklist";
/// Key holding [`ConnectDefaults`].
pub const CONNECT_KEY: &str = "connect";

/// Connection defaults stored under the `connect` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectDefaults {
    /// Retries after the first round.
    pub retries: u32,
    /// Delay between rounds in milliseconds.
    pub delay_ms: u64,
    pub allow_legacy_protocol: bool,
}

impl Default for ConnectDefaults {
    fn default() -> Self {
        Self {
            retries: DEFAULT_MAX_ATTEMPTS,
            delay_ms: DEFAULT_DELAY_MS,
            allow_legacy_protocol: false,
        }
    }
}

impl ConnectDefaults {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::from_millis(self.retries, self.delay_ms)
    }
}

/// An on-disk JSON settings document.
#[derive(Debug, Clone)]
pub struct SettingsDocument {
    path: PathBuf,
    root: Map<String, Value>,
}

impl SettingsDocument {
    /// Location of the settings document for `workspace`.
    pub fn workspace_path(workspace: &Path) -> PathBuf {
        workspace.join(SETTINGS_DIR).join(SETTINGS_FILE)
    }

    /// Open the document for `workspace`.
    pub fn for_workspace(workspace: &Path) -> Result<Self, SettingsError> {
        Self::open(Self::workspace_path(workspace))
    }

    /// Read the document at `path`. A missing file yields an empty document.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("No settings at {} - using defaults", path.display());
                return Ok(Self {
                    path,
                    root: Map::new(),
                });
            }
            Err(source) => return Err(SettingsError::Io { path, source }),
        };

        if contents.trim().is_empty() {
            return Ok(Self {
                path,
                root: Map::new(),
            });
        }

        let value: Value = match serde_json::from_str(&contents) {
            Ok(value) => value,
            Err(source) => return Err(SettingsError::Parse { path, source }),
        };
        match value {
            Value::Object(root) => {
                log::debug!("Loaded settings from {}", path.display());
                Ok(Self { path, root })
            }
            _ => Err(SettingsError::NotAnObject { path }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Typed value stored under `key`, if present.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SettingsError> {
        self.root
            .get(key)
            .map(|value| {
                T::deserialize(value).map_err(|source| SettingsError::Value {
                    path: self.path.clone(),
                    key: key.to_string(),
                    source,
                })
            })
            .transpose()
    }

    /// Store `value` under `key` (in memory; call [`save`](Self::save) to persist).
    pub fn set<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), SettingsError> {
        let value = serde_json::to_value(value).map_err(|source| SettingsError::Value {
            path: self.path.clone(),
            key: key.to_string(),
            source,
        })?;
        self.root.insert(key.to_string(), value);
        Ok(())
    }

    /// Rewrite the whole document.
    pub fn save(&self) -> Result<(), SettingsError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|source| SettingsError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let mut text = serde_json::to_string_pretty(&self.root).map_err(|source| {
            SettingsError::Parse {
                path: self.path.clone(),
                source,
            }
        })?;
        text.push('\n');

        fs::write(&self.path, text).map_err(|source| SettingsError::Io {
            path: self.path.clone(),
            source,
        })?;
        log::debug!("Saved settings to {}", self.path.display());
        Ok(())
    }

    /// Connection defaults, falling back to built-in values.
    pub fn connect_defaults(&self) -> Result<ConnectDefaults, SettingsError> {
        Ok(self.get(CONNECT_KEY)?.unwrap_or_default())
    }
}
