// Copyright 2026 Wikisearch Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use serde::Deserialize;
use serde::Serialize;

use crate::merge::ScoreMerge;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store_path: PathBuf,
    pub merge: ScoreMerge,
    pub default_k: usize,
    pub max_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("wikisearch.db"),
            merge: ScoreMerge::Sum,
            default_k: 10,
            max_limit: 1000,
        }
    }
}

impl Config {
    /// Requested result count, falling back to `default_k` and capped at `max_limit`.
    pub fn limit(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.default_k).min(self.max_limit)
    }
}

/// Overrides the global config file location.
pub const CONFIG_ENV: &str = "WIKISEARCH_CONFIG";
/// Points at a store file directly, skipping discovery from the working directory.
pub const STORE_ENV: &str = "WIKISEARCH_STORE";

const APP_DIR: &str = "wikisearch";
const CONFIG_FILE: &str = "wikisearch.toml";

#[derive(Debug, Clone)]
pub struct ConfigCtx {
    pub root: PathBuf,
    pub config: Config,
    /// File the settings were read from; `None` means built-in defaults.
    pub source: Option<PathBuf>,
}

impl ConfigCtx {
    pub fn load_from_cwd() -> Result<Self> {
        let cwd = std::env::current_dir().context("get current dir")?;
        Self::load_from(&cwd)
    }

    pub fn load_from(start: &Path) -> Result<Self> {
        let (config, source) = load_config_with_source()?;

        if let Some(store) = env_path(STORE_ENV) {
            if !store.is_file() {
                anyhow::bail!("{STORE_ENV}={} does not name a store file", store.display());
            }
            let root = store
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            let config = Config {
                store_path: store,
                ..config
            };
            return Ok(Self {
                root,
                config,
                source,
            });
        }

        let root = find_store_root(start, &config.store_path)
            .ok_or_else(|| anyhow::anyhow!("store not found; run `wikisearch init` first"))?;
        if root.join(CONFIG_FILE).exists() {
            let global = global_config_path()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "<config dir unavailable>".to_string());
            anyhow::bail!("local {CONFIG_FILE} is not supported; move settings to {global}");
        }
        Ok(Self {
            root,
            config,
            source,
        })
    }

    pub fn store_path(&self) -> PathBuf {
        if self.config.store_path.is_absolute() {
            self.config.store_path.clone()
        } else {
            self.root.join(&self.config.store_path)
        }
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

fn config_dir() -> Option<PathBuf> {
    match std::env::consts::OS {
        "windows" => env_path("APPDATA").or_else(|| {
            env_path("USERPROFILE").map(|profile| profile.join("AppData").join("Roaming"))
        }),
        "macos" => env_path("HOME").map(|home| home.join("Library").join("Application Support")),
        _ => env_path("XDG_CONFIG_HOME").or_else(|| env_path("HOME").map(|h| h.join(".config"))),
    }
}

/// `$WIKISEARCH_CONFIG` if set, otherwise `<config dir>/wikisearch/wikisearch.toml`.
pub fn global_config_path() -> Option<PathBuf> {
    env_path(CONFIG_ENV).or_else(|| config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE)))
}

pub fn load_global_config() -> Result<Config> {
    load_config_with_source().map(|(config, _)| config)
}

fn load_config_with_source() -> Result<(Config, Option<PathBuf>)> {
    if let Some(explicit) = env_path(CONFIG_ENV) {
        let config = read_config(&explicit)
            .with_context(|| format!("{CONFIG_ENV} points at {}", explicit.display()))?;
        return Ok((config, Some(explicit)));
    }
    match global_config_path() {
        Some(path) if path.is_file() => {
            let config = read_config(&path)?;
            Ok((config, Some(path)))
        }
        _ => Ok((Config::default(), None)),
    }
}

/// Nearest ancestor of `start` (inclusive) holding the store file.
pub fn find_store_root(start: &Path, store_path: &Path) -> Option<PathBuf> {
    if store_path.is_absolute() {
        return store_path
            .is_file()
            .then(|| store_path.parent().unwrap_or(store_path).to_path_buf());
    }

    let start = start.canonicalize().unwrap_or_else(|_| start.to_path_buf());
    start
        .ancestors()
        .find(|dir| dir.join(store_path).is_file())
        .map(Path::to_path_buf)
}

pub fn read_config(path: &Path) -> Result<Config> {
    let text = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let mut config: Config = toml::from_str(&text).context("parse wikisearch.toml")?;
    if config.max_limit == 0 {
        config.max_limit = Config::default().max_limit;
    }
    if config.default_k > config.max_limit {
        config.default_k = config.max_limit;
    }
    Ok(config)
}
