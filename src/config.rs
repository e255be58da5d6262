// ============================================
// src/config.rs
// 設定ファイルと保存先ディレクトリ
// ============================================

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::fs;
use std::path::{Path, PathBuf};

use crate::source::DEFAULT_ENDPOINT;

const CONFIG_FILE: &str = "config.toml";
const CACHE_FILE: &str = "symbols.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// アプリの設定 (ファイルにない項目はデフォルト値)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// シンボル一覧を取ってくる URL
    pub endpoint: String,
    /// キャッシュファイルの場所 (省略時はデータディレクトリ)
    pub cache_path: Option<PathBuf>,
    /// ログのフィルタ (`WHATTHENAME_LOG` が優先)
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            cache_path: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// MARK:設定ディレクトリの config.toml を読む
    pub fn load() -> Result<Self, ConfigError> {
        match project_dirs() {
            Some(dirs) => Self::load_from(&dirs.config_dir().join(CONFIG_FILE)),
            None => Ok(Self::default()),
        }
    }

    /// ファイルがなければデフォルト
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn cache_path(&self) -> PathBuf {
        self.cache_path
            .clone()
            .unwrap_or_else(|| data_dir().join(CACHE_FILE))
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "WhatTheName", "WhatTheName")
}

/// OSごとのデータ保存用ディレクトリ
///
/// 取得できなかったらカレントディレクトリ (フォールバック)
pub fn data_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "cache_path = \"/tmp/symbols.json\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.cache_path(), PathBuf::from("/tmp/symbols.json"));
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn invalid_toml_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "endpoint = [not toml").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn default_cache_lives_in_data_dir() {
        let config = Config::default();
        assert_eq!(config.cache_path(), data_dir().join(CACHE_FILE));
    }
}
