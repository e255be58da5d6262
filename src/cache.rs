// ============================================
// src/cache.rs
// シンボル一覧のキャッシュ (JSON) の読み書き
// ============================================

use thiserror::Error;
use tokio::fs;
use tracing::debug;

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use crate::symbols::SymbolCollection;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("No symbol cache at {0}")]
    NotFound(PathBuf),

    #[error("Symbol cache at {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("Failed to write symbol cache to {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// ファイル1つに一覧を保存する。期限切れはない
#[derive(Debug, Clone)]
pub struct SymbolCache {
    path: PathBuf,
}

impl SymbolCache {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// MARK:一覧を保存する (一時ファイルに書いてから置き換える)
    pub async fn save(&self, collection: &SymbolCollection) -> Result<(), CacheError> {
        let write_failed = |source: io::Error| CacheError::WriteFailed {
            path: self.path.clone(),
            source,
        };

        // ディレクトリがまだなければ作成する
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(write_failed)?;
        }

        let json = serde_json::to_vec_pretty(collection).map_err(|e| write_failed(e.into()))?;
        let temp = self.temp_path();
        fs::write(&temp, &json).await.map_err(write_failed)?;

        // rename は同じディレクトリ内なら原子的
        if let Err(source) = fs::rename(&temp, &self.path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(write_failed(source));
        }

        debug!(path = %self.path.display(), count = collection.len(), "Saved symbol cache");
        Ok(())
    }

    /// MARK:一覧を読み込む
    pub async fn load(&self) -> Result<SymbolCollection, CacheError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(CacheError::NotFound(self.path.clone()));
            }
            Err(e) => return Err(self.corrupt(e.to_string())),
        };

        let collection: SymbolCollection =
            serde_json::from_slice(&bytes).map_err(|e| self.corrupt(e.to_string()))?;
        debug!(path = %self.path.display(), count = collection.len(), "Loaded symbol cache");
        Ok(collection)
    }

    fn corrupt(&self, reason: String) -> CacheError {
        CacheError::Corrupt {
            path: self.path.clone(),
            reason,
        }
    }

    // symbols.json -> symbols.json.tmp
    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("symbols"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
