// ============================================
// src/provider.rs
// キャッシュ優先でシンボル一覧を用意する
// ============================================

use tracing::{info, warn};

use crate::cache::{CacheError, SymbolCache};
use crate::source::{FetchError, SymbolSource};
use crate::symbols::SymbolCollection;

/// キャッシュ → ネットワークの順に一覧を取りに行く
pub struct SymbolProvider {
    source: Box<dyn SymbolSource>,
    cache: SymbolCache,
}

impl SymbolProvider {
    pub fn new(source: Box<dyn SymbolSource>, cache: SymbolCache) -> Self {
        Self { source, cache }
    }

    pub fn cache(&self) -> &SymbolCache {
        &self.cache
    }

    /// キャッシュがあればそれを使い、なければ取得して保存する
    pub async fn load_symbols(&self) -> Result<SymbolCollection, FetchError> {
        match self.cache.load().await {
            Ok(symbols) if !symbols.is_empty() => {
                info!(count = symbols.len(), "Using cached symbols");
                return Ok(symbols);
            }
            Ok(_) => info!("Symbol cache is empty, fetching"),
            Err(CacheError::NotFound(path)) => {
                info!(path = %path.display(), "No symbol cache yet, fetching")
            }
            Err(e) => warn!(error = %e, "Ignoring unreadable symbol cache"),
        }
        self.refresh().await
    }

    /// 必ずネットワークから取り直して保存する
    pub async fn refresh(&self) -> Result<SymbolCollection, FetchError> {
        let symbols = self.source.fetch_symbols().await?;

        // 空の結果で既存のキャッシュを潰さない
        if symbols.is_empty() {
            warn!("Fetched symbol list is empty, cache left untouched");
            return Ok(symbols);
        }

        // 保存に失敗しても今回のセッションは続けられる
        if let Err(e) = self.cache.save(&symbols).await {
            warn!(error = %e, "Failed to save symbol cache");
        }
        Ok(symbols)
    }
}
