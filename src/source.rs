// ============================================
// src/source.rs
// リリースノートのページからシンボル名を取得する
// ============================================

use async_trait::async_trait;
use reqwest::Url;
use reqwest::header::USER_AGENT;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::{debug, info};

use crate::symbols::{Symbol, SymbolCollection};

/// 取得先のデフォルト URL
pub const DEFAULT_ENDPOINT: &str = "https://developer.apple.com/sf-symbols/release-notes/";

const AGENT: &str = concat!("WhatTheName/", env!("CARGO_PKG_VERSION"));

// ページ内の3つのリスト
const ZONE_FIRST_COLUMN: &str = "ul.column-list.list-1 li";
const ZONE_SECOND_COLUMN: &str = "ul.column-list.list-2 li";
const ZONE_RENAMED: &str = "ul.no-bullet li";

/// 名前変更リストの区切り ("old.name -> new.name")
const ARROW: &str = "->";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid endpoint URL {url:?}: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to parse document: {0}")]
    Parse(String),
}

/// シンボル一覧の取得元
#[async_trait]
pub trait SymbolSource: Send + Sync {
    async fn fetch_symbols(&self) -> Result<SymbolCollection, FetchError>;
}

/// HTTP でリリースノートを取ってくる実装
pub struct ReleaseNotesSource {
    client: reqwest::Client,
    endpoint: String,
}

impl ReleaseNotesSource {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// クライアントを差し替えて作成する
    pub fn with_client(endpoint: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn endpoint_url(&self) -> Result<Url, FetchError> {
        let invalid = |reason: String| FetchError::InvalidEndpoint {
            url: self.endpoint.clone(),
            reason,
        };
        let url = Url::parse(&self.endpoint).map_err(|e| invalid(e.to_string()))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(invalid(format!("unsupported scheme {other:?}"))),
        }
    }
}

impl Default for ReleaseNotesSource {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}

#[async_trait]
impl SymbolSource for ReleaseNotesSource {
    async fn fetch_symbols(&self) -> Result<SymbolCollection, FetchError> {
        let url = self.endpoint_url()?;
        debug!(%url, "Fetching release notes");

        // リトライはしない (呼び出し側の責任)
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, AGENT)
            .send()
            .await
            .map_err(|e| FetchError::Network(format!("Failed to fetch URL: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Network(format!(
                "HTTP error: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Network(format!("Failed to read response body: {e}")))?;
        let html = std::str::from_utf8(&body)
            .map_err(|e| FetchError::Parse(format!("response body is not UTF-8: {e}")))?;

        let symbols = parse_symbols(html)?;
        info!(count = symbols.len(), "Parsed symbols from release notes");
        Ok(symbols)
    }
}

/// HTML からシンボル名を抜き出す
///
/// 1列目 → 2列目 → 名前変更リストの順に連結する。重複はそのまま残す
pub fn parse_symbols(html: &str) -> Result<SymbolCollection, FetchError> {
    let document = Html::parse_document(html);
    let mut symbols = SymbolCollection::new();

    for zone in [ZONE_FIRST_COLUMN, ZONE_SECOND_COLUMN] {
        let selector = selector(zone)?;
        for item in document.select(&selector) {
            if let Some(symbol) = Symbol::new(element_text(item)) {
                symbols.push(symbol);
            }
        }
    }

    let selector = selector(ZONE_RENAMED)?;
    for item in document.select(&selector) {
        if let Some(symbol) = Symbol::new(renamed_to(&element_text(item))) {
            symbols.push(symbol);
        }
    }

    Ok(symbols)
}

/// "a -> b -> c" の最後の部分 (矢印がなければ全体)
pub fn renamed_to(text: &str) -> &str {
    text.split(ARROW).map(str::trim).last().unwrap_or_default()
}

fn selector(css: &str) -> Result<Selector, FetchError> {
    Selector::parse(css).map_err(|e| FetchError::Parse(format!("invalid selector {css:?}: {e}")))
}

// 子孫のテキストを連結し、空白の連続を1つにまとめる
fn element_text(element: ElementRef<'_>) -> String {
    let raw: String = element.text().collect();
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
