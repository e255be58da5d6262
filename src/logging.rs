// ============================================
// src/logging.rs
// ログの初期化 (画面は TUI が使うのでファイルに書く)
// ============================================

use anyhow::{Result, anyhow};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

use std::path::Path;

/// ログレベルを上書きする環境変数
pub const LOG_ENV: &str = "WHATTHENAME_LOG";

const LOG_FILE: &str = "whatthename.log";

/// 返ってくるガードは main が終わるまで持っておくこと
pub fn init(level: &str, dir: &Path) -> Result<WorkerGuard> {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(LOG_FILE)
        .build(dir)?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!(e))?;

    Ok(guard)
}
