// ============================================
// src/lib.rs
// シンボル取得・キャッシュ・出題のコア部分
// ============================================

// シンボルのデータ構造
pub mod symbols;

// リリースノートからの取得
pub mod source;

// キャッシュファイル
pub mod cache;

// キャッシュ優先の取得
pub mod provider;

// 出題と判定
pub mod round;

// セッションの状態管理
pub mod session;

pub mod config;
pub mod logging;
