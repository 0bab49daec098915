//! エラー型

use thiserror::Error;

/// デバッガ解決のエラー
///
/// デバッガが指定されたのに見つからない場合は安全な代替がないため、
/// 呼び出し側は実行を中止します。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DebuggerError {
    /// 指定されたデバッガの実行ファイルが見つからない
    #[error("Path {0} doesn't exist.")]
    NotFound(String),
}
