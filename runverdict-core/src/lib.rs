//! runverdict のコア機能
//!
//! テスト実行後に残された成果物（クラッシュダンプ、リークログ）から
//! テストの成否を判定し、デバッガ経由の起動方法を解決します。

pub mod debugger;
pub mod errors;
pub mod outcome;

pub use debugger::{known_debugger, DebuggerDefaults, DebuggerInfo, DebuggerResolver};
pub use errors::DebuggerError;
pub use outcome::{OutcomeChecker, RunOutcome};

// 他のクレートから使用するために再エクスポート
pub use runverdict_crash::{CrashArtifact, CrashReport, CrashScanner, STACKWALK_ENV};
pub use runverdict_leak::{
    dump_leak_log, AggregateStatus, LeakLogClassifier, LeakRecord, LeakReport, LeakVerdict,
    TEST_PASS, TEST_UNEXPECTED_FAIL,
};

/// 判定処理の結果型
pub type Result<T> = anyhow::Result<T>;
