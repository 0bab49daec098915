//! runverdict リークログ解析
//!
//! このクレートは、テスト実行後に残されるリークログ（クラスごとのメモリ確保の集計）を
//! 解析し、PASS/FAIL の判定と診断メッセージを生成します。

pub mod classifier;
pub mod dump;
pub mod record;

pub use classifier::{AggregateStatus, LeakLogClassifier, LeakReport, LeakVerdict};
pub use dump::dump_leak_log;
pub use record::{LeakLineParser, LeakRecord, TOTAL_NAME};

/// 成功時のログプレフィックス
pub const TEST_PASS: &str = "TEST-PASS";

/// 失敗時のログプレフィックス
pub const TEST_UNEXPECTED_FAIL: &str = "TEST-UNEXPECTED-FAIL";

/// 判定不能時のログプレフィックス
pub const WARNING: &str = "WARNING";

/// 診断メッセージの発生元として出力する名前
pub const LEAK_SOURCE: &str = "runverdict-leak";

/// リークログ解析の結果型
pub type Result<T> = anyhow::Result<T>;
