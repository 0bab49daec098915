//! テスト結果の集約

use crate::Result;
use runverdict_crash::{CrashReport, CrashScanner};
use runverdict_leak::{LeakLogClassifier, LeakReport};
use std::path::Path;

/// テスト1回分の判定結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// クラッシュダンプの走査結果
    pub crashes: CrashReport,
    /// リークログの解析結果（リークログが設定されていない場合は `None`）
    pub leaks: Option<LeakReport>,
}

impl RunOutcome {
    /// クラッシュが検出されたかどうか
    pub fn crashed(&self) -> bool {
        self.crashes.found_crash()
    }

    /// テストが成功したかどうか
    ///
    /// リークログが判定不能だった場合は失敗として扱いません。
    pub fn passed(&self) -> bool {
        !self.crashed() && !self.leaks.as_ref().is_some_and(LeakReport::has_failures)
    }
}

/// クラッシュ検出とリーク判定をまとめて行うチェッカ
pub struct OutcomeChecker {
    scanner: CrashScanner,
    classifier: LeakLogClassifier,
}

impl OutcomeChecker {
    /// スキャナと判定器を指定してチェッカを作成する
    pub fn new(scanner: CrashScanner, classifier: LeakLogClassifier) -> Self {
        Self {
            scanner,
            classifier,
        }
    }

    /// クラッシュダンプを走査し、リークログが指定されていれば判定する
    #[track_caller]
    pub fn check(
        &self,
        dump_dir: &Path,
        symbols_path: Option<&Path>,
        test_name: Option<&str>,
        leak_log: Option<&Path>,
    ) -> Result<RunOutcome> {
        let crashes = self.scanner.scan_report(dump_dir, symbols_path, test_name);
        let leaks = leak_log
            .map(|path| self.classifier.classify(path))
            .transpose()?;

        Ok(RunOutcome { crashes, leaks })
    }
}
