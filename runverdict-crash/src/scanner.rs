//! クラッシュダンプの走査と後始末

use crate::artifact::{find_artifacts, CrashArtifact};
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

/// シンボル化ツールのパスを指定する環境変数
pub const STACKWALK_ENV: &str = "MINIDUMP_STACKWALK";

const TEST_UNEXPECTED_FAIL: &str = "TEST-UNEXPECTED-FAIL";

/// 1回の走査結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrashReport {
    /// 診断に使ったテスト名
    pub test_name: String,
    /// 検出して処理したダンプ
    pub artifacts: Vec<CrashArtifact>,
    /// 出力した診断メッセージ
    pub transcript: Vec<String>,
}

impl CrashReport {
    /// クラッシュが検出されたかどうか
    pub fn found_crash(&self) -> bool {
        !self.artifacts.is_empty()
    }
}

/// クラッシュダンプスキャナ
#[derive(Debug, Clone, Default)]
pub struct CrashScanner {
    /// シンボル化ツールのパス
    stackwalk: Option<PathBuf>,
}

impl CrashScanner {
    /// シンボル化ツールのパスを指定してスキャナを作成する
    ///
    /// 空のパスは未設定として扱います。
    pub fn new(stackwalk: Option<PathBuf>) -> Self {
        Self {
            stackwalk: stackwalk.filter(|path| !path.as_os_str().is_empty()),
        }
    }

    /// 環境変数 `MINIDUMP_STACKWALK` からシンボル化ツールのパスを読み込む
    pub fn from_env() -> Self {
        Self::new(std::env::var_os(STACKWALK_ENV).map(PathBuf::from))
    }

    /// シンボル化ツールのパスを取得する
    pub fn stackwalk(&self) -> Option<&Path> {
        self.stackwalk.as_deref()
    }

    /// ダンプディレクトリを走査し、クラッシュが見つかったかどうかを返す
    ///
    /// テスト名を省略した場合は呼び出し元のソースファイル名を使います。
    #[track_caller]
    pub fn scan<P: AsRef<Path>>(
        &self,
        dump_dir: P,
        symbols_path: Option<&Path>,
        test_name: Option<&str>,
    ) -> bool {
        self.scan_report(dump_dir, symbols_path, test_name)
            .found_crash()
    }

    /// ダンプディレクトリを走査し、処理内容を返す
    ///
    /// 見つかったダンプはシンボル化の成否にかかわらず削除されます。
    /// 削除やシンボル化の失敗はログに出力するだけでエラーにはなりません。
    #[track_caller]
    pub fn scan_report<P: AsRef<Path>>(
        &self,
        dump_dir: P,
        symbols_path: Option<&Path>,
        test_name: Option<&str>,
    ) -> CrashReport {
        let test_name = match test_name {
            Some(name) => name.to_string(),
            None => caller_file_name(Location::caller()),
        };

        let artifacts = match find_artifacts(&dump_dir) {
            Ok(artifacts) => artifacts,
            Err(e) => {
                debug!("{}", e);
                Vec::new()
            }
        };

        let mut transcript = Vec::new();
        for artifact in &artifacts {
            emit(
                &mut transcript,
                format!(
                    "{} | {} | application crashed (minidump found)",
                    TEST_UNEXPECTED_FAIL, test_name
                ),
            );

            self.symbolicate(&artifact.dump, symbols_path, &mut transcript);

            for (path, e) in artifact.remove() {
                warn!("Failed to remove {:?}: {}", path, e);
            }
        }

        CrashReport {
            test_name,
            artifacts,
            transcript,
        }
    }

    /// シンボル化ツールを呼び出す
    ///
    /// 前提条件が揃っていない場合は理由を出力して何もしません。
    fn symbolicate(&self, dump: &Path, symbols_path: Option<&Path>, transcript: &mut Vec<String>) {
        let symbols_path = symbols_path.filter(|path| !path.as_os_str().is_empty());

        if let (Some(symbols), Some(tool)) = (symbols_path, self.stackwalk.as_deref()) {
            if tool.exists() {
                run_stackwalk(tool, dump, symbols);
                return;
            }
        }

        if symbols_path.is_none() {
            emit(transcript, "No symbols path given, can't process dump.".to_string());
        }
        match self.stackwalk.as_deref() {
            None => emit(
                transcript,
                format!("{} not set, can't process dump.", STACKWALK_ENV),
            ),
            Some(tool) if !tool.exists() => emit(
                transcript,
                format!("{} binary not found: {}", STACKWALK_ENV, tool.display()),
            ),
            Some(_) => {}
        }
    }
}

/// シンボル化ツールを実行して終了を待つ
///
/// 標準エラー出力は捨て、終了ステータスは無視します。
fn run_stackwalk(tool: &Path, dump: &Path, symbols: &Path) {
    let status = Command::new(tool)
        .arg(dump)
        .arg(symbols)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match status {
        Ok(status) => debug!("{:?} exited with {}", tool, status),
        Err(e) => warn!("Failed to run {:?}: {}", tool, e),
    }
}

fn emit(transcript: &mut Vec<String>, line: String) {
    info!("{}", line);
    transcript.push(line);
}

fn caller_file_name(location: &Location<'_>) -> String {
    Path::new(location.file())
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("unknown")
        .to_string()
}
