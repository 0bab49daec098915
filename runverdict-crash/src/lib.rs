//! runverdict クラッシュダンプ検出
//!
//! このクレートは、テスト実行後にダンプディレクトリを走査してクラッシュダンプを検出し、
//! 外部のシンボル化ツールを呼び出した上でダンプを削除します。

pub mod artifact;
pub mod scanner;

pub use artifact::{find_artifacts, CrashArtifact, DUMP_EXTENSION, SIDECAR_EXTENSION};
pub use scanner::{CrashReport, CrashScanner, STACKWALK_ENV};

/// クラッシュ検出の結果型
pub type Result<T> = anyhow::Result<T>;
