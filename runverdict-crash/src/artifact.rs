//! クラッシュダンプの検出

use crate::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// ダンプファイルの拡張子
pub const DUMP_EXTENSION: &str = "dmp";

/// サイドカー（メタデータ）ファイルの拡張子
pub const SIDECAR_EXTENSION: &str = "extra";

/// 検出されたクラッシュダンプ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrashArtifact {
    /// ダンプファイルのパス
    pub dump: PathBuf,
    /// 同じステムを持つサイドカーファイルのパス（存在する場合）
    pub sidecar: Option<PathBuf>,
}

impl CrashArtifact {
    /// ダンプファイルのパスから作成する
    ///
    /// サイドカーファイルはこの時点でディスク上に存在する場合のみ設定されます。
    pub fn new(dump: PathBuf) -> Self {
        let candidate = dump.with_extension(SIDECAR_EXTENSION);
        let sidecar = candidate.is_file().then_some(candidate);
        Self { dump, sidecar }
    }

    /// ダンプとサイドカーを削除する
    ///
    /// 片方の削除に失敗してももう片方の削除は試みます。
    /// 失敗したパスとエラーを返します。
    pub fn remove(&self) -> Vec<(PathBuf, std::io::Error)> {
        let mut failures = Vec::new();

        if let Err(e) = fs::remove_file(&self.dump) {
            failures.push((self.dump.clone(), e));
        }
        if let Some(sidecar) = &self.sidecar {
            if let Err(e) = fs::remove_file(sidecar) {
                failures.push((sidecar.clone(), e));
            }
        }

        failures
    }
}

/// ディレクトリ内のダンプファイルを辞書順で列挙する
pub fn find_artifacts<P: AsRef<Path>>(dump_dir: P) -> Result<Vec<CrashArtifact>> {
    let dump_dir = dump_dir.as_ref();
    let entries = fs::read_dir(dump_dir)
        .map_err(|e| anyhow::anyhow!("Failed to read dump directory {:?}: {}", dump_dir, e))?;

    let mut dumps: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| path.extension().is_some_and(|ext| ext == DUMP_EXTENSION))
        .collect();
    dumps.sort();

    Ok(dumps.into_iter().map(CrashArtifact::new).collect())
}
