//! デバッガの解決
//!
//! テスト対象アプリケーションをデバッガ経由で起動するための
//! 実行ファイルパス、引数、対話モードを決定します。

use crate::errors::DebuggerError;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// 既知のデバッガの既定値
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebuggerDefaults {
    /// 標準入出力をリダイレクトしてはいけないかどうか
    pub interactive: bool,
    /// 既定の引数（空白区切り）
    pub args: &'static str,
}

/// 実行ファイル名（小文字）から既定値への対応表
const KNOWN_DEBUGGERS: &[(&str, DebuggerDefaults)] = &[
    // gdb は実行ファイル名より後ろの引数を渡すのに --args が必要
    (
        "gdb",
        DebuggerDefaults {
            interactive: true,
            args: "-q --args",
        },
    ),
    // valgrind は --leak-check=full を付けないとリークの詳細を出さない
    (
        "valgrind",
        DebuggerDefaults {
            interactive: false,
            args: "--leak-check=full",
        },
    ),
];

/// 実行ファイル名から既定値を引く（大文字小文字は区別しない）
pub fn known_debugger(name: &str) -> Option<&'static DebuggerDefaults> {
    let name = name.to_lowercase();
    KNOWN_DEBUGGERS
        .iter()
        .find(|(known, _)| *known == name)
        .map(|(_, defaults)| defaults)
}

/// 解決済みのデバッガ情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebuggerInfo {
    /// 実行ファイルのパス
    pub path: PathBuf,
    /// アプリケーションより前に渡す引数
    pub args: Vec<String>,
    /// 対話モード（真の場合は標準入出力をリダイレクトしない）
    pub interactive: bool,
}

impl DebuggerInfo {
    /// デバッガ経由でアプリケーションを起動するコマンドラインを組み立てる
    pub fn command_line(&self, app: &Path, app_args: &[String]) -> Vec<OsString> {
        let mut argv = Vec::with_capacity(self.args.len() + app_args.len() + 2);
        argv.push(self.path.clone().into_os_string());
        argv.extend(self.args.iter().map(OsString::from));
        argv.push(app.as_os_str().to_os_string());
        argv.extend(app_args.iter().map(OsString::from));
        argv
    }
}

/// デバッガリゾルバ
#[derive(Debug, Clone, Default)]
pub struct DebuggerResolver {
    /// 実行ファイルの検索パス
    search_path: Vec<PathBuf>,
}

impl DebuggerResolver {
    /// 検索パスを指定してリゾルバを作成する
    pub fn new(search_path: Vec<PathBuf>) -> Self {
        Self { search_path }
    }

    /// 環境変数 `PATH` を検索パスとして使うリゾルバを作成する
    pub fn from_env() -> Self {
        let search_path = std::env::var_os("PATH")
            .map(|paths| std::env::split_paths(&paths).collect())
            .unwrap_or_default();
        Self::new(search_path)
    }

    /// デバッガ情報を解決する
    ///
    /// `debugger` が `None` か空文字列の場合はデバッガを使わないので `Ok(None)` を返します。
    /// `debugger_args` は既定の引数を丸ごと置き換え、
    /// `interactive` は既定の対話モードを上書きします。
    pub fn resolve(
        &self,
        search_dir: &Path,
        debugger: Option<&str>,
        debugger_args: Option<&str>,
        interactive: Option<bool>,
    ) -> Result<Option<DebuggerInfo>, DebuggerError> {
        let Some(debugger) = debugger.filter(|name| !name.is_empty()) else {
            return Ok(None);
        };

        let path = self
            .find_executable(search_dir, debugger)
            .ok_or_else(|| DebuggerError::NotFound(debugger.to_string()))?;

        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let defaults = known_debugger(&name);
        debug!("resolved debugger {:?} (known: {})", path, defaults.is_some());

        let args = match debugger_args {
            Some(args) => split_args(args),
            None => defaults.map(|d| split_args(d.args)).unwrap_or_default(),
        };
        let interactive =
            interactive.unwrap_or_else(|| defaults.is_some_and(|d| d.interactive));

        Ok(Some(DebuggerInfo {
            path,
            args,
            interactive,
        }))
    }

    /// 実行ファイルを探す
    ///
    /// まず `dir` からの相対パスとして探し、見つからずディレクトリ部分を
    /// 含まない名前であれば検索パスの各ディレクトリを先頭から探します。
    pub fn find_executable(&self, dir: &Path, name: &str) -> Option<PathBuf> {
        let full_path = normalize(&dir.join(expand_user(name)));
        if full_path.exists() {
            return Some(full_path);
        }

        // "./gdb" が "/usr/bin/./gdb" に一致しないようにする
        if has_dir_component(name) {
            return None;
        }

        self.search_path
            .iter()
            .map(|dir| dir.join(name))
            .find(|candidate| candidate.exists())
    }
}

fn split_args(args: &str) -> Vec<String> {
    args.split_whitespace().map(str::to_string).collect()
}

fn has_dir_component(name: &str) -> bool {
    Path::new(name)
        .parent()
        .is_some_and(|parent| !parent.as_os_str().is_empty())
}

/// 先頭の `~` をホームディレクトリに展開する
fn expand_user(path: &str) -> PathBuf {
    let rest = if path == "~" {
        Some("")
    } else {
        path.strip_prefix("~/")
    };

    match (rest, home::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

/// ファイルシステムに触れずに `.` と `..` を取り除く
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }

    if out.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        out
    }
}
