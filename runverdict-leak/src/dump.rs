//! リークログの生出力

use crate::Result;
use std::fs;
use std::io;
use std::path::Path;
use tracing::info;

/// 集計行が報告されたことを示す部分文字列
const TOTAL_MARKER: &str = "0 TOTAL ";

/// リークログをパースせずにそのままログへ出力する
///
/// ファイルが存在しない場合は何も出力せず `None` を返します。
/// `filter` が真の場合、集計行を含まないログは出力しません。
pub fn dump_leak_log<P: AsRef<Path>>(path: P, filter: bool) -> Result<Option<String>> {
    let path = path.as_ref();

    let contents = match fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(anyhow::anyhow!("Failed to read leak log {:?}: {}", path, e)),
    };

    if filter && !contents.contains(TOTAL_MARKER) {
        return Ok(None);
    }

    let report = contents.trim_end_matches('\n').to_string();
    info!("{}", report);
    Ok(Some(report))
}
