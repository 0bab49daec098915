//! リークログの行パース

use crate::Result;
use regex::Regex;

/// 集計行に使われる予約名
pub const TOTAL_NAME: &str = "TOTAL";

/// リークログの1行分のレコード
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeakRecord {
    /// クラス名（集計行の場合は `TOTAL`）
    pub name: String,
    /// 1インスタンスあたりのサイズ（バイト）
    pub instance_size: i64,
    /// リークしたバイト数（クラス全体の合計）
    pub bytes_leaked: i64,
    /// リークしたインスタンス数
    pub num_leaked: i64,
}

impl LeakRecord {
    /// 集計行かどうか
    pub fn is_total(&self) -> bool {
        self.name == TOTAL_NAME
    }

    /// 負の値を含むかどうか
    ///
    /// 負の値はログを出力したツール側の異常を示します。
    pub fn has_negative(&self) -> bool {
        self.instance_size < 0 || self.bytes_leaked < 0 || self.num_leaked < 0
    }
}

/// リークログの行パーサ
pub struct LeakLineParser {
    /// 行パターン
    line_pattern: Regex,
}

impl LeakLineParser {
    /// 行パーサを作成する
    pub fn new() -> Result<Self> {
        //                  Per-Inst  Leaked      Total  Rem ...
        //   0 TOTAL              17     192  419115886    2 ...
        // 833 nsTimerImpl        60     120      24726    2 ...
        // 数字と区切りは ASCII のみ
        let line_pattern = Regex::new(
            r"^(?-u:\s)*[0-9]+(?-u:\s)+(?P<name>\S+)(?-u:\s)+(?P<size>-?[0-9]+)(?-u:\s)+(?P<bytes>-?[0-9]+)(?-u:\s)+-?[0-9]+(?-u:\s)+(?P<num>-?[0-9]+)",
        )?;

        Ok(Self { line_pattern })
    }

    /// 1行をパースする
    ///
    /// 形式に一致しない行、または数値が i64 に収まらない行は `None` を返します。
    pub fn parse_line(&self, line: &str) -> Option<LeakRecord> {
        let caps = self.line_pattern.captures(line)?;

        Some(LeakRecord {
            name: caps["name"].to_string(),
            instance_size: caps["size"].parse().ok()?,
            bytes_leaked: caps["bytes"].parse().ok()?,
            num_leaked: caps["num"].parse().ok()?,
        })
    }
}
