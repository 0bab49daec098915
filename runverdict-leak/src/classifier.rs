//! リークログの判定
//!
//! ファイル全体を一度だけ読み込み、各行をパースした結果から
//! エコー出力と判定を別々に導出します。

use crate::record::{LeakLineParser, LeakRecord};
use crate::{Result, LEAK_SOURCE, TEST_PASS, TEST_UNEXPECTED_FAIL, WARNING};
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info};

/// 集計行から導出される判定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeakVerdict {
    /// リークなし
    Pass,
    /// しきい値以内のリーク
    PassWithWarning,
    /// しきい値を超えるリーク
    Fail,
}

/// 集計行の状態
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregateStatus {
    /// 集計行が一度も現れなかった
    Missing,
    /// 集計行は現れたが負の値を含んでいたため判定していない
    Negative(LeakRecord),
    /// 集計行を判定した
    Classified {
        record: LeakRecord,
        verdict: LeakVerdict,
    },
}

/// リークログの解析結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeakReport {
    /// 集計行の状態（ログファイルが存在しない場合は `None`）
    pub aggregate: Option<AggregateStatus>,
    /// 負の値を含んでいたレコードの数
    pub negative_records: usize,
    /// ログファイルからエコーした行
    pub echo: Vec<String>,
    /// 判定時に生成した診断メッセージ
    pub diagnostics: Vec<String>,
}

impl LeakReport {
    fn inconclusive() -> Self {
        Self {
            aggregate: None,
            negative_records: 0,
            echo: Vec::new(),
            diagnostics: vec![format!(
                "{} | {} | refcount logging is off, so leaks can't be detected!",
                WARNING, LEAK_SOURCE
            )],
        }
    }

    /// ログファイルが存在せず判定できなかったかどうか
    pub fn is_inconclusive(&self) -> bool {
        self.aggregate.is_none()
    }

    /// 集計行の判定結果
    ///
    /// 集計行が存在しない場合や負の値を含む場合は `None` を返します。
    pub fn verdict(&self) -> Option<LeakVerdict> {
        match &self.aggregate {
            Some(AggregateStatus::Classified { verdict, .. }) => Some(*verdict),
            _ => None,
        }
    }

    /// 失敗として報告された診断があるかどうか
    ///
    /// 判定不能は失敗に含めません。
    pub fn has_failures(&self) -> bool {
        match &self.aggregate {
            None => false,
            Some(AggregateStatus::Missing) => true,
            Some(_) => {
                self.negative_records > 0 || self.verdict() == Some(LeakVerdict::Fail)
            }
        }
    }

    /// エコー行と診断メッセージをこの順で返す
    pub fn transcript(&self) -> impl Iterator<Item = &str> {
        self.echo
            .iter()
            .chain(self.diagnostics.iter())
            .map(String::as_str)
    }
}

/// リークログの判定器
pub struct LeakLogClassifier {
    /// 行パーサ
    parser: LeakLineParser,
    /// 許容するリークバイト数
    threshold: i64,
}

impl LeakLogClassifier {
    /// しきい値を指定して判定器を作成する
    pub fn new(threshold: i64) -> Result<Self> {
        Ok(Self {
            parser: LeakLineParser::new()?,
            threshold,
        })
    }

    /// しきい値を取得する
    pub fn threshold(&self) -> i64 {
        self.threshold
    }

    /// リークログファイルを判定し、結果をログに出力する
    ///
    /// ファイルが存在しない場合は判定不能の結果を返します。
    /// 存在するのに読めない場合のみエラーになります。
    pub fn classify<P: AsRef<Path>>(&self, path: P) -> Result<LeakReport> {
        let path = path.as_ref();

        let report = match fs::read(path) {
            Ok(bytes) => self.classify_str(&String::from_utf8_lossy(&bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => LeakReport::inconclusive(),
            Err(e) => {
                return Err(anyhow::anyhow!("Failed to read leak log {:?}: {}", path, e));
            }
        };

        for line in report.transcript() {
            info!("{}", line);
        }

        Ok(report)
    }

    /// 文字列として与えられたリークログを判定する
    pub fn classify_str(&self, contents: &str) -> LeakReport {
        let lines: Vec<(&str, Option<LeakRecord>)> = contents
            .lines()
            .map(|line| (line, self.parser.parse_line(line)))
            .collect();

        debug!(
            "leak log: {} lines, {} records",
            lines.len(),
            lines.iter().filter(|(_, r)| r.is_some()).count()
        );

        let echo = echo_lines(&lines);
        let mut report = self.evaluate(lines.iter().filter_map(|(_, r)| r.as_ref()));
        report.echo = echo;
        report
    }

    /// 集計行のバイト数から判定を求める
    pub fn verdict_for(&self, bytes_leaked: i64) -> LeakVerdict {
        if bytes_leaked > self.threshold {
            LeakVerdict::Fail
        } else if bytes_leaked > 0 {
            LeakVerdict::PassWithWarning
        } else {
            LeakVerdict::Pass
        }
    }

    /// レコードを先頭から順に評価する
    fn evaluate<'a>(&self, records: impl Iterator<Item = &'a LeakRecord>) -> LeakReport {
        let mut aggregate = AggregateStatus::Missing;
        let mut negative_records = 0;
        let mut diagnostics = Vec::new();
        // 失敗した集計行より後のクラス行は失敗プレフィックスで出力する
        let mut prefix = TEST_PASS;

        for record in records {
            if record.has_negative() {
                negative_records += 1;
                diagnostics.push(format!(
                    "{} | {} | negative leaks caught!",
                    TEST_UNEXPECTED_FAIL, LEAK_SOURCE
                ));
                if record.is_total() {
                    aggregate = AggregateStatus::Negative(record.clone());
                }
            } else if record.is_total() {
                let verdict = self.verdict_for(record.bytes_leaked);
                if verdict == LeakVerdict::Fail {
                    prefix = TEST_UNEXPECTED_FAIL;
                }
                diagnostics.push(self.total_message(verdict, record.bytes_leaked));
                aggregate = AggregateStatus::Classified {
                    record: record.clone(),
                    verdict,
                };
            } else if record.num_leaked != 0 {
                diagnostics.push(class_message(prefix, record));
            }
        }

        if aggregate == AggregateStatus::Missing {
            diagnostics.push(format!(
                "{} | {} | missing output line for total leaks!",
                TEST_UNEXPECTED_FAIL, LEAK_SOURCE
            ));
        }

        LeakReport {
            aggregate: Some(aggregate),
            negative_records,
            echo: Vec::new(),
            diagnostics,
        }
    }

    fn total_message(&self, verdict: LeakVerdict, bytes_leaked: i64) -> String {
        let mut message = match verdict {
            LeakVerdict::Fail => format!(
                "{} | {} | leaked {} bytes during test execution",
                TEST_UNEXPECTED_FAIL, LEAK_SOURCE, bytes_leaked
            ),
            LeakVerdict::PassWithWarning => format!(
                "{} | {} | WARNING leaked {} bytes during test execution",
                TEST_PASS, LEAK_SOURCE, bytes_leaked
            ),
            LeakVerdict::Pass => format!("{} | {} | no leaks detected!", TEST_PASS, LEAK_SOURCE),
        };

        // しきい値が 0（既定値）でない場合は併記する
        if self.threshold != 0 {
            message.push_str(&format!(" (threshold set at {} bytes)", self.threshold));
        }

        message
    }
}

/// リークしていないクラス行を除いてエコーする
fn echo_lines(lines: &[(&str, Option<LeakRecord>)]) -> Vec<String> {
    lines
        .iter()
        .filter(|(_, record)| match record {
            Some(r) => r.num_leaked != 0 || r.is_total(),
            None => true,
        })
        .map(|(line, _)| line.trim_end().to_string())
        .collect()
}

fn class_message(prefix: &str, record: &LeakRecord) -> String {
    if record.num_leaked > 1 {
        format!(
            "{} | {} | leaked {} instances of {} with size {} bytes each ({} bytes total)",
            prefix,
            LEAK_SOURCE,
            record.num_leaked,
            record.name,
            record.instance_size,
            record.bytes_leaked
        )
    } else {
        format!(
            "{} | {} | leaked {} instance of {} with size {} bytes",
            prefix, LEAK_SOURCE, record.num_leaked, record.name, record.instance_size
        )
    }
}
