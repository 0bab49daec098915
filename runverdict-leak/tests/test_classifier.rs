//! リークログ判定のテスト

use runverdict_leak::{AggregateStatus, LeakLogClassifier, LeakVerdict};
use std::io::Write;
use tempfile::NamedTempFile;

const HEADER: &str = "\
== BloatView: ALL (cumulative) LEAK STATISTICS

     |<----------------Class--------------->|<-----Bytes------>|<----------------Objects---------------->|
                                              Per-Inst   Leaked    Total      Rem      Mean       StdDev";

fn write_log(body: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    writeln!(file, "{}", HEADER).unwrap();
    write!(file, "{}", body).unwrap();
    file
}

fn diagnostics_containing<'a>(lines: &'a [String], needle: &str) -> Vec<&'a String> {
    lines.iter().filter(|l| l.contains(needle)).collect()
}

#[test]
fn test_clean_run_passes() {
    let log = write_log(
        "   0 TOTAL                  17        0   419115886        0 (    0.00 +/-     0.00)\n\
         \x20 12 nsTimerImpl            60        0       24726        0 (    0.00 +/-     0.00)\n\
         \x20 13 nsThread               88        0         120        0 (    0.00 +/-     0.00)\n",
    );

    let classifier = LeakLogClassifier::new(0).unwrap();
    let report = classifier.classify(log.path()).unwrap();

    assert_eq!(report.verdict(), Some(LeakVerdict::Pass));
    assert!(!report.has_failures());
    assert_eq!(
        report.diagnostics,
        vec!["TEST-PASS | runverdict-leak | no leaks detected!".to_string()]
    );
    // リークしていないクラスはエコーされない
    assert!(report.echo.iter().all(|l| !l.contains("nsTimerImpl")));
    assert!(report.echo.iter().any(|l| l.contains("TOTAL")));
}

#[test]
fn test_threshold_boundary() {
    let body = "   0 TOTAL 17 500 1000 3\n  1 nsFoo 100 500 900 5\n";

    let at_threshold = LeakLogClassifier::new(500).unwrap();
    let report = at_threshold.classify(write_log(body).path()).unwrap();
    assert_eq!(report.verdict(), Some(LeakVerdict::PassWithWarning));
    assert!(!report.has_failures());
    assert_eq!(
        report.diagnostics[0],
        "TEST-PASS | runverdict-leak | WARNING leaked 500 bytes during test execution (threshold set at 500 bytes)"
    );

    let below = LeakLogClassifier::new(499).unwrap();
    let report = below.classify(write_log(body).path()).unwrap();
    assert_eq!(report.verdict(), Some(LeakVerdict::Fail));
    assert!(report.has_failures());
    assert_eq!(
        report.diagnostics[0],
        "TEST-UNEXPECTED-FAIL | runverdict-leak | leaked 500 bytes during test execution (threshold set at 499 bytes)"
    );
}

#[test]
fn test_class_prefix_follows_failed_total() {
    let classifier = LeakLogClassifier::new(0).unwrap();
    let report = classifier
        .classify(write_log("   0 TOTAL 17 192 1000 3\n  1 nsFoo 24 24 900 1\n  2 nsBar 84 168 900 2\n").path())
        .unwrap();

    assert_eq!(report.verdict(), Some(LeakVerdict::Fail));
    assert_eq!(
        report.diagnostics,
        vec![
            "TEST-UNEXPECTED-FAIL | runverdict-leak | leaked 192 bytes during test execution".to_string(),
            "TEST-UNEXPECTED-FAIL | runverdict-leak | leaked 1 instance of nsFoo with size 24 bytes".to_string(),
            "TEST-UNEXPECTED-FAIL | runverdict-leak | leaked 2 instances of nsBar with size 84 bytes each (168 bytes total)".to_string(),
        ]
    );
}

#[test]
fn test_class_before_total_keeps_pass_prefix() {
    let classifier = LeakLogClassifier::new(0).unwrap();
    let report = classifier
        .classify(write_log("  1 nsFoo 24 24 900 1\n   0 TOTAL 17 24 1000 1\n").path())
        .unwrap();

    assert_eq!(
        report.diagnostics[0],
        "TEST-PASS | runverdict-leak | leaked 1 instance of nsFoo with size 24 bytes"
    );
    assert!(report.diagnostics[1].starts_with("TEST-UNEXPECTED-FAIL"));
}

#[test]
fn test_missing_total_fails() {
    let classifier = LeakLogClassifier::new(0).unwrap();
    let report = classifier
        .classify(write_log("  1 nsFoo 24 0 900 0\n  2 nsBar 84 0 900 0\n").path())
        .unwrap();

    assert_eq!(report.aggregate, Some(AggregateStatus::Missing));
    assert_eq!(report.verdict(), None);
    assert!(report.has_failures());
    assert_eq!(
        report.diagnostics,
        vec!["TEST-UNEXPECTED-FAIL | runverdict-leak | missing output line for total leaks!".to_string()]
    );
}

#[test]
fn test_negative_total_is_seen_but_not_classified() {
    let classifier = LeakLogClassifier::new(0).unwrap();
    let report = classifier
        .classify(write_log("   0 TOTAL 17 -192 1000 3\n").path())
        .unwrap();

    assert!(matches!(report.aggregate, Some(AggregateStatus::Negative(_))));
    assert_eq!(report.verdict(), None);
    assert_eq!(report.negative_records, 1);
    assert!(report.has_failures());
    assert_eq!(
        report.diagnostics,
        vec!["TEST-UNEXPECTED-FAIL | runverdict-leak | negative leaks caught!".to_string()]
    );
    assert!(diagnostics_containing(&report.diagnostics, "during test execution").is_empty());
    assert!(diagnostics_containing(&report.diagnostics, "missing output line").is_empty());
}

#[test]
fn test_negative_class_record() {
    let classifier = LeakLogClassifier::new(0).unwrap();
    let report = classifier
        .classify(write_log("   0 TOTAL 17 0 1000 0\n  4 nsOdd -8 16 900 2\n").path())
        .unwrap();

    assert_eq!(report.verdict(), Some(LeakVerdict::Pass));
    assert!(report.has_failures());
    assert_eq!(
        diagnostics_containing(&report.diagnostics, "negative leaks caught!").len(),
        1
    );
    assert!(diagnostics_containing(&report.diagnostics, "nsOdd").is_empty());
}

#[test]
fn test_missing_log_is_inconclusive() {
    let dir = tempfile::tempdir().unwrap();
    let classifier = LeakLogClassifier::new(0).unwrap();
    let report = classifier.classify(dir.path().join("bloat.log")).unwrap();

    assert!(report.is_inconclusive());
    assert!(!report.has_failures());
    assert!(report.echo.is_empty());
    assert_eq!(
        report.diagnostics,
        vec!["WARNING | runverdict-leak | refcount logging is off, so leaks can't be detected!".to_string()]
    );
}

#[test]
fn test_classify_is_idempotent() {
    let log = write_log("   0 TOTAL 17 192 1000 3\n  1 nsFoo 24 24 900 1\n  2 nsQuiet 8 0 10 0\n");
    let classifier = LeakLogClassifier::new(100).unwrap();

    let first = classifier.classify(log.path()).unwrap();
    let second = classifier.classify(log.path()).unwrap();
    assert_eq!(first, second);

    let first_lines: Vec<&str> = first.transcript().collect();
    let second_lines: Vec<&str> = second.transcript().collect();
    assert_eq!(first_lines, second_lines);
}
