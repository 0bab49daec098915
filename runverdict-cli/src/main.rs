//! runverdict CLI - コマンドラインインターフェース
//!
//! テスト実行後のクラッシュダンプとリークログを検査し、終了ステータスで結果を返します。

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use runverdict_core::{
    dump_leak_log, CrashScanner, DebuggerError, DebuggerInfo, DebuggerResolver, LeakLogClassifier,
    OutcomeChecker,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// runverdict - Native test run verdicts
#[derive(Parser)]
#[command(name = "runverdict")]
#[command(version = "0.1.0")]
#[command(about = "Decide whether a native test run passed from its crash dumps and leak logs", long_about = None)]
struct Cli {
    #[command(flatten)]
    common: CommonOptions,

    #[command(subcommand)]
    command: VerdictCommand,
}

/// ハーネス共通のオプション
#[derive(Args, Debug, Clone)]
struct CommonOptions {
    /// Absolute path to directory containing breakpad symbols
    #[arg(long, global = true, env = "SYMBOLS_PATH")]
    symbols_path: Option<PathBuf>,

    /// Use the given debugger to launch the application
    #[arg(long, global = true)]
    debugger: Option<String>,

    /// Pass the given args to the debugger _before_ the application on the command line
    #[arg(long, global = true, allow_hyphen_values = true)]
    debugger_args: Option<String>,

    /// Prevents the test harness from redirecting stdout and stderr for interactive debuggers
    #[arg(long, global = true)]
    debugger_interactive: bool,
}

impl CommonOptions {
    fn symbols_path(&self) -> Option<&Path> {
        self.symbols_path
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty())
    }
}

#[derive(Subcommand)]
enum VerdictCommand {
    /// Parse a refcount leak log and report PASS/FAIL
    Leak {
        /// Path to the leak log
        #[arg(env = "XPCOM_MEM_BLOAT_LOG")]
        path: PathBuf,

        /// Leaked bytes tolerated as a warning
        #[arg(short, long, default_value_t = 0)]
        threshold: i64,
    },

    /// Copy a leak log to the output without parsing it
    DumpLeak {
        /// Path to the leak log
        #[arg(env = "XPCOM_MEM_LEAK_LOG")]
        path: PathBuf,

        /// Only print the log when it reports a total line
        #[arg(short, long)]
        filter: bool,
    },

    /// Look for crash dumps, symbolicate and remove them
    Crashes {
        /// Directory containing minidumps
        dump_dir: PathBuf,

        /// Test name used in the failure message
        #[arg(short = 'n', long)]
        test_name: Option<String>,
    },

    /// Resolve the debugger launch command line
    Debugger {
        /// Directory used to resolve relative debugger paths
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,

        /// Application to launch under the debugger
        app: Option<PathBuf>,

        /// Arguments to pass to the application
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Check crash dumps and, if given, the leak log of one test
    Check {
        /// Directory containing minidumps
        dump_dir: PathBuf,

        /// Path to the leak log
        #[arg(short, long, env = "XPCOM_MEM_BLOAT_LOG")]
        leak_log: Option<PathBuf>,

        /// Leaked bytes tolerated as a warning
        #[arg(short, long, default_value_t = 0)]
        threshold: i64,

        /// Test name used in the failure message
        #[arg(short = 'n', long)]
        test_name: Option<String>,
    },
}

fn main() -> Result<ExitCode> {
    init_logging();

    let cli = Cli::parse();
    let passed = run(&cli.common, cli.command)?;

    Ok(if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// 診断メッセージがそのまま1行ずつ出力されるようにログを初期化する
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .without_time()
        .with_level(false)
        .with_target(false)
        .init();
}

/// サブコマンドを実行し、成功したかどうかを返す
fn run(common: &CommonOptions, command: VerdictCommand) -> Result<bool> {
    match command {
        VerdictCommand::Leak { path, threshold } => handle_leak(&path, threshold),
        VerdictCommand::DumpLeak { path, filter } => {
            dump_leak_log(&path, filter)?;
            Ok(true)
        }
        VerdictCommand::Crashes {
            dump_dir,
            test_name,
        } => Ok(handle_crashes(common, &dump_dir, test_name.as_deref())),
        VerdictCommand::Debugger { dir, app, args } => handle_debugger(common, &dir, app, &args),
        VerdictCommand::Check {
            dump_dir,
            leak_log,
            threshold,
            test_name,
        } => {
            let checker =
                OutcomeChecker::new(CrashScanner::from_env(), LeakLogClassifier::new(threshold)?);
            let outcome = checker.check(
                &dump_dir,
                common.symbols_path(),
                test_name.as_deref(),
                leak_log.as_deref(),
            )?;
            Ok(outcome.passed())
        }
    }
}

/// Leakコマンドを処理する
fn handle_leak(path: &Path, threshold: i64) -> Result<bool> {
    let classifier = LeakLogClassifier::new(threshold)?;
    let report = classifier.classify(path)?;
    Ok(!report.has_failures())
}

/// Crashesコマンドを処理する
fn handle_crashes(common: &CommonOptions, dump_dir: &Path, test_name: Option<&str>) -> bool {
    let scanner = CrashScanner::from_env();
    !scanner.scan(dump_dir, common.symbols_path(), test_name)
}

/// Debuggerコマンドを処理する
fn handle_debugger(
    common: &CommonOptions,
    dir: &Path,
    app: Option<PathBuf>,
    args: &[String],
) -> Result<bool> {
    let resolver = DebuggerResolver::from_env();
    let interactive = common.debugger_interactive.then_some(true);

    let info = match resolver.resolve(
        dir,
        common.debugger.as_deref(),
        common.debugger_args.as_deref(),
        interactive,
    ) {
        Ok(info) => info,
        Err(e @ DebuggerError::NotFound(_)) => {
            println!("{}", debugger_error_line(&e));
            return Ok(false);
        }
    };

    debug!("resolved debugger: {:?}", info);
    match info {
        Some(info) => print_debugger(&info, app.as_deref(), args),
        None => println!("No debugger requested"),
    }

    Ok(true)
}

/// 解決に失敗したデバッガの報告行
///
/// ログの収集側が拾えるよう標準出力に出します。
fn debugger_error_line(e: &DebuggerError) -> String {
    format!("Error: {}", e)
}

fn print_debugger(info: &DebuggerInfo, app: Option<&Path>, args: &[String]) {
    println!("Debugger: {}", info.path.display());
    println!("Interactive: {}", info.interactive);

    let argv = match app {
        Some(app) => info.command_line(app, args),
        None => {
            let mut argv = vec![info.path.clone().into_os_string()];
            argv.extend(info.args.iter().map(Into::into));
            argv
        }
    };
    let line: Vec<String> = argv
        .iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    println!("Command: {}", line.join(" "));
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_debugger_options() {
        let cli = Cli::try_parse_from([
            "runverdict",
            "--debugger",
            "gdb",
            "--debugger-args",
            "-q --args",
            "--debugger-interactive",
            "debugger",
            "./app",
            "--flag",
        ])
        .unwrap();

        assert_eq!(cli.common.debugger.as_deref(), Some("gdb"));
        assert_eq!(cli.common.debugger_args.as_deref(), Some("-q --args"));
        assert!(cli.common.debugger_interactive);
        match cli.command {
            VerdictCommand::Debugger { app, args, .. } => {
                assert_eq!(app, Some(PathBuf::from("./app")));
                assert_eq!(args, vec!["--flag".to_string()]);
            }
            _ => panic!("expected debugger subcommand"),
        }
    }

    #[test]
    fn test_debugger_error_line() {
        let e = DebuggerError::NotFound("/opt/no-such-gdb".to_string());
        assert_eq!(
            debugger_error_line(&e),
            "Error: Path /opt/no-such-gdb doesn't exist."
        );
    }

    #[test]
    fn test_parse_check_command() {
        let cli = Cli::try_parse_from([
            "runverdict",
            "check",
            "/tmp/dumps",
            "--leak-log",
            "/tmp/bloat.log",
            "--threshold",
            "1024",
            "--symbols-path",
            "/tmp/symbols",
        ])
        .unwrap();

        assert_eq!(cli.common.symbols_path(), Some(Path::new("/tmp/symbols")));
        match cli.command {
            VerdictCommand::Check {
                dump_dir,
                leak_log,
                threshold,
                test_name,
            } => {
                assert_eq!(dump_dir, PathBuf::from("/tmp/dumps"));
                assert_eq!(leak_log, Some(PathBuf::from("/tmp/bloat.log")));
                assert_eq!(threshold, 1024);
                assert!(test_name.is_none());
            }
            _ => panic!("expected check subcommand"),
        }
    }
}
