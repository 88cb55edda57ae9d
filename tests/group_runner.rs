use std::error::Error;
use std::fs;
use std::time::{Duration, Instant};

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use drover::errors::{CommandError, LabelCountMismatch};
use drover::exec::group::{GroupConfig, GroupRun, run_concurrently, run_serially};
use drover::exec::process::prefix;

type TestResult = Result<(), Box<dyn Error>>;

fn config(commands: &[&str], labels: &[&str]) -> GroupConfig {
    GroupConfig {
        commands: commands.iter().map(|s| s.to_string()).collect(),
        labels: labels.iter().map(|s| s.to_string()).collect(),
        no_color: true,
        ..Default::default()
    }
}

fn combined_output(run: &GroupRun) -> String {
    run.runners.iter().map(|r| r.output()).collect()
}

#[tokio::test]
async fn aggregate_output_is_printed_in_input_order() -> TestResult {
    let cancel = CancellationToken::new();
    let mut cfg = config(&["sleep 0.2; echo a", "echo b", "echo c"], &["0", "1", "2"]);
    cfg.aggregate_output = true;

    let run = run_concurrently(&cancel, cfg).await?;

    assert!(run.success());
    assert_eq!(combined_output(&run), "[0] a\n[1] b\n[2] c\n");

    Ok(())
}

#[tokio::test]
async fn label_count_mismatch_spawns_nothing() -> TestResult {
    let dir = TempDir::new()?;
    let marker = dir.path().join("marker");

    let cancel = CancellationToken::new();
    let cfg = config(
        &["echo a", "echo b", &format!("touch {}", marker.display())],
        &["one", "two"],
    );

    let err = run_concurrently(&cancel, cfg)
        .await
        .expect_err("two labels for three commands must fail validation");

    assert_eq!(
        err.downcast_ref::<LabelCountMismatch>(),
        Some(&LabelCountMismatch {
            labels: 2,
            commands: 3
        })
    );
    assert!(!marker.exists(), "validation failure must not spawn processes");

    Ok(())
}

#[tokio::test]
async fn first_failure_terminates_running_siblings() -> TestResult {
    let dir = TempDir::new()?;
    let log = dir.path().join("log");

    let cancel = CancellationToken::new();
    let cfg = config(
        &["exit 1", &format!("sleep 5 && echo done >> {}", log.display())],
        &["bad", "slow"],
    );

    let started = Instant::now();
    let run = run_concurrently(&cancel, cfg).await?;

    assert!(matches!(
        run.first_error,
        Some(CommandError::NonZeroExit { .. })
    ));
    assert!(
        started.elapsed() < Duration::from_secs(4),
        "the sibling must be terminated within a bounded delay"
    );
    assert!(!log.exists(), "the terminated sibling must not complete");

    Ok(())
}

#[tokio::test]
async fn continue_on_error_lets_all_commands_finish() -> TestResult {
    let dir = TempDir::new()?;
    let log = dir.path().join("log");

    let cancel = CancellationToken::new();
    let mut cfg = config(
        &["exit 1", &format!("sleep 0.2; echo ok >> {}", log.display())],
        &["bad", "good"],
    );
    cfg.continue_on_error = true;

    let run = run_concurrently(&cancel, cfg).await?;

    assert!(matches!(
        run.first_error,
        Some(CommandError::NonZeroExit { .. })
    ));
    assert_eq!(fs::read_to_string(&log)?, "ok\n");

    Ok(())
}

#[tokio::test]
async fn serial_mode_runs_in_list_order() -> TestResult {
    let dir = TempDir::new()?;
    let log = dir.path().join("log");

    let mark = |n: &str| format!("echo {n} >> {}", log.display());
    let cancel = CancellationToken::new();
    let cfg = config(
        &[&mark("first"), &mark("second"), &mark("third")],
        &["0", "1", "2"],
    );

    let run = run_serially(&cancel, cfg).await?;

    assert!(run.success());
    assert_eq!(fs::read_to_string(&log)?, "first\nsecond\nthird\n");

    Ok(())
}

#[tokio::test]
async fn serial_mode_aborts_after_a_failure() -> TestResult {
    let dir = TempDir::new()?;
    let log = dir.path().join("log");

    let mark = |n: &str| format!("echo {n} >> {}", log.display());
    let cancel = CancellationToken::new();
    let cfg = config(&[&mark("one"), "exit 1", &mark("three")], &["0", "1", "2"]);

    let run = run_serially(&cancel, cfg).await?;

    assert!(matches!(
        run.first_error,
        Some(CommandError::NonZeroExit { .. })
    ));
    assert_eq!(fs::read_to_string(&log)?, "one\n", "later commands must not run");

    Ok(())
}

#[tokio::test]
async fn serial_continue_on_error_runs_the_rest() -> TestResult {
    let dir = TempDir::new()?;
    let log = dir.path().join("log");

    let mark = |n: &str| format!("echo {n} >> {}", log.display());
    let cancel = CancellationToken::new();
    let mut cfg = config(&[&mark("one"), "exit 1", &mark("three")], &["0", "1", "2"]);
    cfg.continue_on_error = true;

    let run = run_serially(&cancel, cfg).await?;

    assert!(matches!(
        run.first_error,
        Some(CommandError::NonZeroExit { .. })
    ));
    assert_eq!(fs::read_to_string(&log)?, "one\nthree\n");

    Ok(())
}

#[tokio::test]
async fn no_shell_mode_runs_the_argv_directly() -> TestResult {
    let cancel = CancellationToken::new();
    let mut cfg = config(&["echo hello"], &["0"]);
    cfg.no_shell = true;
    cfg.aggregate_output = true;

    let run = run_concurrently(&cancel, cfg).await?;

    assert!(run.success());
    assert_eq!(combined_output(&run), "[0] hello\n");

    Ok(())
}

#[tokio::test]
async fn missing_executable_is_a_spawn_failure() -> TestResult {
    let cancel = CancellationToken::new();
    let mut cfg = config(&["drover-test-no-such-binary"], &["0"]);
    cfg.no_shell = true;

    let run = run_concurrently(&cancel, cfg).await?;

    assert!(matches!(run.first_error, Some(CommandError::Spawn(_))));

    Ok(())
}

#[tokio::test]
async fn later_env_entry_wins_for_the_same_key() -> TestResult {
    let cancel = CancellationToken::new();
    let mut cfg = config(&["echo $DROVER_GREETING"], &["0"]);
    cfg.env = vec![
        "DROVER_GREETING=first".to_string(),
        "DROVER_GREETING=second".to_string(),
    ];
    cfg.aggregate_output = true;

    let run = run_concurrently(&cancel, cfg).await?;

    assert!(run.success());
    assert_eq!(combined_output(&run), "[0] second\n");

    Ok(())
}

#[tokio::test]
async fn empty_label_emits_no_prefix() -> TestResult {
    let cancel = CancellationToken::new();
    let mut cfg = config(&["echo bare"], &[""]);
    cfg.aggregate_output = true;

    let run = run_concurrently(&cancel, cfg).await?;

    assert!(run.success());
    assert_eq!(combined_output(&run), "bare\n");

    Ok(())
}

#[test]
fn prefix_formatting() {
    assert_eq!(prefix("web", true), "[web] ");
    assert_eq!(prefix("", true), "");
    assert_eq!(prefix("", false), "");

    let colored = prefix("web", false);
    assert!(colored.contains("[web]"));
    assert!(colored.contains('\u{1b}'), "colored prefix uses ANSI escapes");
}

#[tokio::test]
async fn stderr_is_merged_into_labeled_output() -> TestResult {
    let cancel = CancellationToken::new();
    let mut cfg = config(&["echo oops >&2"], &["err"]);
    cfg.aggregate_output = true;

    let run = run_concurrently(&cancel, cfg).await?;

    assert!(run.success());
    assert_eq!(combined_output(&run), "[err] oops\n");

    Ok(())
}
