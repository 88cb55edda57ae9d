// src/exec/group.rs

use anyhow::{Context, Result};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::procfile::parse_env_lines;
use crate::errors::{CommandError, LabelCountMismatch};
use crate::exec::process::{
    ArgvCommandConfig, ProcessRunner, RunConfig, ShellCommandConfig,
};

/// Configuration for one flat group run: parallel lists of command strings
/// and labels, plus shared flags.
#[derive(Debug, Clone, Default)]
pub struct GroupConfig {
    pub commands: Vec<String>,
    pub labels: Vec<String>,
    pub env: Vec<String>,
    pub omit_env: bool,
    pub aggregate_output: bool,
    pub continue_on_error: bool,
    pub no_color: bool,
    pub no_shell: bool,
}

/// Result of a group run. The runners come back in input order so callers
/// can print aggregated buffers deterministically; `first_error` is the
/// first command failure observed, if any.
#[derive(Debug)]
pub struct GroupRun {
    pub runners: Vec<ProcessRunner>,
    pub first_error: Option<CommandError>,
}

impl GroupRun {
    /// True when every command completed successfully.
    pub fn success(&self) -> bool {
        self.first_error.is_none()
    }
}

/// Run all commands concurrently under one shared cancellation.
///
/// On the first failure, unless `continue_on_error` is set, the shared
/// cancellation fires: running siblings receive a termination signal and
/// commands that have not started yet are skipped. Validation errors
/// (label count, argv parsing, env parsing) abort before any spawn.
pub async fn run_concurrently(
    cancel: &CancellationToken,
    cfg: GroupConfig,
) -> Result<GroupRun> {
    let runners = build_runners(&cfg)?;
    let shared = cancel.child_token();

    let mut set = JoinSet::new();
    for (index, mut runner) in runners.into_iter().enumerate() {
        let shared = shared.clone();
        let conf = RunConfig {
            aggregate_output: cfg.aggregate_output,
            kill_on_cancel: !cfg.continue_on_error,
        };
        let continue_on_error = cfg.continue_on_error;

        set.spawn(async move {
            // A sibling may already have failed; don't start late commands
            // into a canceled run.
            if !continue_on_error && shared.is_cancelled() {
                debug!(index, "group already canceled; not starting command");
                return (index, runner, Ok(()));
            }

            let result = runner.run(&shared, conf).await;
            (index, runner, result)
        });
    }

    let mut slots: Vec<Option<ProcessRunner>> =
        std::iter::repeat_with(|| None).take(cfg.commands.len()).collect();
    let mut first_error = None;

    while let Some(joined) = set.join_next().await {
        let (index, runner, result) = joined.context("joining command task")?;

        if let Err(err) = result {
            if !cfg.continue_on_error {
                shared.cancel();
            }
            if first_error.is_none() {
                first_error = Some(err);
            }
        }

        slots[index] = Some(runner);
    }

    Ok(GroupRun {
        runners: slots.into_iter().flatten().collect(),
        first_error,
    })
}

/// Run commands one at a time, in list order.
///
/// There is no cancellation fan-out: a failing command simply aborts the
/// remaining ones, unless `continue_on_error` is set, in which case they
/// all run and the first error is surfaced at the end.
pub async fn run_serially(
    cancel: &CancellationToken,
    cfg: GroupConfig,
) -> Result<GroupRun> {
    let runners = build_runners(&cfg)?;

    let mut finished = Vec::with_capacity(runners.len());
    let mut first_error: Option<CommandError> = None;

    let mut pending = runners.into_iter();
    for mut runner in pending.by_ref() {
        let conf = RunConfig {
            aggregate_output: cfg.aggregate_output,
            kill_on_cancel: true,
        };

        let result = runner.run(cancel, conf).await;
        let failed = result.is_err();

        if let Err(err) = result {
            if first_error.is_none() {
                first_error = Some(err);
            }
        }
        finished.push(runner);

        if failed && !cfg.continue_on_error {
            break;
        }
    }
    // Commands after an aborting failure never ran; keep their runners so
    // the output slots still line up with the input order.
    finished.extend(pending);

    Ok(GroupRun {
        runners: finished,
        first_error,
    })
}

/// Validate the group configuration and construct one runner per command.
fn build_runners(cfg: &GroupConfig) -> Result<Vec<ProcessRunner>> {
    if cfg.labels.len() != cfg.commands.len() {
        return Err(LabelCountMismatch {
            labels: cfg.labels.len(),
            commands: cfg.commands.len(),
        }
        .into());
    }

    let env = parse_env_lines(&cfg.env).context("parsing env")?;

    let mut runners = Vec::with_capacity(cfg.commands.len());
    for (command, label) in cfg.commands.iter().zip(&cfg.labels) {
        let runner = if cfg.no_shell {
            let parts = shell_words::split(command)
                .with_context(|| format!("parsing command: {command:?}"))?;
            let (program, args) = parts
                .split_first()
                .with_context(|| format!("empty command: {command:?}"))?;

            ProcessRunner::argv(ArgvCommandConfig {
                program: program.clone(),
                args: args.to_vec(),
                label: label.clone(),
                no_color: cfg.no_color,
                env: env.clone(),
                omit_env: cfg.omit_env,
            })
        } else {
            ProcessRunner::shell(ShellCommandConfig {
                command: command.clone(),
                label: label.clone(),
                no_color: cfg.no_color,
                env: env.clone(),
                omit_env: cfg.omit_env,
            })
        };

        runners.push(runner);
    }

    Ok(runners)
}
