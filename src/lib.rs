// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod watch;

use std::path::Path;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cli::{Cli, Command, ExecArgs, ProcArgs, RunArgs, RunMode};
use crate::errors::LabelCountMismatch;
use crate::exec::group::{self, GroupConfig, GroupRun};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - flag handling and command/label collection
/// - droverfile / Procfile / env-file loading
/// - the group runner or the graph scheduler
/// - Ctrl-C handling
pub async fn run(args: Cli) -> Result<()> {
    let cancel = CancellationToken::new();
    spawn_ctrl_c_handler(cancel.clone());

    match args.command {
        Command::Run { mode } => match mode {
            RunMode::Concurrently {
                args,
                aggregate_output,
            } => run_flat(&cancel, args, aggregate_output, false).await,
            RunMode::Serially { args } => run_flat(&cancel, args, false, true).await,
        },
        Command::Exec(args) => run_exec(&cancel, args).await,
        Command::Proc(args) => run_proc(&cancel, args).await,
    }
}

/// Ctrl-C → cancel the shared token, terminating all running commands.
fn spawn_ctrl_c_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {err}");
            return;
        }
        debug!("interrupt received; canceling run");
        cancel.cancel();
    });
}

/// `drover run concurrently|serially ...`
async fn run_flat(
    cancel: &CancellationToken,
    args: RunArgs,
    aggregate_output: bool,
    serial: bool,
) -> Result<()> {
    if let Some(dir) = &args.working_directory {
        std::env::set_current_dir(dir)
            .with_context(|| format!("changing working directory to {dir:?}"))?;
    }

    let (commands, display) = collect_commands(&args.commands, &args.npm)?;
    let labels = collect_labels(
        &display,
        &args.names,
        args.command_as_label,
        args.no_label,
    )?;

    let cfg = GroupConfig {
        commands,
        labels,
        env: Vec::new(),
        omit_env: false,
        aggregate_output,
        continue_on_error: args.continue_on_error,
        no_color: args.no_color,
        no_shell: args.no_shell,
    };

    let run = if serial {
        group::run_serially(cancel, cfg).await?
    } else {
        group::run_concurrently(cancel, cfg).await?
    };

    finish_group_run(run, aggregate_output)
}

/// `drover exec <target>`
async fn run_exec(cancel: &CancellationToken, args: ExecArgs) -> Result<()> {
    if let Some(dir) = &args.working_directory {
        std::env::set_current_dir(dir)
            .with_context(|| format!("changing working directory to {dir:?}"))?;
    }

    let path = config::find_command_file(args.file.as_deref())?;
    let file = config::load_command_file(&path)?;

    dag::execute(
        &file,
        &args.target,
        cancel,
        dag::ExecuteConfig {
            aggregate_output: args.aggregate_output,
            continue_on_error: args.continue_on_error,
            no_color: args.no_color,
            no_shell: args.no_shell,
        },
    )
    .await
    .with_context(|| format!("executing command: {}", args.target))
}

/// `drover proc`
async fn run_proc(cancel: &CancellationToken, args: ProcArgs) -> Result<()> {
    if let Some(dir) = &args.working_directory {
        std::env::set_current_dir(dir)
            .with_context(|| format!("changing working directory to {dir:?}"))?;
    }

    let contents = std::fs::read_to_string(&args.procfile)
        .with_context(|| format!("reading Procfile at {:?}", args.procfile))?;
    let entries = config::parse_procfile(&contents)?;

    let env = if args.no_env_file {
        Vec::new()
    } else {
        std::fs::read_to_string(&args.env_file)
            .with_context(|| format!("reading env file at {:?}", args.env_file))?
            .lines()
            .map(str::to_string)
            .collect()
    };

    let mut commands = Vec::with_capacity(entries.len());
    let mut labels = Vec::with_capacity(entries.len());
    for (label, command) in entries {
        commands.push(command);
        labels.push(if args.no_label { String::new() } else { label });
    }
    if !args.no_label {
        pad_labels(&mut labels);
    }

    let cfg = GroupConfig {
        commands,
        labels,
        env,
        omit_env: args.omit_env,
        aggregate_output: false,
        continue_on_error: args.continue_on_error,
        no_color: args.no_color,
        no_shell: args.no_shell,
    };

    let run = group::run_concurrently(cancel, cfg).await?;
    finish_group_run(run, false)
}

/// Print aggregated buffers (input order) and surface the first error.
fn finish_group_run(run: GroupRun, aggregate_output: bool) -> Result<()> {
    if aggregate_output {
        for runner in &run.runners {
            print!("{}", runner.output());
        }
    }

    match run.first_error {
        Some(err) => Err(err).context("running commands"),
        None => Ok(()),
    }
}

/// Combine explicit command arguments with expanded npm script references.
/// Returns the command strings plus the display strings labels derive from.
fn collect_commands(
    args: &[String],
    npm_refs: &[String],
) -> Result<(Vec<String>, Vec<String>)> {
    let mut commands: Vec<String> = args.to_vec();
    let mut display: Vec<String> = args.to_vec();

    for (name, command) in config::expand_script_refs(npm_refs, Path::new("."))? {
        commands.push(command);
        display.push(name);
    }

    Ok((commands, display))
}

/// Resolve one label per command: explicit names, the command string, or
/// the list index. Labels are padded with trailing spaces so prefixes align.
fn collect_labels(
    display: &[String],
    names: &[String],
    command_as_label: bool,
    no_label: bool,
) -> Result<Vec<String>> {
    if no_label {
        return Ok(vec![String::new(); display.len()]);
    }

    if !names.is_empty() && names.len() != display.len() {
        return Err(LabelCountMismatch {
            labels: names.len(),
            commands: display.len(),
        }
        .into());
    }

    let mut labels: Vec<String> = if command_as_label {
        display.to_vec()
    } else if !names.is_empty() {
        names.to_vec()
    } else {
        (0..display.len()).map(|i| i.to_string()).collect()
    };

    pad_labels(&mut labels);
    Ok(labels)
}

fn pad_labels(labels: &mut [String]) {
    let width = labels.iter().map(|l| l.len()).max().unwrap_or(0);
    for label in labels {
        while label.len() < width {
            label.push(' ');
        }
    }
}
