// src/dag/scheduler.rs

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::model::{CommandFile, CommandSpec};
use crate::dag::gate::ExclusivityGate;
use crate::dag::graph::DirectedGraph;
use crate::errors::CommandError;
use crate::exec::process::{
    ArgvCommandConfig, ProcessRunner, RunConfig, ShellCommandConfig,
};

/// Configuration threaded through one `execute` call. No state outside of
/// this value and the run-local synchronization objects is shared.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecuteConfig {
    pub aggregate_output: bool,
    pub continue_on_error: bool,
    pub no_color: bool,
    pub no_shell: bool,
}

/// Execute `target` and the transitive closure of its `needs` edges.
///
/// One task is launched per reachable node. Each node owns a single-use
/// completion token; a node starts only after every dependency's token is
/// signaled, runs under the exclusivity gate, and signals its own token
/// exactly once when its command has finished — success or failure alike,
/// so dependents of a failed node still proceed (see the failure test for
/// the intended semantics). Graph configuration errors are raised before
/// any process is spawned.
///
/// `cancel` aborts the whole run cooperatively; it also fires internally on
/// the first node failure unless `continue_on_error` is set.
pub async fn execute(
    file: &CommandFile,
    target: &str,
    cancel: &CancellationToken,
    cfg: ExecuteConfig,
) -> Result<()> {
    let graph = build_graph(file)?;
    let nodes = graph.reachable_from(target)?;

    info!(target, nodes = nodes.len(), "executing command graph");

    // One single-writer/many-reader completion token per node.
    let mut signals: HashMap<String, watch::Sender<bool>> = HashMap::new();
    let mut watchers: HashMap<String, watch::Receiver<bool>> = HashMap::new();
    for node in &nodes {
        let (tx, rx) = watch::channel(false);
        signals.insert(node.clone(), tx);
        watchers.insert(node.clone(), rx);
    }

    let gate = Arc::new(ExclusivityGate::new());
    let shared = cancel.child_token();

    let mut set = JoinSet::new();
    for node in nodes {
        let spec = file
            .commands
            .get(&node)
            .cloned()
            .ok_or_else(|| anyhow!("command not found: {node}"))?;

        let deps: Vec<watch::Receiver<bool>> = graph
            .dependencies_of(&node)
            .iter()
            .map(|dep| watchers[dep].clone())
            .collect();

        let token = signals
            .remove(&node)
            .ok_or_else(|| anyhow!("missing completion token for {node}"))?;

        let gate = Arc::clone(&gate);
        let shared = shared.clone();

        set.spawn(async move {
            run_node(node, spec, deps, token, gate, shared, cfg).await
        });
    }

    let mut first_error = None;
    while let Some(joined) = set.join_next().await {
        let result = joined.context("joining node task")?;
        if let Err(err) = result {
            if first_error.is_none() {
                first_error = Some(err);
            }
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Build the dependency graph from the command map, validating that every
/// `needs` entry names a declared command.
fn build_graph(file: &CommandFile) -> Result<DirectedGraph> {
    let mut graph = DirectedGraph::new();

    for name in file.commands.keys() {
        graph.add_node(name.clone());
    }

    for (name, spec) in &file.commands {
        for need in &spec.needs {
            graph
                .add_edge(name, need)
                .with_context(|| format!("adding edge for command {name:?}"))?;
        }
    }

    Ok(graph)
}

/// Drive one node: wait for dependencies, pass the exclusivity gate, run
/// the command (or its watch-restart loop), and signal the node's token.
async fn run_node(
    name: String,
    spec: CommandSpec,
    mut deps: Vec<watch::Receiver<bool>>,
    token: watch::Sender<bool>,
    gate: Arc<ExclusivityGate>,
    cancel: CancellationToken,
    cfg: ExecuteConfig,
) -> Result<()> {
    for dep in &mut deps {
        // A sender dropped without signaling means the owning task is gone;
        // either way the dependency is no longer running.
        let _ = dep.wait_for(|done| *done).await;
    }

    // A command with no `run` only aggregates its dependencies.
    if spec.run.is_empty() {
        let _ = token.send(true);
        return Ok(());
    }

    let pass = gate.enter(spec.exclusive).await;
    debug!(command = %name, exclusive = spec.exclusive, "starting");

    let result = if spec.watch.is_empty() {
        let result = run_command(&name, &spec, &cancel, &cfg).await;
        let _ = token.send(true);
        result
    } else {
        run_watched(&name, &spec, &token, &cancel, &cfg).await
    };
    drop(pass);

    if let Err(err) = result {
        if !cfg.continue_on_error {
            cancel.cancel();
        }
        return Err(anyhow!(err).context(format!("running command: {name}")));
    }

    Ok(())
}

/// Run the node's command once.
async fn run_command(
    name: &str,
    spec: &CommandSpec,
    cancel: &CancellationToken,
    cfg: &ExecuteConfig,
) -> Result<(), CommandError> {
    let mut runner = build_runner(name, spec, cfg)?;

    let conf = RunConfig {
        aggregate_output: cfg.aggregate_output,
        kill_on_cancel: !cfg.continue_on_error,
    };

    let result = runner.run(cancel, conf).await;

    // Aggregated output is printed as one contiguous block per command, as
    // soon as the command finishes.
    if cfg.aggregate_output {
        print!("{}", runner.output());
    }

    result
}

/// Watch-restart loop: run the command, then re-run it whenever one of its
/// watch paths changes, until the run-wide cancellation fires.
///
/// The node's completion token is signaled once, at the first completion,
/// while the loop keeps restarting in the background. A restart does not
/// re-trigger dependents.
async fn run_watched(
    name: &str,
    spec: &CommandSpec,
    token: &watch::Sender<bool>,
    cancel: &CancellationToken,
    cfg: &ExecuteConfig,
) -> Result<(), CommandError> {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let _watcher = match crate::watch::spawn_path_watcher(&spec.watch, event_tx) {
        Ok(handle) => handle,
        Err(err) => {
            let _ = token.send(true);
            warn!(command = %name, error = %err, "failed to arm file watcher");
            return Err(CommandError::Spawn(std::io::Error::other(err)));
        }
    };

    let mut signaled = false;

    loop {
        let run_cancel = cancel.child_token();
        let mut runner = build_runner(name, spec, cfg)?;
        let conf = RunConfig {
            aggregate_output: cfg.aggregate_output,
            kill_on_cancel: true,
        };

        let result = {
            let run = runner.run(&run_cancel, conf);
            tokio::pin!(run);

            loop {
                tokio::select! {
                    result = &mut run => break result,
                    event = event_rx.recv() => {
                        if event.is_some() {
                            info!(command = %name, "watch event; restarting command");
                            run_cancel.cancel();
                        }
                    }
                }
            }
        };

        if cfg.aggregate_output {
            print!("{}", runner.output());
        }

        if !signaled {
            let _ = token.send(true);
            signaled = true;
        }

        if cancel.is_cancelled() {
            // Terminated from outside; the kill-induced exit status is not
            // this node's failure.
            return Ok(());
        }

        match result {
            // Killed by a watch event: restart immediately.
            Ok(()) | Err(CommandError::NonZeroExit { .. }) if run_cancel.is_cancelled() => {
                continue;
            }
            // A spontaneous exit parks the node until the next change.
            Ok(()) | Err(CommandError::NonZeroExit { .. }) => {
                tokio::select! {
                    _ = cancel.cancelled() => return Ok(()),
                    event = event_rx.recv() => {
                        if event.is_none() {
                            return Ok(());
                        }
                        info!(command = %name, "watch event; restarting command");
                    }
                }
            }
            // Spawn/stream failures are operational; stop looping.
            Err(err) => return Err(err),
        }
    }
}

fn build_runner(
    name: &str,
    spec: &CommandSpec,
    cfg: &ExecuteConfig,
) -> Result<ProcessRunner, CommandError> {
    if cfg.no_shell {
        let parts = shell_words::split(&spec.run).map_err(|err| {
            CommandError::Spawn(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                err,
            ))
        })?;
        let Some((program, args)) = parts.split_first() else {
            return Err(CommandError::Spawn(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "empty command",
            )));
        };

        Ok(ProcessRunner::argv(ArgvCommandConfig {
            program: program.clone(),
            args: args.to_vec(),
            label: name.to_string(),
            no_color: cfg.no_color,
            ..Default::default()
        }))
    } else {
        Ok(ProcessRunner::shell(ShellCommandConfig {
            command: spec.run.clone(),
            label: name.to_string(),
            no_color: cfg.no_color,
            ..Default::default()
        }))
    }
}
