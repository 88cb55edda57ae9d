// src/exec/process.rs

use std::hash::{Hash, Hasher};
use std::process::Stdio;

use owo_colors::{AnsiColors, OwoColorize};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::errors::CommandError;

/// Configuration for one `run` call.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunConfig {
    /// Buffer output instead of printing it live. The caller decides when
    /// to print the buffer via [`ProcessRunner::output`].
    pub aggregate_output: bool,
    /// Send the process a termination signal when the cancellation token
    /// fires.
    pub kill_on_cancel: bool,
}

/// A command run through the shell (`sh -c`).
#[derive(Debug, Clone, Default)]
pub struct ShellCommandConfig {
    pub command: String,
    pub label: String,
    pub no_color: bool,
    pub env: Vec<String>,
    pub omit_env: bool,
}

/// A command run directly from an argv list, without a shell.
#[derive(Debug, Clone, Default)]
pub struct ArgvCommandConfig {
    pub program: String,
    pub args: Vec<String>,
    pub label: String,
    pub no_color: bool,
    pub env: Vec<String>,
    pub omit_env: bool,
}

/// Owns one OS process per `run` call: spawning, output pumping, labeled
/// line formatting, and signal-based cancellation.
pub struct ProcessRunner {
    cmd: Command,
    prefix: String,
    out: String,
}

impl ProcessRunner {
    /// Build a runner that executes `conf.command` in a subshell.
    pub fn shell(conf: ShellCommandConfig) -> Self {
        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&conf.command);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&conf.command);
            c
        };
        apply_env(&mut cmd, &conf.env, conf.omit_env);

        Self {
            cmd,
            prefix: prefix(&conf.label, conf.no_color),
            out: String::new(),
        }
    }

    /// Build a runner that executes an argv list directly.
    pub fn argv(conf: ArgvCommandConfig) -> Self {
        let mut cmd = Command::new(&conf.program);
        cmd.args(&conf.args);
        apply_env(&mut cmd, &conf.env, conf.omit_env);

        Self {
            cmd,
            prefix: prefix(&conf.label, conf.no_color),
            out: String::new(),
        }
    }

    /// Output accumulated by an aggregated run, formatted lines included.
    pub fn output(&self) -> &str {
        &self.out
    }

    /// Run the process to completion.
    ///
    /// stdout and stderr are merged into one line channel; a dispatch loop
    /// prints (or buffers) each line under the runner's prefix. If `cancel`
    /// fires and `kill_on_cancel` is set, the process is sent SIGTERM and
    /// dispatch stops, but the channel is still drained to end-of-stream:
    /// the process must not be waited on before its pipes are fully read,
    /// or a full pipe buffer can deadlock the child.
    pub async fn run(
        &mut self,
        cancel: &CancellationToken,
        conf: RunConfig,
    ) -> Result<(), CommandError> {
        self.cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

        // Each command leads its own process group, so termination reaches
        // grandchildren too; otherwise an orphan would keep the output
        // pipes open past the shell's death.
        #[cfg(unix)]
        self.cmd.process_group(0);

        let mut child = self.cmd.spawn().map_err(CommandError::Spawn)?;

        let (line_tx, mut line_rx) = mpsc::channel::<std::io::Result<String>>(64);
        if let Some(stdout) = child.stdout.take() {
            pump_lines(stdout, line_tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            pump_lines(stderr, line_tx.clone());
        }
        // Once both pumps finish, the channel closes and the loop exits.
        drop(line_tx);

        let mut stream_err: Option<std::io::Error> = None;
        let mut terminated = false;

        loop {
            tokio::select! {
                line = line_rx.recv() => match line {
                    Some(Ok(text)) => {
                        if terminated {
                            continue;
                        }
                        let line = format!("{}{}\n", self.prefix, text);
                        if conf.aggregate_output {
                            self.out.push_str(&line);
                        } else {
                            print!("{line}");
                        }
                    }
                    Some(Err(err)) => {
                        if stream_err.is_none() {
                            stream_err = Some(err);
                        }
                    }
                    None => break,
                },
                _ = cancel.cancelled(), if conf.kill_on_cancel && !terminated => {
                    debug!(prefix = %self.prefix.trim_end(), "cancellation observed; terminating process");
                    terminate(&child);
                    terminated = true;
                }
            }
        }

        let status = child.wait().await.map_err(CommandError::Wait)?;

        if let Some(err) = stream_err {
            return Err(CommandError::OutputStream(err));
        }

        if !status.success() {
            let err = CommandError::NonZeroExit {
                prefix: self.prefix.clone(),
                status,
            };
            println!("{err}");
            return Err(err);
        }

        Ok(())
    }
}

impl std::fmt::Debug for ProcessRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessRunner")
            .field("cmd", &self.cmd)
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

/// Spawn a reader task that forwards each line of `stream` to `tx`.
fn pump_lines(
    stream: impl AsyncRead + Unpin + Send + 'static,
    tx: mpsc::Sender<std::io::Result<String>>,
) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if tx.send(Ok(line)).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    let _ = tx.send(Err(err)).await;
                    break;
                }
            }
        }
    });
}

/// Merge `KEY=VALUE` overrides into the command environment. Entries come
/// after the inherited environment, so a later key wins.
fn apply_env(cmd: &mut Command, env: &[String], omit_env: bool) {
    if omit_env {
        cmd.env_clear();
    }

    for entry in env {
        if let Some((key, value)) = entry.split_once('=') {
            cmd.env(key, value);
        }
    }
}

/// Best-effort SIGTERM to the command's process group. There is no
/// escalation to a forced kill: a process that ignores the signal will
/// hang the run.
fn terminate(child: &Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        if let Some(id) = child.id() {
            // Negative pid addresses the whole group.
            if let Err(err) = kill(Pid::from_raw(-(id as i32)), Signal::SIGTERM) {
                warn!(pid = id, error = %err, "failed to signal process group");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = child;
        warn!("process termination is only supported on unix");
    }
}

/// Format the `"[label] "` prefix for output lines. An empty label yields
/// no prefix at all. The color is a pseudo-random hue picked per process;
/// cosmetic only.
pub fn prefix(label: &str, no_color: bool) -> String {
    if label.is_empty() {
        return String::new();
    }

    let text = format!("[{label}]");
    if no_color {
        format!("{text} ")
    } else {
        format!("{} ", text.color(pick_color(label)))
    }
}

const PALETTE: [AnsiColors; 15] = [
    AnsiColors::Red,
    AnsiColors::Green,
    AnsiColors::Yellow,
    AnsiColors::Blue,
    AnsiColors::Magenta,
    AnsiColors::Cyan,
    AnsiColors::White,
    AnsiColors::BrightBlack,
    AnsiColors::BrightRed,
    AnsiColors::BrightGreen,
    AnsiColors::BrightYellow,
    AnsiColors::BrightBlue,
    AnsiColors::BrightMagenta,
    AnsiColors::BrightCyan,
    AnsiColors::BrightWhite,
];

fn pick_color(label: &str) -> AnsiColors {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    std::process::id().hash(&mut hasher);
    label.hash(&mut hasher);
    PALETTE[(hasher.finish() % PALETTE.len() as u64) as usize]
}
