// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Command-line arguments for `drover`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "drover",
    version,
    about = "Run multiple commands concurrently, serially, or as a dependency graph.",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DROVER_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run a flat list of commands concurrently or serially.
    Run {
        #[command(subcommand)]
        mode: RunMode,
    },

    /// Execute a named command (and its dependencies) from a droverfile.
    #[command(visible_alias = "e")]
    Exec(ExecArgs),

    /// Run the commands defined in a Procfile.
    #[command(visible_alias = "p")]
    Proc(ProcArgs),
}

#[derive(Debug, Clone, Subcommand)]
pub enum RunMode {
    /// Run all commands at once, multiplexing their output.
    #[command(visible_alias = "c", alias = "p")]
    Concurrently {
        #[command(flatten)]
        args: RunArgs,

        /// Buffer each command's output and print the buffers in input
        /// order once every command has finished.
        #[arg(short = 'g', long)]
        aggregate_output: bool,
    },

    /// Run commands one at a time, in list order.
    #[command(visible_alias = "s")]
    Serially {
        #[command(flatten)]
        args: RunArgs,
    },
}

/// Flags shared by the flat `run` modes.
#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Commands to run. Each argument is one command string.
    pub commands: Vec<String>,

    /// Working directory for all commands.
    #[arg(short = 'w', long, value_name = "DIR")]
    pub working_directory: Option<PathBuf>,

    /// Continue running commands after a failure.
    #[arg(short = 'c', long)]
    pub continue_on_error: bool,

    /// Use the command string itself as the output label.
    #[arg(short = 'L', long)]
    pub command_as_label: bool,

    /// Add `npm run <script>` to the command list. A trailing `*` expands
    /// matching script names from package.json.
    #[arg(long = "npm", value_name = "SCRIPT")]
    pub npm: Vec<String>,

    /// Label to use for the command at the same position (repeatable).
    #[arg(short = 'n', long = "name", value_name = "NAME")]
    pub names: Vec<String>,

    /// Do not attach a label/prefix to output lines.
    #[arg(short = 'B', long)]
    pub no_label: bool,

    /// Do not run commands in a subshell; parse them into argv directly.
    #[arg(short = 'S', long = "no-subshell")]
    pub no_shell: bool,

    /// Do not colorize label output.
    #[arg(short = 'C', long)]
    pub no_color: bool,
}

#[derive(Debug, Clone, Args)]
pub struct ExecArgs {
    /// Name of the command to execute from the droverfile.
    pub target: String,

    /// Path to the droverfile. By default `droverfile` (optionally with a
    /// .json/.toml/.yaml extension) is searched in the working directory.
    #[arg(short = 'f', long = "file", value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Working directory for all commands.
    #[arg(short = 'w', long, value_name = "DIR")]
    pub working_directory: Option<PathBuf>,

    /// Buffer each command's output and print it as one block on completion.
    #[arg(short = 'g', long)]
    pub aggregate_output: bool,

    /// Continue running commands after a failure.
    #[arg(short = 'c', long)]
    pub continue_on_error: bool,

    /// Do not run commands in a subshell; parse them into argv directly.
    #[arg(short = 'S', long = "no-subshell")]
    pub no_shell: bool,

    /// Do not colorize label output.
    #[arg(short = 'C', long)]
    pub no_color: bool,
}

#[derive(Debug, Clone, Args)]
pub struct ProcArgs {
    /// Path to the Procfile.
    #[arg(short = 'p', long, default_value = "Procfile", value_name = "PATH")]
    pub procfile: PathBuf,

    /// Path to the env file.
    #[arg(short = 'e', long, default_value = ".env", value_name = "PATH")]
    pub env_file: PathBuf,

    /// Don't load the env file.
    #[arg(short = 'E', long)]
    pub no_env_file: bool,

    /// Omit the inherited runtime environment variables.
    #[arg(long)]
    pub omit_env: bool,

    /// Working directory for all commands.
    #[arg(short = 'w', long, value_name = "DIR")]
    pub working_directory: Option<PathBuf>,

    /// Continue running commands after a failure.
    #[arg(short = 'c', long)]
    pub continue_on_error: bool,

    /// Do not attach a label/prefix to output lines.
    #[arg(short = 'B', long)]
    pub no_label: bool,

    /// Do not run commands in a subshell; parse them into argv directly.
    #[arg(short = 'S', long = "no-subshell")]
    pub no_shell: bool,

    /// Do not colorize label output.
    #[arg(short = 'C', long)]
    pub no_color: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `Cli::parse()`.
pub fn parse() -> Cli {
    Cli::parse()
}
