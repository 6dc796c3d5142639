mod completion;
mod dispatch;
mod render;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::completion::CliCompletionShell;
use crate::dispatch::run_cli;
use crate::render::eprint_error;

const LOG_ENV: &str = "SVM_LOG";

#[derive(Parser, Debug)]
#[command(name = "svm", version)]
#[command(about = "SDK version manager for Node.js, Go, Java, Python and .NET", long_about = None)]
struct Cli {
    /// Config file to use instead of `$SVM_HOME/config.json` or `~/.svm/config.json`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log debug diagnostics to stderr.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage Node.js versions.
    Node {
        #[command(subcommand)]
        action: SdkAction,
    },
    /// Manage Go versions.
    Go {
        #[command(subcommand)]
        action: SdkAction,
    },
    /// Manage Java (Eclipse Temurin) versions.
    Java {
        #[command(subcommand)]
        action: SdkAction,
    },
    /// Manage Python versions.
    Python {
        #[command(subcommand)]
        action: SdkAction,
    },
    /// Manage .NET SDK and runtime versions.
    Dotnet {
        #[command(subcommand)]
        component: DotnetCommand,
    },
    /// Read or change persisted settings.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Print a shell completion script.
    Completions {
        #[arg(value_enum)]
        shell: CliCompletionShell,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum SdkAction {
    /// List available versions, or installed ones with `--installed`.
    List {
        #[arg(long, short)]
        installed: bool,
        #[arg(long, short)]
        all: bool,
    },
    Install {
        version: String,
    },
    Remove {
        version: String,
    },
    /// Activate a version, installing it first when needed.
    Use {
        version: String,
    },
    /// Print the active version.
    Current,
}

#[derive(Subcommand, Debug)]
enum DotnetCommand {
    Sdk {
        #[command(subcommand)]
        action: SdkAction,
    },
    Runtime {
        #[command(subcommand)]
        action: SdkAction,
    },
    /// ASP.NET Core runtime.
    AspCore {
        #[command(subcommand)]
        action: SdkAction,
    },
    /// Windows Desktop runtime.
    Desktop {
        #[command(subcommand)]
        action: SdkAction,
    },
}

impl DotnetCommand {
    fn into_parts(self) -> (&'static str, SdkAction) {
        match self {
            Self::Sdk { action } => ("sdk", action),
            Self::Runtime { action } => ("runtime", action),
            Self::AspCore { action } => ("asp-core", action),
            Self::Desktop { action } => ("desktop", action),
        }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum ConfigAction {
    /// Set the directory toolchains are installed into.
    SetInstallDir { dir: PathBuf },
    GetInstallDir,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = if verbose {
        EnvFilter::new(default_level)
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level))
    };

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run_cli(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprint_error(&format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests;
