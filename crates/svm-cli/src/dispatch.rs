use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use svm_config::{ConfigStore, SdkKey};
use svm_core::{HostPlatform, ProviderAdapter, Transport};
use svm_installer::{
    dir_is_empty, remove_version, sdk_key, ActivationManager, EnvironmentApplier, HttpTransport,
    InstallOutcome, Installer, ToolchainLayout,
};
use svm_providers::{provider_for, Toolchain};
use tracing::debug;

use crate::completion::write_completions_script;
use crate::render::{format_version_lines, TerminalRenderer};
use crate::{Cli, Commands, ConfigAction, SdkAction};

pub(crate) fn run_cli(cli: Cli) -> Result<()> {
    let renderer = TerminalRenderer::current();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Node { action } => {
            run_sdk_command(config_path, renderer, Toolchain::Node, None, action)
        }
        Commands::Go { action } => {
            run_sdk_command(config_path, renderer, Toolchain::Go, None, action)
        }
        Commands::Java { action } => {
            run_sdk_command(config_path, renderer, Toolchain::Java, None, action)
        }
        Commands::Python { action } => {
            run_sdk_command(config_path, renderer, Toolchain::Python, None, action)
        }
        Commands::Dotnet { component } => {
            let (component, action) = component.into_parts();
            run_sdk_command(
                config_path,
                renderer,
                Toolchain::Dotnet,
                Some(component),
                action,
            )
        }
        Commands::Config { action } => {
            let mut config = open_config(config_path)?;
            run_config_action(&mut config, renderer, action)
        }
        Commands::Completions { shell } => {
            write_completions_script(shell, &mut io::stdout().lock())
        }
    }
}

fn open_config(path: Option<&Path>) -> Result<ConfigStore> {
    match path {
        Some(path) => ConfigStore::open(path),
        None => ConfigStore::open_default(),
    }
}

fn run_sdk_command(
    config_path: Option<&Path>,
    renderer: TerminalRenderer,
    toolchain: Toolchain,
    component: Option<&str>,
    action: SdkAction,
) -> Result<()> {
    let transport = HttpTransport::new()?;
    let platform = HostPlatform::detect();
    let provider = provider_for(toolchain, component, &transport, platform)?;
    debug!(toolchain = toolchain.as_str(), ?component, ?action, "dispatching");

    // Remote listings never touch the config file.
    if let SdkAction::List {
        installed: false,
        all,
    } = action
    {
        let versions = if all {
            provider.list_all()?
        } else {
            provider.list_filtered()?
        };
        renderer.print_lines(&versions);
        return Ok(());
    }

    let mut config = open_config(config_path)?;
    run_sdk_action(
        &mut config,
        provider.as_ref(),
        &transport,
        platform,
        renderer,
        action,
    )
}

pub(crate) fn run_sdk_action(
    config: &mut ConfigStore,
    provider: &dyn ProviderAdapter,
    transport: &dyn Transport,
    platform: HostPlatform,
    renderer: TerminalRenderer,
    action: SdkAction,
) -> Result<()> {
    let key = sdk_key(provider);
    match action {
        SdkAction::List { .. } => {
            let lines = installed_version_lines(config, &key)?;
            if lines.is_empty() {
                renderer.print_status("warn", &format!("no {key} versions installed"));
            } else {
                renderer.print_section(&format!("Installed {key} versions"));
                renderer.print_lines(&lines);
            }
        }
        SdkAction::Install { version } => {
            renderer.print_status("step", &format!("installing {key} {version}"));
            let installer = Installer::new(provider, transport, platform);
            let outcome = installer.install(config, &version)?;
            print_install_outcome(renderer, &key, &outcome);
        }
        SdkAction::Remove { version } => {
            let removal = remove_version(config, provider, &version)?;
            renderer.print_status(
                "ok",
                &format!(
                    "removed {key} {} from {}",
                    removal.version,
                    removal.install_dir.display()
                ),
            );
            if removal.was_active {
                renderer.print_status(
                    "warn",
                    &format!("{key} {} was active; no version is active now", removal.version),
                );
            }
        }
        SdkAction::Use { version } => {
            let installer = Installer::new(provider, transport, platform);
            let mut env = EnvironmentApplier::for_host();
            let activation =
                ActivationManager::new(installer).activate(config, &mut env, &version)?;
            if let Some(outcome) = &activation.installed {
                print_install_outcome(renderer, &key, outcome);
            }
            renderer.print_status("ok", &format!("now using {key} {}", activation.version));
            renderer.print_status(
                "step",
                &format!(
                    "{} -> {} ({})",
                    activation.link.display(),
                    activation.version_dir.display(),
                    activation.strategy.as_str()
                ),
            );
            if !platform.is_windows() {
                renderer.print_status(
                    "step",
                    &format!(
                        "make sure {} is on PATH in your shell profile",
                        provider.bin_dir(&activation.link).display()
                    ),
                );
            }
        }
        SdkAction::Current => match config.current_version(&key) {
            Some(version) => println!("{version}"),
            None => renderer.print_status("warn", &format!("no {key} version is active")),
        },
    }
    Ok(())
}

/// Version directories on disk, newest first, the active one marked.
pub(crate) fn installed_version_lines(config: &ConfigStore, key: &SdkKey) -> Result<Vec<String>> {
    let versions = ToolchainLayout::for_key(config, key).installed_versions()?;
    Ok(format_version_lines(&versions, config.current_version(key)))
}

fn print_install_outcome(renderer: TerminalRenderer, key: &SdkKey, outcome: &InstallOutcome) {
    for skipped in &outcome.skipped {
        renderer.print_status(
            "warn",
            &format!("{key} {skipped} could not be downloaded, tried an older release"),
        );
    }
    renderer.print_status(
        "ok",
        &format!(
            "installed {key} {} to {}",
            outcome.version,
            outcome.install_dir.display()
        ),
    );
}

pub(crate) fn run_config_action(
    config: &mut ConfigStore,
    renderer: TerminalRenderer,
    action: ConfigAction,
) -> Result<()> {
    match action {
        ConfigAction::SetInstallDir { dir } => {
            let cwd = env::current_dir().context("failed to read the working directory")?;
            let dir = absolutize(&dir, &cwd);
            fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
            if !dir_is_empty(&dir)? {
                renderer.print_status(
                    "warn",
                    &format!(
                        "{} is not empty; versions installed elsewhere are not moved",
                        dir.display()
                    ),
                );
            }
            config.set_install_dir(&dir)?;
            renderer.print_status("ok", &format!("install dir set to {}", dir.display()));
        }
        ConfigAction::GetInstallDir => println!("{}", config.install_dir().display()),
    }
    Ok(())
}

pub(crate) fn absolutize(dir: &Path, cwd: &Path) -> PathBuf {
    if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        cwd.join(dir)
    }
}
