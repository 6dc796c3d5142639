use std::fs;
use std::path::Path;

use anyhow::Result;
use clap::Parser;
use svm_config::{ConfigStore, SdkKey};
use svm_core::{HostArch, HostOs, HostPlatform, SvmError, Transport};
use svm_providers::{provider_for, Toolchain};
use tempfile::TempDir;

use super::*;
use crate::completion::write_completions_script;
use crate::dispatch::{absolutize, installed_version_lines, run_config_action, run_sdk_action};
use crate::render::{
    format_version_lines, render_error_line, render_section_header, render_status_line,
    resolve_output_style, OutputStyle, TerminalRenderer,
};

struct OfflineTransport;

impl Transport for OfflineTransport {
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        anyhow::bail!("offline: GET {url}")
    }

    fn exists(&self, _url: &str) -> Result<bool> {
        Ok(false)
    }

    fn download(&self, url: &str, _dest: &Path) -> Result<()> {
        anyhow::bail!("offline: download {url}")
    }
}

fn linux_x64() -> HostPlatform {
    HostPlatform::new(HostOs::Linux, HostArch::X64)
}

fn plain() -> TerminalRenderer {
    TerminalRenderer::from_style(OutputStyle::Plain)
}

fn temp_config() -> (TempDir, ConfigStore) {
    let temp = TempDir::new().expect("must create temp dir");
    let config = ConfigStore::open(temp.path().join("config.json")).expect("must open config");
    (temp, config)
}

#[test]
fn cli_parses_toolchain_actions_and_global_flags() {
    let cli = Cli::try_parse_from(["svm", "node", "list", "-i", "--config", "/tmp/svm.json"])
        .expect("must parse list");
    assert_eq!(cli.config.as_deref(), Some(Path::new("/tmp/svm.json")));
    match cli.command {
        Commands::Node { action } => assert_eq!(
            action,
            SdkAction::List {
                installed: true,
                all: false
            }
        ),
        other => panic!("unexpected command: {other:?}"),
    }

    let cli = Cli::try_parse_from(["svm", "-v", "go", "use", "1.22"]).expect("must parse use");
    assert!(cli.verbose);
    assert!(matches!(
        cli.command,
        Commands::Go {
            action: SdkAction::Use { .. }
        }
    ));
}

#[test]
fn cli_parses_dotnet_components() {
    let cli = Cli::try_parse_from(["svm", "dotnet", "asp-core", "install", "8.0.2"])
        .expect("must parse asp-core");
    let Commands::Dotnet { component } = cli.command else {
        panic!("expected dotnet command");
    };
    assert_eq!(
        component.into_parts(),
        (
            "asp-core",
            SdkAction::Install {
                version: "8.0.2".to_string()
            }
        )
    );

    assert!(Cli::try_parse_from(["svm", "dotnet", "install", "8.0.2"]).is_err());
    assert!(Cli::try_parse_from(["svm", "ruby", "list"]).is_err());
}

#[test]
fn cli_parses_config_and_completions() {
    let cli = Cli::try_parse_from(["svm", "config", "set-install-dir", "sdks"])
        .expect("must parse config");
    assert!(matches!(
        cli.command,
        Commands::Config {
            action: ConfigAction::SetInstallDir { .. }
        }
    ));

    let cli = Cli::try_parse_from(["svm", "completions", "powershell"])
        .expect("must parse completions");
    assert!(matches!(
        cli.command,
        Commands::Completions {
            shell: CliCompletionShell::Powershell
        }
    ));
}

#[test]
fn render_status_line_plain_is_unadorned() {
    assert_eq!(
        render_status_line(OutputStyle::Plain, "ok", "installed node v20.11.1"),
        "installed node v20.11.1"
    );
}

#[test]
fn error_lines_carry_the_badge_in_plain_output() {
    assert_eq!(
        render_error_line("failed to download go 1.22.1: status 404"),
        "[ERR] failed to download go 1.22.1: status 404"
    );
    assert_eq!(
        render_error_line(&format!(
            "{:#}",
            anyhow::anyhow!("connection reset").context("installing node")
        )),
        "[ERR] installing node: connection reset"
    );
}

#[test]
fn render_status_line_rich_includes_ascii_badge() {
    assert_eq!(
        render_status_line(OutputStyle::Rich, "ok", "installed node v20.11.1"),
        "[OK] installed node v20.11.1"
    );
    assert_eq!(
        render_status_line(OutputStyle::Rich, "step", "installing go 1.22"),
        "[..] installing go 1.22"
    );
    assert_eq!(
        render_status_line(OutputStyle::Rich, "warn", "no java version is active"),
        "[WARN] no java version is active"
    );
    assert_eq!(
        render_status_line(OutputStyle::Rich, "error", "download failed"),
        "[ERR] download failed"
    );
}

#[test]
fn resolve_output_style_needs_a_terminal_and_color() {
    assert_eq!(resolve_output_style(true, false), OutputStyle::Rich);
    assert_eq!(resolve_output_style(true, true), OutputStyle::Plain);
    assert_eq!(resolve_output_style(false, false), OutputStyle::Plain);
    assert_eq!(render_section_header(OutputStyle::Plain, "Installed"), None);
    assert!(render_section_header(OutputStyle::Rich, "Installed")
        .expect("must render header")
        .contains("== Installed =="));
}

#[test]
fn version_lines_mark_the_active_version() {
    let versions = vec!["v20.11.1".to_string(), "v18.19.0".to_string()];
    assert_eq!(
        format_version_lines(&versions, Some("v18.19.0")),
        vec!["  v20.11.1", "* v18.19.0"]
    );
    assert_eq!(
        format_version_lines(&versions, None),
        vec!["  v20.11.1", "  v18.19.0"]
    );
}

#[test]
fn completions_script_names_the_binary_and_toolchains() {
    let mut output = Vec::new();
    write_completions_script(CliCompletionShell::Bash, &mut output)
        .expect("must write completions");
    let script = String::from_utf8(output).expect("must be utf-8");
    assert!(script.contains("svm"));
    assert!(script.contains("dotnet"));
    assert!(script.contains("set-install-dir"));
}

#[test]
fn absolutize_joins_relative_paths_onto_the_working_directory() {
    let cwd = Path::new("/work");
    assert_eq!(absolutize(Path::new("sdks"), cwd), cwd.join("sdks"));
    let absolute = std::env::temp_dir();
    assert_eq!(absolutize(&absolute, cwd), absolute);
}

#[test]
fn set_install_dir_creates_and_persists_the_directory() {
    let (temp, mut config) = temp_config();
    let target = temp.path().join("sdks");

    run_config_action(
        &mut config,
        plain(),
        ConfigAction::SetInstallDir {
            dir: target.clone(),
        },
    )
    .expect("must set install dir");

    assert!(target.is_dir());
    assert_eq!(config.install_dir(), target);
    drop(config);

    let reopened =
        ConfigStore::open(temp.path().join("config.json")).expect("must reopen config");
    assert_eq!(reopened.install_dir(), target);
}

#[test]
fn set_install_dir_accepts_a_non_empty_directory() {
    let (temp, mut config) = temp_config();
    let target = temp.path().join("busy");
    fs::create_dir_all(&target).expect("must create dir");
    fs::write(target.join("keep.txt"), "x").expect("must write file");

    run_config_action(
        &mut config,
        plain(),
        ConfigAction::SetInstallDir {
            dir: target.clone(),
        },
    )
    .expect("must set install dir");

    assert_eq!(config.install_dir(), target);
    assert!(target.join("keep.txt").is_file());
}

#[test]
fn installed_lines_list_version_dirs_newest_first() {
    let (temp, mut config) = temp_config();
    let key = SdkKey::new("node");
    for name in ["v18.19.0", "v20.11.1", "current"] {
        fs::create_dir_all(temp.path().join("node").join(name)).expect("must create dir");
    }
    config
        .set_current_version(&key, "v20.11.1")
        .expect("must set current");

    let lines = installed_version_lines(&config, &key).expect("must list installed");
    assert_eq!(lines, vec!["* v20.11.1", "  v18.19.0"]);
}

#[test]
fn current_and_list_actions_work_offline() {
    let (_temp, mut config) = temp_config();
    let transport = OfflineTransport;
    let provider =
        provider_for(Toolchain::Go, None, &transport, linux_x64()).expect("must build provider");

    run_sdk_action(
        &mut config,
        provider.as_ref(),
        &transport,
        linux_x64(),
        plain(),
        SdkAction::Current,
    )
    .expect("must print current");
    run_sdk_action(
        &mut config,
        provider.as_ref(),
        &transport,
        linux_x64(),
        plain(),
        SdkAction::List {
            installed: true,
            all: false,
        },
    )
    .expect("must list installed");
}

#[test]
fn removing_a_missing_version_reports_not_installed() {
    let (_temp, mut config) = temp_config();
    let transport = OfflineTransport;
    let provider = provider_for(Toolchain::Dotnet, Some("runtime"), &transport, linux_x64())
        .expect("must build provider");

    let err = run_sdk_action(
        &mut config,
        provider.as_ref(),
        &transport,
        linux_x64(),
        plain(),
        SdkAction::Remove {
            version: "8.0.2".to_string(),
        },
    )
    .expect_err("must fail");
    assert!(matches!(
        err.downcast_ref::<SvmError>(),
        Some(SvmError::NotInstalled { .. })
    ));
}

#[test]
fn install_surfaces_catalog_failures() {
    let (_temp, mut config) = temp_config();
    let transport = OfflineTransport;
    let provider =
        provider_for(Toolchain::Node, None, &transport, linux_x64()).expect("must build provider");

    let err = run_sdk_action(
        &mut config,
        provider.as_ref(),
        &transport,
        linux_x64(),
        plain(),
        SdkAction::Install {
            version: "20".to_string(),
        },
    )
    .expect_err("must fail offline");
    assert!(matches!(
        err.downcast_ref::<SvmError>(),
        Some(SvmError::CatalogFetch { .. })
    ));
}
