use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};
use svm_core::{EnvVar, SvmError, EXCLUDE_KEYWORDS_KEY, PATH_KEY, PATH_LIST_SEPARATOR};
use tracing::debug;

use crate::command::run_command;

/// Environment the applier reads and mutates for the running process.
pub trait EnvTarget {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&mut self, key: &str, value: &str);
}

/// The real process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvTarget for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }

    fn set(&mut self, key: &str, value: &str) {
        std::env::set_var(key, value);
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemoryEnv {
    vars: BTreeMap<String, String>,
}

impl MemoryEnv {
    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_string(), value.to_string());
        self
    }
}

impl EnvTarget for MemoryEnv {
    fn get(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.vars.insert(key.to_string(), value.to_string());
    }
}

/// Persistent machine-scope variables (the Windows system environment).
pub trait MachineEnv {
    fn read_path(&self) -> Result<String>;

    /// Writes every assignment, `PATH` included, in one privileged step.
    fn write(&self, assignments: &[(String, String)]) -> Result<()>;
}

/// A toolchain's declared variables split by the conventions they carry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvPlan {
    pub home: Option<(String, String)>,
    pub bin_path: String,
    pub exclude_keywords: Vec<String>,
    pub extras: Vec<(String, String)>,
}

impl EnvPlan {
    pub fn classify(vars: &[EnvVar], fallback_bin: &Path) -> Self {
        let mut plan = Self::default();
        for var in vars {
            if var.is_home() {
                plan.home = Some((var.key.clone(), var.value.clone()));
            } else if var.key == PATH_KEY {
                plan.bin_path = var.value.clone();
            } else if var.key == EXCLUDE_KEYWORDS_KEY {
                plan.exclude_keywords = var
                    .value
                    .split(',')
                    .map(str::trim)
                    .filter(|keyword| !keyword.is_empty())
                    .map(str::to_string)
                    .collect();
            } else if !var.key.is_empty() && !var.value.is_empty() {
                plan.extras.push((var.key.clone(), var.value.clone()));
            }
        }
        if plan.bin_path.is_empty() {
            plan.bin_path = fallback_bin.display().to_string();
        }
        plan
    }

    fn assignments(&self, path: &str) -> Vec<(String, String)> {
        let mut assignments = Vec::new();
        assignments.extend(self.home.iter().cloned());
        assignments.extend(self.extras.iter().cloned());
        assignments.push((PATH_KEY.to_string(), path.to_string()));
        assignments
    }
}

/// Drops every segment of `existing` containing an exclude keyword
/// (case-insensitively) or repeating a bin dir, then puts `bin_path` first.
pub fn rewrite_path(
    existing: &str,
    bin_path: &str,
    exclude_keywords: &[String],
    separator: char,
) -> String {
    let keywords: Vec<String> = exclude_keywords
        .iter()
        .map(|keyword| keyword.to_lowercase())
        .collect();

    let mut segments: Vec<&str> = Vec::new();
    for bin in bin_path.split(separator).map(str::trim) {
        if !bin.is_empty() && !segments.contains(&bin) {
            segments.push(bin);
        }
    }
    let bins = segments.clone();

    for segment in existing.split(separator).map(str::trim) {
        if segment.is_empty() || bins.contains(&segment) {
            continue;
        }
        let lower = segment.to_lowercase();
        if keywords.iter().any(|keyword| lower.contains(keyword.as_str())) {
            continue;
        }
        segments.push(segment);
    }

    segments.join(&separator.to_string())
}

/// Applies a toolchain's variables to the process, and to the machine
/// scope when one is configured.
pub struct EnvironmentApplier<T: EnvTarget> {
    target: T,
    machine: Option<Box<dyn MachineEnv>>,
}

impl EnvironmentApplier<ProcessEnv> {
    /// Process environment, plus the machine scope on Windows.
    pub fn for_host() -> Self {
        Self {
            target: ProcessEnv,
            machine: host_machine_env(),
        }
    }
}

impl<T: EnvTarget> EnvironmentApplier<T> {
    pub fn new(target: T) -> Self {
        Self {
            target,
            machine: None,
        }
    }

    pub fn with_machine(mut self, machine: Box<dyn MachineEnv>) -> Self {
        self.machine = Some(machine);
        self
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn apply(&mut self, vars: &[EnvVar], fallback_bin: &Path) -> Result<EnvPlan> {
        let plan = EnvPlan::classify(vars, fallback_bin);

        if let Some(machine) = &self.machine {
            let machine_path = rewrite_path(
                &machine.read_path()?,
                &plan.bin_path,
                &plan.exclude_keywords,
                ';',
            );
            machine.write(&plan.assignments(&machine_path))?;
        }

        let process_path = rewrite_path(
            &self.target.get(PATH_KEY).unwrap_or_default(),
            &plan.bin_path,
            &plan.exclude_keywords,
            PATH_LIST_SEPARATOR,
        );
        for (key, value) in plan.assignments(&process_path) {
            self.target.set(&key, &value);
        }
        debug!(bin = %plan.bin_path, "environment applied");
        Ok(plan)
    }
}

fn host_machine_env() -> Option<Box<dyn MachineEnv>> {
    cfg!(windows).then(|| Box::new(ElevatedMachineEnv) as Box<dyn MachineEnv>)
}

/// The Windows system environment: read from the registry, written by an
/// elevated PowerShell child.
struct ElevatedMachineEnv;

impl MachineEnv for ElevatedMachineEnv {
    fn read_path(&self) -> Result<String> {
        read_machine_path()
    }

    fn write(&self, assignments: &[(String, String)]) -> Result<()> {
        write_machine_env_with_runner(assignments, &std::env::temp_dir(), run_command)
    }
}

#[cfg(windows)]
fn read_machine_path() -> Result<String> {
    use winreg::enums::HKEY_LOCAL_MACHINE;
    use winreg::RegKey;

    const ENVIRONMENT_KEY: &str = r"SYSTEM\CurrentControlSet\Control\Session Manager\Environment";

    let key = RegKey::predef(HKEY_LOCAL_MACHINE)
        .open_subkey(ENVIRONMENT_KEY)
        .context("failed to open the machine environment registry key")?;
    key.get_value::<String, _>("Path")
        .context("failed to read the machine PATH")
}

#[cfg(not(windows))]
fn read_machine_path() -> Result<String> {
    anyhow::bail!("the machine environment is only available on Windows hosts")
}

/// Writes `assignments` through an elevated script run by `run`. Any
/// failure, including a non-zero exit of the elevated child, is a
/// [`SvmError::Privilege`].
pub(crate) fn write_machine_env_with_runner<RunCommand>(
    assignments: &[(String, String)],
    script_dir: &Path,
    mut run: RunCommand,
) -> Result<()>
where
    RunCommand: FnMut(&mut Command, &str) -> Result<()>,
{
    let script_path = script_dir.join(format!("svm-env-{}.ps1", std::process::id()));
    fs::write(&script_path, machine_env_script(assignments))
        .with_context(|| format!("failed to write {}", script_path.display()))?;

    let mut command = build_elevated_script_command(&script_path);
    let result = run(&mut command, "failed to update machine environment");
    let _ = fs::remove_file(&script_path);
    result.map_err(|err| {
        SvmError::Privilege {
            message: format!("{err:#}"),
        }
        .into()
    })
}

/// PowerShell that stops at the first failed assignment.
pub(crate) fn machine_env_script(assignments: &[(String, String)]) -> String {
    let mut script = String::from("$ErrorActionPreference = 'Stop'\r\n");
    for (key, value) in assignments {
        script.push_str(&format!(
            "[Environment]::SetEnvironmentVariable('{}', '{}', 'Machine')\r\n",
            escape_ps_single_quote(key),
            escape_ps_single_quote(value)
        ));
    }
    script
}

/// Runs `script_path` elevated and exits with the elevated child's code.
pub(crate) fn build_elevated_script_command(script_path: &Path) -> Command {
    let elevate = format!(
        "$p = Start-Process powershell -Verb RunAs -Wait -PassThru -ArgumentList '-NoProfile -ExecutionPolicy Bypass -File \"{}\"'; exit $p.ExitCode",
        escape_ps_single_quote(&script_path.display().to_string())
    );
    let mut command = Command::new("powershell");
    command.args(["-NoProfile", "-Command", elevate.as_str()]);
    command
}

fn escape_ps_single_quote(value: &str) -> String {
    value.replace('\'', "''")
}
