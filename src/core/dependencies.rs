//! Runtime dependency resolution
//!
//! Checks a skill's [`Requirements`] against the local host, or against a
//! container reached through a [`RemoteExecutor`]. Every category is
//! evaluated; the result lists everything that is missing at once.
//!
//! Probes are blocking and carry no timeout. Callers that need bounded
//! latency wrap the call themselves.

use std::collections::BTreeSet;
use std::fmt;
use std::process::Command;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::skill::{Requirements, Skill};
use crate::diagnostics::Diagnostics;
use crate::error::{HubError, Result};

// =============================================================================
// REMOTE EXECUTION
// =============================================================================

/// Output of one remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs a command inside a remote or containerized context.
///
/// `Err` means the command could not be run at all; a command that ran and
/// failed is an `Ok` with a non-zero exit code.
pub trait RemoteExecutor: Send + Sync {
    fn exec(&self, argv: &[String]) -> Result<ExecOutput>;
}

/// Executes through `docker exec <container>`.
#[derive(Debug, Clone)]
pub struct DockerExecutor {
    docker_bin: String,
    container: String,
}

impl DockerExecutor {
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            docker_bin: "docker".to_string(),
            container: container.into(),
        }
    }

    #[must_use]
    pub fn with_binary(mut self, docker_bin: impl Into<String>) -> Self {
        self.docker_bin = docker_bin.into();
        self
    }
}

impl RemoteExecutor for DockerExecutor {
    fn exec(&self, argv: &[String]) -> Result<ExecOutput> {
        let output = Command::new(&self.docker_bin)
            .arg("exec")
            .arg(&self.container)
            .args(argv)
            .output()
            .map_err(|err| HubError::Executor(format!("{} exec: {err}", self.docker_bin)))?;
        Ok(ExecOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

// =============================================================================
// RESULTS
// =============================================================================

/// How to treat configuration key requirements, which cannot be verified here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigKeyPolicy {
    /// Keys are listed as unverified but do not block eligibility
    #[default]
    AssumeSatisfied,
    /// Keys are also reported missing
    AssumeUnsatisfied,
}

impl std::str::FromStr for ConfigKeyPolicy {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "assume_satisfied" | "satisfied" => Ok(Self::AssumeSatisfied),
            "assume_unsatisfied" | "unsatisfied" => Ok(Self::AssumeUnsatisfied),
            other => Err(HubError::Config(format!("unknown config key policy: {other}"))),
        }
    }
}

/// Unmet requirements, per category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissingRequirements {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bins: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub any_bins: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub config: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub python: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub node: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub os: Vec<String>,
}

impl MissingRequirements {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
            && self.any_bins.is_empty()
            && self.env.is_empty()
            && self.config.is_empty()
            && self.python.is_empty()
            && self.node.is_empty()
            && self.os.is_empty()
    }

    /// Total number of missing entries.
    #[must_use]
    pub fn count(&self) -> usize {
        self.bins.len()
            + self.any_bins.len()
            + self.env.len()
            + self.config.len()
            + self.python.len()
            + self.node.len()
            + self.os.len()
    }
}

/// Outcome of a requirements check. Unmet requirements are data, not errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub satisfied: bool,
    pub missing: MissingRequirements,
    /// First probe failure, when the executor could not run a command
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Config keys that need an external check
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unverified_config: Vec<String>,
}

impl CheckResult {
    fn satisfied() -> Self {
        Self {
            satisfied: true,
            ..Self::default()
        }
    }

    /// Recompute `satisfied` after `missing` changed. An executor error only
    /// counts through the entries it left missing.
    pub fn refresh(&mut self) {
        self.satisfied = self.missing.is_empty();
    }
}

// =============================================================================
// NAME NORMALIZATION
// =============================================================================

const PYTHON_SPEC_SEPARATORS: [&str; 8] = [">=", "<=", "==", "~=", ">", "<", "[", ";"];

/// `requests[socks]>=2.0` -> `requests`, `typing-extensions` -> `typing_extensions`
#[must_use]
pub fn python_module_name(spec: &str) -> String {
    let cut = PYTHON_SPEC_SEPARATORS
        .iter()
        .filter_map(|sep| spec.find(sep))
        .min()
        .unwrap_or(spec.len());
    spec[..cut].trim().replace('-', "_")
}

/// `@scope/pkg@1.2` -> `@scope/pkg`, `pkg@1.2` -> `pkg`
#[must_use]
pub fn node_package_name(spec: &str) -> String {
    let spec = spec.trim();
    if let Some(scoped) = spec.strip_prefix('@') {
        match scoped.find('@') {
            Some(at) => format!("@{}", &scoped[..at]),
            None => spec.to_string(),
        }
    } else {
        spec.split('@').next().unwrap_or(spec).to_string()
    }
}

/// `NAME=default` -> `NAME`
#[must_use]
pub fn env_var_name(entry: &str) -> &str {
    entry.split('=').next().unwrap_or(entry).trim()
}

/// Canonical platform name: `linux`, `macos`, `windows`, or the lowercased input.
#[must_use]
pub fn normalize_os(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    match lower.as_str() {
        "darwin" | "macos" | "osx" | "mac" => "macos".to_string(),
        "win32" | "windows" => "windows".to_string(),
        _ if lower.starts_with("mingw") || lower.starts_with("msys") || lower.starts_with("cygwin") => {
            "windows".to_string()
        }
        _ => lower,
    }
}

fn is_importable_name(module: &str) -> bool {
    !module.is_empty()
        && module
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

// =============================================================================
// PROBES
// =============================================================================

/// Environment probes, local or through an executor.
pub(crate) trait Probe {
    fn has_bin(&self, name: &str) -> Result<bool>;
    fn has_env(&self, name: &str) -> Result<bool>;
    fn can_import(&self, module: &str) -> Result<bool>;
    fn node_packages(&self) -> Result<BTreeSet<String>>;
    fn platform(&self) -> Result<String>;
}

pub(crate) struct LocalProbe;

impl Probe for LocalProbe {
    fn has_bin(&self, name: &str) -> Result<bool> {
        Ok(which::which(name).is_ok())
    }

    fn has_env(&self, name: &str) -> Result<bool> {
        Ok(std::env::var_os(name).is_some())
    }

    fn can_import(&self, module: &str) -> Result<bool> {
        let status = Command::new("python3")
            .arg("-c")
            .arg(format!("import {module}"))
            .output();
        Ok(status.is_ok_and(|o| o.status.success()))
    }

    fn node_packages(&self) -> Result<BTreeSet<String>> {
        match Command::new("npm")
            .args(["ls", "-g", "--depth=0", "--json"])
            .output()
        {
            Ok(output) => Ok(parse_npm_listing(&String::from_utf8_lossy(&output.stdout))),
            Err(_) => Ok(BTreeSet::new()),
        }
    }

    fn platform(&self) -> Result<String> {
        Ok(normalize_os(std::env::consts::OS))
    }
}

pub(crate) struct RemoteProbe<'a> {
    executor: &'a dyn RemoteExecutor,
}

impl<'a> RemoteProbe<'a> {
    pub(crate) const fn new(executor: &'a dyn RemoteExecutor) -> Self {
        Self { executor }
    }

    fn run(&self, argv: &[&str]) -> Result<ExecOutput> {
        let argv: Vec<String> = argv.iter().map(|s| (*s).to_string()).collect();
        self.executor.exec(&argv)
    }
}

impl Probe for RemoteProbe<'_> {
    fn has_bin(&self, name: &str) -> Result<bool> {
        let script = format!("command -v {}", shell_quote(name));
        Ok(self.run(&["sh", "-c", &script])?.success())
    }

    fn has_env(&self, name: &str) -> Result<bool> {
        let out = self.run(&["printenv", name])?;
        Ok(out.success() && !out.stdout.trim().is_empty())
    }

    fn can_import(&self, module: &str) -> Result<bool> {
        let code = format!("import {module}");
        Ok(self.run(&["python3", "-c", &code])?.success())
    }

    fn node_packages(&self) -> Result<BTreeSet<String>> {
        let out = self.run(&["npm", "ls", "-g", "--depth=0", "--json"])?;
        Ok(parse_npm_listing(&out.stdout))
    }

    fn platform(&self) -> Result<String> {
        let out = self.run(&["uname", "-s"])?;
        if !out.success() {
            return Err(HubError::Executor(format!(
                "uname -s exited with {}: {}",
                out.exit_code,
                out.stderr.trim()
            )));
        }
        Ok(normalize_os(&out.stdout))
    }
}

/// Package names from `npm ls --json`. Unparsable output lists nothing.
fn parse_npm_listing(stdout: &str) -> BTreeSet<String> {
    serde_json::from_str::<serde_json::Value>(stdout)
        .ok()
        .and_then(|v| {
            v.get("dependencies")
                .and_then(|d| d.as_object())
                .map(|deps| deps.keys().cloned().collect())
        })
        .unwrap_or_default()
}

// =============================================================================
// RESOLVER
// =============================================================================

/// Packages installed by [`DependencyResolver::install_missing`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallReport {
    /// Requirement specs installed successfully
    pub installed: Vec<String>,
    pub failed: Vec<InstallFailure>,
    /// Everything still missing afterwards that was not attempted
    pub unremediated: MissingRequirements,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallFailure {
    pub package: String,
    pub error: String,
}

#[derive(Clone, Default)]
pub struct DependencyResolver {
    policy: ConfigKeyPolicy,
    diag: Diagnostics,
}

impl fmt::Debug for DependencyResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyResolver")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl DependencyResolver {
    #[must_use]
    pub const fn new(policy: ConfigKeyPolicy, diag: Diagnostics) -> Self {
        Self { policy, diag }
    }

    #[must_use]
    pub const fn policy(&self) -> ConfigKeyPolicy {
        self.policy
    }

    pub(crate) const fn diagnostics(&self) -> &Diagnostics {
        &self.diag
    }

    /// Check `req` locally, or through `executor` when given.
    pub fn check(&self, req: &Requirements, executor: Option<&dyn RemoteExecutor>) -> CheckResult {
        match executor {
            Some(executor) => self.check_with(req, &RemoteProbe::new(executor)),
            None => self.check_with(req, &LocalProbe),
        }
    }

    pub(crate) fn check_with(&self, req: &Requirements, probe: &dyn Probe) -> CheckResult {
        if req.always {
            return CheckResult::satisfied();
        }

        let mut result = CheckResult::default();
        let record_error = |result: &mut CheckResult, err: HubError| {
            self.diag.scope(|| warn!(error = %err, "dependency probe failed"));
            if result.error.is_none() {
                result.error = Some(err.to_string());
            }
        };

        if !req.os.is_empty() {
            match probe.platform() {
                Ok(platform) => {
                    if !req.os.iter().any(|os| normalize_os(os) == platform) {
                        result.missing.os.clone_from(&req.os);
                    }
                }
                Err(err) => {
                    result.missing.os.clone_from(&req.os);
                    record_error(&mut result, err);
                }
            }
        }

        for bin in &req.bins {
            match probe.has_bin(bin) {
                Ok(true) => {}
                Ok(false) => result.missing.bins.push(bin.clone()),
                Err(err) => {
                    result.missing.bins.push(bin.clone());
                    record_error(&mut result, err);
                }
            }
        }

        if !req.any_bins.is_empty() {
            let mut found = false;
            for bin in &req.any_bins {
                match probe.has_bin(bin) {
                    Ok(true) => {
                        found = true;
                        break;
                    }
                    Ok(false) => {}
                    Err(err) => record_error(&mut result, err),
                }
            }
            if !found {
                result.missing.any_bins.clone_from(&req.any_bins);
            }
        }

        for entry in &req.env {
            let name = env_var_name(entry);
            if name.is_empty() {
                continue;
            }
            match probe.has_env(name) {
                Ok(true) => {}
                Ok(false) => result.missing.env.push(name.to_string()),
                Err(err) => {
                    result.missing.env.push(name.to_string());
                    record_error(&mut result, err);
                }
            }
        }

        for spec in &req.python {
            let module = python_module_name(spec);
            if !is_importable_name(&module) {
                result.missing.python.push(module);
                continue;
            }
            match probe.can_import(&module) {
                Ok(true) => {}
                Ok(false) => result.missing.python.push(module),
                Err(err) => {
                    result.missing.python.push(module);
                    record_error(&mut result, err);
                }
            }
        }

        if !req.node.is_empty() {
            let installed = match probe.node_packages() {
                Ok(installed) => installed,
                Err(err) => {
                    record_error(&mut result, err);
                    BTreeSet::new()
                }
            };
            for spec in &req.node {
                let name = node_package_name(spec);
                if !installed.contains(&name) {
                    result.missing.node.push(name);
                }
            }
        }

        result.unverified_config.clone_from(&req.config);
        if self.policy == ConfigKeyPolicy::AssumeUnsatisfied {
            result.missing.config.clone_from(&req.config);
        }

        result.refresh();
        self.diag.scope(|| {
            debug!(
                satisfied = result.satisfied,
                missing = result.missing.count(),
                "requirements checked"
            );
        });
        result
    }

    /// Install missing python and node packages through `executor`.
    ///
    /// Binaries, env vars and the rest are reported, never installed. With no
    /// executor nothing is installed.
    pub fn install_missing(
        &self,
        skill: &Skill,
        executor: Option<&dyn RemoteExecutor>,
    ) -> InstallReport {
        let check = self.check(&skill.requirements, executor);
        let mut report = InstallReport {
            unremediated: check.missing.clone(),
            ..InstallReport::default()
        };
        let Some(executor) = executor else {
            return report;
        };

        let pending_python: Vec<&String> = skill
            .requirements
            .python
            .iter()
            .filter(|spec| check.missing.python.contains(&python_module_name(spec)))
            .collect();
        let pending_node: Vec<&String> = skill
            .requirements
            .node
            .iter()
            .filter(|spec| check.missing.node.contains(&node_package_name(spec)))
            .collect();

        report.unremediated.python.clear();
        report.unremediated.node.clear();

        for spec in pending_python {
            self.install_one(executor, &["pip", "install"], spec, &mut report);
        }
        for spec in pending_node {
            self.install_one(executor, &["npm", "install", "-g"], spec, &mut report);
        }

        self.diag.scope(|| {
            info!(
                skill = %skill.id,
                installed = report.installed.len(),
                failed = report.failed.len(),
                "dependency install finished"
            );
        });
        report
    }

    fn install_one(
        &self,
        executor: &dyn RemoteExecutor,
        command: &[&str],
        spec: &str,
        report: &mut InstallReport,
    ) {
        let mut argv: Vec<String> = command.iter().map(|s| (*s).to_string()).collect();
        argv.push(spec.to_string());
        let outcome = executor.exec(&argv);
        match outcome {
            Ok(out) if out.success() => report.installed.push(spec.to_string()),
            Ok(out) => {
                let error = if out.stderr.trim().is_empty() {
                    format!("exit code {}", out.exit_code)
                } else {
                    out.stderr.trim().to_string()
                };
                report.failed.push(InstallFailure {
                    package: spec.to_string(),
                    error,
                });
            }
            Err(err) => report.failed.push(InstallFailure {
                package: spec.to_string(),
                error: err.to_string(),
            }),
        }
    }
}
