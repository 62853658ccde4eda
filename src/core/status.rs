//! Skill eligibility status.
//!
//! Layers the externally supplied per-skill configuration on top of a raw
//! requirements check and derives the install options a user can act on.

use std::collections::BTreeMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use super::dependencies::{
    CheckResult, DependencyResolver, LocalProbe, Probe, RemoteExecutor, RemoteProbe, normalize_os,
};
use super::skill::{InstallKind, InstallSpec, Skill, Tier};

/// External per-skill settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillEntryConfig {
    /// Overrides the skill's own `enabled` flag
    pub enabled: Option<bool>,
    /// Values supplied for required env vars
    pub env: BTreeMap<String, String>,
    /// Primary credential, exported as the skill's `primary_env`
    pub api_key: Option<String>,
}

/// External configuration consulted by [`DependencyResolver::build_status`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillsConfig {
    pub entries: BTreeMap<String, SkillEntryConfig>,
    /// Administratively blocked skill ids
    pub blocked: Vec<String>,
}

impl SkillsConfig {
    #[must_use]
    pub fn entry(&self, id: &str) -> Option<&SkillEntryConfig> {
        self.entries.get(id)
    }

    #[must_use]
    pub fn is_blocked(&self, id: &str) -> bool {
        self.blocked.iter().any(|b| b == id)
    }
}

/// One labelled way to install something a skill needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallOption {
    pub id: String,
    pub kind: InstallKind,
    pub label: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bins: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillStatus {
    pub id: String,
    pub name: String,
    pub tier: Tier,
    pub enabled: bool,
    pub blocked: bool,
    pub eligible: bool,
    /// Platform the check ran against
    pub platform: String,
    pub check: CheckResult,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub install_options: Vec<InstallOption>,
}

impl DependencyResolver {
    /// Check `skill` and combine the result with `external` settings.
    pub fn build_status(
        &self,
        skill: &Skill,
        external: &SkillsConfig,
        executor: Option<&dyn RemoteExecutor>,
    ) -> SkillStatus {
        match executor {
            Some(executor) => self.status_with(skill, external, &RemoteProbe::new(executor)),
            None => self.status_with(skill, external, &LocalProbe),
        }
    }

    fn status_with(&self, skill: &Skill, external: &SkillsConfig, probe: &dyn Probe) -> SkillStatus {
        let entry = external.entry(&skill.id);
        let mut check = self.check_with(&skill.requirements, probe);

        if let Some(entry) = entry {
            let primary = skill.requirements.primary_env.as_deref();
            let has_key = entry.api_key.as_deref().is_some_and(|k| !k.is_empty());
            check.missing.env.retain(|name| {
                let supplied = entry.env.get(name).is_some_and(|v| !v.is_empty());
                let primary_hit = has_key && primary == Some(name.as_str());
                !(supplied || primary_hit)
            });
            check.refresh();
        }

        let enabled = entry.and_then(|e| e.enabled).unwrap_or(skill.enabled);
        let blocked = external.is_blocked(&skill.id);
        let platform = probe
            .platform()
            .unwrap_or_else(|_| normalize_os(std::env::consts::OS));
        let install_options = install_options(&skill.install, &platform);

        SkillStatus {
            id: skill.id.clone(),
            name: skill.name.clone(),
            tier: skill.tier,
            enabled,
            blocked,
            eligible: enabled && !blocked && check.satisfied,
            platform,
            check,
            install_options,
        }
    }
}

/// Deduplicated install options that apply to `platform`.
#[must_use]
pub fn install_options(specs: &[InstallSpec], platform: &str) -> Vec<InstallOption> {
    specs
        .iter()
        .enumerate()
        .filter(|(_, spec)| {
            spec.os.is_empty() || spec.os.iter().any(|os| normalize_os(os) == platform)
        })
        .map(|(idx, spec)| InstallOption {
            id: spec
                .id
                .clone()
                .unwrap_or_else(|| format!("{}-{idx}", kind_name(spec.kind))),
            kind: spec.kind,
            label: install_label(spec),
            bins: spec.bins.clone(),
        })
        .unique_by(|option| (option.kind, option.label.clone()))
        .collect()
}

const FALLBACK_LABEL: &str = "run installer";

/// Human label for one install spec.
#[must_use]
pub fn install_label(spec: &InstallSpec) -> String {
    if let Some(label) = spec.label.as_deref().filter(|l| !l.trim().is_empty()) {
        return label.trim().to_string();
    }
    let label = match spec.kind {
        InstallKind::Brew => spec.formula.as_deref().map(|f| format!("brew install {f}")),
        InstallKind::Node => spec
            .package
            .as_deref()
            .map(|p| format!("npm install -g {p}")),
        InstallKind::Go => spec.module.as_deref().map(|m| format!("go install {m}")),
        InstallKind::Uv => spec
            .package
            .as_deref()
            .map(|p| format!("uv pip install {p}")),
        InstallKind::Pip => spec.package.as_deref().map(|p| format!("pip install {p}")),
        InstallKind::Download => spec
            .url
            .as_deref()
            .and_then(url_filename)
            .map(|f| format!("download {f}")),
        InstallKind::Other => None,
    };
    label.unwrap_or_else(|| FALLBACK_LABEL.to_string())
}

fn url_filename(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty() && !name.contains(':'))
        .map(str::to_string)
}

const fn kind_name(kind: InstallKind) -> &'static str {
    match kind {
        InstallKind::Brew => "brew",
        InstallKind::Node => "node",
        InstallKind::Go => "go",
        InstallKind::Uv => "uv",
        InstallKind::Pip => "pip",
        InstallKind::Download => "download",
        InstallKind::Other => "other",
    }
}
