use std::collections::{BTreeMap, BTreeSet};

use parking_lot::Mutex;
use skillhub::HubError;
use skillhub::core::dependencies::{
    ConfigKeyPolicy, DependencyResolver, ExecOutput, RemoteExecutor,
};
use skillhub::core::skill::{Requirements, Tier};
use skillhub::core::status::{SkillEntryConfig, SkillsConfig};
use skillhub::diagnostics::Diagnostics;
use skillhub::test_utils::fixtures::sample_skill;

/// A pretend container: installs mutate its state.
#[derive(Default)]
struct FakeContainer {
    bins: BTreeSet<String>,
    env: BTreeMap<String, String>,
    python: Mutex<BTreeSet<String>>,
    node: Mutex<BTreeSet<String>>,
    broken_pip: bool,
}

fn ok(stdout: &str) -> ExecOutput {
    ExecOutput {
        exit_code: 0,
        stdout: stdout.to_string(),
        stderr: String::new(),
    }
}

fn fail(stderr: &str) -> ExecOutput {
    ExecOutput {
        exit_code: 1,
        stdout: String::new(),
        stderr: stderr.to_string(),
    }
}

impl RemoteExecutor for FakeContainer {
    fn exec(&self, argv: &[String]) -> skillhub::Result<ExecOutput> {
        let args: Vec<&str> = argv.iter().map(String::as_str).collect();
        Ok(match args.as_slice() {
            ["uname", "-s"] => ok("Linux\n"),
            ["sh", "-c", script] => {
                let name = script.trim_start_matches("command -v ").trim_matches('\'');
                if self.bins.contains(name) { ok("/usr/bin/x") } else { fail("") }
            }
            ["printenv", name] => match self.env.get(*name) {
                Some(value) => ok(value),
                None => fail(""),
            },
            ["python3", "-c", code] => {
                let module = code.trim_start_matches("import ");
                if self.python.lock().contains(module) { ok("") } else { fail("ModuleNotFoundError") }
            }
            ["npm", "ls", "-g", "--depth=0", "--json"] => {
                let deps: serde_json::Map<String, serde_json::Value> = self
                    .node
                    .lock()
                    .iter()
                    .map(|n| (n.clone(), serde_json::json!({"version": "1.0.0"})))
                    .collect();
                ok(&serde_json::json!({ "dependencies": deps }).to_string())
            }
            ["pip", "install", spec] => {
                if self.broken_pip {
                    fail("pip: network unreachable")
                } else {
                    let module = skillhub::core::dependencies::python_module_name(spec);
                    self.python.lock().insert(module);
                    ok("")
                }
            }
            ["npm", "install", "-g", spec] => {
                let name = skillhub::core::dependencies::node_package_name(spec);
                self.node.lock().insert(name);
                ok("")
            }
            other => return Err(HubError::Executor(format!("unexpected command {other:?}"))),
        })
    }
}

fn resolver() -> DependencyResolver {
    DependencyResolver::new(ConfigKeyPolicy::AssumeSatisfied, Diagnostics::none())
}

#[test]
fn container_check_then_install_then_recheck() {
    let container = FakeContainer {
        bins: BTreeSet::from(["git".to_string()]),
        ..FakeContainer::default()
    };
    let mut skill = sample_skill("analyze", Tier::Managed);
    skill.requirements = Requirements {
        bins: vec!["git".into(), "jq".into()],
        python: vec!["pandas>=2".into()],
        node: vec!["@scope/tool@1.2".into()],
        ..Default::default()
    };

    let before = resolver().check(&skill.requirements, Some(&container));
    assert!(!before.satisfied);
    assert_eq!(before.missing.bins, vec!["jq"]);
    assert_eq!(before.missing.python, vec!["pandas"]);
    assert_eq!(before.missing.node, vec!["@scope/tool"]);

    let report = resolver().install_missing(&skill, Some(&container));
    assert_eq!(report.installed, vec!["pandas>=2", "@scope/tool@1.2"]);
    assert!(report.failed.is_empty());
    assert_eq!(report.unremediated.bins, vec!["jq"]);

    let after = resolver().check(&skill.requirements, Some(&container));
    assert!(after.missing.python.is_empty());
    assert!(after.missing.node.is_empty());
    assert_eq!(after.missing.bins, vec!["jq"]);
}

#[test]
fn failed_install_is_reported_with_stderr() {
    let container = FakeContainer {
        broken_pip: true,
        ..FakeContainer::default()
    };
    let mut skill = sample_skill("analyze", Tier::Managed);
    skill.requirements.python = vec!["numpy".into()];

    let report = resolver().install_missing(&skill, Some(&container));
    assert!(report.installed.is_empty());
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].package, "numpy");
    assert!(report.failed[0].error.contains("network unreachable"));
}

#[test]
fn env_entries_with_defaults_check_only_the_name() {
    let container = FakeContainer {
        env: BTreeMap::from([("REGISTRY".to_string(), "ghcr.io".to_string())]),
        ..FakeContainer::default()
    };
    let req = Requirements {
        env: vec!["REGISTRY=docker.io".into(), "TOKEN".into()],
        ..Default::default()
    };
    let result = resolver().check(&req, Some(&container));
    assert_eq!(result.missing.env, vec!["TOKEN"]);
}

#[test]
fn status_merges_configured_entries_and_blocks() {
    let container = FakeContainer::default();
    let mut skill = sample_skill("slack", Tier::Managed);
    skill.requirements.env = vec!["SLACK_TOKEN".into(), "SLACK_CHANNEL".into()];
    skill.requirements.primary_env = Some("SLACK_TOKEN".into());
    skill.requirements.config = vec!["slack.workspace".into()];

    let mut config = SkillsConfig::default();
    config.entries.insert(
        "slack".into(),
        SkillEntryConfig {
            api_key: Some("xoxb".into()),
            env: BTreeMap::from([("SLACK_CHANNEL".to_string(), "#ops".to_string())]),
            ..Default::default()
        },
    );

    let status = resolver().build_status(&skill, &config, Some(&container));
    assert!(status.check.missing.env.is_empty());
    assert!(status.eligible);
    assert_eq!(status.platform, "linux");
    assert_eq!(status.check.unverified_config, vec!["slack.workspace"]);

    config.blocked.push("slack".into());
    let blocked = resolver().build_status(&skill, &config, Some(&container));
    assert!(blocked.blocked);
    assert!(!blocked.eligible);

    let strict = DependencyResolver::new(ConfigKeyPolicy::AssumeUnsatisfied, Diagnostics::none());
    let strict_status = strict.build_status(&skill, &SkillsConfig::default(), Some(&container));
    assert_eq!(strict_status.check.missing.config, vec!["slack.workspace"]);
    assert!(!strict_status.eligible);
}
