use predicates::prelude::*;

use super::fixture::{CliFixture, ids};
use skillhub::test_utils::fixtures::skill_md;

#[test]
fn list_shows_bundled_skills_on_fresh_install() {
    let fx = CliFixture::new();
    let data = fx.json(&["list"]);
    let listed = ids(&data["skills"]);
    assert!(listed.contains(&"code-review".to_string()));
    assert_eq!(data["count"].as_u64().unwrap() as usize, listed.len());
    assert!(!fx.catalog_path().exists());
}

#[test]
fn create_show_clone_delete_workflow() {
    let fx = CliFixture::new();
    let created = fx.json(&[
        "create",
        "deploy",
        "--name",
        "Deploy",
        "--prompt",
        "Ship it.",
        "--category",
        "ops",
    ]);
    assert_eq!(created["command"], "/deploy");
    assert_eq!(created["tier"], "extra");
    assert!(fx.catalog_path().is_file());

    let shown = fx.json(&["show", "deploy", "--level", "metadata"]);
    assert_eq!(shown["skill"]["prompt"], "");
    assert_eq!(shown["skill"]["load_level"], "metadata");

    let copy = fx.json(&["clone", "deploy", "deploy-copy"]);
    assert_eq!(copy["command"], "/deploy-copy");
    assert_eq!(copy["prompt"], "Ship it.");

    let ops = fx.json(&["list", "--category", "OPS"]);
    assert_eq!(ids(&ops["skills"]), vec!["deploy", "deploy-copy"]);

    fx.json(&["delete", "deploy"]);
    let err = fx.json_err(&["show", "deploy"]);
    assert_eq!(err["code"], "SKILL_NOT_FOUND");
}

#[test]
fn built_in_can_be_disabled_but_not_deleted() {
    let fx = CliFixture::new();
    let toggled = fx.json(&["disable", "code-review"]);
    assert_eq!(toggled["enabled"], false);

    let enabled = fx.json(&["list", "--enabled"]);
    assert!(!ids(&enabled["skills"]).contains(&"code-review".to_string()));

    let err = fx.json_err(&["delete", "code-review"]);
    assert_eq!(err["code"], "SKILL_FORBIDDEN");
}

#[test]
fn duplicate_create_reports_structured_error() {
    let fx = CliFixture::new();
    fx.json(&["create", "deploy", "--prompt", "x"]);
    let err = fx.json_err(&["create", "deploy", "--prompt", "y"]);
    assert_eq!(err["code"], "SKILL_ALREADY_EXISTS");
    assert_eq!(err["numeric_code"], 102);
}

#[test]
fn create_from_definition_file() {
    let fx = CliFixture::new();
    let path = fx.write_file("incoming/lint/SKILL.md", &skill_md("Lint", "/lint", "Lint the tree."));
    let created = fx.json(&["create", "--from", path.to_str().unwrap()]);
    assert_eq!(created["id"], "lint");
    assert_eq!(created["prompt"], "Lint the tree.");
}

#[test]
fn workspace_scan_lists_directory_skills() {
    let fx = CliFixture::new();
    fx.write_workspace_skill("pdf", &skill_md("PDF", "/pdf", "Read PDFs."));
    let data = fx.json(&["workspace", "scan"]);
    assert_eq!(data["count"], 1);
    assert_eq!(ids(&data["skills"]), vec!["pdf"]);
    assert_eq!(data["skills"][0]["tier"], "workspace");
}

#[test]
fn status_reports_missing_env_and_config_unblocks() {
    let fx = CliFixture::new();
    let definition = "---\nname: Slack\ncommand: /slack\nrequirements:\n  env: [SKILLHUB_TEST_SLACK_TOKEN]\n  primary_env: SKILLHUB_TEST_SLACK_TOKEN\n---\n\nPost to Slack.\n";
    let path = fx.write_file("incoming/slack/SKILL.md", definition);
    fx.json(&["create", "--from", path.to_str().unwrap()]);

    let before = fx.json(&["status", "slack"]);
    assert_eq!(before["statuses"][0]["eligible"], false);
    assert_eq!(
        before["statuses"][0]["check"]["missing"]["env"],
        serde_json::json!(["SKILLHUB_TEST_SLACK_TOKEN"])
    );

    let config = fx.write_file("skillhub.toml", "[skills.entries.slack]\napi_key = \"xoxb-1\"\n");
    let output = fx
        .cmd()
        .args(["--json", "--config", config.to_str().unwrap(), "status", "slack"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let envelope: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(envelope["data"]["statuses"][0]["eligible"], true);
}

#[test]
fn human_output_is_readable() {
    let fx = CliFixture::new();
    fx.cmd()
        .args(["show", "code-review"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/code-review"));
    fx.cmd()
        .args(["show", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}
