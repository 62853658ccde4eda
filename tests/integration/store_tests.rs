use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use httpmock::prelude::*;
use serde_json::json;
use skillhub::HubError;
use skillhub::core::skill::{CreateSkillRequest, LoadLevel, Tier, UpdateSkillRequest};
use skillhub::diagnostics::Diagnostics;
use skillhub::manager::SkillManager;
use skillhub::storage::MemoryCatalogStore;
use skillhub::store::{RemoteSource, SkillStore, StoreOptions};
use skillhub::test_utils::fixtures::skill_md;

const LISTING: &str = "/repos/acme/skills/contents/skills";

fn file_body(content: &str) -> serde_json::Value {
    json!({ "content": STANDARD.encode(content), "encoding": "base64" })
}

fn store(server: &MockServer) -> (SkillStore, Arc<SkillManager>) {
    let manager = Arc::new(
        SkillManager::new(Arc::new(MemoryCatalogStore::new()), Diagnostics::none()).unwrap(),
    );
    let store = SkillStore::new(
        StoreOptions {
            api_base: server.base_url(),
            token: Some("test-token".to_string()),
            ..StoreOptions::default()
        },
        Arc::clone(&manager),
        Diagnostics::none(),
    );
    let mut source = RemoteSource::github("acme", "Acme Skills", "acme", "skills");
    source.path = "skills".to_string();
    store.add_source(source).unwrap();
    (store, manager)
}

/// Three directories: two valid skills and one without a definition file.
fn mock_catalog(server: &MockServer) -> httpmock::Mock<'_> {
    let listing = server.mock(|when, then| {
        when.method(GET)
            .path(LISTING)
            .query_param("ref", "main")
            .header("authorization", "Bearer test-token");
        then.status(200).json_body(json!([
            { "name": "pdf", "path": "skills/pdf", "type": "dir" },
            { "name": "csv", "path": "skills/csv", "type": "dir" },
            { "name": "drafts", "path": "skills/drafts", "type": "dir" },
            { "name": ".github", "path": "skills/.github", "type": "dir" },
            { "name": "README.md", "path": "skills/README.md", "type": "file" }
        ]));
    });
    server.mock(|when, then| {
        when.method(GET).path(format!("{LISTING}/pdf/SKILL.md"));
        then.status(200)
            .json_body(file_body(&skill_md("PDF", "/pdf", "Read PDFs.")));
    });
    server.mock(|when, then| {
        when.method(GET).path(format!("{LISTING}/csv/SKILL.md"));
        then.status(200)
            .json_body(file_body(&skill_md("CSV", "/csv", "Read CSVs.")));
    });
    server.mock(|when, then| {
        when.method(GET).path(format!("{LISTING}/drafts/SKILL.md"));
        then.status(404).json_body(json!({ "message": "Not Found" }));
    });
    listing
}

#[test]
fn fetch_lists_valid_skills_tagged_with_source() {
    let server = MockServer::start();
    let listing = mock_catalog(&server);
    let (store, _) = store(&server);

    let skills = store.fetch_skills("acme").unwrap();
    let ids: Vec<_> = skills.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["csv", "pdf"]);
    assert!(skills.iter().all(|s| s.source_id == "acme" && s.source_name == "Acme Skills"));
    assert!(skills.iter().all(|s| !s.installed));

    store.fetch_skills("acme").unwrap();
    listing.assert_calls(1);

    store.clear_cache();
    store.fetch_skills("acme").unwrap();
    listing.assert_calls(2);
}

#[test]
fn exhausted_quota_is_rate_limited() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(LISTING);
        then.status(403)
            .header("x-ratelimit-remaining", "0")
            .json_body(json!({ "message": "API rate limit exceeded" }));
    });
    let (store, _) = store(&server);

    let err = store.fetch_skills("acme").unwrap_err();
    assert!(matches!(err, HubError::RemoteRateLimited(_)), "{err:?}");
    assert_eq!(err.to_structured().code, skillhub::error::ErrorCode::RemoteRateLimited);
}

#[test]
fn too_many_requests_on_a_definition_fails_the_listing() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(LISTING);
        then.status(200)
            .json_body(json!([{ "name": "pdf", "path": "skills/pdf", "type": "dir" }]));
    });
    server.mock(|when, then| {
        when.method(GET).path(format!("{LISTING}/pdf/SKILL.md"));
        then.status(429);
    });
    let (store, _) = store(&server);

    assert!(matches!(
        store.fetch_skills("acme"),
        Err(HubError::RemoteRateLimited(_))
    ));
}

#[test]
fn plain_forbidden_is_a_fetch_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(LISTING);
        then.status(403)
            .header("x-ratelimit-remaining", "42")
            .json_body(json!({ "message": "Forbidden" }));
    });
    let (store, _) = store(&server);

    assert!(matches!(store.fetch_skills("acme"), Err(HubError::RemoteFetch(_))));
}

#[test]
fn install_copies_references_and_reinstall_updates() {
    let server = MockServer::start();
    mock_catalog(&server);
    server.mock(|when, then| {
        when.method(GET).path(format!("{LISTING}/pdf/references"));
        then.status(200).json_body(json!([
            { "name": "forms.md", "path": "skills/pdf/references/forms.md", "type": "file" },
            { "name": "deep", "path": "skills/pdf/references/deep", "type": "dir" }
        ]));
    });
    server.mock(|when, then| {
        when.method(GET).path(format!("{LISTING}/pdf/references/forms.md"));
        then.status(200).json_body(file_body("# Forms"));
    });
    server.mock(|when, then| {
        when.method(GET).path(format!("{LISTING}/pdf/references/deep"));
        then.status(200).json_body(json!([
            { "name": "x.md", "path": "skills/pdf/references/deep/x.md", "type": "file" }
        ]));
    });
    server.mock(|when, then| {
        when.method(GET).path(format!("{LISTING}/pdf/references/deep/x.md"));
        then.status(200).json_body(file_body("deep"));
    });
    let (store, manager) = store(&server);

    let installed = store.install_skill("acme", "pdf").unwrap();
    assert_eq!(installed.tier, Tier::Managed);
    let paths: Vec<_> = installed.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["references/deep/x.md", "references/forms.md"]);

    let full = manager.loader().load("pdf", LoadLevel::Full).unwrap();
    assert_eq!(full.prompt, "Read PDFs.");
    assert_eq!(full.files.len(), 2);

    let again = store.install_skill("acme", "pdf").unwrap();
    assert_eq!(again.id, "pdf");
    assert_eq!(manager.list_by_tier(Tier::Managed).len(), 1);

    let summaries = store.fetch_skills("acme").unwrap();
    let pdf = summaries.iter().find(|s| s.id == "pdf").unwrap();
    assert!(pdf.installed);
}

#[test]
fn unknown_skill_and_disabled_source_are_rejected() {
    let server = MockServer::start();
    mock_catalog(&server);
    let (store, _) = store(&server);

    assert!(matches!(
        store.install_skill("acme", "nope"),
        Err(HubError::NotFound(_))
    ));

    store.set_enabled("acme", false).unwrap();
    assert!(matches!(store.fetch_skills("acme"), Err(HubError::Forbidden(_))));
}

/// One remote skill directory named `dir` with no references.
fn mock_single(server: &MockServer, dir: &str, name: &str) {
    server.mock(|when, then| {
        when.method(GET).path(LISTING);
        then.status(200).json_body(json!([
            { "name": dir, "path": format!("skills/{dir}"), "type": "dir" }
        ]));
    });
    server.mock(|when, then| {
        when.method(GET).path(format!("{LISTING}/{dir}/SKILL.md"));
        then.status(200)
            .json_body(file_body(&skill_md(name, &format!("/{dir}"), "Remote body.")));
    });
}

#[test]
fn install_does_not_touch_a_colliding_built_in() {
    let server = MockServer::start();
    mock_single(&server, "code-review", "Remote Review");
    let (store, manager) = store(&server);
    manager
        .update("code-review", UpdateSkillRequest::enabled(false))
        .unwrap();

    let err = store.install_skill("acme", "code-review").unwrap_err();
    assert!(matches!(err, HubError::AlreadyExists(_)), "{err:?}");

    let builtin = manager.get("code-review").unwrap();
    assert_eq!(builtin.tier, Tier::Bundled);
    assert!(!builtin.enabled);
    assert_ne!(builtin.prompt, "Remote body.");
    assert!(manager.list_by_tier(Tier::Managed).is_empty());
}

#[test]
fn install_does_not_overwrite_a_user_skill() {
    let server = MockServer::start();
    mock_single(&server, "notes", "Remote Notes");
    let (store, manager) = store(&server);
    let mut req = CreateSkillRequest::new("notes", "My Notes");
    req.prompt = "Mine.".to_string();
    manager.create(req).unwrap();

    assert!(matches!(
        store.install_skill("acme", "notes"),
        Err(HubError::AlreadyExists(_))
    ));
    let mine = manager.get("notes").unwrap();
    assert_eq!(mine.tier, Tier::Extra);
    assert_eq!(mine.prompt, "Mine.");
}

#[test]
fn reinstall_keeps_a_disabled_managed_skill_disabled() {
    let server = MockServer::start();
    mock_single(&server, "notes", "Remote Notes");
    let (store, manager) = store(&server);

    store.install_skill("acme", "notes").unwrap();
    manager
        .update("notes", UpdateSkillRequest::enabled(false))
        .unwrap();

    let refreshed = store.install_skill("acme", "notes").unwrap();
    assert_eq!(refreshed.tier, Tier::Managed);
    assert!(!refreshed.enabled);
    assert_eq!(refreshed.prompt, "Remote body.");
}
