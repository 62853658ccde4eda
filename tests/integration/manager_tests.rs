use std::sync::Arc;
use std::thread;

use skillhub::core::skill::{CreateSkillRequest, LoadLevel, Tier, UpdateSkillRequest};
use skillhub::diagnostics::Diagnostics;
use skillhub::manager::SkillManager;
use skillhub::storage::JsonFileCatalogStore;
use skillhub::test_utils::fixtures::{WorkspaceFixture, sample_skill, skill_md};
use tempfile::TempDir;

fn open(dir: &TempDir) -> SkillManager {
    let store = Arc::new(JsonFileCatalogStore::new(dir.path().join("catalog.json")));
    SkillManager::new(store, Diagnostics::none()).unwrap()
}

fn request(id: &str, prompt: &str) -> CreateSkillRequest {
    let mut req = CreateSkillRequest::new(id, id.to_uppercase());
    req.prompt = prompt.to_string();
    req
}

#[test]
fn catalog_survives_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let mgr = open(&dir);
        mgr.create(request("deploy", "Ship it.")).unwrap();
        let mut managed = request("lint", "Lint.");
        managed.tier = Some(Tier::Managed);
        mgr.create(managed).unwrap();
        mgr.update("code-review", UpdateSkillRequest::enabled(false)).unwrap();
    }

    let mgr = open(&dir);
    assert_eq!(mgr.get("deploy").unwrap().prompt, "Ship it.");
    assert_eq!(mgr.get("lint").unwrap().tier, Tier::Managed);
    let review = mgr.get("code-review").unwrap();
    assert!(review.built_in);
    assert!(!review.enabled);
}

#[test]
fn extra_shadows_workspace_and_delete_reveals_it() {
    let dir = TempDir::new().unwrap();
    let fx = WorkspaceFixture::new();
    let mgr = open(&dir);

    let mut local = sample_skill("deploy", Tier::Workspace);
    local.prompt = "workspace prompt".to_string();
    mgr.set_workspace_skills(&fx.root, vec![local]);
    mgr.create(request("deploy", "extra prompt")).unwrap();

    let winner = mgr.loader().load("deploy", LoadLevel::Body).unwrap();
    assert_eq!(winner.tier, Tier::Extra);
    assert_eq!(winner.prompt, "extra prompt");
    assert_eq!(mgr.overrides("deploy"), vec![Tier::Workspace]);

    mgr.delete("deploy").unwrap();
    let revealed = mgr.loader().load("deploy", LoadLevel::Body).unwrap();
    assert_eq!(revealed.tier, Tier::Workspace);
    assert_eq!(revealed.prompt, "workspace prompt");
    assert_eq!(revealed.source_path.as_deref(), Some(fx.root.as_path()));
}

#[test]
fn workspace_skills_cannot_be_edited_through_manager() {
    let dir = TempDir::new().unwrap();
    let fx = WorkspaceFixture::new();
    fx.write_skill("pdf", &skill_md("PDF", "/pdf", "Read PDFs."));
    let mgr = open(&dir);
    let skill = skillhub::skill_md::load_skill_dir(&fx.skill_dir("pdf"), Tier::Workspace).unwrap();
    mgr.set_workspace_skills(&fx.root, vec![skill]);

    let err = mgr.update("pdf", UpdateSkillRequest::enabled(false)).unwrap_err();
    assert!(matches!(err, skillhub::HubError::Forbidden(_)));
    assert!(!dir.path().join("catalog.json").exists());
}

#[test]
fn concurrent_readers_and_writers_stay_consistent() {
    let dir = TempDir::new().unwrap();
    let mgr = Arc::new(open(&dir));
    let bundled = mgr.list().len();

    let writers: Vec<_> = (0..4)
        .map(|w| {
            let mgr = Arc::clone(&mgr);
            thread::spawn(move || {
                for i in 0..10 {
                    mgr.create(request(&format!("w{w}-s{i}"), "p")).unwrap();
                }
            })
        })
        .collect();
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let mgr = Arc::clone(&mgr);
            thread::spawn(move || {
                for _ in 0..50 {
                    let listed = mgr.list();
                    assert!(listed.len() >= bundled);
                    let unique: std::collections::BTreeSet<_> = listed.iter().map(|s| &s.id).collect();
                    assert_eq!(unique.len(), listed.len());
                    assert!(mgr.get("code-review").is_ok());
                }
            })
        })
        .collect();

    for handle in writers.into_iter().chain(readers) {
        handle.join().unwrap();
    }
    assert_eq!(mgr.list().len(), bundled + 40);

    let reopened = open(&dir);
    assert_eq!(reopened.list().len(), bundled + 40);
}
