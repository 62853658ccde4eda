use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::unbounded;
use skillhub::core::skill::{LoadLevel, Tier};
use skillhub::diagnostics::Diagnostics;
use skillhub::manager::SkillManager;
use skillhub::storage::MemoryCatalogStore;
use skillhub::test_utils::fixtures::{WorkspaceFixture, skill_md};
use skillhub::workspace::{WatcherOptions, WorkspaceChange, WorkspaceWatcher};

fn manager() -> Arc<SkillManager> {
    Arc::new(SkillManager::new(Arc::new(MemoryCatalogStore::new()), Diagnostics::none()).unwrap())
}

fn watcher() -> WorkspaceWatcher {
    WorkspaceWatcher::new(
        WatcherOptions {
            debounce: Duration::from_millis(100),
            ..WatcherOptions::default()
        },
        Diagnostics::none(),
    )
}

#[test]
fn full_load_reads_reference_files() {
    let fx = WorkspaceFixture::new();
    fx.write_skill("pdf", &skill_md("PDF", "/pdf", "Read PDFs."));
    fx.write_reference("pdf", "forms.md", "# Forms");
    fx.write_reference("pdf", "nested/tables.md", "# Tables");

    let mgr = manager();
    let skills = watcher().load_workspace_skills(&fx.root);
    mgr.set_workspace_skills(&fx.root, skills);

    let body = mgr.loader().load("pdf", LoadLevel::Body).unwrap();
    assert!(body.files.is_empty());

    let full = mgr.loader().load("pdf", LoadLevel::Full).unwrap();
    let paths: Vec<_> = full.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["references/forms.md", "references/nested/tables.md"]);
    assert_eq!(full.files[0].content, "# Forms");
}

#[test]
fn override_file_is_laid_over_definition() {
    let fx = WorkspaceFixture::new();
    fx.write_skill("pdf", &skill_md("PDF", "/pdf", "Read PDFs."));
    fx.create_file(
        ".claude/skills/pdf/skill.override.yaml",
        "command: /read-pdf\ncategory: documents\nenabled: false\n",
    );

    let skills = watcher().load_workspace_skills(&fx.root);
    assert_eq!(skills.len(), 1);
    assert_eq!(skills[0].command, "/read-pdf");
    assert_eq!(skills[0].category, "documents");
    assert!(!skills[0].enabled);
    assert_eq!(skills[0].name, "PDF");
}

#[test]
fn live_edits_reach_the_manager() {
    let fx = WorkspaceFixture::new();
    fx.write_skill("pdf", &skill_md("PDF", "/pdf", "Version one."));

    let mgr = manager();
    let watcher = watcher();
    mgr.set_workspace_skills(&fx.root, watcher.load_workspace_skills(&fx.root));
    assert_eq!(mgr.loader().load("pdf", LoadLevel::Body).unwrap().prompt, "Version one.");

    let (tx, rx) = unbounded::<WorkspaceChange>();
    let sink = Arc::clone(&mgr);
    assert!(
        watcher
            .watch_workspace(
                &fx.root,
                Arc::new(move |change| {
                    sink.apply_workspace_change(&change);
                    let _ = tx.send(change);
                }),
            )
            .unwrap()
    );

    fx.write_skill("pdf", &skill_md("PDF", "/pdf", "Version two."));
    let change = rx.recv_timeout(Duration::from_secs(10)).expect("update event");
    assert_eq!(change.updated.len(), 1);
    let reloaded = mgr.loader().load("pdf", LoadLevel::Body).unwrap();
    assert_eq!(reloaded.prompt, "Version two.");
    assert_eq!(reloaded.tier, Tier::Workspace);

    fx.remove_skill("pdf");
    let change = rx.recv_timeout(Duration::from_secs(10)).expect("remove event");
    assert_eq!(change.removed, vec!["pdf".to_string()]);
    assert!(mgr.get("pdf").is_err());

    watcher.close();
    assert!(watcher.watched().is_empty());
}
