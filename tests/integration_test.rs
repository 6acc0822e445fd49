use assert_cmd::Command;
use assert_cmd::cargo;
use papapackage::{
    package::default_ignore_dirs,
    plan::{Destination, WatchEntry},
    runtime::RealRuntime,
    snapshot::{PlanOptions, Snapshot},
    sync::{SyncExecutor, subscribe_watch_plan},
    watcher::{ChangeEvent, FileChange, NotifyWatcher, SubscriptionName},
};
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::tempdir;
use tokio::sync::mpsc;

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// `app` depends on `lib`; app's installed copy of lib declares no framework.
fn create_monorepo(root: &Path) {
    write(
        &root.join("lib/package.json"),
        r#"{ "name": "lib", "version": "1.0.0" }"#,
    );
    write(
        &root.join("app/package.json"),
        r#"{ "name": "app", "version": "0.1.0", "dependencies": { "lib": "1.0.0" } }"#,
    );
    write(
        &root.join("app/node_modules/lib/package.json"),
        r#"{ "name": "lib", "version": "1.0.0" }"#,
    );
}

#[test]
fn test_missing_folder_is_fatal() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("does-not-exist");

    Command::new(cargo::cargo_bin!("papapackage"))
        .arg(&missing)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Directory not found"));
}

#[test]
fn test_file_as_folder_is_fatal() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("package.json");
    fs::write(&file, "{}").unwrap();

    Command::new(cargo::cargo_bin!("papapackage"))
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Directory not found"));
}

#[test]
fn test_help_lists_options() {
    Command::new(cargo::cargo_bin!("papapackage"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("FOLDER"))
        .stdout(predicate::str::contains("--link-cli"))
        .stdout(predicate::str::contains("--skip-up-to-date"));
}

#[test]
fn test_version_flag() {
    Command::new(cargo::cargo_bin!("papapackage"))
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("papapackage "));
}

#[test_log::test(tokio::test)]
async fn test_change_in_lib_is_copied_into_app() {
    let dir = tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    create_monorepo(&root);

    // --- Plan ---

    let snapshot = Snapshot::build(&RealRuntime, &PlanOptions::new(&root)).unwrap();

    assert_eq!(snapshot.targets.len(), 1);
    assert_eq!(snapshot.targets[0].source.name.as_deref(), Some("lib"));
    assert!(snapshot.plan.link_plan.is_empty());
    assert_eq!(snapshot.plan.watch_plan.len(), 1);

    // --- Change notification for lib/index.js ---

    write(&root.join("lib/index.js"), "module.exports = 42;");
    let event = ChangeEvent {
        subscription: SubscriptionName::new(root.join("lib"), None).to_string(),
        root: root.join("lib"),
        files: vec![FileChange::file("index.js")],
    };

    let executor = SyncExecutor::new(Arc::new(RealRuntime), snapshot.plan.watch_plan.clone());
    let tasks = executor.translate(&event);
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].to, root.join("app/node_modules/lib/index.js"));

    let report = executor.execute(tasks).await;

    // --- Verify ---

    assert!(report.is_success());
    assert_eq!(
        fs::read_to_string(root.join("app/node_modules/lib/index.js")).unwrap(),
        "module.exports = 42;"
    );
}

#[cfg(unix)]
#[test_log::test(tokio::test)]
async fn test_symlinked_lib_install_keeps_source_intact() {
    let dir = tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    write(
        &root.join("lib/package.json"),
        r#"{ "name": "lib", "version": "1.0.0" }"#,
    );
    write(
        &root.join("app/package.json"),
        r#"{ "name": "app", "version": "0.1.0", "dependencies": { "lib": "1.0.0" } }"#,
    );
    write(&root.join("lib/index.js"), "module.exports = 42;");
    fs::create_dir_all(root.join("app/node_modules")).unwrap();
    std::os::unix::fs::symlink(root.join("lib"), root.join("app/node_modules/lib")).unwrap();

    // --- Plan ---

    let snapshot = Snapshot::build(&RealRuntime, &PlanOptions::new(&root)).unwrap();

    assert_eq!(snapshot.targets.len(), 1);
    assert!(snapshot.plan.watch_plan.is_empty());

    // --- Copy through the symlink anyway ---

    let executor = SyncExecutor::new(
        Arc::new(RealRuntime),
        vec![WatchEntry {
            source_folder: root.join("lib"),
            destinations: vec![Destination {
                destination_folder: root.join("app"),
                dependency_name: "lib".to_string(),
            }],
        }],
    );
    let event = ChangeEvent {
        subscription: SubscriptionName::new(root.join("lib"), None).to_string(),
        root: root.join("lib"),
        files: vec![FileChange::file("index.js")],
    };
    let report = executor.handle(&event).await;

    // --- Verify ---

    assert!(report.is_success());
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(
        fs::read_to_string(root.join("lib/index.js")).unwrap(),
        "module.exports = 42;"
    );
}

#[test_log::test(tokio::test)]
async fn test_live_watch_copies_new_file() {
    let dir = tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    create_monorepo(&root);

    let snapshot = Snapshot::build(&RealRuntime, &PlanOptions::new(&root)).unwrap();
    let ignore = default_ignore_dirs();

    let (sender, mut events) = mpsc::unbounded_channel();
    let mut watcher = NotifyWatcher::new(sender, ignore.clone());
    let subscriptions =
        subscribe_watch_plan(&mut watcher, &RealRuntime, &snapshot.plan.watch_plan, &ignore);
    assert_eq!(subscriptions.len(), 1);
    assert!(root.join("lib/.watchmanconfig").exists());

    let executor = SyncExecutor::new(Arc::new(RealRuntime), snapshot.plan.watch_plan.clone());
    let target = root.join("app/node_modules/lib/util.js");

    write(&root.join("lib/util.js"), "export const x = 1;");

    // Create and modify may arrive as separate events; wait for the final content
    let expected = "export const x = 1;";
    let deadline = Instant::now() + Duration::from_secs(10);
    while fs::read_to_string(&target).ok().as_deref() != Some(expected) && Instant::now() < deadline {
        if let Ok(Some(event)) =
            tokio::time::timeout(Duration::from_millis(200), events.recv()).await
        {
            executor.handle(&event).await;
        }
    }

    assert_eq!(fs::read_to_string(&target).unwrap(), expected);
}
