// Mirror properties over a messy pair of trees

use crate::common::{tree, Fixture};
use foldersync::sync::SyncAction;
use std::fs;
use std::path::Path;

/// Source and replica that disagree in every way the differ knows about.
fn messy_fixture() -> Fixture {
    let fx = Fixture::new();
    fx.write_source("same.txt", b"same");
    fx.write_source("changed.txt", b"new content");
    fx.write_source("a/b/c/deep.txt", b"deep");
    fx.write_source("a/sibling.txt", b"sib");
    fx.write_source("swap", b"now a file");
    fs::create_dir_all(fx.source.join("empty/dir")).unwrap();

    fx.write_replica("same.txt", b"same");
    fx.write_replica("changed.txt", b"old");
    fx.write_replica("a/b/stale.txt", b"stale");
    fx.write_replica("gone/x/y/z.txt", b"z");
    fx.write_replica("swap/child.txt", b"was a dir");
    fx
}

#[tokio::test]
async fn test_one_cycle_converges() {
    let fx = messy_fixture();
    let (engine, _rx) = fx.engine(fx.config());

    let result = engine.run_once().await;

    assert!(result.is_clean(), "failures: {:?}", result.failures);
    assert_eq!(tree(&fx.replica), tree(&fx.source));
    assert!(engine.plan().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_source_is_never_modified() {
    let fx = messy_fixture();
    let before = tree(&fx.source);
    let mtime_before = fs::metadata(fx.source.join("changed.txt")).unwrap().modified().unwrap();
    let (engine, _rx) = fx.engine(fx.config());

    engine.run_once().await;
    engine.run_once().await;

    assert_eq!(tree(&fx.source), before);
    let mtime_after = fs::metadata(fx.source.join("changed.txt")).unwrap().modified().unwrap();
    assert_eq!(mtime_before, mtime_after);
}

#[tokio::test]
async fn test_nothing_survives_outside_source() {
    let fx = messy_fixture();
    let (engine, _rx) = fx.engine(fx.config());

    engine.run_once().await;

    for rel in tree(&fx.replica).keys() {
        assert!(fx.source.join(rel).exists(), "extra left behind: {}", rel.display());
    }
    assert!(!fx.replica.join("gone").exists());
}

#[tokio::test]
async fn test_plan_order_is_safe() {
    let fx = messy_fixture();
    let (engine, _rx) = fx.engine(fx.config());

    let plan = engine.plan().await.unwrap();
    let actions = &plan.actions;

    let first_creation = actions.iter().position(|a| !a.is_deletion()).unwrap_or(actions.len());
    assert!(actions[first_creation..].iter().all(|a| !a.is_deletion()));

    for (i, action) in actions.iter().enumerate() {
        match action {
            // A directory is removed only after everything planned beneath it.
            SyncAction::DeleteDirectory { path } => {
                assert!(!actions[i + 1..]
                    .iter()
                    .any(|later| later.is_deletion() && is_strictly_under(later.path(), path)));
            }
            // A parent directory is created before anything written into it.
            SyncAction::CopyFile { path }
            | SyncAction::UpdateFile { path }
            | SyncAction::CreateDirectory { path } => {
                assert!(!actions[i + 1..].iter().any(|later| {
                    matches!(later, SyncAction::CreateDirectory { .. })
                        && is_strictly_under(path, later.path())
                }));
            }
            SyncAction::DeleteFile { .. } => {}
        }
    }
}

#[tokio::test]
async fn test_plan_covers_every_difference() {
    let fx = messy_fixture();
    let (engine, _rx) = fx.engine(fx.config());

    let plan = engine.plan().await.unwrap();
    let has = |want: SyncAction| plan.actions.contains(&want);

    assert!(has(SyncAction::UpdateFile { path: "changed.txt".into() }));
    assert!(has(SyncAction::CopyFile { path: "a/b/c/deep.txt".into() }));
    assert!(has(SyncAction::CreateDirectory { path: "empty/dir".into() }));
    assert!(has(SyncAction::DeleteFile { path: "a/b/stale.txt".into() }));
    assert!(has(SyncAction::DeleteDirectory { path: "gone".into() }));
    assert!(has(SyncAction::DeleteDirectory { path: "swap".into() }));
    assert!(has(SyncAction::CopyFile { path: "swap".into() }));
    assert!(!plan.actions.iter().any(|a| a.path() == Path::new("same.txt")));
}

fn is_strictly_under(path: &Path, ancestor: &Path) -> bool {
    path != ancestor && path.starts_with(ancestor)
}
