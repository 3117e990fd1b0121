// Full cycles: plan, apply, records

use crate::common::{drain, tree, Fixture};
use foldersync::sync::{ExcludePatterns, RecordKind, SymlinkPolicy, SyncAction};
use std::fs;
use std::path::PathBuf;

#[tokio::test]
async fn test_copy_then_noop_then_update() {
    let fx = Fixture::new();
    fs::create_dir(&fx.replica).unwrap();
    fx.write_source("a.txt", b"hello");
    let (engine, mut rx) = fx.engine(fx.config());

    let plan = engine.plan().await.unwrap();
    assert_eq!(
        plan.actions,
        vec![SyncAction::CopyFile {
            path: PathBuf::from("a.txt")
        }]
    );

    let result = engine.run_cycle(1, &foldersync::sync::StopSignal::never()).await;
    assert!(result.is_clean());
    assert_eq!(result.bytes_copied, 5);
    assert_eq!(fs::read(fx.replica.join("a.txt")).unwrap(), b"hello");

    let records = drain(&mut rx);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, RecordKind::Copy);
    assert_eq!(records[0].path, fx.replica.join("a.txt"));
    assert!(records[0].message.starts_with("Copied file:"));

    assert!(engine.plan().await.unwrap().actions.is_empty());

    fx.write_source("a.txt", b"world");
    let plan = engine.plan().await.unwrap();
    assert_eq!(
        plan.actions,
        vec![SyncAction::UpdateFile {
            path: PathBuf::from("a.txt")
        }]
    );

    let result = engine.run_once().await;
    assert!(result.is_clean());
    assert_eq!(fs::read(fx.replica.join("a.txt")).unwrap(), b"world");
    assert_eq!(drain(&mut rx)[0].kind, RecordKind::Update);
}

#[tokio::test]
async fn test_missing_replica_root_is_created() {
    let fx = Fixture::new();
    fx.write_source("docs/readme.md", b"# hi");
    let (engine, mut rx) = fx.engine(fx.config());

    let result = engine.run_once().await;

    assert!(result.is_clean());
    assert_eq!(fs::read(fx.replica.join("docs/readme.md")).unwrap(), b"# hi");
    let records = drain(&mut rx);
    assert_eq!(records[0].kind, RecordKind::Create);
    assert_eq!(records[0].path, fx.replica);
}

#[tokio::test]
async fn test_same_size_different_content_is_updated() {
    let fx = Fixture::new();
    fx.write_source("data.bin", b"aaaa");
    fx.write_replica("data.bin", b"bbbb");
    let (engine, _rx) = fx.engine(fx.config());

    let result = engine.run_once().await;

    assert!(result.is_clean());
    assert_eq!(result.succeeded, 1);
    assert_eq!(fs::read(fx.replica.join("data.bin")).unwrap(), b"aaaa");
}

#[tokio::test]
async fn test_extras_are_deleted_with_records() {
    let fx = Fixture::new();
    fx.write_source("keep.txt", b"k");
    fx.write_replica("keep.txt", b"k");
    fx.write_replica("old/nested/deep.txt", b"x");
    fx.write_replica("stale.txt", b"s");
    let (engine, mut rx) = fx.engine(fx.config());

    let result = engine.run_once().await;

    assert!(result.is_clean());
    assert!(!fx.replica.join("old").exists());
    assert!(!fx.replica.join("stale.txt").exists());
    assert!(fx.replica.join("keep.txt").exists());

    let records = drain(&mut rx);
    assert!(!records.is_empty());
    assert!(records.iter().all(|r| r.kind == RecordKind::Delete));
}

#[tokio::test]
async fn test_file_replaced_by_directory_and_back() {
    let fx = Fixture::new();
    fx.write_source("x/inner.txt", b"in");
    fx.write_replica("x", b"was a file");
    let (engine, _rx) = fx.engine(fx.config());

    assert!(engine.run_once().await.is_clean());
    assert!(fx.replica.join("x").is_dir());
    assert_eq!(fs::read(fx.replica.join("x/inner.txt")).unwrap(), b"in");

    fs::remove_dir_all(fx.source.join("x")).unwrap();
    fx.write_source("x", b"file again");

    assert!(engine.run_once().await.is_clean());
    assert!(fx.replica.join("x").is_file());
    assert_eq!(fs::read(fx.replica.join("x")).unwrap(), b"file again");
}

#[tokio::test]
async fn test_excluded_paths_untouched_on_both_sides() {
    let fx = Fixture::new();
    fx.write_source("main.rs", b"fn main() {}");
    fx.write_source("target/out.o", b"obj");
    fx.write_replica("target/local.o", b"mine");
    fx.write_replica("notes.tmp", b"scratch");

    let exclude = ExcludePatterns::from_patterns(&["target", "*.tmp"]).unwrap();
    let (engine, _rx) = fx.engine(fx.config().with_exclude(exclude));

    assert!(engine.run_once().await.is_clean());

    assert!(fx.replica.join("main.rs").exists());
    assert!(!fx.replica.join("target/out.o").exists());
    assert_eq!(fs::read(fx.replica.join("target/local.o")).unwrap(), b"mine");
    assert!(fx.replica.join("notes.tmp").exists());
}

#[tokio::test]
async fn test_excluded_file_survives_in_extra_directory() {
    let fx = Fixture::new();
    fx.write_source("main.rs", b"fn main() {}");
    fx.write_replica("old/keep.log", b"keep me");
    fx.write_replica("old/drop.txt", b"drop me");

    let exclude = ExcludePatterns::from_patterns(&["*.log"]).unwrap();
    let (engine, _rx) = fx.engine(fx.config().with_exclude(exclude));

    let result = engine.run_once().await;

    assert!(result.is_clean(), "failures: {:?}", result.failures);
    assert_eq!(fs::read(fx.replica.join("old/keep.log")).unwrap(), b"keep me");
    assert!(!fx.replica.join("old/drop.txt").exists());
    assert!(fx.replica.join("main.rs").exists());
    assert!(engine.plan().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_dry_run_leaves_replica_alone() {
    let fx = Fixture::new();
    fx.write_source("new.txt", b"n");
    fx.write_replica("extra.txt", b"e");
    let before = tree(&fx.replica);
    let (engine, mut rx) = fx.engine(fx.config().with_dry_run(true));

    let result = engine.run_once().await;

    assert!(result.dry_run);
    assert!(result.is_clean());
    assert_eq!(tree(&fx.replica), before);
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_missing_source_aborts_cycle() {
    let fx = Fixture::new();
    fs::remove_dir(&fx.source).unwrap();
    fs::create_dir(&fx.replica).unwrap();
    fx.write_replica("survivor.txt", b"s");
    let (engine, mut rx) = fx.engine(fx.config());

    let result = engine.run_once().await;

    assert!(result.aborted);
    assert!(!result.is_clean());
    assert!(fx.replica.join("survivor.txt").exists());
    let records = drain(&mut rx);
    assert_eq!(records.len(), 1);
    assert!(records[0].is_error());
    assert!(records[0].message.contains("aborted"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_unreadable_source_subtree_aborts_cycle() {
    use std::os::unix::fs::PermissionsExt;

    let fx = Fixture::new();
    fx.write_source("a.txt", b"a");
    fx.write_source("locked/inner.txt", b"secret");
    fs::create_dir(&fx.replica).unwrap();
    fx.write_replica("locked/inner.txt", b"secret");
    fx.write_replica("extra.txt", b"e");
    let before = tree(&fx.replica);

    let locked = fx.source.join("locked");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
    // Privileged users read through mode 000; nothing to observe then.
    let privileged = fs::read_dir(&locked).is_ok();

    let (engine, mut rx) = fx.engine(fx.config());
    let result = engine.run_once().await;
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    if privileged {
        return;
    }
    assert!(result.aborted);
    assert_eq!(result.attempted, 0);
    assert_eq!(tree(&fx.replica), before);
    let records = drain(&mut rx);
    assert_eq!(records.len(), 1);
    assert!(records[0].is_error());
}

#[cfg(unix)]
#[tokio::test]
async fn test_source_symlink_reported_not_copied() {
    let fx = Fixture::new();
    fx.write_source("real.txt", b"r");
    std::os::unix::fs::symlink(fx.source.join("real.txt"), fx.source.join("link.txt")).unwrap();
    let (engine, mut rx) = fx.engine(fx.config());

    let result = engine.run_once().await;

    assert!(!result.is_clean());
    assert_eq!(result.failures.len(), 1);
    assert!(fx.replica.join("real.txt").exists());
    assert!(fs::symlink_metadata(fx.replica.join("link.txt")).is_err());
    assert!(drain(&mut rx).iter().any(|r| r.is_error()));
}

#[cfg(unix)]
#[tokio::test]
async fn test_follow_policy_copies_link_target() {
    let fx = Fixture::new();
    fx.write_source("real.txt", b"target content");
    std::os::unix::fs::symlink(fx.source.join("real.txt"), fx.source.join("link.txt")).unwrap();
    let (engine, _rx) = fx.engine(fx.config().with_symlinks(SymlinkPolicy::Follow));

    let result = engine.run_once().await;

    assert!(result.is_clean());
    let meta = fs::symlink_metadata(fx.replica.join("link.txt")).unwrap();
    assert!(meta.file_type().is_file());
    assert_eq!(fs::read(fx.replica.join("link.txt")).unwrap(), b"target content");
}

#[cfg(unix)]
#[tokio::test]
async fn test_replica_symlink_removed_without_touching_target() {
    let fx = Fixture::new();
    let outside = fx.dir.path().join("outside");
    fs::create_dir(&outside).unwrap();
    fs::write(outside.join("precious.txt"), b"p").unwrap();
    fs::create_dir(&fx.replica).unwrap();
    std::os::unix::fs::symlink(&outside, fx.replica.join("dirlink")).unwrap();
    let (engine, _rx) = fx.engine(fx.config());

    assert!(engine.run_once().await.is_clean());

    assert!(fs::symlink_metadata(fx.replica.join("dirlink")).is_err());
    assert!(outside.join("precious.txt").exists());
}
