//! Integration tests for the server-side filesystem engine
//!
//! Runs stat/list/open/read/close against a real temporary share.

use fsdriver_core::application::fs_engine::FileSystemEngine;
use fsdriver_core::domain::fs_error::FsErrorKind;
use fsdriver_core::domain::path_confinement::PathConfinement;
use std::sync::Arc;
use tempfile::TempDir;

/// Share with `a.txt` ("hello") and an empty `sub/`
fn sample_share() -> (TempDir, FileSystemEngine) {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.txt"), b"hello").unwrap();
    std::fs::create_dir(dir.path().join("sub")).unwrap();
    let engine = FileSystemEngine::new(PathConfinement::new(dir.path()).unwrap());
    (dir, engine)
}

#[tokio::test]
async fn test_basic_scenario() {
    let (_dir, engine) = sample_share();

    let info = engine.stat("a.txt").await.unwrap();
    assert_eq!(info.name, "a.txt");
    assert!(!info.is_dir);
    assert_eq!(info.size, 5);

    let h = engine.open("a.txt", 0).await.unwrap();
    assert_eq!(engine.read(h, 0, 10).await.unwrap(), b"hello");
    assert!(engine.read(h, 5, 10).await.unwrap().is_empty());

    engine.close(h).await.unwrap();
    let err = engine.close(h).await.unwrap_err();
    assert_eq!(err.kind, FsErrorKind::InvalidArgument);
    assert!(err.message.contains("bad handle"));

    let page = engine.read_dir("", 0, 0).await.unwrap();
    let names: Vec<_> = page.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["a.txt", "sub"]);
    assert!(!page.has_more);
    assert!(page.entries[1].is_dir);
}

#[tokio::test]
async fn test_stat_missing_is_not_found() {
    let (_dir, engine) = sample_share();
    let err = engine.stat("nope.txt").await.unwrap_err();
    assert_eq!(err.kind, FsErrorKind::NotFound);
    assert_eq!(err.code(), 2);
}

#[tokio::test]
async fn test_stat_root() {
    let (_dir, engine) = sample_share();
    assert!(engine.stat("").await.unwrap().is_dir);
    assert!(engine.stat(".").await.unwrap().is_dir);
    assert!(engine.stat("/").await.unwrap().is_dir);
}

#[tokio::test]
async fn test_escape_is_permission_denied() {
    let (_dir, engine) = sample_share();
    for path in ["..", "../etc/passwd", "sub/../../x"] {
        let err = engine.stat(path).await.unwrap_err();
        assert_eq!(err.kind, FsErrorKind::PermissionDenied, "{path}");
        assert_eq!(err.message, "path escapes share root");
    }
    assert!(engine.open("../a.txt", 0).await.is_err());
    assert!(engine.read_dir("..", 0, 0).await.is_err());
}

#[tokio::test]
async fn test_partial_read_mid_file() {
    let (_dir, engine) = sample_share();
    let h = engine.open("a.txt", 0).await.unwrap();

    assert_eq!(engine.read(h, 3, 10).await.unwrap(), b"lo");
    assert_eq!(engine.read(h, 1, 3).await.unwrap(), b"ell");
    assert!(engine.read(h, 100, 10).await.unwrap().is_empty());
    assert!(engine.read(h, 0, 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_read_rejects_negative_arguments() {
    let (_dir, engine) = sample_share();
    let h = engine.open("a.txt", 0).await.unwrap();

    let err = engine.read(h, -1, 10).await.unwrap_err();
    assert_eq!(err.kind, FsErrorKind::InvalidArgument);

    let err = engine.read(h, 0, -1).await.unwrap_err();
    assert_eq!(err.kind, FsErrorKind::InvalidArgument);
}

#[tokio::test]
async fn test_read_unknown_handle() {
    let (_dir, engine) = sample_share();
    let err = engine.read(12345, 0, 1).await.unwrap_err();
    assert_eq!(err.kind, FsErrorKind::InvalidArgument);
    assert!(err.message.contains("bad handle"));
}

#[tokio::test]
async fn test_read_clamped_to_max() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("big.bin"), vec![7u8; 4096]).unwrap();
    let engine = FileSystemEngine::new(PathConfinement::new(dir.path()).unwrap()).with_max_read_bytes(1000);

    let h = engine.open("big.bin", 0).await.unwrap();
    assert_eq!(engine.read(h, 0, 4096).await.unwrap().len(), 1000);
}

#[tokio::test]
async fn test_open_directory_then_read_fails() {
    let (_dir, engine) = sample_share();
    // Opening a directory succeeds on unix; reading it does not
    if let Ok(h) = engine.open("sub", 0).await {
        let err = engine.read(h, 0, 10).await.unwrap_err();
        assert_eq!(err.kind, FsErrorKind::IoFailure);
        engine.close(h).await.unwrap();
    }
}

#[tokio::test]
async fn test_pagination_concatenates_to_full_listing() {
    let dir = TempDir::new().unwrap();
    for i in 0..23 {
        std::fs::write(dir.path().join(format!("f{i:02}")), b"").unwrap();
    }
    let engine = FileSystemEngine::new(PathConfinement::new(dir.path()).unwrap());

    let full = engine.read_dir("", 0, 0).await.unwrap();
    assert_eq!(full.entries.len(), 23);

    for page_size in [1, 4, 7, 23, 50] {
        let mut collected = Vec::new();
        let mut offset = 0;
        loop {
            let page = engine.read_dir("", offset, page_size).await.unwrap();
            offset += page.entries.len() as i32;
            collected.extend(page.entries);
            if !page.has_more {
                break;
            }
        }
        assert_eq!(collected, full.entries, "page size {page_size}");
    }
}

#[tokio::test]
async fn test_read_dir_negative_limit_is_unlimited() {
    let (_dir, engine) = sample_share();
    let page = engine.read_dir("", 0, -1).await.unwrap();
    assert_eq!(page.entries.len(), 2);
    assert!(!page.has_more);
}

#[tokio::test]
async fn test_read_dir_negative_offset_rejected() {
    let (_dir, engine) = sample_share();
    let err = engine.read_dir("", -1, 0).await.unwrap_err();
    assert_eq!(err.kind, FsErrorKind::InvalidArgument);
}

#[tokio::test]
async fn test_read_dir_on_file_fails() {
    let (_dir, engine) = sample_share();
    assert!(engine.read_dir("a.txt", 0, 0).await.is_err());
}

#[cfg(unix)]
#[tokio::test]
async fn test_symlink_reported_but_not_followed_outside() {
    let outside = TempDir::new().unwrap();
    std::fs::write(outside.path().join("secret"), b"top secret").unwrap();

    let (dir, engine) = sample_share();
    std::os::unix::fs::symlink(outside.path().join("secret"), dir.path().join("leak")).unwrap();
    std::os::unix::fs::symlink(outside.path(), dir.path().join("leakdir")).unwrap();

    let info = engine.stat("leak").await.unwrap();
    assert!(info.is_symlink);

    let err = engine.open("leak", 0).await.unwrap_err();
    assert_eq!(err.kind, FsErrorKind::PermissionDenied);

    let err = engine.read_dir("leakdir", 0, 0).await.unwrap_err();
    assert_eq!(err.kind, FsErrorKind::PermissionDenied);
}

#[cfg(unix)]
#[tokio::test]
async fn test_stat_through_symlinked_directory_is_denied() {
    let outside = TempDir::new().unwrap();
    std::fs::write(outside.path().join("secret.txt"), b"top secret").unwrap();
    std::fs::create_dir(outside.path().join("nested")).unwrap();

    let (dir, engine) = sample_share();
    std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();

    // The link itself is still visible
    assert!(engine.stat("link").await.unwrap().is_symlink);

    for path in ["link/secret.txt", "link/nested", "link/missing", "link/nested/deeper"] {
        let err = engine.stat(path).await.unwrap_err();
        assert_eq!(err.kind, FsErrorKind::PermissionDenied, "{path}");
        assert_eq!(err.message, "path escapes share root");
    }
}

#[cfg(unix)]
#[tokio::test]
async fn test_stat_through_symlinked_directory_within_share() {
    let (dir, engine) = sample_share();
    std::fs::write(dir.path().join("sub/b.txt"), b"bee").unwrap();
    std::os::unix::fs::symlink(dir.path().join("sub"), dir.path().join("alias")).unwrap();

    let info = engine.stat("alias/b.txt").await.unwrap();
    assert_eq!(info.name, "b.txt");
    assert_eq!(info.size, 3);
}

#[cfg(unix)]
#[tokio::test]
async fn test_symlink_within_share_can_be_opened() {
    let (dir, engine) = sample_share();
    std::os::unix::fs::symlink(dir.path().join("a.txt"), dir.path().join("alias")).unwrap();

    let h = engine.open("alias", 0).await.unwrap();
    assert_eq!(engine.read(h, 0, 5).await.unwrap(), b"hello");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reads_on_one_handle() {
    let dir = TempDir::new().unwrap();
    let content: Vec<u8> = (0..=255u8).cycle().take(64 * 1024).collect();
    std::fs::write(dir.path().join("data.bin"), &content).unwrap();
    let engine = Arc::new(FileSystemEngine::new(PathConfinement::new(dir.path()).unwrap()));
    let h = engine.open("data.bin", 0).await.unwrap();

    let mut tasks = Vec::new();
    for i in 0..32i64 {
        let engine = engine.clone();
        let expected = content.clone();
        tasks.push(tokio::spawn(async move {
            let offset = (i * 1999) % 60_000;
            let data = engine.read(h, offset, 512).await.unwrap();
            assert_eq!(data, &expected[offset as usize..offset as usize + 512]);
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }
    engine.close(h).await.unwrap();
    assert_eq!(engine.open_handles(), 0);
}
