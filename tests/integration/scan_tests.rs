use std::fs;
use std::path::Path;

use tempfile::tempdir;
use vault_revealer::scanner::{CacheState, FileSetCache, ScanError, Walker};

use super::support::write_files;

fn relative_names(cache: &FileSetCache) -> Vec<String> {
    cache
        .entries()
        .unwrap()
        .iter()
        .map(|f| f.relative().to_string_lossy().replace('\\', "/"))
        .collect()
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let mut cache = FileSetCache::new(dir.path());

    let summary = cache.scan(None).unwrap();

    assert_eq!(summary.files, 0);
    assert!(cache.is_ready());
    assert!(cache.is_empty());
}

#[test]
fn test_scan_order_is_sorted_by_name_per_directory() {
    let dir = tempdir().unwrap();
    write_files(dir.path(), &["c", "a", "b/z", "b/y", "d/e/f"]);
    let mut cache = FileSetCache::new(dir.path());

    cache.scan(None).unwrap();

    assert_eq!(relative_names(&cache), vec!["a", "b/y", "b/z", "c", "d/e/f"]);
}

#[test]
fn test_scan_excludes_directories_and_includes_empty_files() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("empty/dir")).unwrap();
    fs::write(dir.path().join("zero"), b"").unwrap();
    let mut cache = FileSetCache::new(dir.path());

    cache.scan(None).unwrap();

    assert_eq!(relative_names(&cache), vec!["zero"]);
}

#[cfg(unix)]
#[test]
fn test_scan_skips_symlinks() {
    let dir = tempdir().unwrap();
    write_files(dir.path(), &["real"]);
    std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("link")).unwrap();
    std::os::unix::fs::symlink(dir.path(), dir.path().join("loop")).unwrap();
    let mut cache = FileSetCache::new(dir.path());

    cache.scan(None).unwrap();

    assert_eq!(relative_names(&cache), vec!["real"]);
}

#[cfg(unix)]
#[test]
fn test_scan_unreadable_subdirectory_is_counted() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    write_files(dir.path(), &["visible", "locked/hidden"]);
    let locked = dir.path().join("locked");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Root ignores permissions; nothing to observe in that case.
    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let mut cache = FileSetCache::new(dir.path());
    let summary = cache.scan(None);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    let summary = summary.unwrap();
    assert_eq!(summary.files, 1);
    assert_eq!(summary.errors, 1);
    assert!(cache.is_ready());
}

#[test]
fn test_scan_missing_root_is_not_an_empty_tree() {
    let dir = tempdir().unwrap();
    let mut cache = FileSetCache::new(dir.path().join("unmounted"));

    match cache.scan(None) {
        Err(ScanError::RootNotFound(path)) => assert!(path.ends_with("unmounted")),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(cache.state(), CacheState::Unscanned);
}

#[test]
fn test_relative_root_yields_absolute_entries() {
    let cwd = std::env::current_dir().unwrap();
    let dir = tempfile::Builder::new()
        .prefix("scan-rel")
        .tempdir_in(&cwd)
        .unwrap();
    write_files(dir.path(), &["a"]);
    let relative = dir.path().strip_prefix(&cwd).unwrap();

    let mut cache = FileSetCache::new(relative);
    cache.scan(None).unwrap();

    let entry = &cache.entries().unwrap()[0];
    assert!(entry.path().is_absolute());
    assert_eq!(entry.relative(), Path::new("a"));
}

#[test]
fn test_walker_matches_cache() {
    let dir = tempdir().unwrap();
    write_files(dir.path(), &["x/1", "x/2", "y"]);
    let mut cache = FileSetCache::new(dir.path());
    cache.scan(None).unwrap();

    let walked: Vec<_> = Walker::new(dir.path())
        .walk()
        .map(|r| r.unwrap().into_path())
        .collect();
    let cached: Vec<_> = cache
        .entries()
        .unwrap()
        .iter()
        .map(|f| f.path().to_path_buf())
        .collect();

    assert_eq!(walked, cached);
}
