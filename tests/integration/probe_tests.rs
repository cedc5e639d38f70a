use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use vault_revealer::actions::{sidecar_path, DisableError, SIDECAR_SUFFIX};
use vault_revealer::correspondence::{
    CorrespondenceFinder, FsProbe, PathProbe, ProbeError, ProbeOutcome,
};
use vault_revealer::scanner::FileSetCache;

use super::support::{trees, StubVault, SyncingProbe};

fn ready(root: &Path) -> FileSetCache {
    let mut cache = FileSetCache::new(root);
    cache.scan(None).unwrap();
    cache
}

fn assert_restored(selected: &Path, content: &str) {
    assert_eq!(fs::read_to_string(selected).unwrap(), content);
    assert!(!sidecar_path(selected, SIDECAR_SUFFIX).exists());
}

#[test]
fn test_probe_finds_paired_file() {
    let t = trees(&["a1", "a2", "a3"], &["b1", "b2", "b3"]);
    let vault = StubVault::new(&t, &[("a1", "b3"), ("a2", "b1"), ("a3", "b2")]);
    let cache = ready(&t.target);

    let finder = CorrespondenceFinder::with_probe(SyncingProbe { vault: &vault });
    for (selected, expected) in [("a1", "b3"), ("a2", "b1"), ("a3", "b2")] {
        let result = finder
            .find_corresponding(&t.source.join(selected), &cache)
            .unwrap();
        vault.sync().unwrap();

        assert_eq!(result.outcome(), ProbeOutcome::Found);
        assert_eq!(
            result.corresponding().unwrap().path(),
            t.target.join(expected)
        );
        assert_restored(&t.source.join(selected), selected);
        assert!(t.target.join(expected).exists());
    }
}

#[test]
fn test_probe_nested_target_reports_relative_path() {
    let t = trees(&["docs/report.pdf"], &["d/AB/CDEF/x.c9r", "d/AB/CDEF/y.c9r"]);
    let vault = StubVault::new(&t, &[("docs/report.pdf", "d/AB/CDEF/y.c9r")]);
    let cache = ready(&t.target);

    let result = CorrespondenceFinder::with_probe(SyncingProbe { vault: &vault })
        .find_corresponding(&t.source.join("docs/report.pdf"), &cache)
        .unwrap();
    vault.sync().unwrap();

    let found = result.corresponding().unwrap();
    assert_eq!(found.relative(), Path::new("d/AB/CDEF/y.c9r"));
    assert_eq!(result.checked(), 2);
}

#[test]
fn test_probe_unpaired_file_is_not_found() {
    let t = trees(&["a1", "lonely"], &["b1", "b2"]);
    let vault = StubVault::new(&t, &[("a1", "b1")]);
    let cache = ready(&t.target);

    let result = CorrespondenceFinder::with_probe(SyncingProbe { vault: &vault })
        .find_corresponding(&t.source.join("lonely"), &cache)
        .unwrap();

    assert_eq!(result.outcome(), ProbeOutcome::NotFound);
    assert_eq!(result.checked(), 2);
    assert!(result.corresponding().is_none());
    assert_restored(&t.source.join("lonely"), "lonely");
}

#[test]
fn test_probe_empty_target_is_not_found() {
    let t = trees(&["a1"], &[]);
    let cache = ready(&t.target);

    let result = CorrespondenceFinder::new()
        .find_corresponding(&t.source.join("a1"), &cache)
        .unwrap();

    assert_eq!(result.outcome(), ProbeOutcome::NotFound);
    assert_eq!(result.checked(), 0);
    assert_restored(&t.source.join("a1"), "a1");
}

/// Fails with an I/O error on the n-th check.
struct FailAt {
    n: usize,
    calls: AtomicUsize,
}

impl PathProbe for FailAt {
    fn is_present(&self, path: &Path) -> io::Result<bool> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == self.n {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "injected"));
        }
        FsProbe.is_present(path)
    }
}

#[test]
fn test_injected_failure_at_every_step_restores() {
    let names: Vec<String> = (0..8).map(|i| format!("b{}", i)).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let t = trees(&["a1"], &refs);
    let cache = ready(&t.target);
    let selected = t.source.join("a1");

    for n in 0..names.len() {
        let finder = CorrespondenceFinder::with_probe(FailAt {
            n,
            calls: AtomicUsize::new(0),
        });

        match finder.find_corresponding(&selected, &cache) {
            Err(ProbeError::Check { path, source }) => {
                assert_eq!(path, t.target.join(&names[n]));
                assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
            }
            other => panic!("step {}: unexpected {:?}", n, other),
        }
        assert_restored(&selected, "a1");
    }
}

/// Requests cancellation on the n-th check.
struct CancelAt {
    n: usize,
    calls: AtomicUsize,
    flag: Arc<AtomicBool>,
}

impl PathProbe for CancelAt {
    fn is_present(&self, path: &Path) -> io::Result<bool> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == self.n {
            self.flag.store(true, Ordering::SeqCst);
        }
        FsProbe.is_present(path)
    }
}

#[test]
fn test_cancel_mid_probe_restores_and_reports_cancelled() {
    let t = trees(&["a1"], &["b1", "b2", "b3", "b4", "b5"]);
    let cache = ready(&t.target);
    let flag = Arc::new(AtomicBool::new(false));

    let finder = CorrespondenceFinder::with_probe(CancelAt {
        n: 1,
        calls: AtomicUsize::new(0),
        flag: Arc::clone(&flag),
    })
    .with_cancel_flag(flag);

    let result = finder
        .find_corresponding(&t.source.join("a1"), &cache)
        .unwrap();

    assert_eq!(result.outcome(), ProbeOutcome::Cancelled);
    assert_eq!(result.checked(), 2);
    assert!(result.corresponding().is_none());
    assert_restored(&t.source.join("a1"), "a1");
}

#[test]
fn test_conflict_leaves_both_paths_untouched() {
    let t = trees(&["a1"], &["b1"]);
    let selected = t.source.join("a1");
    let sidecar = sidecar_path(&selected, SIDECAR_SUFFIX);
    fs::write(&sidecar, "left over from a crash").unwrap();
    let cache = ready(&t.target);

    let err = CorrespondenceFinder::new()
        .find_corresponding(&selected, &cache)
        .unwrap_err();

    match err {
        ProbeError::Disable(DisableError::Conflict { path, sidecar: s }) => {
            assert_eq!(path, selected);
            assert_eq!(s, sidecar);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(fs::read_to_string(&selected).unwrap(), "a1");
    assert_eq!(
        fs::read_to_string(&sidecar).unwrap(),
        "left over from a crash"
    );
}

#[test]
fn test_probe_against_stale_listing() {
    let t = trees(&["a1"], &["b1", "b2"]);
    let cache = ready(&t.target);
    fs::remove_file(t.target.join("b1")).unwrap();

    let result = CorrespondenceFinder::new()
        .find_corresponding(&t.source.join("a1"), &cache)
        .unwrap();

    // A listing is a snapshot: a file deleted after the scan looks like
    // the corresponding file.
    assert_eq!(
        result.corresponding().map(|f| f.path().to_path_buf()),
        Some(t.target.join("b1"))
    );
}

#[test]
fn test_relative_selected_path_is_resolved() {
    let t = trees(&["a1"], &["b1"]);
    let cache = ready(&t.target);
    let cwd = std::env::current_dir().unwrap();
    let relative: PathBuf = pathdiff(&t.source.join("a1"), &cwd);

    let result = CorrespondenceFinder::new()
        .find_corresponding(&relative, &cache)
        .unwrap();

    assert!(result.selected().is_absolute());
    assert_restored(&t.source.join("a1"), "a1");
}

/// `path` relative to `base`, via `..` components.
fn pathdiff(path: &Path, base: &Path) -> PathBuf {
    let path: Vec<_> = path.components().collect();
    let base: Vec<_> = base.components().collect();
    let common = path
        .iter()
        .zip(base.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let mut out = PathBuf::new();
    for _ in common..base.len() {
        out.push("..");
    }
    for component in &path[common..] {
        out.push(component.as_os_str());
    }
    out
}
