use std::fs;
use std::time::{Duration, Instant};

use tempfile::tempdir;
use vault_revealer::actions::{sidecar_path, SIDECAR_SUFFIX};
use vault_revealer::correspondence::ProbeOutcome;
use vault_revealer::progress::ProgressCallback;
use vault_revealer::scanner::{CacheState, FileSetCache};
use vault_revealer::task::{ProbeSettings, ProbeTask, ScanTask, TaskState};

use super::support::trees;

#[derive(Default)]
struct Counter {
    ticks: std::sync::atomic::AtomicUsize,
    phases: std::sync::Mutex<Vec<String>>,
}

impl ProgressCallback for Counter {
    fn on_phase_start(&self, phase: &str, _total: usize) {
        self.phases.lock().unwrap().push(phase.to_string());
    }

    fn on_progress(&self, _current: usize, _path: &str) {
        self.ticks
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }

    fn on_phase_end(&self, _phase: &str) {}
}

#[test]
fn test_scan_then_probe_reuses_cache() {
    let t = trees(&["a1", "a2"], &["b1", "b2", "b3"]);

    let mut scan = ScanTask::new(FileSetCache::new(&t.target));
    scan.start();
    assert_eq!(scan.wait(), TaskState::Completed);
    let mut cache = scan.take_output().unwrap().unwrap().cache;
    assert_eq!(cache.len(), 3);

    for selected in ["a1", "a2"] {
        let mut probe = ProbeTask::new(t.source.join(selected), cache, ProbeSettings::default());
        probe.start();
        assert_eq!(probe.wait(), TaskState::Completed);

        let output = probe.take_output().unwrap().unwrap();
        assert_eq!(output.result.unwrap().outcome(), ProbeOutcome::NotFound);
        cache = output.cache;
        assert!(cache.is_ready());
        assert!(t.source.join(selected).exists());
    }
}

#[test]
fn test_progress_is_replayed_to_renderer() {
    let t = trees(&[], &["b1", "b2", "b3", "b4"]);
    let counter = Counter::default();

    let mut scan = ScanTask::new(FileSetCache::new(&t.target));
    scan.start();
    scan.wait_with(&counter);

    assert_eq!(counter.ticks.load(std::sync::atomic::Ordering::SeqCst), 4);
    assert_eq!(*counter.phases.lock().unwrap(), vec!["scan".to_string()]);
    assert_eq!(scan.progress().ticks_done, 4);
}

#[test]
fn test_cancelled_scan_of_ten_thousand_files() {
    let dir = tempdir().unwrap();
    for d in 0..100 {
        let sub = dir.path().join(format!("{:03}", d));
        fs::create_dir(&sub).unwrap();
        for f in 0..100 {
            fs::write(sub.join(format!("{:03}", f)), b"").unwrap();
        }
    }

    let mut task = ScanTask::new(FileSetCache::new(dir.path()));
    task.start();
    task.cancel();

    let started = Instant::now();
    let state = task.wait();
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(state, TaskState::Cancelled);

    let output = task.take_output().unwrap().unwrap();
    assert_eq!(output.cache.state(), CacheState::Unscanned);
    assert!(output.result.unwrap().interrupted);
}

#[test]
fn test_scan_cancelled_after_partial_progress() {
    let dir = tempdir().unwrap();
    for d in 0..100 {
        let sub = dir.path().join(format!("{:03}", d));
        fs::create_dir(&sub).unwrap();
        for f in 0..100 {
            fs::write(sub.join(format!("{:03}", f)), b"").unwrap();
        }
    }

    let mut task = ScanTask::new(FileSetCache::new(dir.path()));
    task.start();
    while task.progress().ticks_done == 0 {
        assert_eq!(task.poll(), TaskState::Running);
        std::thread::yield_now();
    }
    let seen = task.progress().ticks_done;
    task.cancel();

    let started = Instant::now();
    let state = task.wait();
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(state, TaskState::Cancelled);
    assert!(task.progress().ticks_done >= seen);
    assert!(task.progress().ticks_done < 10_000);

    let output = task.take_output().unwrap().unwrap();
    assert_eq!(output.cache.state(), CacheState::Unscanned);
    assert!(output.cache.entries().is_none());
}

#[test]
fn test_cancel_after_completion_has_no_effect() {
    let t = trees(&[], &["b1"]);
    let mut task = ScanTask::new(FileSetCache::new(&t.target));
    task.start();
    task.wait();

    task.cancel();

    assert_eq!(task.state(), TaskState::Completed);
    assert!(!task.is_cancel_requested());
}

#[test]
fn test_dropping_running_probe_restores_file() {
    let names: Vec<String> = (0..2000).map(|i| format!("b{:05}", i)).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let t = trees(&["a1"], &refs);
    let mut cache = FileSetCache::new(&t.target);
    cache.scan(None).unwrap();

    let mut task = ProbeTask::new(t.source.join("a1"), cache, ProbeSettings::default());
    task.start();
    drop(task);

    assert!(t.source.join("a1").exists());
    assert!(!sidecar_path(&t.source.join("a1"), SIDECAR_SUFFIX).exists());
}

#[test]
fn test_probe_task_custom_suffix() {
    let t = trees(&["a1"], &["b1"]);
    let mut cache = FileSetCache::new(&t.target);
    cache.scan(None).unwrap();

    let settings = ProbeSettings {
        suffix: ".probe-off".to_string(),
    };
    fs::write(sidecar_path(&t.source.join("a1"), ".probe-off"), "taken").unwrap();

    let mut task = ProbeTask::new(t.source.join("a1"), cache, settings);
    task.start();

    assert_eq!(task.wait(), TaskState::Failed);
    let output = task.take_output().unwrap().unwrap();
    assert!(output.result.is_err());
    assert!(output.cache.is_ready());
}
