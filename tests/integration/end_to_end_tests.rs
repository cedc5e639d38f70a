use clap::Parser;
use std::fs;

use vault_revealer::actions::{sidecar_path, SIDECAR_SUFFIX};
use vault_revealer::cli::Cli;
use vault_revealer::correspondence::{CorrespondenceFinder, ProbeOutcome};
use vault_revealer::error::{ErrorCategory, ExitCode};
use vault_revealer::scanner::FileSetCache;
use vault_revealer::session::{Direction, RevealSession};

use super::support::{trees, StubVault, SyncingProbe};

fn run(args: &[&str]) -> anyhow::Result<ExitCode> {
    let mut argv = vec!["vault-revealer", "-q"];
    argv.extend_from_slice(args);
    vault_revealer::run_app(Cli::try_parse_from(argv).unwrap())
}

#[test]
fn test_stub_transformation_reveals_b2_and_brings_it_back() {
    let t = trees(&["a1", "a2"], &["b1", "b2"]);
    let vault = StubVault::new(&t, &[("a1", "b2"), ("a2", "b1")]);

    let mut session = RevealSession::new(Direction::RevealEncrypted);
    session.set_unlocked_root(&t.source);
    session.set_locked_root(&t.target);
    session.target_cache_mut().unwrap().scan(None).unwrap();

    let result = CorrespondenceFinder::with_probe(SyncingProbe { vault: &vault })
        .find_corresponding(&t.source.join("a1"), session.target_cache().unwrap())
        .unwrap();
    vault.sync().unwrap();

    assert_eq!(result.outcome(), ProbeOutcome::Found);
    assert_eq!(result.corresponding().unwrap().path(), t.target.join("b2"));
    assert_eq!(fs::read_to_string(t.target.join("b2")).unwrap(), "b2");
    assert_eq!(fs::read_to_string(t.source.join("a1")).unwrap(), "a1");
    assert!(!sidecar_path(&t.source.join("a1"), SIDECAR_SUFFIX).exists());
}

#[test]
fn test_reverse_direction_uses_the_same_protocol() {
    let t = trees(&["enc/x.c9r"], &["plain/report.pdf", "plain/notes.txt"]);
    let vault = StubVault::new(&t, &[("enc/x.c9r", "plain/report.pdf")]);

    let mut session = RevealSession::new(Direction::RevealDecrypted);
    session.set_locked_root(&t.source);
    session.set_unlocked_root(&t.target);
    let mut cache = session.take_target_cache().unwrap();
    cache.scan(None).unwrap();

    let result = CorrespondenceFinder::with_probe(SyncingProbe { vault: &vault })
        .find_corresponding(&t.source.join("enc/x.c9r"), &cache)
        .unwrap();
    vault.sync().unwrap();
    session.put_target_cache(cache);

    assert_eq!(
        result.corresponding().unwrap().relative(),
        std::path::Path::new("plain/report.pdf")
    );
    assert!(session.target_cache().unwrap().is_ready());
}

#[test]
fn test_run_app_reveal_without_vault_is_not_found() {
    let t = trees(&["a1"], &["b1", "b2"]);
    let target = t.target.to_string_lossy().into_owned();
    let selected = t.source.join("a1").to_string_lossy().into_owned();

    let code = run(&["reveal", "--target-root", &target, &selected]).unwrap();

    assert_eq!(code, ExitCode::NotFound);
    assert!(t.source.join("a1").exists());
}

#[test]
fn test_run_app_missing_selected_file_is_selection_error() {
    let t = trees(&[], &["b1"]);
    let target = t.target.to_string_lossy().into_owned();
    let selected = t.source.join("gone").to_string_lossy().into_owned();

    let code = run(&[
        "reveal",
        "--target-root",
        &target,
        "--output",
        "json",
        &selected,
    ])
    .unwrap();

    assert_eq!(code, ExitCode::SelectionError);
}

#[test]
fn test_run_app_worst_code_wins_across_files() {
    let t = trees(&["a1"], &["b1"]);
    let target = t.target.to_string_lossy().into_owned();
    let present = t.source.join("a1").to_string_lossy().into_owned();
    let missing = t.source.join("gone").to_string_lossy().into_owned();

    let code = run(&["reveal", "--target-root", &target, &present, &missing]).unwrap();

    assert_eq!(code, ExitCode::SelectionError);
    assert!(t.source.join("a1").exists());
}

#[test]
fn test_run_app_missing_target_root_is_error() {
    let t = trees(&["a1"], &[]);
    let target = t.target.join("unmounted").to_string_lossy().into_owned();
    let selected = t.source.join("a1").to_string_lossy().into_owned();

    let err = run(&["reveal", "--target-root", &target, &selected]).unwrap_err();

    assert_eq!(ErrorCategory::of(&err), ErrorCategory::NotFound);
    assert_eq!(ErrorCategory::of(&err).exit_code(), ExitCode::GeneralError);
}

#[test]
fn test_run_app_scan() {
    let t = trees(&[], &["b1", "sub/b2"]);
    let target = t.target.to_string_lossy().into_owned();

    assert_eq!(run(&["scan", &target]).unwrap(), ExitCode::Success);
    assert_eq!(
        run(&["scan", &target, "--output", "json"]).unwrap(),
        ExitCode::Success
    );
}

#[test]
fn test_scan_of_file_root_fails() {
    let t = trees(&[], &["b1"]);
    let mut cache = FileSetCache::new(t.target.join("b1"));
    assert!(cache.scan(None).is_err());
}
