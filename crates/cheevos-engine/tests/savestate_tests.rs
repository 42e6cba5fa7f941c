//! Save-state round trips through the engine

mod common;

use cheevos_engine::savestate::{read_section, SECTION_HEADER_SIZE};
use common::*;

fn booted() -> Harness {
    let mut h = Harness::new(config());
    serve_game(&h.server, vec![achievement(7, 3, "0x10=5:3", 10)], vec![], None, &[]);
    h.boot();
    h
}

#[test]
fn test_progress_round_trip() {
    let mut h = booted();
    h.poke(0x10, 5);
    h.frame();
    assert_eq!(h.engine.achievement_progress(7), (1, 3));

    let state = h.engine.save_state();
    assert!(!state.is_empty());

    h.frame();
    assert_eq!(h.engine.achievement_progress(7), (2, 3));

    h.engine.load_state(&state);
    assert_eq!(h.engine.achievement_progress(7), (1, 3));

    // Restoring progress never unlocks on its own
    h.settle();
    assert!(h.notifier.unlocked().is_empty());
    assert!(h.engine.achievement(7).unwrap().locked);

    h.frame();
    assert!(h.engine.achievement(7).unwrap().locked);
    h.frame();
    assert!(!h.engine.achievement(7).unwrap().locked);
    assert_eq!(h.notifier.unlocked().len(), 1);
}

#[test]
fn test_empty_state_resets_runtime() {
    let mut h = booted();
    h.poke(0x10, 5);
    h.frame();
    h.frame();
    let resets = h.runtime.lock().resets;

    h.engine.load_state(&[]);

    assert_eq!(h.runtime.lock().resets, resets + 1);
    assert_eq!(h.engine.achievement_progress(7), (0, 3));
    assert!(h.engine.achievement(7).unwrap().active);
}

#[test]
fn test_rejected_state_resets_runtime() {
    let mut h = booted();
    h.poke(0x10, 5);
    h.frame();
    let resets = h.runtime.lock().resets;

    h.engine.load_state(b"not a progress blob");

    assert_eq!(h.runtime.lock().resets, resets + 1);
    assert_eq!(h.engine.achievement_progress(7), (0, 3));
}

#[test]
fn test_serialize_failure_saves_nothing() {
    let mut h = booted();
    h.runtime.lock().fail_serialize = true;

    assert!(h.engine.save_state().is_empty());

    let section = h.engine.save_state_section();
    assert_eq!(section.len(), SECTION_HEADER_SIZE);
    let (payload, _) = read_section(&section).unwrap();
    assert!(payload.is_empty());
}

#[test]
fn test_section_round_trip() {
    let mut h = booted();
    h.poke(0x10, 5);
    h.frame();
    h.frame();

    let mut snapshot = h.engine.save_state_section();
    snapshot.extend_from_slice(b"other emulator state");

    h.engine.reset();
    assert_eq!(h.engine.achievement_progress(7), (0, 3));

    h.engine.load_state_section(&snapshot);
    assert_eq!(h.engine.achievement_progress(7), (2, 3));
}

#[test]
fn test_corrupt_section_resets_runtime() {
    let mut h = booted();
    h.poke(0x10, 5);
    h.frame();

    let mut section = h.engine.save_state_section();
    section[0] = b'X';
    let resets = h.runtime.lock().resets;

    h.engine.load_state_section(&section);

    assert_eq!(h.runtime.lock().resets, resets + 1);
    assert_eq!(h.engine.achievement_progress(7), (0, 3));
}

#[test]
fn test_load_state_ignored_while_inactive() {
    let mut cfg = config();
    cfg.enabled = false;
    let mut h = Harness::new(cfg);
    assert!(!h.engine.is_active());

    h.engine.load_state(&[]);
    h.engine.load_state(b"garbage");

    assert_eq!(h.runtime.lock().resets, 0);
    assert!(!h.engine.is_active());
}
