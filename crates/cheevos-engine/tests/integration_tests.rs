//! Integration selection and the external client adapter

mod common;

use cheevos_core::{AchievementsError, ConfigError, IntegrationMode};
use cheevos_engine::{build_achievements, Achievements, ExternalClient, ExternalIntegration, NullNotifier};
use common::*;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Frame,
    Capture,
    Restore(Vec<u8>),
    Reset,
    Paused(bool),
    Identify(String),
    Activate(u32),
    Confirm(bool),
}

struct FakeClient {
    calls: Arc<Mutex<Vec<Call>>>,
    game_id: u32,
    state: Option<Vec<u8>>,
    allow_discard: bool,
}

impl FakeClient {
    fn new(game_id: u32) -> (Self, Arc<Mutex<Vec<Call>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                calls: Arc::clone(&calls),
                game_id,
                state: Some(b"client state".to_vec()),
                allow_discard: true,
            },
            calls,
        )
    }
}

impl ExternalClient for FakeClient {
    fn do_frame(&mut self) {
        self.calls.lock().push(Call::Frame);
    }

    fn capture_state(&mut self) -> Option<Vec<u8>> {
        self.calls.lock().push(Call::Capture);
        self.state.clone()
    }

    fn restore_state(&mut self, data: &[u8]) {
        self.calls.lock().push(Call::Restore(data.to_vec()));
    }

    fn on_reset(&mut self) {
        self.calls.lock().push(Call::Reset);
    }

    fn set_paused(&mut self, paused: bool) {
        self.calls.lock().push(Call::Paused(paused));
    }

    fn identify_hash(&mut self, hash: &str) -> u32 {
        self.calls.lock().push(Call::Identify(hash.to_string()));
        self.game_id
    }

    fn activate_game(&mut self, game_id: u32) {
        self.calls.lock().push(Call::Activate(game_id));
    }

    fn confirm_load(&mut self, hard_reset: bool) -> bool {
        self.calls.lock().push(Call::Confirm(hard_reset));
        self.allow_discard
    }

    fn hardcore_active(&self) -> bool {
        true
    }
}

fn external(client: FakeClient, disc: MemoryDisc) -> ExternalIntegration {
    ExternalIntegration::new(Box::new(client), Box::new(disc))
}

#[test]
fn test_external_identifies_game() {
    let (client, calls) = FakeClient::new(77);
    let mut integration = external(client, MemoryDisc::with_file(ELF_PATH, ELF_BYTES));

    integration.game_changed(ELF_PATH, CHECKSUM);
    assert_eq!(integration.game_id(), 77);
    assert_eq!(
        *calls.lock(),
        vec![Call::Identify(game_hash()), Call::Activate(77)]
    );

    // Same executable again
    integration.game_changed(ELF_PATH, CHECKSUM);
    assert_eq!(calls.lock().len(), 2);
    assert!(integration.challenge_mode());
}

#[test]
fn test_external_unreadable_disc() {
    let (client, calls) = FakeClient::new(77);
    let mut integration = external(client, MemoryDisc::default());

    integration.game_changed(ELF_PATH, CHECKSUM);

    assert_eq!(integration.game_id(), 0);
    assert_eq!(*calls.lock(), vec![Call::Activate(0)]);
}

#[test]
fn test_external_state_and_lifecycle() {
    let (client, calls) = FakeClient::new(77);
    let mut integration = external(client, MemoryDisc::with_file(ELF_PATH, ELF_BYTES));
    let memory = cheevos_runtime::MemoryWindow::new(vec![0u8; 16]);

    integration.do_frame(&memory);
    assert_eq!(integration.save_state(), b"client state".to_vec());
    integration.load_state(b"restored");
    integration.load_state(&[]);
    integration.on_paused(true);
    assert!(integration.reset());

    assert_eq!(
        *calls.lock(),
        vec![
            Call::Frame,
            Call::Capture,
            Call::Restore(b"restored".to_vec()),
            Call::Reset,
            Call::Paused(true),
            Call::Confirm(false),
            Call::Reset,
        ]
    );
}

#[test]
fn test_external_capture_failure() {
    let (mut client, _calls) = FakeClient::new(77);
    client.state = None;
    let mut integration = external(client, MemoryDisc::default());

    assert!(integration.save_state().is_empty());
}

#[test]
fn test_external_declined_shutdown() {
    let (mut client, calls) = FakeClient::new(77);
    client.allow_discard = false;
    let mut integration = external(client, MemoryDisc::with_file(ELF_PATH, ELF_BYTES));
    integration.game_changed(ELF_PATH, CHECKSUM);
    calls.lock().clear();

    assert!(!integration.reset());
    assert!(!integration.shutdown());

    assert_eq!(*calls.lock(), vec![Call::Confirm(false), Call::Confirm(true)]);
    assert_eq!(integration.game_id(), 77);
}

#[test]
fn test_external_shutdown_unloads_game() {
    let (client, calls) = FakeClient::new(77);
    let mut integration = external(client, MemoryDisc::with_file(ELF_PATH, ELF_BYTES));
    integration.game_changed(ELF_PATH, CHECKSUM);
    calls.lock().clear();

    assert!(integration.shutdown());
    assert_eq!(integration.game_id(), 0);
    assert_eq!(
        *calls.lock(),
        vec![Call::Confirm(true), Call::Paused(false), Call::Activate(0)]
    );

    // Identity was forgotten, so the same game is identified again
    integration.game_changed(ELF_PATH, CHECKSUM);
    assert_eq!(integration.game_id(), 77);
}

#[test]
fn test_build_native() {
    let settings = Arc::new(logged_in_settings());
    let (collaborators, server, _runtime) = collaborators(
        settings,
        MemoryDisc::with_file(ELF_PATH, ELF_BYTES),
        Arc::new(NullNotifier),
    );
    serve_game(&server, vec![achievement(7, 3, "0x10=1", 10)], vec![], None, &[]);

    let mut achievements = build_achievements(config(), collaborators, None).unwrap();
    achievements.game_changed(ELF_PATH, CHECKSUM);
    assert!(!achievements.challenge_mode());

    // Shutdown drains the queue, so the lookup has happened by now
    assert!(achievements.shutdown());
    assert_eq!(server.count("gameid"), 1);
}

#[test]
fn test_build_external_requires_client() {
    let mut cfg = config();
    cfg.integration = IntegrationMode::External;
    let (collaborators, _server, _runtime) = collaborators(
        Arc::new(logged_in_settings()),
        MemoryDisc::default(),
        Arc::new(NullNotifier),
    );

    let result = build_achievements(cfg, collaborators, None);
    assert!(matches!(
        result,
        Err(AchievementsError::Config(ConfigError::IntegrationUnavailable))
    ));
}

#[test]
fn test_build_external() {
    let mut cfg = config();
    cfg.integration = IntegrationMode::External;
    let (collaborators, server, _runtime) = collaborators(
        Arc::new(logged_in_settings()),
        MemoryDisc::with_file(ELF_PATH, ELF_BYTES),
        Arc::new(NullNotifier),
    );
    let (client, calls) = FakeClient::new(12);

    let mut achievements = build_achievements(cfg, collaborators, Some(Box::new(client))).unwrap();
    achievements.game_changed(ELF_PATH, CHECKSUM);

    assert!(achievements.challenge_mode());
    assert_eq!(
        *calls.lock(),
        vec![Call::Identify(game_hash()), Call::Activate(12)]
    );
    // The external client does its own networking
    assert_eq!(server.total_requests(), 0);
}
