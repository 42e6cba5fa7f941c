//! Integration selection
//!
//! The emulator drives achievements through [`Achievements`]. The native
//! [`Engine`] is one implementation; [`ExternalIntegration`] hands the same
//! calls to a third-party client that does its own networking and
//! evaluation.

use crate::engine::{Collaborators, Engine};
use cheevos_core::{AchievementsConfig, AchievementsError, ConfigError, IntegrationMode};
use cheevos_disc::{ExecutableReader, IdentityResolver, Resolution};
use cheevos_runtime::MemoryAccessor;

/// Emulator-facing achievements lifecycle
pub trait Achievements: Send {
    fn game_changed(&mut self, elf_path: &str, checksum: u32);
    fn do_frame(&mut self, memory: &dyn MemoryAccessor);
    fn save_state(&mut self) -> Vec<u8>;
    fn load_state(&mut self, data: &[u8]);
    /// Returns false if the user declined to reset
    fn reset(&mut self) -> bool;
    /// Returns false if the user declined to shut down
    fn shutdown(&mut self) -> bool;
    fn on_paused(&mut self, paused: bool);
    fn challenge_mode(&self) -> bool;
}

impl Achievements for Engine {
    fn game_changed(&mut self, elf_path: &str, checksum: u32) {
        Engine::game_changed(self, elf_path, checksum);
    }

    fn do_frame(&mut self, memory: &dyn MemoryAccessor) {
        Engine::do_frame(self, memory);
    }

    fn save_state(&mut self) -> Vec<u8> {
        Engine::save_state(self)
    }

    fn load_state(&mut self, data: &[u8]) {
        Engine::load_state(self, data);
    }

    fn reset(&mut self) -> bool {
        Engine::reset(self);
        true
    }

    fn shutdown(&mut self) -> bool {
        Engine::shutdown(self);
        true
    }

    fn on_paused(&mut self, paused: bool) {
        Engine::on_paused(self, paused);
    }

    fn challenge_mode(&self) -> bool {
        Engine::challenge_mode(self)
    }
}

/// A third-party achievements client
pub trait ExternalClient: Send {
    /// Evaluate one frame; the client reads memory through its own hooks
    fn do_frame(&mut self);
    /// Serialized client state, or `None` on failure
    fn capture_state(&mut self) -> Option<Vec<u8>>;
    fn restore_state(&mut self, data: &[u8]);
    fn on_reset(&mut self);
    fn set_paused(&mut self, paused: bool);
    /// Game id for an identity hash, 0 if unknown
    fn identify_hash(&mut self, hash: &str) -> u32;
    fn activate_game(&mut self, game_id: u32);
    /// Ask the user whether unsaved achievement work may be discarded
    fn confirm_load(&mut self, hard_reset: bool) -> bool;
    fn hardcore_active(&self) -> bool;
}

/// Routes the emulator lifecycle to an [`ExternalClient`]
pub struct ExternalIntegration {
    client: Box<dyn ExternalClient>,
    reader: Box<dyn ExecutableReader + Send>,
    identity: IdentityResolver,
    game_id: u32,
}

impl ExternalIntegration {
    pub fn new(client: Box<dyn ExternalClient>, reader: Box<dyn ExecutableReader + Send>) -> Self {
        Self {
            client,
            reader,
            identity: IdentityResolver::new(),
            game_id: 0,
        }
    }

    pub fn game_id(&self) -> u32 {
        self.game_id
    }
}

impl Achievements for ExternalIntegration {
    fn game_changed(&mut self, elf_path: &str, checksum: u32) {
        let hash = match self.identity.resolve(checksum, elf_path, self.reader.as_ref()) {
            Resolution::Unchanged => return,
            Resolution::Changed { hash } => hash,
        };

        self.game_id = if hash.is_empty() {
            0
        } else {
            self.client.identify_hash(&hash)
        };
        tracing::info!("External client activating game {}", self.game_id);
        self.client.activate_game(self.game_id);
    }

    fn do_frame(&mut self, _memory: &dyn MemoryAccessor) {
        self.client.do_frame();
    }

    fn save_state(&mut self) -> Vec<u8> {
        self.client.capture_state().unwrap_or_else(|| {
            tracing::warn!("Failed to serialize cheevos state from external client");
            Vec::new()
        })
    }

    fn load_state(&mut self, data: &[u8]) {
        if data.is_empty() {
            tracing::warn!("State is missing cheevos data, resetting external client");
            self.client.on_reset();
        } else {
            self.client.restore_state(data);
        }
    }

    fn reset(&mut self) -> bool {
        if !self.client.confirm_load(false) {
            return false;
        }
        self.client.on_reset();
        true
    }

    fn shutdown(&mut self) -> bool {
        if !self.client.confirm_load(true) {
            return false;
        }
        self.client.set_paused(false);
        self.client.activate_game(0);
        self.identity.clear();
        self.game_id = 0;
        true
    }

    fn on_paused(&mut self, paused: bool) {
        self.client.set_paused(paused);
    }

    fn challenge_mode(&self) -> bool {
        self.client.hardcore_active()
    }
}

/// Build the integration selected by `config.integration`.
///
/// The native engine is returned initialized. `External` requires a client.
pub fn build_achievements(
    config: AchievementsConfig,
    collaborators: Collaborators,
    external: Option<Box<dyn ExternalClient>>,
) -> Result<Box<dyn Achievements>, AchievementsError> {
    match config.integration {
        IntegrationMode::Native => {
            let mut engine = Engine::new(config, collaborators)?;
            engine.initialize();
            Ok(Box::new(engine))
        }
        IntegrationMode::External => {
            let client = external.ok_or(ConfigError::IntegrationUnavailable)?;
            tracing::info!("Using external achievements client");
            Ok(Box::new(ExternalIntegration::new(client, collaborators.reader)))
        }
    }
}
