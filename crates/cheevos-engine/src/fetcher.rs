//! Definition fetching
//!
//! Game change runs `ResolvingId -> FetchingDefinitions -> FetchingUnlocks
//! -> Ready`. Any failure, an unknown game, or a new game change drops back
//! to `Idle` with the registry cleared.

use crate::engine::{Engine, RequestKind};
use crate::notify::Notification;
use crate::registry::{Achievement, AchievementCategory, Leaderboard};
use cheevos_core::ProtocolError;
use cheevos_disc::Resolution;
use cheevos_net::protocol::{
    check_response, parse_entry, parse_response, AchievementDefinition, GameIdResponse,
    LeaderboardDefinition, PatchData, PatchResponse, UnlocksResponse,
};
use cheevos_net::HttpResponse;
use cheevos_runtime::ValueFormat;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchState {
    #[default]
    Idle,
    ResolvingId,
    FetchingDefinitions,
    FetchingUnlocks,
    Ready,
}

const DISC_READ_FAILED: &str = "Failed to read executable from disc. Achievements disabled.";

impl Engine {
    /// Hash the running executable and, if it is a different game, start
    /// fetching its definitions
    pub(crate) fn identify_running_game(&mut self) {
        let Some(running) = self.running.clone() else {
            return;
        };

        let hash = match self
            .identity
            .resolve(running.checksum, &running.elf_path, self.reader.as_ref())
        {
            Resolution::Unchanged => return,
            Resolution::Changed { hash } => hash,
        };

        self.generation += 1;
        self.clear_game_info(true, true);
        self.fetch_state = FetchState::Idle;
        self.game.hash = hash;

        if self.game.hash.is_empty() {
            // Booting the BIOS has no executable and checksum 0
            if running.checksum != 0 {
                tracing::warn!("{}", DISC_READ_FAILED);
                self.notify(Notification::Error {
                    message: DISC_READ_FAILED.to_string(),
                    duration: Duration::from_secs_f32(self.config.error_notification_secs.max(0.0)),
                });
            }
            return;
        }

        tracing::info!("Identifying game {}", self.game.hash);
        self.fetch_state = FetchState::ResolvingId;
        let request = self.urls.game_id(&self.game.hash);
        self.send(request, RequestKind::GameId);
    }

    pub(crate) fn handle_game_id(&mut self, response: &HttpResponse) {
        let game_id = match parse_response::<GameIdResponse>("Get Game ID", response) {
            Ok(response) => response.game_id,
            Err(e) => {
                tracing::warn!("{}", e);
                self.fetch_state = FetchState::Idle;
                return;
            }
        };

        tracing::info!("Server returned GameID {}", game_id);
        if game_id == 0 {
            self.fetch_state = FetchState::Idle;
            return;
        }

        self.fetch_state = FetchState::FetchingDefinitions;
        let request = self
            .urls
            .patch(self.client.session().username(), self.client.session().token(), game_id);
        self.send(request, RequestKind::Patch);
    }

    pub(crate) fn handle_patch(&mut self, response: &HttpResponse) {
        self.clear_game_info(true, true);

        let patch = match parse_response::<PatchResponse>("Get Patches", response) {
            Ok(response) => response.patch_data,
            Err(e) => {
                self.fail_fetch(&e);
                return;
            }
        };
        if patch.id == 0 {
            self.fail_fetch(&ProtocolError::MissingField {
                request: "Get Patches",
                field: "ID",
            });
            return;
        }

        self.load_game_info(&patch);
        self.load_achievements(&patch);
        self.load_leaderboards(&patch);
        self.load_rich_presence(&patch);

        tracing::info!("Game Title: {}", self.game.title);
        tracing::info!("Game Developer: {}", self.game.developer);
        tracing::info!("Game Publisher: {}", self.game.publisher);
        tracing::info!("Achievements: {}", self.registry.achievement_count());
        tracing::info!("Leaderboards: {}", self.registry.leaderboard_count());

        let has_achievements = self.registry.achievement_count() > 0;
        if has_achievements || self.game.has_rich_presence {
            if self.config.test_mode {
                self.activate_locked_achievements();
                self.fetch_state = FetchState::Ready;
                self.display_summary();
                self.notify(Notification::Refreshed);
            } else {
                self.fetch_state = FetchState::FetchingUnlocks;
                let request = self.urls.unlocks(
                    self.client.session().username(),
                    self.client.session().token(),
                    self.game.id,
                    self.config.challenge_mode,
                );
                self.send(request, RequestKind::Unlocks);
            }
        } else {
            self.fetch_state = FetchState::Ready;
            self.display_summary();
        }

        if self.registry.is_empty() && !self.game.has_rich_presence {
            tracing::info!("Nothing to track for this game");
            self.clear_game_info(true, true);
            self.fetch_state = FetchState::Idle;
        }
    }

    fn fail_fetch(&mut self, error: &ProtocolError) {
        tracing::error!("{}", error);
        self.report_error(&error.to_string());
        self.fetch_state = FetchState::Idle;
    }

    fn load_game_info(&mut self, patch: &PatchData) {
        self.game.id = patch.id;
        self.game.title = patch.title.clone();
        self.game.developer = patch.developer.clone();
        self.game.publisher = patch.publisher.clone();
        self.game.release_date = patch.released.clone();

        if !patch.image_icon.is_empty() {
            self.game.icon = self.resolve_game_icon(patch.id, &patch.image_icon);
        }
    }

    fn load_achievements(&mut self, patch: &PatchData) {
        for value in &patch.achievements {
            let definition: AchievementDefinition = match parse_entry(value) {
                Ok(definition) => definition,
                Err(e) => {
                    tracing::warn!("Skipping malformed achievement: {}", e);
                    continue;
                }
            };

            let Some(category) = AchievementCategory::from_flags(definition.flags) else {
                tracing::warn!(
                    "Skipping achievement {} with unknown flags {}",
                    definition.id,
                    definition.flags
                );
                continue;
            };

            if category != AchievementCategory::Core && !self.config.unofficial_test_mode {
                tracing::warn!(
                    "Skipping unofficial achievement {} ({})",
                    definition.id,
                    definition.title
                );
                continue;
            }

            if self.registry.achievement(definition.id).is_some() {
                tracing::error!("Achievement {} already exists", definition.id);
                continue;
            }

            let (locked_badge, unlocked_badge) = if definition.badge_name.is_empty() {
                (String::new(), String::new())
            } else {
                (
                    self.resolve_badge(&definition.badge_name, true),
                    self.resolve_badge(&definition.badge_name, false),
                )
            };

            self.registry.insert_achievement(Achievement {
                id: definition.id,
                title: definition.title,
                description: definition.description,
                memaddr: definition.mem_addr,
                points: definition.points,
                category,
                locked: true,
                active: false,
                locked_badge,
                unlocked_badge,
            });
        }
    }

    fn load_leaderboards(&mut self, patch: &PatchData) {
        for value in &patch.leaderboards {
            let definition: LeaderboardDefinition = match parse_entry(value) {
                Ok(definition) => definition,
                Err(e) => {
                    tracing::warn!("Skipping malformed leaderboard: {}", e);
                    continue;
                }
            };

            let leaderboard = Leaderboard {
                id: definition.id,
                title: definition.title,
                description: definition.description,
                memaddr: definition.mem,
                format: ValueFormat::parse(&definition.format),
            };
            if !self.registry.insert_leaderboard(leaderboard) {
                tracing::error!("Leaderboard {} already exists", definition.id);
                continue;
            }
            self.activate_leaderboard(definition.id);
        }
    }

    fn load_rich_presence(&mut self, patch: &PatchData) {
        if !self.config.rich_presence {
            return;
        }
        let Some(script) = patch.rich_presence_patch.as_deref() else {
            return;
        };
        if script.is_empty() {
            return;
        }

        match self.runtime.activate_rich_presence(script) {
            Ok(()) => self.game.has_rich_presence = true,
            Err(e) => tracing::warn!("Failed to activate rich presence: {}", e),
        }
    }

    pub(crate) fn handle_unlocks(&mut self, response: &HttpResponse) {
        let unlocks = parse_response::<UnlocksResponse>("Get User Unlocks", response).and_then(|unlocks| {
            if unlocks.game_id != self.game.id {
                Err(ProtocolError::GameIdMismatch {
                    expected: self.game.id,
                    actual: unlocks.game_id,
                })
            } else {
                Ok(unlocks)
            }
        });

        let unlocks = match unlocks {
            Ok(unlocks) => unlocks,
            Err(e) => {
                tracing::error!("{}", e);
                self.report_error(&e.to_string());
                self.clear_game_info(true, false);
                self.fetch_state = if self.has_active_game() {
                    FetchState::Ready
                } else {
                    FetchState::Idle
                };
                return;
            }
        };

        for id in unlocks.unlocked_ids() {
            match self.registry.achievement_mut(id) {
                Some(achievement) => achievement.locked = false,
                None => tracing::error!("Server returned unknown achievement {}", id),
            }
        }

        self.activate_locked_achievements();
        self.fetch_state = FetchState::Ready;
        self.display_summary();
        self.send_playing();
        // Ping once rich presence has been evaluated on the next frame
        self.last_ping = None;
        self.notify(Notification::Refreshed);
    }

    fn send_playing(&mut self) {
        if !self.has_active_game() {
            return;
        }
        let request = self.urls.post_playing(
            self.client.session().username(),
            self.client.session().token(),
            self.game.id,
        );
        self.send(request, RequestKind::Playing);
    }

    pub(crate) fn handle_playing(&mut self, response: &HttpResponse) {
        match check_response("Post Activity", response) {
            Ok(_) => tracing::info!("Playing game updated to {} ({})", self.game.id, self.game.title),
            Err(e) => tracing::error!("{}", e),
        }
    }

    fn display_summary(&self) {
        if !self.config.notifications {
            return;
        }

        let mut title = self.game.title.clone();
        if self.config.challenge_mode {
            title.push_str(" (Hardcore Mode)");
        }

        self.notify(Notification::Summary {
            title,
            message: summary_text(
                self.registry.unlocked_count(),
                self.registry.achievement_count(),
                self.registry.current_points(),
                self.registry.maximum_points(),
                self.registry.leaderboard_count(),
                self.config.challenge_mode,
            ),
            icon: self.game.icon.clone(),
            duration: Duration::from_secs_f32(self.config.summary_notification_secs.max(0.0)),
        });
    }
}

/// Body of the summary shown once a game's achievements are loaded
pub fn summary_text(
    unlocked: u32,
    total: u32,
    points: u32,
    max_points: u32,
    leaderboards: u32,
    challenge_mode: bool,
) -> String {
    let mut summary = if total > 0 {
        format!(
            "You have earned {} of {} achievements, and {} of {} points.",
            unlocked, total, points, max_points
        )
    } else {
        "This game has no achievements.".to_string()
    };

    if leaderboards > 0 {
        summary.push('\n');
        if challenge_mode {
            summary.push_str("Leaderboards are enabled.");
        } else {
            summary.push_str("Leaderboards are DISABLED because Hardcore Mode is off.");
        }
    }
    summary
}
