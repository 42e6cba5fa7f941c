//! Per-frame trigger coordination
//!
//! Each frame: apply network results, advance the runtime, act on its
//! events, refresh rich presence and send a heartbeat when due.

use crate::engine::{Engine, RequestKind};
use crate::notify::Notification;
use cheevos_net::protocol::check_response;
use cheevos_net::HttpResponse;
use cheevos_runtime::{MemoryAccessor, RuntimeEvent, RuntimeEventKind};
use std::time::{Duration, Instant};

/// Heartbeat interval while rich presence is reported
pub const RICH_PRESENCE_PING_INTERVAL: Duration = Duration::from_secs(2 * 60);

/// Heartbeat interval without rich presence
pub const NO_RICH_PRESENCE_PING_INTERVAL: Duration = Duration::from_secs(4 * 60);

/// Longest rich presence string kept, in bytes
pub const RICH_PRESENCE_MAX_LEN: usize = 511;

/// Cut `text` to at most `max` bytes without splitting a character
pub fn truncate_rich_presence(text: &mut String, max: usize) {
    if text.len() <= max {
        return;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
}

impl Engine {
    /// Run once per emulated frame
    pub fn do_frame(&mut self, memory: &dyn MemoryAccessor) {
        if !self.active {
            return;
        }

        self.poll();

        if !self.has_active_game() {
            return;
        }

        for event in self.runtime.do_frame(memory) {
            self.handle_runtime_event(event);
        }

        self.update_rich_presence(memory);

        if !self.config.test_mode {
            let due = match self.last_ping {
                Some(last) => last.elapsed() >= self.ping_interval(),
                None => true,
            };
            if due {
                self.send_ping();
            }
        }
    }

    pub fn ping_interval(&self) -> Duration {
        if self.config.rich_presence {
            RICH_PRESENCE_PING_INTERVAL
        } else {
            NO_RICH_PRESENCE_PING_INTERVAL
        }
    }

    fn handle_runtime_event(&mut self, event: RuntimeEvent) {
        tracing::trace!("Runtime event {:?} for {}", event.kind, event.id);

        let known = if event.kind.is_leaderboard() {
            self.registry.leaderboard(event.id).is_some()
        } else {
            self.registry.achievement(event.id).is_some()
        };
        if !known {
            tracing::warn!("Runtime event {:?} for unknown id {}", event.kind, event.id);
            return;
        }

        match event.kind {
            RuntimeEventKind::AchievementTriggered => self.unlock_achievement(event.id),
            RuntimeEventKind::LeaderboardTriggered => self.submit_leaderboard(event.id, event.value),
            RuntimeEventKind::AchievementDisabled => {
                // The runtime gave up on the trigger; keep the flag honest
                if let Some(achievement) = self.registry.achievement_mut(event.id) {
                    achievement.active = false;
                }
                tracing::warn!("Achievement {} disabled by runtime", event.id);
            }
            _ => {}
        }
    }

    fn update_rich_presence(&mut self, memory: &dyn MemoryAccessor) {
        if !self.game.has_rich_presence {
            return;
        }

        let mut text = self.runtime.rich_presence(memory).unwrap_or_default();
        truncate_rich_presence(&mut text, RICH_PRESENCE_MAX_LEN);
        if text == self.game.rich_presence {
            return;
        }

        tracing::debug!("Rich presence: {}", text);
        self.game.rich_presence = text.clone();
        self.notify(Notification::PresenceChanged { text });
    }

    fn send_ping(&mut self) {
        if !self.has_active_game() {
            return;
        }

        let request = self.urls.ping(
            self.client.session().username(),
            self.client.session().token(),
            self.game.id,
            &self.game.rich_presence,
        );
        self.send(request, RequestKind::Ping);
        self.last_ping = Some(Instant::now());
    }

    pub(crate) fn handle_ping(&mut self, response: &HttpResponse) {
        if let Err(e) = check_response("Ping", response) {
            tracing::error!("{}", e);
        }
    }

    fn activate_achievement(&mut self, id: u32) -> bool {
        let Some(achievement) = self.registry.achievement_mut(id) else {
            return false;
        };
        if achievement.active {
            return true;
        }

        match self.runtime.activate_achievement(id, &achievement.memaddr) {
            Ok(()) => {
                achievement.active = true;
                tracing::debug!("Activated achievement {} ({})", achievement.title, id);
                true
            }
            Err(e) => {
                tracing::error!("Achievement {} memaddr parse error: {}", id, e);
                false
            }
        }
    }

    pub(crate) fn deactivate_achievement(&mut self, id: u32) {
        let Some(achievement) = self.registry.achievement_mut(id) else {
            return;
        };
        if !achievement.active {
            return;
        }

        self.runtime.deactivate_achievement(id);
        achievement.active = false;
        tracing::debug!("Deactivated achievement {} ({})", achievement.title, id);
    }

    pub(crate) fn activate_locked_achievements(&mut self) {
        let locked: Vec<u32> = self
            .registry
            .achievements()
            .iter()
            .filter(|a| a.locked)
            .map(|a| a.id)
            .collect();
        for id in locked {
            self.activate_achievement(id);
        }
    }

    pub(crate) fn activate_leaderboard(&mut self, id: u32) {
        let Some(leaderboard) = self.registry.leaderboard(id) else {
            return;
        };

        match self.runtime.activate_leaderboard(id, &leaderboard.memaddr) {
            Ok(()) => tracing::debug!("Activated leaderboard {} ({})", leaderboard.title, id),
            Err(e) => tracing::error!("Leaderboard {} memaddr parse error: {}", id, e),
        }
    }

    /// Drop achievements and/or leaderboards, deactivating them first. When
    /// nothing is left the whole game context goes too.
    pub(crate) fn clear_game_info(&mut self, clear_achievements: bool, clear_leaderboards: bool) {
        let had_game = self.has_active_game();

        if clear_achievements {
            for achievement in self.registry.take_achievements() {
                if achievement.active {
                    self.runtime.deactivate_achievement(achievement.id);
                }
            }
        }

        if clear_leaderboards {
            for leaderboard in self.registry.take_leaderboards() {
                self.runtime.deactivate_leaderboard(leaderboard.id);
            }
            self.last_queried_leaderboard = None;
            self.leaderboard_entries = None;
        }

        if self.registry.is_empty() {
            self.game.clear();
        }

        if had_game {
            self.notify(Notification::Refreshed);
        }
    }
}
