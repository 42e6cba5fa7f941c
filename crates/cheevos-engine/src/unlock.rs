//! Unlock and leaderboard submission pipeline

use crate::engine::{Engine, RequestKind};
use crate::notify::Notification;
use crate::registry::AchievementCategory;
use cheevos_net::protocol::check_response;
use cheevos_net::HttpResponse;
use std::time::Duration;

impl Engine {
    /// Unlock an achievement locally and, for core achievements outside
    /// test mode, report it to the server
    pub fn unlock_achievement(&mut self, id: u32) {
        let game_id = self.game.id;
        let Some(achievement) = self.registry.achievement(id) else {
            tracing::error!("Attempting to unlock unknown achievement {}", id);
            return;
        };
        if !achievement.locked {
            tracing::warn!("Achievement {} for game {} is already unlocked", id, game_id);
            return;
        }

        if let Some(achievement) = self.registry.achievement_mut(id) {
            achievement.locked = false;
        }
        self.deactivate_achievement(id);

        let Some(achievement) = self.registry.achievement(id) else {
            return;
        };
        let category = achievement.category;
        tracing::info!(
            "Achievement {} ({}) for game {} unlocked",
            achievement.title,
            id,
            game_id
        );

        if self.config.notifications {
            self.notify(Notification::AchievementUnlocked {
                id,
                title: format!("{}{}", achievement.title, category.title_suffix()),
                description: achievement.description.clone(),
                badge: achievement.unlocked_badge.clone(),
                duration: Duration::from_secs_f32(self.config.unlock_notification_secs.max(0.0)),
            });
        }

        if self.config.test_mode {
            tracing::warn!(
                "Skipping sending achievement {} unlock to server because of test mode.",
                id
            );
            return;
        }
        if category != AchievementCategory::Core {
            tracing::warn!(
                "Skipping sending achievement {} unlock to server because it's not from the core set.",
                id
            );
            return;
        }

        let request = self.urls.award_achievement(
            self.client.session().username(),
            self.client.session().token(),
            id,
            self.config.challenge_mode,
            &self.game.hash,
        );
        self.send(request, RequestKind::AwardAchievement { id });
    }

    /// Report a leaderboard result. Only done in challenge mode.
    pub fn submit_leaderboard(&mut self, id: u32, value: i32) {
        if self.config.test_mode {
            tracing::warn!(
                "Skipping sending leaderboard {} result to server because of test mode.",
                id
            );
            return;
        }
        if !self.config.challenge_mode {
            tracing::warn!(
                "Skipping sending leaderboard {} result to server because Challenge mode is off.",
                id
            );
            return;
        }

        tracing::info!("Submitting {} to leaderboard {}", value, id);
        let request = self.urls.submit_leaderboard(
            self.client.session().username(),
            self.client.session().token(),
            id,
            value,
        );
        self.send(request, RequestKind::SubmitLeaderboard { id });
    }

    pub(crate) fn handle_award(&mut self, id: u32, response: &HttpResponse) {
        match check_response("Award Cheevo", response) {
            Ok(()) => tracing::info!("Server accepted unlock of achievement {}", id),
            Err(e) => tracing::error!("{}", e),
        }
    }

    pub(crate) fn handle_submit(&mut self, id: u32, response: &HttpResponse) {
        if let Err(e) = check_response("Submit Leaderboard", response) {
            tracing::error!("{}", e);
        }

        // Force the next query to refetch so a new score shows up
        if self.last_queried_leaderboard == Some(id) {
            self.last_queried_leaderboard = None;
            self.leaderboard_entries = None;
        }
    }
}
