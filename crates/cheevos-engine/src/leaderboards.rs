//! Leaderboard entry queries
//!
//! Only the most recently queried board is cached. Entries are a fixed
//! window around the user; there is no paging.

use crate::engine::{Engine, RequestKind};
use crate::registry::LeaderboardEntry;
use cheevos_net::protocol::{
    parse_entry, parse_response, LeaderboardEntryDefinition, LeaderboardInfoResponse,
    LEADERBOARD_ENTRY_COUNT,
};
use cheevos_net::HttpResponse;

impl Engine {
    /// Cached entries for `id`, if they have arrived.
    ///
    /// Asking for a different board than last time drops the cache and
    /// starts a query; `None` is returned until its result is polled.
    pub fn try_leaderboard_entries(&mut self, id: u32) -> Option<&[LeaderboardEntry]> {
        if self.last_queried_leaderboard == Some(id) {
            return self.leaderboard_entries.as_deref();
        }

        self.last_queried_leaderboard = Some(id);
        self.leaderboard_entries = None;

        let request = self.urls.leaderboard_entries_near_user(
            id,
            self.client.session().username(),
            LEADERBOARD_ENTRY_COUNT,
        );
        self.send(request, RequestKind::LeaderboardEntries { id });
        None
    }

    pub(crate) fn handle_leaderboard_entries(&mut self, id: u32, response: &HttpResponse) {
        let info = match parse_response::<LeaderboardInfoResponse>("Get Leaderboard Info", response) {
            Ok(info) => info.leaderboard_data,
            Err(e) => {
                tracing::error!("{}", e);
                return;
            }
        };

        if info.id != id || self.last_queried_leaderboard != Some(info.id) {
            // Another board was requested since
            tracing::debug!("Dropping entries for leaderboard {}", info.id);
            return;
        }

        let Some(values) = info.entries else {
            return;
        };
        let Some(leaderboard) = self.registry.leaderboard(info.id) else {
            tracing::error!("Attempting to list unknown leaderboard {}", info.id);
            return;
        };

        let username = self.client.session().username();
        let entries: Vec<LeaderboardEntry> = values
            .iter()
            .filter_map(|value| match parse_entry::<LeaderboardEntryDefinition>(value) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("Skipping malformed leaderboard entry: {}", e);
                    None
                }
            })
            .map(|entry| LeaderboardEntry {
                is_self: entry.user == username,
                formatted_score: leaderboard.format.format_value(entry.score),
                rank: entry.rank,
                user: entry.user,
            })
            .collect();

        tracing::debug!("Received {} entries for leaderboard {}", entries.len(), info.id);
        self.leaderboard_entries = Some(entries);
    }
}
