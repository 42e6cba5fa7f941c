//! Achievement tracking and synchronization engine
//!
//! Identifies the running game, fetches its achievement and leaderboard
//! definitions, evaluates triggers every frame through an external runtime,
//! reports unlocks and scores without blocking emulation, and carries
//! trigger progress through save states.

mod badges;
mod coordinator;
mod engine;
pub mod external;
mod fetcher;
mod leaderboards;
pub mod notify;
pub mod registry;
pub mod savestate;
mod unlock;

pub use badges::{badge_cache_path, game_icon_path, sanitize_file_name};
pub use coordinator::{
    truncate_rich_presence, NO_RICH_PRESENCE_PING_INTERVAL, RICH_PRESENCE_MAX_LEN,
    RICH_PRESENCE_PING_INTERVAL,
};
pub use engine::{Collaborators, Engine};
pub use external::{build_achievements, Achievements, ExternalClient, ExternalIntegration};
pub use fetcher::{summary_text, FetchState};
pub use notify::{Notification, Notifier, NullNotifier};
pub use registry::{
    Achievement, AchievementCategory, GameContext, Leaderboard, LeaderboardEntry, Registry,
};
pub use savestate::{read_section, write_section, SectionError};
