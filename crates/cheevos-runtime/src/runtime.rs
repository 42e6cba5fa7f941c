//! Trigger evaluation engine interface
//!
//! Implemented outside this workspace by whatever rule engine the host
//! links. The engine owns per-trigger progress (hit counts, deltas) which is
//! what save states carry.

use crate::memory::MemoryAccessor;
use cheevos_core::EngineError;

/// What happened to a trigger during a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeEventKind {
    AchievementActivated,
    AchievementPaused,
    AchievementReset,
    AchievementTriggered,
    AchievementPrimed,
    AchievementDisabled,
    LeaderboardStarted,
    LeaderboardCanceled,
    LeaderboardUpdated,
    LeaderboardTriggered,
    LeaderboardDisabled,
}

impl RuntimeEventKind {
    pub fn is_leaderboard(self) -> bool {
        matches!(
            self,
            Self::LeaderboardStarted
                | Self::LeaderboardCanceled
                | Self::LeaderboardUpdated
                | Self::LeaderboardTriggered
                | Self::LeaderboardDisabled
        )
    }
}

/// An event raised by the runtime for one achievement or leaderboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeEvent {
    pub kind: RuntimeEventKind,
    pub id: u32,
    /// Leaderboard value for leaderboard events, 0 otherwise
    pub value: i32,
}

impl RuntimeEvent {
    pub fn achievement(kind: RuntimeEventKind, id: u32) -> Self {
        Self { kind, id, value: 0 }
    }

    pub fn leaderboard(kind: RuntimeEventKind, id: u32, value: i32) -> Self {
        Self { kind, id, value }
    }
}

/// The rule engine as seen by the achievement engine
pub trait TriggerRuntime: Send {
    /// Start evaluating an achievement trigger
    fn activate_achievement(&mut self, id: u32, expression: &str) -> Result<(), EngineError>;

    /// Stop evaluating an achievement. Unknown ids are ignored.
    fn deactivate_achievement(&mut self, id: u32);

    fn activate_leaderboard(&mut self, id: u32, expression: &str) -> Result<(), EngineError>;

    fn deactivate_leaderboard(&mut self, id: u32);

    fn activate_rich_presence(&mut self, script: &str) -> Result<(), EngineError>;

    /// Evaluate every active trigger against `memory` once
    fn do_frame(&mut self, memory: &dyn MemoryAccessor) -> Vec<RuntimeEvent>;

    /// Current rich presence text; `None` when there is no script or no output
    fn rich_presence(&mut self, memory: &dyn MemoryAccessor) -> Option<String>;

    /// Bytes needed by `serialize_progress`
    fn progress_size(&self) -> Result<usize, EngineError>;

    /// Write progress into `buffer`, which is exactly `progress_size()` long
    fn serialize_progress(&self, buffer: &mut [u8]) -> Result<(), EngineError>;

    /// Restore progress. Must not read beyond `buffer`.
    fn deserialize_progress(&mut self, buffer: &[u8]) -> Result<(), EngineError>;

    /// Clear all progress, keeping triggers active
    fn reset(&mut self);

    /// Measured progress of an achievement as (current, target)
    fn achievement_progress(&self, id: u32) -> (u32, u32);

    /// Human readable measured progress, e.g. "3/10"
    fn format_achievement_progress(&self, id: u32) -> String;
}
