//! Achievement and leaderboard registry for the tracked game

use cheevos_runtime::ValueFormat;

/// Which set an achievement belongs to, from the server's `Flags` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AchievementCategory {
    Local = 0,
    Core = 3,
    Unofficial = 5,
}

impl AchievementCategory {
    pub fn from_flags(flags: u32) -> Option<Self> {
        match flags {
            0 => Some(Self::Local),
            3 => Some(Self::Core),
            5 => Some(Self::Unofficial),
            _ => None,
        }
    }

    /// Suffix shown after the title in unlock notifications
    pub fn title_suffix(self) -> &'static str {
        match self {
            Self::Local => " (Local)",
            Self::Unofficial => " (Unofficial)",
            Self::Core => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Achievement {
    pub id: u32,
    pub title: String,
    pub description: String,
    /// Trigger expression handed to the runtime
    pub memaddr: String,
    pub points: u32,
    pub category: AchievementCategory,
    pub locked: bool,
    /// Currently being evaluated by the runtime
    pub active: bool,
    pub locked_badge: String,
    pub unlocked_badge: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaderboard {
    pub id: u32,
    pub title: String,
    pub description: String,
    pub memaddr: String,
    pub format: ValueFormat,
}

impl Leaderboard {
    pub fn is_time(&self) -> bool {
        self.format.is_time()
    }
}

/// One ranked row of a leaderboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub user: String,
    pub rank: u32,
    pub formatted_score: String,
    pub is_self: bool,
}

/// Metadata of the tracked game
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameContext {
    /// Server game id; 0 when no game is tracked
    pub id: u32,
    pub title: String,
    pub developer: String,
    pub publisher: String,
    pub release_date: String,
    /// Cached icon path, or the server media path when there is no cache
    pub icon: String,
    /// Identity hash of the running executable
    pub hash: String,
    pub has_rich_presence: bool,
    pub rich_presence: String,
}

impl GameContext {
    /// Tear down everything except the identity hash
    pub fn clear(&mut self) {
        let hash = std::mem::take(&mut self.hash);
        *self = Self {
            hash,
            ..Self::default()
        };
    }
}

/// Definitions loaded for the current game, unique by id
#[derive(Debug, Default)]
pub struct Registry {
    achievements: Vec<Achievement>,
    leaderboards: Vec<Leaderboard>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn achievements(&self) -> &[Achievement] {
        &self.achievements
    }

    pub fn leaderboards(&self) -> &[Leaderboard] {
        &self.leaderboards
    }

    pub fn achievement(&self, id: u32) -> Option<&Achievement> {
        self.achievements.iter().find(|a| a.id == id)
    }

    pub fn achievement_mut(&mut self, id: u32) -> Option<&mut Achievement> {
        self.achievements.iter_mut().find(|a| a.id == id)
    }

    pub fn leaderboard(&self, id: u32) -> Option<&Leaderboard> {
        self.leaderboards.iter().find(|l| l.id == id)
    }

    /// Add an achievement. Returns false (and drops it) if the id is taken.
    pub fn insert_achievement(&mut self, achievement: Achievement) -> bool {
        if self.achievement(achievement.id).is_some() {
            return false;
        }
        self.achievements.push(achievement);
        true
    }

    /// Add a leaderboard. Returns false (and drops it) if the id is taken.
    pub fn insert_leaderboard(&mut self, leaderboard: Leaderboard) -> bool {
        if self.leaderboard(leaderboard.id).is_some() {
            return false;
        }
        self.leaderboards.push(leaderboard);
        true
    }

    /// Remove all achievements, most recently added first
    pub fn take_achievements(&mut self) -> Vec<Achievement> {
        let mut taken = std::mem::take(&mut self.achievements);
        taken.reverse();
        taken
    }

    pub fn take_leaderboards(&mut self) -> Vec<Leaderboard> {
        let mut taken = std::mem::take(&mut self.leaderboards);
        taken.reverse();
        taken
    }

    pub fn is_empty(&self) -> bool {
        self.achievements.is_empty() && self.leaderboards.is_empty()
    }

    pub fn achievement_count(&self) -> u32 {
        self.achievements.len() as u32
    }

    pub fn unlocked_count(&self) -> u32 {
        self.achievements.iter().filter(|a| !a.locked).count() as u32
    }

    pub fn leaderboard_count(&self) -> u32 {
        self.leaderboards.len() as u32
    }

    pub fn maximum_points(&self) -> u32 {
        self.achievements.iter().map(|a| a.points).sum()
    }

    pub fn current_points(&self) -> u32 {
        self.achievements
            .iter()
            .filter(|a| !a.locked)
            .map(|a| a.points)
            .sum()
    }
}
