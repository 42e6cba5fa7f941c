//! Leaderboard value formats

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How a leaderboard value is displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ValueFormat {
    /// Frame count at 60 fps
    Frames,
    Seconds,
    Centiseconds,
    Score,
    #[default]
    Value,
    Minutes,
    SecondsAsMinutes,
}

impl FromStr for ValueFormat {
    type Err = std::convert::Infallible;

    /// Unknown format names fall back to a plain value
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_uppercase().as_str() {
            "TIME" | "FRAMES" => Self::Frames,
            "SECS" | "TIMESECS" => Self::Seconds,
            "MILLISECS" | "CENTISECS" => Self::Centiseconds,
            "SCORE" | "POINTS" => Self::Score,
            "MINUTES" => Self::Minutes,
            "SECS_AS_MINS" => Self::SecondsAsMinutes,
            _ => Self::Value,
        })
    }
}

impl ValueFormat {
    /// Parse a server format string
    pub fn parse(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }

    /// Whether values are durations rather than counts
    pub fn is_time(self) -> bool {
        !matches!(self, Self::Score | Self::Value)
    }

    /// Render a raw leaderboard value
    pub fn format_value(self, value: i32) -> String {
        match self {
            Self::Frames => {
                let centiseconds = (value.unsigned_abs() as u64 * 100) / 60;
                format_centiseconds(value < 0, centiseconds)
            }
            Self::Centiseconds => format_centiseconds(value < 0, value.unsigned_abs() as u64),
            Self::Seconds => {
                let total = value.unsigned_abs() as u64;
                let (hours, minutes, seconds) = (total / 3600, (total / 60) % 60, total % 60);
                let sign = if value < 0 { "-" } else { "" };
                if hours > 0 {
                    format!("{}{}h{:02}:{:02}", sign, hours, minutes, seconds)
                } else {
                    format!("{}{}:{:02}", sign, minutes, seconds)
                }
            }
            Self::Minutes => {
                let total = value.unsigned_abs() as u64;
                let sign = if value < 0 { "-" } else { "" };
                format!("{}{}h{:02}", sign, total / 60, total % 60)
            }
            Self::SecondsAsMinutes => {
                let total = value.unsigned_abs() as u64 / 60;
                let sign = if value < 0 { "-" } else { "" };
                format!("{}{}h{:02}", sign, total / 60, total % 60)
            }
            Self::Score => format!("{:06} points", value),
            Self::Value => value.to_string(),
        }
    }
}

fn format_centiseconds(negative: bool, centiseconds: u64) -> String {
    let sign = if negative { "-" } else { "" };
    let seconds = centiseconds / 100;
    let (hours, minutes) = (seconds / 3600, (seconds / 60) % 60);
    if hours > 0 {
        format!(
            "{}{}h{:02}:{:02}.{:02}",
            sign,
            hours,
            minutes,
            seconds % 60,
            centiseconds % 100
        )
    } else {
        format!("{}{}:{:02}.{:02}", sign, minutes, seconds % 60, centiseconds % 100)
    }
}
