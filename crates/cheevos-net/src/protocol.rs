//! Achievement server protocol
//!
//! URL builders for every request the engine makes, and the JSON documents
//! the server answers with. All requests go to `<base>/dorequest.php` with
//! the request type in the `r` parameter.

use crate::transport::{HttpRequest, HttpResponse, HTTP_OK};
use cheevos_core::ProtocolError;
use md5::{Digest, Md5};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Deserializer};

/// Number of leaderboard entries fetched around the user.
/// Just over what a single page shows.
pub const LEADERBOARD_ENTRY_COUNT: u32 = 15;

/// Builds request URLs against a server and media host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiUrls {
    base_url: String,
    media_url: String,
}

impl ApiUrls {
    pub fn new(base_url: impl Into<String>, media_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            media_url: media_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn dorequest(&self, params: &[(&str, &str)]) -> String {
        let query: Vec<String> = params
            .iter()
            .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
            .collect();
        format!("{}/dorequest.php?{}", self.base_url, query.join("&"))
    }

    pub fn login(&self, username: &str, password: &str) -> HttpRequest {
        HttpRequest::get(self.dorequest(&[("r", "login"), ("u", username), ("p", password)]))
    }

    pub fn game_id(&self, game_hash: &str) -> HttpRequest {
        HttpRequest::get(self.dorequest(&[("r", "gameid"), ("m", game_hash)]))
    }

    pub fn patch(&self, username: &str, token: &str, game_id: u32) -> HttpRequest {
        let game_id = game_id.to_string();
        HttpRequest::get(self.dorequest(&[
            ("r", "patch"),
            ("u", username),
            ("t", token),
            ("g", &game_id),
        ]))
    }

    pub fn unlocks(&self, username: &str, token: &str, game_id: u32, hardcore: bool) -> HttpRequest {
        let game_id = game_id.to_string();
        HttpRequest::get(self.dorequest(&[
            ("r", "unlocks"),
            ("u", username),
            ("t", token),
            ("g", &game_id),
            ("h", flag(hardcore)),
        ]))
    }

    /// "Playing" beacon; activity type 3 is "started playing"
    pub fn post_playing(&self, username: &str, token: &str, game_id: u32) -> HttpRequest {
        let game_id = game_id.to_string();
        HttpRequest::get(self.dorequest(&[
            ("r", "postactivity"),
            ("u", username),
            ("t", token),
            ("a", "3"),
            ("m", &game_id),
        ]))
    }

    /// Heartbeat; the rich presence text travels in the POST body
    pub fn ping(&self, username: &str, token: &str, game_id: u32, rich_presence: &str) -> HttpRequest {
        let game_id = game_id.to_string();
        let url = self.dorequest(&[("r", "ping"), ("u", username), ("t", token), ("g", &game_id)]);
        let body = if rich_presence.is_empty() {
            String::new()
        } else {
            format!("m={}", urlencoding::encode(rich_presence))
        };
        HttpRequest::post(url, body)
    }

    pub fn award_achievement(
        &self,
        username: &str,
        token: &str,
        achievement_id: u32,
        hardcore: bool,
        game_hash: &str,
    ) -> HttpRequest {
        let id = achievement_id.to_string();
        let signature = signature(&[&id, username, flag(hardcore)]);
        let mut params = vec![
            ("r", "awardachievement"),
            ("u", username),
            ("t", token),
            ("a", id.as_str()),
            ("h", flag(hardcore)),
        ];
        if !game_hash.is_empty() {
            params.push(("m", game_hash));
        }
        params.push(("v", signature.as_str()));
        HttpRequest::get(self.dorequest(&params))
    }

    pub fn submit_leaderboard(
        &self,
        username: &str,
        token: &str,
        leaderboard_id: u32,
        score: i32,
    ) -> HttpRequest {
        let id = leaderboard_id.to_string();
        let score = score.to_string();
        let signature = signature(&[&id, username, &score]);
        HttpRequest::get(self.dorequest(&[
            ("r", "submitlbentry"),
            ("u", username),
            ("t", token),
            ("i", &id),
            ("s", &score),
            ("v", &signature),
        ]))
    }

    pub fn leaderboard_entries_near_user(
        &self,
        leaderboard_id: u32,
        username: &str,
        count: u32,
    ) -> HttpRequest {
        let id = leaderboard_id.to_string();
        let count = count.to_string();
        HttpRequest::get(self.dorequest(&[
            ("r", "lbinfo"),
            ("i", &id),
            ("u", username),
            ("c", &count),
        ]))
    }

    /// Badge image, `<name>.png` or `<name>_lock.png`
    pub fn badge_image(&self, badge_name: &str, locked: bool) -> HttpRequest {
        let suffix = if locked { "_lock" } else { "" };
        HttpRequest::get(format!(
            "{}/Badge/{}{}.png",
            self.media_url,
            urlencoding::encode(badge_name),
            suffix
        ))
    }

    /// Arbitrary media path as given by the server, e.g. a game icon
    pub fn media(&self, path: &str) -> HttpRequest {
        if path.starts_with('/') {
            HttpRequest::get(format!("{}{}", self.media_url, path))
        } else {
            HttpRequest::get(format!("{}/{}", self.media_url, path))
        }
    }
}

fn flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

/// Lowercase hex md5 over the concatenated parts
fn signature(parts: &[&str]) -> String {
    let mut digest = Md5::new();
    for part in parts {
        digest.update(part.as_bytes());
    }
    hex::encode(digest.finalize())
}

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// `r=login`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoginResponse {
    #[serde(default, deserialize_with = "nullable")]
    pub user: String,
    #[serde(default, deserialize_with = "nullable")]
    pub token: String,
}

/// `r=gameid`
#[derive(Debug, Clone, Deserialize)]
pub struct GameIdResponse {
    #[serde(rename = "GameID", default, deserialize_with = "nullable")]
    pub game_id: u32,
}

/// `r=patch`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PatchResponse {
    pub patch_data: PatchData,
}

/// Game metadata plus raw achievement and leaderboard entries.
///
/// Entries stay as raw JSON so one malformed definition can be skipped
/// without failing the whole fetch.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PatchData {
    #[serde(rename = "ID")]
    pub id: u32,
    #[serde(default, deserialize_with = "nullable")]
    pub title: String,
    #[serde(default, deserialize_with = "nullable")]
    pub developer: String,
    #[serde(default, deserialize_with = "nullable")]
    pub publisher: String,
    #[serde(default, deserialize_with = "nullable")]
    pub released: String,
    #[serde(default, deserialize_with = "nullable")]
    pub image_icon: String,
    #[serde(default, deserialize_with = "nullable")]
    pub achievements: Vec<serde_json::Value>,
    #[serde(default, deserialize_with = "nullable")]
    pub leaderboards: Vec<serde_json::Value>,
    #[serde(default)]
    pub rich_presence_patch: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AchievementDefinition {
    #[serde(rename = "ID")]
    pub id: u32,
    pub flags: u32,
    pub mem_addr: String,
    pub title: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    #[serde(default, deserialize_with = "nullable")]
    pub badge_name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub points: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LeaderboardDefinition {
    #[serde(rename = "ID")]
    pub id: u32,
    pub mem: String,
    pub title: String,
    pub format: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
}

/// `r=unlocks`
#[derive(Debug, Clone, Deserialize)]
pub struct UnlocksResponse {
    #[serde(rename = "GameID", default, deserialize_with = "nullable")]
    pub game_id: u32,
    #[serde(rename = "UserUnlocks", default, deserialize_with = "nullable")]
    pub user_unlocks: Vec<serde_json::Value>,
}

impl UnlocksResponse {
    /// Unlocked achievement ids; non-integer entries are ignored
    pub fn unlocked_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.user_unlocks
            .iter()
            .filter_map(|value| value.as_u64())
            .filter_map(|id| u32::try_from(id).ok())
    }
}

/// `r=lbinfo`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LeaderboardInfoResponse {
    pub leaderboard_data: LeaderboardData,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LeaderboardData {
    #[serde(rename = "LBID")]
    pub id: u32,
    #[serde(default)]
    pub entries: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LeaderboardEntryDefinition {
    pub user: String,
    pub score: i32,
    pub rank: u32,
}

/// Validate the response envelope and decode the document.
///
/// A response is only a success if the transfer returned 200 with a
/// non-empty JSON body whose `Success` field is `true`.
pub fn parse_response<T: DeserializeOwned>(
    request: &'static str,
    response: &HttpResponse,
) -> Result<T, ProtocolError> {
    if response.status != HTTP_OK {
        return Err(ProtocolError::Status {
            request,
            status: response.status,
        });
    }
    if response.body.is_empty() {
        return Err(ProtocolError::EmptyResponse { request });
    }

    let document: serde_json::Value =
        serde_json::from_slice(&response.body).map_err(|e| ProtocolError::Malformed {
            request,
            message: e.to_string(),
        })?;

    let success = document
        .get("Success")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false);
    if !success {
        let message = document
            .get("Error")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Err(ProtocolError::Server { request, message });
    }

    serde_json::from_value(document).map_err(|e| ProtocolError::Malformed {
        request,
        message: e.to_string(),
    })
}

/// Validate the response envelope of a request whose payload is not needed
pub fn check_response(request: &'static str, response: &HttpResponse) -> Result<(), ProtocolError> {
    parse_response::<IgnoredAny>(request, response).map(|_| ())
}

/// Decode one entry of a definition list
pub fn parse_entry<T: DeserializeOwned>(value: &serde_json::Value) -> Result<T, serde_json::Error> {
    T::deserialize(value)
}
