//! Test doubles for engine integration tests

#![allow(dead_code)]

use cheevos_core::settings::{KEY_TOKEN, KEY_USERNAME, SECTION};
use cheevos_core::{AchievementsConfig, EngineError, MemorySettings, SettingsStore};
use cheevos_disc::{ExecutableReader, ReadError};
use cheevos_engine::{Collaborators, Engine, Notification, Notifier};
use cheevos_net::{HttpRequest, HttpResponse, Transport};
use cheevos_runtime::{MemoryAccessor, MemoryWindow, RuntimeEvent, RuntimeEventKind, TriggerRuntime};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

pub const ELF_PATH: &str = "cdrom0:\\SLUS_200.62;1";
pub const ELF_BYTES: &[u8] = b"\x7fELF test executable";
pub const CHECKSUM: u32 = 0x1234_5678;
pub const USERNAME: &str = "player";
pub const TOKEN: &str = "token123";
pub const GAME_ID: u32 = 42;

pub fn game_hash() -> String {
    cheevos_disc::game_hash("SLUS_200.62", ELF_BYTES)
}

/// A trigger in the toy expression language: `ADDR=VALUE[:FRAMES]`.
///
/// Fires once the byte at ADDR has equalled VALUE for FRAMES consecutive
/// frames (default 1), then waits for the condition to drop before it can
/// fire again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub address: u32,
    pub value: u32,
    pub frames: u32,
    pub hits: u32,
    pub fired: bool,
}

impl Trigger {
    pub fn parse(expression: &str) -> Option<Self> {
        let (address, rest) = expression.split_once('=')?;
        let address = u32::from_str_radix(address.trim().trim_start_matches("0x"), 16).ok()?;
        let (value, frames) = match rest.split_once(':') {
            Some((value, frames)) => (value, frames.trim().parse().ok()?),
            None => (rest, 1),
        };
        Some(Self {
            address,
            value: value.trim().parse().ok()?,
            frames,
            hits: 0,
            fired: false,
        })
    }

    /// Advance one frame; true when the trigger fires
    fn step(&mut self, memory: &dyn MemoryAccessor) -> bool {
        if memory.peek(self.address, 1) != self.value {
            self.hits = 0;
            self.fired = false;
            return false;
        }
        if self.fired {
            return false;
        }
        self.hits += 1;
        if self.hits >= self.frames {
            self.fired = true;
            return true;
        }
        false
    }
}

#[derive(Debug, Default)]
pub struct RuntimeState {
    pub achievements: BTreeMap<u32, Trigger>,
    pub leaderboards: BTreeMap<u32, Trigger>,
    pub rich_presence: Option<String>,
    pub resets: u32,
    pub fail_serialize: bool,
    /// Reported by the next frame ahead of any trigger events
    pub pending_events: Vec<RuntimeEvent>,
    pub events: Vec<RuntimeEvent>,
}

const PROGRESS_MAGIC: &[u8; 4] = b"PROG";

/// Runtime evaluating toy triggers; state is shared with the test
pub struct ScriptedRuntime {
    state: Arc<Mutex<RuntimeState>>,
}

impl ScriptedRuntime {
    pub fn new() -> (Self, Arc<Mutex<RuntimeState>>) {
        let state = Arc::new(Mutex::new(RuntimeState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            state,
        )
    }
}

impl TriggerRuntime for ScriptedRuntime {
    fn activate_achievement(&mut self, id: u32, expression: &str) -> Result<(), EngineError> {
        let trigger = Trigger::parse(expression).ok_or_else(|| EngineError::Rejected {
            id,
            reason: format!("bad expression {:?}", expression),
        })?;
        self.state.lock().achievements.insert(id, trigger);
        Ok(())
    }

    fn deactivate_achievement(&mut self, id: u32) {
        self.state.lock().achievements.remove(&id);
    }

    fn activate_leaderboard(&mut self, id: u32, expression: &str) -> Result<(), EngineError> {
        let trigger = Trigger::parse(expression).ok_or_else(|| EngineError::Rejected {
            id,
            reason: format!("bad expression {:?}", expression),
        })?;
        self.state.lock().leaderboards.insert(id, trigger);
        Ok(())
    }

    fn deactivate_leaderboard(&mut self, id: u32) {
        self.state.lock().leaderboards.remove(&id);
    }

    fn activate_rich_presence(&mut self, script: &str) -> Result<(), EngineError> {
        if script.contains("invalid") {
            return Err(EngineError::RichPresence(script.to_string()));
        }
        self.state.lock().rich_presence = Some(script.to_string());
        Ok(())
    }

    fn do_frame(&mut self, memory: &dyn MemoryAccessor) -> Vec<RuntimeEvent> {
        let mut state = self.state.lock();
        let mut events: Vec<RuntimeEvent> = state.pending_events.drain(..).collect();

        for (id, trigger) in state.achievements.iter_mut() {
            if trigger.step(memory) {
                events.push(RuntimeEvent::achievement(RuntimeEventKind::AchievementTriggered, *id));
            }
        }
        for (id, trigger) in state.leaderboards.iter_mut() {
            if trigger.step(memory) {
                let value = memory.peek(trigger.address, 1) as i32;
                events.push(RuntimeEvent::leaderboard(
                    RuntimeEventKind::LeaderboardTriggered,
                    *id,
                    value,
                ));
            }
        }

        state.events.extend(events.iter().copied());
        events
    }

    /// `"Stage @0x20"` renders as `"Stage <byte at 0x20>"`
    fn rich_presence(&mut self, memory: &dyn MemoryAccessor) -> Option<String> {
        let script = self.state.lock().rich_presence.clone()?;
        match script.split_once('@') {
            Some((prefix, address)) => {
                let address = u32::from_str_radix(address.trim_start_matches("0x"), 16).ok()?;
                Some(format!("{}{}", prefix, memory.peek(address, 1)))
            }
            None => Some(script),
        }
    }

    fn progress_size(&self) -> Result<usize, EngineError> {
        let state = self.state.lock();
        if state.fail_serialize {
            return Err(EngineError::Serialize("scripted failure".to_string()));
        }
        Ok(PROGRESS_MAGIC.len() + state.achievements.len() * 8)
    }

    fn serialize_progress(&self, buffer: &mut [u8]) -> Result<(), EngineError> {
        let state = self.state.lock();
        let mut data = PROGRESS_MAGIC.to_vec();
        for (id, trigger) in &state.achievements {
            data.extend_from_slice(&id.to_le_bytes());
            data.extend_from_slice(&trigger.hits.to_le_bytes());
        }
        if data.len() != buffer.len() {
            return Err(EngineError::Serialize("buffer size mismatch".to_string()));
        }
        buffer.copy_from_slice(&data);
        Ok(())
    }

    fn deserialize_progress(&mut self, buffer: &[u8]) -> Result<(), EngineError> {
        let Some(body) = buffer.strip_prefix(PROGRESS_MAGIC.as_slice()) else {
            return Err(EngineError::Deserialize("bad magic".to_string()));
        };
        if body.len() % 8 != 0 {
            return Err(EngineError::Deserialize("truncated".to_string()));
        }

        let mut state = self.state.lock();
        for chunk in body.chunks_exact(8) {
            let id = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            let hits = u32::from_le_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]);
            if let Some(trigger) = state.achievements.get_mut(&id) {
                trigger.hits = hits;
                trigger.fired = false;
            }
        }
        Ok(())
    }

    fn reset(&mut self) {
        let mut state = self.state.lock();
        state.resets += 1;
        for trigger in state.achievements.values_mut() {
            trigger.hits = 0;
            trigger.fired = false;
        }
        for trigger in state.leaderboards.values_mut() {
            trigger.hits = 0;
            trigger.fired = false;
        }
    }

    fn achievement_progress(&self, id: u32) -> (u32, u32) {
        self.state
            .lock()
            .achievements
            .get(&id)
            .map(|t| (t.hits, t.frames))
            .unwrap_or((0, 0))
    }

    fn format_achievement_progress(&self, id: u32) -> String {
        let (current, target) = self.achievement_progress(id);
        format!("{}/{}", current, target)
    }
}

/// Request type of a URL: the `r` parameter, or "media" for image hosts
pub fn request_type(url: &str) -> String {
    let Some((_, query)) = url.split_once('?') else {
        return "media".to_string();
    };
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix("r="))
        .unwrap_or("media")
        .to_string()
}

/// In-process server answering canned responses per request type
#[derive(Default)]
pub struct FakeServer {
    routes: Mutex<HashMap<String, HttpResponse>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl FakeServer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, request_type: &str, document: Value) {
        self.respond_raw(request_type, HttpResponse::ok(document.to_string()));
    }

    pub fn respond_raw(&self, request_type: &str, response: HttpResponse) {
        self.routes.lock().insert(request_type.to_string(), response);
    }

    pub fn requests(&self, request_type: &str) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| request_type_of(r) == request_type)
            .cloned()
            .collect()
    }

    pub fn count(&self, request_type: &str) -> usize {
        self.requests(request_type).len()
    }

    pub fn total_requests(&self) -> usize {
        self.requests.lock().len()
    }
}

fn request_type_of(request: &HttpRequest) -> String {
    request_type(&request.url)
}

impl Transport for FakeServer {
    fn execute(&self, request: &HttpRequest) -> HttpResponse {
        self.requests.lock().push(request.clone());
        self.routes
            .lock()
            .get(&request_type_of(request))
            .cloned()
            .unwrap_or(HttpResponse {
                status: 404,
                body: Vec::new(),
            })
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn all(&self) -> Vec<Notification> {
        self.notifications.lock().clone()
    }

    pub fn unlocked(&self) -> Vec<Notification> {
        self.all()
            .into_iter()
            .filter(|n| matches!(n, Notification::AchievementUnlocked { .. }))
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.all()
            .into_iter()
            .filter_map(|n| match n {
                Notification::Error { message, .. } => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn summaries(&self) -> Vec<(String, String)> {
        self.all()
            .into_iter()
            .filter_map(|n| match n {
                Notification::Summary { title, message, .. } => Some((title, message)),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.notifications.lock().clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.notifications.lock().push(notification);
    }
}

/// Disc contents keyed by disc path
#[derive(Default, Clone)]
pub struct MemoryDisc {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryDisc {
    pub fn with_file(path: &str, data: &[u8]) -> Self {
        Self::default().and_file(path, data)
    }

    pub fn and_file(mut self, path: &str, data: &[u8]) -> Self {
        self.files.insert(path.to_string(), data.to_vec());
        self
    }
}

impl ExecutableReader for MemoryDisc {
    fn size(&self, path: &str) -> Result<u64, ReadError> {
        self.files
            .get(path)
            .map(|data| data.len() as u64)
            .ok_or_else(|| ReadError::NotFound(path.to_string()))
    }

    fn read(&self, path: &str, len: usize) -> Result<Vec<u8>, ReadError> {
        let data = self
            .files
            .get(path)
            .ok_or_else(|| ReadError::NotFound(path.to_string()))?;
        Ok(data[..len.min(data.len())].to_vec())
    }
}

/// Enabled config with a single network worker so results arrive in order
pub fn config() -> AchievementsConfig {
    let mut config = AchievementsConfig {
        enabled: true,
        ..AchievementsConfig::default()
    };
    config.network.base_url = "http://ra.test".to_string();
    config.network.media_url = "http://media.test".to_string();
    config.network.worker_threads = 1;
    config
}

pub fn achievement(id: u32, flags: u32, memaddr: &str, points: u32) -> Value {
    json!({
        "ID": id,
        "Flags": flags,
        "MemAddr": memaddr,
        "Title": format!("Achievement {}", id),
        "Description": format!("Description {}", id),
        "BadgeName": format!("{:05}", id),
        "Points": points,
    })
}

pub fn leaderboard(id: u32, mem: &str, format: &str) -> Value {
    json!({
        "ID": id,
        "Mem": mem,
        "Title": format!("Leaderboard {}", id),
        "Format": format,
        "Description": "Fastest time",
    })
}

/// Register responses for a full fetch of game `GAME_ID`
pub fn serve_game(
    server: &FakeServer,
    achievements: Vec<Value>,
    leaderboards: Vec<Value>,
    rich_presence: Option<&str>,
    unlocked: &[u32],
) {
    server.respond("gameid", json!({ "Success": true, "GameID": GAME_ID }));
    server.respond(
        "patch",
        json!({
            "Success": true,
            "PatchData": {
                "ID": GAME_ID,
                "Title": "Test Game",
                "Developer": "Dev",
                "Publisher": "Pub",
                "Released": "2004",
                "ImageIcon": "/Images/000001.png",
                "Achievements": achievements,
                "Leaderboards": leaderboards,
                "RichPresencePatch": rich_presence,
            }
        }),
    );
    server.respond(
        "unlocks",
        json!({ "Success": true, "GameID": GAME_ID, "UserUnlocks": unlocked }),
    );
    server.respond("postactivity", json!({ "Success": true }));
    server.respond("ping", json!({ "Success": true }));
    server.respond("awardachievement", json!({ "Success": true }));
    server.respond("submitlbentry", json!({ "Success": true }));
}

pub struct Harness {
    pub engine: Engine,
    pub server: Arc<FakeServer>,
    pub runtime: Arc<Mutex<RuntimeState>>,
    pub notifier: Arc<RecordingNotifier>,
    pub settings: Arc<MemorySettings>,
    pub memory: MemoryWindow<Vec<u8>>,
}

pub fn logged_in_settings() -> MemorySettings {
    let settings = MemorySettings::new();
    settings.set_string(SECTION, KEY_USERNAME, USERNAME);
    settings.set_string(SECTION, KEY_TOKEN, TOKEN);
    settings
}

/// Collaborators around a fresh scripted runtime and fake server
pub fn collaborators(
    settings: Arc<MemorySettings>,
    disc: MemoryDisc,
    notifier: Arc<dyn Notifier>,
) -> (Collaborators, Arc<FakeServer>, Arc<Mutex<RuntimeState>>) {
    let server = FakeServer::new();
    let (runtime, runtime_state) = ScriptedRuntime::new();
    let collaborators = Collaborators {
        runtime: Box::new(runtime),
        transport: server.clone(),
        reader: Box::new(disc),
        settings,
        notifier,
    };
    (collaborators, server, runtime_state)
}

impl Harness {
    /// Initialized engine with a saved login
    pub fn new(config: AchievementsConfig) -> Self {
        Self::with_settings(
            config,
            logged_in_settings(),
            MemoryDisc::with_file(ELF_PATH, ELF_BYTES),
        )
    }

    /// Initialized engine without a saved login
    pub fn logged_out(config: AchievementsConfig) -> Self {
        Self::with_settings(
            config,
            MemorySettings::new(),
            MemoryDisc::with_file(ELF_PATH, ELF_BYTES),
        )
    }

    pub fn with_settings(config: AchievementsConfig, settings: MemorySettings, disc: MemoryDisc) -> Self {
        let notifier = Arc::new(RecordingNotifier::default());
        let settings = Arc::new(settings);
        let (collaborators, server, runtime) =
            collaborators(settings.clone(), disc, notifier.clone());

        let mut engine = Engine::new(config, collaborators).unwrap();
        engine.initialize();

        Self {
            engine,
            server,
            runtime,
            notifier,
            settings,
            memory: MemoryWindow::new(vec![0u8; 0x100]),
        }
    }

    /// Report the test executable as running and let the fetch finish
    pub fn boot(&mut self) {
        self.engine.game_changed(ELF_PATH, CHECKSUM);
        self.settle();
    }

    pub fn settle(&mut self) {
        self.engine.wait_for_requests();
    }

    pub fn frame(&mut self) {
        self.engine.do_frame(&self.memory);
    }

    pub fn poke(&mut self, address: u32, value: u8) {
        self.memory.poke(address, 1, value as u32);
    }
}
