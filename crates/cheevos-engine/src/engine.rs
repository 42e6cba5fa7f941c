//! The native achievement engine
//!
//! One `Engine` owns the registry, game context and session for the running
//! game. It is driven from the emulation thread: `game_changed` on boot,
//! `do_frame` once per frame, `save_state`/`load_state` around snapshots.
//! Network results are only ever applied from `poll`, on that same thread.

use crate::fetcher::FetchState;
use crate::notify::{Notification, Notifier};
use crate::registry::{Achievement, GameContext, Leaderboard, LeaderboardEntry, Registry};
use cheevos_core::{AchievementsConfig, AchievementsError, ProtocolError, SettingsStore};
use cheevos_disc::{ExecutableReader, IdentityResolver};
use cheevos_net::protocol::{parse_response, LoginResponse};
use cheevos_net::{ApiUrls, Completion, HttpRequest, Session, SessionClient, Transport};
use cheevos_runtime::TriggerRuntime;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// External collaborators the engine is built from
pub struct Collaborators {
    pub runtime: Box<dyn TriggerRuntime>,
    pub transport: Arc<dyn Transport>,
    pub reader: Box<dyn ExecutableReader + Send>,
    pub settings: Arc<dyn SettingsStore>,
    pub notifier: Arc<dyn Notifier>,
}

/// What a queued request was for
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RequestKind {
    Login,
    GameId,
    Patch,
    Unlocks,
    Playing,
    Ping,
    AwardAchievement { id: u32 },
    SubmitLeaderboard { id: u32 },
    LeaderboardEntries { id: u32 },
    Image { path: PathBuf },
}

impl RequestKind {
    /// Results that only make sense for the game and user they were sent for
    fn is_game_scoped(&self) -> bool {
        matches!(
            self,
            Self::GameId | Self::Patch | Self::Unlocks | Self::LeaderboardEntries { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RequestTag {
    pub(crate) generation: u64,
    pub(crate) kind: RequestKind,
}

/// Executable the emulator is currently running
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RunningGame {
    pub(crate) elf_path: String,
    pub(crate) checksum: u32,
}

pub struct Engine {
    pub(crate) config: AchievementsConfig,
    pub(crate) urls: ApiUrls,
    pub(crate) client: SessionClient<RequestTag>,
    pub(crate) runtime: Box<dyn TriggerRuntime>,
    pub(crate) reader: Box<dyn ExecutableReader + Send>,
    pub(crate) settings: Arc<dyn SettingsStore>,
    pub(crate) notifier: Arc<dyn Notifier>,

    pub(crate) active: bool,
    pub(crate) generation: u64,
    pub(crate) identity: IdentityResolver,
    pub(crate) running: Option<RunningGame>,
    pub(crate) fetch_state: FetchState,
    pub(crate) registry: Registry,
    pub(crate) game: GameContext,

    /// `None` forces a ping on the next frame
    pub(crate) last_ping: Option<Instant>,
    pub(crate) last_queried_leaderboard: Option<u32>,
    pub(crate) leaderboard_entries: Option<Vec<LeaderboardEntry>>,
    pub(crate) last_login_error: Option<ProtocolError>,
}

impl Engine {
    /// Build an inactive engine. Call [`Engine::initialize`] to start it.
    pub fn new(config: AchievementsConfig, collaborators: Collaborators) -> Result<Self, AchievementsError> {
        let client = SessionClient::new(collaborators.transport, config.network.worker_threads)?;
        let urls = ApiUrls::new(config.network.base_url.clone(), config.network.media_url.clone());

        Ok(Self {
            config,
            urls,
            client,
            runtime: collaborators.runtime,
            reader: collaborators.reader,
            settings: collaborators.settings,
            notifier: collaborators.notifier,
            active: false,
            generation: 0,
            identity: IdentityResolver::new(),
            running: None,
            fetch_state: FetchState::Idle,
            registry: Registry::new(),
            game: GameContext::default(),
            last_ping: None,
            last_queried_leaderboard: None,
            leaderboard_entries: None,
            last_login_error: None,
        })
    }

    /// Start tracking: restore the saved session and pick up the running game
    pub fn initialize(&mut self) {
        if self.active {
            return;
        }
        if !self.config.enabled {
            tracing::warn!("Achievements are disabled, not initializing");
            return;
        }

        self.active = true;
        self.last_ping = Some(Instant::now());
        *self.client.session_mut() = Session::from_settings(self.settings.as_ref());

        if self.is_logged_in() {
            tracing::info!("Achievements active, logged in as {}", self.username());
            self.identify_running_game();
        } else {
            tracing::info!("Achievements active, not logged in");
        }
    }

    /// Stop tracking. Waits for outstanding requests, then drops all game and
    /// session state.
    pub fn shutdown(&mut self) {
        if !self.active {
            return;
        }

        self.wait_for_requests();

        self.generation += 1;
        self.clear_game_info(true, true);
        self.identity.clear();
        self.game.hash.clear();
        self.fetch_state = FetchState::Idle;
        self.client.session_mut().clear();
        self.runtime.reset();
        self.active = false;

        self.notify(Notification::Refreshed);
        tracing::info!("Achievements shut down");
    }

    /// Emulator reset; trigger progress starts over
    pub fn reset(&mut self) {
        if !self.active {
            return;
        }
        tracing::debug!("Resetting runtime state");
        self.runtime.reset();
    }

    pub fn on_paused(&mut self, paused: bool) {
        tracing::debug!("Emulation {}", if paused { "paused" } else { "resumed" });
    }

    /// Apply new settings, restarting when a mode that shapes the loaded
    /// game changed
    pub fn update_config(&mut self, config: AchievementsConfig) {
        let old = std::mem::replace(&mut self.config, config);
        self.urls = ApiUrls::new(
            self.config.network.base_url.clone(),
            self.config.network.media_url.clone(),
        );

        if !self.config.enabled {
            self.shutdown();
            return;
        }

        if !self.active {
            self.initialize();
            return;
        }

        if self.config.requires_restart(&old) {
            tracing::info!("Achievement settings changed, restarting");
            self.shutdown();
            self.initialize();
        }
    }

    pub fn config(&self) -> &AchievementsConfig {
        &self.config
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Log in and wait for the result.
    ///
    /// On success the token is persisted and, if a game is running, its
    /// achievements are fetched.
    pub fn login(&mut self, username: &str, password: &str) -> Result<(), AchievementsError> {
        self.login_async(username, password)?;
        self.wait_for_requests();

        if self.is_logged_in() {
            return Ok(());
        }
        let error = self
            .last_login_error
            .take()
            .unwrap_or(ProtocolError::EmptyResponse { request: "Login" });
        Err(error.into())
    }

    /// Start a login; the result is applied on a later `poll`
    pub fn login_async(&mut self, username: &str, password: &str) -> Result<(), AchievementsError> {
        self.wait_for_requests();
        self.client.session_mut().begin_login(username, password)?;
        self.last_login_error = None;

        tracing::info!("Logging in as {}", username);
        let request = self.urls.login(username, password);
        self.send(request, RequestKind::Login);
        Ok(())
    }

    /// Forget the user, including the persisted token
    pub fn logout(&mut self) -> Result<(), AchievementsError> {
        if self.active {
            self.wait_for_requests();
            if self.is_logged_in() {
                self.generation += 1;
                self.clear_game_info(true, true);
                self.identity.clear();
                self.fetch_state = FetchState::Idle;
                tracing::info!("Logged out {}", self.username());
                self.client.session_mut().clear();
                self.notify(Notification::Refreshed);
            }
        }

        self.client
            .session_mut()
            .clear_persisted(self.settings.as_ref())
            .map_err(AchievementsError::from)
    }

    /// The emulator booted a new executable
    pub fn game_changed(&mut self, elf_path: &str, checksum: u32) {
        self.running = Some(RunningGame {
            elf_path: elf_path.to_string(),
            checksum,
        });

        if !self.active {
            return;
        }
        if !self.is_logged_in() {
            tracing::debug!("Not logged in, ignoring game change to {:?}", elf_path);
            return;
        }

        self.identify_running_game();
    }

    pub(crate) fn send(&self, request: HttpRequest, kind: RequestKind) {
        self.client.enqueue(
            request,
            RequestTag {
                generation: self.generation,
                kind,
            },
        );
    }

    /// Apply every network result that has arrived. Never blocks.
    pub fn poll(&mut self) {
        for completion in self.client.poll() {
            self.dispatch(completion);
        }
    }

    /// Block until no requests remain, applying results as they arrive.
    ///
    /// Requests queued by those results are waited for too.
    pub fn wait_for_requests(&mut self) {
        loop {
            self.poll();
            if !self.client.wait_for_activity() {
                break;
            }
        }
    }

    /// Whether any request is queued, running or waiting to be polled
    pub fn has_pending_requests(&self) -> bool {
        self.client.is_busy()
    }

    fn dispatch(&mut self, completion: Completion<RequestTag>) {
        let Completion { tag, response, .. } = completion;

        if tag.kind.is_game_scoped() && tag.generation != self.generation {
            tracing::debug!("Dropping stale {:?} result", tag.kind);
            return;
        }

        match tag.kind {
            RequestKind::Login => self.handle_login(&response),
            RequestKind::GameId => self.handle_game_id(&response),
            RequestKind::Patch => self.handle_patch(&response),
            RequestKind::Unlocks => self.handle_unlocks(&response),
            RequestKind::Playing => self.handle_playing(&response),
            RequestKind::Ping => self.handle_ping(&response),
            RequestKind::AwardAchievement { id } => self.handle_award(id, &response),
            RequestKind::SubmitLeaderboard { id } => self.handle_submit(id, &response),
            RequestKind::LeaderboardEntries { id } => self.handle_leaderboard_entries(id, &response),
            RequestKind::Image { path } => self.handle_image(&path, &response),
        }
    }

    fn handle_login(&mut self, response: &cheevos_net::HttpResponse) {
        if !self.client.session().is_login_pending() {
            tracing::debug!("Ignoring login result, no login pending");
            return;
        }

        let login = parse_response::<LoginResponse>("Login", response).and_then(|login| {
            if login.user.is_empty() {
                return Err(ProtocolError::MissingField {
                    request: "Login",
                    field: "User",
                });
            }
            if login.token.is_empty() {
                return Err(ProtocolError::MissingField {
                    request: "Login",
                    field: "Token",
                });
            }
            Ok(login)
        });

        let login = match login {
            Ok(login) => login,
            Err(e) => {
                tracing::error!("{}", e);
                self.client.session_mut().fail_login();
                self.report_error("Login failed. Please check your user name and password, and try again.");
                self.last_login_error = Some(e);
                return;
            }
        };

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default();
        if let Err(e) = self.client.session_mut().complete_login(
            self.settings.as_ref(),
            login.user,
            login.token,
            timestamp,
        ) {
            tracing::warn!("Failed to save login: {}", e);
        }

        tracing::info!("Logged in as {}", self.username());
        self.notify(Notification::Refreshed);

        if self.active {
            self.identity.clear();
            self.identify_running_game();
        }
    }

    pub(crate) fn notify(&self, notification: Notification) {
        self.notifier.notify(notification);
    }

    /// Log and surface a failure to the user
    pub(crate) fn report_error(&self, message: &str) {
        self.notify(Notification::Error {
            message: format!("Achievements error: {}", message),
            duration: Duration::from_secs_f32(self.config.error_notification_secs.max(0.0)),
        });
    }

    pub fn username(&self) -> &str {
        self.client.session().username()
    }

    pub fn is_logged_in(&self) -> bool {
        self.client.session().is_logged_in()
    }

    pub fn is_login_pending(&self) -> bool {
        self.client.session().is_login_pending()
    }

    pub fn challenge_mode(&self) -> bool {
        self.config.challenge_mode
    }

    pub fn fetch_state(&self) -> FetchState {
        self.fetch_state
    }

    pub fn game_context(&self) -> &GameContext {
        &self.game
    }

    pub fn game_id(&self) -> u32 {
        self.game.id
    }

    pub fn has_active_game(&self) -> bool {
        self.game.id != 0
    }

    pub fn rich_presence(&self) -> &str {
        &self.game.rich_presence
    }

    pub fn achievements(&self) -> &[Achievement] {
        self.registry.achievements()
    }

    pub fn leaderboards(&self) -> &[Leaderboard] {
        self.registry.leaderboards()
    }

    pub fn achievement(&self, id: u32) -> Option<&Achievement> {
        self.registry.achievement(id)
    }

    pub fn leaderboard(&self, id: u32) -> Option<&Leaderboard> {
        self.registry.leaderboard(id)
    }

    pub fn achievement_count(&self) -> u32 {
        self.registry.achievement_count()
    }

    pub fn unlocked_count(&self) -> u32 {
        self.registry.unlocked_count()
    }

    pub fn current_points(&self) -> u32 {
        self.registry.current_points()
    }

    pub fn maximum_points(&self) -> u32 {
        self.registry.maximum_points()
    }

    pub fn leaderboard_count(&self) -> u32 {
        self.registry.leaderboard_count()
    }

    /// Whether the leaderboard's values are durations. Unknown ids are not.
    pub fn is_time_leaderboard(&self, id: u32) -> bool {
        self.registry.leaderboard(id).is_some_and(Leaderboard::is_time)
    }

    /// Measured progress of an achievement as (current, target)
    pub fn achievement_progress(&self, id: u32) -> (u32, u32) {
        self.runtime.achievement_progress(id)
    }

    pub fn achievement_progress_text(&self, id: u32) -> String {
        self.runtime.format_achievement_progress(id)
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if self.active {
            self.shutdown();
        }
    }
}

