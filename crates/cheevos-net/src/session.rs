//! Login session state

use cheevos_core::settings::{
    SettingsStore, KEY_LOGIN_TIMESTAMP, KEY_TOKEN, KEY_USERNAME, SECTION,
};
use cheevos_core::ConfigError;

/// Username and token of the logged-in user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    username: String,
    token: String,
    login_pending: bool,
}

impl Session {
    /// Restore a session from persisted settings
    pub fn from_settings(settings: &dyn SettingsStore) -> Self {
        Self {
            username: settings.get_string(SECTION, KEY_USERNAME).unwrap_or_default(),
            token: settings.get_string(SECTION, KEY_TOKEN).unwrap_or_default(),
            login_pending: false,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn is_logged_in(&self) -> bool {
        !self.username.is_empty() && !self.token.is_empty()
    }

    pub fn is_login_pending(&self) -> bool {
        self.login_pending
    }

    /// Mark a login request as in flight. Rejects a second concurrent attempt.
    pub fn begin_login(&mut self, username: &str, password: &str) -> Result<(), ConfigError> {
        if username.is_empty() || password.is_empty() {
            return Err(ConfigError::MissingCredentials);
        }
        if self.is_logged_in() {
            return Err(ConfigError::AlreadyLoggedIn);
        }
        if self.login_pending {
            return Err(ConfigError::LoginPending);
        }

        self.login_pending = true;
        Ok(())
    }

    /// The login request finished without producing a token
    pub fn fail_login(&mut self) {
        self.login_pending = false;
    }

    /// Apply a successful login and persist it
    pub fn complete_login(
        &mut self,
        settings: &dyn SettingsStore,
        username: String,
        token: String,
        timestamp: i64,
    ) -> Result<(), ConfigError> {
        settings.set_string(SECTION, KEY_USERNAME, &username);
        settings.set_string(SECTION, KEY_TOKEN, &token);
        settings.set_int(SECTION, KEY_LOGIN_TIMESTAMP, timestamp);
        let committed = settings.commit();

        self.username = username;
        self.token = token;
        self.login_pending = false;
        committed
    }

    /// Forget the in-memory session
    pub fn clear(&mut self) {
        self.username.clear();
        self.token.clear();
        self.login_pending = false;
    }

    /// Forget the session and remove it from persisted settings
    pub fn clear_persisted(&mut self, settings: &dyn SettingsStore) -> Result<(), ConfigError> {
        self.clear();
        settings.delete(SECTION, KEY_USERNAME);
        settings.delete(SECTION, KEY_TOKEN);
        settings.delete(SECTION, KEY_LOGIN_TIMESTAMP);
        settings.commit()
    }
}
