//! Oxidized-Cheevos command line
//!
//! Computes the identity hash of a game executable and manages the stored
//! login used by the achievement engine.

mod transport;

use anyhow::{bail, Context, Result};
use cheevos_core::{AchievementsConfig, TomlSettings};
use cheevos_disc::{compute_game_hash, FolderReader};
use cheevos_net::protocol::{parse_response, LoginResponse};
use cheevos_net::{ApiUrls, Session, SessionClient};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use transport::UreqTransport;

#[derive(Parser)]
#[command(name = "oxidized-cheevos", version, about = "Achievement tracking tools")]
struct Cli {
    /// Configuration file to use instead of the default one
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the identity hash of a game executable
    Hash {
        /// Folder holding the extracted disc contents
        #[arg(long)]
        root: PathBuf,

        /// Executable path as reported by the emulator, e.g. cdrom0:\SLUS_200.62;1
        elf_path: String,
    },

    /// Log in and store the session token
    Login {
        #[arg(long)]
        username: String,

        #[arg(long)]
        password: String,
    },

    /// Forget the stored session
    Logout,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AchievementsConfig::load_from(path),
        None => AchievementsConfig::load(),
    }
    .context("Failed to load configuration")?;

    cheevos_core::logging::init(config.log_level);

    match cli.command {
        Command::Hash { root, elf_path } => hash(&root, &elf_path),
        Command::Login { username, password } => login(&config, &username, &password),
        Command::Logout => logout(),
    }
}

fn settings_path() -> PathBuf {
    AchievementsConfig::config_dir().join("settings.toml")
}

fn hash(root: &Path, elf_path: &str) -> Result<()> {
    let reader = FolderReader::new(root);
    let hash = compute_game_hash(elf_path, &reader)
        .with_context(|| format!("Failed to hash {} under {:?}", elf_path, root))?;
    println!("{}", hash);
    Ok(())
}

fn login(config: &AchievementsConfig, username: &str, password: &str) -> Result<()> {
    let settings = TomlSettings::open(settings_path()).context("Failed to open settings")?;
    let urls = ApiUrls::new(
        config.network.base_url.clone(),
        config.network.media_url.clone(),
    );

    let transport = Arc::new(UreqTransport::new(&config.network.user_agent));
    let mut client: SessionClient<()> =
        SessionClient::new(transport, 1).context("Failed to start HTTP worker")?;
    *client.session_mut() = Session::from_settings(&settings);
    client.session_mut().begin_login(username, password)?;

    tracing::info!("Logging in as {}", username);
    client.enqueue(urls.login(username, password), ());
    client.wait_for_activity();
    let Some(completion) = client.poll().into_iter().next() else {
        bail!("Login request did not complete");
    };

    let login = match parse_response::<LoginResponse>("Login", &completion.response) {
        Ok(login) if !login.user.is_empty() && !login.token.is_empty() => login,
        Ok(_) => {
            client.session_mut().fail_login();
            bail!("Login failed: server returned no token");
        }
        Err(e) => {
            client.session_mut().fail_login();
            return Err(e).context("Login failed");
        }
    };

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default();
    client
        .session_mut()
        .complete_login(&settings, login.user, login.token, timestamp)
        .context("Failed to save login")?;

    println!("Logged in as {}", client.session().username());
    Ok(())
}

fn logout() -> Result<()> {
    let settings = TomlSettings::open(settings_path()).context("Failed to open settings")?;
    let mut session = Session::from_settings(&settings);
    if !session.is_logged_in() {
        println!("Not logged in");
        return Ok(());
    }

    let username = session.username().to_string();
    session
        .clear_persisted(&settings)
        .context("Failed to save settings")?;
    println!("Logged out {}", username);
    Ok(())
}
