use std::collections::HashSet;
use std::env;
use std::ops::Deref;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use twilight_model::id::marker::{GuildMarker, UserMarker};
use twilight_model::id::Id;

use crate::config::storage::JsonFile;
use crate::utils::prelude::*;

pub mod storage;

pub const CONFIG_PATH: &str = "./data/bot.json";

/// Embed colors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Colors {
    pub primary: u32,
}

impl Default for Colors {
    fn default() -> Self {
        Self { primary: 0x0099FF }
    }
}

/// Static bot settings, loaded once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Users allowed to run the admin commands.
    pub admins: HashSet<Id<UserMarker>>,

    pub colors: Colors,

    /// Messages containing any of these are removed.
    pub banned_emojis: Vec<String>,

    /// Deploy target when not deploying globally.
    pub guild_id: Option<Id<GuildMarker>>,

    /// Root of the command definition tree.
    pub commands_dir: PathBuf,

    /// Persistent registry document.
    pub registry_path: PathBuf,

    /// Run an unfiltered deploy once the gateway is ready.
    pub deploy_on_ready: bool,

    /// GitHub repository shown by the changelog command, as `owner/repo`.
    pub changelog_repo: String,

    /// Base url of the Quran text api.
    pub quran_api: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            admins: HashSet::new(),
            colors: Colors::default(),
            banned_emojis: Vec::new(),
            guild_id: None,
            commands_dir: PathBuf::from("./commands"),
            registry_path: PathBuf::from("./data/registry.json"),
            deploy_on_ready: false,
            changelog_repo: String::from("Salafi-Coders/salafibot"),
            quran_api: String::from("https://api.alquran.cloud/v1"),
        }
    }
}

impl Settings {
    /// Apply environment variable overrides.
    fn with_env(mut self) -> AnyResult<Self> {
        if let Ok(id) = env::var("GUILD_ID") {
            let id = id
                .trim()
                .parse()
                .with_context(|| format!("Invalid GUILD_ID '{id}'"))?;
            self.guild_id = Some(id);
        }
        Ok(self)
    }

    /// Returns `true` if the user is on the admin allow-list.
    pub fn is_admin(&self, user_id: Id<UserMarker>) -> bool {
        self.admins.contains(&user_id)
    }
}

/// Shared read-only handle to the settings.
#[derive(Debug, Clone)]
pub struct BotConfig(Arc<Settings>);

impl BotConfig {
    /// Load the settings file, creating a default one if missing.
    pub fn load() -> AnyResult<Self> {
        let settings = JsonFile::read_or_create::<Settings>(CONFIG_PATH)
            .context("Failed to load bot settings")?
            .with_env()?;

        if settings.admins.is_empty() {
            warn!("No admins configured, admin commands will reject everyone");
        }

        Ok(Self::new(settings))
    }

    pub fn new(settings: Settings) -> Self {
        Self(Arc::new(settings))
    }
}

impl Deref for BotConfig {
    type Target = Settings;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
