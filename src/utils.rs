use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use twilight_model::util::Timestamp;
use twilight_util::builder::embed::{EmbedBuilder, EmbedFooterBuilder};

use crate::utils::prelude::*;

/// Common imports.
pub mod prelude {
    pub use anyhow::Context as _;
    pub use anyhow::Result as AnyResult;
    pub use async_trait::async_trait;
    pub use tracing::{debug, error, info, trace, warn};
}

/// Universal constants.
pub mod consts {
    /// Footer text of every bot embed.
    pub const FOOTER: &str = "Salafi Bot";

    /// Name of the folder holding local command overrides.
    pub const LOCAL_DIR: &str = "local";

    /// File extension of command definition files.
    pub const DEFINITION_EXT: &str = "json";
}

/// Current time as a discord timestamp.
pub fn now() -> AnyResult<Timestamp> {
    Timestamp::from_secs(chrono::Utc::now().timestamp()).context("Invalid current timestamp")
}

/// Embed with the bot footer, color and current timestamp.
pub fn embed(color: u32, title: impl Into<String>) -> AnyResult<EmbedBuilder> {
    Ok(EmbedBuilder::new()
        .title(title)
        .color(color)
        .footer(EmbedFooterBuilder::new(consts::FOOTER))
        .timestamp(now()?))
}

/// Lock a mutex, recovering the data if another thread panicked while holding it.
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| {
        warn!("Recovering poisoned mutex");
        e.into_inner()
    })
}

/// Read lock, recovering from poison.
pub fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

/// Write lock, recovering from poison.
pub fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}
