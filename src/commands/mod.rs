//! Slash command runtime.
//!
//! ```text
//!   commands/<module>/*.json ──┐
//!   commands/local/<module>/*.json ──┴─► Scan ──┬─► Registry bootstrap (flags)
//!                                               ├─► Dispatch table (live handlers)
//!                                               └─► Deploy (remote command set)
//!
//!   Interaction ─► Dispatch table ─► Registry gate ─► Handler ─► Response
//! ```

use std::collections::BTreeMap;
use std::mem;
use std::sync::{Arc, RwLock};

use thiserror::Error;
use twilight_model::channel::message::Embed;

pub use crate::commands::source::LoadedCommand;
use crate::registry::RegistryError;
use crate::utils;

pub mod arg;
pub mod bot;
pub mod definition;
pub mod deploy;
pub mod function;
pub mod handle;
pub mod reload;
pub mod request;
pub mod source;

/// Prelude module for command things.
pub mod prelude {
    pub use crate::commands::request::SlashRequest;
    pub use crate::commands::{CommandError, CommandResult, Response};
    pub use crate::Context;
}

#[derive(Debug, Error)]
pub enum CommandError {
    /// A command does not exist.
    #[error("Command not found: {0}")]
    NotFound(String),

    /// The command or its module is switched off.
    #[error("Command disabled")]
    Disabled,

    /// The sender must provide some arguments.
    #[error("Expected arguments missing")]
    MissingArgs,

    /// Some arguments are wrong, invalid or unexpected.
    #[error("Arguments unexpected or failed to process: {0}")]
    UnexpectedArgs(String),

    /// The sender does not have permissions needed.
    #[error("You are not authorized to use this command.")]
    AccessDenied,

    /// Other errors that are or can be converted to `anyhow::Error`.
    #[error(transparent)]
    Other(#[from] anyhow::Error), // Source and Display delegate to `anyhow::Error`
}

impl PartialEq for CommandError {
    fn eq(&self, other: &Self) -> bool {
        mem::discriminant(self) == mem::discriminant(other) // Close enough.
    }
}

macro_rules! impl_into_command_error {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<$t> for CommandError {
                fn from(other: $t) -> Self {
                    Self::Other(other.into())
                }
            }
        )*
    };
}

impl_into_command_error!(
    twilight_http::Error,
    twilight_http::response::DeserializeBodyError,
    twilight_validate::request::ValidationError,
    twilight_validate::message::MessageValidationError,
    twilight_validate::embed::EmbedValidationError,
    twilight_util::builder::embed::image_source::ImageSourceUrlError,
    reqwest::Error,
    serde_json::Error,
    RegistryError,
);

/// What to reply with once a handler is done.
#[derive(Debug, Clone)]
pub enum Response {
    /// Remove the deferred reply.
    Clear,
    CreateMessage(String),
    Embed(Embed),
}

pub type CommandResult = Result<Response, CommandError>;

/// Live dispatch table, command name to loaded command.
#[derive(Debug, Default)]
pub struct Commands(RwLock<BTreeMap<String, Arc<LoadedCommand>>>);

impl Commands {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a live command by name.
    pub fn get(&self, name: &str) -> Option<Arc<LoadedCommand>> {
        utils::read(&self.0).get(name).cloned()
    }

    /// Install a command, returning the entry it replaced.
    pub fn insert(&self, command: LoadedCommand) -> Option<Arc<LoadedCommand>> {
        utils::write(&self.0).insert(command.name.to_owned(), Arc::new(command))
    }

    /// Number of live commands.
    pub fn len(&self) -> usize {
        utils::read(&self.0).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of live commands.
    pub fn names(&self) -> Vec<String> {
        utils::read(&self.0).keys().cloned().collect()
    }
}

impl std::fmt::Display for Commands {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.names().join(", "))
    }
}
