use std::sync::Arc;

use twilight_model::application::interaction::application_command::CommandData;
use twilight_model::application::interaction::Interaction;
use twilight_model::id::marker::UserMarker;
use twilight_model::id::Id;
use twilight_model::user::User;

use crate::commands::arg::Args;
use crate::commands::LoadedCommand;

/// Slash command request with preprocessed arguments and interaction data.
#[derive(Debug, Clone)]
pub struct SlashRequest {
    pub command: Arc<LoadedCommand>,
    pub interaction: Arc<Interaction>,
    pub data: Arc<CommandData>,

    /// Names of the invoked subcommand group and subcommand, outermost first.
    pub path: Vec<String>,
    pub args: Args,
}

impl SlashRequest {
    pub fn new(
        command: Arc<LoadedCommand>,
        interaction: Arc<Interaction>,
        data: Arc<CommandData>,
        path: Vec<String>,
        args: Args,
    ) -> Self {
        Self {
            command,
            interaction,
            data,
            path,
            args,
        }
    }

    /// Innermost invoked subcommand, if any.
    pub fn subcommand(&self) -> Option<&str> {
        self.path.last().map(String::as_str)
    }

    /// The user who sent the interaction, in guilds or DMs.
    pub fn author(&self) -> Option<&User> {
        self.interaction.author()
    }

    pub fn author_id(&self) -> Option<Id<UserMarker>> {
        self.author().map(|u| u.id)
    }

    /// User object resolved for an user argument.
    pub fn resolved_user(&self, id: Id<UserMarker>) -> Option<&User> {
        self.data.resolved.as_ref().and_then(|r| r.users.get(&id))
    }
}
