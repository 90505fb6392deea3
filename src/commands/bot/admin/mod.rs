use twilight_model::id::marker::{GuildMarker, UserMarker};
use twilight_model::id::Id;

use crate::commands::deploy::Scope;
use crate::commands::prelude::*;
use crate::config::Settings;
use crate::utils;
use crate::utils::prelude::*;

pub mod command;
pub mod module;
pub mod roles;

/// Longest embed description discord accepts.
const DESCRIPTION_LIMIT: usize = 4096;

/// Allow-list check shared by the admin commands.
pub struct AdminGuard;

impl AdminGuard {
    /// Reject the request unless its author is a configured admin.
    pub fn check(ctx: &Context, req: &SlashRequest) -> Result<(), CommandError> {
        Self::check_user(&ctx.config, req.author_id())
    }

    fn check_user(settings: &Settings, user: Option<Id<UserMarker>>) -> Result<(), CommandError> {
        match user {
            Some(id) if settings.is_admin(id) => Ok(()),
            _ => {
                warn!("Refused admin command from '{user:?}'");
                Err(CommandError::AccessDenied)
            },
        }
    }
}

/// Remote command set for a deploy request.
/// Non-global deploys go to the configured guild, or the guild of the interaction.
pub fn scope(
    settings: &Settings,
    globally: bool,
    guild_id: Option<Id<GuildMarker>>,
) -> Result<Scope, CommandError> {
    if globally {
        return Ok(Scope::Global);
    }

    settings
        .guild_id
        .or(guild_id)
        .map(Scope::Guild)
        .ok_or_else(|| {
            CommandError::UnexpectedArgs(
                "No guild to deploy to, use `globally` or configure a guild".to_string(),
            )
        })
}

/// Deploy scope of a request with the `globally` option.
fn request_scope(ctx: &Context, req: &SlashRequest) -> Result<Scope, CommandError> {
    let globally = req.args.bool("globally").unwrap_or(false);
    scope(&ctx.config, globally, req.interaction.guild_id)
}

/// Admin reply embed.
fn reply(ctx: &Context, title: &str, description: impl Into<String>) -> CommandResult {
    let embed = utils::embed(ctx.config.colors.primary, title)?
        .description(clip(description.into()))
        .build();

    Ok(Response::Embed(embed))
}

/// Cut text to fit into an embed description.
fn clip(mut text: String) -> String {
    if text.chars().count() > DESCRIPTION_LIMIT {
        let end = text
            .char_indices()
            .nth(DESCRIPTION_LIMIT - 1)
            .map_or(text.len(), |(i, _)| i);
        text.truncate(end);
        text.push('…');
    }
    text
}
