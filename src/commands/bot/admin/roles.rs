use twilight_mention::Mention;
use twilight_model::id::marker::{GuildMarker, RoleMarker};
use twilight_model::id::Id;
use twilight_util::builder::embed::EmbedFieldBuilder;

use crate::commands::prelude::*;
use crate::utils;

/// Longest embed field value.
const FIELD_LIMIT: usize = 1024;

/// Command: List the roles of the server, highest first.
pub struct Roles;

impl Roles {
    pub async fn slash(ctx: Context, req: SlashRequest) -> CommandResult {
        let Some(guild_id) = req.interaction.guild_id else {
            return Err(CommandError::UnexpectedArgs(
                "Roles can only be listed in a server".to_string(),
            ));
        };

        // Try cache, otherwise fetch.
        let roles = match ctx.cache.guild_roles(guild_id) {
            Some(ids) => ids
                .iter()
                .filter_map(|id| ctx.cache.role(*id))
                .map(|r| (r.id, r.position))
                .collect::<Vec<_>>(),
            None => ctx
                .http
                .roles(guild_id)
                .await?
                .models()
                .await?
                .into_iter()
                .map(|r| (r.id, r.position))
                .collect(),
        };

        let count = roles.len();
        let embed = utils::embed(ctx.config.colors.primary, "Server Roles Information")?
            .field(EmbedFieldBuilder::new("Role Count", format!("`{count}`")))
            .field(EmbedFieldBuilder::new("Roles", role_list(guild_id, roles)))
            .build();

        Ok(Response::Embed(embed))
    }
}

/// Role mentions by descending position, one per line.
fn role_list(guild_id: Id<GuildMarker>, mut roles: Vec<(Id<RoleMarker>, i64)>) -> String {
    roles.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let list = roles
        .into_iter()
        .map(|(id, _)| {
            // The everyone role shares its id with the guild.
            if id.cast() == guild_id {
                "@everyone".to_string()
            } else {
                id.mention().to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    if list.is_empty() {
        "No Roles".to_string()
    } else if list.chars().count() >= FIELD_LIMIT {
        "[ERROR] Too many roles to display.".to_string()
    } else {
        list
    }
}
