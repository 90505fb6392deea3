//! Gateway events other than interactions.

use std::collections::HashMap;
use std::sync::Mutex;

use twilight_cache_inmemory::InMemoryCache;
use twilight_http::request::channel::reaction::RequestReactionType;
use twilight_mention::Mention;
use twilight_model::channel::message::ReactionType;
use twilight_model::channel::Message;
use twilight_model::gateway::payload::incoming::MemberUpdate;
use twilight_model::gateway::GatewayReaction;
use twilight_model::id::marker::{GuildMarker, UserMarker};
use twilight_model::id::Id;
use twilight_util::builder::embed::EmbedBuilder;

use crate::utils::prelude::*;
use crate::{parser, utils, Context};

pub async fn message_create(ctx: &Context, msg: &Message) -> AnyResult<()> {
    // Ignore bot users.
    if msg.author.bot {
        return Ok(());
    }

    if parser::has_banned(&msg.content, &ctx.config.banned_emojis) {
        return remove_banned_message(ctx, msg).await;
    }

    if let Some(greeting) = parser::greeting(&msg.content) {
        let embed = EmbedBuilder::new()
            .color(ctx.config.colors.primary)
            .description(greeting.english)
            .timestamp(utils::now()?)
            .build();

        ctx.http
            .create_message(msg.channel_id)
            .reply(msg.id)
            .content(&format!("{} says {}", msg.author.id.mention(), greeting.arabic))?
            .embeds(&[embed])?
            .await
            .context("Failed to answer greeting")?;
    }

    Ok(())
}

/// Delete a message with a banned emoji and tell its author why.
async fn remove_banned_message(ctx: &Context, msg: &Message) -> AnyResult<()> {
    ctx.http
        .delete_message(msg.channel_id, msg.id)
        .await
        .context("Failed to delete message with banned emoji")?;

    let place = msg
        .guild_id
        .and_then(|id| ctx.cache.guild(id).map(|g| g.name().to_owned()))
        .unwrap_or_else(|| "this server".to_string());

    notify(
        ctx,
        msg.author.id,
        &format!("Your message in {place} contained a banned emoji and was removed."),
    )
    .await;

    Ok(())
}

pub async fn reaction_add(ctx: &Context, reaction: &GatewayReaction) -> AnyResult<()> {
    let bot = match &reaction.member {
        Some(member) => member.user.bot,
        None => ctx.cache.user(reaction.user_id).map_or(false, |u| u.bot),
    };
    if bot || !banned_reaction(&reaction.emoji, &ctx.config.banned_emojis) {
        return Ok(());
    }

    ctx.http
        .delete_reaction(
            reaction.channel_id,
            reaction.message_id,
            &request_emoji(&reaction.emoji),
            reaction.user_id,
        )
        .await
        .context("Failed to remove banned reaction")?;

    notify(
        ctx,
        reaction.user_id,
        "That emoji is banned and your reaction was removed. Please avoid using it in the future.",
    )
    .await;

    Ok(())
}

/// Returns `true` if the emoji of a reaction is one of the `banned` ones.
fn banned_reaction(emoji: &ReactionType, banned: &[String]) -> bool {
    let name = match emoji {
        ReactionType::Unicode { name } => Some(name.as_str()),
        ReactionType::Custom { name, .. } => name.as_deref(),
    };
    name.map_or(false, |name| banned.iter().any(|b| b == name))
}

fn request_emoji(emoji: &ReactionType) -> RequestReactionType<'_> {
    match emoji {
        ReactionType::Custom { id, name, .. } => RequestReactionType::Custom {
            id: *id,
            name: name.as_deref(),
        },
        ReactionType::Unicode { name } => RequestReactionType::Unicode { name },
    }
}

/// Boost state of members seen in updates.
///
/// The cache keeps `premium_since` from when a member was first cached and
/// does not follow updates, so the last observed state is tracked here.
#[derive(Debug, Default)]
pub struct Boosters(Mutex<HashMap<(Id<GuildMarker>, Id<UserMarker>), bool>>);

impl Boosters {
    /// Record the boost state of an update.
    /// Returns `true` if the member started boosting with it.
    pub fn observe(&self, cache: &InMemoryCache, update: &MemberUpdate) -> bool {
        let key = (update.guild_id, update.user.id);
        let boosting = update.premium_since.is_some();

        let mut boosters = utils::lock(&self.0);
        let before = boosters.get(&key).copied().unwrap_or_else(|| {
            cache
                .member(key.0, key.1)
                .map_or(false, |m| m.premium_since().is_some())
        });
        boosters.insert(key, boosting);

        boosting && !before
    }
}

pub async fn member_update(ctx: &Context, update: &MemberUpdate) -> AnyResult<()> {
    if ctx.boosters.observe(&ctx.cache, update) {
        thank_booster(ctx, update).await?;
    }
    Ok(())
}

/// Thank a new booster in the system channel of the server.
async fn thank_booster(ctx: &Context, update: &MemberUpdate) -> AnyResult<()> {
    let Some(channel_id) = ctx
        .cache
        .guild(update.guild_id)
        .and_then(|g| g.system_channel_id())
    else {
        debug!("No system channel to thank '{}' in", update.user.name);
        return Ok(());
    };

    let embed = utils::embed(ctx.config.colors.primary, "Server Boost!")?
        .description(format!("Thanks {} for boosting the server!", update.user.id.mention()))
        .build();

    ctx.http
        .create_message(channel_id)
        .embeds(&[embed])?
        .await
        .context("Failed to thank booster")?;

    Ok(())
}

/// Send a direct message, users may have them closed.
async fn notify(ctx: &Context, user_id: Id<UserMarker>, text: &str) {
    let send = async {
        let channel = ctx
            .http
            .create_private_channel(user_id)
            .await?
            .model()
            .await?;
        ctx.http.create_message(channel.id).content(text)?.await?;
        Ok::<(), anyhow::Error>(())
    };

    if let Err(e) = send.await {
        debug!("Could not notify '{user_id}': {e:#}");
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use twilight_model::gateway::payload::incoming::MemberAdd;

    use super::*;

    fn user() -> serde_json::Value {
        json!({ "id": "2", "username": "zayd", "discriminator": "0", "avatar": null })
    }

    fn update(premium_since: Option<&str>) -> MemberUpdate {
        serde_json::from_value(json!({
            "guild_id": "1",
            "joined_at": "2024-01-01T00:00:00.000000+00:00",
            "roles": [],
            "user": user(),
            "avatar": null,
            "nick": null,
            "communication_disabled_until": null,
            "premium_since": premium_since,
        }))
        .unwrap()
    }

    const SINCE: &str = "2024-02-01T00:00:00.000000+00:00";

    #[test]
    fn thanks_once_per_boost() {
        let cache = InMemoryCache::new();
        let boosters = Boosters::default();

        assert!(!boosters.observe(&cache, &update(None)));
        assert!(boosters.observe(&cache, &update(Some(SINCE))));
        // A later nick change while boosting.
        assert!(!boosters.observe(&cache, &update(Some(SINCE))));

        assert!(!boosters.observe(&cache, &update(None)));
        assert!(boosters.observe(&cache, &update(Some(SINCE))));
    }

    #[test]
    fn cached_booster_is_not_new() {
        let cache = InMemoryCache::new();
        let added: MemberAdd = serde_json::from_value(json!({
            "guild_id": "1",
            "deaf": false,
            "mute": false,
            "flags": 0,
            "joined_at": "2024-01-01T00:00:00.000000+00:00",
            "premium_since": SINCE,
            "roles": [],
            "user": user(),
        }))
        .unwrap();
        cache.update(&added);

        let boosters = Boosters::default();
        assert!(!boosters.observe(&cache, &update(Some(SINCE))));
    }

    #[test]
    fn banned_reactions() {
        let banned = vec!["🤡".to_string(), "clown".to_string()];

        let unicode = |name: &str| ReactionType::Unicode {
            name: name.to_string(),
        };
        assert!(banned_reaction(&unicode("🤡"), &banned));
        assert!(!banned_reaction(&unicode("👍"), &banned));

        let custom = |name: Option<&str>| ReactionType::Custom {
            animated: false,
            id: Id::new(1),
            name: name.map(String::from),
        };
        assert!(banned_reaction(&custom(Some("clown")), &banned));
        assert!(!banned_reaction(&custom(None), &banned));
    }

    #[test]
    fn request_emoji_keeps_identity() {
        let emoji = ReactionType::Custom {
            animated: true,
            id: Id::new(7),
            name: Some("wave".to_string()),
        };
        assert!(matches!(
            request_emoji(&emoji),
            RequestReactionType::Custom { id, name: Some("wave") } if id == Id::new(7)
        ));
    }
}
