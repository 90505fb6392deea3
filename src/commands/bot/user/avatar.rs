use twilight_model::id::marker::UserMarker;
use twilight_model::id::Id;
use twilight_model::util::ImageHash;
use twilight_util::builder::embed::ImageSource;

use crate::commands::prelude::*;
use crate::utils;

const CDN: &str = "https://cdn.discordapp.com";

/// Command: Show the avatar of an user.
pub struct Avatar;

impl Avatar {
    pub async fn slash(ctx: Context, req: SlashRequest) -> CommandResult {
        let user = match req.args.user("user") {
            Some(id) => req.resolved_user(id),
            None => req.author(),
        };
        let Some(user) = user else {
            return Err(CommandError::MissingArgs);
        };

        let size = req.args.integer("size").unwrap_or(512);
        let url = avatar_url(user.id, user.avatar, size);

        let embed = utils::embed(
            ctx.config.colors.primary,
            format!("Avatar of {}", user.name),
        )?
        .image(ImageSource::url(url)?)
        .build();

        Ok(Response::Embed(embed))
    }
}

/// CDN url of an avatar, or of the default avatar when the user has none.
fn avatar_url(user_id: Id<UserMarker>, avatar: Option<ImageHash>, size: i64) -> String {
    match avatar {
        Some(hash) => {
            let ext = if hash.is_animated() { "gif" } else { "png" };
            format!("{CDN}/avatars/{user_id}/{hash}.{ext}?size={size}")
        },
        None => format!("{CDN}/embed/avatars/{}.png", (user_id.get() >> 22) % 6),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls() {
        let id = Id::new(80351110224678912);
        let still = ImageHash::parse(b"8342729096ea3675442027381ff50dfe").unwrap();
        let animated = ImageHash::parse(b"a_8342729096ea3675442027381ff50dfe").unwrap();

        assert_eq!(
            avatar_url(id, Some(still), 512),
            "https://cdn.discordapp.com/avatars/80351110224678912/8342729096ea3675442027381ff50dfe.png?size=512"
        );
        assert!(avatar_url(id, Some(animated), 64).ends_with("/a_8342729096ea3675442027381ff50dfe.gif?size=64"));
        assert_eq!(
            avatar_url(id, None, 512),
            format!("https://cdn.discordapp.com/embed/avatars/{}.png", (80351110224678912u64 >> 22) % 6)
        );
    }
}
