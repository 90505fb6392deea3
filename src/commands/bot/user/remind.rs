use std::time::Duration;

use twilight_mention::Mention;
use twilight_model::channel::message::MessageFlags;
use twilight_model::id::marker::{ChannelMarker, UserMarker};
use twilight_model::id::Id;

use crate::commands::prelude::*;
use crate::parser;
use crate::utils::prelude::*;

/// Where and to whom a delayed message goes.
struct Followup {
    token: String,
    channel_id: Option<Id<ChannelMarker>>,
    user_id: Id<UserMarker>,
}

impl Followup {
    fn from_request(req: &SlashRequest) -> Result<Self, CommandError> {
        Ok(Self {
            token: req.interaction.token.to_owned(),
            channel_id: req.interaction.channel.as_ref().map(|c| c.id),
            user_id: req.author_id().ok_or(CommandError::MissingArgs)?,
        })
    }

    /// Send `text` after `delay` in the background.
    /// Interaction tokens expire, so long delays fall back to a channel message.
    fn schedule(self, ctx: Context, delay: Duration, text: String, ephemeral: bool) {
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            if let Err(e) = self.send(&ctx, &text, ephemeral).await {
                debug!("Failed to send delayed message: {e:#}");
            }
        });
    }

    async fn send(&self, ctx: &Context, text: &str, ephemeral: bool) -> AnyResult<()> {
        let client = ctx.interaction();
        let followup = client.create_followup(&self.token).content(text)?;
        let followup = if ephemeral {
            followup.flags(MessageFlags::EPHEMERAL)
        } else {
            followup
        };

        match followup.await {
            Ok(_) => Ok(()),
            Err(e) => {
                let channel_id = self
                    .fallback_channel(ephemeral)
                    .with_context(|| format!("Followup failed without fallback: {e}"))?;
                trace!("Followup failed ({e}), posting to channel instead");
                ctx.http.create_message(channel_id).content(text)?.await?;
                Ok(())
            },
        }
    }

    /// Channel for a message the followup could not deliver.
    /// Private messages are never made public.
    fn fallback_channel(&self, ephemeral: bool) -> Option<Id<ChannelMarker>> {
        if ephemeral {
            None
        } else {
            self.channel_id
        }
    }
}

/// Command: Ping the user after a delay like `10m`, `2h` or `1d`.
pub struct Remind;

impl Remind {
    pub async fn slash(ctx: Context, req: SlashRequest) -> CommandResult {
        let (Some(time), Some(message)) = (req.args.string("time"), req.args.string("message"))
        else {
            return Err(CommandError::MissingArgs);
        };

        let delay = match parser::reminder_delay(time) {
            Ok(delay) => delay,
            Err(e) => return Ok(Response::CreateMessage(e.to_string())),
        };

        let followup = Followup::from_request(&req)?;
        let mention = followup.user_id.mention();
        let confirm = format!("⏰ Okay {mention}, I'll remind you in {time}: \"{message}\"");
        let text = format!("🔔 {mention} Reminder: {message}");

        followup.schedule(ctx, delay, text, false);

        Ok(Response::CreateMessage(confirm))
    }
}

/// Command: Countdown from hours, minutes and seconds.
pub struct Timer;

impl Timer {
    pub async fn slash(ctx: Context, req: SlashRequest) -> CommandResult {
        let hours = req.args.integer("hours").unwrap_or(0);
        let minutes = req.args.integer("minutes").unwrap_or(0);
        let seconds = req.args.integer("seconds").unwrap_or(0);

        let (delay, length) = match parser::timer_duration(hours, minutes, seconds) {
            Ok(timer) => timer,
            Err(e) => return Ok(Response::CreateMessage(e.to_string())),
        };

        let followup = Followup::from_request(&req)?;
        let mention = followup.user_id.mention();
        let text = match req.args.string("message") {
            Some(custom) => format!("⏰ Time's up! {mention} {custom}"),
            None => format!("⏰ Time's up! {mention} Your timer ({length}) is over."),
        };

        followup.schedule(ctx, delay, text, true);

        Ok(Response::CreateMessage(format!(
            "⏰ Timer set for {length}! I will remind you when time is up."
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_followups_stay_private() {
        let followup = Followup {
            token: "token".to_string(),
            channel_id: Some(Id::new(5)),
            user_id: Id::new(1),
        };

        assert_eq!(followup.fallback_channel(false), Some(Id::new(5)));
        assert_eq!(followup.fallback_channel(true), None);
    }
}
