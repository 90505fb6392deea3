use chrono::NaiveDateTime;
use twilight_util::builder::embed::EmbedFieldBuilder;

use crate::commands::prelude::*;
use crate::utils;

/// Command: Current date and time in UTC.
pub struct Date;

impl Date {
    pub async fn slash(ctx: Context, req: SlashRequest) -> CommandResult {
        let h24 = req.args.bool("24_hour_time").unwrap_or(false);
        let (date, time) = date_and_time(chrono::Utc::now().naive_utc(), h24);

        let embed = utils::embed(ctx.config.colors.primary, "Current Date and Time")?
            .field(EmbedFieldBuilder::new("Gregorian Date", date))
            .field(EmbedFieldBuilder::new("Time", format!("{time} UTC")))
            .build();

        Ok(Response::Embed(embed))
    }
}

fn date_and_time(now: NaiveDateTime, h24: bool) -> (String, String) {
    let time = if h24 { "%H:%M:%S" } else { "%-I:%M:%S %p" };
    (
        now.format("%B %-d, %Y").to_string(),
        now.format(time).to_string(),
    )
}
