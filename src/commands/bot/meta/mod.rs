use serde::Deserialize;
use twilight_model::guild::Permissions;
use twilight_model::id::marker::{ApplicationMarker, InteractionMarker};
use twilight_model::id::Id;
use twilight_util::builder::embed::EmbedFieldBuilder;

use crate::commands::prelude::*;
use crate::utils;

/// Discord epoch in unix milliseconds.
const DISCORD_EPOCH: u64 = 1_420_070_400_000;

/// Longest embed field value.
const FIELD_LIMIT: usize = 1024;

/// Command: Ping Pong!
pub struct Ping;

impl Ping {
    pub async fn slash(ctx: Context, req: SlashRequest) -> CommandResult {
        let now = chrono::Utc::now().timestamp_millis();
        let latency = latency_ms(req.interaction.id, now);

        let embed = utils::embed(ctx.config.colors.primary, "Bot latency")?
            .description(format!("🏓 Pong! Latency is {latency}ms"))
            .build();

        Ok(Response::Embed(embed))
    }
}

/// Milliseconds between the creation of an interaction and `now_ms`.
fn latency_ms(id: Id<InteractionMarker>, now_ms: i64) -> u64 {
    let created = (id.get() >> 22) + DISCORD_EPOCH;
    u64::try_from(now_ms).map_or(0, |now| now.saturating_sub(created))
}

/// Command: Runtime info about the bot.
pub struct DebugInfo;

impl DebugInfo {
    pub async fn slash(ctx: Context, _req: SlashRequest) -> CommandResult {
        let modules = ctx.registry.modules();
        let commands = ctx.registry.commands();
        let stats = ctx.cache.stats();

        let fields = [
            ("Uptime", format_uptime(ctx.started.elapsed().as_secs())),
            ("Version", env!("CARGO_PKG_VERSION").to_string()),
            ("Guild Count", stats.guilds().to_string()),
            ("User Count", stats.users().to_string()),
            (
                "Modules Loaded",
                format!("{} / {}", modules.count(), modules.enabled_count()),
            ),
            (
                "Commands Loaded",
                format!("{} / {}", commands.count(), commands.enabled_count()),
            ),
            ("Live Commands", ctx.commands.len().to_string()),
            ("Cached Definitions", ctx.source.cache().len().to_string()),
        ];

        // Disabled modules are struck through.
        let module_list = modules
            .list()
            .into_iter()
            .map(|m| if m.enabled { m.name } else { format!("~~{}~~", m.name) })
            .collect::<Vec<_>>()
            .join(", ");

        let embed = fields
            .into_iter()
            .fold(
                utils::embed(ctx.config.colors.primary, "Bot Debug Information")?,
                |embed, (name, value)| {
                    embed.field(EmbedFieldBuilder::new(name, format!("`{value}`")).inline())
                },
            )
            .field(EmbedFieldBuilder::new("Modules", clip_field(module_list)))
            .build();

        Ok(Response::Embed(embed))
    }
}

/// Format seconds like `1d 2h 3m 4s`.
fn format_uptime(secs: u64) -> String {
    let (days, rest) = (secs / 86_400, secs % 86_400);
    let (hours, rest) = (rest / 3600, rest % 3600);
    let (minutes, seconds) = (rest / 60, rest % 60);

    if days > 0 {
        format!("{days}d {hours}h {minutes}m {seconds}s")
    } else if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// Command: Links for adding the bot to a server.
pub struct Invite;

impl Invite {
    pub async fn slash(ctx: Context, _req: SlashRequest) -> CommandResult {
        let (bot, app) = invite_links(ctx.application_id);

        let embed = utils::embed(ctx.config.colors.primary, "Bot Invite Link")?
            .field(EmbedFieldBuilder::new(
                "Bot Invite Link",
                format!("[Invite the bot]({bot})"),
            ))
            .field(EmbedFieldBuilder::new(
                "App Invite Link",
                format!("[Invite the app]({app})"),
            ))
            .build();

        Ok(Response::Embed(embed))
    }
}

/// OAuth2 links to add the bot to a server, and to add the app only.
fn invite_links(application_id: Id<ApplicationMarker>) -> (String, String) {
    let permissions = Permissions::VIEW_CHANNEL
        | Permissions::SEND_MESSAGES
        | Permissions::SEND_MESSAGES_IN_THREADS
        | Permissions::READ_MESSAGE_HISTORY;

    let app = format!("https://discord.com/oauth2/authorize?client_id={application_id}");
    let bot = format!(
        "{app}&permissions={}&scope=bot%20applications.commands",
        permissions.bits()
    );

    (bot, app)
}

#[derive(Debug, Deserialize)]
struct CommitItem {
    sha: String,
    commit: CommitInfo,
}

#[derive(Debug, Deserialize)]
struct CommitInfo {
    message: String,
}

/// Command: Latest commits of the bot repository.
pub struct Changelog;

impl Changelog {
    pub async fn slash(ctx: Context, _req: SlashRequest) -> CommandResult {
        let url = format!(
            "https://api.github.com/repos/{}/commits?per_page=5",
            ctx.config.changelog_repo
        );

        let commits = ctx
            .web
            .get(&url)
            .header(reqwest::header::USER_AGENT, env!("CARGO_PKG_NAME"))
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<CommitItem>>()
            .await?;

        if commits.is_empty() {
            return Ok(Response::CreateMessage(format!(
                "No commits found in `{}`.",
                ctx.config.changelog_repo
            )));
        }

        let embed = commits
            .iter()
            .fold(
                utils::embed(
                    ctx.config.colors.primary,
                    "Bot Changelog (5 Latest Commits)",
                )?,
                |embed, item| {
                    let (name, value) = commit_field(item);
                    embed.field(EmbedFieldBuilder::new(name, value))
                },
            )
            .build();

        Ok(Response::Embed(embed))
    }
}

fn commit_field(item: &CommitItem) -> (String, String) {
    let sha = item.sha.get(..7).unwrap_or(&item.sha);
    (format!("Commit {sha}"), clip_field(item.commit.message.to_owned()))
}

/// Cut text to fit an embed field, which must not be empty either.
fn clip_field(text: String) -> String {
    if text.is_empty() {
        return "-".to_string();
    }
    text.chars().take(FIELD_LIMIT).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latency_from_snowflake() {
        // Created 1000ms after the discord epoch.
        let id = Id::new(1000 << 22);
        let created = (DISCORD_EPOCH + 1000) as i64;

        assert_eq!(latency_ms(id, created + 42), 42);
        assert_eq!(latency_ms(id, created - 5), 0);
    }

    #[test]
    fn uptime_text() {
        assert_eq!(format_uptime(5), "5s");
        assert_eq!(format_uptime(65), "1m 5s");
        assert_eq!(format_uptime(3600), "1h 0m 0s");
        assert_eq!(format_uptime(90_061), "1d 1h 1m 1s");
    }

    #[test]
    fn invite_urls() {
        let (bot, app) = invite_links(Id::new(123));
        assert_eq!(app, "https://discord.com/oauth2/authorize?client_id=123");
        assert!(bot.starts_with(&app));
        assert!(bot.ends_with("&permissions=274877975552&scope=bot%20applications.commands"));
    }

    #[test]
    fn commit_fields() {
        let items: Vec<CommitItem> = serde_json::from_str(
            r#"[{ "sha": "0123456789abcdef", "commit": { "message": "Fix reload" }, "author": null }]"#,
        )
        .unwrap();

        assert_eq!(
            commit_field(&items[0]),
            ("Commit 0123456".to_string(), "Fix reload".to_string())
        );
    }
}
