use std::sync::{Arc, Mutex};
use std::time::Instant;
use std::{env, fs};

use tracing_subscriber::EnvFilter;
use twilight_cache_inmemory::InMemoryCache;
use twilight_gateway::{CloseFrame, Event, Intents, Shard, ShardId};
use twilight_http::client::InteractionClient;
use twilight_http::Client;
use twilight_model::gateway::payload::incoming::Ready;
use twilight_model::id::marker::ApplicationMarker;
use twilight_model::id::Id;

use crate::commands::deploy::{DeployTarget, Deployer, HttpCommandApi, Scope};
use crate::commands::source::{CommandSource, Load, ScanFilter};
use crate::commands::{bot, handle, reload, CommandError, Commands};
use crate::config::BotConfig;
use crate::events::Boosters;
use crate::registry::Registry;
use crate::utils::prelude::*;

mod commands;
mod config;
mod events;
mod parser;
mod registry;
mod utils;

/// Shared handles, cloned into every event task.
#[derive(Debug, Clone)]
pub struct Context {
    config: BotConfig,
    http: Arc<Client>,
    cache: Arc<InMemoryCache>,
    application_id: Id<ApplicationMarker>,
    registry: Registry,
    commands: Arc<Commands>,
    source: Arc<CommandSource>,
    deployer: Arc<Deployer>,
    web: reqwest::Client,
    boosters: Arc<Boosters>,
    started: Instant,
}

impl Context {
    /// Interaction client of the bot application.
    pub fn interaction(&self) -> InteractionClient<'_> {
        self.http.interaction(self.application_id)
    }

    /// Scope used for deploys that are not global.
    fn default_scope(&self) -> Scope {
        self.config.guild_id.map_or(Scope::Global, Scope::Guild)
    }
}

#[tokio::main]
async fn main() -> AnyResult<()> {
    // Load environment variables from `./.env` file, if any exists.
    simple_env_load::load_env_from(&[".env"]);

    // Create data folder if it doesn't exist yet.
    fs::create_dir_all("./data/").context("Failed to create data folder")?;

    // Create a log file or truncate an existing one.
    let logfile = fs::File::create("./data/log.log").context("Failed to create log file")?;

    // Initialize the logger to use `RUST_LOG` environment variable.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_ansi(false)
        .with_writer(Mutex::new(logfile))
        .compact()
        .init();

    // Load bot settings file.
    let config = BotConfig::load()?;

    // Get discord bot token from environment variable.
    let token = env::var("DISCORD_TOKEN").expect("Expected a token in the environment");

    let http = Arc::new(Client::new(token.to_owned()));
    let application_id = http
        .current_user_application()
        .await?
        .model()
        .await
        .context("Failed to get application info")?
        .id;

    let registry = Registry::open(&config.registry_path)?;

    // Scan the command tree, register what it holds and make it live.
    let source = Arc::new(CommandSource::new(
        config.commands_dir.to_owned(),
        bot::handlers(),
    ));
    let scan = source.scan(ScanFilter::All, Load::Cached)?;
    let commands = Arc::new(Commands::new());
    let summary = reload::install(&commands, scan);
    summary.register(&registry)?;
    for failed in &summary.failed {
        warn!("Skipped command file {failed}");
    }
    info!("Loaded commands: {commands}");

    let api = HttpCommandApi::new(Arc::clone(&http), application_id);
    let deployer = Arc::new(Deployer::new(Arc::new(api)));

    let ctx = Context {
        config,
        http,
        cache: Arc::new(InMemoryCache::new()),
        application_id,
        registry,
        commands,
        source,
        deployer,
        web: reqwest::Client::new(),
        boosters: Arc::new(Boosters::default()),
        started: Instant::now(),
    };

    let mut shard = Shard::new(ShardId::ONE, token, intents());

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    // Process each event as they come in.
    loop {
        let event = tokio::select! {
            event = shard.next_event() => Some(event),
            _ = &mut shutdown => None,
        };

        let event = match event {
            Some(Ok(event)) => event,
            Some(Err(source)) => {
                warn!("Error receiving event: {source}");
                if source.is_fatal() {
                    break;
                }
                continue;
            },
            None => {
                info!("Shutting down by ctrl-c");
                shard.close(CloseFrame::NORMAL).await?;
                break;
            },
        };

        // Update the cache with the event.
        ctx.cache.update(&event);

        let ctx = ctx.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_event(ctx, event).await {
                warn!("Failed to handle event: {e:#}");
            }
        });
    }

    Ok(())
}

/// Main events handler.
async fn handle_event(ctx: Context, event: Event) -> AnyResult<()> {
    match event {
        Event::Ready(r) => handle_ready(&ctx, *r).await,
        Event::InteractionCreate(i) => {
            match handle::application_command(&ctx, i.0).await {
                Ok(()) => (),
                Err(e @ CommandError::Other(_)) => error!("Command failed: {e:#}"),
                Err(e) => debug!("Command refused: {e}"),
            }
            Ok(())
        },
        Event::MessageCreate(msg) => events::message_create(&ctx, &msg.0).await,
        Event::ReactionAdd(reaction) => events::reaction_add(&ctx, &reaction.0).await,
        Event::MemberUpdate(update) => events::member_update(&ctx, &update).await,

        // Other events here...
        event => {
            trace!("Event: {:?}", event.kind());
            Ok(())
        },
    }
}

async fn handle_ready(ctx: &Context, ready: Ready) -> AnyResult<()> {
    info!("Ready: '{}'", ready.user.name);

    if ctx.config.deploy_on_ready {
        let scope = ctx.default_scope();
        match ctx
            .deployer
            .deploy(&ctx.source, DeployTarget::All, scope)
            .await
        {
            Ok(summary) => info!("{summary}"),
            Err(e) => error!("Deploy on ready failed: {e}"),
        }
    }

    Ok(())
}

fn intents() -> Intents {
    #[cfg(feature = "all-intents")]
    return Intents::all();
    #[cfg(not(feature = "all-intents"))]
    return Intents::GUILDS
        | Intents::GUILD_MEMBERS
        | Intents::GUILD_MESSAGES
        | Intents::GUILD_MESSAGE_REACTIONS
        | Intents::MESSAGE_CONTENT
        | Intents::DIRECT_MESSAGES;
}
