use crate::commands::bot::admin::{reply, request_scope, AdminGuard};
use crate::commands::deploy::{DeployError, DeployTarget};
use crate::commands::prelude::*;
use crate::commands::reload::{self, ReloadError};
use crate::commands::source::ScanFilter;
use crate::registry::{Outcome, RegistryError};
use crate::utils::prelude::*;

/// Command: Enable, disable, deploy or reload a single command.
pub struct CommandAdmin;

impl CommandAdmin {
    pub async fn slash(ctx: Context, req: SlashRequest) -> CommandResult {
        AdminGuard::check(&ctx, &req)?;

        let Some(name) = req.args.string("command").map(str::to_owned) else {
            return Err(CommandError::MissingArgs);
        };

        match req.subcommand() {
            Some("enable") => Self::toggle(&ctx, &name, true),
            Some("disable") => Self::toggle(&ctx, &name, false),
            Some("deploy") => Self::deploy(&ctx, &req, &name).await,
            Some("undeploy") => Self::undeploy(&ctx, &req, &name).await,
            Some("reload") => Self::reload(&ctx, &name),
            other => Err(CommandError::UnexpectedArgs(format!(
                "Unknown subcommand '{}'",
                other.unwrap_or_default()
            ))),
        }
    }

    fn toggle(ctx: &Context, name: &str, enable: bool) -> CommandResult {
        let (title, verb) = if enable {
            (format!("Enable Command: {name}"), "enabled")
        } else {
            (format!("Disable Command: {name}"), "disabled")
        };

        let commands = ctx.registry.commands();
        let result = if enable {
            commands.enable(name)
        } else {
            commands.disable(name)
        };

        match result {
            Ok(Outcome::Applied) => reply(ctx, &title, format!("The command **{name}** has been {verb}.")),
            Ok(Outcome::AlreadyInState) => {
                reply(ctx, &title, format!("The command **{name}** is already {verb}."))
            },
            Err(RegistryError::NotFound { .. }) => {
                reply(ctx, &title, format!("The command **{name}** does not exist."))
            },
            Err(e @ RegistryError::Io(_)) => {
                error!("Failed to {} command '{name}': {e}", if enable { "enable" } else { "disable" });
                reply(ctx, &title, format!("The change could not be saved: {e}"))
            },
            Err(e) => Err(e.into()),
        }
    }

    async fn deploy(ctx: &Context, req: &SlashRequest, name: &str) -> CommandResult {
        let title = format!("Deploy Command: {name}");
        let scope = request_scope(ctx, req)?;

        match ctx
            .deployer
            .deploy(&ctx.source, DeployTarget::Command(name), scope)
            .await
        {
            Ok(summary) => reply(ctx, &title, summary.to_string()),
            Err(DeployError::CommandNotFound(_)) => {
                reply(ctx, &title, format!("The command **{name}** does not exist."))
            },
            Err(e) => reply(ctx, &title, format!("Failed to deploy **{name}**: {e}")),
        }
    }

    async fn undeploy(ctx: &Context, req: &SlashRequest, name: &str) -> CommandResult {
        let title = format!("Undeploy Command: {name}");
        let scope = request_scope(ctx, req)?;

        match ctx.deployer.undeploy(name, scope).await {
            Ok(summary) => reply(ctx, &title, summary.to_string()),
            Err(DeployError::CommandNotFound(_)) => reply(
                ctx,
                &title,
                format!("The command **{name}** is not deployed {scope}."),
            ),
            Err(e) => reply(ctx, &title, format!("Failed to undeploy **{name}**: {e}")),
        }
    }

    fn reload(ctx: &Context, name: &str) -> CommandResult {
        let title = format!("Reload Command: {name}");

        match reload::reload(&ctx.source, &ctx.commands, ScanFilter::Command(name)) {
            Ok(summary) => {
                summary.register(&ctx.registry)?;
                reply(ctx, &title, summary.to_string())
            },
            Err(ReloadError::CommandNotFound(_)) => {
                reply(ctx, &title, format!("The command **{name}** does not exist."))
            },
            Err(e) => reply(ctx, &title, format!("Failed to reload **{name}**: {e}")),
        }
    }
}
