use crate::commands::bot::admin::{reply, request_scope, AdminGuard};
use crate::commands::deploy::{DeployError, DeployTarget};
use crate::commands::prelude::*;
use crate::commands::reload::{self, ReloadError};
use crate::commands::source::ScanFilter;
use crate::registry::{ModuleToggle, Outcome, RegistryError};
use crate::utils::prelude::*;

/// Command: Enable, disable, deploy or reload every command of a module.
pub struct ModuleAdmin;

impl ModuleAdmin {
    pub async fn slash(ctx: Context, req: SlashRequest) -> CommandResult {
        AdminGuard::check(&ctx, &req)?;

        let Some(name) = req.args.string("module").map(str::to_owned) else {
            return Err(CommandError::MissingArgs);
        };

        match req.subcommand() {
            Some("enable") => Self::toggle(&ctx, &name, true),
            Some("disable") => Self::toggle(&ctx, &name, false),
            Some("deploy") => Self::deploy(&ctx, &req, &name).await,
            Some("reload") => Self::reload(&ctx, &name),
            other => Err(CommandError::UnexpectedArgs(format!(
                "Unknown subcommand '{}'",
                other.unwrap_or_default()
            ))),
        }
    }

    fn toggle(ctx: &Context, name: &str, enable: bool) -> CommandResult {
        let (title, verb) = if enable {
            (format!("Enable Module: {name}"), "enabled")
        } else {
            (format!("Disable Module: {name}"), "disabled")
        };

        let modules = ctx.registry.modules();
        let result = if enable {
            modules.enable(name)
        } else {
            modules.disable(name)
        };

        match result {
            Ok(ModuleToggle {
                outcome: Outcome::Applied,
                cascaded,
            }) => {
                let mut text = format!("The module **{name}** has been {verb}.");
                if !cascaded.is_empty() {
                    text.push_str(&format!("\nAlso {verb}: `{}`", cascaded.join("`, `")));
                }
                reply(ctx, &title, text)
            },
            Ok(ModuleToggle {
                outcome: Outcome::AlreadyInState,
                ..
            }) => reply(ctx, &title, format!("The module **{name}** is already {verb}.")),
            Err(RegistryError::NotFound { .. }) => {
                reply(ctx, &title, format!("The module **{name}** does not exist."))
            },
            Err(e @ RegistryError::Io(_)) => {
                error!("Failed to toggle module '{name}': {e}");
                reply(ctx, &title, format!("The change could not be saved: {e}"))
            },
            Err(e) => Err(e.into()),
        }
    }

    async fn deploy(ctx: &Context, req: &SlashRequest, name: &str) -> CommandResult {
        let title = format!("Deploy Module: {name}");
        let scope = request_scope(ctx, req)?;

        match ctx
            .deployer
            .deploy(&ctx.source, DeployTarget::Module(name), scope)
            .await
        {
            Ok(summary) => reply(ctx, &title, summary.to_string()),
            Err(DeployError::ModuleNotFound(_)) => {
                reply(ctx, &title, format!("The module **{name}** does not exist."))
            },
            Err(e) => reply(ctx, &title, format!("Failed to deploy **{name}**: {e}")),
        }
    }

    fn reload(ctx: &Context, name: &str) -> CommandResult {
        let title = format!("Reload Module: {name}");

        match reload::reload(&ctx.source, &ctx.commands, ScanFilter::Module(name)) {
            Ok(summary) => {
                summary.register(&ctx.registry)?;
                reply(ctx, &title, summary.to_string())
            },
            Err(ReloadError::ModuleNotFound(_)) => {
                reply(ctx, &title, format!("The module **{name}** does not exist."))
            },
            Err(e) => reply(ctx, &title, format!("Failed to reload **{name}**: {e}")),
        }
    }
}
