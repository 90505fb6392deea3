use std::sync::Arc;

use twilight_model::application::interaction::application_command::{
    CommandDataOption, CommandOptionValue,
};
use twilight_model::application::interaction::{Interaction, InteractionData};
use twilight_model::channel::message::MessageFlags;
use twilight_model::http::interaction::{InteractionResponse, InteractionResponseType};
use twilight_util::builder::InteractionResponseDataBuilder;

use crate::commands::arg::{Arg, ArgValue, Args};
use crate::commands::prelude::*;
use crate::utils::prelude::*;

/// Reply for commands that are switched off.
pub const DISABLED_REPLY: &str = "This command is disabled.";

/// Handle interaction and execute the command function.
pub async fn application_command(ctx: &Context, mut inter: Interaction) -> Result<(), CommandError> {
    let Some(InteractionData::ApplicationCommand(data)) = inter.data.take() else {
        return Err(CommandError::UnexpectedArgs(
            "Interaction has no command data".to_string(),
        ));
    };

    // Lookup command from the live table.
    let Some(command) = ctx.commands.get(&data.name) else {
        reply(ctx, &inter, "This command is not available.", true).await?;
        return Err(CommandError::NotFound(format!(
            "Command '{}' does not exist",
            data.name
        )));
    };

    // Both the command and its module must be enabled.
    if !ctx.registry.is_runnable(&command.name) {
        debug!("Refused disabled command '{}'", command.name);
        reply(ctx, &inter, DISABLED_REPLY, true).await?;
        return Ok(());
    }

    let ephemeral = command.definition.ephemeral;

    // Acknowledge the interaction.
    let resp = InteractionResponse {
        kind: InteractionResponseType::DeferredChannelMessageWithSource,
        data: Some(response_data(ephemeral).build()),
    };
    ctx.interaction()
        .create_response(inter.id, &inter.token, &resp)
        .await?;

    let inter = Arc::new(inter);
    let interaction = ctx.interaction();

    let result = match parse_options(data.options.to_vec()) {
        Ok((path, args)) => {
            let req = SlashRequest::new(
                Arc::clone(&command),
                Arc::clone(&inter),
                Arc::new(*data),
                path,
                args,
            );

            debug!(
                "Executing '{}' {:?} by user '{:?}'",
                command.name,
                req.path,
                req.author_id()
            );

            command.function.call(ctx.to_owned(), req).await
        },
        Err(e) => Err(e),
    };

    // Handle execution result.
    match result {
        Ok(Response::Clear) => {
            interaction
                .delete_response(&inter.token)
                .await
                .context("Failed to clear interaction")?;
        },
        Ok(Response::CreateMessage(text)) => {
            interaction
                .update_response(&inter.token)
                .content(Some(text.as_str()))?
                .await
                .context("Failed to send response message")?;
        },
        Ok(Response::Embed(embed)) => {
            interaction
                .update_response(&inter.token)
                .embeds(Some(&[embed]))?
                .await
                .context("Failed to send response embed")?;
        },
        Err(e) => {
            let text = user_message(&e);
            if let Err(update) = interaction
                .update_response(&inter.token)
                .content(Some(text.as_str()))?
                .await
            {
                warn!("Failed to report command error: {update}");
            }
            return Err(e);
        },
    }

    Ok(())
}

/// Immediate reply without deferring.
async fn reply(ctx: &Context, inter: &Interaction, text: &str, ephemeral: bool) -> AnyResult<()> {
    let resp = InteractionResponse {
        kind: InteractionResponseType::ChannelMessageWithSource,
        data: Some(response_data(ephemeral).content(text).build()),
    };
    ctx.interaction()
        .create_response(inter.id, &inter.token, &resp)
        .await
        .context("Failed to reply to interaction")?;
    Ok(())
}

fn response_data(ephemeral: bool) -> InteractionResponseDataBuilder {
    let data = InteractionResponseDataBuilder::new();
    if ephemeral {
        data.flags(MessageFlags::EPHEMERAL)
    } else {
        data
    }
}

/// Text shown to the user when a command fails.
fn user_message(error: &CommandError) -> String {
    match error {
        CommandError::Other(_) => "Something went wrong while running this command.".to_string(),
        CommandError::Disabled => DISABLED_REPLY.to_string(),
        e => e.to_string(),
    }
}

/// Split command options into the invoked subcommand path and the arguments.
fn parse_options(options: Vec<CommandDataOption>) -> Result<(Vec<String>, Args), CommandError> {
    let mut path = Vec::new();
    let mut args = Vec::new();
    let mut pending = options;

    // A subcommand or group carries the options of the next level.
    while !pending.is_empty() {
        let mut next = Vec::new();
        for opt in pending {
            match opt.value {
                CommandOptionValue::SubCommand(inner)
                | CommandOptionValue::SubCommandGroup(inner) => {
                    path.push(opt.name);
                    next = inner;
                },
                value => {
                    let value = ArgValue::try_from(value).map_err(|e| {
                        CommandError::UnexpectedArgs(format!("Argument '{}': {e}", opt.name))
                    })?;
                    args.push(Arg {
                        name: opt.name,
                        value,
                    });
                },
            }
        }
        pending = next;
    }

    Ok((path, Args::from(args)))
}

#[cfg(test)]
mod tests {
    use twilight_model::id::Id;

    use super::*;

    fn opt(name: &str, value: CommandOptionValue) -> CommandDataOption {
        CommandDataOption {
            name: name.to_string(),
            value,
        }
    }

    #[test]
    fn flat_arguments() {
        let (path, args) = parse_options(vec![
            opt("user", CommandOptionValue::User(Id::new(5))),
            opt("size", CommandOptionValue::Integer(1024)),
        ])
        .unwrap();

        assert!(path.is_empty());
        assert_eq!(args.user("user"), Some(Id::new(5)));
        assert_eq!(args.integer("size"), Some(1024));
    }

    #[test]
    fn subcommand_arguments() {
        let (path, args) = parse_options(vec![opt(
            "deploy",
            CommandOptionValue::SubCommand(vec![
                opt("command", CommandOptionValue::String("ping".to_string())),
                opt("globally", CommandOptionValue::Boolean(false)),
            ]),
        )])
        .unwrap();

        assert_eq!(path, ["deploy"]);
        assert_eq!(args.string("command"), Some("ping"));
        assert_eq!(args.bool("globally"), Some(false));
    }

    #[test]
    fn group_path() {
        let (path, args) = parse_options(vec![opt(
            "remote",
            CommandOptionValue::SubCommandGroup(vec![opt(
                "list",
                CommandOptionValue::SubCommand(Vec::new()),
            )]),
        )])
        .unwrap();

        assert_eq!(path, ["remote", "list"]);
        assert!(args.is_empty());
    }

    #[test]
    fn error_texts() {
        assert_eq!(user_message(&CommandError::Disabled), DISABLED_REPLY);
        assert_eq!(
            user_message(&CommandError::AccessDenied),
            "You are not authorized to use this command."
        );
        assert!(!user_message(&CommandError::Other(anyhow::anyhow!("secret"))).contains("secret"));
    }
}
