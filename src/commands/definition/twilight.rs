use thiserror::Error;
use twilight_model::application::command::{Command, CommandOption, CommandType};
use twilight_util::builder::command::*;

use crate::commands::definition::{
    CommandSchema, GroupDefinition, OptionDefinition, SubDefinition,
};
use crate::utils::prelude::*;

pub type TwilightCommand = Command;

/// Helper trait for twilight builders where the value may be optional.
/// This trait lets you apply the optional value if it is present,
/// otherwise preserve the builder default.
trait Optional: Sized {
    /// Apply a function only if `value` is `Some`.
    fn optional<F, A>(mut self, value: Option<A>, func: F) -> Self
    where
        F: Fn(Self, A) -> Self,
    {
        if let Some(value) = value {
            self = func(self, value);
        }
        self
    }
}

impl<T> Optional for T {}

/// Validates options in the command.
pub fn validate_command(cmd: &Command) -> Result<(), CommandValidationError> {
    use twilight_validate::command as validate;

    /// Checks for local multiples of same option names.
    fn validate_options(options: &[CommandOption]) -> Result<(), CommandValidationError> {
        options.iter().enumerate().try_for_each(|(idx, opt)| {
            // All the rest of the options must not have this name.
            if let Some(slice) = options.get(idx + 1..) {
                if slice.iter().any(|c| c.name == opt.name) {
                    return Err(CommandValidationError::AmbiguousName(format!(
                        "Duplicate name '{}' in option of kind '{}'",
                        opt.name,
                        opt.kind.kind()
                    )));
                }
            }

            if let Some(options) = &opt.options {
                validate_options(options)?;
            }

            Ok(())
        })
    }

    // Ambiguity first, twilight reports duplicates without saying where.
    validate_options(&cmd.options)?;

    // Does not check for options.
    validate::command(cmd).context("Base command error")?;

    // This checks for order, limit, name and description validity (recursively).
    validate::options(&cmd.options).context("Command options error")?;

    Ok(())
}

#[derive(Debug, Error)]
pub enum CommandValidationError {
    /// Multiple uses of same option name.
    #[error("Option names must be locally unique: {0}")]
    AmbiguousName(String),

    /// Subcommands or groups where only arguments are allowed.
    #[error("Option '{0}' cannot be nested here")]
    Nesting(String),

    /// Subcommands mixed with plain arguments on the same level.
    #[error("Subcommands and arguments cannot be mixed in '{0}'")]
    Mixed(String),

    /// Twilight's validation error.
    #[error(transparent)]
    Twilight(#[from] twilight_validate::command::CommandValidationError),

    /// Other errors that are or can be converted to `anyhow::Error`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A validated chat input command.
#[derive(Debug, Clone)]
pub struct SlashCommand(Command);

impl TryFrom<&CommandSchema> for SlashCommand {
    type Error = CommandValidationError;

    fn try_from(value: &CommandSchema) -> Result<Self, Self::Error> {
        check_level(&value.name, &value.options)?;

        let mut cmd = CommandBuilder::new(
            value.name.as_str(),
            value.description.as_str(),
            CommandType::ChatInput,
        )
        .dm_permission(value.dm)
        .nsfw(value.nsfw)
        .optional(value.permissions, |b, v| b.default_member_permissions(v));

        for opt in &value.options {
            cmd = cmd.option(CommandOption::try_from(opt)?);
        }

        let cmd = cmd.build();

        validate_command(&cmd)?;

        Ok(Self(cmd))
    }
}

impl From<SlashCommand> for Command {
    fn from(value: SlashCommand) -> Self {
        value.0
    }
}

/// Subcommands and groups are top level only, and are never mixed with arguments.
fn check_level(parent: &str, options: &[OptionDefinition]) -> Result<(), CommandValidationError> {
    let subs = options.iter().filter(|o| o.is_sub()).count();
    if subs > 0 && subs != options.len() {
        return Err(CommandValidationError::Mixed(parent.to_string()));
    }
    Ok(())
}

impl TryFrom<&OptionDefinition> for CommandOption {
    type Error = CommandValidationError;

    fn try_from(value: &OptionDefinition) -> Result<Self, Self::Error> {
        let option = match value {
            OptionDefinition::Subcommand(sub) => CommandOption::try_from(sub)?,
            OptionDefinition::Group(group) => CommandOption::try_from(group)?,
            OptionDefinition::Boolean(a) => BooleanBuilder::new(&a.name, &a.description)
                .required(a.required)
                .build(),
            OptionDefinition::User(a) => UserBuilder::new(&a.name, &a.description)
                .required(a.required)
                .build(),
            OptionDefinition::Role(a) => RoleBuilder::new(&a.name, &a.description)
                .required(a.required)
                .build(),
            OptionDefinition::Mentionable(a) => MentionableBuilder::new(&a.name, &a.description)
                .required(a.required)
                .build(),
            OptionDefinition::Attachment(a) => AttachmentBuilder::new(&a.name, &a.description)
                .required(a.required)
                .build(),
            OptionDefinition::String(d) => StringBuilder::new(&d.arg.name, &d.arg.description)
                .required(d.arg.required)
                .choices(d.choices.iter().map(|c| (c.name.as_str(), c.value.as_str())))
                .optional(d.min_length, |b, v| b.min_length(v))
                .optional(d.max_length, |b, v| b.max_length(v))
                .build(),
            OptionDefinition::Integer(d) => IntegerBuilder::new(&d.arg.name, &d.arg.description)
                .required(d.arg.required)
                .choices(d.choices.iter().map(|c| (c.name.as_str(), c.value)))
                .optional(d.min_value, |b, v| b.min_value(v))
                .optional(d.max_value, |b, v| b.max_value(v))
                .build(),
            OptionDefinition::Number(d) => NumberBuilder::new(&d.arg.name, &d.arg.description)
                .required(d.arg.required)
                .choices(d.choices.iter().map(|c| (c.name.as_str(), c.value)))
                .optional(d.min_value, |b, v| b.min_value(v))
                .optional(d.max_value, |b, v| b.max_value(v))
                .build(),
            OptionDefinition::Channel(d) => ChannelBuilder::new(&d.arg.name, &d.arg.description)
                .required(d.arg.required)
                .channel_types(d.channel_types.iter().copied())
                .build(),
        };
        Ok(option)
    }
}

impl TryFrom<&SubDefinition> for CommandOption {
    type Error = CommandValidationError;

    fn try_from(value: &SubDefinition) -> Result<Self, Self::Error> {
        let mut sub = SubCommandBuilder::new(&value.name, &value.description).build();
        let options = sub.options.get_or_insert_with(Vec::new);
        for opt in &value.options {
            if opt.is_sub() {
                return Err(CommandValidationError::Nesting(opt.name().to_string()));
            }
            options.push(CommandOption::try_from(opt)?);
        }
        Ok(sub)
    }
}

impl TryFrom<&GroupDefinition> for CommandOption {
    type Error = CommandValidationError;

    fn try_from(value: &GroupDefinition) -> Result<Self, Self::Error> {
        let mut group = SubCommandGroupBuilder::new(&value.name, &value.description).build();
        let options = group.options.get_or_insert_with(Vec::new);
        for sub in &value.options {
            options.push(CommandOption::try_from(sub)?);
        }
        Ok(group)
    }
}
