//! Command definition files.
//!
//! Every command on disk is a JSON document with a declarative `data` schema
//! and the name of the compiled `handler` that executes it:
//!
//! ```text
//! {
//!     "handler": "avatar",
//!     "data": {
//!         "name": "avatar",
//!         "description": "Get a user's avatar",
//!         "options": [
//!             { "type": "user", "name": "user", "description": "Whose avatar" },
//!             {
//!                 "type": "integer",
//!                 "name": "size",
//!                 "description": "Image size",
//!                 "choices": [{ "name": "512", "value": 512 }]
//!             }
//!         ]
//!     }
//! }
//! ```
//!
//! Option kinds: `string`, `integer`, `number`, `boolean`, `user`, `channel`,
//! `role`, `mentionable`, `attachment`, plus `subcommand` and `group`.

use derive_more::Display;
use serde::Deserialize;
use twilight_model::channel::ChannelType;
use twilight_model::guild::Permissions;

pub mod twilight;

const fn default_true() -> bool {
    true
}

/// A parsed definition file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommandDefinition {
    /// Command schema.
    pub data: CommandSchema,

    /// Name of the compiled handler.
    pub handler: String,

    /// Reply only to the caller.
    #[serde(default)]
    pub ephemeral: bool,
}

/// Declarative schema of a chat input command.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommandSchema {
    pub name: String,
    pub description: String,

    /// Available in direct messages.
    #[serde(default = "default_true")]
    pub dm: bool,

    #[serde(default)]
    pub nsfw: bool,

    /// Default member permissions, as a bit string like `"8"`.
    #[serde(default)]
    pub permissions: Option<Permissions>,

    #[serde(default)]
    pub options: Vec<OptionDefinition>,
}

/// Command option types.
#[derive(Debug, Clone, PartialEq, Deserialize, Display)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OptionDefinition {
    #[display(fmt = "subcommand")]
    Subcommand(SubDefinition),

    #[display(fmt = "group")]
    Group(GroupDefinition),

    #[display(fmt = "boolean")]
    Boolean(ArgDesc),

    #[display(fmt = "user")]
    User(ArgDesc),

    #[display(fmt = "role")]
    Role(ArgDesc),

    #[display(fmt = "mentionable")]
    Mentionable(ArgDesc),

    #[display(fmt = "attachment")]
    Attachment(ArgDesc),

    #[display(fmt = "string")]
    String(StringArg),

    #[display(fmt = "integer")]
    Integer(NumericArg<i64>),

    #[display(fmt = "number")]
    Number(NumericArg<f64>),

    #[display(fmt = "channel")]
    Channel(ChannelArg),
}

impl OptionDefinition {
    pub fn name(&self) -> &str {
        match self {
            Self::Subcommand(s) => &s.name,
            Self::Group(g) => &g.name,
            Self::Boolean(a)
            | Self::User(a)
            | Self::Role(a)
            | Self::Mentionable(a)
            | Self::Attachment(a) => &a.name,
            Self::String(s) => &s.arg.name,
            Self::Integer(i) => &i.arg.name,
            Self::Number(n) => &n.arg.name,
            Self::Channel(c) => &c.arg.name,
        }
    }

    /// Returns `true` for subcommands and groups.
    pub const fn is_sub(&self) -> bool {
        matches!(self, Self::Subcommand(_) | Self::Group(_))
    }
}

/// Subcommand with its own arguments.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubDefinition {
    pub name: String,
    pub description: String,

    #[serde(default)]
    pub options: Vec<OptionDefinition>,
}

/// Group of subcommands.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GroupDefinition {
    pub name: String,
    pub description: String,

    #[serde(default)]
    pub options: Vec<SubDefinition>,
}

/// Fields shared by every argument.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ArgDesc {
    pub name: String,
    pub description: String,

    #[serde(default)]
    pub required: bool,
}

/// A named choice of an argument.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Choice<T> {
    pub name: String,
    pub value: T,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StringArg {
    #[serde(flatten)]
    pub arg: ArgDesc,

    #[serde(default = "Vec::new")]
    pub choices: Vec<Choice<String>>,

    pub min_length: Option<u16>,
    pub max_length: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NumericArg<T> {
    #[serde(flatten)]
    pub arg: ArgDesc,

    #[serde(default = "Vec::new")]
    pub choices: Vec<Choice<T>>,

    pub min_value: Option<T>,
    pub max_value: Option<T>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChannelArg {
    #[serde(flatten)]
    pub arg: ArgDesc,

    /// Restricts the channel choice to specific types.
    #[serde(default)]
    pub channel_types: Vec<ChannelType>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_nested_definition() {
        let def: CommandDefinition = serde_json::from_str(
            r#"{
                "handler": "command",
                "ephemeral": true,
                "data": {
                    "name": "command",
                    "description": "Manage commands",
                    "dm": false,
                    "permissions": "8",
                    "options": [
                        {
                            "type": "subcommand",
                            "name": "enable",
                            "description": "Enable a command",
                            "options": [
                                { "type": "string", "name": "command", "description": "Name", "required": true, "max_length": 32 }
                            ]
                        },
                        {
                            "type": "group",
                            "name": "remote",
                            "description": "Remote set",
                            "options": [
                                { "name": "list", "description": "List deployed" }
                            ]
                        }
                    ]
                }
            }"#,
        )
        .unwrap();

        assert!(def.ephemeral);
        assert!(!def.data.dm);
        assert_eq!(def.data.permissions, Some(Permissions::ADMINISTRATOR));

        let OptionDefinition::Subcommand(enable) = &def.data.options[0] else {
            panic!("expected subcommand");
        };
        let OptionDefinition::String(arg) = &enable.options[0] else {
            panic!("expected string");
        };
        assert!(arg.arg.required);
        assert_eq!(arg.max_length, Some(32));
        assert!(matches!(&def.data.options[1], OptionDefinition::Group(g) if g.options[0].name == "list"));
    }

    #[test]
    fn parse_choices_and_defaults() {
        let def: CommandDefinition = serde_json::from_str(
            r#"{
                "handler": "avatar",
                "data": {
                    "name": "avatar",
                    "description": "Get a user's avatar",
                    "options": [
                        { "type": "user", "name": "user", "description": "Whose avatar" },
                        {
                            "type": "integer",
                            "name": "size",
                            "description": "Image size",
                            "choices": [{ "name": "16", "value": 16 }, { "name": "512", "value": 512 }]
                        }
                    ]
                }
            }"#,
        )
        .unwrap();

        assert!(def.data.dm);
        assert!(!def.ephemeral);
        assert_eq!(def.data.permissions, None);
        assert_eq!(def.data.options[0].to_string(), "user");

        let OptionDefinition::Integer(size) = &def.data.options[1] else {
            panic!("expected integer");
        };
        assert!(!size.arg.required);
        assert_eq!(size.choices[1], Choice {
            name: "512".to_string(),
            value: 512
        });
    }

    #[test]
    fn unknown_option_kind_is_an_error() {
        let res = serde_json::from_str::<CommandSchema>(
            r#"{ "name": "x", "description": "x", "options": [{ "type": "emoji", "name": "e", "description": "e" }] }"#,
        );

        assert!(res.is_err());
    }
}
