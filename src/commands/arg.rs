use twilight_model::application::interaction::application_command::CommandOptionValue;
use twilight_model::id::marker::{
    AttachmentMarker, ChannelMarker, GenericMarker, RoleMarker, UserMarker,
};
use twilight_model::id::Id;

/// Result value for argument.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Bool(bool),
    Number(f64),
    Integer(i64),
    String(String),
    Channel(Id<ChannelMarker>),
    Attachment(Id<AttachmentMarker>),
    User(Id<UserMarker>),
    Role(Id<RoleMarker>),
    Mention(Id<GenericMarker>),
}

macro_rules! impl_variant_option {
    ( $( $v:vis fn $func:ident ( &self: $var:ident ( $tok:tt ) ) -> $ret:ty { $out:expr } )* ) => {
        $(
            /// Returns `Some` if `self` matches variant, else `None`.
            $v fn $func(&self) -> Option<$ret> {
                match self {
                    Self::$var($tok) => Some($out),
                    _ => None,
                }
            }
        )*
    };
}

impl ArgValue {
    impl_variant_option!(
        pub fn bool(&self: Bool(val)) -> bool { *val }
        pub fn number(&self: Number(val)) -> f64 { *val }
        pub fn integer(&self: Integer(val)) -> i64 { *val }
        pub fn string(&self: String(val)) -> &str { val.as_str() }
        pub fn channel(&self: Channel(val)) -> Id<ChannelMarker> { *val }
        pub fn attachment(&self: Attachment(val)) -> Id<AttachmentMarker> { *val }
        pub fn user(&self: User(val)) -> Id<UserMarker> { *val }
        pub fn role(&self: Role(val)) -> Id<RoleMarker> { *val }
        pub fn mention(&self: Mention(val)) -> Id<GenericMarker> { *val }
    );
}

impl TryFrom<CommandOptionValue> for ArgValue {
    type Error = &'static str;

    fn try_from(value: CommandOptionValue) -> Result<Self, Self::Error> {
        match value {
            CommandOptionValue::Boolean(b) => Ok(Self::Bool(b)),
            CommandOptionValue::Number(n) => Ok(Self::Number(n)),
            CommandOptionValue::Integer(i) => Ok(Self::Integer(i)),
            CommandOptionValue::String(s) => Ok(Self::String(s)),
            CommandOptionValue::Channel(id) => Ok(Self::Channel(id)),
            CommandOptionValue::Mentionable(id) => Ok(Self::Mention(id)),
            CommandOptionValue::Attachment(id) => Ok(Self::Attachment(id)),
            CommandOptionValue::User(id) => Ok(Self::User(id)),
            CommandOptionValue::Role(id) => Ok(Self::Role(id)),
            CommandOptionValue::Focused(..) => Err("Autocomplete values are not arguments"),
            CommandOptionValue::SubCommand(_) | CommandOptionValue::SubCommandGroup(_) => {
                Err("Cannot convert subcommand or group to argument value")
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    pub name: String,
    pub value: ArgValue,
}

/// Parsed arguments of a slash command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args(Vec<Arg>);

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get an argument value by name.
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.0.iter().find(|a| a.name == name).map(|a| &a.value)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(ArgValue::bool)
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(ArgValue::integer)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(ArgValue::number)
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ArgValue::string)
    }

    pub fn user(&self, name: &str) -> Option<Id<UserMarker>> {
        self.get(name).and_then(ArgValue::user)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Arg>> for Args {
    fn from(value: Vec<Arg>) -> Self {
        Self(value)
    }
}
