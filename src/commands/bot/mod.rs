/*!
Handler template:
```
pub struct Command;

impl Command {
    pub async fn slash(_ctx: Context, _req: SlashRequest) -> CommandResult {
        todo!();
    }
}
```
Bind it in [`handlers`] and point a definition file at the bound name:
```json
{ "data": { "name": "cmd", "description": "Thing." }, "handler": "cmd" }
```
*/
use crate::commands::function::Handlers;

/// Generic commands.
pub mod meta;

/// Normal user commands.
#[cfg(feature = "user")]
pub mod user;

/// Administrator comands.
#[cfg(feature = "admin")]
pub mod admin;

/// Create the table of compiled handlers.
pub fn handlers() -> Handlers {
    // Basic functionality.
    let handlers = Handlers::new()
        .bind("ping", meta::Ping::slash)
        .bind("debug", meta::DebugInfo::slash)
        .bind("invite", meta::Invite::slash)
        .bind("changelog", meta::Changelog::slash);

    #[cfg(feature = "user")]
    let handlers = handlers
        .bind("avatar", user::avatar::Avatar::slash)
        .bind("date", user::date::Date::slash)
        .bind("remind", user::remind::Remind::slash)
        .bind("timer", user::remind::Timer::slash)
        .bind("quran", user::quran::Quran::slash);

    // Registry and deployment management.
    #[cfg(feature = "admin")]
    let handlers = handlers
        .bind("command", admin::command::CommandAdmin::slash)
        .bind("module", admin::module::ModuleAdmin::slash)
        .bind("roles", admin::roles::Roles::slash);

    handlers
}
