use std::sync::Arc;

use async_trait::async_trait;
use linkme::distributed_slice;

use crate::console::command::{Command, CommandContext};
use crate::kernel::error::Result;

/// An entry of the compile-time command index
pub struct CommandEntry {
    /// Fully qualified identity
    pub identity: &'static str,
    pub factory: fn() -> Arc<dyn Command>,
}

/// Commands declared with `#[distributed_slice(COMMANDS)]` anywhere in the binary.
#[distributed_slice]
pub static COMMANDS: [CommandEntry] = [..];

/// Look up an identity in the command index
pub fn indexed(identity: &str) -> Option<&'static CommandEntry> {
    COMMANDS.iter().find(|entry| entry.identity == identity)
}

pub const LIST_COMMAND: &str = "keel::console::ListCommand";
pub const ABOUT_COMMAND: &str = "keel::console::AboutCommand";

#[distributed_slice(COMMANDS)]
static LIST: CommandEntry = CommandEntry {
    identity: LIST_COMMAND,
    factory: || Arc::new(ListCommand),
};

#[distributed_slice(COMMANDS)]
static ABOUT: CommandEntry = CommandEntry {
    identity: ABOUT_COMMAND,
    factory: || Arc::new(AboutCommand),
};

/// `list`: prints every visible command
#[derive(Debug, Default)]
pub struct ListCommand;

#[async_trait]
impl Command for ListCommand {
    fn name(&self) -> &str {
        "list"
    }

    fn description(&self) -> &str {
        "List commands"
    }

    async fn handle(&self, ctx: &mut CommandContext<'_>) -> Result<i32> {
        let mut commands: Vec<(String, String)> = ctx
            .console
            .all()
            .iter()
            .filter(|c| !c.hidden())
            .map(|c| (c.name().to_string(), c.description().to_string()))
            .collect();
        commands.sort();
        let width = commands.iter().map(|(name, _)| name.len()).max().unwrap_or(0);

        let header = format!("{} {}", ctx.console.name(), ctx.console.version());
        ctx.line(&header)?;
        ctx.line("")?;
        ctx.line("Available commands:")?;
        for (name, description) in commands {
            ctx.line(&format!("  {:width$}  {}", name, description, width = width))?;
        }
        Ok(0)
    }
}

/// `about`: prints basic information about the application
#[derive(Debug, Default)]
pub struct AboutCommand;

#[async_trait]
impl Command for AboutCommand {
    fn name(&self) -> &str {
        "about"
    }

    fn description(&self) -> &str {
        "Display basic information about the application"
    }

    async fn handle(&self, ctx: &mut CommandContext<'_>) -> Result<i32> {
        let rows = vec![
            ("Version", ctx.app.version().to_string()),
            ("Environment", ctx.app.environment()),
            ("Debug Mode", if ctx.app.has_debug_mode_enabled() { "ENABLED" } else { "OFF" }.to_string()),
            ("Base Path", ctx.app.base_path("").display().to_string()),
            ("Locale", ctx.app.get_locale()?),
            ("Providers", ctx.app.get_loaded_providers().len().to_string()),
        ];
        for (label, value) in rows {
            ctx.line(&format!("{:<12} {}", label, value))?;
        }
        Ok(0)
    }
}
