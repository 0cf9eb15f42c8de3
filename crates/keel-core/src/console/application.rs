use std::fmt;
use std::io::Write;
use std::sync::{Arc, Mutex};

use clap::ArgMatches;
use clap::error::ErrorKind;
use log::debug;

use crate::console::command::{Command, CommandContext};
use crate::console::error::ConsoleError;
use crate::kernel::bootstrap::Application;
use crate::kernel::error::Result;

/// Command run when no command name is given
pub const DEFAULT_COMMAND: &str = "list";

/// The console front end: an ordered set of commands keyed by name.
///
/// Adding a command whose name is already taken replaces the earlier one in
/// place, so later registrations override earlier ones.
pub struct ConsoleApplication {
    name: String,
    version: String,
    commands: Vec<Arc<dyn Command>>,
    last_output: Mutex<String>,
}

impl fmt::Debug for ConsoleApplication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleApplication")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("commands", &self.names())
            .finish()
    }
}

impl ConsoleApplication {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            commands: Vec::new(),
            last_output: Mutex::new(String::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Add `command`, returning the command it replaced, if any.
    pub fn add(&mut self, command: Arc<dyn Command>) -> Option<Arc<dyn Command>> {
        match self.commands.iter_mut().find(|c| c.name() == command.name()) {
            Some(slot) => {
                debug!("Command '{}' overridden", command.name());
                Some(std::mem::replace(slot, command))
            }
            None => {
                self.commands.push(command);
                None
            }
        }
    }

    pub fn find(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.commands.iter().find(|c| c.name() == name).cloned()
    }

    pub fn has(&self, name: &str) -> bool {
        self.commands.iter().any(|c| c.name() == name)
    }

    /// Commands in registration order
    pub fn all(&self) -> &[Arc<dyn Command>] {
        &self.commands
    }

    pub fn names(&self) -> Vec<String> {
        self.commands.iter().map(|c| c.name().to_string()).collect()
    }

    /// The clap definition of the whole console
    pub fn definition(&self) -> clap::Command {
        let mut root = clap::Command::new(self.name.clone())
            .version(self.version.clone())
            .disable_help_subcommand(true);
        for command in &self.commands {
            root = root.subcommand(command.definition().hide(command.hidden()));
        }
        root
    }

    /// Parse `args` (without the program name) and run the selected command.
    pub async fn run(
        &self,
        app: &mut Application,
        args: Vec<String>,
        output: &mut (dyn Write + Send),
    ) -> Result<i32> {
        let argv = std::iter::once(self.name.clone()).chain(args);
        let matches = match self.definition().try_get_matches_from(argv) {
            Ok(matches) => matches,
            Err(e) => {
                write!(output, "{}", e.render()).map_err(ConsoleError::Output)?;
                return Ok(match e.kind() {
                    ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                    _ => e.exit_code(),
                });
            }
        };

        let (name, command_matches) = match matches.subcommand() {
            Some((name, sub)) => (name.to_string(), sub.clone()),
            None => (DEFAULT_COMMAND.to_string(), ArgMatches::default()),
        };
        let command = self
            .find(&name)
            .ok_or(ConsoleError::CommandNotFound { name: name.clone() })?;

        debug!("Running command '{}'", name);
        let mut ctx = CommandContext {
            app,
            console: self,
            args: &command_matches,
            output,
        };
        command.handle(&mut ctx).await
    }

    /// Run `name` with `args`, capturing its output for [`output`](ConsoleApplication::output).
    pub async fn call(&self, app: &mut Application, name: &str, args: Vec<String>) -> Result<i32> {
        if !self.has(name) {
            return Err(ConsoleError::CommandNotFound {
                name: name.to_string(),
            }
            .into());
        }

        let mut buffer: Vec<u8> = Vec::new();
        let argv = std::iter::once(name.to_string()).chain(args).collect();
        let code = self.run(app, argv, &mut buffer).await?;

        let captured = String::from_utf8_lossy(&buffer).into_owned();
        match self.last_output.lock() {
            Ok(mut last) => *last = captured,
            Err(poisoned) => *poisoned.into_inner() = captured,
        }
        Ok(code)
    }

    /// Output of the last [`call`](ConsoleApplication::call)
    pub fn output(&self) -> String {
        match self.last_output.lock() {
            Ok(last) => last.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
