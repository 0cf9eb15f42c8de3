use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, info};

use crate::console::application::ConsoleApplication;
use crate::console::command::{ClosureCommand, Command, CommandContext};
use crate::console::commands::{COMMANDS, indexed};
use crate::container::Service;
use crate::kernel::bootstrap::Application;
use crate::kernel::bootstrappers::{Bootstrapper, standard_bootstrappers};
use crate::kernel::catalog::TypeKind;
use crate::kernel::constants::{APP_NAME, FRAMEWORK_NAMESPACE};
use crate::kernel::error::Result;

/// Config key listing additional command identities
pub const COMMANDS_CONFIG_KEY: &str = "commands";

/// Console entry point: bootstraps the application, discovers commands and
/// runs them through a [`ConsoleApplication`].
pub struct Kernel {
    app: Application,
    artisan: Option<ConsoleApplication>,
    bootstrappers: Vec<Arc<dyn Bootstrapper>>,
    commands: Vec<String>,
    closure_commands: Vec<ClosureCommand>,
    command_paths: Vec<PathBuf>,
    loaded_paths: Vec<PathBuf>,
    commands_loaded: bool,
}

impl Kernel {
    pub fn new(app: Application) -> Self {
        Self::with_bootstrappers(app, standard_bootstrappers())
    }

    pub fn with_bootstrappers(app: Application, bootstrappers: Vec<Arc<dyn Bootstrapper>>) -> Self {
        Self {
            app,
            artisan: None,
            bootstrappers,
            commands: Vec::new(),
            closure_commands: Vec::new(),
            command_paths: Vec::new(),
            loaded_paths: Vec::new(),
            commands_loaded: false,
        }
    }

    pub fn app(&self) -> &Application {
        &self.app
    }

    pub fn app_mut(&mut self) -> &mut Application {
        &mut self.app
    }

    pub fn into_app(self) -> Application {
        self.app
    }

    /// Bootstrap the application (once) and load commands (once).
    pub fn bootstrap(&mut self) -> Result<()> {
        if !self.app.has_been_bootstrapped() {
            let bootstrappers = self.bootstrappers.clone();
            self.app.bootstrap_with(&bootstrappers)?;
        }

        if !self.commands_loaded {
            let paths = self.command_paths.clone();
            self.load(&paths);
            self.load_commands()?;
            self.commands_loaded = true;
        }
        Ok(())
    }

    /// Add directories to scan for commands. Paths that are not directories are ignored.
    pub fn load(&mut self, paths: &[PathBuf]) {
        for path in paths {
            if path.is_dir() && !self.loaded_paths.contains(path) {
                self.loaded_paths.push(path.clone());
            }
        }
    }

    pub fn loaded_paths(&self) -> &[PathBuf] {
        &self.loaded_paths
    }

    /// Register command identities explicitly
    pub fn add_commands(&mut self, identities: &[&str]) -> &mut Self {
        for identity in identities {
            if !self.commands.iter().any(|c| c == identity) {
                self.commands.push(identity.to_string());
            }
        }
        self
    }

    /// Directories scanned for commands during bootstrap
    pub fn add_command_paths(&mut self, paths: &[PathBuf]) -> &mut Self {
        for path in paths {
            if !self.command_paths.contains(path) {
                self.command_paths.push(path.clone());
            }
        }
        self
    }

    /// Define a command from a signature such as `greet {name} {--shout}`.
    pub fn command<F>(&mut self, signature: &str, callback: F) -> Result<&mut ClosureCommand>
    where
        F: Fn(&mut CommandContext<'_>) -> Result<i32> + Send + Sync + 'static,
    {
        let command = ClosureCommand::new(signature, callback)?;
        self.closure_commands.push(command);
        let index = self.closure_commands.len() - 1;
        Ok(&mut self.closure_commands[index])
    }

    /// Candidate identities from every discovery source, in source order.
    ///
    /// Sources: explicit commands, scanned paths, the `commands` config key,
    /// the compile-time command index, then closures. Identities that do not
    /// name a command are dropped.
    pub fn collect_commands(&mut self) -> Result<Vec<String>> {
        let mut candidates = self.commands.clone();
        candidates.extend(self.app.catalog().types_in(&self.loaded_paths));
        let configured: Vec<String> = self
            .app
            .config()?
            .get(COMMANDS_CONFIG_KEY)
            .unwrap_or_default();
        candidates.extend(configured);
        candidates.extend(COMMANDS.iter().map(|entry| entry.identity.to_string()));

        let mut commands: Vec<String> = candidates
            .into_iter()
            .filter(|identity| {
                let keep = self.is_command(identity);
                if !keep {
                    debug!("Dropping '{}': not a console command", identity);
                }
                keep
            })
            .collect();

        for closure in &self.closure_commands {
            let command: Arc<dyn Command> = Arc::new(closure.clone());
            let id = format!("commands.{:p}", Arc::as_ptr(&command).cast::<()>());
            self.app.instance(&id, Arc::new(command) as Service)?;
            commands.push(id);
        }
        Ok(commands)
    }

    fn is_command(&self, identity: &str) -> bool {
        match self.app.catalog().get(identity) {
            Some(entry) => matches!(entry.kind, TypeKind::Command(_)),
            None => indexed(identity).is_some(),
        }
    }

    fn load_commands(&mut self) -> Result<()> {
        let commands = order_commands(self.collect_commands()?);
        for identity in &commands {
            self.register_command(identity)?;
        }
        info!("Loaded {} console command(s)", commands.len());
        Ok(())
    }

    /// Resolve `identity` and add it to the console application.
    pub fn register_command(&mut self, identity: &str) -> Result<()> {
        let Some(command) = self.resolve_command(identity)? else {
            debug!("Command '{}' could not be resolved", identity);
            return Ok(());
        };
        self.get_artisan().add(command);
        Ok(())
    }

    /// The command instance registered under `identity`, if any.
    pub fn resolve_command(&self, identity: &str) -> Result<Option<Arc<dyn Command>>> {
        if let Some(command) = self.app.catalog().make_command(identity) {
            return Ok(Some(command));
        }
        if let Some(entry) = indexed(identity) {
            return Ok(Some((entry.factory)()));
        }
        if self.app.has(identity) {
            let command = self.app.make::<Arc<dyn Command>>(identity)?;
            return Ok(Some(command.as_ref().clone()));
        }
        Ok(None)
    }

    pub fn get_artisan(&mut self) -> &mut ConsoleApplication {
        let version = self.app.version();
        self.artisan
            .get_or_insert_with(|| ConsoleApplication::new(APP_NAME, version))
    }

    /// Run the console with `args` (without the program name).
    pub async fn handle(&mut self, args: Vec<String>, output: &mut (dyn Write + Send)) -> Result<i32> {
        self.bootstrap()?;
        let version = self.app.version();
        let artisan = self
            .artisan
            .get_or_insert_with(|| ConsoleApplication::new(APP_NAME, version));
        artisan.run(&mut self.app, args, output).await
    }

    /// Run a single command by name, capturing its output.
    pub async fn call(&mut self, name: &str, args: Vec<String>) -> Result<i32> {
        self.bootstrap()?;
        let version = self.app.version();
        let artisan = self
            .artisan
            .get_or_insert_with(|| ConsoleApplication::new(APP_NAME, version));
        artisan.call(&mut self.app, name, args).await
    }

    /// Names of every registered command
    pub fn all(&mut self) -> Result<Vec<String>> {
        self.bootstrap()?;
        Ok(self.get_artisan().names())
    }

    /// Output of the last [`call`](Kernel::call)
    pub fn output(&self) -> String {
        self.artisan
            .as_ref()
            .map(ConsoleApplication::output)
            .unwrap_or_default()
    }
}

/// Move framework identities to the front (keeping relative order) and drop
/// repeated identities, keeping the first occurrence.
///
/// Commands are added to the console in this order and a later command with
/// the same name replaces an earlier one, so application commands override
/// framework defaults.
pub fn order_commands(identities: Vec<String>) -> Vec<String> {
    let (framework, application): (Vec<String>, Vec<String>) = identities
        .into_iter()
        .partition(|identity| identity.starts_with(FRAMEWORK_NAMESPACE));

    let mut ordered: Vec<String> = Vec::with_capacity(framework.len() + application.len());
    for identity in framework.into_iter().chain(application) {
        if !ordered.contains(&identity) {
            ordered.push(identity);
        }
    }
    ordered
}
