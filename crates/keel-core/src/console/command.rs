use std::fmt;
use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use clap::{Arg, ArgAction, ArgMatches};

use crate::console::application::ConsoleApplication;
use crate::console::error::ConsoleError;
use crate::kernel::bootstrap::Application;
use crate::kernel::error::Result;

/// Everything a command sees while it runs
pub struct CommandContext<'a> {
    pub app: &'a mut Application,
    pub console: &'a ConsoleApplication,
    pub args: &'a ArgMatches,
    pub output: &'a mut (dyn Write + Send),
}

impl CommandContext<'_> {
    /// Write one line to the command output
    pub fn line(&mut self, text: &str) -> Result<()> {
        writeln!(self.output, "{}", text).map_err(ConsoleError::Output)?;
        Ok(())
    }
}

/// A runnable console command.
///
/// Only identities that resolve to an implementation of this trait survive
/// command discovery.
#[async_trait]
pub trait Command: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Argument definition; the command name must match [`name`](Command::name)
    fn definition(&self) -> clap::Command {
        clap::Command::new(self.name().to_string()).about(self.description().to_string())
    }

    fn hidden(&self) -> bool {
        false
    }

    /// Run the command, returning its exit code
    async fn handle(&self, ctx: &mut CommandContext<'_>) -> Result<i32>;
}

pub type CommandClosure = Arc<dyn Fn(&mut CommandContext<'_>) -> Result<i32> + Send + Sync>;

/// One `{...}` segment of a closure command signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parameter {
    /// `{name}`, `{name?}`, `{name=default}`
    Argument {
        name: String,
        required: bool,
        default: Option<String>,
        description: String,
    },
    /// `{--name}`
    Flag { name: String, description: String },
    /// `{--name=}`, `{--name=default}`
    Option {
        name: String,
        default: Option<String>,
        description: String,
    },
}

/// Split `signature` into the command name and its parameters.
///
/// Each parameter may carry a description after ` : `, as in
/// `mail:send {user : The user id} {--queue}`.
pub fn parse_signature(signature: &str) -> std::result::Result<(String, Vec<Parameter>), ConsoleError> {
    let invalid = |message: &str| ConsoleError::InvalidSignature {
        signature: signature.to_string(),
        message: message.to_string(),
    };

    let name_end = signature.find('{').unwrap_or(signature.len());
    let name = signature[..name_end].trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(invalid("missing or malformed command name"));
    }

    let mut parameters = Vec::new();
    let mut rest = &signature[name_end..];
    while let Some(start) = rest.find('{') {
        if !rest[..start].trim().is_empty() {
            return Err(invalid("text outside of a parameter"));
        }
        let Some(len) = rest[start..].find('}') else {
            return Err(invalid("unterminated parameter"));
        };
        let token = &rest[start + 1..start + len];
        parameters.push(parse_parameter(token).ok_or_else(|| invalid("empty parameter"))?);
        rest = &rest[start + len + 1..];
    }
    if !rest.trim().is_empty() {
        return Err(invalid("text outside of a parameter"));
    }

    Ok((name.to_string(), parameters))
}

fn parse_parameter(token: &str) -> Option<Parameter> {
    let (param, description) = match token.split_once(" : ") {
        Some((param, description)) => (param.trim(), description.trim().to_string()),
        None => (token.trim(), String::new()),
    };

    if let Some(option) = param.strip_prefix("--") {
        if option.is_empty() {
            return None;
        }
        return Some(match option.split_once('=') {
            Some((name, default)) => Parameter::Option {
                name: name.to_string(),
                default: (!default.is_empty()).then(|| default.to_string()),
                description,
            },
            None => Parameter::Flag {
                name: option.to_string(),
                description,
            },
        });
    }

    if param.is_empty() {
        return None;
    }
    Some(match (param.strip_suffix('?'), param.split_once('=')) {
        (Some(name), _) => Parameter::Argument {
            name: name.to_string(),
            required: false,
            default: None,
            description,
        },
        (None, Some((name, default))) => Parameter::Argument {
            name: name.to_string(),
            required: false,
            default: Some(default.to_string()),
            description,
        },
        (None, None) => Parameter::Argument {
            name: param.to_string(),
            required: true,
            default: None,
            description,
        },
    })
}

/// A command defined by a signature string and a closure
#[derive(Clone)]
pub struct ClosureCommand {
    signature: String,
    name: String,
    description: String,
    parameters: Vec<Parameter>,
    callback: CommandClosure,
}

impl fmt::Debug for ClosureCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClosureCommand")
            .field("signature", &self.signature)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl ClosureCommand {
    pub fn new<F>(signature: &str, callback: F) -> Result<Self>
    where
        F: Fn(&mut CommandContext<'_>) -> Result<i32> + Send + Sync + 'static,
    {
        let (name, parameters) = parse_signature(signature)?;
        Ok(Self {
            signature: signature.to_string(),
            name,
            description: String::new(),
            parameters,
            callback: Arc::new(callback),
        })
    }

    /// Set the description shown by `list`
    pub fn purpose(&mut self, description: &str) -> &mut Self {
        self.description = description.to_string();
        self
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }
}

#[async_trait]
impl Command for ClosureCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn definition(&self) -> clap::Command {
        let mut command =
            clap::Command::new(self.name.clone()).about(self.description.clone());
        for parameter in &self.parameters {
            let arg = match parameter {
                Parameter::Argument {
                    name,
                    required,
                    default,
                    description,
                } => {
                    let mut arg = Arg::new(name.clone())
                        .required(*required)
                        .help(description.clone());
                    if let Some(default) = default {
                        arg = arg.default_value(default.clone());
                    }
                    arg
                }
                Parameter::Flag { name, description } => Arg::new(name.clone())
                    .long(name.clone())
                    .action(ArgAction::SetTrue)
                    .help(description.clone()),
                Parameter::Option {
                    name,
                    default,
                    description,
                } => {
                    let mut arg = Arg::new(name.clone())
                        .long(name.clone())
                        .num_args(1)
                        .help(description.clone());
                    if let Some(default) = default {
                        arg = arg.default_value(default.clone());
                    }
                    arg
                }
            };
            command = command.arg(arg);
        }
        command
    }

    async fn handle(&self, ctx: &mut CommandContext<'_>) -> Result<i32> {
        (self.callback)(ctx)
    }
}
