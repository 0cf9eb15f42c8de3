use std::fs;
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::{TempDir, tempdir};

use crate::console::command::{Command, CommandContext};
use crate::console::commands::{ABOUT_COMMAND, LIST_COMMAND};
use crate::console::error::ConsoleError;
use crate::console::kernel::{Kernel, order_commands};
use crate::kernel::bootstrap::Application;
use crate::kernel::catalog::TypeKind;
use crate::kernel::error::{Error, Result};

struct UserList;

#[async_trait]
impl Command for UserList {
    fn name(&self) -> &str {
        "list"
    }

    async fn handle(&self, ctx: &mut CommandContext<'_>) -> Result<i32> {
        ctx.line("user list")?;
        Ok(0)
    }
}

struct Hello;

#[async_trait]
impl Command for Hello {
    fn name(&self) -> &str {
        "hello"
    }

    fn description(&self) -> &str {
        "Say hello"
    }

    async fn handle(&self, ctx: &mut CommandContext<'_>) -> Result<i32> {
        ctx.line("hello")?;
        Ok(0)
    }
}

fn kernel() -> (TempDir, Kernel) {
    let dir = tempdir().unwrap();
    let app = Application::new(dir.path()).unwrap();
    (dir, Kernel::new(app))
}

#[test]
fn test_order_commands_moves_framework_first_and_dedups() {
    let ordered = order_commands(vec![
        "app::console::ListCommand".into(),
        "keel::console::ListCommand".into(),
        "app::console::Hello".into(),
        "keel::console::AboutCommand".into(),
        "app::console::ListCommand".into(),
    ]);
    assert_eq!(
        ordered,
        vec![
            "keel::console::ListCommand".to_string(),
            "keel::console::AboutCommand".to_string(),
            "app::console::ListCommand".to_string(),
            "app::console::Hello".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_user_command_overrides_framework_command() {
    let (_dir, mut kernel) = kernel();
    kernel
        .app_mut()
        .catalog_mut()
        .command("app::console::ListCommand", || UserList);
    kernel.add_commands(&["app::console::ListCommand"]);

    let ordered = order_commands(kernel.collect_commands().unwrap());
    let framework = ordered.iter().position(|c| c == LIST_COMMAND).unwrap();
    let user = ordered
        .iter()
        .position(|c| c == "app::console::ListCommand")
        .unwrap();
    assert!(framework < user);

    assert_eq!(kernel.call("list", vec![]).await.unwrap(), 0);
    assert_eq!(kernel.output(), "user list\n");
}

#[tokio::test]
async fn test_builtin_commands_are_registered() {
    let (_dir, mut kernel) = kernel();
    let names = kernel.all().unwrap();
    assert!(names.contains(&"list".to_string()));
    assert!(names.contains(&"about".to_string()));

    assert_eq!(kernel.call("about", vec![]).await.unwrap(), 0);
    assert!(kernel.output().contains("Environment  production"));
}

#[tokio::test]
async fn test_handle_without_arguments_lists_commands() {
    let (_dir, mut kernel) = kernel();
    kernel.app_mut().catalog_mut().command("app::console::Hello", || Hello);
    kernel.add_commands(&["app::console::Hello"]);

    let mut out: Vec<u8> = Vec::new();
    let code = kernel.handle(vec![], &mut out).await.unwrap();
    let out = String::from_utf8(out).unwrap();
    assert_eq!(code, 0);
    assert!(out.contains("Available commands:"));
    assert!(out.contains("hello"));
    assert!(out.contains("Say hello"));
}

#[tokio::test]
async fn test_closure_command_with_arguments() {
    let (_dir, mut kernel) = kernel();
    kernel
        .command("greet {name} {--shout}", |ctx| {
            let name = ctx.args.get_one::<String>("name").cloned().unwrap_or_default();
            let text = if ctx.args.get_flag("shout") {
                name.to_uppercase()
            } else {
                name
            };
            ctx.line(&format!("Hello {}", text))?;
            Ok(0)
        })
        .unwrap()
        .purpose("Greet someone");

    let code = kernel
        .call("greet", vec!["world".into(), "--shout".into()])
        .await
        .unwrap();
    assert_eq!(code, 0);
    assert_eq!(kernel.output(), "Hello WORLD\n");

    let ids = kernel.collect_commands().unwrap();
    assert!(ids.iter().any(|id| id.starts_with("commands.")));
}

#[tokio::test]
async fn test_unknown_command_is_an_error() {
    let (_dir, mut kernel) = kernel();
    let err = kernel.call("missing", vec![]).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Console(ConsoleError::CommandNotFound { ref name }) if name == "missing"
    ));
}

#[tokio::test]
async fn test_invalid_arguments_return_non_zero() {
    let (_dir, mut kernel) = kernel();
    let mut out: Vec<u8> = Vec::new();
    let code = kernel
        .handle(vec!["list".into(), "--bogus".into()], &mut out)
        .await
        .unwrap();
    assert_ne!(code, 0);
    assert!(!out.is_empty());
}

#[test]
fn test_discovery_sources_and_filtering() {
    let (dir, mut kernel) = kernel();

    // Scanned directory with one command and one non-command type.
    let commands_dir = dir.path().join("app/Console/Commands");
    fs::create_dir_all(&commands_dir).unwrap();
    let hello_file = commands_dir.join("hello.rs");
    let helper_file = commands_dir.join("helper.rs");
    fs::write(&hello_file, "").unwrap();
    fs::write(&helper_file, "").unwrap();
    let catalog = kernel.app_mut().catalog_mut();
    catalog.register_at(
        "app::console::Hello",
        TypeKind::Command(Arc::new(|| Arc::new(Hello) as Arc<dyn Command>)),
        &hello_file,
    );
    catalog.register_at("app::console::Helper", TypeKind::Other, &helper_file);

    // Config-listed command plus an unknown identity.
    fs::create_dir_all(dir.path().join("config")).unwrap();
    fs::write(
        dir.path().join("config/commands.json"),
        r#"["app::console::ListCommand", "app::console::Missing"]"#,
    )
    .unwrap();
    kernel
        .app_mut()
        .catalog_mut()
        .command("app::console::ListCommand", || UserList);

    kernel.add_command_paths(&[commands_dir.clone(), dir.path().join("does-not-exist")]);
    kernel.bootstrap().unwrap();
    assert_eq!(kernel.loaded_paths(), &[commands_dir]);

    let collected = kernel.collect_commands().unwrap();
    let hello = collected.iter().position(|c| c == "app::console::Hello").unwrap();
    let configured = collected
        .iter()
        .position(|c| c == "app::console::ListCommand")
        .unwrap();
    let indexed = collected.iter().position(|c| c == ABOUT_COMMAND).unwrap();
    assert!(hello < configured);
    assert!(configured < indexed);
    assert!(!collected.iter().any(|c| c == "app::console::Helper"));
    assert!(!collected.iter().any(|c| c == "app::console::Missing"));

    let names = kernel.all().unwrap();
    assert!(names.contains(&"hello".to_string()));
}

#[test]
fn test_bootstrap_runs_once() {
    let (_dir, mut kernel) = kernel();
    kernel.bootstrap().unwrap();
    let count = kernel.all().unwrap().len();
    kernel.bootstrap().unwrap();
    assert!(kernel.app().has_been_bootstrapped());
    assert!(kernel.app().is_booted());
    assert_eq!(kernel.all().unwrap().len(), count);
}
