use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use keel_core::console::Kernel;
use keel_core::kernel::bootstrap::Application;
use keel_core::kernel::bootstrappers::standard_bootstrappers;
use keel_core::providers::register_foundation;
use keel_core::worker::Worker;
use log::{error, info};

/// Keel: application process lifecycle manager
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Simple ping command for testing
    #[arg(long)]
    ping: bool,

    /// Application base path
    #[arg(long, env = "KEEL_BASE_PATH", default_value = ".")]
    base_path: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Bootstrap the application and run the worker loop
    Serve {
        /// Stop after this many cycles (runs until Ctrl-C otherwise)
        #[arg(long)]
        cycles: Option<u64>,

        /// Pause between cycles, in milliseconds
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },
    /// Run a console command
    Console {
        /// Command name followed by its arguments
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = CliArgs::parse();

    if args.ping {
        println!("pong");
        return ExitCode::SUCCESS;
    }

    let mut app = match Application::new(&args.base_path) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Failed to initialize application: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = register_foundation(&mut app) {
        eprintln!("Fatal: Failed to register the foundation provider: {}", e);
        return ExitCode::FAILURE;
    }

    match args.command {
        Some(Commands::Serve {
            cycles,
            interval_ms,
        }) => serve(app, cycles, Duration::from_millis(interval_ms)).await,
        Some(Commands::Console { args }) => console(app, args).await,
        None => console(app, Vec::new()).await,
    }
}

async fn serve(mut app: Application, cycles: Option<u64>, interval: Duration) -> ExitCode {
    if let Err(e) = app.bootstrap_with(&standard_bootstrappers()) {
        eprintln!("Bootstrap failed: {}", e);
        return ExitCode::FAILURE;
    }
    println!("Serving from {}", app.base_path("").display());

    let mut worker = Worker::new(interval);
    if let Some(cycles) = cycles {
        worker = worker.with_max_cycles(cycles);
    }

    let run = worker.run(&mut app, |app: &mut Application, cycle: u64| {
        let name = app.config()?.get_or("app.name", "Keel".to_string());
        info!("[{}] cycle {} ({})", name, cycle, app.environment());
        Ok(())
    });

    let result = tokio::select! {
        result = run => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupt received, stopping worker");
            Ok(())
        }
    };

    match result {
        Ok(()) => {
            println!("Worker finished after {} cycle(s)", worker.cycles());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Worker failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn console(app: Application, args: Vec<String>) -> ExitCode {
    let commands_path = app.path("Console/Commands");
    let mut kernel = Kernel::new(app);
    kernel.add_command_paths(&[commands_path]);

    let mut stdout = io::stdout();
    let code = match kernel.handle(args, &mut stdout).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", e);
            1
        }
    };
    if let Err(e) = stdout.flush() {
        eprintln!("Failed to write command output: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
