//! # cortex-rover
//!
//! Trains Emotiv mental commands and relays the trained command to a rover.
//! Configuration comes from `rover.toml` (or `--config`) and the usual
//! `EMOTIV_*` environment variables; a few settings can be overridden on
//! the command line. Ctrl-C cancels the run and the Cortex session is still
//! closed before exit.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

mod app;

use app::{ConsoleObserver, print_summary};

use cortex_rover::{
    CommandRelay, CortexClient, CortexError, CortexResult, HttpActuator, RoverConfig,
    run_training_session,
};

/// Train Emotiv mental commands and drive a rover with them.
#[derive(Parser)]
#[command(name = "cortex-rover", version, about)]
struct Cli {
    /// Path to rover.toml config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Cortex API URL override
    #[arg(long)]
    url: Option<String>,

    /// Training profile to load before and save after training
    #[arg(long)]
    profile: Option<String>,

    /// Attempts per action
    #[arg(long)]
    attempts: Option<u32>,

    /// Action to train; repeat to train several, in order
    #[arg(short, long = "action")]
    actions: Vec<String>,

    /// Rover endpoint template containing `{direction}`
    #[arg(long)]
    endpoint: Option<String>,

    /// Print every relayed sample
    #[arg(long)]
    samples: bool,

    /// Enable verbose logging (set RUST_LOG for fine-grained control)
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply(&self, config: &mut RoverConfig) {
        if let Some(url) = &self.url {
            config.cortex_url.clone_from(url);
        }
        if let Some(profile) = &self.profile {
            config.training.profile = Some(profile.clone());
        }
        if let Some(attempts) = self.attempts {
            config.training.attempts = attempts;
        }
        if !self.actions.is_empty() {
            config.training.actions.clone_from(&self.actions);
        }
        if let Some(endpoint) = &self.endpoint {
            config.relay.endpoint.clone_from(endpoint);
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(CortexError::Cancelled) => {
            eprintln!("Cancelled.");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {e}");
            if e.is_connection_error() {
                eprintln!("Make sure the EMOTIV Launcher is running.");
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "cortex_rover=debug,cortex_rover_cli=debug"
    } else {
        "cortex_rover=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(cli: &Cli) -> CortexResult<()> {
    let mut config = RoverConfig::discover(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    let actuator = HttpActuator::from_config(&config)?;
    let relay = CommandRelay::from_config(actuator, &config.relay);

    println!("Connecting to {}...", config.cortex_url);
    let mut client = CortexClient::connect(&config).await?;

    let cancel = client.cancellation_token().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\nInterrupted, closing the session...");
            cancel.cancel();
        }
    });

    let mut observer = ConsoleObserver {
        show_samples: cli.samples,
    };
    let outcome = run_training_session(&mut client, &config, &relay, &mut observer).await;

    if let Err(e) = client.disconnect().await {
        tracing::debug!(error = %e, "Disconnect failed");
    }

    let report = outcome?;
    print_summary(&report);
    Ok(())
}
