use clap::error::ErrorKind;
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use miette::{IntoDiagnostic, miette};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::commands::{InitArgs, LogsArgs, init_command, interrupt_token, logs_command};
use crate::error::CommandError;
use crate::kubectl::KubectlCli;
use crate::settings::Settings;

#[derive(Debug, Parser)]
#[command(
    name = "riff",
    about = "Commands for creating and managing function resources",
    version,
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default is $HOME/.riff.yaml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose output (use twice for debug output)
    #[arg(long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Initialize a function
    Init(InitArgs),

    /// Display the logs for a running function
    Logs(LogsArgs),
}

pub fn run() -> miette::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let env: HashMap<String, String> = std::env::vars().collect();
    let settings =
        Settings::from_env(env, cli.config.as_deref()).map_err(|err| miette!("{err:#}"))?;
    debug!("Setting sources: {:?}", settings.source_names());

    match cli.command {
        Commands::Init(args) => init_command(args, &settings).or_else(exit_on_usage)?,
        Commands::Logs(args) => logs(args, &settings)?,
    }

    Ok(())
}

fn logs(args: LogsArgs, settings: &Settings) -> miette::Result<()> {
    // Without kubectl on PATH the pod lookup fails and is reported as not active
    let kubectl = KubectlCli::locate().unwrap_or_else(|err| {
        warn!("{err}");
        KubectlCli::new("kubectl")
    });
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .into_diagnostic()?;

    let outcome = runtime.block_on(async {
        let cancel = interrupt_token();
        let stdout = io::stdout();
        let mut out = stdout.lock();
        logs_command(args, settings, &kubectl, &mut out, &cancel).await
    })?;
    debug!("Logs finished: {outcome:?}");

    Ok(())
}

/// Usage errors are printed with the `init` usage text and exit like clap's own errors.
fn exit_on_usage(err: CommandError) -> Result<(), CommandError> {
    if !err.is_usage() {
        return Err(err);
    }

    let mut command = Cli::command();
    command.build();
    if let Some(init) = command.find_subcommand_mut("init") {
        init.error(ErrorKind::ArgumentConflict, &err).exit();
    }
    command.error(ErrorKind::ArgumentConflict, &err).exit()
}

pub fn init_logging(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let filter = match verbose {
        0 => EnvFilter::new("riff=warn"),
        1 => EnvFilter::new("riff=info"),
        _ => EnvFilter::new("riff=debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
