mod cmd;
mod report;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use steady_macro::BuildMode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "steady", version, about = "Steady - static pages with zero-runtime interactivity")]
struct Cli {
    /// Config file to use instead of steady.config.json
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Show debug logs (overrides STEADY_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Development,
    Production,
}

impl From<Mode> for BuildMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Development => BuildMode::Development,
            Mode::Production => BuildMode::Production,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Expand placeholders in every source module for the bundler
    Transform {
        #[arg(long, value_enum, default_value_t = Mode::Production)]
        mode: Mode,
    },
    /// Prerender the bundled page into static HTML
    Build {
        #[arg(long, value_enum, default_value_t = Mode::Production)]
        mode: Mode,
    },
    /// Transform in development mode and again on every source change
    Watch,
}

pub async fn run() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Transform { mode } => cmd::transform::run(config, mode.into()),
        Commands::Build { mode } => cmd::build::run(config, mode.into()).await,
        Commands::Watch => cmd::watch::run(config).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("STEADY_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
