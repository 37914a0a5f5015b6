use anyhow::Result;
use clap::Parser;
use formsmap::cli::{log_level, Cli, Commands};
use formsmap::commands::analyze::{handle_analyze, AnalyzeConfig};

fn init_tracing(verbosity: u8) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level(verbosity))),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.command.verbosity());

    match cli.command {
        Commands::Analyze {
            source,
            triggers,
            form,
            format,
            output,
            config,
            top,
            verbosity: _,
        } => handle_analyze(AnalyzeConfig {
            source,
            triggers,
            form,
            format: format.into(),
            output,
            config,
            top,
        }),
        Commands::Init { force } => formsmap::commands::init::init_config(force),
    }
}
