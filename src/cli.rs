use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "formsmap")]
#[command(about = "Oracle Forms PL/SQL analyzer and migration planner", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a form's program units and triggers
    Analyze {
        /// Program-unit source file (.pll, .sql, .pls)
        source: PathBuf,

        /// JSON trigger list decoded from the form module
        #[arg(short, long)]
        triggers: Option<PathBuf>,

        /// Form name (defaults to the source file stem)
        #[arg(long)]
        form: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "terminal")]
        format: OutputFormat,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Config file (defaults to .formsmap.toml discovery)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Show only the first N entries of the migration plan
        #[arg(long)]
        top: Option<usize>,

        /// Increase log verbosity (-v info, -vv debug, -vvv trace)
        #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
        verbosity: u8,
    },

    /// Initialize configuration file
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Commands {
    pub fn verbosity(&self) -> u8 {
        match self {
            Commands::Analyze { verbosity, .. } => *verbosity,
            Commands::Init { .. } => 0,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum OutputFormat {
    Json,
    Markdown,
    Terminal,
}

impl From<OutputFormat> for crate::io::output::OutputFormat {
    fn from(f: OutputFormat) -> Self {
        match f {
            OutputFormat::Json => crate::io::output::OutputFormat::Json,
            OutputFormat::Markdown => crate::io::output::OutputFormat::Markdown,
            OutputFormat::Terminal => crate::io::output::OutputFormat::Terminal,
        }
    }
}

/// Default log filter for a `-v` count.
pub fn log_level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

pub fn parse_args() -> Cli {
    Cli::parse()
}
