#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use clap::{Parser, Subcommand};
use geoscope::lens::geoip::GeoLookupArgs;
use geoscope::lens::utils::OutputFormat;
use geoscope::GeoscopeConfig;
use tracing::Level;

mod commands;

use commands::serve::ServeArgs;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// configuration file path, by default $HOME/.geoscope/geoscope.toml is used
    #[clap(short, long)]
    config: Option<String>,

    /// Print debug information
    #[clap(long, global = true)]
    debug: bool,

    /// Output format: table, markdown, json, json-pretty, json-line, psv
    #[clap(short, long, global = true, default_value = "json-pretty")]
    format: OutputFormat,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve IP addresses to location and network information
    Lookup(GeoLookupArgs),

    /// Run the HTTP lookup API
    Serve(ServeArgs),

    /// Show the state of the configured range dataset
    Status,

    /// Print the effective configuration
    Config,
}

fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let level = if cli.debug { Level::INFO } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let config = match GeoscopeConfig::new(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("ERROR: unable to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Lookup(args) => commands::lookup::run(&config, args, cli.format),
        Commands::Serve(args) => commands::serve::run(&config, args),
        Commands::Status => commands::status::run(&config, cli.format),
        Commands::Config => commands::config::run(&config, cli.format),
    }
}
