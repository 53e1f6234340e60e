#[cfg(feature = "cli")]
pub mod cli;
pub mod schema_config;

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "cassobjects")]
#[command(about = "Build wide-column schemas from model declarations and package the project")]
#[command(version)]
pub struct CliConfig {
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON lines on stderr")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Create column families and indexes for the models in a schema file
    Schema(cli::SchemaArgs),
    /// Run a packaging target
    Package(cli::PackageArgs),
}
