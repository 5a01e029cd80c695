use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sales-insights")]
#[command(author, version, about = "Sales recording and reporting backend")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Host to bind to [default: server.host, 0.0.0.0]
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on [default: server.port, 8000]
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Create or upgrade the database schema, then exit
    Migrate,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default lookup if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
