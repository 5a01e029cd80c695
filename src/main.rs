mod cli;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use si_core::config::Config;
use si_db::DatabaseUrl;

/// Config file (or defaults) with `DATABASE_URL` applied.
fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let mut config = Config::load_or_default(config_path).context("failed to load configuration")?;
    config.apply_env();
    Ok(config)
}

async fn serve(host: Option<String>, port: Option<u16>, config_path: Option<&Path>) -> Result<()> {
    let mut config = load_config(config_path)?;

    // CLI flags win over the config file.
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting sales-insights {}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    si_server::start(config).await?;
    Ok(())
}

async fn migrate(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let url = DatabaseUrl::parse(config.database_url())
        .with_context(|| format!("invalid database URL '{}'", config.database_url()))?;

    let store = si_db::connect(&url, &config.database)
        .await
        .with_context(|| format!("failed to open {url}"))?;
    store.ping().await?;

    println!("Database schema is up to date ({}: {url})", store.backend());
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {}", p.display());
            Config::load(p)?
        }
        None => {
            println!("No config file specified, using default lookup");
            Config::load_or_default(None)?
        }
    };

    if config.server.port == 0 {
        anyhow::bail!("server.port must be between 1 and 65535");
    }
    if config.database.max_connections == 0 {
        anyhow::bail!("database.max_connections must be at least 1");
    }
    let url = DatabaseUrl::parse(config.database_url())?;

    println!("✓ Configuration is valid");
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Database: {url} ({})", url.backend());
    println!("  Max connections: {}", config.database.max_connections);
    for warning in config.validate() {
        println!("  warning: {warning}");
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "sales_insights=trace,si_server=trace,si_db=debug,si_core=debug,tower_http=debug"
                .to_string()
        } else {
            "sales_insights=debug,si_server=debug,si_db=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Serve { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(serve(host, port, cli.config.as_deref()))
        }
        Commands::Migrate => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(migrate(cli.config.as_deref()))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("sales-insights {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
