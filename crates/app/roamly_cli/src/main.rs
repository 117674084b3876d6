// Import and re-export the `error` module
pub use self::error::{Error, Result};
mod error;

use clap::Parser;
use cli::{Cli, Commands};
use roamly_core::config::SyncConfig;

mod cli;
mod commands;
mod logging;

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = run().await {
        tracing::error!("{}", e);
        eprintln!("error: {e}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Cli::parse();

    if let Commands::Version = args.command {
        println!("{} {}", env!("CARGO_BIN_NAME"), env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    logging::init()?;

    let mut config = SyncConfig::from_env()?;
    if let Some(url) = &args.database_url {
        config.database_url = url.clone();
    }

    match &args.command {
        Commands::Version => {}
        Commands::Migrate => commands::migrate(&config, args.max_connections).await?,
        Commands::Sync { scope } => {
            commands::sync(&config, args.max_connections, scope).await?;
        }
        Commands::Serve { bind } => {
            commands::serve(&config, args.max_connections, bind).await?;
        }
        Commands::Credentials { action } => {
            commands::credentials(&config, args.max_connections, action).await?;
        }
    }

    Ok(())
}
