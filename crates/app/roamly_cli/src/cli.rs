use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "roamly", about = "Mirror approved Roamly videos into YouTube playlists")]
pub struct Cli {
    /// PostgreSQL connection URL.
    #[arg(long, global = true, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Maximum number of database connections in the pool.
    #[arg(long, global = true, default_value_t = roamly_core::db::DEFAULT_MAX_CONNECTIONS)]
    pub max_connections: u32,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the version.
    Version,

    /// Apply database migrations.
    Migrate,

    /// Run a sync and print the result as JSON.
    Sync {
        #[command(subcommand)]
        scope: SyncCommand,
    },

    /// Serve the admin HTTP API.
    Serve {
        /// Address to listen on.
        #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:3100")]
        bind: String,
    },

    /// Manage the linked platform account.
    Credentials {
        #[command(subcommand)]
        action: CredentialsCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum SyncCommand {
    /// Every approved video.
    All,

    /// One country (ISO 3166-1 alpha-3).
    Country { country: String },

    /// One country and category.
    Category { country: String, category: String },
}

#[derive(Subcommand, Debug)]
pub enum CredentialsCommand {
    /// Store a refresh token obtained from the consent flow.
    Import {
        /// Account id; defaults to `ROAMLY_ACCOUNT_ID`.
        #[arg(long)]
        account: Option<String>,

        #[arg(long, env = "ROAMLY_REFRESH_TOKEN", hide_env_values = true)]
        refresh_token: String,

        /// Granted scopes, comma separated.
        #[arg(
            long,
            value_delimiter = ',',
            default_value = "https://www.googleapis.com/auth/youtube"
        )]
        scopes: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_category_sync() {
        let cli = Cli::try_parse_from(["roamly", "sync", "category", "FRA", "street food"]).unwrap();
        match cli.command {
            Commands::Sync {
                scope: SyncCommand::Category { country, category },
            } => {
                assert_eq!(country, "FRA");
                assert_eq!(category, "street food");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
