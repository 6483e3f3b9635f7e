//! Warden - LDAP realm authentication
//!
//! Operator tool for the realms configured in a Warden configuration file.

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use commands::CommandContext;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use warden_auth::RealmsManager;
use warden_core::WardenConfig;

#[derive(Parser)]
#[command(name = "warden")]
#[command(author = "Warden Team")]
#[command(version = warden_core::VERSION)]
#[command(about = "LDAP realm authentication and group resolution", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, env = "WARDEN_CONFIG")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "WARDEN_LOG_LEVEL")]
    log_level: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Only print results
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Authenticate a user and print its groups
    Login {
        /// Realm name
        realm: String,

        /// Login name
        user: String,

        /// Password
        #[arg(long, env = "WARDEN_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Print the groups of a user without authenticating
    Groups {
        /// Realm name
        realm: String,

        /// Login name or user DN
        user: String,
    },

    /// Load every configured realm and report problems
    CheckConfig,

    /// Probe the directory behind a realm
    Status {
        /// Realm name
        realm: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => WardenConfig::from_file(path)?,
        None => WardenConfig::from_env(),
    };

    init_logging(cli.log_level.as_deref().unwrap_or(&config.logging.level), &config.logging.format);

    if let Some(path) = &cli.config {
        debug!("Loaded configuration from {}", path);
    }

    let command = cli.command;
    let output_format = cli.output;
    let quiet = cli.quiet;

    if let Commands::CheckConfig = command {
        return commands::check_config::execute(&config, output_format).await;
    }

    let ctx = CommandContext {
        manager: RealmsManager::from_config(&config)?,
        output_format,
        quiet,
    };

    match command {
        Commands::Login {
            realm,
            user,
            password,
        } => commands::login::execute(&ctx, &realm, &user, password.as_deref()).await,
        Commands::Groups { realm, user } => commands::groups::execute(&ctx, &realm, &user).await,
        Commands::Status { realm } => commands::status::execute(&ctx, &realm).await,
        Commands::CheckConfig => Ok(()),
    }
}

fn init_logging(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Logs go to stderr so command output stays parseable.
    if format == "json" {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .with(filter)
            .init();
    }
}
