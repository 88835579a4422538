use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clinic::cli::{self, commands, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clinic=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => commands::init().await,
        Commands::Serve { host, port } => commands::serve(host, port).await,
        Commands::HashPassword { password, cost } => {
            commands::hash_password_cmd(&password, cost).await
        }
        Commands::GenSecret { length } => commands::gen_secret(length).await,
        Commands::CreateAdmin {
            email,
            password,
            first_name,
            last_name,
        } => commands::create_admin(&email, &password, &first_name, &last_name).await,
    };

    if let Err(e) = &result {
        cli::error(&e.to_string());
    }
    result
}
