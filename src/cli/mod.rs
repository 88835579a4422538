//! CLI interface for Clinic

pub mod commands;
mod output;

pub use output::*;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "clinic")]
#[command(version)]
#[command(about = "Clinic back end: authentication, access gate and patient data", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new clinic.toml configuration file
    Init,

    /// Start the HTTP server
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print a bcrypt hash of a password
    HashPassword {
        /// The password to hash
        password: String,

        /// Work factor (defaults to auth.bcrypt_cost)
        #[arg(long)]
        cost: Option<u32>,
    },

    /// Print a random secret suitable for auth.jwt_secret
    GenSecret {
        /// Number of characters
        #[arg(short, long, default_value = "64")]
        length: usize,
    },

    /// Create an administrator account in the configured database
    CreateAdmin {
        #[arg(long)]
        email: String,

        #[arg(long, env = "CLINIC_ADMIN_PASSWORD")]
        password: String,

        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,
    },
}
