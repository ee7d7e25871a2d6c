use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "lmsgate-server")]
#[command(about = "OAuth2 authorization server for the LMS REST plugin")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file (defaults to ./lmsgate.toml when present)
    #[arg(short, long, global = true, env = "LMSGATE_CONFIG")]
    pub config: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the server (default)
    Serve,
    /// Print the Argon2 hash of a secret, for `secret_hash`/`password_hash`
    HashSecret {
        /// Secret or password to hash
        secret: String,
    },
    /// Generate a random API secret and print it with its hash
    GenerateSecret,
}
