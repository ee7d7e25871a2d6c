mod cli;

use clap::Parser;
use lmsgate_auth::credentials::{generate_api_secret, hash_secret};
use lmsgate_server::ServerBuilder;
use lmsgate_server::config::loader::{DEFAULT_CONFIG_PATH, load_config};
use lmsgate_server::observability;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    // Load .env file if present (before anything else)
    if let Err(e) = dotenvy::dotenv()
        && !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
    {
        eprintln!("Warning: Failed to load .env file: {e}");
    }

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::HashSecret { secret }) => std::process::exit(print_hash(&secret)),
        Some(Commands::GenerateSecret) => {
            let secret = generate_api_secret();
            println!("secret: {secret}");
            std::process::exit(print_hash(&secret));
        }
        Some(Commands::Serve) | None => serve(cli.config.as_deref()).await,
    }
}

async fn serve(config_path: Option<&str>) {
    observability::init_tracing();

    // A missing default file is fine: environment variables may carry everything
    let cfg = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    tracing::info!(
        path = config_path.unwrap_or(DEFAULT_CONFIG_PATH),
        "Configuration loaded"
    );

    observability::apply_logging_config(&cfg.logging);

    let server = match ServerBuilder::new().with_config(cfg).build().await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Server initialization failed: {e}");
            std::process::exit(2);
        }
    };

    if let Err(err) = server.run().await {
        eprintln!("Server error: {err:#}");
        std::process::exit(1);
    }
}

fn print_hash(secret: &str) -> i32 {
    match hash_secret(secret) {
        Ok(hash) => {
            println!("hash: {hash}");
            0
        }
        Err(e) => {
            eprintln!("Hashing failed: {e}");
            1
        }
    }
}
