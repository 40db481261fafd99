//! bookshelf CLI - book CRUD service
//!
//! - `serve`: run the HTTP service and the metrics listener
//! - `check-db`: probe the configured PostgreSQL server and exit

use std::net::{IpAddr, SocketAddr};

use anyhow::{Context, Result};
use bookshelf_core::BackendKind;
use bookshelf_server::{ConnectionMode, ServeOptions, ServerConfig};
use clap::{Parser, Subcommand, ValueEnum};

mod tracing_setup;

use tracing_setup::TracingConfig;

#[derive(Parser, Debug)]
#[command(
    name = "bookshelf",
    author,
    version,
    about = "Book CRUD service backed by memory or PostgreSQL"
)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true, env = "BOOKSHELF_DEBUG")]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the book service and the metrics endpoint
    Serve(ServeArgs),
    /// Check that the database from DB_* is reachable
    CheckDb,
}

#[derive(Parser, Debug)]
struct ServeArgs {
    /// Address to bind both listeners to
    #[arg(long, env = "BOOKSHELF_HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    /// Port for the book routes
    #[arg(long, short = 'p', env = "BOOKSHELF_PORT", default_value_t = 8080)]
    port: u16,

    /// Port for /metrics
    #[arg(long, env = "BOOKSHELF_METRICS_PORT", default_value_t = 9090)]
    metrics_port: u16,

    /// Storage backend
    #[arg(long, value_enum, env = "BOOKSHELF_BACKEND", default_value_t = BackendArg::Memory)]
    backend: BackendArg,

    /// How postgres connections are obtained per request
    #[arg(long, value_enum, env = "BOOKSHELF_CONNECTION_MODE", default_value_t = ModeArg::Pooled)]
    connection_mode: ModeArg,

    /// Start with an empty store instead of the six seed books
    #[arg(long, env = "BOOKSHELF_NO_SEED")]
    no_seed: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum BackendArg {
    Memory,
    Postgres,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Memory => BackendKind::Memory,
            BackendArg::Postgres => BackendKind::Postgres,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum ModeArg {
    Pooled,
    Direct,
}

impl From<ModeArg> for ConnectionMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Pooled => ConnectionMode::Pooled,
            ModeArg::Direct => ConnectionMode::Direct,
        }
    }
}

impl ServeArgs {
    fn into_options(self) -> ServeOptions {
        ServeOptions {
            server: ServerConfig {
                bind_addr: SocketAddr::new(self.host, self.port),
                metrics_addr: SocketAddr::new(self.host, self.metrics_port),
            },
            backend: self.backend.into(),
            connection_mode: self.connection_mode.into(),
            seed: !self.no_seed,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    tracing_setup::init(&TracingConfig { debug: cli.debug }).ok();

    match cli.command {
        Commands::Serve(args) => run_serve(args).await?,
        Commands::CheckDb => run_check_db().await?,
    }
    Ok(())
}

async fn run_serve(args: ServeArgs) -> Result<()> {
    let options = args.into_options();
    tracing::info!(
        backend = %options.backend,
        mode = %options.connection_mode,
        "Starting bookshelf on {}",
        options.server.bind_addr
    );

    bookshelf_server::serve(options)
        .await
        .context("Server error")
}

async fn run_check_db() -> Result<()> {
    bookshelf_server::check_database()
        .await
        .context("Database is not reachable")?;
    println!("database reachable");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_defaults() {
        let cli = Cli::try_parse_from(["bookshelf", "serve"]).unwrap();
        let Commands::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        let options = args.into_options();
        assert_eq!(options.server.bind_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(options.server.metrics_addr, "0.0.0.0:9090".parse().unwrap());
        assert_eq!(options.backend, BackendKind::Memory);
        assert_eq!(options.connection_mode, ConnectionMode::Pooled);
        assert!(options.seed);
    }

    #[test]
    fn serve_flags() {
        let cli = Cli::try_parse_from([
            "bookshelf",
            "serve",
            "--host",
            "127.0.0.1",
            "--port",
            "3000",
            "--backend",
            "postgres",
            "--connection-mode",
            "direct",
            "--no-seed",
            "--debug",
        ])
        .unwrap();
        assert!(cli.debug);
        let Commands::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        let options = args.into_options();
        assert_eq!(options.server.bind_addr, "127.0.0.1:3000".parse().unwrap());
        assert_eq!(options.backend, BackendKind::Postgres);
        assert_eq!(options.connection_mode, ConnectionMode::Direct);
        assert!(!options.seed);
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!(Cli::try_parse_from(["bookshelf", "serve", "--backend", "sqlite"]).is_err());
    }
}
