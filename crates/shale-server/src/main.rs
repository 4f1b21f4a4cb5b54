//! shale-server
//!
//! HTTP façade for the shale SQL engine: a small hyper service exposing
//! execute / history / reset / tables plus a health probe. All engine
//! calls serialize behind the database's internal lock; the transport
//! is stateless glue.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use shale_engine::{Database, DatabaseConfig};

mod routes;

use routes::AppState;

/// HTTP server for the shale SQL engine.
#[derive(Parser)]
#[command(name = "shale-server")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address to bind.
    #[arg(short, long, env = "SHALE_ADDR", default_value = "127.0.0.1:8080")]
    addr: SocketAddr,

    /// Root data directory for schema.json and the table files.
    #[arg(short, long, env = "SHALE_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Allowed CORS origins, comma-separated; `*` allows any.
    #[arg(
        long,
        env = "SHALE_CORS_ORIGINS",
        default_value = "*",
        value_delimiter = ','
    )]
    cors_origins: Vec<String>,

    /// Maximum query length in bytes.
    #[arg(long, env = "SHALE_MAX_QUERY_LEN", default_value_t = 65_536)]
    max_query_len: usize,

    /// Maximum rows returned by one SELECT.
    #[arg(long, env = "SHALE_MAX_RESULT_ROWS", default_value_t = 10_000)]
    max_result_rows: usize,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "SHALE_LOG", default_value = "info")]
    log_level: Level,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { Level::DEBUG } else { cli.log_level };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = DatabaseConfig::new(&cli.data_dir);
    config.max_query_length = cli.max_query_len;
    config.max_result_rows = cli.max_result_rows;
    let db = Database::open(config)?;

    let state = Arc::new(AppState {
        db,
        cors_origins: cli.cors_origins,
    });

    let listener = TcpListener::bind(cli.addr).await?;
    info!(addr = %cli.addr, data_dir = %cli.data_dir.display(), "shale-server listening");

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let state = state.clone();

        tokio::task::spawn(async move {
            let service = service_fn(move |req| {
                let state = state.clone();
                async move { Ok::<_, Infallible>(routes::handle(req, state).await) }
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                debug!(error = %err, "error serving connection");
            }
        });
    }
}
