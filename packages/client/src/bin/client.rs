//! Terminal viewer client for Butai streams.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin butai-client -- --stream-id airi
//! cargo run --bin butai-client -- --url ws://example.com:8080/ws/viewer --stream-id airi --client-id alice
//! ```

use butai_client::session::run_viewer_session;
use butai_shared::logger::setup_logger;
use clap::Parser;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "butai-client")]
#[command(about = "Terminal viewer for Butai avatar streams", long_about = None)]
struct Args {
    /// Viewer WebSocket endpoint
    #[arg(short = 'u', long, default_value = "ws://127.0.0.1:8080/ws/viewer")]
    url: String,

    /// Stream to watch
    #[arg(short = 's', long)]
    stream_id: String,

    /// Client ID shown in chat (generated when omitted)
    #[arg(short = 'c', long)]
    client_id: Option<String>,
}

#[tokio::main]
async fn main() {
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();
    let client_id = args
        .client_id
        .unwrap_or_else(|| format!("viewer-{}", Uuid::new_v4().simple()));

    if let Err(e) = run_viewer_session(&args.url, &args.stream_id, &client_id).await {
        tracing::error!("client error: {}", e);
        std::process::exit(1);
    }
}
