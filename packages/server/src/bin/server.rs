//! Avatar live-streaming server.
//!
//! One producer (the agent) per stream drives a server-authoritative
//! broadcast state; every viewer receives the same ticked snapshots.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin butai-server
//! cargo run --bin butai-server -- --host 0.0.0.0 --port 3000
//! ```

use std::{collections::HashMap, sync::Arc};

use butai_server::{
    config::EngineConfig,
    domain::{MediaLookup, SpeechSynthesizer},
    infrastructure::{
        collaborator::{
            HttpMediaLookup, HttpSpeechSynthesizer, NullMediaLookup, NullSpeechSynthesizer,
            SharedSecretAuthorizer,
        },
        message_pusher::WebSocketViewerPusher,
        repository::InMemoryStreamRegistry,
    },
    ui::Server,
    usecase::{
        ConnectViewerUseCase, DisconnectViewerUseCase, EndStreamUseCase, GetStreamsUseCase,
        SendChatUseCase, SetPoseUseCase, SpeakUseCase, StartStreamUseCase, StreamTicker,
    },
};
use butai_shared::logger::setup_logger;
use clap::Parser;
use tokio::sync::Mutex;

#[derive(Parser, Debug)]
#[command(name = "butai-server")]
#[command(about = "Avatar live-streaming server with broadcast state sync", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// Broadcast tick period in milliseconds
    #[arg(long, default_value = "50")]
    tick_interval_ms: u64,

    /// How many chat messages each stream retains
    #[arg(long, default_value = "100")]
    chat_history_capacity: usize,

    /// Shared secret required to start a stream (empty allows everyone)
    #[arg(long, env = "BUTAI_PRODUCER_TOKEN")]
    producer_token: Option<String>,

    /// Speech synthesis backend endpoint (no audio when unset)
    #[arg(long, env = "BUTAI_TTS_ENDPOINT")]
    tts_endpoint: Option<String>,

    /// Media search backend base URL (media requests skipped when unset)
    #[arg(long, env = "BUTAI_MEDIA_ENDPOINT")]
    media_endpoint: Option<String>,

    /// API key for the media search backend
    #[arg(long, env = "BUTAI_MEDIA_API_KEY")]
    media_api_key: Option<String>,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();

    let config = EngineConfig {
        tick_interval_ms: args.tick_interval_ms,
        chat_history_capacity: args.chat_history_capacity,
        ..EngineConfig::default()
    };

    // Initialize dependencies in order:
    // 1. Registry
    // 2. ViewerPusher
    // 3. Collaborators
    // 4. UseCases
    // 5. Server

    // 1. Create the stream registry (in-memory)
    let registry = Arc::new(InMemoryStreamRegistry::new(config.clone()));

    // 2. Create the ViewerPusher (WebSocket implementation)
    let pusher_clients = Arc::new(Mutex::new(HashMap::new()));
    let pusher = Arc::new(WebSocketViewerPusher::new(pusher_clients.clone()));

    // 3. Create collaborators
    let authorizer = Arc::new(SharedSecretAuthorizer::new(args.producer_token.clone()));
    let synthesizer: Arc<dyn SpeechSynthesizer> = match &args.tts_endpoint {
        Some(endpoint) => {
            tracing::info!("speech synthesis backend: {}", endpoint);
            Arc::new(HttpSpeechSynthesizer::new(endpoint.clone()))
        }
        None => {
            tracing::info!("no speech synthesis backend configured; streams run without audio");
            Arc::new(NullSpeechSynthesizer)
        }
    };
    let media_lookup: Arc<dyn MediaLookup> = match &args.media_endpoint {
        Some(endpoint) => {
            tracing::info!("media search backend: {}", endpoint);
            Arc::new(HttpMediaLookup::new(
                endpoint.clone(),
                args.media_api_key.clone(),
            ))
        }
        None => Arc::new(NullMediaLookup),
    };

    // 4. Create UseCases
    let ticker = StreamTicker::new(pusher.clone(), config.tick_interval_ms);
    let start_stream_usecase = Arc::new(StartStreamUseCase::new(
        registry.clone(),
        authorizer,
        ticker,
    ));
    let speak_usecase = Arc::new(SpeakUseCase::new(
        registry.clone(),
        pusher.clone(),
        synthesizer,
        media_lookup,
    ));
    let set_pose_usecase = Arc::new(SetPoseUseCase::new(registry.clone(), pusher.clone()));
    let end_stream_usecase = Arc::new(EndStreamUseCase::new(registry.clone(), pusher.clone()));
    let connect_viewer_usecase = Arc::new(ConnectViewerUseCase::new(
        registry.clone(),
        pusher.clone(),
        config.chat_tail_len,
    ));
    let disconnect_viewer_usecase = Arc::new(DisconnectViewerUseCase::new(
        registry.clone(),
        pusher.clone(),
    ));
    let send_chat_usecase = Arc::new(SendChatUseCase::new(registry.clone(), pusher.clone()));
    let get_streams_usecase = Arc::new(GetStreamsUseCase::new(registry));

    // 5. Create and run the server
    let server = Server::new(
        start_stream_usecase,
        speak_usecase,
        set_pose_usecase,
        end_stream_usecase,
        connect_viewer_usecase,
        disconnect_viewer_usecase,
        send_chat_usecase,
        get_streams_usecase,
    );
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
