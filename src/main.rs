use clap::Parser;
use rapidriter::{
    cli::{Cli, Commands, TestPattern},
    config::{DisplayConfig, OscConfig, WorkerConfig},
    display,
    osc::{self, HttpTakeoverNotifier, OscIngest, OscState, SubscriberRegistry},
    playback::{EngineTiming, EventListener, PlaybackEngine, PlaybackState},
    renderer::HttpRendererClient,
    shows::HttpShowService,
};
use std::sync::Arc;
use tokio::net::{TcpListener, UdpSocket};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rapidriter=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Osc) => run_osc().await,
        Some(Commands::TestPattern { pattern }) => run_test_pattern(pattern).await,
        Some(Commands::Worker) | None => run_worker().await,
    }
}

async fn run_worker() -> Result<(), Box<dyn std::error::Error>> {
    let config = WorkerConfig::from_env()?;

    info!("🚀 Starting Rapidriter worker v{}", VERSION);
    info!("📋 Configuration loaded:");
    info!("   Web service: {}", config.web_service_host);
    for show_type in config.renderers.configured() {
        if let Some(url) = config.renderers.render_url(show_type) {
            info!("   Renderer {}: {}", show_type, url);
        }
    }
    info!("   Display: {}", config.display.addr);
    info!("   Console output: {}", config.display.console);
    info!("   Show pacing: {:?}", config.show_pacing);

    let shows = HttpShowService::new(&config.web_service_host, config.service_request_timeout)?;
    let state = PlaybackState::new();

    // The listener owns its own connection and survives service restarts
    EventListener::new(
        shows.client().clone(),
        shows.events_url(),
        state.clone(),
        config.events_reconnect_backoff,
        config.events_idle_timeout,
    )
    .spawn();
    info!("📡 Listening for show events on {}", shows.events_url());

    let renderer = HttpRendererClient::new(
        config.renderers.clone(),
        config.renderer_connect_timeout,
        config.renderer_read_timeout,
    )?;
    let transmitter = display::from_config(&config.display).await?;

    let engine = PlaybackEngine::new(
        Arc::new(shows),
        Arc::new(renderer),
        transmitter,
        state,
        EngineTiming {
            show_pacing: config.show_pacing,
            empty_queue_retry: config.empty_queue_retry,
        },
    );

    info!("✅ Playback engine running");
    engine.run().await;

    Ok(())
}

async fn run_osc() -> Result<(), Box<dyn std::error::Error>> {
    let config = OscConfig::from_env()?;

    info!("🚀 Starting Rapidriter OSC service v{}", VERSION);
    info!("📋 Configuration loaded:");
    info!("   Web service: {}", config.web_service_host);
    info!("   Subscriber queue capacity: {}", config.subscriber_queue_capacity);
    info!("   Broadcast format: {:?}", config.broadcast_format);

    let registry = SubscriberRegistry::with_queue_capacity(config.subscriber_queue_capacity);
    let notifier = HttpTakeoverNotifier::new(&config.web_service_host, config.notify_timeout)?;
    let ingest = Arc::new(OscIngest::new(
        registry.clone(),
        Arc::new(notifier),
        config.broadcast_format,
    ));

    let socket = UdpSocket::bind(config.udp_addr).await?;
    info!("🎛️  OSC input on udp://{}", config.udp_addr);
    tokio::spawn(ingest.clone().run(socket));

    let app = osc::router(OscState::new(registry, ingest.stats()));

    let listener = TcpListener::bind(config.http_addr).await?;
    info!("🎧 Listening on http://{}", config.http_addr);
    info!("📡 Frame stream: http://{}/render", config.http_addr);
    info!("🔑 Health endpoint: http://{}/health", config.http_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn run_test_pattern(pattern: TestPattern) -> Result<(), Box<dyn std::error::Error>> {
    let config = DisplayConfig::from_env()?;
    let transmitter = display::from_config(&config).await?;

    transmitter.send(&pattern.to_frame()?);
    info!("✅ Sent {:?} pattern", pattern);

    Ok(())
}
