use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;

mod config;
mod error;
mod handler;
mod http;
mod logger;
mod server;
mod upstream;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::Config::load()?;

    // Build the Tokio runtime, sizing worker threads from config when set
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }

    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    logger::init(&cfg)?;

    let addr = cfg.get_socket_addr()?;
    let state = Arc::new(config::AppState::new(&cfg)?);

    let template = state.upstream.template();
    if !template.has_placeholder() {
        logger::log_warning(&format!(
            "Upstream template does not contain '{}'; every request will hit {}",
            cfg.upstream.placeholder,
            template.template()
        ));
    }
    if cfg.upstream.strip_client_origin {
        logger::log_info(
            "STRIP_CLIENT_ORIGIN is set; client Origin is never forwarded upstream, so it has no effect",
        );
    }

    let listener = server::create_listener(addr)?;
    logger::log_server_start(&addr, &cfg);

    let signals = Arc::new(server::SignalHandler::new());
    server::start_signal_handler(Arc::clone(&signals))?;

    let active_connections = Arc::new(AtomicUsize::new(0));
    server::start_server_loop(
        listener,
        state,
        active_connections,
        server::ServerLoopConfig {
            shutdown: Arc::clone(&signals.shutdown),
            grace: Duration::from_secs(cfg.performance.shutdown_grace_secs),
        },
    )
    .await
}
