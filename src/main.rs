use std::sync::Arc;
use tokio::sync::Notify;

mod api;
mod config;
mod handler;
mod http;
mod logger;
mod server;
mod storage;

use storage::{FileStore, UrlStore};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config::DEFAULT_CONFIG_PATH.to_string());

    let mut cfg = config::Config::load_from(&config_path)?;
    cfg.apply_port_override(std::env::var(config::PORT_ENV).ok().as_deref());

    logger::init(&cfg)?;

    // Worker threads default to the number of CPU cores
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }

    let runtime = runtime_builder.build()?;
    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let listener = server::create_listener(addr)?;

    let store: Arc<dyn UrlStore> = Arc::new(FileStore::new(&cfg.storage.data_file));
    logger::log_server_start(&addr, &cfg);

    let document = store.read();
    if document.is_empty() {
        logger::write_info("Store is empty; it will be created on the first update");
    } else {
        logger::write_info(&format!("Store holds {} entries", document.len()));
    }

    let state = Arc::new(config::AppState::new(cfg, store));
    let shutdown = Arc::new(Notify::new());
    server::start_signal_handler(Arc::clone(&shutdown));

    server::start_server_loop(listener, state, shutdown)
        .await
        .map_err(|e| e as Box<dyn std::error::Error>)?;
    Ok(())
}
