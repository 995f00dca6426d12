use crate::app::AppState;
use crate::config::Config;
use crate::db::init_db;
use crate::router::respond;
use astra::Server;
use std::net::SocketAddr;

mod alerts;
mod app;
mod auth;
mod config;
mod db;
mod domain;
mod errors;
mod mls;
mod responses;
mod router;
mod sync;
mod templates;

#[cfg(test)]
mod tests;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 1️⃣ Read configuration
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("❌ {e}");
            std::process::exit(1);
        }
    };

    // 2️⃣ Build shared state and apply the schema
    let state = match AppState::from_config(config) {
        Ok(state) => state,
        Err(e) => {
            log::error!("❌ Startup failed: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = init_db(&state.db) {
        log::error!("❌ Database initialization failed: {e}");
        std::process::exit(1);
    }

    // 3️⃣ Start the server
    let addr: SocketAddr = match state.config.bind_addr.parse() {
        Ok(addr) => addr,
        Err(e) => {
            log::error!("❌ Invalid BIND_ADDR {:?}: {e}", state.config.bind_addr);
            std::process::exit(1);
        }
    };
    log::info!("Starting server at http://{addr}");

    let server = Server::bind(&addr).max_workers(8);

    let result = server.serve(move |req, _info| respond(req, &state));

    if let Err(e) = result {
        log::error!("Server ended with error: {e}");
    }

    log::info!("Server shut down cleanly.");
}
