//! Tic-tac-toe session server.
//!
//! Listens on `HOST:PORT` (default `127.0.0.1:2567`). Point any WebSocket
//! client at it and send `{"message":{"type":"join","name":"Alice"}}`.

use duoroom::prelude::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    duoroom::init_tracing();

    let config = ServerConfig::from_env();
    tracing::info!(bind_addr = %config.bind_addr, "starting tic-tac-toe server");

    let server = DuoroomServer::builder().config(config).build().await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
        }
    }
    Ok(())
}
