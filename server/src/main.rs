//! Contrast TCP play server.
//!
//! Newline-framed ASCII protocol. Clients send `ROLE <role> [<name>
//! [<model>]]`, `MOVE <move-literal>` and `GET_STATE`; the server answers
//! with `INFO`/`ERROR` lines and `STATE ... END` blocks, broadcasting the
//! state to every connection after each applied move.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod room;

use room::Room;

#[derive(Parser, Debug)]
#[command(name = "contrast-server")]
#[command(about = "Contrast TCP play server", long_about = None)]
struct Config {
    /// Listen address
    #[arg(long, default_value = "127.0.0.1:8765")]
    addr: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let listener = TcpListener::bind(&config.addr)
        .await
        .with_context(|| format!("binding {}", config.addr))?;
    info!(addr = %config.addr, "listening");

    let room = Arc::new(Mutex::new(Room::new()));
    let next_id = Arc::new(AtomicU64::new(1));

    loop {
        let (socket, peer) = listener.accept().await.context("accept failed")?;
        let id = next_id.fetch_add(1, Ordering::Relaxed);
        let room = Arc::clone(&room);
        debug!(id, %peer, "client connected");

        tokio::spawn(async move {
            if let Err(error) = serve_client(id, socket, room).await {
                warn!(id, %error, "client error");
            }
        });
    }
}

async fn serve_client(id: u64, socket: TcpStream, room: Arc<Mutex<Room>>) -> Result<()> {
    let (reader, mut writer) = socket.into_split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    // Writer task: pump queued lines onto the socket
    let writer_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if writer.write_all(message.as_bytes()).await.is_err() {
                break;
            }
        }
    });

    {
        let mut room = room.lock().await;
        let role = room.join(id, tx);
        info!(id, role = role.name(), "client joined");
        let greeting = format!("INFO {}\n", room.describe(id));
        room.send_to(id, greeting);
        let snapshot = room.snapshot();
        room.send_to(id, snapshot);
    }

    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(payload) = line.strip_prefix("MOVE ") {
            let mut room = room.lock().await;
            match room.submit_move(id, payload) {
                Ok(()) => {
                    info!(id, mv = payload, status = %room.status(), "move applied");
                    let snapshot = room.snapshot();
                    room.broadcast(&snapshot);
                }
                Err(reason) => room.send_to(id, format!("ERROR {reason}\n")),
            }
        } else if let Some(payload) = line.strip_prefix("ROLE ") {
            let mut room = room.lock().await;
            match room.set_role(id, payload) {
                Ok(description) => room.send_to(id, format!("INFO {description}\n")),
                Err(reason) => room.send_to(id, format!("ERROR {reason}\n")),
            }
        } else if line == "GET_STATE" {
            let room = room.lock().await;
            let snapshot = room.snapshot();
            room.send_to(id, snapshot);
        } else {
            let room = room.lock().await;
            room.send_to(id, format!("ERROR Unknown command: {line}\n"));
        }
    }

    room.lock().await.leave(id);
    debug!(id, "client disconnected");
    writer_task.abort();
    Ok(())
}
