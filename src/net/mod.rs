//! TCP front end: plain text command lines in, one JSON message per line
//! out.
//!
//! Every accepted socket gets two tasks. The reader task (this module's
//! session loop) parses lines and calls into the game handle; the writer
//! task drains a bounded queue onto the socket. That queue is what the
//! game core broadcasts into after login, so a stalled client fills its
//! own queue and starts losing messages instead of stalling the game.
//!
//! Before login a connection understands exactly two lines: `list` and
//! `login <characterId>`. Everything afterwards is forwarded verbatim to
//! the game task.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::game::{GameError, GameHandle, ServerMessage, OUTBOUND_QUEUE_DEPTH};
use crate::logutil::sanitize_line;

/// Hard cap on one inbound line. Anything longer gets the connection
/// dropped before the buffer can grow unbounded.
const MAX_LINE_BYTES: u64 = 1024;

type CappedReader = tokio::io::Take<BufReader<OwnedReadHalf>>;

/// Bind and run the accept loop. Only returns on a listener-level error.
pub async fn serve(config: &ServerConfig, handle: GameHandle) -> Result<()> {
    let listener = TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!("listening on {}", config.bind);
    run(listener, config.max_connections, config.motd.clone(), handle).await
}

/// Accept loop over an already-bound listener. Split out so tests can bind
/// an ephemeral port first.
pub async fn run(
    listener: TcpListener,
    max_connections: usize,
    motd: String,
    handle: GameHandle,
) -> Result<()> {
    let active = Arc::new(AtomicUsize::new(0));
    let motd = Arc::new(motd);

    loop {
        let (stream, peer) = listener
            .accept()
            .await
            .context("Failed to accept connection")?;
        let active = active.clone();
        let handle = handle.clone();
        let motd = motd.clone();
        tokio::spawn(async move {
            let conn_id = Uuid::new_v4();
            let prior = active.fetch_add(1, Ordering::SeqCst);
            if prior >= max_connections {
                active.fetch_sub(1, Ordering::SeqCst);
                warn!(
                    "[{}] turning away {}: {} connections already active",
                    conn_id, peer, max_connections
                );
                reject_full(stream).await;
                return;
            }
            debug!("[{}] accepted {} ({} active)", conn_id, peer, prior + 1);
            if let Err(err) = handle_connection(stream, conn_id, &motd, &handle).await {
                debug!("[{}] connection closed: {:#}", conn_id, err);
            }
            active.fetch_sub(1, Ordering::SeqCst);
        });
    }
}

/// One-line refusal for connections over the cap.
async fn reject_full(mut stream: TcpStream) {
    let notice = ServerMessage::error("Server is full. Try again later.");
    if let Ok(mut line) = serde_json::to_string(&notice) {
        line.push('\n');
        let _ = stream.write_all(line.as_bytes()).await;
    }
}

async fn handle_connection(
    stream: TcpStream,
    conn_id: Uuid,
    motd: &str,
    handle: &GameHandle,
) -> Result<()> {
    let (read_half, write_half) = stream.into_split();
    let (outbound_tx, outbound_rx) = mpsc::channel::<ServerMessage>(OUTBOUND_QUEUE_DEPTH);
    let writer = tokio::spawn(write_outbound(write_half, outbound_rx));

    let mut reader = BufReader::new(read_half).take(MAX_LINE_BYTES);

    if !motd.is_empty() {
        let _ = outbound_tx.send(ServerMessage::event(motd)).await;
    }

    let mut session: Option<(String, String)> = None;
    let result = drive_session(&mut reader, &outbound_tx, conn_id, handle, &mut session).await;

    if let Some((character_id, name)) = session {
        handle.logout(&character_id);
        info!("[{}] {} disconnected", conn_id, name);
    }

    // Closing the queue lets the writer flush whatever is already queued.
    drop(outbound_tx);
    let _ = writer.await;
    result
}

async fn drive_session(
    reader: &mut CappedReader,
    outbound: &mpsc::Sender<ServerMessage>,
    conn_id: Uuid,
    handle: &GameHandle,
    session: &mut Option<(String, String)>,
) -> Result<()> {
    let mut buf = String::new();
    loop {
        buf.clear();
        reader.set_limit(MAX_LINE_BYTES);
        let n = reader
            .read_line(&mut buf)
            .await
            .context("socket read failed")?;
        if n == 0 {
            return Ok(());
        }
        if !buf.ends_with('\n') && reader.limit() == 0 {
            let _ = outbound.send(ServerMessage::error("Input line too long.")).await;
            anyhow::bail!("input line exceeded {} bytes", MAX_LINE_BYTES);
        }
        let line = buf.trim();
        if line.is_empty() {
            continue;
        }

        match session.as_ref() {
            Some((character_id, _)) => {
                debug!("[{}] {}: {}", conn_id, character_id, sanitize_line(line));
                let replies = handle.command(character_id, line).await?;
                for message in replies {
                    let _ = outbound.send(message).await;
                }
            }
            None => match parse_prelogin(line) {
                Prelogin::List => {
                    let characters = handle.available_characters().await?;
                    let _ = outbound.send(ServerMessage::Characters { characters }).await;
                }
                Prelogin::Login(requested) => match handle.login(requested, outbound.clone()).await
                {
                    Ok(reply) => {
                        info!("[{}] logged in as {} ({})", conn_id, reply.name, requested);
                        *session = Some((reply.character_id, reply.name));
                        for message in reply.messages {
                            let _ = outbound.send(message).await;
                        }
                    }
                    Err(err @ GameError::Internal(_)) => return Err(err.into()),
                    Err(err) => {
                        let _ = outbound.send(ServerMessage::error(err.to_string())).await;
                    }
                },
                Prelogin::Other => {
                    debug!("[{}] pre-login noise: {}", conn_id, sanitize_line(line));
                    let _ = outbound
                        .send(ServerMessage::error(
                            "Log in first: 'login <characterId>' (or 'list').",
                        ))
                        .await;
                }
            },
        }
    }
}

/// Serializes queued messages onto the socket, one JSON object per line.
/// Exits when the queue closes or the peer stops reading for good.
async fn write_outbound<W>(mut writer: W, mut rx: mpsc::Receiver<ServerMessage>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = rx.recv().await {
        let mut line = match serde_json::to_string(&message) {
            Ok(json) => json,
            Err(err) => {
                warn!("dropping unencodable message: {}", err);
                continue;
            }
        };
        line.push('\n');
        if writer.write_all(line.as_bytes()).await.is_err() {
            break;
        }
    }
}

enum Prelogin<'a> {
    List,
    Login(&'a str),
    Other,
}

fn parse_prelogin(line: &str) -> Prelogin<'_> {
    let mut words = line.split_whitespace();
    match words.next().map(|w| w.to_ascii_lowercase()).as_deref() {
        Some("list") => Prelogin::List,
        Some("login") => match words.next() {
            Some(id) if words.next().is_none() => Prelogin::Login(id),
            _ => Prelogin::Other,
        },
        _ => Prelogin::Other,
    }
}
