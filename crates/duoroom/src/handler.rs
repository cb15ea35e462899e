//! Per-connection handler: session, admission, and message routing.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Open a session → mint the participant id
//!   2. Wait for `join` → seat the participant via the registry
//!   3. Loop: forward room output to the socket, and decode inbound
//!      frames into room commands
//!   4. On exit (close, error, `leave`, opt-in idle timeout) → depart and
//!      end the session

use std::sync::Arc;
use std::time::Instant;

use duoroom_protocol::{
    ClientMessage, Codec, Envelope, ParticipantId, ProtocolError, ServerMessage,
};
use duoroom_room::{Assignment, RoomHandle};
use duoroom_transport::{
    Connection, ConnectionId, TransportError, WebSocketConnection,
};
use tokio::sync::mpsc;
use tokio::time::error::Elapsed;
use tokio::time::{Instant as Deadline, timeout_at};

use crate::DuoroomError;
use crate::server::ServerState;

/// Error code for frames the server can't act on.
const BAD_REQUEST: u16 = 400;

/// Drop guard that departs the participant's room and ends the session
/// when the handler exits, even on an error path.
///
/// `Drop` is synchronous, so the cleanup runs in a spawned task.
struct SessionGuard<C: Codec> {
    connection_id: ConnectionId,
    participant_id: ParticipantId,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for SessionGuard<C> {
    fn drop(&mut self) {
        let connection_id = self.connection_id;
        let participant_id = self.participant_id.clone();
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            if let Err(e) = state.registry.depart(&participant_id).await {
                tracing::warn!(%participant_id, error = %e, "departure failed");
            }
            let _ = state.sessions.lock().await.end(connection_id);
        });
    }
}

/// Per-connection outbound framing: sequence numbers and timestamps.
struct Outbound<'a, C: Codec> {
    conn: &'a WebSocketConnection,
    codec: &'a C,
    seq: u64,
    start: Instant,
}

impl<C: Codec> Outbound<'_, C> {
    fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    async fn send(&mut self, message: ServerMessage) -> Result<(), DuoroomError> {
        let envelope = Envelope::new(self.seq, self.elapsed_ms(), message);
        self.seq += 1;
        let bytes = self.codec.encode(&envelope)?;
        self.conn.send(&bytes).await?;
        Ok(())
    }

    async fn send_error(&mut self, error: &ProtocolError) -> Result<(), DuoroomError> {
        self.send(ServerMessage::Error {
            code: BAD_REQUEST,
            message: error.to_string(),
        })
        .await
    }

    async fn heartbeat_ack(&mut self, client_time: u64) -> Result<(), DuoroomError> {
        let server_time = self.elapsed_ms();
        self.send(ServerMessage::HeartbeatAck {
            client_time,
            server_time,
        })
        .await
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), DuoroomError> {
    let connection_id = conn.id();
    tracing::debug!(conn_id = %connection_id, "handling new connection");

    let participant_id = {
        let mut sessions = state.sessions.lock().await;
        sessions.create(connection_id)?.participant_id.clone()
    };
    let _guard = SessionGuard {
        connection_id,
        participant_id: participant_id.clone(),
        state: Arc::clone(&state),
    };

    let mut out = Outbound {
        conn: &conn,
        codec: &state.codec,
        seq: 1,
        start: Instant::now(),
    };

    // --- Step 1: admission ---
    let (outbox_tx, mut outbox_rx) = mpsc::unbounded_channel();
    let Some(Assignment { room, participant }) =
        await_join(&conn, &state, &participant_id, outbox_tx, &mut out).await?
    else {
        let _ = conn.close().await;
        return Ok(());
    };

    tracing::info!(
        conn_id = %connection_id,
        %participant_id,
        room_id = %room.room_id(),
        marker = %participant.marker,
        "participant joined"
    );

    // --- Step 2: message loop ---
    let result =
        run_session(&conn, &state, &participant_id, &room, &mut outbox_rx, &mut out)
            .await;

    tracing::info!(conn_id = %connection_id, %participant_id, "participant left");
    let _ = conn.close().await;
    result
    // _guard drops here → departure and session end fire.
}

/// Waits for the participant's `join` and seats them.
///
/// Returns `None` if the connection closes, sends `leave`, or misses the
/// join deadline.
async fn await_join<C: Codec>(
    conn: &WebSocketConnection,
    state: &ServerState<C>,
    participant_id: &ParticipantId,
    outbox: mpsc::UnboundedSender<ServerMessage>,
    out: &mut Outbound<'_, C>,
) -> Result<Option<Assignment>, DuoroomError> {
    let deadline = Deadline::now() + state.config.join_timeout;

    loop {
        let data = match timeout_at(deadline, conn.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => return Ok(None),
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                tracing::info!(%participant_id, "join timed out");
                return Ok(None);
            }
        };

        let envelope: Envelope<ClientMessage> = match state.codec.decode(&data) {
            Ok(env) => env,
            Err(e) => {
                tracing::debug!(%participant_id, error = %e, "failed to decode frame");
                out.send_error(&e).await?;
                continue;
            }
        };

        match envelope.message {
            ClientMessage::Join { name } => {
                let assignment = state
                    .registry
                    .assign(participant_id.clone(), name, outbox)
                    .await?;
                return Ok(Some(assignment));
            }
            ClientMessage::Heartbeat { client_time } => {
                out.heartbeat_ack(client_time).await?;
            }
            ClientMessage::Leave => return Ok(None),
            ClientMessage::Move { .. } | ClientMessage::Reset => {
                tracing::debug!(%participant_id, "message before join");
                out.send_error(&ProtocolError::InvalidMessage("join first".into()))
                    .await?;
            }
        }
    }
}

/// Relays between the socket and the room until the connection ends.
async fn run_session<C: Codec>(
    conn: &WebSocketConnection,
    state: &ServerState<C>,
    participant_id: &ParticipantId,
    room: &RoomHandle,
    outbox: &mut mpsc::UnboundedReceiver<ServerMessage>,
    out: &mut Outbound<'_, C>,
) -> Result<(), DuoroomError> {
    let idle_timeout = state.config.idle_timeout;
    let mut idle_deadline = idle_timeout.map(|t| Deadline::now() + t);

    loop {
        tokio::select! {
            Some(message) = outbox.recv() => {
                out.send(message).await?;
            }
            inbound = recv_before(conn, idle_deadline) => {
                let data = match inbound {
                    Ok(Ok(Some(data))) => data,
                    Ok(Ok(None)) => {
                        tracing::debug!(%participant_id, "connection closed cleanly");
                        return Ok(());
                    }
                    Ok(Err(e)) => return Err(e.into()),
                    Err(_) => {
                        tracing::info!(%participant_id, "connection idle, dropping");
                        return Ok(());
                    }
                };
                idle_deadline = idle_timeout.map(|t| Deadline::now() + t);

                let envelope: Envelope<ClientMessage> =
                    match state.codec.decode(&data) {
                        Ok(env) => env,
                        Err(e) => {
                            tracing::debug!(
                                %participant_id, error = %e, "failed to decode frame"
                            );
                            out.send_error(&e).await?;
                            continue;
                        }
                    };

                match envelope.message {
                    ClientMessage::Move { position } => {
                        room.submit_move(participant_id.clone(), position).await?;
                    }
                    ClientMessage::Reset => {
                        room.request_reset(participant_id.clone()).await?;
                    }
                    ClientMessage::Heartbeat { client_time } => {
                        out.heartbeat_ack(client_time).await?;
                    }
                    ClientMessage::Leave => return Ok(()),
                    ClientMessage::Join { .. } => {
                        out.send_error(&ProtocolError::InvalidMessage(
                            "already joined".into(),
                        ))
                        .await?;
                    }
                }
            }
        }
    }
}

/// Receives the next frame, giving up at `deadline` if one is set.
///
/// The outer `Err` means the deadline passed first.
async fn recv_before(
    conn: &WebSocketConnection,
    deadline: Option<Deadline>,
) -> Result<Result<Option<Vec<u8>>, TransportError>, Elapsed> {
    match deadline {
        Some(deadline) => timeout_at(deadline, conn.recv()).await,
        None => Ok(conn.recv().await),
    }
}
