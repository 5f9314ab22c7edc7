//! Per-connection handler: handshake, auth, and request routing.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Finish the WebSocket upgrade (bounded by the handshake timeout)
//!   2. Receive Handshake → validate version
//!   3. Authenticate token → get PlayerId
//!   4. Register the player → send HandshakeAck with the balance
//!   5. Loop: receive envelopes → answer system messages and requests

use std::sync::Arc;
use std::time::{Duration, Instant};

use minefield_ledger::LedgerStore;
use minefield_protocol::{
    ClientRequest, Codec, Envelope, Payload, PlayerId, ProtocolError, ServerResponse,
    SystemMessage,
};

use crate::server::{PROTOCOL_VERSION, ServerState};
use crate::transport::{
    Connection, Incoming, TransportError, WebSocketConnection, WebSocketIncoming,
};
use crate::{Authenticator, MinefieldError};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);
const IDLE_TIMEOUT: Duration = Duration::from_secs(15);

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<S, A, C>(
    incoming: WebSocketIncoming,
    state: Arc<ServerState<S, A, C>>,
) -> Result<(), MinefieldError>
where
    S: LedgerStore,
    A: Authenticator,
    C: Codec,
{
    let conn_id = incoming.id();
    let conn = match tokio::time::timeout(HANDSHAKE_TIMEOUT, incoming.upgrade()).await {
        Ok(conn) => conn?,
        Err(_) => {
            tracing::debug!(%conn_id, "WebSocket upgrade timed out");
            return Err(TransportError::ConnectionClosed("upgrade timed out".into()).into());
        }
    };
    tracing::debug!(%conn_id, "handling new connection");

    let start = Instant::now();
    let player_id = perform_handshake(&conn, &state, &start).await?;
    tracing::info!(%conn_id, %player_id, "player connected");

    let mut seq: u64 = 1;
    loop {
        let data = match tokio::time::timeout(IDLE_TIMEOUT, conn.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::info!(%player_id, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(%player_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                tracing::info!(%player_id, "connection timed out");
                break;
            }
        };

        let envelope: Envelope = match state.codec.decode(&data) {
            Ok(env) => env,
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "failed to decode envelope");
                send_error(&conn, &state.codec, 400, &e.to_string(), next_seq(&mut seq), &start)
                    .await?;
                continue;
            }
        };

        match envelope.payload {
            Payload::System(msg) => {
                let should_close =
                    handle_system_message(&conn, &state, &player_id, msg, &mut seq, &start)
                        .await?;
                if should_close {
                    break;
                }
            }
            Payload::Request(request) => {
                handle_request(&conn, &state, &player_id, request, &mut seq, &start).await?;
            }
            Payload::Response(_) => {
                tracing::debug!(%player_id, "ignoring response sent by client");
            }
        }
    }

    if let Err(e) = conn.close().await {
        tracing::debug!(%player_id, error = %e, "close failed");
    }
    Ok(())
}

/// Receives the Handshake, authenticates, registers, and sends the Ack.
async fn perform_handshake<S, A, C>(
    conn: &WebSocketConnection,
    state: &ServerState<S, A, C>,
    start: &Instant,
) -> Result<PlayerId, MinefieldError>
where
    S: LedgerStore,
    A: Authenticator,
    C: Codec,
{
    let data = match tokio::time::timeout(HANDSHAKE_TIMEOUT, conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(
                ProtocolError::InvalidMessage("connection closed before handshake".into()).into(),
            );
        }
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            return Err(ProtocolError::InvalidMessage("handshake timed out".into()).into());
        }
    };

    let envelope: Envelope = match state.codec.decode(&data) {
        Ok(env) => env,
        Err(e) => {
            send_error(conn, &state.codec, 400, &e.to_string(), 0, start).await?;
            return Err(e.into());
        }
    };

    let (version, token) = match envelope.payload {
        Payload::System(SystemMessage::Handshake { version, token }) => (version, token),
        _ => {
            send_error(conn, &state.codec, 400, "expected Handshake", 0, start).await?;
            return Err(
                ProtocolError::InvalidMessage("first message must be Handshake".into()).into(),
            );
        }
    };

    if version != PROTOCOL_VERSION {
        send_error(
            conn,
            &state.codec,
            400,
            &format!("version mismatch: expected {PROTOCOL_VERSION}, got {version}"),
            0,
            start,
        )
        .await?;
        return Err(ProtocolError::InvalidMessage("protocol version mismatch".into()).into());
    }

    let token = token.as_deref().unwrap_or("");
    let player_id = match state.auth.authenticate(token).await {
        Ok(pid) => pid,
        Err(e) => {
            send_error(conn, &state.codec, 401, &e.to_string(), 0, start).await?;
            return Err(e);
        }
    };

    let balance = match state.service.register(&player_id).await {
        Ok(balance) => balance,
        Err(e) => {
            send_error(conn, &state.codec, e.status_code(), &e.to_string(), 0, start).await?;
            return Err(e);
        }
    };

    let ack = Payload::System(SystemMessage::HandshakeAck {
        player_id: player_id.clone(),
        balance,
        server_time: elapsed_ms(start),
    });
    send_payload(conn, &state.codec, ack, 0, start).await?;

    Ok(player_id)
}

/// Handles a system message. Returns `true` if the connection should close.
async fn handle_system_message<S, A, C>(
    conn: &WebSocketConnection,
    state: &ServerState<S, A, C>,
    player_id: &PlayerId,
    msg: SystemMessage,
    seq: &mut u64,
    start: &Instant,
) -> Result<bool, MinefieldError>
where
    S: LedgerStore,
    A: Authenticator,
    C: Codec,
{
    match msg {
        SystemMessage::Heartbeat { client_time } => {
            let ack = Payload::System(SystemMessage::HeartbeatAck {
                client_time,
                server_time: elapsed_ms(start),
            });
            send_payload(conn, &state.codec, ack, next_seq(seq), start).await?;
        }
        SystemMessage::Disconnect { reason } => {
            tracing::info!(%player_id, %reason, "client disconnected");
            return Ok(true);
        }
        _ => {
            tracing::debug!(%player_id, "ignoring unexpected system message");
        }
    }
    Ok(false)
}

/// Runs one request against the service and answers with either the
/// matching response or an `Error`.
async fn handle_request<S, A, C>(
    conn: &WebSocketConnection,
    state: &ServerState<S, A, C>,
    player_id: &PlayerId,
    request: ClientRequest,
    seq: &mut u64,
    start: &Instant,
) -> Result<(), MinefieldError>
where
    S: LedgerStore,
    A: Authenticator,
    C: Codec,
{
    match dispatch(state, player_id, request).await {
        Ok(response) => {
            send_payload(
                conn,
                &state.codec,
                Payload::Response(response),
                next_seq(seq),
                start,
            )
            .await
        }
        Err(e) => {
            tracing::debug!(%player_id, error = %e, "request rejected");
            send_error(
                conn,
                &state.codec,
                e.status_code(),
                &e.to_string(),
                next_seq(seq),
                start,
            )
            .await
        }
    }
}

async fn dispatch<S, A, C>(
    state: &ServerState<S, A, C>,
    player_id: &PlayerId,
    request: ClientRequest,
) -> Result<ServerResponse, MinefieldError>
where
    S: LedgerStore,
{
    let service = &state.service;
    let response = match request {
        ClientRequest::StartRound {
            rows,
            cols,
            mines,
            stake,
        } => ServerResponse::RoundStarted {
            round: service
                .start_round(player_id, rows, cols, mines, stake)
                .await?,
        },
        ClientRequest::Reveal { cell } => {
            let report = service.reveal(player_id, cell).await?;
            ServerResponse::Revealed {
                cell: report.cell,
                outcome: report.outcome,
                round: report.round,
                settlement: report.settlement,
            }
        }
        ClientRequest::Cashout => {
            let report = service.cashout(player_id).await?;
            ServerResponse::CashedOut {
                outcome: report.outcome,
                round: report.round,
                settlement: report.settlement,
            }
        }
        ClientRequest::Resettle => ServerResponse::Resettled {
            settlement: service.resettle(player_id).await?,
        },
        ClientRequest::GetRound => ServerResponse::Round {
            round: service.round(player_id).await,
        },
        ClientRequest::GetBalance => ServerResponse::Balance {
            balance: service.balance(player_id).await?,
        },
        ClientRequest::Leaderboard { window } => ServerResponse::Leaderboard {
            window,
            entries: service.leaderboard(window).await?,
        },
    };
    Ok(response)
}

async fn send_payload(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    payload: Payload,
    seq: u64,
    start: &Instant,
) -> Result<(), MinefieldError> {
    let envelope = Envelope {
        seq,
        timestamp: elapsed_ms(start),
        payload,
    };
    let bytes = codec.encode(&envelope)?;
    conn.send(&bytes).await?;
    Ok(())
}

/// Sends a SystemMessage::Error envelope to the client.
async fn send_error(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    code: u16,
    message: &str,
    seq: u64,
    start: &Instant,
) -> Result<(), MinefieldError> {
    let payload = Payload::System(SystemMessage::Error {
        code,
        message: message.to_string(),
    });
    send_payload(conn, codec, payload, seq, start).await
}

fn elapsed_ms(start: &Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Increments and returns the next sequence number.
fn next_seq(seq: &mut u64) -> u64 {
    let current = *seq;
    *seq += 1;
    current
}
