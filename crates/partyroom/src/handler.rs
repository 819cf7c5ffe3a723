//! Per-connection handler: registration, command routing, and cleanup.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   0. Complete the WebSocket handshake (bounded by a timeout)
//!   1. Register an outbound event channel with the registry
//!   2. Spawn a writer task that encodes events onto the socket
//!   3. Loop: receive frames → decode `ClientCommand` → submit to registry
//!   4. On exit, a drop guard reports the disconnect

use std::sync::Arc;
use std::time::Duration;

use partyroom_protocol::{ClientCommand, Codec, ServerEvent};
use partyroom_room::RegistryHandle;
use partyroom_transport::{
    Connection, ConnectionId, Incoming, WebSocketConnection, WebSocketIncoming,
};
use tokio::sync::mpsc;

use crate::PartyroomError;
use crate::server::ServerState;

/// How long a peer may take to finish the WebSocket upgrade.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Drop guard that reports the disconnect when the handler exits.
///
/// Runs on every exit path, panics included. `Drop` is synchronous, so the
/// disconnect is sent from a fire-and-forget task.
struct ConnectionGuard {
    conn_id: ConnectionId,
    registry: RegistryHandle,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let registry = self.registry.clone();
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        runtime.spawn(async move {
            if let Err(e) = registry.disconnect(conn_id).await {
                tracing::debug!(%conn_id, error = %e, "disconnect not delivered");
            }
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    incoming: WebSocketIncoming,
    state: Arc<ServerState<C>>,
) -> Result<(), PartyroomError> {
    let conn_id = incoming.id();
    tracing::debug!(%conn_id, peer = %incoming.peer_addr(), "handling new connection");

    let conn = match tokio::time::timeout(HANDSHAKE_TIMEOUT, incoming.establish()).await {
        Ok(established) => established?,
        Err(_) => {
            tracing::debug!(%conn_id, "handshake timed out");
            return Ok(());
        }
    };

    let conn = Arc::new(conn);
    let (tx, rx) = mpsc::unbounded_channel();
    state.registry.connect(conn_id, tx.clone()).await?;
    let _guard = ConnectionGuard {
        conn_id,
        registry: state.registry.clone(),
    };

    let writer = tokio::spawn(write_events(Arc::clone(&conn), Arc::clone(&state), rx));

    loop {
        let received = match state.idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, conn.recv()).await {
                Ok(received) => received,
                Err(_) => {
                    tracing::info!(%conn_id, "connection idle, closing");
                    break;
                }
            },
            None => conn.recv().await,
        };

        let data = match received {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::debug!(%conn_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
        };

        let command: ClientCommand = match state.codec.decode(&data) {
            Ok(command) => command,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "failed to decode command");
                let _ = tx.send(ServerEvent::Error {
                    message: e.to_string(),
                });
                continue;
            }
        };

        tracing::debug!(%conn_id, command = command.name(), "command received");
        state.registry.submit(conn_id, command).await?;
    }

    writer.abort();
    if let Err(e) = conn.close().await {
        tracing::trace!(%conn_id, error = %e, "close after disconnect");
    }

    // _guard drops here → registry disconnect fires.
    Ok(())
}

/// Drains a connection's event channel onto the socket.
async fn write_events<C: Codec>(
    conn: Arc<WebSocketConnection>,
    state: Arc<ServerState<C>>,
    mut rx: mpsc::UnboundedReceiver<ServerEvent>,
) {
    let conn_id = conn.id();
    while let Some(event) = rx.recv().await {
        let bytes = match state.codec.encode(&event) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(%conn_id, event = event.name(), error = %e, "failed to encode event");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(%conn_id, error = %e, "send failed, stopping writer");
            break;
        }
    }
}
