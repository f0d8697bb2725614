/**
 * WebSocket Transport
 *
 * `GET /messaging` upgrades to a WebSocket once the bearer credential has
 * been verified. The credential comes from the `Authorization` header or,
 * for browser clients that cannot set headers, from `?token=`. Anything
 * missing or invalid is rejected with 401 before the upgrade.
 *
 * # Connection task
 *
 * One task per socket. It admits the connection, sends `ready`, then
 * alternates between inbound frames (dispatched one at a time, in order)
 * and room events from the inbox. When the socket closes the connection is
 * evicted and its subscriptions are dropped with the inbox.
 */

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{header::AUTHORIZATION, HeaderMap},
    response::Response,
};
use futures_util::{Sink, SinkExt, StreamExt};
use serde::Deserialize;

use super::connection::ConnectionHandle;
use super::gateway::Gateway;
use crate::backend::auth::{extract_bearer, Identity};
use crate::backend::error::GatewayError;
use crate::backend::server::state::AppState;
use crate::shared::{ClientIntent, ServerEvent};

#[derive(Debug, Default, Deserialize)]
pub struct SocketParams {
    pub token: Option<String>,
}

/// Upgrade handler for `GET /messaging`
pub async fn messaging_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<SocketParams>,
) -> Result<Response, GatewayError> {
    let credential = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .or(params.token.as_deref())
        .and_then(extract_bearer)
        .ok_or_else(|| {
            tracing::warn!("[Gateway] Socket upgrade without credential");
            GatewayError::unauthorized("Missing credential")
        })?;

    let identity = state.verifier.verify(credential).await?;
    if state.gateway.store().get_user(identity.user_id).await?.is_none() {
        tracing::warn!("[Gateway] Token for unknown user {}", identity.user_id);
        return Err(GatewayError::unauthorized("Unknown user"));
    }

    let gateway = state.gateway.clone();
    Ok(ws.on_upgrade(move |socket| run_connection(socket, gateway, identity)))
}

async fn send_event(
    sink: &mut (impl Sink<Message, Error = axum::Error> + Unpin),
    event: &ServerEvent,
) -> Result<(), axum::Error> {
    match event.to_frame() {
        Ok(frame) => sink.send(Message::Text(frame.into())).await,
        Err(err) => {
            tracing::error!("[Gateway] Failed to encode {}: {}", event.event_name(), err);
            Ok(())
        }
    }
}

/// Drive one admitted socket until either side goes away
pub async fn run_connection(socket: WebSocket, gateway: Arc<Gateway>, identity: Identity) {
    let user_id = identity.user_id;
    let (handle, mut inbox) = ConnectionHandle::new(user_id);
    let (mut sink, mut stream) = socket.split();

    let rooms = match gateway.admit(&handle, Some(identity)).await {
        Ok(rooms) => rooms,
        Err(err) => {
            let _ = send_event(&mut sink, &err.to_event()).await;
            let _ = sink.close().await;
            return;
        }
    };

    let ready = ServerEvent::Ready {
        user_id,
        rooms: rooms.iter().map(ToString::to_string).collect(),
    };
    if send_event(&mut sink, &ready).await.is_err() {
        gateway.evict(&handle);
        return;
    }

    loop {
        tokio::select! {
            frame = stream.next() => {
                let reply = match frame {
                    Some(Ok(Message::Text(text))) => Some(handle_frame(&gateway, &handle, text.as_str()).await),
                    Some(Ok(Message::Binary(_))) => {
                        Some(GatewayError::invalid("Binary frames are not supported").to_event())
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => None,
                    Some(Err(err)) => {
                        tracing::debug!("[Gateway] Socket error for user {}: {}", user_id, err);
                        break;
                    }
                };
                if let Some(reply) = reply {
                    if send_event(&mut sink, &reply).await.is_err() {
                        break;
                    }
                }
            }
            event = inbox.recv() => {
                let Some(event) = event else { break };
                if send_event(&mut sink, &event).await.is_err() {
                    break;
                }
            }
        }
    }

    gateway.evict(&handle);
}

async fn handle_frame(gateway: &Gateway, handle: &ConnectionHandle, frame: &str) -> ServerEvent {
    let result = match ClientIntent::parse(frame) {
        Ok(intent) => gateway.dispatch(handle, intent).await,
        Err(err) => Err(err.into()),
    };
    result.unwrap_or_else(|err| {
        tracing::debug!("[Gateway] Intent rejected for connection {}: {}", handle.id(), err);
        err.to_event()
    })
}
