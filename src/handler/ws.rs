// handler/ws.rs
//
// WebSocket endpoint for realtime pushes. Clients subscribe to rooms after
// connecting; every subscription is authorized against the database before
// any events flow. Pushes are one-way: the only client-to-server frames are
// subscribe/unsubscribe/ping control messages.
use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
    Extension, Router,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{
    db::{chatdb::ChatExt, projectdb::ProjectExt},
    middleware::JWTAuthMiddleware,
    models::usermodel::User,
    service::socket::{user_room, SocketEvent},
    AppState,
};

pub fn ws_handler() -> Router {
    Router::new().route("/", get(upgrade))
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum ClientFrame {
    Subscribe { room: String },
    Unsubscribe { room: String },
    Ping,
}

async fn upgrade(
    ws: WebSocketUpgrade,
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddleware>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, auth.user))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>, user: User) {
    let (mut sink, mut stream) = socket.split();

    // All room forwarders funnel into one outbound channel
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<SocketEvent>(64);

    let mut forwarders: HashMap<String, tokio::task::JoinHandle<()>> = HashMap::new();

    // Every connection listens on its own user room
    let own_room = user_room(user.id);
    forwarders.insert(
        own_room.clone(),
        spawn_forwarder(&app_state, &own_room, outbound_tx.clone()).await,
    );

    let send_task = tokio::spawn(async move {
        while let Some(event) = outbound_rx.recv().await {
            let Ok(text) = serde_json::to_string(&event) else {
                continue;
            };
            if sink.send(WsMessage::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = stream.next().await {
        let text = match message {
            WsMessage::Text(text) => text,
            WsMessage::Close(_) => break,
            _ => continue,
        };

        let frame: ClientFrame = match serde_json::from_str(&text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::debug!("ignoring malformed ws frame from {}: {}", user.id, e);
                continue;
            }
        };

        match frame {
            ClientFrame::Subscribe { room } => {
                if forwarders.contains_key(&room) {
                    continue;
                }
                match authorize_room(&app_state, &user, &room).await {
                    Ok(true) => {
                        forwarders.insert(
                            room.clone(),
                            spawn_forwarder(&app_state, &room, outbound_tx.clone()).await,
                        );
                    }
                    Ok(false) => {
                        tracing::debug!("user {} denied room {}", user.id, room);
                    }
                    Err(e) => {
                        tracing::warn!("room authorization failed: {}", e);
                    }
                }
            }
            ClientFrame::Unsubscribe { room } => {
                if let Some(task) = forwarders.remove(&room) {
                    task.abort();
                }
            }
            ClientFrame::Ping => {
                let _ = outbound_tx
                    .send(SocketEvent {
                        room: String::new(),
                        event: "pong".to_string(),
                        data: serde_json::Value::Null,
                    })
                    .await;
            }
        }
    }

    for (_, task) in forwarders {
        task.abort();
    }
    send_task.abort();
    app_state.socket_hub.prune().await;
}

async fn spawn_forwarder(
    app_state: &Arc<AppState>,
    room: &str,
    outbound: mpsc::Sender<SocketEvent>,
) -> tokio::task::JoinHandle<()> {
    let mut receiver = app_state.socket_hub.subscribe(room).await;
    tokio::spawn(async move {
        // Lagged receivers skip to the newest events rather than closing
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if outbound.send(event).await.is_err() {
                        break;
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

/// Room grammar: "conversation:<uuid>", "project:<uuid>", "user:<uuid>".
async fn authorize_room(
    app_state: &Arc<AppState>,
    user: &User,
    room: &str,
) -> Result<bool, sqlx::Error> {
    let Some((kind, id)) = room.split_once(':') else {
        return Ok(false);
    };
    let Ok(id) = Uuid::parse_str(id) else {
        return Ok(false);
    };

    match kind {
        "user" => Ok(id == user.id),
        "conversation" => {
            let conversation = app_state.db_client.get_conversation_by_id(id).await?;
            Ok(conversation
                .map(|c| c.is_participant(user.id))
                .unwrap_or(false))
        }
        "project" => {
            let project = app_state.db_client.get_project_by_id(id).await?;
            Ok(project
                .map(|p| {
                    p.client_id == user.id || p.assigned_freelancer_id == Some(user.id)
                })
                .unwrap_or(false))
        }
        _ => Ok(false),
    }
}
