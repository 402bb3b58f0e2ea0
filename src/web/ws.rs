use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::api::BarPayload;
use super::AppState;
use crate::config::EngineConfig;
use crate::engine::{EngineContext, EngineError};

/// Commands a socket client may send; each mirrors a REST route.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WsCommand {
    Initialize {
        #[serde(default)]
        config: Option<EngineConfig>,
    },
    LoadData {
        filename: String,
    },
    Train,
    ProcessData {
        data: BarPayload,
    },
    GetTree,
    GetStatus,
}

impl WsCommand {
    fn name(&self) -> &'static str {
        match self {
            WsCommand::Initialize { .. } => "initialize",
            WsCommand::LoadData { .. } => "loadData",
            WsCommand::Train => "train",
            WsCommand::ProcessData { .. } => "processData",
            WsCommand::GetTree => "getTree",
            WsCommand::GetStatus => "getStatus",
        }
    }
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_websocket(socket, state))
}

async fn handle_websocket(socket: WebSocket, state: AppState) {
    let id = Uuid::new_v4();
    let (mut sender, mut receiver) = socket.split();
    let mut events = state.context.events().subscribe();
    let (reply_tx, mut reply_rx) = mpsc::channel::<Value>(32);

    info!(
        "WebSocket client {} connected ({} event subscribers)",
        id,
        state.context.events().subscriber_count()
    );

    let initial = json!({ "type": "STATUS", "status": state.context.status().await });
    if reply_tx.send(initial).await.is_err() {
        return;
    }

    // Single writer: engine events and command replies share the sink.
    let send_task = tokio::spawn(async move {
        loop {
            let outgoing = tokio::select! {
                event = events.next() => match event {
                    Some(event) => serde_json::to_value(&event).ok(),
                    None => break,
                },
                reply = reply_rx.recv() => match reply {
                    Some(reply) => Some(reply),
                    None => break,
                },
            };
            let Some(outgoing) = outgoing else { continue };
            if sender.send(Message::Text(outgoing.to_string())).await.is_err() {
                break;
            }
        }
        if events.missed() > 0 {
            warn!("WebSocket client {} missed {} events", id, events.missed());
        }
    });

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let reply = match serde_json::from_str::<WsCommand>(&text) {
                    Ok(command) => {
                        debug!("WebSocket client {} sent {}", id, command.name());
                        run_command(&state.context, command).await
                    }
                    Err(e) => json!({ "type": "ERROR", "kind": "BadCommand", "message": e.to_string() }),
                };
                if reply_tx.send(reply).await.is_err() {
                    break;
                }
            }
            Ok(Message::Close(_)) => {
                info!("WebSocket client {} disconnected", id);
                break;
            }
            Err(e) => {
                error!("WebSocket client {} error: {}", id, e);
                break;
            }
            _ => {}
        }
    }

    send_task.abort();
}

/// Runs one command and shapes the reply that goes back on the socket.
pub async fn run_command(context: &EngineContext, command: WsCommand) -> Value {
    let name = command.name();
    let result: Result<Value, EngineError> = async {
        match command {
            WsCommand::Initialize { config } => {
                let config = context.initialize(config).await?;
                Ok(json!({ "config": config }))
            }
            WsCommand::LoadData { filename } => {
                let bars = context.load_data(&filename).await?;
                Ok(json!({ "bars": bars }))
            }
            WsCommand::Train => {
                let report = context.train().await?;
                let tree = context.tree_snapshot().await?;
                Ok(json!({ "report": report, "tree": tree }))
            }
            WsCommand::ProcessData { data } => {
                let bar = data.into_bar();
                let decision = context.process_new_data(bar).await?;
                Ok(json!({ "decision": decision, "data": bar }))
            }
            WsCommand::GetTree => Ok(json!({ "tree": context.tree_snapshot().await? })),
            WsCommand::GetStatus => Ok(json!({ "status": context.status().await })),
        }
    }
    .await;

    match result {
        Ok(body) => json!({ "type": "REPLY", "command": name, "result": body }),
        Err(e) => json!({
            "type": "ERROR",
            "command": name,
            "kind": e.kind(),
            "message": e.to_string(),
        }),
    }
}
