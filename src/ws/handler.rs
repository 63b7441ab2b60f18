//! WebSocket upgrade handler and per-connection session

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{CyclicPolicy, MatchRegistry, MatchSetup, Side};
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, OpponentKind, ServerMsg};

/// Messages queued for one connection before the writer falls behind
const OUTBOX_CAPACITY: usize = 64;

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Identity to resume after a reconnect; a fresh one is assigned otherwise
    #[serde(default)]
    pub player_id: Option<Uuid>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    let user_id = query.player_id.unwrap_or_else(Uuid::new_v4);
    info!(user_id = %user_id, "WebSocket upgrade");
    ws.on_upgrade(move |socket| handle_socket(socket, user_id, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, user_id: Uuid, state: AppState) {
    info!(user_id = %user_id, "New WebSocket connection");

    let (mut ws_sink, mut ws_stream) = socket.split();
    let (outbox_tx, mut outbox_rx) = mpsc::channel::<ServerMsg>(OUTBOX_CAPACITY);

    // Writer task: outbox -> WebSocket
    let writer_handle = tokio::spawn(async move {
        while let Some(msg) = outbox_rx.recv().await {
            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(user_id = %user_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    let mut session = Session::new(user_id, state.match_registry.clone(), outbox_tx);
    session
        .send(ServerMsg::Welcome {
            user_id,
            server_time: unix_millis(),
        })
        .await;

    // Reader loop: WebSocket -> match actors
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => session.on_text(&text).await,
            Ok(Message::Binary(_)) => {
                warn!(user_id = %user_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(user_id = %user_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(user_id = %user_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    session.unfollow();
    writer_handle.abort();

    info!(user_id = %user_id, "WebSocket connection closed");
}

/// State of one connection. Matches keep running when it goes away; the
/// lock-in timer resolves turns whether or not anyone is listening.
struct Session {
    user_id: Uuid,
    registry: Arc<MatchRegistry>,
    outbox: mpsc::Sender<ServerMsg>,
    forwarder: Option<JoinHandle<()>>,
    limiter: ConnectionRateLimiter,
}

impl Session {
    fn new(user_id: Uuid, registry: Arc<MatchRegistry>, outbox: mpsc::Sender<ServerMsg>) -> Self {
        Self {
            user_id,
            registry,
            outbox,
            forwarder: None,
            limiter: ConnectionRateLimiter::new(),
        }
    }

    async fn send(&self, msg: ServerMsg) {
        if self.outbox.send(msg).await.is_err() {
            debug!(user_id = %self.user_id, "Outbox closed");
        }
    }

    /// Rate-limit, parse and dispatch one text frame
    async fn on_text(&mut self, text: &str) {
        if !self.limiter.check_message() {
            warn!(user_id = %self.user_id, "Rate limited client message");
            self.send(ServerMsg::error("rate_limited", "Too many messages"))
                .await;
            return;
        }

        match serde_json::from_str::<ClientMsg>(text) {
            Ok(msg) => self.handle(msg).await,
            Err(e) => {
                warn!(user_id = %self.user_id, error = %e, "Failed to parse client message");
                self.send(ServerMsg::error("invalid_payload", e.to_string()))
                    .await;
            }
        }
    }

    async fn handle(&mut self, msg: ClientMsg) {
        match msg {
            ClientMsg::StartMatch { opponent } => self.start_match(opponent).await,
            ClientMsg::JoinMatch { match_id } => self.join_match(match_id).await,
            ClientMsg::SubmitInput {
                match_id,
                turn_index,
                beat,
                action,
            } => {
                let Some(handle) = self.registry.get(&match_id) else {
                    debug!(user_id = %self.user_id, match_id = %match_id, "Input for unknown match");
                    return;
                };
                if let Err(reason) = handle
                    .submit_input(self.user_id, turn_index, beat, action)
                    .await
                {
                    self.send(ServerMsg::InputRejected {
                        turn_index,
                        beat,
                        reason,
                    })
                    .await;
                }
            }
            ClientMsg::Ping { t } => self.send(ServerMsg::Pong { t }).await,
            ClientMsg::LeaveMatch => self.unfollow(),
        }
    }

    async fn start_match(&mut self, opponent: OpponentKind) {
        if !self.limiter.check_start() {
            self.send(ServerMsg::error("rate_limited", "Too many matches started"))
                .await;
            return;
        }

        let setup = match opponent {
            OpponentKind::Cpu => MatchSetup::vs_cpu(self.user_id, Arc::new(CyclicPolicy::default())),
            OpponentKind::Human => MatchSetup::vs_human(self.user_id),
        };
        let (match_id, events) = self.registry.create(setup);

        self.send(ServerMsg::SideAssigned {
            match_id,
            side: Side::P1,
        })
        .await;
        self.follow(match_id, events);
    }

    async fn join_match(&mut self, match_id: Uuid) {
        let Some(handle) = self.registry.get(&match_id) else {
            self.send(ServerMsg::error("match_not_found", "No such match"))
                .await;
            return;
        };

        match handle.join(self.user_id).await {
            Ok(side) => {
                let events = handle.subscribe();
                self.send(ServerMsg::SideAssigned { match_id, side }).await;
                if let Some(snapshot) = handle.snapshot().await {
                    self.send(ServerMsg::MatchSnapshot(snapshot)).await;
                }
                self.follow(match_id, events);
            }
            Err(e) => {
                self.send(ServerMsg::error("join_failed", e.to_string()))
                    .await;
            }
        }
    }

    /// Forward a match's broadcasts to this connection, replacing any previous match
    fn follow(&mut self, match_id: Uuid, mut events: broadcast::Receiver<ServerMsg>) {
        self.unfollow();

        let outbox = self.outbox.clone();
        let user_id = self.user_id;
        self.forwarder = Some(tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(msg) => {
                        if outbox.send(msg).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(
                            user_id = %user_id,
                            match_id = %match_id,
                            lagged_count = n,
                            "Client lagged, skipped {} match events", n
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!(user_id = %user_id, match_id = %match_id, "Match event stream closed");
                        break;
                    }
                }
            }
        }));
    }

    fn unfollow(&mut self) {
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }
    }
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::MatchRules;
    use crate::store::NullSink;

    fn session() -> (Session, mpsc::Receiver<ServerMsg>) {
        let registry = Arc::new(MatchRegistry::new(MatchRules::default(), Arc::new(NullSink)));
        let (outbox, rx) = mpsc::channel(OUTBOX_CAPACITY);
        (Session::new(Uuid::new_v4(), registry, outbox), rx)
    }

    fn error_code(msg: &ServerMsg) -> Option<&str> {
        match msg {
            ServerMsg::Error { code, .. } => Some(code.as_str()),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_rate_limited_message_is_reported_to_client() {
        let (mut session, mut rx) = session();
        for t in 0..30u64 {
            session
                .on_text(&format!(r#"{{"type":"ping","t":{}}}"#, t))
                .await;
        }

        let mut pongs = 0;
        let mut limited = 0;
        while let Ok(msg) = rx.try_recv() {
            match &msg {
                ServerMsg::Pong { .. } => pongs += 1,
                other if error_code(other) == Some("rate_limited") => limited += 1,
                other => panic!("unexpected message: {:?}", other),
            }
        }
        assert_eq!(pongs + limited, 30);
        assert!(limited > 0, "no message was rate limited");
        assert!(pongs >= 1);
    }

    #[tokio::test]
    async fn test_malformed_frame_gets_invalid_payload() {
        let (mut session, mut rx) = session();
        session
            .on_text(r#"{"type":"submit_input","beat":3}"#)
            .await;
        let msg = rx.try_recv().unwrap();
        assert_eq!(error_code(&msg), Some("invalid_payload"));
    }
}
