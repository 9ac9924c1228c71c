//! The `/ws` socket handler: splits the connection, spawns a dedicated
//! writer task so outbound sends never block on inbound awaits, and
//! dispatches parsed messages to `AppState`'s orchestration methods.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::GameErrorCode;
use crate::state::SharedState;

use super::dto::{AdminAction, InboundMessage, OutboundMessage};

/// Drive one client connection end to end. Runs until the socket closes or
/// errors; all cleanup (disconnect grace, connection deregistration) is
/// handled here before returning.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let conn_id = Uuid::new_v4();
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    let writer_task: JoinHandle<()> = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    state.register_connection(conn_id, outbound_tx.clone());

    let mut player_name: Option<String> = None;

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                handle_inbound_text(&state, conn_id, &mut player_name, &text).await;
            }
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) | Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(error = %err, "websocket receive error");
                break;
            }
        }
    }

    state.unregister_connection(conn_id);
    if let Some(name) = player_name {
        handle_disconnect(&state, &name).await;
    }

    finalize(writer_task, outbound_tx).await;
}

async fn handle_disconnect(state: &SharedState, name: &str) {
    let is_admin = state.with_game(|g| g.players.get(name).map(|p| p.is_admin).unwrap_or(false)).await;
    if is_admin {
        state.schedule_admin_pause(name.to_string()).await;
    } else {
        state.schedule_player_removal(name.to_string()).await;
    }
    info!(player = name, "player disconnected, grace period scheduled");
}

async fn handle_inbound_text(state: &SharedState, conn_id: Uuid, player_name: &mut Option<String>, text: &str) {
    let inbound: InboundMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(err) => {
            warn!(error = %err, "failed to parse inbound message");
            state.send_to(conn_id, &OutboundMessage::error(GameErrorCode::InvalidAction));
            return;
        }
    };

    match inbound {
        InboundMessage::Join { name, is_admin } => {
            handle_join(state, conn_id, player_name, &name, is_admin).await;
        }
        InboundMessage::Submit { year, bet } => {
            handle_submit(state, conn_id, player_name, year, bet).await;
        }
        InboundMessage::SubmitArtist { artist } => {
            handle_submit_artist(state, conn_id, player_name, &artist).await;
        }
        InboundMessage::Admin { action, direction } => {
            handle_admin(state, conn_id, player_name, action, direction).await;
        }
        InboundMessage::GetState => {
            let snapshot = state.snapshot().await;
            state.send_to(conn_id, &OutboundMessage::State(Box::new(snapshot)));
        }
    }
}

async fn handle_join(
    state: &SharedState,
    conn_id: Uuid,
    player_name: &mut Option<String>,
    name: &str,
    is_admin: bool,
) {
    let result = state.with_game_mut(|game| game.join(name, is_admin)).await;
    match result {
        Ok(_reconnected) => {
            state.bind_player(name, conn_id);
            state.cancel_disconnect_task(name);
            *player_name = Some(name.to_string());

            let was_admin_reconnect = is_admin
                && state
                    .with_game(|g| g.players.disconnected_admin_name() == Some(name))
                    .await;
            if was_admin_reconnect {
                state.cancel_admin_pause_task().await;
                let _ = state.with_game_mut(|g| g.admin_reconnect()).await;
            }

            info!(player = name, is_admin, "player joined");
            let snapshot = state.snapshot().await;
            state.send_to(conn_id, &OutboundMessage::State(Box::new(snapshot)));
            state.broadcast_state().await;
        }
        Err(code) => {
            state.send_to(conn_id, &OutboundMessage::error(code));
        }
    }
}

async fn handle_submit(state: &SharedState, conn_id: Uuid, player_name: &Option<String>, year: i32, bet: bool) {
    let Some(name) = player_name else {
        state.send_to(conn_id, &OutboundMessage::error(GameErrorCode::NotInGame));
        return;
    };

    let result = state.with_game_mut(|game| game.submit_guess(name, year, bet)).await;
    match result {
        Ok(()) => {
            state.send_to(conn_id, &OutboundMessage::SubmitAck { year });
            state.broadcast_state().await;

            let all_done = state.with_game(|g| g.all_connected_submitters_complete()).await;
            if all_done {
                state.reveal_round(true).await;
            }
        }
        Err(code) => {
            state.send_to(conn_id, &OutboundMessage::error(code));
        }
    }
}

async fn handle_submit_artist(state: &SharedState, conn_id: Uuid, player_name: &Option<String>, artist: &str) {
    let Some(name) = player_name else {
        state.send_to(conn_id, &OutboundMessage::error(GameErrorCode::NotInGame));
        return;
    };

    let result = state.with_game_mut(|game| game.submit_artist(name, artist)).await;
    if let Err(code) = result {
        state.send_to(conn_id, &OutboundMessage::error(code));
        return;
    }
    state.broadcast_state().await;
}

async fn handle_admin(
    state: &SharedState,
    conn_id: Uuid,
    player_name: &Option<String>,
    action: AdminAction,
    direction: Option<super::dto::VolumeDirection>,
) {
    let Some(name) = player_name else {
        state.send_to(conn_id, &OutboundMessage::error(GameErrorCode::NotAdmin));
        return;
    };
    let is_admin = state.with_game(|g| g.players.get(name).map(|p| p.is_admin).unwrap_or(false)).await;
    if !is_admin {
        state.send_to(conn_id, &OutboundMessage::error(GameErrorCode::NotAdmin));
        return;
    }

    match action {
        AdminAction::StartGame => {
            state.begin_round().await;
        }
        AdminAction::NextRound => {
            let phase = state.with_game(|g| g.phase).await;
            if phase == crate::game::state_machine::GamePhase::Playing {
                state.reveal_round(true).await;
            } else {
                state.advance_from_reveal().await;
            }
        }
        AdminAction::StopSong => match state.stop_song().await {
            Ok(true) => state.broadcast(&OutboundMessage::SongStopped),
            Ok(false) => {}
            Err(code) => state.send_to(conn_id, &OutboundMessage::error(code)),
        },
        AdminAction::SetVolume => {
            let up = matches!(direction, Some(super::dto::VolumeDirection::Up));
            match state.adjust_volume(up).await {
                Ok(level) => state.broadcast(&OutboundMessage::VolumeChanged { level }),
                Err(code) => state.send_to(conn_id, &OutboundMessage::error(code)),
            }
        }
        AdminAction::EndGame => {
            state.end_game().await;
        }
    }
}

async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
