// region:    --- Imports
use crate::bidding::commands::{
    handle_complete_checkout, handle_decide_bid, handle_place_bid, DecideBidCommand,
    DecisionOutcome, PlaceBidCommand,
};
use crate::bidding::locks::AuctionLocks;
use crate::bidding::BidError;
use crate::presence::{ChannelTransport, NotificationRouter, PresenceRegistry};
use crate::query;
use crate::store::AuctionStore;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

// endregion: --- Imports

// region:    --- App State

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AuctionStore>,
    pub locks: Arc<AuctionLocks>,
    pub registry: Arc<PresenceRegistry>,
    pub transport: Arc<ChannelTransport>,
    pub router: Arc<NotificationRouter>,
}

// endregion: --- App State

// region:    --- Error Mapping

/// 오류 응답 생성
/// 모든 오류는 코드와 구체적인 메시지를 담아 내려보낸다.
fn error_response(e: &BidError) -> Response {
    let status = match e {
        BidError::AuctionNotFound(_) | BidError::BidNotFound(_) => StatusCode::NOT_FOUND,
        BidError::AuctionClosed(_) | BidError::BidTooLow { .. } | BidError::BidTooHigh { .. } => {
            StatusCode::BAD_REQUEST
        }
        BidError::Unauthorized => StatusCode::FORBIDDEN,
        BidError::AlreadyDecided(_) | BidError::NotAccepted(_) => StatusCode::CONFLICT,
        BidError::Busy => StatusCode::SERVICE_UNAVAILABLE,
        BidError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let mut body = serde_json::json!({
        "error": e.to_string(),
        "code": e.code(),
    });
    // 다음 입찰에 바로 쓸 수 있는 기준 금액을 함께 내려보낸다
    match e {
        BidError::BidTooLow { minimum } => {
            body["minimum_bid"] = serde_json::json!(minimum);
        }
        BidError::BidTooHigh { maximum } => {
            body["maximum_bid"] = serde_json::json!(maximum);
        }
        _ => {}
    }

    (status, Json(body)).into_response()
}

// endregion: --- Error Mapping

// region:    --- Command Handlers

/// 입찰 요청 처리
pub async fn handle_bid(
    State(state): State<AppState>,
    Json(cmd): Json<PlaceBidCommand>,
) -> impl IntoResponse {
    info!("{:<12} --> 입찰 요청 수신: {:?}", "Handler", cmd);

    match handle_place_bid(cmd, state.store.as_ref(), &state.locks, &state.router).await {
        Ok(receipt) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "message": "입찰이 성공적으로 처리되었습니다.",
                "bid_id": receipt.bid.id,
                "current_price": receipt.bid.bid_amount,
                "checkout": receipt.checkout,
            })),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

/// 입찰 결정 요청 처리 (수락/거절)
pub async fn handle_decision(
    State(state): State<AppState>,
    Path(bid_id): Path<i64>,
    Json(cmd): Json<DecideBidCommand>,
) -> impl IntoResponse {
    info!(
        "{:<12} --> 입찰 결정 요청 수신 bid_id: {}, {:?}",
        "Handler", bid_id, cmd
    );

    match handle_decide_bid(bid_id, cmd, state.store.as_ref(), &state.locks, &state.router).await {
        Ok(DecisionOutcome::Accepted(token)) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "ACCEPTED",
                "checkout": token,
            })),
        )
            .into_response(),
        Ok(DecisionOutcome::Rejected) => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "REJECTED" })),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

/// 체크아웃 완료 보고 처리 (결제 서비스 콜백)
pub async fn handle_checkout_complete(
    State(state): State<AppState>,
    Path(bid_id): Path<i64>,
) -> impl IntoResponse {
    info!(
        "{:<12} --> 체크아웃 완료 보고 수신 bid_id: {}",
        "Handler", bid_id
    );

    match handle_complete_checkout(bid_id, state.store.as_ref(), &state.locks).await {
        Ok(bid) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "COMPLETED",
                "bid_id": bid.id,
            })),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

// endregion: --- Command Handlers

// region:    --- Query Handlers

/// 경매 상태 조회
pub async fn handle_get_auction_state(
    State(state): State<AppState>,
    Path(auction_id): Path<i64>,
) -> impl IntoResponse {
    match query::handlers::get_auction_state(state.store.as_ref(), auction_id).await {
        Ok(Some(view)) => Json(view).into_response(),
        Ok(None) => error_response(&BidError::AuctionNotFound(auction_id)),
        Err(e) => error_response(&BidError::Store(e)),
    }
}

/// 최선 입찰가 조회
pub async fn handle_get_highest_bid(
    State(state): State<AppState>,
    Path(auction_id): Path<i64>,
) -> impl IntoResponse {
    match query::handlers::get_highest_bid(state.store.as_ref(), auction_id).await {
        Ok(highest) => Json(highest).into_response(),
        Err(e) => error_response(&BidError::Store(e)),
    }
}

/// 입찰 이력 조회
pub async fn handle_get_bid_history(
    State(state): State<AppState>,
    Path(auction_id): Path<i64>,
) -> impl IntoResponse {
    match query::handlers::get_bid_history(state.store.as_ref(), auction_id).await {
        Ok(history) => Json(history).into_response(),
        Err(e) => error_response(&BidError::Store(e)),
    }
}

// endregion: --- Query Handlers

// region:    --- WebSocket Handler

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub user_id: i64,
}

/// 실시간 알림 웹소켓
/// 접속 시 접속 레지스트리에 등록되고, 라우팅된 이벤트를 JSON 프레임으로 받는다.
/// user_id 쿼리 파라미터는 범위 밖인 인증 계층을 대신한다.
pub async fn handle_ws(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, params.user_id, socket))
}

async fn handle_socket(state: AppState, user_id: i64, socket: WebSocket) {
    let (connection_id, mut events) = state.transport.register();
    state.registry.add_user(user_id, connection_id);

    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                match serde_json::to_string(&event) {
                    Ok(json) => {
                        if ws_tx.send(Message::Text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => debug!(
                        "{:<12} --> 이벤트 직렬화 오류: {:?}",
                        "WebSocket", e
                    ),
                }
            }
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Ping(payload))) => {
                        if ws_tx.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    // 재접속으로 이미 교체된 항목이면 레지스트리 해제는 아무 일도 하지 않는다
    state.registry.remove_connection(connection_id);
    state.transport.unregister(connection_id);
}

// endregion: --- WebSocket Handler
