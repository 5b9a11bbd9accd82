/// 접속 레지스트리와 알림 라우터
/// 사용자 아이디 → 활성 커넥션 매핑을 프로세스 전역으로 유지하고,
/// 입찰/낙찰 이벤트를 해당 커넥션으로 전달한다.
/// 오프라인 사용자의 이벤트는 큐에 쌓지 않고 그대로 버린다.
// region:    --- Imports
use crate::auction::events::AuctionEvent;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};

// endregion: --- Imports

// region:    --- Presence Registry

pub type ConnectionId = u64;

/// 접속 레지스트리
/// 사용자당 활성 커넥션은 최대 하나만 추적한다.
#[derive(Default)]
pub struct PresenceRegistry {
    entries: DashMap<i64, ConnectionId>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 사용자 등록
    /// 기존 항목이 있으면 새 커넥션으로 교체한다.
    /// 이전 커넥션은 강제로 끊지 않으며 라우팅 대상에서만 제외된다.
    pub fn add_user(&self, user_id: i64, connection_id: ConnectionId) {
        self.entries.insert(user_id, connection_id);
        info!(
            "{:<12} --> 사용자 접속 user_id: {}, connection_id: {}",
            "Presence", user_id, connection_id
        );
    }

    /// 커넥션 기준 해제
    /// 사용자가 이미 새 커넥션으로 재접속했다면 아무 일도 하지 않는다.
    pub fn remove_connection(&self, connection_id: ConnectionId) {
        self.entries.retain(|user_id, conn| {
            let stale = *conn == connection_id;
            if stale {
                info!(
                    "{:<12} --> 사용자 접속 해제 user_id: {}, connection_id: {}",
                    "Presence", user_id, connection_id
                );
            }
            !stale
        });
    }

    pub fn lookup(&self, user_id: i64) -> Option<ConnectionId> {
        self.entries.get(&user_id).map(|entry| *entry.value())
    }
}

// endregion: --- Presence Registry

// region:    --- Notification Transport

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("커넥션이 이미 닫혔습니다: {0}")]
    ConnectionGone(ConnectionId),
}

/// 알림 전송 트레이트
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    async fn send(&self, connection_id: ConnectionId, event: AuctionEvent)
        -> Result<(), TransportError>;
}

/// 커넥션별 채널 기반 전송 구현체
/// 웹소켓 핸들러가 수신 채널을 소켓으로 중계한다.
#[derive(Default)]
pub struct ChannelTransport {
    connections: DashMap<ConnectionId, mpsc::UnboundedSender<AuctionEvent>>,
    next_connection_id: AtomicU64,
}

impl ChannelTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 새 커넥션 등록
    pub fn register(&self) -> (ConnectionId, mpsc::UnboundedReceiver<AuctionEvent>) {
        let connection_id = self.next_connection_id.fetch_add(1, Ordering::SeqCst) + 1;
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections.insert(connection_id, tx);
        (connection_id, rx)
    }

    /// 커넥션 해제
    pub fn unregister(&self, connection_id: ConnectionId) {
        self.connections.remove(&connection_id);
    }
}

#[async_trait]
impl NotificationTransport for ChannelTransport {
    async fn send(
        &self,
        connection_id: ConnectionId,
        event: AuctionEvent,
    ) -> Result<(), TransportError> {
        let sender = self
            .connections
            .get(&connection_id)
            .ok_or(TransportError::ConnectionGone(connection_id))?;
        sender
            .send(event)
            .map_err(|_| TransportError::ConnectionGone(connection_id))
    }
}

// endregion: --- Notification Transport

// region:    --- Notification Router

/// 알림 라우터
pub struct NotificationRouter {
    registry: Arc<PresenceRegistry>,
    transport: Arc<dyn NotificationTransport>,
}

impl NotificationRouter {
    pub fn new(registry: Arc<PresenceRegistry>, transport: Arc<dyn NotificationTransport>) -> Self {
        NotificationRouter {
            registry,
            transport,
        }
    }

    /// 이벤트 라우팅
    /// 사용자가 오프라인이거나 커넥션이 닫혔으면 이벤트를 버린다.
    pub async fn route(&self, user_id: i64, event: AuctionEvent) {
        let Some(connection_id) = self.registry.lookup(user_id) else {
            debug!(
                "{:<12} --> 오프라인 사용자, 이벤트 폐기 user_id: {}",
                "Router", user_id
            );
            return;
        };

        if let Err(e) = self.transport.send(connection_id, event).await {
            debug!(
                "{:<12} --> 이벤트 전달 실패, 폐기 user_id: {}, {:?}",
                "Router", user_id, e
            );
        }
    }
}

// endregion: --- Notification Router
