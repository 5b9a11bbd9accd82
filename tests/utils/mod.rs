use bidding_service::auction::events::AuctionEvent;
use bidding_service::auction::model::Auction;
use bidding_service::bidding::locks::AuctionLocks;
use bidding_service::presence::{
    ChannelTransport, ConnectionId, NotificationRouter, NotificationTransport, PresenceRegistry,
};
use bidding_service::store::{AuctionStore, MemoryAuctionStore, NewAuction};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

/// 테스트 공통 구성 요소
pub struct TestContext {
    pub store: Arc<MemoryAuctionStore>,
    pub locks: Arc<AuctionLocks>,
    pub registry: Arc<PresenceRegistry>,
    pub transport: Arc<ChannelTransport>,
    pub router: Arc<NotificationRouter>,
}

/// 메모리 저장소 기반 테스트 환경 구성
pub fn setup() -> TestContext {
    setup_with_lock_wait(std::time::Duration::from_millis(500))
}

pub fn setup_with_lock_wait(wait: std::time::Duration) -> TestContext {
    let store = Arc::new(MemoryAuctionStore::new());
    let locks = Arc::new(AuctionLocks::new(wait));
    let registry = Arc::new(PresenceRegistry::new());
    let transport = Arc::new(ChannelTransport::new());
    let router = Arc::new(NotificationRouter::new(
        Arc::clone(&registry),
        Arc::clone(&transport) as Arc<dyn NotificationTransport>,
    ));
    TestContext {
        store,
        locks,
        registry,
        transport,
        router,
    }
}

/// 테스트용 경매 생성
pub async fn create_auction(
    ctx: &TestContext,
    owner_id: i64,
    starting_price: i64,
    increment_value: i64,
    buy_now_price: Option<i64>,
    ends_in_secs: i64,
    is_buyer_request: bool,
) -> Auction {
    ctx.store
        .insert_auction(NewAuction {
            owner_id,
            starting_price,
            increment_value,
            buy_now_price,
            end_time: Utc::now() + Duration::seconds(ends_in_secs),
            is_buyer_request,
        })
        .await
        .unwrap()
}

/// 사용자 접속 (커넥션 등록 + 레지스트리 반영)
pub fn connect(
    ctx: &TestContext,
    user_id: i64,
) -> (ConnectionId, UnboundedReceiver<AuctionEvent>) {
    let (connection_id, rx) = ctx.transport.register();
    ctx.registry.add_user(user_id, connection_id);
    (connection_id, rx)
}
