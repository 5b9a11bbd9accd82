// region:    --- Imports
use crate::bidding::locks::AuctionLocks;
use crate::database::DatabaseManager;
use crate::handlers::AppState;
use crate::presence::{
    ChannelTransport, NotificationRouter, NotificationTransport, PresenceRegistry,
};
use crate::scheduler::ExpirySweeper;
use crate::store::{AuctionStore, PostgresAuctionStore};
use axum::routing::{get, post, put};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
// endregion: --- Imports

// region:    --- Modules
mod auction;
mod bidding;
mod database;
mod handlers;
mod presence;
mod query;
mod scheduler;
mod store;

// endregion: --- Modules

// region:    --- Main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // logging 초기화
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    // DatabaseManager 생성
    let db_manager = Arc::new(DatabaseManager::new().await);

    // 데이터베이스 초기화
    if let Err(e) = db_manager.initialize_database().await {
        error!("{:<12} --> 데이터베이스 초기화 실패: {:?}", "Main", e);
        return Err(e.into());
    }
    info!("{:<12} --> 데이터베이스 초기화 성공", "Main");

    // 저장소, 경매별 락, 접속 레지스트리, 알림 라우터 구성
    let store: Arc<dyn AuctionStore> =
        Arc::new(PostgresAuctionStore::new(Arc::clone(&db_manager)));
    let locks = Arc::new(AuctionLocks::from_env());
    let registry = Arc::new(PresenceRegistry::new());
    let transport = Arc::new(ChannelTransport::new());
    let router = Arc::new(NotificationRouter::new(
        Arc::clone(&registry),
        Arc::clone(&transport) as Arc<dyn NotificationTransport>,
    ));

    // 경매 만료 스위퍼 시작
    let sweeper = ExpirySweeper::new(
        Arc::clone(&store),
        Arc::clone(&locks),
        Arc::clone(&router),
        ExpirySweeper::interval_from_env(),
    );
    sweeper.start().await;
    info!("{:<12} --> 경매 만료 스위퍼 시작", "Main");

    let state = AppState {
        store,
        locks,
        registry,
        transport,
        router,
    };

    // 테스트 페이지를 위한 cors 설정
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // 라우터 설정
    let routes_all = Router::new()
        .route("/bid", post(handlers::handle_bid))
        .route("/bid/:id/decision", put(handlers::handle_decision))
        .route(
            "/bid/:id/checkout-complete",
            post(handlers::handle_checkout_complete),
        )
        .route("/auction/:id", get(handlers::handle_get_auction_state))
        .route(
            "/auction/:id/highest-bid",
            get(handlers::handle_get_highest_bid),
        )
        .route("/auction/:id/bids", get(handlers::handle_get_bid_history))
        .route("/ws", get(handlers::handle_ws))
        .layer(cors)
        .with_state(state);

    // 리스너 생성
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = TcpListener::bind(&bind_addr).await?;
    info!(
        "{:<12} --> Web Server: Listening on {}",
        "Main",
        listener.local_addr()?
    );

    // 서버 실행
    if let Err(err) = axum::serve(listener, routes_all.into_make_service()).await {
        error!("{:<12} --> Server error: {}", "Main", err);
    }
    Ok(())
}
// endregion: --- Main
