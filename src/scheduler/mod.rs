/// 경매 만료 스위퍼
/// 종료 시간이 지난 ACTIVE 경매를 주기적으로 ENDED로 전이한다.
/// 입찰이 있어도 자동 낙찰하지 않으며, 판매자가 명시적으로 결정해야 한다.
/// 이미 ENDED/FULFILLED인 경매는 조회 대상에서 빠지므로 재실행은 멱등하다.
// region:    --- Imports
use crate::auction::events::AuctionEvent;
use crate::auction::model::AuctionStatus;
use crate::bidding::locks::AuctionLocks;
use crate::presence::NotificationRouter;
use crate::store::{AuctionStore, StoreError};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{debug, error, info};

// endregion: --- Imports

// region:    --- Expiry Sweeper

/// 기본 스캔 주기 (초)
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 5;

pub struct ExpirySweeper {
    store: Arc<dyn AuctionStore>,
    locks: Arc<AuctionLocks>,
    router: Arc<NotificationRouter>,
    interval: Duration,
}

impl ExpirySweeper {
    pub fn new(
        store: Arc<dyn AuctionStore>,
        locks: Arc<AuctionLocks>,
        router: Arc<NotificationRouter>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            locks,
            router,
            interval,
        }
    }

    /// SWEEP_INTERVAL_SECS 환경 변수로 스캔 주기 설정
    pub fn interval_from_env() -> Duration {
        let secs = std::env::var("SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS);
        Duration::from_secs(secs)
    }

    /// 스위퍼 시작
    pub async fn start(&self) {
        let store = Arc::clone(&self.store);
        let locks = Arc::clone(&self.locks);
        let router = Arc::clone(&self.router);
        let period = self.interval;
        tokio::spawn(async move {
            let mut interval = interval(period);
            loop {
                interval.tick().await;
                if let Err(e) = Self::sweep(store.as_ref(), &locks, &router, Utc::now()).await {
                    error!("{:<12} --> 경매 만료 처리 중 오류 발생: {:?}", "Sweeper", e);
                }
            }
        });
    }

    /// 한 번의 스캔
    /// 종료된 경매 수를 반환한다.
    pub async fn sweep(
        store: &dyn AuctionStore,
        locks: &AuctionLocks,
        router: &NotificationRouter,
        now: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let due = store.auctions_past_end(now).await?;
        let mut closed = 0;

        for auction in due {
            // 입찰 커밋과 경합하지 않도록 경매별 락을 잡는다.
            // 획득하지 못하면 다음 주기에 다시 처리한다.
            let Ok(_guard) = locks.acquire(auction.id).await else {
                debug!(
                    "{:<12} --> 락 획득 실패, 다음 주기로 연기 id: {}",
                    "Sweeper", auction.id
                );
                continue;
            };

            // 락 획득 후 재확인 (그 사이 즉시 낙찰로 마감됐을 수 있음)
            let Some(mut auction) = store.load_auction(auction.id).await? else {
                continue;
            };
            if auction.status != AuctionStatus::Active || auction.end_time > now {
                continue;
            }

            auction.status = AuctionStatus::Ended;
            store.update_auction(&auction).await?;
            closed += 1;

            router
                .route(
                    auction.owner_id,
                    AuctionEvent::AuctionEnded {
                        auction_id: auction.id,
                        timestamp: now,
                    },
                )
                .await;
            if let Some(best_bidder) = auction.current_bidder_id {
                router
                    .route(
                        best_bidder,
                        AuctionEvent::AuctionEnded {
                            auction_id: auction.id,
                            timestamp: now,
                        },
                    )
                    .await;
            }

            info!("{:<12} --> 경매 종료 처리 id: {}", "Sweeper", auction.id);
        }

        Ok(closed)
    }
}

// endregion: --- Expiry Sweeper
