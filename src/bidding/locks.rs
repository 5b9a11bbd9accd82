/// 경매별 직렬화 락
/// 같은 경매에 대한 읽기-검증-쓰기는 반드시 이 락을 잡고 수행한다.
/// 서로 다른 경매의 입찰은 완전히 병렬로 진행된다.
// region:    --- Imports
use crate::bidding::BidError;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time;
use tracing::warn;

// endregion: --- Imports

// region:    --- Auction Locks

/// 기본 락 대기 시간 (밀리초)
const DEFAULT_LOCK_WAIT_MS: u64 = 2000;

pub struct AuctionLocks {
    locks: DashMap<i64, Arc<Mutex<()>>>,
    wait: Duration,
}

impl AuctionLocks {
    pub fn new(wait: Duration) -> Self {
        AuctionLocks {
            locks: DashMap::new(),
            wait,
        }
    }

    /// LOCK_WAIT_MS 환경 변수로 대기 시간 설정
    pub fn from_env() -> Self {
        let wait_ms = std::env::var("LOCK_WAIT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_LOCK_WAIT_MS);
        Self::new(Duration::from_millis(wait_ms))
    }

    /// 경매별 락 획득
    /// 대기 시간 안에 획득하지 못하면 상태 변경 없이 Busy로 실패한다.
    pub async fn acquire(&self, auction_id: i64) -> Result<OwnedMutexGuard<()>, BidError> {
        let lock = {
            let entry = self.locks.entry(auction_id).or_default();
            Arc::clone(entry.value())
        };

        match time::timeout(self.wait, lock.lock_owned()).await {
            Ok(guard) => Ok(guard),
            Err(_) => {
                warn!(
                    "{:<12} --> 경매 락 획득 시간 초과 id: {}",
                    "Locks", auction_id
                );
                Err(BidError::Busy)
            }
        }
    }
}

// endregion: --- Auction Locks
