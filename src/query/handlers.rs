// region:    --- Imports
use crate::auction::model::{remaining_seconds, Auction, Bid};
use crate::store::{AuctionStore, StoreError};
use chrono::Utc;
use serde::Serialize;
use tracing::info;

// endregion: --- Imports

// region:    --- Query Handlers

/// 경매 상태 뷰
/// 남은 시간은 서버 타이머 없이 조회 시점에 종료 시간으로부터 계산한다.
#[derive(Debug, Serialize)]
pub struct AuctionStateView {
    #[serde(flatten)]
    pub auction: Auction,
    pub remaining_seconds: i64,
}

/// 경매 상태 조회
pub async fn get_auction_state<S>(
    store: &S,
    auction_id: i64,
) -> Result<Option<AuctionStateView>, StoreError>
where
    S: AuctionStore + ?Sized,
{
    info!("{:<12} --> 경매 상태 조회 id: {}", "Query", auction_id);
    let auction = store.load_auction(auction_id).await?;
    Ok(auction.map(|auction| {
        let remaining = remaining_seconds(Utc::now(), auction.end_time);
        AuctionStateView {
            auction,
            remaining_seconds: remaining,
        }
    }))
}

/// 최선 입찰가 조회 (입찰이 없으면 None)
pub async fn get_highest_bid<S>(store: &S, auction_id: i64) -> Result<Option<i64>, StoreError>
where
    S: AuctionStore + ?Sized,
{
    info!("{:<12} --> 최선 입찰가 조회 id: {}", "Query", auction_id);
    let auction = store.load_auction(auction_id).await?;
    Ok(auction.and_then(|a| a.current_price))
}

/// 입찰 이력 조회 (제출 순서)
pub async fn get_bid_history<S>(store: &S, auction_id: i64) -> Result<Vec<Bid>, StoreError>
where
    S: AuctionStore + ?Sized,
{
    info!("{:<12} --> 입찰 이력 조회 id: {}", "Query", auction_id);
    store.bids_for_auction(auction_id).await
}

// endregion: --- Query Handlers
