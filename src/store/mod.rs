/// 경매/입찰 레코드 저장소
/// 입찰 엔진은 이 트레이트를 통해서만 영속 계층에 접근한다.
/// 운영 환경은 PostgresAuctionStore, 테스트와 로컬 개발은 MemoryAuctionStore를 사용한다.
// region:    --- Imports
use crate::auction::model::{Auction, AuctionStatus, Bid, BidStatus};
use crate::database::DatabaseManager;
use crate::query::queries;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::Row;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

// endregion: --- Imports

// region:    --- Store Error

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("데이터베이스 오류: {0}")]
    Database(#[from] sqlx::Error),

    #[error("존재하지 않는 레코드: {0}")]
    MissingRecord(i64),

    #[error("알 수 없는 상태 값: {0}")]
    InvalidStatus(String),
}

// endregion: --- Store Error

// region:    --- Store Trait

/// 경매 생성 입력
#[derive(Debug, Clone)]
pub struct NewAuction {
    pub owner_id: i64,
    pub starting_price: i64,
    pub increment_value: i64,
    pub buy_now_price: Option<i64>,
    pub end_time: DateTime<Utc>,
    pub is_buyer_request: bool,
}

/// 입찰 생성 입력
#[derive(Debug, Clone)]
pub struct NewBid {
    pub auction_id: i64,
    pub bidder_id: i64,
    pub bid_amount: i64,
    pub status: BidStatus,
    pub created_at: DateTime<Utc>,
}

/// 경매 레코드 저장소 트레이트
#[async_trait]
pub trait AuctionStore: Send + Sync {
    async fn insert_auction(&self, auction: NewAuction) -> Result<Auction, StoreError>;

    async fn load_auction(&self, auction_id: i64) -> Result<Option<Auction>, StoreError>;

    /// 가격/상태 필드 갱신
    async fn update_auction(&self, auction: &Auction) -> Result<(), StoreError>;

    /// 경매 레코드 갱신과 입찰 추가를 하나의 원자 단위로 커밋
    async fn commit_bid(&self, auction: &Auction, bid: NewBid) -> Result<Bid, StoreError>;

    async fn load_bid(&self, bid_id: i64) -> Result<Option<Bid>, StoreError>;

    async fn update_bid(&self, bid: &Bid) -> Result<(), StoreError>;

    /// 제출 순서(삽입 순서)대로 반환
    async fn bids_for_auction(&self, auction_id: i64) -> Result<Vec<Bid>, StoreError>;

    /// 종료 시간이 지난 ACTIVE 경매 조회
    async fn auctions_past_end(&self, now: DateTime<Utc>) -> Result<Vec<Auction>, StoreError>;

    /// 입찰 상태 변경과 경매 레코드 갱신을 하나의 원자 단위로 커밋
    async fn commit_decision(&self, auction: &Auction, bid: &Bid) -> Result<(), StoreError>;
}

// endregion: --- Store Trait

// region:    --- Postgres Store

/// Postgres 저장소 구현체
pub struct PostgresAuctionStore {
    db: Arc<DatabaseManager>,
}

impl PostgresAuctionStore {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }
}

/// 경매 행 변환
fn auction_from_row(row: &PgRow) -> Result<Auction, StoreError> {
    let status: String = row.try_get("status")?;
    Ok(Auction {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        starting_price: row.try_get("starting_price")?,
        current_price: row.try_get("current_price")?,
        current_bidder_id: row.try_get("current_bidder_id")?,
        increment_value: row.try_get("increment_value")?,
        buy_now_price: row.try_get("buy_now_price")?,
        end_time: row.try_get("end_time")?,
        is_buyer_request: row.try_get("is_buyer_request")?,
        status: AuctionStatus::parse(&status).ok_or(StoreError::InvalidStatus(status))?,
        created_at: row.try_get("created_at")?,
    })
}

/// 입찰 행 변환
fn bid_from_row(row: &PgRow) -> Result<Bid, StoreError> {
    let status: String = row.try_get("status")?;
    Ok(Bid {
        id: row.try_get("id")?,
        auction_id: row.try_get("auction_id")?,
        bidder_id: row.try_get("bidder_id")?,
        bid_amount: row.try_get("bid_amount")?,
        status: BidStatus::parse(&status).ok_or(StoreError::InvalidStatus(status))?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl AuctionStore for PostgresAuctionStore {
    async fn insert_auction(&self, auction: NewAuction) -> Result<Auction, StoreError> {
        let created_at = Utc::now();
        let row = sqlx::query(
            "INSERT INTO auctions (owner_id, starting_price, increment_value, buy_now_price, end_time, is_buyer_request, status, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING *",
        )
        .bind(auction.owner_id)
        .bind(auction.starting_price)
        .bind(auction.increment_value)
        .bind(auction.buy_now_price)
        .bind(auction.end_time)
        .bind(auction.is_buyer_request)
        .bind(AuctionStatus::Active.as_str())
        .bind(created_at)
        .fetch_one(&*self.db.pool)
        .await?;

        auction_from_row(&row)
    }

    async fn load_auction(&self, auction_id: i64) -> Result<Option<Auction>, StoreError> {
        let row = sqlx::query(queries::GET_AUCTION)
            .bind(auction_id)
            .fetch_optional(&*self.db.pool)
            .await?;

        row.as_ref().map(auction_from_row).transpose()
    }

    async fn update_auction(&self, auction: &Auction) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE auctions SET current_price = $1, current_bidder_id = $2, status = $3 WHERE id = $4",
        )
        .bind(auction.current_price)
        .bind(auction.current_bidder_id)
        .bind(auction.status.as_str())
        .bind(auction.id)
        .execute(&*self.db.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::MissingRecord(auction.id));
        }
        Ok(())
    }

    async fn commit_bid(&self, auction: &Auction, bid: NewBid) -> Result<Bid, StoreError> {
        let auction = auction.clone();
        self.db
            .transaction(|tx| {
                Box::pin(async move {
                    sqlx::query(
                        "UPDATE auctions SET current_price = $1, current_bidder_id = $2, status = $3 WHERE id = $4",
                    )
                    .bind(auction.current_price)
                    .bind(auction.current_bidder_id)
                    .bind(auction.status.as_str())
                    .bind(auction.id)
                    .execute(&mut **tx)
                    .await?;

                    let row = sqlx::query(
                        "INSERT INTO bids (auction_id, bidder_id, bid_amount, status, created_at)
                         VALUES ($1, $2, $3, $4, $5)
                         RETURNING *",
                    )
                    .bind(bid.auction_id)
                    .bind(bid.bidder_id)
                    .bind(bid.bid_amount)
                    .bind(bid.status.as_str())
                    .bind(bid.created_at)
                    .fetch_one(&mut **tx)
                    .await?;

                    bid_from_row(&row)
                })
            })
            .await
    }

    async fn load_bid(&self, bid_id: i64) -> Result<Option<Bid>, StoreError> {
        let row = sqlx::query(queries::GET_BID)
            .bind(bid_id)
            .fetch_optional(&*self.db.pool)
            .await?;

        row.as_ref().map(bid_from_row).transpose()
    }

    async fn update_bid(&self, bid: &Bid) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE bids SET status = $1 WHERE id = $2")
            .bind(bid.status.as_str())
            .bind(bid.id)
            .execute(&*self.db.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::MissingRecord(bid.id));
        }
        Ok(())
    }

    async fn bids_for_auction(&self, auction_id: i64) -> Result<Vec<Bid>, StoreError> {
        let rows = sqlx::query(queries::GET_BID_HISTORY)
            .bind(auction_id)
            .fetch_all(&*self.db.pool)
            .await?;

        rows.iter().map(bid_from_row).collect()
    }

    async fn auctions_past_end(&self, now: DateTime<Utc>) -> Result<Vec<Auction>, StoreError> {
        let rows = sqlx::query(queries::GET_AUCTIONS_PAST_END)
            .bind(now)
            .fetch_all(&*self.db.pool)
            .await?;

        rows.iter().map(auction_from_row).collect()
    }

    async fn commit_decision(&self, auction: &Auction, bid: &Bid) -> Result<(), StoreError> {
        let auction = auction.clone();
        let bid = bid.clone();
        self.db
            .transaction(|tx| {
                Box::pin(async move {
                    let result = sqlx::query("UPDATE bids SET status = $1 WHERE id = $2")
                        .bind(bid.status.as_str())
                        .bind(bid.id)
                        .execute(&mut **tx)
                        .await?;
                    if result.rows_affected() == 0 {
                        return Err(StoreError::MissingRecord(bid.id));
                    }

                    sqlx::query(
                        "UPDATE auctions SET current_price = $1, current_bidder_id = $2, status = $3 WHERE id = $4",
                    )
                    .bind(auction.current_price)
                    .bind(auction.current_bidder_id)
                    .bind(auction.status.as_str())
                    .bind(auction.id)
                    .execute(&mut **tx)
                    .await?;

                    Ok(())
                })
            })
            .await
    }
}

// endregion: --- Postgres Store

// region:    --- Memory Store

/// 메모리 저장소 구현체 (테스트/로컬 개발용)
#[derive(Default)]
pub struct MemoryAuctionStore {
    auctions: RwLock<HashMap<i64, Auction>>,
    bids: RwLock<HashMap<i64, Bid>>,
    next_auction_id: AtomicI64,
    next_bid_id: AtomicI64,
}

impl MemoryAuctionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuctionStore for MemoryAuctionStore {
    async fn insert_auction(&self, auction: NewAuction) -> Result<Auction, StoreError> {
        let id = self.next_auction_id.fetch_add(1, Ordering::SeqCst) + 1;
        let auction = Auction {
            id,
            owner_id: auction.owner_id,
            starting_price: auction.starting_price,
            current_price: None,
            current_bidder_id: None,
            increment_value: auction.increment_value,
            buy_now_price: auction.buy_now_price,
            end_time: auction.end_time,
            is_buyer_request: auction.is_buyer_request,
            status: AuctionStatus::Active,
            created_at: Utc::now(),
        };
        self.auctions.write().await.insert(id, auction.clone());
        Ok(auction)
    }

    async fn load_auction(&self, auction_id: i64) -> Result<Option<Auction>, StoreError> {
        Ok(self.auctions.read().await.get(&auction_id).cloned())
    }

    async fn update_auction(&self, auction: &Auction) -> Result<(), StoreError> {
        let mut auctions = self.auctions.write().await;
        match auctions.get_mut(&auction.id) {
            Some(stored) => {
                *stored = auction.clone();
                Ok(())
            }
            None => Err(StoreError::MissingRecord(auction.id)),
        }
    }

    async fn commit_bid(&self, auction: &Auction, bid: NewBid) -> Result<Bid, StoreError> {
        let mut auctions = self.auctions.write().await;
        let mut bids = self.bids.write().await;

        match auctions.get_mut(&auction.id) {
            Some(stored) => *stored = auction.clone(),
            None => return Err(StoreError::MissingRecord(auction.id)),
        }

        let id = self.next_bid_id.fetch_add(1, Ordering::SeqCst) + 1;
        let bid = Bid {
            id,
            auction_id: bid.auction_id,
            bidder_id: bid.bidder_id,
            bid_amount: bid.bid_amount,
            status: bid.status,
            created_at: bid.created_at,
        };
        bids.insert(id, bid.clone());
        Ok(bid)
    }

    async fn load_bid(&self, bid_id: i64) -> Result<Option<Bid>, StoreError> {
        Ok(self.bids.read().await.get(&bid_id).cloned())
    }

    async fn update_bid(&self, bid: &Bid) -> Result<(), StoreError> {
        let mut bids = self.bids.write().await;
        match bids.get_mut(&bid.id) {
            Some(stored) => {
                *stored = bid.clone();
                Ok(())
            }
            None => Err(StoreError::MissingRecord(bid.id)),
        }
    }

    async fn bids_for_auction(&self, auction_id: i64) -> Result<Vec<Bid>, StoreError> {
        let bids = self.bids.read().await;
        let mut result: Vec<Bid> = bids
            .values()
            .filter(|b| b.auction_id == auction_id)
            .cloned()
            .collect();
        // 아이디 순서 = 삽입 순서
        result.sort_by_key(|b| b.id);
        Ok(result)
    }

    async fn auctions_past_end(&self, now: DateTime<Utc>) -> Result<Vec<Auction>, StoreError> {
        let auctions = self.auctions.read().await;
        let mut result: Vec<Auction> = auctions
            .values()
            .filter(|a| a.status == AuctionStatus::Active && a.end_time <= now)
            .cloned()
            .collect();
        result.sort_by_key(|a| a.id);
        Ok(result)
    }

    async fn commit_decision(&self, auction: &Auction, bid: &Bid) -> Result<(), StoreError> {
        let mut auctions = self.auctions.write().await;
        let mut bids = self.bids.write().await;

        match bids.get_mut(&bid.id) {
            Some(stored) => *stored = bid.clone(),
            None => return Err(StoreError::MissingRecord(bid.id)),
        }
        match auctions.get_mut(&auction.id) {
            Some(stored) => *stored = auction.clone(),
            None => return Err(StoreError::MissingRecord(auction.id)),
        }
        Ok(())
    }
}

// endregion: --- Memory Store
