use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// 경매 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuctionStatus {
    /// 입찰 가능
    Active,
    /// 종료 시간 경과, 판매자 결정 대기
    Ended,
    /// 낙찰 완료
    Fulfilled,
}

impl AuctionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuctionStatus::Active => "ACTIVE",
            AuctionStatus::Ended => "ENDED",
            AuctionStatus::Fulfilled => "FULFILLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(AuctionStatus::Active),
            "ENDED" => Some(AuctionStatus::Ended),
            "FULFILLED" => Some(AuctionStatus::Fulfilled),
            _ => None,
        }
    }
}

// 입찰 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BidStatus {
    /// 상대방 결정 대기
    Pending,
    /// 수락됨, 결제 대기
    Accepted,
    /// 거절됨
    Rejected,
    /// 결제까지 완료됨
    Completed,
}

impl BidStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BidStatus::Pending => "PENDING",
            BidStatus::Accepted => "ACCEPTED",
            BidStatus::Rejected => "REJECTED",
            BidStatus::Completed => "COMPLETED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(BidStatus::Pending),
            "ACCEPTED" => Some(BidStatus::Accepted),
            "REJECTED" => Some(BidStatus::Rejected),
            "COMPLETED" => Some(BidStatus::Completed),
            _ => None,
        }
    }
}

/// 경매 모델
/// `is_buyer_request`가 true이면 구매자가 올린 구매 요청 경매로,
/// 판매자들이 더 낮은 가격을 제시하는 역방향 경매이다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Auction {
    pub id: i64,
    /// 일반 경매의 판매자, 구매 요청 경매의 요청자
    pub owner_id: i64,
    pub starting_price: i64,
    /// 첫 입찰 전까지 None
    pub current_price: Option<i64>,
    /// 현재 최선 입찰의 입찰자
    pub current_bidder_id: Option<i64>,
    /// 다음 입찰이 만족해야 하는 최소 단위
    pub increment_value: i64,
    pub buy_now_price: Option<i64>,
    pub end_time: DateTime<Utc>,
    pub is_buyer_request: bool,
    pub status: AuctionStatus,
    pub created_at: DateTime<Utc>,
}

impl Auction {
    /// 현재 기준 가격 (입찰이 없으면 시작 가격)
    pub fn effective_price(&self) -> i64 {
        self.current_price.unwrap_or(self.starting_price)
    }
}

// 입찰 모델
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bid {
    pub id: i64,
    pub auction_id: i64,
    pub bidder_id: i64,
    pub bid_amount: i64,
    pub status: BidStatus,
    pub created_at: DateTime<Utc>,
}

/// 낙찰 후 결제 서비스로 전달되는 체크아웃 토큰
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutToken {
    pub token: Uuid,
    pub auction_id: i64,
    pub bid_id: i64,
    pub amount: i64,
}

impl CheckoutToken {
    pub fn new(auction_id: i64, bid_id: i64, amount: i64) -> Self {
        CheckoutToken {
            token: Uuid::new_v4(),
            auction_id,
            bid_id,
            amount,
        }
    }
}

/// 남은 경매 시간(초). 종료 시간이 지났으면 0.
pub fn remaining_seconds(now: DateTime<Utc>, end_time: DateTime<Utc>) -> i64 {
    (end_time - now).num_seconds().max(0)
}

/// 거절되지 않은 입찰 중 최선 입찰.
/// 일반 경매는 최고가, 구매 요청 경매는 최저가가 최선이며
/// 금액이 같으면 먼저 들어온 입찰이 우선한다.
pub fn best_active_bid(bids: &[Bid], is_buyer_request: bool) -> Option<&Bid> {
    bids.iter()
        .filter(|b| b.status != BidStatus::Rejected)
        .fold(None, |best: Option<&Bid>, b| match best {
            None => Some(b),
            Some(cur) => {
                let improves = if is_buyer_request {
                    b.bid_amount < cur.bid_amount
                } else {
                    b.bid_amount > cur.bid_amount
                };
                if improves {
                    Some(b)
                } else {
                    Some(cur)
                }
            }
        })
}
