use crate::auction::model::CheckoutToken;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum AuctionEvent {
    // 새 입찰 알림 (판매자/요청자에게)
    BidPlaced {
        auction_id: i64,
        bid_id: i64,
        bid_amount: i64,
        timestamp: DateTime<Utc>,
    },
    // 상위 입찰 발생 알림 (직전 최선 입찰자에게)
    Outbid {
        auction_id: i64,
        bid_amount: i64,
        timestamp: DateTime<Utc>,
    },
    // 입찰 수락 알림 (입찰자에게, 체크아웃 토큰 포함)
    BidAccepted {
        auction_id: i64,
        bid_id: i64,
        checkout: CheckoutToken,
        timestamp: DateTime<Utc>,
    },
    // 입찰 거절 알림 (입찰자에게)
    BidRejected {
        auction_id: i64,
        bid_id: i64,
        timestamp: DateTime<Utc>,
    },
    // 경매 종료 알림 (판매자와 현재 최선 입찰자에게)
    AuctionEnded {
        auction_id: i64,
        timestamp: DateTime<Utc>,
    },
}
