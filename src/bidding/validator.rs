/// 입찰 검증
/// 경매 상태와 후보 입찰만 보고 판정하는 순수 함수로,
/// 반드시 경매별 직렬화 구간 안에서 최신 스냅샷에 대해 호출되어야 한다.
// region:    --- Imports
use crate::auction::model::{Auction, AuctionStatus};
use crate::bidding::BidError;
use chrono::{DateTime, Utc};

// endregion: --- Imports

// region:    --- Bid Check

/// 검증 통과 후 엔진이 수행할 부수 동작
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BidCheck {
    /// 즉시 낙찰 가격에 도달하여 경매를 바로 마감해야 하는지
    pub triggers_buy_now: bool,
    /// 상위 입찰 알림을 받을 직전 최선 입찰자.
    /// 동일 입찰자가 연속으로 자신을 갱신하는 경우 None (자기 자신에게는 알리지 않음).
    pub outbid: Option<i64>,
}

// endregion: --- Bid Check

// region:    --- Validator

/// 후보 입찰 검증
/// 1. 경매가 ACTIVE이고 종료 시간 전이어야 한다.
/// 2. 일반 경매는 기준 가격 + 최소 단위 이상,
///    구매 요청 경매는 기준 가격 - 최소 단위 이하여야 한다.
/// 3. 즉시 낙찰 가격 도달 여부는 통과 결과에 표시만 하고 마감은 엔진이 수행한다.
pub fn validate_bid(
    auction: &Auction,
    bidder_id: i64,
    amount: i64,
    now: DateTime<Utc>,
) -> Result<BidCheck, BidError> {
    if auction.status != AuctionStatus::Active || now >= auction.end_time {
        return Err(BidError::AuctionClosed(auction.id));
    }

    let effective = auction.effective_price();
    if auction.is_buyer_request {
        let maximum = effective - auction.increment_value;
        if amount > maximum {
            return Err(BidError::BidTooHigh { maximum });
        }
    } else {
        let minimum = effective + auction.increment_value;
        if amount < minimum {
            return Err(BidError::BidTooLow { minimum });
        }
    }

    let triggers_buy_now = match auction.buy_now_price {
        Some(buy_now) if auction.is_buyer_request => amount <= buy_now,
        Some(buy_now) => amount >= buy_now,
        None => false,
    };

    // 동일 입찰자의 연속 갱신이면 상위 입찰 알림 생략
    let outbid = auction
        .current_bidder_id
        .filter(|previous| *previous != bidder_id);

    Ok(BidCheck {
        triggers_buy_now,
        outbid,
    })
}

// endregion: --- Validator
