/// 입찰 관련 커맨드 처리
/// 1. 입찰 제출
/// 2. 입찰 수락/거절
/// 3. 체크아웃 완료
// region:    --- Imports
use crate::auction::events::AuctionEvent;
use crate::auction::model::{best_active_bid, AuctionStatus, Bid, BidStatus, CheckoutToken};
use crate::bidding::locks::AuctionLocks;
use crate::bidding::{validator, BidError};
use crate::presence::NotificationRouter;
use crate::store::{AuctionStore, NewBid};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

// endregion: --- Imports

// region:    --- Commands

/// 입찰 명령
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlaceBidCommand {
    pub auction_id: i64,
    pub bidder_id: i64,
    pub amount: i64,
}

/// 입찰 결정 명령 (판매자/요청자)
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DecideBidCommand {
    pub decision: Decision,
    pub decider_id: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Accept,
    Reject,
}

/// 입찰 처리 결과
#[derive(Debug, Clone, Serialize)]
pub struct BidReceipt {
    pub bid: Bid,
    /// 즉시 낙찰인 경우에만 포함
    pub checkout: Option<CheckoutToken>,
}

/// 결정 처리 결과
#[derive(Debug, Clone)]
pub enum DecisionOutcome {
    Accepted(CheckoutToken),
    Rejected,
}

// endregion: --- Commands

// region:    --- Command Handlers

/// 1. 입찰 제출
/// 현재 가격 읽기, 검증, 새 가격 쓰기는 경매별 락 안에서 하나의 원자 단위로 처리된다.
pub async fn handle_place_bid<S>(
    cmd: PlaceBidCommand,
    store: &S,
    locks: &AuctionLocks,
    router: &NotificationRouter,
) -> Result<BidReceipt, BidError>
where
    S: AuctionStore + ?Sized,
{
    info!("{:<12} --> 입찰 요청 처리 시작: {:?}", "Command", cmd);

    // 경매별 직렬화 구간 진입
    let _guard = locks.acquire(cmd.auction_id).await?;

    let mut auction = store
        .load_auction(cmd.auction_id)
        .await?
        .ok_or(BidError::AuctionNotFound(cmd.auction_id))?;

    let now = Utc::now();
    let check = validator::validate_bid(&auction, cmd.bidder_id, cmd.amount, now)?;

    let mut new_bid = NewBid {
        auction_id: cmd.auction_id,
        bidder_id: cmd.bidder_id,
        bid_amount: cmd.amount,
        status: BidStatus::Pending,
        created_at: now,
    };

    // 즉시 낙찰 가격 도달 시 입찰을 바로 수락하고 경매를 마감한다
    if check.triggers_buy_now {
        new_bid.status = BidStatus::Accepted;
        auction.status = AuctionStatus::Fulfilled;
    }
    auction.current_price = Some(cmd.amount);
    auction.current_bidder_id = Some(cmd.bidder_id);

    let bid = store.commit_bid(&auction, new_bid).await?;

    router
        .route(
            auction.owner_id,
            AuctionEvent::BidPlaced {
                auction_id: auction.id,
                bid_id: bid.id,
                bid_amount: bid.bid_amount,
                timestamp: now,
            },
        )
        .await;

    if let Some(previous) = check.outbid {
        router
            .route(
                previous,
                AuctionEvent::Outbid {
                    auction_id: auction.id,
                    bid_amount: bid.bid_amount,
                    timestamp: now,
                },
            )
            .await;
    }

    let checkout = if check.triggers_buy_now {
        let token = CheckoutToken::new(auction.id, bid.id, bid.bid_amount);
        router
            .route(
                bid.bidder_id,
                AuctionEvent::BidAccepted {
                    auction_id: auction.id,
                    bid_id: bid.id,
                    checkout: token.clone(),
                    timestamp: now,
                },
            )
            .await;
        info!(
            "{:<12} --> 즉시 낙찰 처리 완료 auction_id: {}",
            "Command", auction.id
        );
        Some(token)
    } else {
        None
    };

    Ok(BidReceipt { bid, checkout })
}

/// 2. 입찰 수락/거절
/// 낙찰 확정이 동시 입찰과 경합하지 않도록 입찰과 같은 경매별 락을 사용한다.
pub async fn handle_decide_bid<S>(
    bid_id: i64,
    cmd: DecideBidCommand,
    store: &S,
    locks: &AuctionLocks,
    router: &NotificationRouter,
) -> Result<DecisionOutcome, BidError>
where
    S: AuctionStore + ?Sized,
{
    info!(
        "{:<12} --> 입찰 결정 처리 시작 bid_id: {}, {:?}",
        "Command", bid_id, cmd
    );

    // 락 획득에 필요한 경매 아이디 확인
    let bid = store
        .load_bid(bid_id)
        .await?
        .ok_or(BidError::BidNotFound(bid_id))?;

    let _guard = locks.acquire(bid.auction_id).await?;

    // 락 획득 후 최신 상태 재조회
    let mut bid = store
        .load_bid(bid_id)
        .await?
        .ok_or(BidError::BidNotFound(bid_id))?;
    let mut auction = store
        .load_auction(bid.auction_id)
        .await?
        .ok_or(BidError::AuctionNotFound(bid.auction_id))?;

    if auction.owner_id != cmd.decider_id {
        return Err(BidError::Unauthorized);
    }
    if bid.status != BidStatus::Pending {
        return Err(BidError::AlreadyDecided(bid.id));
    }

    let now = Utc::now();
    match cmd.decision {
        Decision::Accept => {
            // 이미 낙찰된 경매에 대한 중복 수락은 체크아웃 토큰이 둘 생기므로 막는다
            if auction.status == AuctionStatus::Fulfilled {
                return Err(BidError::AuctionClosed(auction.id));
            }

            bid.status = BidStatus::Accepted;
            auction.status = AuctionStatus::Fulfilled;
            store.commit_decision(&auction, &bid).await?;

            let token = CheckoutToken::new(auction.id, bid.id, bid.bid_amount);
            router
                .route(
                    bid.bidder_id,
                    AuctionEvent::BidAccepted {
                        auction_id: auction.id,
                        bid_id: bid.id,
                        checkout: token.clone(),
                        timestamp: now,
                    },
                )
                .await;
            info!("{:<12} --> 입찰 수락 처리 완료 bid_id: {}", "Command", bid.id);
            Ok(DecisionOutcome::Accepted(token))
        }
        Decision::Reject => {
            bid.status = BidStatus::Rejected;

            // 최선 입찰이 거절되면 남은 입찰로 현재 가격을 되돌린다
            let bids = store.bids_for_auction(auction.id).await?;
            let remaining: Vec<Bid> = bids.into_iter().filter(|b| b.id != bid.id).collect();
            let best = best_active_bid(&remaining, auction.is_buyer_request);
            auction.current_price = best.map(|b| b.bid_amount);
            auction.current_bidder_id = best.map(|b| b.bidder_id);

            store.commit_decision(&auction, &bid).await?;

            router
                .route(
                    bid.bidder_id,
                    AuctionEvent::BidRejected {
                        auction_id: auction.id,
                        bid_id: bid.id,
                        timestamp: now,
                    },
                )
                .await;
            info!("{:<12} --> 입찰 거절 처리 완료 bid_id: {}", "Command", bid.id);
            Ok(DecisionOutcome::Rejected)
        }
    }
}

/// 3. 체크아웃 완료
/// 결제 서비스가 결제 확정을 보고하면 수락된 입찰을 완료 상태로 전이한다.
pub async fn handle_complete_checkout<S>(
    bid_id: i64,
    store: &S,
    locks: &AuctionLocks,
) -> Result<Bid, BidError>
where
    S: AuctionStore + ?Sized,
{
    info!(
        "{:<12} --> 체크아웃 완료 처리 시작 bid_id: {}",
        "Command", bid_id
    );

    let bid = store
        .load_bid(bid_id)
        .await?
        .ok_or(BidError::BidNotFound(bid_id))?;

    let _guard = locks.acquire(bid.auction_id).await?;

    let mut bid = store
        .load_bid(bid_id)
        .await?
        .ok_or(BidError::BidNotFound(bid_id))?;

    if bid.status != BidStatus::Accepted {
        return Err(BidError::NotAccepted(bid.id));
    }

    bid.status = BidStatus::Completed;
    store.update_bid(&bid).await?;

    info!(
        "{:<12} --> 체크아웃 완료 처리 완료 bid_id: {}",
        "Command", bid.id
    );
    Ok(bid)
}

// endregion: --- Command Handlers
