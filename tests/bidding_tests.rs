mod utils;

use bidding_service::auction::events::AuctionEvent;
use bidding_service::auction::model::{Auction, AuctionStatus, BidStatus};
use bidding_service::bidding::commands::{handle_place_bid, BidReceipt, PlaceBidCommand};
use bidding_service::bidding::{validator, BidError};
use bidding_service::query;
use bidding_service::store::AuctionStore;
use chrono::{Duration, Utc};
use std::sync::Arc;
use utils::TestContext;

/// 입찰 제출 헬퍼
async fn place(
    ctx: &TestContext,
    auction_id: i64,
    bidder_id: i64,
    amount: i64,
) -> Result<BidReceipt, BidError> {
    handle_place_bid(
        PlaceBidCommand {
            auction_id,
            bidder_id,
            amount,
        },
        ctx.store.as_ref(),
        &ctx.locks,
        &ctx.router,
    )
    .await
}

/// 최소 입찰 단위 검증 (시작가 1000, 단위 100)
#[tokio::test]
async fn test_minimum_increment() {
    let ctx = utils::setup();
    let auction = utils::create_auction(&ctx, 1, 1000, 100, None, 3600, false).await;

    // 시작가 + 단위 미만이면 거절
    let err = place(&ctx, auction.id, 101, 1050).await.unwrap_err();
    assert!(matches!(err, BidError::BidTooLow { minimum: 1100 }));

    // 시작가 + 단위 이상이면 수락
    let receipt = place(&ctx, auction.id, 101, 1100).await.unwrap();
    assert_eq!(receipt.bid.status, BidStatus::Pending);
    assert!(receipt.checkout.is_none());

    let updated = ctx.store.load_auction(auction.id).await.unwrap().unwrap();
    assert_eq!(updated.current_price, Some(1100));
    assert_eq!(updated.current_bidder_id, Some(101));

    // 이후 입찰은 현재 가격 기준으로 검증
    let err = place(&ctx, auction.id, 102, 1150).await.unwrap_err();
    assert!(matches!(err, BidError::BidTooLow { minimum: 1200 }));

    place(&ctx, auction.id, 102, 1200).await.unwrap();
    let updated = ctx.store.load_auction(auction.id).await.unwrap().unwrap();
    assert_eq!(updated.current_price, Some(1200));
}

/// 구매 요청 경매는 비교 방향이 반대 (더 낮은 가격이 우위)
#[tokio::test]
async fn test_buyer_request_direction() {
    let ctx = utils::setup();
    let auction = utils::create_auction(&ctx, 1, 1000, 100, None, 3600, true).await;

    // 시작가 - 단위 초과면 거절
    let err = place(&ctx, auction.id, 201, 950).await.unwrap_err();
    assert!(matches!(err, BidError::BidTooHigh { maximum: 900 }));

    place(&ctx, auction.id, 201, 900).await.unwrap();
    let updated = ctx.store.load_auction(auction.id).await.unwrap().unwrap();
    assert_eq!(updated.current_price, Some(900));

    // 다음 입찰은 800 이하만 가능
    let err = place(&ctx, auction.id, 202, 850).await.unwrap_err();
    assert!(matches!(err, BidError::BidTooHigh { maximum: 800 }));

    place(&ctx, auction.id, 202, 800).await.unwrap();
}

/// 즉시 낙찰 가격 도달 시 바로 수락되고 경매가 마감된다
#[tokio::test]
async fn test_buy_now_short_circuit() {
    let ctx = utils::setup();
    let auction = utils::create_auction(&ctx, 1, 1000, 100, Some(5000), 3600, false).await;

    place(&ctx, auction.id, 301, 4000).await.unwrap();

    let receipt = place(&ctx, auction.id, 302, 5000).await.unwrap();
    assert_eq!(receipt.bid.status, BidStatus::Accepted);
    let checkout = receipt.checkout.expect("즉시 낙찰이면 체크아웃 토큰이 있어야 함");
    assert_eq!(checkout.auction_id, auction.id);
    assert_eq!(checkout.bid_id, receipt.bid.id);
    assert_eq!(checkout.amount, 5000);

    let updated = ctx.store.load_auction(auction.id).await.unwrap().unwrap();
    assert_eq!(updated.status, AuctionStatus::Fulfilled);
    assert_eq!(updated.current_price, Some(5000));

    // 마감 이후 입찰은 모두 거절
    let err = place(&ctx, auction.id, 303, 6000).await.unwrap_err();
    assert!(matches!(err, BidError::AuctionClosed(_)));
}

/// 구매 요청 경매의 즉시 낙찰은 하한 도달
#[tokio::test]
async fn test_buy_now_for_buyer_request() {
    let ctx = utils::setup();
    let auction = utils::create_auction(&ctx, 1, 1000, 100, Some(500), 3600, true).await;

    let receipt = place(&ctx, auction.id, 401, 500).await.unwrap();
    assert_eq!(receipt.bid.status, BidStatus::Accepted);
    assert!(receipt.checkout.is_some());

    let updated = ctx.store.load_auction(auction.id).await.unwrap().unwrap();
    assert_eq!(updated.status, AuctionStatus::Fulfilled);
}

/// 존재하지 않는 경매
#[tokio::test]
async fn test_auction_not_found() {
    let ctx = utils::setup();
    let err = place(&ctx, 999, 101, 1100).await.unwrap_err();
    assert!(matches!(err, BidError::AuctionNotFound(999)));
}

/// 종료 시간이 지난 경매는 상태와 무관하게 입찰 거절
#[test]
fn test_validator_rejects_past_end_time() {
    let auction = Auction {
        id: 1,
        owner_id: 1,
        starting_price: 1000,
        current_price: None,
        current_bidder_id: None,
        increment_value: 100,
        buy_now_price: None,
        end_time: Utc::now() - Duration::seconds(10),
        is_buyer_request: false,
        status: AuctionStatus::Active,
        created_at: Utc::now() - Duration::hours(1),
    };

    let err = validator::validate_bid(&auction, 101, 1100, Utc::now()).unwrap_err();
    assert!(matches!(err, BidError::AuctionClosed(1)));
}

/// 동일 입찰자가 연속 갱신하면 상위 입찰 알림 대상이 없다
#[test]
fn test_validator_suppresses_self_outbid() {
    let auction = Auction {
        id: 1,
        owner_id: 1,
        starting_price: 1000,
        current_price: Some(1100),
        current_bidder_id: Some(101),
        increment_value: 100,
        buy_now_price: None,
        end_time: Utc::now() + Duration::hours(1),
        is_buyer_request: false,
        status: AuctionStatus::Active,
        created_at: Utc::now(),
    };

    // 같은 입찰자의 재입찰
    let check = validator::validate_bid(&auction, 101, 1200, Utc::now()).unwrap();
    assert_eq!(check.outbid, None);

    // 다른 입찰자의 입찰이면 직전 입찰자가 알림 대상
    let check = validator::validate_bid(&auction, 102, 1200, Utc::now()).unwrap();
    assert_eq!(check.outbid, Some(101));
}

/// 새 입찰 알림은 판매자에게, 상위 입찰 알림은 직전 최선 입찰자에게 전달된다
#[tokio::test]
async fn test_bid_notifications() {
    let ctx = utils::setup();
    let auction = utils::create_auction(&ctx, 1, 1000, 100, None, 3600, false).await;

    let (_, mut owner_rx) = utils::connect(&ctx, 1);
    let (_, mut first_rx) = utils::connect(&ctx, 101);

    place(&ctx, auction.id, 101, 1100).await.unwrap();
    place(&ctx, auction.id, 102, 1200).await.unwrap();

    // 판매자는 입찰마다 알림을 받는다
    assert!(matches!(
        owner_rx.try_recv().unwrap(),
        AuctionEvent::BidPlaced { bid_amount: 1100, .. }
    ));
    assert!(matches!(
        owner_rx.try_recv().unwrap(),
        AuctionEvent::BidPlaced { bid_amount: 1200, .. }
    ));

    // 직전 최선 입찰자는 상위 입찰 알림을 받는다
    assert!(matches!(
        first_rx.try_recv().unwrap(),
        AuctionEvent::Outbid { bid_amount: 1200, .. }
    ));
    assert!(first_rx.try_recv().is_err());
}

/// 동일 입찰자의 연속 갱신은 자기 자신에게 알리지 않는다
#[tokio::test]
async fn test_self_outbid_not_notified() {
    let ctx = utils::setup();
    let auction = utils::create_auction(&ctx, 1, 1000, 100, None, 3600, false).await;

    let (_, mut bidder_rx) = utils::connect(&ctx, 101);

    place(&ctx, auction.id, 101, 1100).await.unwrap();
    place(&ctx, auction.id, 101, 1200).await.unwrap();

    assert!(bidder_rx.try_recv().is_err());
}

/// 같은 경매에 대한 동시 입찰은 직렬화되어
/// 각 입찰이 최신 가격 기준으로 검증된다
#[tokio::test]
async fn test_concurrent_bidding_serialized() {
    let ctx = utils::setup();
    let auction = utils::create_auction(&ctx, 1, 1000, 100, None, 3600, false).await;

    let mut handles = vec![];
    for i in 1..=20i64 {
        let store = Arc::clone(&ctx.store);
        let locks = Arc::clone(&ctx.locks);
        let router = Arc::clone(&ctx.router);
        let auction_id = auction.id;
        let amount = 1000 + i * 100;

        handles.push(tokio::spawn(async move {
            handle_place_bid(
                PlaceBidCommand {
                    auction_id,
                    bidder_id: i,
                    amount,
                },
                store.as_ref(),
                &locks,
                &router,
            )
            .await
        }));
    }

    let mut accepted = vec![];
    for handle in handles {
        match handle.await.unwrap() {
            Ok(receipt) => accepted.push(receipt.bid.bid_amount),
            // 직렬화된 최신 가격 기준에 못 미친 입찰만 거절된다
            Err(e) => assert!(matches!(e, BidError::BidTooLow { .. })),
        }
    }
    assert!(!accepted.is_empty());

    // 최종 가격은 기록된 마지막 입찰 금액과 같다
    let updated = ctx.store.load_auction(auction.id).await.unwrap().unwrap();
    let history = query::handlers::get_bid_history(ctx.store.as_ref(), auction.id)
        .await
        .unwrap();
    assert_eq!(history.len(), accepted.len());
    assert_eq!(
        updated.current_price,
        Some(history.last().unwrap().bid_amount)
    );

    // 기록된 입찰은 제출 순서대로 단조 증가하며 최소 단위를 만족한다
    for pair in history.windows(2) {
        assert!(pair[1].bid_amount >= pair[0].bid_amount + 100);
    }
}

/// 락을 잡지 못한 입찰은 상태 변경 없이 Busy로 실패한다
#[tokio::test]
async fn test_lock_timeout_returns_busy() {
    let ctx = utils::setup_with_lock_wait(std::time::Duration::from_millis(50));
    let auction = utils::create_auction(&ctx, 1, 1000, 100, None, 3600, false).await;

    // 락을 선점한 상태에서 입찰 시도
    let _guard = ctx.locks.acquire(auction.id).await.unwrap();

    let err = place(&ctx, auction.id, 101, 1100).await.unwrap_err();
    assert!(matches!(err, BidError::Busy));
    assert!(err.is_retryable());

    // 상태가 변경되지 않았는지 확인
    let unchanged = ctx.store.load_auction(auction.id).await.unwrap().unwrap();
    assert_eq!(unchanged.current_price, None);
}
