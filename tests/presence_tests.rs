mod utils;

use bidding_service::auction::events::AuctionEvent;
use chrono::Utc;

fn sample_event() -> AuctionEvent {
    AuctionEvent::Outbid {
        auction_id: 1,
        bid_amount: 1200,
        timestamp: Utc::now(),
    }
}

/// 접속 등록과 조회
#[tokio::test]
async fn test_add_and_lookup() {
    let ctx = utils::setup();

    let (conn, _rx) = utils::connect(&ctx, 101);
    assert_eq!(ctx.registry.lookup(101), Some(conn));
    assert_eq!(ctx.registry.lookup(999), None);
}

/// 두 번째 기기로 접속하면 기존 항목이 조용히 교체되고
/// 이벤트는 새 커넥션으로만 전달된다
#[tokio::test]
async fn test_second_device_replaces_entry() {
    let ctx = utils::setup();

    let (old_conn, mut old_rx) = utils::connect(&ctx, 101);
    let (new_conn, mut new_rx) = utils::connect(&ctx, 101);
    assert_ne!(old_conn, new_conn);
    assert_eq!(ctx.registry.lookup(101), Some(new_conn));

    ctx.router.route(101, sample_event()).await;

    assert!(matches!(
        new_rx.try_recv().unwrap(),
        AuctionEvent::Outbid { .. }
    ));
    // 이전 커넥션은 라우팅 대상에서 제외된다
    assert!(old_rx.try_recv().is_err());
}

/// 이미 재접속한 사용자에 대한 이전 커넥션 해제는 아무 일도 하지 않는다
#[tokio::test]
async fn test_stale_removal_is_noop() {
    let ctx = utils::setup();

    let (old_conn, _old_rx) = utils::connect(&ctx, 101);
    let (new_conn, _new_rx) = utils::connect(&ctx, 101);

    ctx.registry.remove_connection(old_conn);
    assert_eq!(ctx.registry.lookup(101), Some(new_conn));
}

/// 커넥션 해제 후에는 조회되지 않는다
#[tokio::test]
async fn test_remove_connection() {
    let ctx = utils::setup();

    let (conn, _rx) = utils::connect(&ctx, 101);
    ctx.registry.remove_connection(conn);
    ctx.transport.unregister(conn);

    assert_eq!(ctx.registry.lookup(101), None);
}

/// 오프라인 사용자의 이벤트는 큐에 쌓이지 않고 버려진다
#[tokio::test]
async fn test_offline_events_are_dropped() {
    let ctx = utils::setup();

    // 접속한 적 없는 사용자
    ctx.router.route(999, sample_event()).await;

    // 접속 해제한 사용자
    let (conn, mut rx) = utils::connect(&ctx, 101);
    ctx.registry.remove_connection(conn);
    ctx.transport.unregister(conn);

    ctx.router.route(101, sample_event()).await;
    assert!(rx.try_recv().is_err());

    // 다시 접속해도 놓친 이벤트는 전달되지 않는다
    let (_, mut rx) = utils::connect(&ctx, 101);
    assert!(rx.try_recv().is_err());
}

/// 레지스트리에는 남았지만 커넥션이 닫힌 경우에도 조용히 버린다
#[tokio::test]
async fn test_closed_connection_drops_event() {
    let ctx = utils::setup();

    let (conn, rx) = utils::connect(&ctx, 101);
    // 수신측이 먼저 닫힌 상황
    drop(rx);
    ctx.transport.unregister(conn);

    ctx.router.route(101, sample_event()).await;
    // 라우팅이 오류 없이 끝나면 성공
}
