/// 경매 조회
pub const GET_AUCTION: &str = "SELECT id, owner_id, starting_price, current_price, current_bidder_id, increment_value, buy_now_price, end_time, is_buyer_request, status, created_at FROM auctions WHERE id = $1";

/// 입찰 조회
pub const GET_BID: &str =
    "SELECT id, auction_id, bidder_id, bid_amount, status, created_at FROM bids WHERE id = $1";

/// 입찰 이력 조회 (제출 순서)
pub const GET_BID_HISTORY: &str = r#"
    SELECT id, auction_id, bidder_id, bid_amount, status, created_at
    FROM bids
    WHERE auction_id = $1
    ORDER BY id
"#;

/// 종료 시간이 지난 ACTIVE 경매 조회
pub const GET_AUCTIONS_PAST_END: &str = "SELECT id, owner_id, starting_price, current_price, current_bidder_id, increment_value, buy_now_price, end_time, is_buyer_request, status, created_at FROM auctions WHERE status = 'ACTIVE' AND end_time <= $1 ORDER BY id";
