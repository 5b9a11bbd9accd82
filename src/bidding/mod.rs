pub mod commands;
pub mod locks;
pub mod validator;

use crate::store::StoreError;
use thiserror::Error;

/// 입찰 처리 오류
/// 검증/권한/경합 오류는 호출자가 그대로 전달받아 스스로 판단하고,
/// 저장소 오류는 Store로 감싸 "입찰이 거절됨"과 "처리하지 못함"을 구분한다.
#[derive(Debug, Error)]
pub enum BidError {
    #[error("경매를 찾을 수 없습니다: {0}")]
    AuctionNotFound(i64),

    #[error("입찰을 찾을 수 없습니다: {0}")]
    BidNotFound(i64),

    #[error("이미 종료된 경매입니다: {0}")]
    AuctionClosed(i64),

    #[error("입찰 금액이 최소 입찰가보다 낮습니다. 최소 입찰가: {minimum}")]
    BidTooLow { minimum: i64 },

    #[error("입찰 금액이 최대 입찰가보다 높습니다. 최대 입찰가: {maximum}")]
    BidTooHigh { maximum: i64 },

    #[error("해당 입찰에 대한 결정 권한이 없습니다")]
    Unauthorized,

    #[error("이미 결정된 입찰입니다: {0}")]
    AlreadyDecided(i64),

    #[error("수락되지 않은 입찰입니다: {0}")]
    NotAccepted(i64),

    #[error("다른 입찰을 처리 중입니다. 잠시 후 다시 시도해주세요")]
    Busy,

    #[error("저장소 오류: {0}")]
    Store(#[from] StoreError),
}

impl BidError {
    /// 경계를 넘어 노출되는 오류 코드
    pub fn code(&self) -> &'static str {
        match self {
            BidError::AuctionNotFound(_) => "AUCTION_NOT_FOUND",
            BidError::BidNotFound(_) => "BID_NOT_FOUND",
            BidError::AuctionClosed(_) => "AUCTION_CLOSED",
            BidError::BidTooLow { .. } => "BID_TOO_LOW",
            BidError::BidTooHigh { .. } => "BID_TOO_HIGH",
            BidError::Unauthorized => "UNAUTHORIZED",
            BidError::AlreadyDecided(_) => "ALREADY_DECIDED",
            BidError::NotAccepted(_) => "NOT_ACCEPTED",
            BidError::Busy => "BUSY",
            BidError::Store(_) => "STORE_ERROR",
        }
    }

    /// 상태가 변경되지 않아 재시도해도 안전한 오류인지 여부
    pub fn is_retryable(&self) -> bool {
        matches!(self, BidError::Busy)
    }
}
