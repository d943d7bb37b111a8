//! 외부 저장소 협력자의 에러 타입.
//!
//! 사용자 저장소와 캐시 저장소 구현체가 공통으로 반환하는 에러를 정의합니다.

use thiserror::Error;

/// 외부 저장소 호출 에러.
#[derive(Debug, Error)]
pub enum StoreError {
    /// 저장소에 연결할 수 없음
    #[error("저장소 연결 실패: {0}")]
    Unavailable(String),

    /// 제한 시간 내에 응답하지 않음
    #[error("저장소 응답 시간 초과 ({0}ms)")]
    Timeout(u64),

    /// 쿼리 실행 에러
    #[error("저장소 쿼리 실패: {0}")]
    Query(String),
}

/// 저장소 작업을 위한 Result 타입.
pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// 연결 또는 시간 초과로 인한 일시적 장애인지 확인합니다.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Timeout(_))
    }
}
