//! 보안 응답 헤더.
//!
//! 모든 응답에 클릭재킹, MIME 스니핑, 다운그레이드 방지 헤더를 추가합니다.
//! 핸들러가 이미 설정한 헤더는 덮어쓰지 않습니다.

use axum::{
    http::{header, HeaderValue},
    Router,
};
use tower_http::set_header::SetResponseHeaderLayer;

/// HSTS 정책 (1년, 서브도메인 포함).
pub const HSTS_POLICY: &str = "max-age=31536000; includeSubDomains";

/// Referrer 정책.
pub const REFERRER_POLICY: &str = "strict-origin-when-cross-origin";

/// 라우터에 보안 응답 헤더 레이어를 적용합니다.
pub fn security_headers<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static(HSTS_POLICY),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static(REFERRER_POLICY),
        ))
}
