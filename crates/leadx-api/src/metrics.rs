//! Prometheus 메트릭 설정 및 유틸리티.
//!
//! HTTP 요청 메트릭과 인증 메트릭을 수집하고 `/metrics` 엔드포인트로 노출합니다.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

use crate::auth::{Decision, TokenType};

/// Prometheus 메트릭 레코더를 설정하고 핸들을 반환합니다.
///
/// 레코더가 이미 설치되어 있으면 에러를 반환합니다.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new()
        // HTTP 요청 지속 시간 히스토그램 버킷 설정
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
        )?
        .install_recorder()
}

// ============================================================================
// HTTP 메트릭 헬퍼 함수
// ============================================================================

/// HTTP 요청 카운터 증가.
pub fn record_http_request(method: &str, path: &str) {
    counter!("http_requests_total", "method" => method.to_string(), "path" => path.to_string())
        .increment(1);
}

/// HTTP 응답 카운터 증가.
pub fn record_http_response(method: &str, path: &str, status: u16) {
    counter!(
        "http_responses_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status_class" => status_class(status)
    )
    .increment(1);
}

/// 인증/인가 거부 응답 카운터 증가.
///
/// `code`는 거부 응답의 에러 코드입니다 (예: `TOKEN_EXPIRED`, `FORBIDDEN`).
pub fn record_auth_rejection(path: &str, status: u16, code: &'static str) {
    counter!(
        "http_auth_rejections_total",
        "path" => path.to_string(),
        "status" => status.to_string(),
        "code" => code
    )
    .increment(1);
}

/// 상태 코드 계열 라벨 (`2xx`, `4xx` 등).
pub fn status_class(status: u16) -> &'static str {
    match status {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}

/// HTTP 요청 지속 시간 기록.
pub fn record_http_duration(method: &str, path: &str, duration_secs: f64) {
    histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_secs);
}

// ============================================================================
// 인증 메트릭 헬퍼 함수
// ============================================================================

/// 토큰 발급 카운터 증가.
pub fn record_token_issued(token_type: TokenType) {
    counter!("auth_tokens_issued_total", "type" => token_type.as_str()).increment(1);
}

/// 인증 단계 결과 카운터 증가.
///
/// `outcome`: `authenticated`, `anonymous`, `bypass`, 또는 거부 사유 코드.
pub fn record_authentication(outcome: &str) {
    counter!("auth_authentication_total", "outcome" => outcome.to_string()).increment(1);
}

/// 인가 결정 카운터 증가.
pub fn record_authorization(decision: Decision) {
    counter!("auth_authorization_total", "decision" => decision.label()).increment(1);
}

/// 로그인 결과 카운터 증가.
pub fn record_login(outcome: &str) {
    counter!("auth_login_total", "outcome" => outcome.to_string()).increment(1);
}

// ============================================================================
// 경로 정규화 유틸리티
// ============================================================================

/// 경로에서 동적 파라미터를 정규화합니다.
///
/// 예: `/api/lead/123e4567-e89b-12d3-a456-426614174000` → `/api/lead/:id`
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            // UUID 패턴 또는 숫자만 있는 경우 :id로 대체
            let is_uuid = segment.len() == 36 && segment.chars().filter(|c| *c == '-').count() == 4;
            let is_numeric = !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit());

            if is_uuid || is_numeric {
                ":id"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
