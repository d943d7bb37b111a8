//! HTTP 요청 metrics middleware.
//!
//! 보안 체인 바깥에 적용되어 체인이 거부한 요청도 집계합니다. 거부 응답은
//! [`RejectionCode`] extension을 통해 에러 코드별로 따로 집계됩니다.

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::error::RejectionCode;
use crate::metrics::{
    normalize_path, record_auth_rejection, record_http_duration, record_http_request,
    record_http_response,
};

/// HTTP 메트릭을 수집하는 미들웨어 레이어.
///
/// - `http_requests_total{method, path}`
/// - `http_responses_total{method, path, status_class}`
/// - `http_request_duration_seconds{method, path}`
/// - `http_auth_rejections_total{path, status, code}` (거부 응답만)
pub async fn metrics_layer(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());

    record_http_request(&method, &path);

    let response = next.run(request).await;
    let status = response.status().as_u16();

    record_http_response(&method, &path, status);
    record_http_duration(&method, &path, start.elapsed().as_secs_f64());

    if let Some(RejectionCode(code)) = response.extensions().get::<RejectionCode>() {
        record_auth_rejection(&path, status, code);
    }

    response
}
