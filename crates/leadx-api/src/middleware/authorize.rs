//! 인가 미들웨어.
//!
//! 인증 단계가 기록한 [`AuthOutcome`]과 [`AuthorizationPolicy`]로 요청을
//! 허용하거나 거부합니다. 인증 결과가 없으면 익명 요청으로 간주합니다.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, info};

use crate::auth::{AuthOutcome, Decision, DenyReason};
use crate::error::AuthRejection;
use crate::metrics::record_authorization;
use crate::state::AppState;

/// 인가 미들웨어.
///
/// - 미인증 거부: 인증 단계의 구체적인 거부 사유 (없으면 `Unauthenticated`)
/// - 역할 부족: `Forbidden`
pub async fn authorize(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let outcome = request
        .extensions()
        .get::<AuthOutcome>()
        .cloned()
        .unwrap_or(AuthOutcome::Anonymous);

    let decision = state
        .policy
        .authorize(outcome.identity(), request.uri().path(), request.method());
    record_authorization(decision);

    match decision {
        Decision::Allow => next.run(request).await,
        Decision::Deny(DenyReason::Unauthenticated) => {
            let rejection = outcome.rejection();
            debug!(
                path = %request.uri().path(),
                method = %request.method(),
                reason = rejection.code(),
                "Unauthenticated request to protected route"
            );
            rejection.into_response()
        }
        Decision::Deny(DenyReason::Forbidden) => {
            info!(
                subject = outcome.identity().map(|i| i.subject.as_str()).unwrap_or_default(),
                path = %request.uri().path(),
                method = %request.method(),
                "Access denied: insufficient role"
            );
            AuthRejection::Forbidden.into_response()
        }
    }
}
